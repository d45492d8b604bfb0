//! # PairAdmin Core
//!
//! Domain types and error definitions shared by the PairAdmin crates.
//! The terminal and LLM layers hand plain values of these types to the
//! security core; nothing here performs I/O.
//!
//! ## Contents
//!
//! - [`TerminalEvent`]: decoded text coming out of (or going into) the SSH terminal
//! - [`PrivilegeLevel`] / [`CommandSource`]: who is asking for a command and with what rights
//! - [`RedactionStrategy`]: how a detected secret is rewritten
//! - [`Error`] / [`Result`]: top-level error type for binaries and integrators

pub mod command;
pub mod error;
pub mod event;
pub mod redaction;

pub use command::{CommandSource, PrivilegeLevel};
pub use error::{Error, Result};
pub use event::{TerminalEvent, TerminalEventKind};
pub use redaction::RedactionStrategy;
