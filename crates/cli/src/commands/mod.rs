pub mod audit;
pub mod filter;
pub mod patterns;
pub mod validate;
