//! `pairadmin validate`: Check a command against the security policy.
//!
//! Exit codes: 0 allowed, 1 forbidden, 2 requires confirmation.

use pairadmin_config::AppConfig;
use pairadmin_core::PrivilegeLevel;
use pairadmin_security::{CommandContext, SecurityPipeline, ValidationStatus};
use std::process::ExitCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PrivilegeArg {
    Standard,
    Elevated,
    Root,
}

impl From<PrivilegeArg> for PrivilegeLevel {
    fn from(arg: PrivilegeArg) -> Self {
        match arg {
            PrivilegeArg::Standard => PrivilegeLevel::Standard,
            PrivilegeArg::Elevated => PrivilegeLevel::Elevated,
            PrivilegeArg::Root => PrivilegeLevel::Root,
        }
    }
}

pub async fn run(
    config: &AppConfig,
    command: &str,
    ai: bool,
    privilege: PrivilegeLevel,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let pipeline = SecurityPipeline::from_config(config)?;

    let context = if ai {
        CommandContext::ai_suggestion()
    } else {
        CommandContext::user()
    };
    let context = context.with_privilege(privilege);

    let check = pipeline.check_command(command, &context);
    pipeline.logger().shutdown().await?;

    let result = &check.result;
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        let label = match result.status {
            ValidationStatus::Allowed => "✅ Allowed",
            ValidationStatus::Forbidden => "❌ Forbidden",
            ValidationStatus::RequiresConfirmation => "⚠️  Requires confirmation",
        };
        println!("{label}: {}", check.filtered_command);
        if let Some(reason) = &result.reason {
            println!("   Reason:     {reason}");
        }
        if let Some(suggested) = &result.suggested_command {
            println!("   Suggestion: {suggested}");
        }
    }

    Ok(match result.status {
        ValidationStatus::Allowed => ExitCode::SUCCESS,
        ValidationStatus::Forbidden => ExitCode::from(1),
        ValidationStatus::RequiresConfirmation => ExitCode::from(2),
    })
}
