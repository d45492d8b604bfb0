//! `pairadmin patterns`: List the active redaction patterns.

use pairadmin_config::AppConfig;
use pairadmin_security::SensitiveDataFilter;
use std::process::ExitCode;

pub fn run(config: &AppConfig) -> anyhow::Result<ExitCode> {
    let filter = SensitiveDataFilter::from_config(&config.filter);

    println!("🔍 Redaction patterns (applied in this order)");
    println!("=============================================");
    for (index, pattern) in filter.patterns().iter().enumerate() {
        println!(
            "  {:>2}. {:<24} {:<8} {:<12} {}",
            index + 1,
            pattern.name(),
            pattern.kind(),
            pattern.strategy().to_string(),
            if pattern.enabled() { "enabled" } else { "disabled" }
        );
    }

    if !config.security.filter_sensitive_data {
        println!("\n  ⚠️  security.filter_sensitive_data is off: the pipeline will not redact");
    }

    Ok(ExitCode::SUCCESS)
}
