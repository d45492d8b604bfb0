//! `pairadmin filter`: Redact sensitive data from stdin.

use pairadmin_config::AppConfig;
use pairadmin_security::SensitiveDataFilter;
use std::process::ExitCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

pub async fn run(config: &AppConfig, stats: bool) -> anyhow::Result<ExitCode> {
    let mut input = String::new();
    tokio::io::stdin().read_to_string(&mut input).await?;

    let filter = SensitiveDataFilter::from_config(&config.filter);
    let mut stdout = tokio::io::stdout();

    if stats {
        let statistics = filter.statistics(&input);
        let json = serde_json::to_string_pretty(&statistics)?;
        stdout.write_all(json.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
    } else {
        stdout.write_all(filter.filter(&input).as_bytes()).await?;
    }
    stdout.flush().await?;

    Ok(ExitCode::SUCCESS)
}
