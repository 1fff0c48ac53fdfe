use anyhow::Result;
use clap::Parser;

use errwatch_core::config::ErrwatchConfig;
use errwatch_daemon::cli::DaemonCli;
use errwatch_daemon::logging;
use errwatch_daemon::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    // file -> env overrides -> CLI flags -> validate
    let mut config = ErrwatchConfig::from_file(&cli.config).await.map_err(|e| {
        anyhow::anyhow!("failed to load config {}: {}", cli.config.display(), e)
    })?;
    config.apply_env_overrides();
    if let Some(level) = cli.log_level {
        config.general.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.general.log_format = format;
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {}", e))?;

    if cli.validate {
        println!("configuration is valid: {}", cli.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "errwatch-daemon starting"
    );

    let mut orchestrator = Orchestrator::build_from_config(config)?;

    if cli.once {
        let report = orchestrator.run_once().await;
        println!("{}", serde_json::to_string_pretty(&report)?);
        if report.outcome.is_feed_failure() {
            return Err(anyhow::anyhow!(
                "ingestion cycle failed: {}",
                report.outcome.label()
            ));
        }
        return Ok(());
    }

    orchestrator.run().await?;

    tracing::info!("errwatch-daemon shut down");
    Ok(())
}
