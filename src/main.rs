use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use tokio::sync::watch;
use tracing::{error, info, warn};

use signal_scanner::app_config::{log::setup_logging, ScannerConfig};
use signal_scanner::trading::bithumb::BithumbClient;
use signal_scanner::trading::notification::DiscordWebhook;
use signal_scanner::trading::rank::RankTracker;
use signal_scanner::trading::strategy::SignalChecker;
use signal_scanner::trading::task::{ScanJob, ScanSettings};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Path to the JSON config file (defaults to $SIGNAL_CONFIG_PATH or signal_config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single scan cycle and exit
    Once,
    /// Scan every `scan_interval_secs` until Ctrl-C
    Watch,
    /// Print the effective configuration as JSON
    Config,
    /// Send a test message to the Discord webhook
    TestWebhook,
}

fn load_config(path: Option<PathBuf>) -> signal_scanner::error::Result<ScannerConfig> {
    let config = match path {
        Some(path) => {
            let mut config = ScannerConfig::load_from_path(path)?;
            config.apply_env_overrides();
            config.validate()?;
            config
        }
        None => ScannerConfig::load()?,
    };
    Ok(config)
}

fn build_job(config: &ScannerConfig, shutdown: watch::Receiver<bool>) -> anyhow::Result<ScanJob> {
    let source = Arc::new(BithumbClient::new(config.bithumb_base_url.clone())?);
    let notifier = Arc::new(DiscordWebhook::new(config.discord_webhook_url.clone())?);
    if !notifier.is_configured() {
        warn!("DISCORD_WEBHOOK_URL 未配置，信号只写日志");
    }
    let ranks = Arc::new(RankTracker::open_dir(config.rank_store_dir.clone()));
    let checker = SignalChecker::new(config.signal.clone());
    let job = ScanJob::new(source, notifier, ranks, checker, ScanSettings::from(config));
    Ok(job.with_shutdown(shutdown))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    setup_logging()?;

    let cli = Cli::parse();
    let config = match load_config(cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    match cli.command {
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::TestWebhook => {
            DiscordWebhook::new(config.discord_webhook_url.clone())?
                .send_test_message()
                .await?;
        }
        Commands::Once => {
            let (_shutdown_tx, shutdown_rx) = watch::channel(false);
            let job = build_job(&config, shutdown_rx)?;
            let report = job.run_once().await?;
            info!("扫描结果: {:?}", report);
        }
        Commands::Watch => {
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            let job = build_job(&config, shutdown_rx)?;
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        info!("接收到 CTRL+C，当前币种处理完后停止");
                        let _ = shutdown_tx.send(true);
                    }
                    Err(e) => error!("无法监听退出信号: {}", e),
                }
            });
            info!(
                "信号扫描启动: 前 {} 个币种，间隔 {} 秒",
                config.top_coins_count, config.scan_interval_secs
            );
            job.run_continuous().await;
        }
    }

    info!("应用已退出");
    Ok(())
}
