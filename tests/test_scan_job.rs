mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::watch;

use signal_scanner::app_config::SignalConfig;
use signal_scanner::trading::model::{PricePoint, TickerVolume};
use signal_scanner::trading::notification::NotifyError;
use signal_scanner::trading::rank::{
    RankDelta, RankGenerations, RankPersistenceError, RankStore, RankTracker,
};
use signal_scanner::trading::strategy::SignalChecker;
use signal_scanner::trading::task::{ScanJob, ScanSettings};
use signal_scanner::trading::traits::{MarketDataSource, SignalAlert, SignalNotifier};
use signal_scanner::AppError;

fn ticker(market: &str, value: f64, change_rate: f64) -> TickerVolume {
    TickerVolume {
        market: market.to_string(),
        trade_price: 110.0,
        signed_change_rate: change_rate,
        acc_trade_price_24h: value,
        acc_trade_volume_24h: value / 110.0,
    }
}

#[derive(Default)]
struct MockSource {
    tickers: Vec<TickerVolume>,
    candles: HashMap<String, Vec<f64>>,
    fail_rankings: bool,
    requested: Mutex<Vec<String>>,
}

impl MockSource {
    fn with_candles(mut self, market: &str, closes: Vec<f64>) -> Self {
        self.candles.insert(market.to_string(), closes);
        self
    }
}

#[async_trait]
impl MarketDataSource for MockSource {
    async fn fetch_volume_rankings(&self) -> Result<Vec<TickerVolume>> {
        if self.fail_rankings {
            return Err(anyhow!("connection refused"));
        }
        Ok(self.tickers.clone())
    }

    async fn fetch_candles(&self, symbol: &str, _count: usize) -> Result<Vec<PricePoint>> {
        self.requested.lock().unwrap().push(symbol.to_string());
        match self.candles.get(symbol) {
            // 接口按时间倒序返回
            Some(closes) => Ok(common::candles(closes).into_iter().rev().collect()),
            None => Err(anyhow!("HTTP 500 for {}", symbol)),
        }
    }
}

#[derive(Default)]
struct RecordingNotifier {
    alerts: Mutex<Vec<SignalAlert>>,
}

#[async_trait]
impl SignalNotifier for RecordingNotifier {
    async fn send_signal_alert(&self, alert: &SignalAlert) -> Result<(), NotifyError> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

struct BrokenStore;

impl RankStore for BrokenStore {
    fn load(&self) -> Result<Option<RankGenerations>, RankPersistenceError> {
        Ok(None)
    }

    fn persist(&self, _: &RankGenerations) -> Result<(), RankPersistenceError> {
        Err(RankPersistenceError::Io {
            path: "volume_rank.json".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        })
    }
}

fn settings() -> ScanSettings {
    ScanSettings {
        top_coins_count: 10,
        candle_count: 220,
        pacing: Duration::ZERO,
        scan_interval: Duration::from_secs(600),
    }
}

fn job(
    source: Arc<MockSource>,
    notifier: Arc<RecordingNotifier>,
    ranks: Arc<RankTracker>,
) -> ScanJob {
    ScanJob::new(
        source,
        notifier,
        ranks,
        SignalChecker::new(SignalConfig::default()),
        settings(),
    )
}

fn universe() -> MockSource {
    MockSource {
        tickers: vec![
            ticker("KRW-BTC", 900.0, 0.01),
            ticker("KRW-ETH", 500.0, 0.10),
            ticker("KRW-XRP", 300.0, 0.0),
            ticker("KRW-DOGE", 100.0, 0.0),
        ],
        ..Default::default()
    }
    .with_candles("KRW-BTC", vec![100.0; 220])
    .with_candles("KRW-ETH", common::breakout_closes())
    .with_candles("KRW-DOGE", common::wavy_closes(120))
}

#[tokio::test]
async fn fired_signal_is_notified_once_with_rank() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let source = Arc::new(universe());
    let notifier = Arc::new(RecordingNotifier::default());
    let ranks = Arc::new(RankTracker::open_dir(dir.path()));
    let job = job(source.clone(), notifier.clone(), ranks.clone());

    let report = job.run_once().await?;
    assert_eq!(report.universe, 4);
    assert_eq!(report.fired, 1);
    assert_eq!(report.notified, 1);
    assert!(report.rank_persisted);

    {
        let alerts = notifier.alerts.lock().unwrap();
        assert_eq!(alerts.len(), 1);
        let alert = &alerts[0];
        assert_eq!(alert.ticker.market, "KRW-ETH");
        assert_eq!(alert.btc.as_ref().map(|b| b.market.as_str()), Some("KRW-BTC"));
        assert_eq!(
            alert.rank,
            RankDelta {
                current_rank: Some(2),
                rank_change: None
            }
        );
        assert!(alert.snapshot.conditions.all());
    }

    // 第二轮有了上一代排名
    job.run_once().await?;
    let alerts = notifier.alerts.lock().unwrap();
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[1].rank.rank_change, Some(0));
    Ok(())
}

#[tokio::test]
async fn failing_instrument_does_not_stop_the_scan() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let source = Arc::new(universe());
    let notifier = Arc::new(RecordingNotifier::default());
    let job = job(
        source.clone(),
        notifier.clone(),
        Arc::new(RankTracker::open_dir(dir.path())),
    );

    let report = job.run_once().await?;
    // XRP 没有K线数据，DOGE 历史不足
    assert_eq!(report.fetch_failures, 1);
    assert_eq!(report.insufficient_history, 1);
    assert_eq!(report.evaluated, 3);
    assert_eq!(
        *source.requested.lock().unwrap(),
        vec!["KRW-BTC", "KRW-ETH", "KRW-XRP", "KRW-DOGE"]
    );
    assert_eq!(notifier.alerts.lock().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn rank_persistence_failure_does_not_stop_the_scan() -> Result<()> {
    let notifier = Arc::new(RecordingNotifier::default());
    let job = job(
        Arc::new(universe()),
        notifier.clone(),
        Arc::new(RankTracker::open(BrokenStore)),
    );

    let report = job.run_once().await?;
    assert!(!report.rank_persisted);
    assert_eq!(report.notified, 1);
    // 排名未能发布
    assert_eq!(notifier.alerts.lock().unwrap()[0].rank, RankDelta::default());
    Ok(())
}

#[tokio::test]
async fn top_n_limits_the_universe() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let source = Arc::new(universe());
    let mut settings = settings();
    settings.top_coins_count = 2;
    let job = ScanJob::new(
        source.clone(),
        Arc::new(RecordingNotifier::default()),
        Arc::new(RankTracker::open_dir(dir.path())),
        SignalChecker::new(SignalConfig::default()),
        settings,
    );

    job.run_once().await?;
    assert_eq!(*source.requested.lock().unwrap(), vec!["KRW-BTC", "KRW-ETH"]);
    Ok(())
}

#[tokio::test]
async fn ranking_fetch_failure_fails_the_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(MockSource {
        fail_rankings: true,
        ..Default::default()
    });
    let job = job(
        source,
        Arc::new(RecordingNotifier::default()),
        Arc::new(RankTracker::open_dir(dir.path())),
    );

    let err = job.run_once().await.unwrap_err();
    assert!(matches!(err, AppError::ExternalCollaborator { .. }));
}

#[tokio::test]
async fn shutdown_stops_before_the_next_instrument() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let source = Arc::new(universe());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let job = job(
        source.clone(),
        Arc::new(RecordingNotifier::default()),
        Arc::new(RankTracker::open_dir(dir.path())),
    )
    .with_shutdown(shutdown_rx);

    shutdown_tx.send(true)?;
    let report = job.run_once().await?;
    assert!(report.interrupted);
    assert_eq!(report.evaluated, 0);
    assert!(source.requested.lock().unwrap().is_empty());
    // 排名照常更新
    assert!(report.rank_persisted);

    // 循环模式直接退出
    tokio::time::timeout(Duration::from_secs(5), job.run_continuous()).await?;
    Ok(())
}
