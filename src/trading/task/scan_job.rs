use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use crate::app_config::ScannerConfig;
use crate::error::{AppError, Result};
use crate::time_util;
use crate::trading::model::{PriceSeries, TickerVolume};
use crate::trading::notification::NotifyError;
use crate::trading::rank::RankTracker;
use crate::trading::strategy::{FailureReason, SignalChecker};
use crate::trading::traits::{MarketDataSource, SignalAlert, SignalNotifier};

pub const BTC_MARKET: &str = "KRW-BTC";

/// 扫描任务的运行参数
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSettings {
    pub top_coins_count: usize,
    pub candle_count: usize,
    pub pacing: Duration,
    pub scan_interval: Duration,
}

impl From<&ScannerConfig> for ScanSettings {
    fn from(config: &ScannerConfig) -> Self {
        Self {
            top_coins_count: config.top_coins_count,
            candle_count: config.candle_count,
            pacing: config.pacing(),
            scan_interval: config.scan_interval(),
        }
    }
}

/// 一轮扫描的统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// 行情接口返回的币种数
    pub universe: usize,
    /// 实际完成评估的币种数
    pub evaluated: usize,
    pub fired: usize,
    pub notified: usize,
    pub insufficient_history: usize,
    pub condition_errors: usize,
    /// K线拉取失败的币种数
    pub fetch_failures: usize,
    pub rank_persisted: bool,
    /// 收到停止信号，本轮提前结束
    pub interrupted: bool,
}

/// 成交额前 N 的币种，与排名表使用同样的排序规则
fn top_by_volume(tickers: &[TickerVolume], n: usize) -> Vec<&TickerVolume> {
    let key = |t: &TickerVolume| {
        if t.acc_trade_price_24h.is_nan() {
            f64::NEG_INFINITY
        } else {
            t.acc_trade_price_24h
        }
    };
    let mut sorted: Vec<&TickerVolume> = tickers.iter().collect();
    sorted.sort_by(|a, b| key(b).total_cmp(&key(a)));
    let mut seen = HashSet::new();
    sorted
        .into_iter()
        .filter(|t| seen.insert(t.market.clone()))
        .take(n)
        .collect()
}

/// 扫描任务：拉取成交额排名，逐个币种评估信号并发送通知
pub struct ScanJob {
    source: Arc<dyn MarketDataSource>,
    notifier: Arc<dyn SignalNotifier>,
    ranks: Arc<RankTracker>,
    checker: SignalChecker,
    settings: ScanSettings,
    shutdown: watch::Receiver<bool>,
}

impl ScanJob {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        notifier: Arc<dyn SignalNotifier>,
        ranks: Arc<RankTracker>,
        checker: SignalChecker,
        settings: ScanSettings,
    ) -> Self {
        let (_, shutdown) = watch::channel(false);
        Self {
            source,
            notifier,
            ranks,
            checker,
            settings,
            shutdown,
        }
    }

    /// 设置停止信号，值变为 true 后在下一个币种之前停止
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    fn stopping(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// 执行一轮扫描
    ///
    /// 只有拉取成交额排名失败会让本轮失败；单个币种的异常只记录日志，
    /// 排名保存失败也不影响扫描。
    #[instrument(name = "scan_once", skip_all)]
    pub async fn run_once(&self) -> Result<ScanReport> {
        let tickers = self
            .source
            .fetch_volume_rankings()
            .await
            .map_err(|e| AppError::external("market_data", e))?;
        let mut report = ScanReport {
            universe: tickers.len(),
            ..Default::default()
        };

        let rankings: Vec<(&str, f64)> = tickers
            .iter()
            .map(|t| (t.market.as_str(), t.acc_trade_price_24h))
            .collect();
        match self.ranks.update(&rankings) {
            Ok(_) => report.rank_persisted = true,
            Err(e) => warn!("成交额排名未能保存，继续扫描: {}", AppError::from(e)),
        }

        let btc = tickers.iter().find(|t| t.market == BTC_MARKET).cloned();
        let targets = top_by_volume(&tickers, self.settings.top_coins_count);
        info!("开始扫描成交额前 {} 个币种", targets.len());

        for (i, ticker) in targets.into_iter().enumerate() {
            if i > 0 && !self.settings.pacing.is_zero() {
                tokio::time::sleep(self.settings.pacing).await;
            }
            if self.stopping() {
                info!("收到停止信号，本轮扫描在 {} 处结束", ticker.market);
                report.interrupted = true;
                break;
            }
            self.scan_instrument(ticker, btc.as_ref(), &mut report).await;
        }

        info!(
            "本轮扫描完成: 评估 {}/{}，触发 {}，通知 {}，K线失败 {}",
            report.evaluated,
            report.universe,
            report.fired,
            report.notified,
            report.fetch_failures
        );
        Ok(report)
    }

    async fn scan_instrument(
        &self,
        ticker: &TickerVolume,
        btc: Option<&TickerVolume>,
        report: &mut ScanReport,
    ) {
        let market = ticker.market.as_str();
        let points = match self
            .source
            .fetch_candles(market, self.settings.candle_count)
            .await
        {
            Ok(points) => points,
            Err(e) => {
                warn!("{} K线获取失败，跳过: {}", market, AppError::external("market_data", e));
                report.fetch_failures += 1;
                return;
            }
        };

        let series = PriceSeries::new(points);
        let check = self.checker.evaluate(&series);
        report.evaluated += 1;

        let snapshot = match check.outcome {
            Ok(snapshot) => snapshot,
            Err(FailureReason::InsufficientHistory { len, required }) => {
                debug!("{} K线不足 ({}/{})，跳过", market, len, required);
                report.insufficient_history += 1;
                return;
            }
            Err(reason) => {
                warn!("{} 条件评估异常 [{}]: {}", market, reason.code(), reason);
                report.condition_errors += 1;
                return;
            }
        };
        if !check.fired {
            debug!("{} 未触发: {}", market, snapshot.conditions.summary().join(", "));
            return;
        }

        report.fired += 1;
        let rank = self.ranks.delta(market);
        let bar_time = series
            .last()
            .and_then(|p| time_util::mill_time_to_datetime_kst(p.ts()).ok())
            .unwrap_or_default();
        info!(
            "🚀 {} 触发买入信号: K线 {}, 价格 {}, RSI {:?}, 排名 {:?}",
            market, bar_time, snapshot.current_price, snapshot.rsi, rank.current_rank
        );
        let alert = SignalAlert {
            ticker: ticker.clone(),
            snapshot,
            btc: btc.cloned(),
            rank,
        };
        match self.notifier.send_signal_alert(&alert).await {
            Ok(()) => report.notified += 1,
            Err(NotifyError::NotConfigured) => warn!("{} 通知未发送: webhook 未配置", market),
            Err(e) => error!(
                "{} 通知发送失败: {}",
                market,
                AppError::external("notifier", e)
            ),
        }
    }

    /// 按间隔循环扫描，直到收到停止信号
    ///
    /// 下一轮在上一轮结束且间隔过去之后才开始。
    pub async fn run_continuous(&self) {
        let mut shutdown = self.shutdown.clone();
        loop {
            if self.stopping() {
                break;
            }
            if let Err(e) = self.run_once().await {
                error!("本轮扫描失败: {}", e);
            }
            info!(
                "下一轮扫描在 {} 秒后开始",
                self.settings.scan_interval.as_secs()
            );
            tokio::select! {
                _ = tokio::time::sleep(self.settings.scan_interval) => {}
                Ok(_) = shutdown.wait_for(|stop| *stop) => {}
            }
        }
        info!("扫描循环已停止");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticker(market: &str, value: f64) -> TickerVolume {
        TickerVolume {
            market: market.to_string(),
            trade_price: 1.0,
            signed_change_rate: 0.0,
            acc_trade_price_24h: value,
            acc_trade_volume_24h: 0.0,
        }
    }

    #[test]
    fn top_by_volume_orders_and_truncates() {
        let tickers = vec![
            ticker("KRW-A", 1.0),
            ticker("KRW-B", f64::NAN),
            ticker("KRW-C", 3.0),
            ticker("KRW-D", 2.0),
        ];
        let top: Vec<&str> = top_by_volume(&tickers, 3)
            .iter()
            .map(|t| t.market.as_str())
            .collect();
        assert_eq!(top, vec!["KRW-C", "KRW-D", "KRW-A"]);
    }
}
