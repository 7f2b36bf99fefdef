//! 扫描任务与外部服务之间的接口

use async_trait::async_trait;
use serde::Serialize;

use crate::trading::model::{PricePoint, TickerVolume};
use crate::trading::notification::NotifyError;
use crate::trading::rank::RankDelta;
use crate::trading::strategy::AnalysisSnapshot;

/// 行情数据来源
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// 全市场24小时成交概况，同时也是 BTC 基准行情的来源
    async fn fetch_volume_rankings(&self) -> anyhow::Result<Vec<TickerVolume>>;

    /// 最近 `count` 根1小时K线，顺序不作要求
    async fn fetch_candles(&self, symbol: &str, count: usize) -> anyhow::Result<Vec<PricePoint>>;
}

/// 一次触发的买入信号及其上下文
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalAlert {
    pub ticker: TickerVolume,
    pub snapshot: AnalysisSnapshot,
    /// BTC 行情，用于计算相对强度
    pub btc: Option<TickerVolume>,
    pub rank: RankDelta,
}

#[async_trait]
pub trait SignalNotifier: Send + Sync {
    async fn send_signal_alert(&self, alert: &SignalAlert) -> Result<(), NotifyError>;
}
