use serde::{Deserialize, Serialize};

/// 单个币种的24小时成交概况
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerVolume {
    /// 市场代码，如 `KRW-BTC`
    pub market: String,
    pub trade_price: f64,
    /// 24小时涨跌幅（比例，0.05 即 5%）
    pub signed_change_rate: f64,
    /// 24小时成交额（计价货币）
    pub acc_trade_price_24h: f64,
    /// 24小时成交量（基础货币）
    pub acc_trade_volume_24h: f64,
}

impl TickerVolume {
    /// 去掉 `KRW-` 前缀后的币种名称
    pub fn coin_name(&self) -> &str {
        self.market
            .split_once('-')
            .map(|(_, coin)| coin)
            .unwrap_or(&self.market)
    }
}
