//! 技术指标：均线、RSI、MACD
//!
//! 所有指标都以收盘价切片为输入，输出与输入等长的 `Vec<Option<f64>>`，
//! 窗口未填满的位置为 `None`。

pub mod indicator_frame;
pub mod macd_indicator;
pub mod rsi_indicator;
pub mod sma;

use thiserror::Error;

pub use indicator_frame::{compute_all, IndicatorFrame, IndicatorRow};
pub use macd_indicator::MacdSeries;
pub use rsi_indicator::RsiIndicator;

/// 指标计算错误，只影响出错的那一个指标
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndicatorError {
    #[error("{indicator} 周期无效: {reason}")]
    InvalidPeriod {
        indicator: &'static str,
        reason: String,
    },

    #[error("{indicator} 输入价格无效: index={index}, value={value}")]
    NonFinitePrice {
        indicator: &'static str,
        index: usize,
        value: f64,
    },
}

/// 检查收盘价全部为有限值
pub(crate) fn ensure_finite(indicator: &'static str, closes: &[f64]) -> Result<(), IndicatorError> {
    match closes.iter().position(|c| !c.is_finite()) {
        Some(index) => Err(IndicatorError::NonFinitePrice {
            indicator,
            index,
            value: closes[index],
        }),
        None => Ok(()),
    }
}
