use serde::Serialize;
use tracing::warn;

use super::{macd_indicator, rsi_indicator, sma, IndicatorError, MacdSeries};
use crate::app_config::SignalConfig;
use crate::trading::model::PriceSeries;

/// 与K线逐根对齐的指标表
///
/// 四条均线按配置顺序存放：`ma9` / `ma25` / `ma99` / `ma200` 分别对应
/// `ma_periods[0..4]`，字段名沿用默认周期。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndicatorFrame {
    pub ma9: Vec<Option<f64>>,
    pub ma25: Vec<Option<f64>>,
    pub ma99: Vec<Option<f64>>,
    pub ma200: Vec<Option<f64>>,
    pub rsi: Vec<Option<f64>>,
    pub macd: Vec<Option<f64>>,
    pub macd_signal: Vec<Option<f64>>,
    pub macd_histogram: Vec<Option<f64>>,
}

/// 某一根K线上的全部指标值
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndicatorRow {
    pub ma9: Option<f64>,
    pub ma25: Option<f64>,
    pub ma99: Option<f64>,
    pub ma200: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
}

impl IndicatorFrame {
    fn columns(&self) -> [&Vec<Option<f64>>; 8] {
        [
            &self.ma9,
            &self.ma25,
            &self.ma99,
            &self.ma200,
            &self.rsi,
            &self.macd,
            &self.macd_signal,
            &self.macd_histogram,
        ]
    }

    /// 所有列长度一致时返回该长度
    pub fn aligned_len(&self) -> Option<usize> {
        let columns = self.columns();
        let len = columns[0].len();
        columns.iter().all(|c| c.len() == len).then_some(len)
    }

    /// 取第 `index` 根K线的指标，任一列缺失该位置时返回 None
    pub fn row(&self, index: usize) -> Option<IndicatorRow> {
        Some(IndicatorRow {
            ma9: *self.ma9.get(index)?,
            ma25: *self.ma25.get(index)?,
            ma99: *self.ma99.get(index)?,
            ma200: *self.ma200.get(index)?,
            rsi: *self.rsi.get(index)?,
            macd: *self.macd.get(index)?,
            macd_signal: *self.macd_signal.get(index)?,
            macd_histogram: *self.macd_histogram.get(index)?,
        })
    }
}

fn or_undefined(
    name: &str,
    len: usize,
    result: Result<Vec<Option<f64>>, IndicatorError>,
) -> Vec<Option<f64>> {
    match result {
        Ok(values) => values,
        Err(e) => {
            warn!("指标 {} 计算失败，按未定义处理: {}", name, e);
            vec![None; len]
        }
    }
}

/// 计算全部指标
///
/// 单个指标失败只会让该指标整列为 None，不影响其他指标。
pub fn compute_all(series: &PriceSeries, config: &SignalConfig) -> IndicatorFrame {
    let closes = series.closes();
    let len = closes.len();
    let [p0, p1, p2, p3] = config.ma_periods;

    let macd = match macd_indicator::calculate(
        &closes,
        config.macd_fast,
        config.macd_slow,
        config.macd_signal,
    ) {
        Ok(macd) => macd,
        Err(e) => {
            warn!("指标 macd 计算失败，按未定义处理: {}", e);
            MacdSeries::undefined(len)
        }
    };

    IndicatorFrame {
        ma9: or_undefined("ma9", len, sma::calculate(&closes, p0)),
        ma25: or_undefined("ma25", len, sma::calculate(&closes, p1)),
        ma99: or_undefined("ma99", len, sma::calculate(&closes, p2)),
        ma200: or_undefined("ma200", len, sma::calculate(&closes, p3)),
        rsi: or_undefined("rsi", len, rsi_indicator::calculate(&closes, config.rsi_period)),
        macd: macd.macd,
        macd_signal: macd.signal,
        macd_histogram: macd.histogram,
    }
}
