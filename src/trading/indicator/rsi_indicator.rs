use std::collections::VecDeque;

use super::{ensure_finite, IndicatorError};

/// RSI，涨跌幅使用窗口内的简单平均（非 Wilder 平滑）
///
/// gain = 窗口内正向变动的均值，loss = 窗口内负向变动绝对值的均值，
/// rsi = 100 - 100 / (1 + gain / loss)。loss 为 0 时（包括完全横盘）RSI 取 100。
#[derive(Debug, Clone)]
pub struct RsiIndicator {
    length: usize,
    prev_value: Option<f64>,
    changes: VecDeque<f64>,
}

impl RsiIndicator {
    pub fn new(length: usize) -> Result<Self, IndicatorError> {
        if length == 0 {
            return Err(IndicatorError::InvalidPeriod {
                indicator: "rsi",
                reason: "length=0".to_string(),
            });
        }
        Ok(Self {
            length,
            prev_value: None,
            changes: VecDeque::with_capacity(length + 1),
        })
    }

    /// 输入下一根K线的收盘价，窗口内变动数量不足 `length` 时返回 None
    pub fn next(&mut self, value: f64) -> Option<f64> {
        let prev = self.prev_value.replace(value)?;
        self.changes.push_back(value - prev);
        if self.changes.len() > self.length {
            self.changes.pop_front();
        }
        if self.changes.len() < self.length {
            return None;
        }

        let n = self.length as f64;
        let gain = self.changes.iter().filter(|d| **d > 0.0).sum::<f64>() / n;
        let loss = self.changes.iter().filter(|d| **d < 0.0).map(|d| -d).sum::<f64>() / n;

        if loss == 0.0 {
            return Some(100.0);
        }
        let rs = gain / loss;
        Some(100.0 - 100.0 / (1.0 + rs))
    }

    pub fn reset(&mut self) {
        self.prev_value = None;
        self.changes.clear();
    }
}

/// 计算整段序列的 RSI，前 `length` 个值为 None
pub fn calculate(closes: &[f64], length: usize) -> Result<Vec<Option<f64>>, IndicatorError> {
    ensure_finite("rsi", closes)?;
    let mut rsi = RsiIndicator::new(length)?;
    Ok(closes.iter().map(|&c| rsi.next(c)).collect())
}
