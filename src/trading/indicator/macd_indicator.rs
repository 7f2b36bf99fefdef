use ta::indicators::MovingAverageConvergenceDivergence;
use ta::Next;

use super::{ensure_finite, IndicatorError};

/// MACD 三条线，与输入等长
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MacdSeries {
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

impl MacdSeries {
    pub fn undefined(len: usize) -> Self {
        Self {
            macd: vec![None; len],
            signal: vec![None; len],
            histogram: vec![None; len],
        }
    }
}

/// MACD = EMA(close, fast) - EMA(close, slow)，signal = EMA(macd, signal)
///
/// EMA 使用 ta 的 `ExponentialMovingAverage`：alpha = 2 / (span + 1)，
/// 以第一个输入值作为初始值（`ema[0] = x[0]`），快线、慢线、信号线一致。
/// 因此对有限输入，三条线从第 0 根K线起都有值。
pub fn calculate(
    closes: &[f64],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> Result<MacdSeries, IndicatorError> {
    ensure_finite("macd", closes)?;
    if fast_period >= slow_period {
        return Err(IndicatorError::InvalidPeriod {
            indicator: "macd",
            reason: format!("fast={} 必须小于 slow={}", fast_period, slow_period),
        });
    }
    let mut macd = MovingAverageConvergenceDivergence::new(fast_period, slow_period, signal_period)
        .map_err(|e| IndicatorError::InvalidPeriod {
            indicator: "macd",
            reason: format!(
                "fast={} slow={} signal={} ({:?})",
                fast_period, slow_period, signal_period, e
            ),
        })?;

    let mut series = MacdSeries {
        macd: Vec::with_capacity(closes.len()),
        signal: Vec::with_capacity(closes.len()),
        histogram: Vec::with_capacity(closes.len()),
    };
    for &price in closes {
        let value = macd.next(price);
        series.macd.push(Some(value.macd));
        series.signal.push(Some(value.signal));
        series.histogram.push(Some(value.macd - value.signal));
    }
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn flat_prices_give_zero_macd() {
        let macd = calculate(&[100.0; 50], 12, 26, 9).unwrap();
        assert_eq!(macd.macd.len(), 50);
        assert_relative_eq!(macd.macd[49].unwrap(), 0.0);
        assert_relative_eq!(macd.signal[49].unwrap(), 0.0);
    }

    #[test]
    fn first_value_is_seeded_with_first_close() {
        // 两条 EMA 都以首个价格为种子，首根K线的 MACD 为 0
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let macd = calculate(&closes, 12, 26, 9).unwrap();
        assert_eq!(macd.macd[0], Some(0.0));

        // 第二根：fast = 100 + 2/13, slow = 100 + 2/27
        let expected = 2.0 / 13.0 - 2.0 / 27.0;
        assert_relative_eq!(macd.macd[1].unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn rising_prices_put_macd_above_signal() {
        let mut closes = vec![100.0; 60];
        closes.extend((1..=20).map(|i| 100.0 + i as f64));
        let macd = calculate(&closes, 12, 26, 9).unwrap();
        let last = closes.len() - 1;
        assert!(macd.macd[last].unwrap() > macd.signal[last].unwrap());
        assert!(macd.histogram[last].unwrap() > 0.0);
    }

    #[test]
    fn invalid_spans_are_rejected() {
        assert!(calculate(&[1.0; 10], 26, 12, 9).is_err());
        assert!(calculate(&[1.0; 10], 0, 12, 9).is_err());
        assert!(calculate(&[1.0; 10], 12, 26, 0).is_err());
    }
}
