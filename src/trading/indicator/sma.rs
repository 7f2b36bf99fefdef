use ta::indicators::SimpleMovingAverage;
use ta::Next;

use super::{ensure_finite, IndicatorError};

/// 简单移动平均
///
/// 第 `i` 个值为 `closes[i + 1 - length ..= i]` 的算术平均，前 `length - 1` 个为 `None`。
pub fn calculate(closes: &[f64], length: usize) -> Result<Vec<Option<f64>>, IndicatorError> {
    ensure_finite("sma", closes)?;
    let mut sma_indicator =
        SimpleMovingAverage::new(length).map_err(|e| IndicatorError::InvalidPeriod {
            indicator: "sma",
            reason: format!("length={} ({:?})", length, e),
        })?;

    // ta 的 SMA 在窗口填满前返回已有数据的均值，这里屏蔽掉
    let result = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let value = sma_indicator.next(c);
            if i + 1 >= length {
                Some(value)
            } else {
                None
            }
        })
        .collect();
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn defined_only_after_window_fills() {
        let closes = [1.0, 2.0, 3.0, 4.0, 5.0];
        let sma = calculate(&closes, 3).unwrap();
        assert_eq!(sma[0], None);
        assert_eq!(sma[1], None);
        assert_relative_eq!(sma[2].unwrap(), 2.0);
        assert_relative_eq!(sma[3].unwrap(), 3.0);
        assert_relative_eq!(sma[4].unwrap(), 4.0);
    }

    #[test]
    fn zero_length_is_an_error() {
        assert!(matches!(
            calculate(&[1.0, 2.0], 0),
            Err(IndicatorError::InvalidPeriod { .. })
        ));
    }

    #[test]
    fn non_finite_price_is_an_error() {
        let err = calculate(&[1.0, f64::NAN, 3.0], 2).unwrap_err();
        assert!(matches!(err, IndicatorError::NonFinitePrice { index: 1, .. }));
    }
}
