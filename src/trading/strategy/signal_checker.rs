use tracing::{debug, warn};

use super::analysis::{AnalysisSnapshot, ConditionError, ConditionSet, FailureReason, SignalCheck};
use crate::app_config::SignalConfig;
use crate::trading::indicator::{compute_all, IndicatorFrame, IndicatorRow};
use crate::trading::model::PriceSeries;

// 未定义的值参与比较时一律为 false
fn gt(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a > b)
}

fn le(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a <= b)
}

/// 取与K线对齐的某一行指标
fn aligned_row(
    condition: &'static str,
    frame: &IndicatorFrame,
    series_len: usize,
    index: usize,
) -> Result<IndicatorRow, ConditionError> {
    let misaligned = || ConditionError::FrameMisaligned {
        condition,
        series_len,
        frame_len: frame.aligned_len(),
    };
    if frame.aligned_len() != Some(series_len) {
        return Err(misaligned());
    }
    frame.row(index).ok_or_else(misaligned)
}

/// 短期均线（ma9、ma25）在最近 `lookback` 根K线内向上突破长期均线（ma99、ma200）
///
/// 最后一根：两条短期均线都在两条长期均线之上；
/// 窗口第一根：至少有一条短期均线不高于某条长期均线。
/// 也就是说突破必须发生在窗口内，窗口开始前就已突破的不算。
pub fn check_moving_average_breakout(
    frame: &IndicatorFrame,
    series_len: usize,
    lookback: usize,
) -> Result<bool, ConditionError> {
    const NAME: &str = "ma_breakout";
    if lookback == 0 || series_len < lookback {
        return Ok(false);
    }
    let latest = aligned_row(NAME, frame, series_len, series_len - 1)?;
    let oldest = aligned_row(NAME, frame, series_len, series_len - lookback)?;

    let ma9_above = gt(latest.ma9, latest.ma99) && gt(latest.ma9, latest.ma200);
    let ma25_above = gt(latest.ma25, latest.ma99) && gt(latest.ma25, latest.ma200);
    if !(ma9_above && ma25_above) {
        return Ok(false);
    }

    let ma9_was_below = le(oldest.ma9, oldest.ma99) || le(oldest.ma9, oldest.ma200);
    let ma25_was_below = le(oldest.ma25, oldest.ma99) || le(oldest.ma25, oldest.ma200);
    Ok(ma9_was_below || ma25_was_below)
}

pub fn check_rsi_condition(latest: &IndicatorRow, threshold: f64) -> bool {
    matches!(latest.rsi, Some(rsi) if rsi >= threshold)
}

/// MACD 线当前在信号线之上
///
/// 只看最新一根，不要求上一根在信号线下方，持续在上方同样满足。
pub fn check_macd_golden_cross(latest: &IndicatorRow) -> bool {
    gt(latest.macd, latest.macd_signal)
}

pub fn check_price_above_ma25(close: f64, latest: &IndicatorRow) -> bool {
    gt(Some(close), latest.ma25)
}

/// 窗口涨幅不超过上限
///
/// 基准价为最近 `window` 根K线中最早的一根（`closes[len - window]`）。
/// K线不足 `window` 根时直接通过。
pub fn check_price_increase_limit(
    closes: &[f64],
    window: usize,
    max_increase: f64,
) -> Result<bool, ConditionError> {
    let len = closes.len();
    if window == 0 || len < window {
        return Ok(true);
    }
    let index = len - window;
    let reference = closes[index];
    if !reference.is_finite() || reference <= 0.0 {
        return Err(ConditionError::InvalidReferencePrice {
            condition: "not_overextended",
            index,
            value: reference,
        });
    }
    let current = closes[len - 1];
    let increase_rate = (current - reference) / reference;
    Ok(increase_rate <= max_increase)
}

/// 窗口涨幅（百分比），K线不足或基准价不为正时为 0
pub fn price_change_pct(closes: &[f64], window: usize) -> f64 {
    let len = closes.len();
    if window == 0 || len < window {
        return 0.0;
    }
    let reference = closes[len - window];
    if !reference.is_finite() || reference <= 0.0 {
        return 0.0;
    }
    (closes[len - 1] - reference) / reference * 100.0
}

/// 信号检查器，持有不可变的信号参数
#[derive(Debug, Clone)]
pub struct SignalChecker {
    config: SignalConfig,
}

impl SignalChecker {
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    /// 计算指标并检查全部条件
    pub fn evaluate(&self, series: &PriceSeries) -> SignalCheck {
        if series.len() < self.config.min_history {
            return self.check_all(series, &IndicatorFrame::default());
        }
        let frame = compute_all(series, &self.config);
        self.check_all(series, &frame)
    }

    /// 检查五个条件
    ///
    /// K线不足 `min_history` 时直接返回 `InsufficientHistory`。
    /// 单个条件出错时该条件记为 false，其余条件照常计算，
    /// 最终 `fired = false` 并在 `ConditionErrors` 中带回错误与分析快照。
    pub fn check_all(&self, series: &PriceSeries, frame: &IndicatorFrame) -> SignalCheck {
        let len = series.len();
        let required = self.config.min_history.max(1);
        if len < required {
            return SignalCheck {
                fired: false,
                outcome: Err(FailureReason::InsufficientHistory { len, required }),
            };
        }

        let closes = series.closes();
        let current_price = closes[len - 1];
        let mut errors: Vec<ConditionError> = Vec::new();
        let mut settle = |result: Result<bool, ConditionError>| match result {
            Ok(ok) => ok,
            Err(e) => {
                warn!("条件评估异常，按未满足处理: {}", e);
                errors.push(e);
                false
            }
        };

        let latest = |condition: &'static str| aligned_row(condition, frame, len, len - 1);

        let conditions = ConditionSet {
            ma_breakout: settle(check_moving_average_breakout(
                frame,
                len,
                self.config.breakout_lookback,
            )),
            rsi_above_threshold: settle(
                latest("rsi_above_threshold")
                    .map(|row| check_rsi_condition(&row, self.config.rsi_threshold)),
            ),
            macd_golden_cross: settle(
                latest("macd_golden_cross").map(|row| check_macd_golden_cross(&row)),
            ),
            price_above_ma25: settle(
                latest("price_above_ma25").map(|row| check_price_above_ma25(current_price, &row)),
            ),
            not_overextended: settle(check_price_increase_limit(
                &closes,
                self.config.overextension_window,
                self.config.overextension_cap,
            )),
        };

        let latest_row = frame.row(len - 1).filter(|_| frame.aligned_len() == Some(len));
        let snapshot = AnalysisSnapshot {
            rsi: latest_row.and_then(|r| r.rsi),
            ma25: latest_row.and_then(|r| r.ma25),
            macd: latest_row.and_then(|r| r.macd),
            current_price,
            pct_change_24h: price_change_pct(&closes, self.config.overextension_window),
            conditions,
        };
        debug!(
            "信号条件: {:?}, 满足 {}/5, 24h 涨幅 {:.2}%",
            conditions,
            conditions.satisfied_count(),
            snapshot.pct_change_24h
        );

        if !errors.is_empty() {
            return SignalCheck {
                fired: false,
                outcome: Err(FailureReason::ConditionErrors {
                    errors,
                    snapshot: Box::new(snapshot),
                }),
            };
        }

        SignalCheck {
            fired: conditions.all(),
            outcome: Ok(snapshot),
        }
    }
}
