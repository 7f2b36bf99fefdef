use serde::Serialize;
use thiserror::Error;

/// 五个信号条件的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConditionSet {
    /// 回看窗口内短期均线向上突破长期均线
    pub ma_breakout: bool,
    pub rsi_above_threshold: bool,
    /// MACD 当前位于信号线上方
    pub macd_golden_cross: bool,
    pub price_above_ma25: bool,
    /// 窗口涨幅未超过上限
    pub not_overextended: bool,
}

impl ConditionSet {
    pub fn all(&self) -> bool {
        self.as_array().iter().all(|(_, ok)| *ok)
    }

    pub fn satisfied_count(&self) -> usize {
        self.as_array().iter().filter(|(_, ok)| *ok).count()
    }

    pub fn as_array(&self) -> [(&'static str, bool); 5] {
        [
            ("ma_breakout", self.ma_breakout),
            ("rsi_above_threshold", self.rsi_above_threshold),
            ("macd_golden_cross", self.macd_golden_cross),
            ("price_above_ma25", self.price_above_ma25),
            ("not_overextended", self.not_overextended),
        ]
    }

    /// 每个条件一行，形如 `MACD above signal: ✓`
    pub fn summary(&self) -> Vec<String> {
        self.as_array()
            .iter()
            .map(|(key, ok)| {
                let label = match *key {
                    "ma_breakout" => "Short MAs broke above long MAs (lookback)",
                    "rsi_above_threshold" => "RSI above threshold",
                    "macd_golden_cross" => "MACD above signal",
                    "price_above_ma25" => "Price above MA25",
                    _ => "24h gain within cap",
                };
                format!("{}: {}", label, if *ok { "✓" } else { "✗" })
            })
            .collect()
    }
}

/// 一次评估的分析结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSnapshot {
    pub rsi: Option<f64>,
    pub ma25: Option<f64>,
    pub macd: Option<f64>,
    pub current_price: f64,
    /// 窗口涨幅（百分比，10.0 即 +10%）
    pub pct_change_24h: f64,
    pub conditions: ConditionSet,
}

/// 单个条件评估时遇到的异常，该条件按 false 处理
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum ConditionError {
    #[error("{condition}: 指标表与K线未对齐 (series={series_len}, frame={frame_len:?})")]
    FrameMisaligned {
        condition: &'static str,
        series_len: usize,
        frame_len: Option<usize>,
    },

    #[error("{condition}: 基准价格无效 index={index}, value={value}")]
    InvalidReferencePrice {
        condition: &'static str,
        index: usize,
        value: f64,
    },
}

fn join_errors(errors: &[ConditionError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// 未产生信号的原因
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FailureReason {
    #[error("insufficient_history: {len} < {required}")]
    InsufficientHistory { len: usize, required: usize },

    #[error("condition_evaluation_failed: {}", join_errors(.errors))]
    ConditionErrors {
        errors: Vec<ConditionError>,
        snapshot: Box<AnalysisSnapshot>,
    },
}

impl FailureReason {
    pub fn code(&self) -> &'static str {
        match self {
            FailureReason::InsufficientHistory { .. } => "insufficient_history",
            FailureReason::ConditionErrors { .. } => "condition_evaluation_failed",
        }
    }
}

/// `check_all` 的返回值
#[derive(Debug, Clone, PartialEq)]
pub struct SignalCheck {
    pub fired: bool,
    pub outcome: Result<AnalysisSnapshot, FailureReason>,
}

impl SignalCheck {
    /// 正常评估或条件出错时都能拿到分析快照，历史不足时为 None
    pub fn snapshot(&self) -> Option<&AnalysisSnapshot> {
        match &self.outcome {
            Ok(snapshot) => Some(snapshot),
            Err(FailureReason::ConditionErrors { snapshot, .. }) => Some(snapshot),
            Err(FailureReason::InsufficientHistory { .. }) => None,
        }
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        self.outcome.as_ref().err()
    }
}
