//! 五条件上涨信号

pub mod analysis;
pub mod signal_checker;

pub use analysis::{
    AnalysisSnapshot, ConditionError, ConditionSet, FailureReason, SignalCheck,
};
pub use signal_checker::SignalChecker;
