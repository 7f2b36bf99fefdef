//! # Signal Scanner
//!
//! 成交额排名 + 均线突破信号扫描：指标计算、五条件信号、排名变动追踪

pub mod app_config;
pub mod error;
pub mod time_util;
pub mod trading;

pub use error::app_error::AppError;
