//! 配置管理：环境变量、日志、扫描参数

pub mod env;
pub mod log;
pub mod settings;

pub use settings::{ConfigError, ScannerConfig, SignalConfig};
