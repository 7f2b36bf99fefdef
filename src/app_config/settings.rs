//! 扫描参数
//!
//! 所有参数在启动时加载一次，之后作为不可变值传给各组件，不存在全局单例。
//! 加载顺序：默认值 → JSON 配置文件 → 环境变量覆盖 → 校验。

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::app_config::env::{env_opt, env_or_default, env_parse};

pub const DEFAULT_CONFIG_PATH: &str = "signal_config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读取失败 {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("配置文件解析失败 {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("配置项无效 {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// 信号计算参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// RSI 阈值，最新 RSI >= 该值才满足条件
    pub rsi_threshold: f64,
    pub rsi_period: usize,
    /// 四条均线周期，依次为短、中、长、最长
    pub ma_periods: [usize; 4],
    /// 突破回看窗口（K线根数）
    pub breakout_lookback: usize,
    /// 过度上涨检查窗口（K线根数）
    pub overextension_window: usize,
    /// 窗口内允许的最大涨幅，0.20 即 20%
    pub overextension_cap: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    /// 参与评估所需的最少K线数量
    pub min_history: usize,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            rsi_threshold: 45.0,
            rsi_period: 14,
            ma_periods: [9, 25, 99, 200],
            breakout_lookback: 10,
            overextension_window: 24,
            overextension_cap: 0.20,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            min_history: 200,
        }
    }
}

impl SignalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ma_periods.iter().any(|p| *p == 0) {
            return Err(invalid("ma_periods", "周期必须大于 0"));
        }
        if !self.ma_periods.windows(2).all(|w| w[0] < w[1]) {
            return Err(invalid(
                "ma_periods",
                format!("周期必须严格递增: {:?}", self.ma_periods),
            ));
        }
        if !(0.0..=100.0).contains(&self.rsi_threshold) {
            return Err(invalid(
                "rsi_threshold",
                format!("必须在 0-100 之间: {}", self.rsi_threshold),
            ));
        }
        if self.rsi_period == 0 {
            return Err(invalid("rsi_period", "必须大于 0"));
        }
        if self.breakout_lookback < 2 {
            return Err(invalid("breakout_lookback", "至少需要 2 根K线"));
        }
        if self.overextension_window < 2 {
            return Err(invalid("overextension_window", "至少需要 2 根K线"));
        }
        if !self.overextension_cap.is_finite() || self.overextension_cap < 0.0 {
            return Err(invalid(
                "overextension_cap",
                format!("必须为非负数: {}", self.overextension_cap),
            ));
        }
        if self.macd_fast == 0 || self.macd_slow == 0 || self.macd_signal == 0 {
            return Err(invalid("macd", "EMA 周期必须大于 0"));
        }
        if self.macd_fast >= self.macd_slow {
            return Err(invalid(
                "macd",
                format!("快线周期 {} 必须小于慢线周期 {}", self.macd_fast, self.macd_slow),
            ));
        }
        let longest = self.ma_periods[3];
        if self.min_history < longest {
            return Err(invalid(
                "min_history",
                format!("不能小于最长均线周期 {}: {}", longest, self.min_history),
            ));
        }
        Ok(())
    }
}

/// 扫描器整体配置
///
/// 兼容旧版 `signal_config.json` 的扁平格式：信号参数直接写在顶层，
/// `scan_interval` 以秒为单位。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    #[serde(flatten)]
    pub signal: SignalConfig,
    #[serde(alias = "scan_interval")]
    pub scan_interval_secs: u64,
    /// 每轮扫描的成交额前 N 个币种
    pub top_coins_count: usize,
    /// 每个币种拉取的1小时K线数量
    pub candle_count: usize,
    /// 币种之间的间隔，对行情接口限流
    pub pacing_ms: u64,
    pub rank_store_dir: PathBuf,
    pub discord_webhook_url: String,
    pub bithumb_base_url: String,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            signal: SignalConfig::default(),
            scan_interval_secs: 600,
            top_coins_count: 200,
            candle_count: 200,
            pacing_ms: 100,
            rank_store_dir: PathBuf::from("data"),
            discord_webhook_url: String::new(),
            bithumb_base_url: "https://api.bithumb.com".to_string(),
        }
    }
}

impl ScannerConfig {
    /// 从 `SIGNAL_CONFIG_PATH`（默认 `signal_config.json`）加载并应用环境变量
    pub fn load() -> Result<Self, ConfigError> {
        let path = env_or_default("SIGNAL_CONFIG_PATH", DEFAULT_CONFIG_PATH);
        let mut config = Self::load_from_path(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 读取配置文件，文件不存在时使用默认值
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            info!("配置文件 {} 不存在，使用默认配置", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            "已加载配置文件 {}: 扫描间隔 {} 分钟",
            path.display(),
            config.scan_interval_secs / 60
        );
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(url) = env_opt("DISCORD_WEBHOOK_URL") {
            self.discord_webhook_url = url;
        }
        if let Some(dir) = env_opt("RANK_STORE_DIR") {
            self.rank_store_dir = PathBuf::from(dir);
        }
        if let Some(pacing) = env_parse::<u64>("SCAN_PACING_MS") {
            self.pacing_ms = pacing;
        }
        if let Some(base_url) = env_opt("BITHUMB_BASE_URL") {
            self.bithumb_base_url = base_url;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.signal.validate()?;
        if self.scan_interval_secs == 0 {
            return Err(invalid("scan_interval_secs", "必须大于 0"));
        }
        if self.top_coins_count == 0 {
            return Err(invalid("top_coins_count", "必须大于 0"));
        }
        if self.candle_count < self.signal.min_history {
            return Err(invalid(
                "candle_count",
                format!(
                    "不能小于 min_history {}: {}",
                    self.signal.min_history, self.candle_count
                ),
            ));
        }
        Ok(())
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = ScannerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.signal.ma_periods, [9, 25, 99, 200]);
        assert_eq!(config.pacing(), Duration::from_millis(100));
    }

    #[test]
    fn flat_legacy_file_is_accepted() {
        let raw = r#"{
            "rsi_threshold": 50,
            "ma_periods": [5, 20, 60, 120],
            "require_ma_breakout": true,
            "scan_interval": 300,
            "top_coins_count": 50
        }"#;
        let config: ScannerConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.signal.rsi_threshold, 50.0);
        assert_eq!(config.signal.ma_periods, [5, 20, 60, 120]);
        assert_eq!(config.scan_interval_secs, 300);
        assert_eq!(config.top_coins_count, 50);
        // 未出现的字段保持默认
        assert_eq!(config.signal.macd_slow, 26);
        assert_eq!(config.pacing_ms, 100);
    }

    #[test]
    fn ma_periods_must_have_four_entries() {
        let raw = r#"{ "ma_periods": [9, 25, 99] }"#;
        assert!(serde_json::from_str::<ScannerConfig>(raw).is_err());
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut signal = SignalConfig::default();
        signal.ma_periods = [25, 9, 99, 200];
        assert!(matches!(
            signal.validate(),
            Err(ConfigError::Invalid { field: "ma_periods", .. })
        ));

        let mut signal = SignalConfig::default();
        signal.macd_fast = 26;
        assert!(matches!(
            signal.validate(),
            Err(ConfigError::Invalid { field: "macd", .. })
        ));

        let mut signal = SignalConfig::default();
        signal.rsi_threshold = 120.0;
        assert!(signal.validate().is_err());

        let mut config = ScannerConfig::default();
        config.candle_count = 100;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "candle_count", .. })
        ));
    }

    #[test]
    fn missing_file_yields_defaults_and_bad_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert_eq!(
            ScannerConfig::load_from_path(&missing).unwrap(),
            ScannerConfig::default()
        );

        let broken = dir.path().join("broken.json");
        let mut f = std::fs::File::create(&broken).unwrap();
        f.write_all(b"{ not json").unwrap();
        assert!(matches!(
            ScannerConfig::load_from_path(&broken),
            Err(ConfigError::Parse { .. })
        ));
    }
}
