use thiserror::Error;

use crate::app_config::ConfigError;
use crate::trading::rank::RankPersistenceError;

pub type Result<T> = std::result::Result<T, AppError>;

/// 应用错误
///
/// 领域内的错误（指标、条件、排名持久化）各自有独立的类型，
/// 这里只负责在应用层汇总。
#[derive(Error, Debug)]
pub enum AppError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 排名快照持久化失败
    #[error("排名持久化错误: {0}")]
    RankPersistence(#[from] RankPersistenceError),

    /// 行情接口或通知接口失败
    #[error("外部服务错误 [{service}]: {message}")]
    ExternalCollaborator {
        service: &'static str,
        message: String,
    },
}

impl AppError {
    pub fn external(service: &'static str, err: impl std::fmt::Display) -> Self {
        AppError::ExternalCollaborator {
            service,
            message: err.to_string(),
        }
    }
}
