use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::rank_table::RankTable;

pub const RANK_FILE_NAME: &str = "volume_rank.json";
const STAGING_SUFFIX: &str = ".tmp";

#[derive(Error, Debug)]
pub enum RankPersistenceError {
    #[error("排名文件 {path} 读写失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("排名序列化失败: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("排名文件 {path} 内容损坏: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl RankPersistenceError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// 当前代与上一代排名，作为一个整体落盘
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankGenerations {
    pub current: Option<RankTable>,
    pub previous: Option<RankTable>,
    /// 毫秒时间戳
    pub updated_at: i64,
}

/// 排名存储
pub trait RankStore: Send + Sync {
    /// 读取最近一次落盘的两代排名，从未写过时返回 None
    fn load(&self) -> Result<Option<RankGenerations>, RankPersistenceError>;

    /// 整体替换两代排名，要么写入成功，要么保持旧内容
    fn persist(&self, generations: &RankGenerations) -> Result<(), RankPersistenceError>;
}

/// JSON 文件存储：先写 `volume_rank.json.tmp` 并 fsync，再 rename 覆盖正式文件
///
/// 同步 IO，在异步扫描里直接调用。每轮只写一次、文件只有几 KB，
/// 阻塞时间可以接受，不单独放进 `spawn_blocking`。
#[derive(Debug, Clone)]
pub struct FileRankStore {
    dir: PathBuf,
}

impl FileRankStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(RANK_FILE_NAME)
    }

    pub fn staging_path(&self) -> PathBuf {
        self.dir.join(format!("{}{}", RANK_FILE_NAME, STAGING_SUFFIX))
    }
}

impl RankStore for FileRankStore {
    fn load(&self) -> Result<Option<RankGenerations>, RankPersistenceError> {
        let path = self.path();
        // 残留的 .tmp 文件是未完成的写入，直接忽略
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RankPersistenceError::io(&path, e)),
        };
        let generations = serde_json::from_str(&content)
            .map_err(|source| RankPersistenceError::Corrupt { path, source })?;
        Ok(Some(generations))
    }

    fn persist(&self, generations: &RankGenerations) -> Result<(), RankPersistenceError> {
        fs::create_dir_all(&self.dir).map_err(|e| RankPersistenceError::io(&self.dir, e))?;

        let bytes = serde_json::to_vec_pretty(generations)?;
        let staging = self.staging_path();
        {
            let mut file =
                File::create(&staging).map_err(|e| RankPersistenceError::io(&staging, e))?;
            file.write_all(&bytes)
                .map_err(|e| RankPersistenceError::io(&staging, e))?;
            file.sync_all()
                .map_err(|e| RankPersistenceError::io(&staging, e))?;
        }

        let path = self.path();
        fs::rename(&staging, &path).map_err(|e| RankPersistenceError::io(&path, e))?;

        // 目录 fsync 让 rename 本身落盘，部分平台不支持打开目录，失败忽略
        if let Ok(dir) = File::open(&self.dir) {
            let _ = dir.sync_all();
        }
        debug!("排名已写入 {}", path.display());
        Ok(())
    }
}
