use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::rank_store::{FileRankStore, RankGenerations, RankPersistenceError, RankStore};
use super::rank_table::RankTable;

/// 某个币种的排名及相对上一轮的变化
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RankDelta {
    pub current_rank: Option<u32>,
    /// 上一轮排名 - 当前排名，正数表示排名上升
    pub rank_change: Option<i64>,
}

/// 成交额排名追踪
///
/// `update` 是唯一的写入方，由 `writer` 串行化；读取方拿到的是一份
/// 已发布的 `Arc` 快照，不会看到写了一半的排名。
pub struct RankTracker {
    store: Box<dyn RankStore>,
    published: RwLock<Arc<RankGenerations>>,
    writer: Mutex<()>,
}

impl RankTracker {
    /// 从存储中恢复上次的排名，文件缺失或损坏都按首次运行处理
    pub fn open(store: impl RankStore + 'static) -> Self {
        let generations = match store.load() {
            Ok(Some(generations)) => {
                info!(
                    "已恢复成交额排名: 当前 {} 个币种, 上一轮 {}",
                    generations.current.as_ref().map_or(0, RankTable::len),
                    generations
                        .previous
                        .as_ref()
                        .map_or("无".to_string(), |p| format!("{} 个币种", p.len()))
                );
                generations
            }
            Ok(None) => {
                info!("未找到历史排名，按首次运行处理");
                RankGenerations::default()
            }
            Err(e) => {
                warn!("历史排名不可用，按首次运行处理: {}", e);
                RankGenerations::default()
            }
        };
        Self {
            store: Box::new(store),
            published: RwLock::new(Arc::new(generations)),
            writer: Mutex::new(()),
        }
    }

    pub fn open_dir(dir: impl Into<PathBuf>) -> Self {
        Self::open(FileRankStore::new(dir))
    }

    fn snapshot(&self) -> Arc<RankGenerations> {
        let guard = self
            .published
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&*guard)
    }

    /// 用新的成交额数据生成当前排名，原当前排名降为上一轮
    ///
    /// 落盘失败时返回错误，内存中仍保留之前发布的两代排名。
    pub fn update<S: AsRef<str>>(
        &self,
        rankings: &[(S, f64)],
    ) -> Result<usize, RankPersistenceError> {
        let _writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let table = RankTable::from_rankings(rankings);
        let count = table.len();
        debug!("成交额前5: {:?}", table.top(5));
        let prior = self.snapshot();
        let next = RankGenerations {
            current: Some(table),
            previous: prior.current.clone(),
            updated_at: chrono::Utc::now().timestamp_millis(),
        };

        if let Err(e) = self.store.persist(&next) {
            error!("成交额排名保存失败，保留上一代排名: {}", e);
            return Err(e);
        }

        let mut published = self
            .published
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *published = Arc::new(next);
        info!("成交额排名已更新: {} 个币种", count);
        Ok(count)
    }

    pub fn delta(&self, symbol: &str) -> RankDelta {
        let generations = self.snapshot();
        let current_rank = generations.current.as_ref().and_then(|t| t.rank(symbol));
        let previous_rank = generations.previous.as_ref().and_then(|t| t.rank(symbol));
        let rank_change = match (previous_rank, current_rank) {
            (Some(prev), Some(cur)) => Some(prev as i64 - cur as i64),
            _ => None,
        };
        RankDelta {
            current_rank,
            rank_change,
        }
    }

    pub fn current(&self) -> Option<RankTable> {
        self.snapshot().current.clone()
    }
}
