//! 成交额排名追踪：当前/上一轮两代排名表及排名变动

pub mod rank_store;
pub mod rank_table;
pub mod rank_tracker;

pub use rank_store::{FileRankStore, RankGenerations, RankPersistenceError, RankStore};
pub use rank_table::RankTable;
pub use rank_tracker::{RankDelta, RankTracker};
