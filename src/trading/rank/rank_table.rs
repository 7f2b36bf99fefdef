use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// 币种 -> 排名（1 为24小时成交额最高），排名为 1..=N 的排列
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankTable {
    ranks: HashMap<String, u32>,
}

impl RankTable {
    /// 按成交额降序排名
    ///
    /// 稳定排序，成交额相同保持输入顺序；NaN 排在最后。
    /// 同一币种出现多次时只保留排名最靠前的一次，排名保持连续。
    pub fn from_rankings<S: AsRef<str>>(rankings: &[(S, f64)]) -> Self {
        let sort_key = |v: f64| if v.is_nan() { f64::NEG_INFINITY } else { v };
        let mut sorted: Vec<&(S, f64)> = rankings.iter().collect();
        sorted.sort_by(|a, b| sort_key(b.1).total_cmp(&sort_key(a.1)));

        let mut ranks = HashMap::with_capacity(sorted.len());
        for (symbol, _) in sorted {
            let symbol = symbol.as_ref();
            if ranks.contains_key(symbol) {
                continue;
            }
            let rank = ranks.len() as u32 + 1;
            ranks.insert(symbol.to_string(), rank);
        }
        Self { ranks }
    }

    pub fn rank(&self, symbol: &str) -> Option<u32> {
        self.ranks.get(symbol).copied()
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    /// 按排名升序返回前 n 个
    pub fn top(&self, n: usize) -> Vec<(&str, u32)> {
        let mut entries: Vec<(&str, u32)> =
            self.ranks.iter().map(|(s, r)| (s.as_str(), *r)).collect();
        entries.sort_by_key(|(_, r)| *r);
        entries.truncate(n);
        entries
    }

    /// 排名是否恰好为 1..=N 且无重复
    pub fn is_permutation(&self) -> bool {
        let mut seen = vec![false; self.ranks.len()];
        for &rank in self.ranks.values() {
            let idx = rank as usize;
            if idx == 0 || idx > seen.len() || seen[idx - 1] {
                return false;
            }
            seen[idx - 1] = true;
        }
        true
    }
}
