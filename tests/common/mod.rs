#![allow(dead_code)]

use signal_scanner::trading::model::{PricePoint, PriceSeries};

pub const HOUR_MS: i64 = 3_600_000;

pub fn candles(closes: &[f64]) -> Vec<PricePoint> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            PricePoint::builder()
                .ts(1_714_500_000_000 + i as i64 * HOUR_MS)
                .flat(c)
                .v(10.0)
                .build()
                .unwrap()
        })
        .collect()
}

pub fn series(closes: &[f64]) -> PriceSeries {
    PriceSeries::new(candles(closes))
}

/// 横盘 `flat_len` 根后，用 `rise_len` 根线性拉升到 `target`
pub fn flat_then_rise(flat_len: usize, rise_len: usize, base: f64, target: f64) -> Vec<f64> {
    let mut closes = vec![base; flat_len];
    closes.extend((1..=rise_len).map(|k| base + (target - base) * k as f64 / rise_len as f64));
    closes
}

/// 220 根：横盘 211 根后 9 根拉升到 110，满足全部条件
///
/// 拉升超过 9 根时窗口起点已经完成交叉，见 `ten_bar_rally_is_already_crossed_at_window_start`
pub fn breakout_closes() -> Vec<f64> {
    flat_then_rise(211, 9, 100.0, 110.0)
}

/// 确定性的震荡序列
pub fn wavy_closes(len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| {
            let x = i as f64;
            100.0 + 5.0 * (x * 0.3).sin() + 2.0 * (x * 0.07).cos() + x * 0.02
        })
        .collect()
}
