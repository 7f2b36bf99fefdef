use serde::{Deserialize, Serialize};

/// 单根K线（OHLCV），构建后不可变
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct PricePoint {
    ts: i64,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: f64,
}

impl PricePoint {
    pub fn builder() -> PricePointBuilder {
        PricePointBuilder::new()
    }
    pub fn ts(&self) -> i64 {
        self.ts
    }
    pub fn o(&self) -> f64 {
        self.o
    }
    pub fn h(&self) -> f64 {
        self.h
    }
    pub fn l(&self) -> f64 {
        self.l
    }
    pub fn c(&self) -> f64 {
        self.c
    }
    pub fn v(&self) -> f64 {
        self.v
    }
}

#[derive(Debug, Default)]
pub struct PricePointBuilder {
    o: Option<f64>,
    h: Option<f64>,
    l: Option<f64>,
    c: Option<f64>,
    v: Option<f64>,
    ts: Option<i64>,
}

impl PricePointBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn ts(mut self, val: i64) -> Self {
        self.ts = Some(val);
        self
    }
    pub fn o(mut self, val: f64) -> Self {
        self.o = Some(val);
        self
    }
    pub fn h(mut self, val: f64) -> Self {
        self.h = Some(val);
        self
    }
    pub fn l(mut self, val: f64) -> Self {
        self.l = Some(val);
        self
    }
    pub fn c(mut self, val: f64) -> Self {
        self.c = Some(val);
        self
    }
    pub fn v(mut self, val: f64) -> Self {
        self.v = Some(val);
        self
    }

    /// 收盘价即 OHLC 四价（平盘K线），测试与合成数据常用
    pub fn flat(self, price: f64) -> Self {
        self.o(price).h(price).l(price).c(price)
    }

    pub fn build(self) -> anyhow::Result<PricePoint> {
        if let (Some(o), Some(h), Some(l), Some(c), Some(v), Some(ts)) =
            (self.o, self.h, self.l, self.c, self.v, self.ts)
        {
            let finite = [o, h, l, c, v].iter().all(|x| x.is_finite());
            if finite
                && l <= o
                && l <= c
                && l <= h
                && h >= o
                && h >= c
                && v >= 0.0
                && l >= 0.0
            {
                Ok(PricePoint { ts, o, h, l, c, v })
            } else {
                Err(anyhow::anyhow!(
                    "PricePointInvalid: ts={} o={} h={} l={} c={} v={}",
                    ts,
                    o,
                    h,
                    l,
                    c,
                    v
                ))
            }
        } else {
            Err(anyhow::anyhow!("PricePointIncomplete"))
        }
    }
}

/// 按时间升序排列的K线序列
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// 按时间戳升序排序（稳定排序，相同时间戳保持原顺序）
    pub fn new(mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.ts);
        Self { points }
    }

    /// 仅由收盘价构造，时间戳按小时递增，主要用于测试与离线计算
    pub fn from_closes(closes: &[f64]) -> anyhow::Result<Self> {
        const HOUR_MS: i64 = 3_600_000;
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PricePoint::builder().ts(i as i64 * HOUR_MS).flat(c).v(0.0).build())
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self { points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.c).collect()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }
}
