use anyhow::{anyhow, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::time_util;
use crate::trading::model::{PricePoint, TickerVolume};

pub const STATUS_OK: &str = "0000";

/// `/public/ticker/ALL_KRW` 的外层结构，`data` 中混有一个 `date` 字段
#[derive(Deserialize, Debug)]
pub struct AllTickerResponse {
    pub status: String,
    #[serde(default)]
    pub data: serde_json::Map<String, Value>,
}

/// 单个币种的 ticker，数值字段都是字符串
#[derive(Deserialize, Debug)]
#[allow(non_snake_case)]
pub struct TickerDto {
    pub closing_price: Value,
    pub fluctate_rate_24H: Value,
    pub acc_trade_value_24H: Value,
    #[serde(alias = "units_traded_24H", default)]
    pub acc_trade_volume_24H: Value,
}

/// `/v1/candles/minutes/60` 返回的一根K线
#[derive(Deserialize, Debug)]
pub struct CandleDto {
    pub candle_date_time_kst: String,
    pub opening_price: Value,
    pub high_price: Value,
    pub low_price: Value,
    pub trade_price: Value,
    pub candle_acc_trade_volume: Value,
}

/// 兼容数字和数字字符串两种写法
fn number(field: &str, value: &Value) -> Result<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| anyhow!("字段 {} 不是有效数字: {}", field, value))
}

impl TickerDto {
    pub fn into_ticker(self, symbol: &str) -> Result<TickerVolume> {
        Ok(TickerVolume {
            market: format!("KRW-{}", symbol),
            trade_price: number("closing_price", &self.closing_price)?,
            // 接口给的是百分比
            signed_change_rate: number("fluctate_rate_24H", &self.fluctate_rate_24H)? / 100.0,
            acc_trade_price_24h: number("acc_trade_value_24H", &self.acc_trade_value_24H)?,
            // 成交量只用于展示，缺失时按 0 处理
            acc_trade_volume_24h: match self.acc_trade_volume_24H {
                Value::Null => 0.0,
                ref v => number("acc_trade_volume_24H", v)?,
            },
        })
    }
}

impl CandleDto {
    pub fn into_price_point(self) -> Result<PricePoint> {
        PricePoint::builder()
            .ts(time_util::kst_str_to_millis(&self.candle_date_time_kst)?)
            .o(number("opening_price", &self.opening_price)?)
            .h(number("high_price", &self.high_price)?)
            .l(number("low_price", &self.low_price)?)
            .c(number("trade_price", &self.trade_price)?)
            .v(number("candle_acc_trade_volume", &self.candle_acc_trade_volume)?)
            .build()
    }
}

/// 解析全市场 ticker，无法解析的币种跳过
pub fn parse_all_tickers(body: &str) -> Result<Vec<TickerVolume>> {
    let response: AllTickerResponse = serde_json::from_str(body)?;
    if response.status != STATUS_OK {
        return Err(anyhow!("bithumb 返回状态异常: {}", response.status));
    }
    if response.data.is_empty() {
        return Err(anyhow!("bithumb ticker 数据为空"));
    }

    let mut tickers = Vec::with_capacity(response.data.len());
    for (symbol, info) in response.data {
        if symbol == "date" {
            continue;
        }
        let ticker = serde_json::from_value::<TickerDto>(info)
            .map_err(anyhow::Error::from)
            .and_then(|dto| dto.into_ticker(&symbol));
        match ticker {
            Ok(ticker) => tickers.push(ticker),
            Err(e) => warn!("{} ticker 解析失败，跳过: {}", symbol, e),
        }
    }
    Ok(tickers)
}

/// 解析1小时K线，无法解析的K线跳过
pub fn parse_candles(market: &str, body: &str) -> Result<Vec<PricePoint>> {
    let raw: Vec<Value> = serde_json::from_str(body)
        .map_err(|e| anyhow!("{} K线响应格式错误: {}", market, e))?;
    let mut points = Vec::with_capacity(raw.len());
    for item in raw {
        let point = serde_json::from_value::<CandleDto>(item)
            .map_err(anyhow::Error::from)
            .and_then(CandleDto::into_price_point);
        match point {
            Ok(point) => points.push(point),
            Err(e) => warn!("{} K线解析失败，跳过: {}", market, e),
        }
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_krw_skips_date_and_bad_entries() {
        let body = r#"{
            "status": "0000",
            "data": {
                "BTC": {"closing_price": "90000000", "fluctate_rate_24H": "2.5",
                        "acc_trade_value_24H": "150000000000.5", "units_traded_24H": "1666.1"},
                "XRP": {"closing_price": "abc", "fluctate_rate_24H": "1",
                        "acc_trade_value_24H": "1", "units_traded_24H": "1"},
                "date": "1714540000000"
            }
        }"#;
        let tickers = parse_all_tickers(body).unwrap();
        assert_eq!(tickers.len(), 1);
        let btc = &tickers[0];
        assert_eq!(btc.market, "KRW-BTC");
        assert!((btc.signed_change_rate - 0.025).abs() < 1e-12);
        assert_eq!(btc.acc_trade_volume_24h, 1666.1);
    }

    #[test]
    fn error_status_is_rejected() {
        let body = r#"{"status": "5600", "message": "maintenance"}"#;
        assert!(parse_all_tickers(body).is_err());
    }

    #[test]
    fn candles_are_parsed_from_numbers() {
        let body = r#"[
            {"market": "KRW-BTC", "candle_date_time_kst": "2024-05-01T13:00:00",
             "opening_price": 100.0, "high_price": 110.0, "low_price": 95.0,
             "trade_price": 105.0, "candle_acc_trade_volume": 12.5},
            {"market": "KRW-BTC", "candle_date_time_kst": "2024-05-01T12:00:00",
             "opening_price": 100.0, "high_price": 90.0, "low_price": 95.0,
             "trade_price": 105.0, "candle_acc_trade_volume": 1.0}
        ]"#;
        let points = parse_candles("KRW-BTC", body).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].c(), 105.0);
        assert_eq!(points[0].ts(), time_util::kst_str_to_millis("2024-05-01T13:00:00").unwrap());
    }
}
