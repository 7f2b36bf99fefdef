use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, info};

use crate::time_util;
use crate::trading::model::TickerVolume;
use crate::trading::rank::RankDelta;
use crate::trading::traits::{SignalAlert, SignalNotifier};

const EMBED_COLOR_SIGNAL: u32 = 0x00ff41;
const EMBED_COLOR_TEST: u32 = 0x3498db;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const THUMBNAIL_URL: &str = "https://cdn-icons-png.flaticon.com/512/1055/1055673.png";

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("webhook 地址未配置")]
    NotConfigured,
    #[error("webhook 请求失败: {0}")]
    Http(#[from] reqwest::Error),
    #[error("webhook 返回异常状态 {status}: {body}")]
    Rejected { status: StatusCode, body: String },
}

/// 附加指标
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdditionalMetrics {
    /// 相对 BTC 的24小时涨跌幅差（百分点）
    pub relative_strength: f64,
    /// 成交量比例估算（%），限制在 50-500
    pub volume_ratio: f64,
}

pub fn calculate_additional_metrics(
    coin: &TickerVolume,
    btc: Option<&TickerVolume>,
) -> AdditionalMetrics {
    let coin_change = coin.signed_change_rate * 100.0;
    let btc_change = btc.map_or(0.0, |b| b.signed_change_rate * 100.0);
    let relative_strength = coin_change - btc_change;
    let volume_ratio = (150.0 + relative_strength * 5.0).clamp(50.0, 500.0);
    AdditionalMetrics {
        relative_strength,
        volume_ratio,
    }
}

pub fn format_rank_change_text(delta: &RankDelta) -> String {
    let Some(rank) = delta.current_rank else {
        return "volume rank n/a".to_string();
    };
    match delta.rank_change {
        None => format!("volume rank #{}", rank),
        Some(change) if change > 0 => format!("volume rank #{} (↑{})", rank, change),
        Some(change) if change < 0 => format!("volume rank #{} (↓{})", rank, change.abs()),
        Some(_) => format!("volume rank #{} (→)", rank),
    }
}

/// 成交额以亿为单位显示
fn format_volume(value: f64) -> String {
    format!("{:.0}억", value / 100_000_000.0)
}

/// 整数部分加千分位
fn format_price(value: f64) -> String {
    let rounded = format!("{:.0}", value.abs());
    let mut grouped = String::with_capacity(rounded.len() + rounded.len() / 3);
    for (i, ch) in rounded.chars().enumerate() {
        if i > 0 && (rounded.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0.0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// 构造信号消息的 embed
pub fn build_signal_embed(alert: &SignalAlert, detected_at: &str) -> Value {
    let ticker = &alert.ticker;
    let snapshot = &alert.snapshot;
    let conditions = &snapshot.conditions;
    let satisfied = conditions.satisfied_count();
    let strength = if satisfied == 5 { "strong" } else { "moderate" };
    let metrics = calculate_additional_metrics(ticker, alert.btc.as_ref());

    let ma_position = match snapshot.ma25 {
        Some(ma25) if snapshot.current_price > ma25 => "above MA25",
        Some(_) => "below MA25",
        None => "MA25 n/a",
    };
    let breakout = if conditions.ma_breakout { "confirmed" } else { "pending" };
    let macd = if conditions.macd_golden_cross {
        "above signal"
    } else {
        "below signal"
    };
    let rsi = snapshot
        .rsi
        .map_or("n/a".to_string(), |rsi| format!("{:.1}", rsi));

    json!({
        "embeds": [{
            "title": "🚀 Buying pressure detected",
            "color": EMBED_COLOR_SIGNAL,
            "fields": [
                {
                    "name": "📊 Coin",
                    "value": format!(
                        "**{}** ({})\n💰 **Price:** {} KRW\n📈 **24h value:** {}",
                        ticker.coin_name(),
                        ticker.market,
                        format_price(ticker.trade_price),
                        format_volume(ticker.acc_trade_price_24h)
                    ),
                    "inline": true
                },
                {
                    "name": "🔥 Signal strength",
                    "value": format!("🟢 **{}**\nConditions met: {}/5", strength, satisfied),
                    "inline": true
                },
                {
                    "name": "📈 Technicals",
                    "value": format!(
                        "📊 **Moving averages:** {}\n📈 **MA breakout:** {}\n⚡ **MACD:** {}\n📊 **RSI:** {}",
                        ma_position, breakout, macd, rsi
                    ),
                    "inline": false
                },
                {
                    "name": "📈 Detail",
                    "value": format!("📊 {}", format_rank_change_text(&alert.rank)),
                    "inline": false
                },
                {
                    "name": "Extra",
                    "value": format!(
                        "- Relative strength vs BTC: {:+.1}%\n- Volume ratio estimate: {:.0}%",
                        metrics.relative_strength, metrics.volume_ratio
                    ),
                    "inline": false
                }
            ],
            "footer": { "text": format!("Detected at {}", detected_at) },
            "thumbnail": { "url": THUMBNAIL_URL }
        }]
    })
}

/// Discord webhook 通知
pub struct DiscordWebhook {
    client: Client,
    webhook_url: String,
}

impl DiscordWebhook {
    pub fn new(webhook_url: impl Into<String>) -> Result<Self, NotifyError> {
        Self::with_timeout(webhook_url, REQUEST_TIMEOUT)
    }

    /// 请求超时即失败，避免卡住整轮扫描
    pub fn with_timeout(
        webhook_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            webhook_url: webhook_url.into(),
        })
    }

    pub fn is_configured(&self) -> bool {
        !self.webhook_url.trim().is_empty()
    }

    async fn post(&self, payload: &Value) -> Result<(), NotifyError> {
        if !self.is_configured() {
            return Err(NotifyError::NotConfigured);
        }
        let response = self
            .client
            .post(&self.webhook_url)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT || status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            error!("Discord webhook 发送失败: {} - {}", status, body);
            Err(NotifyError::Rejected { status, body })
        }
    }

    /// 发送测试消息，确认 webhook 可用
    pub async fn send_test_message(&self) -> Result<(), NotifyError> {
        let payload = json!({
            "embeds": [{
                "title": "🧪 Test message",
                "description": "Bithumb signal scanner is up and running.",
                "color": EMBED_COLOR_TEST,
                "footer": { "text": format!("⏰ {}", time_util::now_kst_string()) }
            }]
        });
        self.post(&payload).await?;
        info!("📨 测试消息发送成功");
        Ok(())
    }
}

#[async_trait]
impl SignalNotifier for DiscordWebhook {
    async fn send_signal_alert(&self, alert: &SignalAlert) -> Result<(), NotifyError> {
        let payload = build_signal_embed(alert, &time_util::now_kst_string());
        self.post(&payload).await?;
        info!("📨 {} 信号通知已发送", alert.ticker.market);
        Ok(())
    }
}
