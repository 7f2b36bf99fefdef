use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tracing::{debug, info, warn};

use super::dto;
use crate::trading::model::{PricePoint, TickerVolume};
use crate::trading::traits::MarketDataSource;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RETRIES: usize = 3;

/// Bithumb 公共行情接口，无需签名
pub struct BithumbClient {
    client: Client,
    base_url: String,
}

impl BithumbClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| anyhow!("创建 HTTP 客户端失败: {}", e))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn send_get(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header("accept", "application/json")
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::OK {
            return Err(anyhow!("请求失败 {}: {} {}", url, status, body));
        }
        Ok(body)
    }

    /// GET 请求，网络错误和非 200 响应按指数退避重试
    async fn get_with_retry(&self, path: &str) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        let strategy = ExponentialBackoff::from_millis(200)
            .max_delay(Duration::from_secs(2))
            .map(jitter)
            .take(MAX_RETRIES);
        let url = url.as_str();
        Retry::start(strategy, move || async move {
            self.send_get(url).await.map_err(|e| {
                warn!("bithumb 请求失败，准备重试: {}", e);
                e
            })
        })
        .await
    }
}

#[async_trait]
impl MarketDataSource for BithumbClient {
    async fn fetch_volume_rankings(&self) -> Result<Vec<TickerVolume>> {
        let body = self.get_with_retry("/public/ticker/ALL_KRW").await?;
        let tickers = dto::parse_all_tickers(&body)?;
        info!("bithumb ALL_KRW: {} 个币种", tickers.len());
        Ok(tickers)
    }

    async fn fetch_candles(&self, symbol: &str, count: usize) -> Result<Vec<PricePoint>> {
        let path = format!("/v1/candles/minutes/60?market={}&count={}", symbol, count);
        let body = self.get_with_retry(&path).await?;
        let points = dto::parse_candles(symbol, &body)?;
        debug!("{} 1小时K线 {} 根", symbol, points.len());
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn server_errors_are_retried_then_reported() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(
                        b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                    )
                    .await;
            }
        });

        let client = BithumbClient::new(format!("http://{}", addr)).unwrap();
        let result = client.fetch_volume_rankings().await;
        assert!(result.is_err());
        // 首次请求加 MAX_RETRIES 次重试
        assert_eq!(hits.load(Ordering::SeqCst), 1 + MAX_RETRIES);
    }
}
