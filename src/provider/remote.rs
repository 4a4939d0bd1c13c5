//! Remote Provider：通过 HTTP 访问人脸服务
//!
//! 三个端点：
//! - `POST {base}/capture`，JSON `{"mode": "passive"|"active"}`；
//!   200 返回图像字节（octet-stream），204 表示用户取消，422 表示模式不支持。
//! - `POST {base}/match`，multipart 两个分片 a / b；200 返回 `{"similarity": 0.87}`。
//! - `GET {base}/health`：就绪探测；initialize 后由后台任务周期刷新 ready 信号。

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::config::ProviderSection;
use crate::core::state::{CaptureMode, FaceImage, Similarity};
use crate::provider::traits::{
    CaptureContext, CaptureOutcome, FaceCaptureLauncher, FaceMatcher, FaceSdkManager,
    ProviderError,
};

#[derive(Debug, Deserialize)]
struct MatchResponse {
    similarity: f32,
}

/// HTTP 后端：同一个实例同时提供捕获、比对与就绪管理
pub struct RemoteProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    health_poll: Duration,
    ready_tx: watch::Sender<bool>,
    /// 当前健康轮询任务的停止开关；重新 initialize 时替换
    poll_guard: Mutex<CancellationToken>,
}

impl RemoteProvider {
    pub fn new(cfg: &ProviderSection) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()?;
        let (ready_tx, _) = watch::channel(false);
        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            health_poll: Duration::from_secs(cfg.health_poll_secs.max(1)),
            ready_tx,
            poll_guard: Mutex::new(CancellationToken::new()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    async fn check_health(client: &Client, url: &str, api_key: Option<&str>) -> bool {
        let mut req = client.get(url);
        if let Some(key) = api_key {
            req = req.bearer_auth(key);
        }
        match req.send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!("Health probe failed: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl FaceCaptureLauncher for RemoteProvider {
    async fn capture(
        &self,
        ctx: &CaptureContext,
        mode: CaptureMode,
    ) -> Result<CaptureOutcome, ProviderError> {
        tracing::debug!("Remote capture ({}) via ctx '{}'", mode.as_str(), ctx.label());
        let resp = self
            .authorize(self.client.post(self.endpoint("capture")))
            .json(&serde_json::json!({ "mode": mode.as_str() }))
            .send()
            .await?;

        match resp.status() {
            StatusCode::OK => {
                let bytes = resp.bytes().await?;
                if bytes.is_empty() {
                    return Err(ProviderError::InvalidResponse(
                        "empty image in capture response".into(),
                    ));
                }
                Ok(CaptureOutcome::Image(FaceImage::new(bytes.to_vec())))
            }
            StatusCode::NO_CONTENT => Ok(CaptureOutcome::Cancelled),
            StatusCode::UNPROCESSABLE_ENTITY => Err(ProviderError::UnsupportedMode(mode)),
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(ProviderError::Capture(format!("status {status}: {body}")))
            }
        }
    }
}

#[async_trait]
impl FaceMatcher for RemoteProvider {
    async fn compare(&self, a: &FaceImage, b: &FaceImage) -> Result<Similarity, ProviderError> {
        tracing::debug!("Remote match: {} vs {} bytes", a.len(), b.len());
        let form = Form::new()
            .part("a", Part::bytes(a.bytes().to_vec()).file_name("a.jpg"))
            .part("b", Part::bytes(b.bytes().to_vec()).file_name("b.jpg"));

        let resp = self
            .authorize(self.client.post(self.endpoint("match")))
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Match(format!("status {status}: {body}")));
        }

        let parsed: MatchResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        if !parsed.similarity.is_finite() {
            return Err(ProviderError::InvalidResponse(format!(
                "similarity is not a finite number: {}",
                parsed.similarity
            )));
        }
        Ok(Similarity::new(parsed.similarity))
    }
}

#[async_trait]
impl FaceSdkManager for RemoteProvider {
    /// 先做一次即时健康检查写入 ready，再启动周期轮询任务。
    /// 健康检查失败不算 init 错误：ready 停在 false，由轮询继续尝试。
    async fn initialize(&self) -> Result<(), ProviderError> {
        let url = self.endpoint("health");
        let ok = Self::check_health(&self.client, &url, self.api_key.as_deref()).await;
        self.ready_tx.send_replace(ok);
        tracing::info!("Remote provider initialize -> ready={}", ok);

        let token = CancellationToken::new();
        {
            let mut guard = self.poll_guard.lock().expect("poll guard poisoned");
            guard.cancel();
            *guard = token.clone();
        }

        let client = self.client.clone();
        let api_key = self.api_key.clone();
        let ready_tx = self.ready_tx.clone();
        let every = self.health_poll;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(every) => {
                        let ok = Self::check_health(&client, &url, api_key.as_deref()).await;
                        ready_tx.send_replace(ok);
                    }
                }
            }
        });
        Ok(())
    }

    fn deinitialize(&self) {
        self.poll_guard.lock().expect("poll guard poisoned").cancel();
        self.ready_tx.send_replace(false);
        tracing::info!("Remote provider deinitialize -> ready=false");
    }

    fn subscribe_ready(&self) -> watch::Receiver<bool> {
        self.ready_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> RemoteProvider {
        let cfg = ProviderSection {
            base_url: "http://127.0.0.1:18080/".to_string(),
            ..ProviderSection::default()
        };
        RemoteProvider::new(&cfg).unwrap()
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let p = provider();
        assert_eq!(p.base_url(), "http://127.0.0.1:18080");
        assert_eq!(p.endpoint("match"), "http://127.0.0.1:18080/match");
        assert_eq!(p.endpoint("/health"), "http://127.0.0.1:18080/health");
    }

    #[tokio::test]
    async fn test_ready_starts_false() {
        let p = provider();
        assert!(!*p.subscribe_ready().borrow());
    }
}
