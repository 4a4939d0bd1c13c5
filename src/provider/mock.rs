//! Mock Provider（用于测试与无后端演示）
//!
//! 捕获 / 比对 / 选图结果均可预先编排（VecDeque 脚本）；脚本耗尽时落到
//! 确定性的默认行为：捕获返回 100 字节的占位图，比对返回满分，选图返回取消。
//! 可选 latency 用于在测试中制造真实的飞行窗口。

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::core::state::{CaptureMode, FaceImage, Similarity};
use crate::provider::traits::{
    CaptureContext, CaptureOutcome, FaceCaptureLauncher, FaceMatcher, FaceSdkManager, MediaPicker,
    ProviderError,
};

/// 脚本化的人脸后端：同时实现捕获、比对与就绪管理
pub struct MockFaceProvider {
    ready_tx: watch::Sender<bool>,
    captures: Mutex<VecDeque<Result<CaptureOutcome, ProviderError>>>,
    matches: Mutex<VecDeque<Result<Similarity, ProviderError>>>,
    /// 最近一次捕获收到的 (上下文标签, 模式)，供测试断言转发是否正确
    last_capture: Mutex<Option<(String, CaptureMode)>>,
    latency: Option<Duration>,
}

impl MockFaceProvider {
    pub fn new() -> Self {
        let (ready_tx, _) = watch::channel(false);
        Self {
            ready_tx,
            captures: Mutex::new(VecDeque::new()),
            matches: Mutex::new(VecDeque::new()),
            last_capture: Mutex::new(None),
            latency: None,
        }
    }

    /// 每次能力调用前 sleep 指定时长，制造可观察的 busy 窗口
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// 直接驱动就绪信号（绕过 initialize，模拟后端中途掉线/恢复）
    pub fn set_ready(&self, ready: bool) {
        self.ready_tx.send_replace(ready);
    }

    pub fn push_capture(&self, outcome: Result<CaptureOutcome, ProviderError>) {
        self.captures.lock().expect("capture script poisoned").push_back(outcome);
    }

    pub fn push_match(&self, outcome: Result<Similarity, ProviderError>) {
        self.matches.lock().expect("match script poisoned").push_back(outcome);
    }

    pub fn last_capture(&self) -> Option<(String, CaptureMode)> {
        self.last_capture.lock().expect("last_capture poisoned").clone()
    }

    /// 占位图：100 个零字节
    pub fn dummy_image() -> FaceImage {
        FaceImage::new(vec![0u8; 100])
    }

    async fn apply_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

impl Default for MockFaceProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FaceCaptureLauncher for MockFaceProvider {
    async fn capture(
        &self,
        ctx: &CaptureContext,
        mode: CaptureMode,
    ) -> Result<CaptureOutcome, ProviderError> {
        *self.last_capture.lock().expect("last_capture poisoned") =
            Some((ctx.label().to_string(), mode));
        self.apply_latency().await;
        let scripted = self.captures.lock().expect("capture script poisoned").pop_front();
        scripted.unwrap_or_else(|| Ok(CaptureOutcome::Image(Self::dummy_image())))
    }
}

#[async_trait]
impl FaceMatcher for MockFaceProvider {
    async fn compare(&self, _a: &FaceImage, _b: &FaceImage) -> Result<Similarity, ProviderError> {
        self.apply_latency().await;
        let scripted = self.matches.lock().expect("match script poisoned").pop_front();
        scripted.unwrap_or_else(|| Ok(Similarity::new(1.0)))
    }
}

#[async_trait]
impl FaceSdkManager for MockFaceProvider {
    async fn initialize(&self) -> Result<(), ProviderError> {
        self.ready_tx.send_replace(true);
        Ok(())
    }

    fn deinitialize(&self) {
        self.ready_tx.send_replace(false);
    }

    fn subscribe_ready(&self) -> watch::Receiver<bool> {
        self.ready_tx.subscribe()
    }
}

/// 脚本化选图器：队列耗尽时视为用户取消
pub struct MockMediaPicker {
    picks: Mutex<VecDeque<Result<Option<FaceImage>, ProviderError>>>,
}

impl MockMediaPicker {
    pub fn new() -> Self {
        Self {
            picks: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push_pick(&self, outcome: Result<Option<FaceImage>, ProviderError>) {
        self.picks.lock().expect("pick script poisoned").push_back(outcome);
    }
}

impl Default for MockMediaPicker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaPicker for MockMediaPicker {
    async fn pick_image(&self) -> Result<Option<FaceImage>, ProviderError> {
        let scripted = self.picks.lock().expect("pick script poisoned").pop_front();
        scripted.unwrap_or(Ok(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_defaults() {
        let provider = MockFaceProvider::new();
        let ctx = CaptureContext::new("test");

        let outcome = provider.capture(&ctx, CaptureMode::Passive).await.unwrap();
        assert!(matches!(outcome, CaptureOutcome::Image(img) if img.len() == 100));

        let a = MockFaceProvider::dummy_image();
        let b = MockFaceProvider::dummy_image();
        let sim = provider.compare(&a, &b).await.unwrap();
        assert_eq!(sim.percent(), 100);

        let picker = MockMediaPicker::new();
        assert!(picker.pick_image().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mock_scripts_run_in_order() {
        let provider = MockFaceProvider::new();
        provider.push_capture(Ok(CaptureOutcome::Cancelled));
        provider.push_capture(Err(ProviderError::Capture("camera gone".into())));

        let ctx = CaptureContext::new("test");
        assert!(matches!(
            provider.capture(&ctx, CaptureMode::Passive).await,
            Ok(CaptureOutcome::Cancelled)
        ));
        assert!(provider.capture(&ctx, CaptureMode::Passive).await.is_err());
        assert_eq!(
            provider.last_capture(),
            Some(("test".to_string(), CaptureMode::Passive))
        );
    }

    #[tokio::test]
    async fn test_mock_readiness_lifecycle() {
        let provider = MockFaceProvider::new();
        let rx = provider.subscribe_ready();
        assert!(!*rx.borrow());

        provider.initialize().await.unwrap();
        assert!(*rx.borrow());

        provider.deinitialize();
        assert!(!*rx.borrow());
    }
}
