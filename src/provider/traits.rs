//! 人脸能力抽象
//!
//! 三个独立能力（捕获 / 比对 / 就绪管理）+ 媒体选图，各自成 trait：
//! 一个后端可以只换其中一种实现。编排器只面向这些契约编程，从不分支判断具体后端。

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;

use crate::core::state::{CaptureMode, FaceImage, Similarity};

/// 捕获所需的平台上下文；编排器原样转发、从不检视内容
#[derive(Clone, Debug)]
pub struct CaptureContext(String);

impl CaptureContext {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn label(&self) -> &str {
        &self.0
    }
}

/// 能力层错误；文本最终透传到 SessionState.error
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider init failed: {0}")]
    Init(String),

    #[error("Face capture failed: {0}")]
    Capture(String),

    #[error("Face match failed: {0}")]
    Match(String),

    #[error("Media pick failed: {0}")]
    Pick(String),

    /// Active 模式必须可表达、可拒绝（并非所有后端都支持活体挑战）
    #[error("Capture mode '{}' not supported by this provider", .0.as_str())]
    UnsupportedMode(CaptureMode),

    #[error("Face service error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected face service response: {0}")]
    InvalidResponse(String),

    #[error("Image I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// 捕获结果：取消是带标签的正常结束，不是失败（避免靠字符串嗅探区分）
#[derive(Clone, Debug)]
pub enum CaptureOutcome {
    Image(FaceImage),
    Cancelled,
}

/// 捕获能力：拉起后端的捕获流程，恰好完成一次
#[async_trait]
pub trait FaceCaptureLauncher: Send + Sync {
    async fn capture(
        &self,
        ctx: &CaptureContext,
        mode: CaptureMode,
    ) -> Result<CaptureOutcome, ProviderError>;
}

/// 比对能力：对两张图像计算相似度，恰好完成一次。
/// 单飞行约束保证它不会与自身或捕获在同一会话上并发。
#[async_trait]
pub trait FaceMatcher: Send + Sync {
    async fn compare(&self, a: &FaceImage, b: &FaceImage) -> Result<Similarity, ProviderError>;
}

/// 后端生命周期与就绪信号：init / deinit + 持续可观察的 ready 布尔。
/// 初始值可以是 false，订阅方必须能在第一次通知到来前正确渲染当前值。
#[async_trait]
pub trait FaceSdkManager: Send + Sync {
    async fn initialize(&self) -> Result<(), ProviderError>;

    fn deinitialize(&self);

    fn subscribe_ready(&self) -> watch::Receiver<bool>;
}

/// 媒体选图：不依赖识别后端；None 表示用户取消（区别于失败）
#[async_trait]
pub trait MediaPicker: Send + Sync {
    async fn pick_image(&self) -> Result<Option<FaceImage>, ProviderError>;
}
