//! 会话编排器：单飞行异步命令 + 就绪镜像 + watch 状态发布
//!
//! 所有状态变更都经由 `watch::Sender::send_modify` 串行落盘（单写者），
//! 观察者按产生顺序看到每一次替换后的完整快照。
//! 单飞行不是展示用的布尔位，而是真实的容量 1 信号量：
//! 飞行中到来的命令被同步拒绝（写入前置条件错误），绝不排队。

use std::sync::Arc;

use tokio::sync::{watch, Semaphore, TryAcquireError};
use tokio_util::sync::CancellationToken;

use crate::core::error::SessionError;
use crate::core::state::{CaptureMode, SessionState};
use crate::provider::{
    CaptureContext, CaptureOutcome, FaceCaptureLauncher, FaceMatcher, MediaPicker, ProviderSet,
};

/// 单个识别会话的编排器
///
/// 生命周期：构造时订阅 Provider 就绪信号并立即镜像当前值；
/// `shutdown()`（或 Drop）停止订阅。状态不做任何持久化。
pub struct Session {
    state: watch::Sender<SessionState>,
    /// 单飞行闸门：容量 1，try_acquire 失败即拒绝
    flight: Arc<Semaphore>,
    capture: Arc<dyn FaceCaptureLauncher>,
    matcher: Arc<dyn FaceMatcher>,
    picker: Arc<dyn MediaPicker>,
    teardown: CancellationToken,
}

impl Session {
    /// 创建会话：空状态 + 初始捕获模式，并启动就绪镜像任务。
    ///
    /// 就绪的当前值在构造内同步写入（首次通知到来之前状态就正确），
    /// 之后的每次变化由后台任务跟随，直到 teardown。
    pub fn new(providers: ProviderSet, picker: Arc<dyn MediaPicker>, mode: CaptureMode) -> Self {
        let mut ready_rx = providers.manager.subscribe_ready();
        let initial = SessionState {
            provider_ready: *ready_rx.borrow_and_update(),
            capture_mode: mode,
            ..SessionState::default()
        };
        let (state, _) = watch::channel(initial);

        let teardown = CancellationToken::new();
        let token = teardown.clone();
        let mirror = state.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    changed = ready_rx.changed() => {
                        if changed.is_err() {
                            // Provider 端关闭了就绪通道，保持最后已知值
                            break;
                        }
                        let ready = *ready_rx.borrow_and_update();
                        tracing::info!("Provider readiness -> {}", ready);
                        mirror.send_modify(|s| s.provider_ready = ready);
                    }
                }
            }
        });

        Self {
            state,
            flight: Arc::new(Semaphore::new(1)),
            capture: providers.capture,
            matcher: providers.matcher,
            picker,
            teardown,
        }
    }

    /// 订阅状态流；接收端始终能 borrow 到最新快照
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// 当前快照（只读副本）
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// 切换捕获模式：纯状态更新，总是成功，不碰其它字段
    pub fn set_capture_mode(&self, mode: CaptureMode) {
        self.state.send_modify(|s| s.capture_mode = mode);
    }

    /// 通过 Provider 的捕获流程取一张脸。
    ///
    /// 前置条件：provider_ready 且不 busy；违例时同步写入错误、不产生 busy 跳变。
    /// ctx 是平台上下文，原样转发给 Provider。
    /// 成功的图像按 A→B 填槽（两槽已满则丢弃）；取消写入软性提示；失败透传错误文本。
    pub async fn request_capture(&self, ctx: &CaptureContext) {
        let Some(_permit) = self.try_enter_flight("request_capture") else {
            return;
        };

        if !self.state.borrow().provider_ready {
            tracing::warn!("request_capture rejected: provider not ready");
            self.state
                .send_modify(|s| s.error = Some(SessionError::NotReady.to_string()));
            return;
        }

        let mode = self.state.borrow().capture_mode;
        self.state.send_modify(|s| {
            s.busy = true;
            s.error = None;
        });

        let result = self.capture.capture(ctx, mode).await;

        self.state.send_modify(|s| {
            s.busy = false;
            match result {
                Ok(CaptureOutcome::Image(image)) => {
                    tracing::info!("Capture ok ({} bytes)", image.len());
                    s.fill_slot(image);
                }
                Ok(CaptureOutcome::Cancelled) => {
                    // 捕获界面由 Provider 控制，取消也要有回声，不能无声丢弃
                    tracing::info!("Capture cancelled by user");
                    s.error = Some(SessionError::CaptureCancelled.to_string());
                }
                Err(e) => {
                    tracing::warn!("Capture failed: {}", e);
                    s.error = Some(SessionError::from(e).to_string());
                }
            }
        });
    }

    /// 从媒体库取一张脸。
    ///
    /// 只要求不 busy（选图不依赖识别后端，就绪与否无关）。
    /// 用户取消（picker 返回 None）是安静的 no-op：不写错误、不动槽位。
    pub async fn request_acquire_from_gallery(&self) {
        let Some(_permit) = self.try_enter_flight("request_acquire_from_gallery") else {
            return;
        };

        self.state.send_modify(|s| {
            s.busy = true;
            s.error = None;
        });

        let result = self.picker.pick_image().await;

        self.state.send_modify(|s| {
            s.busy = false;
            match result {
                Ok(Some(image)) => {
                    tracing::info!("Gallery pick ok ({} bytes)", image.len());
                    s.fill_slot(image);
                }
                Ok(None) => {
                    tracing::info!("Gallery pick cancelled by user");
                }
                Err(e) => {
                    tracing::warn!("Gallery pick failed: {}", e);
                    s.error = Some(SessionError::from(e).to_string());
                }
            }
        });
    }

    /// 比较两个槽位的图像。
    ///
    /// 前置条件：provider_ready、两槽已填、不 busy；任何违例都同步写入
    /// 前置条件错误（不派发异步、不产生 busy 跳变）。
    /// 成功与失败互斥：成功时 similarity=Some 且 error=None，
    /// 失败时 error=Some 且 similarity=None。
    pub async fn compare(&self) {
        let Some(_permit) = self.try_enter_flight("compare") else {
            return;
        };

        if !self.state.borrow().provider_ready {
            tracing::warn!("compare rejected: provider not ready");
            self.state
                .send_modify(|s| s.error = Some(SessionError::NotReady.to_string()));
            return;
        }

        let (a, b) = {
            let snapshot = self.state.borrow();
            (snapshot.face_a.clone(), snapshot.face_b.clone())
        };
        let (Some(a), Some(b)) = (a, b) else {
            tracing::warn!("compare rejected: need two images");
            self.state
                .send_modify(|s| s.error = Some(SessionError::TwoImagesRequired.to_string()));
            return;
        };

        self.state.send_modify(|s| {
            s.busy = true;
            s.error = None;
            s.similarity = None;
        });

        let result = self.matcher.compare(&a, &b).await;

        self.state.send_modify(|s| {
            s.busy = false;
            match result {
                Ok(similarity) => {
                    tracing::info!(
                        "Match ok: score={:.4} ({}%)",
                        similarity.score(),
                        similarity.percent()
                    );
                    s.similarity = Some(similarity);
                    s.error = None;
                }
                Err(e) => {
                    tracing::warn!("Match failed: {}", e);
                    s.error = Some(SessionError::from(e).to_string());
                    s.similarity = None;
                }
            }
        });
    }

    /// 重置流程：清空两个槽位、比较结果与错误。
    ///
    /// 无前置条件、同步完成、幂等。capture_mode / provider_ready / busy 不动；
    /// busy 期间调用合法，但不取消飞行中的操作——其回调最终仍会落到当时的状态上
    /// （接受陈旧写入；更严格的世代戳方案见 DESIGN.md）。
    pub fn reset(&self) {
        self.state.send_modify(|s| {
            s.face_a = None;
            s.face_b = None;
            s.similarity = None;
            s.error = None;
        });
    }

    /// 停止就绪镜像订阅；之后会话仍可读快照，但不再跟随 Provider
    pub fn shutdown(&self) {
        self.teardown.cancel();
    }

    /// 进入单飞行区；失败（已有操作在飞行中）时写入 Busy 前置条件错误
    fn try_enter_flight(&self, command: &str) -> Option<tokio::sync::OwnedSemaphorePermit> {
        match self.flight.clone().try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(TryAcquireError::NoPermits) => {
                tracing::warn!("{} rejected: another operation in flight", command);
                self.state
                    .send_modify(|s| s.error = Some(SessionError::Busy.to_string()));
                None
            }
            Err(TryAcquireError::Closed) => {
                // 信号量由会话独占，不会被关闭
                tracing::error!("flight semaphore closed unexpectedly");
                None
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.teardown.cancel();
    }
}
