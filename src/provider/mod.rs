//! Provider 层：能力抽象与实现（Remote / Mock）、文件系统选图器、启动期后端选择

use std::sync::Arc;

pub mod fs;
pub mod mock;
pub mod remote;
pub mod traits;

pub use fs::FsMediaPicker;
pub use mock::{MockFaceProvider, MockMediaPicker};
pub use remote::RemoteProvider;
pub use traits::{
    CaptureContext, CaptureOutcome, FaceCaptureLauncher, FaceMatcher, FaceSdkManager, MediaPicker,
    ProviderError,
};

use crate::config::AppConfig;

/// 一次进程运行绑定的能力组合；三个能力可来自同一后端，也可独立替换
#[derive(Clone)]
pub struct ProviderSet {
    pub capture: Arc<dyn FaceCaptureLauncher>,
    pub matcher: Arc<dyn FaceMatcher>,
    pub manager: Arc<dyn FaceSdkManager>,
}

impl ProviderSet {
    /// 三个能力都由同一个后端提供时的便捷构造
    pub fn from_single<P>(provider: Arc<P>) -> Self
    where
        P: FaceCaptureLauncher + FaceMatcher + FaceSdkManager + 'static,
    {
        Self {
            capture: provider.clone(),
            matcher: provider.clone(),
            manager: provider,
        }
    }
}

/// 按持久化配置选择具体后端（闭集：remote / mock）。
/// 进程启动时解析一次，会话生命周期内不可热切换；
/// 未知取值或 Remote 构造失败时告警并回退 Mock（与「无 Key 回退」同一策略）。
pub fn create_provider_from_config(cfg: &AppConfig) -> ProviderSet {
    match cfg.provider.backend.to_lowercase().as_str() {
        "remote" => match RemoteProvider::new(&cfg.provider) {
            Ok(p) => {
                tracing::info!("Using remote face provider ({})", p.base_url());
                ProviderSet::from_single(Arc::new(p))
            }
            Err(e) => {
                tracing::warn!("Remote provider unavailable ({}), using mock", e);
                ProviderSet::from_single(Arc::new(MockFaceProvider::new()))
            }
        },
        "mock" => {
            tracing::info!("Using mock face provider");
            ProviderSet::from_single(Arc::new(MockFaceProvider::new()))
        }
        other => {
            tracing::warn!("Unknown provider backend '{}', using mock", other);
            ProviderSet::from_single(Arc::new(MockFaceProvider::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn test_unknown_backend_falls_back_to_mock() {
        let mut cfg = AppConfig::default();
        cfg.provider.backend = "vendor-x".to_string();
        let set = create_provider_from_config(&cfg);
        // Mock 的初始 ready 为 false
        assert!(!*set.manager.subscribe_ready().borrow());
    }
}
