//! 会话错误类型
//!
//! 前置条件违例（未就绪 / 飞行中 / 槽位不足）与能力失败共用一套枚举；
//! 编排器把 Display 文本写入 SessionState.error，调用方据此渲染，不会自动重试。

use thiserror::Error;

use crate::provider::ProviderError;

/// 会话命令可能产生的错误；任何一种都不致命，会话随后仍可用
#[derive(Error, Debug)]
pub enum SessionError {
    /// capture / compare 的就绪门控未通过
    #[error("Face provider is not ready")]
    NotReady,

    /// 单飞行约束：已有一个异步操作在飞行中，新命令被拒绝（不入队）
    #[error("Another operation is in flight")]
    Busy,

    /// compare 需要两张图像
    #[error("Two images are required before compare")]
    TwoImagesRequired,

    /// 捕获被用户取消；软性提示，与硬失败措辞不同
    #[error("Face capture cancelled by user")]
    CaptureCancelled,

    /// 能力失败：Provider 的错误文本原样透传
    #[error(transparent)]
    Provider(#[from] ProviderError),
}
