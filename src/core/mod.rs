//! 核心编排层：状态快照、错误、会话编排器

pub mod error;
pub mod session;
pub mod state;

pub use error::SessionError;
pub use session::Session;
pub use state::{CaptureMode, FaceImage, SessionState, Similarity};
