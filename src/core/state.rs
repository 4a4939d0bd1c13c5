//! 会话状态模型：不可变快照与槽位规则
//!
//! SessionState 是对外可见的唯一真实状态，每次变更整体替换；
//! FaceImage 按 id 判等（引用语义，不比较字节内容），Similarity 提供整数百分比换算。

use std::sync::Arc;

use uuid::Uuid;

/// 捕获模式：被动（仅看镜头）或主动（含活体挑战，Provider 可能不支持）
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CaptureMode {
    #[default]
    Passive,
    Active,
}

impl CaptureMode {
    /// 配置字符串 -> 模式；"active" 之外一律按 passive 处理
    pub fn from_config(s: &str) -> Self {
        if s.eq_ignore_ascii_case("active") {
            Self::Active
        } else {
            Self::Passive
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passive => "passive",
            Self::Active => "active",
        }
    }
}

/// 人脸图像：原始编码字节 + 身份 id
///
/// 判等只看 id：同一次捕获/选图产生的实例才相等，字节内容相同的两张图不相等。
#[derive(Clone, Debug)]
pub struct FaceImage {
    id: Uuid,
    bytes: Arc<[u8]>,
}

impl FaceImage {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            bytes: bytes.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl PartialEq for FaceImage {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for FaceImage {}

/// 比较结果：归一化到 [0.0, 1.0] 的相似度分数
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Similarity {
    score: f32,
}

impl Similarity {
    pub fn new(score: f32) -> Self {
        Self { score }
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    /// 整数百分比：round(clamp(score, 0, 1) * 100)
    pub fn percent(&self) -> u8 {
        (self.score.clamp(0.0, 1.0) * 100.0).round() as u8
    }
}

/// 会话快照：编排器对外发布的唯一状态
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionState {
    /// Provider 是否就绪；门控 capture 与 compare
    pub provider_ready: bool,
    /// 是否恰有一个异步操作在飞行中
    pub busy: bool,
    /// 当前捕获模式
    pub capture_mode: CaptureMode,
    /// 槽位 A（先填）
    pub face_a: Option<FaceImage>,
    /// 槽位 B（A 非空后才可填）
    pub face_b: Option<FaceImage>,
    /// 仅在一次成功 compare 之后非空
    pub similarity: Option<Similarity>,
    /// 最近一次失败的描述；新命令开始时清空
    pub error: Option<String>,
}

impl SessionState {
    /// 按 A→B 顺序填充槽位；两槽已满则丢弃多余图像（不入队、不报错）。
    /// 真正填入槽位时同时清空旧的 similarity（槽位变更使比较结果失效）。
    pub(crate) fn fill_slot(&mut self, image: FaceImage) {
        if self.face_a.is_none() {
            self.face_a = Some(image);
        } else if self.face_b.is_none() {
            self.face_b = Some(image);
        } else {
            tracing::debug!("both slots filled, extra image discarded");
            return;
        }
        self.similarity = None;
    }

    pub fn has_both_faces(&self) -> bool {
        self.face_a.is_some() && self.face_b.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_slot_order_a_before_b() {
        let mut state = SessionState::default();
        let a = FaceImage::new(vec![1u8]);
        let b = FaceImage::new(vec![2u8]);

        state.fill_slot(a.clone());
        assert_eq!(state.face_a, Some(a.clone()));
        assert!(state.face_b.is_none());

        state.fill_slot(b.clone());
        assert_eq!(state.face_a, Some(a));
        assert_eq!(state.face_b, Some(b));
    }

    #[test]
    fn test_fill_slot_discards_third_image() {
        let mut state = SessionState::default();
        let a = FaceImage::new(vec![1u8]);
        let b = FaceImage::new(vec![2u8]);
        state.fill_slot(a.clone());
        state.fill_slot(b.clone());

        state.fill_slot(FaceImage::new(vec![3u8]));
        assert_eq!(state.face_a, Some(a));
        assert_eq!(state.face_b, Some(b));
    }

    #[test]
    fn test_fill_slot_clears_similarity() {
        let mut state = SessionState {
            similarity: Some(Similarity::new(0.5)),
            ..SessionState::default()
        };
        state.fill_slot(FaceImage::new(vec![1u8]));
        assert!(state.similarity.is_none());
    }

    #[test]
    fn test_discarded_image_keeps_similarity() {
        let mut state = SessionState::default();
        state.fill_slot(FaceImage::new(vec![1u8]));
        state.fill_slot(FaceImage::new(vec![2u8]));
        state.similarity = Some(Similarity::new(0.9));

        state.fill_slot(FaceImage::new(vec![3u8]));
        assert_eq!(state.similarity, Some(Similarity::new(0.9)));
    }

    #[test]
    fn test_face_image_equality_is_by_identity() {
        let a = FaceImage::new(vec![7u8, 7, 7]);
        let same_bytes = FaceImage::new(vec![7u8, 7, 7]);
        assert_ne!(a, same_bytes);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_percent_rounds_and_clamps() {
        assert_eq!(Similarity::new(0.87).percent(), 87);
        assert_eq!(Similarity::new(0.876).percent(), 88);
        assert_eq!(Similarity::new(1.7).percent(), 100);
        assert_eq!(Similarity::new(-0.3).percent(), 0);
        assert_eq!(Similarity::new(0.005).percent(), 1);
    }

    #[test]
    fn test_capture_mode_from_config() {
        assert_eq!(CaptureMode::from_config("active"), CaptureMode::Active);
        assert_eq!(CaptureMode::from_config("ACTIVE"), CaptureMode::Active);
        assert_eq!(CaptureMode::from_config("passive"), CaptureMode::Passive);
        assert_eq!(CaptureMode::from_config("whatever"), CaptureMode::Passive);
    }
}
