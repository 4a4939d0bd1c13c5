//! 文件系统「图库」选图器
//!
//! 无头环境下的媒体选择：从预先排好的路径队列里依次取图读入内存；
//! 队列取尽等价于用户在选图界面点了取消（返回 None，而非错误）。

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::state::FaceImage;
use crate::provider::traits::{MediaPicker, ProviderError};

pub struct FsMediaPicker {
    queue: Mutex<VecDeque<PathBuf>>,
}

impl FsMediaPicker {
    pub fn new<I>(paths: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        Self {
            queue: Mutex::new(paths.into_iter().collect()),
        }
    }
}

#[async_trait]
impl MediaPicker for FsMediaPicker {
    async fn pick_image(&self) -> Result<Option<FaceImage>, ProviderError> {
        let next = self.queue.lock().expect("picker queue poisoned").pop_front();
        let Some(path) = next else {
            tracing::debug!("picker queue empty, treating as user cancel");
            return Ok(None);
        };

        let bytes = tokio::fs::read(&path).await?;
        if bytes.is_empty() {
            return Err(ProviderError::Pick(format!(
                "empty image file: {}",
                path.display()
            )));
        }
        Ok(Some(FaceImage::new(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_picks_files_in_order_then_cancels() {
        let dir = tempfile::tempdir().unwrap();
        let p1 = dir.path().join("a.jpg");
        let p2 = dir.path().join("b.jpg");
        std::fs::File::create(&p1).unwrap().write_all(b"aaaa").unwrap();
        std::fs::File::create(&p2).unwrap().write_all(b"bbbb").unwrap();

        let picker = FsMediaPicker::new(vec![p1, p2]);
        let first = picker.pick_image().await.unwrap().unwrap();
        assert_eq!(first.bytes(), b"aaaa");
        let second = picker.pick_image().await.unwrap().unwrap();
        assert_eq!(second.bytes(), b"bbbb");

        assert!(picker.pick_image().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let picker = FsMediaPicker::new(vec![PathBuf::from("/no/such/image.jpg")]);
        assert!(picker.pick_image().await.is_err());
    }

    #[tokio::test]
    async fn test_empty_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("empty.jpg");
        std::fs::File::create(&p).unwrap();

        let picker = FsMediaPicker::new(vec![p]);
        assert!(matches!(
            picker.pick_image().await,
            Err(ProviderError::Pick(_))
        ));
    }
}
