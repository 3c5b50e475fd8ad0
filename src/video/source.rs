use anyhow::{Context, Result};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureAPIs},
};
use std::path::Path;

/// 再生ループに渡すフレーム供給元
pub trait FrameSource {
    fn is_open(&self) -> bool;

    /// コンテナに記録された FPS（不明なら 0 以下）
    fn fps(&self) -> f64;

    /// コンテナに記録された総フレーム数
    fn frame_count(&self) -> u64;

    /// 次のフレーム（BGR）。終端なら `None`
    fn read_frame(&mut self) -> Result<Option<Mat>>;
}

/// OpenCV で動画ファイルをデコードする
pub struct VideoFile {
    capture: VideoCapture,
}

impl VideoFile {
    /// 動画ファイルを開く
    ///
    /// デコーダが開けなかった場合もエラーにはせず、`is_open()` が false になる。
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .to_str()
            .with_context(|| format!("Non UTF-8 video path: {}", path.display()))?;
        let capture = VideoCapture::from_file(name, VideoCaptureAPIs::CAP_ANY as i32)
            .context("Failed to create video capture")?;

        let file = Self { capture };
        if file.is_open() {
            log::info!(
                "opened {} ({} frames @ {:.1} fps)",
                path.display(),
                file.frame_count(),
                file.fps()
            );
        } else {
            log::warn!("could not open {}", path.display());
        }
        Ok(file)
    }
}

impl FrameSource for VideoFile {
    fn is_open(&self) -> bool {
        self.capture.is_opened().unwrap_or(false)
    }

    fn fps(&self) -> f64 {
        self.capture.get(videoio::CAP_PROP_FPS).unwrap_or(0.0)
    }

    fn frame_count(&self) -> u64 {
        let count = self.capture.get(videoio::CAP_PROP_FRAME_COUNT).unwrap_or(0.0);
        if count.is_finite() && count > 0.0 {
            count as u64
        } else {
            0
        }
    }

    fn read_frame(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        let ok = self
            .capture
            .read(&mut frame)
            .context("Failed to read frame")?;

        if !ok || frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }
}

impl Drop for VideoFile {
    fn drop(&mut self) {
        let _ = self.capture.release();
    }
}
