use anyhow::Result;
use opencv::{core::Mat, prelude::*};

use super::crop::{bbox_from_landmarks, crop_frame, region_for_bbox, remap_pose, CropRegion};
use super::landmark::PoseLandmarks;
use super::smoothing::LandmarkSmoother;
use crate::config::PoseConfig;

/// 追跡のしきい値とモード
#[derive(Debug, Clone)]
pub struct TrackingSettings {
    pub static_image_mode: bool,
    pub smooth_landmarks: bool,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
    /// ROI 計算に使うランドマークの最小 visibility
    pub visibility_threshold: f32,
}

impl TrackingSettings {
    pub fn from_config(config: &PoseConfig) -> Self {
        Self {
            static_image_mode: config.static_image_mode,
            smooth_landmarks: config.smooth_landmarks,
            min_detection_confidence: config.min_detection_confidence,
            min_tracking_confidence: config.min_tracking_confidence,
            visibility_threshold: config.visibility_threshold,
        }
    }
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self::from_config(&PoseConfig::default())
    }
}

/// 動画モードの姿勢追跡
///
/// 前フレームのランドマークから求めた ROI を次フレームでも使い、
/// スコアが `min_tracking_confidence` を下回ったら同じフレームを全体から推定し直す。
/// 全体からの推定は `min_detection_confidence` で判定する。
pub struct PoseTracker {
    settings: TrackingSettings,
    roi: Option<CropRegion>,
    smoother: LandmarkSmoother,
}

impl PoseTracker {
    pub fn new(settings: TrackingSettings) -> Self {
        Self {
            settings,
            roi: None,
            smoother: LandmarkSmoother::default(),
        }
    }

    /// 次のフレームで使う ROI（追跡中でなければ None）
    pub fn roi(&self) -> Option<CropRegion> {
        self.roi
    }

    pub fn reset(&mut self) {
        self.roi = None;
        self.smoother.reset();
    }

    /// 1 フレーム分の追跡
    ///
    /// `infer` はクロップ済み画像を受け取り、その画像内の正規化座標でランドマークを返す。
    pub fn track<F>(&mut self, frame: &Mat, timestamp: f64, mut infer: F) -> Result<Option<PoseLandmarks>>
    where
        F: FnMut(&Mat) -> Result<Option<PoseLandmarks>>,
    {
        let (w, h) = (frame.cols(), frame.rows());

        if let Some(region) = self.roi.take().filter(|_| !self.settings.static_image_mode) {
            let crop = crop_frame(frame, &region)?;
            match infer(&crop)? {
                Some(pose) if pose.presence >= self.settings.min_tracking_confidence => {
                    let pose = remap_pose(&pose, &region);
                    return Ok(Some(self.accept(pose, timestamp, w, h)));
                }
                _ => {
                    log::debug!("tracking lost, searching whole frame");
                    self.smoother.reset();
                }
            }
        }

        match infer(frame)? {
            Some(pose) if pose.presence >= self.settings.min_detection_confidence => {
                Ok(Some(self.accept(pose, timestamp, w, h)))
            }
            _ => {
                self.reset();
                Ok(None)
            }
        }
    }

    fn accept(&mut self, pose: PoseLandmarks, timestamp: f64, w: i32, h: i32) -> PoseLandmarks {
        if self.settings.static_image_mode {
            return pose;
        }

        let pose = if self.settings.smooth_landmarks {
            self.smoother.apply(&pose, timestamp)
        } else {
            pose
        };
        self.roi = bbox_from_landmarks(&pose, w, h, self.settings.visibility_threshold)
            .map(|bbox| region_for_bbox(&bbox, w, h));
        pose
    }
}
