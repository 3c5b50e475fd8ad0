use anyhow::Result;
use opencv::{
    core::{Mat, Rect},
    prelude::*,
};

use super::landmark::{Landmark, LandmarkIndex, PoseLandmarks};

/// BBoxを広げる倍率（中心を保持）
const ROI_EXPAND: f32 = 1.25;

/// クロップ領域（正規化座標 0.0〜1.0）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CropRegion {
    pub fn full() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        }
    }

    pub fn is_full(&self) -> bool {
        self.width >= 1.0 && self.height >= 1.0
    }
}

/// BBox（ピクセル座標）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// 前フレームのランドマークからBBoxを推定
///
/// visibility_threshold以上のランドマークのmin/maxからBBoxを返す。
/// 有効なランドマークが2個未満ならNone。
pub fn bbox_from_landmarks(
    pose: &PoseLandmarks,
    frame_w: i32,
    frame_h: i32,
    visibility_threshold: f32,
) -> Option<BBox> {
    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    let mut max_x = f32::MIN;
    let mut max_y = f32::MIN;
    let mut count = 0u32;

    for lm in pose.landmarks.iter().filter(|l| l.is_visible(visibility_threshold)) {
        let px = lm.x * frame_w as f32;
        let py = lm.y * frame_h as f32;
        min_x = min_x.min(px);
        min_y = min_y.min(py);
        max_x = max_x.max(px);
        max_y = max_y.max(py);
        count += 1;
    }

    if count < 2 {
        return None;
    }

    Some(BBox {
        x: min_x,
        y: min_y,
        width: max_x - min_x,
        height: max_y - min_y,
    })
}

/// BBoxから正方形のクロップ領域を計算
///
/// - BBoxを1.25倍に拡張（中心を保持）
/// - 正方形（モデル入力 256×256）に合わせて短辺を伸ばす
/// - フレーム境界にクリップ
pub fn region_for_bbox(bbox: &BBox, frame_w: i32, frame_h: i32) -> CropRegion {
    let cx = bbox.x + bbox.width / 2.0;
    let cy = bbox.y + bbox.height / 2.0;
    let side = bbox.width.max(bbox.height) * ROI_EXPAND;

    let fw = frame_w as f32;
    let fh = frame_h as f32;
    let x = (cx - side / 2.0).clamp(0.0, fw);
    let y = (cy - side / 2.0).clamp(0.0, fh);
    let w = side.min(fw - x);
    let h = side.min(fh - y);

    CropRegion {
        x: x / fw,
        y: y / fh,
        width: w / fw,
        height: h / fh,
    }
}

/// フレームからクロップ領域を切り出す
pub fn crop_frame(frame: &Mat, region: &CropRegion) -> Result<Mat> {
    if region.is_full() {
        return Ok(frame.try_clone()?);
    }

    let fw = frame.cols() as f32;
    let fh = frame.rows() as f32;
    let rx = ((region.x * fw) as i32).clamp(0, frame.cols() - 1);
    let ry = ((region.y * fh) as i32).clamp(0, frame.rows() - 1);
    let rw = ((region.width * fw) as i32).clamp(1, frame.cols() - rx);
    let rh = ((region.height * fh) as i32).clamp(1, frame.rows() - ry);

    let roi = Rect::new(rx, ry, rw, rh);
    let cropped = Mat::roi(frame, roi)?;
    Ok(cropped.try_clone()?)
}

/// クロップ画像内の正規化座標をフレーム全体の正規化座標に変換
///
/// z は x と同じスケールなので幅の比率をかける。
pub fn remap_pose(pose: &PoseLandmarks, crop: &CropRegion) -> PoseLandmarks {
    let mut landmarks = [Landmark::default(); LandmarkIndex::COUNT];
    for (dst, lm) in landmarks.iter_mut().zip(pose.landmarks.iter()) {
        *dst = Landmark {
            x: crop.x + lm.x * crop.width,
            y: crop.y + lm.y * crop.height,
            z: lm.z * crop.width,
            visibility: lm.visibility,
        };
    }
    PoseLandmarks::new(landmarks, pose.presence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Scalar, CV_8UC3};

    #[test]
    fn test_crop_region_full() {
        let region = CropRegion::full();
        assert!(region.is_full());
        assert_eq!(region.x, 0.0);
        assert_eq!(region.y, 0.0);
    }

    #[test]
    fn test_bbox_from_landmarks_basic() {
        let mut landmarks = [Landmark::default(); LandmarkIndex::COUNT];
        landmarks[LandmarkIndex::LeftShoulder as usize] = Landmark::new(0.3, 0.2, 0.0, 0.9);
        landmarks[LandmarkIndex::RightShoulder as usize] = Landmark::new(0.7, 0.4, 0.0, 0.8);

        let pose = PoseLandmarks::new(landmarks, 1.0);
        let bbox = bbox_from_landmarks(&pose, 640, 480, 0.5).unwrap();
        // 0.3 * 640 = 192, 0.7 * 640 = 448
        assert!((bbox.x - 192.0).abs() < 1.0);
        // 0.2 * 480 = 96, 0.4 * 480 = 192
        assert!((bbox.y - 96.0).abs() < 1.0);
        assert!((bbox.width - 256.0).abs() < 1.0);
        assert!((bbox.height - 96.0).abs() < 1.0);
    }

    #[test]
    fn test_bbox_from_landmarks_low_visibility() {
        let mut landmarks = [Landmark::default(); LandmarkIndex::COUNT];
        landmarks[LandmarkIndex::Nose as usize] = Landmark::new(0.5, 0.5, 0.0, 0.9);

        let pose = PoseLandmarks::new(landmarks, 1.0);
        assert!(bbox_from_landmarks(&pose, 640, 480, 0.5).is_none());
    }

    #[test]
    fn test_region_is_square_in_pixels() {
        let bbox = BBox { x: 280.0, y: 140.0, width: 80.0, height: 200.0 };
        let region = region_for_bbox(&bbox, 640, 480);
        // 200 * 1.25 = 250 px 四方、中心 (320, 240)
        assert!((region.width * 640.0 - 250.0).abs() < 1e-3);
        assert!((region.height * 480.0 - 250.0).abs() < 1e-3);
        assert!((region.x * 640.0 - 195.0).abs() < 1e-3);
        assert!((region.y * 480.0 - 115.0).abs() < 1e-3);
    }

    #[test]
    fn test_region_clipped_to_frame() {
        let bbox = BBox { x: 0.0, y: 0.0, width: 100.0, height: 100.0 };
        let region = region_for_bbox(&bbox, 640, 480);
        assert_eq!(region.x, 0.0);
        assert_eq!(region.y, 0.0);
        assert!(region.x + region.width <= 1.0);
        assert!(region.y + region.height <= 1.0);
    }

    #[test]
    fn test_crop_frame_size() {
        let frame = Mat::new_rows_cols_with_default(480, 640, CV_8UC3, Scalar::all(0.0)).unwrap();
        let region = CropRegion { x: 0.25, y: 0.5, width: 0.5, height: 0.25 };
        let cropped = crop_frame(&frame, &region).unwrap();
        assert_eq!((cropped.cols(), cropped.rows()), (320, 120));

        let full = crop_frame(&frame, &CropRegion::full()).unwrap();
        assert_eq!((full.cols(), full.rows()), (640, 480));
    }

    #[test]
    fn test_remap_pose() {
        let crop = CropRegion {
            x: 0.25,
            y: 0.1,
            width: 0.5,
            height: 0.8,
        };

        let mut landmarks = [Landmark::default(); LandmarkIndex::COUNT];
        landmarks[LandmarkIndex::Nose as usize] = Landmark::new(0.5, 0.5, 0.2, 0.9);

        let pose = PoseLandmarks::new(landmarks, 0.7);
        let remapped = remap_pose(&pose, &crop);

        let nose = remapped.get(LandmarkIndex::Nose);
        // new_x = 0.25 + 0.5 * 0.5 = 0.5
        assert!((nose.x - 0.5).abs() < 1e-6);
        // new_y = 0.1 + 0.5 * 0.8 = 0.5
        assert!((nose.y - 0.5).abs() < 1e-6);
        assert!((nose.z - 0.1).abs() < 1e-6);
        assert_eq!(nose.visibility, 0.9);
        assert_eq!(remapped.presence, 0.7);

        // デフォルト（0,0）のランドマークはcropの左上にマッピング
        let default_lm = remapped.get(LandmarkIndex::LeftEye);
        assert!((default_lm.x - 0.25).abs() < 1e-6);
        assert!((default_lm.y - 0.1).abs() < 1e-6);
    }
}
