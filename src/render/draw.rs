use anyhow::Result;
use opencv::{
    core::{Mat, Point},
    imgproc,
    prelude::*,
};

use crate::pose::PoseLandmarks;
use crate::render::skeleton::{
    connection_color, landmark_color, CONNECTION_THICKNESS, LANDMARK_RADIUS, POSE_CONNECTIONS,
};

/// 姿勢をフレームに直接描画する（骨格線 → ランドマークの順）
///
/// visibility が閾値未満のランドマークと、それに繋がる線は描かない。
pub fn draw_landmarks(frame: &mut Mat, pose: &PoseLandmarks, visibility_threshold: f32) -> Result<()> {
    let (w, h) = (frame.cols(), frame.rows());

    for (start_idx, end_idx) in POSE_CONNECTIONS.iter() {
        let start = pose.get(*start_idx);
        let end = pose.get(*end_idx);

        if start.is_visible(visibility_threshold) && end.is_visible(visibility_threshold) {
            let (x1, y1) = start.to_pixel(w, h);
            let (x2, y2) = end.to_pixel(w, h);
            imgproc::line(
                frame,
                Point::new(x1, y1),
                Point::new(x2, y2),
                connection_color(),
                CONNECTION_THICKNESS,
                imgproc::LINE_8,
                0,
            )?;
        }
    }

    for lm in pose.landmarks.iter().filter(|l| l.is_visible(visibility_threshold)) {
        let (px, py) = lm.to_pixel(w, h);
        imgproc::circle(
            frame,
            Point::new(px, py),
            LANDMARK_RADIUS,
            landmark_color(),
            imgproc::FILLED,
            imgproc::LINE_8,
            0,
        )?;
    }

    Ok(())
}
