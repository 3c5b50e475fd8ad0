use anyhow::Result;
use opencv::{
    core::{AlgorithmHint, Mat, Size},
    imgproc,
    prelude::*,
};
use std::time::Duration;

use crate::config::{PoseConfig, VideoConfig};
use crate::pose::PoseEstimator;
use crate::render::{draw_landmarks, FrameSink};
use crate::status::StatusBoard;
use crate::video::pacing::FrameRateLimiter;
use crate::video::source::FrameSource;

/// 再生ループのパラメータ
#[derive(Debug, Clone)]
pub struct PlaybackSettings {
    pub width: i32,
    pub height: i32,
    pub slow_factor: f64,
    pub fallback_frame_time: f64,
    pub visibility_threshold: f32,
}

impl PlaybackSettings {
    pub fn from_config(video: &VideoConfig, pose: &PoseConfig) -> Self {
        Self {
            width: video.width,
            height: video.height,
            slow_factor: video.slow_factor,
            fallback_frame_time: video.fallback_frame_time,
            visibility_threshold: pose.visibility_threshold,
        }
    }
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self::from_config(&VideoConfig::default(), &PoseConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackReport {
    /// ソースが開けずループに入らなかったら false
    pub started: bool,
    pub fps: f64,
    /// メタデータ上の総フレーム数（完了メッセージに使う値）
    pub total_frames: u64,
    /// 実際に表示したフレーム数
    pub frames_shown: u64,
    /// 推定器が人物を返したフレーム数
    pub frames_with_pose: u64,
    pub frame_delay: Duration,
    /// 表示側が閉じられた、またはフレーム処理に失敗して途中終了した
    pub aborted: bool,
}

/// 動画を 1 本再生しながら姿勢を描画する
///
/// 1フレームごとに: 読み込み → リサイズ → RGB変換 → 推定 → BGRフレームへ描画 → 表示 → 待機
pub fn play<S, E, D, B>(
    source: &mut S,
    estimator: &mut E,
    display: &mut D,
    status: &mut B,
    settings: &PlaybackSettings,
) -> PlaybackReport
where
    S: FrameSource,
    E: PoseEstimator,
    D: FrameSink,
    B: StatusBoard,
{
    let fps = source.fps();
    let total_frames = source.frame_count();
    let mut limiter =
        FrameRateLimiter::from_fps(fps, settings.slow_factor, settings.fallback_frame_time);
    let mut report = PlaybackReport {
        started: false,
        fps,
        total_frames,
        frames_shown: 0,
        frames_with_pose: 0,
        frame_delay: limiter.delay(),
        aborted: false,
    };

    if !source.is_open() {
        log::warn!("video source is not open, skipping playback");
        return report;
    }
    report.started = true;

    status.success(&format!(
        "fps: {:.1}; Total frames in video: {}",
        fps, total_frames
    ));

    loop {
        let frame = match source.read_frame() {
            Ok(Some(f)) => f,
            Ok(None) => break,
            Err(e) => {
                log::warn!("frame read failed, ending playback: {e:#}");
                break;
            }
        };

        match show_frame(&frame, estimator, display, settings, &mut report) {
            Ok(true) => {}
            Ok(false) => {
                log::info!("display closed, stopping playback");
                report.aborted = true;
                break;
            }
            Err(e) => {
                log::error!("playback stopped on frame {}: {e:#}", report.frames_shown);
                status.error(&format!("Playback stopped: {e:#}"));
                report.aborted = true;
                break;
            }
        }

        limiter.wait();
    }

    if !report.aborted {
        status.success(&format!(
            "Analysis Complete. Total frames processed: {}",
            total_frames
        ));
    }
    log::info!(
        "playback finished: {} frames shown, {} with pose",
        report.frames_shown,
        report.frames_with_pose
    );

    report
}

/// 1 フレームを推定・描画して表示する。表示側が閉じられていたら false
fn show_frame<E, D>(
    frame: &Mat,
    estimator: &mut E,
    display: &mut D,
    settings: &PlaybackSettings,
    report: &mut PlaybackReport,
) -> Result<bool>
where
    E: PoseEstimator,
    D: FrameSink,
{
    let mut resized = Mat::default();
    imgproc::resize(
        frame,
        &mut resized,
        Size::new(settings.width, settings.height),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;

    let mut rgb = Mat::default();
    imgproc::cvt_color(
        &resized,
        &mut rgb,
        imgproc::COLOR_BGR2RGB,
        0,
        AlgorithmHint::ALGO_HINT_DEFAULT,
    )?;

    match estimator.estimate(&rgb) {
        Ok(Some(pose)) => {
            draw_landmarks(&mut resized, &pose, settings.visibility_threshold)?;
            report.frames_with_pose += 1;
        }
        Ok(None) => {}
        Err(e) => log::warn!("pose estimation failed on frame {}: {e:#}", report.frames_shown),
    }

    if !display.is_open() {
        return Ok(false);
    }
    display.show(&resized)?;
    report.frames_shown += 1;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Landmark, LandmarkIndex, PoseLandmarks};
    use crate::status::{RecordingStatus, StatusEntry};
    use anyhow::anyhow;
    use opencv::core::{Scalar, CV_8UC3};

    struct SyntheticVideo {
        open: bool,
        fps: f64,
        sizes: Vec<(i32, i32)>,
        next: usize,
    }

    impl SyntheticVideo {
        fn new(sizes: Vec<(i32, i32)>) -> Self {
            Self { open: true, fps: 1000.0, sizes, next: 0 }
        }
    }

    impl FrameSource for SyntheticVideo {
        fn is_open(&self) -> bool {
            self.open
        }

        fn fps(&self) -> f64 {
            self.fps
        }

        fn frame_count(&self) -> u64 {
            self.sizes.len() as u64
        }

        fn read_frame(&mut self) -> Result<Option<Mat>> {
            let Some(&(w, h)) = self.sizes.get(self.next) else {
                return Ok(None);
            };
            self.next += 1;
            Ok(Some(Mat::new_rows_cols_with_default(h, w, CV_8UC3, Scalar::new(10.0, 20.0, 30.0, 0.0))?))
        }
    }

    /// 1 フレームおきに人物ありを返す
    struct AlternatingEstimator {
        calls: usize,
        seen_sizes: Vec<(i32, i32)>,
    }

    impl PoseEstimator for AlternatingEstimator {
        fn estimate(&mut self, rgb: &Mat) -> Result<Option<PoseLandmarks>> {
            self.seen_sizes.push((rgb.cols(), rgb.rows()));
            self.calls += 1;
            if self.calls % 2 == 0 {
                return Ok(None);
            }
            let mut landmarks = [Landmark::default(); LandmarkIndex::COUNT];
            landmarks[LandmarkIndex::LeftShoulder as usize] = Landmark::new(0.4, 0.3, 0.0, 1.0);
            landmarks[LandmarkIndex::RightShoulder as usize] = Landmark::new(0.6, 0.3, 0.0, 1.0);
            Ok(Some(PoseLandmarks::new(landmarks, 1.0)))
        }
    }

    struct FailingEstimator;

    impl PoseEstimator for FailingEstimator {
        fn estimate(&mut self, _rgb: &Mat) -> Result<Option<PoseLandmarks>> {
            Err(anyhow!("model exploded"))
        }
    }

    #[derive(Default)]
    struct CollectingDisplay {
        sizes: Vec<(i32, i32)>,
        close_after: Option<usize>,
    }

    impl FrameSink for CollectingDisplay {
        fn show(&mut self, frame: &Mat) -> Result<()> {
            self.sizes.push((frame.cols(), frame.rows()));
            Ok(())
        }

        fn is_open(&self) -> bool {
            self.close_after.map_or(true, |n| self.sizes.len() < n)
        }
    }

    fn estimator() -> AlternatingEstimator {
        AlternatingEstimator { calls: 0, seen_sizes: Vec::new() }
    }

    #[test]
    fn test_every_frame_is_resized() {
        let mut source = SyntheticVideo::new(vec![(1920, 1080), (320, 240), (641, 479)]);
        let mut est = estimator();
        let mut display = CollectingDisplay::default();
        let mut status = RecordingStatus::default();

        let report = play(&mut source, &mut est, &mut display, &mut status, &PlaybackSettings::default());

        assert_eq!(display.sizes, vec![(640, 480); 3]);
        assert_eq!(est.seen_sizes, vec![(640, 480); 3]);
        assert_eq!(report.frames_shown, 3);
        assert_eq!(report.frames_with_pose, 2);
    }

    #[test]
    fn test_reports_metadata_frame_count() {
        let mut source = SyntheticVideo::new(vec![(64, 48); 5]);
        source.fps = 500.0;
        let mut display = CollectingDisplay::default();
        let mut status = RecordingStatus::default();

        let report = play(&mut source, &mut estimator(), &mut display, &mut status, &PlaybackSettings::default());

        assert!(report.started);
        assert_eq!(report.total_frames, 5);
        assert_eq!(
            status.entries,
            vec![
                StatusEntry::Success("fps: 500.0; Total frames in video: 5".to_string()),
                StatusEntry::Success("Analysis Complete. Total frames processed: 5".to_string()),
            ]
        );
    }

    #[test]
    fn test_closed_source_never_starts() {
        let mut source = SyntheticVideo::new(vec![(64, 48); 3]);
        source.open = false;
        let mut display = CollectingDisplay::default();
        let mut status = RecordingStatus::default();

        let report = play(&mut source, &mut estimator(), &mut display, &mut status, &PlaybackSettings::default());

        assert!(!report.started);
        assert!(display.sizes.is_empty());
        assert!(status.entries.is_empty());
    }

    #[test]
    fn test_estimator_error_still_shows_frame() {
        let mut source = SyntheticVideo::new(vec![(64, 48); 2]);
        let mut display = CollectingDisplay::default();
        let mut status = RecordingStatus::default();

        let report = play(&mut source, &mut FailingEstimator, &mut display, &mut status, &PlaybackSettings::default());

        assert_eq!(report.frames_shown, 2);
        assert_eq!(report.frames_with_pose, 0);
    }

    #[test]
    fn test_closing_display_aborts() {
        let mut source = SyntheticVideo::new(vec![(64, 48); 10]);
        let mut display = CollectingDisplay { close_after: Some(3), ..Default::default() };
        let mut status = RecordingStatus::default();

        let report = play(&mut source, &mut estimator(), &mut display, &mut status, &PlaybackSettings::default());

        assert!(report.aborted);
        assert_eq!(report.frames_shown, 3);
        assert_eq!(status.entries.len(), 1);
    }

    #[test]
    fn test_frame_delay_uses_slow_factor() {
        let mut source = SyntheticVideo::new(Vec::new());
        source.fps = 0.0;
        let mut display = CollectingDisplay::default();
        let mut status = RecordingStatus::default();
        let settings = PlaybackSettings { fallback_frame_time: 0.01, slow_factor: 1.5, ..Default::default() };

        let report = play(&mut source, &mut estimator(), &mut display, &mut status, &settings);

        assert!((report.frame_delay.as_secs_f64() - 0.015).abs() < 1e-9);
        assert_eq!(report.frames_shown, 0);
    }

    struct BrokenDisplay;

    impl FrameSink for BrokenDisplay {
        fn show(&mut self, _frame: &Mat) -> Result<()> {
            Err(anyhow!("window update failed"))
        }
    }

    #[test]
    fn test_display_error_stops_with_banner() {
        let mut source = SyntheticVideo::new(vec![(64, 48); 4]);
        let mut status = RecordingStatus::default();

        let report = play(&mut source, &mut estimator(), &mut BrokenDisplay, &mut status, &PlaybackSettings::default());

        assert!(report.started);
        assert!(report.aborted);
        assert_eq!(report.frames_shown, 0);
        assert_eq!(
            status.errors().collect::<Vec<_>>(),
            vec!["Playback stopped: window update failed"]
        );
        assert!(!status
            .entries
            .iter()
            .any(|e| matches!(e, StatusEntry::Success(m) if m.starts_with("Analysis Complete"))));
    }
}
