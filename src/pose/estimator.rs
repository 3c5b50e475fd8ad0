use anyhow::{Context, Result};
use opencv::core::Mat;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;
use std::time::Instant;

use super::landmark::{Landmark, LandmarkIndex, PoseLandmarks};
use super::preprocess::{preprocess_for_blazepose, BLAZEPOSE_INPUT_SIZE};
use super::tracking::{PoseTracker, TrackingSettings};
use crate::config::PoseConfig;

/// モデル出力 1 ランドマークあたりの値 (x, y, z, visibility, presence)
const VALUES_PER_LANDMARK: usize = 5;

/// モデルが出力するランドマーク数（33 + 補助点 6）
const RAW_LANDMARK_COUNT: usize = 39;

/// 1フレームから姿勢を推定する
pub trait PoseEstimator {
    /// RGB フレームを受け取り、人物が検出されなければ `None`
    fn estimate(&mut self, rgb: &Mat) -> Result<Option<PoseLandmarks>>;
}

/// モデルの入出力名
#[derive(Debug, Clone)]
struct ModelIo {
    input: String,
    landmarks: String,
    presence: String,
}

/// BlazePose (full) ランドマークモデルを ONNX Runtime で実行する推定器
///
/// 動画モードでは前フレームの ROI を追跡し、ランドマークを平滑化する。
pub struct BlazePoseEstimator {
    session: Session,
    io: ModelIo,
    tracker: PoseTracker,
    clock: Instant,
}

impl BlazePoseEstimator {
    /// ONNXモデルを読み込んで初期化
    pub fn new<P: AsRef<Path>>(model_path: P, config: &PoseConfig) -> Result<Self> {
        let model_path = model_path.as_ref();
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path)
            .with_context(|| format!("Failed to load ONNX model {}", model_path.display()))?;

        Ok(Self {
            session,
            io: ModelIo {
                input: config.input_name.clone(),
                landmarks: config.landmarks_output.clone(),
                presence: config.presence_output.clone(),
            },
            tracker: PoseTracker::new(TrackingSettings::from_config(config)),
            clock: Instant::now(),
        })
    }

    pub fn from_config(config: &PoseConfig) -> Result<Self> {
        Self::new(&config.model_path, config)
    }
}

impl PoseEstimator for BlazePoseEstimator {
    fn estimate(&mut self, rgb: &Mat) -> Result<Option<PoseLandmarks>> {
        let timestamp = self.clock.elapsed().as_secs_f64();
        let Self { session, io, tracker, .. } = self;
        tracker.track(rgb, timestamp, |image| run_landmark_model(session, io, image))
    }
}

/// 画像 1 枚にモデルを実行する。しきい値判定は呼び出し側で行う。
fn run_landmark_model(session: &mut Session, io: &ModelIo, image: &Mat) -> Result<Option<PoseLandmarks>> {
    let input = preprocess_for_blazepose(image)?;
    let input_tensor = Tensor::from_array(input)?;
    let outputs = session
        .run(ort::inputs![io.input.as_str() => input_tensor])
        .context("Inference failed")?;

    // landmarks: [1, 195], presence: [1, 1]
    let (_, raw) = outputs[io.landmarks.as_str()]
        .try_extract_tensor::<f32>()
        .context("Failed to extract landmark tensor")?;
    let (_, flag) = outputs[io.presence.as_str()]
        .try_extract_tensor::<f32>()
        .context("Failed to extract presence tensor")?;

    let presence = flag.first().copied().unwrap_or(0.0);
    Ok(decode_landmarks(raw, presence, BLAZEPOSE_INPUT_SIZE as f32, 0.0))
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// モデルの生出力をランドマークに変換
///
/// 座標は入力画像のピクセル単位で出力されるので `input_size` で正規化する。
/// visibility はロジットなので sigmoid を通す。presence は既に確率。
pub fn decode_landmarks(
    raw: &[f32],
    presence: f32,
    input_size: f32,
    min_detection_confidence: f32,
) -> Option<PoseLandmarks> {
    if presence < min_detection_confidence {
        return None;
    }
    if raw.len() < RAW_LANDMARK_COUNT * VALUES_PER_LANDMARK {
        log::warn!("unexpected landmark tensor length {}", raw.len());
        return None;
    }

    let mut landmarks = [Landmark::default(); LandmarkIndex::COUNT];
    for (i, chunk) in raw
        .chunks_exact(VALUES_PER_LANDMARK)
        .take(LandmarkIndex::COUNT)
        .enumerate()
    {
        landmarks[i] = Landmark::new(
            chunk[0] / input_size,
            chunk[1] / input_size,
            chunk[2] / input_size,
            sigmoid(chunk[3]),
        );
    }

    Some(PoseLandmarks::new(landmarks, presence))
}
