use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::video::pacing::{DEFAULT_SLOW_FACTOR, FALLBACK_FRAME_TIME};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub video: VideoConfig,
    #[serde(default)]
    pub pose: PoseConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VideoConfig {
    /// 再生速度の倍率 (1.2 = 20% 遅く再生)
    #[serde(default = "default_slow_factor")]
    pub slow_factor: f64,
    /// FPSが取得できない場合のフレーム間隔（秒）
    #[serde(default = "default_fallback_frame_time")]
    pub fallback_frame_time: f64,
    /// 表示フレーム幅
    #[serde(default = "default_frame_width")]
    pub width: i32,
    /// 表示フレーム高さ
    #[serde(default = "default_frame_height")]
    pub height: i32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PoseConfig {
    /// BlazePose ランドマークモデル (ONNX)
    #[serde(default = "default_model_path")]
    pub model_path: String,
    #[serde(default = "default_input_name")]
    pub input_name: String,
    #[serde(default = "default_landmarks_output")]
    pub landmarks_output: String,
    #[serde(default = "default_presence_output")]
    pub presence_output: String,
    /// 人物ありと判定する最小スコア
    #[serde(default = "default_min_detection_confidence")]
    pub min_detection_confidence: f32,
    /// 前フレームの ROI で追跡を続けるための最小スコア
    #[serde(default = "default_min_tracking_confidence")]
    pub min_tracking_confidence: f32,
    /// 描画するランドマークの最小 visibility
    #[serde(default = "default_visibility_threshold")]
    pub visibility_threshold: f32,
    /// true なら毎フレーム全体から推定する（追跡・平滑化なし）
    #[serde(default)]
    pub static_image_mode: bool,
    /// フレーム間でランドマークを平滑化する
    #[serde(default = "default_true")]
    pub smooth_landmarks: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedbackConfig {
    /// サービスアカウントを含む secrets ファイル
    #[serde(default = "default_secrets_path")]
    pub secrets_path: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_order_by")]
    pub order_by: String,
    #[serde(default = "default_firestore_base_url")]
    pub firestore_base_url: String,
}

fn default_slow_factor() -> f64 { DEFAULT_SLOW_FACTOR }
fn default_fallback_frame_time() -> f64 { FALLBACK_FRAME_TIME }
fn default_frame_width() -> i32 { 640 }
fn default_frame_height() -> i32 { 480 }
fn default_model_path() -> String { "models/pose_landmark_full.onnx".to_string() }
fn default_input_name() -> String { "input_1".to_string() }
fn default_landmarks_output() -> String { "Identity".to_string() }
fn default_presence_output() -> String { "Identity_1".to_string() }
fn default_min_detection_confidence() -> f32 { 0.5 }
fn default_min_tracking_confidence() -> f32 { 0.5 }
fn default_visibility_threshold() -> f32 { 0.5 }
fn default_true() -> bool { true }
fn default_secrets_path() -> String { ".streamlit/secrets.toml".to_string() }
fn default_collection() -> String { "feedback".to_string() }
fn default_order_by() -> String { "timestamp".to_string() }
fn default_firestore_base_url() -> String { "https://firestore.googleapis.com/v1".to_string() }

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            slow_factor: default_slow_factor(),
            fallback_frame_time: default_fallback_frame_time(),
            width: default_frame_width(),
            height: default_frame_height(),
        }
    }
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            input_name: default_input_name(),
            landmarks_output: default_landmarks_output(),
            presence_output: default_presence_output(),
            min_detection_confidence: default_min_detection_confidence(),
            min_tracking_confidence: default_min_tracking_confidence(),
            visibility_threshold: default_visibility_threshold(),
            static_image_mode: false,
            smooth_landmarks: default_true(),
        }
    }
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            secrets_path: default_secrets_path(),
            collection: default_collection(),
            order_by: default_order_by(),
            firestore_base_url: default_firestore_base_url(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// 設定ファイルが無い・壊れている場合はデフォルト値で起動する
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("config not loaded ({e:#}), using defaults");
                Self::default()
            }
        }
    }
}
