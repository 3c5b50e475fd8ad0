use anyhow::Result;
use std::env;
use std::path::PathBuf;

use pose_review::app::App;
use pose_review::config::Config;
use pose_review::feedback::{FirestoreFeedback, SecretsSource};
use pose_review::pose::BlazePoseEstimator;
use pose_review::render::MinifbDisplay;
use pose_review::status::ConsoleStatus;
use pose_review::video::{PlaybackSettings, PromptUpload, VideoFile};

const CONFIG_PATH: &str = "config.toml";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load_or_default(CONFIG_PATH);

    println!("=== Real-Time Pose Estimation on Video ===");
    println!("Model: {}", config.pose.model_path);
    println!(
        "Playback: {}x{}, slow factor {}",
        config.video.width, config.video.height, config.video.slow_factor
    );
    println!("Press ESC in the video window to stop playback");
    println!();

    let mut status = ConsoleStatus;
    let mut app = App::new(PlaybackSettings::from_config(&config.video, &config.pose));

    let mut upload = PromptUpload::stdin(env::args_os().nth(1).map(PathBuf::from));
    let Some(video) = app.wait_for_upload(&mut upload, &mut status)? else {
        println!("No video uploaded, exiting");
        return Ok(());
    };

    println!("Loading model...");
    let mut estimator = BlazePoseEstimator::from_config(&config.pose)?;
    println!("Model loaded");

    let mut display = MinifbDisplay::new(
        &format!("Pose Estimation - {}", video.name()),
        config.video.width as usize,
        config.video.height as usize,
    )?;
    let mut source = VideoFile::open(video.path())?;

    let feedback = FirestoreFeedback {
        secrets: SecretsSource::from_env(&config.feedback.secrets_path),
        config: config.feedback.clone(),
    };

    let outcome = app.process(&mut source, &mut estimator, &mut display, &mut status, &feedback)?;
    log::info!(
        "session done: {} frames shown, feedback {}",
        outcome.playback.frames_shown,
        if outcome.feedback.is_some() { "shown" } else { "unavailable" }
    );

    Ok(())
}
