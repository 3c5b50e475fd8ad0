use anyhow::{ensure, Result};

use crate::feedback::fetch::{show_feedback, FeedbackSource};
use crate::pose::PoseEstimator;
use crate::render::FrameSink;
use crate::status::StatusBoard;
use crate::video::playback::{play, PlaybackReport, PlaybackSettings};
use crate::video::source::FrameSource;
use crate::video::upload::{UploadSurface, UploadedVideo};

/// アプリ全体の状態。常にこの順で 1 方向に進む。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    WaitingForUpload,
    Playing,
    Finished,
    FetchingFeedback,
    Done,
}

impl Phase {
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Idle => Some(Phase::WaitingForUpload),
            Phase::WaitingForUpload => Some(Phase::Playing),
            Phase::Playing => Some(Phase::Finished),
            Phase::Finished => Some(Phase::FetchingFeedback),
            Phase::FetchingFeedback => Some(Phase::Done),
            Phase::Done => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub playback: PlaybackReport,
    /// 表示したフィードバック。取得失敗時は None
    pub feedback: Option<String>,
}

pub struct App {
    settings: PlaybackSettings,
    history: Vec<Phase>,
}

impl App {
    pub fn new(settings: PlaybackSettings) -> Self {
        Self {
            settings,
            history: vec![Phase::Idle],
        }
    }

    pub fn phase(&self) -> Phase {
        *self.history.last().unwrap_or(&Phase::Idle)
    }

    pub fn history(&self) -> &[Phase] {
        &self.history
    }

    fn advance(&mut self, to: Phase) -> Result<()> {
        let from = self.phase();
        ensure!(from.next() == Some(to), "invalid transition {:?} -> {:?}", from, to);
        log::info!("{:?} -> {:?}", from, to);
        self.history.push(to);
        Ok(())
    }

    /// 動画のアップロードを待つ
    pub fn wait_for_upload<U: UploadSurface, B: StatusBoard>(
        &mut self,
        upload: &mut U,
        status: &mut B,
    ) -> Result<Option<UploadedVideo>> {
        self.advance(Phase::WaitingForUpload)?;
        let video = upload.wait_for_upload(status)?;
        if let Some(v) = &video {
            log::info!("received upload {}", v.name());
        }
        Ok(video)
    }

    /// 再生 → フィードバック表示までを実行
    ///
    /// フィードバックは再生ループが終わってから 1 回だけ取得する。
    /// 再生が途中で失敗しても取得は行う。
    pub fn process<S, E, D, B, F>(
        &mut self,
        source: &mut S,
        estimator: &mut E,
        display: &mut D,
        status: &mut B,
        feedback: &F,
    ) -> Result<SessionOutcome>
    where
        S: FrameSource,
        E: PoseEstimator,
        D: FrameSink,
        B: StatusBoard,
        F: FeedbackSource,
    {
        self.advance(Phase::Playing)?;
        let playback = play(source, estimator, display, status, &self.settings);
        self.advance(Phase::Finished)?;

        self.advance(Phase::FetchingFeedback)?;
        let feedback = show_feedback(feedback, status);
        self.advance(Phase::Done)?;

        Ok(SessionOutcome { playback, feedback })
    }
}
