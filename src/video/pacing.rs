use std::thread;
use std::time::{Duration, Instant};

/// FPS が不明な動画で使うフレーム間隔（秒）
pub const FALLBACK_FRAME_TIME: f64 = 0.03;

/// デフォルトのスロー再生倍率 (1.2 = 20% 遅い)
pub const DEFAULT_SLOW_FACTOR: f64 = 1.2;

/// 1フレームあたりの表示間隔
///
/// `fps` が 0 以下（または NaN）のときは `fallback_frame_time` を使う。
/// 計算結果が `Duration` に収まらなければ倍率をかけずに `fallback_frame_time` を返す。
pub fn frame_delay(fps: f64, slow_factor: f64, fallback_frame_time: f64) -> Duration {
    let frame_time = if fps.is_finite() && fps > 0.0 {
        1.0 / fps
    } else {
        fallback_frame_time
    };
    let secs = (frame_time * slow_factor).max(0.0);
    Duration::try_from_secs_f64(secs).unwrap_or_else(|_| {
        log::warn!("frame delay {secs}s is out of range, using {fallback_frame_time}s");
        Duration::try_from_secs_f64(fallback_frame_time).unwrap_or(Duration::ZERO)
    })
}

/// 次の表示時刻を管理してフレームレートを制限する
#[derive(Debug, Clone)]
pub struct FrameRateLimiter {
    delay: Duration,
    next: Option<Instant>,
}

impl FrameRateLimiter {
    pub fn new(delay: Duration) -> Self {
        Self { delay, next: None }
    }

    pub fn from_fps(fps: f64, slow_factor: f64, fallback_frame_time: f64) -> Self {
        Self::new(frame_delay(fps, slow_factor, fallback_frame_time))
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// 次の表示時刻を決めて返す
    ///
    /// 前回の目標時刻から 1 間隔後。既にそれを過ぎていたら `now` から数え直す
    /// （遅れを取り戻すための連続表示はしない）。
    pub fn next_deadline(&mut self, now: Instant) -> Instant {
        let target = match self.next {
            Some(prev) if prev + self.delay >= now => prev + self.delay,
            _ => now + self.delay,
        };
        self.next = Some(target);
        target
    }

    /// 次の表示時刻までブロックする
    pub fn wait(&mut self) {
        let now = Instant::now();
        let remaining = self.next_deadline(now).saturating_duration_since(now);
        if !remaining.is_zero() {
            thread::sleep(remaining);
        }
    }
}
