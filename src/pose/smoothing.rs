use super::landmark::{Landmark, LandmarkIndex, PoseLandmarks};

/// 静止時のカットオフ周波数 (Hz)
pub const DEFAULT_MIN_CUTOFF: f32 = 0.05;
/// 速度に応じてカットオフを上げる係数
pub const DEFAULT_BETA: f32 = 80.0;
const DERIVATE_CUTOFF: f32 = 1.0;
/// タイムスタンプが進まなかったときに使う間隔
const DEFAULT_DT: f32 = 1.0 / 30.0;

/// Low-pass filter component
struct LowPassFilter {
    prev: Option<f32>,
}

impl LowPassFilter {
    fn new() -> Self {
        Self { prev: None }
    }

    fn filter(&mut self, value: f32, alpha: f32) -> f32 {
        match self.prev {
            Some(prev) => {
                let result = alpha * value + (1.0 - alpha) * prev;
                self.prev = Some(result);
                result
            }
            None => {
                self.prev = Some(value);
                value
            }
        }
    }

    fn reset(&mut self) {
        self.prev = None;
    }
}

/// alpha = 1 / (1 + tau/Te), tau = 1/(2*pi*fc)
fn smoothing_factor(te: f32, cutoff: f32) -> f32 {
    let r = 2.0 * std::f32::consts::PI * cutoff * te;
    r / (r + 1.0)
}

/// One Euro Filter for a single scalar value
struct ScalarFilter {
    min_cutoff: f32,
    beta: f32,
    x_filter: LowPassFilter,
    dx_filter: LowPassFilter,
    prev_value: Option<f32>,
}

impl ScalarFilter {
    fn new(min_cutoff: f32, beta: f32) -> Self {
        Self {
            min_cutoff,
            beta,
            x_filter: LowPassFilter::new(),
            dx_filter: LowPassFilter::new(),
            prev_value: None,
        }
    }

    fn filter(&mut self, value: f32, dt: f32) -> f32 {
        let dx = match self.prev_value {
            Some(prev) if dt > 0.0 => (value - prev) / dt,
            _ => 0.0,
        };
        self.prev_value = Some(value);

        let edx = self.dx_filter.filter(dx, smoothing_factor(dt, DERIVATE_CUTOFF));
        let cutoff = self.min_cutoff + self.beta * edx.abs();
        self.x_filter.filter(value, smoothing_factor(dt, cutoff))
    }

    fn reset(&mut self) {
        self.x_filter.reset();
        self.dx_filter.reset();
        self.prev_value = None;
    }
}

/// 33 ランドマークの x, y, z をフレーム間で平滑化する
///
/// visibility は平滑化しない。
pub struct LandmarkSmoother {
    filters: Vec<[ScalarFilter; 3]>,
    last_timestamp: Option<f64>,
}

impl LandmarkSmoother {
    pub fn new(min_cutoff: f32, beta: f32) -> Self {
        Self {
            filters: (0..LandmarkIndex::COUNT)
                .map(|_| std::array::from_fn(|_| ScalarFilter::new(min_cutoff, beta)))
                .collect(),
            last_timestamp: None,
        }
    }

    /// `timestamp` は秒
    pub fn apply(&mut self, pose: &PoseLandmarks, timestamp: f64) -> PoseLandmarks {
        let dt = match self.last_timestamp {
            Some(t) if timestamp > t => (timestamp - t) as f32,
            Some(_) => DEFAULT_DT,
            None => {
                self.last_timestamp = Some(timestamp);
                for (f, lm) in self.filters.iter_mut().zip(pose.landmarks.iter()) {
                    f[0].filter(lm.x, DEFAULT_DT);
                    f[1].filter(lm.y, DEFAULT_DT);
                    f[2].filter(lm.z, DEFAULT_DT);
                }
                return pose.clone();
            }
        };
        self.last_timestamp = Some(timestamp);

        let mut landmarks = [Landmark::default(); LandmarkIndex::COUNT];
        for ((dst, f), lm) in landmarks
            .iter_mut()
            .zip(self.filters.iter_mut())
            .zip(pose.landmarks.iter())
        {
            *dst = Landmark {
                x: f[0].filter(lm.x, dt),
                y: f[1].filter(lm.y, dt),
                z: f[2].filter(lm.z, dt),
                visibility: lm.visibility,
            };
        }
        PoseLandmarks::new(landmarks, pose.presence)
    }

    pub fn reset(&mut self) {
        for f in self.filters.iter_mut().flatten() {
            f.reset();
        }
        self.last_timestamp = None;
    }
}

impl Default for LandmarkSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CUTOFF, DEFAULT_BETA)
    }
}
