pub mod pacing;
pub mod playback;
pub mod source;
pub mod upload;

pub use pacing::{frame_delay, FrameRateLimiter};
pub use playback::{play, PlaybackReport, PlaybackSettings};
pub use source::{FrameSource, VideoFile};
pub use upload::{PromptUpload, UploadSurface, UploadedVideo};
