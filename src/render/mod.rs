pub mod draw;
pub mod skeleton;
pub mod window;

pub use draw::draw_landmarks;
pub use skeleton::POSE_CONNECTIONS;
pub use window::{FrameSink, MinifbDisplay};
