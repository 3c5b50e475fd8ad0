pub mod app;
pub mod config;
pub mod feedback;
pub mod pose;
pub mod render;
pub mod status;
pub mod video;
