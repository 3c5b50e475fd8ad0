use anyhow::{ensure, Result};
use minifb::{Key, Window, WindowOptions};
use opencv::core::{Mat, Vec3b};
use opencv::prelude::*;

/// フレームの表示先。毎回同じ場所を上書きし、履歴は持たない。
pub trait FrameSink {
    fn show(&mut self, frame: &Mat) -> Result<()>;

    /// ユーザーが表示を閉じたら false
    fn is_open(&self) -> bool {
        true
    }
}

/// minifb ウィンドウ 1 枚に BGR フレームを表示する
pub struct MinifbDisplay {
    window: Window,
    buffer: Vec<u32>,
    width: usize,
    height: usize,
}

impl MinifbDisplay {
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self> {
        let window = Window::new(
            title,
            width,
            height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )?;

        Ok(Self {
            window,
            buffer: vec![0u32; width * height],
            width,
            height,
        })
    }
}

/// BGR Mat を 0RGB の u32 バッファに詰め替える
pub fn bgr_to_buffer(frame: &Mat, buffer: &mut [u32]) -> Result<()> {
    let pixels = frame.data_typed::<Vec3b>()?;
    ensure!(
        pixels.len() == buffer.len(),
        "frame has {} pixels, display expects {}",
        pixels.len(),
        buffer.len()
    );
    for (dst, px) in buffer.iter_mut().zip(pixels) {
        let (b, g, r) = (px[0] as u32, px[1] as u32, px[2] as u32);
        *dst = (r << 16) | (g << 8) | b;
    }
    Ok(())
}

impl FrameSink for MinifbDisplay {
    fn show(&mut self, frame: &Mat) -> Result<()> {
        bgr_to_buffer(frame, &mut self.buffer)?;
        self.window
            .update_with_buffer(&self.buffer, self.width, self.height)?;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.window.is_open() && !self.window.is_key_down(Key::Escape)
    }
}
