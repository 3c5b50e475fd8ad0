use anyhow::{Context, Result};
use ndarray::Array4;
use opencv::{
    core::{Mat, Size, Vec3f, CV_32FC3},
    imgproc,
    prelude::*,
};

/// BlazePose ランドマークモデルの入力サイズ
pub const BLAZEPOSE_INPUT_SIZE: i32 = 256;

/// RGB Mat を BlazePose 用の入力テンソルに変換
///
/// - 256x256 にリサイズ
/// - [1, 256, 256, 3] の f32 テンソル (0.0-1.0)
///
/// 入力は既に RGB 順であること（BGR変換は呼び出し側で行う）
pub fn preprocess_for_blazepose(rgb: &Mat) -> Result<Array4<f32>> {
    let mut resized = Mat::default();
    imgproc::resize(
        rgb,
        &mut resized,
        Size::new(BLAZEPOSE_INPUT_SIZE, BLAZEPOSE_INPUT_SIZE),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;

    let mut float_mat = Mat::default();
    resized.convert_to(&mut float_mat, CV_32FC3, 1.0 / 255.0, 0.0)?;

    let size = BLAZEPOSE_INPUT_SIZE as usize;
    let pixels = float_mat
        .data_typed::<Vec3f>()
        .context("Preprocessed frame is not a continuous 3-channel f32 image")?;

    let mut tensor = Array4::<f32>::zeros((1, size, size, 3));
    for (i, pixel) in pixels.iter().enumerate() {
        let (y, x) = (i / size, i % size);
        for c in 0..3 {
            tensor[[0, y, x, c]] = pixel[c];
        }
    }

    Ok(tensor)
}
