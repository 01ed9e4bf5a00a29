use anyhow::Result;
use ndarray::Array4;
use opencv::{
    core::{AlgorithmHint, Mat, Size},
    imgproc,
    prelude::*,
};

/// MoveNet MultiPose 用の入力サイズ
pub const MULTIPOSE_INPUT_SIZE: i32 = 256;

/// OpenCV Mat を MoveNet MultiPose 用の入力テンソルに変換
///
/// - BGR -> RGB
/// - input_size x input_size にリサイズ
/// - [1, size, size, 3] の i32 テンソル (0〜255)
pub fn preprocess_for_multipose(frame: &Mat, input_size: i32) -> Result<Array4<i32>> {
    let mut rgb = Mat::default();
    imgproc::cvt_color(
        frame,
        &mut rgb,
        imgproc::COLOR_BGR2RGB,
        0,
        AlgorithmHint::ALGO_HINT_DEFAULT,
    )?;

    let mut resized = Mat::default();
    imgproc::resize(
        &rgb,
        &mut resized,
        Size::new(input_size, input_size),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;

    let size = input_size as usize;
    let mut tensor = Array4::<i32>::zeros((1, size, size, 3));

    for y in 0..input_size {
        for x in 0..input_size {
            let pixel = resized.at_2d::<opencv::core::Vec3b>(y, x)?;
            tensor[[0, y as usize, x as usize, 0]] = pixel[0] as i32;
            tensor[[0, y as usize, x as usize, 1]] = pixel[1] as i32;
            tensor[[0, y as usize, x as usize, 2]] = pixel[2] as i32;
        }
    }

    Ok(tensor)
}
