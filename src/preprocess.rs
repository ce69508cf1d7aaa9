use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array3;

/// Fixed model input resolution.
pub const INPUT_SIZE: u32 = 224;

/// Decodes an encoded JPEG/PNG byte buffer into an RGB image. Alpha or
/// grayscale sources are coerced to three channels.
pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage, image::ImageError> {
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}

/// Resizes to 224x224 with bilinear filtering and normalizes pixel values
/// into [-1, 1], yielding an HWC tensor of shape [224, 224, 3].
pub fn to_model_input(img: &RgbImage) -> Array3<f32> {
    let resized = imageops::resize(img, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);

    let size = INPUT_SIZE as usize;
    let mut tensor = Array3::<f32>::zeros((size, size, 3));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[y as usize, x as usize, c]] = normalize(pixel[c] as f32 / 255.0);
        }
    }
    tensor
}

/// The normalization the model was trained with. The constants are a fixed
/// contract; changing them silently degrades accuracy without any error.
pub fn normalize(v: f32) -> f32 {
    (v - 0.5) / 0.5
}
