use candle_core::{Device, Tensor};
use kornia_image::{Image, ImageSize};

use crate::error::DetectorError;

/// Side of the pixel blocks sampled by [`enhance_contrast`].
const ENHANCE_BLOCK: usize = 4;
/// Gain applied by [`enhance_contrast`].
const ENHANCE_GAIN: f32 = 1.15;

/// Turn an rgb8 frame into the `[1, 3, H, W]` model input.
///
/// The frame is resized to `input_size` with nearest neighbour sampling and
/// scaled to `[0, 1]`. With `enhance`, [`enhance_contrast`] runs on the
/// scaled pixels first.
pub fn preprocess_frame(
    image: &Image<u8, 3>,
    input_size: ImageSize,
    enhance: bool,
    device: &Device,
) -> Result<Tensor, DetectorError> {
    let ImageSize { width, height } = input_size;

    let mut pixels = if image.width() == width && image.height() == height {
        image.map(|&x| x as f32 / 255.0).into_vec()
    } else {
        let mut image_resized = Image::from_size_val(input_size, 0)?;
        kornia_imgproc::resize::resize_fast(
            image,
            &mut image_resized,
            kornia_imgproc::interpolation::InterpolationMode::Nearest,
        )?;
        image_resized.map(|&x| x as f32 / 255.0).into_vec()
    };

    if enhance {
        enhance_contrast(&mut pixels, width, height);
    }

    let image_t = Tensor::from_vec::<_, f32>(pixels, (height, width, 3), device)?
        .permute((2, 0, 1))?
        .unsqueeze(0)?;

    Ok(image_t)
}

/// Cheap contrast boost for small, distant objects.
///
/// `pixels` is an interleaved rgb buffer in `[0, 1]`. The top-left pixel of
/// each 4x4 block is brightened and copied over the whole block.
pub fn enhance_contrast(pixels: &mut [f32], width: usize, height: usize) {
    debug_assert_eq!(pixels.len(), width * height * 3);

    for y in (0..height).step_by(ENHANCE_BLOCK) {
        for x in (0..width).step_by(ENHANCE_BLOCK) {
            let src = (y * width + x) * 3;
            let boosted = [
                (pixels[src] * ENHANCE_GAIN).clamp(0.0, 1.0),
                (pixels[src + 1] * ENHANCE_GAIN).clamp(0.0, 1.0),
                (pixels[src + 2] * ENHANCE_GAIN).clamp(0.0, 1.0),
            ];

            for by in y..(y + ENHANCE_BLOCK).min(height) {
                for bx in x..(x + ENHANCE_BLOCK).min(width) {
                    let dst = (by * width + bx) * 3;
                    pixels[dst..dst + 3].copy_from_slice(&boosted);
                }
            }
        }
    }
}
