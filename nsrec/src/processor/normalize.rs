use super::{BBoxFixer, PIXEL_DEPTH};
use crate::common::*;
use image::imageops;

/// Read an image file as RGB, optionally cropped to the fixed region of a number box.
pub fn read_image(path: impl AsRef<Path>, bbox: Option<&LTWH<f64>>) -> Result<RgbImage> {
    let path = path.as_ref();
    let image = image::open(path)
        .with_context(|| format!("failed to read image '{}'", path.display()))?
        .to_rgb8();

    let image = match bbox {
        Some(bbox) => {
            let size = HW::try_from_hw([image.height(), image.width()])?;
            let region = BBoxFixer::default().fix_pixels(&size, bbox)?;
            imageops::crop_imm(&image, region.l(), region.t(), region.w(), region.h()).to_image()
        }
        None => image,
    };

    Ok(image)
}

/// Resize an image and scale pixel values to roughly `[-0.5, 0.5]`.
///
/// The output array has shape `[height, width, 3]`.
pub fn normalize_image(image: &RgbImage, size: &HW<u32>) -> Result<Array3<f32>> {
    let [h, w] = size.hw();
    let resized = imageops::resize(image, w, h, FilterType::Triangle);
    let half = PIXEL_DEPTH / 2.0;
    let array = Array3::from_shape_vec((h as usize, w as usize, 3), resized.into_raw())?
        .mapv(|value| (value as f32 - half) / PIXEL_DEPTH);
    Ok(array)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn read_and_normalize() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("1.png");
        RgbImage::from_fn(100, 100, |x, y| {
            if (20..40).contains(&x) && (30..50).contains(&y) {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        })
        .save(&path)?;

        let image = read_image(&path, None)?;
        assert_eq!(image.dimensions(), (100, 100));

        let bbox = LTWH::try_from_ltwh([20.0, 30.0, 20.0, 20.0])?;
        let cropped = read_image(&path, Some(&bbox))?;
        assert_eq!(cropped.dimensions(), (40, 40));

        let array = normalize_image(&cropped, &HW::try_from_hw([8, 8])?)?;
        assert_eq!(array.dim(), (8, 8, 3));
        assert_abs_diff_eq!(array[[0, 0, 0]], -0.5);
        assert_abs_diff_eq!(array[[4, 4, 1]], 0.5);
        assert!(array.iter().all(|&value| (-0.5..=0.5).contains(&value)));

        Ok(())
    }

    #[test]
    fn read_missing_image_is_error() {
        assert!(read_image("/nonexistent/1.png", None).is_err());
    }
}
