use super::PIXEL_DEPTH;
use crate::{common::*, config::ImageChannels};
use image::{imageops, Pixel};

pub type GrayF32Image = ImageBuffer<Luma<f32>, Vec<f32>>;
pub type RgbF32Image = ImageBuffer<Rgb<f32>, Vec<f32>>;

/// An image with pixel values in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub enum FloatImage {
    Gray(GrayF32Image),
    Rgb(RgbF32Image),
}

impl FloatImage {
    /// Decode an encoded image, sniffing the format from its content.
    pub fn decode(bytes: &[u8], channels: ImageChannels) -> Result<Self> {
        let image = image::load_from_memory(bytes)?;
        Self::from_dynamic(&image, channels)
    }

    pub fn from_dynamic(image: &DynamicImage, channels: ImageChannels) -> Result<Self> {
        let image = match channels {
            ImageChannels::Gray => {
                let image = image.to_luma8();
                Self::Gray(to_float(image.width(), image.height(), image.into_raw())?)
            }
            ImageChannels::Rgb => {
                let image = image.to_rgb8();
                Self::Rgb(to_float(image.width(), image.height(), image.into_raw())?)
            }
        };
        Ok(image)
    }

    /// Build from an array of shape `[height, width, channels]` with 1 or 3 channels.
    pub fn from_array(array: Array3<f32>) -> Result<Self> {
        let (h, w, channels) = array.dim();
        let (h, w) = (u32::try_from(h)?, u32::try_from(w)?);
        let raw = array.as_standard_layout().into_owned().into_raw_vec();
        let mismatch = || format_err!("the pixel buffer does not match the image size");

        let image = match channels {
            1 => Self::Gray(ImageBuffer::from_raw(w, h, raw).ok_or_else(mismatch)?),
            3 => Self::Rgb(ImageBuffer::from_raw(w, h, raw).ok_or_else(mismatch)?),
            _ => bail!("expect 1 or 3 channels, but get {}", channels),
        };
        Ok(image)
    }

    pub fn channels(&self) -> ImageChannels {
        match self {
            Self::Gray(_) => ImageChannels::Gray,
            Self::Rgb(_) => ImageChannels::Rgb,
        }
    }

    pub fn size(&self) -> Result<HW<u32>> {
        let (w, h) = match self {
            Self::Gray(image) => image.dimensions(),
            Self::Rgb(image) => image.dimensions(),
        };
        HW::try_from_hw([h, w])
    }

    /// Crop to a pixel region within the image.
    pub fn crop(&self, region: &TLBR<u32>) -> Result<Self> {
        let [img_h, img_w] = self.size()?.hw();
        ensure!(
            region.b() <= img_h && region.r() <= img_w && region.h() > 0 && region.w() > 0,
            "crop region {:?} is not a non-empty region within the image of size {}x{}",
            region,
            img_h,
            img_w
        );
        let [t, l, h, w] = [region.t(), region.l(), region.h(), region.w()];

        let image = match self {
            Self::Gray(image) => Self::Gray(imageops::crop_imm(image, l, t, w, h).to_image()),
            Self::Rgb(image) => Self::Rgb(imageops::crop_imm(image, l, t, w, h).to_image()),
        };
        Ok(image)
    }

    /// Resize with bilinear interpolation.
    pub fn resize(&self, size: &HW<u32>) -> Self {
        let [h, w] = size.hw();
        match self {
            Self::Gray(image) => Self::Gray(imageops::resize(image, w, h, FilterType::Triangle)),
            Self::Rgb(image) => Self::Rgb(imageops::resize(image, w, h, FilterType::Triangle)),
        }
    }

    /// Convert to an array of shape `[height, width, channels]`.
    pub fn into_array(self) -> Result<Array3<f32>> {
        let [h, w] = self.size()?.hw();
        let channels = self.channels().count();
        let raw = match self {
            Self::Gray(image) => image.into_raw(),
            Self::Rgb(image) => image.into_raw(),
        };
        let array = Array3::from_shape_vec((h as usize, w as usize, channels), raw)?;
        Ok(array)
    }
}

fn to_float<P>(width: u32, height: u32, raw: Vec<u8>) -> Result<ImageBuffer<P, Vec<f32>>>
where
    P: Pixel<Subpixel = f32>,
{
    let data: Vec<f32> = raw
        .into_iter()
        .map(|value| value as f32 / PIXEL_DEPTH)
        .collect();
    ImageBuffer::from_raw(width, height, data)
        .ok_or_else(|| format_err!("the pixel buffer does not match the image size"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use image::GrayImage;
    use std::io::Cursor;

    fn encode_png(image: DynamicImage) -> Vec<u8> {
        let mut bytes = Cursor::new(vec![]);
        image
            .write_to(&mut bytes, image::ImageOutputFormat::Png)
            .unwrap();
        bytes.into_inner()
    }

    #[test]
    fn decode_gray_and_rgb() {
        let image = RgbImage::from_fn(4, 3, |x, y| Rgb([x as u8 * 60, y as u8 * 100, 255]));
        let bytes = encode_png(DynamicImage::ImageRgb8(image));

        let rgb = FloatImage::decode(&bytes, ImageChannels::Rgb).unwrap();
        assert_eq!(rgb.size().unwrap().hw(), [3, 4]);
        let array = rgb.into_array().unwrap();
        assert_eq!(array.dim(), (3, 4, 3));
        assert_abs_diff_eq!(array[[2, 1, 0]], 60.0 / 255.0);
        assert_abs_diff_eq!(array[[2, 1, 1]], 200.0 / 255.0);
        assert_abs_diff_eq!(array[[2, 1, 2]], 1.0);

        let gray = FloatImage::decode(&bytes, ImageChannels::Gray).unwrap();
        assert_eq!(gray.channels(), ImageChannels::Gray);
        assert_eq!(gray.into_array().unwrap().dim(), (3, 4, 1));
    }

    #[test]
    fn array_conversion_keeps_layout() {
        let array = Array3::from_shape_fn((2, 3, 3), |(y, x, c)| (y * 9 + x * 3 + c) as f32 / 20.0);
        let image = FloatImage::from_array(array.clone()).unwrap();
        assert_eq!(image.channels(), ImageChannels::Rgb);
        assert_eq!(image.size().unwrap().hw(), [2, 3]);
        assert_eq!(image.into_array().unwrap(), array);

        let transposed = Array3::from_shape_fn((1, 4, 5), |(_, y, x)| (y * 5 + x) as f32 / 20.0)
            .permuted_axes([1, 2, 0]);
        let image = FloatImage::from_array(transposed.clone()).unwrap();
        assert_eq!(image.size().unwrap().hw(), [4, 5]);
        assert_eq!(image.into_array().unwrap(), transposed);

        assert!(FloatImage::from_array(Array3::zeros((4, 5, 2))).is_err());
    }

    #[test]
    fn decode_malformed_bytes_is_error() {
        assert!(FloatImage::decode(b"not an image", ImageChannels::Gray).is_err());
    }

    #[test]
    fn crop_then_resize() {
        let image = GrayImage::from_fn(20, 10, |x, _| Luma([if x < 10 { 0 } else { 255 }]));
        let image = FloatImage::from_dynamic(&DynamicImage::ImageLuma8(image), ImageChannels::Gray)
            .unwrap();

        let region = TLBR::try_from_tlbr([2, 12, 8, 18]).unwrap();
        let cropped = image.crop(&region).unwrap();
        assert_eq!(cropped.size().unwrap().hw(), [6, 6]);

        let resized = cropped.resize(&HW::try_from_hw([3, 5]).unwrap());
        let array = resized.into_array().unwrap();
        assert_eq!(array.dim(), (3, 5, 1));
        array
            .iter()
            .for_each(|&value| assert_abs_diff_eq!(value, 1.0, epsilon = 1e-5));

        let outside = TLBR::try_from_tlbr([0, 15, 11, 20]).unwrap();
        assert!(image.crop(&outside).is_err());
    }
}
