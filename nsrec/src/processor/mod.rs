//! Image and bounding box processors.

mod fix_bbox;
mod float_image;
mod normalize;

pub use fix_bbox::*;
pub use float_image::*;
pub use normalize::*;

/// The maximum value of 8-bit pixels.
pub const PIXEL_DEPTH: f32 = 255.0;
