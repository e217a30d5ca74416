//! Digit box labels and the one-hot number label encoding.

mod class;
mod encoder;

pub use class::*;
pub use encoder::*;

use bbox::{Rect, LTWH};

/// A rectangle tagged with a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label<R, C>
where
    R: Rect,
{
    pub rect: R,
    pub class: C,
}

/// The box of a single digit in source image pixel units.
pub type DigitBox = Label<LTWH<f64>, DigitClass>;
