use super::{HW, LTWH, TLBR};
use crate::common::*;

/// The generic rectangle.
pub trait Rect {
    type Type;

    fn t(&self) -> Self::Type;
    fn l(&self) -> Self::Type;
    fn b(&self) -> Self::Type;
    fn r(&self) -> Self::Type;
    fn h(&self) -> Self::Type;
    fn w(&self) -> Self::Type;

    fn try_from_tlbr(tlbr: [Self::Type; 4]) -> Result<Self>
    where
        Self: Sized;

    fn try_from_ltwh(ltwh: [Self::Type; 4]) -> Result<Self>
    where
        Self: Sized;
}

pub trait RectNum: Rect
where
    Self::Type: Num + PartialOrd,
{
    fn tlbr(&self) -> [Self::Type; 4] {
        [self.t(), self.l(), self.b(), self.r()]
    }

    fn ltwh(&self) -> [Self::Type; 4] {
        [self.l(), self.t(), self.w(), self.h()]
    }

    fn hw(&self) -> [Self::Type; 2] {
        [self.h(), self.w()]
    }

    fn to_tlbr(&self) -> TLBR<Self::Type> {
        TLBR {
            t: self.t(),
            l: self.l(),
            b: self.b(),
            r: self.r(),
        }
    }

    fn to_ltwh(&self) -> LTWH<Self::Type> {
        LTWH {
            l: self.l(),
            t: self.t(),
            w: self.w(),
            h: self.h(),
        }
    }

    fn area(&self) -> Self::Type {
        self.h() * self.w()
    }
}

pub trait RectFloat: RectNum
where
    Self::Type: Float,
{
    /// Compute the smallest rectangle enclosing both rectangles.
    fn closure_with<R>(&self, other: &R) -> TLBR<Self::Type>
    where
        R: Rect<Type = Self::Type>,
    {
        TLBR {
            t: self.t().min(other.t()),
            l: self.l().min(other.l()),
            b: self.b().max(other.b()),
            r: self.r().max(other.r()),
        }
    }

    fn intersect_with<R>(&self, other: &R) -> Option<TLBR<Self::Type>>
    where
        R: Rect<Type = Self::Type>,
    {
        let t = self.t().max(other.t());
        let l = self.l().max(other.l());
        let b = self.b().min(other.b());
        let r = self.r().min(other.r());
        (b > t && r > l).then(|| TLBR { t, l, b, r })
    }

    /// Clip the rectangle into the `[0, h] x [0, w]` canvas.
    fn clamp_to(&self, size: &HW<Self::Type>) -> TLBR<Self::Type> {
        let zero = Self::Type::zero();
        let clamp = |value: Self::Type, max: Self::Type| value.max(zero).min(max);
        let t = clamp(self.t(), size.h());
        let l = clamp(self.l(), size.w());
        let b = clamp(self.b(), size.h()).max(t);
        let r = clamp(self.r(), size.w()).max(l);
        TLBR { t, l, b, r }
    }

    /// Express the rectangle in ratio units of the canvas size.
    fn to_ratio(&self, size: &HW<Self::Type>) -> LTWH<Self::Type> {
        LTWH {
            l: self.l() / size.w(),
            t: self.t() / size.h(),
            w: self.w() / size.w(),
            h: self.h() / size.h(),
        }
    }

    fn is_finite(&self) -> bool {
        self.t().is_finite() && self.l().is_finite() && self.b().is_finite() && self.r().is_finite()
    }
}

impl<T> RectNum for T
where
    T: Rect,
    T::Type: Num + PartialOrd,
{
}

impl<T> RectFloat for T
where
    T: Rect,
    T::Type: Float,
{
}

/// Compute the enclosing rectangle of a sequence of rectangles.
///
/// It returns `None` if the sequence is empty.
pub fn closure_of<'a, R, T>(rects: impl IntoIterator<Item = &'a R>) -> Option<TLBR<T>>
where
    R: 'a + Rect<Type = T>,
    T: Float,
{
    let mut iter = rects.into_iter();
    let first = iter.next()?.to_tlbr();
    Some(iter.fold(first, |closure, rect| closure.closure_with(rect)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn rect_closure() {
        let lhs = LTWH::try_from_ltwh([10.0, 20.0, 5.0, 30.0]).unwrap();
        let rhs = LTWH::try_from_ltwh([18.0, 15.0, 6.0, 10.0]).unwrap();
        let closure = lhs.closure_with(&rhs);
        assert_eq!(closure.tlbr(), [15.0, 10.0, 50.0, 24.0]);
    }

    #[test]
    fn rect_closure_of_sequence() {
        let rects = vec![
            LTWH::try_from_ltwh([246.0, 77.0, 81.0, 219.0]).unwrap(),
            LTWH::try_from_ltwh([323.0, 81.0, 96.0, 219.0]).unwrap(),
        ];
        let closure = closure_of(&rects).unwrap();
        assert_eq!(closure.ltwh(), [246.0, 77.0, 173.0, 223.0]);

        let empty: Vec<LTWH<f64>> = vec![];
        assert!(closure_of(&empty).is_none());
    }

    #[test]
    fn rect_intersection() {
        let lhs = TLBR::try_from_tlbr([0.0, 0.0, 10.0, 10.0]).unwrap();
        let rhs = TLBR::try_from_tlbr([5.0, 5.0, 20.0, 20.0]).unwrap();
        let far = TLBR::try_from_tlbr([11.0, 11.0, 20.0, 20.0]).unwrap();
        assert_abs_diff_eq!(lhs.intersect_with(&rhs).unwrap().area(), 25.0);
        assert!(lhs.intersect_with(&far).is_none());
    }

    #[test]
    fn rect_clamp() {
        let size = HW::try_from_hw([100.0, 50.0]).unwrap();
        let rect = TLBR::try_from_tlbr([-5.0, 40.0, 120.0, 70.0]).unwrap();
        assert_eq!(rect.clamp_to(&size).tlbr(), [0.0, 40.0, 100.0, 50.0]);

        let outside = TLBR::try_from_tlbr([110.0, 60.0, 130.0, 80.0]).unwrap();
        let clamped = outside.clamp_to(&size);
        assert_eq!(clamped.tlbr(), [100.0, 50.0, 100.0, 50.0]);
        assert_abs_diff_eq!(clamped.area(), 0.0);
    }

    #[test]
    fn rect_ratio() {
        let size = HW::try_from_hw([200.0, 100.0]).unwrap();
        let rect = LTWH::try_from_ltwh([10.0, 20.0, 50.0, 100.0]).unwrap();
        let ratio = rect.to_ratio(&size);
        assert_abs_diff_eq!(ratio.l(), 0.1);
        assert_abs_diff_eq!(ratio.t(), 0.1);
        assert_abs_diff_eq!(ratio.w(), 0.5);
        assert_abs_diff_eq!(ratio.h(), 0.5);
    }
}
