use super::{Rect, TLBR};
use crate::common::*;

/// Bounding box in LTWH format, the layout used by annotation files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LTWH<T> {
    pub(crate) l: T,
    pub(crate) t: T,
    pub(crate) w: T,
    pub(crate) h: T,
}

impl<T> LTWH<T> {
    pub fn try_cast<V>(self) -> Option<LTWH<V>>
    where
        T: ToPrimitive,
        V: NumCast,
    {
        Some(LTWH {
            l: V::from(self.l)?,
            t: V::from(self.t)?,
            w: V::from(self.w)?,
            h: V::from(self.h)?,
        })
    }
}

impl<T> Rect for LTWH<T>
where
    T: Copy + Num + PartialOrd,
{
    type Type = T;

    fn t(&self) -> Self::Type {
        self.t
    }

    fn l(&self) -> Self::Type {
        self.l
    }

    fn b(&self) -> Self::Type {
        self.t + self.h
    }

    fn r(&self) -> Self::Type {
        self.l + self.w
    }

    fn h(&self) -> Self::Type {
        self.h
    }

    fn w(&self) -> Self::Type {
        self.w
    }

    fn try_from_tlbr(tlbr: [Self::Type; 4]) -> Result<Self> {
        let [t, l, b, r] = tlbr;
        ensure!(b >= t && r >= l, "b >= t and r >= l must hold");

        Ok(Self {
            l,
            t,
            w: r - l,
            h: b - t,
        })
    }

    fn try_from_ltwh(ltwh: [Self::Type; 4]) -> Result<Self> {
        let [l, t, w, h] = ltwh;
        let zero = T::zero();
        ensure!(w >= zero && h >= zero, "w and h must be non-negative");

        Ok(Self { l, t, w, h })
    }
}

impl<T> From<TLBR<T>> for LTWH<T>
where
    T: Copy + Num,
{
    fn from(from: TLBR<T>) -> Self {
        Self::from(&from)
    }
}

impl<T> From<&TLBR<T>> for LTWH<T>
where
    T: Copy + Num,
{
    fn from(from: &TLBR<T>) -> Self {
        let TLBR { t, l, b, r } = *from;
        Self {
            l,
            t,
            w: r - l,
            h: b - t,
        }
    }
}
