use super::{Rect, LTWH};
use crate::common::*;

/// Bounding box in TLBR format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TLBR<T> {
    pub(crate) t: T,
    pub(crate) l: T,
    pub(crate) b: T,
    pub(crate) r: T,
}

impl<T> TLBR<T> {
    pub fn try_cast<V>(self) -> Option<TLBR<V>>
    where
        T: ToPrimitive,
        V: NumCast,
    {
        Some(TLBR {
            t: V::from(self.t)?,
            l: V::from(self.l)?,
            b: V::from(self.b)?,
            r: V::from(self.r)?,
        })
    }
}

impl<T> Rect for TLBR<T>
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
        self.b
    }

    fn r(&self) -> Self::Type {
        self.r
    }

    fn h(&self) -> Self::Type {
        self.b - self.t
    }

    fn w(&self) -> Self::Type {
        self.r - self.l
    }

    fn try_from_tlbr(tlbr: [Self::Type; 4]) -> Result<Self> {
        let [t, l, b, r] = tlbr;
        ensure!(b >= t && r >= l, "b >= t and r >= l must hold");

        Ok(Self { t, l, b, r })
    }

    fn try_from_ltwh(ltwh: [Self::Type; 4]) -> Result<Self> {
        let [l, t, w, h] = ltwh;
        Self::try_from_tlbr([t, l, t + h, l + w])
    }
}

impl<T> From<LTWH<T>> for TLBR<T>
where
    T: Copy + Num,
{
    fn from(from: LTWH<T>) -> Self {
        Self::from(&from)
    }
}

impl<T> From<&LTWH<T>> for TLBR<T>
where
    T: Copy + Num,
{
    fn from(from: &LTWH<T>) -> Self {
        let LTWH { l, t, w, h } = *from;
        Self {
            t,
            l,
            b: t + h,
            r: l + w,
        }
    }
}
