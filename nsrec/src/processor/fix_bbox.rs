use crate::common::*;

/// Expands number boxes into crop regions.
///
/// The box is expanded by `expand_rate` of the image size on each side and
/// clipped into the image. An axis whose span ends up smaller than
/// `accept_min_rate` of the image size falls back to the full image extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBoxFixer {
    expand_rate: f64,
    accept_min_rate: f64,
}

impl BBoxFixer {
    pub fn new(expand_rate: R64, accept_min_rate: R64) -> Result<Self> {
        ensure!(expand_rate >= 0.0, "expand_rate must be non-negative");
        ensure!(
            (0.0..=1.0).contains(&accept_min_rate.raw()),
            "accept_min_rate must be within 0..=1"
        );

        Ok(Self {
            expand_rate: expand_rate.raw(),
            accept_min_rate: accept_min_rate.raw(),
        })
    }

    pub fn expand_rate(&self) -> f64 {
        self.expand_rate
    }

    pub fn accept_min_rate(&self) -> f64 {
        self.accept_min_rate
    }

    /// Compute the crop region in pixel units.
    pub fn fix(&self, image_size: &HW<f64>, bbox: &LTWH<f64>) -> Result<TLBR<f64>> {
        ensure!(bbox.is_finite(), "bbox {:?} is not finite", bbox);
        let [img_h, img_w] = image_size.hw();
        let margin_h = img_h * self.expand_rate;
        let margin_w = img_w * self.expand_rate;

        let expanded = TLBR::try_from_tlbr([
            bbox.t() - margin_h,
            bbox.l() - margin_w,
            bbox.b() + margin_h,
            bbox.r() + margin_w,
        ])?;
        let [mut t, mut l, mut b, mut r] = expanded.clamp_to(image_size).tlbr();

        if b - t < self.accept_min_rate * img_h {
            t = 0.0;
            b = img_h;
        }
        if r - l < self.accept_min_rate * img_w {
            l = 0.0;
            r = img_w;
        }

        TLBR::try_from_tlbr([t, l, b, r])
    }

    /// Compute the crop region snapped to whole pixels.
    pub fn fix_pixels(&self, image_size: &HW<u32>, bbox: &LTWH<f64>) -> Result<TLBR<u32>> {
        let size = image_size
            .try_cast::<f64>()
            .ok_or_else(|| format_err!("invalid image size {:?}", image_size))?;
        let region = self.fix(&size, bbox)?;
        pixel_region(&region, image_size)
    }
}

impl Default for BBoxFixer {
    fn default() -> Self {
        Self {
            expand_rate: 0.1,
            accept_min_rate: 0.05,
        }
    }
}

/// Snap a region outward to whole pixels, keeping at least one pixel per axis.
pub fn pixel_region(region: &TLBR<f64>, image_size: &HW<u32>) -> Result<TLBR<u32>> {
    let [h, w] = image_size.hw();
    let t = (region.t().floor() as u32).min(h - 1);
    let l = (region.l().floor() as u32).min(w - 1);
    let b = (region.b().ceil() as u32).clamp(t + 1, h);
    let r = (region.r().ceil() as u32).clamp(l + 1, w);
    TLBR::try_from_tlbr([t, l, b, r])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_size() -> HW<f64> {
        HW::try_from_hw([100.0, 100.0]).unwrap()
    }

    #[test]
    fn fix_bbox_expands_and_clamps() {
        let fixer = BBoxFixer::default();
        let bbox = LTWH::try_from_ltwh([10.0, 10.0, 5.0, 5.0]).unwrap();
        let region = fixer.fix(&image_size(), &bbox).unwrap();
        assert_eq!(region.tlbr(), [0.0, 0.0, 25.0, 25.0]);

        let bbox = LTWH::try_from_ltwh([40.0, 30.0, 20.0, 10.0]).unwrap();
        let region = fixer.fix(&image_size(), &bbox).unwrap();
        assert_eq!(region.tlbr(), [20.0, 30.0, 50.0, 70.0]);

        let bbox = LTWH::try_from_ltwh([95.0, 90.0, 20.0, 30.0]).unwrap();
        let region = fixer.fix(&image_size(), &bbox).unwrap();
        assert_eq!(region.tlbr(), [80.0, 85.0, 100.0, 100.0]);
    }

    #[test]
    fn fix_bbox_falls_back_to_full_extent() {
        let fixer = BBoxFixer::new(r64(0.0), r64(0.05)).unwrap();

        // too short, but wide enough
        let bbox = LTWH::try_from_ltwh([10.0, 10.0, 50.0, 2.0]).unwrap();
        let region = fixer.fix(&image_size(), &bbox).unwrap();
        assert_eq!(region.tlbr(), [0.0, 10.0, 100.0, 60.0]);

        // too narrow, but tall enough
        let bbox = LTWH::try_from_ltwh([10.0, 10.0, 4.0, 50.0]).unwrap();
        let region = fixer.fix(&image_size(), &bbox).unwrap();
        assert_eq!(region.tlbr(), [10.0, 0.0, 60.0, 100.0]);

        // completely outside the image
        let bbox = LTWH::try_from_ltwh([150.0, 150.0, 10.0, 10.0]).unwrap();
        let region = fixer.fix(&image_size(), &bbox).unwrap();
        assert_eq!(region.tlbr(), [0.0, 0.0, 100.0, 100.0]);
    }

    #[test]
    fn fix_bbox_rejects_invalid_input() {
        let fixer = BBoxFixer::default();
        let bbox = LTWH::try_from_ltwh([f64::NAN, 0.0, 1.0, 1.0]).unwrap();
        assert!(fixer.fix(&image_size(), &bbox).is_err());
        assert!(BBoxFixer::new(r64(-0.1), r64(0.05)).is_err());
        assert!(BBoxFixer::new(r64(0.1), r64(1.5)).is_err());
    }

    #[test]
    fn pixel_region_is_never_empty() {
        let size = HW::try_from_hw([32u32, 48]).unwrap();
        let fixer = BBoxFixer::new(r64(0.0), r64(0.0)).unwrap();

        let bbox = LTWH::try_from_ltwh([10.2, 4.7, 0.0, 0.0]).unwrap();
        let region = fixer.fix_pixels(&size, &bbox).unwrap();
        assert_eq!(region.tlbr(), [4, 10, 5, 11]);

        let bbox = LTWH::try_from_ltwh([1.5, 2.5, 10.2, 3.1]).unwrap();
        let region = fixer.fix_pixels(&size, &bbox).unwrap();
        assert_eq!(region.tlbr(), [2, 1, 6, 12]);
    }
}
