/// Linear mapping from averaged reader output to reported units.
///
/// `in_min..in_max` is mapped onto `out_min..out_max`. Values outside the
/// input range are extrapolated, not clamped.
///
/// # Examples
///
/// ```
/// use adc_change_detector::Rescale;
///
/// // 12-bit ADC with a 3.3 V reference
/// let rescale = Rescale::adc(12, 3.3);
///
/// assert_eq!(rescale.in_max, 4095.0);
/// assert!((rescale.apply(4095.0) - 3.3).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(serde::Deserialize))]
pub struct Rescale {
    pub in_min: f32,
    pub in_max: f32,
    pub out_min: f32,
    pub out_max: f32,
}

impl Rescale {
    /// Passes values through unchanged, for readers that already return
    /// physical units.
    pub const fn identity() -> Self {
        Self {
            in_min: 0.0,
            in_max: 1.0,
            out_min: 0.0,
            out_max: 1.0,
        }
    }

    pub const fn new(in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> Self {
        Self {
            in_min,
            in_max,
            out_min,
            out_max,
        }
    }

    /// Maps the full count range of an ADC with `precision` bits onto
    /// `0..vref`.
    ///
    /// `precision` 0 yields a degenerate mapping that
    /// [`is_valid`](Rescale::is_valid) rejects; precisions of 64 bits and
    /// more saturate.
    pub fn adc(precision: u32, vref: f32) -> Self {
        let max_adc_value = 1u64.checked_shl(precision).map_or(u64::MAX, |steps| steps - 1);

        Self::new(0.0, max_adc_value as f32, 0.0, vref)
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// Returns `false` when the mapping would divide by zero or carries a
    /// non-finite bound.
    pub fn is_valid(&self) -> bool {
        [self.in_min, self.in_max, self.out_min, self.out_max]
            .iter()
            .all(|bound| bound.is_finite())
            && self.in_max != self.in_min
    }

    pub fn apply(&self, value: f32) -> f32 {
        if self.is_identity() {
            return value;
        }

        valmap(value, self.in_min, self.in_max, self.out_min, self.out_max)
    }
}

impl Default for Rescale {
    fn default() -> Self {
        Self::identity()
    }
}

fn valmap(x: f32, x0: f32, x1: f32, y0: f32, y1: f32) -> f32 {
    y0 + (y1 - y0) * ((x - x0) / (x1 - x0))
}
