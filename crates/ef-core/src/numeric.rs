use crate::CoreError;

/// Floating point type used throughout system
pub type Real = f64;

/// Absolute/relative tolerance pair used for output stability checks.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-4,
            rel: 1e-6,
        }
    }
}

impl Tolerances {
    /// Both components finite and non-negative.
    pub fn validate(&self) -> Result<(), CoreError> {
        ensure_finite(self.abs, "tolerance.abs")?;
        ensure_finite(self.rel, "tolerance.rel")?;
        if self.abs < 0.0 || self.rel < 0.0 {
            return Err(CoreError::InvalidArg {
                what: "tolerances must be non-negative",
            });
        }
        Ok(())
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_equal_basic() {
        let tol = Tolerances {
            abs: 1e-12,
            rel: 1e-9,
        };
        assert!(nearly_equal(1.0, 1.0 + 1e-12, tol));
        assert!(nearly_equal(0.0, 1e-13, tol));
        assert!(!nearly_equal(1.0, 1.0 + 1e-6, tol));
    }

    #[test]
    fn default_tolerance_accepts_sub_abs_drift() {
        let tol = Tolerances::default();
        assert!(nearly_equal(165.0, 165.00005, tol));
        assert!(!nearly_equal(0.0, 0.001, tol));
    }

    #[test]
    fn negative_tolerance_rejected() {
        let tol = Tolerances { abs: -1.0, rel: 0.0 };
        assert!(tol.validate().is_err());
        assert!(Tolerances::default().validate().is_ok());
    }

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }
}
