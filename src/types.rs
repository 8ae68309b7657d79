//! Common types and traits shared by the packing model.
//!
//! All lengths are millimetres stored as `f64`. Dimensions coming from the
//! order system are integral, but depths split between side-by-side pairs are
//! not, so a single floating representation is used throughout.

/// Global numerical tolerance for millimetre comparisons.
///
/// Used wherever depths or widths are compared against a limit.
pub const EPSILON_MM: f64 = 1e-6;

/// Overhang applied to pallet types loaded from the catalog.
pub const DEFAULT_PALLET_OVERHANG_MM: f64 = 700.0;

/// Trait for objects with a width and a height as seen from the front of the pallet.
///
/// Width runs along the pallet length, height is the upright window height.
pub trait Dimensioned {
    /// Width in mm.
    fn width_mm(&self) -> f64;

    /// Height in mm.
    fn height_mm(&self) -> f64;
}

/// Trait for objects that occupy depth on a pallet.
pub trait Deep {
    /// Occupied depth in mm.
    fn depth_mm(&self) -> f64;
}

/// Validation helpers for scalar inputs.
pub mod validation {

    /// Validates a single length.
    ///
    /// # Parameters
    /// * `value` - The value to validate
    /// * `name` - Name of the length for error messages
    ///
    /// # Returns
    /// `Ok(())` for valid values, otherwise error text
    pub fn validate_length(value: f64, name: &str) -> Result<(), String> {
        if value.is_nan() {
            return Err(format!("{} must not be NaN", name));
        }
        if value.is_infinite() {
            return Err(format!("{} must not be infinite", name));
        }
        if value <= 0.0 {
            return Err(format!("{} must be positive, got: {}", name, value));
        }
        Ok(())
    }

    /// Validates a length that may be zero (gaps, overhangs).
    pub fn validate_non_negative(value: f64, name: &str) -> Result<(), String> {
        if !value.is_finite() {
            return Err(format!("{} must be a finite number", name));
        }
        if value < 0.0 {
            return Err(format!("{} must not be negative, got: {}", name, value));
        }
        Ok(())
    }

    /// Validates a ratio in the closed range `[0, 1]`.
    pub fn validate_ratio(value: f64, name: &str) -> Result<(), String> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(format!("{} must be between 0 and 1, got: {}", name, value));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_length() {
        assert!(validation::validate_length(10.0, "Width").is_ok());
        assert!(validation::validate_length(0.0, "Width").is_err());
        assert!(validation::validate_length(-1.0, "Width").is_err());
        assert!(validation::validate_length(f64::NAN, "Width").is_err());
        assert!(validation::validate_length(f64::INFINITY, "Width").is_err());
    }

    #[test]
    fn test_validate_non_negative() {
        assert!(validation::validate_non_negative(0.0, "Gap").is_ok());
        assert!(validation::validate_non_negative(100.0, "Gap").is_ok());
        assert!(validation::validate_non_negative(-0.5, "Gap").is_err());
        assert!(validation::validate_non_negative(f64::NAN, "Gap").is_err());
    }

    #[test]
    fn test_validate_ratio() {
        assert!(validation::validate_ratio(0.0, "Threshold").is_ok());
        assert!(validation::validate_ratio(0.15, "Threshold").is_ok());
        assert!(validation::validate_ratio(1.0, "Threshold").is_ok());
        assert!(validation::validate_ratio(1.01, "Threshold").is_err());
        assert!(validation::validate_ratio(-0.1, "Threshold").is_err());
    }
}
