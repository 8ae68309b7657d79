//! Data models for pallet packing.
//!
//! This module defines the fundamental data structures of the optimizer:
//! - `WindowInput`: A window position of an order, as delivered by the order system
//! - `PalletDefinition`: A pallet type with length, load depth and overhang limits
//! - `OptimizedWindow`: A single unit window with its occupied depth
//! - `OptimizedPallet`: A pallet with the windows loaded onto it
//!
//! All structures implement the traits from the `types` module where applicable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use crate::geometry::{fits_depth, fits_length, remaining_depth, utilization_percent};
use crate::types::{DEFAULT_PALLET_OVERHANG_MM, Deep, Dimensioned, validation};

/// Depth per profile type, keyed by the profile name (e.g. `AWS75`).
///
/// Ordered so that serialized catalogs and fingerprints are stable.
pub type ProfileDepths = BTreeMap<String, f64>;

/// Validation error for window, pallet and option data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Delivery has no windows to optimize")]
    NoWindows,
    #[error("No profile depths configured in database")]
    NoProfileDepths,
    #[error("No pallet types defined in database")]
    NoPalletTypes,
    #[error("Window width must be positive (order: {order_number})")]
    NonPositiveWidth { order_number: String },
    #[error("Window height must be positive (order: {order_number})")]
    NonPositiveHeight { order_number: String },
    #[error("Window quantity must be positive (order: {order_number})")]
    NonPositiveQuantity { order_number: String },
    #[error("Delivery has {total} windows, at most {max} can be optimized at once")]
    TooManyWindows { total: u64, max: u64 },
    #[error("Unknown profile type: {0} - please configure it in settings")]
    UnknownProfileType(String),
    #[error(
        "Window {width_mm}mm is too wide for any pallet (max: {max_length_mm}mm + {max_overhang_mm}mm)"
    )]
    WindowTooWide {
        width_mm: f64,
        max_length_mm: f64,
        max_overhang_mm: f64,
    },
    #[error(
        "Window depth {depth_mm}mm ({profile_type}) exceeds every pallet load depth (max: {max_load_depth_mm}mm)"
    )]
    WindowTooDeep {
        profile_type: String,
        depth_mm: f64,
        max_load_depth_mm: f64,
    },
    #[error("Invalid profile depth for {profile_type}: {reason}")]
    InvalidProfileDepth { profile_type: String, reason: String },
    #[error("Invalid pallet definition: {0}")]
    InvalidPallet(String),
    #[error("Invalid option: {0}")]
    InvalidOption(String),
}

/// A window position of an order destined for one delivery.
///
/// # Fields
/// * `id` - Window record id
/// * `order_id` / `order_number` - Owning order
/// * `width_mm` / `height_mm` - Outer dimensions
/// * `profile_type` - Profile system, mapped to a depth by `ProfileDepths`
/// * `quantity` - Number of identical units
/// * `reference` - Optional customer reference
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "id": 1,
    "orderId": 100,
    "orderNumber": "Z-001",
    "widthMm": 1000.0,
    "heightMm": 1500.0,
    "profileType": "AWS75",
    "quantity": 2,
    "reference": "REF-001"
}))]
pub struct WindowInput {
    pub id: u64,
    pub order_id: u64,
    pub order_number: String,
    pub width_mm: f64,
    pub height_mm: f64,
    pub profile_type: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl WindowInput {
    /// Checks width, height and quantity.
    ///
    /// Profile types are checked later against the configured depths.
    ///
    /// # Examples
    /// ```
    /// use pallet_optimizer::model::WindowInput;
    ///
    /// let window = WindowInput {
    ///     id: 1,
    ///     order_id: 100,
    ///     order_number: "Z-001".to_string(),
    ///     width_mm: 0.0,
    ///     height_mm: 1500.0,
    ///     profile_type: "AWS75".to_string(),
    ///     quantity: 1,
    ///     reference: None,
    /// };
    /// assert!(window.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ValidationError> {
        if validation::validate_length(self.width_mm, "Width").is_err() {
            return Err(ValidationError::NonPositiveWidth {
                order_number: self.order_number.clone(),
            });
        }
        if validation::validate_length(self.height_mm, "Height").is_err() {
            return Err(ValidationError::NonPositiveHeight {
                order_number: self.order_number.clone(),
            });
        }
        if self.quantity == 0 {
            return Err(ValidationError::NonPositiveQuantity {
                order_number: self.order_number.clone(),
            });
        }
        Ok(())
    }

    /// Looks up the depth of this window's profile.
    pub fn resolve_depth(&self, depths: &ProfileDepths) -> Result<f64, ValidationError> {
        depths
            .get(&self.profile_type)
            .copied()
            .ok_or_else(|| ValidationError::UnknownProfileType(self.profile_type.clone()))
    }
}

impl Dimensioned for WindowInput {
    fn width_mm(&self) -> f64 {
        self.width_mm
    }

    fn height_mm(&self) -> f64 {
        self.height_mm
    }
}

/// Validates a single profile depth entry.
pub fn validate_profile_depth(profile_type: &str, depth_mm: f64) -> Result<(), ValidationError> {
    if profile_type.trim().is_empty() {
        return Err(ValidationError::InvalidProfileDepth {
            profile_type: profile_type.to_string(),
            reason: "profile type must not be empty".to_string(),
        });
    }
    validation::validate_length(depth_mm, "Depth").map_err(|reason| {
        ValidationError::InvalidProfileDepth {
            profile_type: profile_type.to_string(),
            reason,
        }
    })
}

fn default_overhang() -> f64 {
    DEFAULT_PALLET_OVERHANG_MM
}

/// A pallet type the packer may open.
///
/// # Fields
/// * `name` - Display name of the pallet type
/// * `length_mm` - Pallet length, measured along the window width
/// * `max_load_depth_mm` - Usable loading depth
/// * `max_overhang_mm` - How far a single window may protrude beyond the length
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "name": "Standard",
    "lengthMm": 2500.0,
    "maxLoadDepthMm": 1200.0,
    "maxOverhangMm": 700.0
}))]
pub struct PalletDefinition {
    pub name: String,
    pub length_mm: f64,
    pub max_load_depth_mm: f64,
    #[serde(default = "default_overhang")]
    pub max_overhang_mm: f64,
}

impl PalletDefinition {
    /// Creates a new pallet definition after validating the parameters.
    pub fn new(
        name: impl Into<String>,
        length_mm: f64,
        max_load_depth_mm: f64,
        max_overhang_mm: f64,
    ) -> Result<Self, ValidationError> {
        let definition = Self {
            name: name.into(),
            length_mm,
            max_load_depth_mm,
            max_overhang_mm,
        };
        definition.validate()?;
        Ok(definition)
    }

    /// Checks length, load depth and overhang.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate_length(self.length_mm, "Pallet length")
            .and_then(|_| validation::validate_length(self.max_load_depth_mm, "Load depth"))
            .and_then(|_| validation::validate_non_negative(self.max_overhang_mm, "Overhang"))
            .map_err(|reason| ValidationError::InvalidPallet(format!("{}: {}", self.name, reason)))
    }

    /// Overhang actually allowed on this pallet for the requested limit.
    pub fn effective_overhang(&self, requested_mm: f64) -> f64 {
        self.max_overhang_mm.min(requested_mm)
    }

    /// Name used for a pallet of this type at the given position in the load plan.
    ///
    /// Small pallets ("mała") keep their marker, all others are named by length.
    pub fn type_name(&self, pallet_number: usize) -> String {
        if self.name.to_lowercase().contains("mała") {
            format!("Paleta_{}_mała", pallet_number)
        } else {
            self.length_name(pallet_number)
        }
    }

    /// Length based name, used regardless of the pallet type name.
    pub fn length_name(&self, pallet_number: usize) -> String {
        format!("Paleta_{}_{}", pallet_number, self.length_mm)
    }

    /// Instantiates an empty pallet of this type.
    pub fn instantiate(&self, pallet_number: usize, pallet_type: String) -> OptimizedPallet {
        OptimizedPallet {
            pallet_number,
            pallet_type,
            pallet_length_mm: self.length_mm,
            max_depth_mm: self.max_load_depth_mm,
            used_depth_mm: 0.0,
            utilization_percent: 0.0,
            windows: Vec::new(),
        }
    }
}

/// A single unit window with the depth it occupies on a pallet.
///
/// For side-by-side pairs both windows carry half of the shared slot depth and
/// the same `side_by_side_group_id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OptimizedWindow {
    #[serde(flatten)]
    pub window: WindowInput,
    pub depth_mm: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side_by_side_group_id: Option<u32>,
}

impl OptimizedWindow {
    /// Creates a single (not paired) unit window.
    pub fn single(window: WindowInput, depth_mm: f64) -> Self {
        Self {
            window,
            depth_mm,
            side_by_side_group_id: None,
        }
    }

    /// Returns a copy marked as member of a side-by-side group.
    pub fn paired(&self, depth_mm: f64, group_id: u32) -> Self {
        Self {
            window: self.window.clone(),
            depth_mm,
            side_by_side_group_id: Some(group_id),
        }
    }

    /// Indicates whether the window shares its depth slot with another one.
    pub fn is_side_by_side(&self) -> bool {
        self.side_by_side_group_id.is_some()
    }
}

impl Dimensioned for OptimizedWindow {
    fn width_mm(&self) -> f64 {
        self.window.width_mm
    }

    fn height_mm(&self) -> f64 {
        self.window.height_mm
    }
}

impl Deep for OptimizedWindow {
    fn depth_mm(&self) -> f64 {
        self.depth_mm
    }
}

/// A pallet of the load plan with its windows.
///
/// # Fields
/// * `pallet_number` - Position in the load plan (1-based)
/// * `pallet_type` - Generated type name, e.g. `Paleta_1_2500`
/// * `pallet_length_mm` - Length of the pallet type
/// * `max_depth_mm` / `used_depth_mm` - Loading depth limit and usage
/// * `utilization_percent` - `used / max * 100`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OptimizedPallet {
    pub pallet_number: usize,
    pub pallet_type: String,
    pub pallet_length_mm: f64,
    pub max_depth_mm: f64,
    pub used_depth_mm: f64,
    pub utilization_percent: f64,
    pub windows: Vec<OptimizedWindow>,
}

impl OptimizedPallet {
    /// Checks if a width fits along the pallet length with the given overhang.
    pub fn fits_width(&self, width_mm: f64, overhang_mm: f64) -> bool {
        fits_length(width_mm, self.pallet_length_mm, overhang_mm)
    }

    /// Checks if additional depth still fits.
    pub fn has_depth_for(&self, depth_mm: f64) -> bool {
        fits_depth(self.used_depth_mm, depth_mm, self.max_depth_mm)
    }

    /// Depth left after loading `depth_mm` more.
    pub fn remaining_after(&self, depth_mm: f64) -> f64 {
        remaining_depth(self.used_depth_mm, depth_mm, self.max_depth_mm)
    }

    /// Loads windows occupying `slot_depth_mm` in total and updates the usage.
    pub fn load(&mut self, windows: impl IntoIterator<Item = OptimizedWindow>, slot_depth_mm: f64) {
        self.windows.extend(windows);
        self.used_depth_mm += slot_depth_mm;
        self.utilization_percent = utilization_percent(self.used_depth_mm, self.max_depth_mm);
    }

    /// Number of unit windows on the pallet.
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    /// Orders windows from the tallest to the lowest.
    ///
    /// The sort is stable, windows of equal height keep their loading order.
    pub fn sort_for_stacking(&mut self) {
        self.windows.sort_by(|a, b| b.height_mm().total_cmp(&a.height_mm()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(width: f64, height: f64, quantity: u32) -> WindowInput {
        WindowInput {
            id: 1,
            order_id: 100,
            order_number: "Z-001".to_string(),
            width_mm: width,
            height_mm: height,
            profile_type: "AWS75".to_string(),
            quantity,
            reference: None,
        }
    }

    #[test]
    fn validate_reports_order_number() {
        let err = window(-100.0, 1500.0, 1).validate().unwrap_err();
        assert_eq!(err.to_string(), "Window width must be positive (order: Z-001)");

        let err = window(1000.0, 0.0, 1).validate().unwrap_err();
        assert!(matches!(err, ValidationError::NonPositiveHeight { .. }));

        let err = window(1000.0, 1500.0, 0).validate().unwrap_err();
        assert!(matches!(err, ValidationError::NonPositiveQuantity { .. }));

        assert!(window(f64::NAN, 1500.0, 1).validate().is_err());
        assert!(window(1000.0, 1500.0, 1).validate().is_ok());
    }

    #[test]
    fn resolve_depth_rejects_unknown_profile() {
        let mut depths = ProfileDepths::new();
        depths.insert("AWS75".to_string(), 100.0);

        assert_eq!(window(1000.0, 1500.0, 1).resolve_depth(&depths), Ok(100.0));

        let mut unknown = window(1000.0, 1500.0, 1);
        unknown.profile_type = "UNKNOWN_PROFILE".to_string();
        let err = unknown.resolve_depth(&depths).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown profile type: UNKNOWN_PROFILE - please configure it in settings"
        );
    }

    #[test]
    fn pallet_definition_validation() {
        assert!(PalletDefinition::new("Standard", 2500.0, 1200.0, 700.0).is_ok());
        assert!(PalletDefinition::new("Broken", 0.0, 1200.0, 700.0).is_err());
        assert!(PalletDefinition::new("Broken", 2500.0, -1.0, 700.0).is_err());
        assert!(PalletDefinition::new("Broken", 2500.0, 1200.0, -1.0).is_err());
    }

    #[test]
    fn pallet_definition_deserializes_default_overhang() {
        let json = r#"{"name": "Standard", "lengthMm": 2500, "maxLoadDepthMm": 1200}"#;
        let def: PalletDefinition = serde_json::from_str(json).expect("valid pallet JSON");
        assert_eq!(def.max_overhang_mm, DEFAULT_PALLET_OVERHANG_MM);
    }

    #[test]
    fn type_name_marks_small_pallets() {
        let small = PalletDefinition::new("Mała", 1500.0, 1000.0, 700.0).unwrap();
        let standard = PalletDefinition::new("Standard", 2500.0, 1200.0, 700.0).unwrap();
        assert_eq!(small.type_name(2), "Paleta_2_mała");
        assert_eq!(standard.type_name(1), "Paleta_1_2500");
    }

    #[test]
    fn pallet_load_updates_utilization() {
        let def = PalletDefinition::new("Standard", 2500.0, 1200.0, 700.0).unwrap();
        let mut pallet = def.instantiate(1, def.type_name(1));
        let unit = OptimizedWindow::single(window(1000.0, 1500.0, 1), 300.0);

        pallet.load([unit.clone(), unit], 600.0);
        assert_eq!(pallet.window_count(), 2);
        assert!((pallet.used_depth_mm - 600.0).abs() < 1e-9);
        assert!((pallet.utilization_percent - 50.0).abs() < 1e-9);
        assert!(pallet.has_depth_for(600.0));
        assert!(!pallet.has_depth_for(601.0));
    }

    #[test]
    fn optimized_window_flattens_input_fields() {
        let unit = OptimizedWindow::single(window(1000.0, 1500.0, 1), 100.0).paired(50.0, 3);
        let value = serde_json::to_value(&unit).unwrap();
        assert_eq!(value["widthMm"], 1000.0);
        assert_eq!(value["depthMm"], 50.0);
        assert_eq!(value["sideBySideGroupId"], 3);
        assert!(value.get("reference").is_none());
    }
}
