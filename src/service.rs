//! Delivery level orchestration on top of the packer and the repository.
//!
//! The service loads the catalog, merges request options over the configured
//! defaults, runs the packer and keeps the last load plan per delivery.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use utoipa::ToSchema;

use crate::model::{PalletDefinition, ProfileDepths, ValidationError, WindowInput};
use crate::optimizer::{self, OptimizationOptions, OptimizationOptionsPatch, OptimizationResult};
use crate::store::{NewPalletType, PalletRepository, PalletType, PalletTypeUpdate, StoreError};

/// Errors of the delivery service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Delivery not ready for optimization: {}", .0.join(", "))]
    NotReady(Vec<String>),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Service task failed: {0}")]
    TaskFailed(String),
}

/// Readiness report of a delivery.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Whether a load plan exists for a delivery.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationStatus {
    pub delivery_id: u64,
    pub has_optimization: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pallets: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_utilization: Option<f64>,
}

/// Dimension overview for planning a delivery.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryDimensionsSummary {
    pub delivery_id: u64,
    pub total_windows: u64,
    pub windows_by_profile: BTreeMap<String, u64>,
    pub max_width_mm: f64,
    pub max_height_mm: f64,
    pub total_estimated_depth_mm: f64,
    pub is_ready_for_optimization: bool,
    pub missing_data: Vec<String>,
}

/// Service for packing deliveries and managing the catalog.
#[derive(Clone)]
pub struct PalletOptimizerService {
    repository: Arc<dyn PalletRepository>,
    defaults: OptimizationOptions,
}

impl PalletOptimizerService {
    /// Creates a service with the given repository and default options.
    pub fn new(repository: Arc<dyn PalletRepository>, defaults: OptimizationOptions) -> Self {
        Self {
            repository,
            defaults,
        }
    }

    /// Options applied when a request does not override them.
    pub fn default_options(&self) -> OptimizationOptions {
        self.defaults
    }

    /// Runs `f` against the service on a blocking thread.
    ///
    /// Repository access and packing are synchronous and must not run on a
    /// runtime worker.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R, ServiceError>
    where
        F: FnOnce(&PalletOptimizerService) -> Result<R, ServiceError> + Send + 'static,
        R: Send + 'static,
    {
        let service = self.clone();
        tokio::task::spawn_blocking(move || f(&service))
            .await
            .map_err(|err| ServiceError::TaskFailed(err.to_string()))?
    }

    fn merged_options(&self, patch: Option<&OptimizationOptionsPatch>) -> OptimizationOptions {
        patch.map_or(self.defaults, |p| p.apply_to(self.defaults))
    }

    /// Packs a delivery against the stored catalog and saves the load plan.
    ///
    /// A saved plan computed from identical input is returned unchanged.
    pub fn optimize_delivery(
        &self,
        delivery_id: u64,
        windows: &[WindowInput],
        patch: Option<&OptimizationOptionsPatch>,
    ) -> Result<OptimizationResult, ServiceError> {
        tracing::info!(delivery_id, positions = windows.len(), "Starting optimization");

        let report = self.validate_for_optimization(windows, patch)?;
        if !report.is_valid {
            return Err(ServiceError::NotReady(report.errors));
        }
        if !report.warnings.is_empty() {
            tracing::warn!(delivery_id, warnings = ?report.warnings, "Optimization warnings");
        }

        let options = self.merged_options(patch);
        let depths = self.repository.profile_depths()?;
        let pallets = self.repository.pallet_definitions()?;
        let fingerprint = input_fingerprint(windows, &depths, &pallets, &options)?;

        if let Some(saved) = self.repository.optimization(delivery_id)?
            && saved.input_fingerprint.as_deref() == Some(fingerprint.as_str())
        {
            tracing::info!(delivery_id, "Input unchanged, reusing saved optimization");
            return Ok(saved);
        }

        let mut result = optimizer::optimize(delivery_id, windows, &depths, &pallets, &options)?;
        result.input_fingerprint = Some(fingerprint);
        self.repository.save_optimization(&result)?;

        tracing::info!(
            delivery_id,
            total_pallets = result.total_pallets,
            total_windows = result.summary.total_windows,
            average_utilization = %format!("{:.2}", result.summary.average_utilization),
            "Optimization completed"
        );
        Ok(result)
    }

    pub fn optimization(&self, delivery_id: u64) -> Result<Option<OptimizationResult>, ServiceError> {
        Ok(self.repository.optimization(delivery_id)?)
    }

    pub fn delete_optimization(&self, delivery_id: u64) -> Result<(), ServiceError> {
        self.repository.delete_optimization(delivery_id)?;
        tracing::info!(delivery_id, "Deleted optimization");
        Ok(())
    }

    pub fn optimization_status(&self, delivery_id: u64) -> Result<OptimizationStatus, ServiceError> {
        let status = match self.repository.optimization(delivery_id)? {
            Some(saved) => OptimizationStatus {
                delivery_id,
                has_optimization: true,
                total_pallets: Some(saved.total_pallets),
                average_utilization: Some(saved.summary.average_utilization),
            },
            None => OptimizationStatus {
                delivery_id,
                has_optimization: false,
                total_pallets: None,
                average_utilization: None,
            },
        };
        Ok(status)
    }

    /// Collects every reason that would stop a delivery from being packed.
    ///
    /// Windows wider than any pallet plus overhang only produce a warning; the
    /// packer rejects them itself. The overhang comes from the defaults merged
    /// with `patch`.
    pub fn validate_for_optimization(
        &self,
        windows: &[WindowInput],
        patch: Option<&OptimizationOptionsPatch>,
    ) -> Result<OptimizationValidation, ServiceError> {
        let options = self.merged_options(patch);
        let depths = self.repository.profile_depths()?;
        let pallets = self.repository.pallet_definitions()?;
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if windows.is_empty() {
            errors.push("Delivery orders have no windows to optimize".to_string());
        }
        if depths.is_empty() {
            errors.push(ValidationError::NoProfileDepths.to_string());
        }

        let missing: BTreeSet<&str> = windows
            .iter()
            .filter(|w| !depths.contains_key(&w.profile_type))
            .map(|w| w.profile_type.as_str())
            .collect();
        if !missing.is_empty() {
            let names: Vec<&str> = missing.into_iter().collect();
            errors.push(format!("Unknown profile types: {}", names.join(", ")));
        }

        if pallets.is_empty() {
            errors.push(ValidationError::NoPalletTypes.to_string());
        } else {
            let widest = max_loadable_width(&pallets, options.max_overhang_mm);
            let too_wide = windows.iter().filter(|w| w.width_mm > widest).count();
            if too_wide > 0 {
                warnings.push(format!(
                    "{} window(s) exceed maximum pallet width including overhang",
                    too_wide
                ));
            }
        }

        Ok(OptimizationValidation {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        })
    }

    /// Totals and maxima of a delivery's windows.
    pub fn dimensions_summary(
        &self,
        delivery_id: u64,
        windows: &[WindowInput],
    ) -> Result<DeliveryDimensionsSummary, ServiceError> {
        let depths = self.repository.profile_depths()?;
        Ok(summarize_dimensions(delivery_id, windows, &depths))
    }

    /// Rough pallet count: total depth divided by the deepest pallet, rounded up.
    pub fn estimate_pallet_count(&self, windows: &[WindowInput]) -> Result<u64, ServiceError> {
        let depths = self.repository.profile_depths()?;
        let pallets = self.repository.pallet_definitions()?;
        let summary = summarize_dimensions(0, windows, &depths);
        Ok(estimate_pallets(&summary, &pallets))
    }

    pub fn list_pallet_types(&self) -> Result<Vec<PalletType>, ServiceError> {
        Ok(self.repository.list_pallet_types()?)
    }

    pub fn pallet_type(&self, id: u64) -> Result<PalletType, ServiceError> {
        Ok(self.repository.pallet_type(id)?)
    }

    pub fn create_pallet_type(&self, new: NewPalletType) -> Result<PalletType, ServiceError> {
        let created = self.repository.create_pallet_type(new)?;
        tracing::info!(id = created.id, name = %created.name, "Created pallet type");
        Ok(created)
    }

    pub fn update_pallet_type(
        &self,
        id: u64,
        update: PalletTypeUpdate,
    ) -> Result<PalletType, ServiceError> {
        let updated = self.repository.update_pallet_type(id, update)?;
        tracing::info!(id, name = %updated.name, "Updated pallet type");
        Ok(updated)
    }

    pub fn delete_pallet_type(&self, id: u64) -> Result<(), ServiceError> {
        self.repository.delete_pallet_type(id)?;
        tracing::info!(id, "Deleted pallet type");
        Ok(())
    }

    pub fn profile_depths(&self) -> Result<ProfileDepths, ServiceError> {
        Ok(self.repository.profile_depths()?)
    }

    pub fn upsert_profile_depth(&self, profile_type: &str, depth_mm: f64) -> Result<(), ServiceError> {
        self.repository.upsert_profile_depth(profile_type, depth_mm)?;
        tracing::info!(profile_type, depth_mm, "Saved profile depth");
        Ok(())
    }

    pub fn delete_profile_depth(&self, profile_type: &str) -> Result<(), ServiceError> {
        self.repository.delete_profile_depth(profile_type)?;
        tracing::info!(profile_type, "Deleted profile depth");
        Ok(())
    }
}

fn max_loadable_width(pallets: &[PalletDefinition], requested_overhang: f64) -> f64 {
    pallets
        .iter()
        .map(|p| p.length_mm + p.effective_overhang(requested_overhang))
        .fold(0.0, f64::max)
}

fn summarize_dimensions(
    delivery_id: u64,
    windows: &[WindowInput],
    depths: &ProfileDepths,
) -> DeliveryDimensionsSummary {
    let mut windows_by_profile: BTreeMap<String, u64> = BTreeMap::new();
    let mut missing: BTreeSet<String> = BTreeSet::new();
    let mut max_width_mm: f64 = 0.0;
    let mut max_height_mm: f64 = 0.0;
    let mut total_estimated_depth_mm = 0.0;
    let mut total_windows = 0;

    for window in windows {
        let quantity = u64::from(window.quantity);
        total_windows += quantity;
        *windows_by_profile
            .entry(window.profile_type.clone())
            .or_default() += quantity;
        max_width_mm = max_width_mm.max(window.width_mm);
        max_height_mm = max_height_mm.max(window.height_mm);

        match depths.get(&window.profile_type) {
            Some(depth) => total_estimated_depth_mm += depth * quantity as f64,
            None => {
                missing.insert(format!("Missing depth for profile: {}", window.profile_type));
            }
        }
    }

    DeliveryDimensionsSummary {
        delivery_id,
        total_windows,
        windows_by_profile,
        max_width_mm,
        max_height_mm,
        total_estimated_depth_mm,
        is_ready_for_optimization: !windows.is_empty() && missing.is_empty(),
        missing_data: missing.into_iter().collect(),
    }
}

fn estimate_pallets(summary: &DeliveryDimensionsSummary, pallets: &[PalletDefinition]) -> u64 {
    let deepest = pallets
        .iter()
        .map(|p| p.max_load_depth_mm)
        .fold(0.0, f64::max);
    if deepest <= 0.0 || summary.total_windows == 0 {
        return 0;
    }
    (summary.total_estimated_depth_mm / deepest).ceil() as u64
}

/// SHA-256 over everything that influences a load plan.
fn input_fingerprint(
    windows: &[WindowInput],
    depths: &ProfileDepths,
    pallets: &[PalletDefinition],
    options: &OptimizationOptions,
) -> Result<String, StoreError> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(windows)?);
    hasher.update(serde_json::to_vec(depths)?);
    hasher.update(serde_json::to_vec(pallets)?);
    hasher.update(serde_json::to_vec(options)?);
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryRepository;

    fn window(id: u64, width: f64, height: f64, profile: &str, quantity: u32) -> WindowInput {
        WindowInput {
            id,
            order_id: 10,
            order_number: "Z-010".to_string(),
            width_mm: width,
            height_mm: height,
            profile_type: profile.to_string(),
            quantity,
            reference: None,
        }
    }

    fn seeded_service() -> PalletOptimizerService {
        let repo = InMemoryRepository::new();
        repo.upsert_profile_depth("AWS75", 100.0).unwrap();
        repo.upsert_profile_depth("AWS90", 120.0).unwrap();
        repo.create_pallet_type(NewPalletType {
            name: "Standard".to_string(),
            length_mm: 2500.0,
            load_depth_mm: 1200.0,
        })
        .unwrap();
        repo.create_pallet_type(NewPalletType {
            name: "Mała".to_string(),
            length_mm: 1500.0,
            load_depth_mm: 1000.0,
        })
        .unwrap();
        PalletOptimizerService::new(Arc::new(repo), OptimizationOptions::default())
    }

    #[test]
    fn optimize_delivery_saves_result() {
        let service = seeded_service();
        let windows = [window(1, 1000.0, 1500.0, "AWS75", 3)];

        let result = service.optimize_delivery(5, &windows, None).unwrap();
        assert_eq!(result.delivery_id, 5);
        assert_eq!(result.summary.total_windows, 3);
        assert!(result.input_fingerprint.is_some());

        let saved = service.optimization(5).unwrap().unwrap();
        assert_eq!(saved, result);

        let status = service.optimization_status(5).unwrap();
        assert!(status.has_optimization);
        assert_eq!(status.total_pallets, Some(result.total_pallets));
    }

    #[test]
    fn unchanged_input_reuses_saved_result() {
        let service = seeded_service();
        let windows = [window(1, 1000.0, 1500.0, "AWS75", 2)];

        let first = service.optimize_delivery(5, &windows, None).unwrap();
        let second = service.optimize_delivery(5, &windows, None).unwrap();
        assert_eq!(first, second);

        let patch = OptimizationOptionsPatch {
            allow_side_by_side: Some(false),
            ..Default::default()
        };
        let third = service.optimize_delivery(5, &windows, Some(&patch)).unwrap();
        assert_ne!(first.input_fingerprint, third.input_fingerprint);
        assert_eq!(third.options.map(|o| o.allow_side_by_side), Some(false));
        assert_eq!(service.optimization(5).unwrap(), Some(third));
    }

    #[test]
    fn optimize_delivery_reports_missing_catalog() {
        let service =
            PalletOptimizerService::new(Arc::new(InMemoryRepository::new()), OptimizationOptions::default());
        let err = service
            .optimize_delivery(1, &[window(1, 1000.0, 1500.0, "AWS75", 1)], None)
            .unwrap_err();
        let errors = match err {
            ServiceError::NotReady(errors) => errors,
            other => panic!("expected NotReady, got {other:?}"),
        };
        assert!(errors.contains(&"No profile depths configured in database".to_string()));
        assert!(errors.contains(&"No pallet types defined in database".to_string()));
    }

    #[test]
    fn optimize_delivery_propagates_packing_errors() {
        let service = seeded_service();
        let err = service
            .optimize_delivery(1, &[window(1, 4000.0, 1500.0, "AWS75", 1)], None)
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::WindowTooWide { .. })
        ));
        assert!(service.optimization(1).unwrap().is_none());
    }

    #[test]
    fn validation_lists_unknown_profiles_and_wide_windows() {
        let service = seeded_service();
        let windows = [
            window(1, 1000.0, 1500.0, "XYZ", 1),
            window(2, 1000.0, 1500.0, "ABC", 1),
            window(3, 3500.0, 1500.0, "AWS75", 1),
        ];
        let report = service.validate_for_optimization(&windows, None).unwrap();
        assert!(!report.is_valid);
        assert_eq!(report.errors, vec!["Unknown profile types: ABC, XYZ".to_string()]);
        assert_eq!(
            report.warnings,
            vec!["1 window(s) exceed maximum pallet width including overhang".to_string()]
        );

        let empty = service.validate_for_optimization(&[], None).unwrap();
        assert!(!empty.is_valid);
        assert_eq!(empty.errors.len(), 1);
    }

    #[tokio::test]
    async fn call_runs_service_operations_off_the_runtime() {
        let service = seeded_service();
        let windows = vec![window(1, 1000.0, 1500.0, "AWS75", 2)];

        let result = service
            .call(move |svc| svc.optimize_delivery(8, &windows, None))
            .await
            .unwrap();
        assert_eq!(result.delivery_id, 8);

        let status = service
            .call(|svc| svc.optimization_status(8))
            .await
            .unwrap();
        assert!(status.has_optimization);

        let err = service
            .call(|svc| svc.pallet_type(99))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Store(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn call_reports_panicking_task() {
        let service = seeded_service();
        let err = service
            .call(|_| -> Result<(), ServiceError> { panic!("boom") })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::TaskFailed(_)));
    }

    #[test]
    fn width_warning_uses_requested_overhang() {
        let service = seeded_service();
        let windows = [window(1, 2800.0, 1500.0, "AWS75", 1)];

        let report = service.validate_for_optimization(&windows, None).unwrap();
        assert!(report.is_valid);
        assert!(report.warnings.is_empty());

        let patch = OptimizationOptionsPatch {
            max_overhang_mm: Some(100.0),
            ..Default::default()
        };
        let report = service
            .validate_for_optimization(&windows, Some(&patch))
            .unwrap();
        assert_eq!(
            report.warnings,
            vec!["1 window(s) exceed maximum pallet width including overhang".to_string()]
        );
    }

    #[test]
    fn dimensions_summary_and_estimate() {
        let service = seeded_service();
        let windows = [
            window(1, 1000.0, 1500.0, "AWS75", 3),
            window(2, 1200.0, 1800.0, "AWS90", 2),
            window(3, 900.0, 1000.0, "UNKNOWN", 1),
        ];
        let summary = service.dimensions_summary(9, &windows).unwrap();
        assert_eq!(summary.delivery_id, 9);
        assert_eq!(summary.total_windows, 6);
        assert_eq!(summary.windows_by_profile["AWS75"], 3);
        assert_eq!(summary.windows_by_profile["AWS90"], 2);
        assert_eq!(summary.max_width_mm, 1200.0);
        assert_eq!(summary.max_height_mm, 1800.0);
        assert_eq!(summary.total_estimated_depth_mm, 540.0);
        assert!(!summary.is_ready_for_optimization);
        assert_eq!(summary.missing_data, vec!["Missing depth for profile: UNKNOWN"]);

        let known: Vec<WindowInput> = (1..=14)
            .map(|id| window(id, 1000.0, 1500.0, "AWS75", 1))
            .collect();
        // 1400mm over a 1200mm pallet
        assert_eq!(service.estimate_pallet_count(&known).unwrap(), 2);
        assert_eq!(service.estimate_pallet_count(&[]).unwrap(), 0);
    }

    #[test]
    fn delete_missing_optimization_is_not_found() {
        let service = seeded_service();
        let err = service.delete_optimization(77).unwrap_err();
        assert!(matches!(err, ServiceError::Store(StoreError::NotFound(_))));

        let status = service.optimization_status(77).unwrap();
        assert!(!status.has_optimization);
        assert!(status.total_pallets.is_none());
    }

    #[test]
    fn fingerprint_depends_on_catalog() {
        let windows = [window(1, 1000.0, 1500.0, "AWS75", 1)];
        let mut depths = ProfileDepths::new();
        depths.insert("AWS75".to_string(), 100.0);
        let pallets = [PalletDefinition::new("Standard", 2500.0, 1200.0, 700.0).unwrap()];
        let options = OptimizationOptions::default();

        let a = input_fingerprint(&windows, &depths, &pallets, &options).unwrap();
        let b = input_fingerprint(&windows, &depths, &pallets, &options).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        depths.insert("AWS75".to_string(), 110.0);
        let c = input_fingerprint(&windows, &depths, &pallets, &options).unwrap();
        assert_ne!(a, c);
    }
}
