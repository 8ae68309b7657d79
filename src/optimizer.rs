//! Optimization logic for loading windows onto pallets.
//!
//! This module implements a greedy heuristic that assigns every unit window of a
//! delivery to a pallet while respecting:
//! - the loading depth of each pallet (windows stand one behind another)
//! - the pallet length plus the allowed overhang
//! - optional side-by-side pairs of similar height sharing one depth slot
//! - best-fit or first-fit pallet selection
//!
//! Packing runs in two phases. [`prepare`] validates the input, resolves profile
//! depths, expands quantities and sorts, so every error surfaces before the first
//! pallet is opened. [`PreparedDelivery::pack_with_progress`] then performs the
//! assignment.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::geometry::{fits_depth, fits_length, side_by_side_width, within_ratio};
use crate::model::{
    OptimizedPallet, OptimizedWindow, PalletDefinition, ProfileDepths, ValidationError,
    WindowInput, validate_profile_depth,
};
use crate::types::{Deep, Dimensioned, validation};

/// Options controlling sorting, pallet choice and placement.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationOptions {
    /// Sort by height (tallest first) when widths are within the similarity threshold
    pub sort_by_height_when_width_similar: bool,
    /// Relative width difference still considered similar (0.15 = 15%)
    pub width_similarity_threshold: f64,
    /// Open the longest pallet types first
    pub prefer_standard_pallets: bool,
    /// Prefer placements where the window does not protrude beyond the pallet
    pub minimize_overhang: bool,
    /// Maximum overhang of a single window beyond the pallet length
    pub max_overhang_mm: f64,
    /// Best fit (least remaining depth) instead of first fit (highest utilization)
    pub maximize_utilization: bool,
    /// Allow two windows of similar height to share one depth slot
    pub allow_side_by_side: bool,
    /// Gap between two side-by-side windows
    pub side_by_side_max_gap: f64,
    /// Relative height difference still allowed for a side-by-side pair
    pub side_by_side_height_threshold: f64,
}

impl OptimizationOptions {
    pub const DEFAULT_SORT_BY_HEIGHT_WHEN_WIDTH_SIMILAR: bool = true;
    pub const DEFAULT_WIDTH_SIMILARITY_THRESHOLD: f64 = 0.15;
    pub const DEFAULT_PREFER_STANDARD_PALLETS: bool = true;
    pub const DEFAULT_MINIMIZE_OVERHANG: bool = true;
    pub const DEFAULT_MAX_OVERHANG_MM: f64 = 700.0;
    pub const DEFAULT_MAXIMIZE_UTILIZATION: bool = true;
    pub const DEFAULT_ALLOW_SIDE_BY_SIDE: bool = true;
    pub const DEFAULT_SIDE_BY_SIDE_MAX_GAP: f64 = 100.0;
    pub const DEFAULT_SIDE_BY_SIDE_HEIGHT_THRESHOLD: f64 = 0.15;

    /// Creates a builder for custom options.
    pub fn builder() -> OptimizationOptionsBuilder {
        OptimizationOptionsBuilder::default()
    }

    /// Checks thresholds and lengths.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate_ratio(self.width_similarity_threshold, "widthSimilarityThreshold")
            .and_then(|_| {
                validation::validate_ratio(
                    self.side_by_side_height_threshold,
                    "sideBySideHeightThreshold",
                )
            })
            .and_then(|_| validation::validate_non_negative(self.max_overhang_mm, "maxOverhangMm"))
            .and_then(|_| {
                validation::validate_non_negative(self.side_by_side_max_gap, "sideBySideMaxGap")
            })
            .map_err(ValidationError::InvalidOption)
    }
}

impl Default for OptimizationOptions {
    fn default() -> Self {
        Self {
            sort_by_height_when_width_similar: Self::DEFAULT_SORT_BY_HEIGHT_WHEN_WIDTH_SIMILAR,
            width_similarity_threshold: Self::DEFAULT_WIDTH_SIMILARITY_THRESHOLD,
            prefer_standard_pallets: Self::DEFAULT_PREFER_STANDARD_PALLETS,
            minimize_overhang: Self::DEFAULT_MINIMIZE_OVERHANG,
            max_overhang_mm: Self::DEFAULT_MAX_OVERHANG_MM,
            maximize_utilization: Self::DEFAULT_MAXIMIZE_UTILIZATION,
            allow_side_by_side: Self::DEFAULT_ALLOW_SIDE_BY_SIDE,
            side_by_side_max_gap: Self::DEFAULT_SIDE_BY_SIDE_MAX_GAP,
            side_by_side_height_threshold: Self::DEFAULT_SIDE_BY_SIDE_HEIGHT_THRESHOLD,
        }
    }
}

/// Builder for OptimizationOptions.
#[derive(Clone, Debug, Default)]
pub struct OptimizationOptionsBuilder {
    options: OptimizationOptions,
}

impl OptimizationOptionsBuilder {
    pub fn sort_by_height_when_width_similar(mut self, enabled: bool) -> Self {
        self.options.sort_by_height_when_width_similar = enabled;
        self
    }

    pub fn width_similarity_threshold(mut self, threshold: f64) -> Self {
        self.options.width_similarity_threshold = threshold;
        self
    }

    pub fn prefer_standard_pallets(mut self, enabled: bool) -> Self {
        self.options.prefer_standard_pallets = enabled;
        self
    }

    pub fn minimize_overhang(mut self, enabled: bool) -> Self {
        self.options.minimize_overhang = enabled;
        self
    }

    pub fn max_overhang_mm(mut self, overhang: f64) -> Self {
        self.options.max_overhang_mm = overhang;
        self
    }

    pub fn maximize_utilization(mut self, enabled: bool) -> Self {
        self.options.maximize_utilization = enabled;
        self
    }

    pub fn allow_side_by_side(mut self, enabled: bool) -> Self {
        self.options.allow_side_by_side = enabled;
        self
    }

    pub fn side_by_side_max_gap(mut self, gap: f64) -> Self {
        self.options.side_by_side_max_gap = gap;
        self
    }

    pub fn side_by_side_height_threshold(mut self, threshold: f64) -> Self {
        self.options.side_by_side_height_threshold = threshold;
        self
    }

    /// Creates the final options.
    pub fn build(self) -> OptimizationOptions {
        self.options
    }
}

/// Partial options as sent by a client; unset fields keep the configured value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationOptionsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by_height_when_width_similar: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width_similarity_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefer_standard_pallets: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimize_overhang: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_overhang_mm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximize_utilization: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_side_by_side: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side_by_side_max_gap: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side_by_side_height_threshold: Option<f64>,
}

impl OptimizationOptionsPatch {
    /// Merges the set fields over `base`.
    pub fn apply_to(&self, base: OptimizationOptions) -> OptimizationOptions {
        OptimizationOptions {
            sort_by_height_when_width_similar: self
                .sort_by_height_when_width_similar
                .unwrap_or(base.sort_by_height_when_width_similar),
            width_similarity_threshold: self
                .width_similarity_threshold
                .unwrap_or(base.width_similarity_threshold),
            prefer_standard_pallets: self
                .prefer_standard_pallets
                .unwrap_or(base.prefer_standard_pallets),
            minimize_overhang: self.minimize_overhang.unwrap_or(base.minimize_overhang),
            max_overhang_mm: self.max_overhang_mm.unwrap_or(base.max_overhang_mm),
            maximize_utilization: self
                .maximize_utilization
                .unwrap_or(base.maximize_utilization),
            allow_side_by_side: self.allow_side_by_side.unwrap_or(base.allow_side_by_side),
            side_by_side_max_gap: self
                .side_by_side_max_gap
                .unwrap_or(base.side_by_side_max_gap),
            side_by_side_height_threshold: self
                .side_by_side_height_threshold
                .unwrap_or(base.side_by_side_height_threshold),
        }
    }
}

/// Overall statistics of a load plan.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationSummary {
    pub total_windows: u64,
    pub average_utilization: f64,
}

/// Result of a pallet optimization for one delivery.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    pub delivery_id: u64,
    pub total_pallets: usize,
    pub pallets: Vec<OptimizedPallet>,
    pub summary: OptimizationSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<OptimizationOptions>,
    /// SHA-256 over the packed input, set when the result is stored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_fingerprint: Option<String>,
}

impl OptimizationResult {
    /// Number of unit windows loaded on all pallets.
    pub fn loaded_windows(&self) -> usize {
        self.pallets.iter().map(|p| p.window_count()).sum()
    }
}

/// Events reported while packing, for live visualization.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type")]
pub enum PackEvent {
    /// A new pallet is opened.
    PalletStarted {
        pallet_number: usize,
        pallet_type: String,
        length_mm: f64,
        max_depth_mm: f64,
    },
    /// A single window was loaded.
    WindowPlaced {
        pallet_number: usize,
        window_id: u64,
        order_number: String,
        width_mm: f64,
        height_mm: f64,
        depth_mm: f64,
        with_overhang: bool,
        used_depth_mm: f64,
        utilization_percent: f64,
    },
    /// Two windows were loaded side by side into one depth slot.
    PairPlaced {
        pallet_number: usize,
        group_id: u32,
        window_ids: [u64; 2],
        slot_depth_mm: f64,
        used_depth_mm: f64,
        utilization_percent: f64,
    },
    /// Packing aborted.
    Failed { message: String },
    /// Packing finished.
    Finished { pallets: usize, windows: usize },
}

/// A validated, expanded and sorted delivery ready for packing.
#[derive(Clone, Debug)]
pub struct PreparedDelivery {
    delivery_id: u64,
    units: Vec<OptimizedWindow>,
    definitions: Vec<PalletDefinition>,
    options: OptimizationOptions,
    total_windows: u64,
}

impl PreparedDelivery {
    /// Unit windows in packing order.
    pub fn units(&self) -> &[OptimizedWindow] {
        &self.units
    }

    /// Packs without progress reporting.
    pub fn pack(self) -> Result<OptimizationResult, ValidationError> {
        self.pack_with_progress(|_| {})
    }

    /// Packs and invokes the callback for every significant step (suitable for SSE).
    pub fn pack_with_progress(
        self,
        mut on_event: impl FnMut(&PackEvent),
    ) -> Result<OptimizationResult, ValidationError> {
        let PreparedDelivery {
            delivery_id,
            units,
            definitions,
            options,
            total_windows,
        } = self;

        let pallets = match pack_units(&units, &definitions, &options, &mut on_event) {
            Ok(pallets) => pallets,
            Err(err) => {
                on_event(&PackEvent::Failed {
                    message: err.to_string(),
                });
                return Err(err);
            }
        };

        let average_utilization = if pallets.is_empty() {
            0.0
        } else {
            pallets.iter().map(|p| p.utilization_percent).sum::<f64>() / pallets.len() as f64
        };

        on_event(&PackEvent::Finished {
            pallets: pallets.len(),
            windows: units.len(),
        });

        Ok(OptimizationResult {
            delivery_id,
            total_pallets: pallets.len(),
            pallets,
            summary: OptimizationSummary {
                total_windows,
                average_utilization,
            },
            options: Some(options),
            input_fingerprint: None,
        })
    }
}

/// Upper bound for unit windows (sum of quantities) in one delivery.
pub const MAX_UNITS_PER_DELIVERY: u64 = 10_000;

/// Main entry point: validates, sorts and packs the windows of one delivery.
///
/// # Parameters
/// * `delivery_id` - Delivery the windows belong to
/// * `windows` - Window positions (expanded by quantity)
/// * `profile_depths` - Depth per profile type
/// * `pallets` - Available pallet types
/// * `options` - Sorting and placement options
///
/// # Returns
/// `OptimizationResult` with the load plan, or the first validation error
pub fn optimize(
    delivery_id: u64,
    windows: &[WindowInput],
    profile_depths: &ProfileDepths,
    pallets: &[PalletDefinition],
    options: &OptimizationOptions,
) -> Result<OptimizationResult, ValidationError> {
    prepare(delivery_id, windows, profile_depths, pallets, options)?.pack()
}

/// Validation, depth assignment, quantity expansion and sorting.
///
/// Fails with the first problem found; nothing is packed in that case.
pub fn prepare(
    delivery_id: u64,
    windows: &[WindowInput],
    profile_depths: &ProfileDepths,
    pallets: &[PalletDefinition],
    options: &OptimizationOptions,
) -> Result<PreparedDelivery, ValidationError> {
    if windows.is_empty() {
        return Err(ValidationError::NoWindows);
    }
    if profile_depths.is_empty() {
        return Err(ValidationError::NoProfileDepths);
    }
    if pallets.is_empty() {
        return Err(ValidationError::NoPalletTypes);
    }
    options.validate()?;
    for definition in pallets {
        definition.validate()?;
    }
    for window in windows {
        window.validate()?;
    }

    let mut resolved = Vec::with_capacity(windows.len());
    let mut total_windows: u64 = 0;
    for window in windows {
        let depth = window.resolve_depth(profile_depths)?;
        validate_profile_depth(&window.profile_type, depth)?;
        check_loadable(window, depth, pallets, options)?;

        total_windows += u64::from(window.quantity);
        if total_windows > MAX_UNITS_PER_DELIVERY {
            return Err(ValidationError::TooManyWindows {
                total: windows.iter().map(|w| u64::from(w.quantity)).sum(),
                max: MAX_UNITS_PER_DELIVERY,
            });
        }
        resolved.push((window, depth));
    }

    // Bounded by MAX_UNITS_PER_DELIVERY.
    let mut units = Vec::with_capacity(total_windows as usize);
    for (window, depth) in resolved {
        let unit = OptimizedWindow::single(window.clone(), depth);
        units.extend(std::iter::repeat_n(unit, window.quantity as usize));
    }

    Ok(PreparedDelivery {
        delivery_id,
        units: sort_units(units, options),
        definitions: sort_definitions(pallets, options),
        options: *options,
        total_windows,
    })
}

/// Ensures at least one pallet type can take the window on its own.
fn check_loadable(
    window: &WindowInput,
    depth: f64,
    pallets: &[PalletDefinition],
    options: &OptimizationOptions,
) -> Result<(), ValidationError> {
    let width_fits = |def: &PalletDefinition| {
        fits_length(
            window.width_mm,
            def.length_mm,
            def.effective_overhang(options.max_overhang_mm),
        )
    };

    if pallets
        .iter()
        .any(|def| width_fits(def) && fits_depth(0.0, depth, def.max_load_depth_mm))
    {
        return Ok(());
    }

    if pallets.iter().any(width_fits) {
        let max_load_depth_mm = pallets
            .iter()
            .filter(|def| width_fits(def))
            .map(|def| def.max_load_depth_mm)
            .fold(0.0, f64::max);
        return Err(ValidationError::WindowTooDeep {
            profile_type: window.profile_type.clone(),
            depth_mm: depth,
            max_load_depth_mm,
        });
    }

    Err(ValidationError::WindowTooWide {
        width_mm: window.width_mm,
        max_length_mm: pallets.iter().map(|def| def.length_mm).fold(0.0, f64::max),
        max_overhang_mm: options.max_overhang_mm,
    })
}

/// Widest first; windows of similar width are ordered tallest first.
///
/// Similar widths are grouped into clusters anchored at the widest member, so the
/// resulting order is total and deterministic.
fn sort_units(mut units: Vec<OptimizedWindow>, options: &OptimizationOptions) -> Vec<OptimizedWindow> {
    units.sort_by(|a, b| {
        b.width_mm()
            .partial_cmp(&a.width_mm())
            .unwrap_or(Ordering::Equal)
    });

    if !options.sort_by_height_when_width_similar {
        return units;
    }

    let mut sorted = Vec::with_capacity(units.len());
    let mut cluster: Vec<OptimizedWindow> = Vec::new();
    for unit in units {
        let starts_new_cluster = cluster.first().is_some_and(|anchor| {
            !within_ratio(
                anchor.width_mm(),
                unit.width_mm(),
                options.width_similarity_threshold,
            )
        });
        if starts_new_cluster {
            flush_cluster(&mut cluster, &mut sorted);
        }
        cluster.push(unit);
    }
    flush_cluster(&mut cluster, &mut sorted);
    sorted
}

fn flush_cluster(cluster: &mut Vec<OptimizedWindow>, sorted: &mut Vec<OptimizedWindow>) {
    cluster.sort_by(|a, b| {
        b.height_mm()
            .partial_cmp(&a.height_mm())
            .unwrap_or(Ordering::Equal)
    });
    sorted.append(cluster);
}

/// Longest pallet first when standard pallets are preferred, shortest first otherwise.
fn sort_definitions(
    pallets: &[PalletDefinition],
    options: &OptimizationOptions,
) -> Vec<PalletDefinition> {
    let mut definitions = pallets.to_vec();
    definitions.sort_by(|a, b| {
        let ord = a
            .length_mm
            .partial_cmp(&b.length_mm)
            .unwrap_or(Ordering::Equal);
        if options.prefer_standard_pallets {
            ord.reverse()
        } else {
            ord
        }
    });
    definitions
}

/// A pallet being filled together with the overhang its type allows.
struct OpenPallet {
    pallet: OptimizedPallet,
    overhang_mm: f64,
}

/// Placement candidate on an open pallet.
#[derive(Clone, Copy)]
struct Candidate {
    index: usize,
    remaining_depth: f64,
    utilization: f64,
    with_overhang: bool,
}

fn pack_units(
    units: &[OptimizedWindow],
    definitions: &[PalletDefinition],
    options: &OptimizationOptions,
    on_event: &mut impl FnMut(&PackEvent),
) -> Result<Vec<OptimizedPallet>, ValidationError> {
    let mut open: Vec<OpenPallet> = Vec::new();
    let mut placed = vec![false; units.len()];
    let mut next_group_id: u32 = 0;

    for index in 0..units.len() {
        if placed[index] {
            continue;
        }
        let unit = &units[index];

        // Existing pallet
        if let Some(candidate) = select_for_single(&open, unit, options) {
            let target = &mut open[candidate.index].pallet;
            target.load([unit.clone()], unit.depth_mm);
            placed[index] = true;
            emit_window_placed(on_event, target, unit, candidate.with_overhang);
            continue;
        }

        // Side-by-side pair
        if options.allow_side_by_side
            && try_place_pair(
                index,
                units,
                &mut placed,
                &mut open,
                definitions,
                options,
                next_group_id,
                on_event,
            )
        {
            next_group_id += 1;
            continue;
        }

        // New pallet
        let Some((definition, with_overhang)) = choose_definition_for_single(unit, definitions, options)
        else {
            return Err(ValidationError::WindowTooWide {
                width_mm: unit.width_mm(),
                max_length_mm: definitions.iter().map(|d| d.length_mm).fold(0.0, f64::max),
                max_overhang_mm: options.max_overhang_mm,
            });
        };
        let pallet_number = open.len() + 1;
        let mut pallet = definition.instantiate(pallet_number, definition.type_name(pallet_number));
        emit_pallet_started(on_event, &pallet);
        pallet.load([unit.clone()], unit.depth_mm);
        emit_window_placed(on_event, &pallet, unit, with_overhang);
        open.push(OpenPallet {
            pallet,
            overhang_mm: definition.effective_overhang(options.max_overhang_mm),
        });
        placed[index] = true;
    }

    let mut pallets: Vec<OptimizedPallet> = open.into_iter().map(|o| o.pallet).collect();
    for pallet in &mut pallets {
        pallet.sort_for_stacking();
    }
    Ok(pallets)
}

/// Finds the open pallet for a single window.
///
/// Pallets without overhang are collected first; overhanging ones are only
/// considered when none was found or overhang is not being minimized.
fn select_for_single(
    open: &[OpenPallet],
    unit: &OptimizedWindow,
    options: &OptimizationOptions,
) -> Option<Candidate> {
    let depth = unit.depth_mm();
    let mut candidates: Vec<Candidate> = open
        .iter()
        .enumerate()
        .filter(|(_, o)| o.pallet.fits_width(unit.width_mm(), 0.0) && o.pallet.has_depth_for(depth))
        .map(|(index, o)| Candidate {
            index,
            remaining_depth: o.pallet.remaining_after(depth),
            utilization: o.pallet.utilization_percent,
            with_overhang: false,
        })
        .collect();

    if candidates.is_empty() || !options.minimize_overhang {
        for (index, o) in open.iter().enumerate() {
            let already_added = candidates.iter().any(|c| c.index == index);
            if !already_added
                && o.pallet.fits_width(unit.width_mm(), o.overhang_mm)
                && o.pallet.has_depth_for(depth)
            {
                candidates.push(Candidate {
                    index,
                    remaining_depth: o.pallet.remaining_after(depth),
                    utilization: o.pallet.utilization_percent,
                    with_overhang: true,
                });
            }
        }
    }

    best_candidate(candidates, options)
}

/// Picks a candidate: no overhang first, then best fit or first fit.
///
/// Ties keep the pallet order.
fn best_candidate(candidates: Vec<Candidate>, options: &OptimizationOptions) -> Option<Candidate> {
    candidates.into_iter().min_by(|a, b| {
        a.with_overhang.cmp(&b.with_overhang).then_with(|| {
            if options.maximize_utilization {
                a.remaining_depth
                    .partial_cmp(&b.remaining_depth)
                    .unwrap_or(Ordering::Equal)
            } else {
                b.utilization
                    .partial_cmp(&a.utilization)
                    .unwrap_or(Ordering::Equal)
            }
        })
    })
}

/// Chooses the pallet type for a new pallet holding a single window.
///
/// Types are tried in preference order; the first one that takes the window,
/// flush or with overhang, wins.
fn choose_definition_for_single<'a>(
    unit: &OptimizedWindow,
    definitions: &'a [PalletDefinition],
    options: &OptimizationOptions,
) -> Option<(&'a PalletDefinition, bool)> {
    definitions.iter().find_map(|def| {
        if !fits_depth(0.0, unit.depth_mm(), def.max_load_depth_mm) {
            return None;
        }
        if fits_length(unit.width_mm(), def.length_mm, 0.0) {
            return Some((def, false));
        }
        fits_length(
            unit.width_mm(),
            def.length_mm,
            def.effective_overhang(options.max_overhang_mm),
        )
        .then_some((def, true))
    })
}

/// Tries to pair the window at `index` with a later window of similar height
/// on a new pallet.
///
/// Only called when the window fits no open pallet on its own. A pair needs
/// at least as much length and depth, so it cannot fit an open pallet either.
/// Pairs never overhang. Returns `true` when a pair was loaded.
#[allow(clippy::too_many_arguments)]
fn try_place_pair(
    index: usize,
    units: &[OptimizedWindow],
    placed: &mut [bool],
    open: &mut Vec<OpenPallet>,
    definitions: &[PalletDefinition],
    options: &OptimizationOptions,
    group_id: u32,
    on_event: &mut impl FnMut(&PackEvent),
) -> bool {
    let unit = &units[index];

    for partner_index in (index + 1)..units.len() {
        if placed[partner_index] {
            continue;
        }
        let partner = &units[partner_index];

        if !within_ratio(
            unit.height_mm(),
            partner.height_mm(),
            options.side_by_side_height_threshold,
        ) {
            continue;
        }

        let combined_width =
            side_by_side_width(unit.width_mm(), partner.width_mm(), options.side_by_side_max_gap);
        let slot_depth = unit.depth_mm().max(partner.depth_mm());
        let half_depth = slot_depth / 2.0;
        let pair = [
            unit.paired(half_depth, group_id),
            partner.paired(half_depth, group_id),
        ];

        let fresh = definitions.iter().find(|def| {
            fits_length(combined_width, def.length_mm, 0.0)
                && fits_depth(0.0, slot_depth, def.max_load_depth_mm)
        });
        if let Some(definition) = fresh {
            let pallet_number = open.len() + 1;
            let mut pallet =
                definition.instantiate(pallet_number, definition.length_name(pallet_number));
            emit_pallet_started(on_event, &pallet);
            pallet.load(pair, slot_depth);
            emit_pair_placed(on_event, &pallet, group_id, unit, partner, slot_depth);
            open.push(OpenPallet {
                pallet,
                overhang_mm: definition.effective_overhang(options.max_overhang_mm),
            });
            placed[index] = true;
            placed[partner_index] = true;
            return true;
        }
    }

    false
}

fn emit_pallet_started(on_event: &mut impl FnMut(&PackEvent), pallet: &OptimizedPallet) {
    on_event(&PackEvent::PalletStarted {
        pallet_number: pallet.pallet_number,
        pallet_type: pallet.pallet_type.clone(),
        length_mm: pallet.pallet_length_mm,
        max_depth_mm: pallet.max_depth_mm,
    });
}

fn emit_window_placed(
    on_event: &mut impl FnMut(&PackEvent),
    pallet: &OptimizedPallet,
    unit: &OptimizedWindow,
    with_overhang: bool,
) {
    on_event(&PackEvent::WindowPlaced {
        pallet_number: pallet.pallet_number,
        window_id: unit.window.id,
        order_number: unit.window.order_number.clone(),
        width_mm: unit.width_mm(),
        height_mm: unit.height_mm(),
        depth_mm: unit.depth_mm(),
        with_overhang,
        used_depth_mm: pallet.used_depth_mm,
        utilization_percent: pallet.utilization_percent,
    });
}

fn emit_pair_placed(
    on_event: &mut impl FnMut(&PackEvent),
    pallet: &OptimizedPallet,
    group_id: u32,
    unit: &OptimizedWindow,
    partner: &OptimizedWindow,
    slot_depth: f64,
) {
    on_event(&PackEvent::PairPlaced {
        pallet_number: pallet.pallet_number,
        group_id,
        window_ids: [unit.window.id, partner.window.id],
        slot_depth_mm: slot_depth,
        used_depth_mm: pallet.used_depth_mm,
        utilization_percent: pallet.utilization_percent,
    });
}
