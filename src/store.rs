//! Persistence of the packing catalog and saved load plans.
//!
//! The catalog consists of profile depths and pallet types. Load plans are
//! stored per delivery; saving a plan replaces the previous one.
//!
//! Two backends implement [`PalletRepository`]:
//! - [`InMemoryRepository`] keeps everything behind an `RwLock`
//! - [`JsonFileRepository`] additionally writes the whole state as one JSON
//!   document after every change (temp file + rename)

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use utoipa::ToSchema;

use crate::model::{PalletDefinition, ProfileDepths, ValidationError, validate_profile_depth};
use crate::optimizer::OptimizationResult;
use crate::types::{DEFAULT_PALLET_OVERHANG_MM, validation};

/// Errors of the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage data could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// A pallet type of the catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PalletType {
    pub id: u64,
    pub name: String,
    /// Pallet length, measured along the window width
    pub length_mm: f64,
    /// Usable loading depth
    pub load_depth_mm: f64,
}

impl PalletType {
    /// Definition used by the packer. Catalog pallets always allow the standard overhang.
    pub fn to_definition(&self) -> PalletDefinition {
        PalletDefinition {
            name: self.name.clone(),
            length_mm: self.length_mm,
            max_load_depth_mm: self.load_depth_mm,
            max_overhang_mm: DEFAULT_PALLET_OVERHANG_MM,
        }
    }
}

/// Data for creating a pallet type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewPalletType {
    pub name: String,
    pub length_mm: f64,
    pub load_depth_mm: f64,
}

/// Partial update of a pallet type.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PalletTypeUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length_mm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_depth_mm: Option<f64>,
}

fn validate_pallet_type(name: &str, length_mm: f64, load_depth_mm: f64) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::InvalidPallet(
            "name must not be empty".to_string(),
        ));
    }
    validation::validate_length(length_mm, "Pallet length")
        .and_then(|_| validation::validate_length(load_depth_mm, "Load depth"))
        .map_err(|reason| ValidationError::InvalidPallet(format!("{}: {}", name, reason)))
}

/// Catalog and load plan storage.
///
/// Implementations are synchronous and shared between request handlers.
pub trait PalletRepository: Send + Sync {
    /// All configured profile depths.
    fn profile_depths(&self) -> Result<ProfileDepths, StoreError>;

    /// Creates or replaces the depth of a profile type.
    fn upsert_profile_depth(&self, profile_type: &str, depth_mm: f64) -> Result<(), StoreError>;

    fn delete_profile_depth(&self, profile_type: &str) -> Result<(), StoreError>;

    /// Pallet types ordered from the longest to the shortest.
    fn list_pallet_types(&self) -> Result<Vec<PalletType>, StoreError>;

    fn pallet_type(&self, id: u64) -> Result<PalletType, StoreError>;

    fn create_pallet_type(&self, new: NewPalletType) -> Result<PalletType, StoreError>;

    fn update_pallet_type(&self, id: u64, update: PalletTypeUpdate)
    -> Result<PalletType, StoreError>;

    fn delete_pallet_type(&self, id: u64) -> Result<(), StoreError>;

    /// Saves a load plan, replacing the previous plan of the same delivery.
    fn save_optimization(&self, result: &OptimizationResult) -> Result<(), StoreError>;

    fn optimization(&self, delivery_id: u64) -> Result<Option<OptimizationResult>, StoreError>;

    /// Deletes the saved plan; `NotFound` if there is none.
    fn delete_optimization(&self, delivery_id: u64) -> Result<(), StoreError>;

    /// Catalog pallet types as packer definitions (longest first).
    fn pallet_definitions(&self) -> Result<Vec<PalletDefinition>, StoreError> {
        Ok(self
            .list_pallet_types()?
            .iter()
            .map(PalletType::to_definition)
            .collect())
    }

    fn optimization_exists(&self, delivery_id: u64) -> Result<bool, StoreError> {
        Ok(self.optimization(delivery_id)?.is_some())
    }
}

/// Complete repository state, also the on-disk format of the JSON backend.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreState {
    #[serde(default)]
    profile_depths: ProfileDepths,
    #[serde(default)]
    pallet_types: Vec<PalletType>,
    #[serde(default)]
    next_pallet_type_id: u64,
    #[serde(default)]
    optimizations: BTreeMap<u64, OptimizationResult>,
}

impl StoreState {
    fn pallet_type_mut(&mut self, id: u64) -> Result<&mut PalletType, StoreError> {
        self.pallet_types
            .iter_mut()
            .find(|pt| pt.id == id)
            .ok_or(StoreError::NotFound("Pallet type"))
    }

    fn upsert_profile_depth(&mut self, profile_type: &str, depth_mm: f64) -> Result<(), StoreError> {
        validate_profile_depth(profile_type, depth_mm)?;
        self.profile_depths
            .insert(profile_type.trim().to_string(), depth_mm);
        Ok(())
    }

    fn delete_profile_depth(&mut self, profile_type: &str) -> Result<(), StoreError> {
        self.profile_depths
            .remove(profile_type.trim())
            .map(|_| ())
            .ok_or(StoreError::NotFound("Profile depth"))
    }

    fn create_pallet_type(&mut self, new: NewPalletType) -> Result<PalletType, StoreError> {
        validate_pallet_type(&new.name, new.length_mm, new.load_depth_mm)?;
        self.next_pallet_type_id += 1;
        let pallet_type = PalletType {
            id: self.next_pallet_type_id,
            name: new.name.trim().to_string(),
            length_mm: new.length_mm,
            load_depth_mm: new.load_depth_mm,
        };
        self.pallet_types.push(pallet_type.clone());
        Ok(pallet_type)
    }

    fn update_pallet_type(
        &mut self,
        id: u64,
        update: PalletTypeUpdate,
    ) -> Result<PalletType, StoreError> {
        let existing = self.pallet_type_mut(id)?;
        let updated = PalletType {
            id,
            name: update
                .name
                .map(|name| name.trim().to_string())
                .unwrap_or_else(|| existing.name.clone()),
            length_mm: update.length_mm.unwrap_or(existing.length_mm),
            load_depth_mm: update.load_depth_mm.unwrap_or(existing.load_depth_mm),
        };
        validate_pallet_type(&updated.name, updated.length_mm, updated.load_depth_mm)?;
        *existing = updated.clone();
        Ok(updated)
    }

    fn delete_pallet_type(&mut self, id: u64) -> Result<(), StoreError> {
        let before = self.pallet_types.len();
        self.pallet_types.retain(|pt| pt.id != id);
        if self.pallet_types.len() == before {
            return Err(StoreError::NotFound("Pallet type"));
        }
        Ok(())
    }

    fn sorted_pallet_types(&self) -> Vec<PalletType> {
        let mut types = self.pallet_types.clone();
        types.sort_by(|a, b| b.length_mm.total_cmp(&a.length_mm));
        types
    }

    fn delete_optimization(&mut self, delivery_id: u64) -> Result<(), StoreError> {
        self.optimizations
            .remove(&delivery_id)
            .map(|_| ())
            .ok_or(StoreError::NotFound("Optimization"))
    }
}

/// Repository holding all data in memory.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    state: RwLock<StoreState>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&StoreState) -> T) -> Result<T, StoreError> {
        let guard = self.state.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(f(&guard))
    }

    /// Applies a change in place. Every `StoreState` mutation validates before
    /// it writes, so a failed change leaves the state untouched.
    fn modify<T>(
        &self,
        f: impl FnOnce(&mut StoreState) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        f(&mut guard)
    }

    /// Applies a change to a copy of the state; the copy only replaces the
    /// current state once `commit` succeeded.
    fn update_then_commit<T>(
        &self,
        f: impl FnOnce(&mut StoreState) -> Result<T, StoreError>,
        commit: impl FnOnce(&StoreState) -> Result<(), StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        let mut next = guard.clone();
        let value = f(&mut next)?;
        commit(&next)?;
        *guard = next;
        Ok(value)
    }

    fn from_state(state: StoreState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }
}

impl PalletRepository for InMemoryRepository {
    fn profile_depths(&self) -> Result<ProfileDepths, StoreError> {
        self.read(|s| s.profile_depths.clone())
    }

    fn upsert_profile_depth(&self, profile_type: &str, depth_mm: f64) -> Result<(), StoreError> {
        self.modify(|s| s.upsert_profile_depth(profile_type, depth_mm))
    }

    fn delete_profile_depth(&self, profile_type: &str) -> Result<(), StoreError> {
        self.modify(|s| s.delete_profile_depth(profile_type))
    }

    fn list_pallet_types(&self) -> Result<Vec<PalletType>, StoreError> {
        self.read(StoreState::sorted_pallet_types)
    }

    fn pallet_type(&self, id: u64) -> Result<PalletType, StoreError> {
        self.read(|s| s.pallet_types.iter().find(|pt| pt.id == id).cloned())?
            .ok_or(StoreError::NotFound("Pallet type"))
    }

    fn create_pallet_type(&self, new: NewPalletType) -> Result<PalletType, StoreError> {
        self.modify(|s| s.create_pallet_type(new))
    }

    fn update_pallet_type(
        &self,
        id: u64,
        update: PalletTypeUpdate,
    ) -> Result<PalletType, StoreError> {
        self.modify(|s| s.update_pallet_type(id, update))
    }

    fn delete_pallet_type(&self, id: u64) -> Result<(), StoreError> {
        self.modify(|s| s.delete_pallet_type(id))
    }

    fn save_optimization(&self, result: &OptimizationResult) -> Result<(), StoreError> {
        self.modify(|s| {
            s.optimizations.insert(result.delivery_id, result.clone());
            Ok(())
        })
    }

    fn optimization(&self, delivery_id: u64) -> Result<Option<OptimizationResult>, StoreError> {
        self.read(|s| s.optimizations.get(&delivery_id).cloned())
    }

    fn delete_optimization(&self, delivery_id: u64) -> Result<(), StoreError> {
        self.modify(|s| s.delete_optimization(delivery_id))
    }
}

/// Repository persisting its state to a single JSON file.
///
/// Every successful change rewrites the file atomically. A missing file is
/// treated as an empty repository.
#[derive(Debug)]
pub struct JsonFileRepository {
    path: PathBuf,
    memory: InMemoryRepository,
    // Serializes file writes between concurrent updates.
    write_lock: Mutex<()>,
}

impl JsonFileRepository {
    /// Opens the repository at `path`, loading existing data.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let state = match std::fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => StoreState::default(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoreState::default(),
            Err(err) => return Err(err.into()),
        };
        tracing::info!(
            path = %path.display(),
            pallet_types = state.pallet_types.len(),
            profile_depths = state.profile_depths.len(),
            optimizations = state.optimizations.len(),
            "Opened JSON repository"
        );
        Ok(Self {
            path,
            memory: InMemoryRepository::from_state(state),
            write_lock: Mutex::new(()),
        })
    }

    /// Location of the JSON document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn update<T>(
        &self,
        f: impl FnOnce(&mut StoreState) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        self.memory
            .update_then_commit(f, |state| write_json_atomically(&self.path, state))
    }
}

fn write_json_atomically(path: &Path, state: &StoreState) -> Result<(), StoreError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&parent)?;

    let mut tmp = NamedTempFile::new_in(&parent)?;
    serde_json::to_writer_pretty(&mut tmp, state)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| StoreError::Io(err.error))?;

    tracing::debug!(path = %path.display(), "Repository state written");
    Ok(())
}

impl PalletRepository for JsonFileRepository {
    fn profile_depths(&self) -> Result<ProfileDepths, StoreError> {
        self.memory.profile_depths()
    }

    fn upsert_profile_depth(&self, profile_type: &str, depth_mm: f64) -> Result<(), StoreError> {
        self.update(|s| s.upsert_profile_depth(profile_type, depth_mm))
    }

    fn delete_profile_depth(&self, profile_type: &str) -> Result<(), StoreError> {
        self.update(|s| s.delete_profile_depth(profile_type))
    }

    fn list_pallet_types(&self) -> Result<Vec<PalletType>, StoreError> {
        self.memory.list_pallet_types()
    }

    fn pallet_type(&self, id: u64) -> Result<PalletType, StoreError> {
        self.memory.pallet_type(id)
    }

    fn create_pallet_type(&self, new: NewPalletType) -> Result<PalletType, StoreError> {
        self.update(|s| s.create_pallet_type(new))
    }

    fn update_pallet_type(
        &self,
        id: u64,
        update: PalletTypeUpdate,
    ) -> Result<PalletType, StoreError> {
        self.update(|s| s.update_pallet_type(id, update))
    }

    fn delete_pallet_type(&self, id: u64) -> Result<(), StoreError> {
        self.update(|s| s.delete_pallet_type(id))
    }

    fn save_optimization(&self, result: &OptimizationResult) -> Result<(), StoreError> {
        self.update(|s| {
            s.optimizations.insert(result.delivery_id, result.clone());
            Ok(())
        })
    }

    fn optimization(&self, delivery_id: u64) -> Result<Option<OptimizationResult>, StoreError> {
        self.memory.optimization(delivery_id)
    }

    fn delete_optimization(&self, delivery_id: u64) -> Result<(), StoreError> {
        self.update(|s| s.delete_optimization(delivery_id))
    }
}

impl JsonFileRepository {
    /// Number of stored load plans.
    pub fn optimization_count(&self) -> Result<usize, StoreError> {
        self.memory.read(|s| s.optimizations.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::OptimizationSummary;

    fn new_type(name: &str, length: f64, depth: f64) -> NewPalletType {
        NewPalletType {
            name: name.to_string(),
            length_mm: length,
            load_depth_mm: depth,
        }
    }

    fn result(delivery_id: u64, total_pallets: usize) -> OptimizationResult {
        OptimizationResult {
            delivery_id,
            total_pallets,
            pallets: Vec::new(),
            summary: OptimizationSummary {
                total_windows: 0,
                average_utilization: 0.0,
            },
            options: None,
            input_fingerprint: Some("abc".to_string()),
        }
    }

    fn exercise_catalog(repo: &dyn PalletRepository) {
        let small = repo.create_pallet_type(new_type("Mała", 1500.0, 1000.0)).unwrap();
        let standard = repo
            .create_pallet_type(new_type("Standard", 2500.0, 1200.0))
            .unwrap();
        assert_ne!(small.id, standard.id);

        let listed = repo.list_pallet_types().unwrap();
        assert_eq!(listed[0].name, "Standard");
        assert_eq!(listed[1].name, "Mała");

        let definitions = repo.pallet_definitions().unwrap();
        assert_eq!(definitions[0].length_mm, 2500.0);
        assert_eq!(definitions[0].max_load_depth_mm, 1200.0);
        assert_eq!(definitions[0].max_overhang_mm, 700.0);

        let updated = repo
            .update_pallet_type(
                small.id,
                PalletTypeUpdate {
                    length_mm: Some(1600.0),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Mała");
        assert_eq!(updated.length_mm, 1600.0);
        assert_eq!(repo.pallet_type(small.id).unwrap(), updated);

        repo.delete_pallet_type(small.id).unwrap();
        assert!(matches!(
            repo.pallet_type(small.id),
            Err(StoreError::NotFound("Pallet type"))
        ));
        assert!(matches!(
            repo.delete_pallet_type(small.id),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn in_memory_catalog_crud() {
        exercise_catalog(&InMemoryRepository::new());
    }

    #[test]
    fn rejects_invalid_catalog_entries() {
        let repo = InMemoryRepository::new();
        assert!(matches!(
            repo.create_pallet_type(new_type("", 2500.0, 1200.0)),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            repo.create_pallet_type(new_type("Broken", 0.0, 1200.0)),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            repo.upsert_profile_depth("AWS75", -1.0),
            Err(StoreError::Validation(_))
        ));

        let created = repo
            .create_pallet_type(new_type("Standard", 2500.0, 1200.0))
            .unwrap();
        let err = repo
            .update_pallet_type(
                created.id,
                PalletTypeUpdate {
                    load_depth_mm: Some(0.0),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        // Failed updates leave the entry untouched
        assert_eq!(repo.pallet_type(created.id).unwrap(), created);
    }

    #[test]
    fn profile_depths_upsert_and_delete() {
        let repo = InMemoryRepository::new();
        repo.upsert_profile_depth("AWS75", 100.0).unwrap();
        repo.upsert_profile_depth("AWS90", 120.0).unwrap();
        repo.upsert_profile_depth("AWS75", 110.0).unwrap();

        let depths = repo.profile_depths().unwrap();
        assert_eq!(depths.len(), 2);
        assert_eq!(depths["AWS75"], 110.0);

        repo.delete_profile_depth("AWS90").unwrap();
        assert!(matches!(
            repo.delete_profile_depth("AWS90"),
            Err(StoreError::NotFound("Profile depth"))
        ));
    }

    #[test]
    fn profile_depth_keys_are_trimmed_on_delete() {
        let repo = InMemoryRepository::new();
        repo.upsert_profile_depth(" AWS75 ", 100.0).unwrap();
        assert!(repo.profile_depths().unwrap().contains_key("AWS75"));

        repo.delete_profile_depth(" AWS75 ").unwrap();
        assert!(repo.profile_depths().unwrap().is_empty());
    }

    #[test]
    fn failed_in_place_changes_keep_state() {
        let repo = InMemoryRepository::new();
        assert!(repo.create_pallet_type(new_type("Broken", -5.0, 1200.0)).is_err());
        assert!(repo.list_pallet_types().unwrap().is_empty());

        // The rejected create did not consume an id
        let created = repo
            .create_pallet_type(new_type("Standard", 2500.0, 1200.0))
            .unwrap();
        assert_eq!(created.id, 1);
    }

    #[test]
    fn saving_replaces_previous_optimization() {
        let repo = InMemoryRepository::new();
        assert!(!repo.optimization_exists(7).unwrap());

        repo.save_optimization(&result(7, 3)).unwrap();
        repo.save_optimization(&result(7, 2)).unwrap();
        assert_eq!(repo.optimization(7).unwrap().unwrap().total_pallets, 2);
        assert!(repo.optimization_exists(7).unwrap());

        repo.delete_optimization(7).unwrap();
        assert!(repo.optimization(7).unwrap().is_none());
        assert!(matches!(
            repo.delete_optimization(7),
            Err(StoreError::NotFound("Optimization"))
        ));
    }

    #[test]
    fn json_file_catalog_crud() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileRepository::open(dir.path().join("store.json")).unwrap();
        exercise_catalog(&repo);
    }

    #[test]
    fn json_file_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        {
            let repo = JsonFileRepository::open(&path).unwrap();
            repo.upsert_profile_depth("AWS75", 100.0).unwrap();
            repo.create_pallet_type(new_type("Standard", 2500.0, 1200.0))
                .unwrap();
            repo.save_optimization(&result(42, 1)).unwrap();
        }
        assert!(path.exists());

        let reopened = JsonFileRepository::open(&path).unwrap();
        assert_eq!(reopened.path(), path.as_path());
        assert_eq!(reopened.profile_depths().unwrap()["AWS75"], 100.0);
        assert_eq!(reopened.list_pallet_types().unwrap().len(), 1);
        assert_eq!(reopened.optimization_count().unwrap(), 1);
        let saved = reopened.optimization(42).unwrap().unwrap();
        assert_eq!(saved.input_fingerprint.as_deref(), Some("abc"));

        // Ids keep counting after a reopen
        let next = reopened
            .create_pallet_type(new_type("Mała", 1500.0, 1000.0))
            .unwrap();
        assert_eq!(next.id, 2);
    }

    #[test]
    fn json_file_rejects_corrupt_document() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        assert!(matches!(
            JsonFileRepository::open(file.path()),
            Err(StoreError::Serialization(_))
        ));
    }

    #[test]
    fn json_file_treats_empty_file_as_empty_store() {
        let file = NamedTempFile::new().unwrap();
        let repo = JsonFileRepository::open(file.path()).unwrap();
        assert!(repo.profile_depths().unwrap().is_empty());
        assert!(repo.list_pallet_types().unwrap().is_empty());
    }
}
