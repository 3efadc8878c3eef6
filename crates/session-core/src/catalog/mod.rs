//! Outfit catalog
//!
//! Read-only pool of outfit asset filenames grouped by `{gender}_{slot}`.
//! Population happens once at construction; afterwards the catalog only
//! answers random-selection queries. An empty pool never fails a query: the
//! placeholder `{gender}_{slot}_1.png` is returned instead.

mod loader;

use std::collections::BTreeMap;
use std::path::Path;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::errors::Result;
use crate::types::{Gender, OutfitSelection, Slot};

pub use loader::parse_asset_name;

pub struct OutfitCatalog {
    files: BTreeMap<String, Vec<String>>,
    rng: Mutex<StdRng>,
}

impl OutfitCatalog {
    /// Catalog with every `{gender}_{slot}` pool present but empty
    pub fn empty() -> Self {
        let files = Gender::ALL
            .iter()
            .flat_map(|g| Slot::ALL.iter().map(move |s| (Self::slot_key(*g, *s), Vec::new())))
            .collect();

        Self {
            files,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Build a catalog from bare filenames, keeping only recognised asset names
    pub fn from_files<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut catalog = Self::empty();
        for name in names {
            let name = name.as_ref();
            if let Some((gender, slot)) = parse_asset_name(name) {
                if let Some(pool) = catalog.files.get_mut(&Self::slot_key(gender, slot)) {
                    pool.push(name.to_string());
                }
            }
        }
        for pool in catalog.files.values_mut() {
            pool.sort();
        }
        catalog
    }

    /// Enumerate an asset directory, failing on I/O errors
    pub fn try_load_from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let names = loader::list_png_files(dir.as_ref())?;
        let catalog = Self::from_files(names);
        info!(
            "Loaded outfit catalog from {}: {} assets",
            dir.as_ref().display(),
            catalog.asset_count()
        );
        Ok(catalog)
    }

    /// Enumerate an asset directory, degrading to an empty catalog on failure
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Self {
        match Self::try_load_from_dir(dir) {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!("{}; falling back to placeholder outfits", e);
                Self::empty()
            }
        }
    }

    /// Replace the random source, e.g. with a seeded one in tests
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    pub fn slot_key(gender: Gender, slot: Slot) -> String {
        format!("{}_{}", gender, slot)
    }

    pub fn placeholder(gender: Gender, slot: Slot) -> String {
        format!("{}_{}_1.png", gender, slot)
    }

    /// Uniform random asset for one slot
    pub fn pick_random(&self, gender: Gender, slot: Slot) -> String {
        let mut rng = self.rng.lock();
        self.pick_with(&mut rng, gender, slot)
    }

    /// Independent uniform choice per slot for one gender
    pub fn select_outfits(&self, gender: Gender) -> OutfitSelection {
        let mut rng = self.rng.lock();
        OutfitSelection::from_fn(|slot| self.pick_with(&mut rng, gender, slot))
    }

    /// One gender chosen uniformly, then one asset per slot for that gender
    pub fn pick_idle_set(&self) -> OutfitSelection {
        let mut rng = self.rng.lock();
        let gender = *Gender::ALL.choose(&mut *rng).unwrap_or(&Gender::Neutral);
        OutfitSelection::from_fn(|slot| self.pick_with(&mut rng, gender, slot))
    }

    /// Full listing keyed by `{gender}_{slot}`
    pub fn list_all(&self) -> BTreeMap<String, Vec<String>> {
        self.files.clone()
    }

    pub fn asset_count(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    fn pick_with(&self, rng: &mut StdRng, gender: Gender, slot: Slot) -> String {
        self.files
            .get(&Self::slot_key(gender, slot))
            .and_then(|pool| pool.choose(rng))
            .cloned()
            .unwrap_or_else(|| Self::placeholder(gender, slot))
    }
}

impl Default for OutfitCatalog {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for OutfitCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutfitCatalog")
            .field("files", &self.files)
            .finish_non_exhaustive()
    }
}
