//! The archive catalog tree: archives own funds, funds own inventories,
//! inventories own items.
//!
//! ```text
//! ArchiveList
//! └── Archive (title)            ─ Link<Archive>
//!     └── Fund (number)          ─ Link<Fund>
//!         └── Inventory (number) ─ Link<Inventory>
//!             └── Item (number)
//! ```
//!
//! Every map is keyed by the node's own identifier, `None` standing for "not
//! stated in the source". Aggregation imposes no ordering; anything that emits
//! children sorts them through [`crate::number`] first.
//!
//! Nodes never point back at their parents. Code that needs ancestor
//! coordinates (the renderer, the writer) receives them as borrows while it
//! walks down.

use crate::extract::ExtractedRecord;
use crate::link::{Link, Shard};
use crate::number;
use crate::store::StoreError;
use crate::types::Section;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Leaf of the tree: one storage unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(deserialize_with = "number::deserialize_opt")]
    pub item_number: Option<String>,
    #[serde(deserialize_with = "crate::store::required")]
    pub item_annotation: Option<String>,
    /// Raw detail sections the item was extracted from.
    pub data: Vec<Section>,
    #[serde(default)]
    pub start_year: Option<i32>,
    #[serde(default)]
    pub end_year: Option<i32>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inventory {
    pub number: Option<String>,
    pub annotation: Option<String>,
    pub items: HashMap<Option<String>, Item>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fund {
    pub number: Option<String>,
    pub annotation: Option<String>,
    pub inventories: HashMap<Option<String>, Link<Inventory>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Archive {
    pub title: Option<String>,
    pub funds: HashMap<Option<String>, Link<Fund>>,
}

/// Root of the tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArchiveList {
    /// Directory the tree was read from; `None` for a tree built in memory.
    pub base_dir: Option<PathBuf>,
    pub archives: HashMap<Option<String>, Link<Archive>>,
}

/// Node counts of the loaded part of a tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub archives: usize,
    pub funds: usize,
    pub inventories: usize,
    pub items: usize,
}

/// Hex SHA3-256 of an archive title; the null title hashes as `""`.
pub fn title_hash(title: Option<&str>) -> String {
    let digest = Sha3_256::digest(title.unwrap_or("").as_bytes());
    format!("{:x}", digest)
}

/// Name of the shard directory holding an archive.
pub fn archive_dir_name(title: Option<&str>) -> String {
    format!("archive{}", title_hash(title))
}

/// Keep the stored annotation unless a non-empty one arrives.
fn merge_annotation(stored: &mut Option<String>, incoming: Option<String>) {
    if let Some(annotation) = incoming.filter(|a| !a.is_empty()) {
        *stored = Some(annotation);
    }
}

/// Children of a node in ascending identifier order.
pub(crate) fn sorted_links_mut<T>(
    map: &mut HashMap<Option<String>, Link<T>>,
) -> Vec<(&Option<String>, &mut Link<T>)> {
    let mut entries: Vec<_> = map.iter_mut().collect();
    entries.sort_by(|a, b| number::compare(a.0.as_deref(), b.0.as_deref()));
    entries
}

fn fetch_children<T: Shard>(
    map: &mut HashMap<Option<String>, Link<T>>,
    mut descend: impl FnMut(&mut T) -> Result<(), StoreError>,
) -> Result<(), StoreError> {
    for link in map.values_mut() {
        descend(link.resolve()?)?;
    }
    Ok(())
}

impl Inventory {
    pub fn new(number: Option<String>) -> Self {
        Self {
            number,
            ..Self::default()
        }
    }

    /// Insert an item, replacing any earlier item with the same number.
    pub fn append(&mut self, item: Item) {
        if self.items.contains_key(&item.item_number) {
            debug!(
                inventory = number::number_str(self.number.as_deref()),
                item = number::number_str(item.item_number.as_deref()),
                "replacing item"
            );
        }
        self.items.insert(item.item_number.clone(), item);
    }

    pub fn sorted_items(&self) -> Vec<&Item> {
        let mut items: Vec<&Item> = self.items.values().collect();
        items.sort_by(|a, b| number::compare(a.item_number.as_deref(), b.item_number.as_deref()));
        items
    }
}

impl Fund {
    pub fn new(number: Option<String>) -> Self {
        Self {
            number,
            ..Self::default()
        }
    }

    pub fn append(
        &mut self,
        inventory_number: Option<String>,
        inventory_annotation: Option<String>,
        item: Item,
    ) -> Result<(), StoreError> {
        let inventory = self
            .inventories
            .entry(inventory_number.clone())
            .or_insert_with(|| Link::Loaded(Inventory::new(inventory_number)))
            .resolve()?;
        merge_annotation(&mut inventory.annotation, inventory_annotation);
        inventory.append(item);
        Ok(())
    }

    pub fn inventory_numbers(&self) -> Vec<&Option<String>> {
        number::sorted(self.inventories.keys())
    }

    pub fn fetch_all(&mut self) -> Result<(), StoreError> {
        fetch_children(&mut self.inventories, |_| Ok(()))
    }
}

impl Archive {
    pub fn new(title: Option<String>) -> Self {
        Self {
            title,
            ..Self::default()
        }
    }

    pub fn dir_name(&self) -> String {
        archive_dir_name(self.title.as_deref())
    }

    /// Add a record whose archive title is this archive's.
    pub fn append(&mut self, record: ExtractedRecord) -> Result<(), StoreError> {
        let ExtractedRecord {
            fund_number,
            fund_annotation,
            inventory_number,
            inventory_annotation,
            item,
            ..
        } = record;

        let fund = self
            .funds
            .entry(fund_number.clone())
            .or_insert_with(|| Link::Loaded(Fund::new(fund_number)))
            .resolve()?;
        merge_annotation(&mut fund.annotation, fund_annotation);
        fund.append(inventory_number, inventory_annotation, item)
    }

    pub fn fund_numbers(&self) -> Vec<&Option<String>> {
        number::sorted(self.funds.keys())
    }

    pub fn fetch_all(&mut self) -> Result<(), StoreError> {
        fetch_children(&mut self.funds, Fund::fetch_all)
    }
}

impl ArchiveList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregate records in the order given.
    pub fn from_records<I>(records: I) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = ExtractedRecord>,
    {
        let mut list = Self::new();
        for record in records {
            list.append(record)?;
        }
        Ok(list)
    }

    pub fn append(&mut self, record: ExtractedRecord) -> Result<(), StoreError> {
        let title = record.archive_title.clone();
        self.archives
            .entry(title.clone())
            .or_insert_with(|| Link::Loaded(Archive::new(title)))
            .resolve()?
            .append(record)
    }

    /// Archive titles in ascending order, the null title first.
    pub fn titles(&self) -> Vec<&Option<String>> {
        number::sorted(self.archives.keys())
    }

    /// Look up an archive by title, loading it if needed.
    pub fn archive(&mut self, title: Option<&str>) -> Result<&mut Archive, StoreError> {
        let key = title.map(str::to_string);
        self.archives
            .get_mut(&key)
            .ok_or_else(|| StoreError::ArchiveNotFound(title.unwrap_or_default().to_string()))?
            .resolve()
    }

    /// Materialize every archive, fund and inventory.
    pub fn fetch_all(&mut self) -> Result<(), StoreError> {
        fetch_children(&mut self.archives, Archive::fetch_all)
    }

    /// Move an archive under a new title.
    ///
    /// The archive is fully loaded first: its shard directory name depends on
    /// the title, so nothing may be read through the old path afterwards.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<(), StoreError> {
        if old == new {
            return Ok(());
        }
        let old_key = Some(old.to_string());
        let new_key = Some(new.to_string());
        if self.archives.contains_key(&new_key) {
            return Err(StoreError::ArchiveExists(new.to_string()));
        }

        self.archive(Some(old))?.fetch_all()?;
        let Some(mut link) = self.archives.remove(&old_key) else {
            return Err(StoreError::ArchiveNotFound(old.to_string()));
        };
        link.resolve()?.title = new_key.clone();
        self.archives.insert(new_key, link);
        info!(from = old, to = new, "renamed archive");
        Ok(())
    }

    /// Apply an old → new title map in ascending old-title order.
    ///
    /// Titles missing from the tree are skipped. Returns the renames that were
    /// applied; stops at the first collision.
    pub fn apply_renames(
        &mut self,
        renames: &BTreeMap<String, String>,
    ) -> Result<Vec<(String, String)>, StoreError> {
        let mut applied = Vec::new();
        for (old, new) in renames {
            if !self.archives.contains_key(&Some(old.clone())) {
                warn!(
                    title = %old,
                    store = ?self.base_dir,
                    "archive to rename not found, skipping"
                );
                continue;
            }
            self.rename(old, new)?;
            applied.push((old.clone(), new.clone()));
        }
        Ok(applied)
    }

    /// Count the nodes that are currently in memory.
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        for archive in self.archives.values().filter_map(Link::get) {
            stats.archives += 1;
            for fund in archive.funds.values().filter_map(Link::get) {
                stats.funds += 1;
                for inventory in fund.inventories.values().filter_map(Link::get) {
                    stats.inventories += 1;
                    stats.items += inventory.items.len();
                }
            }
        }
        stats
    }
}
