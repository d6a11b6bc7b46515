//! Shared test utilities for the rusarchives test suite.
//!
//! Provides record builders, tree lookups that panic with the available keys
//! on a miss, and directory snapshots for comparing written output.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let list = ArchiveList::from_records([
//!     record(Some("Архив X"), Some("1"), Some("2"), Some("3")),
//! ])
//! .unwrap();
//!
//! let inventory = find_inventory(&list, Some("Архив X"), Some("1"), Some("2"));
//! assert_eq!(item_numbers(inventory), vec![Some("3")]);
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::extract::ExtractedRecord;
use crate::link::Link;
use crate::model::{Archive, ArchiveList, Fund, Inventory, Item};

// =========================================================================
// Fixtures and builders
// =========================================================================

/// Path of a file or directory under `fixtures/`.
pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures").join(name)
}

/// A record with the given coordinates, no annotations and no sections.
pub fn record(
    archive: Option<&str>,
    fund: Option<&str>,
    inventory: Option<&str>,
    item: Option<&str>,
) -> ExtractedRecord {
    ExtractedRecord {
        archive_title: archive.map(str::to_string),
        fund_number: fund.map(str::to_string),
        fund_annotation: None,
        inventory_number: inventory.map(str::to_string),
        inventory_annotation: None,
        item: Item {
            item_number: item.map(str::to_string),
            item_annotation: None,
            data: Vec::new(),
            start_year: None,
            end_year: None,
            url: None,
        },
    }
}

// =========================================================================
// Tree lookups, panicking with the available keys on a miss
// =========================================================================

fn key(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

/// Find a loaded archive by title. Panics if missing or not loaded.
pub fn find_archive<'a>(list: &'a ArchiveList, title: Option<&str>) -> &'a Archive {
    list.archives
        .get(&key(title))
        .and_then(Link::get)
        .unwrap_or_else(|| {
            panic!("archive {title:?} not loaded. Available: {:?}", list.titles())
        })
}

/// Find a loaded fund. Panics if missing or not loaded.
pub fn find_fund<'a>(list: &'a ArchiveList, archive: Option<&str>, fund: Option<&str>) -> &'a Fund {
    let archive = find_archive(list, archive);
    archive
        .funds
        .get(&key(fund))
        .and_then(Link::get)
        .unwrap_or_else(|| {
            panic!(
                "fund {fund:?} not loaded. Available: {:?}",
                archive.fund_numbers()
            )
        })
}

/// Find a loaded inventory. Panics if missing or not loaded.
pub fn find_inventory<'a>(
    list: &'a ArchiveList,
    archive: Option<&str>,
    fund: Option<&str>,
    inventory: Option<&str>,
) -> &'a Inventory {
    let fund = find_fund(list, archive, fund);
    fund.inventories
        .get(&key(inventory))
        .and_then(Link::get)
        .unwrap_or_else(|| {
            panic!(
                "inventory {inventory:?} not loaded. Available: {:?}",
                fund.inventory_numbers()
            )
        })
}

// =========================================================================
// Bulk extractors
// =========================================================================

/// Item numbers of an inventory in render order.
pub fn item_numbers(inventory: &Inventory) -> Vec<Option<&str>> {
    inventory
        .sorted_items()
        .into_iter()
        .map(|item| item.item_number.as_deref())
        .collect()
}

/// Every file under `root`, as `/`-separated relative paths, sorted.
pub fn relative_files(root: &Path) -> Vec<String> {
    dir_snapshot(root).into_keys().collect()
}

/// Every file under `root` with its bytes, keyed by `/`-separated relative path.
pub fn dir_snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    WalkDir::new(root)
        .into_iter()
        .map(|entry| entry.unwrap())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let relative = entry.path().strip_prefix(root).unwrap();
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            (name, fs::read(entry.path()).unwrap())
        })
        .collect()
}
