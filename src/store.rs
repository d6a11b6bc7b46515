//! Sharded JSON persistence for the archive tree.
//!
//! Every archive, fund and inventory lives in its own file so that one
//! archive can be read, rendered or renamed without parsing the rest:
//!
//! ```text
//! <root>/list.json                                  [title, ...] (sorted, null first)
//! <root>/archive<sha3(title)>/list.json             {"funds": {"<n>": null}, "title"}
//! <root>/archive<sha3(title)>/fund<n>/list.json     {"annotation", "inventories": {"<n>": null}, "number"}
//! <root>/archive<sha3(title)>/fund<n>/inventory<n>.json
//!                                                   {"annotation", "items": {"<n>": item}, "number"}
//! ```
//!
//! Null numbers are written as `""` in map keys and file names. Output is
//! deterministic: keys sorted, four-space indent, non-ASCII written as is.
//! Writing the same tree twice produces identical bytes.
//!
//! The reader is more lenient than the writer. The root may also be a
//! `{"archives": {...}}` map, any `null` child value may instead hold the
//! child's document inline, and numbers may be JSON integers.

use crate::link::{Link, Shard};
use crate::model::{Archive, ArchiveList, Fund, Inventory, Item, archive_dir_name, sorted_links_mut};
use crate::number::{self, from_key_str, key_str};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::ser::PrettyFormatter;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const LIST_FILE: &str = "list.json";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Cannot read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("Cannot write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("Malformed JSON in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Cannot load {0}: the tree was not read from a directory")]
    NoBaseDirectory(&'static str),
    #[error("Shard file does not exist: {}", .0.display())]
    ShardMissing(PathBuf),
    #[error("Archive not found: {0}")]
    ArchiveNotFound(String),
    #[error("Archive with name {0} already exists")]
    ArchiveExists(String),
}

// =========================================================================
// On-disk documents
// =========================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum RootDoc {
    Titles(Vec<Option<String>>),
    Map {
        archives: BTreeMap<String, Option<ArchiveDoc>>,
    },
}

// Every key the writer emits is required; `null` is accepted where the writer
// may produce it.

#[derive(Deserialize)]
struct ArchiveDoc {
    #[serde(deserialize_with = "required")]
    title: Option<String>,
    funds: BTreeMap<String, Option<FundDoc>>,
}

#[derive(Deserialize)]
struct FundDoc {
    #[serde(deserialize_with = "number::deserialize_opt")]
    number: Option<String>,
    #[serde(deserialize_with = "required")]
    annotation: Option<String>,
    inventories: BTreeMap<String, Option<InventoryDoc>>,
}

#[derive(Deserialize)]
struct InventoryDoc {
    #[serde(deserialize_with = "number::deserialize_opt")]
    number: Option<String>,
    #[serde(deserialize_with = "required")]
    annotation: Option<String>,
    items: BTreeMap<String, Item>,
}

/// Plain deserialization, but a missing key is an error even for `Option`.
pub(crate) fn required<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer)
}

/// Child maps are written with `null` values: children live in their own files.
type ChildKeys = BTreeMap<String, Option<()>>;

#[derive(Serialize)]
struct ArchiveOut<'a> {
    title: &'a Option<String>,
    funds: ChildKeys,
}

#[derive(Serialize)]
struct FundOut<'a> {
    number: &'a Option<String>,
    annotation: &'a Option<String>,
    inventories: ChildKeys,
}

#[derive(Serialize)]
struct InventoryOut<'a> {
    number: &'a Option<String>,
    annotation: &'a Option<String>,
    items: BTreeMap<String, &'a Item>,
}

fn child_keys<'a>(keys: impl Iterator<Item = &'a Option<String>>) -> ChildKeys {
    keys.map(|k| (key_str(k), None)).collect()
}

fn fund_dir_name(key: &str) -> String {
    format!("fund{key}")
}

fn inventory_file_name(key: &str) -> String {
    format!("inventory{key}.json")
}

// =========================================================================
// JSON helpers
// =========================================================================

/// Serialize with sorted keys and a four-space indent.
pub fn pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    // Going through `Value` sorts struct fields along with map keys.
    let value = serde_json::to_value(value)?;
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer)?;
    Ok(buf)
}

fn create_dir(path: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(path).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `value` to `path`, creating missing parent directories.
///
/// Identifiers may contain `/`, which nests the file one level deeper.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let bytes = pretty_json(value)?;
    if let Some(parent) = path.parent() {
        create_dir(parent)?;
    }
    fs::write(path, bytes).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let content = fs::read_to_string(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

// =========================================================================
// Documents → tree
// =========================================================================

fn inventory_from_doc(doc: InventoryDoc) -> Inventory {
    Inventory {
        number: doc.number,
        annotation: doc.annotation,
        items: doc
            .items
            .into_values()
            .map(|item| (item.item_number.clone(), item))
            .collect(),
    }
}

/// `dir` is the fund's directory, `None` for a tree without backing files.
fn fund_from_doc(doc: FundDoc, dir: Option<&Path>) -> Fund {
    let inventories = doc
        .inventories
        .into_iter()
        .map(|(key, child)| {
            let link = match child {
                Some(inventory) => Link::Loaded(inventory_from_doc(inventory)),
                None => Link::Unloaded(dir.map(|d| d.join(inventory_file_name(&key)))),
            };
            (from_key_str(&key), link)
        })
        .collect();
    Fund {
        number: doc.number,
        annotation: doc.annotation,
        inventories,
    }
}

/// `dir` is the archive's directory.
fn archive_from_doc(doc: ArchiveDoc, dir: Option<&Path>) -> Archive {
    let funds = doc
        .funds
        .into_iter()
        .map(|(key, child)| {
            let fund_dir = dir.map(|d| d.join(fund_dir_name(&key)));
            let link = match child {
                Some(fund) => Link::Loaded(fund_from_doc(fund, fund_dir.as_deref())),
                None => Link::Unloaded(fund_dir.map(|d| d.join(LIST_FILE))),
            };
            (from_key_str(&key), link)
        })
        .collect();
    Archive {
        title: doc.title,
        funds,
    }
}

fn list_from_doc(doc: RootDoc, base: Option<&Path>) -> ArchiveList {
    let archive_dir = |title: Option<&str>| base.map(|b| b.join(archive_dir_name(title)));

    let archives = match doc {
        RootDoc::Titles(titles) => titles
            .into_iter()
            .map(|title| {
                let title = title.filter(|t| !t.is_empty());
                let path = archive_dir(title.as_deref()).map(|d| d.join(LIST_FILE));
                (title, Link::Unloaded(path))
            })
            .collect(),
        RootDoc::Map { archives } => archives
            .into_iter()
            .map(|(key, child)| {
                let title = from_key_str(&key);
                let dir = archive_dir(title.as_deref());
                let link = match child {
                    Some(archive) => Link::Loaded(archive_from_doc(archive, dir.as_deref())),
                    None => Link::Unloaded(dir.map(|d| d.join(LIST_FILE))),
                };
                (title, link)
            })
            .collect(),
    };

    ArchiveList {
        base_dir: base.map(Path::to_path_buf),
        archives,
    }
}

impl Shard for Inventory {
    const KIND: &'static str = "inventory";

    fn load(path: &Path) -> Result<Self, StoreError> {
        Ok(inventory_from_doc(read_json(path)?))
    }
}

impl Shard for Fund {
    const KIND: &'static str = "fund";

    fn load(path: &Path) -> Result<Self, StoreError> {
        Ok(fund_from_doc(read_json(path)?, path.parent()))
    }
}

impl Shard for Archive {
    const KIND: &'static str = "archive";

    fn load(path: &Path) -> Result<Self, StoreError> {
        Ok(archive_from_doc(read_json(path)?, path.parent()))
    }
}

/// Open a store. Only the root list is parsed; archives load on demand.
pub fn read(base: &Path) -> Result<ArchiveList, StoreError> {
    let doc = read_json(&base.join(LIST_FILE))?;
    let list = list_from_doc(doc, Some(base));
    debug!(path = %base.display(), archives = list.archives.len(), "opened store");
    Ok(list)
}

/// Parse a root document that has no directory behind it.
///
/// Children given inline are loaded; any `null` child fails with
/// [`StoreError::NoBaseDirectory`] when resolved.
pub fn from_json_str(json: &str) -> Result<ArchiveList, StoreError> {
    Ok(list_from_doc(serde_json::from_str(json)?, None))
}

// =========================================================================
// Tree → files
// =========================================================================

/// Write the whole tree under `out`, loading anything still on disk first.
pub fn write(list: &mut ArchiveList, out: &Path) -> Result<(), StoreError> {
    list.fetch_all()?;
    create_dir(out)?;

    let titles: Vec<&Option<String>> = list.titles();
    write_json(&out.join(LIST_FILE), &titles)?;

    for (_, link) in sorted_links_mut(&mut list.archives) {
        write_archive(link.resolve()?, out)?;
    }
    info!(path = %out.display(), archives = list.archives.len(), "wrote store");
    Ok(())
}

fn write_archive(archive: &mut Archive, out: &Path) -> Result<(), StoreError> {
    let dir = out.join(archive.dir_name());
    create_dir(&dir)?;
    write_json(
        &dir.join(LIST_FILE),
        &ArchiveOut {
            title: &archive.title,
            funds: child_keys(archive.funds.keys()),
        },
    )?;

    for (key, link) in sorted_links_mut(&mut archive.funds) {
        write_fund(link.resolve()?, &dir.join(fund_dir_name(&key_str(key))))?;
    }
    Ok(())
}

fn write_fund(fund: &mut Fund, dir: &Path) -> Result<(), StoreError> {
    create_dir(dir)?;
    write_json(
        &dir.join(LIST_FILE),
        &FundOut {
            number: &fund.number,
            annotation: &fund.annotation,
            inventories: child_keys(fund.inventories.keys()),
        },
    )?;

    for (key, link) in sorted_links_mut(&mut fund.inventories) {
        let inventory = link.resolve()?;
        write_json(
            &dir.join(inventory_file_name(&key_str(key))),
            &InventoryOut {
                number: &inventory.number,
                annotation: &inventory.annotation,
                items: inventory
                    .items
                    .iter()
                    .map(|(k, item)| (key_str(k), item))
                    .collect(),
            },
        )?;
    }
    Ok(())
}
