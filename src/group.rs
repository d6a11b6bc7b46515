//! Grouping a directory of saved search-result details into an archive tree.
//!
//! The scraper saves one JSON file per search result, named `<id>_<kind>.json`
//! after the query parameters of its details page (`id` is digits and dashes,
//! `kind` is digits). Anything else in the directory, including the scraper's
//! own `list.json`, is skipped.
//!
//! Reading and extraction run on the rayon pool. Records are then appended in
//! file-name order on the calling thread, so the result does not depend on
//! thread scheduling.

use crate::extract::{self, ExtractedRecord};
use crate::model::ArchiveList;
use crate::store::{self, StoreError};
use crate::types::DetailRecord;
use rayon::prelude::*;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

static DETAIL_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([\d-]+)_(\d+)\.json$").expect("valid detail file regex"));

#[derive(Error, Debug)]
pub enum GroupError {
    #[error("Cannot list input directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A saved detail file and the query it was fetched with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailFile {
    pub path: PathBuf,
    pub id: String,
    pub kind: String,
}

impl DetailFile {
    /// Parse `<id>_<kind>.json`; `None` for any other file name.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let caps = DETAIL_FILE.captures(name)?;
        Some(Self {
            path: path.to_path_buf(),
            id: caps[1].to_string(),
            kind: caps[2].to_string(),
        })
    }

    /// Link back to the details page on the catalog site.
    pub fn url(&self, details_url: &str) -> String {
        format!("{details_url}?ID={}&Kind={}", self.id, self.kind)
    }

    /// Read and extract this file. `details_url` is set when links should be
    /// recorded on the item.
    pub fn load(&self, details_url: Option<&str>) -> Result<ExtractedRecord, StoreError> {
        let sections: DetailRecord = store::read_json(&self.path)?;
        Ok(extract::extract(&sections, details_url.map(|base| self.url(base))))
    }
}

/// Detail files directly inside `dir`, sorted by file name.
pub fn list_detail_files(dir: &Path) -> Result<Vec<DetailFile>, GroupError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        match DetailFile::from_path(entry.path()) {
            Some(file) => files.push(file),
            None => debug!(path = %entry.path().display(), "skipping non-detail file"),
        }
    }
    Ok(files)
}

/// Build an in-memory archive tree from every detail file in `dir`.
pub fn group(dir: &Path, details_url: Option<&str>) -> Result<ArchiveList, GroupError> {
    let files = list_detail_files(dir)?;
    info!(files = files.len(), path = %dir.display(), "extracting details");

    // Collecting an indexed parallel iterator keeps the input order.
    let records = files
        .par_iter()
        .map(|file| file.load(details_url))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ArchiveList::from_records(records)?)
}
