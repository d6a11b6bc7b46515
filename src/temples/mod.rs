//! Temple registry wiki pages.
//!
//! Input is the fetcher's region file: a JSON object mapping each region to
//! `{name, id, temples: [...]}`. Every temple is filed into two hierarchy
//! indices, the present-day one (index pages plus one page per temple) and the
//! pre-1917 one (index pages only). Pages are written as `0.txt`, `1.txt`, …
//! and a list file maps each written path to its wiki page name.

pub mod card;
pub mod hierarchy;

pub use card::{CardFields, CardValue, Location, Temple};
pub use hierarchy::{HierarchyIndex, Page, checked_pages};

use crate::config::TemplesConfig;
use crate::store::{self, StoreError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum TempleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Duplicate page name: {0}")]
    DuplicatePageName(String),
    #[error("Page name longer than 255 bytes: {0}")]
    PageNameTooLong(String),
}

/// One region of the registry with its temples.
#[derive(Debug, Clone, Deserialize)]
pub struct Region {
    pub name: String,
    pub id: i64,
    #[serde(default)]
    pub temples: Vec<Temple>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TemplesSummary {
    pub regions: usize,
    pub temples: usize,
    /// Temples filed into the present-day index.
    pub modern: usize,
    /// Temples filed into the pre-1917 index.
    pub old: usize,
    pub pages: usize,
}

/// Read the region file. Regions are taken in name order.
pub fn read_regions(path: &Path) -> Result<BTreeMap<String, Region>, TempleError> {
    Ok(store::read_json(path)?)
}

/// Every temple of every region, with card fields filled from raw cards.
pub fn collect_temples(regions: BTreeMap<String, Region>) -> Vec<Temple> {
    regions
        .into_values()
        .flat_map(|region| region.temples)
        .map(|mut temple| {
            temple.parse_card();
            temple
        })
        .collect()
}

/// Write temple and hierarchy pages for `input` into `output_dir`, and the
/// path → page name map into `list_file`.
pub fn generate_temples_pages(
    input: &Path,
    output_dir: &Path,
    list_file: &Path,
    config: &TemplesConfig,
) -> Result<TemplesSummary, TempleError> {
    let regions = read_regions(input)?;
    let mut summary = TemplesSummary {
        regions: regions.len(),
        ..TemplesSummary::default()
    };
    let temples = collect_temples(regions);
    summary.temples = temples.len();

    let mut modern = HierarchyIndex::new(false, &config.modern_name, config.strip_in_brackets);
    let mut old = HierarchyIndex::new(true, &config.old_name, config.strip_in_brackets);
    for temple in &temples {
        summary.modern += usize::from(modern.add_temple(temple));
        summary.old += usize::from(old.add_temple(temple));
    }
    info!(
        temples = summary.temples,
        modern = summary.modern,
        old = summary.old,
        "built hierarchy indices"
    );

    fs::create_dir_all(output_dir)?;
    let pages = modern
        .pages(&config.modern_prefix, &config.temple_prefix, true)
        .chain(old.pages(&config.old_prefix, &config.temple_prefix, false));

    let mut page_files = BTreeMap::new();
    for (n, page) in checked_pages(pages).enumerate() {
        let page = page?;
        let path = output_dir.join(format!("{n}.txt"));
        debug!(path = %path.display(), page = %page.name, "writing page");
        fs::write(&path, &page.text)?;
        page_files.insert(path.display().to_string(), page.name);
    }
    summary.pages = page_files.len();

    store::write_json(list_file, &page_files)?;
    info!(pages = summary.pages, list = %list_file.display(), "generated temple pages");
    Ok(summary)
}
