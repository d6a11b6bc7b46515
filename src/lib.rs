//! # rusarchives
//!
//! Turns search results scraped from the Russian archive catalog into a
//! browsable store and wiki pages, and does the same for the temple registry.
//!
//! # Architecture: Three Stages
//!
//! ```text
//! 1. Group     <id>_<kind>.json  →  store/          (detail files → catalog tree)
//! 2. Rename    store/ + map      →  store/          (fix archive titles)
//! 3. Generate  store/            →  pages/*.txt     (wiki markup)
//! ```
//!
//! The catalog is a four-level tree, archive → fund → inventory → item. The
//! store shards it by level so a single archive or fund can be read without
//! touching the rest; children are read on first access through [`link::Link`].
//!
//! Temple pages come from a separate input, a region file saved by the temple
//! fetcher, and go through [`temples`] straight to page files.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`number`] | Identifier sort key (`"12а3"` → 12, `а`, 3), JSON number coercion |
//! | [`types`] | Detail sections as saved by the scraper |
//! | [`extract`] | Section titles → archive/fund/inventory/item fields, title normalization |
//! | [`model`] | The catalog tree, aggregation, rename |
//! | [`link`] | Lazily loaded child nodes |
//! | [`store`] | Sharded JSON store: read, write, file formats |
//! | [`group`] | Detail directory → tree, in parallel |
//! | [`render`] | Wiki markup for every node |
//! | [`generate`] | Page files for one archive or the whole store |
//! | [`temples`] | Temple records, region hierarchies and their pages |
//! | [`config`] | `rusarchives.toml` loading, validation, merging |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Identifiers Are Strings
//!
//! Fund, inventory and item numbers look numeric but are not: `Р-1`, `12а`,
//! `5а3`. They are kept as strings and ordered by [`number::sort_key`].
//! Older stores with JSON numbers are read as their decimal text.
//!
//! ## Content-Addressed Archive Directories
//!
//! Archive directories are named after the SHA3-256 of the title, so any title
//! maps to a valid, fixed-length directory name. Renaming an archive therefore
//! moves it; the tree is loaded in full before the old directory stops being
//! reachable.
//!
//! ## Deterministic Output
//!
//! Every JSON file is written with sorted keys and four-space indent, and
//! children are emitted in identifier order. Writing the same tree twice gives
//! identical bytes, and the order detail files were read in never shows.

pub mod config;
pub mod extract;
pub mod generate;
pub mod group;
pub mod link;
pub mod model;
pub mod number;
pub mod output;
pub mod render;
pub mod store;
pub mod temples;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
