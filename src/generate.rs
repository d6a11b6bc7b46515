//! Wiki page files.
//!
//! Two layouts are produced from a store:
//!
//! ```text
//! generate-archive                       generate-archives
//! out/                                   out/
//! ├── <Archive>.txt      (links)         ├── Список архивов.txt
//! └── <Archive>/                         ├── <Archive>.txt
//!     ├── Фонд 1.txt     (inline)        └── <Archive>/
//!     └── Фонд 2.txt                         ├── Фонд 1.txt
//!                                            └── Фонд 1/
//!                                                ├── Опись 1.txt
//!                                                └── Опись 1/
//!                                                    ├── 1.txt
//!                                                    └── 2.txt
//! ```
//!
//! The single-archive layout puts every fund on one page with its inventories
//! and items inline. The full layout gives each node its own page and links
//! between them. Missing identifiers fall back to `Неизвестный архив`,
//! `Неизвестный фонд`, `Неизвестная опись` and `Неизвестно`.

use crate::model::{Archive, ArchiveList, Fund, sorted_links_mut};
use crate::render::{
    self, FundContext, archive_page_name, fund_page_name, inventory_page_name, item_page_name,
};
use crate::store::StoreError;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

pub const ARCHIVE_LIST_PAGE: &str = "Список архивов";

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn write_page(dir: &Path, name: &str, text: &str) -> Result<(), GenerateError> {
    let path = dir.join(format!("{name}.txt"));
    debug!(path = %path.display(), "writing page");
    // A `/` in an identifier nests the page one directory deeper.
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text)?;
    Ok(())
}

/// Pages for one archive: the archive page plus one inline page per fund.
///
/// Returns the number of pages written.
pub fn generate_archive_pages(
    list: &mut ArchiveList,
    title: &str,
    output_dir: &Path,
    heading_level: usize,
) -> Result<usize, GenerateError> {
    let archive = list.archive(Some(title))?;
    fs::create_dir_all(output_dir)?;

    let name = archive_page_name(archive.title.as_deref()).to_string();
    write_page(
        output_dir,
        &name,
        &render::render_archive(archive, true, heading_level)?,
    )?;
    let mut pages = 1;

    let archive_dir = output_dir.join(&name);
    fs::create_dir_all(&archive_dir)?;

    let Archive { title, funds } = archive;
    for (key, link) in sorted_links_mut(funds) {
        let text = render::render_fund(title.as_deref(), link.resolve()?, false, heading_level)?;
        write_page(&archive_dir, &fund_page_name(key.as_deref()), &text)?;
        pages += 1;
    }

    info!(archive = %name, pages, "generated archive pages");
    Ok(pages)
}

/// Pages for every node of the store, each linking to its children.
///
/// Returns the number of pages written.
pub fn generate_archives_pages(
    list: &mut ArchiveList,
    output_dir: &Path,
    heading_level: usize,
) -> Result<usize, GenerateError> {
    fs::create_dir_all(output_dir)?;
    write_page(
        output_dir,
        ARCHIVE_LIST_PAGE,
        &render::render_archive_list(list, heading_level),
    )?;
    let mut pages = 1;

    for (_, link) in sorted_links_mut(&mut list.archives) {
        let archive = link.resolve()?;
        let name = archive_page_name(archive.title.as_deref()).to_string();
        write_page(
            output_dir,
            &name,
            &render::render_archive(archive, true, heading_level)?,
        )?;
        pages += 1;

        let archive_dir = output_dir.join(&name);
        fs::create_dir_all(&archive_dir)?;
        let Archive { title, funds } = archive;
        for (key, link) in sorted_links_mut(funds) {
            pages += write_fund_pages(
                title.as_deref(),
                &fund_page_name(key.as_deref()),
                link.resolve()?,
                &archive_dir,
                heading_level,
            )?;
        }
        debug!(archive = %name, "generated archive subtree");
    }

    info!(pages, "generated pages for all archives");
    Ok(pages)
}

fn write_fund_pages(
    archive: Option<&str>,
    name: &str,
    fund: &mut Fund,
    archive_dir: &Path,
    heading_level: usize,
) -> Result<usize, GenerateError> {
    write_page(
        archive_dir,
        name,
        &render::render_fund(archive, fund, true, heading_level)?,
    )?;
    let mut pages = 1;

    let fund_dir = archive_dir.join(name);
    fs::create_dir_all(&fund_dir)?;

    let Fund {
        number,
        annotation,
        inventories,
    } = fund;
    let fund_ctx = FundContext {
        archive,
        number: number.as_deref(),
        annotation: annotation.as_deref(),
    };

    for (key, link) in sorted_links_mut(inventories) {
        let inventory = link.resolve()?;
        let ctx = fund_ctx.inventory(inventory);
        let inventory_name = inventory_page_name(key.as_deref());
        write_page(
            &fund_dir,
            &inventory_name,
            &render::render_inventory(&ctx, inventory, true, heading_level),
        )?;
        pages += 1;

        let inventory_dir = fund_dir.join(&inventory_name);
        fs::create_dir_all(&inventory_dir)?;
        for item in inventory.sorted_items() {
            write_page(
                &inventory_dir,
                item_page_name(item.item_number.as_deref()),
                &render::render_item(&ctx, item),
            )?;
            pages += 1;
        }
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use tempfile::TempDir;

    fn sample() -> ArchiveList {
        let mut a = record(Some("Архив X"), Some("1"), Some("2"), Some("3"));
        a.fund_annotation = Some("Fund one".into());
        let b = record(Some("Архив X"), Some("1"), Some("2"), Some("4"));
        let c = record(Some("Архив X"), None, None, None);
        let d = record(None, Some("5"), Some("6"), Some("7"));
        ArchiveList::from_records([a, b, c, d]).unwrap()
    }

    #[test]
    fn single_archive_layout() {
        let tmp = TempDir::new().unwrap();
        let pages = generate_archive_pages(&mut sample(), "Архив X", tmp.path(), 2).unwrap();

        assert_eq!(pages, 3);
        assert_eq!(
            relative_files(tmp.path()),
            vec![
                "Архив X.txt",
                "Архив X/Неизвестный фонд.txt",
                "Архив X/Фонд 1.txt",
            ]
        );

        let archive_page = fs::read_to_string(tmp.path().join("Архив X.txt")).unwrap();
        assert!(archive_page.starts_with("{{Архив|archive=Архив X}}\n\n== Фонды ==\n\n"));
        assert!(archive_page.contains("{{СсылкаНаФонд|archive=Архив X|fund=1}}"));

        let fund_page = fs::read_to_string(tmp.path().join("Архив X/Фонд 1.txt")).unwrap();
        assert!(fund_page.contains("== Опись 2 =="));
        assert!(fund_page.contains("==== Единица хранения 3 ===="));
    }

    #[test]
    fn single_archive_missing_title() {
        let tmp = TempDir::new().unwrap();
        let err = generate_archive_pages(&mut sample(), "Нет такого", tmp.path(), 2).unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Store(StoreError::ArchiveNotFound(t)) if t == "Нет такого"
        ));
    }

    #[test]
    fn full_layout() {
        let tmp = TempDir::new().unwrap();
        let pages = generate_archives_pages(&mut sample(), tmp.path(), 2).unwrap();

        let files = relative_files(tmp.path());
        assert_eq!(pages, files.len());
        for expected in [
            "Список архивов.txt",
            "Архив X.txt",
            "Архив X/Фонд 1.txt",
            "Архив X/Фонд 1/Опись 2.txt",
            "Архив X/Фонд 1/Опись 2/3.txt",
            "Архив X/Фонд 1/Опись 2/4.txt",
            "Архив X/Неизвестный фонд/Неизвестная опись/Неизвестно.txt",
            "Неизвестный архив.txt",
            "Неизвестный архив/Фонд 5/Опись 6/7.txt",
        ] {
            assert!(files.iter().any(|f| f == expected), "missing {expected}: {files:?}");
        }

        let list_page = fs::read_to_string(tmp.path().join("Список архивов.txt")).unwrap();
        assert_eq!(list_page, "== Архивы ==\n\n* [[Архив X]]\n");

        let item_page = fs::read_to_string(tmp.path().join("Архив X/Фонд 1/Опись 2/4.txt")).unwrap();
        assert!(item_page.starts_with(
            "{{ЕдиницаХранения|archive=Архив X|fund=1|inventory=2|item=4|fund_annotation=Fund one|"
        ));
    }

    #[test]
    fn slash_in_identifiers_nests_pages() {
        let tmp = TempDir::new().unwrap();
        let mut list =
            ArchiveList::from_records([record(Some("Архив X"), Some("1"), Some("3/4"), Some("5/6"))])
                .unwrap();
        let pages = generate_archives_pages(&mut list, tmp.path(), 2).unwrap();

        let files = relative_files(tmp.path());
        assert_eq!(pages, files.len());
        assert!(files.iter().any(|f| f == "Архив X/Фонд 1/Опись 3/4.txt"), "{files:?}");
        assert!(files.iter().any(|f| f == "Архив X/Фонд 1/Опись 3/4/5/6.txt"), "{files:?}");
    }
}
