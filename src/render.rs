//! Wiki page text for the archive tree.
//!
//! Each level has one page template carrying its own coordinates plus the
//! annotations of its ancestors:
//!
//! | Level     | Page template        | Link template                |
//! |-----------|----------------------|------------------------------|
//! | Archive   | `Архив`              | —                            |
//! | Fund      | `Фонд`               | `СсылкаНаФонд`               |
//! | Inventory | `Опись`              | `СсылкаНаОпись`              |
//! | Item      | `ЕдиницаХранения`    | `СсылкаНаЕдиницуХранения`    |
//!
//! With `separate` set, children are listed as link templates (each child gets
//! its own page elsewhere). Without it, children are rendered inline under
//! `==`-style headings, one level deeper per generation.
//!
//! Template values are inserted verbatim. `{{`, `}}` and `|` inside titles or
//! annotations are not escaped and will break the template call.

use crate::model::{Archive, ArchiveList, Fund, Inventory, Item, sorted_links_mut};
use crate::number::{self, number_str, year_str};
use crate::store::StoreError;

/// Archive coordinates of a fund.
#[derive(Debug, Clone, Copy)]
pub struct FundContext<'a> {
    pub archive: Option<&'a str>,
    pub number: Option<&'a str>,
    pub annotation: Option<&'a str>,
}

/// Archive and fund coordinates of an inventory.
#[derive(Debug, Clone, Copy)]
pub struct InventoryContext<'a> {
    pub fund: FundContext<'a>,
    pub number: Option<&'a str>,
    pub annotation: Option<&'a str>,
}

impl<'a> FundContext<'a> {
    pub fn new(archive: Option<&'a str>, fund: &'a Fund) -> Self {
        Self {
            archive,
            number: fund.number.as_deref(),
            annotation: fund.annotation.as_deref(),
        }
    }

    pub fn inventory(self, inventory: &'a Inventory) -> InventoryContext<'a> {
        InventoryContext {
            fund: self,
            number: inventory.number.as_deref(),
            annotation: inventory.annotation.as_deref(),
        }
    }
}

fn heading(level: usize) -> String {
    "=".repeat(level)
}

fn text(value: Option<&str>) -> &str {
    value.unwrap_or("")
}

/// `{{СсылкаНаФонд|...}}`, `{{СсылкаНаОпись|...}}` style call.
pub(crate) fn template(name: &str, params: &[(&str, &str)]) -> String {
    let mut out = format!("{{{{{name}");
    for (key, value) in params {
        out.push('|');
        out.push_str(key);
        out.push('=');
        out.push_str(value);
    }
    out.push_str("}}");
    out
}

pub fn render_item(ctx: &InventoryContext<'_>, item: &Item) -> String {
    let start_year = year_str(item.start_year);
    let end_year = year_str(item.end_year);
    let page = template(
        "ЕдиницаХранения",
        &[
            ("archive", text(ctx.fund.archive)),
            ("fund", number_str(ctx.fund.number)),
            ("inventory", number_str(ctx.number)),
            ("item", number_str(item.item_number.as_deref())),
            ("fund_annotation", text(ctx.fund.annotation)),
            ("inventory_annotation", text(ctx.annotation)),
            ("item_annotation", text(item.item_annotation.as_deref())),
            ("start_year", start_year.as_str()),
            ("end_year", end_year.as_str()),
            ("url", text(item.url.as_deref())),
        ],
    );
    format!("{page}\n\n")
}

pub fn render_inventory(
    ctx: &InventoryContext<'_>,
    inventory: &Inventory,
    separate: bool,
    heading_level: usize,
) -> String {
    let h = heading(heading_level);
    let child_level = heading_level + 1;
    let entries: Vec<String> = inventory
        .sorted_items()
        .into_iter()
        .map(|item| {
            let number = number_str(item.item_number.as_deref());
            if separate {
                template(
                    "СсылкаНаЕдиницуХранения",
                    &[
                        ("archive", text(ctx.fund.archive)),
                        ("fund", number_str(ctx.fund.number)),
                        ("inventory", number_str(ctx.number)),
                        ("item", number),
                    ],
                )
            } else {
                let h = heading(child_level);
                format!("{h} Единица хранения {number} {h}\n\n{}", render_item(ctx, item))
            }
        })
        .collect();

    let page = template(
        "Опись",
        &[
            ("archive", text(ctx.fund.archive)),
            ("fund", number_str(ctx.fund.number)),
            ("inventory", number_str(ctx.number)),
            ("fund_annotation", text(ctx.fund.annotation)),
            ("inventory_annotation", text(ctx.annotation)),
        ],
    );
    format!(
        "{page}\n\n{h} Единицы хранения {h}\n\n{}\n",
        entries.join("\n\n")
    )
}

/// `Опись 3`, or `Неизвестная опись` for a missing number. Used both as a
/// heading and as a page name.
pub fn inventory_page_name(number: Option<&str>) -> String {
    match number {
        Some(n) if !n.is_empty() => format!("Опись {n}"),
        _ => "Неизвестная опись".to_string(),
    }
}

pub fn fund_page_name(number: Option<&str>) -> String {
    match number {
        Some(n) if !n.is_empty() => format!("Фонд {n}"),
        _ => "Неизвестный фонд".to_string(),
    }
}

pub fn item_page_name(number: Option<&str>) -> &str {
    match number {
        Some(n) if !n.is_empty() => n,
        _ => "Неизвестно",
    }
}

/// Fund page. Loads inventories that are still on disk when rendering inline.
pub fn render_fund(
    archive: Option<&str>,
    fund: &mut Fund,
    separate: bool,
    heading_level: usize,
) -> Result<String, StoreError> {
    let h = heading(heading_level);
    let page = template(
        "Фонд",
        &[
            ("archive", text(archive)),
            ("fund", number_str(fund.number.as_deref())),
            ("fund_annotation", text(fund.annotation.as_deref())),
        ],
    );

    let Fund {
        number: fund_number,
        annotation,
        inventories,
    } = fund;
    let fund_ctx = FundContext {
        archive,
        number: fund_number.as_deref(),
        annotation: annotation.as_deref(),
    };

    let mut entries = Vec::with_capacity(inventories.len());
    if separate {
        for key in number::sorted(inventories.keys()) {
            entries.push(template(
                "СсылкаНаОпись",
                &[
                    ("archive", text(archive)),
                    ("fund", number_str(fund_ctx.number)),
                    ("inventory", number_str(key.as_deref())),
                ],
            ));
        }
        return Ok(format!(
            "{page}\n\n{h} Описи {h}\n\n{}\n",
            entries.join("\n")
        ));
    }

    for (key, link) in sorted_links_mut(inventories) {
        let inventory = link.resolve()?;
        let ctx = fund_ctx.inventory(inventory);
        entries.push(format!(
            "{h} {} {h}\n\n{}",
            inventory_page_name(key.as_deref()),
            render_inventory(&ctx, inventory, separate, heading_level + 1)
        ));
    }
    Ok(format!("{page}\n\n{}\n", entries.join("\n")))
}

/// Archive page. Loads funds that are still on disk when rendering inline.
pub fn render_archive(
    archive: &mut Archive,
    separate: bool,
    heading_level: usize,
) -> Result<String, StoreError> {
    let h = heading(heading_level);
    let child_level = heading_level + 1;
    let Archive { title, funds } = archive;
    let title = title.as_deref();

    let mut entries = Vec::with_capacity(funds.len());
    for (key, link) in sorted_links_mut(funds) {
        if separate {
            entries.push(template(
                "СсылкаНаФонд",
                &[("archive", text(title)), ("fund", number_str(key.as_deref()))],
            ));
        } else {
            let ch = heading(child_level);
            let fund = render_fund(title, link.resolve()?, separate, child_level + 1)?;
            entries.push(format!("{ch} {} {ch}\n\n{fund}", fund_page_name(key.as_deref())));
        }
    }

    let page = template("Архив", &[("archive", text(title))]);
    Ok(format!(
        "{page}\n\n{h} Фонды {h}\n\n{}\n",
        entries.join("\n")
    ))
}

/// Bullet list of every archive with a known title.
pub fn render_archive_list(list: &ArchiveList, heading_level: usize) -> String {
    let h = heading(heading_level);
    let entries: Vec<String> = list
        .titles()
        .into_iter()
        .flatten()
        .map(|title| format!("* [[{title}]]"))
        .collect();
    format!("{h} Архивы {h}\n\n{}\n", entries.join("\n"))
}

/// Archive title as used in page names.
pub fn archive_page_name(title: Option<&str>) -> &str {
    match title {
        Some(t) if !t.is_empty() => t,
        _ => "Неизвестный архив",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    fn sample() -> ArchiveList {
        let mut a = record(Some("Архив X"), Some("1"), Some("2"), Some("4"));
        a.fund_annotation = Some("Fund one".into());
        a.inventory_annotation = Some("Метрики".into());
        a.item.item_annotation = Some("Книга".into());
        a.item.start_year = Some(1880);
        a.item.end_year = Some(1890);
        a.item.url = Some("http://u/4".into());
        let b = record(Some("Архив X"), Some("1"), Some("2"), Some("3"));
        ArchiveList::from_records([a, b]).unwrap()
    }

    #[test]
    fn item_page_repeats_parent_annotations() {
        let list = sample();
        let fund = find_fund(&list, Some("Архив X"), Some("1"));
        let inventory = find_inventory(&list, Some("Архив X"), Some("1"), Some("2"));
        let item = &inventory.items[&Some("4".to_string())];
        let ctx = FundContext::new(Some("Архив X"), fund).inventory(inventory);

        assert_eq!(
            render_item(&ctx, item),
            "{{ЕдиницаХранения|archive=Архив X|fund=1|inventory=2|item=4\
             |fund_annotation=Fund one|inventory_annotation=Метрики|item_annotation=Книга\
             |start_year=1880|end_year=1890|url=http://u/4}}\n\n"
        );
    }

    #[test]
    fn inventory_page_separate_lists_item_links_in_order() {
        let list = sample();
        let fund = find_fund(&list, Some("Архив X"), Some("1"));
        let inventory = find_inventory(&list, Some("Архив X"), Some("1"), Some("2"));
        let ctx = FundContext::new(Some("Архив X"), fund).inventory(inventory);

        assert_eq!(
            render_inventory(&ctx, inventory, true, 2),
            "{{Опись|archive=Архив X|fund=1|inventory=2|fund_annotation=Fund one\
             |inventory_annotation=Метрики}}\n\n\
             == Единицы хранения ==\n\n\
             {{СсылкаНаЕдиницуХранения|archive=Архив X|fund=1|inventory=2|item=3}}\n\n\
             {{СсылкаНаЕдиницуХранения|archive=Архив X|fund=1|inventory=2|item=4}}\n"
        );
    }

    #[test]
    fn inventory_page_inline_nests_items() {
        let list = sample();
        let fund = find_fund(&list, Some("Архив X"), Some("1"));
        let inventory = find_inventory(&list, Some("Архив X"), Some("1"), Some("2"));
        let ctx = FundContext::new(Some("Архив X"), fund).inventory(inventory);

        let page = render_inventory(&ctx, inventory, false, 2);
        let third = page.find("=== Единица хранения 3 ===").unwrap();
        let fourth = page.find("=== Единица хранения 4 ===").unwrap();
        assert!(third < fourth);
        assert!(page.contains("{{ЕдиницаХранения|archive=Архив X|fund=1|inventory=2|item=3|"));
    }

    #[test]
    fn fund_page_separate() {
        let mut list = sample();
        let archive = list.archive(Some("Архив X")).unwrap();
        let fund = archive.funds.get_mut(&Some("1".to_string())).unwrap().resolve().unwrap();

        assert_eq!(
            render_fund(Some("Архив X"), fund, true, 2).unwrap(),
            "{{Фонд|archive=Архив X|fund=1|fund_annotation=Fund one}}\n\n\
             == Описи ==\n\n\
             {{СсылкаНаОпись|archive=Архив X|fund=1|inventory=2}}\n"
        );
    }

    #[test]
    fn fund_page_inline_has_inventory_headings() {
        let mut list = ArchiveList::from_records([
            record(Some("A"), Some("1"), None, Some("1")),
            record(Some("A"), Some("1"), Some("10"), Some("1")),
            record(Some("A"), Some("1"), Some("9"), Some("1")),
        ])
        .unwrap();
        let archive = list.archive(Some("A")).unwrap();
        let fund = archive.funds.get_mut(&Some("1".to_string())).unwrap().resolve().unwrap();

        let page = render_fund(Some("A"), fund, false, 2).unwrap();
        assert!(page.starts_with("{{Фонд|archive=A|fund=1|fund_annotation=}}\n\n== "));
        assert!(!page.contains("Описи"));
        let unknown = page.find("== Неизвестная опись ==").unwrap();
        let nine = page.find("== Опись 9 ==").unwrap();
        let ten = page.find("== Опись 10 ==").unwrap();
        assert!(unknown < nine && nine < ten);
        assert!(page.contains("=== Единицы хранения ==="));
        assert!(page.contains("==== Единица хранения 1 ===="));
    }

    #[test]
    fn archive_page_separate() {
        let mut list = ArchiveList::from_records([
            record(Some("A"), Some("2"), None, None),
            record(Some("A"), None, None, None),
            record(Some("A"), Some("10"), None, None),
        ])
        .unwrap();
        let archive = list.archive(Some("A")).unwrap();

        assert_eq!(
            render_archive(archive, true, 2).unwrap(),
            "{{Архив|archive=A}}\n\n== Фонды ==\n\n\
             {{СсылкаНаФонд|archive=A|fund=}}\n\
             {{СсылкаНаФонд|archive=A|fund=2}}\n\
             {{СсылкаНаФонд|archive=A|fund=10}}\n"
        );
    }

    #[test]
    fn archive_page_inline_goes_all_the_way_down() {
        let mut list = sample();
        let archive = list.archive(Some("Архив X")).unwrap();
        let page = render_archive(archive, false, 2).unwrap();

        assert!(page.contains("=== Фонд 1 ===\n\n{{Фонд|archive=Архив X|fund=1|"));
        assert!(page.contains("==== Опись 2 ===="));
        assert!(page.contains("===== Единицы хранения ====="));
        let third = page.find("item=3|").unwrap();
        let fourth = page.find("item=4|").unwrap();
        assert!(third < fourth);
    }

    #[test]
    fn archive_list_skips_null_title() {
        let list = ArchiveList::from_records([
            record(Some("Б"), None, None, None),
            record(None, None, None, None),
            record(Some("А"), None, None, None),
        ])
        .unwrap();
        assert_eq!(
            render_archive_list(&list, 2),
            "== Архивы ==\n\n* [[А]]\n* [[Б]]\n"
        );
    }

    #[test]
    fn page_names_fall_back_for_missing_identifiers() {
        assert_eq!(archive_page_name(None), "Неизвестный архив");
        assert_eq!(archive_page_name(Some("A")), "A");
        assert_eq!(fund_page_name(None), "Неизвестный фонд");
        assert_eq!(fund_page_name(Some("12а")), "Фонд 12а");
        assert_eq!(inventory_page_name(None), "Неизвестная опись");
        assert_eq!(inventory_page_name(Some("1")), "Опись 1");
        assert_eq!(item_page_name(None), "Неизвестно");
        assert_eq!(item_page_name(Some("45")), "45");
    }
}
