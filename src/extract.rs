//! Turning one saved search-result detail into a flat record.
//!
//! The details modal of the CFC catalog lists its data as titled sections.
//! Four of them matter:
//!
//! | Section title              | Yields                                  |
//! |----------------------------|-----------------------------------------|
//! | `Фонд № <n>`               | fund number + fund annotation           |
//! | `Опись № <n>`              | inventory number + inventory annotation |
//! | `Единица № <n>`            | item number + item annotation           |
//! | `Полное название архива`   | archive title (normalized)              |
//!
//! Everything else, including the `{"error": ...}` placeholder saved for pages
//! that answered with HTTP 500, is ignored. A record with nothing recognized
//! still aggregates fine: it lands under the null archive/fund/inventory keys.
//!
//! Numbers are kept as the raw non-whitespace run following `№`, never parsed
//! into integers; ordering is the job of [`crate::number`].

use crate::model::Item;
use crate::types::{Section, SectionTitle};
use regex::Regex;
use std::sync::LazyLock;

const ARCHIVE_TITLE_SECTION: &str = "Полное название архива";

static FUND_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Фонд № ?(\S+)").expect("valid fund title regex"));
static INVENTORY_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Опись № ?(\S+)").expect("valid inventory title regex"));
static ITEM_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Единица № ?(\S+)").expect("valid item title regex"));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("valid whitespace regex"));
static GUILLEMETS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"«|»").expect("valid guillemet regex"));
static KAZENNOE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(К|к)азен?ное").expect("valid typo regex"));
static OBLAST_TAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"област("?)$"#).expect("valid oblast regex"));

/// Legal-entity boilerplate in front of the archive's own name.
static ENTITY_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^((|государственное |государственное областное ",
        r"|государственное краевое |краевое государственное ",
        r"|муниципальное |областное |областное государственное ",
        r"|республиканское |республиканское государственное |федеральное )",
        r"(|бюджетное |каз(е|ё)нное |каз(е|ё)нное архивное )учреждение",
        r"(( [а-я]+ области| [а-я -]+ автономного округа – Югры| ",
        r"республик (Карелия|Саха \(Якутия\)|Хакасия))?|)|(ГУ|ГКУ|МКУ)\b)",
    ))
    .expect("valid entity prefix regex")
});

/// Flat record produced from one detail payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedRecord {
    pub archive_title: Option<String>,
    pub fund_number: Option<String>,
    pub fund_annotation: Option<String>,
    pub inventory_number: Option<String>,
    pub inventory_annotation: Option<String>,
    pub item: Item,
}

/// Collapse newlines and whitespace runs into single spaces.
pub fn strip_advanced(s: &str) -> String {
    WHITESPACE_RUN
        .replace_all(&s.replace('\n', " "), " ")
        .into_owned()
}

/// Trim an annotation and capitalize its first character.
///
/// Only the first character changes; the rest is kept as scraped.
pub fn process_annotation(annotation: Option<&str>) -> Option<String> {
    let trimmed = annotation?.trim();
    let mut chars = trimmed.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars).collect())
}

/// Reduce a full archive institution name to the archive's own short name.
///
/// `Государственное казенное учреждение Архангельской области «Государственный
/// архив Архангельской област»` becomes `Государственный архив Архангельской
/// области`.
pub fn process_archive_title(title: &str) -> String {
    let title = strip_advanced(title);
    let title = GUILLEMETS.replace_all(title.trim(), "\"");
    let title = title
        .replace("администраци", "Администраци")
        .replace("учереждение", "учреждение");
    let title = KAZENNOE.replace_all(&title, "${1}азённое");
    let title = OBLAST_TAIL.replace(&title, "области${1}");
    let title = ENTITY_PREFIX.replace(&title, "");
    title.replace('"', "").trim().to_string()
}

fn section_text(section: &Section) -> Option<String> {
    section.content.as_ref().map(|blocks| {
        blocks
            .iter()
            .map(|block| strip_advanced(block).trim().to_string())
            .collect::<Vec<_>>()
            .join(" ")
    })
}

fn capture_number(regex: &Regex, title: &str) -> Option<String> {
    regex
        .captures(title)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extract archive coordinates and annotations from a detail payload.
///
/// `url` points back at the details page when the caller wants it recorded.
/// The raw sections are kept on the item for traceability.
pub fn extract(sections: &[Section], url: Option<String>) -> ExtractedRecord {
    let mut record = ExtractedRecord {
        archive_title: None,
        fund_number: None,
        fund_annotation: None,
        inventory_number: None,
        inventory_annotation: None,
        item: Item {
            item_number: None,
            item_annotation: None,
            data: sections.to_vec(),
            start_year: None,
            end_year: None,
            url,
        },
    };

    for section in sections {
        let Some(title) = section.title.as_ref().map(SectionTitle::text) else {
            continue;
        };
        let content = section_text(section);

        if let Some(number) = capture_number(&FUND_TITLE, &title) {
            record.fund_number = Some(number);
            record.fund_annotation = process_annotation(content.as_deref());
        } else if let Some(number) = capture_number(&INVENTORY_TITLE, &title) {
            record.inventory_number = Some(number);
            record.inventory_annotation = process_annotation(content.as_deref());
        } else if let Some(number) = capture_number(&ITEM_TITLE, &title) {
            record.item.item_number = Some(number);
            record.item.item_annotation = process_annotation(content.as_deref());
        } else if title == ARCHIVE_TITLE_SECTION
            && let Some(content) = content
        {
            let archive_title = process_archive_title(&content);
            record.archive_title = (!archive_title.is_empty()).then_some(archive_title);
        }
    }

    record
}
