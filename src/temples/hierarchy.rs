//! Region hierarchy of temples and the wiki pages generated from it.
//!
//! Each temple carries two region paths, one for the present-day division
//! and one for the pre-1917 division. A [`HierarchyIndex`] is a tree of those
//! path segments with temples attached at the leaves:
//!
//! ```text
//! Храмы                     Храмы/
//! ├── Москва                ├── Москва            (index page)
//! │   ├── [temple 1]        │   ├── Храм 1 (1)    (temple page)
//! │   └── Тверской район    │   └── Москва/Тверской район
//! └── Тверская область      └── Тверская область
//! ```
//!
//! Pages come out in pre-order: a node's index page, then its temple pages,
//! then its children. Temple pages are named by the temple alone, so the same
//! temple reached twice produces a name collision, which [`checked_pages`]
//! turns into an error.

use super::card::Temple;
use super::TempleError;
use crate::render;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Longest page name the wiki accepts, in bytes.
pub const PAGE_NAME_MAX_BYTES: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub name: String,
    pub text: String,
}

#[derive(Debug)]
pub struct HierarchyIndex<'t> {
    pub is_old: bool,
    pub name: String,
    pub strip_in_brackets: bool,
    temples: Vec<&'t Temple>,
    temple_names: HashSet<String>,
    children: Vec<HierarchyIndex<'t>>,
    child_positions: HashMap<String, usize>,
}

/// `"Москва (город)"` → `"Москва"`.
fn strip_brackets(segment: &str) -> &str {
    segment
        .find(" (")
        .map_or(segment, |end| &segment[..end])
        .trim()
}

impl<'t> HierarchyIndex<'t> {
    pub fn new(is_old: bool, name: impl Into<String>, strip_in_brackets: bool) -> Self {
        Self {
            is_old,
            name: name.into(),
            strip_in_brackets,
            temples: Vec::new(),
            temple_names: HashSet::new(),
            children: Vec::new(),
            child_positions: HashMap::new(),
        }
    }

    fn child_mut(&mut self, name: String) -> &mut HierarchyIndex<'t> {
        let position = match self.child_positions.get(&name) {
            Some(&i) => i,
            None => {
                let child = HierarchyIndex::new(self.is_old, name.clone(), self.strip_in_brackets);
                self.children.push(child);
                self.child_positions.insert(name, self.children.len() - 1);
                self.children.len() - 1
            }
        };
        &mut self.children[position]
    }

    /// File `temple` under its region path for this index's era. Temples
    /// without a path are skipped. Returns whether the temple was added.
    pub fn add_temple(&mut self, temple: &'t Temple) -> bool {
        let Some(path) = temple.hierarchy(self.is_old) else {
            return false;
        };
        let strip = self.strip_in_brackets;
        let mut node = self;
        for segment in path {
            let key = if strip {
                strip_brackets(segment).to_string()
            } else {
                segment.clone()
            };
            node = node.child_mut(key);
        }
        node.insert_temple(temple)
    }

    fn insert_temple(&mut self, temple: &'t Temple) -> bool {
        if !self.temple_names.insert(temple.display_name().to_string()) {
            debug!(
                index = %self.name,
                temple = %temple.display_name(),
                id = temple.temple_id,
                "dropping temple with duplicate name"
            );
            return false;
        }
        self.temples.push(temple);
        true
    }

    /// `{{Иерархия|...}}` followed by region and temple link lists.
    pub fn page_text(&self, temple_prefix: &str) -> String {
        let old = if self.is_old { "1" } else { "0" };
        let mut text = render::template("Иерархия", &[("old", old), ("name", self.name.as_str())]);
        text.push('\n');

        if !self.children.is_empty() {
            let links: Vec<String> = self
                .children
                .iter()
                .map(|child| format!("* [[/{0}|{0}]]", child.name))
                .collect();
            text.push_str("\n== Регионы ==\n\n");
            text.push_str(&links.join("\n"));
            text.push('\n');
        }

        if !self.temples.is_empty() {
            let links: Vec<String> = self
                .temples
                .iter()
                .map(|temple| {
                    format!(
                        "* [[{}|{}]]",
                        temple.page_name(temple_prefix),
                        temple.display_name()
                    )
                })
                .collect();
            text.push_str("\n== Храмы ==\n\n");
            text.push_str(&links.join("\n"));
            text.push('\n');
        }
        text
    }

    /// Every page under this index, lazily, in pre-order. Index pages are
    /// named `<prefix><path>`; temple pages only when `with_temples`.
    pub fn pages<'a>(
        &'a self,
        prefix: &str,
        temple_prefix: &'a str,
        with_temples: bool,
    ) -> Pages<'a, 't> {
        Pages {
            stack: vec![Frame::Index {
                index: self,
                prefix: prefix.to_string(),
            }],
            temple_prefix,
            with_temples,
        }
    }
}

enum Frame<'a, 't> {
    Index {
        index: &'a HierarchyIndex<'t>,
        prefix: String,
    },
    Temple(&'t Temple),
}

/// Pre-order page walk over a [`HierarchyIndex`].
pub struct Pages<'a, 't> {
    stack: Vec<Frame<'a, 't>>,
    temple_prefix: &'a str,
    with_temples: bool,
}

impl Iterator for Pages<'_, '_> {
    type Item = Page;

    fn next(&mut self) -> Option<Page> {
        match self.stack.pop()? {
            Frame::Index { index, prefix } => {
                let name = format!("{prefix}{}", index.name);
                let child_prefix = format!("{name}/");
                // Pushed in reverse so they pop in order: temples, then children.
                for child in index.children.iter().rev() {
                    self.stack.push(Frame::Index {
                        index: child,
                        prefix: child_prefix.clone(),
                    });
                }
                if self.with_temples {
                    self.stack
                        .extend(index.temples.iter().rev().map(|&t| Frame::Temple(t)));
                }
                Some(Page {
                    text: index.page_text(self.temple_prefix),
                    name,
                })
            }
            Frame::Temple(temple) => Some(Page {
                name: temple.page_name(self.temple_prefix),
                text: temple.page_text(),
            }),
        }
    }
}

/// Pass pages through, failing on the second occurrence of a name or on a
/// name longer than [`PAGE_NAME_MAX_BYTES`].
pub fn checked_pages<I>(pages: I) -> CheckedPages<I::IntoIter>
where
    I: IntoIterator<Item = Page>,
{
    CheckedPages {
        pages: pages.into_iter(),
        seen: HashSet::new(),
    }
}

pub struct CheckedPages<I> {
    pages: I,
    seen: HashSet<String>,
}

impl<I: Iterator<Item = Page>> Iterator for CheckedPages<I> {
    type Item = Result<Page, TempleError>;

    fn next(&mut self) -> Option<Self::Item> {
        let page = self.pages.next()?;
        if !self.seen.insert(page.name.clone()) {
            return Some(Err(TempleError::DuplicatePageName(page.name)));
        }
        if page.name.len() > PAGE_NAME_MAX_BYTES {
            return Some(Err(TempleError::PageNameTooLong(page.name)));
        }
        Some(Ok(page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temples::card::{CardFields, CardValue, HIERARCHY_MODERN, HIERARCHY_OLD};

    impl<'t> HierarchyIndex<'t> {
        fn temples(&self) -> &[&'t Temple] {
            &self.temples
        }

        fn children(&self) -> &[HierarchyIndex<'t>] {
            &self.children
        }

        fn child(&self, name: &str) -> Option<&HierarchyIndex<'t>> {
            self.child_positions.get(name).map(|&i| &self.children[i])
        }
    }

    fn temple(id: i64, name: &str, modern: &[&str], old: Option<&[&str]>) -> Temple {
        let mut card_fields = CardFields::default();
        let path = |segments: &[&str]| {
            CardValue::List(segments.iter().map(|s| s.to_string()).collect())
        };
        card_fields.set(HIERARCHY_MODERN, path(modern));
        if let Some(old) = old {
            card_fields.set(HIERARCHY_OLD, path(old));
        }
        Temple {
            temple_id: id,
            name: name.to_string(),
            town: "Город".into(),
            construction_date: "1800".into(),
            url: None,
            card: None,
            card_unparsed_field_names: None,
            card_fields,
        }
    }

    fn names(pages: impl Iterator<Item = Page>) -> Vec<String> {
        pages.map(|p| p.name).collect()
    }

    // =========================================================================
    // Building
    // =========================================================================

    #[test]
    fn bracket_suffixes_are_stripped() {
        assert_eq!(strip_brackets("Москва (город)"), "Москва");
        assert_eq!(strip_brackets(" Тверь "), "Тверь");
        assert_eq!(strip_brackets("Без скобок(x)"), "Без скобок(x)");
    }

    #[test]
    fn temples_land_at_the_end_of_their_path() {
        let a = temple(1, "Церковь А", &["Россия", "Москва (город)"], None);
        let b = temple(2, "Церковь Б", &["Россия", "Москва"], None);
        let c = temple(3, "Церковь В", &["Россия"], None);

        let mut index = HierarchyIndex::new(false, "Храмы", true);
        for t in [&a, &b, &c] {
            assert!(index.add_temple(t));
        }

        let russia = index.child("Россия").unwrap();
        assert_eq!(russia.temples().len(), 1);
        let moscow = russia.child("Москва").unwrap();
        assert_eq!(moscow.temples().len(), 2);
        assert_eq!(russia.children().len(), 1);
    }

    #[test]
    fn without_stripping_bracketed_segments_are_distinct() {
        let a = temple(1, "А", &["Москва (город)"], None);
        let b = temple(2, "Б", &["Москва"], None);
        let mut index = HierarchyIndex::new(false, "Храмы", false);
        index.add_temple(&a);
        index.add_temple(&b);
        assert_eq!(index.children().len(), 2);
    }

    #[test]
    fn temples_without_path_are_skipped() {
        let a = temple(1, "А", &["Москва"], None);
        let mut old = HierarchyIndex::new(true, "Храмы (до 1917)", true);
        assert!(!old.add_temple(&a));
        assert!(old.children().is_empty());
    }

    #[test]
    fn first_temple_with_a_name_wins() {
        let a = temple(1, "Церковь", &["Москва"], None);
        let b = temple(2, "Церковь", &["Москва"], None);
        let mut index = HierarchyIndex::new(false, "Храмы", true);
        assert!(index.add_temple(&a));
        assert!(!index.add_temple(&b));
        let moscow = index.child("Москва").unwrap();
        assert_eq!(moscow.temples()[0].temple_id, 1);
    }

    // =========================================================================
    // Pages
    // =========================================================================

    #[test]
    fn index_page_text() {
        let a = temple(7, "Церковь", &["Москва"], None);
        let mut index = HierarchyIndex::new(false, "Храмы", true);
        index.add_temple(&a);

        assert_eq!(
            index.page_text("T:"),
            "{{Иерархия|old=0|name=Храмы}}\n\n== Регионы ==\n\n* [[/Москва|Москва]]\n"
        );
        assert_eq!(
            index.child("Москва").unwrap().page_text("T:"),
            "{{Иерархия|old=0|name=Москва}}\n\n== Храмы ==\n\n* [[T:Церковь (7)|Церковь]]\n"
        );
        assert_eq!(
            HierarchyIndex::new(true, "Пусто", true).page_text(""),
            "{{Иерархия|old=1|name=Пусто}}\n"
        );
    }

    #[test]
    fn pages_are_pre_order() {
        let a = temple(1, "А", &["Москва"], None);
        let b = temple(2, "Б", &["Москва", "Район"], None);
        let c = temple(3, "В", &["Тверь"], None);
        let mut index = HierarchyIndex::new(false, "Храмы", true);
        for t in [&a, &b, &c] {
            index.add_temple(t);
        }

        assert_eq!(
            names(index.pages("P:", "", true)),
            vec![
                "P:Храмы",
                "P:Храмы/Москва",
                "А (1)",
                "P:Храмы/Москва/Район",
                "Б (2)",
                "P:Храмы/Тверь",
                "В (3)",
            ]
        );
        assert_eq!(
            names(index.pages("", "", false)),
            vec!["Храмы", "Храмы/Москва", "Храмы/Москва/Район", "Храмы/Тверь"]
        );
    }

    #[test]
    fn temple_page_names_collide_across_regions() {
        let a = temple(1, "Церковь", &["Москва"], None);
        let mut index = HierarchyIndex::new(false, "Храмы", true);
        index.add_temple(&a);
        let mut other = HierarchyIndex::new(false, "Другие", true);
        other.add_temple(&a);

        let results: Vec<_> =
            checked_pages(index.pages("", "", true).chain(other.pages("", "", true))).collect();
        assert_eq!(results.len(), 6);
        assert!(results[..5].iter().all(Result::is_ok));
        assert!(matches!(
            &results[5],
            Err(TempleError::DuplicatePageName(name)) if name == "Церковь (1)"
        ));
    }

    #[test]
    fn overlong_index_names_are_rejected() {
        let long = "Р".repeat(130);
        let a = temple(1, "А", &[long.as_str()], None);
        let mut index = HierarchyIndex::new(false, "Храмы", true);
        index.add_temple(&a);

        let err = checked_pages(index.pages("", "", false))
            .collect::<Result<Vec<_>, _>>()
            .unwrap_err();
        assert!(matches!(err, TempleError::PageNameTooLong(name) if name.starts_with("Храмы/Р")));
    }
}
