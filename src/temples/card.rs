//! Temple registry records and their card fields.
//!
//! A temple card on the registry site is a two-column table of label → text
//! nodes. The raw table is kept as `card`; the recognized rows are lifted into
//! typed [`CardFields`] through [`CARD_FIELDS`], which is also the order of
//! template parameters on the temple page and the set of keys accepted under
//! `card_fields` in JSON.

use crate::render;
use regex::Regex;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

/// Longest temple page name before the ` (<id>)` suffix, in bytes.
pub const TEMPLE_NAME_MAX_BYTES: usize = 200;
const TRUNCATION_MARKER: &str = "...";

pub const HIERARCHY_MODERN: &str = "card_hierarchy_modern";
pub const HIERARCHY_OLD: &str = "card_hierarchy_old";

static LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]+\.[0-9]+)°N\s+([0-9]+\.[0-9]+)°E").expect("valid location regex")
});

/// How a card row is turned into a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Text nodes joined with a space.
    Text,
    /// Text nodes joined, then split on `"; "`.
    SplitList,
    /// Text nodes kept as separate entries.
    List,
    /// `55.75°N 37.61°E` style coordinates.
    Location,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Key under `card_fields` and template parameter name.
    pub key: &'static str,
    /// Row label on the card; `None` for fields filled from elsewhere on the page.
    pub label: Option<&'static str>,
    pub kind: FieldKind,
}

const fn field(key: &'static str, label: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        key,
        label: Some(label),
        kind,
    }
}

pub const CARD_FIELDS: &[FieldSpec] = &[
    field("card_name", "Название", FieldKind::Text),
    field("card_type", "Тип постройки", FieldKind::Text),
    field("card_construction_date", "Дата основания", FieldKind::Text),
    field(
        "card_last_building_construction_date",
        "Дата постройки последнего здания",
        FieldKind::Text,
    ),
    field("card_architect", "Архитектор", FieldKind::Text),
    field("card_main_publication", "Основная публикация", FieldKind::Text),
    field("card_historical_religion", "Историческое исповедание", FieldKind::Text),
    field("card_current_religion", "Современная принадлежность", FieldKind::Text),
    field("card_status", "Статус", FieldKind::Text),
    field("card_address", "Современный адрес", FieldKind::Text),
    field("card_address_1917", "Адрес на 1917 г.", FieldKind::Text),
    field("card_description", "Краткое описание", FieldKind::Text),
    field("card_notes", "Примечания", FieldKind::Text),
    field("card_altar", "Престол", FieldKind::Text),
    field("card_web_url", "Web", FieldKind::Text),
    field("card_email", "E-mail", FieldKind::Text),
    field("card_phone", "Телефон", FieldKind::Text),
    field("card_dedication", "Посвящение", FieldKind::Text),
    field("card_meta_date", "Дата создания карточки", FieldKind::Text),
    field("card_meta_update_date", "Дата обновления карточки", FieldKind::Text),
    field("card_meta_author", "Составитель", FieldKind::Text),
    field("card_name_synonyms", "Синонимы названия", FieldKind::SplitList),
    field("card_slang_names", "Обиходные названия", FieldKind::SplitList),
    field("card_architects", "Архитекторы", FieldKind::List),
    field("card_altars", "Престолы", FieldKind::List),
    FieldSpec {
        key: HIERARCHY_OLD,
        label: None,
        kind: FieldKind::List,
    },
    FieldSpec {
        key: HIERARCHY_MODERN,
        label: None,
        kind: FieldKind::List,
    },
    field("card_location", "Местоположение", FieldKind::Location),
];

fn spec_for_key(key: &str) -> Option<&'static FieldSpec> {
    CARD_FIELDS.iter().find(|spec| spec.key == key)
}

fn spec_for_label(label: &str) -> Option<&'static FieldSpec> {
    CARD_FIELDS.iter().find(|spec| spec.label == Some(label))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub longitude: f64,
    pub latitude: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CardValue {
    Text(String),
    List(Vec<String>),
    Location(Location),
}

/// Recognized card fields, keyed by [`FieldSpec::key`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardFields {
    values: BTreeMap<&'static str, CardValue>,
}

impl CardFields {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&CardValue> {
        self.values.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(CardValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn list(&self, key: &str) -> Option<&[String]> {
        match self.values.get(key) {
            Some(CardValue::List(items)) => Some(items),
            _ => None,
        }
    }

    pub fn location(&self) -> Option<Location> {
        match self.values.get("card_location") {
            Some(CardValue::Location(location)) => Some(*location),
            _ => None,
        }
    }

    /// Set a field. Unknown keys are ignored; the value must match the
    /// field's kind.
    pub fn set(&mut self, key: &str, value: CardValue) -> bool {
        let Some(spec) = spec_for_key(key) else {
            return false;
        };
        let fits = matches!(
            (spec.kind, &value),
            (FieldKind::Text, CardValue::Text(_))
                | (FieldKind::SplitList | FieldKind::List, CardValue::List(_))
                | (FieldKind::Location, CardValue::Location(_))
        );
        if fits {
            self.values.insert(spec.key, value);
        }
        fits
    }

    /// Lift recognized rows of a raw card. Returns the fields and the labels
    /// that matched no field.
    pub fn from_card(card: &BTreeMap<String, Vec<String>>) -> (Self, BTreeSet<String>) {
        let mut fields = Self::default();
        let mut unparsed = BTreeSet::new();
        for (label, texts) in card {
            let Some(spec) = spec_for_label(label) else {
                unparsed.insert(label.clone());
                continue;
            };
            let joined = texts.join(" ");
            let value = match spec.kind {
                FieldKind::Text => Some(CardValue::Text(joined)),
                FieldKind::SplitList => Some(CardValue::List(
                    joined.split("; ").map(str::to_string).collect(),
                )),
                FieldKind::List => Some(CardValue::List(texts.clone())),
                FieldKind::Location => parse_location(&joined).map(CardValue::Location),
            };
            if let Some(value) = value {
                fields.values.insert(spec.key, value);
            }
        }
        (fields, unparsed)
    }

    /// Template parameters in table order. Lists expand to `key0`, `key1`, …
    pub fn template_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        for spec in CARD_FIELDS {
            match self.values.get(spec.key) {
                Some(CardValue::Text(s)) => params.push((spec.key.to_string(), s.clone())),
                Some(CardValue::List(items)) => {
                    for (i, item) in items.iter().enumerate() {
                        params.push((format!("{}{i}", spec.key), item.clone()));
                    }
                }
                Some(CardValue::Location(location)) => {
                    params.push(("longitude".to_string(), format_coordinate(location.longitude)));
                    params.push(("latitude".to_string(), format_coordinate(location.latitude)));
                }
                None => {}
            }
        }
        params
    }
}

/// Whole-degree coordinates keep one decimal place (`55.0`).
fn format_coordinate(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Parse `55.75°N 37.61°E`.
pub fn parse_location(text: &str) -> Option<Location> {
    let caps = LOCATION.captures(text.trim())?;
    Some(Location {
        latitude: caps[1].parse().ok()?,
        longitude: caps[2].parse().ok()?,
    })
}

fn coordinate<E: de::Error>(location: &serde_json::Map<String, Value>, key: &str) -> Result<f64, E> {
    match location.get(key) {
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| E::custom(format!("card_location.{key} out of range"))),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| E::custom(format!("card_location.{key} is not a number: {s:?}"))),
        Some(_) => Err(E::custom(format!("card_location.{key} must be a number"))),
        None => Err(E::missing_field("longitude/latitude")),
    }
}

fn value_from_json<E: de::Error>(spec: &FieldSpec, value: Value) -> Result<CardValue, E> {
    let wrong_type = || E::custom(format!("card_fields.{} has the wrong type", spec.key));
    match spec.kind {
        FieldKind::Text => match value {
            Value::String(s) => Ok(CardValue::Text(s)),
            _ => Err(wrong_type()),
        },
        FieldKind::SplitList | FieldKind::List => match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    _ => Err(wrong_type()),
                })
                .collect::<Result<_, _>>()
                .map(CardValue::List),
            _ => Err(wrong_type()),
        },
        FieldKind::Location => match value {
            Value::Object(location) => Ok(CardValue::Location(Location {
                longitude: coordinate(&location, "longitude")?,
                latitude: coordinate(&location, "latitude")?,
            })),
            _ => Err(wrong_type()),
        },
    }
}

impl<'de> Deserialize<'de> for CardFields {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        let mut fields = CardFields::default();
        for (key, value) in raw {
            // Keys this version does not know are dropped.
            if let Some(spec) = spec_for_key(&key) {
                fields.values.insert(spec.key, value_from_json(spec, value)?);
            }
        }
        Ok(fields)
    }
}

/// One registry entry as saved by the temple fetcher.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Temple {
    pub temple_id: i64,
    pub name: String,
    pub town: String,
    pub construction_date: String,
    #[serde(default)]
    pub url: Option<String>,
    /// Raw card rows: label → text nodes.
    #[serde(default)]
    pub card: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default)]
    pub card_unparsed_field_names: Option<BTreeSet<String>>,
    #[serde(default)]
    pub card_fields: CardFields,
}

impl Temple {
    /// Lift raw card rows into `card_fields`. Fields already present are
    /// kept as saved.
    pub fn parse_card(&mut self) {
        let Some(card) = &self.card else {
            return;
        };
        let (fields, unparsed) = CardFields::from_card(card);
        for (key, value) in fields.values {
            self.card_fields.values.entry(key).or_insert(value);
        }
        if self.card_unparsed_field_names.is_none() && !unparsed.is_empty() {
            self.card_unparsed_field_names = Some(unparsed);
        }
    }

    /// Card name when present, listing name otherwise.
    pub fn display_name(&self) -> &str {
        match self.card_fields.text("card_name") {
            Some(name) if !name.is_empty() => name,
            _ => &self.name,
        }
    }

    /// `<prefix><name>` cut to [`TEMPLE_NAME_MAX_BYTES`], then ` (<id>)`.
    pub fn page_name(&self, temple_prefix: &str) -> String {
        let full = format!("{temple_prefix}{}", self.display_name());
        format!(
            "{} ({})",
            truncate_bytes(&full, TEMPLE_NAME_MAX_BYTES, TRUNCATION_MARKER),
            self.temple_id
        )
    }

    pub fn hierarchy(&self, old: bool) -> Option<&[String]> {
        self.card_fields
            .list(if old { HIERARCHY_OLD } else { HIERARCHY_MODERN })
    }

    /// `{{Храм|...}}` with the listing fields followed by the card fields.
    pub fn page_text(&self) -> String {
        let mut params: Vec<(String, String)> = vec![
            ("name".to_string(), self.name.clone()),
            ("town".to_string(), self.town.clone()),
        ];
        if let Some(url) = &self.url {
            params.push(("url".to_string(), url.clone()));
        }
        params.extend(self.card_fields.template_params());

        let params: Vec<(&str, &str)> = params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        render::template("Храм", &params)
    }
}

/// Cut `s` to at most `max` bytes including `marker`, on a char boundary.
pub fn truncate_bytes(s: &str, max: usize, marker: &str) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max.saturating_sub(marker.len());
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{marker}", &s[..end])
}
