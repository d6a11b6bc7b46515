//! Ordering and display rules for fund, inventory and item numbers.
//!
//! Catalog numbers are ragged: most are plain integers, some carry a letter
//! suffix (`123а`), some a second numeric run (`Р-1234`, `12а3`), and some are
//! missing entirely. Every number is therefore stored as an opaque string and
//! ordered through a composite [`NumberKey`] instead of lexical comparison:
//!
//! - `None` / `""` → sentinel `(-1, "", -1)`, sorts before everything else
//! - `"12"` → `(12, "", -1)`
//! - `"12а"` → `(12, "а", -1)`
//! - `"12а3"` → `(12, "а", 3)`
//! - `"Р-1234"` → `(0, "Р-1234", 0)` (no leading digits: whole string is the middle)
//!
//! Keys that tie on the three components (`"01"` vs `"1"`) fall back to the raw
//! string, so distinct numbers never compare equal.

use serde::{Deserialize, Deserializer};
use std::cmp::Ordering;

/// Composite sort key for a catalog number.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct NumberKey {
    /// Leading digit run, `0` when the string starts with a non-digit,
    /// `-1` for a missing number.
    pub leading: i64,
    /// Text between the leading and trailing digit runs.
    pub middle: String,
    /// Digit run following `middle`, `-1` when absent.
    pub trailing: i64,
    raw: String,
}

impl NumberKey {
    fn missing() -> Self {
        Self {
            leading: -1,
            middle: String::new(),
            trailing: -1,
            raw: String::new(),
        }
    }
}

/// Build the sort key for a raw number.
pub fn sort_key(raw: Option<&str>) -> NumberKey {
    let s = match raw {
        Some(s) if !s.is_empty() => s,
        _ => return NumberKey::missing(),
    };

    let (leading, rest) = split_digits(s);
    if leading.is_empty() {
        return NumberKey {
            leading: 0,
            middle: s.to_string(),
            trailing: 0,
            raw: s.to_string(),
        };
    }

    let middle_len = rest
        .char_indices()
        .find(|(_, c)| c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    let (middle, rest) = rest.split_at(middle_len);
    let (trailing, _) = split_digits(rest);

    NumberKey {
        leading: parse_run(leading),
        middle: middle.to_string(),
        trailing: if trailing.is_empty() {
            -1
        } else {
            parse_run(trailing)
        },
        raw: s.to_string(),
    }
}

fn split_digits(s: &str) -> (&str, &str) {
    let end = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    s.split_at(end)
}

/// Digit runs longer than `i64` saturate instead of failing.
fn parse_run(digits: &str) -> i64 {
    digits.parse().unwrap_or(i64::MAX)
}

/// Compare two optional numbers by their composite keys.
pub fn compare(a: Option<&str>, b: Option<&str>) -> Ordering {
    sort_key(a).cmp(&sort_key(b))
}

/// Sort optional numbers (or titles) ascending by composite key.
pub fn sorted<'a, I>(numbers: I) -> Vec<&'a Option<String>>
where
    I: IntoIterator<Item = &'a Option<String>>,
{
    let mut keyed: Vec<(NumberKey, &Option<String>)> = numbers
        .into_iter()
        .map(|n| (sort_key(n.as_deref()), n))
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    keyed.into_iter().map(|(_, n)| n).collect()
}

/// Display form of an optional number: missing becomes the empty string.
pub fn number_str(number: Option<&str>) -> &str {
    number.unwrap_or("")
}

/// Display form of an optional year.
pub fn year_str(year: Option<i32>) -> String {
    year.map(|y| y.to_string()).unwrap_or_default()
}

/// Map key used in the JSON store: missing numbers are written as `""`.
pub fn key_str(number: &Option<String>) -> String {
    number.clone().unwrap_or_default()
}

/// Inverse of [`key_str`].
pub fn from_key_str(key: &str) -> Option<String> {
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Int(i64),
    Float(f64),
    Text(String),
}

/// Deserialize a number that older stores may hold as a JSON integer,
/// float or string. Empty strings and `null` become `None`.
pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawNumber> = Option::deserialize(deserializer)?;
    Ok(match raw {
        None => None,
        Some(RawNumber::Int(n)) => Some(n.to_string()),
        Some(RawNumber::Float(f)) if f.fract() == 0.0 => Some(format!("{}", f as i64)),
        Some(RawNumber::Float(f)) => Some(f.to_string()),
        Some(RawNumber::Text(s)) => from_key_str(&s),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> NumberKey {
        sort_key(Some(s))
    }

    #[test]
    fn missing_and_empty_share_the_sentinel() {
        assert_eq!(sort_key(None), sort_key(Some("")));
        assert_eq!(sort_key(None).leading, -1);
        assert_eq!(sort_key(None).trailing, -1);
    }

    #[test]
    fn plain_number() {
        let k = key("12");
        assert_eq!((k.leading, k.middle.as_str(), k.trailing), (12, "", -1));
    }

    #[test]
    fn letter_suffix() {
        let k = key("12а");
        assert_eq!((k.leading, k.middle.as_str(), k.trailing), (12, "а", -1));
    }

    #[test]
    fn suffix_with_trailing_run() {
        let k = key("12а3");
        assert_eq!((k.leading, k.middle.as_str(), k.trailing), (12, "а", 3));
    }

    #[test]
    fn no_leading_digits_uses_whole_string() {
        let k = key("Р-1234");
        assert_eq!((k.leading, k.middle.as_str(), k.trailing), (0, "Р-1234", 0));
    }

    #[test]
    fn numeric_order_not_lexical() {
        assert!(key("2") < key("10"));
        assert!(key("10") < key("10а"));
        assert!(key("10а") < key("10б"));
        assert!(key("10а2") < key("10а10"));
    }

    #[test]
    fn missing_sorts_first() {
        assert!(sort_key(None) < key("0"));
        assert!(sort_key(None) < key("Р-1"));
        assert!(sort_key(None) < key("1"));
    }

    #[test]
    fn ties_fall_back_to_raw_string() {
        assert_ne!(key("01"), key("1"));
        assert_eq!(compare(Some("01"), Some("1")), Ordering::Less);
        assert_eq!(compare(Some("1"), Some("01")), Ordering::Greater);
    }

    #[test]
    fn order_is_total_over_a_mixed_sample() {
        let sample = [
            "", "0", "1", "01", "2", "10", "10а", "10б", "10а2", "10а10", "Р-1", "Р-2", "п1",
            "99999999999999999999999",
        ];
        for a in &sample {
            for b in &sample {
                let ab = compare(Some(a), Some(b));
                let ba = compare(Some(b), Some(a));
                assert_eq!(ab, ba.reverse(), "antisymmetry for {a:?} / {b:?}");
                if a != b && !(a.is_empty() || b.is_empty()) {
                    assert_ne!(ab, Ordering::Equal, "{a:?} and {b:?} tie");
                }
                for c in &sample {
                    if ab != Ordering::Greater && compare(Some(b), Some(c)) != Ordering::Greater {
                        assert_ne!(
                            compare(Some(a), Some(c)),
                            Ordering::Greater,
                            "transitivity for {a:?} {b:?} {c:?}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn sorted_orders_by_key() {
        let numbers = vec![
            Some("10".to_string()),
            None,
            Some("2".to_string()),
            Some("2а".to_string()),
        ];
        let order: Vec<Option<&str>> = sorted(&numbers).into_iter().map(|n| n.as_deref()).collect();
        assert_eq!(order, vec![None, Some("2"), Some("2а"), Some("10")]);
    }

    #[test]
    fn huge_runs_saturate() {
        assert_eq!(key("99999999999999999999999").leading, i64::MAX);
    }

    #[test]
    fn display_strings() {
        assert_eq!(number_str(None), "");
        assert_eq!(number_str(Some("7а")), "7а");
        assert_eq!(year_str(None), "");
        assert_eq!(year_str(Some(1897)), "1897");
    }

    #[test]
    fn key_str_round_trip() {
        assert_eq!(key_str(&None), "");
        assert_eq!(from_key_str(""), None);
        assert_eq!(from_key_str(&key_str(&Some("3".into()))), Some("3".into()));
    }

    #[derive(Deserialize)]
    struct Holder {
        #[serde(deserialize_with = "deserialize_opt")]
        number: Option<String>,
    }

    #[test]
    fn deserialize_accepts_legacy_shapes() {
        let parse = |json: &str| serde_json::from_str::<Holder>(json).unwrap().number;
        assert_eq!(parse(r#"{"number": null}"#), None);
        assert_eq!(parse(r#"{"number": ""}"#), None);
        assert_eq!(parse(r#"{"number": 15}"#), Some("15".into()));
        assert_eq!(parse(r#"{"number": 15.0}"#), Some("15".into()));
        assert_eq!(parse(r#"{"number": "15а"}"#), Some("15а".into()));
    }
}
