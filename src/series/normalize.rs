//! Period label normalization
//!
//! The relay's grouped results label periods inconsistently: ISO strings,
//! compact digit codes, localized month names (English and Polish, any
//! casing, with or without diacritics), sometimes wrapped in arrays or
//! objects. `normalize` reconciles them into canonical `YYYY-MM` keys.
//! It is deterministic and total: an unrecognized label comes back
//! unchanged and the caller treats it as unmapped.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

static CANONICAL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})(?:-(\d{2}))?$").expect("Invalid regex"));

static COMPACT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})(\d{2})(\d{2})?$").expect("Invalid regex"));

static NAME_YEAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\p{L}+)\.?\s+(\d{4})\s*$").expect("Invalid regex"));

static YEAR_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d{4})\s+(\p{L}+)\.?\s*$").expect("Invalid regex"));

static YEAR_TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").expect("Invalid regex"));

/// Month lookup keyed by folded (lowercase, diacritic-stripped) names and
/// abbreviations, English and Polish
static MONTHS: LazyLock<HashMap<&'static str, u32>> = LazyLock::new(|| {
    let entries: &[(&str, u32)] = &[
        // English
        ("january", 1), ("jan", 1),
        ("february", 2), ("feb", 2),
        ("march", 3), ("mar", 3),
        ("april", 4), ("apr", 4),
        ("may", 5),
        ("june", 6), ("jun", 6),
        ("july", 7), ("jul", 7),
        ("august", 8), ("aug", 8),
        ("september", 9), ("sept", 9), ("sep", 9),
        ("october", 10), ("oct", 10),
        ("november", 11), ("nov", 11),
        ("december", 12), ("dec", 12),
        // Polish, nominative and genitive, plus abbreviations
        ("styczen", 1), ("stycznia", 1), ("sty", 1),
        ("luty", 2), ("lutego", 2), ("lut", 2),
        ("marzec", 3), ("marca", 3),
        ("kwiecien", 4), ("kwietnia", 4), ("kwi", 4),
        ("maj", 5), ("maja", 5),
        ("czerwiec", 6), ("czerwca", 6), ("cze", 6),
        ("lipiec", 7), ("lipca", 7), ("lip", 7),
        ("sierpien", 8), ("sierpnia", 8), ("sie", 8),
        ("wrzesien", 9), ("wrzesnia", 9), ("wrz", 9),
        ("pazdziernik", 10), ("pazdziernika", 10), ("paz", 10),
        ("listopad", 11), ("listopada", 11), ("lis", 11),
        ("grudzien", 12), ("grudnia", 12), ("gru", 12),
    ];
    entries.iter().copied().collect()
});

/// Whether a string already is a canonical `YYYY-MM` key
pub fn is_canonical(s: &str) -> bool {
    match CANONICAL_PATTERN.captures(s) {
        Some(caps) => caps.get(3).is_none() && valid_month(&caps[2]),
        None => false,
    }
}

/// Normalize an arbitrary period label to `YYYY-MM`
///
/// Never fails; an unrecognized label is returned unchanged so the caller
/// can keep it aside instead of merging it into a wrong bucket.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();

    // 1. Exact YYYY-MM / YYYY-MM-DD
    if let Some(caps) = CANONICAL_PATTERN.captures(trimmed) {
        if valid_month(&caps[2]) {
            return format!("{}-{}", &caps[1], &caps[2]);
        }
    }

    // 2. Compact YYYYMM / YYYYMMDD
    if let Some(caps) = COMPACT_PATTERN.captures(trimmed) {
        if valid_month(&caps[2]) {
            return format!("{}-{}", &caps[1], &caps[2]);
        }
    }

    // 3. Month name adjacent to a year, both orders
    if let Some(caps) = NAME_YEAR_PATTERN.captures(trimmed) {
        if let Some(month) = lookup_month(&caps[1]) {
            return format!("{}-{:02}", &caps[2], month);
        }
    }
    if let Some(caps) = YEAR_NAME_PATTERN.captures(trimmed) {
        if let Some(month) = lookup_month(&caps[2]) {
            return format!("{}-{:02}", &caps[1], month);
        }
    }

    // 4. Loose scan: any month-like token plus any year token
    let month = trimmed
        .split(|c: char| !c.is_alphanumeric())
        .find_map(lookup_month);
    if let Some(month) = month {
        if let Some(year) = YEAR_TOKEN_PATTERN
            .captures(trimmed)
            .and_then(|caps| caps.get(1))
        {
            return format!("{}-{:02}", year.as_str(), month);
        }
    }

    // 5. Generic calendar-string parse as last resort
    if let Some(date) = parse_calendar_string(trimmed) {
        return format!("{:04}-{:02}", date.year(), date.month());
    }

    // 6. Unrecognized: hand it back for the caller's unmapped pile
    raw.to_string()
}

/// Normalize a JSON label, which may be a string, number, array, or object
///
/// Arrays are scanned element by element; objects are probed at the keys
/// grouped results are known to use, then any string value. The original
/// value is stringified and returned when nothing maps.
pub fn normalize_value(label: &Value) -> String {
    match label {
        Value::String(s) => normalize(s),
        Value::Number(n) => normalize(&n.to_string()),
        Value::Array(items) => {
            for item in items {
                let candidate = normalize_value(item);
                if is_canonical(&candidate) {
                    return candidate;
                }
            }
            stringify(label)
        }
        Value::Object(map) => {
            for key in ["from", "date", "name", "display_name", "value"] {
                if let Some(inner) = map.get(key) {
                    let candidate = normalize_value(inner);
                    if is_canonical(&candidate) {
                        return candidate;
                    }
                }
            }
            for inner in map.values() {
                if let Value::String(s) = inner {
                    let candidate = normalize(s);
                    if is_canonical(&candidate) {
                        return candidate;
                    }
                }
            }
            stringify(label)
        }
        _ => stringify(label),
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn valid_month(digits: &str) -> bool {
    matches!(digits.parse::<u32>(), Ok(m) if (1..=12).contains(&m))
}

fn lookup_month(token: &str) -> Option<u32> {
    let folded = fold(token);
    if folded.is_empty() {
        return None;
    }
    MONTHS.get(folded.as_str()).copied()
}

/// Lowercase and strip Polish diacritics so lookups are insensitive to
/// both case and accent
fn fold(token: &str) -> String {
    token
        .chars()
        .flat_map(|c| c.to_lowercase())
        .map(|c| match c {
            'ą' => 'a',
            'ć' => 'c',
            'ę' => 'e',
            'ł' => 'l',
            'ń' => 'n',
            'ó' => 'o',
            'ś' => 's',
            'ź' | 'ż' => 'z',
            other => other,
        })
        .filter(|c| c.is_alphanumeric())
        .collect()
}

const DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%d.%m.%Y", "%d/%m/%Y", "%d-%m-%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

fn parse_calendar_string(s: &str) -> Option<NaiveDate> {
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(s, format) {
            return Some(datetime.date());
        }
    }
    None
}
