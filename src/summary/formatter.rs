//! Deterministic record formatting
//!
//! Turns heterogeneous record collections into readable text without any
//! external service. The field-extraction template is chosen by scoring
//! the shape of the first few records; the thresholds are empirical
//! constants, documented rather than hidden.

use serde_json::Value;

/// Cap on rendered items; anything beyond is summarized as a count
pub const ITEM_CAP: usize = 10;

/// Records sampled when scoring the collection's shape
///
/// Three is enough to outvote one malformed leading record without
/// scanning the whole collection.
const SHAPE_SAMPLE: usize = 3;

/// Field hits (across the sample) required to commit to a template
///
/// Below this the collection is rendered with the generic template.
/// Empirically chosen; see the design notes.
const SHAPE_SCORE_THRESHOLD: usize = 2;

const REVENUE_FIELDS: &[&str] = &["amount_total", "price_total", "revenue", "amount"];
const STOCK_FIELDS: &[&str] = &["qty_available", "virtual_available", "quantity", "stock"];
const CONTACT_FIELDS: &[&str] = &["department_id", "work_email", "job_title", "work_phone"];

/// Template selected for a record collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    Revenue,
    Stock,
    Contact,
    Generic,
}

/// Score the collection and pick a field-extraction template
pub fn detect_shape(records: &[Value]) -> RecordShape {
    let sample = &records[..records.len().min(SHAPE_SAMPLE)];
    let score = |fields: &[&str]| -> usize {
        sample
            .iter()
            .map(|record| {
                fields
                    .iter()
                    .filter(|field| record.get(**field).is_some())
                    .count()
            })
            .sum()
    };

    let revenue = score(REVENUE_FIELDS);
    let stock = score(STOCK_FIELDS);
    let contact = score(CONTACT_FIELDS);

    let best = revenue.max(stock).max(contact);
    if best < SHAPE_SCORE_THRESHOLD {
        return RecordShape::Generic;
    }
    if best == revenue {
        RecordShape::Revenue
    } else if best == stock {
        RecordShape::Stock
    } else {
        RecordShape::Contact
    }
}

/// Render records as a numbered list with a count prefix
///
/// Always succeeds; this is the floor the enhancement path can never make
/// worse.
pub fn format_records(records: &[Value], query: &str) -> String {
    if records.is_empty() {
        return format!("No results found for \"{}\".", query);
    }

    let shape = detect_shape(records);
    let mut out = format!("Found {} result(s):\n", records.len());

    for (index, record) in records.iter().take(ITEM_CAP).enumerate() {
        out.push_str(&format!("{}. {}\n", index + 1, render_line(record, shape)));
    }

    if records.len() > ITEM_CAP {
        out.push_str(&format!("…and {} more not shown.", records.len() - ITEM_CAP));
    }

    out.trim_end().to_string()
}

fn render_line(record: &Value, shape: RecordShape) -> String {
    let name = display_label(record);
    match shape {
        RecordShape::Revenue => {
            let amount = first_number(record, REVENUE_FIELDS);
            format!("{} - {:.2}", name, amount)
        }
        RecordShape::Stock => {
            let qty = first_number(record, STOCK_FIELDS);
            format!("{} - {} in stock", name, qty)
        }
        RecordShape::Contact => {
            let mut parts = vec![name];
            if let Some(dept) = relation_name(record.get("department_id")) {
                parts.push(dept);
            }
            if let Some(email) = record.get("work_email").and_then(Value::as_str) {
                parts.push(email.to_string());
            }
            parts.join(", ")
        }
        RecordShape::Generic => name,
    }
}

/// Human label for a record: display_name, name, or the text half of a
/// relational `[id, "Name"]` pair
fn display_label(record: &Value) -> String {
    for key in ["display_name", "name"] {
        if let Some(label) = record.get(key).and_then(Value::as_str) {
            return label.to_string();
        }
    }
    if let Some(map) = record.as_object() {
        for value in map.values() {
            if let Some(label) = relation_text(value) {
                return label;
            }
        }
    }
    record.to_string()
}

fn relation_name(value: Option<&Value>) -> Option<String> {
    value.and_then(relation_text)
}

fn relation_text(value: &Value) -> Option<String> {
    match value.as_array()?.as_slice() {
        [_, Value::String(text)] => Some(text.clone()),
        _ => None,
    }
}

fn first_number(record: &Value, fields: &[&str]) -> f64 {
    fields
        .iter()
        .find_map(|field| record.get(*field).and_then(Value::as_f64))
        .unwrap_or(0.0)
}
