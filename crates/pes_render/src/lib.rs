use std::fmt::Write as _;

use pes_core::core_api::{Attributes, PlayerRecord, SkipReason, UpdateReport};
use pes_core::scanner::ScanHit;
use serde_json::{Map as JsonMap, Value as JsonValue};

const SHEET_WIDTH: usize = 64;
const ATTR_LABEL_WIDTH: usize = 22;
const ATTR_VALUE_WIDTH: usize = 8;
const RAW_PREVIEW_BYTES: usize = 16;

/// Field names requested on the command line; empty means all fields.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FieldSelection {
    pub names: Vec<String>,
}

impl FieldSelection {
    pub fn is_any_selected(&self) -> bool {
        !self.names.is_empty()
    }

    fn includes(&self, name: &str) -> bool {
        !self.is_any_selected() || self.names.iter().any(|wanted| wanted == name)
    }

    /// Requested names the layout does not define.
    pub fn missing_from<'a>(&'a self, attrs: &Attributes) -> Vec<&'a str> {
        self.names
            .iter()
            .filter(|wanted| attrs.get(wanted).is_none())
            .map(String::as_str)
            .collect()
    }
}

pub fn render_attributes_text(attrs: &Attributes, fields: &FieldSelection) -> String {
    let mut out = String::new();
    for entry in attrs.iter().filter(|entry| fields.includes(&entry.name)) {
        writeln!(&mut out, "{}={}", entry.name, entry.value)
            .expect("writing to String cannot fail");
    }
    out
}

pub fn render_attributes_json(index: usize, attrs: &Attributes, fields: &FieldSelection) -> JsonValue {
    let mut out = JsonMap::new();
    out.insert("index".to_string(), JsonValue::from(index));
    out.insert("attributes".to_string(), attributes_to_json(attrs, fields));
    JsonValue::Object(out)
}

pub fn render_record_json(record: &PlayerRecord) -> JsonValue {
    let mut out = JsonMap::new();
    out.insert("id".to_string(), JsonValue::from(record.id));
    out.insert("name".to_string(), JsonValue::String(record.name.clone()));
    out.insert(
        "block_index".to_string(),
        JsonValue::from(record.hit.block_index),
    );
    out.insert(
        "block_offset".to_string(),
        JsonValue::from(record.hit.block_offset),
    );
    out.insert("id_offset".to_string(), JsonValue::from(record.hit.id_offset));
    out.insert("id_width".to_string(), JsonValue::from(record.hit.id_width));
    out.insert(
        "attributes".to_string(),
        attributes_to_json(&record.attributes, &FieldSelection::default()),
    );
    out.insert("raw_block".to_string(), JsonValue::String(record.raw_hex()));
    JsonValue::Object(out)
}

pub fn render_record_sheet(record: &PlayerRecord) -> String {
    let mut out = String::new();
    writeln!(&mut out).expect("writing to String cannot fail");
    writeln!(&mut out, "{}", centered_no_trailing("PLAYER RECORD", SHEET_WIDTH))
        .expect("writing to String cannot fail");
    writeln!(&mut out).expect("writing to String cannot fail");

    writeln!(&mut out, "  ID: {:<20}Name: {}", record.id, record.name)
        .expect("writing to String cannot fail");
    writeln!(
        &mut out,
        "  Block: {:<17}Offset: 0x{:X}",
        record.hit.block_index, record.hit.block_offset
    )
    .expect("writing to String cannot fail");
    writeln!(
        &mut out,
        "  ID Offset: 0x{:<11X}ID Width: {} bytes",
        record.hit.id_offset, record.hit.id_width
    )
    .expect("writing to String cannot fail");
    writeln!(&mut out).expect("writing to String cannot fail");

    writeln!(&mut out, " ::: Attributes :::").expect("writing to String cannot fail");
    let entries = record.attributes.entries();
    for pair in entries.chunks(2) {
        let mut line = String::from("  ");
        for entry in pair {
            let label = fit_column(&entry.name, ATTR_LABEL_WIDTH - 2);
            line.push_str(&format!(
                "{:<label_w$}{:<value_w$}",
                format!("{label}:"),
                entry.value,
                label_w = ATTR_LABEL_WIDTH,
                value_w = ATTR_VALUE_WIDTH,
            ));
        }
        writeln!(&mut out, "{}", line.trim_end()).expect("writing to String cannot fail");
    }
    writeln!(&mut out).expect("writing to String cannot fail");

    let preview_len = record.raw_block.len().min(RAW_PREVIEW_BYTES);
    let preview: String = record.raw_block[..preview_len]
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect();
    let ellipsis = if record.raw_block.len() > preview_len {
        "..."
    } else {
        ""
    };
    writeln!(&mut out, "  Raw: {preview}{ellipsis}").expect("writing to String cannot fail");
    out
}

pub fn render_update_report_text(report: &UpdateReport) -> String {
    let mut out = String::new();
    for entry in &report.applied {
        writeln!(&mut out, "set {}={}", entry.name, entry.value)
            .expect("writing to String cannot fail");
    }
    for skipped in &report.skipped {
        writeln!(
            &mut out,
            "skipped {}={} ({})",
            skipped.name,
            skipped.value,
            skip_reason_label(skipped.reason)
        )
        .expect("writing to String cannot fail");
    }
    if !report.committed {
        writeln!(&mut out, "update rejected; block unchanged")
            .expect("writing to String cannot fail");
    }
    out
}

pub fn render_update_report_json(report: &UpdateReport) -> JsonValue {
    let mut out = JsonMap::new();
    out.insert("committed".to_string(), JsonValue::Bool(report.committed));

    let mut applied = JsonMap::new();
    for entry in &report.applied {
        applied.insert(entry.name.clone(), JsonValue::from(entry.value));
    }
    out.insert("applied".to_string(), JsonValue::Object(applied));

    let skipped = report
        .skipped
        .iter()
        .map(|skipped| {
            let mut item = JsonMap::new();
            item.insert("name".to_string(), JsonValue::String(skipped.name.clone()));
            item.insert("value".to_string(), JsonValue::from(skipped.value));
            item.insert(
                "reason".to_string(),
                JsonValue::String(skip_reason_label(skipped.reason)),
            );
            JsonValue::Object(item)
        })
        .collect();
    out.insert("skipped".to_string(), JsonValue::Array(skipped));
    JsonValue::Object(out)
}

pub fn render_scan_hits_text(target_id: u64, hits: &[ScanHit]) -> String {
    let mut out = String::new();
    if hits.is_empty() {
        writeln!(&mut out, "id {target_id} not found").expect("writing to String cannot fail");
        return out;
    }
    for (rank, hit) in hits.iter().enumerate() {
        let marker = if rank == 0 { "*" } else { " " };
        writeln!(
            &mut out,
            "{marker} block={} offset=0x{:X} id_offset=0x{:X} id_width={}",
            hit.block_index, hit.block_offset, hit.id_offset, hit.id_width
        )
        .expect("writing to String cannot fail");
    }
    out
}

pub fn render_scan_hits_json(target_id: u64, hits: &[ScanHit]) -> JsonValue {
    let mut out = JsonMap::new();
    out.insert("id".to_string(), JsonValue::from(target_id));
    out.insert(
        "hits".to_string(),
        JsonValue::Array(hits.iter().map(scan_hit_to_json).collect()),
    );
    JsonValue::Object(out)
}

fn scan_hit_to_json(hit: &ScanHit) -> JsonValue {
    let mut out = JsonMap::new();
    out.insert("block_index".to_string(), JsonValue::from(hit.block_index));
    out.insert("block_offset".to_string(), JsonValue::from(hit.block_offset));
    out.insert("id_offset".to_string(), JsonValue::from(hit.id_offset));
    out.insert("id_width".to_string(), JsonValue::from(hit.id_width));
    JsonValue::Object(out)
}

fn attributes_to_json(attrs: &Attributes, fields: &FieldSelection) -> JsonValue {
    let mut out = JsonMap::new();
    for entry in attrs.iter().filter(|entry| fields.includes(&entry.name)) {
        out.insert(entry.name.clone(), JsonValue::from(entry.value));
    }
    JsonValue::Object(out)
}

fn skip_reason_label(reason: SkipReason) -> String {
    match reason {
        SkipReason::UnknownField => "unknown field".to_string(),
        SkipReason::OutOfRange { max } => format!("allowed range 0-{max}"),
    }
}

fn fit_column(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    if width <= 3 {
        return value.chars().take(width).collect();
    }

    let mut out: String = value.chars().take(width - 3).collect();
    out.push_str("...");
    out
}

fn centered_no_trailing(value: &str, width: usize) -> String {
    let len = value.chars().count();
    if len >= width {
        return value.to_string();
    }

    let left_padding = (width - len) / 2;
    format!("{}{}", " ".repeat(left_padding), value)
}
