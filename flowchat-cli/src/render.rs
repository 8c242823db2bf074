//! Plain-text rendering of content segments.
//!
//! Maps each [`ContentSegment`] to a terminal block: reasoning, prose,
//! tables, forms, envelopes and code.

use std::io::{self, Write};

use serde_json::Value;

use flowchat_core::{ContentSegment, PayloadShape, StructuredPayload};

/// Placeholder shown while a fenced block is still streaming.
pub(crate) const LOADING_PLACEHOLDER: &str = "[loading data...]";

/// Write `segments` to `out`.
pub(crate) fn write_segments(
    out: &mut impl Write,
    segments: &[ContentSegment],
    show_thinking: bool,
) -> io::Result<()> {
    for segment in segments {
        match segment {
            ContentSegment::Thought(text) => {
                if show_thinking && !text.trim().is_empty() {
                    writeln!(out, "[thinking]")?;
                    for line in text.trim().lines() {
                        writeln!(out, "  {}", line)?;
                    }
                }
            }
            ContentSegment::Text(text) => write!(out, "{}", text)?,
            ContentSegment::DataPartial { .. } => writeln!(out, "\n{}", LOADING_PLACEHOLDER)?,
            ContentSegment::DataComplete {
                raw,
                language,
                payload,
            } => {
                writeln!(out)?;
                write_payload(out, raw, language.as_deref(), payload)?;
            }
        }
    }
    writeln!(out)
}

fn write_payload(
    out: &mut impl Write,
    raw: &str,
    language: Option<&str>,
    payload: &StructuredPayload,
) -> io::Result<()> {
    match payload.shape {
        PayloadShape::Tabular => write_table(out, payload),
        PayloadShape::Form => write_form(out, &payload.data),
        PayloadShape::Record => {
            if let Some(object) = payload.data.as_object() {
                for (key, value) in object {
                    writeln!(out, "{}: {}", key, cell(value))?;
                }
            }
            Ok(())
        }
        PayloadShape::SuccessEnvelope => {
            let message = field(&payload.data, &["message"]).unwrap_or("done");
            writeln!(out, "[ok] {}", message)
        }
        PayloadShape::ErrorEnvelope => {
            let message = field(&payload.data, &["error", "message"]).unwrap_or("failed");
            writeln!(out, "[error] {}", message)
        }
        PayloadShape::Unrecognized => {
            writeln!(out, "```{}", language.unwrap_or(""))?;
            writeln!(out, "{}", raw.trim())?;
            writeln!(out, "```")
        }
    }
}

fn write_table(out: &mut impl Write, payload: &StructuredPayload) -> io::Result<()> {
    let columns = payload.columns();
    let rows = payload.rows();

    if rows.is_empty() {
        return writeln!(out, "(no rows)");
    }
    if columns.is_empty() {
        for row in rows {
            writeln!(out, "- {}", cell(row))?;
        }
        return Ok(());
    }

    let table: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|c| row.get(c).map(cell).unwrap_or_default())
                .collect()
        })
        .collect();
    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            table
                .iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(c.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<w$}", c, w = *w))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    writeln!(out, "{}", line(&columns))?;
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    writeln!(out, "{}", rule.join("-+-"))?;
    for row in &table {
        writeln!(out, "{}", line(row))?;
    }
    Ok(())
}

fn write_form(out: &mut impl Write, form: &Value) -> io::Result<()> {
    let title = field(form, &["title", "name"]).unwrap_or("Form");
    writeln!(out, "[form] {}", title)?;

    let fields = form
        .get("fields")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for f in fields {
        let label = field(f, &["label", "name"]).unwrap_or("?");
        match field(f, &["type"]) {
            Some(kind) => writeln!(out, "  - {} ({})", label, kind)?,
            None => writeln!(out, "  - {}", label)?,
        }
    }
    Ok(())
}

fn field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| value.get(*k).and_then(Value::as_str))
}

fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
