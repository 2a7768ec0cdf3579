//! Newline-delimited JSON encoding and local persistence of snapshots.
//!
//! Records are written in the same textual style as Python's `json.dumps`
//! defaults: `", "` / `": "` separators, non-ASCII as `\uXXXX`, integers
//! exactly as received and floats in Python's `repr` form (`1e+16`,
//! `1.5e-07`, `2.0`). Numbers outside the `f64` range are passed through
//! as received, where Python would write `Infinity`.

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::ser::Formatter;
use tracing::{debug, info};

use crate::snapshot::{FeedSnapshot, Record};

/// `serde_json` formatter with spaced separators and ASCII-only output.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpacedAsciiFormatter;

impl Formatter for SpacedAsciiFormatter {
    fn begin_array_value<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn write_number_str<W: ?Sized + Write>(&mut self, writer: &mut W, value: &str) -> io::Result<()> {
        match python_float(value) {
            Some(repr) => writer.write_all(repr.as_bytes()),
            None => writer.write_all(value.as_bytes()),
        }
    }

    fn write_string_fragment<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        // Control characters never reach here; serde_json escapes them first.
        let mut units = [0u16; 2];
        for c in fragment.chars() {
            if c.is_ascii() && c != '\x7f' {
                writer.write_all(&[c as u8])?;
            } else {
                for unit in c.encode_utf16(&mut units) {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
        }
        Ok(())
    }
}

/// Python `repr` of a JSON float; `None` means write `text` unchanged.
fn python_float(text: &str) -> Option<String> {
    if !text.contains(['.', 'e', 'E']) {
        return (text == "-0").then(|| "0".to_string());
    }
    let value: f64 = text.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    if value == 0.0 {
        return Some(if value.is_sign_negative() { "-0.0" } else { "0.0" }.to_string());
    }

    let scientific = format!("{value:e}");
    let (mantissa, exponent) = scientific.split_once('e')?;
    let exponent: i32 = exponent.parse().ok()?;
    if (-4..16).contains(&exponent) {
        let mut positional = value.to_string();
        if !positional.contains('.') {
            positional.push_str(".0");
        }
        Some(positional)
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        Some(format!("{mantissa}e{sign}{:02}", exponent.abs()))
    }
}

/// Encodes one record as a single JSON line (no newline).
pub fn encode_record(record: &Record) -> serde_json::Result<String> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, SpacedAsciiFormatter);
    record.serialize(&mut ser)?;
    // The formatter emits ASCII only.
    String::from_utf8(buf).map_err(serde::ser::Error::custom)
}

/// Joins each record's encoding with `\n`. No trailing newline; an empty
/// slice encodes to an empty string.
pub fn encode_jsonl(records: &[Record]) -> serde_json::Result<String> {
    let lines = records
        .iter()
        .map(encode_record)
        .collect::<serde_json::Result<Vec<_>>>()?;
    Ok(lines.join("\n"))
}

/// Writes a snapshot as JSONL to `path`, replacing any existing file.
pub fn write_jsonl_file(path: &Path, snapshot: &FeedSnapshot) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let payload = encode_jsonl(snapshot.records())?;
    debug!(path = %path.display(), bytes = payload.len(), "Writing JSONL file");
    std::fs::write(path, payload).with_context(|| format!("writing {}", path.display()))?;

    info!(path = %path.display(), records = snapshot.len(), "Snapshot written");
    Ok(())
}
