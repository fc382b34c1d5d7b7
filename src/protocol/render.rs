//! Snapshot renderers for the `/get` endpoints
//!
//! All three renderings list entries in sorted key order.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::Write;

use crate::error::{Result, SnapError};
use crate::persist;
use crate::store::Records;

const HTML_HEAD: &str = "<html><body><ul>\n      ";
const HTML_TAIL: &str = "\n      </body></ul></html>";

/// JSON object, byte-identical to the snapshot file
pub fn render_json(records: &Records) -> Result<Vec<u8>> {
    persist::encode(records)
}

/// HTML page with one `<li>key : value</li>` per entry
pub fn render_html(records: &Records) -> Result<String> {
    let mut page = String::from(HTML_HEAD);

    for (key, value) in sorted(records) {
        write!(page, "<li>{} : {}</li>", escape_html(key), escape_html(value))
            .map_err(|e| SnapError::Serialization(format!("render html: {}", e)))?;
    }

    page.push_str(HTML_TAIL);
    Ok(page)
}

/// CSV rows `key,value`, newline terminated
pub fn render_csv(records: &Records) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write_csv(&mut out, records)?;
    Ok(out)
}

/// Stream CSV rows into `writer`
pub fn write_csv<W: Write>(writer: &mut W, records: &Records) -> Result<()> {
    for (key, value) in sorted(records) {
        write_csv_field(writer, key)?;
        writer.write_all(b",")?;
        write_csv_field(writer, value)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

fn sorted(records: &Records) -> BTreeMap<&str, &str> {
    records.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
}

fn write_csv_field<W: Write>(writer: &mut W, field: &str) -> Result<()> {
    if !csv_needs_quotes(field) {
        writer.write_all(field.as_bytes())?;
        return Ok(());
    }

    writer.write_all(b"\"")?;
    writer.write_all(field.replace('"', "\"\"").as_bytes())?;
    writer.write_all(b"\"")?;
    Ok(())
}

fn csv_needs_quotes(field: &str) -> bool {
    if field.is_empty() {
        return false;
    }
    if field == r"\." || field.contains([',', '"', '\r', '\n']) {
        return true;
    }
    field.chars().next().is_some_and(char::is_whitespace)
}

/// Escape text for an HTML text node
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\0' => out.push('\u{FFFD}'),
            '"' => out.push_str("&#34;"),
            '&' => out.push_str("&amp;"),
            '\'' => out.push_str("&#39;"),
            '+' => out.push_str("&#43;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
