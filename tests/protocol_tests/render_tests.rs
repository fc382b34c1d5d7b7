//! Render Tests
//!
//! Tests for the JSON, HTML and CSV renderings of a snapshot.

use snapkv::protocol::{render_csv, render_html, render_json, write_csv};
use snapkv::Records;

fn pairs(items: &[(&str, &str)]) -> Records {
    items
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn csv(records: &Records) -> String {
    String::from_utf8(render_csv(records).unwrap()).unwrap()
}

// =============================================================================
// JSON Tests
// =============================================================================

#[test]
fn test_json_empty() {
    assert_eq!(render_json(&Records::new()).unwrap(), b"{}".to_vec());
}

#[test]
fn test_json_sorted_compact() {
    let body = render_json(&pairs(&[("b", "2"), ("a", "1")])).unwrap();

    assert_eq!(body, br#"{"a":"1","b":"2"}"#.to_vec());
}

// =============================================================================
// HTML Tests
// =============================================================================

#[test]
fn test_html_empty() {
    let page = render_html(&Records::new()).unwrap();

    assert_eq!(page, "<html><body><ul>\n      \n      </body></ul></html>");
}

#[test]
fn test_html_entries_in_key_order() {
    let page = render_html(&pairs(&[("b", "2"), ("a", "1")])).unwrap();

    assert_eq!(
        page,
        "<html><body><ul>\n      <li>a : 1</li><li>b : 2</li>\n      </body></ul></html>"
    );
}

#[test]
fn test_html_escapes_keys_and_values() {
    let page = render_html(&pairs(&[("<script>", "Tom & \"Jerry\"")])).unwrap();

    assert!(page.contains("<li>&lt;script&gt; : Tom &amp; &#34;Jerry&#34;</li>"));
    assert!(!page.contains("<script>"));
}

// =============================================================================
// CSV Tests
// =============================================================================

#[test]
fn test_csv_empty() {
    assert_eq!(csv(&Records::new()), "");
}

#[test]
fn test_csv_rows_in_key_order() {
    assert_eq!(csv(&pairs(&[("b", "2"), ("a", "1")])), "a,1\nb,2\n");
}

#[test]
fn test_csv_quotes_special_fields() {
    let rows = csv(&pairs(&[("a,b", "say \"hi\""), ("m", "line\nbreak")]));

    assert_eq!(rows, "\"a,b\",\"say \"\"hi\"\"\"\nm,\"line\nbreak\"\n");
}

#[test]
fn test_csv_empty_and_leading_space_fields() {
    let rows = csv(&pairs(&[("empty", ""), ("padded", " x")]));

    assert_eq!(rows, "empty,\npadded,\" x\"\n");
}

#[test]
fn test_write_csv_matches_render() {
    let records = pairs(&[("k", "v"), ("x", "y,z")]);
    let mut out = Vec::new();

    write_csv(&mut out, &records).unwrap();

    assert_eq!(out, render_csv(&records).unwrap());
}
