//! `multipart/form-data` decoding
//!
//! Only plain fields are returned. Parts carrying a non-empty `filename` are
//! uploads and are skipped, as are parts without a `name`.
//!
//! ## Body Layout
//! ```text
//! preamble (ignored)
//! --BOUNDARY CRLF
//! Content-Disposition: form-data; name="data" CRLF
//! CRLF
//! {"k":"v"}
//! CRLF --BOUNDARY-- CRLF
//! epilogue (ignored)
//! ```

/// Extract the `boundary` parameter from a `multipart/form-data` content type
pub fn boundary(content_type: &str) -> Option<String> {
    let mut params = content_type.split(';');
    let media_type = params.next()?.trim();
    if !media_type.eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }

    params
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, value)| unquote(value.trim()))
        .filter(|boundary| !boundary.is_empty())
}

/// Decode the named, non-file fields of a multipart body, in order.
///
/// Returns `None` if the body is not well formed.
pub fn parse_fields(body: &[u8], boundary: &str) -> Option<Vec<(String, String)>> {
    let dash_boundary = format!("--{}", boundary);
    let delimiter = format!("\r\n--{}", boundary);

    // The first boundary may open the body directly, without a leading CRLF
    let mut rest = if body.starts_with(dash_boundary.as_bytes()) {
        &body[dash_boundary.len()..]
    } else {
        let at = find(body, delimiter.as_bytes())?;
        &body[at + delimiter.len()..]
    };

    let mut fields = Vec::new();
    loop {
        if rest.starts_with(b"--") {
            return Some(fields);
        }
        rest = skip_boundary_line(rest)?;

        let end = find(rest, delimiter.as_bytes())?;
        if let Some(field) = parse_part(&rest[..end]) {
            fields.push(field);
        }
        rest = &rest[end + delimiter.len()..];
    }
}

fn parse_part(part: &[u8]) -> Option<(String, String)> {
    let (head, content) = if let Some(content) = part.strip_prefix(b"\r\n") {
        (&part[..0], content)
    } else {
        let at = find(part, b"\r\n\r\n")?;
        (&part[..at], &part[at + 4..])
    };

    let head = std::str::from_utf8(head).ok()?;
    let disposition = head
        .split("\r\n")
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("Content-Disposition"))
        .map(|(_, value)| value.trim())?;

    let mut params = disposition.split(';');
    if !params.next()?.trim().eq_ignore_ascii_case("form-data") {
        return None;
    }

    let mut name = None;
    for (key, value) in params.filter_map(|param| param.split_once('=')) {
        match key.trim().to_ascii_lowercase().as_str() {
            "name" => name = Some(unquote(value.trim())),
            "filename" if !unquote(value.trim()).is_empty() => return None,
            _ => {}
        }
    }

    Some((name?, String::from_utf8_lossy(content).into_owned()))
}

/// Skip transport padding and the CRLF that ends a boundary line
fn skip_boundary_line(rest: &[u8]) -> Option<&[u8]> {
    let padding = rest.iter().take_while(|&&b| b == b' ' || b == b'\t').count();
    rest[padding..].strip_prefix(b"\r\n")
}

fn unquote(value: &str) -> String {
    match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(inner) => inner.replace("\\\"", "\"").replace("\\\\", "\\"),
        None => value.to_string(),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}
