/// One uploaded file from a multipart/form-data body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Form field name (`name="..."`).
    pub field: Option<String>,
    /// Client-side file name (`filename="..."`).
    pub filename: String,
    pub data: Vec<u8>,
}

/// Returns the index of the first occurrence of `needle` in `haystack`.
pub fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Splits `haystack` on every occurrence of `needle`, returning the pieces
/// between occurrences (excluding the needle itself).
pub fn split_on<'a>(haystack: &'a [u8], needle: &[u8]) -> Vec<&'a [u8]> {
    let mut result = Vec::new();
    let mut start = 0;
    while start <= haystack.len() {
        if let Some(pos) = find_subsequence(&haystack[start..], needle) {
            result.push(&haystack[start..start + pos]);
            start += pos + needle.len();
        } else {
            result.push(&haystack[start..]);
            break;
        }
    }
    result
}

/// True when the media type of a Content-Type value is
/// `multipart/form-data`, in any letter case.
pub fn is_form_data(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|media| media.trim().eq_ignore_ascii_case("multipart/form-data"))
        .unwrap_or(false)
}

/// Extracts the boundary token from a Content-Type header value like
/// `multipart/form-data; boundary=----WebKitFormBoundaryXXX`.
pub fn extract_boundary(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .filter_map(|s| s.trim().split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, value)| value.trim().trim_matches('"').to_owned())
        .filter(|b| !b.is_empty())
}

/// Every file part in the body, in order.
pub fn file_parts(body: &[u8], boundary: &str) -> Vec<FilePart> {
    let delimiter = format!("--{}", boundary);
    let sep = b"\r\n\r\n";
    let mut files = Vec::new();

    for part in split_on(body, delimiter.as_bytes()) {
        let Some(sep_pos) = find_subsequence(part, sep) else { continue };
        let headers = String::from_utf8_lossy(&part[..sep_pos]);
        let Some(filename) = disposition_param(&headers, "filename") else { continue };

        let raw = &part[sep_pos + sep.len()..];
        let data = raw.strip_suffix(b"\r\n").unwrap_or(raw);
        files.push(FilePart {
            field: disposition_param(&headers, "name"),
            filename,
            data: data.to_vec(),
        });
    }
    files
}

/// The file uploaded under `field`, or the first file part when no part
/// carries that field name.
pub fn extract_file(body: &[u8], boundary: &str, field: &str) -> Option<FilePart> {
    let mut files = file_parts(body, boundary);
    let idx = files.iter()
        .position(|f| f.field.as_deref() == Some(field))
        .unwrap_or(0);
    if idx < files.len() { Some(files.swap_remove(idx)) } else { None }
}

/// Parses `key="value"` out of a Content-Disposition header block.
/// `name` never matches inside `filename`.
fn disposition_param(headers: &str, key: &str) -> Option<String> {
    let needle = format!("{}=\"", key);
    let mut search_from = 0;
    while let Some(rel) = headers[search_from..].find(&needle) {
        let pos = search_from + rel;
        let preceded_ok = pos == 0
            || matches!(headers.as_bytes()[pos - 1], b' ' | b';' | b'\t');
        let rest = &headers[pos + needle.len()..];
        if preceded_ok {
            let end = rest.find('"')?;
            return Some(rest[..end].to_owned());
        }
        search_from = pos + needle.len();
    }
    None
}
