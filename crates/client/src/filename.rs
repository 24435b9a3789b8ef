//! Filename resolution for streamed downloads.
//!
//! Candidates are tried in order and the first one that is present and not
//! the default sentinel wins:
//!
//! 1. the filename the upstream task reported
//! 2. the `filename` parameter of the retrieval response's Content-Disposition
//! 3. the last path segment of the client-supplied URL, if it has an extension
//! 4. `"download"`

use regex::Regex;
use std::sync::LazyLock;

/// Name used when nothing better is known. The upstream also uses it as a
/// placeholder, so a task filename equal to it does not count.
pub const DEFAULT_FILENAME: &str = "download";

/// `filename[^;=\n]*=(['"]?)(.*?)\1(;|$)` spelled without a backreference.
static CONTENT_DISPOSITION_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"filename[^;=\n]*=(?:"(.*?)"|'(.*?)'|(.*?))(?:;|$)"#).expect("filename pattern is valid")
});

/// Pick the filename to present to the caller.
pub fn resolve_filename(
    task_filename: Option<&str>, content_disposition: Option<&str>, client_url: Option<&str>,
) -> String {
    task_filename
        .and_then(usable)
        .or_else(|| content_disposition.and_then(parse_content_disposition).as_deref().and_then(usable))
        .or_else(|| client_url.and_then(filename_from_url).as_deref().and_then(usable))
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}

fn usable(candidate: &str) -> Option<String> {
    let trimmed = candidate.trim();
    if trimmed.is_empty() || trimmed == DEFAULT_FILENAME { None } else { Some(trimmed.to_string()) }
}

/// Extract the filename from a Content-Disposition header value.
///
/// An RFC 5987 `charset''percent-encoded` value is decoded.
pub fn parse_content_disposition(header: &str) -> Option<String> {
    let caps = CONTENT_DISPOSITION_FILENAME.captures(header)?;
    let raw = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3))?.as_str().trim();

    let value = match raw.split_once("''") {
        Some((charset, encoded)) if is_charset(charset) => urlencoding::decode(encoded)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| encoded.to_string()),
        _ => raw.to_string(),
    };

    let value = value.trim_matches(|c| c == '"' || c == '\'').trim().to_string();
    if value.is_empty() { None } else { Some(value) }
}

fn is_charset(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Last path segment of `url`, percent-decoded, when it looks like a file.
pub fn filename_from_url(url: &str) -> Option<String> {
    let segment = match url::Url::parse(url) {
        Ok(parsed) => parsed.path_segments()?.next_back()?.to_string(),
        Err(_) => {
            let path = url.split(['?', '#']).next().unwrap_or(url);
            path.rsplit('/').next()?.to_string()
        }
    };

    let decoded = urlencoding::decode(&segment)
        .map(|s| s.into_owned())
        .unwrap_or(segment);

    if decoded.contains('.') && !decoded.trim_matches('.').is_empty() { Some(decoded) } else { None }
}

/// Build an `attachment` Content-Disposition value for `filename`.
///
/// The quoted form is restricted to printable ASCII. Names outside that range
/// get an RFC 5987 `filename*` parameter as well.
pub fn content_disposition_header(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '"' | '\\' | '/'))
        .map(|c| if c.is_ascii() { c } else { '_' })
        .collect();
    let ascii = if ascii.trim().is_empty() { DEFAULT_FILENAME.to_string() } else { ascii };

    if filename.is_ascii() && filename == ascii {
        format!("attachment; filename=\"{ascii}\"")
    } else {
        format!("attachment; filename=\"{ascii}\"; filename*=UTF-8''{}", urlencoding::encode(filename))
    }
}
