//! Small shared helpers: XML escaping, URL resolution, text decoding.

use std::borrow::Cow;

/// Escape XML special characters.
pub(crate) fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Escape text-node content for XHTML output.
pub(crate) fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Whether a URL has a network-location component.
///
/// Protocol-relative URLs (`//host/path`) count as absolute.
pub(crate) fn url_is_absolute(url: &str) -> bool {
    let rest = if let Some(pos) = url.find("://") {
        &url[pos + 3..]
    } else if let Some(stripped) = url.strip_prefix("//") {
        stripped
    } else {
        return false;
    };
    let host = rest.split('/').next().unwrap_or("");
    !host.is_empty()
}

/// Resolve `href` against `base`, the way chapter stylesheets reference
/// site resources: absolute URLs pass through, protocol-relative URLs get
/// an https scheme, root-relative paths attach to the base host, and plain
/// relative paths attach to the base document's directory.
pub(crate) fn resolve_url(base: &str, href: &str) -> String {
    if href.contains("://") {
        return href.to_string();
    }
    if let Some(rest) = href.strip_prefix("//") {
        return format!("https://{rest}");
    }
    let scheme_end = match base.find("://") {
        Some(pos) => pos + 3,
        None => return href.to_string(),
    };
    let host_end = base[scheme_end..]
        .find('/')
        .map(|pos| scheme_end + pos)
        .unwrap_or(base.len());

    let joined = if let Some(path) = href.strip_prefix('/') {
        format!("{}/{}", &base[..host_end], path)
    } else {
        let dir_end = match base.rfind('/') {
            Some(pos) if pos >= host_end => pos,
            _ => base.len(),
        };
        format!("{}/{}", &base[..dir_end], href)
    };
    collapse_dot_segments(&joined)
}

/// Collapse `./` and `dir/../` segments in the path portion of a URL.
fn collapse_dot_segments(url: &str) -> String {
    let scheme_end = match url.find("://") {
        Some(pos) => pos + 3,
        None => return url.to_string(),
    };
    let host_end = url[scheme_end..]
        .find('/')
        .map(|pos| scheme_end + pos)
        .unwrap_or(url.len());
    let (prefix, path) = url.split_at(host_end);

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("{}{}", prefix, segments.join("/"))
}

/// Decode fetched bytes to a string.
///
/// Tries UTF-8 first; if the bytes are malformed, falls back to
/// Windows-1252, which covers the legacy encodings publisher content
/// still ships with.
pub(crate) fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);
    if !malformed {
        return result;
    }
    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("Hello & World"), "Hello &amp; World");
        assert_eq!(escape_xml("<tag>"), "&lt;tag&gt;");
        assert_eq!(escape_xml("\"quoted\""), "&quot;quoted&quot;");
    }

    #[test]
    fn test_url_is_absolute() {
        assert!(url_is_absolute("https://example.com/ch1.html"));
        assert!(url_is_absolute("//cdn.example.com/style.css"));
        assert!(!url_is_absolute("ch1.html"));
        assert!(!url_is_absolute("images/fig1.png"));
        assert!(!url_is_absolute("/library/view/book/123/ch1.html"));
    }

    #[test]
    fn test_resolve_url() {
        assert_eq!(
            resolve_url("https://example.com/library/book/", "style.css"),
            "https://example.com/library/book/style.css"
        );
        assert_eq!(
            resolve_url("https://example.com/library/book/", "/site.css"),
            "https://example.com/site.css"
        );
        assert_eq!(
            resolve_url("https://example.com/a/b/", "../up.css"),
            "https://example.com/a/up.css"
        );
        assert_eq!(
            resolve_url("https://example.com/a/", "https://cdn.io/x.css"),
            "https://cdn.io/x.css"
        );
    }

    #[test]
    fn test_decode_text_utf8() {
        assert_eq!(decode_text("héllo".as_bytes()), "héllo");
    }

    #[test]
    fn test_decode_text_windows_1252_fallback() {
        // 0xE9 is "é" in Windows-1252 but invalid as a lone UTF-8 byte.
        assert_eq!(decode_text(b"caf\xe9"), "café");
    }
}
