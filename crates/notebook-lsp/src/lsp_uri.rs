//! Document identifiers seen by the language server and by the host.
//!
//! Each notebook is addressed three ways:
//!
//! - the real notebook path as a `file://` URI (Facade, navigation targets)
//! - `{path}.{ext}` as a `file://` URI (Shadow, the only document the server knows)
//! - `scheme://filename?path=...` (read-only previews, e.g. reference listings)

use crate::config::ProxyConfig;
use std::path::Path;
use url::Url;

/// Convert a local filesystem path to a `file://` URI.
///
/// Relative paths cannot be expressed as file URLs; they are percent-encoded verbatim.
pub fn path_to_file_uri(path: &str) -> String {
    match Url::from_file_path(path) {
        Ok(url) => url.to_string(),
        Err(()) => format!("file://{}", percent_encode_path(path)),
    }
}

/// Convert a `file://` URI back into a local filesystem path.
pub fn file_uri_to_path(uri: &str) -> Option<String> {
    let url = Url::parse(uri).ok()?;
    if url.scheme() != "file" {
        return None;
    }
    match url.to_file_path() {
        Ok(path) => Some(path.to_string_lossy().into_owned()),
        Err(()) => Some(percent_decode_path(url.path())),
    }
}

/// Percent-encode a path or file name for URIs.
///
/// Keeps URI-safe bytes and percent-encodes the rest.
pub fn percent_encode_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for &b in path.as_bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

/// Percent-decode a URI path component.
pub fn percent_decode_path(path: &str) -> String {
    fn hex_val(b: u8) -> Option<u8> {
        match b {
            b'0'..=b'9' => Some(b - b'0'),
            b'a'..=b'f' => Some(b - b'a' + 10),
            b'A'..=b'F' => Some(b - b'A' + 10),
            _ => None,
        }
    }

    let bytes = path.as_bytes();
    let mut out = Vec::<u8>::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && let (Some(hi), Some(lo)) = (hex_val(bytes[i + 1]), hex_val(bytes[i + 2]))
        {
            out.push((hi << 4) | lo);
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).to_string()
}

/// Last component of a notebook path.
pub fn notebook_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

/// Synthetic preview URI for a notebook path: `scheme://filename?path=/full/path`.
///
/// The query keeps two open notebooks with the same file name apart.
pub fn synthetic_uri(path: &str, scheme: &str) -> String {
    format!(
        "{scheme}://{}?path={}",
        percent_encode_path(&notebook_file_name(path)),
        percent_encode_path(path)
    )
}

fn synthetic_parts<'a>(uri: &'a str, scheme: &str) -> Option<(&'a str, Option<&'a str>)> {
    let rest = uri.strip_prefix(scheme)?.strip_prefix("://")?;
    Some(match rest.split_once('?') {
        Some((name, query)) => (name, Some(query)),
        None => (rest, None),
    })
}

/// File name named by a synthetic URI, if `uri` uses `scheme`.
pub fn synthetic_file_name(uri: &str, scheme: &str) -> Option<String> {
    let (name, _) = synthetic_parts(uri, scheme)?;
    let name = name.trim_end_matches('/');
    if name.is_empty() {
        return None;
    }
    Some(percent_decode_path(name))
}

/// Full notebook path carried by a synthetic URI's `path` query, if any.
pub fn synthetic_path(uri: &str, scheme: &str) -> Option<String> {
    let (_, query) = synthetic_parts(uri, scheme)?;
    query?
        .split('&')
        .find_map(|pair| pair.strip_prefix("path="))
        .filter(|path| !path.is_empty())
        .map(percent_decode_path)
}

/// The identifiers of one notebook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUris {
    /// Real notebook document; navigation targets resolve here.
    pub facade: String,
    /// Shadow document sent to the language server.
    pub shadow: String,
    /// Read-only preview identifier.
    pub synthetic: String,
}

impl DocumentUris {
    /// Identifiers for the notebook at `path`.
    pub fn for_path(path: &str, config: &ProxyConfig) -> Self {
        Self {
            facade: path_to_file_uri(path),
            shadow: path_to_file_uri(&format!("{path}.{}", config.shadow_extension)),
            synthetic: synthetic_uri(path, &config.synthetic_scheme),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_roundtrip() {
        let input = "/tmp/hello world.txt";
        let encoded = percent_encode_path(input);
        assert_eq!(percent_decode_path(&encoded), input);
    }

    #[cfg(unix)]
    #[test]
    fn test_document_uris_for_path() {
        let uris = DocumentUris::for_path("/work/my nb.ipynb", &ProxyConfig::default());
        assert_eq!(uris.facade, "file:///work/my%20nb.ipynb");
        assert_eq!(uris.shadow, "file:///work/my%20nb.ipynb.py");
        assert_eq!(
            uris.synthetic,
            "ipynb://my%20nb.ipynb?path=/work/my%20nb.ipynb"
        );
        assert_eq!(
            file_uri_to_path(&uris.facade).as_deref(),
            Some("/work/my nb.ipynb")
        );
    }

    #[test]
    fn test_synthetic_uri_resolves_to_file_name_and_path() {
        let uri = synthetic_uri("/a/b&c/analysis.ipynb", "ipynb");
        assert_eq!(uri, "ipynb://analysis.ipynb?path=/a/b%26c/analysis.ipynb");
        assert_eq!(
            synthetic_file_name(&uri, "ipynb").as_deref(),
            Some("analysis.ipynb")
        );
        assert_eq!(
            synthetic_path(&uri, "ipynb").as_deref(),
            Some("/a/b&c/analysis.ipynb")
        );
        assert_eq!(synthetic_path("ipynb://analysis.ipynb", "ipynb"), None);
        assert_eq!(synthetic_file_name("file:///x", "ipynb"), None);
        assert_eq!(synthetic_file_name("ipynb://", "ipynb"), None);
    }
}
