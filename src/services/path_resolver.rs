//! Turns untrusted request paths into canonical storage keys and prefixes.
//!
//! Every handler goes through this module before touching a store, so a path
//! that fails here never reaches `BlobStore`.

use std::fmt;
use thiserror::Error;

/// Longest key accepted for single-object operations, in bytes.
pub const MAX_OBJECT_KEY_LEN: usize = 1024;

/// Extra percent-decoding layers inspected for hidden traversal sequences.
const MAX_DECODE_ROUNDS: usize = 4;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("invalid path: traversal segment")]
    Traversal,
    #[error("invalid path: empty key")]
    Empty,
    #[error("invalid path: `{0}` names a directory, not an object")]
    NotAnObject(String),
    #[error("invalid path: key exceeds {} bytes", MAX_OBJECT_KEY_LEN)]
    TooLong,
    #[error("invalid path: {0}")]
    Malformed(&'static str),
}

pub type PathResult<T> = Result<T, PathError>;

/// A validated storage key: no leading slash, no `..`, never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Final segment of the key.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Directory whose listing changes when this key is written or removed.
    pub fn parent_directory(&self) -> String {
        parent_directory(&self.0)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Resolve a raw, percent-encoded request path into an object key.
pub fn resolve_key(raw: &str) -> PathResult<ObjectKey> {
    let decoded = decode(raw)?;
    key_from_decoded(&decoded)
}

/// Validate an already-decoded name (e.g. a multipart file name) as a key.
pub fn resolve_name(name: &str) -> PathResult<ObjectKey> {
    reject_traversal(name)?;
    key_from_decoded(name)
}

/// Resolve a raw request path into a listing prefix.
///
/// `""` is the root; any other prefix ends with exactly one `/` and has no
/// empty segments, so `/notes`, `/notes/` and `//notes//` list the same thing.
pub fn resolve_prefix(raw: &str) -> PathResult<String> {
    let decoded = decode(raw)?;
    ensure_printable(&decoded)?;
    let joined = collapse_slashes(&decoded);
    if joined.is_empty() {
        return Ok(joined);
    }
    Ok(format!("{}/", joined))
}

/// Directory path of a key: `/` when the key has no slash, otherwise `/`
/// followed by everything before the last slash.
pub fn parent_directory(key: &str) -> String {
    match key.rfind('/') {
        Some(idx) if idx > 0 => format!("/{}", &key[..idx]),
        _ => "/".to_string(),
    }
}

/// Canonical cache URL of a directory listing.
///
/// Accepts either a directory path (`/notes`) or a listing prefix
/// (`notes/`); both map to `/notes/`. The root maps to `/`.
pub fn listing_url(directory: &str) -> String {
    let trimmed = collapse_slashes(directory);
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}

/// Human-readable name of a listing prefix.
pub fn display_name(prefix: &str) -> &str {
    prefix
        .split('/')
        .filter(|segment| !segment.is_empty())
        .last()
        .unwrap_or("root")
}

fn decode(raw: &str) -> PathResult<String> {
    let decoded = urlencoding::decode(raw)
        .map_err(|_| PathError::Malformed("not valid UTF-8 after decoding"))?
        .into_owned();
    reject_traversal(&decoded)?;
    Ok(decoded)
}

/// Reject `..` in the string itself and in any further decoding layer, so
/// `%252e%252e` cannot slip through a single decode.
fn reject_traversal(decoded: &str) -> PathResult<()> {
    let mut layer = decoded.to_string();
    for _ in 0..MAX_DECODE_ROUNDS {
        if layer.contains("..") {
            return Err(PathError::Traversal);
        }
        if !layer.contains('%') {
            return Ok(());
        }
        let next = match urlencoding::decode(&layer) {
            Ok(next) => next.into_owned(),
            Err(_) => return Ok(()),
        };
        if next == layer {
            return Ok(());
        }
        layer = next;
    }
    if layer.contains("..") {
        return Err(PathError::Traversal);
    }
    Ok(())
}

fn key_from_decoded(decoded: &str) -> PathResult<ObjectKey> {
    let key = decoded.trim_start_matches('/');
    if key.trim().is_empty() {
        return Err(PathError::Empty);
    }
    if key.ends_with('/') {
        return Err(PathError::NotAnObject(key.to_string()));
    }
    let key = collapse_slashes(key);
    if key.len() > MAX_OBJECT_KEY_LEN {
        return Err(PathError::TooLong);
    }
    ensure_printable(&key)?;
    Ok(ObjectKey(key))
}

/// Non-empty segments of `path` joined by single slashes.
fn collapse_slashes(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

fn ensure_printable(value: &str) -> PathResult<()> {
    if value.chars().any(|c| c.is_control() || c == '\\') {
        return Err(PathError::Malformed("control character or backslash"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_leading_slashes_and_decodes() {
        let key = resolve_key("//notes/my%20todo.txt").unwrap();
        assert_eq!(key.as_str(), "notes/my todo.txt");
        assert_eq!(key.file_name(), "my todo.txt");
    }

    #[test]
    fn rejects_traversal_in_every_form() {
        for raw in [
            "/a/../b",
            "/../etc/passwd",
            "/a/%2e%2e/b",
            "/a/%2E%2E/b",
            "/a/%252e%252e/b",
            "/a/%25252e%25252e/b",
            "/..",
        ] {
            assert_eq!(resolve_key(raw), Err(PathError::Traversal), "{raw}");
            assert_eq!(resolve_prefix(raw), Err(PathError::Traversal), "{raw}");
        }
    }

    #[test]
    fn empty_key_is_invalid_but_empty_prefix_is_root() {
        assert_eq!(resolve_key("/"), Err(PathError::Empty));
        assert_eq!(resolve_key("///"), Err(PathError::Empty));
        assert_eq!(resolve_prefix("/").unwrap(), "");
        assert_eq!(resolve_prefix("/notes/").unwrap(), "notes/");
    }

    #[test]
    fn repeated_slashes_collapse_to_one_canonical_form() {
        assert_eq!(resolve_prefix("/notes//").unwrap(), "notes/");
        assert_eq!(resolve_prefix("//a//b/").unwrap(), "a/b/");
        assert_eq!(resolve_prefix("/docs").unwrap(), "docs/");
        assert_eq!(resolve_prefix("//").unwrap(), "");

        let key = resolve_key("/notes//a.txt").unwrap();
        assert_eq!(key.as_str(), "notes/a.txt");
        assert_eq!(listing_url(&key.parent_directory()), listing_url("notes/"));
        assert_eq!(listing_url("//notes//"), "/notes/");
    }

    #[test]
    fn directory_paths_are_not_objects() {
        assert!(matches!(
            resolve_key("/notes/"),
            Err(PathError::NotAnObject(_))
        ));
    }

    #[test]
    fn rejects_control_characters_and_overlong_keys() {
        assert!(matches!(
            resolve_key("/a%00b"),
            Err(PathError::Malformed(_))
        ));
        assert!(matches!(
            resolve_key("/a%5Cb"),
            Err(PathError::Malformed(_))
        ));
        let long = format!("/{}", "k".repeat(MAX_OBJECT_KEY_LEN + 1));
        assert_eq!(resolve_key(&long), Err(PathError::TooLong));
    }

    #[test]
    fn rejects_invalid_utf8() {
        assert!(matches!(
            resolve_key("/%ff%fe"),
            Err(PathError::Malformed(_))
        ));
    }

    #[test]
    fn literal_percent_in_name_survives() {
        let key = resolve_key("/report%2520final.txt").unwrap();
        assert_eq!(key.as_str(), "report%20final.txt");
    }

    #[test]
    fn parent_directory_of_keys() {
        assert_eq!(parent_directory("todo.txt"), "/");
        assert_eq!(parent_directory("notes/todo.txt"), "/notes");
        assert_eq!(parent_directory("a/b/c.bin"), "/a/b");
    }

    #[test]
    fn listing_urls_agree_between_directories_and_prefixes() {
        assert_eq!(listing_url("/"), "/");
        assert_eq!(listing_url(""), "/");
        assert_eq!(listing_url("/notes"), "/notes/");
        assert_eq!(listing_url("notes/"), "/notes/");
        assert_eq!(
            listing_url(&parent_directory("a/b/c.bin")),
            listing_url("a/b/")
        );
    }

    #[test]
    fn multipart_names_are_validated_without_decoding() {
        assert_eq!(resolve_name("/docs/a.txt").unwrap().as_str(), "docs/a.txt");
        assert_eq!(resolve_name("../x"), Err(PathError::Traversal));
        assert_eq!(resolve_name(""), Err(PathError::Empty));
    }

    #[test]
    fn display_names() {
        assert_eq!(display_name(""), "root");
        assert_eq!(display_name("notes/"), "notes");
        assert_eq!(display_name("a/b/"), "b");
    }
}
