//! Cache file naming
//!
//! An entry lives at `<root>/<group>/<id>.<version>.<hash>.<name>`. The three leading
//! tokens have `.` percent-escaped so the hash is always token 2 (zero-based) when the
//! file name is split on its first three dots; `name` is trailing text and keeps its
//! dots. Path separators, `%` and NUL are escaped in every component. Values without
//! any of those characters encode unchanged, which keeps older cache trees readable.

use crate::types::{CachedFileDescriptor, CachedFileName};
use std::path::{Path, PathBuf};

const SEPARATOR: char = '.';

/// Stand-in directory name for an empty group
const EMPTY_GROUP: &str = "%";

fn needs_escape(c: char, escape_dots: bool) -> bool {
    matches!(c, '%' | '/' | '\\' | '\0') || (escape_dots && c == SEPARATOR)
}

fn escape_into(out: &mut String, value: &str, escape_dots: bool) {
    for c in value.chars() {
        if needs_escape(c, escape_dots) {
            // every escaped character is ASCII
            out.push_str(&format!("%{:02X}", c as u32));
        } else {
            out.push(c);
        }
    }
}

fn unescape(value: &str) -> Option<String> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            // only the exact form the encoder writes: two uppercase hex digits
            let hex = bytes.get(i + 1..i + 3)?;
            let digit = |b: u8| match b {
                b'0'..=b'9' => Some(b - b'0'),
                b'A'..=b'F' => Some(b - b'A' + 10),
                _ => None,
            };
            out.push((digit(hex[0])? << 4) | digit(hex[1])?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// Directory name used for a descriptor's group
pub fn group_dir_name(group: &str) -> String {
    if group.is_empty() {
        return EMPTY_GROUP.to_string();
    }

    let mut out = String::with_capacity(group.len());
    let rest = match group.strip_prefix(SEPARATOR) {
        Some(rest) => {
            out.push_str("%2E");
            rest
        }
        None => group,
    };
    escape_into(&mut out, rest, false);
    out
}

/// File name (without directory) of the cache entry for `descriptor`
pub fn cached_file_name(descriptor: &CachedFileDescriptor) -> String {
    let mut out = String::new();
    escape_into(&mut out, descriptor.id(), true);
    out.push(SEPARATOR);
    escape_into(&mut out, descriptor.version(), true);
    out.push(SEPARATOR);
    escape_into(&mut out, descriptor.content_hash(), true);
    out.push(SEPARATOR);
    escape_into(&mut out, descriptor.name(), false);
    out
}

/// Full path of the cache entry for `descriptor` under `root`. Pure, no I/O.
pub fn cached_file_path(root: &Path, descriptor: &CachedFileDescriptor) -> PathBuf {
    root.join(group_dir_name(descriptor.group()))
        .join(cached_file_name(descriptor))
}

/// Decode a cache file name back into its components.
///
/// Returns `None` for names with fewer than four tokens or with malformed escapes.
pub fn parse_cached_file_name(file_name: &str) -> Option<CachedFileName> {
    let mut tokens = file_name.splitn(4, SEPARATOR);
    let id = unescape(tokens.next()?)?;
    let version = unescape(tokens.next()?)?;
    let content_hash = unescape(tokens.next()?)?;
    let name = unescape(tokens.next()?)?;

    Some(CachedFileName {
        id,
        version,
        content_hash,
        name,
    })
}

/// Content hash encoded in the file name of a cache entry
pub fn read_hash(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    parse_cached_file_name(file_name).map(|decoded| decoded.content_hash)
}
