//! Length-prefixed key encoding for LMDB storage.
//!
//! Keys are encoded as: [len1: u16 BE][bytes1][len2][bytes2]...
//! - No delimiters, no escaping, any bytes allowed
//! - Prefixes of a key are themselves valid prefix scans

use crate::entry::{EntryKind, PrivEntry};
use crate::error::{PrivError, Result};

/// Build a length-prefixed key from parts
pub fn build_key(parts: &[&str]) -> Result<Vec<u8>> {
    let total_len: usize = parts.iter().map(|p| 2 + p.len()).sum();
    let mut key = Vec::with_capacity(total_len);
    for part in parts {
        let len = u16::try_from(part.len()).map_err(|_| PrivError::Store(format!("key part of {} bytes too long", part.len())))?;
        key.extend_from_slice(&len.to_be_bytes());
        key.extend_from_slice(part.as_bytes());
    }
    Ok(key)
}

/// Parse a length-prefixed key into parts. Stops at the first truncated or
/// non UTF-8 part.
pub fn parse_key(bytes: &[u8]) -> Vec<&str> {
    let mut parts = Vec::with_capacity(6);
    let mut i = 0;
    while i + 2 <= bytes.len() {
        let len = u16::from_be_bytes([bytes[i], bytes[i + 1]]) as usize;
        let Some(raw) = bytes.get(i + 2..i + 2 + len) else { break };
        let Ok(part) = std::str::from_utf8(raw) else { break };
        parts.push(part);
        i += 2 + len;
    }
    parts
}

fn kind_part(kind: EntryKind) -> &'static str {
    match kind {
        EntryKind::Global => "g",
        EntryKind::Db => "d",
        EntryKind::Table => "t",
    }
}

/// Prefix shared by every stored entry of `kind`
pub fn kind_prefix(kind: EntryKind) -> Result<Vec<u8>> {
    build_key(&[kind_part(kind)])
}

/// Storage key of an entry: kind, host, user, domain flag, resource parts.
/// Two entries share a key iff they key-match.
pub fn entry_key(e: &PrivEntry) -> Result<Vec<u8>> {
    let domain = if e.is_domain() { "1" } else { "0" };
    let mut parts = vec![kind_part(e.kind()), e.host(), e.user(), domain];
    parts.extend(e.db_name());
    parts.extend(e.tbl_name());
    build_key(&parts)
}
