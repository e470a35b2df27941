//! SQL `LIKE` pattern matching for host, database and table names
//!
//! `%` matches any sequence (including empty), `_` exactly one character,
//! and a backslash makes the next character literal.

use std::num::NonZeroUsize;
use std::sync::OnceLock;

use lru::LruCache;
use parking_lot::Mutex;
use regex::Regex;

use crate::constants::MATCH_ALL;
use crate::error::{PrivError, Result};

const CACHE_SIZE: usize = 1024;

static CACHE: OnceLock<Mutex<LruCache<(String, bool), Regex>>> = OnceLock::new();

fn cache() -> &'static Mutex<LruCache<(String, bool), Regex>> {
    CACHE.get_or_init(|| {
        let cap = NonZeroUsize::new(CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
        Mutex::new(LruCache::new(cap))
    })
}

#[derive(Debug, Clone)]
enum Matcher {
    All,
    Exact(String),
    Folded(String),
    Regex(Regex),
}

/// A compiled pattern. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    pattern: String,
    case_sensitive: bool,
    matcher: Matcher,
}

impl PatternMatcher {
    pub fn compile(pattern: &str, case_sensitive: bool) -> Result<Self> {
        let matcher = if pattern == MATCH_ALL {
            Matcher::All
        } else if let Some(lit) = literal(pattern) {
            if case_sensitive { Matcher::Exact(lit) } else { Matcher::Folded(lit.to_lowercase()) }
        } else {
            Matcher::Regex(compile_regex(pattern, case_sensitive)?)
        };
        Ok(PatternMatcher { pattern: pattern.to_string(), case_sensitive, matcher })
    }

    /// Match-everything pattern (`%`)
    pub fn any() -> Self {
        PatternMatcher { pattern: MATCH_ALL.to_string(), case_sensitive: true, matcher: Matcher::All }
    }

    pub fn matches(&self, candidate: &str) -> bool {
        match &self.matcher {
            Matcher::All => true,
            Matcher::Exact(s) => s == candidate,
            Matcher::Folded(s) => *s == candidate.to_lowercase(),
            Matcher::Regex(re) => re.is_match(candidate),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }
}

/// Literal text of a wildcard-free pattern (escapes resolved), or None
fn literal(pattern: &str) -> Option<String> {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' | '_' => return None,
            '\\' => out.push(chars.next().unwrap_or('\\')),
            c => out.push(c),
        }
    }
    Some(out)
}

fn compile_regex(pattern: &str, case_sensitive: bool) -> Result<Regex> {
    let key = (pattern.to_string(), case_sensitive);
    if let Some(re) = cache().lock().get(&key) {
        return Ok(re.clone());
    }

    let mut src = String::with_capacity(pattern.len() + 8);
    if !case_sensitive {
        src.push_str("(?i)");
    }
    src.push('^');
    let mut buf = [0u8; 4];
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => src.push_str(".*"),
            '_' => src.push('.'),
            '\\' => src.push_str(&regex::escape(chars.next().unwrap_or('\\').encode_utf8(&mut buf))),
            c => src.push_str(&regex::escape(c.encode_utf8(&mut buf))),
        }
    }
    src.push('$');

    let re = Regex::new(&src).map_err(|e| PrivError::Pattern(format!("{}: {}", pattern, e)))?;
    cache().lock().put(key, re.clone());
    Ok(re)
}
