//! Privilege entries
//!
//! A `PrivEntry` binds a host pattern, a user and a resource pattern
//! (nothing, a database, or a database table) to a privilege mask. Entries
//! are immutable once built: a re-grant produces a replacement entry.
//!
//! Every constructor validates and compiles patterns in one step. Entries
//! decoded with [`PrivEntry::read`] are not compiled; call
//! [`PrivEntry::analyse`] before comparing or matching them.

use std::cmp::Ordering;
use std::fmt;
use std::io::{Read, Write};

use crate::bitset::PrivBitSet;
use crate::codec::{read_bool, read_string, write_bool, write_string};
use crate::config::PrivConfig;
use crate::constants::{is_info_schema, ANY_DB, ANY_TBL, DB_ENTRY_TAG, GLOBAL_ENTRY_TAG, TABLE_ENTRY_TAG};
use crate::error::{PrivError, Result};
use crate::grant::{grant_sql, TablePattern, UserIdentity};
use crate::pattern::PatternMatcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Global,
    Db,
    Table,
}

impl EntryKind {
    /// Type tag written ahead of a serialized entry
    pub fn tag(self) -> &'static str {
        match self {
            EntryKind::Global => GLOBAL_ENTRY_TAG,
            EntryKind::Db => DB_ENTRY_TAG,
            EntryKind::Table => TABLE_ENTRY_TAG,
        }
    }

    pub fn from_tag(tag: &str) -> Option<EntryKind> {
        match tag {
            GLOBAL_ENTRY_TAG => Some(EntryKind::Global),
            DB_ENTRY_TAG => Some(EntryKind::Db),
            TABLE_ENTRY_TAG => Some(EntryKind::Table),
            _ => None,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntryKind::Global => "global",
            EntryKind::Db => "db",
            EntryKind::Table => "tbl",
        })
    }
}

/// Resource part of an entry, as originally granted
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryScope {
    Global,
    Db { db: String },
    Table { db: String, tbl: String },
}

impl EntryScope {
    pub fn kind(&self) -> EntryKind {
        match self {
            EntryScope::Global => EntryKind::Global,
            EntryScope::Db { .. } => EntryKind::Db,
            EntryScope::Table { .. } => EntryKind::Table,
        }
    }
}

#[derive(Debug, Clone)]
struct Compiled {
    host: PatternMatcher,
    db: Option<PatternMatcher>,
    tbl: Option<PatternMatcher>,
}

#[derive(Debug, Clone)]
pub struct PrivEntry {
    orig_host: String,
    orig_user: String,
    is_domain: bool,
    set_by_domain_resolver: bool,
    privs: PrivBitSet,
    scope: EntryScope,
    compiled: Option<Compiled>,
}

fn check_db_table_privs(privs: PrivBitSet, kind: EntryKind) -> Result<()> {
    if privs.contains_node_priv() || privs.contains_resource_priv() || privs.contains_impersonate_priv() {
        return Err(PrivError::InvalidGrant(format!(
            "{} privilege can not contain global, resource or impersonate privileges: {}",
            kind, privs
        )));
    }
    Ok(())
}

// information_schema names are always matched case-insensitively
fn db_matcher(db: &str, cfg: &PrivConfig) -> Result<PatternMatcher> {
    if db == ANY_DB {
        return Ok(PatternMatcher::any());
    }
    PatternMatcher::compile(db, cfg.database.is_sensitive() && !is_info_schema(db))
}

fn tbl_matcher(db: &str, tbl: &str, cfg: &PrivConfig) -> Result<PatternMatcher> {
    if tbl == ANY_TBL {
        return Ok(PatternMatcher::any());
    }
    PatternMatcher::compile(tbl, cfg.table.is_sensitive() && !is_info_schema(db))
}

// Stored images are ordered by UTF-16 code unit, not by UTF-8 byte
fn cmp_units(a: &str, b: &str) -> Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}

fn cmp_opt_units(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => cmp_units(a, b),
        _ => a.is_some().cmp(&b.is_some()),
    }
}

impl PrivEntry {
    fn unanalysed(host: &str, user: &str, is_domain: bool, privs: PrivBitSet, scope: EntryScope) -> Self {
        PrivEntry {
            orig_host: host.to_string(),
            orig_user: user.to_string(),
            is_domain,
            set_by_domain_resolver: false,
            privs,
            scope,
            compiled: None,
        }
    }

    fn analysed(mut self, cfg: &PrivConfig) -> Result<Self> {
        self.analyse(cfg)?;
        Ok(self)
    }

    /// Grant on `*.*`. Any privilege is allowed.
    pub fn global(host: &str, user: &str, is_domain: bool, privs: PrivBitSet, cfg: &PrivConfig) -> Result<Self> {
        Self::unanalysed(host, user, is_domain, privs, EntryScope::Global).analysed(cfg)
    }

    /// Grant on `db.*`
    pub fn db(host: &str, db: &str, user: &str, is_domain: bool, privs: PrivBitSet, cfg: &PrivConfig) -> Result<Self> {
        check_db_table_privs(privs, EntryKind::Db)?;
        let scope = EntryScope::Db { db: db.to_string() };
        Self::unanalysed(host, user, is_domain, privs, scope).analysed(cfg)
    }

    /// Grant on `db.tbl`
    pub fn table(
        host: &str,
        db: &str,
        tbl: &str,
        user: &str,
        is_domain: bool,
        privs: PrivBitSet,
        cfg: &PrivConfig,
    ) -> Result<Self> {
        check_db_table_privs(privs, EntryKind::Table)?;
        if db == ANY_DB {
            return Err(PrivError::InvalidGrant(format!("table privilege on {}.{} needs a database", db, tbl)));
        }
        let scope = EntryScope::Table { db: db.to_string(), tbl: tbl.to_string() };
        Self::unanalysed(host, user, is_domain, privs, scope).analysed(cfg)
    }

    /// Compile host and resource patterns
    pub fn analyse(&mut self, cfg: &PrivConfig) -> Result<()> {
        let host = PatternMatcher::compile(&self.orig_host, cfg.host.is_sensitive())?;
        let (db, tbl) = match &self.scope {
            EntryScope::Global => (None, None),
            EntryScope::Db { db } => (Some(db_matcher(db, cfg)?), None),
            EntryScope::Table { db, tbl } => (Some(db_matcher(db, cfg)?), Some(tbl_matcher(db, tbl, cfg)?)),
        };
        self.compiled = Some(Compiled { host, db, tbl });
        Ok(())
    }

    /// Same key, different privileges. Compiled patterns are shared.
    pub fn with_privs(&self, privs: PrivBitSet) -> Self {
        PrivEntry { privs, ..self.clone() }
    }

    /// Entry materialized by the domain resolver for one resolved address
    pub fn derived_for_host(&self, host: &str, cfg: &PrivConfig) -> Result<Self> {
        let mut e = Self::unanalysed(host, &self.orig_user, false, self.privs, self.scope.clone());
        e.set_by_domain_resolver = true;
        e.analysed(cfg)
    }

    #[inline]
    fn compiled(&self) -> &Compiled {
        match &self.compiled {
            Some(c) => c,
            None => panic!("{} used before analyse", self),
        }
    }

    #[inline]
    fn assert_analysed(&self) {
        let _ = self.compiled();
    }

    fn assert_same_kind(&self, other: &PrivEntry) {
        if self.kind() != other.kind() {
            panic!("cannot compare {} entry with {} entry", self.kind(), other.kind());
        }
    }

    pub fn is_analysed(&self) -> bool {
        self.compiled.is_some()
    }

    pub fn kind(&self) -> EntryKind {
        self.scope.kind()
    }

    pub fn scope(&self) -> &EntryScope {
        &self.scope
    }

    pub fn host(&self) -> &str {
        &self.orig_host
    }

    pub fn user(&self) -> &str {
        &self.orig_user
    }

    pub fn db_name(&self) -> Option<&str> {
        match &self.scope {
            EntryScope::Global => None,
            EntryScope::Db { db } | EntryScope::Table { db, .. } => Some(db),
        }
    }

    pub fn tbl_name(&self) -> Option<&str> {
        match &self.scope {
            EntryScope::Table { tbl, .. } => Some(tbl),
            _ => None,
        }
    }

    pub fn is_any_db(&self) -> bool {
        self.db_name() == Some(ANY_DB)
    }

    pub fn is_any_tbl(&self) -> bool {
        self.tbl_name() == Some(ANY_TBL)
    }

    pub fn is_domain(&self) -> bool {
        self.is_domain
    }

    pub fn is_set_by_domain_resolver(&self) -> bool {
        self.set_by_domain_resolver
    }

    pub fn privs(&self) -> PrivBitSet {
        self.privs
    }

    pub fn host_pattern(&self) -> &PatternMatcher {
        &self.compiled().host
    }

    pub fn db_pattern(&self) -> Option<&PatternMatcher> {
        self.compiled().db.as_ref()
    }

    pub fn tbl_pattern(&self) -> Option<&PatternMatcher> {
        self.compiled().tbl.as_ref()
    }

    pub fn user_identity(&self) -> UserIdentity {
        UserIdentity::new(&self.orig_user, &self.orig_host, self.is_domain)
    }

    /// Priority order inside a table. Literal hosts, databases, tables and
    /// users sort ahead of wildcard ones, since `%` and `_` order below
    /// alphanumerics and every field compares descending.
    ///
    /// Panics if the entries differ in kind or either is not analysed.
    pub fn compare(&self, other: &PrivEntry) -> Ordering {
        self.assert_same_kind(other);
        self.assert_analysed();
        other.assert_analysed();
        cmp_units(&other.orig_host, &self.orig_host)
            .then_with(|| cmp_opt_units(other.db_name(), self.db_name()))
            .then_with(|| cmp_opt_units(other.tbl_name(), self.tbl_name()))
            .then_with(|| cmp_units(&other.orig_user, &self.orig_user))
    }

    /// Whether both entries describe the same grant subject, regardless of
    /// their privileges
    pub fn key_match(&self, other: &PrivEntry) -> bool {
        self.assert_analysed();
        other.assert_analysed();
        self.kind() == other.kind()
            && self.orig_host == other.orig_host
            && self.orig_user == other.orig_user
            && self.is_domain == other.is_domain
            && self.scope == other.scope
    }

    /// Domain entries only grant through their resolved, derived entries
    pub fn matches_user_host(&self, host: &str, user: &str) -> bool {
        !self.is_domain && self.orig_user == user && self.compiled().host.matches(host)
    }

    pub fn matches_db(&self, db: &str) -> bool {
        match &self.compiled().db {
            Some(p) => self.is_any_db() || p.matches(db),
            None => true,
        }
    }

    pub fn matches_tbl(&self, tbl: &str) -> bool {
        match &self.compiled().tbl {
            Some(p) => self.is_any_tbl() || p.matches(tbl),
            None => true,
        }
    }

    /// Authorization-time match. A `None` resource is not constrained.
    pub fn matches(&self, host: &str, user: &str, db: Option<&str>, tbl: Option<&str>) -> bool {
        self.matches_user_host(host, user)
            && db.map_or(true, |d| self.matches_db(d))
            && tbl.map_or(true, |t| self.matches_tbl(t))
    }

    pub fn table_pattern(&self) -> TablePattern {
        match &self.scope {
            EntryScope::Global => TablePattern::new(ANY_DB, ANY_TBL),
            EntryScope::Db { db } => TablePattern::new(db.as_str(), ANY_TBL),
            EntryScope::Table { db, tbl } => TablePattern::new(db.as_str(), tbl.as_str()),
        }
    }

    pub fn to_grant_sql(&self) -> String {
        grant_sql(&self.user_identity(), &self.table_pattern(), self.privs)
    }

    /// Type tag, then the fields. Fails on an un-analysed entry.
    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        if !self.is_analysed() {
            return Err(PrivError::NotAnalysed);
        }
        write_string(w, self.kind().tag())?;
        self.write_fields(w)
    }

    fn write_fields<W: Write>(&self, w: &mut W) -> Result<()> {
        write_string(w, &self.orig_host)?;
        write_string(w, &self.orig_user)?;
        write_bool(w, self.is_domain)?;
        write_bool(w, self.set_by_domain_resolver)?;
        self.privs.write(w)?;
        match &self.scope {
            EntryScope::Global => {}
            EntryScope::Db { db } => write_string(w, db)?,
            EntryScope::Table { db, tbl } => {
                write_string(w, db)?;
                write_string(w, tbl)?;
            }
        }
        Ok(())
    }

    /// Decode one tagged entry. The result is not analysed.
    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        let tag = read_string(r)?;
        let kind = EntryKind::from_tag(&tag).ok_or_else(|| PrivError::Malformed(format!("unknown entry type {}", tag)))?;
        Self::read_fields(kind, r)
    }

    /// Decode the fields following an already consumed type tag
    pub fn read_fields<R: Read>(kind: EntryKind, r: &mut R) -> Result<Self> {
        let host = read_string(r)?;
        let user = read_string(r)?;
        let is_domain = read_bool(r)?;
        let set_by_domain_resolver = read_bool(r)?;
        let privs = PrivBitSet::read(r)?;
        let scope = match kind {
            EntryKind::Global => EntryScope::Global,
            EntryKind::Db => EntryScope::Db { db: read_string(r)? },
            EntryKind::Table => {
                let db = read_string(r)?;
                EntryScope::Table { db, tbl: read_string(r)? }
            }
        };
        let mut e = Self::unanalysed(&host, &user, is_domain, privs, scope);
        e.set_by_domain_resolver = set_by_domain_resolver;
        Ok(e)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(64);
        self.write(&mut buf)?;
        Ok(buf)
    }

    /// Decode exactly one entry from `bytes`
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut r = bytes;
        let e = Self::read(&mut r)?;
        if !r.is_empty() {
            return Err(PrivError::Malformed(format!("{} trailing bytes after entry", r.len())));
        }
        Ok(e)
    }
}

impl fmt::Display for PrivEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} priv. host: {}", self.kind(), self.orig_host)?;
        if let Some(db) = self.db_name() {
            write!(f, ", db: {}", db)?;
        }
        if let Some(tbl) = self.tbl_name() {
            write!(f, ", tbl: {}", tbl)?;
        }
        write!(
            f,
            ", user: {}, priv: {}, set by resolver: {}",
            self.orig_user, self.privs, self.set_by_domain_resolver
        )
    }
}
