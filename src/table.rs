//! Ordered privilege tables
//!
//! A `PrivTable` holds entries of one kind in ascending `PrivEntry::compare`
//! order, so a front-to-back scan tries the most specific grant first.
//! Readers work on an immutable snapshot and never block; writers serialize
//! on a mutex and publish a new snapshot.

use std::io::{Read, Write};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::debug;

use crate::bitset::PrivBitSet;
use crate::codec::{read_count, write_count};
use crate::config::PrivConfig;
use crate::entry::{EntryKind, PrivEntry};
use crate::error::{PrivError, Result};

type Snapshot = Vec<Arc<PrivEntry>>;

/// What `PrivTable::put_derived` did with a resolved entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedPut {
    Added,
    Updated,
    Unchanged,
    /// A manual grant holds the key
    Shadowed,
}

pub struct PrivTable {
    kind: EntryKind,
    entries: ArcSwap<Snapshot>,
    write_lock: Mutex<()>,
}

impl PrivTable {
    pub fn new(kind: EntryKind) -> Self {
        PrivTable { kind, entries: ArcSwap::from_pointee(Vec::new()), write_lock: Mutex::new(()) }
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Current entries in priority order
    pub fn entries(&self) -> Arc<Snapshot> {
        self.entries.load_full()
    }

    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.load().is_empty()
    }

    fn check_kind(&self, entry: &PrivEntry) {
        if entry.kind() != self.kind {
            panic!("{} entry offered to {} table", entry.kind(), self.kind);
        }
    }

    /// Entries are only ever inserted with compiled patterns
    fn check_insert(&self, entry: &PrivEntry) -> Result<()> {
        self.check_kind(entry);
        if !entry.is_analysed() {
            return Err(PrivError::NotAnalysed);
        }
        Ok(())
    }

    /// Run `f` on a private copy of the entries and publish the result
    fn update<T, F: FnOnce(&mut Snapshot) -> Result<T>>(&self, f: F) -> Result<T> {
        let _guard = self.write_lock.lock();
        let mut next: Snapshot = (**self.entries.load()).clone();
        let r = f(&mut next)?;
        self.entries.store(Arc::new(next));
        Ok(r)
    }

    fn insert_sorted(v: &mut Snapshot, entry: Arc<PrivEntry>) {
        let pos = v.partition_point(|e| e.compare(&entry).is_lt());
        v.insert(pos, entry);
    }

    /// Insert `entry`, merging into an existing entry with the same key.
    ///
    /// A manual grant replaces an entry produced by the domain resolver; a
    /// resolver entry never overwrites a manual one.
    pub fn add(&self, entry: PrivEntry, err_on_exist: bool, err_on_non_exist: bool) -> Result<Arc<PrivEntry>> {
        self.check_insert(&entry)?;
        self.update(|v| {
            let Some(pos) = v.iter().position(|e| e.key_match(&entry)) else {
                if err_on_non_exist {
                    return Err(PrivError::NoSuchGrant(entry.to_string()));
                }
                let e = Arc::new(entry);
                debug!(entry = %e, "add privilege entry");
                Self::insert_sorted(v, e.clone());
                return Ok(e);
            };
            if err_on_exist {
                return Err(PrivError::GrantExists(entry.to_string()));
            }
            let existing = &v[pos];
            let merged = match (existing.is_set_by_domain_resolver(), entry.is_set_by_domain_resolver()) {
                (false, true) => return Ok(existing.clone()),
                (true, false) => Arc::new(entry),
                _ => Arc::new(existing.with_privs(existing.privs() | entry.privs())),
            };
            debug!(entry = %merged, "merge privilege entry");
            v[pos] = merged.clone();
            Ok(merged)
        })
    }

    /// Replace the entry with the same key outright, or insert it
    pub fn put(&self, entry: PrivEntry) -> Result<Arc<PrivEntry>> {
        self.check_insert(&entry)?;
        let e = Arc::new(entry);
        self.update(|v| {
            v.retain(|x| !x.key_match(&e));
            Self::insert_sorted(v, e.clone());
            Ok(e)
        })
    }

    /// Install an entry produced by the domain resolver. The existing entry
    /// with the same key is inspected under the write lock, so a manual
    /// grant made concurrently is never replaced.
    pub fn put_derived(&self, entry: PrivEntry) -> Result<DerivedPut> {
        self.check_insert(&entry)?;
        if !entry.is_set_by_domain_resolver() {
            return Err(PrivError::InvalidGrant(format!("{} is not a resolved entry", entry)));
        }
        let _guard = self.write_lock.lock();
        let current = self.entries.load();
        let outcome = match current.iter().position(|x| x.key_match(&entry)) {
            None => DerivedPut::Added,
            Some(pos) if !current[pos].is_set_by_domain_resolver() => return Ok(DerivedPut::Shadowed),
            Some(pos) if current[pos].privs() == entry.privs() => return Ok(DerivedPut::Unchanged),
            Some(_) => DerivedPut::Updated,
        };
        let mut next: Snapshot = (**current).clone();
        next.retain(|x| !x.key_match(&entry));
        Self::insert_sorted(&mut next, Arc::new(entry));
        self.entries.store(Arc::new(next));
        Ok(outcome)
    }

    /// Remove `privs` from the entry keyed like `key`. The entry is dropped
    /// once it holds no privileges. Returns the remaining entry, if any.
    pub fn revoke(&self, key: &PrivEntry, privs: PrivBitSet, err_on_non_exist: bool) -> Result<Option<Arc<PrivEntry>>> {
        self.check_kind(key);
        self.update(|v| {
            let Some(pos) = v.iter().position(|e| e.key_match(key)) else {
                if err_on_non_exist {
                    return Err(PrivError::NoSuchGrant(key.to_string()));
                }
                return Ok(None);
            };
            let mut left = v[pos].privs();
            left.remove(&privs);
            if left.is_empty() {
                debug!(entry = %v[pos], "remove privilege entry");
                v.remove(pos);
                return Ok(None);
            }
            let e = Arc::new(v[pos].with_privs(left));
            debug!(entry = %e, "revoke privileges");
            v[pos] = e.clone();
            Ok(Some(e))
        })
    }

    /// Remove the entry keyed like `key`
    pub fn remove(&self, key: &PrivEntry) -> bool {
        self.remove_where(|e| e.key_match(key)) > 0
    }

    pub fn remove_where<F: Fn(&PrivEntry) -> bool>(&self, pred: F) -> usize {
        let _guard = self.write_lock.lock();
        let mut next: Snapshot = (**self.entries.load()).clone();
        let before = next.len();
        next.retain(|e| !pred(e));
        let n = before - next.len();
        if n > 0 {
            self.entries.store(Arc::new(next));
        }
        n
    }

    pub fn clear(&self) {
        let _guard = self.write_lock.lock();
        self.entries.store(Arc::new(Vec::new()));
    }

    /// First entry, in priority order, granting to this request
    pub fn first_match(&self, host: &str, user: &str, db: Option<&str>, tbl: Option<&str>) -> Option<Arc<PrivEntry>> {
        self.entries.load().iter().find(|e| e.matches(host, user, db, tbl)).cloned()
    }

    /// Privileges of the first matching entry, empty if none matches
    pub fn privs_for(&self, host: &str, user: &str, db: Option<&str>, tbl: Option<&str>) -> PrivBitSet {
        self.first_match(host, user, db, tbl).map(|e| e.privs()).unwrap_or_default()
    }

    /// Entry count, then every entry with its type tag
    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        let snap = self.entries.load();
        write_count(w, snap.len())?;
        for e in snap.iter() {
            e.write(w)?;
        }
        Ok(())
    }

    /// Decode a table image, analysing every entry
    pub fn read<R: Read>(kind: EntryKind, r: &mut R, cfg: &PrivConfig) -> Result<Self> {
        let n = read_count(r)?;
        let mut v: Snapshot = Vec::with_capacity(n.min(1024));
        for _ in 0..n {
            let mut e = PrivEntry::read(r)?;
            if e.kind() != kind {
                return Err(PrivError::Malformed(format!("{} entry in {} table image", e.kind(), kind)));
            }
            e.analyse(cfg)?;
            Self::insert_sorted(&mut v, Arc::new(e));
        }
        Ok(PrivTable { kind, entries: ArcSwap::from_pointee(v), write_lock: Mutex::new(()) })
    }
}
