//! LMDB persistence for privilege entries
//!
//! Each entry is stored under its `keys::entry_key` with its tagged wire
//! bytes as the value, so the store holds exactly one record per grant
//! subject and replays into the right table by tag.

use std::path::Path;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use tracing::{debug, warn};

use crate::catalog::PrivCatalog;
use crate::entry::{EntryKind, PrivEntry};
use crate::error::{err, Result};
use crate::keys::{entry_key, kind_prefix};

type Db = Database<Bytes, Bytes>;

pub struct PrivStore {
    env: Env,
    entries: Db,
}

impl PrivStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;
        // SAFETY: LMDB requires no other processes access this path concurrently during open.
        let env = unsafe { EnvOpenOptions::new().map_size(1 << 30).max_dbs(1).open(path).map_err(err)? };
        let mut tx = env.write_txn().map_err(err)?;
        let entries: Db = env.create_database(&mut tx, Some("entries")).map_err(err)?;
        tx.commit().map_err(err)?;
        Ok(PrivStore { env, entries })
    }

    /// Insert or overwrite the record of `entry`
    pub fn put(&self, entry: &PrivEntry) -> Result<()> {
        let k = entry_key(entry)?;
        let v = entry.to_bytes()?;
        let mut tx = self.env.write_txn().map_err(err)?;
        self.entries.put(&mut tx, &k, &v).map_err(err)?;
        tx.commit().map_err(err)
    }

    pub fn delete(&self, entry: &PrivEntry) -> Result<bool> {
        let k = entry_key(entry)?;
        let mut tx = self.env.write_txn().map_err(err)?;
        let r = self.entries.delete(&mut tx, &k).map_err(err)?;
        tx.commit().map_err(err)?;
        Ok(r)
    }

    pub fn len(&self) -> Result<u64> {
        let tx = self.env.read_txn().map_err(err)?;
        self.entries.len(&tx).map_err(err)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn clear(&self) -> Result<()> {
        let mut tx = self.env.write_txn().map_err(err)?;
        self.entries.clear(&mut tx).map_err(err)?;
        tx.commit().map_err(err)
    }

    /// Every stored entry, decoded but not analysed
    pub fn load(&self) -> Result<Vec<PrivEntry>> {
        let tx = self.env.read_txn().map_err(err)?;
        let mut r = Vec::new();
        for item in self.entries.iter(&tx).map_err(err)? {
            let (_, v) = item.map_err(err)?;
            r.push(PrivEntry::from_bytes(v)?);
        }
        Ok(r)
    }

    /// Stored entries of one kind, decoded but not analysed
    pub fn load_kind(&self, kind: EntryKind) -> Result<Vec<PrivEntry>> {
        let pfx = kind_prefix(kind)?;
        let tx = self.env.read_txn().map_err(err)?;
        let mut r = Vec::new();
        for item in self.entries.prefix_iter(&tx, &pfx).map_err(err)? {
            let (_, v) = item.map_err(err)?;
            r.push(PrivEntry::from_bytes(v)?);
        }
        Ok(r)
    }

    /// Replace the stored image with the current catalog contents
    pub fn save(&self, catalog: &PrivCatalog) -> Result<usize> {
        let mut tx = self.env.write_txn().map_err(err)?;
        self.entries.clear(&mut tx).map_err(err)?;
        let mut n = 0;
        for t in catalog.tables() {
            for e in t.entries().iter() {
                self.entries.put(&mut tx, &entry_key(e)?, &e.to_bytes()?).map_err(err)?;
                n += 1;
            }
        }
        tx.commit().map_err(err)?;
        debug!(entries = n, "saved privilege image");
        Ok(n)
    }

    /// Load every stored entry into `catalog`, compiled with its case
    /// policy. Stored masks replace whatever the catalog holds for the key.
    pub fn replay(&self, catalog: &PrivCatalog) -> Result<usize> {
        let entries = self.load()?;
        let n = entries.len();
        for mut e in entries {
            if let Err(error) = e.analyse(catalog.config()) {
                warn!(entry = %e, %error, "skipping stored entry with invalid pattern");
                continue;
            }
            catalog.table_for(e.kind()).put(e)?;
        }
        debug!(entries = n, "replayed privilege image");
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitset::PrivBitSet;
    use crate::privilege::Privilege::*;
    use tempfile::TempDir;

    #[test]
    fn test_put_load_delete() {
        let dir = TempDir::new().unwrap();
        let store = PrivStore::open(dir.path()).unwrap();
        let c = PrivCatalog::default();
        let e = c.db_entry("%", "sales", "a", false, PrivBitSet::of(&[Select])).unwrap();

        store.put(&e).unwrap();
        store.put(&e.with_privs(PrivBitSet::of(&[Select, Load]))).unwrap();
        assert_eq!(store.len().unwrap(), 1);

        let loaded = store.load().unwrap();
        assert_eq!(loaded[0].privs(), PrivBitSet::of(&[Select, Load]));
        assert!(!loaded[0].is_analysed());

        assert!(store.delete(&e).unwrap());
        assert!(!store.delete(&e).unwrap());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_load_kind() {
        let dir = TempDir::new().unwrap();
        let store = PrivStore::open(dir.path()).unwrap();
        let c = PrivCatalog::default();
        store.put(&c.global_entry("%", "root", false, PrivBitSet::of(&[Admin])).unwrap()).unwrap();
        store.put(&c.db_entry("%", "sales", "a", false, PrivBitSet::of(&[Select])).unwrap()).unwrap();
        store.put(&c.table_entry("%", "sales", "t", "a", false, PrivBitSet::of(&[Load])).unwrap()).unwrap();

        assert_eq!(store.load_kind(EntryKind::Global).unwrap().len(), 1);
        assert_eq!(store.load_kind(EntryKind::Db).unwrap()[0].db_name(), Some("sales"));
        assert_eq!(store.load_kind(EntryKind::Table).unwrap()[0].tbl_name(), Some("t"));
    }
}
