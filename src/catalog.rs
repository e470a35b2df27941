//! Privilege catalog: the global, database and table privilege tables

use serde::Serialize;
use tracing::debug;

use crate::bitset::{PrivBitSet, PrivPredicate};
use crate::config::PrivConfig;
use crate::entry::{EntryKind, PrivEntry};
use crate::error::Result;
use crate::grant::UserIdentity;
use crate::privilege::Privilege;
use crate::table::PrivTable;

/// One line of `SHOW GRANTS`
#[derive(Debug, Clone, Serialize)]
pub struct GrantRow {
    pub identity: UserIdentity,
    pub grant: String,
    pub privileges: Vec<&'static str>,
    pub set_by_domain_resolver: bool,
}

pub struct PrivCatalog {
    cfg: PrivConfig,
    global: PrivTable,
    db: PrivTable,
    table: PrivTable,
}

impl Default for PrivCatalog {
    fn default() -> Self {
        Self::new(PrivConfig::default())
    }
}

impl PrivCatalog {
    pub fn new(cfg: PrivConfig) -> Self {
        PrivCatalog {
            cfg,
            global: PrivTable::new(EntryKind::Global),
            db: PrivTable::new(EntryKind::Db),
            table: PrivTable::new(EntryKind::Table),
        }
    }

    /// Case policy used to compile every entry of this catalog
    pub fn config(&self) -> &PrivConfig {
        &self.cfg
    }

    pub fn table_for(&self, kind: EntryKind) -> &PrivTable {
        match kind {
            EntryKind::Global => &self.global,
            EntryKind::Db => &self.db,
            EntryKind::Table => &self.table,
        }
    }

    pub fn tables(&self) -> [&PrivTable; 3] {
        [&self.global, &self.db, &self.table]
    }

    // Entry constructors bound to this catalog's case policy

    pub fn global_entry(&self, host: &str, user: &str, is_domain: bool, privs: PrivBitSet) -> Result<PrivEntry> {
        PrivEntry::global(host, user, is_domain, privs, &self.cfg)
    }

    pub fn db_entry(&self, host: &str, db: &str, user: &str, is_domain: bool, privs: PrivBitSet) -> Result<PrivEntry> {
        PrivEntry::db(host, db, user, is_domain, privs, &self.cfg)
    }

    pub fn table_entry(
        &self,
        host: &str,
        db: &str,
        tbl: &str,
        user: &str,
        is_domain: bool,
        privs: PrivBitSet,
    ) -> Result<PrivEntry> {
        PrivEntry::table(host, db, tbl, user, is_domain, privs, &self.cfg)
    }

    /// Add privileges, merging with an existing grant to the same subject
    pub fn grant(&self, entry: PrivEntry) -> Result<()> {
        debug!(entry = %entry, "grant");
        self.table_for(entry.kind()).add(entry, false, false)?;
        Ok(())
    }

    /// Remove the privileges carried by `entry` from the grant with the same key
    pub fn revoke(&self, entry: &PrivEntry, err_on_non_exist: bool) -> Result<()> {
        debug!(entry = %entry, "revoke");
        self.table_for(entry.kind()).revoke(entry, entry.privs(), err_on_non_exist)?;
        Ok(())
    }

    /// Remove every entry of `user`. Returns the number removed.
    pub fn drop_user(&self, user: &str) -> usize {
        let n: usize = self.tables().iter().map(|t| t.remove_where(|e| e.user() == user)).sum();
        debug!(user, removed = n, "drop user");
        n
    }

    pub fn clear(&self) {
        for t in self.tables() {
            t.clear();
        }
    }

    pub fn global_privs(&self, host: &str, user: &str) -> PrivBitSet {
        self.global.privs_for(host, user, None, None)
    }

    pub fn db_privs(&self, host: &str, user: &str, db: &str) -> PrivBitSet {
        self.global_privs(host, user) | self.db.privs_for(host, user, Some(db), None)
    }

    pub fn tbl_privs(&self, host: &str, user: &str, db: &str, tbl: &str) -> PrivBitSet {
        self.db_privs(host, user, db) | self.table.privs_for(host, user, Some(db), Some(tbl))
    }

    pub fn check_global_priv(&self, host: &str, user: &str, want: &PrivPredicate) -> bool {
        self.global_privs(host, user).satisfy(want)
    }

    pub fn check_db_priv(&self, host: &str, user: &str, db: &str, want: &PrivPredicate) -> bool {
        self.db_privs(host, user, db).satisfy(want)
    }

    pub fn check_tbl_priv(&self, host: &str, user: &str, db: &str, tbl: &str, want: &PrivPredicate) -> bool {
        self.tbl_privs(host, user, db, tbl).satisfy(want)
    }

    /// Grants of `user`, global first, each table in priority order
    pub fn show_grants(&self, user: &str) -> Vec<GrantRow> {
        let mut rows = Vec::new();
        for t in self.tables() {
            for e in t.entries().iter().filter(|e| e.user() == user) {
                rows.push(GrantRow {
                    identity: e.user_identity(),
                    grant: e.to_grant_sql(),
                    privileges: e.privs().iter().map(Privilege::name).collect(),
                    set_by_domain_resolver: e.is_set_by_domain_resolver(),
                });
            }
        }
        rows
    }
}
