//! GRANT statement rendering

use std::fmt;

use serde::Serialize;

use crate::bitset::PrivBitSet;

/// `'user'@'host'`, or `'user'@['domain']` for a domain grant
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UserIdentity {
    pub user: String,
    pub host: String,
    pub is_domain: bool,
}

impl UserIdentity {
    pub fn new(user: impl Into<String>, host: impl Into<String>, is_domain: bool) -> Self {
        UserIdentity { user: user.into(), host: host.into(), is_domain }
    }
}

impl fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_domain {
            write!(f, "'{}'@['{}']", self.user, self.host)
        } else {
            write!(f, "'{}'@'{}'", self.user, self.host)
        }
    }
}

/// Resource a grant applies to: `*.*`, `db.*` or `db.tbl`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePattern {
    pub db: String,
    pub tbl: String,
}

impl TablePattern {
    pub fn new(db: impl Into<String>, tbl: impl Into<String>) -> Self {
        TablePattern { db: db.into(), tbl: tbl.into() }
    }
}

impl fmt::Display for TablePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.db, self.tbl)
    }
}

pub fn grant_sql(user: &UserIdentity, on: &TablePattern, privs: PrivBitSet) -> String {
    let names: Vec<&str> = privs.iter().map(|p| p.name()).collect();
    format!("GRANT {} ON {} TO {}", names.join(", "), on, user)
}
