//! Privilege catalog
//!
//! Bit indices are persisted inside every serialized mask. Never reorder or
//! reuse an index; append new privileges at the end.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Privilege {
    Node,
    Admin,
    Grant,
    Select,
    Load,
    Alter,
    Create,
    Drop,
    Usage,
    Impersonate,
}

// (privilege, name, description) in index order
const CATALOG: &[(Privilege, &str, &str)] = &[
    (Privilege::Node, "Node_priv", "Privilege for cluster node operations"),
    (Privilege::Admin, "Admin_priv", "Privilege for admin user"),
    (Privilege::Grant, "Grant_priv", "Privilege for granting privilege"),
    (Privilege::Select, "Select_priv", "Privilege for select data in tables"),
    (Privilege::Load, "Load_priv", "Privilege for loading data into tables"),
    (Privilege::Alter, "Alter_priv", "Privilege for alter database or table"),
    (Privilege::Create, "Create_priv", "Privilege for creating database or table"),
    (Privilege::Drop, "Drop_priv", "Privilege for dropping database or table"),
    (Privilege::Usage, "Usage_priv", "Privilege for using resource"),
    (Privilege::Impersonate, "Impersonate_priv", "Privilege for impersonating another user"),
];

// Scope groups
pub const NODE_PRIVS: &[Privilege] = &[Privilege::Node];
pub const RESOURCE_PRIVS: &[Privilege] = &[Privilege::Usage];
pub const IMPERSONATE_PRIVS: &[Privilege] = &[Privilege::Impersonate];
pub const DB_TABLE_PRIVS: &[Privilege] = &[
    Privilege::Select,
    Privilege::Load,
    Privilege::Alter,
    Privilege::Create,
    Privilege::Drop,
];

impl Privilege {
    /// Every privilege, ascending by index
    pub const ALL: [Privilege; 10] = [
        Privilege::Node,
        Privilege::Admin,
        Privilege::Grant,
        Privilege::Select,
        Privilege::Load,
        Privilege::Alter,
        Privilege::Create,
        Privilege::Drop,
        Privilege::Usage,
        Privilege::Impersonate,
    ];

    /// Catalog size
    pub const COUNT: usize = Self::ALL.len();

    #[inline]
    pub fn idx(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        CATALOG[self.idx()].1
    }

    pub fn desc(self) -> &'static str {
        CATALOG[self.idx()].2
    }

    pub fn from_idx(idx: usize) -> Option<Privilege> {
        Self::ALL.get(idx).copied()
    }

    /// Lookup by catalog name or bare keyword, case-insensitive
    /// (`Select_priv`, `SELECT`, `select` all resolve to `Select`).
    pub fn from_name(name: &str) -> Option<Privilege> {
        let name = name.trim();
        CATALOG
            .iter()
            .find(|(_, n, _)| {
                n.eq_ignore_ascii_case(name)
                    || n.strip_suffix("_priv").is_some_and(|k| k.eq_ignore_ascii_case(name))
            })
            .map(|(p, _, _)| *p)
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
