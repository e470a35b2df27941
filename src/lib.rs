//! privbit - MySQL-compatible privilege entries and bitmask matching
//!
//! Grants are `PrivEntry` values binding a host pattern, a user and a
//! resource pattern to a `PrivBitSet`. Entries of one kind live in a
//! `PrivTable` ordered by specificity; an authorization check takes the
//! first entry that matches the request and tests its mask against a
//! `PrivPredicate`.

pub mod bitset;
pub mod catalog;
pub mod codec;
pub mod config;
pub mod constants;
pub mod entry;
pub mod error;
pub mod grant;
pub mod keys;
pub mod pattern;
pub mod privilege;
pub mod resolver;
pub mod store;
pub mod table;

pub use bitset::{PredicateOp, PrivBitSet, PrivPredicate};
pub use catalog::{GrantRow, PrivCatalog};
pub use config::{CaseSensitivity, PrivConfig};
pub use constants::{name_from_full_name, ANY_DB, ANY_TBL, INFO_SCHEMA_DB};
pub use entry::{EntryKind, EntryScope, PrivEntry};
pub use error::{PrivError, Result};
pub use grant::{grant_sql, TablePattern, UserIdentity};
pub use pattern::PatternMatcher;
pub use privilege::Privilege;
pub use resolver::{DomainResolver, HostResolver, RefreshStats, ResolverDaemon, SystemResolver};
pub use store::PrivStore;
pub use table::{DerivedPut, PrivTable};
