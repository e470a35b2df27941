//! Reserved names and markers

/// Any-marker for the database of a grant (`db.*` on every database)
pub const ANY_DB: &str = "*";
/// Any-marker for the table of a grant
pub const ANY_TBL: &str = "*";

/// Pattern text that matches everything
pub const MATCH_ALL: &str = "%";

/// System schema that must be reachable case-insensitively
pub const INFO_SCHEMA_DB: &str = "information_schema";

/// Separator between a cluster namespace and a database name
pub const CLUSTER_SEP: char = ':';

// Type tags written ahead of every serialized entry. These are part of the
// persisted image format and must never change.
pub const GLOBAL_ENTRY_TAG: &str = "com.starrocks.mysql.privilege.GlobalPrivEntry";
pub const DB_ENTRY_TAG: &str = "com.starrocks.mysql.privilege.DbPrivEntry";
pub const TABLE_ENTRY_TAG: &str = "com.starrocks.mysql.privilege.TablePrivEntry";

/// Strip an optional cluster namespace: `default_cluster:sales` -> `sales`.
///
/// The name is the second `:`-separated field. Trailing empty fields do not
/// count, so `c:` has no name and is returned whole.
pub fn name_from_full_name(full: &str) -> &str {
    let mut fields = full.split(CLUSTER_SEP);
    fields.next();
    match fields.next() {
        Some(name) if !name.is_empty() || fields.any(|f| !f.is_empty()) => name,
        _ => full,
    }
}

/// Whether `db` names the information schema, ignoring namespace and case
pub fn is_info_schema(db: &str) -> bool {
    name_from_full_name(db).eq_ignore_ascii_case(INFO_SCHEMA_DB)
}
