//! Integration tests for grant, revoke and authorization checks

use std::sync::Arc;
use std::thread;

use privbit::*;
use Privilege::*;

fn catalog() -> PrivCatalog {
    PrivCatalog::new(PrivConfig::default())
}

// === Grant / Check ===

#[test]
fn test_grant_and_check() {
    let c = catalog();
    c.grant(c.db_entry("%", "sales", "a", false, PrivBitSet::of(&[Select, Load])).unwrap()).unwrap();

    assert!(c.check_db_priv("1.2.3.4", "a", "sales", &PrivPredicate::SELECT));
    assert!(c.check_db_priv("1.2.3.4", "a", "sales", &PrivPredicate::LOAD));
    assert!(!c.check_db_priv("1.2.3.4", "a", "sales", &PrivPredicate::DROP));
    assert!(!c.check_db_priv("1.2.3.4", "a", "hr", &PrivPredicate::SELECT));
    assert!(!c.check_db_priv("1.2.3.4", "b", "sales", &PrivPredicate::SELECT));
}

#[test]
fn test_grant_accumulates() {
    let c = catalog();
    c.grant(c.db_entry("%", "sales", "a", false, PrivBitSet::of(&[Select])).unwrap()).unwrap();
    c.grant(c.db_entry("%", "sales", "a", false, PrivBitSet::of(&[Alter])).unwrap()).unwrap();
    assert_eq!(c.db_privs("h", "a", "sales"), PrivBitSet::of(&[Select, Alter]));
    assert_eq!(c.table_for(EntryKind::Db).len(), 1);
}

#[test]
fn test_revoke() {
    let c = catalog();
    c.grant(c.db_entry("%", "sales", "a", false, PrivBitSet::of(&[Select, Load])).unwrap()).unwrap();
    c.revoke(&c.db_entry("%", "sales", "a", false, PrivBitSet::of(&[Load])).unwrap(), true).unwrap();
    assert_eq!(c.db_privs("h", "a", "sales"), PrivBitSet::of(&[Select]));

    c.revoke(&c.db_entry("%", "sales", "a", false, PrivBitSet::of(&[Select])).unwrap(), true).unwrap();
    assert!(c.table_for(EntryKind::Db).is_empty());

    let r = c.revoke(&c.db_entry("%", "sales", "a", false, PrivBitSet::of(&[Select])).unwrap(), true);
    assert!(matches!(r, Err(PrivError::NoSuchGrant(_))));
}

#[test]
fn test_specific_grant_wins() {
    let c = catalog();
    c.grant(c.db_entry("%", "%", "a", false, PrivBitSet::of(&[Select, Load, Drop])).unwrap()).unwrap();
    c.grant(c.db_entry("10.0.0.1", "sales", "a", false, PrivBitSet::of(&[Select])).unwrap()).unwrap();

    // The literal entry is found first, so the broader one does not apply
    assert!(!c.check_db_priv("10.0.0.1", "a", "sales", &PrivPredicate::DROP));
    assert!(c.check_db_priv("10.0.0.2", "a", "sales", &PrivPredicate::DROP));
}

#[test]
fn test_global_covers_databases() {
    let c = catalog();
    c.grant(c.global_entry("%", "root", false, PrivBitSet::of(&[Admin, Select])).unwrap()).unwrap();
    assert!(c.check_global_priv("h", "root", &PrivPredicate::ADMIN));
    assert!(c.check_db_priv("h", "root", "anything", &PrivPredicate::SELECT));
    assert!(c.check_tbl_priv("h", "root", "anything", "t", &PrivPredicate::SELECT));
}

#[test]
fn test_table_level() {
    let c = catalog();
    c.grant(c.table_entry("%", "sales", "orders", "a", false, PrivBitSet::of(&[Select])).unwrap()).unwrap();
    assert!(c.check_tbl_priv("h", "a", "sales", "orders", &PrivPredicate::SELECT));
    assert!(!c.check_tbl_priv("h", "a", "sales", "ORDERS", &PrivPredicate::SELECT));
    assert!(!c.check_tbl_priv("h", "a", "sales", "refunds", &PrivPredicate::SELECT));
    assert!(!c.check_db_priv("h", "a", "sales", &PrivPredicate::SELECT));
}

#[test]
fn test_all_of_predicate() {
    let c = catalog();
    c.grant(c.db_entry("%", "sales", "a", false, PrivBitSet::of(&[Select])).unwrap()).unwrap();
    let both = PrivPredicate::all_of(PrivBitSet::of(&[Select, Load]));
    assert!(!c.check_db_priv("h", "a", "sales", &both));
    c.grant(c.db_entry("%", "sales", "a", false, PrivBitSet::of(&[Load])).unwrap()).unwrap();
    assert!(c.check_db_priv("h", "a", "sales", &both));
}

#[test]
fn test_host_patterns() {
    let c = catalog();
    c.grant(c.db_entry("192.168.%", "sales", "a", false, PrivBitSet::of(&[Select])).unwrap()).unwrap();
    c.grant(c.db_entry("DB-HOST", "sales", "b", false, PrivBitSet::of(&[Select])).unwrap()).unwrap();
    assert!(c.check_db_priv("192.168.7.7", "a", "sales", &PrivPredicate::SELECT));
    assert!(!c.check_db_priv("10.0.0.1", "a", "sales", &PrivPredicate::SELECT));
    // hosts are case-insensitive by default
    assert!(c.check_db_priv("db-host", "b", "sales", &PrivPredicate::SELECT));
}

#[test]
fn test_cluster_qualified_info_schema() {
    let c = catalog();
    c.grant(c.db_entry("%", "default_cluster:information_schema", "a", false, PrivBitSet::of(&[Select])).unwrap())
        .unwrap();
    assert!(c.check_db_priv("h", "a", "default_cluster:INFORMATION_SCHEMA", &PrivPredicate::SELECT));
}

// === Show grants ===

#[test]
fn test_show_grants() {
    let c = catalog();
    c.grant(c.global_entry("%", "a", false, PrivBitSet::of(&[Grant])).unwrap()).unwrap();
    c.grant(c.db_entry("%", "sales", "a", false, PrivBitSet::of(&[Select, Load])).unwrap()).unwrap();

    let rows = c.show_grants("a");
    let sql: Vec<&str> = rows.iter().map(|r| r.grant.as_str()).collect();
    assert_eq!(
        sql,
        vec!["GRANT Grant_priv ON *.* TO 'a'@'%'", "GRANT Select_priv, Load_priv ON sales.* TO 'a'@'%'"]
    );
    assert_eq!(rows[1].privileges, vec!["Select_priv", "Load_priv"]);

    let json = serde_json::to_value(&rows[1]).unwrap();
    assert_eq!(json["identity"]["user"], "a");
    assert_eq!(json["set_by_domain_resolver"], false);
}

// === Concurrency ===

#[test]
fn test_readers_during_writes() {
    let c = Arc::new(catalog());
    c.grant(c.db_entry("%", "sales", "reader", false, PrivBitSet::of(&[Select])).unwrap()).unwrap();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let c = c.clone();
            thread::spawn(move || {
                for _ in 0..2_000 {
                    assert!(c.check_db_priv("h", "reader", "sales", &PrivPredicate::SELECT));
                }
            })
        })
        .collect();

    for i in 0..200 {
        let e = c.db_entry("%", &format!("db{}", i), "writer", false, PrivBitSet::of(&[Load])).unwrap();
        c.grant(e.clone()).unwrap();
        if i % 2 == 0 {
            c.revoke(&e, true).unwrap();
        }
    }

    for r in readers {
        r.join().unwrap();
    }
    assert_eq!(c.show_grants("writer").len(), 100);
}
