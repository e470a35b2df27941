//! Integration tests for domain grants racing with manual grants

use std::io;
use std::sync::Arc;

use privbit::*;
use Privilege::*;

/// Resolver that issues a manual grant for the address it is about to
/// return, as an administrator might while a refresh is in flight
struct GrantDuringLookup {
    catalog: Arc<PrivCatalog>,
    ip: &'static str,
}

impl HostResolver for GrantDuringLookup {
    fn resolve(&self, _domain: &str) -> io::Result<Vec<String>> {
        let c = &self.catalog;
        c.grant(c.db_entry(self.ip, "sales", "a", false, PrivBitSet::of(&[Drop])).unwrap()).unwrap();
        Ok(vec![self.ip.to_string()])
    }
}

// === Refresh vs grant ===

#[test]
fn test_grant_during_refresh_survives() {
    let c = Arc::new(PrivCatalog::default());
    c.grant(c.db_entry("example.com", "sales", "a", true, PrivBitSet::of(&[Select])).unwrap()).unwrap();

    let r = DomainResolver::new(GrantDuringLookup { catalog: c.clone(), ip: "10.0.0.1" });
    let stats = r.refresh(&c);
    assert_eq!(stats, RefreshStats::default());

    let e = c.table_for(EntryKind::Db).first_match("10.0.0.1", "a", Some("sales"), None).unwrap();
    assert!(!e.is_set_by_domain_resolver());
    assert_eq!(e.privs(), PrivBitSet::of(&[Drop]));
    assert!(c.check_db_priv("10.0.0.1", "a", "sales", &PrivPredicate::DROP));
}

#[test]
fn test_later_refresh_leaves_manual_grant() {
    let c = Arc::new(PrivCatalog::default());
    c.grant(c.db_entry("example.com", "sales", "a", true, PrivBitSet::of(&[Select])).unwrap()).unwrap();
    let r = DomainResolver::new(GrantDuringLookup { catalog: c.clone(), ip: "10.0.0.1" });
    r.refresh(&c);
    r.refresh(&c);

    let db = c.table_for(EntryKind::Db);
    assert_eq!(db.len(), 2);
    assert_eq!(db.entries().iter().filter(|e| e.is_set_by_domain_resolver()).count(), 0);
    assert_eq!(c.db_privs("10.0.0.1", "a", "sales"), PrivBitSet::of(&[Drop]));
}

// === Insert guards ===

#[test]
fn test_decoded_entry_needs_analysis_before_grant() {
    let c = PrivCatalog::default();
    let bytes = c.db_entry("%", "sales", "a", false, PrivBitSet::of(&[Select])).unwrap().to_bytes().unwrap();

    let mut e = PrivEntry::from_bytes(&bytes).unwrap();
    assert!(matches!(c.grant(e.clone()), Err(PrivError::NotAnalysed)));
    assert!(!c.check_db_priv("h", "a", "sales", &PrivPredicate::SELECT));

    e.analyse(c.config()).unwrap();
    c.grant(e).unwrap();
    assert!(c.check_db_priv("h", "a", "sales", &PrivPredicate::SELECT));
}
