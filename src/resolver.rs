//! Domain grant resolution
//!
//! A domain entry (`'user'@['example.com']`) never matches a client host
//! directly. A background task periodically resolves each domain and
//! materializes one derived entry per address, flagged as set by the
//! resolver so the next refresh can find and retire exactly those entries.

use std::collections::{HashMap, HashSet};
use std::io;
use std::net::ToSocketAddrs;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::catalog::PrivCatalog;
use crate::entry::{EntryScope, PrivEntry};
use crate::table::{DerivedPut, PrivTable};

/// Name service used to expand domain grants
pub trait HostResolver: Send + Sync {
    fn resolve(&self, domain: &str) -> io::Result<Vec<String>>;
}

/// Resolves through the operating system
pub struct SystemResolver;

impl HostResolver for SystemResolver {
    fn resolve(&self, domain: &str) -> io::Result<Vec<String>> {
        let mut ips: Vec<String> = (domain, 0).to_socket_addrs()?.map(|a| a.ip().to_string()).collect();
        ips.sort();
        ips.dedup();
        Ok(ips)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshStats {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
}

// Domain grant identity: domain, user, resource scope
type DomainKey = (String, String, EntryScope);

fn domain_key(e: &PrivEntry, host: &str) -> DomainKey {
    (host.to_string(), e.user().to_string(), e.scope().clone())
}

pub struct DomainResolver<R> {
    resolver: R,
    // addresses each domain grant resolved to on its last success
    last: Mutex<HashMap<DomainKey, Vec<String>>>,
}

impl<R: HostResolver> DomainResolver<R> {
    pub fn new(resolver: R) -> Self {
        DomainResolver { resolver, last: Mutex::new(HashMap::new()) }
    }

    /// Bring derived entries of every table in line with current DNS
    pub fn refresh(&self, catalog: &PrivCatalog) -> RefreshStats {
        let mut stats = RefreshStats::default();
        let mut seen = HashSet::new();
        for t in catalog.tables() {
            self.refresh_table(catalog, t, &mut seen, &mut stats);
        }
        self.last.lock().retain(|k, _| seen.contains(k));
        if stats != RefreshStats::default() {
            debug!(added = stats.added, updated = stats.updated, removed = stats.removed, "domain refresh");
        }
        stats
    }

    fn refresh_table(
        &self,
        catalog: &PrivCatalog,
        table: &PrivTable,
        seen: &mut HashSet<DomainKey>,
        stats: &mut RefreshStats,
    ) {
        let snap = table.entries();
        let mut desired: Vec<PrivEntry> = Vec::new();
        // Derived entries (address, user, scope) of domains that failed to
        // resolve. They stay as they are until a later refresh succeeds.
        let mut kept: HashSet<DomainKey> = HashSet::new();
        // A failed domain with no earlier resolution on record keeps every
        // derived entry of its user and scope
        let mut kept_scopes: HashSet<(String, EntryScope)> = HashSet::new();

        for d in snap.iter().filter(|e| e.is_domain() && !e.is_set_by_domain_resolver()) {
            let key = domain_key(d, d.host());
            seen.insert(key.clone());
            let ips = match self.resolver.resolve(d.host()) {
                Ok(ips) => {
                    self.last.lock().insert(key, ips.clone());
                    ips
                }
                Err(error) => {
                    warn!(domain = d.host(), %error, "failed to resolve domain");
                    match self.last.lock().get(&key) {
                        Some(ips) => kept.extend(ips.iter().map(|ip| domain_key(d, ip))),
                        None => {
                            kept_scopes.insert((d.user().to_string(), d.scope().clone()));
                        }
                    }
                    continue;
                }
            };
            for ip in ips {
                let derived = match d.derived_for_host(&ip, catalog.config()) {
                    Ok(e) => e,
                    Err(error) => {
                        warn!(domain = d.host(), ip = %ip, %error, "skipping resolved address");
                        continue;
                    }
                };
                match desired.iter_mut().find(|x| x.key_match(&derived)) {
                    Some(x) => *x = x.with_privs(x.privs() | derived.privs()),
                    None => desired.push(derived),
                }
            }
        }

        stats.removed += table.remove_where(|e| {
            e.is_set_by_domain_resolver()
                && !kept.contains(&domain_key(e, e.host()))
                && !kept_scopes.contains(&(e.user().to_string(), e.scope().clone()))
                && !desired.iter().any(|d| d.key_match(e))
        });

        for d in desired {
            match table.put_derived(d) {
                Ok(DerivedPut::Added) => stats.added += 1,
                Ok(DerivedPut::Updated) => stats.updated += 1,
                Ok(DerivedPut::Unchanged | DerivedPut::Shadowed) => {}
                Err(error) => warn!(%error, "failed to install resolved entry"),
            }
        }
    }
}

/// Runs `DomainResolver::refresh` on a background thread every `interval`
/// until stopped or dropped.
pub struct ResolverDaemon {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ResolverDaemon {
    pub fn start<R: HostResolver + 'static>(
        resolver: DomainResolver<R>,
        catalog: Arc<PrivCatalog>,
        interval: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::channel::<()>();
        let handle = thread::spawn(move || loop {
            resolver.refresh(&catalog);
            match rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                _ => break,
            }
        });
        ResolverDaemon { stop: Some(tx), handle: Some(handle) }
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(());
        }
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

impl Drop for ResolverDaemon {
    fn drop(&mut self) {
        self.shutdown();
    }
}
