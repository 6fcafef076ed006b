//! Version lifecycle: install → activate → ready.
//!
//! One `Lifecycle` exists per deployed version and only ever moves forward:
//! `Installing → Installed → Activating → Active`. Install population and
//! activation cleanup are both fully awaited before the next phase begins.

use std::collections::BTreeMap;

use serde::Serialize;
use swcache_core::Error;
use tokio::sync::watch;

use crate::generations::{GenerationManager, InstallReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    Installing,
    Installed,
    Activating,
    Active,
}

impl LifecyclePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecyclePhase::Installing => "installing",
            LifecyclePhase::Installed => "installed",
            LifecyclePhase::Activating => "activating",
            LifecyclePhase::Active => "active",
        }
    }

    fn next(self) -> Option<Self> {
        match self {
            LifecyclePhase::Installing => Some(LifecyclePhase::Installed),
            LifecyclePhase::Installed => Some(LifecyclePhase::Activating),
            LifecyclePhase::Activating => Some(LifecyclePhase::Active),
            LifecyclePhase::Active => None,
        }
    }
}

/// Result of a completed activation.
#[derive(Debug, Clone, Serialize)]
pub struct ActivationReport {
    pub deleted: Vec<String>,
    pub claimed: usize,
}

/// Open consumers and the version controlling each of them.
///
/// Hosts register their consumers here (the MCP server registers its stdio
/// session, and `sw_clients` lets callers add more) so activation can claim
/// them or wait for older versions to let go.
#[derive(Debug)]
pub struct Clients {
    controllers: watch::Sender<BTreeMap<String, Option<String>>>,
}

impl Default for Clients {
    fn default() -> Self {
        let (controllers, _) = watch::channel(BTreeMap::new());
        Self { controllers }
    }
}

impl Clients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a consumer, optionally already controlled by `version`.
    pub fn connect(&self, id: &str, version: Option<&str>) {
        self.controllers.send_modify(|map| {
            map.insert(id.to_string(), version.map(String::from));
        });
    }

    pub fn disconnect(&self, id: &str) {
        self.controllers.send_modify(|map| {
            map.remove(id);
        });
    }

    /// Every registered consumer with its controlling version, ordered by id.
    pub fn list(&self) -> Vec<(String, Option<String>)> {
        self.controllers.borrow().iter().map(|(id, version)| (id.clone(), version.clone())).collect()
    }

    pub fn controller(&self, id: &str) -> Option<String> {
        self.controllers.borrow().get(id).cloned().flatten()
    }

    pub fn len(&self) -> usize {
        self.controllers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take control of every open consumer. Returns how many changed controller.
    pub fn claim(&self, version: &str) -> usize {
        let mut claimed = 0;
        self.controllers.send_modify(|map| {
            for controller in map.values_mut() {
                if controller.as_deref() != Some(version) {
                    *controller = Some(version.to_string());
                    claimed += 1;
                }
            }
        });
        claimed
    }

    /// Resolve once no consumer is controlled by a version other than `version`.
    pub async fn released(&self, version: &str) {
        let mut rx = self.controllers.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx
            .wait_for(|map| map.values().flatten().all(|controller| controller == version))
            .await;
    }
}

/// Phase machine for one deployed version.
#[derive(Debug)]
pub struct Lifecycle {
    version: String,
    phase: watch::Sender<LifecyclePhase>,
    skip_waiting: bool,
    claim_clients: bool,
}

impl Lifecycle {
    pub fn new(version: &str, skip_waiting: bool, claim_clients: bool) -> Self {
        let (phase, _) = watch::channel(LifecyclePhase::Installing);
        Self { version: version.to_string(), phase, skip_waiting, claim_clients }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Whether activation takes control of open consumers.
    pub fn claims_clients(&self) -> bool {
        self.claim_clients
    }

    pub fn phase(&self) -> LifecyclePhase {
        *self.phase.borrow()
    }

    pub fn is_active(&self) -> bool {
        self.phase() == LifecyclePhase::Active
    }

    /// Watch phase changes.
    pub fn subscribe(&self) -> watch::Receiver<LifecyclePhase> {
        self.phase.subscribe()
    }

    fn advance(&self, to: LifecyclePhase) -> Result<(), Error> {
        let from = self.phase();
        if from.next() != Some(to) {
            return Err(Error::Lifecycle(format!("cannot move from {from:?} to {to:?}")));
        }
        self.phase.send_replace(to);
        tracing::info!(version = %self.version, from = ?from, to = ?to, "lifecycle transition");
        Ok(())
    }

    fn require(&self, phase: LifecyclePhase) -> Result<(), Error> {
        let current = self.phase();
        if current != phase {
            return Err(Error::Lifecycle(format!("expected {phase:?}, found {current:?}")));
        }
        Ok(())
    }

    /// Populate the static shell and move to `Installed`.
    ///
    /// Partial population still installs. If the offline document cannot be
    /// secured the phase stays `Installing` and this version never activates.
    pub async fn install(&self, generations: &GenerationManager, shell: &[String]) -> Result<InstallReport, Error> {
        self.require(LifecyclePhase::Installing)?;
        let report = generations.populate_static_shell(shell).await?;
        self.advance(LifecyclePhase::Installed)?;
        Ok(report)
    }

    /// Remove stale generations, move to `Active`, then claim open consumers.
    ///
    /// Without skip-waiting, activation first waits until no consumer is
    /// controlled by another version.
    pub async fn activate(
        &self, generations: &GenerationManager, clients: &Clients,
    ) -> Result<ActivationReport, Error> {
        self.require(LifecyclePhase::Installed)?;

        if !self.skip_waiting {
            tracing::info!(version = %self.version, "waiting for consumers of older versions");
            clients.released(&self.version).await;
        }

        self.advance(LifecyclePhase::Activating)?;
        let deleted = generations.reconcile(&self.version).await?;
        self.advance(LifecyclePhase::Active)?;

        let claimed = if self.claim_clients { clients.claim(&self.version) } else { 0 };
        if claimed > 0 {
            tracing::info!(version = %self.version, claimed, "claimed open consumers");
        }

        Ok(ActivationReport { deleted: deleted.into_iter().collect(), claimed })
    }

    /// Run install then activate.
    pub async fn run(
        &self, generations: &GenerationManager, clients: &Clients, shell: &[String],
    ) -> Result<(InstallReport, ActivationReport), Error> {
        let installed = self.install(generations, shell).await?;
        let activated = self.activate(generations, clients).await?;
        Ok((installed, activated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use swcache_core::{CacheRole, CacheStore, MemoryStore};
    use url::Url;

    use crate::testing::{FailingPutStore, FakeNetwork, ORIGIN};

    fn manager(store: Arc<dyn CacheStore>, version: &str) -> GenerationManager {
        let network = FakeNetwork::new();
        network.respond("/", 200, "home");
        network.respond("/offline.html", 200, "offline");
        GenerationManager::new(store, network, "snipmaster", version, Url::parse(ORIGIN).unwrap(), "/offline.html")
    }

    fn shell() -> Vec<String> {
        vec!["/".into(), "/offline.html".into()]
    }

    #[tokio::test]
    async fn test_phases_advance_in_order() {
        let store = Arc::new(MemoryStore::new());
        let mgr = manager(store, "v1");
        let lifecycle = Lifecycle::new("v1", true, true);
        let clients = Clients::new();

        assert_eq!(lifecycle.phase(), LifecyclePhase::Installing);
        lifecycle.install(&mgr, &shell()).await.unwrap();
        assert_eq!(lifecycle.phase(), LifecyclePhase::Installed);
        assert!(!lifecycle.is_active());

        lifecycle.activate(&mgr, &clients).await.unwrap();
        assert!(lifecycle.is_active());
    }

    #[tokio::test]
    async fn test_no_backward_or_skipped_transitions() {
        let store = Arc::new(MemoryStore::new());
        let mgr = manager(store, "v1");
        let lifecycle = Lifecycle::new("v1", true, true);
        let clients = Clients::new();

        assert!(matches!(lifecycle.activate(&mgr, &clients).await, Err(Error::Lifecycle(_))));
        assert_eq!(lifecycle.phase(), LifecyclePhase::Installing);

        lifecycle.run(&mgr, &clients, &shell()).await.unwrap();
        assert!(matches!(lifecycle.install(&mgr, &shell()).await, Err(Error::Lifecycle(_))));
        assert!(matches!(lifecycle.activate(&mgr, &clients).await, Err(Error::Lifecycle(_))));
        assert!(matches!(lifecycle.advance(LifecyclePhase::Installing), Err(Error::Lifecycle(_))));
        assert!(lifecycle.is_active());
    }

    #[tokio::test]
    async fn test_failed_install_never_activates() {
        let store = Arc::new(FailingPutStore::default());
        let mgr = manager(store, "v1");
        let lifecycle = Lifecycle::new("v1", true, true);

        assert!(lifecycle.install(&mgr, &shell()).await.is_err());
        assert_eq!(lifecycle.phase(), LifecyclePhase::Installing);
    }

    #[tokio::test]
    async fn test_activation_reconciles_before_active() {
        let store = Arc::new(MemoryStore::new());
        store.open("snipmaster-static-v0").await.unwrap();
        store.open("snipmaster-dynamic-v0").await.unwrap();

        let mgr = manager(store.clone(), "v1");
        let lifecycle = Lifecycle::new("v1", true, true);
        let clients = Clients::new();
        let (_, activation) = lifecycle.run(&mgr, &clients, &shell()).await.unwrap();

        assert_eq!(activation.deleted, vec!["snipmaster-dynamic-v0", "snipmaster-static-v0"]);
        assert_eq!(store.list_names().await.unwrap(), vec![mgr.name(CacheRole::StaticShell).to_string()]);
    }

    #[tokio::test]
    async fn test_activation_claims_open_clients() {
        let store = Arc::new(MemoryStore::new());
        let mgr = manager(store, "v2");
        let clients = Clients::new();
        clients.connect("tab-1", Some("v1"));
        clients.connect("tab-2", None);

        let lifecycle = Lifecycle::new("v2", true, true);
        let (_, activation) = lifecycle.run(&mgr, &clients, &shell()).await.unwrap();

        assert_eq!(activation.claimed, 2);
        assert_eq!(
            clients.list(),
            vec![("tab-1".to_string(), Some("v2".to_string())), ("tab-2".to_string(), Some("v2".to_string()))]
        );
        assert_eq!(clients.controller("tab-1").as_deref(), Some("v2"));
        assert_eq!(clients.controller("tab-2").as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn test_without_claim_clients_keep_old_controller() {
        let store = Arc::new(MemoryStore::new());
        let mgr = manager(store, "v2");
        let clients = Clients::new();
        clients.connect("tab-1", Some("v1"));

        let lifecycle = Lifecycle::new("v2", true, false);
        let (_, activation) = lifecycle.run(&mgr, &clients, &shell()).await.unwrap();

        assert_eq!(activation.claimed, 0);
        assert_eq!(clients.controller("tab-1").as_deref(), Some("v1"));
    }

    #[tokio::test]
    async fn test_waiting_activation_resumes_when_old_clients_leave() {
        let store = Arc::new(MemoryStore::new());
        let mgr = Arc::new(manager(store, "v2"));
        let clients = Arc::new(Clients::new());
        clients.connect("tab-1", Some("v1"));

        let lifecycle = Arc::new(Lifecycle::new("v2", false, true));
        lifecycle.install(&mgr, &shell()).await.unwrap();

        let task = {
            let (lifecycle, mgr, clients) = (Arc::clone(&lifecycle), Arc::clone(&mgr), Arc::clone(&clients));
            tokio::spawn(async move { lifecycle.activate(&mgr, &clients).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(lifecycle.phase(), LifecyclePhase::Installed);

        clients.disconnect("tab-1");
        let activation = task.await.unwrap().unwrap();
        assert!(lifecycle.is_active());
        assert_eq!(activation.claimed, 0);
    }

    #[tokio::test]
    async fn test_subscribe_observes_active() {
        let store = Arc::new(MemoryStore::new());
        let mgr = manager(store, "v1");
        let lifecycle = Lifecycle::new("v1", true, true);
        let mut rx = lifecycle.subscribe();

        lifecycle.run(&mgr, &Clients::new(), &shell()).await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), LifecyclePhase::Active);
    }
}
