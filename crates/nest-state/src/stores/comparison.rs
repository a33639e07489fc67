//! Dual-backend comparison list store.
//!
//! An ordered list of property identifiers, capped at [`MAX_COMPARE`],
//! persisted to local device storage while anonymous and to the remote
//! per-user resource while signed in. Every identity transition re-runs
//! [`ComparisonStore::init`], which replaces the in-memory list with
//! whatever the new backend holds; the two sources are never merged.

use std::sync::{Arc, Mutex as StdMutex, Weak};

use serde_json::json;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use nest_types::{Identity, Notice};

use crate::gateway::Gateway;
use crate::local::LocalStore;
use crate::stores::{Changelog, MutationRecord};

/// Maximum number of properties that can be compared at once.
pub const MAX_COMPARE: usize = 3;

/// Storage target, computed once per identity transition and threaded
/// explicitly into init and save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Local,
    Remote(String),
}

impl Backend {
    pub fn for_identity(identity: Option<&Identity>) -> Self {
        match identity {
            Some(identity) => Backend::Remote(identity.uid.clone()),
            None => Backend::Local,
        }
    }
}

fn comparison_endpoint(uid: &str) -> String {
    format!("/api/users/{uid}/comparison-list")
}

/// Reactive comparison list.
pub struct ComparisonStore {
    gateway: Arc<Gateway>,
    local: LocalStore,
    identity_rx: watch::Receiver<Option<Identity>>,
    notices: mpsc::UnboundedSender<Notice>,
    /// Source of truth; the async mutex serializes every read-modify-write
    /// mutator body so the cap and uniqueness invariants hold under
    /// concurrent callers.
    items: Mutex<Vec<String>>,
    state_tx: watch::Sender<Vec<String>>,
    backend: StdMutex<Backend>,
    changelog: Changelog,
    tasks: StdMutex<Vec<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl ComparisonStore {
    /// Creates the store, runs the initial [`ComparisonStore::init`], and
    /// starts a watcher that re-runs it on every identity transition.
    pub async fn spawn(
        gateway: Arc<Gateway>,
        local: LocalStore,
        identity_rx: watch::Receiver<Option<Identity>>,
        notices: mpsc::UnboundedSender<Notice>,
    ) -> Arc<Self> {
        let store = Arc::new(Self {
            gateway,
            local,
            identity_rx: identity_rx.clone(),
            notices,
            items: Mutex::new(Vec::new()),
            state_tx: watch::Sender::new(Vec::new()),
            backend: StdMutex::new(Backend::Local),
            changelog: Changelog::default(),
            tasks: StdMutex::new(Vec::new()),
            cancel: CancellationToken::new(),
        });

        let weak: Weak<Self> = Arc::downgrade(&store);
        let cancel = store.cancel.clone();
        let mut identity_rx = identity_rx;
        // Mark before the inline init: a transition racing construction then
        // re-fires the watcher instead of being swallowed.
        identity_rx.mark_unchanged();
        store.init().await;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    changed = identity_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                identity_rx.borrow_and_update();
                match weak.upgrade() {
                    Some(store) => store.init().await,
                    None => break,
                }
            }
        });

        store
    }

    /// Subscribes to list changes.
    pub fn subscribe(&self) -> watch::Receiver<Vec<String>> {
        self.state_tx.subscribe()
    }

    /// Current list snapshot.
    pub fn items(&self) -> Vec<String> {
        self.state_tx.borrow().clone()
    }

    /// Re-initializes from the backend selected by the current identity.
    ///
    /// Remote fetch failures keep the previous in-memory state; malformed
    /// local data yields an empty list. Neither is surfaced to the user.
    pub async fn init(&self) {
        let backend = Backend::for_identity(self.identity_rx.borrow().as_ref());
        let mut items = self.items.lock().await;

        match &backend {
            Backend::Remote(uid) => match self.gateway.get(&comparison_endpoint(uid)).await {
                Ok(response) if response.status().is_success() => {
                    match response.json::<Vec<String>>().await {
                        Ok(ids) => *items = ids,
                        Err(err) => {
                            warn!(error = %err, "failed to decode comparison list");
                        }
                    }
                }
                Ok(response) => {
                    warn!(status = %response.status(), "comparison list fetch rejected");
                }
                Err(err) => {
                    warn!(error = %err, "failed to fetch comparison list");
                }
            },
            Backend::Local => {
                *items = self.local.load_comparison();
            }
        }

        debug!(?backend, count = items.len(), "comparison list initialized");
        *self.backend.lock().expect("backend mutex poisoned") = backend;
        self.publish(&items);
    }

    /// Appends `id` unless it is already present or the list is at capacity.
    ///
    /// Both rejections emit a notice and leave the list untouched; no
    /// persistence call is made for a rejected add.
    pub async fn add(&self, id: &str) {
        let mut items = self.items.lock().await;

        if items.iter().any(|existing| existing == id) {
            self.notify(Notice::info("Property already in comparison"));
            return;
        }
        if items.len() >= MAX_COMPARE {
            self.notify(Notice::warning(
                "You can compare up to 3 properties. Please remove one first.",
            ));
            return;
        }

        items.push(id.to_string());
        self.publish(&items);
        self.notify(Notice::success("Added to comparison"));
        self.persist(items.clone(), "add");
    }

    /// Removes `id` and persists unconditionally, even when absent.
    pub async fn remove(&self, id: &str) {
        let mut items = self.items.lock().await;
        items.retain(|existing| existing != id);
        self.publish(&items);
        self.notify(Notice::info("Removed from comparison"));
        self.persist(items.clone(), "remove");
    }

    /// Removes `id` if present, otherwise delegates to the full add
    /// validation path (so toggling onto a full list still produces the
    /// capacity notice).
    pub async fn toggle(&self, id: &str) {
        let present = self.items.lock().await.iter().any(|existing| existing == id);
        if present {
            self.remove(id).await;
        } else {
            self.add(id).await;
        }
    }

    /// Empties the list and persists.
    pub async fn clear(&self) {
        let mut items = self.items.lock().await;
        items.clear();
        self.publish(&items);
        self.notify(Notice::info("Comparison list cleared"));
        self.persist(items.clone(), "clear");
    }

    /// Waits for all spawned persistence calls to settle. Test hook; the
    /// mutators themselves never block on persistence.
    pub async fn flush(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut tasks = self.tasks.lock().expect("tasks mutex poisoned");
            tasks.drain(..).collect()
        };
        for handle in handles {
            let _ = handle.await;
        }
    }

    /// Snapshot of the mutation ledger.
    pub fn changelog(&self) -> Vec<MutationRecord> {
        self.changelog.records()
    }

    /// Stops the identity watcher.
    pub fn dispose(&self) {
        self.cancel.cancel();
    }

    fn publish(&self, items: &[String]) {
        self.state_tx.send_replace(items.to_vec());
    }

    fn notify(&self, notice: Notice) {
        let _ = self.notices.send(notice);
    }

    /// Fires a background save of the full list.
    ///
    /// The backend is captured here, at mutation time, so a save resolving
    /// after an identity transition still writes to the backend that owned
    /// the mutation instead of leaking into the new one.
    fn persist(&self, items: Vec<String>, op: &'static str) {
        let backend = self
            .backend
            .lock()
            .expect("backend mutex poisoned")
            .clone();
        let seq = self.changelog.begin(op);
        let changelog = self.changelog.clone();
        let gateway = Arc::clone(&self.gateway);
        let local = self.local.clone();

        let handle = tokio::spawn(async move {
            let ok = match backend {
                Backend::Local => match local.save_comparison(&items) {
                    Ok(()) => true,
                    Err(err) => {
                        error!(error = %err, "failed to save comparison list locally");
                        false
                    }
                },
                Backend::Remote(uid) => {
                    let body = json!({ "propertyIds": items });
                    match gateway.put_json(&comparison_endpoint(&uid), body).await {
                        Ok(response) if response.status().is_success() => true,
                        Ok(response) => {
                            error!(status = %response.status(), "comparison list sync rejected");
                            false
                        }
                        Err(err) => {
                            error!(error = %err, "failed to sync comparison list");
                            false
                        }
                    }
                }
            };
            changelog.resolve(seq, ok);
        });

        self.tasks
            .lock()
            .expect("tasks mutex poisoned")
            .push(handle);
    }
}

impl Drop for ComparisonStore {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
