//! Notification inbox store.
//!
//! Remote-sourced collection of notifications with optimistic mutators and
//! a derived unread count. Mutations apply to memory synchronously and
//! confirm against the service in the background; nothing is rolled back on
//! failure. Deletion is the only mutator that reports failure to the user,
//! because silently losing a destructive action would be misleading.

use std::sync::{Arc, Mutex as StdMutex, Weak};

use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use nest_types::{Identity, Notice, Notification};

use crate::gateway::Gateway;
use crate::stores::{Changelog, MutationRecord};

/// Pure unread projection; performs no I/O.
pub fn count_unread(items: &[Notification]) -> usize {
    items.iter().filter(|n| !n.read).count()
}

/// Reactive notification inbox.
pub struct InboxStore {
    gateway: Arc<Gateway>,
    notices: mpsc::UnboundedSender<Notice>,
    /// Source of truth; serializes every read-modify-write mutator body.
    items: Mutex<Vec<Notification>>,
    state_tx: watch::Sender<Vec<Notification>>,
    unread_tx: watch::Sender<usize>,
    changelog: Changelog,
    tasks: StdMutex<Vec<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl InboxStore {
    /// Creates the store, runs the initial fetch when signed in, and starts
    /// an identity watcher.
    ///
    /// On every identity transition the store refetches when signed in and
    /// clears in memory when signed out; there is no local fallback, and
    /// stale records must not survive a sign-out.
    pub async fn spawn(
        gateway: Arc<Gateway>,
        identity_rx: watch::Receiver<Option<Identity>>,
        notices: mpsc::UnboundedSender<Notice>,
    ) -> Arc<Self> {
        let store = Arc::new(Self {
            gateway,
            notices,
            items: Mutex::new(Vec::new()),
            state_tx: watch::Sender::new(Vec::new()),
            unread_tx: watch::Sender::new(0),
            changelog: Changelog::default(),
            tasks: StdMutex::new(Vec::new()),
            cancel: CancellationToken::new(),
        });

        let weak: Weak<Self> = Arc::downgrade(&store);
        let cancel = store.cancel.clone();
        let mut identity_rx = identity_rx;
        // Mark before the inline fetch: a transition racing construction
        // then re-fires the watcher instead of being swallowed.
        identity_rx.mark_unchanged();
        if identity_rx.borrow().is_some() {
            store.fetch().await;
        }
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
                let signed_in = identity_rx.borrow_and_update().is_some();
                match weak.upgrade() {
                    Some(store) => {
                        if signed_in {
                            store.fetch().await;
                        } else {
                            store.clear_in_memory().await;
                        }
                    }
                    None => break,
                }
            }
        });

        store
    }

    /// Subscribes to collection changes.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Notification>> {
        self.state_tx.subscribe()
    }

    /// Subscribes to the derived unread count.
    pub fn subscribe_unread(&self) -> watch::Receiver<usize> {
        self.unread_tx.subscribe()
    }

    /// Current collection snapshot.
    pub fn items(&self) -> Vec<Notification> {
        self.state_tx.borrow().clone()
    }

    /// Current unread count.
    pub fn unread_count(&self) -> usize {
        *self.unread_tx.borrow()
    }

    /// Refreshes the collection from the service.
    ///
    /// A background refresh: failures keep the previous state and are
    /// logged, never surfaced to the user.
    pub async fn fetch(&self) {
        let mut items = self.items.lock().await;
        match self.gateway.get("/api/notifications/").await {
            Ok(response) if response.status().is_success() => {
                match response.json::<Vec<Notification>>().await {
                    Ok(fetched) => {
                        debug!(count = fetched.len(), "notifications fetched");
                        *items = fetched;
                        self.publish(&items);
                    }
                    Err(err) => {
                        warn!(error = %err, "failed to decode notifications");
                    }
                }
            }
            Ok(response) => {
                warn!(status = %response.status(), "notification fetch rejected");
            }
            Err(err) => {
                warn!(error = %err, "failed to fetch notifications");
            }
        }
    }

    /// Marks one notification read. Optimistic; no user feedback — reading
    /// a single notification is incidental, unlike the bulk action.
    pub async fn mark_as_read(&self, id: &str) {
        {
            let mut items = self.items.lock().await;
            for item in items.iter_mut() {
                if item.id == id {
                    item.read = true;
                }
            }
            self.publish(&items);
        }

        let endpoint = format!("/api/notifications/{id}/read");
        self.confirm("mark_read", move |gateway| async move {
            gateway.put(&endpoint).await
        });
    }

    /// Marks every notification read and surfaces a success notice once the
    /// aggregate call confirms.
    pub async fn mark_all_as_read(&self) {
        {
            let mut items = self.items.lock().await;
            for item in items.iter_mut() {
                item.read = true;
            }
            self.publish(&items);
        }

        let notices = self.notices.clone();
        self.confirm_with("mark_all_read", move |gateway| async move {
            gateway.put("/api/notifications/read-all").await
        }, move |ok| {
            if ok {
                let _ = notices.send(Notice::success("All marked as read"));
            }
        });
    }

    /// Deletes a notification. The record leaves memory synchronously; the
    /// remote outcome is reported either way.
    pub async fn delete(&self, id: &str) {
        {
            let mut items = self.items.lock().await;
            items.retain(|item| item.id != id);
            self.publish(&items);
        }

        let notices = self.notices.clone();
        let endpoint = format!("/api/notifications/{id}");
        self.confirm_with("delete", move |gateway| async move {
            gateway.delete(&endpoint).await
        }, move |ok| {
            if ok {
                let _ = notices.send(Notice::success("Notification deleted"));
            } else {
                let _ = notices.send(Notice::error("Failed to delete notification"));
            }
        });
    }

    /// Waits for all spawned confirmation calls to settle. Test hook.
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

    async fn clear_in_memory(&self) {
        let mut items = self.items.lock().await;
        items.clear();
        self.publish(&items);
    }

    fn publish(&self, items: &[Notification]) {
        self.state_tx.send_replace(items.to_vec());
        self.unread_tx.send_replace(count_unread(items));
    }

    fn confirm<F, Fut>(&self, op: &'static str, call: F)
    where
        F: FnOnce(Arc<Gateway>) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<reqwest::Response>> + Send + 'static,
    {
        self.confirm_with(op, call, |_| {});
    }

    /// Fires a background confirmation call and runs `on_settled` with the
    /// outcome. Failures are logged; the optimistic state stands.
    fn confirm_with<F, Fut, S>(&self, op: &'static str, call: F, on_settled: S)
    where
        F: FnOnce(Arc<Gateway>) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<reqwest::Response>> + Send + 'static,
        S: FnOnce(bool) + Send + 'static,
    {
        let seq = self.changelog.begin(op);
        let changelog = self.changelog.clone();
        let gateway = Arc::clone(&self.gateway);

        let handle = tokio::spawn(async move {
            let ok = match call(gateway).await {
                Ok(response) if response.status().is_success() => true,
                Ok(response) => {
                    error!(%op, status = %response.status(), "notification mutation rejected");
                    false
                }
                Err(err) => {
                    error!(%op, error = %err, "notification mutation failed");
                    false
                }
            };
            changelog.resolve(seq, ok);
            on_settled(ok);
        });

        self.tasks
            .lock()
            .expect("tasks mutex poisoned")
            .push(handle);
    }
}

impl Drop for InboxStore {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
