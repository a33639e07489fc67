//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::future::BoxFuture;
use tokio::sync::{mpsc, watch};

use nest_state::IdentityProvider;
use nest_types::{Claims, IdToken, Identity, Notice};

/// In-memory identity provider driven directly by tests.
pub struct FakeProvider {
    identity_tx: watch::Sender<Option<Identity>>,
    token: Mutex<Option<IdToken>>,
}

impl FakeProvider {
    pub fn anonymous() -> Arc<Self> {
        Arc::new(Self {
            identity_tx: watch::Sender::new(None),
            token: Mutex::new(None),
        })
    }

    pub fn signed_in(uid: &str, admin: bool) -> Arc<Self> {
        let provider = Self::anonymous();
        provider.sign_in(uid, admin);
        provider
    }

    pub fn sign_in(&self, uid: &str, admin: bool) {
        *self.token.lock().unwrap() =
            Some(IdToken::new(format!("token-{uid}"), Claims { admin }));
        self.identity_tx.send_replace(Some(Identity::new(uid)));
    }

    pub fn sign_out(&self) {
        *self.token.lock().unwrap() = None;
        self.identity_tx.send_replace(None);
    }

    /// Makes subsequent token requests fail while staying signed in.
    pub fn break_tokens(&self) {
        *self.token.lock().unwrap() = None;
    }
}

impl IdentityProvider for FakeProvider {
    fn current(&self) -> Option<Identity> {
        self.identity_tx.borrow().clone()
    }

    fn id_token(&self, _force_refresh: bool) -> BoxFuture<'static, Result<IdToken>> {
        let token = self.token.lock().unwrap().clone();
        Box::pin(async move { token.context("token refresh failed") })
    }

    fn watch(&self) -> watch::Receiver<Option<Identity>> {
        self.identity_tx.subscribe()
    }
}

/// Notice channel for capturing store output.
pub fn notice_channel() -> (
    mpsc::UnboundedSender<Notice>,
    mpsc::UnboundedReceiver<Notice>,
) {
    mpsc::unbounded_channel()
}

/// Drains every notice queued so far.
pub fn drain_notices(rx: &mut mpsc::UnboundedReceiver<Notice>) -> Vec<Notice> {
    let mut out = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        out.push(notice);
    }
    out
}

/// Waits (bounded) for a watch channel to satisfy a predicate.
pub async fn wait_for<T, F>(rx: &mut watch::Receiver<T>, mut predicate: F) -> T
where
    T: Clone,
    F: FnMut(&T) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let value = rx.borrow_and_update().clone();
            if predicate(&value) {
                return value;
            }
            rx.changed().await.expect("watch channel closed");
        }
    })
    .await
    .expect("timed out waiting for watched state")
}
