//! Identity observation.
//!
//! The identity provider (sign-in, token issuance, verification) is an
//! external collaborator. This module defines the contract the state layer
//! expects from it and the [`AuthObserver`] that turns provider callbacks
//! into reactive cells the rest of the application can subscribe to.

use std::sync::Arc;

use anyhow::Result;
use futures_util::future::BoxFuture;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use nest_types::{IdToken, Identity};

/// Contract expected from the external identity provider.
///
/// The provider owns sign-in flows and token caching; this layer only reads
/// the current identity and asks for bearer tokens on demand.
pub trait IdentityProvider: Send + Sync {
    /// Current identity snapshot, or `None` when signed out.
    fn current(&self) -> Option<Identity>;

    /// Produces a bearer token for the current identity.
    ///
    /// `force_refresh` bypasses the provider's token cache so freshly
    /// assigned claims (e.g. an admin role granted server-side) are
    /// observed without restarting the application.
    fn id_token(&self, force_refresh: bool) -> BoxFuture<'static, Result<IdToken>>;

    /// Identity transition channel. Fires on every sign-in/sign-out.
    fn watch(&self) -> watch::Receiver<Option<Identity>>;
}

/// The three reactive auth cells.
///
/// `is_admin` is eventually consistent: after an identity transition it
/// still reflects the previous value until the claims fetch resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    pub identity: Option<Identity>,
    pub loading: bool,
    pub is_admin: bool,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            identity: None,
            loading: true,
            is_admin: false,
        }
    }
}

/// Subscribes once to the identity provider for its lifetime and publishes
/// [`AuthState`] snapshots on a watch channel.
///
/// Each provider callback forces `loading` true then false exactly once and
/// recomputes `is_admin` from a forced-fresh token.
pub struct AuthObserver {
    state_rx: watch::Receiver<AuthState>,
    cancel: CancellationToken,
}

impl AuthObserver {
    /// Starts observing the provider.
    pub fn spawn(provider: Arc<dyn IdentityProvider>) -> Self {
        let (state_tx, state_rx) = watch::channel(AuthState::default());
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        tokio::spawn(async move {
            let mut identity_rx = provider.watch();
            loop {
                let identity = identity_rx.borrow_and_update().clone();
                state_tx.send_modify(|state| {
                    state.loading = true;
                    state.identity = identity.clone();
                });

                let is_admin = match &identity {
                    Some(identity) => match provider.id_token(true).await {
                        Ok(id_token) => id_token.claims.admin,
                        Err(err) => {
                            warn!(uid = %identity.uid, error = %err, "claims refresh failed; privilege defaults to false");
                            false
                        }
                    },
                    None => false,
                };

                state_tx.send_modify(|state| {
                    state.is_admin = is_admin;
                    state.loading = false;
                });
                debug!(signed_in = identity.is_some(), is_admin, "auth state settled");

                tokio::select! {
                    () = token.cancelled() => break,
                    changed = identity_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Self { state_rx, cancel }
    }

    /// Subscribes to auth state transitions.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state_rx.clone()
    }

    /// Current auth snapshot.
    pub fn state(&self) -> AuthState {
        self.state_rx.borrow().clone()
    }

    /// Stops the observer task.
    pub fn dispose(&self) {
        self.cancel.cancel();
    }
}

impl Drop for AuthObserver {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
