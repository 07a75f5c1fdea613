//! Custodian login state machine.
//!
//! ```text
//! Unauthenticated ──login──▶ Authenticating ──ok──▶ Authenticated
//!        ▲                          │
//!        └──────────failed──────────┘
//! ```
//!
//! Every store owns one [`SessionGate`]. Logins are serialized by an
//! async lock, so two concurrent `login_cloud` calls run the provider's
//! sign-in flow at most once.

use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};

use outblock_types::{OutblockError, Result};
use tokio::sync::Mutex;

/// Login state of a custodian session.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum LoginState {
    /// No session.
    Unauthenticated = 0,
    /// A login is in progress.
    Authenticating = 1,
    /// A session is established.
    Authenticated = 2,
}

impl LoginState {
    fn from_u8(value: u8) -> Self {
        match value {
            2 => Self::Authenticated,
            1 => Self::Authenticating,
            _ => Self::Unauthenticated,
        }
    }
}

/// Serialized login with a readable state.
#[derive(Debug)]
pub struct SessionGate {
    state: AtomicU8,
    login_lock: Mutex<()>,
}

impl Default for SessionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionGate {
    /// Creates an unauthenticated gate.
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(LoginState::Unauthenticated as u8),
            login_lock: Mutex::new(()),
        }
    }

    /// Current state.
    pub fn state(&self) -> LoginState {
        LoginState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Returns `true` if a session is established.
    pub fn is_authenticated(&self) -> bool {
        self.state() == LoginState::Authenticated
    }

    fn set(&self, state: LoginState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Runs `sign_in` unless already authenticated.
    ///
    /// A failed sign-in leaves the gate unauthenticated and returns the
    /// sign-in error.
    pub async fn login<F, Fut>(&self, sign_in: F) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let _guard = self.login_lock.lock().await;
        if self.is_authenticated() {
            return Ok(());
        }

        self.set(LoginState::Authenticating);
        match sign_in().await {
            Ok(()) => {
                self.set(LoginState::Authenticated);
                Ok(())
            }
            Err(e) => {
                self.set(LoginState::Unauthenticated);
                Err(e)
            }
        }
    }

    /// Makes sure a session exists, trying `restore` without user
    /// interaction if not.
    ///
    /// # Errors
    ///
    /// Returns [`OutblockError::Unauthorized`] if `restore` reports no
    /// session, or `restore`'s own error.
    pub async fn ensure_authenticated<F, Fut>(&self, provider: &str, restore: F) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        if self.is_authenticated() {
            return Ok(());
        }
        let restored = self
            .login(|| async {
                if restore().await? {
                    Ok(())
                } else {
                    Err(OutblockError::Unauthorized {
                        reason: format!("no {provider} session"),
                    })
                }
            })
            .await;
        if let Err(e) = &restored {
            tracing::debug!(provider, error = %e, "silent login failed");
        }
        restored
    }

    /// Drops the session, e.g. after the provider revoked it.
    pub fn invalidate(&self) {
        self.set(LoginState::Unauthenticated);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
