//! The current session/scope as seen by the sync engine

use tokio::sync::watch;

use super::AuthSession;
use crate::remote::Scope;

/// Who is signed in and which group their remote reads/writes target
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub session: Option<AuthSession>,
    pub scope: Option<Scope>,
}

impl SessionContext {
    #[must_use]
    pub const fn signed_out() -> Self {
        Self {
            session: None,
            scope: None,
        }
    }

    #[must_use]
    pub const fn signed_in(session: AuthSession, scope: Option<Scope>) -> Self {
        Self {
            session: Some(session),
            scope,
        }
    }

    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.session.is_some()
    }

    /// Session present and a scope resolved for it.
    #[must_use]
    pub fn remote_scope(&self) -> Option<&Scope> {
        self.session.as_ref().and(self.scope.as_ref())
    }

    #[must_use]
    pub fn is_remote_enabled(&self) -> bool {
        self.remote_scope().is_some()
    }
}

/// Shared, observable [`SessionContext`].
///
/// Cloning yields another handle onto the same value.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    sender: watch::Sender<SessionContext>,
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new(SessionContext::signed_out())
    }
}

impl SessionHandle {
    #[must_use]
    pub fn new(context: SessionContext) -> Self {
        let (sender, _receiver) = watch::channel(context);
        Self { sender }
    }

    /// Snapshot of the current context.
    #[must_use]
    pub fn current(&self) -> SessionContext {
        self.sender.borrow().clone()
    }

    /// Replace the context and notify subscribers when it changed.
    pub fn set(&self, context: SessionContext) {
        self.sender.send_if_modified(|current| {
            if *current == context {
                false
            } else {
                *current = context;
                true
            }
        });
    }

    /// Receiver that wakes on every context change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionContext> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.sender
            .borrow()
            .session
            .as_ref()
            .map(|session| session.access_token.clone())
    }
}
