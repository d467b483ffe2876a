//! Session lifecycle controller.
//!
//! Owns the in-memory session, orchestrates login / registration / logout
//! against the [`AuthGateway`], and is the single writer of the
//! [`SecureCredentialStore`].  Screens subscribe to phase transitions and
//! derive their navigation from the current phase alone.
//!
//! ## Design
//! - Phases: `Restoring` resolves to `LoggedOut` or (optimistically)
//!   `LoggedIn` from the persisted token; `LoggedOut` ⇄ `Authenticating`
//!   → `LoggedIn`; `LoggedIn` → `LoggedOut` on logout.
//! - One state-changing operation at a time.  Overlapping calls fail fast
//!   with [`SessionError::InvalidState`] instead of queueing, so a
//!   double-tapped submit issues exactly one request, and every store
//!   write completes before the next operation can begin.
//! - Transitions are published on an ordered broadcast channel; no
//!   intermediate phase is skipped for any subscriber.

mod sync;

use crate::api::{ApiError, AuthGateway, AuthResponse, RegisterRequest, User};
use crate::store::{SecureCredentialStore, StoreError, StoredAuthRecord};
use crate::validation;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

/// Capacity of the phase broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Message shown when a password fails the policy.
const PASSWORD_POLICY_MESSAGE: &str =
    "Password must be at least 8 characters, include one uppercase letter, and one special character.";

/// Message shown when an email fails the syntactic check.
const EMAIL_MESSAGE: &str = "Email must contain @ symbol.";

/// Lifecycle phase of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Process start: the persisted credential has not been read yet.
    Restoring,
    /// No credential; the auth flow is shown.
    LoggedOut,
    /// A login or registration request is in flight.
    Authenticating,
    /// A credential is held; the main app is shown.
    LoggedIn,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Restoring => "restoring",
            Self::LoggedOut => "logged out",
            Self::Authenticating => "authenticating",
            Self::LoggedIn => "logged in",
        };
        f.write_str(label)
    }
}

/// The authenticated runtime state: token, optional expiry, cached user.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub expires_utc: Option<DateTime<Utc>>,
    /// `None` after a restore that found a token but no cached profile.
    pub user: Option<User>,
}

/// Registration form input.  The password is used once and dropped with
/// the form; it is never persisted.
#[derive(Debug, Clone)]
pub struct RegistrationForm {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub user_name: String,
}

/// Failure of a session operation.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The operation does not apply to the current phase, or another
    /// state-changing operation is still in flight.
    #[error("{operation} is not valid while {phase}")]
    InvalidState {
        operation: &'static str,
        phase: SessionPhase,
    },

    /// Local form validation failed; no request was issued.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

struct Inner {
    phase: SessionPhase,
    session: Option<Session>,
    busy: bool,
}

/// The stateful core of the client.  One instance per app process; screens
/// hold a reference and subscribe, never ambient global state.
pub struct SessionController {
    gateway: Arc<dyn AuthGateway>,
    store: SecureCredentialStore,
    inner: Mutex<Inner>,
    events: broadcast::Sender<SessionPhase>,
}

impl SessionController {
    /// Create a controller in the `Restoring` phase.  Call [`restore`]
    /// before anything else.
    ///
    /// [`restore`]: Self::restore
    pub fn new(gateway: Arc<dyn AuthGateway>, store: SecureCredentialStore) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            gateway,
            store,
            inner: Mutex::new(Inner {
                phase: SessionPhase::Restoring,
                session: None,
                busy: false,
            }),
            events,
        }
    }

    /// Subscribe to phase transitions, delivered in transition order.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionPhase> {
        self.events.subscribe()
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.inner.lock().phase
    }

    /// Snapshot of the current session, if one is held.
    pub fn session(&self) -> Option<Session> {
        self.inner.lock().session.clone()
    }

    /// Derived navigation view: `LoggedIn` shows the main app, every other
    /// phase shows the auth flow.
    pub fn is_logged_in(&self) -> bool {
        self.phase() == SessionPhase::LoggedIn
    }

    /// Resolve the initial `Restoring` phase from the credential store.
    ///
    /// A persisted token enters `LoggedIn` on presence alone; the profile
    /// refresh that follows can only improve the cached user, never
    /// downgrade the phase.  An unreadable store degrades to `LoggedOut`.
    pub async fn restore(&self) -> Result<SessionPhase, SessionError> {
        self.begin("restore", SessionPhase::Restoring, None)?;

        let record = match self.store.load() {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Credential store unreadable, starting logged out: {e}");
                None
            }
        };

        let Some(record) = record else {
            self.finish(SessionPhase::LoggedOut, None);
            return Ok(SessionPhase::LoggedOut);
        };

        tracing::info!("Restored session from credential store");
        let session = Session {
            token: record.token.clone(),
            expires_utc: record.expires_utc,
            user: record.user.clone(),
        };
        {
            let mut inner = self.inner.lock();
            inner.phase = SessionPhase::LoggedIn;
            inner.session = Some(session);
        }
        self.publish(SessionPhase::LoggedIn);

        if let Some(user) = sync::fetch_canonical_profile(self.gateway.as_ref(), &record.token).await
        {
            self.apply_refreshed_user(user, &record);
        }
        self.release();
        Ok(SessionPhase::LoggedIn)
    }

    /// Log in with the given credentials.  Valid only while `LoggedOut`.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), SessionError> {
        if !validation::validate_email(email) {
            return Err(SessionError::Validation(EMAIL_MESSAGE.into()));
        }
        if password.is_empty() {
            return Err(SessionError::Validation("Password is required.".into()));
        }

        self.begin(
            "login",
            SessionPhase::LoggedOut,
            Some(SessionPhase::Authenticating),
        )?;

        match self.gateway.login(email, password).await {
            Ok(response) => self.complete_authentication(response).await,
            Err(e) => {
                self.finish(SessionPhase::LoggedOut, None);
                Err(e.into())
            }
        }
    }

    /// Register a new account and enter `LoggedIn` on success.  Valid only
    /// while `LoggedOut`.
    pub async fn register(&self, form: &RegistrationForm) -> Result<(), SessionError> {
        if !validation::validate_email(&form.email) {
            return Err(SessionError::Validation(EMAIL_MESSAGE.into()));
        }
        if !validation::validate_password(&form.password) {
            return Err(SessionError::Validation(PASSWORD_POLICY_MESSAGE.into()));
        }

        self.begin(
            "register",
            SessionPhase::LoggedOut,
            Some(SessionPhase::Authenticating),
        )?;

        let request = RegisterRequest {
            email: form.email.clone(),
            password: form.password.clone(),
            first_name: form.first_name.clone(),
            last_name: form.last_name.clone(),
            user_name: form.user_name.clone(),
        };
        match self.gateway.register(&request).await {
            Ok(response) => self.complete_authentication(response).await,
            Err(e) => {
                self.finish(SessionPhase::LoggedOut, None);
                Err(e.into())
            }
        }
    }

    /// Drop the session and clear the store.  Valid only while `LoggedIn`.
    /// The phase becomes `LoggedOut` even when clearing the store fails;
    /// the error is still surfaced.
    pub async fn logout(&self) -> Result<(), SessionError> {
        self.begin("logout", SessionPhase::LoggedIn, None)?;

        let cleared = self.store.clear();
        self.finish(SessionPhase::LoggedOut, None);
        tracing::info!("Logged out");
        cleared?;
        Ok(())
    }

    /// Change the account password.  Valid only while `LoggedIn`; the
    /// phase does not change on success or failure.
    pub async fn change_password(&self, current: &str, next: &str) -> Result<(), SessionError> {
        if !validation::validate_password(next) {
            return Err(SessionError::Validation(PASSWORD_POLICY_MESSAGE.into()));
        }

        self.begin("change password", SessionPhase::LoggedIn, None)?;

        let token = self
            .inner
            .lock()
            .session
            .as_ref()
            .map(|session| session.token.clone());
        let Some(token) = token else {
            self.release();
            return Err(SessionError::InvalidState {
                operation: "change password",
                phase: SessionPhase::LoggedIn,
            });
        };

        let result = self.gateway.change_password(&token, current, next).await;
        self.release();
        result.map_err(Into::into)
    }

    /// Reset a forgotten password with an emailed reset token.  Part of
    /// the auth flow, so valid only while `LoggedOut`.
    pub async fn reset_password(
        &self,
        email: &str,
        reset_token: &str,
        next: &str,
    ) -> Result<(), SessionError> {
        if !validation::validate_email(email) {
            return Err(SessionError::Validation(EMAIL_MESSAGE.into()));
        }
        if !validation::validate_password(next) {
            return Err(SessionError::Validation(PASSWORD_POLICY_MESSAGE.into()));
        }

        self.begin("password reset", SessionPhase::LoggedOut, None)?;

        let result = self.gateway.reset_password(email, reset_token, next).await;
        self.release();
        result.map_err(Into::into)
    }

    /// Persist a fresh credential, enter `LoggedIn`, then refresh the
    /// canonical profile best-effort.
    async fn complete_authentication(&self, response: AuthResponse) -> Result<(), SessionError> {
        let record = StoredAuthRecord {
            token: response.access_token.clone(),
            user: Some(response.user.clone()),
            expires_utc: response.expires_utc,
        };
        if let Err(e) = self.store.save(&record) {
            // A failed save is left for the next restore to clarify.
            tracing::warn!("Failed to persist session: {e}");
        }

        let session = Session {
            token: response.access_token,
            expires_utc: response.expires_utc,
            user: Some(response.user),
        };
        {
            let mut inner = self.inner.lock();
            inner.phase = SessionPhase::LoggedIn;
            inner.session = Some(session);
        }
        self.publish(SessionPhase::LoggedIn);

        if let Some(user) = sync::fetch_canonical_profile(self.gateway.as_ref(), &record.token).await
        {
            self.apply_refreshed_user(user, &record);
        }
        self.release();
        Ok(())
    }

    /// Overwrite the cached user, in memory and in the store, with the
    /// server's canonical copy.
    fn apply_refreshed_user(&self, user: User, record: &StoredAuthRecord) {
        let updated = StoredAuthRecord {
            token: record.token.clone(),
            user: Some(user.clone()),
            expires_utc: record.expires_utc,
        };
        if let Err(e) = self.store.save(&updated) {
            tracing::warn!("Failed to persist refreshed profile: {e}");
        }

        let mut inner = self.inner.lock();
        if let Some(session) = inner.session.as_mut() {
            session.user = Some(user);
        }
    }

    /// Claim the single in-flight operation slot, verifying the phase and
    /// optionally entering a transitional phase.
    fn begin(
        &self,
        operation: &'static str,
        expected: SessionPhase,
        entered: Option<SessionPhase>,
    ) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        if inner.busy || inner.phase != expected {
            return Err(SessionError::InvalidState {
                operation,
                phase: inner.phase,
            });
        }
        inner.busy = true;
        if let Some(next) = entered {
            inner.phase = next;
        }
        drop(inner);

        if let Some(next) = entered {
            self.publish(next);
        }
        Ok(())
    }

    /// Commit a terminal phase and release the operation slot.
    fn finish(&self, phase: SessionPhase, session: Option<Session>) {
        let changed;
        {
            let mut inner = self.inner.lock();
            changed = inner.phase != phase;
            inner.phase = phase;
            inner.session = session;
            inner.busy = false;
        }
        if changed {
            self.publish(phase);
        }
    }

    /// Release the operation slot without touching phase or session.
    fn release(&self) {
        self.inner.lock().busy = false;
    }

    fn publish(&self, phase: SessionPhase) {
        // send only fails when nobody is subscribed, which is fine.
        let _ = self.events.send(phase);
    }
}
