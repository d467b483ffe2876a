//! Canonical-profile refresh after a session is (re)established.
//!
//! The cached token may still be valid even when one refresh call fails,
//! so a failed refresh keeps the cached profile and the `LoggedIn` state.
//! This is the only place in the crate where an error is swallowed.

use crate::api::{AuthGateway, User};

/// Fetch the server's canonical profile for the given token.  Returns
/// `None` on any failure, leaving the caller's cached copy in place.
pub(crate) async fn fetch_canonical_profile(gateway: &dyn AuthGateway, token: &str) -> Option<User> {
    match gateway.fetch_profile(token).await {
        Ok(user) => Some(user),
        Err(e) => {
            tracing::warn!("Profile refresh failed, keeping cached profile: {e}");
            None
        }
    }
}
