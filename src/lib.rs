//! Session and API core for the Roamly mobile client.
//!
//! Screens stay thin: they validate input with [`validation`], invoke
//! [`session::SessionController`] operations, and render whatever phase
//! the controller publishes.  The controller owns the in-memory session,
//! drives the [`api`] gateway, and is the only writer of the
//! [`store::SecureCredentialStore`].
//!
//! ```no_run
//! use roamly::{ApiClient, ClientConfig, SecureCredentialStore, SessionController};
//! use std::sync::Arc;
//!
//! # async fn bootstrap(app_data_dir: std::path::PathBuf) -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env().unwrap_or_else(|| ClientConfig::new("http://10.0.2.2:5055"));
//! let gateway = Arc::new(ApiClient::new(&config)?);
//! let store = SecureCredentialStore::open(app_data_dir)?;
//! let controller = SessionController::new(gateway, store);
//! let phase = controller.restore().await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod session;
pub mod store;
pub mod validation;

pub use api::{
    ApiClient, ApiError, AuthGateway, AuthResponse, Friend, ProfileDto, ProfileUpdate,
    RegisterRequest, User,
};
pub use config::ClientConfig;
pub use session::{RegistrationForm, Session, SessionController, SessionError, SessionPhase};
pub use store::{SecureCredentialStore, StoreError, StoredAuthRecord};
