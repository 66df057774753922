pub mod auth;
pub mod client;
pub mod credentials;
pub mod settings;
pub mod telemetry;
pub mod tier;

pub use auth::{role_label, AuthError, AuthFlow, LoginPayload, Principal};
pub use client::{RequestOptions, SessionClient};
pub use credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore, TokenKind};
pub use settings::{ClientSettings, SettingsError};
pub use tier::{FacadePage, SessionState, Tier};
