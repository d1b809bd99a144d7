//! Server profiles and the single-active-profile store

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::info;

use super::client::BackendClient;
use crate::{Error, Result};

/// One named set of backend connection credentials
///
/// Switching is a total replacement of the active profile, never a partial
/// field update.
#[derive(Debug, Clone)]
pub struct ServerProfile {
    /// Stable small-integer id
    pub id: u32,
    /// Display name
    pub name: String,
    /// Backend base URL (scheme + host + optional port)
    pub base_url: String,
    /// Service path appended to the base URL
    pub api_path: String,
    /// Basic-Auth username
    pub username: String,
    /// Basic-Auth password
    pub password: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl ServerProfile {
    /// Full service root URL (`base_url` + `api_path`)
    #[must_use]
    pub fn service_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.api_path.trim_start_matches('/')
        )
    }

    /// Credential-free summary for the management surface
    #[must_use]
    pub fn summary(&self, active: bool) -> ProfileSummary {
        ProfileSummary {
            id: self.id,
            name: self.name.clone(),
            base_url: self.base_url.clone(),
            active,
        }
    }
}

/// Credential-free view of a profile, safe to return to clients
#[derive(Debug, Clone, Serialize)]
pub struct ProfileSummary {
    /// Stable small-integer id
    pub id: u32,
    /// Display name
    pub name: String,
    /// Backend base URL
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    /// Whether this profile is currently active
    pub active: bool,
}

/// Holds the configured profiles and tracks exactly one as active
///
/// The store is the single owner of the "current backend" state: it is
/// passed by reference to every component that needs it, never read from
/// ambient/static state. Callers take an [`Arc`] snapshot of the active
/// client and keep using it for the whole call, so a switch racing an
/// in-flight request lets that request finish against the old profile.
#[derive(Debug)]
pub struct ServerProfileStore {
    /// Configured profiles, immutable after construction
    profiles: Vec<ServerProfile>,
    /// The active client; replaced wholesale on switch
    active: RwLock<Arc<BackendClient>>,
}

impl ServerProfileStore {
    /// Create a store with `active_id` as the initially active profile
    ///
    /// # Errors
    ///
    /// `Error::Config` when the profile list is empty or contains duplicate
    /// ids, `Error::UnknownServer` when `active_id` is not configured.
    pub fn new(profiles: Vec<ServerProfile>, active_id: u32) -> Result<Self> {
        if profiles.is_empty() {
            return Err(Error::Config("No server profiles configured".to_string()));
        }
        for profile in &profiles {
            if profiles.iter().filter(|p| p.id == profile.id).count() > 1 {
                return Err(Error::Config(format!(
                    "Duplicate server profile id: {}",
                    profile.id
                )));
            }
        }

        let initial = profiles
            .iter()
            .find(|p| p.id == active_id)
            .ok_or(Error::UnknownServer(active_id))?;
        let client = Arc::new(BackendClient::new(initial.clone())?);

        Ok(Self {
            profiles,
            active: RwLock::new(client),
        })
    }

    /// All configured profiles
    #[must_use]
    pub fn profiles(&self) -> &[ServerProfile] {
        &self.profiles
    }

    /// Credential-free summaries of all profiles, active one flagged
    #[must_use]
    pub fn summaries(&self) -> Vec<ProfileSummary> {
        let active_id = self.active_profile().id;
        self.profiles
            .iter()
            .map(|p| p.summary(p.id == active_id))
            .collect()
    }

    /// Snapshot of the active client
    ///
    /// The returned `Arc` stays valid across a concurrent switch; only
    /// subsequent `active()` calls observe the new profile.
    #[must_use]
    pub fn active(&self) -> Arc<BackendClient> {
        Arc::clone(&self.active.read())
    }

    /// The active profile
    #[must_use]
    pub fn active_profile(&self) -> ServerProfile {
        self.active.read().profile().clone()
    }

    /// Atomically switch the active profile to `id`
    ///
    /// Builds a fresh [`BackendClient`] (token cache empty) and swaps it in.
    /// Outstanding requests against the old client complete or fail
    /// normally; only subsequent calls target the new profile.
    ///
    /// # Errors
    ///
    /// `Error::UnknownServer` when `id` is not configured; the previously
    /// active profile stays unchanged.
    pub fn switch(&self, id: u32) -> Result<ServerProfile> {
        let profile = self
            .profiles
            .iter()
            .find(|p| p.id == id)
            .ok_or(Error::UnknownServer(id))?
            .clone();

        let client = Arc::new(BackendClient::new(profile.clone())?);
        let previous = {
            let mut active = self.active.write();
            let previous = active.profile().name.clone();
            *active = client;
            previous
        };

        info!(from = %previous, to = %profile.name, server_id = id, "Switched active server");
        Ok(profile)
    }
}
