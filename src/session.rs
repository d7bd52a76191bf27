//! Council login flag
//!
//! Demo gate only: one shared council ID and password from config. A
//! successful login stores a small JSON record so later commands know a
//! council member is acting, and which one.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::RegistryError;
use crate::kv::{KeyValueStore, SESSION_KEY};

/// Shared council credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouncilCredentials {
    pub council_id: String,
    pub password: String,
}

impl Default for CouncilCredentials {
    fn default() -> Self {
        Self {
            council_id: "COUNCIL2025".into(),
            password: "admin@123".into(),
        }
    }
}

/// Stored session record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouncilLogin {
    pub council_id: String,
    #[serde(default)]
    pub member_name: Option<String>,
}

pub struct CouncilSession {
    backend: Arc<dyn KeyValueStore>,
    credentials: CouncilCredentials,
}

impl CouncilSession {
    pub fn new(backend: Arc<dyn KeyValueStore>, credentials: CouncilCredentials) -> Self {
        Self { backend, credentials }
    }

    /// Check credentials and persist the session on success
    pub fn login(
        &self,
        council_id: &str,
        password: &str,
        member_name: Option<&str>,
    ) -> Result<bool, RegistryError> {
        if council_id != self.credentials.council_id || password != self.credentials.password {
            warn!(council_id, "Council login rejected");
            return Ok(false);
        }

        let record = CouncilLogin {
            council_id: council_id.to_string(),
            member_name: member_name.map(str::to_string),
        };
        self.backend.set(SESSION_KEY, &serde_json::to_string(&record)?)?;
        info!(council_id, member = ?member_name, "Council logged in");
        Ok(true)
    }

    /// Current session; a corrupt record reads as logged out
    pub fn current(&self) -> Result<Option<CouncilLogin>, RegistryError> {
        let Some(raw) = self.backend.get(SESSION_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(login) => Ok(Some(login)),
            Err(e) => {
                warn!(error = %e, "Council session corrupt, treating as logged out");
                Ok(None)
            }
        }
    }

    pub fn is_logged_in(&self) -> Result<bool, RegistryError> {
        Ok(self.current()?.is_some())
    }

    pub fn logout(&self) -> Result<(), RegistryError> {
        self.backend.remove(SESSION_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;

    fn session() -> CouncilSession {
        CouncilSession::new(Arc::new(MemoryStore::new()), CouncilCredentials::default())
    }

    #[test]
    fn test_login_logout() {
        let session = session();
        assert!(!session.is_logged_in().unwrap());

        assert!(session.login("COUNCIL2025", "admin@123", Some("Nisha Toppo")).unwrap());
        let login = session.current().unwrap().unwrap();
        assert_eq!(login.member_name.as_deref(), Some("Nisha Toppo"));

        session.logout().unwrap();
        assert!(!session.is_logged_in().unwrap());
    }

    #[test]
    fn test_wrong_password() {
        let session = session();
        assert!(!session.login("COUNCIL2025", "council123", None).unwrap());
        assert!(!session.login("council2025", "admin@123", None).unwrap());
        assert!(!session.is_logged_in().unwrap());
    }

    #[test]
    fn test_corrupt_session_is_logged_out() {
        let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        backend.set(SESSION_KEY, "true").unwrap();
        let session = CouncilSession::new(backend, CouncilCredentials::default());
        assert_eq!(session.current().unwrap(), None);
    }
}
