//! Reference data: council roster and district list

use std::sync::Arc;
use tracing::warn;

use crate::error::RegistryError;
use crate::kv::{KeyValueStore, COUNCIL_KEY};
use crate::models::CouncilMember;

/// Districts offered by the submission form
pub const DEFAULT_DISTRICTS: [&str; 5] = ["Raipur", "Durg", "Bilaspur", "Korba", "Rajnandgaon"];

/// Built-in roster used when none is stored
pub fn default_council_members() -> Vec<CouncilMember> {
    vec![
        CouncilMember {
            name: "Ramkumar Sahu".into(),
            role: "Tehsildar".into(),
            phone: "0771-123-4567".into(),
            office: "Raipur Tehsil".into(),
            wallet_address: "0xCouncil1".into(),
        },
        CouncilMember {
            name: "Nisha Toppo".into(),
            role: "Revenue Officer".into(),
            phone: "0771-234-5678".into(),
            office: "Raipur Block".into(),
            wallet_address: "0xCouncil2".into(),
        },
    ]
}

/// Read-only council roster
#[derive(Debug, Clone)]
pub struct CouncilRoster {
    members: Vec<CouncilMember>,
}

impl CouncilRoster {
    /// Load from `land_registry_council`, falling back to the built-in list
    pub fn load(backend: &Arc<dyn KeyValueStore>) -> Self {
        let stored = match backend.get(COUNCIL_KEY) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Council roster unreadable, using defaults");
                None
            }
        };

        let members = match stored.map(|raw| serde_json::from_str::<Vec<CouncilMember>>(&raw)) {
            Some(Ok(members)) => members,
            Some(Err(e)) => {
                warn!(error = %e, "Council roster corrupt, using defaults");
                default_council_members()
            }
            None => default_council_members(),
        };

        Self { members }
    }

    pub fn from_members(members: Vec<CouncilMember>) -> Self {
        Self { members }
    }

    pub fn members(&self) -> &[CouncilMember] {
        &self.members
    }

    /// Case-insensitive lookup by name
    pub fn find_by_name(&self, name: &str) -> Option<&CouncilMember> {
        let name = name.trim().to_lowercase();
        self.members.iter().find(|m| m.name.to_lowercase() == name)
    }

    pub fn find_by_wallet(&self, wallet: &str) -> Option<&CouncilMember> {
        self.members.iter().find(|m| m.wallet_address.eq_ignore_ascii_case(wallet))
    }

    /// Resolve a member by name or wallet address
    pub fn resolve(&self, key: &str) -> Result<&CouncilMember, RegistryError> {
        self.find_by_name(key)
            .or_else(|| self.find_by_wallet(key))
            .ok_or_else(|| RegistryError::UnknownCouncilMember(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;

    #[test]
    fn test_defaults_when_absent() {
        let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let roster = CouncilRoster::load(&backend);
        assert_eq!(roster.members(), default_council_members().as_slice());
    }

    #[test]
    fn test_defaults_when_corrupt() {
        let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        backend.set(COUNCIL_KEY, "[{\"name\": 1}]").unwrap();
        assert_eq!(CouncilRoster::load(&backend).members().len(), 2);
    }

    #[test]
    fn test_stored_roster_wins() {
        let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let stored = vec![CouncilMember {
            name: "Kavita Netam".into(),
            role: "Patwari".into(),
            phone: "07752-400-100".into(),
            office: "Bilaspur Halka".into(),
            wallet_address: "0xCouncil9".into(),
        }];
        backend.set(COUNCIL_KEY, &serde_json::to_string(&stored).unwrap()).unwrap();

        let roster = CouncilRoster::load(&backend);
        assert_eq!(roster.members(), stored.as_slice());
        assert_eq!(roster.resolve("kavita netam").unwrap().role, "Patwari");
        assert_eq!(roster.resolve("0xcouncil9").unwrap().name, "Kavita Netam");
        assert!(roster.resolve("Ramkumar Sahu").is_err());
    }
}
