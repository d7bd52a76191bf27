//! Best-effort mirroring of registry actions to the on-chain contract
//!
//! The wallet/contract adapter lives outside this crate; [`ChainAdapter`] is
//! the seam it plugs into. [`ChainMirror`] applies every mutation locally
//! first, then makes the remote call. A remote failure is reported and
//! logged but never rolls the local change back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::RegistryError;
use crate::events::{EventBus, RegistryEvent};
use crate::models::{CouncilMember, NewParcel, Parcel};
use crate::store::ParcelStore;

/// Transaction hash returned by the wallet
pub type TxHash = String;

/// Arguments of the contract's `submit_land` entry function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSubmission {
    pub khasra_number: String,
    pub document_cid: String,
    pub area_sqm: u64,
    pub notes: String,
    pub village: String,
    pub tehsil: String,
    pub district: String,
}

impl From<&Parcel> for ChainSubmission {
    fn from(parcel: &Parcel) -> Self {
        Self {
            khasra_number: parcel.khasra_number.clone(),
            document_cid: parcel.document_cid.clone().unwrap_or_default(),
            // contract stores whole square meters
            area_sqm: parcel.area.max(0.0).round() as u64,
            notes: parcel.notes.clone().unwrap_or_default(),
            village: parcel.village.clone(),
            tehsil: parcel.tehsil.clone(),
            district: parcel.district.clone(),
        }
    }
}

/// Parcel as the contract's `get_parcel` view returns it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnChainParcel {
    pub parcel_id: u64,
    pub owner: String,
    pub khasra_number: String,
    pub document_cid: String,
    pub area_sqm: u64,
    pub notes: String,
    pub village: String,
    pub tehsil: String,
    pub district: String,
    pub approvers: Vec<String>,
    /// 0 pending, 1 approved, 2 rejected, 3 disputed
    pub status: u8,
    pub created_at: u64,
}

/// Wallet-signed calls into the registry contract
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    async fn submit(&self, submission: &ChainSubmission) -> Result<TxHash, RegistryError>;
    async fn approve(&self, parcel_id: u64) -> Result<TxHash, RegistryError>;
    async fn reject(&self, parcel_id: u64) -> Result<TxHash, RegistryError>;
    async fn dispute(&self, parcel_id: u64) -> Result<TxHash, RegistryError>;
    async fn transfer(&self, parcel_id: u64, new_owner: &str) -> Result<TxHash, RegistryError>;
    async fn get_parcel(&self, parcel_id: u64) -> Result<OnChainParcel, RegistryError>;
    async fn get_next_id(&self) -> Result<u64, RegistryError>;
}

/// What happened to the remote half of a mirrored action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    Confirmed(TxHash),
    Failed(String),
    /// No adapter configured
    Skipped,
}

impl ChainOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, ChainOutcome::Confirmed(_))
    }
}

/// Local result plus the remote outcome
#[derive(Debug, Clone, PartialEq)]
pub struct Mirrored<T> {
    pub local: T,
    pub chain: ChainOutcome,
}

/// Parcel store with best-effort on-chain mirroring
///
/// The contract numbers parcels itself, so local and on-chain ids may
/// differ. At submit the mirror asks the contract for its next id and, once
/// the submission is confirmed, remembers it as the chain id of the new local
/// parcel. Later calls for that parcel use the remembered id. Parcels with no
/// recorded chain id (submitted before this instance, or while the chain was
/// unreachable) are addressed by their local id. The mapping lives in memory
/// only; [`ChainMirror::link_chain_id`] restores it.
pub struct ChainMirror {
    store: ParcelStore,
    chain: Option<Arc<dyn ChainAdapter>>,
    chain_ids: HashMap<u64, u64>,
    events: Option<Arc<EventBus>>,
}

impl ChainMirror {
    pub fn new(store: ParcelStore, chain: Option<Arc<dyn ChainAdapter>>) -> Self {
        Self {
            store,
            chain,
            chain_ids: HashMap::new(),
            events: None,
        }
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn store(&self) -> &ParcelStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ParcelStore {
        &mut self.store
    }

    pub fn into_store(self) -> ParcelStore {
        self.store
    }

    /// Contract id used for local parcel `id`
    pub fn chain_id(&self, id: u64) -> u64 {
        self.chain_ids.get(&id).copied().unwrap_or(id)
    }

    /// Record that local parcel `id` is `chain_id` on the contract
    pub fn link_chain_id(&mut self, id: u64, chain_id: u64) {
        self.chain_ids.insert(id, chain_id);
    }

    /// Submit locally, then register on chain
    pub async fn submit(&mut self, data: NewParcel) -> Result<Mirrored<u64>, RegistryError> {
        let id = self.store.add_parcel(data)?;
        let submission = self
            .store
            .get_parcel(id)
            .map(ChainSubmission::from)
            .ok_or(RegistryError::NotFound(id))?;

        let assigned = match &self.chain {
            Some(chain) => match chain.get_next_id().await {
                Ok(next) => Some(next),
                Err(e) => {
                    warn!(id, error = %e, "Could not read next chain id, falling back to local id");
                    None
                }
            },
            None => None,
        };

        let chain = self
            .mirror("submit", Some(id), |c| async move { c.submit(&submission).await })
            .await;
        if let Some(chain_id) = assigned.filter(|_| chain.is_confirmed()) {
            self.link_chain_id(id, chain_id);
        }
        Ok(Mirrored { local: id, chain })
    }

    pub async fn approve(&mut self, id: u64, member: &CouncilMember) -> Result<Mirrored<Parcel>, RegistryError> {
        let local = self.store.approve(id, member)?;
        let chain_id = self.chain_id(id);
        let chain = self
            .mirror("approve", Some(id), |c| async move { c.approve(chain_id).await })
            .await;
        Ok(Mirrored { local, chain })
    }

    pub async fn reject(&mut self, id: u64) -> Result<Mirrored<Parcel>, RegistryError> {
        let local = self.store.reject(id)?;
        let chain_id = self.chain_id(id);
        let chain = self
            .mirror("reject", Some(id), |c| async move { c.reject(chain_id).await })
            .await;
        Ok(Mirrored { local, chain })
    }

    pub async fn dispute(&mut self, id: u64) -> Result<Mirrored<Parcel>, RegistryError> {
        let local = self.store.dispute(id)?;
        let chain_id = self.chain_id(id);
        let chain = self
            .mirror("dispute", Some(id), |c| async move { c.dispute(chain_id).await })
            .await;
        Ok(Mirrored { local, chain })
    }

    pub async fn transfer(
        &mut self,
        id: u64,
        new_owner_wallet: &str,
        new_owner_name: Option<&str>,
    ) -> Result<Mirrored<Parcel>, RegistryError> {
        let local = self.store.transfer_ownership(id, new_owner_wallet, new_owner_name)?;
        let owner = new_owner_wallet.to_string();
        let chain_id = self.chain_id(id);
        let chain = self
            .mirror("transfer", Some(id), |c| async move { c.transfer(chain_id, &owner).await })
            .await;
        Ok(Mirrored { local, chain })
    }

    /// Pull the on-chain status of `id` into the local record
    pub async fn sync_status(&mut self, id: u64) -> Result<Parcel, RegistryError> {
        let chain = self
            .chain
            .clone()
            .ok_or_else(|| RegistryError::Chain("no chain adapter configured".into()))?;
        if self.store.get_parcel(id).is_none() {
            return Err(RegistryError::NotFound(id));
        }

        let on_chain = chain.get_parcel(self.chain_id(id)).await?;
        let parcel = self.store.apply_chain_status(id, on_chain.status)?;
        info!(id, status = %parcel.status, "Synced parcel status from chain");
        Ok(parcel)
    }

    /// Next id the contract will assign
    pub async fn next_chain_id(&self) -> Result<u64, RegistryError> {
        match &self.chain {
            Some(chain) => chain.get_next_id().await,
            None => Err(RegistryError::Chain("no chain adapter configured".into())),
        }
    }

    async fn mirror<F, Fut>(&self, operation: &'static str, id: Option<u64>, call: F) -> ChainOutcome
    where
        F: FnOnce(Arc<dyn ChainAdapter>) -> Fut,
        Fut: Future<Output = Result<TxHash, RegistryError>>,
    {
        let Some(chain) = self.chain.clone() else {
            return ChainOutcome::Skipped;
        };

        match call(chain).await {
            Ok(tx) => {
                info!(operation, id = ?id, tx = %tx, "Mirrored to chain");
                ChainOutcome::Confirmed(tx)
            }
            Err(e) => {
                warn!(operation, id = ?id, error = %e, "Chain call failed, local change kept");
                if let Some(events) = &self.events {
                    events.emit(RegistryEvent::ChainMirrorFailed {
                        operation,
                        id,
                        error: e.to_string(),
                    });
                }
                ChainOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;
    use crate::models::ParcelStatus;
    use std::sync::Mutex;

    /// Adapter that records calls and answers from a fixed status
    #[derive(Default)]
    struct RecordingChain {
        calls: Mutex<Vec<String>>,
        status: u8,
        next_id: u64,
        fail: bool,
    }

    impl RecordingChain {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        fn reporting(status: u8) -> Self {
            Self {
                status,
                ..Default::default()
            }
        }

        fn numbering_from(next_id: u64) -> Self {
            Self {
                next_id,
                ..Default::default()
            }
        }

        fn record(&self, call: String) -> Result<TxHash, RegistryError> {
            self.calls.lock().unwrap().push(call.clone());
            if self.fail {
                Err(RegistryError::Chain("wallet not connected".into()))
            } else {
                Ok(format!("0xtx-{}", call))
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChainAdapter for RecordingChain {
        async fn submit(&self, submission: &ChainSubmission) -> Result<TxHash, RegistryError> {
            self.record(format!("submit:{}", submission.khasra_number))
        }
        async fn approve(&self, parcel_id: u64) -> Result<TxHash, RegistryError> {
            self.record(format!("approve:{}", parcel_id))
        }
        async fn reject(&self, parcel_id: u64) -> Result<TxHash, RegistryError> {
            self.record(format!("reject:{}", parcel_id))
        }
        async fn dispute(&self, parcel_id: u64) -> Result<TxHash, RegistryError> {
            self.record(format!("dispute:{}", parcel_id))
        }
        async fn transfer(&self, parcel_id: u64, new_owner: &str) -> Result<TxHash, RegistryError> {
            self.record(format!("transfer:{}:{}", parcel_id, new_owner))
        }
        async fn get_parcel(&self, parcel_id: u64) -> Result<OnChainParcel, RegistryError> {
            self.calls.lock().unwrap().push(format!("get:{}", parcel_id));
            if self.fail {
                return Err(RegistryError::Chain("node unreachable".into()));
            }
            Ok(OnChainParcel {
                parcel_id,
                owner: "0xowner".into(),
                khasra_number: "K1".into(),
                document_cid: String::new(),
                area_sqm: 100,
                notes: String::new(),
                village: "X".into(),
                tehsil: "Arang".into(),
                district: "Raipur".into(),
                approvers: vec![],
                status: self.status,
                created_at: 0,
            })
        }
        async fn get_next_id(&self) -> Result<u64, RegistryError> {
            if self.fail {
                return Err(RegistryError::Chain("node unreachable".into()));
            }
            Ok(self.next_id)
        }
    }

    fn claim() -> NewParcel {
        NewParcel {
            khasra_number: "K1".into(),
            owner_name: "A".into(),
            owner_wallet: "0xa".into(),
            district: "Raipur".into(),
            tehsil: "Arang".into(),
            village: "X".into(),
            area: 99.6,
            ..Default::default()
        }
    }

    fn mirror(chain: Option<Arc<dyn ChainAdapter>>) -> ChainMirror {
        ChainMirror::new(ParcelStore::open(Arc::new(MemoryStore::new())), chain)
    }

    fn member() -> CouncilMember {
        crate::reference::default_council_members().remove(0)
    }

    #[tokio::test]
    async fn test_confirmed_mirror() {
        let chain = Arc::new(RecordingChain::numbering_from(1));
        let mut registry = mirror(Some(chain.clone() as Arc<dyn ChainAdapter>));

        let submitted = registry.submit(claim()).await.unwrap();
        assert_eq!(submitted.local, 1);
        assert!(submitted.chain.is_confirmed());

        let approved = registry.approve(1, &member()).await.unwrap();
        assert_eq!(approved.local.status, ParcelStatus::Approved);

        registry.transfer(1, "0xb", None).await.unwrap();
        assert_eq!(chain.calls(), vec!["submit:K1", "approve:1", "transfer:1:0xb"]);
    }

    #[tokio::test]
    async fn test_calls_use_contract_assigned_id() {
        let chain = Arc::new(RecordingChain::numbering_from(7));
        let mut registry = mirror(Some(chain.clone() as Arc<dyn ChainAdapter>));

        let submitted = registry.submit(claim()).await.unwrap();
        assert_eq!(submitted.local, 1);
        assert_eq!(registry.chain_id(1), 7);

        registry.approve(1, &member()).await.unwrap();
        registry.dispute(1).await.unwrap();
        registry.sync_status(1).await.unwrap();
        assert_eq!(chain.calls(), vec!["submit:K1", "approve:7", "dispute:7", "get:7"]);

        // Parcels without a recorded chain id keep their local id
        registry.store_mut().add_parcel(claim()).unwrap();
        assert_eq!(registry.chain_id(2), 2);
        registry.link_chain_id(2, 9);
        registry.reject(2).await.unwrap();
        assert_eq!(chain.calls().last().map(String::as_str), Some("reject:9"));
    }

    #[tokio::test]
    async fn test_chain_failure_keeps_local_change() {
        let events = Arc::new(EventBus::new());
        let mut rx = events.subscribe();
        let mut registry = mirror(Some(Arc::new(RecordingChain::failing()) as Arc<dyn ChainAdapter>)).with_events(events);

        let submitted = registry.submit(claim()).await.unwrap();
        assert!(matches!(submitted.chain, ChainOutcome::Failed(_)));
        assert_eq!(registry.store().len(), 1);
        assert_eq!(registry.chain_id(1), 1);

        let disputed = registry.dispute(1).await.unwrap();
        assert_eq!(disputed.local.status, ParcelStatus::Disputed);
        assert_eq!(registry.store().get_parcel(1).unwrap().status, ParcelStatus::Disputed);

        match rx.recv().await.unwrap() {
            RegistryEvent::ChainMirrorFailed { operation, id, .. } => {
                assert_eq!(operation, "submit");
                assert_eq!(id, Some(1));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_local_error_skips_chain() {
        let chain = Arc::new(RecordingChain::default());
        let mut registry = mirror(Some(chain.clone() as Arc<dyn ChainAdapter>));

        assert!(registry.reject(77).await.unwrap_err().is_not_found());
        assert!(chain.calls().is_empty());
    }

    #[tokio::test]
    async fn test_without_adapter() {
        let mut registry = mirror(None);
        let submitted = registry.submit(claim()).await.unwrap();
        assert_eq!(submitted.chain, ChainOutcome::Skipped);
        assert!(registry.sync_status(1).await.is_err());
        assert!(registry.next_chain_id().await.is_err());
    }

    #[tokio::test]
    async fn test_sync_status() {
        let chain = RecordingChain {
            next_id: 42,
            ..RecordingChain::reporting(2)
        };
        let mut registry = mirror(Some(Arc::new(chain) as Arc<dyn ChainAdapter>));
        registry.store_mut().add_parcel(claim()).unwrap();

        let parcel = registry.sync_status(1).await.unwrap();
        assert_eq!(parcel.status, ParcelStatus::Rejected);
        assert!(parcel.approvals.is_empty());
        assert_eq!(registry.next_chain_id().await.unwrap(), 42);
        assert!(registry.sync_status(5).await.unwrap_err().is_not_found());
    }

    #[test]
    fn test_submission_rounds_area() {
        let parcel = claim().into_parcel(1, chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        let submission = ChainSubmission::from(&parcel);
        assert_eq!(submission.area_sqm, 100);
        assert_eq!(submission.document_cid, "");
    }
}
