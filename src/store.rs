//! Parcel store - the single writer for the parcel collection
//!
//! Every mutation builds the next collection, writes the whole snapshot to
//! the backend under [`PARCELS_KEY`], and only then replaces the in-memory
//! state. A failed write leaves the store exactly as it was.

use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::approval::{self, ApprovalPolicy, Decision};
use crate::error::RegistryError;
use crate::events::{EventBus, RegistryEvent};
use crate::kv::{KeyValueStore, PARCELS_KEY};
use crate::models::{CouncilMember, NewParcel, Parcel, ParcelStatus, ParcelUpdate, StatusCounts};
use crate::search::SearchCriteria;

/// Source of the current calendar date
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// UTC wall clock
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Clock pinned to one date
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

pub struct ParcelStore {
    backend: Arc<dyn KeyValueStore>,
    parcels: Vec<Parcel>,
    /// Lowest id not yet handed out by this instance; `None` once `u64::MAX`
    /// has been used
    next_id: Option<u64>,
    policy: ApprovalPolicy,
    clock: Arc<dyn Clock>,
    events: Option<Arc<EventBus>>,
}

impl ParcelStore {
    /// Open the store over `backend`.
    ///
    /// A missing snapshot is an empty registry. An unreadable or corrupt one
    /// is logged and also treated as empty.
    pub fn open(backend: Arc<dyn KeyValueStore>) -> Self {
        let parcels = load_snapshot(backend.as_ref());
        let next_id = max_id(&parcels).checked_add(1);
        info!(parcels = parcels.len(), next_id = ?next_id, "Opened parcel store");

        Self {
            backend,
            parcels,
            next_id,
            policy: ApprovalPolicy::default(),
            clock: Arc::new(SystemClock),
            events: None,
        }
    }

    pub fn with_policy(mut self, policy: ApprovalPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn policy(&self) -> &ApprovalPolicy {
        &self.policy
    }

    // =========================================================================
    // Read Operations
    // =========================================================================

    pub fn parcels(&self) -> &[Parcel] {
        &self.parcels
    }

    pub fn len(&self) -> usize {
        self.parcels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parcels.is_empty()
    }

    pub fn get_parcel(&self, id: u64) -> Option<&Parcel> {
        self.parcels.iter().find(|p| p.id == id)
    }

    /// Matching parcels, cloned, in insertion order
    pub fn search_parcels(&self, criteria: &SearchCriteria) -> Vec<Parcel> {
        criteria.filter(&self.parcels)
    }

    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for parcel in &self.parcels {
            counts.record(parcel.status);
        }
        counts
    }

    // =========================================================================
    // Write Operations
    // =========================================================================

    /// Submit a new claim; returns its id
    pub fn add_parcel(&mut self, data: NewParcel) -> Result<u64, RegistryError> {
        let id = match (self.next_id, max_id(&self.parcels).checked_add(1)) {
            (Some(next), Some(floor)) => next.max(floor),
            _ => return Err(RegistryError::IdSpaceExhausted),
        };
        let parcel = data.into_parcel(id, self.clock.today());
        let event = RegistryEvent::ParcelSubmitted {
            id,
            khasra_number: parcel.khasra_number.clone(),
            owner_name: parcel.owner_name.clone(),
        };

        let mut next = self.parcels.clone();
        next.push(parcel);
        self.commit(next)?;
        self.next_id = id.checked_add(1);

        self.emit(event);
        Ok(id)
    }

    /// Merge owner-editable fields into parcel `id`
    pub fn update_parcel(&mut self, id: u64, update: &ParcelUpdate) -> Result<Parcel, RegistryError> {
        let parcel = self.modify(id, |p| {
            update.apply_to(p);
            Ok(())
        })?;
        self.emit(RegistryEvent::ParcelUpdated { id });
        Ok(parcel)
    }

    /// Remove parcel `id`; returns the removed record
    pub fn delete_parcel(&mut self, id: u64) -> Result<Parcel, RegistryError> {
        let idx = self.position(id)?;
        let mut next = self.parcels.clone();
        let removed = next.remove(idx);
        self.commit(next)?;

        self.emit(RegistryEvent::ParcelDeleted { id });
        Ok(removed)
    }

    /// Owner-initiated removal, allowed only while the claim is pending
    pub fn withdraw(&mut self, id: u64, owner_wallet: &str) -> Result<Parcel, RegistryError> {
        let parcel = self.get_parcel(id).ok_or(RegistryError::NotFound(id))?;
        if parcel.owner_wallet != owner_wallet {
            return Err(RegistryError::NotOwner { id });
        }
        if parcel.status != ParcelStatus::Pending {
            return Err(RegistryError::InvalidState {
                id,
                status: parcel.status,
                action: "withdraw",
            });
        }
        self.delete_parcel(id)
    }

    /// Hand an approved parcel to a new owner
    pub fn transfer_ownership(
        &mut self,
        id: u64,
        new_owner_wallet: &str,
        new_owner_name: Option<&str>,
    ) -> Result<Parcel, RegistryError> {
        let parcel = self.modify(id, |p| {
            if p.status != ParcelStatus::Approved {
                return Err(RegistryError::InvalidState {
                    id,
                    status: p.status,
                    action: "transfer ownership",
                });
            }
            p.owner_wallet = new_owner_wallet.to_string();
            if let Some(name) = new_owner_name {
                p.owner_name = name.to_string();
            }
            Ok(())
        })?;

        self.emit(RegistryEvent::OwnershipTransferred {
            id,
            new_owner_wallet: new_owner_wallet.to_string(),
        });
        Ok(parcel)
    }

    // =========================================================================
    // Council Decisions
    // =========================================================================

    /// Record a sign-off by `member`
    pub fn approve(&mut self, id: u64, member: &CouncilMember) -> Result<Parcel, RegistryError> {
        let record = approval::approval_record(member, self.clock.today());
        let policy = self.policy;
        let parcel = self.modify(id, |p| approval::apply_decision(p, Decision::Approve, Some(record), &policy))?;

        self.emit(RegistryEvent::ParcelApproved {
            id,
            council_member: member.name.clone(),
            approvals: parcel.approvals.len(),
            status: parcel.status,
        });
        Ok(parcel)
    }

    pub fn reject(&mut self, id: u64) -> Result<Parcel, RegistryError> {
        let policy = self.policy;
        let parcel = self.modify(id, |p| approval::apply_decision(p, Decision::Reject, None, &policy))?;
        self.emit(RegistryEvent::ParcelRejected { id });
        Ok(parcel)
    }

    pub fn dispute(&mut self, id: u64) -> Result<Parcel, RegistryError> {
        let policy = self.policy;
        let parcel = self.modify(id, |p| approval::apply_decision(p, Decision::Dispute, None, &policy))?;
        self.emit(RegistryEvent::ParcelDisputed { id });
        Ok(parcel)
    }

    /// Adopt the status the registry contract reports for `id`.
    ///
    /// Approvals are not synthesized; a reported `pending` is only accepted
    /// while the local parcel is still pending.
    pub fn apply_chain_status(&mut self, id: u64, code: u8) -> Result<Parcel, RegistryError> {
        let target = ParcelStatus::from_chain_code(code);
        let parcel = self.modify(id, |p| approval::transition(p, target))?;
        self.emit(RegistryEvent::StatusSynced { id, status: target });
        Ok(parcel)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn position(&self, id: u64) -> Result<usize, RegistryError> {
        self.parcels
            .iter()
            .position(|p| p.id == id)
            .ok_or(RegistryError::NotFound(id))
    }

    /// Edit one parcel through `f` and commit the result
    fn modify<F>(&mut self, id: u64, f: F) -> Result<Parcel, RegistryError>
    where
        F: FnOnce(&mut Parcel) -> Result<(), RegistryError>,
    {
        let idx = self.position(id)?;
        let mut next = self.parcels.clone();
        f(&mut next[idx])?;
        let updated = next[idx].clone();
        self.commit(next)?;
        Ok(updated)
    }

    fn commit(&mut self, next: Vec<Parcel>) -> Result<(), RegistryError> {
        let snapshot = serde_json::to_string(&next)?;
        self.backend.set(PARCELS_KEY, &snapshot)?;
        debug!(parcels = next.len(), bytes = snapshot.len(), "Persisted parcel snapshot");
        self.parcels = next;
        Ok(())
    }

    fn emit(&self, event: RegistryEvent) {
        if let Some(events) = &self.events {
            events.emit(event);
        }
    }
}

fn max_id(parcels: &[Parcel]) -> u64 {
    parcels.iter().map(|p| p.id).max().unwrap_or(0)
}

fn load_snapshot(backend: &dyn KeyValueStore) -> Vec<Parcel> {
    let raw = match backend.get(PARCELS_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!(error = %e, "Parcel snapshot unreadable, starting empty");
            return Vec::new();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(parcels) => parcels,
        Err(e) => {
            warn!(error = %e, "Parcel snapshot corrupt, starting empty");
            Vec::new()
        }
    }
}
