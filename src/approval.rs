//! Council decisions and the parcel status transition table
//!
//! Transitions are permissive: every decision is accepted from every status,
//! so a council can correct an earlier action. Nothing leads back to
//! `pending`. Approval status additionally depends on [`ApprovalPolicy`].
//!
//! ```text
//!  from \ decision | approve   | reject   | dispute
//!  ----------------+-----------+----------+---------
//!  pending         | approved* | rejected | disputed
//!  approved        | approved  | rejected | disputed
//!  rejected        | approved* | rejected | disputed
//!  disputed        | approved* | rejected | disputed
//!
//!  * once the approval count reaches the policy quorum
//! ```

use chrono::NaiveDate;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RegistryError;
use crate::models::{Approval, CouncilMember, Parcel, ParcelStatus};

/// A council action on a parcel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
    Dispute,
}

impl Decision {
    /// Status the decision targets
    pub fn target(self) -> ParcelStatus {
        match self {
            Decision::Approve => ParcelStatus::Approved,
            Decision::Reject => ParcelStatus::Rejected,
            Decision::Dispute => ParcelStatus::Disputed,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Approve => f.write_str("approve"),
            Decision::Reject => f.write_str("reject"),
            Decision::Dispute => f.write_str("dispute"),
        }
    }
}

impl ParcelStatus {
    /// Statuses reachable from this one
    pub fn valid_transitions(self) -> &'static [ParcelStatus] {
        match self {
            ParcelStatus::Pending
            | ParcelStatus::Approved
            | ParcelStatus::Rejected
            | ParcelStatus::Disputed => &[
                ParcelStatus::Approved,
                ParcelStatus::Rejected,
                ParcelStatus::Disputed,
            ],
        }
    }

    pub fn can_transition_to(self, target: ParcelStatus) -> bool {
        self == target || self.valid_transitions().contains(&target)
    }
}

/// How many sign-offs move a parcel to `approved`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalPolicy {
    pub required_approvals: usize,
}

impl ApprovalPolicy {
    pub fn single_signature() -> Self {
        Self { required_approvals: 1 }
    }

    /// N-of-M quorum; zero is treated as one
    pub fn quorum(required_approvals: usize) -> Self {
        Self {
            required_approvals: required_approvals.max(1),
        }
    }

    pub fn is_satisfied(&self, approvals: usize) -> bool {
        approvals >= self.required_approvals.max(1)
    }
}

impl Default for ApprovalPolicy {
    fn default() -> Self {
        Self::single_signature()
    }
}

/// Demo signature token: `0x` followed by 8 hex digits
pub fn demo_signature() -> String {
    let token: u32 = rand::thread_rng().gen();
    format!("0x{:08x}", token)
}

/// Build the approval record for `member`
pub fn approval_record(member: &CouncilMember, date: NaiveDate) -> Approval {
    Approval {
        council_member_name: member.name.clone(),
        council_member_role: member.role.clone(),
        approval_date: date,
        signature: demo_signature(),
    }
}

/// Move `parcel` to `target` if the table allows it
pub fn transition(parcel: &mut Parcel, target: ParcelStatus) -> Result<(), RegistryError> {
    if !parcel.status.can_transition_to(target) {
        return Err(RegistryError::InvalidTransition {
            from: parcel.status,
            to: target,
        });
    }
    parcel.status = target;
    Ok(())
}

/// Apply a council decision to a parcel.
///
/// `approval` must be given for [`Decision::Approve`]; it is appended before
/// the quorum check. Reject and dispute leave `approvals` untouched.
pub fn apply_decision(
    parcel: &mut Parcel,
    decision: Decision,
    approval: Option<Approval>,
    policy: &ApprovalPolicy,
) -> Result<(), RegistryError> {
    match decision {
        Decision::Approve => {
            if let Some(record) = approval {
                parcel.approvals.push(record);
            }
            if policy.is_satisfied(parcel.approvals.len()) {
                transition(parcel, ParcelStatus::Approved)?;
            }
            Ok(())
        }
        Decision::Reject | Decision::Dispute => transition(parcel, decision.target()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewParcel;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    fn member() -> CouncilMember {
        CouncilMember {
            name: "Ramkumar Sahu".into(),
            role: "Tehsildar".into(),
            phone: "0771-123-4567".into(),
            office: "Raipur Tehsil".into(),
            wallet_address: "0xCouncil1".into(),
        }
    }

    fn pending() -> Parcel {
        NewParcel {
            khasra_number: "K1".into(),
            ..Default::default()
        }
        .into_parcel(1, date())
    }

    #[test]
    fn test_no_transition_back_to_pending() {
        for status in ParcelStatus::ALL {
            assert!(!status.valid_transitions().contains(&ParcelStatus::Pending));
        }
        assert!(ParcelStatus::Pending.can_transition_to(ParcelStatus::Pending));
        assert!(!ParcelStatus::Rejected.can_transition_to(ParcelStatus::Pending));
    }

    #[test]
    fn test_every_decision_allowed_from_every_status() {
        for status in ParcelStatus::ALL {
            for decision in [Decision::Approve, Decision::Reject, Decision::Dispute] {
                assert!(status.can_transition_to(decision.target()), "{} -> {}", status, decision);
            }
        }
    }

    #[test]
    fn test_single_signature_approves() {
        let mut parcel = pending();
        let policy = ApprovalPolicy::default();
        apply_decision(&mut parcel, Decision::Approve, Some(approval_record(&member(), date())), &policy)
            .unwrap();

        assert_eq!(parcel.status, ParcelStatus::Approved);
        assert_eq!(parcel.approvals.len(), 1);
        assert_eq!(parcel.approvals[0].council_member_role, "Tehsildar");
        assert_eq!(parcel.approvals[0].approval_date, date());
    }

    #[test]
    fn test_quorum_keeps_status_until_reached() {
        let mut parcel = pending();
        let policy = ApprovalPolicy::quorum(2);

        apply_decision(&mut parcel, Decision::Approve, Some(approval_record(&member(), date())), &policy)
            .unwrap();
        assert_eq!(parcel.status, ParcelStatus::Pending);

        apply_decision(&mut parcel, Decision::Approve, Some(approval_record(&member(), date())), &policy)
            .unwrap();
        assert_eq!(parcel.status, ParcelStatus::Approved);
    }

    #[test]
    fn test_reject_leaves_approvals() {
        let mut parcel = pending();
        let policy = ApprovalPolicy::default();
        apply_decision(&mut parcel, Decision::Approve, Some(approval_record(&member(), date())), &policy)
            .unwrap();
        apply_decision(&mut parcel, Decision::Reject, None, &policy).unwrap();
        apply_decision(&mut parcel, Decision::Reject, None, &policy).unwrap();

        assert_eq!(parcel.status, ParcelStatus::Rejected);
        assert_eq!(parcel.approvals.len(), 1);
    }

    #[test]
    fn test_demo_signature_shape() {
        let sig = demo_signature();
        assert_eq!(sig.len(), 10);
        assert!(sig.starts_with("0x"));
        assert!(sig[2..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_zero_quorum_is_single_signature() {
        assert_eq!(ApprovalPolicy::quorum(0), ApprovalPolicy::single_signature());
        assert!(ApprovalPolicy { required_approvals: 0 }.is_satisfied(1));
    }
}
