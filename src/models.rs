//! Parcel records and the payloads used to create and edit them
//!
//! Field names serialize in camelCase so the persisted snapshot under
//! `land_registry_parcels` keeps the layout the browser client wrote.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Review status of a parcel claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParcelStatus {
    Pending,
    Approved,
    Rejected,
    Disputed,
}

impl ParcelStatus {
    pub const ALL: [ParcelStatus; 4] = [
        ParcelStatus::Pending,
        ParcelStatus::Approved,
        ParcelStatus::Rejected,
        ParcelStatus::Disputed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParcelStatus::Pending => "pending",
            ParcelStatus::Approved => "approved",
            ParcelStatus::Rejected => "rejected",
            ParcelStatus::Disputed => "disputed",
        }
    }

    /// Map the numeric status used by the registry contract
    pub fn from_chain_code(code: u8) -> Self {
        match code {
            1 => ParcelStatus::Approved,
            2 => ParcelStatus::Rejected,
            3 => ParcelStatus::Disputed,
            _ => ParcelStatus::Pending,
        }
    }
}

impl fmt::Display for ParcelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParcelStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ParcelStatus::Pending),
            "approved" => Ok(ParcelStatus::Approved),
            "rejected" => Ok(ParcelStatus::Rejected),
            "disputed" => Ok(ParcelStatus::Disputed),
            other => Err(format!("unknown parcel status: {}", other)),
        }
    }
}

/// Council sign-off recorded on a parcel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    pub council_member_name: String,
    pub council_member_role: String,
    pub approval_date: NaiveDate,
    /// Demo token, not a cryptographic signature
    pub signature: String,
}

/// Reviewer reference data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouncilMember {
    pub name: String,
    pub role: String,
    pub phone: String,
    pub office: String,
    pub wallet_address: String,
}

/// A land claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parcel {
    pub id: u64,
    pub khasra_number: String,
    pub owner_name: String,
    pub owner_wallet: String,
    pub district: String,
    pub tehsil: String,
    pub village: String,
    /// Square meters
    #[serde(with = "area_format")]
    pub area: f64,
    pub status: ParcelStatus,
    pub created_date: NaiveDate,
    #[serde(rename = "documentCID", default, skip_serializing_if = "Option::is_none")]
    pub document_cid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_link: Option<String>,
    #[serde(default)]
    pub approvals: Vec<Approval>,
}

/// Submission payload: a parcel before the store assigns id, date and status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewParcel {
    pub khasra_number: String,
    pub owner_name: String,
    pub owner_wallet: String,
    pub district: String,
    pub tehsil: String,
    pub village: String,
    #[serde(with = "area_format")]
    pub area: f64,
    #[serde(rename = "documentCID", default)]
    pub document_cid: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub map_link: Option<String>,
}

impl NewParcel {
    pub(crate) fn into_parcel(self, id: u64, created_date: NaiveDate) -> Parcel {
        Parcel {
            id,
            khasra_number: self.khasra_number,
            owner_name: self.owner_name,
            owner_wallet: self.owner_wallet,
            district: self.district,
            tehsil: self.tehsil,
            village: self.village,
            area: self.area,
            status: ParcelStatus::Pending,
            created_date,
            document_cid: self.document_cid,
            notes: self.notes,
            map_link: self.map_link,
            approvals: Vec::new(),
        }
    }
}

/// Partial edit of the owner-editable fields.
///
/// Identity, creation date, status and approvals are not representable here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParcelUpdate {
    pub khasra_number: Option<String>,
    pub owner_name: Option<String>,
    pub owner_wallet: Option<String>,
    pub district: Option<String>,
    pub tehsil: Option<String>,
    pub village: Option<String>,
    pub area: Option<f64>,
    #[serde(rename = "documentCID")]
    pub document_cid: Option<String>,
    pub notes: Option<String>,
    pub map_link: Option<String>,
}

impl ParcelUpdate {
    pub fn is_empty(&self) -> bool {
        *self == ParcelUpdate::default()
    }

    /// Merge present fields into `parcel`
    pub fn apply_to(&self, parcel: &mut Parcel) {
        fn merge<T: Clone>(slot: &mut T, value: &Option<T>) {
            if let Some(v) = value {
                *slot = v.clone();
            }
        }

        merge(&mut parcel.khasra_number, &self.khasra_number);
        merge(&mut parcel.owner_name, &self.owner_name);
        merge(&mut parcel.owner_wallet, &self.owner_wallet);
        merge(&mut parcel.district, &self.district);
        merge(&mut parcel.tehsil, &self.tehsil);
        merge(&mut parcel.village, &self.village);
        merge(&mut parcel.area, &self.area);

        if self.document_cid.is_some() {
            parcel.document_cid = self.document_cid.clone();
        }
        if self.notes.is_some() {
            parcel.notes = self.notes.clone();
        }
        if self.map_link.is_some() {
            parcel.map_link = self.map_link.clone();
        }
    }
}

/// Per-status totals for the council dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub disputed: usize,
}

impl StatusCounts {
    pub fn record(&mut self, status: ParcelStatus) {
        match status {
            ParcelStatus::Pending => self.pending += 1,
            ParcelStatus::Approved => self.approved += 1,
            ParcelStatus::Rejected => self.rejected += 1,
            ParcelStatus::Disputed => self.disputed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.approved + self.rejected + self.disputed
    }
}

/// Area is stored unvalidated, so NaN and the infinities must survive a
/// snapshot round trip. JSON has no literal for them: they are written as
/// strings ("NaN", "inf", "-inf"). A `null` left by older snapshots reads
/// as NaN.
mod area_format {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawArea {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(area: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if area.is_finite() {
            serializer.serialize_f64(*area)
        } else {
            serializer.serialize_str(&area.to_string())
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Option::<RawArea>::deserialize(deserializer)? {
            Some(RawArea::Number(area)) => Ok(area),
            Some(RawArea::Text(text)) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| D::Error::custom(format!("invalid area: {:?}", text))),
            None => Ok(f64::NAN),
        }
    }
}
