//! Parcel search criteria
//!
//! All criteria are optional and combine with AND. Empty strings and an
//! empty status list impose no constraint.

use serde::{Deserialize, Serialize};

use crate::models::{Parcel, ParcelStatus};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchCriteria {
    /// Exact match against the parcel id rendered as a string
    pub khasra_id: Option<String>,
    /// Exact match
    pub district: Option<String>,
    pub tehsil: Option<String>,
    pub village: Option<String>,
    pub khasra_number: Option<String>,
    pub owner_name: Option<String>,
    pub statuses: Vec<ParcelStatus>,
}

fn given(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl SearchCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_khasra_id(mut self, id: impl Into<String>) -> Self {
        self.khasra_id = Some(id.into());
        self
    }

    pub fn with_district(mut self, district: impl Into<String>) -> Self {
        self.district = Some(district.into());
        self
    }

    pub fn with_tehsil(mut self, tehsil: impl Into<String>) -> Self {
        self.tehsil = Some(tehsil.into());
        self
    }

    pub fn with_village(mut self, village: impl Into<String>) -> Self {
        self.village = Some(village.into());
        self
    }

    pub fn with_khasra_number(mut self, number: impl Into<String>) -> Self {
        self.khasra_number = Some(number.into());
        self
    }

    pub fn with_owner_name(mut self, name: impl Into<String>) -> Self {
        self.owner_name = Some(name.into());
        self
    }

    pub fn with_status(mut self, status: ParcelStatus) -> Self {
        self.statuses.push(status);
        self
    }

    /// True when no criterion constrains the result
    pub fn is_empty(&self) -> bool {
        given(&self.khasra_id).is_none()
            && given(&self.district).is_none()
            && given(&self.tehsil).is_none()
            && given(&self.village).is_none()
            && given(&self.khasra_number).is_none()
            && given(&self.owner_name).is_none()
            && self.statuses.is_empty()
    }

    pub fn matches(&self, parcel: &Parcel) -> bool {
        if let Some(id) = given(&self.khasra_id) {
            if parcel.id.to_string() != id {
                return false;
            }
        }
        if let Some(district) = given(&self.district) {
            if parcel.district != district {
                return false;
            }
        }
        if let Some(tehsil) = given(&self.tehsil) {
            if !contains_ci(&parcel.tehsil, tehsil) {
                return false;
            }
        }
        if let Some(village) = given(&self.village) {
            if !contains_ci(&parcel.village, village) {
                return false;
            }
        }
        if let Some(number) = given(&self.khasra_number) {
            if !contains_ci(&parcel.khasra_number, number) {
                return false;
            }
        }
        if let Some(owner) = given(&self.owner_name) {
            if !contains_ci(&parcel.owner_name, owner) {
                return false;
            }
        }
        self.statuses.is_empty() || self.statuses.contains(&parcel.status)
    }

    /// Matching parcels in their original order
    pub fn filter<'a, I>(&self, parcels: I) -> Vec<Parcel>
    where
        I: IntoIterator<Item = &'a Parcel>,
    {
        parcels.into_iter().filter(|p| self.matches(p)).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewParcel;
    use chrono::NaiveDate;

    fn parcel(id: u64, district: &str, village: &str, owner: &str, status: ParcelStatus) -> Parcel {
        let mut p = NewParcel {
            khasra_number: format!("KH-{}", id * 10),
            owner_name: owner.into(),
            district: district.into(),
            tehsil: "Arang".into(),
            village: village.into(),
            area: 100.0,
            ..Default::default()
        }
        .into_parcel(id, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        p.status = status;
        p
    }

    fn fixture() -> Vec<Parcel> {
        vec![
            parcel(1, "Raipur", "X", "Meena Sahu", ParcelStatus::Pending),
            parcel(2, "Durg", "X", "Ravi Verma", ParcelStatus::Approved),
            parcel(12, "Raipur", "Nardaha", "Ravi Kumar", ParcelStatus::Disputed),
        ]
    }

    #[test]
    fn test_empty_criteria_returns_all_in_order() {
        let parcels = fixture();
        let result = SearchCriteria::new().filter(&parcels);
        assert_eq!(result, parcels);
        assert!(SearchCriteria::new().is_empty());
    }

    #[test]
    fn test_district_exact_and_village_case_insensitive() {
        let parcels = fixture();
        let result = SearchCriteria::new()
            .with_district("Raipur")
            .with_village("x")
            .filter(&parcels);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, 1);
    }

    #[test]
    fn test_district_is_not_substring() {
        let parcels = fixture();
        assert!(SearchCriteria::new().with_district("raipur").filter(&parcels).is_empty());
        assert!(SearchCriteria::new().with_district("Rai").filter(&parcels).is_empty());
    }

    #[test]
    fn test_khasra_id_is_exact() {
        let parcels = fixture();
        let result = SearchCriteria::new().with_khasra_id("1").filter(&parcels);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, 1);
    }

    #[test]
    fn test_owner_and_khasra_number_substrings() {
        let parcels = fixture();
        let ravis = SearchCriteria::new().with_owner_name("RAVI").filter(&parcels);
        assert_eq!(ravis.iter().map(|p| p.id).collect::<Vec<_>>(), vec![2, 12]);

        let kh = SearchCriteria::new().with_khasra_number("kh-12").filter(&parcels);
        assert_eq!(kh.iter().map(|p| p.id).collect::<Vec<_>>(), vec![12]);
    }

    #[test]
    fn test_status_set() {
        let parcels = fixture();
        let result = SearchCriteria::new()
            .with_status(ParcelStatus::Approved)
            .with_status(ParcelStatus::Disputed)
            .filter(&parcels);
        assert_eq!(result.iter().map(|p| p.id).collect::<Vec<_>>(), vec![2, 12]);
    }

    #[test]
    fn test_empty_strings_are_ignored() {
        let parcels = fixture();
        let criteria = SearchCriteria {
            district: Some(String::new()),
            owner_name: Some(String::new()),
            ..Default::default()
        };
        assert!(criteria.is_empty());
        assert_eq!(criteria.filter(&parcels).len(), 3);
    }

    #[test]
    fn test_criteria_from_json() {
        let criteria: SearchCriteria =
            serde_json::from_str(r#"{"district":"Durg","statuses":["approved"]}"#).unwrap();
        let parcels = fixture();
        assert_eq!(criteria.filter(&parcels)[0].id, 2);
    }
}
