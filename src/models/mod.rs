use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::validation::FieldErrors;

pub mod adherence;
pub mod allergy;
pub mod caregiver;
pub mod communication;
pub mod condition;
pub mod dependent;
pub mod emergency_contact;
pub mod enums;
pub mod family_history;
pub mod immunization;
pub mod medical_aid;
pub mod medication;
pub mod medication_history;
pub mod pharmacy;
pub mod prescription;
pub mod profile;
pub mod sleep;
pub mod surgery;
pub mod vital_sign;

pub use adherence::AdherenceRecord;
pub use allergy::Allergy;
pub use caregiver::Caregiver;
pub use communication::Communication;
pub use condition::Condition;
pub use dependent::Dependent;
pub use emergency_contact::EmergencyContact;
pub use enums::SortDir;
pub use family_history::FamilyHistory;
pub use immunization::Immunization;
pub use medical_aid::MedicalAid;
pub use medication::ActiveMedication;
pub use medication_history::MedicationHistory;
pub use pharmacy::Pharmacy;
pub use prescription::Prescription;
pub use profile::{Address, Profile};
pub use sleep::SleepEntry;
pub use surgery::Surgery;
pub use vital_sign::VitalSign;

pub type QueryMap = HashMap<String, String>;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// A user-owned, soft-deletable record exposed through the generic list/detail handlers.
pub trait Resource: Clone + Serialize + Send + Sync + 'static {
    /// Used in `"<label> not found"` responses.
    const LABEL: &'static str;

    /// Raw request body, shared by create and update.
    type Input: DeserializeOwned + Send + 'static;
    /// Validated create input.
    type Draft: Send + 'static;
    /// Validated partial update.
    type Patch: Send + 'static;
    type Filter: Default + Send + Sync + 'static;
    type Sort: Copy + Default + FromStr + Send + Sync + 'static;

    fn validate_create(input: Self::Input) -> Result<Self::Draft, FieldErrors>;
    fn validate_update(input: Self::Input) -> Result<Self::Patch, FieldErrors>;
    fn parse_filter(query: &QueryMap, errors: &mut FieldErrors) -> Self::Filter;

    fn from_draft(id: Uuid, owner: Uuid, draft: Self::Draft, now: DateTime<Utc>) -> Self;
    fn apply(&mut self, patch: Self::Patch, now: DateTime<Utc>);

    fn id(&self) -> Uuid;
    fn owner(&self) -> Uuid;
    fn is_active(&self) -> bool;
    fn deactivate(&mut self, now: DateTime<Utc>);

    /// In-memory equivalent of the SQL filter; `search` is already lowercased.
    fn matches(&self, filter: &Self::Filter, search: Option<&str>) -> bool;
    /// In-memory equivalent of the SQL `ORDER BY`, ascending.
    fn compare(&self, other: &Self, sort: Self::Sort) -> Ordering;
}

/// Overwrites `slot` when the patch carries a value for it.
pub fn assign<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

pub fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|value| value.to_lowercase().contains(needle))
}

/// Orders like Postgres: NULL sorts after every value.
pub fn cmp_opt<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

pub fn cmp_f64(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (a, b) => cmp_opt(a.map(|_| ()), b.map(|_| ())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn parse(query: &QueryMap, errors: &mut FieldErrors) -> Self {
        let defaults = PageRequest::default();
        PageRequest {
            page: bounded_int(query, "page", errors, defaults.page, i64::MAX),
            page_size: bounded_int(query, "pageSize", errors, defaults.page_size, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    /// The slice of an already filtered and sorted list that this page covers.
    pub fn window<T>(&self, items: Vec<T>) -> Vec<T> {
        let skip = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let take = usize::try_from(self.page_size).unwrap_or(0);
        items.into_iter().skip(skip).take(take).collect()
    }
}

fn bounded_int(
    query: &QueryMap,
    key: &str,
    errors: &mut FieldErrors,
    default: i64,
    max: i64,
) -> i64 {
    let Some(raw) = query.get(key).map(|value| value.trim()).filter(|value| !value.is_empty()) else {
        return default;
    };
    match raw.parse::<i64>() {
        Ok(value) if (1..=max).contains(&value) => value,
        Ok(_) => {
            errors.push(key, format!("Must be between 1 and {max}"));
            default
        }
        Err(_) => {
            errors.push(key, "Must be a positive integer");
            default
        }
    }
}

/// Parsed `GET` list query for one resource.
pub struct ListParams<R: Resource> {
    pub paging: PageRequest,
    pub search: Option<String>,
    pub sort_by: R::Sort,
    pub sort_dir: SortDir,
    pub filter: R::Filter,
}

impl<R: Resource> ListParams<R> {
    pub fn parse(query: &QueryMap) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::default();
        let paging = PageRequest::parse(query, &mut errors);
        let search = query
            .get("search")
            .map(|term| term.trim().to_owned())
            .filter(|term| !term.is_empty());
        let sort_by = parse_or_default(query, "sort_by", &mut errors);
        let sort_dir = parse_or_default(query, "sort_dir", &mut errors);
        let filter = R::parse_filter(query, &mut errors);
        errors.into_result(ListParams {
            paging,
            search,
            sort_by,
            sort_dir,
            filter,
        })
    }

    /// `ILIKE` pattern for the search term, with LIKE metacharacters escaped.
    pub fn search_pattern(&self) -> Option<String> {
        self.search.as_deref().map(like_pattern)
    }

    pub fn search_needle(&self) -> Option<String> {
        self.search.as_deref().map(str::to_lowercase)
    }
}

fn parse_or_default<T: FromStr + Default>(
    query: &QueryMap,
    key: &str,
    errors: &mut FieldErrors,
) -> T {
    match query.get(key).map(|value| value.trim()).filter(|value| !value.is_empty()) {
        None => T::default(),
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            errors.push(key, format!("Invalid value '{raw}'"));
            T::default()
        }),
    }
}

pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// Paged list response body.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    #[serde(rename = "pageSize")]
    pub page_size: i64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: i64, paging: PageRequest) -> Self {
        Page {
            data,
            total,
            page: paging.page,
            page_size: paging.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::allergy::AllergySort;

    fn query(pairs: &[(&str, &str)]) -> QueryMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_apply_when_absent() {
        let params = ListParams::<Allergy>::parse(&QueryMap::new()).unwrap();
        assert_eq!(params.paging, PageRequest::default());
        assert_eq!(params.sort_by, AllergySort::CreatedAt);
        assert_eq!(params.sort_dir, SortDir::Desc);
        assert!(params.search.is_none());
    }

    #[test]
    fn page_size_above_limit_is_rejected() {
        let errors = ListParams::<Allergy>::parse(&query(&[("pageSize", "200")])).err().unwrap();
        assert!(errors.contains("pageSize"));
        let errors = ListParams::<Allergy>::parse(&query(&[("page", "0")])).err().unwrap();
        assert!(errors.contains("page"));
    }

    #[test]
    fn unknown_sort_and_filter_values_are_rejected() {
        let errors = ListParams::<Allergy>::parse(&query(&[("sort_by", "user_id"), ("severity", "fatal")]))
            .err()
            .unwrap();
        assert!(errors.contains("sort_by"));
        assert!(errors.contains("severity"));
    }

    #[test]
    fn search_pattern_escapes_wildcards() {
        let params = ListParams::<Allergy>::parse(&query(&[("search", " 50%_off ")])).unwrap();
        assert_eq!(params.search_pattern().as_deref(), Some("%50\\%\\_off%"));
        assert_eq!(params.search_needle().as_deref(), Some("50%_off"));
    }

    #[test]
    fn window_slices_requested_page() {
        let paging = PageRequest { page: 2, page_size: 3 };
        assert_eq!(paging.offset(), 3);
        assert_eq!(paging.window((1..=8).collect()), vec![4, 5, 6]);
        let past_end = PageRequest { page: 5, page_size: 3 };
        assert!(past_end.window((1..=8).collect::<Vec<_>>()).is_empty());
    }

    #[test]
    fn missing_values_sort_last() {
        assert_eq!(cmp_f64(None, Some(1.0)), Ordering::Greater);
        assert_eq!(cmp_opt(Some("a"), None), Ordering::Less);
        assert_eq!(cmp_f64(Some(2.0), Some(1.0)), Ordering::Greater);
    }
}
