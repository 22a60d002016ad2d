use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::assign;
use crate::models::enums::{AddressType, Gender, MaritalStatus};
use crate::schema::{addresses, profiles};
use crate::validation::{self as check, Bounds, FieldErrors, Presence};

const LATITUDE: Bounds = Bounds::range(-90.0, 90.0);
const LONGITUDE: Bounds = Bounds::range(-180.0, 180.0);

/// Minimum length of a directory search term.
pub const MIN_DIRECTORY_QUERY: usize = 2;
pub const DIRECTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = profiles, primary_key(profile_id), treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Profile {
    pub profile_id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub title: Option<String>,
    pub middle_name: Option<String>,
    pub nick_name: Option<String>,
    pub id_number: Option<String>,
    pub passport_number: Option<String>,
    pub citizenship: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub marital_status: Option<MaritalStatus>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub primary_language: Option<String>,
    pub languages_spoken: Option<Vec<String>>,
    pub profile_picture_url: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub max_pharmacy_distance_km: Option<f64>,
    pub location_updated_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub title: Option<String>,
    pub middle_name: Option<String>,
    pub nick_name: Option<String>,
    pub id_number: Option<String>,
    pub passport_number: Option<String>,
    pub citizenship: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub marital_status: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub primary_language: Option<String>,
    pub languages_spoken: Option<Vec<String>>,
    pub profile_picture_url: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub max_pharmacy_distance_km: Option<f64>,
}

#[derive(Debug)]
pub struct ProfileUpdate {
    first_name: String,
    last_name: String,
    title: Option<Option<String>>,
    middle_name: Option<Option<String>>,
    nick_name: Option<Option<String>>,
    id_number: Option<Option<String>>,
    passport_number: Option<Option<String>>,
    citizenship: Option<Option<String>>,
    date_of_birth: Option<Option<NaiveDate>>,
    gender: Option<Option<Gender>>,
    marital_status: Option<Option<MaritalStatus>>,
    phone: Option<Option<String>>,
    email: Option<Option<String>>,
    primary_language: Option<Option<String>>,
    languages_spoken: Option<Option<Vec<String>>>,
    profile_picture_url: Option<Option<String>>,
    latitude: Option<Option<f64>>,
    longitude: Option<Option<f64>>,
    max_pharmacy_distance_km: Option<Option<f64>>,
}

impl ProfileInput {
    pub fn validate(self) -> Result<ProfileUpdate, FieldErrors> {
        let mut errors = FieldErrors::default();
        let e = &mut errors;
        let (required, optional) = (Presence::Required, Presence::Optional);

        let first_name = check::text(e, "first_name", self.first_name, required, usize::MAX);
        let last_name = check::text(e, "last_name", self.last_name, required, usize::MAX);
        let title = check::changed(self.title, |raw| {
            check::text(e, "title", raw, optional, usize::MAX)
        });
        let middle_name = check::changed(self.middle_name, |raw| {
            check::text(e, "middle_name", raw, optional, usize::MAX)
        });
        let nick_name = check::changed(self.nick_name, |raw| {
            check::text(e, "nick_name", raw, optional, usize::MAX)
        });
        let id_number = check::changed(self.id_number, |raw| {
            check::text(e, "id_number", raw, optional, usize::MAX)
        });
        let passport_number = check::changed(self.passport_number, |raw| {
            check::text(e, "passport_number", raw, optional, usize::MAX)
        });
        let citizenship = check::changed(self.citizenship, |raw| {
            check::text(e, "citizenship", raw, optional, usize::MAX)
        });
        let date_of_birth = check::changed(self.date_of_birth, |raw| check::date(e, "date_of_birth", raw));
        let gender = check::changed(self.gender, |raw| check::choice(e, "gender", raw, optional));
        let marital_status = check::changed(self.marital_status, |raw| check::choice(e, "marital_status", raw, optional));
        let phone = check::changed(self.phone, |raw| check::phone(e, "phone", raw, optional));
        let email = check::changed(self.email, |raw| check::email(e, "email", raw, optional));
        let primary_language = check::changed(self.primary_language, |raw| {
            check::text(e, "primary_language", raw, optional, usize::MAX)
        });
        let languages_spoken = self.languages_spoken.map(|languages| {
            let cleaned: Vec<String> = languages
                .into_iter()
                .map(|language| language.trim().to_owned())
                .filter(|language| !language.is_empty())
                .collect();
            (!cleaned.is_empty()).then_some(cleaned)
        });
        let profile_picture_url = check::changed(self.profile_picture_url, |raw| {
            check::text(e, "profile_picture_url", raw, optional, usize::MAX)
        });
        let latitude = self.latitude.map(|value| check::number(e, "latitude", Some(value), LATITUDE));
        let longitude = self.longitude.map(|value| check::number(e, "longitude", Some(value), LONGITUDE));
        let max_pharmacy_distance_km = self.max_pharmacy_distance_km.map(|value| {
            check::number(e, "max_pharmacy_distance_km", Some(value), Bounds::positive(20_000.0))
        });

        match (first_name, last_name) {
            (Some(first_name), Some(last_name)) if errors.is_empty() => Ok(ProfileUpdate {
                first_name,
                last_name,
                title,
                middle_name,
                nick_name,
                id_number,
                passport_number,
                citizenship,
                date_of_birth,
                gender,
                marital_status,
                phone,
                email,
                primary_language,
                languages_spoken,
                profile_picture_url,
                latitude,
                longitude,
                max_pharmacy_distance_km,
            }),
            _ => Err(errors),
        }
    }
}

impl Profile {
    pub fn create(id: Uuid, owner: Uuid, update: ProfileUpdate, now: DateTime<Utc>) -> Self {
        let mut profile = Profile {
            profile_id: id,
            user_id: owner,
            first_name: String::new(),
            last_name: String::new(),
            title: None,
            middle_name: None,
            nick_name: None,
            id_number: None,
            passport_number: None,
            citizenship: None,
            date_of_birth: None,
            gender: None,
            marital_status: None,
            phone: None,
            email: None,
            primary_language: None,
            languages_spoken: None,
            profile_picture_url: None,
            latitude: None,
            longitude: None,
            max_pharmacy_distance_km: None,
            location_updated_at: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        profile.apply(update, now);
        profile
    }

    pub fn apply(&mut self, update: ProfileUpdate, now: DateTime<Utc>) {
        if update.latitude.is_some() || update.longitude.is_some() {
            self.location_updated_at = Some(now);
        }
        self.first_name = update.first_name;
        self.last_name = update.last_name;
        assign(&mut self.title, update.title);
        assign(&mut self.middle_name, update.middle_name);
        assign(&mut self.nick_name, update.nick_name);
        assign(&mut self.id_number, update.id_number);
        assign(&mut self.passport_number, update.passport_number);
        assign(&mut self.citizenship, update.citizenship);
        assign(&mut self.date_of_birth, update.date_of_birth);
        assign(&mut self.gender, update.gender);
        assign(&mut self.marital_status, update.marital_status);
        assign(&mut self.phone, update.phone);
        assign(&mut self.email, update.email);
        assign(&mut self.primary_language, update.primary_language);
        assign(&mut self.languages_spoken, update.languages_spoken);
        assign(&mut self.profile_picture_url, update.profile_picture_url);
        assign(&mut self.latitude, update.latitude);
        assign(&mut self.longitude, update.longitude);
        assign(&mut self.max_pharmacy_distance_km, update.max_pharmacy_distance_km);
        self.updated_at = now;
    }

    /// `(latitude, longitude)` when both are recorded.
    pub fn location(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }

    pub fn directory_entry(&self) -> DirectoryEntry {
        DirectoryEntry {
            user_id: self.user_id,
            email: self.email.clone(),
            first_name: Some(self.first_name.clone()),
            last_name: Some(self.last_name.clone()),
            nickname: self.nick_name.clone(),
        }
    }

    /// In-memory equivalent of the directory search; `needle` is lowercased.
    pub fn matches_directory(&self, needle: &str) -> bool {
        [
            self.email.as_deref(),
            Some(self.first_name.as_str()),
            Some(self.last_name.as_str()),
            self.nick_name.as_deref(),
        ]
        .into_iter()
        .any(|field| crate::models::contains_ci(field, needle))
    }
}

/// Recipient search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectoryEntry {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub nickname: Option<String>,
}

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = addresses, primary_key(address_id), treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Address {
    pub address_id: Uuid,
    pub user_id: Uuid,
    pub address_type: AddressType,
    pub same_as_home: bool,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub street_no: Option<String>,
    pub street_name: Option<String>,
    pub suburb: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub live_in_complex: bool,
    pub complex_no: Option<String>,
    pub complex_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AddressInput {
    #[serde(rename = "type")]
    pub address_type: Option<String>,
    pub same_as_home: Option<bool>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub street_no: Option<String>,
    pub street_name: Option<String>,
    pub suburb: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub live_in_complex: Option<bool>,
    pub complex_no: Option<String>,
    pub complex_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug)]
pub struct AddressUpdate {
    pub address_type: AddressType,
    same_as_home: Option<bool>,
    address1: Option<Option<String>>,
    address2: Option<Option<String>>,
    street_no: Option<Option<String>>,
    street_name: Option<Option<String>>,
    suburb: Option<Option<String>>,
    city: Option<Option<String>>,
    province: Option<Option<String>>,
    postal_code: Option<Option<String>>,
    country: Option<Option<String>>,
    live_in_complex: Option<bool>,
    complex_no: Option<Option<String>>,
    complex_name: Option<Option<String>>,
    latitude: Option<Option<f64>>,
    longitude: Option<Option<f64>>,
}

impl AddressInput {
    pub fn validate(self) -> Result<AddressUpdate, FieldErrors> {
        let mut errors = FieldErrors::default();
        let e = &mut errors;
        let optional = Presence::Optional;

        let address_type: Option<AddressType> = check::choice(e, "type", self.address_type, Presence::Required);
        if address_type == Some(AddressType::Home) && self.same_as_home == Some(true) {
            e.push("same_as_home", "Only postal and delivery addresses can mirror the home address");
        }
        let address1 = check::changed(self.address1, |raw| {
            check::text(e, "address1", raw, Presence::NonEmpty, 200)
        });
        let address2 = check::changed(self.address2, |raw| {
            check::text(e, "address2", raw, optional, 200)
        });
        let street_no = check::changed(self.street_no, |raw| {
            check::text(e, "street_no", raw, optional, 50)
        });
        let street_name = check::changed(self.street_name, |raw| {
            check::text(e, "street_name", raw, optional, 200)
        });
        let suburb = check::changed(self.suburb, |raw| {
            check::text(e, "suburb", raw, optional, 200)
        });
        let city = check::changed(self.city, |raw| check::text(e, "city", raw, optional, 200));
        let province = check::changed(self.province, |raw| {
            check::text(e, "province", raw, optional, 200)
        });
        let postal_code = check::changed(self.postal_code, |raw| {
            check::text(e, "postal_code", raw, optional, 20)
        });
        let country = check::changed(self.country, |raw| {
            check::text(e, "country", raw, optional, 120)
        });
        let complex_no = check::changed(self.complex_no, |raw| {
            check::text(e, "complex_no", raw, optional, 50)
        });
        let complex_name = check::changed(self.complex_name, |raw| {
            check::text(e, "complex_name", raw, optional, 200)
        });
        let latitude = self.latitude.map(|value| check::number(e, "latitude", Some(value), LATITUDE));
        let longitude = self.longitude.map(|value| check::number(e, "longitude", Some(value), LONGITUDE));

        match address_type {
            Some(address_type) if errors.is_empty() => Ok(AddressUpdate {
                address_type,
                same_as_home: self.same_as_home,
                address1,
                address2,
                street_no,
                street_name,
                suburb,
                city,
                province,
                postal_code,
                country,
                live_in_complex: self.live_in_complex,
                complex_no,
                complex_name,
                latitude,
                longitude,
            }),
            _ => Err(errors),
        }
    }
}

impl Address {
    pub fn create(id: Uuid, owner: Uuid, update: AddressUpdate, now: DateTime<Utc>) -> Self {
        let mut address = Address {
            address_id: id,
            user_id: owner,
            address_type: update.address_type,
            same_as_home: false,
            address1: None,
            address2: None,
            street_no: None,
            street_name: None,
            suburb: None,
            city: None,
            province: None,
            postal_code: None,
            country: None,
            live_in_complex: false,
            complex_no: None,
            complex_name: None,
            latitude: None,
            longitude: None,
            created_at: now,
            updated_at: now,
        };
        address.apply(update, now);
        address
    }

    pub fn apply(&mut self, update: AddressUpdate, now: DateTime<Utc>) {
        assign(&mut self.same_as_home, update.same_as_home);
        assign(&mut self.address1, update.address1);
        assign(&mut self.address2, update.address2);
        assign(&mut self.street_no, update.street_no);
        assign(&mut self.street_name, update.street_name);
        assign(&mut self.suburb, update.suburb);
        assign(&mut self.city, update.city);
        assign(&mut self.province, update.province);
        assign(&mut self.postal_code, update.postal_code);
        assign(&mut self.country, update.country);
        assign(&mut self.live_in_complex, update.live_in_complex);
        assign(&mut self.complex_no, update.complex_no);
        assign(&mut self.complex_name, update.complex_name);
        assign(&mut self.latitude, update.latitude);
        assign(&mut self.longitude, update.longitude);
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named() -> ProfileInput {
        ProfileInput {
            first_name: Some("Naledi".into()),
            last_name: Some("Dube".into()),
            ..ProfileInput::default()
        }
    }

    #[test]
    fn names_are_always_required() {
        let errors = ProfileInput::default().validate().unwrap_err();
        assert!(errors.contains("first_name"));
        assert!(errors.contains("last_name"));
    }

    #[test]
    fn coordinates_stamp_location_time() {
        let created = Utc::now();
        let mut profile = Profile::create(Uuid::new_v4(), Uuid::new_v4(), named().validate().unwrap(), created);
        assert!(profile.location_updated_at.is_none());
        assert!(profile.location().is_none());

        let later = created + chrono::Duration::minutes(1);
        let update = ProfileInput {
            latitude: Some(-33.92),
            longitude: Some(18.42),
            ..named()
        }
        .validate()
        .unwrap();
        profile.apply(update, later);
        assert_eq!(profile.location(), Some((-33.92, 18.42)));
        assert_eq!(profile.location_updated_at, Some(later));
    }

    #[test]
    fn coordinates_are_range_checked() {
        let errors = ProfileInput {
            latitude: Some(91.0),
            longitude: Some(-181.0),
            max_pharmacy_distance_km: Some(0.0),
            ..named()
        }
        .validate()
        .unwrap_err();
        assert!(errors.contains("latitude"));
        assert!(errors.contains("longitude"));
        assert!(errors.contains("max_pharmacy_distance_km"));
    }

    #[test]
    fn directory_search_covers_names_and_email() {
        let profile = Profile::create(
            Uuid::new_v4(),
            Uuid::new_v4(),
            ProfileInput {
                email: Some("naledi@example.org".into()),
                nick_name: Some("Ledi".into()),
                ..named()
            }
            .validate()
            .unwrap(),
            Utc::now(),
        );
        assert!(profile.matches_directory("dube"));
        assert!(profile.matches_directory("example.org"));
        assert!(profile.matches_directory("ledi"));
        assert!(!profile.matches_directory("zulu"));
        assert_eq!(profile.directory_entry().nickname.as_deref(), Some("Ledi"));
    }

    #[test]
    fn address_type_is_required() {
        let errors = AddressInput::default().validate().unwrap_err();
        assert!(errors.contains("type"));
        let errors = AddressInput {
            address_type: Some("home".into()),
            same_as_home: Some(true),
            ..AddressInput::default()
        }
        .validate()
        .unwrap_err();
        assert!(errors.contains("same_as_home"));
    }

    #[test]
    fn postal_address_upsert() {
        let update = AddressInput {
            address_type: Some("postal".into()),
            same_as_home: Some(true),
            city: Some(" Durban ".into()),
            ..AddressInput::default()
        }
        .validate()
        .unwrap();
        let address = Address::create(Uuid::new_v4(), Uuid::new_v4(), update, Utc::now());
        assert_eq!(address.address_type, AddressType::Postal);
        assert!(address.same_as_home);
        assert_eq!(address.city.as_deref(), Some("Durban"));
    }
}
