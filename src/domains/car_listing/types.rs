use crate::domains::history::diff::Auditable;
use crate::errors::DomainResult;
use crate::types::{format_timestamp, parse_timestamp};
use crate::validation::{Validate, ValidationBuilder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Value};
use sqlx::FromRow;

const UNKNOWN: &str = "Неизвестно";
const UNKNOWN_SELLER: &str = "Неизвестен";
const NO_PHONE: &str = "Не указан";

fn serialize_timestamp<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format_timestamp(dt))
}

/// A scraped car-sale listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarListing {
    pub id: i64,
    pub short_url: String,
    pub title: String,
    pub make: String,
    pub model: String,
    pub year: String,
    pub body_type: String,
    pub horsepower: String,
    pub fuel_type: String,
    pub motors_trim: String,
    pub kilometers: i64,
    pub price_formatted: String,
    pub price_raw: f64,
    pub currency: String,
    pub exterior_color: String,
    pub location: String,
    pub phone: String,
    pub seller_name: String,
    pub seller_type: String,
    pub seller_logo: Option<String>,
    pub seller_profile_link: Option<String>,
    pub status: Option<String>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Auditable for CarListing {
    fn audit_snapshot(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("short_url", json!(self.short_url)),
            ("title", json!(self.title)),
            ("make", json!(self.make)),
            ("model", json!(self.model)),
            ("year", json!(self.year)),
            ("body_type", json!(self.body_type)),
            ("horsepower", json!(self.horsepower)),
            ("fuel_type", json!(self.fuel_type)),
            ("motors_trim", json!(self.motors_trim)),
            ("kilometers", json!(self.kilometers)),
            ("price_formatted", json!(self.price_formatted)),
            ("price_raw", json!(self.price_raw)),
            ("currency", json!(self.currency)),
            ("exterior_color", json!(self.exterior_color)),
            ("location", json!(self.location)),
            ("phone", json!(self.phone)),
            ("seller_name", json!(self.seller_name)),
            ("seller_type", json!(self.seller_type)),
            ("seller_logo", json!(self.seller_logo)),
            ("seller_profile_link", json!(self.seller_profile_link)),
            ("status", json!(self.status)),
            ("created_at", json!(format_timestamp(&self.created_at))),
            ("updated_at", json!(format_timestamp(&self.updated_at))),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CarPhoto {
    pub id: i64,
    pub listing_id: i64,
    pub photo_url: String,
}

/// Listing with its photo URLs, as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct CarListingResponse {
    #[serde(flatten)]
    pub listing: CarListing,
    pub images: Vec<String>,
    pub main_image: Option<String>,
}

impl CarListingResponse {
    /// `images` must be in photo id order
    pub fn new(listing: CarListing, images: Vec<String>) -> Self {
        let main_image = images.first().cloned();
        Self { listing, images, main_image }
    }
}

/// NewCarListing DTO; omitted fields take the column defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewCarListing {
    pub short_url: String,
    pub title: String,
    pub make: String,
    pub model: String,
    pub year: String,
    pub body_type: String,
    pub horsepower: String,
    pub fuel_type: String,
    pub motors_trim: String,
    pub kilometers: i64,
    pub price_formatted: String,
    pub price_raw: f64,
    pub currency: String,
    pub exterior_color: String,
    pub location: String,
    pub phone: String,
    pub seller_name: String,
    pub seller_type: String,
    pub seller_logo: Option<String>,
    pub seller_profile_link: Option<String>,
    pub status: Option<String>,
    /// Photo URLs in display order
    pub photos: Vec<String>,
}

impl Default for NewCarListing {
    fn default() -> Self {
        Self {
            short_url: String::new(),
            title: UNKNOWN.to_string(),
            make: UNKNOWN.to_string(),
            model: UNKNOWN.to_string(),
            year: UNKNOWN.to_string(),
            body_type: UNKNOWN.to_string(),
            horsepower: UNKNOWN.to_string(),
            fuel_type: UNKNOWN.to_string(),
            motors_trim: UNKNOWN.to_string(),
            kilometers: 0,
            price_formatted: "0".to_string(),
            price_raw: 0.0,
            currency: UNKNOWN.to_string(),
            exterior_color: UNKNOWN.to_string(),
            location: UNKNOWN.to_string(),
            phone: NO_PHONE.to_string(),
            seller_name: UNKNOWN_SELLER.to_string(),
            seller_type: UNKNOWN_SELLER.to_string(),
            seller_logo: None,
            seller_profile_link: None,
            status: None,
            photos: Vec::new(),
        }
    }
}

impl Validate for NewCarListing {
    fn validate(&self) -> DomainResult<()> {
        ValidationBuilder::new("short_url", Some(self.short_url.trim().to_string()))
            .required()
            .validate()?;

        ValidationBuilder::new("kilometers", Some(self.kilometers))
            .min(0)
            .validate()?;

        ValidationBuilder::new("price_raw", Some(self.price_raw))
            .min(0.0)
            .validate()?;

        Ok(())
    }
}

/// UpdateCarListing DTO; `photos`, when present, replaces the whole photo set
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UpdateCarListing {
    pub short_url: Option<String>,
    pub title: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<String>,
    pub body_type: Option<String>,
    pub horsepower: Option<String>,
    pub fuel_type: Option<String>,
    pub motors_trim: Option<String>,
    pub kilometers: Option<i64>,
    pub price_formatted: Option<String>,
    pub price_raw: Option<f64>,
    pub currency: Option<String>,
    pub exterior_color: Option<String>,
    pub location: Option<String>,
    pub phone: Option<String>,
    pub seller_name: Option<String>,
    pub seller_type: Option<String>,
    pub seller_logo: Option<String>,
    pub seller_profile_link: Option<String>,
    pub status: Option<String>,
    pub photos: Option<Vec<String>>,
}

impl Validate for UpdateCarListing {
    fn validate(&self) -> DomainResult<()> {
        if let Some(short_url) = &self.short_url {
            ValidationBuilder::new("short_url", Some(short_url.trim().to_string()))
                .required()
                .validate()?;
        }

        ValidationBuilder::new("kilometers", self.kilometers)
            .min(0)
            .validate()?;

        ValidationBuilder::new("price_raw", self.price_raw)
            .min(0.0)
            .validate()?;

        Ok(())
    }
}

/// Query string of the public listing endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CarListingQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<String>,
    pub exterior_color: Option<String>,
    #[serde(alias = "minPrice")]
    pub min_price: Option<f64>,
    #[serde(alias = "maxPrice")]
    pub max_price: Option<f64>,
    pub location: Option<String>,
    pub body_type: Option<String>,
    pub fuel_type: Option<String>,
    #[serde(alias = "maxKilometers")]
    pub max_kilometers: Option<i64>,
    pub search: Option<String>,
}

/// CarListingRow - SQLite row representation
#[derive(Debug, Clone, FromRow)]
pub struct CarListingRow {
    pub id: i64,
    pub short_url: String,
    pub title: String,
    pub make: String,
    pub model: String,
    pub year: String,
    pub body_type: String,
    pub horsepower: String,
    pub fuel_type: String,
    pub motors_trim: String,
    pub kilometers: i64,
    pub price_formatted: String,
    pub price_raw: f64,
    pub currency: String,
    pub exterior_color: String,
    pub location: String,
    pub phone: String,
    pub seller_name: String,
    pub seller_type: String,
    pub seller_logo: Option<String>,
    pub seller_profile_link: Option<String>,
    pub status: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl CarListingRow {
    pub fn into_entity(self) -> DomainResult<CarListing> {
        Ok(CarListing {
            id: self.id,
            short_url: self.short_url,
            title: self.title,
            make: self.make,
            model: self.model,
            year: self.year,
            body_type: self.body_type,
            horsepower: self.horsepower,
            fuel_type: self.fuel_type,
            motors_trim: self.motors_trim,
            kilometers: self.kilometers,
            price_formatted: self.price_formatted,
            price_raw: self.price_raw,
            currency: self.currency,
            exterior_color: self.exterior_color,
            location: self.location,
            phone: self.phone,
            seller_name: self.seller_name,
            seller_type: self.seller_type,
            seller_logo: self.seller_logo,
            seller_profile_link: self.seller_profile_link,
            status: self.status,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_omitted_fields_take_defaults() {
        let parsed: NewCarListing = serde_json::from_str(r#"{"short_url":"https://x.io/a","make":"Toyota"}"#).unwrap();
        assert_eq!(parsed.make, "Toyota");
        assert_eq!(parsed.model, "Неизвестно");
        assert_eq!(parsed.phone, "Не указан");
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_missing_url_and_negatives() {
        assert!(NewCarListing::default().validate().is_err());

        let negative = NewCarListing { short_url: "u".to_string(), kilometers: -1, ..Default::default() };
        assert!(negative.validate().is_err());

        let update = UpdateCarListing { price_raw: Some(-5.0), ..Default::default() };
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_camel_case_query_aliases() {
        let query: CarListingQuery = serde_json::from_str(r#"{"minPrice":1000,"max_kilometers":5}"#).unwrap();
        assert_eq!(query.min_price, Some(1000.0));
        assert_eq!(query.max_kilometers, Some(5));
    }
}
