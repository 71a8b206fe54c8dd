use std::fmt;
use std::io::Write;
use std::str::FromStr;

use chrono::NaiveDateTime;
use diesel::deserialize::{self, FromSql};
use diesel::pg::{Pg, PgValue};
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use validator::Validate;

/// How a listing is offered. Stored as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(diesel::expression::AsExpression, diesel::deserialize::FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    #[default]
    Buy,
    Rent,
    Sell,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Buy => "buy",
            TransactionType::Rent => "rent",
            TransactionType::Sell => "sell",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown transaction type `{0}` (expected buy, rent or sell)")]
pub struct ParseTransactionTypeError(pub String);

impl FromStr for TransactionType {
    type Err = ParseTransactionTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(TransactionType::Buy),
            "rent" => Ok(TransactionType::Rent),
            "sell" => Ok(TransactionType::Sell),
            _ => Err(ParseTransactionTypeError(s.to_string())),
        }
    }
}

impl ToSql<Text, Pg> for TransactionType {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for TransactionType {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        let raw = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        Ok(raw.parse::<TransactionType>()?)
    }
}

/// Accepted encodings of a true `featured` flag: `true`, `"true"`, `"t"`, `"1"` and `1`.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() == Some(1.0),
        Value::String(s) => is_truthy_str(s),
        _ => false,
    }
}

pub fn is_truthy_str(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "t" | "1")
}

fn deserialize_truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(is_truthy(&Value::deserialize(deserializer)?))
}

fn deserialize_optional_truthy<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.map(|v| is_truthy(&v)))
}

#[derive(Debug, Clone, PartialEq, Serialize, Queryable, Selectable)]
#[diesel(table_name = crate::schema::listings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: i32,
    pub property_number: Option<String>,
    #[serde(skip)]
    pub property_sequence: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub transaction_type: TransactionType,
    pub category: String,
    pub price: f64,
    pub area: Option<f64>,
    pub beds: i32,
    pub baths: i32,
    pub location: String,
    pub address: Option<String>,
    pub featured: bool,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::listings)]
pub struct NewListing {
    pub property_number: Option<String>,
    pub property_sequence: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub transaction_type: TransactionType,
    pub category: String,
    pub price: f64,
    pub area: Option<f64>,
    pub beds: i32,
    pub baths: i32,
    pub location: String,
    pub address: Option<String>,
    pub featured: bool,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = crate::schema::listings)]
pub struct ListingChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub transaction_type: Option<TransactionType>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub area: Option<f64>,
    pub beds: Option<i32>,
    pub baths: Option<i32>,
    pub location: Option<String>,
    pub address: Option<String>,
    pub featured: Option<bool>,
    pub status: Option<String>,
}

pub const DEFAULT_STATUS: &str = "available";

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateListingRequest {
    /// Explicit property number; missing, empty or `auto` asks for allocation.
    #[validate(length(max = 32))]
    pub property_number: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: Option<String>,
    pub transaction_type: Option<TransactionType>,
    #[validate(length(min = 1, max = 50))]
    pub category: String,
    #[validate(range(min = 0.0))]
    pub price: f64,
    #[validate(range(min = 0.0))]
    pub area: Option<f64>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub beds: i32,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub baths: i32,
    #[validate(length(min = 1, max = 200))]
    pub location: String,
    pub address: Option<String>,
    #[serde(default, deserialize_with = "deserialize_truthy")]
    pub featured: bool,
    #[validate(length(min = 1, max = 20))]
    pub status: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

impl CreateListingRequest {
    pub fn into_new_listing(
        self,
        property_number: Option<String>,
        property_sequence: Option<i64>,
        now: NaiveDateTime,
    ) -> NewListing {
        NewListing {
            property_number,
            property_sequence,
            title: self.title,
            description: self.description,
            transaction_type: self.transaction_type.unwrap_or_default(),
            category: self.category,
            price: self.price,
            area: self.area,
            beds: self.beds,
            baths: self.baths,
            location: self.location,
            address: self.address,
            featured: self.featured,
            status: self.status.unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            created_at: self.created_at.unwrap_or(now),
            updated_at: now,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateListingRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub transaction_type: Option<TransactionType>,
    #[validate(length(min = 1, max = 50))]
    pub category: Option<String>,
    #[validate(range(min = 0.0))]
    pub price: Option<f64>,
    #[validate(range(min = 0.0))]
    pub area: Option<f64>,
    #[validate(range(min = 0))]
    pub beds: Option<i32>,
    #[validate(range(min = 0))]
    pub baths: Option<i32>,
    #[validate(length(min = 1, max = 200))]
    pub location: Option<String>,
    pub address: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_truthy")]
    pub featured: Option<bool>,
    #[validate(length(min = 1, max = 20))]
    pub status: Option<String>,
}

impl From<UpdateListingRequest> for ListingChanges {
    fn from(req: UpdateListingRequest) -> Self {
        ListingChanges {
            title: req.title,
            description: req.description,
            transaction_type: req.transaction_type,
            category: req.category,
            price: req.price,
            area: req.area,
            beds: req.beds,
            baths: req.baths,
            location: req.location,
            address: req.address,
            featured: req.featured,
            status: req.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Queryable, Selectable)]
#[diesel(table_name = crate::schema::inquiries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Inquiry {
    pub id: i32,
    pub listing_id: Option<i32>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::inquiries)]
pub struct NewInquiry {
    pub listing_id: Option<i32>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateInquiryRequest {
    pub listing_id: Option<i32>,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 2000))]
    pub message: String,
}

impl CreateInquiryRequest {
    pub fn into_new_inquiry(self, now: NaiveDateTime) -> NewInquiry {
        NewInquiry {
            listing_id: self.listing_id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            message: self.message,
            created_at: now,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_request(featured: Value) -> CreateListingRequest {
        serde_json::from_value(json!({
            "title": "Sea view flat",
            "category": "Apartment",
            "price": 4500000.0,
            "location": "Panaji",
            "featured": featured,
        }))
        .unwrap()
    }

    #[test]
    fn featured_accepts_every_truthy_encoding() {
        for value in [json!(true), json!("true"), json!("t"), json!("1"), json!(1), json!("TRUE")] {
            assert!(create_request(value.clone()).featured, "{value} should be truthy");
        }
    }

    #[test]
    fn featured_rejects_other_values() {
        for value in [json!(false), json!("false"), json!("yes"), json!(0), json!(2), json!(null)] {
            assert!(!create_request(value.clone()).featured, "{value} should be falsy");
        }
    }

    #[test]
    fn featured_defaults_to_false_when_missing() {
        let req: CreateListingRequest = serde_json::from_value(json!({
            "title": "Plot",
            "category": "Land",
            "price": 100.0,
            "location": "Pune",
        }))
        .unwrap();
        assert!(!req.featured);
        assert_eq!(req.beds, 0);
    }

    #[test]
    fn update_featured_is_normalized_but_optional() {
        let req: UpdateListingRequest = serde_json::from_value(json!({ "featured": "t" })).unwrap();
        assert_eq!(req.featured, Some(true));

        let req: UpdateListingRequest = serde_json::from_value(json!({ "price": 10.0 })).unwrap();
        assert_eq!(req.featured, None);
    }

    #[test]
    fn transaction_type_defaults_to_buy() {
        let now = chrono::Utc::now().naive_utc();
        let listing = create_request(json!(false)).into_new_listing(None, None, now);
        assert_eq!(listing.transaction_type, TransactionType::Buy);
        assert_eq!(listing.status, DEFAULT_STATUS);
        assert_eq!(listing.created_at, now);
    }

    #[test]
    fn transaction_type_parses_case_insensitively() {
        assert_eq!("Rent".parse::<TransactionType>().unwrap(), TransactionType::Rent);
        assert!("lease".parse::<TransactionType>().is_err());
    }

    #[test]
    fn validation_rejects_negative_price() {
        let req: CreateListingRequest = serde_json::from_value(json!({
            "title": "House",
            "category": "House",
            "price": -1.0,
            "location": "Nagpur",
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }
}
