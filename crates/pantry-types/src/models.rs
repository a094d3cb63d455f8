use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// A recipe as stored. `owner` never leaves the server; the wire shapes in
/// [`crate::api`] have no field for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub id: i64,
    pub owner: Uuid,
    pub title: String,
    pub description: String,
    pub time_minutes: i64,
    pub price: Decimal,
    pub link: String,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: i64,
    pub owner: Uuid,
    pub name: String,
}

/// Validated recipe fields to write. `None` leaves the stored value alone
/// (or takes the column default on insert).
///
/// No owner field: the owner comes from the scope the change is applied
/// through.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub time_minutes: Option<i64>,
    pub price: Option<Decimal>,
    pub link: Option<String>,
    /// Tag names; `Some` replaces the recipe's whole tag set.
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagChanges {
    pub name: Option<String>,
}
