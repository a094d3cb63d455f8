//! Database row types — these map directly to SQLite rows.
//! Distinct from pantry-types domain models to keep the DB layer independent.

use std::str::FromStr;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use uuid::Uuid;

use pantry_types::models::{Recipe, Tag};

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

pub struct RecipeRow {
    pub id: i64,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub time_minutes: i64,
    pub price: String,
    pub link: String,
}

pub struct TagRow {
    pub id: i64,
    pub owner_id: String,
    pub name: String,
}

impl RecipeRow {
    pub fn into_recipe(self, tags: Vec<Tag>) -> Result<Recipe> {
        Ok(Recipe {
            owner: parse_uuid(&self.owner_id)?,
            price: Decimal::from_str(&self.price)
                .with_context(|| format!("Corrupt price '{}' on recipe {}", self.price, self.id))?,
            id: self.id,
            title: self.title,
            description: self.description,
            time_minutes: self.time_minutes,
            link: self.link,
            tags,
        })
    }
}

impl TagRow {
    pub fn into_tag(self) -> Result<Tag> {
        Ok(Tag {
            id: self.id,
            owner: parse_uuid(&self.owner_id)?,
            name: self.name,
        })
    }
}

pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid> {
    raw.parse().with_context(|| format!("Corrupt uuid '{}'", raw))
}
