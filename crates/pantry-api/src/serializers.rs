//! Mapping between stored entities and their wire shapes.
//!
//! Reads have two shapes per recipe: a summary for lists and a detail view
//! for everything else. Writes arrive as raw JSON objects and go through one
//! field-checking helper, [`Fields`], so every problem is reported per field
//! before the store is touched.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Value};
use url::Url;

use pantry_types::api::{RecipeDetail, RecipeSummary, TagResponse};
use pantry_types::models::{Recipe, RecipeChanges, Tag, TagChanges};

use crate::error::{ApiError, FieldErrors};

/// Keys clients may send but never write: ownership comes from the token and
/// ids from the store.
const READ_ONLY_KEYS: [&str; 3] = ["user", "owner", "id"];

const MAX_TEXT_LEN: usize = 255;
const MAX_WHOLE_DIGITS: usize = 3;
const MAX_DECIMAL_PLACES: u32 = 2;
const MAX_MINUTES: i64 = i32::MAX as i64;

const URL_SCHEMES: [&str; 4] = ["http", "https", "ftp", "ftps"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// POST: required fields must be present
    Create,
    /// PUT: same requirement as create, applied to an existing row
    Full,
    /// PATCH: only supplied keys are checked and applied
    Partial,
}

// -- Read shapes --

pub fn recipe_summary(recipe: &Recipe) -> RecipeSummary {
    RecipeSummary {
        id: recipe.id,
        title: recipe.title.clone(),
        time_minutes: recipe.time_minutes,
        price: display_price(recipe.price),
        link: recipe.link.clone(),
    }
}

pub fn recipe_detail(recipe: &Recipe) -> RecipeDetail {
    RecipeDetail {
        id: recipe.id,
        title: recipe.title.clone(),
        description: recipe.description.clone(),
        time_minutes: recipe.time_minutes,
        price: display_price(recipe.price),
        link: recipe.link.clone(),
        tags: recipe.tags.iter().map(tag_view).collect(),
    }
}

pub fn tag_view(tag: &Tag) -> TagResponse {
    TagResponse {
        id: tag.id,
        name: tag.name.clone(),
    }
}

/// Always two decimal places, so `5` renders as `"5.00"`.
fn display_price(price: Decimal) -> Decimal {
    let mut price = price;
    price.rescale(MAX_DECIMAL_PLACES);
    price
}

// -- Write payloads --

pub fn recipe_changes(body: Value, mode: WriteMode) -> Result<RecipeChanges, ApiError> {
    let mut fields = Fields::new(body, mode)?;

    let changes = RecipeChanges {
        title: fields.text("title", true, false),
        description: fields.text("description", false, true),
        time_minutes: fields.minutes("time_minutes", true),
        price: fields.price("price", true),
        link: fields.link("link", false),
        tags: fields.tag_names("tags"),
    };

    fields.finish()?;
    Ok(changes)
}

pub fn tag_changes(body: Value, mode: WriteMode) -> Result<TagChanges, ApiError> {
    let mut fields = Fields::new(body, mode)?;
    let changes = TagChanges {
        name: fields.text("name", true, false),
    };
    fields.finish()?;
    Ok(changes)
}

/// Pulls typed values out of a JSON object, recording a message per bad
/// field instead of stopping at the first.
struct Fields {
    map: Map<String, Value>,
    mode: WriteMode,
    errors: FieldErrors,
}

impl Fields {
    fn new(body: Value, mode: WriteMode) -> Result<Self, ApiError> {
        let mut map = match body {
            Value::Object(map) => map,
            other => {
                let mut errors = FieldErrors::default();
                errors.add(
                    "non_field_errors",
                    format!("Invalid data. Expected an object, but got {}.", json_type(&other)),
                );
                return Err(ApiError::Validation(errors));
            }
        };

        for key in READ_ONLY_KEYS {
            map.remove(key);
        }

        Ok(Self {
            map,
            mode,
            errors: FieldErrors::default(),
        })
    }

    fn take(&mut self, name: &str, required: bool) -> Option<Value> {
        match self.map.remove(name) {
            None => {
                if required && self.mode != WriteMode::Partial {
                    self.errors.add(name, "This field is required.");
                }
                None
            }
            Some(Value::Null) => {
                self.errors.add(name, "This field may not be null.");
                None
            }
            Some(value) => Some(value),
        }
    }

    fn text(&mut self, name: &str, required: bool, allow_blank: bool) -> Option<String> {
        let value = self.take(name, required)?;
        match check_text(&value, allow_blank) {
            Ok(text) => Some(text),
            Err(message) => {
                self.errors.add(name, message);
                None
            }
        }
    }

    fn minutes(&mut self, name: &str, required: bool) -> Option<i64> {
        let value = self.take(name, required)?;

        let minutes = match &value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };

        match minutes {
            None => self.errors.add(name, "A valid integer is required."),
            Some(m) if m < 0 => self.errors.add(name, "Ensure this value is greater than or equal to 0."),
            Some(m) if m > MAX_MINUTES => self.errors.add(
                name,
                format!("Ensure this value is less than or equal to {}.", MAX_MINUTES),
            ),
            Some(m) => return Some(m),
        }
        None
    }

    fn price(&mut self, name: &str, required: bool) -> Option<Decimal> {
        let value = self.take(name, required)?;

        let parsed = match &value {
            Value::Number(n) => parse_decimal(&n.to_string()),
            Value::String(s) => parse_decimal(s.trim()),
            _ => None,
        };

        let Some(price) = parsed else {
            self.errors.add(name, "A valid number is required.");
            return None;
        };

        let price = price.normalize();
        let whole_digits = match price.trunc().abs() {
            whole if whole.is_zero() => 0,
            whole => whole.to_string().len(),
        };

        if price.is_sign_negative() && !price.is_zero() {
            self.errors.add(name, "Ensure this value is greater than or equal to 0.");
        } else if price.scale() > MAX_DECIMAL_PLACES {
            self.errors.add(
                name,
                format!("Ensure that there are no more than {} decimal places.", MAX_DECIMAL_PLACES),
            );
        } else if whole_digits > MAX_WHOLE_DIGITS {
            self.errors.add(
                name,
                format!(
                    "Ensure that there are no more than {} digits before the decimal point.",
                    MAX_WHOLE_DIGITS
                ),
            );
        } else {
            return Some(price.abs());
        }
        None
    }

    /// Blank is allowed; anything else must parse as an absolute URL with a
    /// host.
    fn link(&mut self, name: &str, required: bool) -> Option<String> {
        let text = self.text(name, required, true)?;
        if text.is_empty() {
            return Some(text);
        }

        match Url::parse(&text) {
            Ok(url) if URL_SCHEMES.contains(&url.scheme()) && url.host().is_some() => Some(text),
            _ => {
                self.errors.add(name, "Enter a valid URL.");
                None
            }
        }
    }

    /// `tags` is a list of `{"name": ...}` objects.
    fn tag_names(&mut self, name: &str) -> Option<Vec<String>> {
        let value = self.take(name, false)?;

        let items = match value {
            Value::Array(items) => items,
            other => {
                self.errors.add(
                    name,
                    format!("Expected a list of items but got type \"{}\".", json_type(&other)),
                );
                return None;
            }
        };

        let mut names = Vec::with_capacity(items.len());
        let mut ok = true;
        for (idx, item) in items.iter().enumerate() {
            let tag_name = match item.get("name") {
                None | Some(Value::Null) => Err("name: This field is required.".to_string()),
                Some(v) => check_text(v, false).map_err(|m| format!("name: {}", m)),
            };
            match tag_name {
                Ok(n) => names.push(n),
                Err(message) => {
                    self.errors.add(name, format!("Item {}: {}", idx, message));
                    ok = false;
                }
            }
        }

        ok.then_some(names)
    }

    fn finish(self) -> Result<(), ApiError> {
        self.errors.into_result()
    }
}

/// Trimmed string, or the message explaining why it was rejected.
fn check_text(value: &Value, allow_blank: bool) -> Result<String, String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return Err("Not a valid string.".to_string()),
    };

    if text.is_empty() && !allow_blank {
        return Err("This field may not be blank.".to_string());
    }
    if text.chars().count() > MAX_TEXT_LEN {
        return Err(format!("Ensure this field has no more than {} characters.", MAX_TEXT_LEN));
    }
    Ok(text)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// serde_json prints small and large floats in exponent form (`1e-5`).
fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}
