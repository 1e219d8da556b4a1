use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

pub const MAX_TITLE_LEN: usize = 255;
pub const MAX_LINK_LEN: usize = 255;
/// NUMERIC(5, 2)
pub const PRICE_DECIMAL_PLACES: u32 = 2;
pub const PRICE_MAX_DIGITS: u32 = 5;

#[derive(Debug, Clone, FromRow)]
pub struct Recipe {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub description: String,
    pub link: String,
    pub created_at: OffsetDateTime,
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// Validated attributes of a recipe about to be stored. The owner is passed separately.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeDraft {
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub description: String,
    pub link: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipePatch {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub link: Option<String>,
}

impl RecipePatch {
    pub fn is_empty(&self) -> bool {
        *self == RecipePatch::default()
    }

    pub fn apply(self, recipe: &mut Recipe) {
        if let Some(title) = self.title {
            recipe.title = title;
        }
        if let Some(time_minutes) = self.time_minutes {
            recipe.time_minutes = time_minutes;
        }
        if let Some(price) = self.price {
            recipe.price = price;
        }
        if let Some(description) = self.description {
            recipe.description = description;
        }
        if let Some(link) = self.link {
            recipe.link = link;
        }
    }
}

/// Listing order by id.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeOrder {
    /// Most recent first.
    #[default]
    Desc,
    Asc,
}

impl RecipeOrder {
    pub fn sql(self) -> &'static str {
        match self {
            RecipeOrder::Desc => "DESC",
            RecipeOrder::Asc => "ASC",
        }
    }
}

impl FromStr for RecipeOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "desc" => Ok(RecipeOrder::Desc),
            "asc" => Ok(RecipeOrder::Asc),
            other => Err(format!("expected `asc` or `desc`, got `{other}`")),
        }
    }
}

pub fn validate_title(title: &str) -> Result<String, String> {
    let title = title.trim();
    if title.is_empty() {
        return Err("title may not be blank".into());
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(format!("title must be at most {MAX_TITLE_LEN} characters"));
    }
    Ok(title.to_string())
}

pub fn validate_link(link: &str) -> Result<String, String> {
    let link = link.trim();
    if link.chars().count() > MAX_LINK_LEN {
        return Err(format!("link must be at most {MAX_LINK_LEN} characters"));
    }
    Ok(link.to_string())
}

pub fn validate_price(price: Decimal) -> Result<Decimal, String> {
    let normalized = price.normalize();
    if normalized.scale() > PRICE_DECIMAL_PLACES {
        return Err(format!(
            "price must have no more than {PRICE_DECIMAL_PLACES} decimal places"
        ));
    }
    let limit = Decimal::from(10_i64.pow(PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES));
    if normalized.abs() >= limit {
        return Err(format!(
            "price must have no more than {PRICE_MAX_DIGITS} digits in total"
        ));
    }
    let mut price = normalized;
    price.rescale(PRICE_DECIMAL_PLACES);
    Ok(price)
}
