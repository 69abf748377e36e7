use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::core::aggregate::{AggregateSpec, Rounding};
use crate::core::entity::Entity;
use crate::core::timestamp;

/// A bootcamp's mean review rating
pub const AVERAGE_RATING: AggregateSpec = AggregateSpec {
    parent_collection: "bootcamps",
    child_collection: "reviews",
    foreign_field: "bootcamp",
    source_field: "rating",
    target_field: "averageRating",
    rounding: Rounding::Exact,
};

/// One user's review of a bootcamp; a user reviews a bootcamp at most once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,

    #[serde(default)]
    #[validate(custom(function = "validate_title"))]
    pub title: String,

    #[serde(default)]
    #[validate(custom(function = "validate_text"))]
    pub text: String,

    #[serde(default)]
    #[validate(
        required(message = "Please add rating between 1 and 10"),
        range(min = 1, max = 10, message = "Please add rating between 1 and 10")
    )]
    pub rating: Option<i64>,

    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,

    pub bootcamp: String,

    pub user: String,
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::new("required")
            .with_message("Please add a title for the review".into()));
    }
    if title.chars().count() > 100 {
        return Err(ValidationError::new("length")
            .with_message("Title can not be more than 100 characters".into()));
    }
    Ok(())
}

fn validate_text(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::new("required").with_message("Please add some text".into()));
    }
    Ok(())
}

impl Review {
    pub fn draft(bootcamp: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: String::new(),
            text: String::new(),
            rating: None,
            created_at: timestamp::now(),
            bootcamp: bootcamp.into(),
            user: user.into(),
        }
    }
}

impl Entity for Review {
    fn resource_name() -> &'static str {
        "reviews"
    }

    fn resource_name_singular() -> &'static str {
        "Review"
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> Option<&str> {
        Some(&self.user)
    }

    fn writable_fields() -> &'static [&'static str] {
        &["title", "text", "rating"]
    }

    fn unique_indexes() -> &'static [&'static [&'static str]] {
        &[&["bootcamp", "user"]]
    }
}
