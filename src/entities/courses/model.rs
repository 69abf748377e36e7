use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::core::aggregate::{AggregateSpec, Rounding};
use crate::core::entity::Entity;
use crate::core::timestamp;

/// A bootcamp's average tuition, rounded up to the nearest ten
pub const AVERAGE_COST: AggregateSpec = AggregateSpec {
    parent_collection: "bootcamps",
    child_collection: "courses",
    foreign_field: "bootcamp",
    source_field: "tuition",
    target_field: "averageCost",
    rounding: Rounding::UpToTen,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Skill {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,

    #[serde(default)]
    #[validate(custom(function = "validate_title"))]
    pub title: String,

    #[serde(default)]
    #[validate(custom(function = "validate_description"))]
    pub description: String,

    #[serde(default)]
    #[validate(custom(function = "validate_weeks"))]
    pub weeks: String,

    #[serde(default)]
    #[validate(
        required(message = "Please add a tuition cost"),
        range(min = 0.0, message = "Tuition can not be negative")
    )]
    pub tuition: Option<f64>,

    #[serde(default)]
    #[validate(required(message = "Please add a minimum skill"))]
    pub minimum_skill: Option<Skill>,

    #[serde(default)]
    pub scholarship_available: bool,

    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,

    pub bootcamp: String,

    pub user: String,
}

fn required(value: &str, message: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required").with_message(message.into()));
    }
    Ok(())
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    required(title, "Please add a course title")
}

fn validate_description(description: &str) -> Result<(), ValidationError> {
    required(description, "Please add a description")
}

fn validate_weeks(weeks: &str) -> Result<(), ValidationError> {
    required(weeks, "Please add number of weeks")
}

impl Course {
    /// An empty course of `bootcamp`, to be filled from client input
    pub fn draft(bootcamp: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: String::new(),
            description: String::new(),
            weeks: String::new(),
            tuition: None,
            minimum_skill: None,
            scholarship_available: false,
            created_at: timestamp::now(),
            bootcamp: bootcamp.into(),
            user: user.into(),
        }
    }
}

impl Entity for Course {
    fn resource_name() -> &'static str {
        "courses"
    }

    fn resource_name_singular() -> &'static str {
        "Course"
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> Option<&str> {
        Some(&self.user)
    }

    fn writable_fields() -> &'static [&'static str] {
        &[
            "title",
            "description",
            "weeks",
            "tuition",
            "minimumSkill",
            "scholarshipAvailable",
        ]
    }
}
