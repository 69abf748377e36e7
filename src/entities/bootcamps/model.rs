use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::core::entity::Entity;
use crate::core::geo::Location;
use crate::core::timestamp;

pub const DEFAULT_PHOTO: &str = "no-photo.jpg";

/// Career tracks a bootcamp may offer
pub const CAREERS: &[&str] = &[
    "Web Development",
    "Mobile Development",
    "UI/UX",
    "Data Science",
    "Business",
    "Other",
];

/// A bootcamp listing, owned by the publisher who created it
///
/// `address` is only held until the geocoder resolves it into `location`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Bootcamp {
    pub id: String,

    #[serde(default)]
    #[validate(custom(function = "validate_name"))]
    pub name: String,

    #[serde(default)]
    pub slug: String,

    #[serde(default)]
    #[validate(custom(function = "validate_description"))]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_website"))]
    pub website: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 20, message = "Phone number can not be longer than 20 characters"))]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "Please add a valid email"))]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,

    #[serde(default)]
    #[validate(custom(function = "validate_careers"))]
    pub careers: Vec<String>,

    #[serde(default)]
    pub average_rating: Option<f64>,

    #[serde(default)]
    pub average_cost: Option<f64>,

    #[serde(default = "default_photo")]
    pub photo: String,

    #[serde(default)]
    pub housing: bool,

    #[serde(default)]
    pub job_assistance: bool,

    #[serde(default)]
    pub job_guarantee: bool,

    #[serde(default)]
    pub accept_gi: bool,

    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,

    pub user: String,
}

fn default_photo() -> String {
    DEFAULT_PHOTO.to_string()
}

fn website_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^https?://(www\.)?[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b([-a-zA-Z0-9()@:%_+.~#?&/=]*)$")
            .expect("website pattern is valid")
    })
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new("required").with_message("Please add a name".into()));
    }
    if name.chars().count() > 50 {
        return Err(ValidationError::new("length")
            .with_message("Name can not be more than 50 characters".into()));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), ValidationError> {
    if description.trim().is_empty() {
        return Err(
            ValidationError::new("required").with_message("Please add a description".into())
        );
    }
    if description.chars().count() > 500 {
        return Err(ValidationError::new("length")
            .with_message("Description can not be more than 500 characters".into()));
    }
    Ok(())
}

fn validate_website(website: &str) -> Result<(), ValidationError> {
    if website_pattern().is_match(website) {
        return Ok(());
    }
    Err(ValidationError::new("url")
        .with_message("Please use a valid URL with HTTP or HTTPS".into()))
}

fn validate_careers(careers: &[String]) -> Result<(), ValidationError> {
    if careers.is_empty() {
        return Err(
            ValidationError::new("required").with_message("Please add at least one career".into())
        );
    }
    if let Some(unknown) = careers.iter().find(|c| !CAREERS.contains(&c.as_str())) {
        return Err(ValidationError::new("enum")
            .with_message(format!("{} is not a supported career", unknown).into()));
    }
    Ok(())
}

/// URL-friendly form of a name: lowercase, runs of other characters become `-`
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

impl Bootcamp {
    /// An empty listing owned by `user`, to be filled from client input
    pub fn draft(user: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: String::new(),
            slug: String::new(),
            description: String::new(),
            website: None,
            phone: None,
            email: None,
            address: None,
            location: None,
            careers: Vec::new(),
            average_rating: None,
            average_cost: None,
            photo: default_photo(),
            housing: false,
            job_assistance: false,
            job_guarantee: false,
            accept_gi: false,
            created_at: timestamp::now(),
            user: user.into(),
        }
    }

    pub fn refresh_slug(&mut self) {
        self.slug = slugify(&self.name);
    }

    /// Fields an owner's update may change: the writable ones plus those
    /// derived from them
    pub fn edited_fields() -> Vec<&'static str> {
        let mut fields = Self::writable_fields().to_vec();
        fields.extend(["slug", "location"]);
        fields
    }
}

impl Entity for Bootcamp {
    fn resource_name() -> &'static str {
        "bootcamps"
    }

    fn resource_name_singular() -> &'static str {
        "Bootcamp"
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> Option<&str> {
        Some(&self.user)
    }

    fn writable_fields() -> &'static [&'static str] {
        &[
            "name",
            "description",
            "website",
            "phone",
            "email",
            "address",
            "careers",
            "housing",
            "jobAssistance",
            "jobGuarantee",
            "acceptGi",
        ]
    }

    fn unique_indexes() -> &'static [&'static [&'static str]] {
        &[&["name"]]
    }
}
