use std::sync::OnceLock;

use hive_core::{EventRecord, PaymentStatus, normalize};
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// One batch of raw events plus continuation metadata.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawPage {
    #[serde(default)]
    pub events: Vec<serde_json::Value>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

impl RawPage {
    /// Missing metadata means there is nothing more to fetch.
    pub fn has_more(&self) -> bool {
        self.pagination
            .as_ref()
            .and_then(|p| p.has_more)
            .unwrap_or(false)
    }

    pub fn records(&self) -> Vec<EventRecord> {
        self.events.iter().map(normalize).collect()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub has_more: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub(crate) fn login_path(&self) -> &'static str {
        match self {
            Role::User => "/user/login/",
            Role::Admin => "/admin/login/",
        }
    }

    pub(crate) fn signup_path(&self) -> &'static str {
        match self {
            Role::User => "/user/signup/",
            Role::Admin => "/admin/signup/",
        }
    }
}

#[derive(Serialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct LoginResponse {
    pub token: String,
}

/// Account creation form. Admins may leave `name` blank; the server then
/// derives one from the email.
#[derive(Clone, Debug, PartialEq, Serialize, Validate)]
pub struct SignupRequest {
    pub name: String,
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
    #[validate(
        length(min = 8, message = "Password must be at least 8 characters long."),
        custom(function = "validate_password_strength")
    )]
    pub password: String,
    #[serde(rename = "confirmPassword")]
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
}

impl SignupRequest {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        confirm_password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into().trim().to_string(),
            email: email.into().trim().to_lowercase(),
            password: password.into(),
            confirm_password: confirm_password.into(),
        }
    }
}

fn password_rules() -> &'static [Regex] {
    static PASSWORD_RULES: OnceLock<Vec<Regex>> = OnceLock::new();
    PASSWORD_RULES.get_or_init(|| {
        [r"[a-z]", r"[A-Z]", r"\d", r"[!@#$%^&*()_+={}\[\]:;<>,.?~\\/-]"]
            .into_iter()
            .map(|rule| Regex::new(rule).expect("valid password rule"))
            .collect()
    })
}

fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    if password_rules().iter().all(|rule| rule.is_match(password)) {
        return Ok(());
    }
    Err(ValidationError::new("strength").with_message(
        "Password must include uppercase, lowercase, number, and special character.".into(),
    ))
}

#[derive(Deserialize, Debug)]
pub struct SignupResponse {
    pub token: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RegistrationRequest {
    pub phone_number: String,
    pub payment_status: PaymentStatus,
    pub payment_method: String,
}

impl RegistrationRequest {
    pub fn free(phone_number: impl Into<String>) -> Self {
        Self {
            phone_number: phone_number.into(),
            payment_status: PaymentStatus::Completed,
            payment_method: "none".to_string(),
        }
    }

    pub fn pending(phone_number: impl Into<String>, payment_method: impl Into<String>) -> Self {
        Self {
            phone_number: phone_number.into(),
            payment_status: PaymentStatus::Pending,
            payment_method: payment_method.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RegistrationReceipt {
    #[serde(default)]
    pub message: String,
    pub registration_id: String,
    #[serde(default)]
    pub event_title: String,
    #[serde(default)]
    pub payment_required: bool,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Participant {
    pub id: String,
    pub user_name: String,
    pub user_email: String,
    #[serde(default)]
    pub phone_number: String,
    pub registration_date: String,
    pub payment_status: PaymentStatus,
    #[serde(default = "no_payment_method")]
    pub payment_method: String,
}

fn no_payment_method() -> String {
    "none".to_string()
}

#[derive(Debug, Deserialize)]
pub(crate) struct ParticipantList {
    #[serde(default)]
    pub participants: Vec<Participant>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedEvent {
    pub event: serde_json::Value,
}
