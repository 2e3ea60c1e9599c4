use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Insert payload for the `tasks` table.
#[derive(Debug, Serialize)]
pub struct NewTaskRow {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub is_completed: bool,
    pub user_id: String,
}

/// Insert payload for the `profiles` table.
#[derive(Debug, Serialize)]
pub struct NewProfileRow {
    pub user_id: String,
    pub role: crate::models::Role,
}

/// Error body returned by the data API.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// Error body returned by the identity provider. The field name varies by
/// endpoint, so all known spellings are accepted.
#[derive(Debug, Deserialize)]
pub struct AuthErrorBody {
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl AuthErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.msg.or(self.error_description).or(self.message)
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: UserDto,
}

#[derive(Debug, Deserialize)]
pub struct UserDto {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PasswordGrantRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub data: serde_json::Value,
}
