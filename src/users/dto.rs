use serde::{Deserialize, Serialize};

/// Request body for signup. Fields are optional so that the validation
/// layer, not deserialization, reports missing values. Unknown fields
/// (e.g. a client-supplied `inactive`) are ignored.
#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Body of every success response.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
