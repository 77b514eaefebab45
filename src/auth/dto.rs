use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub authenticated: bool,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}
