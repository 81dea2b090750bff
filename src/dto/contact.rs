use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::ContactMessage;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ContactRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageList {
    pub items: Vec<ContactMessage>,
}
