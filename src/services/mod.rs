pub mod auth_service;
pub mod contact_service;
pub mod order_service;
