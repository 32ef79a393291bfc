pub mod health_service;
pub mod user_import;
pub mod user_service;
