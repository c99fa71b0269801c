// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod http_response;
pub mod json_credential_store;
pub mod json_file;
pub mod json_reading_repository;
