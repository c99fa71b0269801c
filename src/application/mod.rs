// Application layer - Use cases over the storage ports
pub mod credential_repository;
pub mod reading_manager;
pub mod reading_repository;
pub mod user_service;
