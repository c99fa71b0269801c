// Domain layer - Readings, validation and warning rules
pub mod reading;
pub mod summary;
pub mod validation;
pub mod warning;
