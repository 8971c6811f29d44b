pub mod encoding;
pub mod error;
pub mod executor;
pub mod formatter;
pub mod logger;
pub mod validation;
