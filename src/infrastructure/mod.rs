//! Infrastructure layer - storage, extraction, observability and services

pub mod artifact;
pub mod extractor;
pub mod logging;
pub mod observability;
pub mod services;
