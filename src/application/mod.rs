//! Application services layer.

pub mod content;
pub mod error;
pub mod pagination;
pub mod paginator;
pub mod query;
pub mod repos;
pub mod services;
