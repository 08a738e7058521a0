//! Multi-tenant portfolio content backend.
//!
//! Every entity shares one read path (filter normalisation, pagination strategy selection,
//! cache-aside paging) and one write path (tenant-scoped mutation followed by invalidation
//! of the affected item and list keys).

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
