//! Clients for the managed services the job depends on.

pub mod blob;
pub mod keys;
