//! Persistence seams of the course platform and their backends.

pub mod repository;
pub mod sqlite;
