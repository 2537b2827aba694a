//! Allocation business rules, independent of the storage backend.

pub mod detail;
pub mod validator;
