//! Thin wrappers over the dashboard's REST endpoints.
//!
//! All of them go through [`crate::http::Client`], so token refresh is
//! invisible here. Entity shapes belong to the caller and are decoded into
//! whatever type it asks for.

pub mod courses;
pub mod materials;
pub mod subjects;

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}
