// src/models.rs

pub mod crm;
pub mod import;
pub mod operations;
pub mod schema;
