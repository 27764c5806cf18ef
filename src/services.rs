// src/services.rs

pub mod import;
pub mod import_service;

pub use import_service::ImportService;
