// src/middleware.rs

pub mod tenancy;
