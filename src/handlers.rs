// src/handlers.rs

pub mod imports;
