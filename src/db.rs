// src/db.rs

pub mod store;
pub use store::ImportStore;
pub mod import_repo;
pub use import_repo::PgImportStore;
pub mod memory_store;
pub use memory_store::InMemoryStore;
