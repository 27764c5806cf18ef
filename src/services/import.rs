// src/services/import.rs

// Estágios do pipeline, na ordem em que rodam
pub mod reader;
pub mod coerce;
pub mod mapper;
pub mod context;
pub mod resolver;
pub mod grouper;
pub mod writer;
pub mod ledger;
pub mod aggregator;
pub mod pipeline;

pub use pipeline::{ImportRequest, run};
