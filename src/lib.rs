// src/lib.rs
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod pipeline;
pub mod process;
pub mod storage;
pub mod table;
