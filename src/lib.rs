pub mod config;
pub mod error;
pub mod pipeline;
pub mod providers;
pub mod routes;
pub mod scoring;
pub mod state;
pub mod storage;
pub mod types;
