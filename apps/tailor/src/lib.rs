pub mod api_client;
pub mod batch;
pub mod config;
pub mod errors;
pub mod models;
pub mod prep;
pub mod state;
pub mod storage;
