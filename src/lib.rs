//! src/lib.rs
// make public to other binaries (main, test)
pub mod api;
pub mod authentication;
pub mod clock;
pub mod configuration;
pub mod domain;
pub mod email_client;
pub mod error;
pub mod models;
pub mod routes;
pub mod session_purge_worker;
pub mod startup;
pub mod store;
pub mod telemetry;
pub mod utils;
