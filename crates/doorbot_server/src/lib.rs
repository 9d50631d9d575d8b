//! Doorbot server
//!
//! Ingestion adapters (UniFi Access and door daemon webhooks, the access
//! controller's websocket), outbound notifiers, admin commands and process
//! wiring around `doorbot_core`.

pub mod admin;
pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod notify;
pub mod router;
pub mod state;
pub mod ws;
