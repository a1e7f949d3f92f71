//! HTTP surface for the campaign dispatch service: campaign CRUD and
//! control actions, channel provisioning and reconciliation, and the
//! provider webhook ingress.
//!
//! Authentication is handled upstream; handlers trust the owner identity
//! injected in the `x-owner-id` header.

pub mod auth;
pub mod campaign_routes;
pub mod channel_routes;
pub mod config;
pub mod error;
pub mod server;
pub mod state;
pub mod webhook_routes;

pub use {config::GatewayConfig, server::build_router, state::AppState};
