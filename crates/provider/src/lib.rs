//! Typed client for the external messaging provider (Evolution API wire
//! shape): channel lifecycle, recipient existence checks, text/media send.
//!
//! The [`ProviderClient`] trait is the seam consumed by the campaign engine
//! and channel registry; [`EvolutionClient`] is the HTTP implementation.

pub mod client;
pub mod error;
pub mod types;

pub use {
    client::{EvolutionClient, ProviderClient},
    error::{Error, Result},
    types::{MediaKind, PairingArtifact, ProviderChannelInfo, ProvisionedChannel, RecipientCheck},
};
