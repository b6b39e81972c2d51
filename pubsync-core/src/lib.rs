#![doc = "pubsync-core: core logic library for pubsync."]

//! Everything that decides *what* gets published and *how* the local/remote mapping is
//! kept lives here: change detection, metadata extraction for Org and Markdown sources,
//! tag normalization, payload construction, the persisted state store and the publish
//! pipeline itself.
//!
//! The HTTP client for the remote API lives in the `pubsync` crate and plugs in through
//! [`contract::Publisher`].

pub mod config;
pub mod contract;
pub mod convert;
pub mod detect;
pub mod error;
pub mod extract;
pub mod payload;
pub mod state;
pub mod synchronise;
pub mod tags;

pub use error::PublishError;
