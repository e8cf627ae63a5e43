//! Fanout Client
//!
//! Submits build tasks to a coordinator (or straight to a worker) over the
//! framed JSON channel.

pub mod client;

pub use client::BuildClient;
