//! # Ports Layer
//!
//! Hexagonal architecture ports for the Contract Staking Index subsystem.
//!
//! - **Driving Ports (Inbound)**: the block-indexer contract the node drives.
//! - **Driven Ports (Outbound)**: the key-value store and the log decoder.

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
