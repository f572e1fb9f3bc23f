//! # Control Endpoint Library
//!
//! This library provides a simulated game server control endpoint for the
//! operator dashboard. It owns the canonical server state, answers dashboard
//! requests and broadcasts lifecycle and log events to every attached
//! dashboard.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative State
//! The endpoint holds the definitive server lifecycle status, world list and
//! persisted properties. Dashboards mirror this state and reconcile it from
//! the handshake and from the events broadcast here.
//!
//! ### Dashboard Management
//! Handles the lifecycle of attached dashboards including:
//! - Handshake with protocol version check and capacity limit
//! - Heartbeat tracking and timeout cleanup
//! - Suppression of retransmitted requests
//!
//! ### Request Correlation
//! Every request carries a dashboard-assigned id. Replies echo that id so the
//! dashboard can pair them with the originating request regardless of
//! arrival order.
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Event Loop
//! All requests and lifecycle timers are processed sequentially by one loop.
//! Network receive, send and timeout monitoring run as separate tasks that
//! talk to the loop over channels.
//!
//! ### UDP-Based Communication
//! One bincode-encoded `shared::Packet` per datagram.
//!
//! ## Module Organization
//!
//! ### Client Manager Module (`client_manager`)
//! Attached dashboards, their addresses, heartbeats and recent request ids.
//!
//! ### Instance Module (`instance`)
//! The simulated server: lifecycle transitions with start/stop delays,
//! command execution, world switching/creation and property storage.
//!
//! ### Network Module (`network`)
//! Socket management, packet routing and the main loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::instance::InstanceConfig;
//! use server::network::Server;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let mut server = Server::new(
//!         "127.0.0.1:19132",
//!         Duration::from_millis(50),
//!         8,
//!         InstanceConfig::default(),
//!     ).await?;
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod instance;
pub mod network;
