//! # Operator Dashboard Library
//!
//! This library provides the client side of the server control dashboard: the
//! session with a control endpoint, command dispatch with request/response
//! correlation, the console log, the property editor and the world list.
//!
//! ## Architecture Overview
//!
//! A single `Dashboard` value owns all canonical state and is passed by
//! reference to whatever drives it. It never touches a socket: outgoing
//! packets are queued on a channel, received packets are handed to
//! `Dashboard::handle_packet`, and `Dashboard::poll` advances every timer.
//! This keeps the core deterministic under test and lets the same core run
//! behind the UDP runtime in `network`.
//!
//! ### Request Correlation
//! Requests carry monotonic ids. A command's echo and its result are tagged
//! with the same id, so concurrently dispatched commands can always be paired
//! even when replies arrive out of order. Requests without a reply inside
//! the command timeout are released with a warning and their optimistic
//! effects are rolled back.
//!
//! ### Offline Operation
//! Without a connected session, commands are answered locally after a short
//! delay using a substring heuristic over the command text. The heuristic is
//! a stand-in for real server replies and is not a parsed protocol answer.
//!
//! ## Module Organization
//!
//! ### Connection Module (`connection`)
//! Endpoint resolution, handshake and server lifecycle state.
//!
//! ### Dispatcher Module (`dispatcher`)
//! Request tracking, command dispatch, timeouts and simulated replies.
//!
//! ### Log Buffer Module (`log_buffer`)
//! Bounded, ordered and exportable console output.
//!
//! ### Properties Module (`properties`)
//! Typed server properties with edit, commit, reset, diff and raw import.
//!
//! ### Worlds Module (`worlds`)
//! World records with a single active world.
//!
//! ### Catalog, Settings and History (`catalog`, `settings`, `history`)
//! Canned commands and favorites, game mode and quick commands, and the
//! shell-style command history.
//!
//! ### Dashboard Module (`dashboard`)
//! The session object tying everything together and emitting notifications.
//!
//! ### Console and Network Modules (`console`, `network`)
//! The text front end: action parsing and the UDP/stdin event loop.
//!
//! ## Usage Example
//!
//! ```rust
//! use dashboard::config::DashboardConfig;
//! use dashboard::dashboard::Dashboard;
//! use std::time::{Duration, Instant};
//! use tokio::sync::mpsc;
//!
//! let (outbox, _packets) = mpsc::unbounded_channel();
//! let (notifications, _events) = mpsc::unbounded_channel();
//! let mut dashboard = Dashboard::new(DashboardConfig::default(), outbox, notifications);
//!
//! dashboard.execute("/gamemode creative @p").unwrap();
//! dashboard.poll(Instant::now() + Duration::from_millis(100));
//!
//! let lines: Vec<String> = dashboard.log().entries().map(|e| e.message.clone()).collect();
//! assert_eq!(lines, vec!["> /gamemode creative @p", "Game mode updated for player"]);
//! ```

pub mod catalog;
pub mod config;
pub mod connection;
pub mod console;
pub mod dashboard;
pub mod dispatcher;
pub mod error;
pub mod history;
pub mod log_buffer;
pub mod network;
pub mod properties;
pub mod settings;
pub mod worlds;
