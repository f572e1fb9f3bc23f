//! Command dispatch and request/response correlation
//!
//! Every request that expects an answer gets a monotonic id from the
//! `RequestTracker`. Replies are matched by that id, never by arrival order,
//! so results of concurrently in-flight commands land next to the right echo
//! even when the transport reorders them. Requests that outlive their
//! deadline are released by `poll`.

use crate::connection::ConnectionManager;
use crate::error::{DashboardError, Result};
use crate::log_buffer::LogBuffer;
use crate::properties::PropertySnapshot;
use log::debug;
use shared::{CommandAck, LogLevel, Packet, ServerStatus, WorldKind};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// What a pending request was for, including what to undo if it fails
#[derive(Debug, Clone, PartialEq)]
pub enum RequestKind {
    Command { text: String },
    StartServer { previous: ServerStatus },
    StopServer { previous: ServerStatus },
    SaveProperties {
        changed: usize,
        /// Committed values to reinstate if the server refuses the save
        previous: PropertySnapshot,
    },
    LoadWorld { name: String },
    CreateWorld { name: String, kind: WorldKind },
}

impl RequestKind {
    /// Short label used in timeout and failure notifications
    pub fn describe(&self) -> String {
        match self {
            RequestKind::Command { text } => format!("command '{}'", text),
            RequestKind::StartServer { .. } => "server start".to_string(),
            RequestKind::StopServer { .. } => "server stop".to_string(),
            RequestKind::SaveProperties { .. } => "property save".to_string(),
            RequestKind::LoadWorld { name } => format!("loading world {}", name),
            RequestKind::CreateWorld { name, .. } => format!("creating world {}", name),
        }
    }
}

/// Where the answer to a pending request comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Sent to the server; `due` is the response deadline
    Remote,
    /// Answered locally when `due` is reached
    Simulated,
}

/// A request that has been issued but not yet answered
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    /// Correlation id carried on the wire
    pub id: u64,
    pub kind: RequestKind,
    pub issued_at: Instant,
    /// Response deadline for remote requests, reply time for simulated ones
    pub due: Instant,
    pub delivery: Delivery,
}

/// Owns all pending-response state
#[derive(Debug)]
pub struct RequestTracker {
    next_id: u64,
    pending: HashMap<u64, PendingRequest>,
    timeout: Duration,
}

impl RequestTracker {
    /// Creates an empty tracker.
    ///
    /// # Arguments
    /// * `timeout` - How long a remote request may stay unanswered
    ///
    /// Ids start at 1 and are never reused.
    pub fn new(timeout: Duration) -> Self {
        Self {
            next_id: 1,
            pending: HashMap::new(),
            timeout,
        }
    }

    /// Registers a request sent to the server and returns its id
    pub fn track(&mut self, kind: RequestKind, now: Instant) -> u64 {
        self.insert(kind, now, now + self.timeout, Delivery::Remote)
    }

    /// Registers a request answered locally once `delay` has elapsed
    pub fn track_simulated(&mut self, kind: RequestKind, now: Instant, delay: Duration) -> u64 {
        self.insert(kind, now, now + delay, Delivery::Simulated)
    }

    fn insert(&mut self, kind: RequestKind, now: Instant, due: Instant, delivery: Delivery) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.pending.insert(
            id,
            PendingRequest {
                id,
                kind,
                issued_at: now,
                due,
                delivery,
            },
        );
        id
    }

    /// Removes and returns the pending request, if it is still pending
    pub fn resolve(&mut self, id: u64) -> Option<PendingRequest> {
        self.pending.remove(&id)
    }

    /// Removes every request whose due instant has passed, oldest id first
    pub fn take_due(&mut self, now: Instant) -> Vec<PendingRequest> {
        let mut due: Vec<u64> = self
            .pending
            .values()
            .filter(|p| p.due <= now)
            .map(|p| p.id)
            .collect();
        due.sort_unstable();
        due.into_iter()
            .filter_map(|id| self.pending.remove(&id))
            .collect()
    }

    /// Removes every request that was sent to the server
    pub fn take_remote(&mut self) -> Vec<PendingRequest> {
        let mut remote: Vec<u64> = self
            .pending
            .values()
            .filter(|p| p.delivery == Delivery::Remote)
            .map(|p| p.id)
            .collect();
        remote.sort_unstable();
        remote
            .into_iter()
            .filter_map(|id| self.pending.remove(&id))
            .collect()
    }

    pub fn is_pending(&self, id: u64) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Response deadline applied to remote requests
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Forwards operator commands and pairs their results with the echo
pub struct CommandDispatcher {
    tracker: RequestTracker,
    offline_ack_delay: Duration,
}

impl CommandDispatcher {
    /// Creates a dispatcher.
    ///
    /// # Arguments
    /// * `command_timeout` - Deadline for a server reply to any request
    /// * `offline_ack_delay` - Delay before a simulated reply is delivered
    pub fn new(command_timeout: Duration, offline_ack_delay: Duration) -> Self {
        Self {
            tracker: RequestTracker::new(command_timeout),
            offline_ack_delay,
        }
    }

    /// Dispatches a command without waiting for its result.
    ///
    /// The echo `> text` is appended immediately. The result is appended when
    /// the server replies, or after the offline delay when no session is
    /// connected (acknowledgements are then classified by
    /// `CommandAck::classify`, a text heuristic rather than a server reply).
    /// Blank input is rejected before anything is logged or sent.
    pub fn execute(
        &mut self,
        text: &str,
        link: &ConnectionManager,
        log: &mut LogBuffer,
        now: Instant,
    ) -> Result<u64> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DashboardError::DispatchRejected);
        }

        let kind = RequestKind::Command {
            text: text.to_string(),
        };

        if !link.is_connected() {
            let id = self
                .tracker
                .track_simulated(kind, now, self.offline_ack_delay);
            log.append_for_request(id, LogLevel::Info, format!("> {}", text));
            return Ok(id);
        }

        let id = self.tracker.track(kind, now);
        log.append_for_request(id, LogLevel::Info, format!("> {}", text));

        let packet = Packet::Command {
            request_id: id,
            text: text.to_string(),
        };
        if let Err(e) = link.send(packet) {
            self.tracker.resolve(id);
            log.append_for_request(id, LogLevel::Error, format!("Failed to send command: {}", e));
            return Err(e);
        }
        Ok(id)
    }

    /// Tracks and sends a non-command request built from its assigned id
    pub fn submit(
        &mut self,
        kind: RequestKind,
        link: &ConnectionManager,
        now: Instant,
        build: impl FnOnce(u64) -> Packet,
    ) -> Result<u64> {
        let id = self.tracker.track(kind, now);
        if let Err(e) = link.send(build(id)) {
            self.tracker.resolve(id);
            return Err(e);
        }
        Ok(id)
    }

    /// Appends a command result. Returns false for ids that are no longer pending.
    pub fn handle_result(
        &mut self,
        request_id: u64,
        level: LogLevel,
        message: String,
        log: &mut LogBuffer,
    ) -> bool {
        match self.tracker.resolve(request_id) {
            Some(_) => {
                log.append_for_request(request_id, level, message);
                true
            }
            None => {
                debug!("Ignoring result for request {} that is not pending", request_id);
                false
            }
        }
    }

    /// Completes an `Accepted`/`Rejected` reply
    pub fn complete(&mut self, request_id: u64) -> Option<PendingRequest> {
        let pending = self.tracker.resolve(request_id);
        if pending.is_none() {
            debug!("Ignoring reply for request {} that is not pending", request_id);
        }
        pending
    }

    /// Delivers due simulated acknowledgements and expires overdue requests.
    ///
    /// Expired commands are reported here; every other expired request is
    /// returned so the owner can roll back its optimistic state.
    pub fn poll(&mut self, now: Instant, log: &mut LogBuffer) -> Vec<PendingRequest> {
        let mut expired = Vec::new();

        for pending in self.tracker.take_due(now) {
            match (&pending.delivery, &pending.kind) {
                (Delivery::Simulated, RequestKind::Command { text }) => {
                    let ack = CommandAck::classify(text);
                    log.append_for_request(pending.id, LogLevel::Info, ack.default_message());
                }
                (Delivery::Remote, RequestKind::Command { text }) => {
                    log.append_for_request(
                        pending.id,
                        LogLevel::Warn,
                        format!(
                            "No response to '{}' after {}ms",
                            text,
                            self.tracker.timeout().as_millis()
                        ),
                    );
                }
                (_, kind) => {
                    log.append(
                        LogLevel::Warn,
                        format!("Request timed out: {}", kind.describe()),
                    );
                    expired.push(pending);
                }
            }
        }

        expired
    }

    /// Releases every request sent to the server after the session was lost
    pub fn abandon_remote(&mut self, log: &mut LogBuffer) -> Vec<PendingRequest> {
        let mut abandoned = Vec::new();
        for pending in self.tracker.take_remote() {
            match &pending.kind {
                RequestKind::Command { text } => {
                    log.append_for_request(
                        pending.id,
                        LogLevel::Warn,
                        format!("Connection lost before '{}' completed", text),
                    );
                }
                _ => abandoned.push(pending),
            }
        }
        abandoned
    }

    /// Number of requests still waiting for an answer
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_pending(&self, request_id: u64) -> bool {
        self.tracker.is_pending(request_id)
    }
}
