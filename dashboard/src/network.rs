//! UDP runtime for the console dashboard
//!
//! Owns the socket and drives a `Dashboard`: received datagrams are decoded
//! and applied, queued outbound packets are sent, timers are polled, and
//! operator input is read line by line from stdin. New log entries and
//! notifications are printed after every event.

use crate::config::DashboardConfig;
use crate::connection::OutboundMessage;
use crate::console::{self, Outcome};
use crate::dashboard::{Dashboard, Notification, Severity};
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{Packet, MAX_PACKET_SIZE};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// How often timers inside the dashboard are driven
const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct Client {
    socket: UdpSocket,
    dashboard: Dashboard,
    outbound_rx: mpsc::UnboundedReceiver<OutboundMessage>,
    notification_rx: mpsc::UnboundedReceiver<Notification>,
    fake_ping_ms: u64,
    last_printed: u64,
}

impl Client {
    pub async fn new(config: DashboardConfig, fake_ping_ms: u64) -> Result<Self, BoxError> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        debug!("Dashboard socket bound to {}", socket.local_addr()?);

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (notification_tx, notification_rx) = mpsc::unbounded_channel();

        Ok(Client {
            socket,
            dashboard: Dashboard::new(config, outbound_tx, notification_tx),
            outbound_rx,
            notification_rx,
            fake_ping_ms,
            last_printed: 0,
        })
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    async fn send_packet(&self, packet: &Packet, addr: SocketAddr) -> Result<(), BoxError> {
        if self.fake_ping_ms > 0 {
            sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
        }

        let data = serialize(packet)?;
        self.socket.send_to(&data, addr).await?;
        Ok(())
    }

    /// Prints log entries appended since the last call, then pending notifications
    fn flush_output(&mut self) {
        for entry in self.dashboard.log().since(self.last_printed) {
            println!("{}", entry.format_line());
        }
        if let Some(last) = self.dashboard.log().last() {
            self.last_printed = self.last_printed.max(last.id);
        }

        while let Ok(notification) = self.notification_rx.try_recv() {
            match notification.severity {
                Severity::Info => println!("[{}] {}", notification.title, notification.description),
                Severity::Error => {
                    eprintln!("[{}] {}", notification.title, notification.description)
                }
            }
        }
    }

    fn handle_line(&mut self, line: &str) -> bool {
        match console::parse_line(line) {
            Ok(Some(action)) => match console::apply(&mut self.dashboard, action) {
                Outcome::Continue(lines) => {
                    for line in lines {
                        println!("{}", line);
                    }
                    true
                }
                Outcome::Quit => false,
            },
            Ok(None) => true,
            Err(usage) => {
                eprintln!("{}", usage);
                true
            }
        }
    }

    pub async fn run(&mut self, auto_connect: bool) -> Result<(), BoxError> {
        if auto_connect {
            let _ = self.dashboard.connect(None);
        }
        println!("Type :help for dashboard actions; other lines are sent as server commands");
        self.flush_output();

        let mut poll_interval = interval(POLL_INTERVAL);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut buffer = [0u8; MAX_PACKET_SIZE];

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, addr)) => {
                            if self.fake_ping_ms > 0 {
                                sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
                            }

                            if self.dashboard.session().addr != Some(addr) {
                                debug!("Ignoring datagram from {}", addr);
                                continue;
                            }
                            match deserialize::<Packet>(&buffer[0..len]) {
                                Ok(packet) => self.dashboard.handle_packet(packet, Instant::now()),
                                Err(e) => warn!("Failed to decode packet from {}: {}", addr, e),
                            }
                        }
                        Err(e) => error!("Error receiving packet: {}", e),
                    }
                }

                Some(message) = self.outbound_rx.recv() => {
                    let OutboundMessage::SendPacket { packet, addr } = message;
                    if let Err(e) = self.send_packet(&packet, addr).await {
                        error!("Failed to send packet to {}: {}", addr, e);
                    }
                }

                _ = poll_interval.tick() => {
                    self.dashboard.poll(Instant::now());
                }

                line = lines.next_line() => {
                    match line {
                        Ok(Some(line)) => {
                            if !self.handle_line(&line) {
                                break;
                            }
                        }
                        Ok(None) => {
                            info!("Input closed");
                            break;
                        }
                        Err(e) => {
                            error!("Failed to read input: {}", e);
                            break;
                        }
                    }
                }
            }

            self.flush_output();
        }

        if self.dashboard.is_connected() {
            self.dashboard.disconnect();
            while let Ok(OutboundMessage::SendPacket { packet, addr }) =
                self.outbound_rx.try_recv()
            {
                let _ = self.send_packet(&packet, addr).await;
            }
        }
        self.flush_output();

        Ok(())
    }
}
