//! Integration tests for the dashboard and the control endpoint
//!
//! These tests validate cross-component interactions and real network behavior.

use assert_approx_eq::assert_approx_eq;
use bincode::{deserialize, serialize};
use dashboard::config::DashboardConfig;
use dashboard::connection::{ConnectionState, OutboundMessage};
use dashboard::dashboard::{Dashboard, Notification};
use dashboard::worlds::WorldConfig;
use server::instance::InstanceConfig;
use server::network::{Server, ServerMessage};
use shared::{
    LogLevel, Packet, ServerStatus, WorldKind, WorldSummary, MAX_PACKET_SIZE, PROTOCOL_VERSION,
};
use std::net::{SocketAddr, UdpSocket};
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_test::{assert_err, assert_ok};

/// NETWORK PROTOCOL TESTS
mod protocol_tests {
    use super::*;

    /// Tests that replies keep the id of the request they answer
    #[tokio::test]
    async fn packet_serialization_keeps_request_ids() {
        let packets = vec![
            Packet::Command {
                request_id: 7,
                text: "/list".to_string(),
            },
            Packet::CommandResult {
                request_id: 7,
                level: LogLevel::Info,
                message: "There are 0/20 players online: ".to_string(),
            },
            Packet::Rejected {
                request_id: 8,
                reason: "Server is already online".to_string(),
            },
            Packet::Connect {
                client_version: PROTOCOL_VERSION,
            },
        ];

        for packet in packets {
            let serialized = serialize(&packet).unwrap();
            let deserialized: Packet = deserialize(&serialized).unwrap();
            assert_eq!(deserialized.request_id(), packet.request_id());
            assert_eq!(deserialized, packet);
        }
    }

    /// Tests that a large handshake still fits in one datagram
    #[test]
    fn handshake_fits_in_datagram() {
        let worlds = (0..40)
            .map(|i| WorldSummary {
                name: format!("world_{}", i),
                kind: WorldKind::ALL[i % WorldKind::ALL.len()],
                size_mb: i as f32 * 1.5,
                last_played: Some(1_700_000_000_000 + i as u64),
                active: i == 0,
            })
            .collect();
        let properties = (0..17)
            .map(|i| (format!("property-{}", i), "x".repeat(16)))
            .collect();

        let packet = Packet::Connected {
            server_version: "Nukkit 1.0.0".to_string(),
            port: 19132,
            status: ServerStatus::Online,
            worlds,
            properties,
        };

        assert!(serialize(&packet).unwrap().len() < MAX_PACKET_SIZE);
    }

    /// Tests real UDP socket communication
    #[tokio::test]
    async fn udp_socket_communication() {
        let server_socket = UdpSocket::bind("127.0.0.1:0").expect("Failed to bind server socket");
        let server_addr = server_socket.local_addr().unwrap();

        // Echo server
        let server_socket_clone = server_socket.try_clone().unwrap();
        thread::spawn(move || {
            let mut buf = [0; MAX_PACKET_SIZE];
            if let Ok((size, client_addr)) = server_socket_clone.recv_from(&mut buf) {
                let _ = server_socket_clone.send_to(&buf[..size], client_addr);
            }
        });

        let client_socket = UdpSocket::bind("127.0.0.1:0").expect("Failed to bind client socket");
        client_socket
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();

        let packet = Packet::Heartbeat;
        let data = serialize(&packet).unwrap();
        client_socket.send_to(&data, server_addr).unwrap();

        let mut buf = [0; MAX_PACKET_SIZE];
        let (size, _) = client_socket.recv_from(&mut buf).unwrap();
        let echoed: Packet = deserialize(&buf[..size]).unwrap();
        assert_eq!(echoed, Packet::Heartbeat);
    }

    /// Tests graceful handling of malformed packets
    #[test]
    fn malformed_packet_handling() {
        let malformed_data = vec![
            vec![],
            vec![0xFF; 10],
            vec![0x00, 0x01],
            vec![0xFF, 0xFF, 0xFF, 0xFF],
        ];

        for data in malformed_data {
            let result: Result<Packet, _> = deserialize(&data);
            assert!(result.is_err(), "Should fail to deserialize malformed data");
        }
    }
}

/// Drives a dashboard over a real socket the way the console runtime does
struct LiveDashboard {
    dashboard: Dashboard,
    socket: tokio::net::UdpSocket,
    outbox: mpsc::UnboundedReceiver<OutboundMessage>,
    notifications: mpsc::UnboundedReceiver<Notification>,
    seen: Vec<Notification>,
}

impl LiveDashboard {
    async fn new() -> Self {
        let (outbox_tx, outbox) = mpsc::unbounded_channel();
        let (notification_tx, notifications) = mpsc::unbounded_channel();
        let config = DashboardConfig {
            command_timeout: Duration::from_secs(2),
            ..DashboardConfig::default()
        };

        LiveDashboard {
            dashboard: Dashboard::new(config, outbox_tx, notification_tx),
            socket: tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap(),
            outbox,
            notifications,
            seen: Vec::new(),
        }
    }

    async fn pump_once(&mut self) {
        while let Ok(OutboundMessage::SendPacket { packet, addr }) = self.outbox.try_recv() {
            let data = serialize(&packet).unwrap();
            self.socket.send_to(&data, addr).await.unwrap();
        }

        let mut buffer = [0u8; MAX_PACKET_SIZE];
        if let Ok(Ok((len, addr))) = tokio::time::timeout(
            Duration::from_millis(10),
            self.socket.recv_from(&mut buffer),
        )
        .await
        {
            if self.dashboard.session().addr == Some(addr) {
                let packet: Packet = deserialize(&buffer[..len]).unwrap();
                self.dashboard.handle_packet(packet, Instant::now());
            }
        }

        self.dashboard.poll(Instant::now());
        while let Ok(notification) = self.notifications.try_recv() {
            self.seen.push(notification);
        }
    }

    async fn pump_until(&mut self, condition: impl Fn(&Dashboard) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(3);
        while !condition(&self.dashboard) {
            assert!(Instant::now() < deadline, "condition not reached in time");
            self.pump_once().await;
        }
    }

    async fn connect(&mut self, server_addr: SocketAddr) {
        assert_ok!(self.dashboard.connect(Some(&server_addr.to_string())));
        self.pump_until(Dashboard::is_connected).await;
    }

    /// Starts the server and waits for the ready line that follows the status change
    async fn start_online(&mut self) {
        self.dashboard.start_server().unwrap();
        self.pump_until(|d| {
            d.session().status == ServerStatus::Online
                && d.log()
                    .entries()
                    .any(|e| e.message.starts_with("Done! For help"))
        })
        .await;
    }

    fn messages_for(&self, request_id: u64) -> Vec<String> {
        self.dashboard
            .log()
            .entries()
            .filter(|e| e.request_id == Some(request_id))
            .map(|e| e.message.clone())
            .collect()
    }

    fn saw(&self, title: &str) -> bool {
        self.seen.iter().any(|n| n.title == title)
    }
}

async fn spawn_server() -> (SocketAddr, mpsc::UnboundedSender<ServerMessage>) {
    let mut server = Server::new(
        "127.0.0.1:0",
        Duration::from_millis(10),
        4,
        InstanceConfig {
            port: 19132,
            startup_delay: Duration::from_millis(50),
            shutdown_delay: Duration::from_millis(50),
        },
    )
    .await
    .unwrap();
    let addr = server.local_addr().unwrap();
    let control = server.control_handle();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    (addr, control)
}

/// DASHBOARD SESSION TESTS
mod session_tests {
    use super::*;

    /// Tests the handshake mirrors worlds and properties from the endpoint
    #[tokio::test]
    async fn handshake_mirrors_server_state() {
        let (server_addr, control) = spawn_server().await;
        let mut live = LiveDashboard::new().await;

        live.connect(server_addr).await;

        let session = live.dashboard.session();
        assert_eq!(session.connection, ConnectionState::Connected);
        assert_eq!(session.status, ServerStatus::Offline);
        assert_eq!(session.server_version.as_deref(), Some("Nukkit 1.0.0"));
        assert_eq!(live.dashboard.worlds().len(), 3);
        assert_eq!(live.dashboard.worlds().active().unwrap().name, "world");
        assert_approx_eq!(
            live.dashboard.worlds().get("adventure_map").unwrap().size_mb,
            89.0
        );
        assert_eq!(
            live.dashboard
                .properties()
                .get("server-name")
                .map(|v| v.to_string()),
            Some("Nukkit Server".to_string())
        );
        assert!(live.saw("Connected to Server"));

        let _ = control.send(ServerMessage::Shutdown);
    }

    /// Tests the full start and stop lifecycle against the endpoint
    #[tokio::test]
    async fn server_lifecycle_roundtrip() {
        let (server_addr, control) = spawn_server().await;
        let mut live = LiveDashboard::new().await;
        live.connect(server_addr).await;

        live.start_online().await;
        assert!(live
            .dashboard
            .log()
            .entries()
            .any(|e| e.message.starts_with("Done! For help")));

        // Starting twice is refused locally
        assert_err!(live.dashboard.start_server());

        live.dashboard.stop_server().unwrap();
        live.pump_until(|d| d.session().status == ServerStatus::Offline)
            .await;
        assert!(live
            .dashboard
            .log()
            .entries()
            .any(|e| e.message == "Stopping server..."));
        assert_eq!(live.dashboard.pending_requests(), 0);

        let _ = control.send(ServerMessage::Shutdown);
    }

    /// Tests concurrent commands are paired with their own results
    #[tokio::test]
    async fn concurrent_commands_pair_with_results() {
        let (server_addr, control) = spawn_server().await;
        let mut live = LiveDashboard::new().await;
        live.connect(server_addr).await;
        live.start_online().await;

        let list = live.dashboard.execute("/list").unwrap();
        let difficulty = live.dashboard.execute("/difficulty hard").unwrap();
        let save = live.dashboard.execute("/save-all").unwrap();
        assert!(list < difficulty && difficulty < save);

        live.pump_until(|d| d.pending_requests() == 0).await;

        assert_eq!(
            live.messages_for(list),
            vec!["> /list", "There are 3/20 players online: Player1, Player2, Player3"]
        );
        assert_eq!(
            live.messages_for(difficulty),
            vec!["> /difficulty hard", "Set game difficulty to hard"]
        );
        assert_eq!(
            live.messages_for(save),
            vec!["> /save-all", "Saved the world"]
        );

        let _ = control.send(ServerMessage::Shutdown);
    }

    /// Tests commands sent while the server is offline report an error result
    #[tokio::test]
    async fn command_while_server_offline() {
        let (server_addr, control) = spawn_server().await;
        let mut live = LiveDashboard::new().await;
        live.connect(server_addr).await;

        let id = live.dashboard.execute("/list").unwrap();
        live.pump_until(|d| d.pending_requests() == 0).await;

        let result = live
            .dashboard
            .log()
            .entries()
            .filter(|e| e.request_id == Some(id))
            .last()
            .cloned()
            .unwrap();
        assert_eq!(result.level, LogLevel::Error);
        assert!(result.message.contains("command not executed"));

        let _ = control.send(ServerMessage::Shutdown);
    }

    /// Tests the dashboard releases requests when it disconnects
    #[tokio::test]
    async fn disconnect_clears_session() {
        let (server_addr, control) = spawn_server().await;
        let mut live = LiveDashboard::new().await;
        live.connect(server_addr).await;

        live.dashboard.disconnect();
        live.pump_once().await;

        assert_eq!(
            live.dashboard.session().connection,
            ConnectionState::Disconnected
        );
        assert!(live.saw("Disconnected"));
        assert_err!(live.dashboard.start_server());

        let _ = control.send(ServerMessage::Shutdown);
    }
}

/// WORLD AND PROPERTY TESTS
mod state_tests {
    use super::*;

    /// Tests a world switch is applied only after the endpoint accepts it
    #[tokio::test]
    async fn load_world_waits_for_acceptance() {
        let (server_addr, control) = spawn_server().await;
        let mut live = LiveDashboard::new().await;
        live.connect(server_addr).await;

        live.dashboard.load_world("creative_world").unwrap();
        assert_eq!(live.dashboard.worlds().active().unwrap().name, "world");

        live.pump_until(|d| d.worlds().active().map(|w| w.name.as_str()) == Some("creative_world"))
            .await;
        live.pump_until(|d| d.pending_requests() == 0).await;

        assert!(live.saw("World Changed"));
        assert_eq!(
            live.dashboard
                .worlds()
                .list()
                .iter()
                .filter(|w| w.active)
                .count(),
            1
        );

        let _ = control.send(ServerMessage::Shutdown);
    }

    /// Tests a created world is confirmed by the endpoint
    #[tokio::test]
    async fn create_world_confirmed() {
        let (server_addr, control) = spawn_server().await;
        let mut live = LiveDashboard::new().await;
        live.connect(server_addr).await;

        let record = live
            .dashboard
            .create_world(WorldConfig::new("skyblock", WorldKind::End))
            .unwrap();
        assert!(!record.active);

        live.pump_until(|d| d.pending_requests() == 0).await;

        assert!(live.dashboard.worlds().contains("skyblock"));
        assert!(live.saw("World Created"));
        assert!(live
            .dashboard
            .log()
            .entries()
            .any(|e| e.message == "Created world \"skyblock\" with type: end"));

        let _ = control.send(ServerMessage::Shutdown);
    }

    /// Tests saved properties are acknowledged and the editor is clean
    #[tokio::test]
    async fn save_properties_acknowledged() {
        let (server_addr, control) = spawn_server().await;
        let mut live = LiveDashboard::new().await;
        live.connect(server_addr).await;

        live.dashboard.set_property("max-players", "42");
        assert!(live.dashboard.properties().is_dirty());

        assert_eq!(live.dashboard.save_properties().unwrap(), 1);
        live.pump_until(|d| d.pending_requests() == 0).await;

        assert!(!live.dashboard.properties().is_dirty());
        assert!(live.saw("Properties Saved"));

        // The endpoint now reports the saved value in its handshake
        let mut second = LiveDashboard::new().await;
        second.connect(server_addr).await;
        assert_eq!(
            second
                .dashboard
                .properties()
                .get("max-players")
                .map(|v| v.to_string()),
            Some("42".to_string())
        );

        let _ = control.send(ServerMessage::Shutdown);
    }
}
