//! Server network layer handling UDP communications and tick coordination

use crate::game::GameServer;
use crate::session::SessionManager;
use log::{debug, error, info, warn};
use shared::{GameConfig, Packet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;

/// Messages sent from network tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    ClientTimeout {
        client_id: u64,
    },
    #[allow(dead_code)]
    Shutdown,
}

/// Messages sent from the main loop to the network sender task
#[derive(Debug)]
pub enum OutMessage {
    SendPacket { packet: Packet, addr: SocketAddr },
}

/// Main server coordinating networking and match simulation
pub struct Server {
    socket: Arc<UdpSocket>,
    sessions: Arc<RwLock<SessionManager>>,
    game: GameServer,
    /// Artificial one-way delay added to every outgoing packet.
    lag: Duration,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    out_tx: mpsc::UnboundedSender<OutMessage>,
    out_rx: mpsc::UnboundedReceiver<OutMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        cfg: GameConfig,
        lag_ms: u64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", addr);
        if lag_ms > 0 {
            info!("Adding {}ms of artificial lag to outgoing packets", lag_ms);
        }

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        let max_sessions = cfg.max_players * 4;
        Ok(Server {
            socket,
            sessions: Arc::new(RwLock::new(SessionManager::new(max_sessions))),
            game: GameServer::new(cfg),
            lag: Duration::from_millis(lag_ms),
            server_tx,
            server_rx,
            out_tx,
            out_rx,
        })
    }

    /// Spawns the task that continuously listens for incoming packets
    async fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = Packet::decode(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to decode packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns the task that drains the outgoing packet queue
    async fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let lag = self.lag;
        let mut out_rx = std::mem::replace(&mut self.out_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(OutMessage::SendPacket { packet, addr }) = out_rx.recv().await {
                if lag.is_zero() {
                    if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                        error!("Failed to send packet to {}: {}", addr, e);
                    }
                } else {
                    let socket = Arc::clone(&socket);
                    tokio::spawn(async move {
                        tokio::time::sleep(lag).await;
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    });
                }
            }
        });
    }

    /// Spawns the task that monitors session timeouts
    async fn spawn_timeout_checker(&self) {
        let sessions = Arc::clone(&self.sessions);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut sessions_guard = sessions.write().await;
                    sessions_guard.check_timeouts()
                };

                for client_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { client_id }) {
                        error!("Failed to send timeout message: {}", e);
                        break;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = packet.encode()?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.out_tx.send(OutMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    /// Processes one incoming packet
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Join { name } => {
                info!("Client joining from {} as '{}'", addr, name);

                // A rejoin from the same address replaces the old session.
                let existing = {
                    let sessions = self.sessions.read().await;
                    sessions.find_by_addr(addr)
                };
                if let Some(existing_id) = existing {
                    info!("Replacing existing client {} from {}", existing_id, addr);
                    self.sessions.write().await.remove_session(existing_id);
                    self.game.remove_player(existing_id);
                }

                let client_id = {
                    let mut sessions = self.sessions.write().await;
                    sessions.add_session(addr)
                };

                match client_id {
                    Some(client_id) => {
                        let (match_id, team) = self.game.add_player(client_id, name.clone());
                        self.sessions.write().await.set_match(client_id, match_id);
                        self.send_packet(
                            Packet::Joined {
                                client_id,
                                match_id,
                                team,
                            },
                            addr,
                        );
                        self.announce(match_id, format!("{} joined the game", name))
                            .await;
                    }
                    None => {
                        warn!("Rejecting join from {}: server full", addr);
                    }
                }
            }

            Packet::Ready {
                match_id,
                client_id,
            } => {
                if self.verify_sender(client_id, addr).await {
                    self.game.set_ready(match_id, client_id);
                    if let Some(name) = self.player_name(match_id, client_id) {
                        self.announce(match_id, format!("{} is ready", name)).await;
                    }
                }
            }

            Packet::ChangeTeam {
                match_id,
                client_id,
                team,
            } => {
                if self.verify_sender(client_id, addr).await {
                    self.game.change_team(match_id, client_id, team);
                }
            }

            Packet::Chat {
                match_id,
                client_id,
                team,
                text,
            } => {
                if !self.verify_sender(client_id, addr).await {
                    return;
                }
                let Some(m) = self.game.find_match(match_id) else {
                    return;
                };
                let recipients: Vec<u64> = m
                    .players
                    .iter()
                    .filter(|p| team.is_none() || team == Some(p.team))
                    .map(|p| p.client_id)
                    .collect();

                let packet = Packet::Chat {
                    match_id,
                    client_id,
                    team,
                    text,
                };
                let sessions = self.sessions.read().await;
                for recipient in recipients {
                    if let Some(addr) = sessions.addr_of(recipient) {
                        self.send_packet(packet.clone(), addr);
                    }
                }
            }

            Packet::Input {
                match_id: _,
                client_id,
                command,
            } => {
                if self.verify_sender(client_id, addr).await {
                    let mut sessions = self.sessions.write().await;
                    if !sessions.queue_input(client_id, command) {
                        debug!("Input from unknown client {}", client_id);
                    }
                }
            }

            Packet::Ping => {
                let connected_clients = self.sessions.read().await.len();
                self.send_packet(
                    Packet::Pong {
                        connected_clients,
                        running_matches: self.game.running_matches(),
                    },
                    addr,
                );
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    /// A claimed client id must match the session registered at the
    /// sender's address. Valid senders count as activity.
    async fn verify_sender(&self, client_id: u64, addr: SocketAddr) -> bool {
        let mut sessions = self.sessions.write().await;
        if sessions.find_by_addr(addr) == Some(client_id) {
            sessions.touch(client_id);
            true
        } else {
            warn!("Client id {} does not match sender {}", client_id, addr);
            false
        }
    }

    fn player_name(&self, match_id: u64, client_id: u64) -> Option<String> {
        self.game
            .find_match(match_id)
            .and_then(|m| m.player(client_id))
            .map(|p| p.name.clone())
    }

    /// Relays a server-originated chat line to everyone in the match.
    async fn announce(&self, match_id: u64, text: String) {
        let Some(m) = self.game.find_match(match_id) else {
            return;
        };
        let packet = Packet::Chat {
            match_id,
            client_id: 0,
            team: None,
            text,
        };
        let sessions = self.sessions.read().await;
        for player in &m.players {
            if let Some(addr) = sessions.addr_of(player.client_id) {
                self.send_packet(packet.clone(), addr);
            }
        }
    }

    /// Resolves addresses and queues one broadcast batch
    async fn dispatch(&self, outgoing: Vec<(u64, Packet)>) {
        if outgoing.is_empty() {
            return;
        }
        let sessions = self.sessions.read().await;
        for (client_id, packet) in outgoing {
            if let Some(addr) = sessions.addr_of(client_id) {
                self.send_packet(packet, addr);
            }
        }
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver().await;
        self.spawn_network_sender().await;
        self.spawn_timeout_checker().await;

        let (physics_ms, broadcast_ms) = {
            let cfg = self.game.config();
            (cfg.physics_tick_ms, cfg.broadcast_tick_ms)
        };
        let mut physics_interval = interval(Duration::from_millis(physics_ms));
        let mut broadcast_interval = interval(Duration::from_millis(broadcast_ms));
        let mut last_broadcast = Instant::now();

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id }) => {
                            info!("Client {} timed out", client_id);
                            let departed = {
                                let sessions = self.sessions.read().await;
                                sessions.match_of(client_id)
                            };
                            let name = departed
                                .and_then(|mid| self.player_name(mid, client_id));
                            self.game.remove_player(client_id);
                            if let (Some(match_id), Some(name)) = (departed, name) {
                                self.announce(match_id, format!("{} left the game", name)).await;
                            }
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = physics_interval.tick() => {
                    let mut sessions = self.sessions.write().await;
                    self.game.physics_tick(&mut sessions);
                },

                _ = broadcast_interval.tick() => {
                    let now = Instant::now();
                    let elapsed_ms = now.duration_since(last_broadcast).as_millis() as u64;
                    last_broadcast = now;

                    let outgoing = self.game.broadcast_tick(elapsed_ms);
                    self.dispatch(outgoing).await;
                },
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Team;
    use std::net::{IpAddr, Ipv4Addr};
    use tokio::sync::mpsc;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), port)
    }

    #[test]
    fn test_server_message_creation() {
        let packet = Packet::Join {
            name: "tester".to_string(),
        };
        let msg = ServerMessage::PacketReceived {
            packet,
            addr: addr(8080),
        };

        match msg {
            ServerMessage::PacketReceived { packet: p, addr: a } => {
                assert_eq!(a, addr(8080));
                match p {
                    Packet::Join { name } => assert_eq!(name, "tester"),
                    _ => panic!("Unexpected packet type"),
                }
            }
            _ => panic!("Unexpected message type"),
        }
    }

    #[test]
    fn test_client_timeout_message() {
        let msg = ServerMessage::ClientTimeout { client_id: 42 };
        match msg {
            ServerMessage::ClientTimeout { client_id } => assert_eq!(client_id, 42),
            _ => panic!("Unexpected message type"),
        }
    }

    #[test]
    fn test_channel_communication() {
        let (tx, mut rx) = mpsc::unbounded_channel::<OutMessage>();

        let packet = Packet::Joined {
            client_id: 7,
            match_id: 1,
            team: Team::Hider,
        };
        assert!(tx
            .send(OutMessage::SendPacket {
                packet,
                addr: addr(9090),
            })
            .is_ok());

        let OutMessage::SendPacket { packet, addr: a } = rx.try_recv().unwrap();
        assert_eq!(a, addr(9090));
        match packet {
            Packet::Joined { client_id, .. } => assert_eq!(client_id, 7),
            _ => panic!("Unexpected packet type"),
        }
    }

    #[test]
    fn test_packet_wire_roundtrip() {
        let packets = vec![
            Packet::Join {
                name: "a".to_string(),
            },
            Packet::Ping,
            Packet::Ready {
                match_id: 1,
                client_id: 2,
            },
            Packet::Chat {
                match_id: 1,
                client_id: 2,
                team: Some(Team::Seeker),
                text: "over here".to_string(),
            },
        ];

        for packet in packets {
            let bytes = packet.encode().unwrap();
            assert!(bytes.len() < 2048);
            assert_eq!(Packet::decode(&bytes).unwrap(), packet);
        }
    }

    #[test]
    fn test_address_validation() {
        let valid_addrs = vec!["127.0.0.1:8080", "0.0.0.0:0", "[::1]:8080"];
        for addr_str in valid_addrs {
            assert!(addr_str.parse::<SocketAddr>().is_ok());
        }

        let invalid_addrs = vec!["invalid", "127.0.0.1:99999", ""];
        for addr_str in invalid_addrs {
            assert!(addr_str.parse::<SocketAddr>().is_err());
        }
    }
}
