//! Headless client: connects, predicts and wanders the map.

use crate::game::ClientGame;
use crate::input::InputTracker;
use crate::path::{find_path, step_symbol};
use log::{debug, error, info, warn};
use rand::Rng;
use shared::{Packet, Symbol, Team, Tile, tile_walkable};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::time::{interval, sleep};

pub struct Client {
    socket: UdpSocket,
    server_addr: SocketAddr,
    name: String,
    game: Option<ClientGame>,
    tracker: InputTracker,
    /// Round trip artificially added on top of the real link, half on send
    /// and half on receive.
    fake_ping_ms: u64,
    /// Current wander destination of the bot.
    target: Option<Tile>,
    /// When the last ping went out, for RTT measurement.
    last_ping: Option<Instant>,
}

impl Client {
    pub async fn new(
        server_addr: &str,
        name: String,
        fake_ping_ms: u64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let server_addr = server_addr.parse()?;

        Ok(Client {
            socket,
            server_addr,
            name,
            game: None,
            tracker: InputTracker::new(),
            fake_ping_ms,
            target: None,
            last_ping: None,
        })
    }

    async fn send_packet(&self, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        if self.fake_ping_ms > 0 {
            sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
        }

        let data = packet.encode()?;
        self.socket.send_to(&data, self.server_addr).await?;
        Ok(())
    }

    async fn handle_packet(&mut self, packet: Packet) {
        match packet {
            Packet::Joined {
                client_id,
                match_id,
                team,
            } => {
                info!(
                    "Joined match {} as client {} on team {:?}",
                    match_id, client_id, team
                );
                self.game = Some(ClientGame::new(
                    client_id,
                    match_id,
                    team,
                    shared::GameConfig::default(),
                ));

                // The bot has no lobby screen, it is ready immediately.
                if let Err(e) = self
                    .send_packet(&Packet::Ready {
                        match_id,
                        client_id,
                    })
                    .await
                {
                    error!("Error sending ready: {}", e);
                }
            }

            Packet::Update(snapshot) => {
                if let Some(game) = &mut self.game {
                    game.apply_snapshot(snapshot);
                }
            }

            Packet::GameOver(snapshot) => {
                if let Some(game) = &mut self.game {
                    game.apply_snapshot(snapshot.clone());
                    let mut standings: Vec<_> = snapshot
                        .players
                        .iter()
                        .map(|p| (p.name.clone(), p.score.total))
                        .collect();
                    standings.sort_by(|a, b| b.1.cmp(&a.1));
                    info!("Match over. Standings: {:?}", standings);
                }
                self.game = None;
                self.target = None;
            }

            Packet::Chat {
                client_id, text, ..
            } => {
                info!("[chat] {}: {}", client_id, text);
            }

            Packet::Pong {
                connected_clients,
                running_matches,
            } => {
                let rtt = self
                    .last_ping
                    .take()
                    .map(|sent| sent.elapsed().as_millis())
                    .unwrap_or(0);
                debug!(
                    "pong: rtt {}ms, {} clients, {} running matches",
                    rtt, connected_clients, running_matches
                );
            }

            _ => {
                warn!("Unexpected packet type from server");
            }
        }
    }

    /// Picks the keys for this frame: follow the current wander path, with
    /// an occasional press of the team special.
    fn wander_symbols(&mut self) -> Vec<Symbol> {
        let Some(game) = &self.game else {
            return Vec::new();
        };
        let (Some(world), Some(me)) = (&game.world, &game.me) else {
            return Vec::new();
        };
        if !game.is_running() || me.state != shared::PlayerState::InGame {
            return Vec::new();
        }

        let team = me.team;
        let here = world.center_tile(me.position, me.extent);
        let mut rng = rand::thread_rng();

        if self.target == Some(here) {
            self.target = None;
        }
        let target = match self.target {
            Some(t) => t,
            None => {
                let t = random_walkable_tile(world, team).unwrap_or(here);
                self.target = Some(t);
                t
            }
        };

        let mut symbols = Vec::new();
        match find_path(world, team, here, target) {
            Some(path) if path.len() >= 2 => {
                if let Some(sym) = step_symbol(path[0], path[1]) {
                    symbols.push(sym);
                }
            }
            _ => {
                self.target = None;
            }
        }

        // Bots burst and plant traps now and then.
        if rng.gen_bool(0.02) {
            symbols.push(Symbol::Special);
        }
        symbols
    }

    async fn send_input(&mut self, dt: f32) {
        let symbols = self.wander_symbols();
        let Some(game) = &mut self.game else {
            return;
        };
        let Some(me) = &game.me else {
            return;
        };

        let Some(command) = self.tracker.capture(symbols, dt, me.speed) else {
            return;
        };
        let packet = Packet::Input {
            match_id: game.match_id,
            client_id: game.client_id,
            command: command.clone(),
        };
        game.predict(command);

        if let Err(e) = self.send_packet(&packet).await {
            error!("Error sending input: {}", e);
        }
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Connecting to {} as '{}'", self.server_addr, self.name);
        self.send_packet(&Packet::Join {
            name: self.name.clone(),
        })
        .await?;

        let input_ms = shared::GameConfig::default().physics_tick_ms;
        let mut input_interval = interval(Duration::from_millis(input_ms));
        let mut ping_interval = interval(Duration::from_secs(2));
        let mut last_input = Instant::now();
        let mut buffer = [0u8; 65536];

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, _)) => {
                            if self.fake_ping_ms > 0 {
                                sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
                            }
                            if let Ok(packet) = Packet::decode(&buffer[0..len]) {
                                self.handle_packet(packet).await;
                            } else {
                                warn!("Failed to decode packet from server");
                            }
                        },
                        Err(e) => error!("Error receiving packet: {}", e),
                    }
                },

                _ = input_interval.tick() => {
                    let now = Instant::now();
                    let dt = now.duration_since(last_input).as_secs_f32();
                    last_input = now;
                    self.send_input(dt).await;
                },

                _ = ping_interval.tick() => {
                    self.last_ping = Some(Instant::now());
                    if let Err(e) = self.send_packet(&Packet::Ping).await {
                        error!("Error sending ping: {}", e);
                    }
                },
            }
        }
    }
}

fn random_walkable_tile(world: &shared::TileWorld, team: Team) -> Option<Tile> {
    let mut rng = rand::thread_rng();
    for _ in 0..50 {
        let tile = Tile::new(
            rng.gen_range(1..world.rows - 1),
            rng.gen_range(1..world.cols - 1),
        );
        if tile_walkable(team, world.cell(tile)) {
            return Some(tile);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::TileWorld;

    #[test]
    fn random_targets_are_walkable() {
        let world = TileWorld::standard(40.0);
        for _ in 0..20 {
            let tile = random_walkable_tile(&world, Team::Seeker).unwrap();
            assert!(tile_walkable(Team::Seeker, world.cell(tile)));
        }
    }

    #[test]
    fn join_packet_roundtrip() {
        let packet = Packet::Join {
            name: "bot".to_string(),
        };
        let bytes = packet.encode().unwrap();
        assert_eq!(Packet::decode(&bytes).unwrap(), packet);
    }
}
