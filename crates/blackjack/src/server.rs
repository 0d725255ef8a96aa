//! `BlackjackServer` builder and server loop.
//!
//! This is the entry point for hosting tables. It ties together all the
//! layers: transport → protocol → lobby → tables. The server owns one
//! [`Endpoint`] and one [`Lobby`]; every tick it drains the transport,
//! hands each message to the lobby, and sends the replies back out.

use std::time::Duration;

use blackjack_protocol::ProtocolConfig;
use blackjack_table::{Lobby, TableConfig};
use blackjack_transport::{Peer, PeerAddr};
use serde::{Deserialize, Serialize};

use crate::endpoint::Endpoint;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Everything a server needs to know before it starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Tables in the lobby. Clamped to `1..=MAX_TABLES`.
    pub table_count: usize,
    /// Loop frequency in Hz. Clamped to `1..=MAX_TICK_RATE_HZ`.
    pub tick_rate_hz: u32,
    /// Rules shared by every table.
    pub table: TableConfig,
    /// Framing limits.
    pub protocol: ProtocolConfig,
}

impl ServerConfig {
    /// Table indexes travel as a positive `i16`.
    pub const MAX_TABLES: usize = i16::MAX as usize;
    pub const MAX_TICK_RATE_HZ: u32 = 128;

    /// Clamps every field into range and validates the nested configs.
    pub fn validated(mut self) -> Self {
        if self.table_count == 0 || self.table_count > Self::MAX_TABLES {
            let clamped = self.table_count.clamp(1, Self::MAX_TABLES);
            tracing::warn!(
                requested = self.table_count,
                clamped,
                "table_count out of range"
            );
            self.table_count = clamped;
        }
        if self.tick_rate_hz == 0 || self.tick_rate_hz > Self::MAX_TICK_RATE_HZ {
            let clamped = self.tick_rate_hz.clamp(1, Self::MAX_TICK_RATE_HZ);
            tracing::warn!(
                requested = self.tick_rate_hz,
                clamped,
                "tick_rate_hz out of range"
            );
            self.tick_rate_hz = clamped;
        }
        self.table = self.table.validated();
        self.protocol = self.protocol.validated();
        self
    }

    /// Time between two ticks.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(1) / self.tick_rate_hz.max(1)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            table_count: 2,
            tick_rate_hz: 30,
            table: TableConfig::default(),
            protocol: ProtocolConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring a blackjack server.
///
/// # Example
///
/// ```rust,ignore
/// use blackjack::prelude::*;
///
/// let peer = WebSocketPeer::bind("0.0.0.0:7777", WebSocketConfig::default()).await?;
/// let server = BlackjackServerBuilder::new()
///     .tables(3)
///     .tick_rate(20)
///     .build(peer);
/// server.run().await
/// ```
#[derive(Debug, Clone, Default)]
pub struct BlackjackServerBuilder {
    config: ServerConfig,
    seed: Option<u64>,
}

impl BlackjackServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn tables(mut self, count: usize) -> Self {
        self.config.table_count = count;
        self
    }

    pub fn tick_rate(mut self, hz: u32) -> Self {
        self.config.tick_rate_hz = hz;
        self
    }

    pub fn table_config(mut self, config: TableConfig) -> Self {
        self.config.table = config;
        self
    }

    pub fn protocol_config(mut self, config: ProtocolConfig) -> Self {
        self.config.protocol = config;
        self
    }

    /// Deals from decks seeded with `seed`, so runs are repeatable.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builds the server on an already bound transport.
    pub fn build<P: Peer>(self, peer: P) -> BlackjackServer<P> {
        let config = self.config.validated();
        let lobby = match self.seed {
            Some(seed) => Lobby::seeded(config.table_count, config.table.clone(), seed),
            None => Lobby::new(config.table_count, config.table.clone()),
        }
        .with_max_chat_bytes(config.protocol.max_string_len);
        let endpoint = Endpoint::new(peer, config.protocol.clone());
        tracing::info!(
            addr = %endpoint.local_addr(),
            tables = config.table_count,
            tick_rate_hz = config.tick_rate_hz,
            "blackjack server ready"
        );
        BlackjackServer {
            endpoint,
            lobby,
            config,
        }
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// A blackjack server over some transport.
///
/// Call [`run()`](Self::run) to loop forever, or [`tick()`](Self::tick)
/// to drive it by hand.
pub struct BlackjackServer<P: Peer> {
    endpoint: Endpoint<P>,
    lobby: Lobby,
    config: ServerConfig,
}

impl<P: Peer> BlackjackServer<P> {
    pub fn local_addr(&self) -> PeerAddr {
        self.endpoint.local_addr()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn lobby(&self) -> &Lobby {
        &self.lobby
    }

    pub fn endpoint(&self) -> &Endpoint<P> {
        &self.endpoint
    }

    pub fn endpoint_mut(&mut self) -> &mut Endpoint<P> {
        &mut self.endpoint
    }

    /// Runs one input → update → output cycle.
    ///
    /// Returns the number of messages handled.
    pub fn tick(&mut self) -> usize {
        self.endpoint.poll_transport();
        let inbound = self.endpoint.poll_inbound();
        let handled = inbound.len();

        for message in inbound {
            for (destination, reply) in self.lobby.handle(message) {
                self.endpoint.enqueue_outbound(destination, reply);
            }
        }

        self.endpoint.flush();
        handled
    }

    /// Ticks at the configured rate until the task is dropped.
    pub async fn run(mut self) {
        let mut interval = tokio::time::interval(self.config.tick_interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        tracing::info!(addr = %self.local_addr(), "blackjack server running");

        loop {
            interval.tick().await;
            self.tick();
        }
    }
}
