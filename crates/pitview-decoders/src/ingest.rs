//! UDP ingest loop.
//!
//! Binds a socket, routes every datagram through the decoder registry,
//! and streams decoded frames over a channel. Packet sizes are checked
//! against the selected decoder's published sizes as a side channel;
//! a mismatch is logged but the datagram is still decoded.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use anyhow::{Context, Result};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::registry::DecoderRegistry;
use crate::validator::PacketSizeValidator;
use pitview_frame::Frame;

pub const DEFAULT_UDP_PORT: u16 = 20777;

/// Largest datagram any supported game emits, with headroom.
const MAX_PACKET_SIZE: usize = 8192;
const CHANNEL_CAPACITY: usize = 100;

const PORT_ENV: &str = "PITVIEW_UDP_PORT";
const HOST_ENV: &str = "PITVIEW_UDP_HOST";

/// A running ingest task: the bound address and the decoded frame stream.
pub struct IngestStream {
    pub local_addr: SocketAddr,
    pub frames: mpsc::Receiver<Frame>,
}

/// Configures and starts the UDP listener for one game.
pub struct UdpIngest {
    bind_addr: SocketAddr,
    decoder_id: String,
}

impl UdpIngest {
    pub fn new(decoder_id: &str) -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_UDP_PORT),
            decoder_id: decoder_id.to_string(),
        }
    }

    /// Reads the bind address from `PITVIEW_UDP_HOST` / `PITVIEW_UDP_PORT`,
    /// falling back to all interfaces on the default port.
    ///
    /// # Errors
    ///
    /// Returns an error when either variable is set but does not parse.
    pub fn from_env(decoder_id: &str) -> Result<Self> {
        let mut ingest = Self::new(decoder_id);
        if let Ok(host) = std::env::var(HOST_ENV) {
            let host: IpAddr = host
                .parse()
                .with_context(|| format!("invalid {HOST_ENV}: {host}"))?;
            ingest.bind_addr.set_ip(host);
        }
        if let Ok(port) = std::env::var(PORT_ENV) {
            let port: u16 = port
                .parse()
                .with_context(|| format!("invalid {PORT_ENV}: {port}"))?;
            ingest.bind_addr.set_port(port);
        }
        Ok(ingest)
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Binds the socket, selects the decoder, and spawns the receive loop.
    ///
    /// # Errors
    ///
    /// Returns an error when the decoder id is unknown or the socket
    /// cannot be bound. Decode failures after startup are soft: the
    /// datagram is dropped and logged.
    pub async fn start(self) -> Result<IngestStream> {
        let mut registry = DecoderRegistry::new();
        registry.load_decoder(&self.decoder_id)?;

        let socket = UdpSocket::bind(self.bind_addr)
            .await
            .with_context(|| format!("failed to bind UDP socket on {}", self.bind_addr))?;
        let local_addr = socket.local_addr().context("no local address")?;
        info!(addr = %local_addr, decoder = %self.decoder_id, "telemetry ingest listening");

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let mut validator = PacketSizeValidator::new();

        tokio::spawn(async move {
            let mut buf = [0_u8; MAX_PACKET_SIZE];
            loop {
                match socket.recv_from(&mut buf).await {
                    Ok((len, _peer)) => {
                        let Some(data) = buf.get(..len) else {
                            continue;
                        };
                        if let Some(accepted) = registry.accepted_packet_sizes() {
                            validator.validate(len, accepted);
                        }
                        match registry.decode(data) {
                            Some(frame) => {
                                if tx.send(frame).await.is_err() {
                                    debug!("receiver dropped, stopping ingest");
                                    break;
                                }
                            }
                            // Gated or malformed packets are dropped quietly.
                            None => debug!(len, "datagram produced no frame"),
                        }
                    }
                    Err(e) => warn!("UDP receive error: {e}"),
                }
            }
            info!("telemetry ingest stopped");
        });

        Ok(IngestStream {
            local_addr,
            frames: rx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn init_test_logging() {
        let _ignored = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    fn make_motorsport_packet() -> Vec<u8> {
        let mut data = vec![0_u8; 311];
        data[0..4].copy_from_slice(&1_i32.to_le_bytes()); // IsRaceOn
        data[300..302].copy_from_slice(&7_u16.to_le_bytes()); // LapNumber
        data[244..248].copy_from_slice(&42.0_f32.to_le_bytes()); // Speed
        data
    }

    #[tokio::test]
    async fn loopback_packet_becomes_frame() -> TestResult {
        init_test_logging();
        let bind: SocketAddr = "127.0.0.1:0".parse()?;
        let mut stream = UdpIngest::new("forza-motorsport")
            .with_addr(bind)
            .start()
            .await?;

        let sender = UdpSocket::bind("127.0.0.1:0").await?;
        sender
            .send_to(&make_motorsport_packet(), stream.local_addr)
            .await?;

        let frame = tokio::time::timeout(Duration::from_secs(5), stream.frames.recv())
            .await?
            .ok_or("ingest channel closed")?;
        assert_eq!(frame.packet_type, 1);
        assert_eq!(frame.get_i64("LapNumber"), Some(7));
        let speed = frame.get_f64("Speed").ok_or("missing field")?;
        assert!((speed - 42.0).abs() < 1e-6);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_decoder_fails_startup() {
        let bind: SocketAddr = "127.0.0.1:0"
            .parse()
            .unwrap_or_else(|_| SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0));
        let result = UdpIngest::new("outrun-2006").with_addr(bind).start().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn undersized_packet_is_dropped_not_fatal() -> TestResult {
        let bind: SocketAddr = "127.0.0.1:0".parse()?;
        let mut stream = UdpIngest::new("forza-motorsport")
            .with_addr(bind)
            .start()
            .await?;

        let sender = UdpSocket::bind("127.0.0.1:0").await?;
        sender.send_to(&[0_u8; 10], stream.local_addr).await?;
        sender
            .send_to(&make_motorsport_packet(), stream.local_addr)
            .await?;

        // Only the valid packet surfaces.
        let frame = tokio::time::timeout(Duration::from_secs(5), stream.frames.recv())
            .await?
            .ok_or("ingest channel closed")?;
        assert_eq!(frame.get_i64("LapNumber"), Some(7));
        Ok(())
    }
}
