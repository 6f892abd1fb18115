//! Multi-format binary telemetry decoding for racing-simulation games.
//!
//! Games broadcast high-frequency telemetry as fixed-layout binary UDP
//! packets; each supported game/version gets one [`TelemetryDecoder`] that
//! parses its wire format into the common [`Frame`] representation. The
//! [`registry::DecoderRegistry`] selects and caches one decoder instance per
//! configured format, and [`validator::PacketSizeValidator`] cross-checks
//! incoming payload lengths as an advisory side channel.
//!
//! Decode failures are always soft: a malformed packet yields `None` (plus a
//! diagnostic log) and must never interrupt the stream of subsequent valid
//! packets. Only configuration mistakes (an unknown decoder id) surface as
//! errors.

pub mod assetto_corsa;
pub mod f1;
pub mod f1_2024;
pub mod f1_2025;
pub mod forza;
pub mod ingest;
pub mod registry;
pub mod validator;
pub mod wire;

pub use ingest::{IngestStream, UdpIngest};
pub use pitview_frame::{FieldValue, Frame};
pub use registry::{DecoderRegistry, RegistryError};
pub use validator::PacketSizeValidator;

/// A sub-type discriminator paired with its human-readable label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketTypeInfo {
    /// Discriminator value as it appears in `Frame::packet_type`.
    pub id: i32,
    /// Display name.
    pub name: &'static str,
}

/// Common contract every game decoder implements.
///
/// Decoders are stateful (they own the previous-frame slot that feeds the
/// derivative fields) and are driven one packet at a time from a single
/// consuming task; the registry hands out `&mut` access accordingly.
pub trait TelemetryDecoder: Send {
    /// Decodes one raw packet into a frame.
    ///
    /// Returns `None` for truncated buffers, unrecognized sub-types without
    /// a fallback, and semantically gated content (e.g. race not active).
    /// Never panics on arbitrary input.
    fn decode(&mut self, data: &[u8]) -> Option<Frame>;

    /// Exact byte lengths this decoder treats as structurally valid, one per
    /// sub-type, used by the packet size validator. Decode performs its own
    /// bounds checks independently of this list.
    fn accepted_packet_sizes(&self) -> &'static [usize];

    /// Human-readable label for a sub-type discriminator; unknown ids render
    /// as a generic placeholder carrying the id.
    fn packet_type_name(&self, packet_type: i32) -> String;

    /// All sub-types this decoder can emit.
    fn supported_packet_types(&self) -> &'static [PacketTypeInfo];
}
