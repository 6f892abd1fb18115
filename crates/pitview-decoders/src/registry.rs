//! Decoder selection and caching.
//!
//! Decoders are built on first selection and kept alive in the registry so
//! re-selecting a game does not discard the previous-frame state its
//! derivative calculations depend on.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{info, warn};

use crate::TelemetryDecoder;
use crate::assetto_corsa::AssettoCorsaDecoder;
use crate::f1_2024::F12024Decoder;
use crate::f1_2025::F12025Decoder;
use crate::forza::{ForzaHorizonDecoder, ForzaMotorsportDecoder};
use pitview_frame::Frame;

/// Metadata and constructor for one registered decoder.
pub struct DecoderInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    build: fn() -> Box<dyn TelemetryDecoder>,
}

pub const AVAILABLE_DECODERS: [DecoderInfo; 5] = [
    DecoderInfo {
        id: "forza-motorsport",
        name: "Forza Motorsport",
        description: "Forza Motorsport series UDP telemetry decoder",
        build: || Box::new(ForzaMotorsportDecoder::new()),
    },
    DecoderInfo {
        id: "forza-horizon",
        name: "Forza Horizon 4/5",
        description: "Forza Horizon 4/5 series UDP telemetry decoder",
        build: || Box::new(ForzaHorizonDecoder::new()),
    },
    DecoderInfo {
        id: "assetto-corsa",
        name: "Assetto Corsa Series",
        description: "Assetto Corsa shared-memory UDP telemetry decoder",
        build: || Box::new(AssettoCorsaDecoder::new()),
    },
    DecoderInfo {
        id: "f1-2024",
        name: "F1 2024",
        description: "F1 24 UDP telemetry decoder with full packet type support",
        build: || Box::new(F12024Decoder::new()),
    },
    DecoderInfo {
        id: "f1-2025",
        name: "F1 2025",
        description: "F1 25 UDP telemetry decoder including the lap positions packet",
        build: || Box::new(F12025Decoder::new()),
    },
];

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown decoder: {0}")]
    UnknownDecoder(String),
}

/// Holds every decoder built so far and routes packets to the selected one.
pub struct DecoderRegistry {
    loaded: HashMap<String, Box<dyn TelemetryDecoder>>,
    active: Option<String>,
}

impl DecoderRegistry {
    pub fn new() -> Self {
        Self {
            loaded: HashMap::new(),
            active: None,
        }
    }

    /// Selects a decoder by id, building it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownDecoder`] when no decoder is
    /// registered under `id`; the previous selection stays active.
    pub fn load_decoder(&mut self, id: &str) -> Result<(), RegistryError> {
        if !self.loaded.contains_key(id) {
            let decoder_info = AVAILABLE_DECODERS
                .iter()
                .find(|d| d.id == id)
                .ok_or_else(|| RegistryError::UnknownDecoder(id.to_string()))?;
            self.loaded.insert(id.to_string(), (decoder_info.build)());
            info!(decoder = decoder_info.name, "loaded decoder");
        }
        self.active = Some(id.to_string());
        Ok(())
    }

    pub fn active_decoder_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Routes a packet to the selected decoder; `None` when decoding fails
    /// or nothing is selected.
    pub fn decode(&mut self, data: &[u8]) -> Option<Frame> {
        let Some(id) = self.active.as_deref() else {
            warn!("no decoder selected, dropping packet");
            return None;
        };
        self.loaded.get_mut(id)?.decode(data)
    }

    /// Accepted datagram sizes of the selected decoder.
    pub fn accepted_packet_sizes(&self) -> Option<&'static [usize]> {
        let id = self.active.as_deref()?;
        Some(self.loaded.get(id)?.accepted_packet_sizes())
    }

    /// Human-readable packet type name per the selected decoder.
    pub fn packet_type_name(&self, packet_type: i32) -> Option<String> {
        let id = self.active.as_deref()?;
        Some(self.loaded.get(id)?.packet_type_name(packet_type))
    }

    pub fn available_decoders() -> &'static [DecoderInfo] {
        &AVAILABLE_DECODERS
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn make_motorsport_packet(gear: u8) -> Vec<u8> {
        let mut data = vec![0_u8; 311];
        data[0..4].copy_from_slice(&1_i32.to_le_bytes()); // IsRaceOn
        data[300..302].copy_from_slice(&3_u16.to_le_bytes()); // LapNumber
        data[307] = gear;
        data
    }

    #[test]
    fn unknown_decoder_id_is_an_error() -> TestResult {
        let mut registry = DecoderRegistry::new();
        let Err(err) = registry.load_decoder("rfactor-9") else {
            return Err("expected load failure".into());
        };
        assert_eq!(err.to_string(), "unknown decoder: rfactor-9");
        assert!(registry.active_decoder_id().is_none());
        Ok(())
    }

    #[test]
    fn decode_without_selection_drops_packet() {
        let mut registry = DecoderRegistry::new();
        assert!(registry.decode(&make_motorsport_packet(1)).is_none());
        assert!(registry.accepted_packet_sizes().is_none());
    }

    #[test]
    fn selection_routes_packets() -> TestResult {
        let mut registry = DecoderRegistry::new();
        registry.load_decoder("forza-motorsport")?;
        assert_eq!(registry.active_decoder_id(), Some("forza-motorsport"));

        let frame = registry
            .decode(&make_motorsport_packet(2))
            .ok_or("no frame")?;
        assert_eq!(frame.packet_type, 1);
        assert_eq!(
            registry.packet_type_name(1).as_deref(),
            Some("Forza Motorsport")
        );
        assert_eq!(registry.accepted_packet_sizes(), Some(&[311, 331][..]));
        Ok(())
    }

    #[test]
    fn reselection_keeps_decoder_state() -> TestResult {
        let mut registry = DecoderRegistry::new();
        registry.load_decoder("forza-motorsport")?;
        registry.decode(&make_motorsport_packet(2)).ok_or("no frame")?;

        // Switching away and back must not reset the previous-frame state.
        registry.load_decoder("assetto-corsa")?;
        registry.load_decoder("forza-motorsport")?;

        let frame = registry
            .decode(&make_motorsport_packet(3))
            .ok_or("no frame")?;
        assert_eq!(frame.get_i64("Shifting"), Some(1));
        Ok(())
    }

    #[test]
    fn failed_selection_keeps_previous_decoder() -> TestResult {
        let mut registry = DecoderRegistry::new();
        registry.load_decoder("f1-2025")?;
        assert!(registry.load_decoder("gran-turismo").is_err());
        assert_eq!(registry.active_decoder_id(), Some("f1-2025"));
        Ok(())
    }

    #[test]
    fn decoded_frame_serializes_flat() -> TestResult {
        let mut registry = DecoderRegistry::new();
        registry.load_decoder("forza-motorsport")?;
        let frame = registry
            .decode(&make_motorsport_packet(4))
            .ok_or("no frame")?;

        let json = serde_json::to_value(&frame)?;
        let obj = json.as_object().ok_or("not an object")?;
        // Consumers read top-level keys, not a nested field map.
        assert!(obj.contains_key("t"));
        assert!(obj.contains_key("packet_type"));
        assert!(obj.contains_key("Speed"));
        assert!(!obj.contains_key("fields"));
        Ok(())
    }

    #[test]
    fn registry_lists_all_decoders() {
        let ids: Vec<&str> = DecoderRegistry::available_decoders()
            .iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(
            ids,
            [
                "forza-motorsport",
                "forza-horizon",
                "assetto-corsa",
                "f1-2024",
                "f1-2025"
            ]
        );
    }
}
