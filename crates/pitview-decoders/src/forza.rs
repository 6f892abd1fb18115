//! Forza Motorsport and Forza Horizon "data out" decoders.
//!
//! Both games share the same 232-byte sled block (race state, engine, motion,
//! per-corner wheel data, car identity) followed by a dash block (position,
//! speed, lap timing, driver inputs). Motorsport appends a tire-wear/track
//! extension for a 331-byte packet (311 without the extension); Horizon
//! inserts a 12-byte game-specific block between sled and dash and ends with
//! one trailing byte for a 324-byte packet.
//!
//! Wire reference: the "data out" UDP format documented in each game's
//! telemetry settings; all fields little-endian.

use crate::wire::ByteReader;
use crate::{PacketTypeInfo, TelemetryDecoder};
use pitview_frame::{Frame, wall_clock_ms};
use tracing::warn;

/// Corner suffixes in wire order for every four-wheel block.
const CORNERS: [&str; 4] = ["FrontLeft", "FrontRight", "RearLeft", "RearRight"];

/// Substitute frame interval when the game clock has not advanced (~60 fps).
const NOMINAL_FRAME_DT: f32 = 0.016;

const SLED_LEN: usize = 232;
const MOTORSPORT_BASE_LEN: usize = 311;
const MOTORSPORT_EXTENDED_LEN: usize = 331;
const HORIZON_GAP_LEN: usize = 12;
const HORIZON_PACKET_LEN: usize = 324;

/// Forza frames carry a single logical record type.
const FORZA_PACKET_TYPE: i32 = 1;

const MOTORSPORT_PACKET_TYPES: [PacketTypeInfo; 1] = [PacketTypeInfo {
    id: FORZA_PACKET_TYPE,
    name: "Forza Motorsport",
}];
const HORIZON_PACKET_TYPES: [PacketTypeInfo; 1] = [PacketTypeInfo {
    id: FORZA_PACKET_TYPE,
    name: "Forza Horizon",
}];

const MOTORSPORT_ACCEPTED_SIZES: [usize; 2] = [MOTORSPORT_BASE_LEN, MOTORSPORT_EXTENDED_LEN];
const HORIZON_ACCEPTED_SIZES: [usize; 1] = [HORIZON_PACKET_LEN];

/// Raw inputs the derivative calculator needs from one decoded packet.
#[derive(Debug, Clone, Copy)]
struct DerivativeInputs {
    race_time: f32,
    suspension_travel: [f32; 4],
    gear: u8,
}

/// Values pulled out of the sled block beyond what lands in the frame.
struct SledValues {
    is_race_on: i32,
    timestamp_ms: u32,
    suspension_travel: [f32; 4],
}

/// Values pulled out of the dash block beyond what lands in the frame.
struct DashValues {
    current_lap: f32,
    current_race_time: f32,
    lap_number: u16,
    gear: u8,
}

fn read_corner_f32s(r: &mut ByteReader<'_>, frame: &mut Frame, prefix: &str) -> Option<[f32; 4]> {
    let mut values = [0.0_f32; 4];
    for (suffix, slot) in CORNERS.iter().zip(values.iter_mut()) {
        let v = r.f32()?;
        frame.set(&format!("{prefix}{suffix}"), v);
        *slot = v;
    }
    Some(values)
}

fn read_corner_i32s(r: &mut ByteReader<'_>, frame: &mut Frame, prefix: &str) -> Option<()> {
    for suffix in CORNERS {
        let v = r.i32()?;
        frame.set(&format!("{prefix}{suffix}"), v);
    }
    Some(())
}

/// Parses the 232-byte sled block common to both games.
fn parse_sled(r: &mut ByteReader<'_>, frame: &mut Frame) -> Option<SledValues> {
    let is_race_on = r.i32()?;
    frame.set("IsRaceOn", is_race_on);
    let timestamp_ms = r.u32()?;
    frame.set("TimestampMS", timestamp_ms);

    for name in ["EngineMaxRpm", "EngineIdleRpm", "CurrentEngineRpm"] {
        frame.set(name, r.f32()?);
    }
    for name in [
        "AccelerationX",
        "AccelerationY",
        "AccelerationZ",
        "VelocityX",
        "VelocityY",
        "VelocityZ",
        "AngularVelocityX",
        "AngularVelocityY",
        "AngularVelocityZ",
        "Yaw",
        "Pitch",
        "Roll",
    ] {
        frame.set(name, r.f32()?);
    }

    let suspension_travel = read_corner_f32s(r, frame, "NormalizedSuspensionTravel")?;
    read_corner_f32s(r, frame, "TireSlipRatio")?;
    read_corner_f32s(r, frame, "WheelRotationSpeed")?;
    read_corner_i32s(r, frame, "WheelOnRumbleStrip")?;
    read_corner_f32s(r, frame, "WheelInPuddleDepth")?;
    read_corner_f32s(r, frame, "SurfaceRumble")?;
    read_corner_f32s(r, frame, "TireSlipAngle")?;
    read_corner_f32s(r, frame, "TireCombinedSlip")?;
    read_corner_f32s(r, frame, "SuspensionTravelMeters")?;

    for name in [
        "CarOrdinal",
        "CarClass",
        "CarPerformanceIndex",
        "DrivetrainType",
        "NumCylinders",
    ] {
        frame.set(name, r.i32()?);
    }

    Some(SledValues {
        is_race_on,
        timestamp_ms,
        suspension_travel,
    })
}

/// Parses the dash block common to both games (79 bytes).
fn parse_dash(r: &mut ByteReader<'_>, frame: &mut Frame) -> Option<DashValues> {
    for name in ["PositionX", "PositionY", "PositionZ", "Speed", "Power", "Torque"] {
        frame.set(name, r.f32()?);
    }
    read_corner_f32s(r, frame, "TireTemp")?;
    for name in ["Boost", "Fuel", "DistanceTraveled", "BestLap", "LastLap"] {
        frame.set(name, r.f32()?);
    }
    let current_lap = r.f32()?;
    frame.set("CurrentLap", current_lap);
    let current_race_time = r.f32()?;
    frame.set("CurrentRaceTime", current_race_time);
    let lap_number = r.u16()?;
    frame.set("LapNumber", lap_number);
    frame.set("RacePosition", r.u8()?);

    for name in ["Accel", "Brake", "Clutch", "HandBrake"] {
        frame.set(name, r.u8()?);
    }
    let gear = r.u8()?;
    frame.set("Gear", gear);
    frame.set("Steer", r.i8()?);
    frame.set("NormalizedDrivingLine", r.i8()?);
    frame.set("NormalizedAIBrakeDifference", r.i8()?);

    Some(DashValues {
        current_lap,
        current_race_time,
        lap_number,
        gear,
    })
}

/// Frames where the race is off, or where lap number and current-lap time are
/// both zero (race ramp-up), are noise rather than data.
fn race_is_gated(sled: &SledValues, dash: &DashValues) -> bool {
    sled.is_race_on != 1 || (dash.lap_number == 0 && dash.current_lap.abs() < f32::EPSILON)
}

/// Computes the suspension-velocity and shifting derivatives against the
/// previous frame; on the very first frame every derivative is exactly 0.
fn apply_derived(frame: &mut Frame, previous: Option<&DerivativeInputs>, current: &DerivativeInputs) {
    match previous {
        Some(prev) => {
            let mut dt = current.race_time - prev.race_time;
            if dt.abs() < f32::EPSILON || dt.is_nan() {
                dt = NOMINAL_FRAME_DT;
            }
            for ((suffix, cur), prior) in CORNERS
                .iter()
                .zip(current.suspension_travel)
                .zip(prev.suspension_travel)
            {
                frame.set(
                    &format!("NormalizedSuspensionVelocity{suffix}"),
                    (cur - prior) / dt,
                );
            }
            frame.set("Shifting", i32::from(current.gear != prev.gear));
        }
        None => {
            for suffix in CORNERS {
                frame.set(&format!("NormalizedSuspensionVelocity{suffix}"), 0.0_f32);
            }
            frame.set("Shifting", 0_i32);
        }
    }
}

/// Decoder for the Forza Motorsport 311/331-byte packet.
#[derive(Debug, Default)]
pub struct ForzaMotorsportDecoder {
    previous: Option<DerivativeInputs>,
}

impl ForzaMotorsportDecoder {
    /// Creates a decoder with an empty previous-frame slot.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TelemetryDecoder for ForzaMotorsportDecoder {
    fn decode(&mut self, data: &[u8]) -> Option<Frame> {
        if data.len() != MOTORSPORT_BASE_LEN && data.len() != MOTORSPORT_EXTENDED_LEN {
            warn!(
                size = data.len(),
                expected = MOTORSPORT_EXTENDED_LEN,
                "forza motorsport: invalid packet size"
            );
            return None;
        }

        let mut frame = Frame::new(FORZA_PACKET_TYPE, wall_clock_ms());
        let mut r = ByteReader::new(data);
        let sled = parse_sled(&mut r, &mut frame)?;
        let dash = parse_dash(&mut r, &mut frame)?;

        // Additive extension tail: newer game versions append tire wear and
        // the track ordinal; absent fields default to a neutral 0.
        let mut track_ordinal = 0_i32;
        if data.len() >= MOTORSPORT_EXTENDED_LEN {
            read_corner_f32s(&mut r, &mut frame, "TireWear")?;
            track_ordinal = r.i32()?;
        } else {
            for suffix in CORNERS {
                frame.set(&format!("TireWear{suffix}"), 0.0_f32);
            }
        }
        frame.set("TrackOrdinal", track_ordinal);

        if race_is_gated(&sled, &dash) {
            return None;
        }

        let current = DerivativeInputs {
            race_time: dash.current_race_time,
            suspension_travel: sled.suspension_travel,
            gear: dash.gear,
        };
        apply_derived(&mut frame, self.previous.as_ref(), &current);

        // Group samples into a race by coarse timestamp bucket and track.
        let race_id = i64::from(sled.timestamp_ms / 1_000_000) * 1000 + i64::from(track_ordinal);
        frame.set("RaceID", race_id);

        self.previous = Some(current);
        Some(frame)
    }

    fn accepted_packet_sizes(&self) -> &'static [usize] {
        &MOTORSPORT_ACCEPTED_SIZES
    }

    fn packet_type_name(&self, packet_type: i32) -> String {
        if packet_type == FORZA_PACKET_TYPE {
            "Forza Motorsport".to_owned()
        } else {
            format!("Unknown_{packet_type}")
        }
    }

    fn supported_packet_types(&self) -> &'static [PacketTypeInfo] {
        &MOTORSPORT_PACKET_TYPES
    }
}

/// Decoder for the Forza Horizon 324-byte packet.
#[derive(Debug, Default)]
pub struct ForzaHorizonDecoder {
    previous: Option<DerivativeInputs>,
}

impl ForzaHorizonDecoder {
    /// Creates a decoder with an empty previous-frame slot.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TelemetryDecoder for ForzaHorizonDecoder {
    fn decode(&mut self, data: &[u8]) -> Option<Frame> {
        if data.len() != HORIZON_PACKET_LEN {
            warn!(
                size = data.len(),
                expected = HORIZON_PACKET_LEN,
                "forza horizon: invalid packet size"
            );
            return None;
        }

        let mut frame = Frame::new(FORZA_PACKET_TYPE, wall_clock_ms());
        let mut r = ByteReader::new(data);
        let sled = parse_sled(&mut r, &mut frame)?;
        // Horizon-only block (car category and unused words); not surfaced.
        r.skip(HORIZON_GAP_LEN)?;
        let dash = parse_dash(&mut r, &mut frame)?;

        if race_is_gated(&sled, &dash) {
            return None;
        }

        let current = DerivativeInputs {
            race_time: dash.current_race_time,
            suspension_travel: sled.suspension_travel,
            gear: dash.gear,
        };
        apply_derived(&mut frame, self.previous.as_ref(), &current);

        self.previous = Some(current);
        Some(frame)
    }

    fn accepted_packet_sizes(&self) -> &'static [usize] {
        &HORIZON_ACCEPTED_SIZES
    }

    fn packet_type_name(&self, packet_type: i32) -> String {
        if packet_type == FORZA_PACKET_TYPE {
            "Forza Horizon".to_owned()
        } else {
            format!("Unknown_{packet_type}")
        }
    }

    fn supported_packet_types(&self) -> &'static [PacketTypeInfo] {
        &HORIZON_PACKET_TYPES
    }
}


#[cfg(test)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn motorsport_decode_never_panics(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            let mut decoder = ForzaMotorsportDecoder::new();
            let _ = decoder.decode(&data);
        }

        #[test]
        fn horizon_decode_never_panics(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            let mut decoder = ForzaHorizonDecoder::new();
            let _ = decoder.decode(&data);
        }

        #[test]
        fn truncation_always_fails_softly(cut in 1_usize..331) {
            let mut decoder = ForzaMotorsportDecoder::new();
            let mut buf = vec![0_u8; MOTORSPORT_EXTENDED_LEN];
            buf[0] = 1; // IsRaceOn
            buf.truncate(MOTORSPORT_EXTENDED_LEN - cut);
            if buf.len() != MOTORSPORT_BASE_LEN {
                prop_assert!(decoder.decode(&buf).is_none());
            }
        }
    }
}
