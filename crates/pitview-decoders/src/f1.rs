//! Shared plumbing for the EA Sports F1 UDP telemetry format.
//!
//! Every packet opens with a 29-byte header carrying the packet id and the
//! player's car index; the body is an array of fixed-stride per-car records
//! from which only the player's record is surfaced. The 2024 and 2025
//! seasons share the motion, lap-data, car-telemetry, car-status, car-setups,
//! event, and time-trial record layouts; season-specific bodies live in the
//! respective decoder modules.

use crate::PacketTypeInfo;
use crate::wire::ByteReader;
use pitview_frame::{Frame, wall_clock_ms};

/// Wheel suffixes in wire order for every four-wheel block.
pub(crate) const WHEELS: [&str; 4] = ["RL", "RR", "FL", "FR"];

pub(crate) const HEADER_LEN: usize = 29;

// Packet ids shared by recent seasons.
pub(crate) const MOTION: i32 = 0;
pub(crate) const SESSION: i32 = 1;
pub(crate) const LAP_DATA: i32 = 2;
pub(crate) const EVENT: i32 = 3;
pub(crate) const PARTICIPANTS: i32 = 4;
pub(crate) const CAR_SETUPS: i32 = 5;
pub(crate) const CAR_TELEMETRY: i32 = 6;
pub(crate) const CAR_STATUS: i32 = 7;
pub(crate) const FINAL_CLASSIFICATION: i32 = 8;
pub(crate) const LOBBY_INFO: i32 = 9;
pub(crate) const CAR_DAMAGE: i32 = 10;
pub(crate) const SESSION_HISTORY: i32 = 11;
pub(crate) const TYRE_SETS: i32 = 12;
pub(crate) const MOTION_EX: i32 = 13;
pub(crate) const TIME_TRIAL: i32 = 14;
pub(crate) const LAP_POSITIONS: i32 = 15;

/// The 29-byte packet header every F1 datagram starts with.
#[derive(Debug, Clone)]
pub(crate) struct PacketHeader {
    pub packet_format: u16,
    pub game_year: u8,
    pub game_major_version: u8,
    pub game_minor_version: u8,
    pub packet_version: u8,
    pub packet_id: u8,
    pub session_uid: u64,
    pub session_time: f32,
    pub frame_identifier: u32,
    pub overall_frame_identifier: u32,
    pub player_car_index: u8,
    pub secondary_player_car_index: u8,
}

impl PacketHeader {
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut r = ByteReader::new(data);
        Some(Self {
            packet_format: r.u16()?,
            game_year: r.u8()?,
            game_major_version: r.u8()?,
            game_minor_version: r.u8()?,
            packet_version: r.u8()?,
            packet_id: r.u8()?,
            session_uid: r.u64()?,
            session_time: r.f32()?,
            frame_identifier: r.u32()?,
            overall_frame_identifier: r.u32()?,
            player_car_index: r.u8()?,
            secondary_player_car_index: r.u8()?,
        })
    }

    pub fn player_index(&self) -> usize {
        usize::from(self.player_car_index)
    }

    /// Starts a frame carrying every header field.
    ///
    /// The session UID is surfaced as a decimal string; 64-bit identifiers
    /// do not survive a round trip through JSON numbers.
    pub fn new_frame(&self) -> Frame {
        let mut frame = Frame::new(i32::from(self.packet_id), wall_clock_ms());
        frame.set("packetFormat", self.packet_format);
        frame.set("gameYear", self.game_year);
        frame.set("gameMajorVersion", self.game_major_version);
        frame.set("gameMinorVersion", self.game_minor_version);
        frame.set("packetVersion", self.packet_version);
        frame.set("packetId", self.packet_id);
        frame.set("sessionUID", self.session_uid.to_string());
        frame.set("sessionTime", self.session_time);
        frame.set("frameIdentifier", self.frame_identifier);
        frame.set("overallFrameIdentifier", self.overall_frame_identifier);
        frame.set("playerCarIndex", self.player_car_index);
        frame.set("secondaryPlayerCarIndex", self.secondary_player_car_index);
        frame
    }
}

/// Positions a reader at one record of a fixed-stride per-car array,
/// rejecting bodies too short to hold that record.
pub(crate) fn record_reader<'a>(
    body: &'a [u8],
    base: usize,
    index: usize,
    stride: usize,
) -> Option<ByteReader<'a>> {
    let start = base.checked_add(index.checked_mul(stride)?)?;
    if start.checked_add(stride)? > body.len() {
        return None;
    }
    Some(ByteReader::at(body, start))
}

pub(crate) fn set_wheel_f32s(
    r: &mut ByteReader<'_>,
    frame: &mut Frame,
    prefix: &str,
) -> Option<()> {
    for suffix in WHEELS {
        frame.set(&format!("{prefix}{suffix}"), r.f32()?);
    }
    Some(())
}

pub(crate) fn set_wheel_u16s(
    r: &mut ByteReader<'_>,
    frame: &mut Frame,
    prefix: &str,
) -> Option<()> {
    for suffix in WHEELS {
        frame.set(&format!("{prefix}{suffix}"), r.u16()?);
    }
    Some(())
}

pub(crate) fn set_wheel_u8s(r: &mut ByteReader<'_>, frame: &mut Frame, prefix: &str) -> Option<()> {
    for suffix in WHEELS {
        frame.set(&format!("{prefix}{suffix}"), r.u8()?);
    }
    Some(())
}

pub(crate) fn lookup_packet_type_name(types: &[PacketTypeInfo], packet_type: i32) -> String {
    types.iter().find(|p| p.id == packet_type).map_or_else(
        || format!("Unknown_{packet_type}"),
        |p| p.name.to_string(),
    )
}

/// Player car motion record, 60 bytes per car.
pub(crate) fn parse_motion(body: &[u8], player: usize, frame: &mut Frame) -> Option<()> {
    let mut r = record_reader(body, 0, player, 60)?;
    for name in [
        "worldPositionX",
        "worldPositionY",
        "worldPositionZ",
        "worldVelocityX",
        "worldVelocityY",
        "worldVelocityZ",
    ] {
        frame.set(name, r.f32()?);
    }
    for name in [
        "worldForwardDirX",
        "worldForwardDirY",
        "worldForwardDirZ",
        "worldRightDirX",
        "worldRightDirY",
        "worldRightDirZ",
    ] {
        frame.set(name, r.norm_i16()?);
    }
    for name in [
        "gForceLateral",
        "gForceLongitudinal",
        "gForceVertical",
        "yaw",
        "pitch",
        "roll",
    ] {
        frame.set(name, r.f32()?);
    }
    Some(())
}

/// Player car telemetry record, 60 bytes per car.
pub(crate) fn parse_car_telemetry(body: &[u8], player: usize, frame: &mut Frame) -> Option<()> {
    let mut r = record_reader(body, 0, player, 60)?;
    frame.set("speed", r.u16()?);
    frame.set("throttle", r.f32()?);
    frame.set("steer", r.f32()?);
    frame.set("brake", r.f32()?);
    frame.set("clutch", r.u8()?);
    frame.set("gear", r.i8()?);
    frame.set("engineRPM", r.u16()?);
    frame.set("drs", r.u8()?);
    frame.set("revLightsPercent", r.u8()?);
    frame.set("revLightsBitValue", r.u16()?);
    set_wheel_u16s(&mut r, frame, "brakesTemperature")?;
    set_wheel_u8s(&mut r, frame, "tyresSurfaceTemperature")?;
    set_wheel_u8s(&mut r, frame, "tyresInnerTemperature")?;
    frame.set("engineTemperature", r.u16()?);
    set_wheel_f32s(&mut r, frame, "tyresPressure")?;
    set_wheel_u8s(&mut r, frame, "surfaceType")?;
    Some(())
}

/// Player lap-data record, 53 bytes per car.
///
/// The 2024 layout pads each delta with a minutes byte that the 2025
/// layout drops.
pub(crate) fn parse_lap_data(
    body: &[u8],
    player: usize,
    frame: &mut Frame,
    delta_pad: usize,
) -> Option<()> {
    let mut r = record_reader(body, 0, player, 53)?;
    frame.set("lastLapTimeInMS", r.u32()?);
    frame.set("currentLapTimeInMS", r.u32()?);
    frame.set("sector1TimeInMS", r.u16()?);
    frame.set("sector1TimeMinutes", r.u8()?);
    frame.set("sector2TimeInMS", r.u16()?);
    frame.set("sector2TimeMinutes", r.u8()?);
    frame.set("deltaToCarInFrontInMS", r.u16()?);
    r.skip(delta_pad)?;
    frame.set("deltaToRaceLeaderInMS", r.u16()?);
    r.skip(delta_pad)?;
    frame.set("lapDistance", r.f32()?);
    frame.set("totalDistance", r.f32()?);
    frame.set("safetyCarDelta", r.f32()?);
    for name in [
        "carPosition",
        "currentLapNum",
        "pitStatus",
        "numPitStops",
        "sector",
        "currentLapInvalid",
        "penalties",
        "totalWarnings",
        "cornerCuttingWarnings",
        "numUnservedDriveThroughPens",
        "numUnservedStopGoPens",
        "gridPosition",
        "driverStatus",
        "resultStatus",
        "pitLaneTimerActive",
    ] {
        frame.set(name, r.u8()?);
    }
    frame.set("pitLaneTimeInLaneInMS", r.u16()?);
    frame.set("pitStopTimerInMS", r.u16()?);
    frame.set("pitStopShouldServePen", r.u8()?);
    frame.set("speedTrapFastestSpeed", r.f32()?);
    frame.set("speedTrapFastestLap", r.u8()?);
    Some(())
}

/// Player car-status record, 47 bytes per car.
pub(crate) fn parse_car_status(body: &[u8], player: usize, frame: &mut Frame) -> Option<()> {
    let mut r = record_reader(body, 0, player, 47)?;
    for name in [
        "tractionControl",
        "antiLockBrakes",
        "fuelMix",
        "frontBrakeBias",
        "pitLimiterStatus",
    ] {
        frame.set(name, r.u8()?);
    }
    frame.set("fuelInTank", r.f32()?);
    frame.set("fuelCapacity", r.f32()?);
    frame.set("fuelRemainingLaps", r.f32()?);
    frame.set("maxRPM", r.u16()?);
    frame.set("idleRPM", r.u16()?);
    frame.set("maxGears", r.u8()?);
    frame.set("drsAllowed", r.u8()?);
    frame.set("drsActivationDistance", r.u16()?);
    frame.set("actualTyreCompound", r.u8()?);
    frame.set("visualTyreCompound", r.u8()?);
    frame.set("tyresAgeLaps", r.u8()?);
    frame.set("vehicleFiaFlags", r.i8()?);
    frame.set("enginePowerICE", r.f32()?);
    frame.set("enginePowerMGUK", r.f32()?);
    frame.set("ersStoreEnergy", r.f32()?);
    frame.set("ersDeployMode", r.u8()?);
    frame.set("ersHarvestedThisLapMGUK", r.f32()?);
    frame.set("ersHarvestedThisLapMGUH", r.f32()?);
    frame.set("ersDeployedThisLap", r.f32()?);
    frame.set("networkPaused", r.u8()?);
    Some(())
}

/// Player car-setup record, 49 bytes per car.
///
/// The seasons renamed the brake balance field; the caller supplies
/// the season's key.
pub(crate) fn parse_car_setups(
    body: &[u8],
    player: usize,
    frame: &mut Frame,
    brake_balance_key: &str,
) -> Option<()> {
    let mut r = record_reader(body, 0, player, 49)?;
    for name in ["frontWing", "rearWing", "onThrottle", "offThrottle"] {
        frame.set(name, r.u8()?);
    }
    for name in ["frontCamber", "rearCamber", "frontToe", "rearToe"] {
        frame.set(name, r.f32()?);
    }
    for name in [
        "frontSuspension",
        "rearSuspension",
        "frontAntiRollBar",
        "rearAntiRollBar",
        "frontSuspensionHeight",
        "rearSuspensionHeight",
        "brakePressure",
    ] {
        frame.set(name, r.u8()?);
    }
    frame.set(brake_balance_key, r.u8()?);
    for name in [
        "rearLeftTyrePressure",
        "rearRightTyrePressure",
        "frontLeftTyrePressure",
        "frontRightTyrePressure",
    ] {
        frame.set(name, r.f32()?);
    }
    frame.set("ballast", r.u8()?);
    frame.set("fuelLoad", r.f32()?);
    Some(())
}

/// Event body: a four-character ASCII code; details vary by event and
/// are not surfaced.
pub(crate) fn parse_event(body: &[u8], frame: &mut Frame) -> Option<()> {
    if body.len() < 7 {
        return None;
    }
    let code = body.get(..4)?;
    frame.set("eventStringCode", String::from_utf8_lossy(code).into_owned());
    Some(())
}

/// Time-trial data set, 24 bytes; only the first (player best) set is
/// surfaced.
pub(crate) fn parse_time_trial(body: &[u8], frame: &mut Frame) -> Option<()> {
    let mut r = record_reader(body, 0, 0, 24)?;
    frame.set("carIdx", r.u8()?);
    frame.set("teamId", r.u8()?);
    frame.set("lapTimeInMS", r.u32()?);
    frame.set("sector1TimeInMS", r.u32()?);
    frame.set("sector2TimeInMS", r.u32()?);
    frame.set("sector3TimeInMS", r.u32()?);
    for name in [
        "tractionControl",
        "gearboxAssist",
        "antiLockBrakes",
        "equalCarPerformance",
        "customSetup",
        "valid",
    ] {
        frame.set(name, r.u8()?);
    }
    Some(())
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn make_header_bytes() -> [u8; HEADER_LEN] {
        let mut data = [0_u8; HEADER_LEN];
        data[0..2].copy_from_slice(&2024_u16.to_le_bytes());
        data[2] = 24;
        data[5] = 1;
        data[6] = 6;
        data[7..15].copy_from_slice(&0x1234_5678_9abc_def0_u64.to_le_bytes());
        data[15..19].copy_from_slice(&12.5_f32.to_le_bytes());
        data[19..23].copy_from_slice(&777_u32.to_le_bytes());
        data[23..27].copy_from_slice(&888_u32.to_le_bytes());
        data[27] = 3;
        data[28] = 255;
        data
    }

    #[test]
    fn header_fields_land_in_frame() -> TestResult {
        let header = PacketHeader::parse(&make_header_bytes()).ok_or("no header")?;
        assert_eq!(header.packet_id, 6);
        assert_eq!(header.player_index(), 3);

        let frame = header.new_frame();
        assert_eq!(frame.packet_type, 6);
        assert_eq!(frame.get_i64("packetFormat"), Some(2024));
        assert_eq!(frame.get_i64("frameIdentifier"), Some(777));
        assert_eq!(frame.get_i64("playerCarIndex"), Some(3));
        // 64-bit session id survives as a decimal string.
        assert_eq!(frame.get_str("sessionUID"), Some("1311768467463790320"));
        Ok(())
    }

    #[test]
    fn header_requires_all_29_bytes() {
        let data = make_header_bytes();
        assert!(PacketHeader::parse(&data[..HEADER_LEN - 1]).is_none());
    }

    #[test]
    fn record_reader_rejects_short_arrays() {
        let body = [0_u8; 120];
        assert!(record_reader(&body, 0, 1, 60).is_some());
        assert!(record_reader(&body, 0, 2, 60).is_none());
        assert!(record_reader(&body, 1, 1, 60).is_none());
        assert!(record_reader(&body, 0, usize::MAX, 60).is_none());
    }

    #[test]
    fn event_code_needs_seven_byte_body() -> TestResult {
        let mut frame = Frame::new(EVENT, 0.0);
        assert!(parse_event(b"SSTA\0\0", &mut frame).is_none());
        parse_event(b"SSTA\0\0\0", &mut frame).ok_or("no event")?;
        assert_eq!(frame.get_str("eventStringCode"), Some("SSTA"));
        Ok(())
    }
}
