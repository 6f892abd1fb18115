//! F1 25 packet decoder.
//!
//! The season reworked several record layouts: shorter participant and
//! lobby names, livery colours, tyre blisters in the damage record, a
//! column-major session history, and the new lap-positions packet.
//! Layouts shared with F1 24 live in [`crate::f1`].

use crate::f1::{self, PacketHeader, record_reader, set_wheel_f32s, set_wheel_u8s};
use crate::wire::ByteReader;
use crate::{PacketTypeInfo, TelemetryDecoder};
use pitview_frame::Frame;

const PACKET_TYPES: [PacketTypeInfo; 16] = [
    PacketTypeInfo { id: f1::MOTION, name: "Motion" },
    PacketTypeInfo { id: f1::SESSION, name: "Session" },
    PacketTypeInfo { id: f1::LAP_DATA, name: "Lap Data" },
    PacketTypeInfo { id: f1::EVENT, name: "Event" },
    PacketTypeInfo { id: f1::PARTICIPANTS, name: "Participants" },
    PacketTypeInfo { id: f1::CAR_SETUPS, name: "Car Setups" },
    PacketTypeInfo { id: f1::CAR_TELEMETRY, name: "Car Telemetry" },
    PacketTypeInfo { id: f1::CAR_STATUS, name: "Car Status" },
    PacketTypeInfo { id: f1::FINAL_CLASSIFICATION, name: "Final Classification" },
    PacketTypeInfo { id: f1::LOBBY_INFO, name: "Lobby Info" },
    PacketTypeInfo { id: f1::CAR_DAMAGE, name: "Car Damage" },
    PacketTypeInfo { id: f1::SESSION_HISTORY, name: "Session History" },
    PacketTypeInfo { id: f1::TYRE_SETS, name: "Tyre Sets" },
    PacketTypeInfo { id: f1::MOTION_EX, name: "Motion Ex" },
    PacketTypeInfo { id: f1::TIME_TRIAL, name: "Time Trial" },
    PacketTypeInfo { id: f1::LAP_POSITIONS, name: "Lap Positions" },
];

/// Fixed datagram sizes published by the game, one per packet id.
const ACCEPTED_SIZES: [usize; 16] = [
    1349, // Motion
    753,  // Session
    1285, // Lap Data
    45,   // Event
    1274, // Participants
    1133, // Car Setups
    1352, // Car Telemetry
    1239, // Car Status
    1020, // Final Classification
    1306, // Lobby Info
    953,  // Car Damage
    1460, // Session History
    231,  // Tyre Sets
    237,  // Motion Ex
    101,  // Time Trial
    573,  // Lap Positions
];

/// Session body; the scalar run matches F1 24 up to the red-flag count
/// and the zone/forecast arrays moved out of the surfaced range.
fn parse_session(body: &[u8], frame: &mut Frame) -> Option<()> {
    if body.len() < 644 {
        return None;
    }
    let mut r = ByteReader::new(body);
    frame.set("weather", r.u8()?);
    frame.set("trackTemperature", r.i8()?);
    frame.set("airTemperature", r.i8()?);
    frame.set("totalLaps", r.u8()?);
    frame.set("trackLength", r.u16()?);
    frame.set("sessionType", r.u8()?);
    frame.set("trackId", r.i8()?);
    frame.set("formula", r.u8()?);
    frame.set("sessionTimeLeft", r.u16()?);
    frame.set("sessionDuration", r.u16()?);
    for name in [
        "pitSpeedLimit",
        "gamePaused",
        "isSpectating",
        "spectatorCarIndex",
        "sliProNativeSupport",
        "numMarshalZones",
        "safetyCarStatus",
        "networkGame",
        "numWeatherForecastSamples",
        "forecastAccuracy",
        "aiDifficulty",
    ] {
        frame.set(name, r.u8()?);
    }
    frame.set("seasonLinkIdentifier", r.u32()?);
    frame.set("weekendLinkIdentifier", r.u32()?);
    frame.set("sessionLinkIdentifier", r.u32()?);
    for name in [
        "pitStopWindowIdealLap",
        "pitStopWindowLatestLap",
        "pitStopRejoinPosition",
        "steeringAssist",
        "brakingAssist",
        "gearboxAssist",
        "pitAssist",
        "pitReleaseAssist",
        "ERSAssist",
        "DRSAssist",
        "dynamicRacingLine",
        "dynamicRacingLineType",
        "gameMode",
        "ruleSet",
    ] {
        frame.set(name, r.u8()?);
    }
    frame.set("timeOfDay", r.u32()?);
    for name in [
        "sessionLength",
        "speedUnitsLeadPlayer",
        "temperatureUnitsLeadPlayer",
        "speedUnitsSecondaryPlayer",
        "temperatureUnitsSecondaryPlayer",
        "numSafetyCarPeriods",
        "numVirtualSafetyCarPeriods",
        "numRedFlagPeriods",
    ] {
        frame.set(name, r.u8()?);
    }
    Some(())
}

/// Player participant record, 58 bytes per car after the count byte;
/// the four livery colours flatten to indexed RGB keys.
fn parse_participants(body: &[u8], player: usize, frame: &mut Frame) -> Option<()> {
    frame.set("numActiveCars", *body.first()?);
    let mut r = record_reader(body, 1, player, 58)?;
    for name in [
        "aiControlled",
        "driverId",
        "networkId",
        "teamId",
        "myTeam",
        "raceNumber",
        "nationality",
    ] {
        frame.set(name, r.u8()?);
    }
    frame.set("name", r.byte_string(32)?);
    frame.set("yourTelemetry", r.u8()?);
    frame.set("showOnlineNames", r.u8()?);
    frame.set("platform", r.u8()?);
    frame.set("numColours", r.u8()?);
    for i in 0..4 {
        for channel in ["R", "G", "B"] {
            frame.set(&format!("liveryColour{i}{channel}"), r.u8()?);
        }
    }
    Some(())
}

/// Player classification record, 46 bytes per car after the count byte.
fn parse_final_classification(body: &[u8], player: usize, frame: &mut Frame) -> Option<()> {
    frame.set("numCars", *body.first()?);
    let mut r = record_reader(body, 1, player, 46)?;
    for name in [
        "position",
        "numLaps",
        "gridPosition",
        "points",
        "numPitStops",
        "resultStatus",
    ] {
        frame.set(name, r.u8()?);
    }
    frame.set("bestLapTimeInMS", r.u32()?);
    frame.set("totalRaceTime", r.f64()?);
    frame.set("penaltiesTime", r.u8()?);
    frame.set("numPenalties", r.u8()?);
    frame.set("numTyreStints", r.u8()?);
    for prefix in ["tyreStintsActual", "tyreStintsVisual", "tyreStintsEndLaps"] {
        for i in 0..8 {
            frame.set(&format!("{prefix}{i}"), r.u8()?);
        }
    }
    frame.set("resultReason", r.u8()?);
    Some(())
}

/// Player lobby record, 42 bytes per player after the count byte.
fn parse_lobby_info(body: &[u8], player: usize, frame: &mut Frame) -> Option<()> {
    frame.set("numPlayers", *body.first()?);
    let mut r = record_reader(body, 1, player, 42)?;
    for name in ["aiControlled", "teamId", "nationality", "platform"] {
        frame.set(name, r.u8()?);
    }
    frame.set("name", r.byte_string(32)?);
    frame.set("carNumber", r.u8()?);
    frame.set("readyStatus", r.u8()?);
    Some(())
}

/// Player car-damage record, 46 bytes per car; adds tyre blisters after
/// the F1 24 fields.
fn parse_car_damage(body: &[u8], player: usize, frame: &mut Frame) -> Option<()> {
    let mut r = record_reader(body, 0, player, 46)?;
    set_wheel_f32s(&mut r, frame, "tyresWear")?;
    set_wheel_u8s(&mut r, frame, "tyresDamage")?;
    set_wheel_u8s(&mut r, frame, "brakesDamage")?;
    for name in [
        "frontLeftWingDamage",
        "frontRightWingDamage",
        "rearWingDamage",
        "floorDamage",
        "diffuserDamage",
        "sidepodDamage",
        "drsFault",
        "ersFault",
        "gearBoxDamage",
        "engineDamage",
        "engineMGUHWear",
        "engineESWear",
        "engineCEWear",
        "engineICEWear",
        "engineMGUKWear",
        "engineTCWear",
        "engineBlown",
        "engineSeized",
    ] {
        frame.set(name, r.u8()?);
    }
    set_wheel_u8s(&mut r, frame, "tyreBlisters")?;
    Some(())
}

/// Session history header scalars; the season stores history as
/// column-major arrays which are not surfaced.
fn parse_session_history(body: &[u8], frame: &mut Frame) -> Option<()> {
    if body.len() < 8 {
        return None;
    }
    let mut r = ByteReader::new(body);
    for name in [
        "carIdx",
        "numLaps",
        "numTyreStints",
        "bestLapTimeLapNum",
        "bestSector1LapNum",
        "bestSector2LapNum",
        "bestSector3LapNum",
    ] {
        frame.set(name, r.u8()?);
    }
    Some(())
}

fn parse_tyre_sets(body: &[u8], frame: &mut Frame) -> Option<()> {
    frame.set("carIdx", *body.first()?);
    Some(())
}

/// Extended motion record, 156 bytes per car; the chassis pitch and
/// camber fields are new this season.
fn parse_motion_ex(body: &[u8], player: usize, frame: &mut Frame) -> Option<()> {
    let mut r = record_reader(body, 0, player, 156)?;
    set_wheel_f32s(&mut r, frame, "suspensionPosition")?;
    set_wheel_f32s(&mut r, frame, "suspensionVelocity")?;
    set_wheel_f32s(&mut r, frame, "suspensionAcceleration")?;
    set_wheel_f32s(&mut r, frame, "wheelSpeed")?;
    set_wheel_f32s(&mut r, frame, "wheelSlipRatio")?;
    set_wheel_f32s(&mut r, frame, "wheelSlipAngle")?;
    for name in [
        "localVelocityX",
        "localVelocityY",
        "localVelocityZ",
        "angularVelocityX",
        "angularVelocityY",
        "angularVelocityZ",
        "angularAccelerationX",
        "angularAccelerationY",
        "angularAccelerationZ",
        "frontWheelsAngle",
    ] {
        frame.set(name, r.f32()?);
    }
    set_wheel_f32s(&mut r, frame, "wheelVertForce")?;
    frame.set("chassisPitch", r.f32()?);
    set_wheel_f32s(&mut r, frame, "wheelCamber")?;
    set_wheel_f32s(&mut r, frame, "wheelCamberGain")?;
    Some(())
}

/// Lap positions header; the 50x22 position matrix is not surfaced.
fn parse_lap_positions(body: &[u8], frame: &mut Frame) -> Option<()> {
    if body.len() < 2 {
        return None;
    }
    let mut r = ByteReader::new(body);
    frame.set("numLaps", r.u8()?);
    frame.set("lapStart", r.u8()?);
    Some(())
}

/// Decoder for the F1 25 season of the format.
pub struct F12025Decoder;

impl F12025Decoder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for F12025Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryDecoder for F12025Decoder {
    fn decode(&mut self, data: &[u8]) -> Option<Frame> {
        let header = PacketHeader::parse(data)?;
        let body = data.get(f1::HEADER_LEN..)?;
        let player = header.player_index();
        let mut frame = header.new_frame();
        match i32::from(header.packet_id) {
            f1::MOTION => f1::parse_motion(body, player, &mut frame)?,
            f1::SESSION => parse_session(body, &mut frame)?,
            f1::LAP_DATA => f1::parse_lap_data(body, player, &mut frame, 0)?,
            f1::EVENT => f1::parse_event(body, &mut frame)?,
            f1::PARTICIPANTS => parse_participants(body, player, &mut frame)?,
            f1::CAR_SETUPS => f1::parse_car_setups(body, player, &mut frame, "brakeBalance")?,
            f1::CAR_TELEMETRY => f1::parse_car_telemetry(body, player, &mut frame)?,
            f1::CAR_STATUS => f1::parse_car_status(body, player, &mut frame)?,
            f1::FINAL_CLASSIFICATION => parse_final_classification(body, player, &mut frame)?,
            f1::LOBBY_INFO => parse_lobby_info(body, player, &mut frame)?,
            f1::CAR_DAMAGE => parse_car_damage(body, player, &mut frame)?,
            f1::SESSION_HISTORY => parse_session_history(body, &mut frame)?,
            f1::TYRE_SETS => parse_tyre_sets(body, &mut frame)?,
            f1::MOTION_EX => parse_motion_ex(body, player, &mut frame)?,
            f1::TIME_TRIAL => f1::parse_time_trial(body, &mut frame)?,
            f1::LAP_POSITIONS => parse_lap_positions(body, &mut frame)?,
            // Unrecognized ids still yield a header-only frame.
            _ => {}
        }
        Some(frame)
    }

    fn accepted_packet_sizes(&self) -> &'static [usize] {
        &ACCEPTED_SIZES
    }

    fn packet_type_name(&self, packet_type: i32) -> String {
        f1::lookup_packet_type_name(&PACKET_TYPES, packet_type)
    }

    fn supported_packet_types(&self) -> &'static [PacketTypeInfo] {
        &PACKET_TYPES
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::f1::HEADER_LEN;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn make_packet(packet_id: u8, player_car_index: u8, total_len: usize) -> Vec<u8> {
        let mut data = vec![0_u8; total_len];
        data[0..2].copy_from_slice(&2025_u16.to_le_bytes());
        data[2] = 25;
        data[6] = packet_id;
        data[27] = player_car_index;
        data
    }

    fn put_u16(buf: &mut [u8], offset: usize, v: u16) {
        buf[offset..offset + 2].copy_from_slice(&v.to_le_bytes());
    }

    fn put_f32(buf: &mut [u8], offset: usize, v: f32) {
        buf[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
    }

    #[test]
    fn telemetry_reads_player_record() -> TestResult {
        let mut decoder = F12025Decoder::new();
        let mut data = make_packet(6, 2, 1352);
        put_u16(&mut data, HEADER_LEN + 2 * 60, 301);

        let frame = decoder.decode(&data).ok_or("no frame")?;
        assert_eq!(frame.packet_type, 6);
        assert_eq!(frame.get_i64("speed"), Some(301));
        assert_eq!(frame.get_i64("packetFormat"), Some(2025));
        Ok(())
    }

    #[test]
    fn lap_data_has_no_delta_padding() -> TestResult {
        let mut decoder = F12025Decoder::new();
        let mut data = make_packet(2, 0, 1285);
        put_u16(&mut data, HEADER_LEN + 14, 250); // deltaToCarInFrontInMS
        put_u16(&mut data, HEADER_LEN + 16, 1800); // deltaToRaceLeaderInMS

        let frame = decoder.decode(&data).ok_or("no frame")?;
        assert_eq!(frame.get_i64("deltaToCarInFrontInMS"), Some(250));
        assert_eq!(frame.get_i64("deltaToRaceLeaderInMS"), Some(1800));
        Ok(())
    }

    #[test]
    fn participants_reads_short_names_and_livery() -> TestResult {
        let mut decoder = F12025Decoder::new();
        let mut data = make_packet(4, 0, 1274);
        data[HEADER_LEN] = 20; // numActiveCars
        let record = HEADER_LEN + 1;
        data[record + 7..record + 7 + 6].copy_from_slice(b"PIASTR");
        data[record + 42] = 2; // numColours
        data[record + 43] = 255; // liveryColour0R

        let frame = decoder.decode(&data).ok_or("no frame")?;
        assert_eq!(frame.get_str("name"), Some("PIASTR"));
        assert_eq!(frame.get_i64("numColours"), Some(2));
        assert_eq!(frame.get_i64("liveryColour0R"), Some(255));
        assert_eq!(frame.get_i64("liveryColour3B"), Some(0));
        Ok(())
    }

    #[test]
    fn car_setups_uses_season_brake_key() -> TestResult {
        let mut decoder = F12025Decoder::new();
        let mut data = make_packet(5, 0, 1133);
        data[HEADER_LEN + 27] = 55; // brake balance byte

        let frame = decoder.decode(&data).ok_or("no frame")?;
        assert_eq!(frame.get_i64("brakeBalance"), Some(55));
        assert!(frame.get("brakeBias").is_none());
        Ok(())
    }

    #[test]
    fn final_classification_includes_result_reason() -> TestResult {
        let mut decoder = F12025Decoder::new();
        let mut data = make_packet(8, 0, 1020);
        data[HEADER_LEN] = 20;
        data[HEADER_LEN + 1 + 45] = 3; // resultReason, last byte of the record

        let frame = decoder.decode(&data).ok_or("no frame")?;
        assert_eq!(frame.get_i64("resultReason"), Some(3));
        Ok(())
    }

    #[test]
    fn car_damage_includes_tyre_blisters() -> TestResult {
        let mut decoder = F12025Decoder::new();
        let mut data = make_packet(10, 0, 953);
        data[HEADER_LEN + 42] = 9; // tyreBlistersRL, after the F1 24 fields

        let frame = decoder.decode(&data).ok_or("no frame")?;
        assert_eq!(frame.get_i64("tyreBlistersRL"), Some(9));
        Ok(())
    }

    #[test]
    fn session_stops_at_red_flag_count() -> TestResult {
        let mut decoder = F12025Decoder::new();
        let mut data = make_packet(1, 0, 753);
        data[HEADER_LEN] = 3; // weather
        data[HEADER_LEN + 19] = 1; // safetyCarStatus, directly after numMarshalZones

        let frame = decoder.decode(&data).ok_or("no frame")?;
        assert_eq!(frame.get_i64("weather"), Some(3));
        assert_eq!(frame.get_i64("safetyCarStatus"), Some(1));
        assert!(frame.get("sector2LapDistanceStart").is_none());
        Ok(())
    }

    #[test]
    fn motion_ex_reads_player_stride() -> TestResult {
        let mut decoder = F12025Decoder::new();
        // Stride bound only covers the player record start; the record reads
        // run past it, so give the body enough room.
        let mut data = make_packet(13, 0, HEADER_LEN + 188);
        put_f32(&mut data, HEADER_LEN + 152, 0.12); // chassisPitch
        put_f32(&mut data, HEADER_LEN + 184, 1.5); // wheelCamberGainFR

        let frame = decoder.decode(&data).ok_or("no frame")?;
        let pitch = frame.get_f64("chassisPitch").ok_or("missing field")?;
        assert!((pitch - 0.12).abs() < 1e-6);
        let gain = frame.get_f64("wheelCamberGainFR").ok_or("missing field")?;
        assert!((gain - 1.5).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn lap_positions_surfaces_lap_window() -> TestResult {
        let mut decoder = F12025Decoder::new();
        let mut data = make_packet(15, 0, 573);
        data[HEADER_LEN] = 12; // numLaps
        data[HEADER_LEN + 1] = 5; // lapStart

        let frame = decoder.decode(&data).ok_or("no frame")?;
        assert_eq!(frame.packet_type, 15);
        assert_eq!(frame.get_i64("numLaps"), Some(12));
        assert_eq!(frame.get_i64("lapStart"), Some(5));
        Ok(())
    }

    #[test]
    fn packet_type_names() {
        let decoder = F12025Decoder::new();
        assert_eq!(decoder.packet_type_name(15), "Lap Positions");
        assert_eq!(decoder.packet_type_name(7), "Car Status");
        assert_eq!(decoder.packet_type_name(77), "Unknown_77");
        assert_eq!(decoder.accepted_packet_sizes().len(), 16);
    }
}
