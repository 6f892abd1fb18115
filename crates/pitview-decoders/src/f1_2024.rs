//! F1 24 packet decoder.
//!
//! Season-specific record layouts; header handling and the record layouts
//! shared with F1 25 live in [`crate::f1`].

use crate::f1::{self, PacketHeader, record_reader, set_wheel_f32s, set_wheel_u8s};
use crate::wire::ByteReader;
use crate::{PacketTypeInfo, TelemetryDecoder};
use pitview_frame::Frame;

const PACKET_TYPES: [PacketTypeInfo; 15] = [
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
];

/// Fixed datagram sizes published by the game, one per packet id.
const ACCEPTED_SIZES: [usize; 15] = [
    1349, // Motion
    753,  // Session
    1285, // Lap Data
    45,   // Event
    1350, // Participants
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
];

/// Session body, 724 bytes; marshal zones, weather forecast samples, and
/// the weekend structure block are traversed without being surfaced.
fn parse_session(body: &[u8], frame: &mut Frame) -> Option<()> {
    if body.len() < 724 {
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
    ] {
        frame.set(name, r.u8()?);
    }
    // 21 marshal zones, 5 bytes each.
    r.skip(21 * 5)?;
    frame.set("safetyCarStatus", r.u8()?);
    frame.set("networkGame", r.u8()?);
    frame.set("numWeatherForecastSamples", r.u8()?);
    // 64 weather forecast samples, 8 bytes each.
    r.skip(64 * 8)?;
    frame.set("forecastAccuracy", r.u8()?);
    frame.set("aiDifficulty", r.u8()?);
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
        "equalCarPerformance",
        "recoveryMode",
        "flashbackLimit",
        "surfaceType",
        "lowFuelMode",
        "raceStarts",
        "tyreTemperature",
        "pitLaneTyreSim",
        "carDamage",
        "carDamageRate",
        "collisions",
        "collisionsOffForFirstLapOnly",
        "mpUnsafePitRelease",
        "mpOffForGriefing",
        "cornerCuttingStringency",
        "parcFermeRules",
        "pitStopExperience",
        "safetyCar",
        "safetyCarExperience",
        "formationLap",
        "formationLapExperience",
        "redFlags",
        "affectsLicenceLevelSolo",
        "affectsLicenceLevelMP",
        "numSessionsInWeekend",
    ] {
        frame.set(name, r.u8()?);
    }
    // Weekend structure, 12 session type bytes.
    r.skip(12)?;
    frame.set("sector2LapDistanceStart", r.f32()?);
    frame.set("sector3LapDistanceStart", r.f32()?);
    Some(())
}

/// Player participant record, 56 bytes per car after the count byte.
fn parse_participants(body: &[u8], player: usize, frame: &mut Frame) -> Option<()> {
    frame.set("numActiveCars", *body.first()?);
    let mut r = record_reader(body, 1, player, 56)?;
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
    frame.set("name", r.byte_string(48)?);
    frame.set("yourTelemetry", r.u8()?);
    frame.set("showOnlineNames", r.u8()?);
    frame.set("techLevel", r.u16()?);
    frame.set("platform", r.u8()?);
    Some(())
}

/// Player classification record, 45 bytes per car after the count byte;
/// the three tyre-stint arrays flatten to indexed keys.
fn parse_final_classification(body: &[u8], player: usize, frame: &mut Frame) -> Option<()> {
    frame.set("numCars", *body.first()?);
    let mut r = record_reader(body, 1, player, 45)?;
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
    Some(())
}

/// Player lobby record, 54 bytes per player after the count byte.
fn parse_lobby_info(body: &[u8], player: usize, frame: &mut Frame) -> Option<()> {
    frame.set("numPlayers", *body.first()?);
    let mut r = record_reader(body, 1, player, 54)?;
    for name in ["aiControlled", "teamId", "nationality", "platform"] {
        frame.set(name, r.u8()?);
    }
    frame.set("name", r.byte_string(48)?);
    frame.set("carNumber", r.u8()?);
    frame.set("readyStatus", r.u8()?);
    Some(())
}

/// Player car-damage record, 42 bytes per car.
fn parse_car_damage(body: &[u8], player: usize, frame: &mut Frame) -> Option<()> {
    let mut r = record_reader(body, 0, player, 42)?;
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
    Some(())
}

/// Session history body, 1431 bytes; the per-lap and per-stint arrays
/// are not surfaced.
fn parse_session_history(body: &[u8], frame: &mut Frame) -> Option<()> {
    if body.len() < 1431 {
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

/// Tyre sets body, 202 bytes; 20 ten-byte set records sit between the
/// two surfaced indices.
fn parse_tyre_sets(body: &[u8], frame: &mut Frame) -> Option<()> {
    if body.len() < 202 {
        return None;
    }
    let mut r = ByteReader::new(body);
    frame.set("carIdx", r.u8()?);
    r.skip(20 * 10)?;
    frame.set("fittedIdx", r.u8()?);
    Some(())
}

/// Extended motion body, 208 bytes, player car only.
fn parse_motion_ex(body: &[u8], frame: &mut Frame) -> Option<()> {
    let mut r = record_reader(body, 0, 0, 208)?;
    set_wheel_f32s(&mut r, frame, "suspensionPosition")?;
    set_wheel_f32s(&mut r, frame, "suspensionVelocity")?;
    set_wheel_f32s(&mut r, frame, "suspensionAcceleration")?;
    set_wheel_f32s(&mut r, frame, "wheelSpeed")?;
    set_wheel_f32s(&mut r, frame, "wheelSlipRatio")?;
    set_wheel_f32s(&mut r, frame, "wheelSlipAngle")?;
    set_wheel_f32s(&mut r, frame, "wheelLatForce")?;
    set_wheel_f32s(&mut r, frame, "wheelLongForce")?;
    frame.set("heightOfCOGAboveGround", r.f32()?);
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
    frame.set("frontAeroHeight", r.f32()?);
    frame.set("rearAeroHeight", r.f32()?);
    frame.set("frontRollAngle", r.f32()?);
    frame.set("rearRollAngle", r.f32()?);
    frame.set("chassisYaw", r.f32()?);
    Some(())
}

/// Decoder for the F1 24 season of the format.
pub struct F12024Decoder;

impl F12024Decoder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for F12024Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryDecoder for F12024Decoder {
    fn decode(&mut self, data: &[u8]) -> Option<Frame> {
        let header = PacketHeader::parse(data)?;
        let body = data.get(f1::HEADER_LEN..)?;
        let player = header.player_index();
        let mut frame = header.new_frame();
        match i32::from(header.packet_id) {
            f1::MOTION => f1::parse_motion(body, player, &mut frame)?,
            f1::SESSION => parse_session(body, &mut frame)?,
            f1::LAP_DATA => f1::parse_lap_data(body, player, &mut frame, 1)?,
            f1::EVENT => f1::parse_event(body, &mut frame)?,
            f1::PARTICIPANTS => parse_participants(body, player, &mut frame)?,
            f1::CAR_SETUPS => f1::parse_car_setups(body, player, &mut frame, "brakeBias")?,
            f1::CAR_TELEMETRY => f1::parse_car_telemetry(body, player, &mut frame)?,
            f1::CAR_STATUS => f1::parse_car_status(body, player, &mut frame)?,
            f1::FINAL_CLASSIFICATION => parse_final_classification(body, player, &mut frame)?,
            f1::LOBBY_INFO => parse_lobby_info(body, player, &mut frame)?,
            f1::CAR_DAMAGE => parse_car_damage(body, player, &mut frame)?,
            f1::SESSION_HISTORY => parse_session_history(body, &mut frame)?,
            f1::TYRE_SETS => parse_tyre_sets(body, &mut frame)?,
            f1::MOTION_EX => parse_motion_ex(body, &mut frame)?,
            f1::TIME_TRIAL => f1::parse_time_trial(body, &mut frame)?,
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
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn decode_never_panics(data in proptest::collection::vec(any::<u8>(), 0..1500)) {
            let mut decoder = F12024Decoder::new();
            let _ = decoder.decode(&data);
        }
    }
}
