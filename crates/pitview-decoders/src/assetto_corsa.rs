//! Assetto Corsa shared-memory-over-UDP decoder.
//!
//! Each datagram starts with a one-byte discriminator (1 = physics,
//! 2 = graphics, 3 = static info) followed by the corresponding
//! shared-memory page serialized verbatim: little-endian scalars and
//! fixed-width UTF-16LE strings. Only physics pages carry per-frame
//! derivatives; graphics and static pages are passthrough snapshots.

use crate::wire::ByteReader;
use crate::{PacketTypeInfo, TelemetryDecoder};
use pitview_frame::{Frame, wall_clock_s};
use tracing::warn;

/// Wheel suffixes in page order for every four-wheel block.
const WHEELS: [&str; 4] = ["FL", "FR", "RL", "RR"];

/// Substitute frame interval when timestamps have not advanced (~60 fps).
const NOMINAL_FRAME_DT: f64 = 0.016;

const PHYSICS_PAGE: i32 = 1;
const GRAPHICS_PAGE: i32 = 2;
const STATIC_PAGE: i32 = 3;

/// Every page ships in a fixed-size datagram.
const PAGE_PACKET_LEN: usize = 4094;

const PACKET_TYPES: [PacketTypeInfo; 3] = [
    PacketTypeInfo {
        id: PHYSICS_PAGE,
        name: "Physics",
    },
    PacketTypeInfo {
        id: GRAPHICS_PAGE,
        name: "Graphics",
    },
    PacketTypeInfo {
        id: STATIC_PAGE,
        name: "Static",
    },
];

const ACCEPTED_SIZES: [usize; 1] = [PAGE_PACKET_LEN];

/// Physics values carried across frames for derivative calculation.
#[derive(Debug, Clone, Copy)]
struct PhysicsSnapshot {
    t: f64,
    suspension_travel: [f32; 4],
    tyre_core_temperature: [f32; 4],
    gear: i32,
    rpms: i32,
    fuel: f32,
}

/// Values pulled out of the physics page beyond what lands directly in
/// the frame.
struct PhysicsValues {
    snapshot: PhysicsSnapshot,
    wheel_slip: [f32; 4],
    brake_temp: [f32; 4],
}

fn read_wheel_f32s(r: &mut ByteReader<'_>, frame: &mut Frame, prefix: &str) -> Option<[f32; 4]> {
    let mut values = [0.0_f32; 4];
    for (suffix, slot) in WHEELS.iter().zip(values.iter_mut()) {
        let v = r.f32()?;
        frame.set(&format!("{prefix}{suffix}"), v);
        *slot = v;
    }
    Some(values)
}

fn read_wheel_vectors(r: &mut ByteReader<'_>, frame: &mut Frame, prefix: &str) -> Option<()> {
    for suffix in WHEELS {
        for axis in ["X", "Y", "Z"] {
            frame.set(&format!("{prefix}{suffix}{axis}"), r.f32()?);
        }
    }
    Some(())
}

/// Parses the physics page body (everything after the discriminator byte).
fn parse_physics(r: &mut ByteReader<'_>, frame: &mut Frame, t: f64) -> Option<PhysicsValues> {
    frame.set("packetId", r.i32()?);
    frame.set("gas", r.f32()?);
    frame.set("brake", r.f32()?);
    let fuel = r.f32()?;
    frame.set("fuel", fuel);
    let gear = r.i32()?;
    frame.set("gear", gear);
    let rpms = r.i32()?;
    frame.set("rpms", rpms);
    frame.set("steerAngle", r.f32()?);
    frame.set("speedKmh", r.f32()?);
    for name in [
        "velocityX",
        "velocityY",
        "velocityZ",
        "accGX",
        "accGY",
        "accGZ",
    ] {
        frame.set(name, r.f32()?);
    }

    let wheel_slip = read_wheel_f32s(r, frame, "wheelSlip")?;
    read_wheel_f32s(r, frame, "wheelLoad")?;
    read_wheel_f32s(r, frame, "wheelsPressure")?;
    read_wheel_f32s(r, frame, "wheelAngularSpeed")?;
    read_wheel_f32s(r, frame, "tyreWear")?;
    read_wheel_f32s(r, frame, "tyreDirtyLevel")?;
    let tyre_core_temperature = read_wheel_f32s(r, frame, "tyreCoreTemperature")?;
    read_wheel_f32s(r, frame, "camberRAD")?;
    let suspension_travel = read_wheel_f32s(r, frame, "suspensionTravel")?;

    for name in ["drs", "tc", "heading", "pitch", "roll", "cgHeight"] {
        frame.set(name, r.f32()?);
    }
    for name in [
        "carDamageFront",
        "carDamageRear",
        "carDamageLeft",
        "carDamageRight",
        "carDamageCenter",
    ] {
        frame.set(name, r.f32()?);
    }
    frame.set("numberOfTyresOut", r.i32()?);
    frame.set("pitLimiterOn", r.i32()?);
    frame.set("abs", r.f32()?);
    frame.set("kersCharge", r.f32()?);
    frame.set("kersInput", r.f32()?);
    frame.set("autoShifterOn", r.i32()?);
    for name in [
        "rideHeightFront",
        "rideHeightRear",
        "turboBoost",
        "ballast",
        "airDensity",
        "airTemp",
        "roadTemp",
        "localAngularVelX",
        "localAngularVelY",
        "localAngularVelZ",
        "finalFF",
        "performanceMeter",
    ] {
        frame.set(name, r.f32()?);
    }
    for name in [
        "engineBrake",
        "ersRecoveryLevel",
        "ersPowerLevel",
        "ersHeatCharging",
        "ersIsCharging",
    ] {
        frame.set(name, r.i32()?);
    }
    frame.set("kersCurrentKJ", r.f32()?);
    frame.set("drsAvailable", r.i32()?);
    frame.set("drsEnabled", r.i32()?);
    let brake_temp = read_wheel_f32s(r, frame, "brakeTemp")?;
    frame.set("clutch", r.f32()?);
    read_wheel_f32s(r, frame, "tyreTempI")?;
    read_wheel_f32s(r, frame, "tyreTempM")?;
    read_wheel_f32s(r, frame, "tyreTempO")?;
    frame.set("isAIControlled", r.i32()?);
    read_wheel_vectors(r, frame, "tyreContactPoint")?;
    read_wheel_vectors(r, frame, "tyreContactNormal")?;
    read_wheel_vectors(r, frame, "tyreContactHeading")?;
    frame.set("brakeBias", r.f32()?);
    frame.set("localVelocityX", r.f32()?);
    frame.set("localVelocityY", r.f32()?);
    frame.set("localVelocityZ", r.f32()?);
    frame.set("P2PActivations", r.i32()?);
    frame.set("P2PStatus", r.i32()?);
    frame.set("currentMaxRpm", r.i32()?);
    read_wheel_f32s(r, frame, "mz")?;
    read_wheel_f32s(r, frame, "fx")?;
    read_wheel_f32s(r, frame, "fy")?;
    read_wheel_f32s(r, frame, "slipRatio")?;
    read_wheel_f32s(r, frame, "slipAngle")?;
    frame.set("tcinAction", r.i32()?);
    frame.set("absInAction", r.i32()?);
    read_wheel_f32s(r, frame, "suspensionDamage")?;
    read_wheel_f32s(r, frame, "tyreTemp")?;

    Some(PhysicsValues {
        snapshot: PhysicsSnapshot {
            t,
            suspension_travel,
            tyre_core_temperature,
            gear,
            rpms,
            fuel,
        },
        wheel_slip,
        brake_temp,
    })
}

/// Parses the graphics page body.
fn parse_graphics(r: &mut ByteReader<'_>, frame: &mut Frame) -> Option<()> {
    frame.set("packetId", r.i32()?);
    frame.set("status", r.i32()?);
    frame.set("session", r.i32()?);
    frame.set("currentTime", r.wide_string(15)?);
    frame.set("lastTime", r.wide_string(15)?);
    frame.set("bestTime", r.wide_string(15)?);
    frame.set("split", r.wide_string(15)?);
    for name in [
        "completedLaps",
        "position",
        "iCurrentTime",
        "iLastTime",
        "iBestTime",
    ] {
        frame.set(name, r.i32()?);
    }
    frame.set("sessionTimeLeft", r.f32()?);
    frame.set("distanceTraveled", r.f32()?);
    for name in [
        "isInPit",
        "currentSectorIndex",
        "lastSectorTime",
        "numberOfLaps",
    ] {
        frame.set(name, r.i32()?);
    }
    frame.set("tyreCompound", r.wide_string(33)?);
    frame.set("replayTimeMultiplier", r.f32()?);
    frame.set("normalizedCarPosition", r.f32()?);
    frame.set("activeCars", r.i32()?);
    // 60 XYZ car coordinates and 60 car IDs; not surfaced per frame.
    r.skip(60 * 3 * 4)?;
    r.skip(60 * 4)?;
    frame.set("playerCarID", r.i32()?);
    frame.set("penaltyTime", r.f32()?);
    for name in ["flag", "penalty", "idealLineOn", "isInPitLane"] {
        frame.set(name, r.i32()?);
    }
    frame.set("surfaceGrip", r.f32()?);
    frame.set("mandatoryPitDone", r.i32()?);
    frame.set("windSpeed", r.f32()?);
    frame.set("windDirection", r.f32()?);
    for name in [
        "isSetupMenuVisible",
        "mainDisplayIndex",
        "secondaryDisplayIndex",
        "TC",
        "TCCut",
        "EngineMap",
        "ABS",
        "fuelXLap",
        "rainLights",
        "flashingLights",
        "lightsStage",
    ] {
        frame.set(name, r.i32()?);
    }
    frame.set("exhaustTemperature", r.f32()?);
    for name in [
        "wiperLV",
        "DriverStintTotalTimeLeft",
        "DriverStintTimeLeft",
        "rainTyres",
    ] {
        frame.set(name, r.i32()?);
    }
    Some(())
}

/// Parses the static-info page body.
fn parse_static(r: &mut ByteReader<'_>, frame: &mut Frame) -> Option<()> {
    frame.set("smVersion", r.wide_string(15)?);
    frame.set("acVersion", r.wide_string(15)?);
    frame.set("numberOfSessions", r.i32()?);
    frame.set("numCars", r.i32()?);
    frame.set("carModel", r.wide_string(33)?);
    frame.set("track", r.wide_string(33)?);
    frame.set("playerName", r.wide_string(33)?);
    frame.set("playerSurname", r.wide_string(33)?);
    frame.set("playerNick", r.wide_string(33)?);
    frame.set("sectorCount", r.i32()?);
    frame.set("maxTorque", r.f32()?);
    frame.set("maxPower", r.f32()?);
    frame.set("maxRpm", r.i32()?);
    frame.set("maxFuel", r.f32()?);
    read_wheel_f32s(r, frame, "suspensionMaxTravel")?;
    read_wheel_f32s(r, frame, "tyreRadius")?;
    frame.set("maxTurboBoost", r.f32()?);
    frame.set("deprecated_1", r.f32()?);
    frame.set("deprecated_2", r.f32()?);
    frame.set("penaltiesEnabled", r.i32()?);
    frame.set("aidFuelRate", r.f32()?);
    frame.set("aidTireRate", r.f32()?);
    frame.set("aidMechanicalDamage", r.f32()?);
    frame.set("aidAllowTyreBlankets", r.i32()?);
    frame.set("aidStability", r.f32()?);
    for name in [
        "aidAutoClutch",
        "aidAutoBlip",
        "hasDRS",
        "hasERS",
        "hasKERS",
    ] {
        frame.set(name, r.i32()?);
    }
    frame.set("kersMaxJ", r.f32()?);
    frame.set("engineBrakeSettingsCount", r.i32()?);
    frame.set("ersPowerControllerCount", r.i32()?);
    frame.set("trackSPlineLength", r.f32()?);
    frame.set("trackConfiguration", r.wide_string(33)?);
    frame.set("ersMaxJ", r.f32()?);
    frame.set("isTimedRace", r.i32()?);
    frame.set("hasExtraLap", r.i32()?);
    frame.set("carSkin", r.wide_string(33)?);
    frame.set("reversedGridPositions", r.i32()?);
    frame.set("PitWindowStart", r.i32()?);
    frame.set("PitWindowEnd", r.i32()?);
    frame.set("isOnline", r.i32()?);
    Some(())
}

/// Writes physics derivatives and aggregates into the frame, then
/// returns the snapshot to remember for the next frame.
fn apply_derived(
    frame: &mut Frame,
    values: &PhysicsValues,
    prev: Option<&PhysicsSnapshot>,
) -> PhysicsSnapshot {
    let cur = values.snapshot;

    match prev {
        Some(prev) => {
            let mut dt = (cur.t - prev.t).abs();
            if dt < f64::EPSILON || dt.is_nan() {
                dt = NOMINAL_FRAME_DT;
            }
            for (i, suffix) in WHEELS.iter().enumerate() {
                let dv = f64::from(cur.suspension_travel[i] - prev.suspension_travel[i]) / dt;
                frame.set(&format!("suspensionVelocity{suffix}"), dv);
                let dtemp =
                    f64::from(cur.tyre_core_temperature[i] - prev.tyre_core_temperature[i]) / dt;
                frame.set(&format!("tyreTempVelocity{suffix}"), dtemp);
            }
            frame.set("shifting", i32::from(cur.gear != prev.gear));
            frame.set("rpmVelocity", f64::from(cur.rpms - prev.rpms) / dt);
            frame.set("fuelConsumptionRate", f64::from(prev.fuel - cur.fuel) / dt);
        }
        None => {
            for suffix in WHEELS {
                frame.set(&format!("suspensionVelocity{suffix}"), 0.0);
                frame.set(&format!("tyreTempVelocity{suffix}"), 0.0);
            }
            frame.set("shifting", 0);
            frame.set("rpmVelocity", 0.0);
            frame.set("fuelConsumptionRate", 0.0);
        }
    }

    let total_slip = values
        .wheel_slip
        .iter()
        .map(|s| f64::from(*s).powi(2))
        .sum::<f64>()
        .sqrt();
    frame.set("totalWheelSlip", total_slip);
    let avg_tyre = cur.tyre_core_temperature.iter().map(|v| f64::from(*v)).sum::<f64>() / 4.0;
    frame.set("averageTyreTemp", avg_tyre);
    let avg_brake = values.brake_temp.iter().map(|v| f64::from(*v)).sum::<f64>() / 4.0;
    frame.set("averageBrakeTemp", avg_brake);
    // Sessions are bucketed by wall-clock hour.
    frame.set("sessionID", (cur.t / 3600.0).floor() * 3600.0);

    cur
}

/// Decoder for the Assetto Corsa UDP relay format.
pub struct AssettoCorsaDecoder {
    prev_physics: Option<PhysicsSnapshot>,
}

impl AssettoCorsaDecoder {
    pub fn new() -> Self {
        Self { prev_physics: None }
    }

    fn decode_at(&mut self, data: &[u8], t: f64) -> Option<Frame> {
        let page = i32::from(*data.first()?);
        let mut r = ByteReader::at(data, 1);
        let mut frame = Frame::new(page, t);
        match page {
            PHYSICS_PAGE => {
                let values = parse_physics(&mut r, &mut frame, t)?;
                let snapshot = apply_derived(&mut frame, &values, self.prev_physics.as_ref());
                self.prev_physics = Some(snapshot);
            }
            GRAPHICS_PAGE => parse_graphics(&mut r, &mut frame)?,
            STATIC_PAGE => parse_static(&mut r, &mut frame)?,
            other => {
                warn!(page = other, "unknown assetto corsa page");
                return None;
            }
        }
        Some(frame)
    }
}

impl Default for AssettoCorsaDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryDecoder for AssettoCorsaDecoder {
    fn decode(&mut self, data: &[u8]) -> Option<Frame> {
        self.decode_at(data, wall_clock_s())
    }

    fn accepted_packet_sizes(&self) -> &'static [usize] {
        &ACCEPTED_SIZES
    }

    fn packet_type_name(&self, packet_type: i32) -> String {
        PACKET_TYPES
            .iter()
            .find(|p| p.id == packet_type)
            .map_or_else(
                || format!("Unknown ({packet_type})"),
                |p| p.name.to_string(),
            )
    }

    fn supported_packet_types(&self) -> &'static [PacketTypeInfo] {
        &PACKET_TYPES
    }
}
