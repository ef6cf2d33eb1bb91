//! Simulated board for integration tests
//!
//! This module provides:
//! - [`SimBus`]: register-map emulation of a BME280 and an MPU6050 that
//!   turns a target altitude into the raw pressure code the driver expects
//! - [`SimSerial`], [`SimButton`], [`SimAlerts`]: scripted UART, button and
//!   recorded feedback
//! - [`SimPlatform`]: the [`Platform`] bundle over all of the above, sharing
//!   a single [`ManualClock`] so every requested delay advances time
//!
//! Every handle is a cheap clone over shared state, so a test keeps one
//! while the flight computer owns another.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::convert::Infallible;
use std::rc::Rc;

use cansat_core::drivers::barometer::compensation::{
    altitude_from_pressure, compensate_pressure, compensate_temperature,
};
use cansat_core::drivers::CalibrationConstants;
use cansat_core::errors::{FlightError, FlightResult};
use cansat_core::telemetry::{LogFile, MemorySink};
use cansat_core::time::{ManualClock, TimeSource, Timestamp};
use cansat_core::traits::{AlertController, AlertPattern, ButtonInput, Led, Platform, RegisterTransport, Stream};
use cansat_core::{FlightComputer, TickOutcome};

pub const BME280_ADDR: u8 = 0x76;
pub const MPU6050_ADDR: u8 = 0x68;

/// Datasheet raw temperature, 25.08 °C with the fallback calibration
pub const RAW_TEMPERATURE: i32 = 519888;

/// Pressure the simulated launch site sits at
pub const GROUND_PRESSURE_PA: f64 = 100_000.0;

pub const SEA_LEVEL_HPA: f64 = 1013.25;

pub const GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n";

/// Bus failure reported by [`SimBus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimBusError {
    NoAcknowledge(u8),
}

#[derive(Debug, Default)]
struct Board {
    registers: BTreeMap<(u8, u8), u8>,
    present: Vec<u8>,
    unresponsive: Vec<u8>,
    writes: Vec<(u8, u8, u8)>,
}

impl Board {
    fn responds(&self, addr: u8) -> bool {
        self.present.contains(&addr) && !self.unresponsive.contains(&addr)
    }

    fn load(&mut self, addr: u8, reg: u8, bytes: &[u8]) {
        for (offset, &byte) in bytes.iter().enumerate() {
            self.registers.insert((addr, reg + offset as u8), byte);
        }
    }
}

/// Shared I2C bus with a BME280 and an MPU6050 register map
#[derive(Debug, Clone, Default)]
pub struct SimBus {
    board: Rc<RefCell<Board>>,
}

impl SimBus {
    /// Bus with both sensors fitted, at ground level and at rest
    pub fn new() -> Self {
        let bus = Self::default();
        bus.fit_barometer(BME280_ADDR);
        bus.fit_inertial();
        bus
    }

    /// Attach a BME280 at `addr` reading ground pressure
    pub fn fit_barometer(&self, addr: u8) {
        let calibration = CalibrationConstants::FALLBACK.to_registers();
        {
            let mut board = self.board.borrow_mut();
            board.present.push(addr);
            board.load(addr, 0xD0, &[0x60]);
            board.load(addr, 0x88, &calibration);
            board.load(addr, 0xFA, &raw_bytes(RAW_TEMPERATURE));
        }
        self.set_pressure_pa(GROUND_PRESSURE_PA);
    }

    /// Attach an MPU6050 lying flat
    pub fn fit_inertial(&self) {
        {
            let mut board = self.board.borrow_mut();
            board.present.push(MPU6050_ADDR);
            board.load(MPU6050_ADDR, 0x75, &[0x68]);
        }
        self.set_accel_g([0.0, 0.0, 1.0]);
        self.set_rotation_dps([0.0, 0.0, 0.0]);
    }

    /// Detach every device at `addr`
    pub fn remove(&self, addr: u8) {
        self.board.borrow_mut().present.retain(|&a| a != addr);
    }

    /// Make `addr` stop acknowledging
    pub fn set_unresponsive(&self, addr: u8, unresponsive: bool) {
        let mut board = self.board.borrow_mut();
        board.unresponsive.retain(|&a| a != addr);
        if unresponsive {
            board.unresponsive.push(addr);
        }
    }

    /// Load the raw pressure code closest to `pascals`
    pub fn set_pressure_pa(&self, pascals: f64) {
        let code = pressure_code(pascals);
        let mut board = self.board.borrow_mut();
        let addrs: Vec<u8> = board.present.iter().copied().filter(|&a| a != MPU6050_ADDR).collect();
        for addr in addrs {
            board.load(addr, 0xF7, &raw_bytes(code));
        }
    }

    /// Put the payload `meters` above the simulated launch site
    pub fn set_altitude(&self, meters: f32) {
        self.set_pressure_pa(pressure_at(ground_altitude_m() + f64::from(meters)));
    }

    /// Load accelerometer words for `g` at the ±2 g range
    pub fn set_accel_g(&self, g: [f32; 3]) {
        self.board.borrow_mut().load(MPU6050_ADDR, 0x3B, &words(g, 16384.0));
    }

    /// Load gyroscope words for `dps` at the ±250 °/s range
    pub fn set_rotation_dps(&self, dps: [f32; 3]) {
        self.board.borrow_mut().load(MPU6050_ADDR, 0x43, &words(dps, 131.0));
    }

    /// Every `(addr, reg, value)` written so far
    pub fn writes(&self) -> Vec<(u8, u8, u8)> {
        self.board.borrow().writes.clone()
    }
}

impl RegisterTransport for SimBus {
    type Error = SimBusError;

    fn read(&mut self, addr: u8, reg: u8, buf: &mut [u8]) -> Result<(), SimBusError> {
        let board = self.board.borrow();
        if !board.responds(addr) {
            return Err(SimBusError::NoAcknowledge(addr));
        }
        for (offset, byte) in buf.iter_mut().enumerate() {
            *byte = board.registers.get(&(addr, reg + offset as u8)).copied().unwrap_or(0);
        }
        Ok(())
    }

    fn write(&mut self, addr: u8, reg: u8, bytes: &[u8]) -> Result<(), SimBusError> {
        let mut board = self.board.borrow_mut();
        if !board.responds(addr) {
            return Err(SimBusError::NoAcknowledge(addr));
        }
        for (offset, &value) in bytes.iter().enumerate() {
            board.writes.push((addr, reg + offset as u8, value));
        }
        Ok(())
    }

    fn probe(&mut self, addr: u8) -> bool {
        self.board.borrow().responds(addr)
    }
}

fn raw_bytes(code: i32) -> [u8; 3] {
    [(code >> 12) as u8, (code >> 4) as u8, ((code & 0xF) << 4) as u8]
}

fn words(values: [f32; 3], scale: f32) -> [u8; 6] {
    let mut out = [0u8; 6];
    for (chunk, value) in out.chunks_mut(2).zip(values) {
        let word = (value * scale).round().clamp(-32768.0, 32767.0) as i16;
        chunk.copy_from_slice(&word.to_be_bytes());
    }
    out
}

/// Pressure at `meters` above sea level, inverse of the barometric formula
pub fn pressure_at(meters: f64) -> f64 {
    SEA_LEVEL_HPA * 100.0 * (1.0 - meters / 44330.0).powf(1.0 / 0.1903)
}

/// Absolute altitude of the simulated launch site
pub fn ground_altitude_m() -> f64 {
    f64::from(altitude_from_pressure((GROUND_PRESSURE_PA / 100.0) as f32, SEA_LEVEL_HPA as f32))
}

/// Raw code whose compensated pressure is closest to `pascals`
///
/// Compensated pressure falls as the code rises, so a bisection over the
/// 20-bit range converges.
pub fn pressure_code(pascals: f64) -> i32 {
    let calibration = CalibrationConstants::FALLBACK;
    let t_fine = compensate_temperature(RAW_TEMPERATURE, &calibration).t_fine;
    let pressure = |code: i32| compensate_pressure(code, t_fine, &calibration).unwrap_or(0.0);

    let (mut lo, mut hi) = (0i32, 0xF_FFFF);
    while hi - lo > 1 {
        let mid = (lo + hi) / 2;
        if pressure(mid) > pascals {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    if (pressure(lo) - pascals).abs() <= (pressure(hi) - pascals).abs() {
        lo
    } else {
        hi
    }
}

/// GPS UART fed by the test
#[derive(Debug, Clone, Default)]
pub struct SimSerial {
    rx: Rc<RefCell<VecDeque<u8>>>,
}

impl SimSerial {
    pub fn feed(&self, text: &str) {
        self.rx.borrow_mut().extend(text.bytes());
    }

    pub fn pending(&self) -> usize {
        self.rx.borrow().len()
    }
}

impl Stream for SimSerial {
    type Item = u8;
    type Error = Infallible;

    fn poll_next(&mut self) -> nb::Result<u8, Infallible> {
        self.rx.borrow_mut().pop_front().ok_or(nb::Error::WouldBlock)
    }
}

/// What the board showed and played
#[derive(Debug, Default, Clone)]
pub struct AlertLog {
    pub played: Vec<AlertPattern>,
    pub blinks: Vec<Led>,
    pub green: bool,
    pub red: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SimAlerts {
    log: Rc<RefCell<AlertLog>>,
}

impl SimAlerts {
    pub fn log(&self) -> AlertLog {
        self.log.borrow().clone()
    }

    pub fn played(&self) -> Vec<AlertPattern> {
        self.log.borrow().played.clone()
    }
}

impl AlertController for SimAlerts {
    fn blink(&mut self, led: Led, _pattern_ms: &[u32]) {
        self.log.borrow_mut().blinks.push(led);
    }

    fn buzz(&mut self, _steps: &[(u32, u32)]) {}

    fn set_led(&mut self, led: Led, on: bool) {
        let mut log = self.log.borrow_mut();
        match led {
            Led::Green => log.green = on,
            Led::Red => log.red = on,
        }
    }

    fn play(&mut self, pattern: AlertPattern) {
        self.log.borrow_mut().played.push(pattern);
    }
}

#[derive(Debug, Default)]
struct ButtonScript {
    queued: VecDeque<bool>,
    idle: bool,
}

/// Button level, scripted sample by sample or held steady
#[derive(Debug, Clone, Default)]
pub struct SimButton {
    script: Rc<RefCell<ButtonScript>>,
}

impl SimButton {
    /// Level returned once the script runs out
    pub fn set(&self, pressed: bool) {
        self.script.borrow_mut().idle = pressed;
    }

    /// Queue `samples` levels
    pub fn queue(&self, pressed: bool, samples: usize) {
        let mut script = self.script.borrow_mut();
        script.queued.extend(std::iter::repeat(pressed).take(samples));
    }
}

impl ButtonInput for SimButton {
    fn is_pressed(&mut self) -> bool {
        let mut script = self.script.borrow_mut();
        let idle = script.idle;
        script.queued.pop_front().unwrap_or(idle)
    }
}

/// Simulated CanSat board
pub struct SimPlatform {
    pub clock: ManualClock,
    pub bus: SimBus,
    pub serial: SimSerial,
    pub sink: MemorySink,
    pub alerts: SimAlerts,
    pub button: SimButton,
    pub gps_connected: bool,
    pub storage_available: bool,
    pub sessions: Vec<Timestamp>,
}

impl SimPlatform {
    pub fn new() -> Self {
        Self {
            clock: ManualClock::new(0),
            bus: SimBus::new(),
            serial: SimSerial::default(),
            sink: MemorySink::new(),
            alerts: SimAlerts::default(),
            button: SimButton::default(),
            gps_connected: true,
            storage_available: true,
            sessions: Vec::new(),
        }
    }
}

impl Default for SimPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for SimPlatform {
    type Bus = SimBus;
    type Serial = SimSerial;
    type Delay = ManualClock;
    type Clock = ManualClock;
    type Storage = MemorySink;
    type Alert = SimAlerts;
    type Button = SimButton;

    fn clock(&self) -> ManualClock {
        self.clock.clone()
    }

    fn delay(&self) -> ManualClock {
        self.clock.clone()
    }

    fn open_barometer_bus(&mut self) -> FlightResult<SimBus> {
        Ok(self.bus.clone())
    }

    fn open_inertial_bus(&mut self) -> FlightResult<SimBus> {
        Ok(self.bus.clone())
    }

    fn open_gps_serial(&mut self) -> FlightResult<SimSerial> {
        if self.gps_connected {
            Ok(self.serial.clone())
        } else {
            Err(FlightError::DeviceNotFound { device: "GPS" })
        }
    }

    fn open_storage(&mut self, session: Timestamp) -> FlightResult<MemorySink> {
        self.sessions.push(session);
        if self.storage_available {
            Ok(self.sink.clone())
        } else {
            Err(FlightError::Storage { reason: "no card" })
        }
    }

    fn alerts(&mut self) -> &mut SimAlerts {
        &mut self.alerts
    }

    fn button(&mut self) -> &mut SimButton {
        &mut self.button
    }
}

pub type SimComputer = FlightComputer<SimPlatform>;

/// One tick followed by the loop's sleep
pub fn step(computer: &mut SimComputer) -> TickOutcome {
    let outcome = computer.tick().expect("tick failed");
    let interval = u64::from(computer.config().tick_interval_ms);
    computer.platform().clock.advance(interval);
    outcome
}

/// Short press: one tick held, one tick released
pub fn press(computer: &mut SimComputer) {
    computer.platform().button.set(true);
    step(computer);
    computer.platform().button.set(false);
    step(computer);
}

/// Fly through the given altitudes, one tick each
pub fn fly(computer: &mut SimComputer, altitudes: impl IntoIterator<Item = f32>) {
    for altitude in altitudes {
        computer.platform().bus.set_altitude(altitude);
        step(computer);
    }
}

/// Altitudes from `from` to `to` (inclusive) in steps of `by`
pub fn ramp(from: f32, to: f32, by: f32) -> Vec<f32> {
    let count = ((to - from) / by).round() as i32;
    (0..=count).map(|i| from + by * i as f32).collect()
}

/// Event names in file order, header skipped
pub fn event_names(sink: &MemorySink) -> Vec<String> {
    sink.lines(LogFile::Events)
        .iter()
        .skip(1)
        .filter_map(|line| line.split(',').nth(1).map(str::to_owned))
        .collect()
}

/// Event lines whose name is `name`
pub fn events_named(sink: &MemorySink, name: &str) -> Vec<String> {
    sink.lines(LogFile::Events)
        .into_iter()
        .skip(1)
        .filter(|line| line.split(',').nth(1) == Some(name))
        .collect()
}

/// Data rows, header skipped
pub fn data_rows(sink: &MemorySink) -> Vec<String> {
    sink.lines(LogFile::Data).into_iter().skip(1).collect()
}

/// Powered-up computer over a fresh board
pub fn boot() -> SimComputer {
    FlightComputer::new(SimPlatform::new(), Default::default()).expect("boot failed")
}

/// Booted, sensors initialised and armed
pub fn armed() -> SimComputer {
    let mut computer = boot();
    press(&mut computer);
    computer.platform().clock.advance(600);
    computer
}

/// Armed and launched on the second press
pub fn launched() -> SimComputer {
    let mut computer = armed();
    press(&mut computer);
    computer
}

pub fn now(computer: &SimComputer) -> Timestamp {
    computer.platform().clock.now()
}
