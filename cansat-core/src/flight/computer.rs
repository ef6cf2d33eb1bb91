//! The flight computer control loop
//!
//! ## Overview
//!
//! One cooperative loop, one tick every `tick_interval_ms`:
//!
//! ```text
//! ┌─ tick ──────────────────────────────────────────────────────────────┐
//! │ button ──▶ press / hold actions                                     │
//! │ ASCENT/DESCENT only:                                                │
//! │   sample IMU, barometer, GPS ──▶ EventDetector ──▶ transition+event │
//! │   buffer row ──▶ flush when the save interval has elapsed           │
//! │ DESCENT: low-altitude confirmation rule                             │
//! │ status LEDs                                                         │
//! └─────────────────────────────────────────────────────────────────────┘
//!   then sleep tick_interval_ms
//! ```
//!
//! Every I/O call blocks the loop. A failed tick is logged, recorded as a
//! `Main Loop Error` event and followed by the error pattern and a recovery
//! pause; the loop then carries on. Only a [`FlightError::Fatal`] or a long
//! press ends [`FlightComputer::run`].
//!
//! ## Two Landing Rules
//!
//! The detector's stability rule and a loop-level rule (more than five
//! consecutive ticks below 10 m) both declare LANDED. The detector runs
//! first in a tick; when it has already landed, the loop rule is skipped.

use core::fmt;

use embedded_hal::delay::DelayNs;

use crate::config::FlightConfig;
use crate::constants::flight::{LOW_ALTITUDE_M, LOW_ALTITUDE_TICKS};
use crate::drivers::{BarometerConfig, Bme280, GpsReceiver, InertialConfig, Mpu6050};
use crate::errors::{FlightError, FlightResult};
use crate::events::{EventKind, EventRecord};
use crate::fusion::KalmanFilter3D;
use crate::retry::RetryPolicy;
use crate::telemetry::{PhysicalReading, RecorderStats, TelemetryRecorder, TelemetryRow};
use crate::time::{elapsed_ms, TimeSource, Timestamp};
use crate::traits::{
    AlertController, AlertPattern, ButtonInput, Led, Platform, ERROR_BLINK_MS, STARTUP_BLINK_MS,
};

use super::{ButtonAction, ButtonTracker, Detection, EventDetector, FlightState, FlightStateMachine};

/// Which sensors came up in the last initialisation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorStatus {
    /// BME280 answered and was configured
    pub barometer: bool,
    /// MPU6050 answered and was configured
    pub inertial: bool,
    /// GPS UART opened
    pub gps: bool,
}

impl SensorStatus {
    /// Barometer and inertial sensor both working
    pub fn minimum_met(&self) -> bool {
        self.barometer && self.inertial
    }
}

/// What the loop should do after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickOutcome {
    /// Sleep and tick again
    Continue,
    /// Shutdown completed, stop the loop
    Shutdown,
}

/// Flight computer over a board [`Platform`]
pub struct FlightComputer<P: Platform> {
    platform: P,
    config: FlightConfig,
    clock: P::Clock,
    delay: P::Delay,
    machine: FlightStateMachine,
    button: ButtonTracker,
    detector: EventDetector,
    estimator: Option<KalmanFilter3D>,
    recorder: TelemetryRecorder<P::Storage>,
    barometer: Option<Bme280<P::Bus, P::Delay>>,
    inertial: Option<Mpu6050<P::Bus>>,
    gps: Option<GpsReceiver<P::Serial, P::Clock>>,
    status: SensorStatus,
    last_reading: Option<PhysicalReading>,
    low_altitude_ticks: u8,
    last_status: Timestamp,
}

impl<P: Platform> FlightComputer<P> {
    /// Bring up storage and feedback
    ///
    /// Sensors stay off until the first press. A storage failure plays the
    /// error pattern, lights the red LED and returns [`FlightError::Fatal`].
    pub fn new(mut platform: P, config: FlightConfig) -> FlightResult<Self> {
        config.validate()?;

        let clock = platform.clock();
        let delay = platform.delay();
        let now = clock.now();

        platform.alerts().blink(Led::Green, &STARTUP_BLINK_MS);

        let recorder = match platform
            .open_storage(now)
            .and_then(|sink| TelemetryRecorder::new(sink, config.save_interval_ms, now))
        {
            Ok(recorder) => recorder,
            Err(err) => {
                log_error!("storage initialization failed: {}", err);
                signal_fatal(platform.alerts());
                return Err(FlightError::Fatal { reason: "could not initialize data storage" });
            }
        };

        platform.alerts().play(AlertPattern::Startup);
        log_info!("flight computer started");

        Ok(Self {
            button: ButtonTracker::new(config.button_hold_ms, config.button_debounce_ms),
            estimator: config.estimator.enabled.then(|| KalmanFilter3D::new(config.estimator.params())),
            platform,
            config,
            clock,
            delay,
            machine: FlightStateMachine::new(),
            detector: EventDetector::new(),
            recorder,
            barometer: None,
            inertial: None,
            gps: None,
            status: SensorStatus::default(),
            last_reading: None,
            low_altitude_ticks: 0,
            last_status: now,
        })
    }

    /// Bring up every sensor, returning whether the minimum set works
    ///
    /// Order is barometer (with ground calibration), inertial sensor, then
    /// GPS, which is optional.
    pub fn init_sensors(&mut self) -> bool {
        log_info!("starting sensor initialization");

        self.barometer = match self.bring_up_barometer() {
            Ok(baro) => Some(baro),
            Err(err) => {
                log_error!("BME280 error: {}", err);
                None
            }
        };

        self.inertial = match self.platform.open_inertial_bus().and_then(|bus| {
            Mpu6050::new(bus, &mut self.delay, InertialConfig::default())
        }) {
            Ok(imu) => Some(imu),
            Err(err) => {
                log_error!("MPU6050 error: {}", err);
                None
            }
        };

        self.gps = match self.platform.open_gps_serial() {
            Ok(serial) => Some(GpsReceiver::new(serial, self.clock.clone())),
            Err(err) => {
                log_warn!("GPS error: {}", err);
                None
            }
        };

        self.status = SensorStatus {
            barometer: self.barometer.is_some(),
            inertial: self.inertial.is_some(),
            gps: self.gps.is_some(),
        };

        if self.status.minimum_met() {
            self.platform.alerts().play(AlertPattern::SensorsReady);
            log_info!("system ready with minimum required sensors");
            true
        } else {
            log_error!("minimum sensor set not available");
            false
        }
    }

    fn bring_up_barometer(&mut self) -> FlightResult<Bme280<P::Bus, P::Delay>> {
        let bus = self.platform.open_barometer_bus()?;
        let config = BarometerConfig {
            address: None,
            sea_level_pressure_hpa: self.config.sea_level_pressure_hpa,
            retry: RetryPolicy::default(),
            verbosity: self.config.verbosity,
        };
        let mut baro = Bme280::new(bus, self.delay.clone(), config)?;
        if !baro.calibrate_ground(self.config.ground_samples, self.config.ground_sample_delay_ms) {
            log_warn!("ground calibration failed, altitude is above sea level");
        }
        Ok(baro)
    }

    /// Run ticks until shutdown or a fatal error
    pub fn run(&mut self) -> FlightResult<()> {
        log_info!("starting main loop");
        self.record_event(EventKind::MainLoop, format_args!("Program execution started"))?;

        loop {
            match self.tick() {
                Ok(TickOutcome::Shutdown) => return Ok(()),
                Ok(TickOutcome::Continue) => self.delay.delay_ms(self.config.tick_interval_ms),
                Err(err) if err.is_fatal() => {
                    log_error!("fatal: {}", err);
                    signal_fatal(self.platform.alerts());
                    return Err(err);
                }
                Err(err) => self.recover(err),
            }
        }
    }

    fn recover(&mut self, err: FlightError) {
        log_error!("error in main loop: {}", err);
        if self.record_event(EventKind::MainLoopError, format_args!("{}", err)).is_err() {
            log_error!("main loop error not recorded");
        }
        let alerts = self.platform.alerts();
        alerts.blink(Led::Red, &ERROR_BLINK_MS);
        alerts.play(AlertPattern::Error);
        self.delay.delay_ms(self.config.error_recovery_ms);
    }

    /// One pass of the control loop
    pub fn tick(&mut self) -> FlightResult<TickOutcome> {
        if self.machine.state() == FlightState::Shutdown {
            return Ok(TickOutcome::Shutdown);
        }

        let now = self.clock.now();
        let pressed = self.platform.button().is_pressed();
        match self.button.update(pressed, now) {
            ButtonAction::Hold => {
                if self
                    .record_event(EventKind::ButtonHold, format_args!("3-second shutdown triggered"))
                    .is_err()
                {
                    log_error!("button hold not recorded");
                }
                if let Err(err) = self.shutdown() {
                    log_error!("shutdown incomplete: {}", err);
                }
                return Ok(TickOutcome::Shutdown);
            }
            ButtonAction::Press => self.handle_press()?,
            ButtonAction::None => {}
        }

        let mut detected = Ok(());
        if self.machine.state().is_flying() {
            let reading = self.sample(now);
            detected = self.detect(&reading);
            let position = self.gps.as_mut().and_then(|gps| gps.get_position());
            // the row is buffered even when the detection event could not be written
            self.store(TelemetryRow::new(reading, position), now);
            self.report_status(now);
        }
        detected?;

        self.confirm_low_altitude()?;

        let state = self.machine.state();
        self.platform.alerts().show_state(state);
        Ok(TickOutcome::Continue)
    }

    fn handle_press(&mut self) -> FlightResult<()> {
        match self.machine.state() {
            FlightState::WaitingStart => {
                self.record_event(EventKind::ButtonPress, format_args!("Initializing sensors"))?;
                if self.init_sensors() {
                    self.machine.transition(FlightState::Ready)?;
                    self.record_event(EventKind::StateChange, format_args!("System ready for flight"))?;
                } else {
                    self.platform.alerts().play(AlertPattern::Error);
                    self.record_event(EventKind::Error, format_args!("Sensor initialization failed"))?;
                }
            }
            FlightState::Ready => {
                self.platform.alerts().play(AlertPattern::FlightStart);
                self.machine.transition(FlightState::Ascent)?;
                self.detector = EventDetector::new();
                self.low_altitude_ticks = 0;
                if let Some(estimator) = self.estimator.as_mut() {
                    estimator.reset();
                }
                self.record_event(EventKind::FlightStart, format_args!("Data collection initiated"))?;
            }
            state => log_debug!("button press ignored in {}", state.name()),
        }
        Ok(())
    }

    /// Read every working sensor once
    fn sample(&mut self, now: Timestamp) -> PhysicalReading {
        let mut reading = PhysicalReading { timestamp: now, ..PhysicalReading::default() };

        if let Some(imu) = self.inertial.as_mut() {
            reading.accel_g = imu
                .get_acceleration()
                .map_err(|err| log_warn!("acceleration unavailable: {}", err))
                .ok();
            reading.gyro_dps = imu
                .get_rotation()
                .map_err(|err| log_warn!("rotation unavailable: {}", err))
                .ok();
        }

        if let Some(baro) = self.barometer.as_mut() {
            let sample = baro.read_all();
            reading.temperature_c = sample.temperature_c;
            reading.pressure_pa = sample.pressure_pa;
            reading.altitude_m = sample.altitude_m;
        }

        self.last_reading = Some(reading);
        reading
    }

    fn detect(&mut self, reading: &PhysicalReading) -> FlightResult<()> {
        let Some(altitude) = reading.altitude_m else {
            return Ok(());
        };

        let vertical_accel = match (reading.accel_g, self.estimator.as_mut()) {
            (Some(accel), Some(estimator)) => Some(estimator.update(accel)[2]),
            (accel, _) => accel.map(|a| a[2]),
        };

        match self.detector.update(self.machine.state(), altitude, vertical_accel) {
            Some(detection) => self.apply_detection(detection),
            None => Ok(()),
        }
    }

    fn apply_detection(&mut self, detection: Detection) -> FlightResult<()> {
        self.platform.alerts().play(detection.alert());
        self.machine.transition(detection.next_state())?;

        match detection {
            Detection::Apogee { max_altitude_m, velocity_mps } => self.record_event(
                detection.event_kind(),
                format_args!("Max altitude: {}m, Velocity: {:.2}m/s", max_altitude_m, velocity_mps),
            ),
            Detection::Impact { altitude_m, accel_g } => self.record_event(
                detection.event_kind(),
                format_args!("Final altitude: {}m, Impact acceleration: {}g", altitude_m, accel_g),
            ),
            Detection::Landing { altitude_m, velocity_mps } => self.record_event(
                detection.event_kind(),
                format_args!("Final altitude: {}m, Velocity: {:.2}m/s", altitude_m, velocity_mps),
            ),
        }
    }

    fn confirm_low_altitude(&mut self) -> FlightResult<()> {
        if self.machine.state() != FlightState::Descent {
            return Ok(());
        }
        let Some(altitude) = self.detector.last_altitude() else {
            return Ok(());
        };

        if altitude >= LOW_ALTITUDE_M {
            self.low_altitude_ticks = 0;
            return Ok(());
        }

        self.low_altitude_ticks = self.low_altitude_ticks.saturating_add(1);
        if self.low_altitude_ticks <= LOW_ALTITUDE_TICKS {
            return Ok(());
        }

        self.platform.alerts().play(AlertPattern::Landing);
        self.machine.transition(FlightState::Landed)?;
        self.record_event(EventKind::LandingConfirmed, format_args!("Final altitude: {}m", altitude))
    }

    /// Buffer a row and flush on the save interval
    ///
    /// Storage failures are recorded as `Data Save Error` events and do not
    /// fail the tick.
    fn store(&mut self, row: TelemetryRow, now: Timestamp) {
        let result = self
            .recorder
            .record(row, now)
            .and_then(|_| self.recorder.flush_if_due(now).map(|_| ()));

        if let Err(err) = result {
            log_error!("error saving data: {}", err);
            if self
                .record_event(EventKind::DataSaveError, format_args!("Failed to save data: {}", err))
                .is_err()
            {
                log_error!("data save error not recorded");
            }
        }
    }

    fn report_status(&mut self, now: Timestamp) {
        if !self.config.verbosity.reports_status()
            || elapsed_ms(self.last_status, now) < u64::from(self.config.status_interval_ms)
        {
            return;
        }
        self.last_status = now;
        log_info!("current state: {}", self.machine.state().name());
        if let Some(altitude) = self.detector.last_altitude() {
            log_info!("current altitude: {} m", altitude);
        }
        log_info!("buffered rows: {}", self.recorder.buffered());
    }

    /// Graceful shutdown: record, drain buffered rows, LEDs off, SHUTDOWN
    ///
    /// Every step runs even if an earlier one failed; the first error is
    /// returned.
    pub fn shutdown(&mut self) -> FlightResult<()> {
        if self.machine.state() == FlightState::Shutdown {
            return Ok(());
        }
        log_info!("initiating safe shutdown");

        self.platform.alerts().play(AlertPattern::Shutdown);
        let recorded = self.record_event(EventKind::Shutdown, format_args!("System shutdown initiated"));
        let drained = self.recorder.drain(self.clock.now()).map(|rows| {
            log_info!("drained {} rows", rows);
        });

        self.platform.alerts().all_off();
        self.machine.transition(FlightState::Shutdown)?;
        recorded.and(drained)
    }

    fn record_event(&mut self, kind: EventKind, details: fmt::Arguments<'_>) -> FlightResult<()> {
        let altitude = self.last_reading.and_then(|r| r.altitude_m);
        let record = EventRecord::new(self.clock.now(), kind, self.machine.state())
            .with_altitude(altitude)
            .with_details_fmt(details);
        self.recorder.log_event(record)
    }

    /// Current flight state
    pub fn state(&self) -> FlightState {
        self.machine.state()
    }

    /// Result of the last sensor initialisation
    pub fn sensor_status(&self) -> SensorStatus {
        self.status
    }

    /// Most recent sensor sample
    pub fn last_reading(&self) -> Option<PhysicalReading> {
        self.last_reading
    }

    /// Event detector state
    pub fn detector(&self) -> &EventDetector {
        &self.detector
    }

    /// Telemetry counters
    pub fn recorder_stats(&self) -> RecorderStats {
        self.recorder.stats()
    }

    /// Rows waiting for the next flush
    pub fn buffered_rows(&self) -> usize {
        self.recorder.buffered()
    }

    /// Barometer driver, once initialised
    pub fn barometer(&self) -> Option<&Bme280<P::Bus, P::Delay>> {
        self.barometer.as_ref()
    }

    /// GPS receiver, once initialised
    pub fn gps(&self) -> Option<&GpsReceiver<P::Serial, P::Clock>> {
        self.gps.as_ref()
    }

    /// Active configuration
    pub fn config(&self) -> &FlightConfig {
        &self.config
    }

    /// Board handle
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Mutable board handle
    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }
}

fn signal_fatal<A: AlertController>(alerts: &mut A) {
    alerts.play(AlertPattern::Error);
    alerts.set_led(Led::Red, true);
}
