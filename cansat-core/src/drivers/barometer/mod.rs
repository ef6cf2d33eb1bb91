//! BME280 Barometric Sensor Driver
//!
//! ## Overview
//!
//! Temperature and pressure from a Bosch BME280 over any
//! [`RegisterTransport`], with ground-referenced altitude.
//!
//! ## Bring-Up Sequence
//!
//! ```text
//! probe 0x76, 0x77 ──▶ chip id == 0x60 ──▶ soft reset ──▶ load + sanitize
//!                                                          calibration
//!                                                              │
//!            ctrl_meas = T×2, P×16, normal ◀── config = IIR 16 ◀┘
//! ```
//!
//! Discovery and identity failures are [`FlightError::DeviceNotFound`]; bus
//! failures during bring-up surface as [`FlightError::Transport`]. After
//! bring-up no error escapes: every `read_*` method returns `None` instead.
//!
//! ## Readings
//!
//! - [`Bme280::read_temperature`]: °C, refreshes the retained fine temperature
//! - [`Bme280::read_pressure`]: Pa, refreshes temperature first
//! - [`Bme280::read_altitude`]: m above the ground reference, or above sea
//!   level before [`Bme280::calibrate_ground`] has run
//!
//! Every register access is retried per [`RetryPolicy`].
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! let mut baro = Bme280::new(I2cTransport::new(i2c), delay, BarometerConfig::default())?;
//! if baro.calibrate_ground(10, 100) {
//!     let agl = baro.read_altitude();
//! }
//! ```

pub mod calibration;
pub mod compensation;

use embedded_hal::delay::DelayNs;

use crate::config::Verbosity;
use crate::constants::physics::{PA_PER_HPA, SEA_LEVEL_PRESSURE_HPA};
use crate::constants::sensors::{
    BME280_ADDRESSES, BME280_CALIBRATION_LEN, BME280_CHIP_ID, BME280_CONFIG_VALUE,
    BME280_CTRL_MEAS_VALUE, BME280_DEFAULT_T_FINE, BME280_PRESSURE_MAX_PA, BME280_PRESSURE_MIN_PA,
    BME280_REG_CALIBRATION, BME280_REG_CHIP_ID, BME280_REG_CONFIG, BME280_REG_CTRL_MEAS,
    BME280_REG_PRESS_MSB, BME280_REG_RESET, BME280_REG_TEMP_MSB, BME280_RESET_COMMAND,
    GROUND_MIN_ACCEPTED, GROUND_PRESSURE_MAX_HPA, GROUND_PRESSURE_MIN_HPA,
};
use crate::constants::time::{BME280_CONFIG_SETTLE_MS, BME280_RESET_SETTLE_MS};
use crate::errors::{FlightError, FlightResult};
use crate::retry::{with_backoff, RetryPolicy};
use crate::traits::RegisterTransport;

pub use calibration::{CalibrationConstants, CalibrationSource};
pub use compensation::{altitude_from_pressure, compensate_pressure, compensate_temperature};

use compensation::{raw_code, round2};

const DEVICE: &str = "BME280";

/// Barometer settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarometerConfig {
    /// Fixed address, or `None` to probe 0x76 then 0x77
    pub address: Option<u8>,
    /// Reference for absolute altitude (hPa)
    pub sea_level_pressure_hpa: f32,
    /// Register access retries
    pub retry: RetryPolicy,
    /// Logging detail
    pub verbosity: Verbosity,
}

impl Default for BarometerConfig {
    fn default() -> Self {
        Self {
            address: None,
            sea_level_pressure_hpa: SEA_LEVEL_PRESSURE_HPA,
            retry: RetryPolicy::default(),
            verbosity: Verbosity::Normal,
        }
    }
}

/// Launch-site pressure and altitude, captured once
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundReference {
    /// Mean accepted ground pressure (hPa)
    pub ground_pressure_hpa: f32,
    /// Mean absolute altitude of the accepted samples (m)
    pub altitude_offset_m: f32,
}

/// One combined barometer read
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BarometerSample {
    /// Temperature (°C)
    pub temperature_c: Option<f32>,
    /// Pressure (Pa)
    pub pressure_pa: Option<f32>,
    /// Altitude above the ground reference (m)
    pub altitude_m: Option<f32>,
}

impl BarometerSample {
    /// Pressure in hectopascals
    pub fn pressure_hpa(&self) -> Option<f32> {
        self.pressure_pa.map(|pa| pa / PA_PER_HPA)
    }
}

/// Ground reference and current altitude summary
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AltitudeStats {
    /// Reference in use, if calibration has run
    pub ground: Option<GroundReference>,
    /// Whether calibration accepted enough samples
    pub calibrated: bool,
    /// Current altitude above sea level (m)
    pub absolute_altitude_m: Option<f32>,
    /// Current altitude above the ground reference (m)
    pub relative_altitude_m: Option<f32>,
}

/// BME280 driver
pub struct Bme280<T, D> {
    bus: T,
    delay: D,
    address: u8,
    config: BarometerConfig,
    calibration: CalibrationConstants,
    source: CalibrationSource,
    t_fine: i32,
    ground: Option<GroundReference>,
    calibrated: bool,
}

impl<T: RegisterTransport, D: DelayNs> Bme280<T, D> {
    /// Find, reset and configure the sensor
    pub fn new(bus: T, delay: D, config: BarometerConfig) -> FlightResult<Self> {
        let mut sensor = Self {
            bus,
            delay,
            address: 0,
            config,
            calibration: CalibrationConstants::FALLBACK,
            source: CalibrationSource::default(),
            t_fine: BME280_DEFAULT_T_FINE,
            ground: None,
            calibrated: false,
        };

        sensor.address = sensor.discover()?;

        let mut id = [0u8; 1];
        sensor.read_registers(BME280_REG_CHIP_ID, &mut id)?;
        if id[0] != BME280_CHIP_ID {
            log_error!("BME280 chip id {} at {}, expected {}", id[0], sensor.address, BME280_CHIP_ID);
            return Err(FlightError::DeviceNotFound { device: DEVICE });
        }

        sensor.write_register(BME280_REG_RESET, BME280_RESET_COMMAND)?;
        sensor.delay.delay_ms(BME280_RESET_SETTLE_MS);

        sensor.load_calibration()?;

        sensor.write_register(BME280_REG_CONFIG, BME280_CONFIG_VALUE)?;
        sensor.write_register(BME280_REG_CTRL_MEAS, BME280_CTRL_MEAS_VALUE)?;
        sensor.delay.delay_ms(BME280_CONFIG_SETTLE_MS);

        log_info!("BME280 ready at {}", sensor.address);
        Ok(sensor)
    }

    fn discover(&mut self) -> FlightResult<u8> {
        let found = match self.config.address {
            Some(addr) => self.bus.probe(addr).then_some(addr),
            None => BME280_ADDRESSES.into_iter().find(|&addr| self.bus.probe(addr)),
        };
        found.ok_or_else(|| {
            log_error!("BME280 not found on bus");
            FlightError::DeviceNotFound { device: DEVICE }
        })
    }

    fn load_calibration(&mut self) -> FlightResult<()> {
        let mut raw = [0u8; BME280_CALIBRATION_LEN];
        self.read_registers(BME280_REG_CALIBRATION, &mut raw)?;
        let (calibration, source) = CalibrationConstants::from_registers(&raw).sanitized();

        if self.config.verbosity.is_verbose() {
            log_debug!(
                "BME280 T1={} T2={} T3={} P1={} P2={} P9={}",
                calibration.t1,
                calibration.t2,
                calibration.t3,
                calibration.p1,
                calibration.p2,
                calibration.p9
            );
        }

        self.calibration = calibration;
        self.source = source;
        Ok(())
    }

    fn read_registers(&mut self, reg: u8, buf: &mut [u8]) -> FlightResult<()> {
        let addr = self.address;
        let bus = &mut self.bus;
        with_backoff(&self.config.retry, &mut self.delay, || bus.read(addr, reg, buf)).map_err(|_| {
            log_warn!("BME280 read of {} failed after retries", reg);
            FlightError::Transport { device: DEVICE, register: reg }
        })
    }

    fn write_register(&mut self, reg: u8, value: u8) -> FlightResult<()> {
        let addr = self.address;
        let bus = &mut self.bus;
        with_backoff(&self.config.retry, &mut self.delay, || bus.write(addr, reg, &[value])).map_err(|_| {
            log_warn!("BME280 write of {} failed after retries", reg);
            FlightError::Transport { device: DEVICE, register: reg }
        })
    }

    fn read_raw(&mut self, reg: u8) -> FlightResult<i32> {
        let mut bytes = [0u8; 3];
        self.read_registers(reg, &mut bytes)?;
        let code = raw_code(bytes);
        if self.config.verbosity.is_verbose() {
            log_debug!("BME280 raw {} = {}", reg, code);
        }
        Ok(code)
    }

    /// Temperature in °C, rounded to 0.01
    ///
    /// Updates the fine temperature used by pressure compensation.
    pub fn read_temperature(&mut self) -> Option<f32> {
        let raw = self.read_raw(BME280_REG_TEMP_MSB).ok()?;
        let result = compensate_temperature(raw, &self.calibration);
        self.t_fine = result.t_fine;

        match result.celsius {
            Some(celsius) if result.simplified => {
                log_warn!("BME280 temperature from simplified formula: {}", celsius);
            }
            None => log_warn!("BME280 temperature implausible for raw {}", raw),
            _ => {}
        }
        result.celsius
    }

    /// Pressure in Pa, rounded to 0.01
    pub fn read_pressure(&mut self) -> Option<f32> {
        let temperature_ok = self.read_temperature().is_some();
        self.pressure_from_fine_temperature(temperature_ok)
    }

    fn pressure_from_fine_temperature(&mut self, temperature_ok: bool) -> Option<f32> {
        let t_fine = if temperature_ok {
            self.t_fine
        } else {
            log_warn!("BME280 pressure with default fine temperature");
            BME280_DEFAULT_T_FINE
        };

        let raw = self.read_raw(BME280_REG_PRESS_MSB).ok()?;
        let Some(pressure) = compensate_pressure(raw, t_fine, &self.calibration) else {
            log_warn!("BME280 pressure normalizer is zero");
            return None;
        };

        let pressure = round2(pressure) as f32;
        if !(BME280_PRESSURE_MIN_PA..=BME280_PRESSURE_MAX_PA).contains(&pressure) {
            log_warn!(
                "BME280 {}",
                FlightError::OutOfRange {
                    value: pressure,
                    min: BME280_PRESSURE_MIN_PA,
                    max: BME280_PRESSURE_MAX_PA,
                }
            );
            return None;
        }
        Some(pressure)
    }

    /// Altitude in m above the ground reference, rounded to 0.01
    pub fn read_altitude(&mut self) -> Option<f32> {
        let pressure = self.read_pressure()?;
        Some(self.relative_altitude(pressure))
    }

    fn absolute_altitude(&self, pressure_pa: f32) -> f32 {
        altitude_from_pressure(pressure_pa / PA_PER_HPA, self.config.sea_level_pressure_hpa)
    }

    fn relative_altitude(&self, pressure_pa: f32) -> f32 {
        let absolute = self.absolute_altitude(pressure_pa);
        let offset = self.ground.map_or(0.0, |g| g.altitude_offset_m);
        round2(f64::from(absolute - offset)) as f32
    }

    /// Temperature, pressure and altitude from one temperature refresh
    pub fn read_all(&mut self) -> BarometerSample {
        let temperature_c = self.read_temperature();
        let pressure_pa = self.pressure_from_fine_temperature(temperature_c.is_some());
        BarometerSample {
            temperature_c,
            pressure_pa,
            altitude_m: pressure_pa.map(|p| self.relative_altitude(p)),
        }
    }

    /// Capture the launch-site reference
    ///
    /// Takes `samples` pressure readings `delay_ms` apart and keeps those in
    /// [800, 1200] hPa. With at least three, the mean pressure and mean
    /// absolute altitude become the ground reference and `true` is returned.
    /// Otherwise the reference falls back to sea level with zero offset and
    /// `false` is returned.
    pub fn calibrate_ground(&mut self, samples: u8, delay_ms: u32) -> bool {
        let mut accepted = 0usize;
        let mut pressure_sum = 0.0f64;
        let mut altitude_sum = 0.0f64;

        for _ in 0..samples {
            if let Some(pressure_pa) = self.read_pressure() {
                let hpa = pressure_pa / PA_PER_HPA;
                if (GROUND_PRESSURE_MIN_HPA..=GROUND_PRESSURE_MAX_HPA).contains(&hpa) {
                    accepted += 1;
                    pressure_sum += f64::from(hpa);
                    altitude_sum += f64::from(self.absolute_altitude(pressure_pa));
                } else {
                    log_debug!("BME280 ground sample {} hPa rejected", hpa);
                }
            }
            self.delay.delay_ms(delay_ms);
        }

        if accepted >= GROUND_MIN_ACCEPTED {
            let n = accepted as f64;
            let reference = GroundReference {
                ground_pressure_hpa: (pressure_sum / n) as f32,
                altitude_offset_m: (altitude_sum / n) as f32,
            };
            log_info!(
                "ground reference {} hPa, offset {} m from {} samples",
                reference.ground_pressure_hpa,
                reference.altitude_offset_m,
                accepted
            );
            self.ground = Some(reference);
            self.calibrated = true;
            true
        } else {
            log_warn!("ground calibration accepted {} of {} samples, using sea level", accepted, samples);
            self.ground = Some(GroundReference {
                ground_pressure_hpa: self.config.sea_level_pressure_hpa,
                altitude_offset_m: 0.0,
            });
            self.calibrated = false;
            false
        }
    }

    /// Ground reference and current altitude
    pub fn altitude_stats(&mut self) -> AltitudeStats {
        let pressure = self.read_pressure();
        AltitudeStats {
            ground: self.ground,
            calibrated: self.calibrated,
            absolute_altitude_m: pressure.map(|p| round2(f64::from(self.absolute_altitude(p))) as f32),
            relative_altitude_m: pressure.map(|p| self.relative_altitude(p)),
        }
    }

    /// Address the sensor answered at
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Calibration in use
    pub fn calibration(&self) -> &CalibrationConstants {
        &self.calibration
    }

    /// Which calibration groups came from the fallback table
    pub fn calibration_source(&self) -> CalibrationSource {
        self.source
    }

    /// Fine temperature from the last temperature read
    pub fn fine_temperature(&self) -> i32 {
        self.t_fine
    }

    /// Ground reference, once calibration has run
    pub fn ground_reference(&self) -> Option<GroundReference> {
        self.ground
    }

    /// Whether ground calibration succeeded
    pub fn is_ground_calibrated(&self) -> bool {
        self.calibrated
    }

    /// Release the bus and delay
    pub fn release(self) -> (T, D) {
        (self.bus, self.delay)
    }
}
