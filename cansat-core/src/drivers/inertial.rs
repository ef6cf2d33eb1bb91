//! MPU6050 inertial sensor driver
//!
//! Acceleration in g and rotation rate in °/s from signed 16-bit big-endian
//! register pairs. No retry: a failed read surfaces as
//! [`FlightError::Transport`] and the flight loop treats it as no reading.

use crate::constants::sensors::{
    MPU6050_ADDRESS, MPU6050_REG_ACCEL_CONFIG, MPU6050_REG_ACCEL_XOUT_H, MPU6050_REG_CONFIG,
    MPU6050_REG_FIFO_EN, MPU6050_REG_GYRO_CONFIG, MPU6050_REG_GYRO_XOUT_H, MPU6050_REG_INT_ENABLE,
    MPU6050_REG_PWR_MGMT_1, MPU6050_REG_SMPLRT_DIV, MPU6050_REG_TEMP_OUT_H, MPU6050_REG_WHO_AM_I,
    MPU6050_SAMPLE_DIVIDER, MPU6050_TEMP_OFFSET_C, MPU6050_TEMP_SENSITIVITY, MPU6050_WHO_AM_I,
};
use crate::constants::time::MPU6050_WAKE_SETTLE_MS;
use crate::errors::{FlightError, FlightResult};
use crate::traits::RegisterTransport;
use embedded_hal::delay::DelayNs;

const DEVICE: &str = "MPU6050";

/// Accelerometer full-scale range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AccelRange {
    /// ±2 g
    #[default]
    G2,
    /// ±4 g
    G4,
    /// ±8 g
    G8,
    /// ±16 g
    G16,
}

impl AccelRange {
    /// ACCEL_CONFIG register value
    pub const fn register_value(self) -> u8 {
        (self as u8) << 3
    }

    /// LSB per g
    pub const fn divisor(self) -> f32 {
        match self {
            Self::G2 => 16384.0,
            Self::G4 => 8192.0,
            Self::G8 => 4096.0,
            Self::G16 => 2048.0,
        }
    }
}

/// Gyroscope full-scale range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GyroRange {
    /// ±250 °/s
    #[default]
    Dps250,
    /// ±500 °/s
    Dps500,
    /// ±1000 °/s
    Dps1000,
    /// ±2000 °/s
    Dps2000,
}

impl GyroRange {
    /// GYRO_CONFIG register value
    pub const fn register_value(self) -> u8 {
        (self as u8) << 3
    }

    /// LSB per °/s
    pub const fn divisor(self) -> f32 {
        match self {
            Self::Dps250 => 131.0,
            Self::Dps500 => 65.5,
            Self::Dps1000 => 32.8,
            Self::Dps2000 => 16.4,
        }
    }
}

/// Inertial sensor settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InertialConfig {
    /// I2C address
    pub address: u8,
    /// Accelerometer range
    pub accel_range: AccelRange,
    /// Gyroscope range
    pub gyro_range: GyroRange,
}

impl Default for InertialConfig {
    fn default() -> Self {
        Self {
            address: MPU6050_ADDRESS,
            accel_range: AccelRange::default(),
            gyro_range: GyroRange::default(),
        }
    }
}

/// MPU6050 driver
pub struct Mpu6050<T> {
    bus: T,
    config: InertialConfig,
}

impl<T: RegisterTransport> Mpu6050<T> {
    /// Verify identity, wake the device and set sampling and ranges
    pub fn new<D: DelayNs>(bus: T, delay: &mut D, config: InertialConfig) -> FlightResult<Self> {
        let mut sensor = Self { bus, config };

        let mut id = [0u8; 1];
        sensor
            .read_registers(MPU6050_REG_WHO_AM_I, &mut id)
            .map_err(|_| FlightError::DeviceNotFound { device: DEVICE })?;
        if id[0] != MPU6050_WHO_AM_I {
            log_error!("MPU6050 WHO_AM_I {}, expected {}", id[0], MPU6050_WHO_AM_I);
            return Err(FlightError::DeviceNotFound { device: DEVICE });
        }

        sensor.write_register(MPU6050_REG_PWR_MGMT_1, 0)?;
        delay.delay_ms(MPU6050_WAKE_SETTLE_MS);

        sensor.write_register(MPU6050_REG_SMPLRT_DIV, MPU6050_SAMPLE_DIVIDER)?;
        sensor.write_register(MPU6050_REG_CONFIG, 0)?;
        sensor.write_register(MPU6050_REG_INT_ENABLE, 0)?;
        sensor.write_register(MPU6050_REG_FIFO_EN, 0)?;
        sensor.write_register(MPU6050_REG_ACCEL_CONFIG, config.accel_range.register_value())?;
        sensor.write_register(MPU6050_REG_GYRO_CONFIG, config.gyro_range.register_value())?;

        log_info!("MPU6050 ready at {}", config.address);
        Ok(sensor)
    }

    fn read_registers(&mut self, reg: u8, buf: &mut [u8]) -> FlightResult<()> {
        self.bus
            .read(self.config.address, reg, buf)
            .map_err(|_| FlightError::Transport { device: DEVICE, register: reg })
    }

    fn write_register(&mut self, reg: u8, value: u8) -> FlightResult<()> {
        self.bus
            .write(self.config.address, reg, &[value])
            .map_err(|_| FlightError::Transport { device: DEVICE, register: reg })
    }

    fn read_vector(&mut self, reg: u8, divisor: f32) -> FlightResult<[f32; 3]> {
        let mut raw = [0u8; 6];
        self.read_registers(reg, &mut raw)?;
        Ok([
            f32::from(i16::from_be_bytes([raw[0], raw[1]])) / divisor,
            f32::from(i16::from_be_bytes([raw[2], raw[3]])) / divisor,
            f32::from(i16::from_be_bytes([raw[4], raw[5]])) / divisor,
        ])
    }

    /// Acceleration (x, y, z) in g
    pub fn get_acceleration(&mut self) -> FlightResult<[f32; 3]> {
        self.read_vector(MPU6050_REG_ACCEL_XOUT_H, self.config.accel_range.divisor())
    }

    /// Rotation rate (x, y, z) in °/s
    pub fn get_rotation(&mut self) -> FlightResult<[f32; 3]> {
        self.read_vector(MPU6050_REG_GYRO_XOUT_H, self.config.gyro_range.divisor())
    }

    /// Die temperature in °C
    pub fn read_temperature(&mut self) -> FlightResult<f32> {
        let mut raw = [0u8; 2];
        self.read_registers(MPU6050_REG_TEMP_OUT_H, &mut raw)?;
        Ok(f32::from(i16::from_be_bytes(raw)) / MPU6050_TEMP_SENSITIVITY + MPU6050_TEMP_OFFSET_C)
    }

    /// Check that every accelerometer and gyroscope register pair reads
    pub fn self_test(&mut self) -> FlightResult<()> {
        let mut pair = [0u8; 2];
        for base in [MPU6050_REG_ACCEL_XOUT_H, MPU6050_REG_GYRO_XOUT_H] {
            for axis in 0..3u8 {
                self.read_registers(base + axis * 2, &mut pair)?;
            }
        }
        Ok(())
    }

    /// Ranges and address in use
    pub fn config(&self) -> &InertialConfig {
        &self.config
    }

    /// Release the bus
    pub fn release(self) -> T {
        self.bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{ManualClock, TimeSource};
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct FakeImu {
        regs: BTreeMap<u8, u8>,
        writes: Vec<(u8, u8)>,
        broken: bool,
    }

    impl FakeImu {
        fn new() -> Self {
            let mut imu = Self::default();
            imu.regs.insert(MPU6050_REG_WHO_AM_I, MPU6050_WHO_AM_I);
            imu
        }

        fn set_word(&mut self, reg: u8, value: i16) {
            let [hi, lo] = value.to_be_bytes();
            self.regs.insert(reg, hi);
            self.regs.insert(reg + 1, lo);
        }
    }

    impl RegisterTransport for FakeImu {
        type Error = ();

        fn read(&mut self, addr: u8, reg: u8, buf: &mut [u8]) -> Result<(), ()> {
            if addr != MPU6050_ADDRESS || self.broken {
                return Err(());
            }
            for (i, b) in buf.iter_mut().enumerate() {
                *b = self.regs.get(&(reg + i as u8)).copied().unwrap_or(0);
            }
            Ok(())
        }

        fn write(&mut self, _addr: u8, reg: u8, bytes: &[u8]) -> Result<(), ()> {
            self.writes.push((reg, bytes[0]));
            Ok(())
        }

        fn probe(&mut self, addr: u8) -> bool {
            addr == MPU6050_ADDRESS
        }
    }

    #[test]
    fn init_sequence_and_wake_delay() {
        let mut clock = ManualClock::new(0);
        let imu = Mpu6050::new(FakeImu::new(), &mut clock, InertialConfig::default()).unwrap();
        assert_eq!(clock.now(), 100);
        assert_eq!(
            imu.release().writes,
            vec![(0x6B, 0), (0x19, 7), (0x1A, 0), (0x38, 0), (0x23, 0), (0x1C, 0), (0x1B, 0)]
        );
    }

    #[test]
    fn wrong_identity_is_not_found() {
        let mut bus = FakeImu::new();
        bus.regs.insert(MPU6050_REG_WHO_AM_I, 0x70);
        let err = Mpu6050::new(bus, &mut ManualClock::new(0), InertialConfig::default()).err();
        assert_eq!(err, Some(FlightError::DeviceNotFound { device: "MPU6050" }));
    }

    #[test]
    fn scales_signed_registers() {
        let mut bus = FakeImu::new();
        bus.set_word(0x3B, 16384);
        bus.set_word(0x3D, -8192);
        bus.set_word(0x3F, 0);
        bus.set_word(0x43, 131);
        bus.set_word(0x45, -262);
        bus.set_word(0x47, 1310);
        bus.set_word(0x41, 340);

        let mut imu = Mpu6050::new(bus, &mut ManualClock::new(0), InertialConfig::default()).unwrap();
        assert_eq!(imu.get_acceleration().unwrap(), [1.0, -0.5, 0.0]);
        assert_eq!(imu.get_rotation().unwrap(), [1.0, -2.0, 10.0]);
        assert!((imu.read_temperature().unwrap() - 37.53).abs() < 1e-4);
    }

    #[test]
    fn configured_range_changes_scale() {
        let mut bus = FakeImu::new();
        bus.set_word(0x3B, 2048);
        let config = InertialConfig { accel_range: AccelRange::G16, ..InertialConfig::default() };
        let mut imu = Mpu6050::new(bus, &mut ManualClock::new(0), config).unwrap();
        assert_eq!(imu.get_acceleration().unwrap()[0], 1.0);
    }

    #[test]
    fn bus_failure_is_transport_error() {
        let mut imu = Mpu6050::new(FakeImu::new(), &mut ManualClock::new(0), InertialConfig::default()).unwrap();
        assert!(imu.self_test().is_ok());
        imu.bus.broken = true;
        assert_eq!(
            imu.get_acceleration(),
            Err(FlightError::Transport { device: "MPU6050", register: 0x3B })
        );
        assert!(imu.self_test().is_err());
    }
}
