//! Sensor drivers
//!
//! Each driver owns its transport exclusively. Bring-up errors are returned
//! to the caller; after bring-up the barometer never errors (its reads return
//! `None`), while the inertial sensor surfaces transport errors for the flight
//! loop to treat as missing data.
//!
//! | Driver | Part | Interface |
//! |--------|------|-----------|
//! | [`Bme280`] | Bosch BME280 | I2C, 0x76 / 0x77 |
//! | [`Mpu6050`] | InvenSense MPU6050 | I2C, 0x68 |
//! | [`GpsReceiver`] | u-blox NEO-6M | UART NMEA, 9600 baud |

pub mod barometer;
pub mod inertial;
pub mod positioning;

pub use barometer::{
    AltitudeStats, BarometerConfig, BarometerSample, Bme280, CalibrationConstants, CalibrationSource,
    GroundReference,
};
pub use inertial::{AccelRange, GyroRange, InertialConfig, Mpu6050};
pub use positioning::{GpsFix, GpsReceiver, SentenceStats};
