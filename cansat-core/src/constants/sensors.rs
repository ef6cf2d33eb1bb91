//! Sensor Register Maps and Specifications
//!
//! ## BME280 (barometer)
//!
//! Bosch BME280 datasheet rev 1.6. Only the temperature and pressure paths
//! are used; humidity stays disabled.
//!
//! ## MPU6050 (inertial)
//!
//! InvenSense MPU-6000/6050 register map rev 4.2.
//!
//! ## NEO-6M (positioning)
//!
//! u-blox NMEA 0183 output at 9600 baud, GGA and RMC sentences.

// ===== BME280 =====

/// I2C addresses probed during discovery, in order (SDO low, SDO high).
pub const BME280_ADDRESSES: [u8; 2] = [0x76, 0x77];

/// Chip identification register.
pub const BME280_REG_CHIP_ID: u8 = 0xD0;

/// Expected chip identification value.
pub const BME280_CHIP_ID: u8 = 0x60;

/// Soft reset register.
pub const BME280_REG_RESET: u8 = 0xE0;

/// Value that triggers a soft reset.
pub const BME280_RESET_COMMAND: u8 = 0xB6;

/// First calibration register (dig_T1 LSB).
pub const BME280_REG_CALIBRATION: u8 = 0x88;

/// Length of the temperature and pressure calibration block.
pub const BME280_CALIBRATION_LEN: usize = 24;

/// Measurement control register (oversampling and mode).
pub const BME280_REG_CTRL_MEAS: u8 = 0xF4;

/// Standby and IIR filter configuration register.
pub const BME280_REG_CONFIG: u8 = 0xF5;

/// Pressure data MSB (0xF7..=0xF9).
pub const BME280_REG_PRESS_MSB: u8 = 0xF7;

/// Temperature data MSB (0xFA..=0xFC).
pub const BME280_REG_TEMP_MSB: u8 = 0xFA;

/// Oversampling ×2 field value.
pub const BME280_OVERSAMPLING_X2: u8 = 0b010;

/// Oversampling ×16 field value.
pub const BME280_OVERSAMPLING_X16: u8 = 0b101;

/// Normal (continuous) power mode.
pub const BME280_MODE_NORMAL: u8 = 0b11;

/// ctrl_meas: temperature ×2, pressure ×16, normal mode.
pub const BME280_CTRL_MEAS_VALUE: u8 =
    (BME280_OVERSAMPLING_X2 << 5) | (BME280_OVERSAMPLING_X16 << 2) | BME280_MODE_NORMAL;

/// config: 62.5 ms standby, IIR filter coefficient 16.
pub const BME280_CONFIG_VALUE: u8 = (0b001 << 5) | (0b100 << 2);

/// Plausible compensated temperature range (°C).
pub const BME280_TEMP_MIN_C: f32 = -40.0;

/// Upper bound of the plausible temperature range (°C).
pub const BME280_TEMP_MAX_C: f32 = 85.0;

/// Plausible compensated pressure range (Pa).
pub const BME280_PRESSURE_MIN_PA: f32 = 30_000.0;

/// Upper bound of the plausible pressure range (Pa).
pub const BME280_PRESSURE_MAX_PA: f32 = 120_000.0;

/// Fine temperature assumed when no valid temperature reading exists.
pub const BME280_DEFAULT_T_FINE: i32 = 100_000;

/// Ground calibration accepts pressures in this range (hPa).
pub const GROUND_PRESSURE_MIN_HPA: f32 = 800.0;

/// Upper bound of accepted ground calibration pressure (hPa).
pub const GROUND_PRESSURE_MAX_HPA: f32 = 1200.0;

/// Accepted samples required to commit a ground reference.
pub const GROUND_MIN_ACCEPTED: usize = 3;

/// Register access attempts before a transport error surfaces.
pub const REGISTER_RETRY_ATTEMPTS: u8 = 3;

/// Delay between register access attempts (milliseconds).
pub const REGISTER_RETRY_BACKOFF_MS: u32 = 100;

// ===== BME280 CALIBRATION FALLBACK TABLE =====
//
// Substituted group-wise when the factory constants fail validation. The
// values are the worked example of the Bosch datasheet (section 8.2), which
// compensate to roughly 25 °C and 1006 hPa.

/// Fallback dig_T1.
pub const FALLBACK_T1: u16 = 27504;
/// Fallback dig_T2.
pub const FALLBACK_T2: i16 = 26435;
/// Fallback dig_T3.
pub const FALLBACK_T3: i16 = -1000;
/// Fallback dig_P1.
pub const FALLBACK_P1: u16 = 36477;
/// Fallback dig_P2.
pub const FALLBACK_P2: i16 = -10685;
/// Fallback dig_P3.
pub const FALLBACK_P3: i16 = 3024;
/// Fallback dig_P4.
pub const FALLBACK_P4: i16 = 2855;
/// Fallback dig_P5.
pub const FALLBACK_P5: i16 = 140;
/// Fallback dig_P6.
pub const FALLBACK_P6: i16 = -7;
/// Fallback dig_P7.
pub const FALLBACK_P7: i16 = 15500;
/// Fallback dig_P8.
pub const FALLBACK_P8: i16 = -14600;
/// Fallback dig_P9.
pub const FALLBACK_P9: i16 = 6000;

// ===== MPU6050 =====

/// Default I2C address (AD0 low).
pub const MPU6050_ADDRESS: u8 = 0x68;

/// WHO_AM_I register.
pub const MPU6050_REG_WHO_AM_I: u8 = 0x75;

/// Expected WHO_AM_I value.
pub const MPU6050_WHO_AM_I: u8 = 0x68;

/// Power management 1 register.
pub const MPU6050_REG_PWR_MGMT_1: u8 = 0x6B;

/// Sample rate divider register.
pub const MPU6050_REG_SMPLRT_DIV: u8 = 0x19;

/// DLPF configuration register.
pub const MPU6050_REG_CONFIG: u8 = 0x1A;

/// Gyroscope full-scale configuration register.
pub const MPU6050_REG_GYRO_CONFIG: u8 = 0x1B;

/// Accelerometer full-scale configuration register.
pub const MPU6050_REG_ACCEL_CONFIG: u8 = 0x1C;

/// FIFO enable register.
pub const MPU6050_REG_FIFO_EN: u8 = 0x23;

/// Interrupt enable register.
pub const MPU6050_REG_INT_ENABLE: u8 = 0x38;

/// First accelerometer output register (ACCEL_XOUT_H).
pub const MPU6050_REG_ACCEL_XOUT_H: u8 = 0x3B;

/// Temperature output register (TEMP_OUT_H).
pub const MPU6050_REG_TEMP_OUT_H: u8 = 0x41;

/// First gyroscope output register (GYRO_XOUT_H).
pub const MPU6050_REG_GYRO_XOUT_H: u8 = 0x43;

/// Sample rate divider: 1 kHz / (1 + 7) = 125 Hz.
pub const MPU6050_SAMPLE_DIVIDER: u8 = 7;

/// Die temperature sensitivity (LSB/°C).
pub const MPU6050_TEMP_SENSITIVITY: f32 = 340.0;

/// Die temperature offset (°C).
pub const MPU6050_TEMP_OFFSET_C: f32 = 36.53;

// ===== NEO-6M =====

/// Default UART baud rate.
pub const GPS_BAUD_RATE: u32 = 9600;

/// Line buffer capacity. NMEA caps sentences at 82 characters.
pub const NMEA_LINE_CAPACITY: usize = 96;

/// Minimum comma-separated fields in an accepted GGA or RMC sentence.
pub const NMEA_MIN_FIELDS: usize = 10;

/// Decimal places kept for latitude and longitude.
pub const COORDINATE_DECIMALS: i32 = 6;
