//! BME280 compensation formulas
//!
//! Double-precision variants from section 8.1 of the Bosch datasheet. Both
//! work on the 20-bit raw ADC codes; pressure also needs the integer fine
//! temperature produced by temperature compensation.

use crate::constants::physics::{ALTITUDE_EXPONENT, ALTITUDE_SCALE_M};
use crate::constants::sensors::{BME280_TEMP_MAX_C, BME280_TEMP_MIN_C};

use super::calibration::CalibrationConstants;

/// Result of temperature compensation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureCompensation {
    /// Fine temperature for pressure compensation, truncated toward zero
    pub t_fine: i32,
    /// Temperature rounded to 0.01 °C, `None` if implausible
    pub celsius: Option<f32>,
    /// Whether the simplified `t_fine / 5120` formula produced the value
    pub simplified: bool,
}

/// Round to two decimal places
pub(crate) fn round2(value: f64) -> f64 {
    libm::round(value * 100.0) / 100.0
}

fn plausible_temperature(celsius: f64) -> bool {
    (f64::from(BME280_TEMP_MIN_C)..=f64::from(BME280_TEMP_MAX_C)).contains(&celsius)
}

/// Compensate a raw temperature code
///
/// The two-term result is used when it lies in [-40, 85] °C. Otherwise the
/// simplified `t_fine / 5120` is tried, and if that is implausible too the
/// reading is `None`. `t_fine` is kept either way.
pub fn compensate_temperature(raw: i32, cal: &CalibrationConstants) -> TemperatureCompensation {
    let raw = f64::from(raw);
    let t1 = f64::from(cal.t1);

    let var1 = (raw / 16384.0 - t1 / 1024.0) * f64::from(cal.t2);
    let delta = raw / 131072.0 - t1 / 8192.0;
    let var2 = delta * delta * f64::from(cal.t3);
    let t_fine = (var1 + var2) as i32;

    let celsius = (var1 + var2) / 5120.0;
    if plausible_temperature(celsius) {
        return TemperatureCompensation {
            t_fine,
            celsius: Some(round2(celsius) as f32),
            simplified: false,
        };
    }

    let simplified = f64::from(t_fine) / 5120.0;
    TemperatureCompensation {
        t_fine,
        celsius: plausible_temperature(simplified).then(|| round2(simplified) as f32),
        simplified: true,
    }
}

/// Compensate a raw pressure code to pascals
///
/// Returns `None` when the normalizing term is exactly zero. The result is
/// not range-checked.
pub fn compensate_pressure(raw: i32, t_fine: i32, cal: &CalibrationConstants) -> Option<f64> {
    let mut var1 = f64::from(t_fine) / 2.0 - 64000.0;
    let mut var2 = var1 * var1 * f64::from(cal.p6) / 32768.0;
    var2 += var1 * f64::from(cal.p5) * 2.0;
    var2 = var2 / 4.0 + f64::from(cal.p4) * 65536.0;
    var1 = (f64::from(cal.p3) * var1 * var1 / 524288.0 + f64::from(cal.p2) * var1) / 524288.0;
    var1 = (1.0 + var1 / 32768.0) * f64::from(cal.p1);

    if var1 == 0.0 {
        return None;
    }

    let mut pressure = 1048576.0 - f64::from(raw);
    pressure = (pressure - var2 / 4096.0) * 6250.0 / var1;
    let var1 = f64::from(cal.p9) * pressure * pressure / 2147483648.0;
    let var2 = pressure * f64::from(cal.p8) / 32768.0;
    pressure += (var1 + var2 + f64::from(cal.p7)) / 16.0;

    Some(pressure)
}

/// Altitude above the reference pressure level (meters)
///
/// `h = 44330 · (1 − (P / P0)^0.1903)`. Both pressures must be positive and
/// in the same unit.
pub fn altitude_from_pressure(pressure: f32, reference: f32) -> f32 {
    debug_assert!(pressure > 0.0 && reference > 0.0);
    let ratio = f64::from(pressure) / f64::from(reference);
    (ALTITUDE_SCALE_M * (1.0 - libm::pow(ratio, ALTITUDE_EXPONENT))) as f32
}

/// Assemble a 20-bit ADC code from its msb, lsb and xlsb registers
pub fn raw_code(bytes: [u8; 3]) -> i32 {
    (i32::from(bytes[0]) << 12) | (i32::from(bytes[1]) << 4) | (i32::from(bytes[2]) >> 4)
}
