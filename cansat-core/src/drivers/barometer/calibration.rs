//! BME280 factory calibration constants
//!
//! Twelve words are read once at init from 0x88..=0x9F (little-endian, as
//! laid out in the datasheet). Each group is validated against its legal
//! range and any group with an illegal word is replaced wholesale by the
//! documented table in [`crate::constants::sensors`]. Group validity is
//! reported in [`CalibrationSource`]; loading never fails.
//!
//! | Word      | Type | Legal range (exclusive) |
//! |-----------|------|-------------------------|
//! | T1, P1    | u16  | (0, 65535)              |
//! | T2, T3    | i16  | (−32768, 32767)         |
//! | P2 ..= P9 | i16  | (−32768, 32767)         |

use crate::constants::sensors::{
    BME280_CALIBRATION_LEN, FALLBACK_P1, FALLBACK_P2, FALLBACK_P3, FALLBACK_P4, FALLBACK_P5,
    FALLBACK_P6, FALLBACK_P7, FALLBACK_P8, FALLBACK_P9, FALLBACK_T1, FALLBACK_T2, FALLBACK_T3,
};
use crate::errors::{FlightError, FlightResult};

/// Temperature and pressure compensation coefficients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct CalibrationConstants {
    pub t1: u16,
    pub t2: i16,
    pub t3: i16,
    pub p1: u16,
    pub p2: i16,
    pub p3: i16,
    pub p4: i16,
    pub p5: i16,
    pub p6: i16,
    pub p7: i16,
    pub p8: i16,
    pub p9: i16,
}

/// Which groups came from the fallback table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CalibrationSource {
    /// T1..T3 replaced
    pub temperature_fallback: bool,
    /// P1..P9 replaced
    pub pressure_fallback: bool,
}

impl CalibrationSource {
    /// Whether any factory constant was discarded
    pub fn any_fallback(&self) -> bool {
        self.temperature_fallback || self.pressure_fallback
    }
}

fn legal_unsigned(word: u16) -> bool {
    word > 0 && word < u16::MAX
}

fn legal_signed(word: i16) -> bool {
    word > i16::MIN && word < i16::MAX
}

impl CalibrationConstants {
    /// Documented fallback table (Bosch datasheet worked example)
    pub const FALLBACK: Self = Self {
        t1: FALLBACK_T1,
        t2: FALLBACK_T2,
        t3: FALLBACK_T3,
        p1: FALLBACK_P1,
        p2: FALLBACK_P2,
        p3: FALLBACK_P3,
        p4: FALLBACK_P4,
        p5: FALLBACK_P5,
        p6: FALLBACK_P6,
        p7: FALLBACK_P7,
        p8: FALLBACK_P8,
        p9: FALLBACK_P9,
    };

    /// Decode the 24-byte block starting at 0x88
    pub fn from_registers(raw: &[u8; BME280_CALIBRATION_LEN]) -> Self {
        let unsigned = |i: usize| u16::from_le_bytes([raw[i], raw[i + 1]]);
        let signed = |i: usize| i16::from_le_bytes([raw[i], raw[i + 1]]);
        Self {
            t1: unsigned(0),
            t2: signed(2),
            t3: signed(4),
            p1: unsigned(6),
            p2: signed(8),
            p3: signed(10),
            p4: signed(12),
            p5: signed(14),
            p6: signed(16),
            p7: signed(18),
            p8: signed(20),
            p9: signed(22),
        }
    }

    /// Encode as the 24-byte register block, the inverse of [`Self::from_registers`]
    pub fn to_registers(&self) -> [u8; BME280_CALIBRATION_LEN] {
        let words = [
            self.t1.to_le_bytes(),
            self.t2.to_le_bytes(),
            self.t3.to_le_bytes(),
            self.p1.to_le_bytes(),
            self.p2.to_le_bytes(),
            self.p3.to_le_bytes(),
            self.p4.to_le_bytes(),
            self.p5.to_le_bytes(),
            self.p6.to_le_bytes(),
            self.p7.to_le_bytes(),
            self.p8.to_le_bytes(),
            self.p9.to_le_bytes(),
        ];
        let mut raw = [0u8; BME280_CALIBRATION_LEN];
        for (chunk, word) in raw.chunks_exact_mut(2).zip(words.iter()) {
            chunk.copy_from_slice(word);
        }
        raw
    }

    /// Check T1..T3 against their legal ranges
    pub fn validate_temperature(&self) -> FlightResult<()> {
        if legal_unsigned(self.t1) && legal_signed(self.t2) && legal_signed(self.t3) {
            Ok(())
        } else {
            Err(FlightError::Calibration { reason: "temperature constants out of range" })
        }
    }

    /// Check P1..P9 against their legal ranges
    pub fn validate_pressure(&self) -> FlightResult<()> {
        let signed = [self.p2, self.p3, self.p4, self.p5, self.p6, self.p7, self.p8, self.p9];
        if legal_unsigned(self.p1) && signed.iter().all(|&w| legal_signed(w)) {
            Ok(())
        } else {
            Err(FlightError::Calibration { reason: "pressure constants out of range" })
        }
    }

    /// Replace every invalid group with the fallback table
    pub fn sanitized(self) -> (Self, CalibrationSource) {
        let fallback = Self::FALLBACK;
        let mut constants = self;
        let mut source = CalibrationSource::default();

        if let Err(err) = self.validate_temperature() {
            log_warn!("BME280 {}, using fallback T1..T3", err);
            constants.t1 = fallback.t1;
            constants.t2 = fallback.t2;
            constants.t3 = fallback.t3;
            source.temperature_fallback = true;
        }

        if let Err(err) = self.validate_pressure() {
            log_warn!("BME280 {}, using fallback P1..P9", err);
            constants.p1 = fallback.p1;
            constants.p2 = fallback.p2;
            constants.p3 = fallback.p3;
            constants.p4 = fallback.p4;
            constants.p5 = fallback.p5;
            constants.p6 = fallback.p6;
            constants.p7 = fallback.p7;
            constants.p8 = fallback.p8;
            constants.p9 = fallback.p9;
            source.pressure_fallback = true;
        }

        (constants, source)
    }
}
