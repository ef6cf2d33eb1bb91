//! NEO-6M positioning receiver
//!
//! ## Overview
//!
//! Bytes are pulled from a non-blocking [`Stream`] into a bounded line
//! buffer. Each complete line starting with `$` is checked and dispatched:
//!
//! ```text
//! $GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47
//!  └───────────── XOR of these bytes ──────────────────────────┘ └┘
//!                                                            checksum
//! ```
//!
//! - **GGA**: fix quality, latitude, longitude, satellites, altitude
//! - **RMC**: UTC time, date, ground speed
//!
//! Any two-letter talker is accepted (`GP`, `GN`, `GL`, ...). Sentences with a
//! bad checksum, too few fields or unparsable values are dropped whole: a
//! sentence either updates the fix completely or not at all.
//!
//! ## Stale Data
//!
//! The [`GpsFix`] is overwritten field by field. A GGA sentence reporting no
//! fix leaves every previous value in place, so a momentary loss of lock
//! keeps the last known position.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::constants::physics::KNOTS_TO_KMH;
use crate::constants::sensors::{COORDINATE_DECIMALS, NMEA_LINE_CAPACITY, NMEA_MIN_FIELDS};
use crate::constants::time::GPS_UPDATE_INTERVAL_MS;
use crate::time::{elapsed_ms, TimeSource, Timestamp};
use crate::traits::Stream;

/// Last known receiver output
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GpsFix {
    /// Decimal degrees, south negative
    pub latitude: Option<f64>,
    /// Decimal degrees, west negative
    pub longitude: Option<f64>,
    /// Antenna altitude above mean sea level (m)
    pub altitude: Option<f32>,
    /// Ground speed (km/h)
    pub speed_kmh: Option<f32>,
    /// Satellites used in the solution
    pub satellites: Option<u8>,
    /// UTC time of the last RMC sentence
    pub utc_time: Option<NaiveTime>,
    /// UTC date of the last RMC sentence
    pub utc_date: Option<NaiveDate>,
    /// GGA fix quality of the last sentence that had a fix, 0 before any
    pub fix_quality: u8,
}

/// Sentence counters since construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SentenceStats {
    /// GGA or RMC sentences applied
    pub accepted: u32,
    /// Lines dropped for a missing or wrong checksum
    pub checksum_rejected: u32,
    /// Valid sentences of other types
    pub unsupported: u32,
    /// GGA or RMC sentences with too few fields or bad values
    pub malformed: u32,
    /// Lines longer than the line buffer
    pub overflowed: u32,
    /// Read errors reported by the serial stream
    pub line_errors: u32,
}

#[derive(Debug)]
struct Malformed;

type Parsed<T> = Result<T, Malformed>;

/// NMEA receiver over a byte stream
pub struct GpsReceiver<S, C> {
    serial: S,
    clock: C,
    interval_ms: u64,
    last_update: Option<Timestamp>,
    line: heapless::String<NMEA_LINE_CAPACITY>,
    overflow: bool,
    fix: GpsFix,
    stats: SentenceStats,
}

impl<S, C> GpsReceiver<S, C>
where
    S: Stream<Item = u8>,
    C: TimeSource,
{
    /// Receiver polled at most once per second
    pub fn new(serial: S, clock: C) -> Self {
        Self::with_interval(serial, clock, GPS_UPDATE_INTERVAL_MS)
    }

    /// Receiver with a custom minimum interval between updates
    pub fn with_interval(serial: S, clock: C, interval_ms: u64) -> Self {
        Self {
            serial,
            clock,
            interval_ms,
            last_update: None,
            line: heapless::String::new(),
            overflow: false,
            fix: GpsFix::default(),
            stats: SentenceStats::default(),
        }
    }

    /// Drain pending bytes and apply complete sentences
    ///
    /// Returns `false` without reading if the previous update was less than
    /// the interval ago, `true` otherwise.
    pub fn update(&mut self) -> bool {
        let now = self.clock.now();
        if let Some(last) = self.last_update {
            if elapsed_ms(last, now) < self.interval_ms {
                return false;
            }
        }

        loop {
            match self.serial.poll_next() {
                Ok(byte) => self.push_byte(byte),
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(_)) => {
                    self.stats.line_errors += 1;
                    log_warn!("GPS serial read error");
                    break;
                }
            }
        }

        self.last_update = Some(now);
        true
    }

    fn push_byte(&mut self, byte: u8) {
        match byte {
            b'\n' => {
                if core::mem::take(&mut self.overflow) {
                    self.stats.overflowed += 1;
                } else {
                    let line = core::mem::take(&mut self.line);
                    self.process_line(line.trim());
                }
            }
            b'\r' => {}
            _ if !byte.is_ascii() || self.overflow => {}
            _ => {
                if self.line.push(char::from(byte)).is_err() {
                    self.overflow = true;
                    self.line.clear();
                }
            }
        }
    }

    fn process_line(&mut self, line: &str) {
        let Some(sentence) = line.strip_prefix('$') else {
            return;
        };
        let Some(body) = verify_checksum(sentence) else {
            self.stats.checksum_rejected += 1;
            log_debug!("GPS checksum mismatch");
            return;
        };

        let kind = body.split(',').next().unwrap_or_default();
        let applied = match kind.get(2..) {
            Some("GGA") if kind.len() == 5 => self.apply_gga(body),
            Some("RMC") if kind.len() == 5 => self.apply_rmc(body),
            _ => {
                self.stats.unsupported += 1;
                return;
            }
        };

        match applied {
            Ok(()) => self.stats.accepted += 1,
            Err(Malformed) => {
                self.stats.malformed += 1;
                log_debug!("GPS sentence malformed");
            }
        }
    }

    fn apply_gga(&mut self, body: &str) -> Parsed<()> {
        let parts = fields(body)?;
        let quality: u8 = parse_field(parts[6])?.ok_or(Malformed)?;
        if quality == 0 {
            return Ok(());
        }

        let latitude = parse_coordinate(parts[2], parts[3], 2)?;
        let longitude = parse_coordinate(parts[4], parts[5], 3)?;
        let satellites: Option<u8> = parse_field(parts[7])?;
        let altitude: Option<f32> = parse_field(parts[9])?;

        let fix = &mut self.fix;
        fix.latitude = latitude.or(fix.latitude);
        fix.longitude = longitude.or(fix.longitude);
        fix.satellites = satellites.or(fix.satellites);
        fix.altitude = altitude.or(fix.altitude);
        fix.fix_quality = quality;
        Ok(())
    }

    fn apply_rmc(&mut self, body: &str) -> Parsed<()> {
        let parts = fields(body)?;
        let time = parse_time(parts[1])?;
        let date = parse_date(parts[9])?;
        let knots: Option<f32> = parse_field(parts[7])?;

        let fix = &mut self.fix;
        fix.utc_time = time.or(fix.utc_time);
        fix.utc_date = date.or(fix.utc_date);
        fix.speed_kmh = knots.map(|k| k * KNOTS_TO_KMH).or(fix.speed_kmh);
        Ok(())
    }

    /// Latest latitude and longitude, after an update pass
    pub fn get_position(&mut self) -> Option<(f64, f64)> {
        self.update();
        self.fix.latitude.zip(self.fix.longitude)
    }

    /// Whether the receiver reports a fix, after an update pass
    pub fn has_fix(&mut self) -> bool {
        self.update();
        self.fix.fix_quality > 0
    }

    /// Current fix
    pub fn fix(&self) -> &GpsFix {
        &self.fix
    }

    /// Altitude above mean sea level (m)
    pub fn altitude(&self) -> Option<f32> {
        self.fix.altitude
    }

    /// Ground speed (km/h)
    pub fn speed_kmh(&self) -> Option<f32> {
        self.fix.speed_kmh
    }

    /// Satellites in use
    pub fn satellites(&self) -> Option<u8> {
        self.fix.satellites
    }

    /// UTC date and time, once both have been received
    pub fn datetime(&self) -> Option<NaiveDateTime> {
        Some(self.fix.utc_date?.and_time(self.fix.utc_time?))
    }

    /// Sentence counters
    pub fn stats(&self) -> SentenceStats {
        self.stats
    }

    /// Release the serial stream
    pub fn release(self) -> S {
        self.serial
    }
}

/// Strip and verify `*hh`, returning the text between `$` and `*`
fn verify_checksum(sentence: &str) -> Option<&str> {
    let (body, checksum) = sentence.rsplit_once('*')?;
    if checksum.len() != 2 || !checksum.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let expected = u8::from_str_radix(checksum, 16).ok()?;
    let actual = body.bytes().fold(0u8, |acc, b| acc ^ b);
    (actual == expected).then_some(body)
}

fn fields(body: &str) -> Parsed<heapless::Vec<&str, 24>> {
    let mut parts = heapless::Vec::new();
    for part in body.split(',') {
        parts.push(part).map_err(|_| Malformed)?;
    }
    if parts.len() < NMEA_MIN_FIELDS {
        return Err(Malformed);
    }
    Ok(parts)
}

fn parse_field<T: core::str::FromStr>(field: &str) -> Parsed<Option<T>> {
    if field.is_empty() {
        return Ok(None);
    }
    field.parse().map(Some).map_err(|_| Malformed)
}

fn round_coordinate(value: f64) -> f64 {
    let scale = libm::pow(10.0, f64::from(COORDINATE_DECIMALS));
    libm::round(value * scale) / scale
}

/// `ddmm.mmmm` / `dddmm.mmmm` plus hemisphere to signed decimal degrees
fn parse_coordinate(value: &str, hemisphere: &str, degree_digits: usize) -> Parsed<Option<f64>> {
    if value.is_empty() || hemisphere.is_empty() {
        return Ok(None);
    }
    let degrees: f64 = value.get(..degree_digits).ok_or(Malformed)?.parse().map_err(|_| Malformed)?;
    let minutes: f64 = value.get(degree_digits..).ok_or(Malformed)?.parse().map_err(|_| Malformed)?;
    let decimal = degrees + minutes / 60.0;

    let signed = match hemisphere {
        "N" | "E" => decimal,
        "S" | "W" => -decimal,
        _ => return Err(Malformed),
    };
    Ok(Some(round_coordinate(signed)))
}

fn two_digits(text: &str, at: usize) -> Parsed<u32> {
    text.get(at..at + 2).ok_or(Malformed)?.parse().map_err(|_| Malformed)
}

/// `hhmmss[.sss]`
fn parse_time(field: &str) -> Parsed<Option<NaiveTime>> {
    if field.is_empty() {
        return Ok(None);
    }
    let hours = two_digits(field, 0)?;
    let minutes = two_digits(field, 2)?;
    let seconds = two_digits(field, 4)?;
    NaiveTime::from_hms_opt(hours, minutes, seconds).map(Some).ok_or(Malformed)
}

/// `ddmmyy`, century 2000
fn parse_date(field: &str) -> Parsed<Option<NaiveDate>> {
    if field.is_empty() {
        return Ok(None);
    }
    let day = two_digits(field, 0)?;
    let month = two_digits(field, 2)?;
    let year = two_digits(field, 4)? as i32 + 2000;
    NaiveDate::from_ymd_opt(year, month, day).map(Some).ok_or(Malformed)
}
