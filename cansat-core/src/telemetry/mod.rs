//! Telemetry persistence
//!
//! ## Overview
//!
//! Two append-only CSV files per session:
//!
//! ```text
//! data_{session}.csv    timestamp,temperature,pressure,altitude,ax,ay,az,gx,gy,gz,latitude,longitude
//! events_{session}.csv  timestamp,event,state,altitude,details
//! ```
//!
//! Data rows are buffered by the [`TelemetryRecorder`] and flushed on an
//! interval; event lines are written as soon as they happen. Storage is
//! reached only through [`TelemetrySink`], so the recorder runs unchanged
//! over an SD card, a host file ([`FileSink`]) or memory ([`MemorySink`]).
//!
//! ## Module Organization
//!
//! - `csv` - field formatting shared with event records
//! - `recorder` - buffering and flush policy
//! - `memory` - in-memory sink (requires `std`)
//! - `file` - host file sink (requires `std`)

use core::fmt::{Debug, Write};

use crate::errors::FlightResult;
use crate::events::EVENT_HEADER;
use crate::time::Timestamp;

pub mod csv;
pub mod recorder;

#[cfg(feature = "std")]
pub mod file;

#[cfg(feature = "std")]
pub mod memory;

pub use csv::{CsvLine, CSV_LINE_CAPACITY, MISSING};
pub use recorder::{RecorderStats, TelemetryRecorder, DEFAULT_BUFFER_ROWS};

#[cfg(feature = "std")]
pub use file::FileSink;

#[cfg(feature = "std")]
pub use memory::MemorySink;

/// Header line of the data file
pub const DATA_HEADER: &str = "timestamp,temperature,pressure,altitude,ax,ay,az,gx,gy,gz,latitude,longitude";

/// The two files of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LogFile {
    /// Sensor rows
    Data,
    /// Flight events
    Events,
}

impl LogFile {
    /// Header line written when the file is created
    pub const fn header(&self) -> &'static str {
        match self {
            Self::Data => DATA_HEADER,
            Self::Events => EVENT_HEADER,
        }
    }

    /// File name prefix
    pub const fn prefix(&self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Events => "events",
        }
    }
}

/// Append-only line storage
///
/// ## Contract
///
/// - `append` adds one line; the sink supplies the line terminator
/// - Lines appear in the order they were appended
/// - After `sync` returns `Ok`, every appended line is durable
pub trait TelemetrySink {
    /// Storage error
    type Error: Debug;

    /// Append one line to `file`
    fn append(&mut self, file: LogFile, line: &str) -> Result<(), Self::Error>;

    /// Make appended lines durable
    fn sync(&mut self) -> Result<(), Self::Error>;

    /// Whether `file` already holds lines, such as a reopened session
    fn has_lines(&self, _file: LogFile) -> bool {
        false
    }
}

impl<T: TelemetrySink + ?Sized> TelemetrySink for &mut T {
    type Error = T::Error;

    fn append(&mut self, file: LogFile, line: &str) -> Result<(), Self::Error> {
        (**self).append(file, line)
    }

    fn sync(&mut self) -> Result<(), Self::Error> {
        (**self).sync()
    }

    fn has_lines(&self, file: LogFile) -> bool {
        (**self).has_lines(file)
    }
}

/// Sensor values sampled in one tick
///
/// Each field is `None` when its sensor was unavailable or the read failed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhysicalReading {
    /// Sample time
    pub timestamp: Timestamp,
    /// Barometer temperature (°C)
    pub temperature_c: Option<f32>,
    /// Pressure (Pa)
    pub pressure_pa: Option<f32>,
    /// Altitude above the ground reference (m)
    pub altitude_m: Option<f32>,
    /// Acceleration (g)
    pub accel_g: Option<[f32; 3]>,
    /// Rotation rate (°/s)
    pub gyro_dps: Option<[f32; 3]>,
}

/// One line of the data file
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TelemetryRow {
    /// Sensor values
    pub reading: PhysicalReading,
    /// GPS latitude and longitude, if a position is known
    pub position: Option<(f64, f64)>,
}

impl TelemetryRow {
    /// Row from a reading and the current position
    pub fn new(reading: PhysicalReading, position: Option<(f64, f64)>) -> Self {
        Self { reading, position }
    }

    /// Format as a data file line
    ///
    /// Pressure is written in hPa.
    pub fn to_csv(&self) -> FlightResult<CsvLine> {
        let r = &self.reading;
        csv::line(|out| {
            csv::push_timestamp(out, r.timestamp)?;
            out.write_char(',')?;
            csv::push_optional(out, r.temperature_c)?;
            out.write_char(',')?;
            csv::push_optional(out, r.pressure_pa.map(|pa| pa / crate::constants::PA_PER_HPA))?;
            out.write_char(',')?;
            csv::push_optional(out, r.altitude_m)?;
            for vector in [r.accel_g, r.gyro_dps] {
                for axis in 0..3 {
                    out.write_char(',')?;
                    csv::push_optional(out, vector.map(|v| v[axis]))?;
                }
            }
            out.write_char(',')?;
            csv::push_optional(out, self.position.map(|p| p.0))?;
            out.write_char(',')?;
            csv::push_optional(out, self.position.map(|p| p.1))
        })
    }
}
