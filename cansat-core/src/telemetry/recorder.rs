//! Buffered telemetry recorder
//!
//! ## Flush Policy
//!
//! ```text
//! record ──▶ [ row │ row │ row │ ... ] ──flush_if_due──▶ data file
//!                 bounded, N rows          every save interval
//!
//! log_event ───────────────────────────────────────────▶ events file
//!                 never buffered
//! ```
//!
//! - A flush writes the buffer front to back and removes each row only once
//!   the sink accepted it, so a failed flush keeps the unwritten rows in order
//! - A full buffer forces a flush before the next row is queued; if that
//!   flush fails the oldest row is dropped and counted
//! - Event timestamps are clamped so the event file never goes backwards
//!
//! Rows still buffered when power is lost are gone. [`TelemetryRecorder::drain`]
//! at shutdown is the only guarantee that everything recorded reaches storage.

use heapless::Deque;

use crate::errors::{FlightError, FlightResult};
use crate::events::{EventKind, EventRecord};
use crate::flight::FlightState;
use crate::time::{elapsed_ms, Timestamp};

use super::{LogFile, TelemetryRow, TelemetrySink};

/// Rows buffered between flushes unless configured otherwise
pub const DEFAULT_BUFFER_ROWS: usize = 64;

/// Recorder counters since construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecorderStats {
    /// Rows handed to `record`
    pub rows_recorded: u32,
    /// Rows accepted by the sink
    pub rows_written: u32,
    /// Rows lost to a full buffer or an unformattable value
    pub rows_dropped: u32,
    /// Flushes that wrote everything
    pub flushes: u32,
    /// Flushes that stopped early
    pub failed_flushes: u32,
    /// Event lines written
    pub events_written: u32,
    /// Event lines the sink rejected
    pub events_failed: u32,
}

/// Buffered data rows plus unbuffered events over a [`TelemetrySink`]
pub struct TelemetryRecorder<K, const N: usize = DEFAULT_BUFFER_ROWS> {
    sink: K,
    buffer: Deque<TelemetryRow, N>,
    save_interval_ms: u64,
    last_flush: Timestamp,
    last_event: Timestamp,
    stats: RecorderStats,
}

impl<K: TelemetrySink, const N: usize> TelemetryRecorder<K, N> {
    /// Write both headers and the initialization event
    ///
    /// A file the sink reports as already holding lines keeps its existing
    /// header.
    ///
    /// Any failure here is [`FlightError::Fatal`]: without storage the
    /// flight has no purpose.
    pub fn new(sink: K, save_interval_ms: u32, now: Timestamp) -> FlightResult<Self> {
        let mut recorder = Self {
            sink,
            buffer: Deque::new(),
            save_interval_ms: u64::from(save_interval_ms),
            last_flush: now,
            last_event: now,
            stats: RecorderStats::default(),
        };

        let fatal = |_| FlightError::Fatal { reason: "could not initialize data storage" };
        for file in [LogFile::Data, LogFile::Events] {
            if recorder.sink.has_lines(file) {
                log_info!("{} file already started, header skipped", file.prefix());
                continue;
            }
            recorder.sink.append(file, file.header()).map_err(fatal)?;
        }
        recorder.sink.sync().map_err(fatal)?;

        let init = EventRecord::new(now, EventKind::SystemInitialization, FlightState::WaitingStart)
            .with_details("System startup completed");
        recorder
            .log_event(init)
            .map_err(|_| FlightError::Fatal { reason: "could not initialize data storage" })?;

        log_info!("telemetry storage ready, flush every {} ms", save_interval_ms);
        Ok(recorder)
    }

    /// Queue one row
    ///
    /// A full buffer is flushed first. If that fails the oldest row is
    /// dropped to make room and the flush error is returned after the new
    /// row has been queued.
    pub fn record(&mut self, row: TelemetryRow, now: Timestamp) -> FlightResult<()> {
        self.stats.rows_recorded += 1;

        let mut result = Ok(());
        if self.buffer.is_full() {
            log_debug!("telemetry buffer full, flushing early");
            if let Err(err) = self.flush(now) {
                if self.buffer.pop_front().is_some() {
                    self.stats.rows_dropped += 1;
                    log_warn!("telemetry buffer full and flush failed, dropped oldest row ({} total)", self.stats.rows_dropped);
                }
                result = Err(err);
            }
        }

        // room is guaranteed: either the flush emptied the buffer or a row was popped
        let _ = self.buffer.push_back(row);
        result
    }

    /// Whether the save interval has elapsed since the last flush
    pub fn should_flush(&self, now: Timestamp) -> bool {
        elapsed_ms(self.last_flush, now) >= self.save_interval_ms
    }

    /// Flush when the save interval has elapsed, returning whether it ran
    pub fn flush_if_due(&mut self, now: Timestamp) -> FlightResult<bool> {
        if !self.should_flush(now) {
            return Ok(false);
        }
        self.flush(now).map(|_| true)
    }

    /// Write every buffered row in order
    ///
    /// The next interval starts at `now` whether or not the flush succeeds.
    pub fn flush(&mut self, now: Timestamp) -> FlightResult<usize> {
        self.last_flush = now;
        let mut written = 0;

        while let Some(row) = self.buffer.front() {
            let line = match row.to_csv() {
                Ok(line) => line,
                Err(_) => {
                    self.buffer.pop_front();
                    self.stats.rows_dropped += 1;
                    log_warn!("telemetry row too long, dropped");
                    continue;
                }
            };

            if self.sink.append(LogFile::Data, &line).is_err() {
                self.stats.failed_flushes += 1;
                log_error!("telemetry flush stopped after {} rows, {} kept", written, self.buffer.len());
                return Err(FlightError::Storage { reason: "data append failed" });
            }
            self.buffer.pop_front();
            self.stats.rows_written += 1;
            written += 1;
        }

        if self.sink.sync().is_err() {
            self.stats.failed_flushes += 1;
            log_error!("telemetry sync failed");
            return Err(FlightError::Storage { reason: "data sync failed" });
        }

        self.stats.flushes += 1;
        log_debug!("flushed {} telemetry rows", written);
        Ok(written)
    }

    /// Write one event immediately
    ///
    /// A timestamp earlier than the previous event's is raised to it.
    pub fn log_event(&mut self, mut record: EventRecord) -> FlightResult<()> {
        if record.timestamp < self.last_event {
            record.timestamp = self.last_event;
        }
        self.last_event = record.timestamp;

        let line = record.to_csv()?;
        let written = self.sink.append(LogFile::Events, &line).and_then(|_| self.sink.sync());
        if written.is_err() {
            self.stats.events_failed += 1;
            log_error!("event not written: {}", record.kind.name());
            return Err(FlightError::Storage { reason: "event append failed" });
        }

        self.stats.events_written += 1;
        log_info!("event: {} - {}", record.kind.name(), record.details.as_str());
        Ok(())
    }

    /// Flush everything, for shutdown
    pub fn drain(&mut self, now: Timestamp) -> FlightResult<usize> {
        self.flush(now)
    }

    /// Rows waiting for the next flush
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Counters
    pub fn stats(&self) -> RecorderStats {
        self.stats
    }

    /// Time of the last flush attempt
    pub fn last_flush(&self) -> Timestamp {
        self.last_flush
    }

    /// Underlying sink
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Consume the recorder, returning the sink with unflushed rows discarded
    pub fn into_sink(self) -> K {
        self.sink
    }
}
