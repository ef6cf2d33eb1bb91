//! End-to-end flights over the simulated board

mod common;

use cansat_core::telemetry::LogFile;
use cansat_core::traits::{AlertPattern, Led};
use cansat_core::{EstimatorConfig, FlightComputer, FlightConfig, FlightError, FlightState, TickOutcome};

use common::*;

fn climb_and_turn(computer: &mut SimComputer) {
    fly(computer, ramp(5.0, 100.0, 5.0));
    fly(computer, ramp(95.0, 60.0, -5.0));
}

fn hold_until_shutdown(computer: &mut SimComputer) -> bool {
    computer.platform().button.set(true);
    (0..40).any(|_| step(computer) == TickOutcome::Shutdown)
}

#[test]
fn boot_records_startup_and_waits() {
    let computer = boot();
    let sink = computer.platform().sink.clone();

    assert_eq!(computer.state(), FlightState::WaitingStart);
    assert_eq!(sink.lines(LogFile::Data)[0], cansat_core::telemetry::DATA_HEADER);
    assert_eq!(event_names(&sink), vec!["System Initialization"]);
    assert_eq!(computer.platform().alerts.played(), vec![AlertPattern::Startup]);
    assert_eq!(computer.platform().alerts.log().blinks, vec![Led::Green]);
}

#[test]
fn first_press_initialises_sensors() {
    let computer = armed();
    let sink = computer.platform().sink.clone();

    assert_eq!(computer.state(), FlightState::Ready);
    let status = computer.sensor_status();
    assert!(status.minimum_met());
    assert!(status.gps);

    let baro = computer.barometer().unwrap();
    assert!(baro.is_ground_calibrated());
    let ground = baro.ground_reference().unwrap();
    assert!((ground.ground_pressure_hpa - 1000.0).abs() < 0.01);

    assert_eq!(
        event_names(&sink),
        vec!["System Initialization", "Button Press", "State Change"]
    );
    assert!(events_named(&sink, "State Change")[0].contains("System ready for flight"));
    assert!(computer.platform().alerts.played().contains(&AlertPattern::SensorsReady));

    // no rows before launch
    assert!(data_rows(&sink).is_empty());
    assert_eq!(computer.buffered_rows(), 0);
}

#[test]
fn full_flight_with_stability_landing() {
    let mut computer = armed();
    let sink = computer.platform().sink.clone();
    computer.platform().serial.feed(GGA);

    press(&mut computer);
    assert_eq!(computer.state(), FlightState::Ascent);

    climb_and_turn(&mut computer);
    assert_eq!(computer.state(), FlightState::Descent);
    assert_eq!(events_named(&sink, "Apogee Detected").len(), 1);
    let peak = computer.detector().peak_altitude().unwrap();
    assert!((peak - 100.0).abs() < 0.1, "peak {}", peak);

    fly(&mut computer, ramp(55.0, 15.0, -5.0));
    let mut hover = 0;
    while computer.state() == FlightState::Descent && hover < 15 {
        fly(&mut computer, [12.0]);
        hover += 1;
    }
    assert_eq!(computer.state(), FlightState::Landed);
    assert_eq!(hover, 9, "five stable windows after the window fills");

    assert!(hold_until_shutdown(&mut computer));
    assert_eq!(computer.state(), FlightState::Shutdown);

    assert_eq!(
        event_names(&sink),
        vec![
            "System Initialization",
            "Button Press",
            "State Change",
            "Flight Start",
            "Apogee Detected",
            "Landing Detected",
            "Button Hold",
            "Shutdown",
        ]
    );
    let apogee = events_named(&sink, "Apogee Detected").remove(0);
    assert!(apogee.contains(",DESCENT,"));
    assert!(apogee.contains("Max altitude: "));

    let stats = computer.recorder_stats();
    let rows = data_rows(&sink);
    assert_eq!(computer.buffered_rows(), 0);
    assert_eq!(stats.rows_dropped, 0);
    assert_eq!(rows.len() as u32, stats.rows_recorded);
    assert!(stats.flushes >= 2);
    assert!(rows.iter().all(|row| row.split(',').count() == 12));
    assert!(rows.iter().any(|row| row.ends_with(",48.1173,11.516667")));

    let played = computer.platform().alerts.played();
    let milestones: Vec<_> = played
        .into_iter()
        .filter(|p| *p != AlertPattern::Error)
        .collect();
    assert_eq!(
        milestones,
        vec![
            AlertPattern::Startup,
            AlertPattern::SensorsReady,
            AlertPattern::FlightStart,
            AlertPattern::Apogee,
            AlertPattern::Landing,
            AlertPattern::Shutdown,
        ]
    );
    let leds = computer.platform().alerts.log();
    assert!(!leds.green && !leds.red);
}

#[test]
fn low_altitude_rule_confirms_landing() {
    let mut computer = launched();
    let sink = computer.platform().sink.clone();
    climb_and_turn(&mut computer);

    fly(&mut computer, ramp(55.0, 15.0, -5.0));
    let mut low = 0;
    while computer.state() == FlightState::Descent && low < 10 {
        fly(&mut computer, [6.0]);
        low += 1;
    }

    assert_eq!(computer.state(), FlightState::Landed);
    assert_eq!(low, 6);
    let names = event_names(&sink);
    assert_eq!(names.last().map(String::as_str), Some("Landing Confirmed"));
    assert!(!names.iter().any(|n| n == "Landing Detected"));
    assert!(events_named(&sink, "Landing Confirmed")[0].contains("Final altitude: "));
}

#[test]
fn rows_stop_after_landing() {
    let mut computer = launched();
    let sink = computer.platform().sink.clone();
    climb_and_turn(&mut computer);
    fly(&mut computer, ramp(55.0, 15.0, -5.0));
    while computer.state() == FlightState::Descent {
        fly(&mut computer, [6.0]);
    }

    let recorded = computer.recorder_stats().rows_recorded;
    fly(&mut computer, [6.0, 6.0, 6.0]);
    assert_eq!(computer.recorder_stats().rows_recorded, recorded);

    assert!(hold_until_shutdown(&mut computer));
    assert_eq!(data_rows(&sink).len() as u32, recorded);
}

#[test]
fn missing_barometer_keeps_waiting_then_retries() {
    let platform = SimPlatform::new();
    platform.bus.remove(BME280_ADDR);
    let bus = platform.bus.clone();
    let mut computer = FlightComputer::new(platform, FlightConfig::default()).unwrap();
    let sink = computer.platform().sink.clone();

    press(&mut computer);
    assert_eq!(computer.state(), FlightState::WaitingStart);
    assert!(!computer.sensor_status().barometer);
    assert!(computer.sensor_status().inertial);
    assert!(events_named(&sink, "Error")[0].contains("Sensor initialization failed"));
    assert!(computer.platform().alerts.played().contains(&AlertPattern::Error));
    assert!(computer.platform().alerts.log().red);

    bus.fit_barometer(0x77);
    computer.platform().clock.advance(600);
    press(&mut computer);
    assert_eq!(computer.state(), FlightState::Ready);
    assert_eq!(computer.barometer().unwrap().address(), 0x77);
}

#[test]
fn flight_without_gps_logs_missing_position() {
    let mut platform = SimPlatform::new();
    platform.gps_connected = false;
    let mut computer = FlightComputer::new(platform, FlightConfig::default()).unwrap();
    let sink = computer.platform().sink.clone();

    press(&mut computer);
    assert_eq!(computer.state(), FlightState::Ready);
    assert!(!computer.sensor_status().gps);
    assert!(computer.gps().is_none());

    computer.platform().clock.advance(600);
    press(&mut computer);
    fly(&mut computer, [3.0, 6.0]);
    assert!(computer.shutdown().is_ok());

    let rows = data_rows(&sink);
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|row| row.ends_with(",None,None")));
}

#[test]
fn inertial_dropout_keeps_flying() {
    let mut computer = launched();
    let sink = computer.platform().sink.clone();

    computer.platform().bus.set_unresponsive(MPU6050_ADDR, true);
    fly(&mut computer, [5.0, 10.0]);
    assert_eq!(computer.state(), FlightState::Ascent);
    assert!(computer.last_reading().unwrap().accel_g.is_none());
    assert!(computer.last_reading().unwrap().altitude_m.is_some());

    computer.shutdown().unwrap();
    let last = data_rows(&sink).pop().unwrap();
    let fields: Vec<&str> = last.split(',').collect();
    assert_eq!(&fields[4..10], &["None"; 6]);
    assert_ne!(fields[3], "None");
}

#[test]
fn storage_failure_at_boot_is_fatal() {
    let mut platform = SimPlatform::new();
    platform.storage_available = false;
    let alerts = platform.alerts.clone();

    let err = FlightComputer::new(platform, FlightConfig::default()).err().unwrap();
    assert!(matches!(err, FlightError::Fatal { .. }));
    assert!(err.is_fatal());
    assert_eq!(alerts.played(), vec![AlertPattern::Error]);
    assert!(alerts.log().red);
}

#[test]
fn unwritable_card_at_boot_is_fatal() {
    let mut platform = SimPlatform::new();
    platform.sink.fail_appends(true);
    let alerts = platform.alerts.clone();

    assert!(matches!(
        FlightComputer::new(platform, FlightConfig::default()),
        Err(FlightError::Fatal { .. })
    ));
    assert!(alerts.log().red);
}

#[test]
fn storage_outage_keeps_buffered_rows() {
    let mut computer = launched();
    let mut sink = computer.platform().sink.clone();

    sink.fail_appends(true);
    fly(&mut computer, ramp(1.0, 50.0, 1.0));
    let stats = computer.recorder_stats();
    assert!(stats.failed_flushes >= 1);
    assert_eq!(stats.rows_dropped, 0);
    assert!(computer.buffered_rows() > 0);
    assert_eq!(computer.state(), FlightState::Ascent);

    sink.fail_appends(false);
    fly(&mut computer, ramp(51.0, 60.0, 1.0));
    computer.shutdown().unwrap();

    let stats = computer.recorder_stats();
    assert_eq!(stats.rows_dropped, 0);
    assert_eq!(data_rows(&sink).len() as u32, stats.rows_recorded);
    assert_eq!(computer.buffered_rows(), 0);
}

#[test]
fn event_write_failure_fails_the_tick() {
    let mut computer = armed();
    let mut sink = computer.platform().sink.clone();

    sink.fail_appends(true);
    computer.platform().button.set(true);
    step(&mut computer);
    computer.platform().button.set(false);
    let err = computer.tick().unwrap_err();

    assert!(matches!(err, FlightError::Storage { .. }));
    assert!(!err.is_fatal());
    assert_eq!(computer.state(), FlightState::Ascent);
}

#[test]
fn failed_apogee_event_keeps_the_row() {
    let mut computer = launched();
    let mut sink = computer.platform().sink.clone();
    fly(&mut computer, ramp(5.0, 100.0, 5.0));
    fly(&mut computer, ramp(95.0, 75.0, -5.0));
    assert_eq!(computer.state(), FlightState::Ascent);

    sink.fail_sync(true);
    computer.platform().bus.set_altitude(70.0);
    let err = computer.tick().unwrap_err();
    computer.platform().clock.advance(100);
    sink.fail_sync(false);

    assert!(matches!(err, FlightError::Storage { .. }));
    assert_eq!(computer.state(), FlightState::Descent);
    // release tick, twenty climbing, five falling and the apogee tick
    assert_eq!(computer.recorder_stats().rows_recorded, 27);
    assert_eq!(computer.last_reading().unwrap().altitude_m.map(f32::round), Some(70.0));

    computer.shutdown().unwrap();
    let stats = computer.recorder_stats();
    assert_eq!(stats.rows_dropped, 0);
    assert_eq!(data_rows(&sink).len(), 27);
}

fn smoothed() -> SimComputer {
    let config = FlightConfig {
        estimator: EstimatorConfig { enabled: true, ..Default::default() },
        ..Default::default()
    };
    let mut computer = FlightComputer::new(SimPlatform::new(), config).unwrap();
    press(&mut computer);
    computer.platform().clock.advance(600);
    press(&mut computer);
    assert_eq!(computer.state(), FlightState::Ascent);
    computer
}

fn accel_spike(computer: &mut SimComputer) {
    fly(computer, ramp(5.0, 50.0, 5.0));
    computer.platform().bus.set_accel_g([0.0, 0.0, -0.8]);
    fly(computer, [55.0]);
    computer.platform().bus.set_accel_g([0.0, 0.0, 1.0]);
}

#[test]
fn raw_acceleration_spike_declares_apogee() {
    let mut computer = launched();
    let sink = computer.platform().sink.clone();
    accel_spike(&mut computer);

    assert_eq!(computer.state(), FlightState::Descent);
    assert_eq!(events_named(&sink, "Apogee Detected").len(), 1);
}

#[test]
fn smoothed_acceleration_rides_out_a_spike() {
    let mut computer = smoothed();
    let sink = computer.platform().sink.clone();
    accel_spike(&mut computer);
    fly(&mut computer, [60.0, 65.0]);

    assert_eq!(computer.state(), FlightState::Ascent);
    assert!(events_named(&sink, "Apogee Detected").is_empty());

    computer.shutdown().unwrap();
    let rows = data_rows(&sink);
    // release tick, ten climbing, the spike and two more
    assert_eq!(rows.len(), 14);
    let az = |row: &String| row.split(',').nth(6).unwrap().parse::<f32>().unwrap();
    assert!((az(&rows[11]) + 0.8).abs() < 1e-3, "row {}", rows[11]);
    assert!((az(&rows[12]) - 1.0).abs() < 1e-3, "row {}", rows[12]);
}

#[test]
fn run_ends_on_long_press() {
    let platform = SimPlatform::new();
    let button = platform.button.clone();
    button.queue(false, 2);
    button.queue(true, 1);
    button.queue(false, 10);
    button.queue(true, 1);
    button.queue(false, 20);
    button.set(true);

    let mut computer = FlightComputer::new(platform, FlightConfig::default()).unwrap();
    let sink = computer.platform().sink.clone();
    computer.run().unwrap();

    assert_eq!(computer.state(), FlightState::Shutdown);
    let names = event_names(&sink);
    assert_eq!(names[..2], ["System Initialization", "Main Loop"]);
    assert!(names.contains(&"Flight Start".to_string()));
    assert_eq!(names[names.len() - 2..], ["Button Hold", "Shutdown"]);

    // rows from ASCENT up to the hold are all on the card
    let stats = computer.recorder_stats();
    assert!(stats.rows_recorded >= 20);
    assert_eq!(data_rows(&sink).len() as u32, stats.rows_recorded);
    assert_eq!(computer.tick().unwrap(), TickOutcome::Shutdown);
}
