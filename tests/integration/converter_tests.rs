//! Converter board: latching protection, gate sequencing, control loop.
//!
//! The mock emulates the gate shutdown latch, so every test sees the same
//! pin history the real protection circuit would.

use crate::mock_hw::{HwCall, MockBoard};

use powerstage::app::ports::Level;
use powerstage::boards::converter::{I1, V2};
use powerstage::control::{ControlMode, OutputMode};
use powerstage::control::drive::DriveSignal;
use powerstage::pins::converter as pin;
use powerstage::{BoardConfig, BoardController, BoardKind};

fn converter() -> BoardController<MockBoard> {
    BoardController::new(&BoardConfig::for_board(BoardKind::Converter), MockBoard::converter())
        .unwrap()
}

/// Started board with the init and enable history cleared.
fn running() -> BoardController<MockBoard> {
    let mut b = converter();
    b.start_pwm();
    b.hw_mut().clear_calls();
    b
}

fn send(b: &mut BoardController<MockBoard>, line: &str) -> String {
    for byte in line.bytes() {
        b.on_serial_byte(byte);
    }
    b.hw_mut().take_tx()
}

fn ticks(b: &mut BoardController<MockBoard>, n: usize) {
    for _ in 0..n {
        b.tick();
    }
}

// ── Power-on ──────────────────────────────────────────────────

#[test]
fn powers_on_latched_with_gates_pulsed_off() {
    let b = converter();
    assert_eq!(b.shutdown_code(), 1);
    assert_eq!(b.vcc_mv(), 5001);
    assert!(b.hw().is_latched());
    assert_eq!(
        b.hw().pin_calls(pin::GATESD),
        vec![HwCall::Set(pin::GATESD, Level::Low), HwCall::Release(pin::GATESD)]
    );
    assert!(b.hw().calls.contains(&HwCall::Delay(10_000)));
}

#[test]
fn default_limits_are_converted_with_the_calibrated_rail() {
    let b = converter();
    assert_eq!(b.limits().channel_raw[0], 443);
    assert_eq!(b.limits().channel_raw[1], 443);
    assert_eq!(b.limits().thermal_c, 80);
    assert_eq!(b.limits().total_raw, None);
}

#[test]
fn start_pwm_applies_duty_then_pulses_reset() {
    let mut b = converter();
    b.hw_mut().clear_calls();
    b.start_pwm();
    assert_eq!(
        b.hw().calls,
        vec![
            HwCall::Duty(50),
            HwCall::Set(pin::PRORESET, Level::High),
            HwCall::Delay(3000),
            HwCall::Set(pin::PRORESET, Level::Low),
        ]
    );
    assert_eq!(b.shutdown_code(), -1);
    assert!(!b.hw().is_latched());
}

// ── Latching protection ───────────────────────────────────────

#[test]
fn overcurrent_trips_once_the_average_crosses_the_limit() {
    let mut b = running();
    // signed 488 against a limit of 443, 16-sample window
    b.hw_mut().set_analog(pin::I1, 1000);
    ticks(&mut b, 14);
    assert_eq!(b.shutdown_code(), -1, "average 427 is still inside the band");
    b.tick();
    assert_eq!(b.shutdown_code(), 2);
    assert!(b.hw().is_latched());
    assert_eq!(
        b.hw().pin_calls(pin::GATESD),
        vec![HwCall::Set(pin::GATESD, Level::Low), HwCall::Release(pin::GATESD)]
    );
}

#[test]
fn reverse_overcurrent_trips_too() {
    let mut b = running();
    b.hw_mut().set_analog(pin::I2, 24);
    ticks(&mut b, 16);
    assert_eq!(b.shutdown_code(), 2);
}

#[test]
fn latch_holds_until_re_enabled() {
    let mut b = running();
    b.hw_mut().set_analog(pin::I1, 1000);
    ticks(&mut b, 16);
    assert_eq!(b.shutdown_code(), 2);

    b.hw_mut().set_analog(pin::I1, 512);
    ticks(&mut b, 16);
    assert_eq!(b.shutdown_code(), 2, "clearing the fault must not re-arm");

    assert_eq!(send(&mut b, "WENA:1\n"), "WENA:=1\r\n");
    assert_eq!(b.shutdown_code(), -1);
    b.tick();
    assert_eq!(b.shutdown_code(), -1);
}

#[test]
fn hardware_latch_is_reported_as_code_zero() {
    let mut b = running();
    b.hw_mut().trip_hardware_latch();
    b.tick();
    assert_eq!(b.shutdown_code(), 0);
}

#[test]
fn overtemperature_trips_above_the_ceiling() {
    let mut b = running();
    b.hw_mut().set_analog(pin::T1, 807); // 85 C
    ticks(&mut b, 3);
    assert_eq!(b.shutdown_code(), -1, "average still below 80 C");
    b.tick();
    assert_eq!(b.shutdown_code(), 3);
}

#[test]
fn exactly_at_the_ceiling_does_not_trip() {
    let mut b = running();
    b.hw_mut().set_analog(pin::T2, 776); // 80 C
    ticks(&mut b, 8);
    assert_eq!(b.shutdown_code(), -1);
}

#[test]
fn user_shutdown_keeps_the_first_reason() {
    let mut b = running();
    assert_eq!(send(&mut b, "WSDC:7\n"), "WSDC:=7\r\n");
    assert_eq!(b.shutdown_code(), 7);
    assert_eq!(send(&mut b, "WSDC:9\n"), "WSDC:=9\r\n");
    assert_eq!(send(&mut b, "RSDC:\n"), "WSDC:7\r\n");
}

#[test]
fn lowered_limit_trips_earlier() {
    let mut b = running();
    assert_eq!(send(&mut b, "WIS1:2000\n"), "WIS1:=2000\r\n");
    assert_eq!(b.limits().channel_raw[0], 136);

    b.hw_mut().set_analog(pin::I1, 662); // signed 150
    ticks(&mut b, 14);
    assert_eq!(b.shutdown_code(), -1);
    ticks(&mut b, 2);
    assert_eq!(send(&mut b, "RSDC:\n"), "WSDC:2\r\n");
}

// ── Readings ──────────────────────────────────────────────────

#[test]
fn readings_use_the_calibrated_rail() {
    let mut b = running();
    b.hw_mut().set_analog(pin::V1, 500);
    b.hw_mut().set_analog(pin::I1, 612);
    b.hw_mut().set_analog(pin::T1, 510);
    ticks(&mut b, 16);

    assert_eq!(send(&mut b, "RV1:\n"), "WV1:31744\r\n");
    assert_eq!(send(&mut b, "RI1:\n"), "WI1:1465\r\n");
    assert_eq!(send(&mut b, "RT1:\n"), "WT1:50\r\n");
    assert_eq!(send(&mut b, "RVCC:\n"), "WVCC:5001\r\n");
    assert_eq!(send(&mut b, "RDUT:\n"), "WDUT:50\r\n");
}

#[test]
fn droop_reads_back_quantised() {
    let mut b = converter();
    assert_eq!(send(&mut b, "WDRP:100\n"), "WDRP:=100\r\n");
    assert_eq!(send(&mut b, "RDRP:\n"), "WDRP:96\r\n");
}

#[test]
fn duty_write_reaches_the_pwm() {
    let mut b = running();
    assert_eq!(send(&mut b, "WDUT:30\n"), "WDUT:=30\r\n");
    assert_eq!(b.hw().last_duty(), Some(30));
}

#[test]
fn bus_read_is_held_for_the_next_request() {
    let mut b = converter();
    b.on_bus_receive(b"\x08RDUT:");
    assert_eq!(b.on_bus_request().as_deref(), Some("WDUT:50"));
    assert_eq!(b.on_bus_request(), None);
    assert!(b.hw().tx.is_empty(), "bus replies never go to serial");
}

// ── Drive signal ──────────────────────────────────────────────

#[test]
fn hold_high_routes_the_alternate_signal() {
    let mut b = running();
    b.apply_hold_high(2);
    assert_eq!(b.drive(), DriveSignal::HoldHigh2);
    assert_eq!(b.hw().pin_calls(pin::VCTRL2), vec![HwCall::Set(pin::VCTRL2, Level::High)]);
    assert_eq!(b.hw().pin_calls(pin::VCTRL1), vec![HwCall::Set(pin::VCTRL1, Level::Low)]);
    assert_eq!(
        b.hw().pin_calls(pin::ALT),
        vec![
            HwCall::Set(pin::ALT, Level::High),
            HwCall::Set(pin::ALT, Level::Low),
            HwCall::Set(pin::ALT, Level::High),
        ]
    );
}

#[test]
fn bootstrap_is_refreshed_every_period_while_holding() {
    let mut b = running();
    b.apply_hold_high(1);
    ticks(&mut b, 9);
    assert_eq!(b.hw().pin_calls(pin::ALT).len(), 3);
    b.tick();
    assert_eq!(b.hw().pin_calls(pin::ALT).len(), 5);

    b.remove_hold();
    assert_eq!(b.drive(), DriveSignal::Pwm);
    assert_eq!(b.hw().level(pin::ALT), Some(Level::Low));
    let before = b.hw().pin_calls(pin::ALT).len();
    ticks(&mut b, 20);
    assert_eq!(b.hw().pin_calls(pin::ALT).len(), before);
}

#[test]
fn unknown_hold_port_is_ignored() {
    let mut b = running();
    b.apply_hold_high(3);
    assert_eq!(b.drive(), DriveSignal::Pwm);
    assert!(b.hw().calls.is_empty());
}

// ── Control loop ──────────────────────────────────────────────

#[test]
fn gradient_steps_once_per_window() {
    let mut b = running();
    // V2 reads ~32.5 V, well above a 12 V target
    b.set_regulation(OutputMode::CV2, 12_000);
    b.tick();
    assert_eq!(b.duty().percent(), 49, "a new target acts at once");
    assert_eq!(b.hw().last_duty(), Some(49));
    ticks(&mut b, 29);
    assert_eq!(b.duty().percent(), 49);
    b.tick();
    assert_eq!(b.duty().percent(), 48);
}

#[test]
fn latched_board_does_not_regulate() {
    let mut b = converter();
    b.hw_mut().clear_calls();
    b.set_regulation(OutputMode::CV2, 12_000);
    ticks(&mut b, 61);
    assert_eq!(b.duty().percent(), 50);
    assert_eq!(b.hw().last_duty(), None);
}

#[test]
fn classical_mode_starts_from_the_present_duty() {
    let mut b = running();
    // integrator: y[n] = y[n-1] + x[n] / 16
    b.set_compensator(&[1], &[16, -16]).unwrap();
    b.set_control_mode(ControlMode::Classical);
    b.set_regulation(OutputMode::CV2, 12_000);
    assert_eq!(b.average(V2), 512);

    b.tick();
    assert_eq!(b.duty().percent(), 47);
    ticks(&mut b, 5);
    assert!(b.duty().percent() < 47);
    assert_eq!(b.hw().last_duty(), Some(b.duty().percent()));
}

#[test]
fn rejected_compensator_keeps_the_old_one() {
    let mut b = running();
    assert!(b.set_compensator(&[1], &[0, 1]).is_err());
    assert_eq!(b.control().compensator().coefficients().denominator(), &[1]);
}

#[test]
fn current_reading_tracks_the_protected_channel() {
    let mut b = running();
    b.hw_mut().set_analog(pin::I1, 400); // signed -112
    ticks(&mut b, 16);
    assert_eq!(b.average(I1), -112);
    assert!(b.milliamps(I1) < 0);
    assert_eq!(b.shutdown_code(), -1);
}

#[test]
fn clearing_regulation_freezes_the_duty() {
    let mut b = running();
    b.set_regulation(OutputMode::CV2, 12_000);
    ticks(&mut b, 31);
    assert_eq!(b.duty().percent(), 48);

    b.clear_regulation();
    assert_eq!(b.regulation(), None);
    b.hw_mut().clear_calls();
    ticks(&mut b, 90);
    assert_eq!(b.duty().percent(), 48);
    assert_eq!(b.hw().last_duty(), None);
}

// ── Rail calibration ──────────────────────────────────────────

#[test]
fn recalibration_tracks_the_rail_but_keeps_installed_limits() {
    let mut b = running();
    assert_eq!(send(&mut b, "WIS1:2000\n"), "WIS1:=2000\r\n");
    assert_eq!(b.limits().channel_raw[0], 136);

    b.hw_mut().reference = 220;
    assert_eq!(b.recalibrate_vcc(), 5115);
    assert_eq!(b.vcc_mv(), 5115);
    assert_eq!(send(&mut b, "RVCC:\n"), "WVCC:5115\r\n");
    assert_eq!(b.limits().channel_raw[0], 136);
    assert_eq!(b.limits().channel_raw[1], 443);
}

#[test]
fn implausible_rail_falls_back_to_nominal() {
    let mut b = running();
    b.hw_mut().reference = 240; // 4688 mV, below the floor
    assert_eq!(b.recalibrate_vcc(), 5000);
}

#[test]
fn negative_limit_trips_on_the_next_tick() {
    let mut b = running();
    assert_eq!(send(&mut b, "WIS1:-500\n"), "WIS1:=-500\r\n");
    assert_eq!(b.limits().channel_raw[0], -34);
    b.tick();
    assert_eq!(b.shutdown_code(), 2);
}
