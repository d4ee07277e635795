//! Power panel: per-channel trips, aggregate trip, inrush hold hand-off.

use crate::mock_hw::{HwCall, MockBoard};

use powerstage::app::ports::Level;
use powerstage::boards::panel::{I1, I3};
use powerstage::pins::panel as pin;
use powerstage::safety::Interlock;
use powerstage::{BoardConfig, BoardController, BoardKind};

const CHANNEL_PINS: [u8; 4] = [pin::CH1, pin::CH2, pin::CH3, pin::CH4];

fn panel() -> BoardController<MockBoard> {
    BoardController::new(&BoardConfig::for_board(BoardKind::Panel), MockBoard::new()).unwrap()
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

/// Panel with all four channels switched on and the history cleared.
fn all_on() -> BoardController<MockBoard> {
    let mut b = panel();
    for ch in 0..4 {
        b.set_output(ch, true);
    }
    b.hw_mut().clear_calls();
    b
}

#[test]
fn init_drives_every_channel_off_then_releases() {
    let b = panel();
    let calls = &b.hw().calls;
    let lows: Vec<_> = CHANNEL_PINS.iter().map(|&p| HwCall::Set(p, Level::Low)).collect();
    let releases: Vec<_> = CHANNEL_PINS.iter().map(|&p| HwCall::Release(p)).collect();
    assert_eq!(&calls[..4], lows.as_slice());
    assert_eq!(calls[4], HwCall::Delay(10_000));
    assert_eq!(&calls[5..9], releases.as_slice());
    assert_eq!(b.shutdown_code(), -1);
}

#[test]
fn default_limits() {
    let b = panel();
    assert_eq!(b.limits().channel_raw, [443; 4]);
    assert_eq!(b.limits().total_raw, Some(1500));
}

#[test]
fn switching_on_holds_through_inrush_then_hands_off() {
    let mut b = panel();
    b.hw_mut().clear_calls();
    assert_eq!(send(&mut b, "WCH1:1\n"), "WCH1:=1\r\n");
    assert_eq!(
        b.hw().calls,
        vec![
            HwCall::Set(pin::CH1, Level::High),
            HwCall::Delay(20),
            HwCall::Release(pin::CH1),
        ]
    );
    assert_eq!(send(&mut b, "RCH1:\n"), "WCH1:1\r\n");
}

#[test]
fn switching_off_is_a_plain_drive() {
    let mut b = all_on();
    assert_eq!(send(&mut b, "WCH3:0\n"), "WCH3:=0\r\n");
    assert_eq!(b.hw().calls, vec![HwCall::Set(pin::CH3, Level::Low)]);
}

#[test]
fn disabled_shutoff_keeps_driving() {
    let mut b = panel();
    b.set_hardware_shutoff(1, false);
    b.hw_mut().clear_calls();
    b.set_output(1, true);
    assert_eq!(b.hw().calls, vec![HwCall::Set(pin::CH2, Level::High)]);
}

#[test]
fn inrush_hold_is_configurable() {
    let mut b = panel();
    b.set_inrush_hold(500);
    b.hw_mut().clear_calls();
    b.set_output(3, true);
    assert!(b.hw().calls.contains(&HwCall::Delay(500)));
}

#[test]
fn channel_breach_opens_only_that_channel() {
    let mut b = all_on();
    b.hw_mut().set_analog(pin::I2, 1000); // signed 488
    ticks(&mut b, 14);
    assert_eq!(b.hw().level(pin::CH2), Some(Level::High));
    b.tick();
    assert_eq!(b.hw().level(pin::CH2), Some(Level::Low));
    for p in [pin::CH1, pin::CH3, pin::CH4] {
        assert_eq!(b.hw().level(p), Some(Level::High), "pin {p}");
    }
    let Interlock::ChannelTrip(trip) = b.interlock() else {
        panic!("panel runs the channel-trip policy");
    };
    assert_eq!(trip.tripped(), 0b0010);

    // A trip is acted on once.
    ticks(&mut b, 10);
    assert_eq!(b.hw().pin_calls(pin::CH2), vec![HwCall::Set(pin::CH2, Level::Low)]);
    assert_eq!(send(&mut b, "RCH2:\n"), "WCH2:0\r\n");
}

#[test]
fn re_asserting_an_output_rearms_it() {
    let mut b = all_on();
    b.hw_mut().set_analog(pin::I4, 1000);
    ticks(&mut b, 16);
    assert_eq!(b.hw().level(pin::CH4), Some(Level::Low));

    b.hw_mut().set_analog(pin::I4, 512);
    ticks(&mut b, 16);
    assert_eq!(send(&mut b, "WCH4:1\n"), "WCH4:=1\r\n");
    ticks(&mut b, 16);
    assert_eq!(b.hw().level(pin::CH4), Some(Level::High));
    let Interlock::ChannelTrip(trip) = b.interlock() else {
        panic!("panel runs the channel-trip policy");
    };
    assert!(!trip.is_tripped(3));
}

#[test]
fn aggregate_breach_opens_every_channel() {
    let mut b = all_on();
    // signed 400 each: every channel inside 443, the sum over 1500
    for p in [pin::I1, pin::I2, pin::I3, pin::I4] {
        b.hw_mut().set_analog(p, 912);
    }
    ticks(&mut b, 15);
    assert!(CHANNEL_PINS.iter().all(|&p| b.hw().level(p) == Some(Level::High)));
    b.tick();
    assert!(CHANNEL_PINS.iter().all(|&p| b.hw().level(p) == Some(Level::Low)));
}

#[test]
fn total_current_sums_channels_before_converting() {
    let mut b = panel();
    b.hw_mut().set_analog(pin::I1, 612); // 100
    b.hw_mut().set_analog(pin::I3, 562); // 50
    ticks(&mut b, 16);
    assert_eq!(b.average(I1), 100);
    assert_eq!(b.average(I3), 50);
    assert_eq!(send(&mut b, "RIT:\n"), "WIT:2197\r\n");
}

#[test]
fn bus_voltage_and_limits_over_serial() {
    let mut b = panel();
    assert_eq!(send(&mut b, "RVB:\n"), "WVB:32506\r\n");
    assert_eq!(send(&mut b, "WILT:5000\n"), "WILT:=5000\r\n");
    assert_eq!(b.limits().total_raw, Some(340));
    assert_eq!(send(&mut b, "WIL3:1000\n"), "WIL3:=1000\r\n");
    assert_eq!(b.limits().channel_raw[2], 68);
}

#[test]
fn converter_keys_are_not_built_in() {
    let mut b = panel();
    assert_eq!(send(&mut b, "RSDC:\n"), "");
    assert_eq!(send(&mut b, "WDUT:20\n"), "");
    assert_eq!(b.hw().last_duty(), None);
}
