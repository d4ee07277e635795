//! Closed loop against the simulated converter plant.

use powerstage::adapters::sim::{PlantParams, SimBoard};
use powerstage::boards::converter::V2;
use powerstage::control::OutputMode;
use powerstage::{BoardConfig, BoardController, BoardKind};

const PERIOD_US: u32 = 1000;

fn started() -> BoardController<SimBoard> {
    let config = BoardConfig::for_board(BoardKind::Converter);
    let mut b = BoardController::new(&config, SimBoard::new(PlantParams::default())).unwrap();
    b.start_pwm();
    b
}

fn run(b: &mut BoardController<SimBoard>, ticks: usize) {
    for _ in 0..ticks {
        b.tick();
        b.hw_mut().advance(PERIOD_US);
    }
}

#[test]
fn gates_stay_off_until_started() {
    let config = BoardConfig::for_board(BoardKind::Converter);
    let mut b = BoardController::new(&config, SimBoard::default()).unwrap();
    run(&mut b, 200);
    assert!(b.hw().gates_latched());
    assert_eq!(b.hw().port2_mv(), 0);
    assert_eq!(b.shutdown_code(), 1);
}

#[test]
fn gradient_regulates_port_two_voltage() {
    let mut b = started();
    b.set_regulation(OutputMode::CV2, 12_000);
    run(&mut b, 3000);

    let v2 = b.hw().port2_mv();
    assert!((v2 - 12_000).abs() < 1000, "port 2 at {v2} mV");
    assert!((b.millivolts(V2) - 12_000).abs() < 1000);
    assert!((32..=35).contains(&b.duty().percent()), "duty {}", b.duty().percent());
    assert_eq!(b.shutdown_code(), -1);
}

#[test]
fn short_circuit_latches_and_collapses_the_output() {
    let mut b = started();
    run(&mut b, 200);
    assert_eq!(b.shutdown_code(), -1);

    b.hw_mut().set_load(1000);
    run(&mut b, 200);
    assert_eq!(b.shutdown_code(), 2);
    assert!(b.hw().gates_latched());
    assert!(b.hw().port2_mv() < 1000);
}

#[test]
fn re_enable_restarts_the_bridge() {
    let mut b = started();
    b.shutdown(powerstage::safety::ShutdownReason::User(9));
    run(&mut b, 200);
    assert_eq!(b.shutdown_code(), 9);
    assert!(b.hw().port2_mv() < 1000);

    b.enable_gate_drivers();
    run(&mut b, 200);
    assert_eq!(b.shutdown_code(), -1);
    assert!((b.hw().port2_mv() - 24_000).abs() < 500);
}
