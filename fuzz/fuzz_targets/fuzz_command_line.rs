//! Fuzz target: serial and bus command paths
//!
//! Splits the input into a serial byte stream and a bus write, feeds both
//! into a bench controller for every board, and asserts that the line
//! parser and dispatcher never panic and the duty never leaves its range.
//!
//! cargo fuzz run fuzz_command_line

#![no_main]

use libfuzzer_sys::fuzz_target;
use powerstage::adapters::sim::{PlantParams, SimBoard};
use powerstage::comms::parse::parse_line;
use powerstage::{BoardConfig, BoardController, BoardKind};

fuzz_target!(|data: &[u8]| {
    let _ = parse_line(data);

    let split = data.first().map_or(0, |&b| usize::from(b)).min(data.len());
    let (serial, bus) = data.split_at(split);

    for kind in [BoardKind::Converter, BoardKind::Panel, BoardKind::Supply] {
        let hw = SimBoard::bench(PlantParams::default());
        let Ok(mut board) = BoardController::new(&BoardConfig::for_board(kind), hw) else {
            panic!("default {kind} config must build");
        };
        for &byte in serial {
            board.on_serial_byte(byte);
        }
        board.on_bus_receive(bus);
        if let Some(reply) = board.on_bus_request() {
            assert!(reply.len() <= 32, "bus reply exceeds its buffer");
        }
        board.tick();
        assert!((1..=99).contains(&board.duty().percent()));
    }
});
