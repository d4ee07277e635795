//! Command protocol across both transports, including extension callbacks.

use crate::mock_hw::MockBoard;

use powerstage::comms::parse::Command;
use powerstage::comms::{MAX_COMMAND_CALLBACKS, Transport};
use powerstage::{BoardConfig, BoardController, BoardKind};

type Board = BoardController<MockBoard>;

fn converter() -> Board {
    BoardController::new(&BoardConfig::for_board(BoardKind::Converter), MockBoard::converter())
        .unwrap()
}

fn send(b: &mut Board, line: &str) -> String {
    for byte in line.bytes() {
        b.on_serial_byte(byte);
    }
    b.hw_mut().take_tx()
}

fn first(b: &mut Board, cmd: &Command, transport: Transport) {
    b.reply(transport, &format!("one:{}={}", cmd.key(), cmd.value()));
}

fn second(b: &mut Board, cmd: &Command, transport: Transport) {
    b.reply(transport, &format!("two:{}", cmd.key()));
}

/// Handles one key with a real setter, ignores the rest.
fn duty_alias(b: &mut Board, cmd: &Command, transport: Transport) {
    if cmd.key() == "XDUT" {
        let duty = b.set_duty_cycle(cmd.int_value());
        b.reply(transport, &format!("XDUT:={}", duty.percent()));
    }
}

#[test]
fn unknown_key_reaches_every_callback_once_in_order() {
    let mut b = converter();
    assert!(b.register_callback(first));
    assert!(b.register_callback(second));
    assert_eq!(send(&mut b, "XYZ:5\n"), "one:XYZ=5\r\ntwo:XYZ\r\n");
}

#[test]
fn built_in_keys_bypass_callbacks() {
    let mut b = converter();
    b.register_callback(first);
    assert_eq!(send(&mut b, "RDUT:\n"), "WDUT:50\r\n");
}

#[test]
fn callback_list_is_bounded() {
    let mut b = converter();
    for _ in 0..MAX_COMMAND_CALLBACKS {
        assert!(b.register_callback(second));
    }
    assert!(!b.register_callback(first));
    let tx = send(&mut b, "Q:\n");
    assert_eq!(tx.matches("two:Q").count(), MAX_COMMAND_CALLBACKS);
    assert!(!tx.contains("one:"));
}

#[test]
fn line_without_colon_is_forwarded_with_an_empty_key() {
    let mut b = converter();
    b.register_callback(first);
    assert_eq!(send(&mut b, " hello \n"), "one:=hello\r\n");
}

#[test]
fn unknown_key_without_callbacks_is_silent() {
    let mut b = converter();
    assert_eq!(send(&mut b, "NOPE:1\n"), "");
    assert_eq!(send(&mut b, "\n"), "");
}

#[test]
fn overlong_line_is_cut_at_the_buffer() {
    let mut b = converter();
    // first 15 bytes form one line; the tail "123\n" has no colon
    assert_eq!(send(&mut b, "WDUT:1234567890123\n"), "WDUT:=99\r\n");
    assert_eq!(b.duty().percent(), 99);
}

#[test]
fn garbage_values_read_as_zero() {
    let mut b = converter();
    assert_eq!(send(&mut b, "WDUT:abc\n"), "WDUT:=1\r\n");
    assert_eq!(send(&mut b, "WDUT: 42xyz\r\n"), "WDUT:=42\r\n");
}

#[test]
fn callbacks_can_use_the_public_setters() {
    let mut b = converter();
    b.register_callback(duty_alias);
    assert_eq!(send(&mut b, "XDUT:33\n"), "XDUT:=33\r\n");
    assert_eq!(b.hw().last_duty(), Some(33));
}

#[test]
fn callbacks_reply_on_the_transport_they_were_called_from() {
    let mut b = converter();
    b.register_callback(second);
    b.on_bus_receive(b"\x00XYZ:5");
    assert!(b.hw().tx.is_empty());
    assert_eq!(b.on_bus_request().as_deref(), Some("two:XYZ"));
}

#[test]
fn later_bus_reply_replaces_an_unread_one() {
    let mut b = converter();
    b.on_bus_receive(b"\x00RDUT:");
    b.on_bus_receive(b"\x00RVCC:");
    assert_eq!(b.on_bus_request().as_deref(), Some("WVCC:5001"));
    assert_eq!(b.on_bus_request(), None);
}

#[test]
fn register_only_bus_write_is_ignored() {
    let mut b = converter();
    b.register_callback(second);
    b.on_bus_receive(b"\x00");
    b.on_bus_receive(b"");
    assert_eq!(b.on_bus_request(), None);
}

#[test]
fn bus_payload_is_truncated_to_the_line_buffer() {
    let mut b = converter();
    b.on_bus_receive(b"\x00WDUT:1234567890123");
    assert_eq!(b.on_bus_request().as_deref(), Some("WDUT:=99"));
}

#[test]
fn bus_write_is_echoed_without_a_line_ending() {
    let mut b = converter();
    b.on_bus_receive(b"\x00WDRP:100");
    assert_eq!(b.on_bus_request().as_deref(), Some("WDRP:=100"));
    assert_eq!(b.droop_milliohms(), 96);
}
