//! Application core: one controller for every board variant.
//!
//! The controller owns all board state and talks to hardware only through
//! the port traits in [`ports`], so it runs unchanged on the MCU, in the
//! host simulator and under test mocks.

pub mod dispatch;
pub mod ports;
pub mod service;
