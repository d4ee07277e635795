//! Adapters: concrete implementations of the board port traits.
//!
//! | Adapter | Implements    | Connects to                                  |
//! |---------|---------------|----------------------------------------------|
//! | `hal`   | BoardHardware | `embedded-hal` 1.0 pins, PWM and delay       |
//! | `sim`   | BoardHardware | Integer converter plant for host simulation  |

pub mod hal;
pub mod sim;
