//! Powerstage control kernel.
//!
//! One real-time kernel shared by the converter, power panel and supply
//! boards: averaged sensing, protection interlocks, the duty-cycle control
//! law and the `KEY:VALUE` command protocol.  Board differences live in
//! static profiles under [`boards`]; hardware is reached only through the
//! port traits in [`app::ports`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod boards;
pub mod comms;
pub mod config;
pub mod control;
pub mod error;
pub mod pins;
pub mod safety;
pub mod sensors;

pub use app::service::{BoardController, CommandCallback};
pub use boards::BoardKind;
pub use config::BoardConfig;
pub use error::{ConfigError, Error, Result};
