//! Command execution against the board's static command table.
//!
//! ```text
//!   Command ──▶ profile.lookup(key)
//!                 ├── Read(r)   ──▶ "W{key[1..]}:{value}"
//!                 ├── Write(s)  ──▶ apply setter ──▶ "{key}:={echo}"
//!                 └── None      ──▶ every registered callback, once each
//! ```
//!
//! Built-in commands use exactly the public setters of
//! [`BoardController`]; there is no private path.

use core::fmt::Write as _;

use log::debug;

use crate::boards::{Op, Reading, Setting};
use crate::comms::parse::Command;
use crate::comms::{Reply, Transport};
use crate::safety::ShutdownReason;

use super::ports::BoardHardware;
use super::service::BoardController;

impl<H: BoardHardware> BoardController<H> {
    /// Execute one parsed command and reply on `transport`.  Unknown keys
    /// (including the empty key of a line without a colon) go to the
    /// extension callbacks and get no built-in reply.
    pub fn dispatch(&mut self, cmd: &Command, transport: Transport) {
        debug!("{transport} <- {:?}:{:?}", cmd.key(), cmd.value());
        let key = cmd.key();
        let mut reply = Reply::new();
        // Keys fit in a line buffer, so formatted replies fit in a reply.
        match self.profile().lookup(key) {
            Some(Op::Read(reading)) => {
                let value = self.read(reading);
                let _ = write!(reply, "W{}:{}", key.get(1..).unwrap_or(""), value);
            }
            Some(Op::Write(setting)) => {
                let echo = self.write(setting, cmd.int_value());
                let _ = write!(reply, "{key}:={echo}");
            }
            None => {
                self.forward(cmd, transport);
                return;
            }
        }
        self.reply(transport, &reply);
    }

    /// Value of a built-in reading, in protocol units.
    pub fn read(&mut self, reading: Reading) -> i32 {
        match reading {
            Reading::Millivolts(i) => self.millivolts(i),
            Reading::Milliamps(i) => self.milliamps(i),
            Reading::Celsius(i) => self.celsius(i),
            Reading::AdcMillivolts(i) => self.adc_millivolts(i),
            Reading::TotalMilliamps => self.total_milliamps(),
            Reading::Vcc => self.vcc_mv(),
            Reading::Duty => i32::from(self.duty().percent()),
            Reading::Droop => self.droop_milliohms(),
            Reading::ShutdownCode => self.shutdown_code(),
            Reading::Output(i) => i32::from(self.output_state(i)),
        }
    }

    /// Apply a built-in setting; returns the value to echo.
    pub fn write(&mut self, setting: Setting, value: i32) -> i32 {
        match setting {
            Setting::CurrentLimit(ch) => self.set_current_limit(ch, value),
            Setting::TotalLimit => self.set_total_limit(value),
            Setting::ThermalLimit => self.set_thermal_limit(value),
            Setting::Droop => self.set_droop(value),
            Setting::Duty => return i32::from(self.set_duty_cycle(value).percent()),
            Setting::Shutdown => {
                self.shutdown(ShutdownReason::from_code(value));
            }
            Setting::Enable => self.enable_gate_drivers(),
            Setting::Output(ch) => {
                self.set_output(ch, value != 0);
                return i32::from(self.output_state(ch));
            }
        }
        value
    }
}
