//! `embedded-hal` 1.0 bridge.
//!
//! Wraps HAL pin, PWM and delay drivers behind [`BoardHardware`] so a
//! real MCU can host the controller.  ADC sampling and serial output are
//! vendor-specific and come in as closures.
//!
//! Digital lines are treated as open-drain: [`DigitalPort::release`]
//! drives the pin high, which on an open-drain output lets external
//! circuitry (pull-up, protection latch) own the line.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::pwm::SetDutyCycle;
use heapless::Vec;
use log::warn;

use crate::app::ports::{AnalogPort, DelayPort, DigitalPort, Level, PwmPort, SerialPort};
use crate::error::{Error, Result};
use crate::pins::Pin;

/// Most digital lines one adapter maps.
pub const MAX_DIGITAL_PINS: usize = 16;

/// What the ADC closure is asked to sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdcInput {
    Channel(Pin),
    /// Internal bandgap against the supply rail.
    Reference,
}

pub struct HalBoard<P, PWM, D, A, S> {
    pins: Vec<(Pin, P), MAX_DIGITAL_PINS>,
    pwm: PWM,
    delay: D,
    adc: A,
    serial: S,
}

impl<P, PWM, D, A, S> HalBoard<P, PWM, D, A, S>
where
    P: OutputPin + InputPin,
    PWM: SetDutyCycle,
    D: DelayNs,
    A: FnMut(AdcInput) -> u16,
    S: FnMut(&[u8]),
{
    /// Lines passed to [`with_pin`](Self::with_pin) must be open-drain.
    /// `release` writes HIGH, which only floats an open-drain line; on a
    /// push-pull pin it drives the line high and would switch active-high
    /// outputs on.
    pub fn new(pwm: PWM, delay: D, adc: A, serial: S) -> Self {
        Self {
            pins: Vec::new(),
            pwm,
            delay,
            adc,
            serial,
        }
    }

    /// Map board pin number `pin` to a HAL line.
    pub fn with_pin(mut self, pin: Pin, line: P) -> Result<Self> {
        self.pins
            .push((pin, line))
            .map_err(|_| Error::Hardware("digital pin table full"))?;
        Ok(self)
    }

    pub fn pwm(&self) -> &PWM {
        &self.pwm
    }

    fn line(&mut self, pin: Pin) -> Option<&mut P> {
        let line = self.pins.iter_mut().find(|(p, _)| *p == pin).map(|(_, l)| l);
        if line.is_none() {
            warn!("pin {pin} is not mapped");
        }
        line
    }
}

impl<P, PWM, D, A, S> AnalogPort for HalBoard<P, PWM, D, A, S>
where
    P: OutputPin + InputPin,
    PWM: SetDutyCycle,
    D: DelayNs,
    A: FnMut(AdcInput) -> u16,
    S: FnMut(&[u8]),
{
    fn read_channel(&mut self, pin: Pin) -> u16 {
        (self.adc)(AdcInput::Channel(pin))
    }

    fn read_reference(&mut self) -> u16 {
        (self.adc)(AdcInput::Reference)
    }
}

impl<P, PWM, D, A, S> DigitalPort for HalBoard<P, PWM, D, A, S>
where
    P: OutputPin + InputPin,
    PWM: SetDutyCycle,
    D: DelayNs,
    A: FnMut(AdcInput) -> u16,
    S: FnMut(&[u8]),
{
    fn set_output(&mut self, pin: Pin, level: Level) {
        let Some(line) = self.line(pin) else { return };
        let result = match level {
            Level::High => line.set_high(),
            Level::Low => line.set_low(),
        };
        if let Err(e) = result {
            warn!("pin {pin} write failed: {e:?}");
        }
    }

    fn release(&mut self, pin: Pin) {
        self.set_output(pin, Level::High);
    }

    /// Read failures report LOW, which a latch line treats as tripped.
    fn read_input(&mut self, pin: Pin) -> Level {
        let Some(line) = self.line(pin) else {
            return Level::Low;
        };
        match line.is_high() {
            Ok(high) => Level::from(high),
            Err(e) => {
                warn!("pin {pin} read failed: {e:?}");
                Level::Low
            }
        }
    }
}

impl<P, PWM, D, A, S> PwmPort for HalBoard<P, PWM, D, A, S>
where
    P: OutputPin + InputPin,
    PWM: SetDutyCycle,
    D: DelayNs,
    A: FnMut(AdcInput) -> u16,
    S: FnMut(&[u8]),
{
    fn set_duty(&mut self, percent: u8) {
        if let Err(e) = self.pwm.set_duty_cycle_percent(percent) {
            warn!("pwm write failed: {e:?}");
        }
    }
}

impl<P, PWM, D, A, S> DelayPort for HalBoard<P, PWM, D, A, S>
where
    P: OutputPin + InputPin,
    PWM: SetDutyCycle,
    D: DelayNs,
    A: FnMut(AdcInput) -> u16,
    S: FnMut(&[u8]),
{
    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }
}

impl<P, PWM, D, A, S> SerialPort for HalBoard<P, PWM, D, A, S>
where
    P: OutputPin + InputPin,
    PWM: SetDutyCycle,
    D: DelayNs,
    A: FnMut(AdcInput) -> u16,
    S: FnMut(&[u8]),
{
    fn serial_write(&mut self, bytes: &[u8]) {
        (self.serial)(bytes);
    }
}
