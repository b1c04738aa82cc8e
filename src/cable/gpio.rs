//! Bit-banged JTAG on plain GPIO lines through the `embedded-hal` 1.0 traits.
use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, ErrorType, InputPin, OutputPin, PinState};

use crate::cable::{Cable, Pin};
use crate::error::{Error, Result};

fn pin_error<E: digital::Error>(e: E) -> Error {
    Error::Pin(e.kind())
}

/// Stand-in for a TRST line that is not wired.  Driving it does nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPin;

impl ErrorType for NoPin {
    type Error = Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> core::result::Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> core::result::Result<(), Self::Error> {
        Ok(())
    }
}

pub struct Gpio<Clk, Tdi, Tdo, Tms, Delay, Trst = NoPin>
where
    Clk: OutputPin,
    Tdi: OutputPin,
    Tdo: InputPin,
    Tms: OutputPin,
    Delay: DelayNs,
    Trst: OutputPin,
{
    half_period: u32,
    delay: Delay,
    clock: Clk,
    tdi: Tdi,
    tdo: Tdo,
    tms: Tms,
    trst: Trst,
}

impl<Clk, Tdi, Tdo, Tms, Delay> Gpio<Clk, Tdi, Tdo, Tms, Delay, NoPin>
where
    Clk: OutputPin,
    Tdi: OutputPin,
    Tdo: InputPin,
    Tms: OutputPin,
    Delay: DelayNs,
{
    /// Drive TCK at roughly `freq_khz`.  The lines are left as the board configured them; TCK
    /// should start low.
    pub fn new(freq_khz: u32, clock: Clk, tdi: Tdi, tdo: Tdo, tms: Tms, delay: Delay) -> Self {
        let period_ns = 1_000_000 / freq_khz.max(1);
        let half_period = period_ns / 2;
        Gpio { half_period, delay, clock, tdi, tdo, tms, trst: NoPin }
    }

    /// Attach a TRST line.  It is released (driven high) immediately.
    pub fn with_trst<T: OutputPin>(self, mut trst: T) -> Result<Gpio<Clk, Tdi, Tdo, Tms, Delay, T>> {
        trst.set_high().map_err(pin_error)?;
        Ok(Gpio {
            half_period: self.half_period,
            delay: self.delay,
            clock: self.clock,
            tdi: self.tdi,
            tdo: self.tdo,
            tms: self.tms,
            trst,
        })
    }
}

impl<Clk, Tdi, Tdo, Tms, Delay, Trst> Gpio<Clk, Tdi, Tdo, Tms, Delay, Trst>
where
    Clk: OutputPin,
    Tdi: OutputPin,
    Tdo: InputPin,
    Tms: OutputPin,
    Delay: DelayNs,
    Trst: OutputPin,
{
    /// Half TCK period in nanoseconds.
    pub fn half_period_ns(&self) -> u32 {
        self.half_period
    }

    /// Give the pins back, e.g. to put them into high impedance.
    pub fn release(self) -> (Clk, Tdi, Tdo, Tms, Delay, Trst) {
        (self.clock, self.tdi, self.tdo, self.tms, self.delay, self.trst)
    }
}

impl<Clk, Tdi, Tdo, Tms, Delay, Trst> Cable for Gpio<Clk, Tdi, Tdo, Tms, Delay, Trst>
where
    Clk: OutputPin,
    Tdi: OutputPin,
    Tdo: InputPin,
    Tms: OutputPin,
    Delay: DelayNs,
    Trst: OutputPin,
{
    fn set_pin(&mut self, pin: Pin, high: bool) -> Result<()> {
        let state = PinState::from(high);
        match pin {
            Pin::Tck => self.clock.set_state(state).map_err(pin_error),
            Pin::Tms => self.tms.set_state(state).map_err(pin_error),
            Pin::Tdi => self.tdi.set_state(state).map_err(pin_error),
            Pin::Trst => self.trst.set_state(state).map_err(pin_error),
        }
    }

    fn read_tdo(&mut self) -> Result<bool> {
        self.tdo.is_high().map_err(pin_error)
    }

    fn delay_half_cycle(&mut self) {
        self.delay.delay_ns(self.half_period);
    }
}
