//! Pin-level access to the JTAG lines.  Hardware backends implement the `Cable` trait; everything
//! above it (state machine, shifter, discovery) only ever talks to the lines through it.
pub mod gpio;
pub mod sim;

use crate::error::Result;

/// The lines driven by the master.  TDO is the only input and has its own accessor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pin {
    Tck,
    Tms,
    Tdi,
    /// Optional, active low.
    Trst,
}

pub trait Cable {
    /// Drive `pin` high or low.
    fn set_pin(&mut self, pin: Pin, high: bool) -> Result<()>;
    /// Sample the TDO line.
    fn read_tdo(&mut self) -> Result<bool>;
    /// Wait for half a TCK period.
    fn delay_half_cycle(&mut self);

    /// One full TCK cycle with the given TMS and TDI levels.  TCK is expected to be low on entry
    /// and is low again on return.  TDO is sampled right after the rising edge, i.e. the bit the
    /// target drove on the previous falling edge.
    fn clock(&mut self, tms: bool, tdi: bool) -> Result<bool> {
        self.set_pin(Pin::Tms, tms)?;
        self.set_pin(Pin::Tdi, tdi)?;
        self.set_pin(Pin::Tck, true)?;
        let tdo = self.read_tdo()?;
        self.delay_half_cycle();
        self.set_pin(Pin::Tck, false)?;
        self.delay_half_cycle();
        Ok(tdo)
    }
}

impl<T: Cable + ?Sized> Cable for &mut T {
    fn set_pin(&mut self, pin: Pin, high: bool) -> Result<()> {
        (**self).set_pin(pin, high)
    }

    fn read_tdo(&mut self) -> Result<bool> {
        (**self).read_tdo()
    }

    fn delay_half_cycle(&mut self) {
        (**self).delay_half_cycle()
    }

    fn clock(&mut self, tms: bool, tdi: bool) -> Result<bool> {
        (**self).clock(tms, tdi)
    }
}
