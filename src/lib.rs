//! A bit-banged JTAG master.  This crate drives the TCK, TMS, TDI, TDO (and optional TRST) lines
//! of an IEEE 1149.1 Test Access Port from plain GPIOs and builds register level access and
//! chain discovery on top of that.
//!
//! At the lowest level is the `Cable` trait, which sets pins, samples TDO and waits half a clock
//! period.  `cable::gpio::Gpio` implements it on `embedded-hal` pins; `cable::sim::SimCable` is a
//! simulated chain of TAPs for tests and demos.
//!
//! The next higher level of abstraction is the `JtagSM`, which keeps track of the state of the
//! TAPs.  You tell it which state you want (e.g., Test-Logic-Reset or Run-Test/Idle) and it gets
//! there with the fewest TMS transitions.  `insert_ir` and `insert_dr` shift the instruction and
//! data registers through caller owned `BitArray` buffers, taking care of getting into Shift-IR or
//! Shift-DR and out again.
//!
//! `Taps` wraps the state machine and finds out what is on the chain: the total instruction
//! register length, the number of devices, the IDCODE, and the data register length selected by
//! each instruction.
//!
//! Finally `Session` offers all of the above as a single character menu on a `Console`.
//!
//! # Example
//! ```
//! use jtagger::cable::sim::{SimCable, SimTap};
//! use jtagger::statemachine::JtagSM;
//! use jtagger::taps::Taps;
//!
//! let cable = SimCable::single(SimTap::new(6).with_idcode(0x6, 0x020f_10dd));
//! let mut taps = Taps::new(JtagSM::new(cable));
//! assert_eq!(taps.detect_chain()?, 6);
//!
//! let idcode = taps.read_idcode()?;
//! assert_eq!(idcode.part_number(), 0x20f1);
//! # Ok::<(), jtagger::Error>(())
//! ```

#![cfg_attr(not(test), no_std)]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

pub mod bits;
pub mod cable;
pub mod config;
pub mod console;
pub mod error;
pub mod session;
pub mod shift;
pub mod statemachine;
pub mod taps;

pub use error::{Error, Result};
