//! Instruction and data register shifting on top of `JtagSM`.
//!
//! Both `insert_*` calls walk Select -> Capture -> Shift, clock `len` bits (TDI from the input
//! buffer, TDO into the output buffer, TMS high on the last bit to land in Exit1) and then walk
//! to the requested end state.  Lengths and end states are validated before any pin moves.
use log::debug;

use crate::bits::BitArray;
use crate::cable::Cable;
use crate::error::{Error, Result};
use crate::statemachine::{JtagSM, RegKind, TapState};

/// Zero the first `len` bits of a register buffer.
pub fn clear_reg<const N: usize>(reg: &mut BitArray<N>, len: usize) {
    reg.clear(len);
}

impl<C: Cable> JtagSM<C> {
    fn check_len(&self, len: usize, in_cap: usize, out_cap: usize) -> Result<()> {
        if len == 0 || len > self.config().max_dr_len || len > in_cap || len > out_cap {
            return Err(Error::InvalidIrOrDrLen);
        }
        Ok(())
    }

    /// Clock one bit through the selected register.  `last` raises TMS so the TAP moves on to
    /// Exit1 instead of staying in Shift.  Returns the bit sampled on TDO.
    pub fn shift_bit(&mut self, tdi: bool, last: bool) -> Result<bool> {
        if !self.state().is_shift() {
            return Err(Error::BadTapState);
        }
        self.step(last, tdi)
    }

    fn insert<const N: usize, const M: usize>(
        &mut self,
        reg: RegKind,
        input: &BitArray<N>,
        len: usize,
        end_state: TapState,
        output: &mut BitArray<M>,
    ) -> Result<()> {
        let (select, capture, shift) = match reg {
            RegKind::Data => (TapState::SelectDr, TapState::CaptureDr, TapState::ShiftDr),
            RegKind::Instruction => (TapState::SelectIr, TapState::CaptureIr, TapState::ShiftIr),
        };
        self.goto(select)?;
        self.advance(capture)?;
        self.advance(shift)?;

        output.clear_all();
        for i in 0..len {
            let tdo = self.shift_bit(input.bit(i), i == len - 1)?;
            output.set(i, tdo)?;
        }
        debug!("{:?} register: {} bits in, out 0b{}", reg, len, output);
        self.goto(end_state)
    }

    /// Shift `dr_len` bits of `dr_in` into the data register, capturing TDO into `dr_out`, and
    /// finish in `end_state` (Test-Logic-Reset or Run-Test/Idle).
    pub fn insert_dr<const N: usize, const M: usize>(
        &mut self,
        dr_in: &BitArray<N>,
        dr_len: usize,
        end_state: TapState,
        dr_out: &mut BitArray<M>,
    ) -> Result<()> {
        if !matches!(end_state, TapState::TestLogicReset | TapState::RunTestIdle) {
            return Err(Error::BadTapState);
        }
        self.check_len(dr_len, N, M)?;
        self.insert(RegKind::Data, dr_in, dr_len, end_state, dr_out)
    }

    /// Shift `ir_len` bits of `ir_in` into the instruction register, capturing TDO into
    /// `ir_out`.  Besides Test-Logic-Reset and Run-Test/Idle, `end_state` may be Select-DR-Scan
    /// so a data register shift can follow directly.
    pub fn insert_ir<const N: usize, const M: usize>(
        &mut self,
        ir_in: &BitArray<N>,
        ir_len: usize,
        end_state: TapState,
        ir_out: &mut BitArray<M>,
    ) -> Result<()> {
        if !matches!(
            end_state,
            TapState::TestLogicReset | TapState::RunTestIdle | TapState::SelectDr
        ) {
            return Err(Error::BadTapState);
        }
        self.check_len(ir_len, N, M)?;
        self.insert(RegKind::Instruction, ir_in, ir_len, end_state, ir_out)
    }

    /// Shift zeros through both registers and leave the buffers cleared, ending in
    /// Run-Test/Idle.
    pub fn flush_ir_dr<const N: usize, const M: usize>(
        &mut self,
        ir_reg: &mut BitArray<N>,
        dr_reg: &mut BitArray<M>,
        ir_len: usize,
        dr_len: usize,
    ) -> Result<()> {
        self.check_len(ir_len, N, N)?;
        self.check_len(dr_len, M, M)?;
        clear_reg(ir_reg, ir_len);
        clear_reg(dr_reg, dr_len);

        self.insert_ir(&BitArray::<N>::new(), ir_len, TapState::RunTestIdle, ir_reg)?;
        self.insert_dr(&BitArray::<M>::new(), dr_len, TapState::RunTestIdle, dr_reg)?;
        ir_reg.clear_all();
        dr_reg.clear_all();
        Ok(())
    }
}
