//! A simulated scan chain behind the `Cable` trait.
//!
//! Every `SimTap` runs its own IEEE 1149.1 controller off the shared TMS/TCK lines.  The
//! instruction register captures `...01`, BYPASS (all ones) selects a one bit register that
//! captures 0, and any other instruction selects a data register whose length is configured per
//! instruction (BYPASS length if not configured).  TDI feeds the first TAP, the last TAP drives
//! TDO.  Outside the shift states TDO reads as pulled up.
//!
//! The cable also counts pin activity so tests can assert that a rejected operation never
//! touched the hardware.
use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;

use crate::cable::{Cable, Pin};
use crate::error::Result;
use crate::statemachine::TapState;

/// One device on the simulated chain.
#[derive(Clone, Debug)]
pub struct SimTap {
    ir_len: usize,
    ir_capture: u32,
    idcode: Option<(u32, u32)>,
    dr_lens: BTreeMap<u32, usize>,

    state: TapState,
    instruction: u32,
    ir: Vec<bool>,
    dr: Vec<bool>,
}

impl SimTap {
    /// A TAP with an `ir_len` bit instruction register that only implements BYPASS.
    ///
    /// # Panics
    ///
    /// Panics if `ir_len` is outside `2..=32`.
    pub fn new(ir_len: usize) -> Self {
        assert!((2..=32).contains(&ir_len), "IR length must be 2..=32");
        let mut tap = Self {
            ir_len,
            ir_capture: 0b01,
            idcode: None,
            dr_lens: BTreeMap::new(),
            state: TapState::TestLogicReset,
            instruction: 0,
            ir: vec![false; ir_len],
            dr: vec![false],
        };
        tap.instruction = tap.reset_instruction();
        tap
    }

    /// Implement IDCODE: `instruction` selects a 32 bit register capturing `idcode`, and the
    /// instruction is loaded on reset.
    pub fn with_idcode(mut self, instruction: u32, idcode: u32) -> Self {
        self.idcode = Some((instruction, idcode));
        self.instruction = self.reset_instruction();
        self
    }

    /// Give `instruction` a data register of `len` bits.
    pub fn with_dr(mut self, instruction: u32, len: usize) -> Self {
        self.dr_lens.insert(instruction, len.max(1));
        self
    }

    /// Value captured by the instruction register. The two low bits should stay `01`.
    pub fn with_ir_capture(mut self, capture: u32) -> Self {
        self.ir_capture = capture;
        self
    }

    pub fn state(&self) -> TapState {
        self.state
    }

    /// The instruction currently in effect (last Update-IR or reset).
    pub fn instruction(&self) -> u32 {
        self.instruction
    }

    fn bypass(&self) -> u32 {
        u32::MAX >> (32 - self.ir_len)
    }

    fn reset_instruction(&self) -> u32 {
        match self.idcode {
            Some((instruction, _)) => instruction,
            None => self.bypass(),
        }
    }

    fn dr_len(&self, instruction: u32) -> usize {
        if instruction == self.bypass() {
            return 1;
        }
        match self.idcode {
            Some((id_instr, _)) if id_instr == instruction => 32,
            _ => self.dr_lens.get(&instruction).copied().unwrap_or(1),
        }
    }

    fn reset(&mut self) {
        self.state = TapState::TestLogicReset;
        self.instruction = self.reset_instruction();
    }

    /// The bit this TAP presents on its TDO during the current cycle.
    fn serial_out(&self) -> bool {
        match self.state {
            TapState::ShiftIr => self.ir[0],
            TapState::ShiftDr => self.dr[0],
            _ => true,
        }
    }

    fn shift(reg: &mut [bool], tdi: bool) {
        reg.rotate_left(1);
        if let Some(last) = reg.last_mut() {
            *last = tdi;
        }
    }

    fn rising_edge(&mut self, tms: bool, tdi: bool) {
        match self.state {
            TapState::TestLogicReset => self.instruction = self.reset_instruction(),
            TapState::CaptureIr => {
                let capture = self.ir_capture;
                for (i, b) in self.ir.iter_mut().enumerate() {
                    *b = (capture >> i) & 1 != 0;
                }
            }
            TapState::ShiftIr => Self::shift(&mut self.ir, tdi),
            TapState::UpdateIr => {
                self.instruction = self
                    .ir
                    .iter()
                    .enumerate()
                    .fold(0, |acc, (i, b)| acc | (*b as u32) << i);
            }
            TapState::CaptureDr => {
                let len = self.dr_len(self.instruction);
                let value = match self.idcode {
                    Some((id_instr, idcode)) if id_instr == self.instruction => idcode,
                    _ => 0,
                };
                self.dr = (0..len).map(|i| i < 32 && (value >> i) & 1 != 0).collect();
            }
            TapState::ShiftDr => Self::shift(&mut self.dr, tdi),
            _ => {}
        }
        self.state = self.state.next(tms);
    }
}

/// Simulated cable driving a chain of `SimTap`s.
#[derive(Clone, Debug)]
pub struct SimCable {
    taps: Vec<SimTap>,
    tck: bool,
    tms: bool,
    tdi: bool,
    trst: bool,
    tdo: bool,
    stuck: Option<bool>,
    pin_writes: usize,
    tdo_reads: usize,
    clocks: usize,
}

impl SimCable {
    /// `taps[0]` is nearest to TDI.
    pub fn new(taps: Vec<SimTap>) -> Self {
        Self {
            taps,
            tck: false,
            tms: true,
            tdi: true,
            trst: true,
            tdo: true,
            stuck: None,
            pin_writes: 0,
            tdo_reads: 0,
            clocks: 0,
        }
    }

    /// Single TAP convenience constructor.
    pub fn single(tap: SimTap) -> Self {
        Self::new(vec![tap])
    }

    /// Force TDO to a fixed level (a wiring fault), or `None` to reconnect it.
    pub fn set_stuck(&mut self, level: Option<bool>) {
        self.stuck = level;
    }

    pub fn taps(&self) -> &[SimTap] {
        &self.taps
    }

    /// Controller state of the first TAP; every TAP follows the same TMS so they agree.
    pub fn state(&self) -> Option<TapState> {
        self.taps.first().map(SimTap::state)
    }

    /// Pin writes plus TDO reads since construction or the last `reset_counters`.
    pub fn pin_activity(&self) -> usize {
        self.pin_writes + self.tdo_reads
    }

    /// Rising TCK edges seen.
    pub fn clocks(&self) -> usize {
        self.clocks
    }

    pub fn reset_counters(&mut self) {
        self.pin_writes = 0;
        self.tdo_reads = 0;
        self.clocks = 0;
    }

    fn rising_edge(&mut self) {
        self.clocks += 1;
        let mut bit = self.tdi;
        for tap in self.taps.iter_mut() {
            let out = tap.serial_out();
            tap.rising_edge(self.tms, bit);
            bit = out;
        }
    }

    fn falling_edge(&mut self) {
        self.tdo = self.taps.last().map_or(true, SimTap::serial_out);
    }
}

impl Cable for SimCable {
    fn set_pin(&mut self, pin: Pin, high: bool) -> Result<()> {
        self.pin_writes += 1;
        match pin {
            Pin::Tck => {
                if high && !self.tck {
                    self.tck = true;
                    self.rising_edge();
                } else if !high && self.tck {
                    self.tck = false;
                    self.falling_edge();
                }
            }
            Pin::Tms => self.tms = high,
            Pin::Tdi => self.tdi = high,
            Pin::Trst => {
                if !high && self.trst {
                    self.taps.iter_mut().for_each(SimTap::reset);
                    self.tdo = true;
                }
                self.trst = high;
            }
        }
        Ok(())
    }

    fn read_tdo(&mut self) -> Result<bool> {
        self.tdo_reads += 1;
        Ok(self.stuck.unwrap_or(self.tdo))
    }

    fn delay_half_cycle(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(cable: &mut SimCable, tms: &[bool]) {
        for t in tms {
            cable.clock(*t, true).unwrap();
        }
    }

    #[test]
    #[should_panic(expected = "IR length must be 2..=32")]
    fn one_bit_ir_is_rejected() {
        SimTap::new(1);
    }

    #[test]
    #[should_panic(expected = "IR length must be 2..=32")]
    fn wide_ir_is_rejected() {
        SimTap::new(33);
    }

    #[test]
    fn taps_follow_tms() {
        let mut cable = SimCable::single(SimTap::new(4));
        walk(&mut cable, &[false, true, false, false]);
        assert_eq!(cable.state(), Some(TapState::ShiftDr));
        assert_eq!(cable.clocks(), 4);
    }

    #[test]
    fn idcode_after_reset() {
        let mut cable = SimCable::single(SimTap::new(4).with_idcode(0b0110, 0x1234_5677));
        // Reset -> Idle -> SelectDR -> CaptureDR -> ShiftDR
        walk(&mut cable, &[true, true, true, true, true, false, true, false, false]);
        let mut id = 0u32;
        for i in 0..32 {
            let bit = cable.clock(i == 31, false).unwrap();
            id |= (bit as u32) << i;
        }
        assert_eq!(id, 0x1234_5677);
        assert_eq!(cable.state(), Some(TapState::Exit1Dr));
    }

    #[test]
    fn trst_resets_instruction() {
        let mut tap = SimTap::new(4).with_idcode(0b0110, 1);
        tap.instruction = 0b0011;
        let mut cable = SimCable::single(tap);
        cable.set_pin(Pin::Trst, false).unwrap();
        cable.set_pin(Pin::Trst, true).unwrap();
        assert_eq!(cable.taps()[0].instruction(), 0b0110);
        assert_eq!(cable.state(), Some(TapState::TestLogicReset));
    }

    #[test]
    fn stuck_tdo() {
        let mut cable = SimCable::single(SimTap::new(4));
        cable.set_stuck(Some(false));
        assert!(!cable.read_tdo().unwrap());
        cable.set_stuck(None);
        assert!(cable.read_tdo().unwrap());
        assert_eq!(cable.pin_activity(), 2);
    }
}
