//! This provides a higher-level interface than the `Cable` trait.  Specifically, it keeps track of
//! the state of the TAP controller and only moves it along edges of the IEEE 1149.1 state graph,
//! one TCK cycle at a time.  `JtagSM::goto` will get to any state by the shortest path, based on
//! the current state.
use log::{debug, trace};

use crate::cable::{Cable, Pin};
use crate::config::Config;
use crate::error::{Error, Result};

/// Which register a shift goes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegKind {
    Data,
    Instruction,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TapState {
    TestLogicReset = 0,
    RunTestIdle = 1,
    SelectDr = 2,
    CaptureDr = 3,
    ShiftDr = 4,
    Exit1Dr = 5,
    PauseDr = 6,
    Exit2Dr = 7,
    UpdateDr = 8,
    SelectIr = 9,
    CaptureIr = 10,
    ShiftIr = 11,
    Exit1Ir = 12,
    PauseIr = 13,
    Exit2Ir = 14,
    UpdateIr = 15,
}

impl TapState {
    pub const ALL: [TapState; 16] = [
        TapState::TestLogicReset,
        TapState::RunTestIdle,
        TapState::SelectDr,
        TapState::CaptureDr,
        TapState::ShiftDr,
        TapState::Exit1Dr,
        TapState::PauseDr,
        TapState::Exit2Dr,
        TapState::UpdateDr,
        TapState::SelectIr,
        TapState::CaptureIr,
        TapState::ShiftIr,
        TapState::Exit1Ir,
        TapState::PauseIr,
        TapState::Exit2Ir,
        TapState::UpdateIr,
    ];

    /// The state reached after one TCK with the given TMS level.
    pub const fn next(self, tms: bool) -> TapState {
        use TapState::*;
        match (self, tms) {
            (TestLogicReset, false) => RunTestIdle,
            (TestLogicReset, true) => TestLogicReset,
            (RunTestIdle, false) => RunTestIdle,
            (RunTestIdle, true) => SelectDr,

            (SelectDr, false) => CaptureDr,
            (SelectDr, true) => SelectIr,
            (CaptureDr, false) => ShiftDr,
            (CaptureDr, true) => Exit1Dr,
            (ShiftDr, false) => ShiftDr,
            (ShiftDr, true) => Exit1Dr,
            (Exit1Dr, false) => PauseDr,
            (Exit1Dr, true) => UpdateDr,
            (PauseDr, false) => PauseDr,
            (PauseDr, true) => Exit2Dr,
            (Exit2Dr, false) => ShiftDr,
            (Exit2Dr, true) => UpdateDr,
            (UpdateDr, false) => RunTestIdle,
            (UpdateDr, true) => SelectDr,

            (SelectIr, false) => CaptureIr,
            (SelectIr, true) => TestLogicReset,
            (CaptureIr, false) => ShiftIr,
            (CaptureIr, true) => Exit1Ir,
            (ShiftIr, false) => ShiftIr,
            (ShiftIr, true) => Exit1Ir,
            (Exit1Ir, false) => PauseIr,
            (Exit1Ir, true) => UpdateIr,
            (PauseIr, false) => PauseIr,
            (PauseIr, true) => Exit2Ir,
            (Exit2Ir, false) => ShiftIr,
            (Exit2Ir, true) => UpdateIr,
            (UpdateIr, false) => RunTestIdle,
            (UpdateIr, true) => SelectDr,
        }
    }

    /// The TMS level that moves from `self` to `to` in one clock, if they are neighbours.
    pub fn tms_to(self, to: TapState) -> Option<bool> {
        if self.next(false) == to {
            Some(false)
        } else if self.next(true) == to {
            Some(true)
        } else {
            None
        }
    }

    pub fn is_shift(self) -> bool {
        matches!(self, TapState::ShiftDr | TapState::ShiftIr)
    }
}

/// Shortest sequence of states leading from `from` to `to`, excluding `from`.  Breadth first
/// over the 16 node graph; no path is longer than the node count.
fn path(from: TapState, to: TapState) -> ([TapState; 16], usize) {
    let mut prev: [Option<TapState>; 16] = [None; 16];
    let mut queue = [from; 16];
    let (mut head, mut tail) = (0, 1);
    let mut seen = [false; 16];
    seen[from as usize] = true;

    while head < tail {
        let s = queue[head];
        head += 1;
        if s == to {
            break;
        }
        for tms in [false, true] {
            let n = s.next(tms);
            if !seen[n as usize] {
                seen[n as usize] = true;
                prev[n as usize] = Some(s);
                queue[tail] = n;
                tail += 1;
            }
        }
    }

    let mut steps = [from; 16];
    let mut len = 0;
    let mut cur = to;
    while cur != from {
        steps[len] = cur;
        len += 1;
        match prev[cur as usize] {
            Some(p) => cur = p,
            None => break,
        }
    }
    steps[..len].reverse();
    (steps, len)
}

pub struct JtagSM<C> {
    pub cable: C,
    state: TapState,
    config: Config,
    fault: Option<Error>,
}

impl<C: Cable> JtagSM<C> {
    /// Create a JTAG state machine using an existing `Cable`.  The TAP is assumed to be in
    /// Test-Logic-Reset, as after power-up; call `reset` if that may not hold.
    pub fn new(cable: C) -> Self {
        Self::with_config(cable, Config::default())
    }

    pub fn with_config(cable: C, config: Config) -> Self {
        Self {
            cable,
            state: TapState::TestLogicReset,
            config,
            fault: None,
        }
    }

    pub fn state(&self) -> TapState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The stuck-at fault that stopped all clocking, if any.
    pub fn fault(&self) -> Option<Error> {
        self.fault
    }

    /// Allow clocking again after a stuck-at fault has been dealt with.  The TAP state is
    /// unknown at that point, so `reset` should follow.
    pub fn clear_fault(&mut self) {
        self.fault = None;
    }

    /// Record a fatal fault and hand it back for returning.
    pub(crate) fn latch(&mut self, fault: Error) -> Error {
        if fault.is_fatal() {
            self.fault = Some(fault);
        }
        fault
    }

    fn check_fault(&self) -> Result<()> {
        match self.fault {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }

    /// One TCK cycle with `tms`/`tdi`, tracking the resulting state.  Returns TDO.
    pub(crate) fn step(&mut self, tms: bool, tdi: bool) -> Result<bool> {
        self.check_fault()?;
        let tdo = self.cable.clock(tms, tdi)?;
        let next = self.state.next(tms);
        trace!("TAP {:?} -> {:?}", self.state, next);
        self.state = next;
        Ok(tdo)
    }

    /// Move to a neighbouring state with one TCK cycle.
    pub fn advance(&mut self, next: TapState) -> Result<()> {
        let tms = self.state.tms_to(next).ok_or(Error::BadTapState)?;
        self.step(tms, true)?;
        Ok(())
    }

    /// Reset the TAP by driving TMS high for 5 clocks.  Works from any state, including an
    /// unknown one.
    pub fn reset(&mut self) -> Result<()> {
        self.check_fault()?;
        debug!("TAP reset");
        for _ in 0..5 {
            self.cable.clock(true, true)?;
        }
        self.state = TapState::TestLogicReset;
        Ok(())
    }

    /// Pulse the optional TRST line.  Cables without TRST treat this as a no-op, so follow with
    /// `reset` when unsure.
    pub fn trst_reset(&mut self) -> Result<()> {
        self.check_fault()?;
        debug!("TRST pulse");
        self.cable.set_pin(Pin::Trst, false)?;
        self.cable.delay_half_cycle();
        self.cable.delay_half_cycle();
        self.cable.set_pin(Pin::Trst, true)?;
        self.state = TapState::TestLogicReset;
        Ok(())
    }

    /// Use TMS to get into `state` by the shortest path.
    pub fn goto(&mut self, state: TapState) -> Result<()> {
        if self.state == state {
            return Ok(());
        }
        let (steps, len) = path(self.state, state);
        for s in &steps[..len] {
            self.advance(*s)?;
        }
        Ok(())
    }

    /// Clock `ticks` cycles in Run-Test/Idle.
    pub fn idle(&mut self, ticks: u32) -> Result<()> {
        if self.state != TapState::RunTestIdle {
            return Err(Error::BadTapState);
        }
        for _ in 0..ticks {
            self.advance(TapState::RunTestIdle)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cable::sim::{SimCable, SimTap};

    fn sm() -> JtagSM<SimCable> {
        JtagSM::new(SimCable::single(SimTap::new(4)))
    }

    #[test]
    fn every_state_has_two_exits() {
        for s in TapState::ALL {
            assert_eq!(s.tms_to(s.next(false)), Some(false));
            assert_eq!(s.tms_to(s.next(true)), Some(true));
        }
    }

    #[test]
    fn update_ir_goes_to_select_dr() {
        assert_eq!(TapState::UpdateIr.next(true), TapState::SelectDr);
        assert_eq!(TapState::UpdateIr.next(false), TapState::RunTestIdle);
    }

    #[test]
    fn advance_rejects_non_neighbour_without_clocking() {
        let mut sm = sm();
        assert_eq!(sm.advance(TapState::ShiftDr), Err(Error::BadTapState));
        assert_eq!(sm.state(), TapState::TestLogicReset);
        assert_eq!(sm.cable.pin_activity(), 0);
    }

    #[test]
    fn advance_tracks_cable() {
        let mut sm = sm();
        for s in [
            TapState::RunTestIdle,
            TapState::SelectDr,
            TapState::SelectIr,
            TapState::CaptureIr,
            TapState::ShiftIr,
        ] {
            sm.advance(s).unwrap();
            assert_eq!(sm.cable.state(), Some(s));
        }
        assert_eq!(sm.cable.clocks(), 5);
    }

    #[test]
    fn goto_takes_shortest_path() {
        let mut sm = sm();
        sm.goto(TapState::ShiftIr).unwrap();
        assert_eq!(sm.cable.clocks(), 5);
        assert_eq!(sm.cable.state(), Some(TapState::ShiftIr));

        sm.cable.reset_counters();
        sm.goto(TapState::PauseDr).unwrap();
        // Exit1IR, UpdateIR, SelectDR, CaptureDR, Exit1DR, PauseDR
        assert_eq!(sm.cable.clocks(), 6);
        assert_eq!(sm.state(), TapState::PauseDr);

        sm.cable.reset_counters();
        sm.goto(TapState::PauseDr).unwrap();
        assert_eq!(sm.cable.clocks(), 0);
    }

    #[test]
    fn reset_from_anywhere() {
        let mut sm = sm();
        sm.goto(TapState::Exit2Dr).unwrap();
        sm.reset().unwrap();
        assert_eq!(sm.state(), TapState::TestLogicReset);
        assert_eq!(sm.cable.state(), Some(TapState::TestLogicReset));
        sm.reset().unwrap();
        assert_eq!(sm.state(), TapState::TestLogicReset);
    }

    #[test]
    fn idle_requires_run_test_idle() {
        let mut sm = sm();
        assert_eq!(sm.idle(3), Err(Error::BadTapState));
        sm.advance(TapState::RunTestIdle).unwrap();
        sm.cable.reset_counters();
        sm.idle(3).unwrap();
        assert_eq!(sm.cable.clocks(), 3);
        assert_eq!(sm.state(), TapState::RunTestIdle);
    }

    #[test]
    fn fault_stops_clocking() {
        let mut sm = sm();
        assert_eq!(sm.latch(Error::TdoStuckAt1), Error::TdoStuckAt1);
        sm.cable.reset_counters();
        assert_eq!(sm.reset(), Err(Error::TdoStuckAt1));
        assert_eq!(sm.advance(TapState::RunTestIdle), Err(Error::TdoStuckAt1));
        assert_eq!(sm.cable.pin_activity(), 0);
        sm.clear_fault();
        sm.reset().unwrap();
    }

    #[test]
    fn trst_pulse() {
        let mut sm = sm();
        sm.goto(TapState::ShiftDr).unwrap();
        sm.cable.reset_counters();
        sm.trst_reset().unwrap();
        assert_eq!(sm.state(), TapState::TestLogicReset);
        assert_eq!(sm.cable.state(), Some(TapState::TestLogicReset));
        assert_eq!(sm.cable.clocks(), 0);
    }

    #[test]
    fn non_fatal_errors_are_not_latched() {
        let mut sm = sm();
        sm.latch(Error::BadTapState);
        assert_eq!(sm.fault(), None);
    }
}
