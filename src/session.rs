//! The interactive front end: a single character menu on a `Console` that drives `Taps`.
//!
//! Errors are handled per command.  Bad input is reported and the menu comes back.  A TAP or
//! pin error resets the TAP first.  Stuck-at faults and console failures end the session and
//! are returned from `run`.
use alloc::format;
use alloc::vec::Vec;
use core::ops::ControlFlow;

use log::debug;

use crate::bits::{BitArray, Register};
use crate::cable::Cable;
use crate::console::{parse_number, Console};
use crate::error::{Error, Result};
use crate::statemachine::TapState;
use crate::taps::{Discovered, Taps};

const MENU: &[&str] = &[
    "",
    "JTAG Menu:",
    "a - Detect chain",
    "b - Read IDCODE",
    "c - Count devices",
    "d - Insert IR",
    "e - Insert DR",
    "f - Detect DR length",
    "g - Discovery",
    "h - Check connection",
    "i - Reset TAP",
    "j - Flush IR and DR",
    "z - Exit",
];

/// Prompt until the text parses into `dest`.  Only console errors get out.
fn ask_bits<K: Console, const N: usize>(
    console: &mut K,
    prompt: &str,
    dest: &mut BitArray<N>,
) -> Result<()> {
    loop {
        match parse_number(console, prompt, dest) {
            Ok(_) => return Ok(()),
            Err(e) if e.is_input_error() => console.write_line(&format!("{}, try again", e))?,
            Err(e) => return Err(e),
        }
    }
}

/// Like `ask_bits`, but also asks again while the value needs more than `len` bits.
fn ask_fitting<K: Console, const N: usize>(
    console: &mut K,
    prompt: &str,
    dest: &mut BitArray<N>,
    len: usize,
) -> Result<()> {
    loop {
        ask_bits(console, prompt, dest)?;
        if dest.significant_bits() <= len {
            return Ok(());
        }
        console.write_line(&format!("{}, {} bits max, try again", Error::OutOfBounds, len))?;
    }
}

pub struct Session<C, K> {
    taps: Taps<C>,
    console: K,
    /// Total IR length of the chain, 0 while unknown.
    ir_len: usize,
    ir_in: Register,
    ir_out: Register,
    dr_in: Register,
    dr_out: Register,
}

impl<C: Cable, K: Console> Session<C, K> {
    pub fn new(taps: Taps<C>, console: K) -> Self {
        Self {
            taps,
            console,
            ir_len: 0,
            ir_in: Register::new(),
            ir_out: Register::new(),
            dr_in: Register::new(),
            dr_out: Register::new(),
        }
    }

    pub fn taps(&mut self) -> &mut Taps<C> {
        &mut self.taps
    }

    pub fn into_parts(self) -> (Taps<C>, K) {
        (self.taps, self.console)
    }

    /// Serve commands until `z` is entered.
    pub fn run(&mut self) -> Result<()> {
        loop {
            for line in MENU {
                self.console.write_line(line)?;
            }
            self.console.clear_input()?;
            let cmd = self.console.read_char("> ")?;
            match self.command(cmd) {
                Ok(ControlFlow::Continue(())) => {}
                Ok(ControlFlow::Break(())) => return Ok(()),
                Err(e) => self.recover(e)?,
            }
        }
    }

    fn recover(&mut self, e: Error) -> Result<()> {
        if e.is_fatal() || matches!(e, Error::Io(_)) {
            return Err(e);
        }
        self.console.write_line(&format!("error: {}", e))?;
        if matches!(e, Error::BadTapState | Error::Pin(_)) {
            self.taps.sm.reset()?;
            self.console.write_line("TAP reset")?;
        }
        Ok(())
    }

    fn ask_number(&mut self, prompt: &str) -> Result<u32> {
        let mut value = BitArray::<32>::new();
        loop {
            ask_bits(&mut self.console, prompt, &mut value)?;
            match value.to_u32() {
                Ok(v) => return Ok(v),
                Err(_) => self.console.write_line("number too large, try again")?,
            }
        }
    }

    fn ask_len(&mut self, prompt: &str) -> Result<usize> {
        let max = self.taps.sm.config().max_dr_len;
        loop {
            let len = self.ask_number(prompt)? as usize;
            if len > 0 && len <= max {
                return Ok(len);
            }
            self.console.write_line(&format!("length must be 1..={}", max))?;
        }
    }

    /// The chain IR length, asking for it if `a` has not been run.
    fn ir_len(&mut self) -> Result<usize> {
        if self.ir_len == 0 {
            self.ir_len = self.ask_len("IR length: ")?;
        }
        Ok(self.ir_len)
    }

    /// Run one menu command.
    pub fn command(&mut self, cmd: char) -> Result<ControlFlow<()>> {
        debug!("command '{}'", cmd);
        match cmd {
            'a' => {
                self.ir_len = self.taps.detect_chain()?;
                if self.ir_len == 0 {
                    self.console.write_line("No chain detected")?;
                } else {
                    self.console.write_line(&format!("IR length {}", self.ir_len))?;
                }
            }
            'b' => {
                let idcode = self.taps.read_idcode()?;
                self.console.write_line(&format!("IDCODE {}", idcode))?;
            }
            'c' => {
                let ir_len = self.ir_len()?;
                let devices = self.taps.count_devices(ir_len)?;
                self.console.write_line(&format!("{} device(s)", devices))?;
            }
            'd' => {
                let ir_len = self.ir_len()?;
                ask_fitting(&mut self.console, "IR value: ", &mut self.ir_in, ir_len)?;
                self.taps
                    .sm
                    .insert_ir(&self.ir_in, ir_len, TapState::RunTestIdle, &mut self.ir_out)?;
                self.console.write_line(&format!(
                    "IR out: 0x{} (0b{})",
                    self.ir_out.to_hex_string(),
                    self.ir_out
                ))?;
            }
            'e' => {
                let dr_len = self.ask_len("DR length: ")?;
                ask_fitting(&mut self.console, "DR value: ", &mut self.dr_in, dr_len)?;
                self.taps
                    .sm
                    .insert_dr(&self.dr_in, dr_len, TapState::RunTestIdle, &mut self.dr_out)?;
                self.console.write_line(&format!(
                    "DR out: 0x{} ({})",
                    self.dr_out.to_hex_string(),
                    self.dr_out.to_dec_string()
                ))?;
            }
            'f' => {
                let ir_len = self.ir_len()?;
                ask_fitting(&mut self.console, "Instruction: ", &mut self.ir_in, ir_len)?;
                let ticks = self.taps.sm.config().process_ticks;
                let len = self.taps.detect_dr_len(&self.ir_in, ir_len, ticks)?;
                self.console.write_line(&format!("DR length {}", len))?;
            }
            'g' => {
                let ir_len = self.ir_len()?;
                let first = self.ask_number("First instruction: ")?;
                let last = self.ask_number("Last instruction: ")?;
                let max_dr_len = self.taps.sm.config().max_dr_len;
                let mut found: Vec<Discovered> = Vec::new();
                self.taps.discovery(
                    first,
                    last,
                    max_dr_len,
                    ir_len,
                    &mut self.ir_in,
                    &mut self.ir_out,
                    |d| found.push(d),
                )?;
                for d in found {
                    let note = if d.suspicious { " (suspicious)" } else { "" };
                    self.console.write_line(&format!(
                        "IR 0x{:X}: DR length {}{}",
                        d.instruction, d.dr_len, note
                    ))?;
                }
            }
            'h' => {
                self.taps.check_connection()?;
                self.console.write_line("Connection OK")?;
            }
            'i' => {
                self.taps.sm.reset()?;
                self.console.write_line("TAP reset")?;
            }
            'j' => {
                let ir_len = self.ir_len()?;
                let dr_len = self.taps.sm.config().max_dr_len;
                self.taps
                    .sm
                    .flush_ir_dr(&mut self.ir_in, &mut self.dr_in, ir_len, dr_len)?;
                self.ir_out.clear_all();
                self.dr_out.clear_all();
                self.console.write_line("Registers flushed")?;
            }
            'z' => return Ok(ControlFlow::Break(())),
            _ => self.console.write_line(&format!("unknown command '{}'", cmd))?,
        }
        Ok(ControlFlow::Continue(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cable::sim::{SimCable, SimTap};
    use crate::statemachine::JtagSM;
    use alloc::collections::VecDeque;
    use alloc::string::{String, ToString};
    use alloc::vec;
    use embedded_io::ErrorKind;

    #[derive(Default)]
    struct Script {
        input: VecDeque<String>,
        output: Vec<String>,
    }

    impl Script {
        fn new(lines: &[&str]) -> Self {
            Self { input: lines.iter().map(|l| l.to_string()).collect(), output: Vec::new() }
        }

        fn printed(&self, text: &str) -> bool {
            self.output.iter().any(|l| l.contains(text))
        }
    }

    impl Console for Script {
        fn read_line(&mut self, _prompt: &str) -> Result<String> {
            self.input.pop_front().ok_or(Error::Io(ErrorKind::BrokenPipe))
        }

        fn read_char(&mut self, prompt: &str) -> Result<char> {
            let line = self.read_line(prompt)?;
            line.chars().next().ok_or(Error::Io(ErrorKind::InvalidData))
        }

        fn write_line(&mut self, text: &str) -> Result<()> {
            self.output.push(text.to_string());
            Ok(())
        }

        fn clear_input(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn session(chain: Vec<SimTap>, script: &[&str]) -> Session<SimCable, Script> {
        Session::new(Taps::new(JtagSM::new(SimCable::new(chain))), Script::new(script))
    }

    #[test]
    fn detect_and_identify() {
        let mut s = session(vec![SimTap::new(6).with_idcode(0x6, 0x020f_10dd)], &["a", "b", "z"]);
        s.run().unwrap();
        let (_, console) = s.into_parts();
        assert!(console.printed("IR length 6"));
        assert!(console.printed("IDCODE 0x020F10DD"));
    }

    #[test]
    fn bad_number_is_asked_again() {
        let mut s = session(vec![SimTap::new(4)], &["d", "0", "4", "0xZZ", "0x", "0xF", "z"]);
        s.run().unwrap();
        let (mut taps, console) = s.into_parts();
        assert!(console.printed("length must be 1..=512"));
        assert!(console.printed("illegal character in number, try again"));
        assert!(console.printed("malformed number prefix or suffix, try again"));
        assert!(console.printed("IR out: 0x1 (0b0001)"));
        assert_eq!(taps.sm.cable.taps()[0].instruction(), 0xf);
        assert_eq!(taps.sm.state(), TapState::RunTestIdle);
        taps.sm.reset().unwrap();
    }

    #[test]
    fn wide_value_is_asked_again() {
        let mut s = session(
            vec![SimTap::new(4)],
            &["d", "4", "0x1F3", "0x3", "e", "2", "0b111", "0b1", "z"],
        );
        s.run().unwrap();
        let (taps, console) = s.into_parts();
        assert!(console.printed("value out of bounds, 4 bits max, try again"));
        assert!(console.printed("value out of bounds, 2 bits max, try again"));
        assert_eq!(taps.sm.cable.taps()[0].instruction(), 0x3);
        assert!(console.printed("DR out: 0x2 (2)"));
    }

    #[test]
    fn dr_round_trip_through_bypass() {
        let mut s = session(vec![SimTap::new(4)], &["e", "2", "0b11", "z"]);
        s.run().unwrap();
        let (_, console) = s.into_parts();
        assert!(console.printed("DR out: 0x2 (2)"));
    }

    #[test]
    fn discovery_listing() {
        let mut s = session(
            vec![SimTap::new(2).with_dr(0x1, 12)],
            &["a", "g", "0", "3", "c", "z"],
        );
        s.run().unwrap();
        let (_, console) = s.into_parts();
        assert!(console.printed("IR 0x0: DR length 1"));
        assert!(console.printed("IR 0x1: DR length 12"));
        assert!(console.printed("IR 0x3: DR length 1"));
        assert!(console.printed("1 device(s)"));
    }

    #[test]
    fn missing_idcode_is_reported() {
        let mut s = session(vec![SimTap::new(4)], &["b", "q", "z"]);
        s.run().unwrap();
        let (_, console) = s.into_parts();
        assert!(console.printed("error: bad IDCODE"));
        assert!(console.printed("unknown command 'q'"));
    }

    #[test]
    fn stuck_tdo_ends_session() {
        let mut s = session(vec![SimTap::new(4)], &["h", "i", "z"]);
        s.taps().sm.cable.set_stuck(Some(true));
        assert_eq!(s.run(), Err(Error::TdoStuckAt1));
        assert_eq!(s.taps().sm.fault(), Some(Error::TdoStuckAt1));
    }

    #[test]
    fn end_of_input() {
        let mut s = session(vec![SimTap::new(4)], &["i"]);
        assert_eq!(s.run(), Err(Error::Io(ErrorKind::BrokenPipe)));
    }
}
