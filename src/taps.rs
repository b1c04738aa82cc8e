//! Finding out what is on the scan chain without any prior knowledge of it.  `Taps` wraps a
//! `JtagSM` and measures instruction register lengths, data register lengths per instruction,
//! the number of devices, and reads IDCODEs.  Every measurement is built from the shifter primitives
//! and leaves the TAP in a documented state.
use core::fmt;

use log::{debug, info, warn};

use crate::bits::{int_to_bin_array, BitArray, Register};
use crate::cable::Cable;
use crate::error::{Error, Result};
use crate::statemachine::{JtagSM, TapState};

/// One result of a `discovery` sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Discovered {
    pub instruction: u32,
    /// 0 when no echo came back.
    pub dr_len: usize,
    /// The length hit the measurement limit and is probably not the real register length.
    pub suspicious: bool,
}

/// An IEEE 1149.1 device identification code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdCode(u32);

impl IdCode {
    /// Bit 0 is always 1 in a real IDCODE, and all ones is what an open TDO reads.
    pub fn new(raw: u32) -> Result<Self> {
        if raw & 1 == 0 || raw == u32::MAX {
            return Err(Error::BadIdCode);
        }
        Ok(IdCode(raw))
    }

    pub fn raw(&self) -> u32 {
        self.0
    }

    pub fn version(&self) -> u8 {
        (self.0 >> 28) as u8
    }

    pub fn part_number(&self) -> u16 {
        (self.0 >> 12) as u16
    }

    /// JEDEC JEP106 code: continuation count in the upper 4 bits, identity in the lower 7.
    pub fn manufacturer(&self) -> u16 {
        ((self.0 >> 1) & 0x7ff) as u16
    }
}

impl fmt::Display for IdCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:08X} (version {}, part 0x{:04X}, manufacturer 0x{:03X})",
            self.0,
            self.version(),
            self.part_number(),
            self.manufacturer()
        )
    }
}

pub struct Taps<C> {
    pub sm: JtagSM<C>,
}

impl<C: Cable> Taps<C> {
    /// Create an object using an existing `JtagSM` object
    pub fn new(sm: JtagSM<C>) -> Self {
        Self { sm }
    }

    /// Clock `count` bits with TDI fixed, staying in the shift state.
    fn shift_const(&mut self, tdi: bool, count: usize) -> Result<()> {
        for _ in 0..count {
            self.sm.shift_bit(tdi, false)?;
        }
        Ok(())
    }

    /// Shift ones and return the clock index at which the first 1 shows up on TDO, or 0 if it
    /// never does within `limit` clocks.  The register is expected to hold zeros.
    fn count_to_echo(&mut self, limit: usize) -> Result<usize> {
        for k in 0..=limit {
            if self.sm.shift_bit(true, false)? {
                return Ok(k);
            }
        }
        Ok(0)
    }

    /// Measure the total instruction register length of the chain.  Returns 0 when TDO does not
    /// settle to ones while ones are shifted in, or when the zero marker never comes back.  The
    /// TAP is reset afterwards.
    pub fn detect_chain(&mut self) -> Result<usize> {
        let many_ones = self.sm.config().many_ones;
        let threshold = self.sm.config().stable_threshold;

        self.sm.reset()?;
        self.sm.goto(TapState::ShiftIr)?;

        let mut run = 0;
        for _ in 0..many_ones {
            if self.sm.shift_bit(true, false)? {
                run += 1;
            } else {
                run = 0;
            }
        }
        if run < threshold {
            warn!("no chain: TDO did not settle after {} ones", many_ones);
            self.sm.reset()?;
            return Ok(0);
        }

        let mut ir_len = 0;
        for k in 0..=many_ones {
            let tdo = self.sm.shift_bit(k != 0, false)?;
            if k > 0 && !tdo {
                ir_len = k;
                break;
            }
        }
        self.sm.reset()?;

        if ir_len == 0 {
            warn!("no chain: marker not seen within {} clocks", many_ones);
        } else {
            info!("chain IR length {}", ir_len);
        }
        Ok(ir_len)
    }

    fn measure_dr_len<const N: usize, const M: usize>(
        &mut self,
        instruction: &BitArray<N>,
        ir_len: usize,
        process_ticks: u32,
        limit: usize,
        ir_out: &mut BitArray<M>,
    ) -> Result<usize> {
        self.sm.insert_ir(instruction, ir_len, TapState::RunTestIdle, ir_out)?;
        self.sm.idle(process_ticks)?;
        self.sm.goto(TapState::ShiftDr)?;
        self.shift_const(false, limit)?;
        let len = self.count_to_echo(limit)?;
        self.sm.goto(TapState::RunTestIdle)?;
        debug!("DR length {} for IR 0b{}", len, instruction);
        Ok(len)
    }

    /// Load `instruction`, let the device settle for `process_ticks` clocks, then measure the
    /// selected data register: zeros flush it, and the clock count until a shifted-in 1
    /// reappears on TDO is its length.  0 means no echo within the configured maximum register
    /// length.  Ends in Run-Test/Idle.
    pub fn detect_dr_len<const N: usize>(
        &mut self,
        instruction: &BitArray<N>,
        ir_len: usize,
        process_ticks: u32,
    ) -> Result<usize> {
        let limit = self.sm.config().max_dr_len;
        let mut ir_out = Register::new();
        self.measure_dr_len(instruction, ir_len, process_ticks, limit, &mut ir_out)
    }

    /// Try every instruction in `first..=last` and report the data register length each one
    /// selects.  The TAP is reset before every instruction and once more at the end.  Lengths
    /// at or above `max_dr_len` are flagged suspicious, typically a boundary scan register
    /// longer than the limit.
    #[allow(clippy::too_many_arguments)]
    pub fn discovery<const N: usize, const M: usize>(
        &mut self,
        first: u32,
        last: u32,
        max_dr_len: usize,
        ir_len: usize,
        ir_in: &mut BitArray<N>,
        ir_out: &mut BitArray<M>,
        mut report: impl FnMut(Discovered),
    ) -> Result<()> {
        if first > last || ir_len > 32 || (ir_len < 32 && u64::from(last) >> ir_len != 0) {
            return Err(Error::OutOfBounds);
        }
        if ir_len == 0 || ir_len > N || ir_len > M || ir_len > self.sm.config().max_dr_len {
            return Err(Error::InvalidIrOrDrLen);
        }
        if max_dr_len == 0 {
            return Err(Error::InvalidIrOrDrLen);
        }
        let process_ticks = self.sm.config().process_ticks;

        info!("discovery of IR 0x{:x}..=0x{:x}", first, last);
        for instruction in first..=last {
            self.sm.reset()?;
            int_to_bin_array(ir_in, instruction, ir_len)?;
            let dr_len = self.measure_dr_len(ir_in, ir_len, process_ticks, max_dr_len, ir_out)?;
            let suspicious = dr_len >= max_dr_len;
            if suspicious {
                warn!("IR 0x{:x}: DR length {} at the measurement limit", instruction, dr_len);
            } else {
                info!("IR 0x{:x}: DR length {}", instruction, dr_len);
            }
            report(Discovered { instruction, dr_len, suspicious });
        }
        self.sm.reset()
    }

    /// Read the IDCODE loaded at reset by the device nearest TDO.  Ends in Test-Logic-Reset.
    pub fn read_idcode(&mut self) -> Result<IdCode> {
        self.sm.reset()?;
        let mut out = BitArray::<32>::new();
        self.sm.insert_dr(&BitArray::<32>::new(), 32, TapState::TestLogicReset, &mut out)?;
        let idcode = IdCode::new(out.to_u32()?)?;
        info!("IDCODE {}", idcode);
        Ok(idcode)
    }

    /// Count devices by putting every TAP into BYPASS and measuring the length of the bypass
    /// chain.  `ir_len` is the total IR length, as returned by `detect_chain`.
    pub fn count_devices(&mut self, ir_len: usize) -> Result<usize> {
        if ir_len == 0 || ir_len > self.sm.config().max_dr_len {
            return Err(Error::InvalidIrOrDrLen);
        }
        self.sm.reset()?;
        self.sm.goto(TapState::ShiftIr)?;
        for i in 0..ir_len {
            self.sm.shift_bit(true, i == ir_len - 1)?;
        }
        self.sm.goto(TapState::ShiftDr)?;
        // At most one bypass bit per two IR bits.
        self.shift_const(false, ir_len)?;
        let devices = self.count_to_echo(ir_len)?;
        self.sm.reset()?;
        info!("{} device(s) on chain", devices);
        Ok(devices)
    }

    /// Check that TDO follows what is shifted through the instruction registers.  A TDO that
    /// never goes low while zeros are shifted, or never high while ones are, is a wiring or power
    /// fault: it is latched in the state machine and no further clocking happens.
    pub fn check_connection(&mut self) -> Result<()> {
        let many_ones = self.sm.config().many_ones;
        self.sm.reset()?;
        self.sm.goto(TapState::ShiftIr)?;

        let mut seen_low = false;
        for _ in 0..many_ones {
            seen_low |= !self.sm.shift_bit(false, false)?;
        }
        if !seen_low {
            warn!("TDO stuck at 1");
            return Err(self.sm.latch(Error::TdoStuckAt1));
        }

        let mut seen_high = false;
        for _ in 0..many_ones {
            seen_high |= self.sm.shift_bit(true, false)?;
        }
        if !seen_high {
            warn!("TDO stuck at 0");
            return Err(self.sm.latch(Error::TdoStuckAt0));
        }

        debug!("TDO follows TDI");
        self.sm.reset()
    }
}
