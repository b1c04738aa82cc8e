//! Interactive menu against a simulated two device chain.
//!
//! The chain holds a 10 bit IR device with IDCODE 0x020F10DD nearest TDO, and a 6 bit IR device
//! whose instruction 0x06 selects a 32 bit register.
//!
//! # Usage
//!
//! ```sh
//! RUST_LOG=info cargo run --example sim_session
//! ```

use jtagger::cable::sim::{SimCable, SimTap};
use jtagger::console::StdConsole;
use jtagger::session::Session;
use jtagger::statemachine::JtagSM;
use jtagger::taps::Taps;

fn main() -> Result<(), jtagger::Error> {
    env_logger::init();

    let chain = vec![
        SimTap::new(6).with_dr(0x06, 32).with_dr(0x02, 18),
        SimTap::new(10).with_idcode(0x006, 0x020f_10dd).with_dr(0x3f8, 480),
    ];
    let jtag = JtagSM::new(SimCable::new(chain));
    let mut session = Session::new(Taps::new(jtag), StdConsole::new());
    session.run()?;
    println!("bye");
    Ok(())
}
