//! Line oriented text IO for the interactive front end, and number entry on top of it.
//!
//! The core never needs a console; `Session` is the only consumer.
use alloc::string::String;

use embedded_io::{ErrorKind, Read, ReadReady, Write};

use crate::bits::{bin_str_to_bin_array, dec_str_to_bin_array, hex_str_to_bin_array, BitArray};
use crate::error::{Error, Result};

pub trait Console {
    /// Show `prompt` and read one line, without the line terminator.
    fn read_line(&mut self, prompt: &str) -> Result<String>;
    /// Show `prompt` and read a single non-blank character.
    fn read_char(&mut self, prompt: &str) -> Result<char>;
    fn write_line(&mut self, text: &str) -> Result<()>;
    /// Drop input typed ahead of the next prompt.
    fn clear_input(&mut self) -> Result<()>;
}

impl<T: Console + ?Sized> Console for &mut T {
    fn read_line(&mut self, prompt: &str) -> Result<String> {
        (**self).read_line(prompt)
    }

    fn read_char(&mut self, prompt: &str) -> Result<char> {
        (**self).read_char(prompt)
    }

    fn write_line(&mut self, text: &str) -> Result<()> {
        (**self).write_line(text)
    }

    fn clear_input(&mut self) -> Result<()> {
        (**self).clear_input()
    }
}

fn strip_radix(text: &str, lower: char) -> Option<&str> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some('0'), Some(c)) if c.to_ascii_lowercase() == lower => Some(chars.as_str()),
        _ => None,
    }
}

/// Parse `0x` hex, `0b` binary or plain decimal text into `dest`.  Returns the value when it fits
/// into 32 bits, `None` for wider numbers (which are still stored in `dest`).  On error `dest` is
/// left as it was.
pub fn parse_number_str<const N: usize>(text: &str, dest: &mut BitArray<N>) -> Result<Option<u32>> {
    let text = text.trim();
    if let Some(digits) = strip_radix(text, 'x') {
        if digits.is_empty() {
            return Err(Error::BadPrefixOrSuffix);
        }
        hex_str_to_bin_array(dest, digits)?;
    } else if let Some(digits) = strip_radix(text, 'b') {
        if digits.is_empty() {
            return Err(Error::BadPrefixOrSuffix);
        }
        bin_str_to_bin_array(dest, digits)?;
    } else {
        dec_str_to_bin_array(dest, text)?;
    }
    Ok(dest.to_u32().ok())
}

/// Prompt for a number on `console`.  See `parse_number_str`.
pub fn parse_number<C: Console + ?Sized, const N: usize>(
    console: &mut C,
    prompt: &str,
    dest: &mut BitArray<N>,
) -> Result<Option<u32>> {
    console.clear_input()?;
    let line = console.read_line(prompt)?;
    parse_number_str(&line, dest)
}

fn io_error<E: embedded_io::Error>(e: E) -> Error {
    Error::Io(e.kind())
}

/// A console on a serial port or any other `embedded-io` byte stream.  Input is echoed and
/// backspace works, as expected by a terminal emulator.
pub struct SerialConsole<T> {
    io: T,
}

impl<T: Read + Write + ReadReady> SerialConsole<T> {
    pub fn new(io: T) -> Self {
        Self { io }
    }

    pub fn into_inner(self) -> T {
        self.io
    }

    fn read_byte(&mut self) -> Result<u8> {
        let mut byte = [0u8];
        match self.io.read(&mut byte).map_err(io_error)? {
            0 => Err(Error::Io(ErrorKind::BrokenPipe)),
            _ => Ok(byte[0]),
        }
    }

    fn write_str(&mut self, text: &str) -> Result<()> {
        self.io.write_all(text.as_bytes()).map_err(io_error)?;
        self.io.flush().map_err(io_error)
    }
}

impl<T: Read + Write + ReadReady> Console for SerialConsole<T> {
    fn read_line(&mut self, prompt: &str) -> Result<String> {
        self.write_str(prompt)?;
        let mut line = String::new();
        loop {
            match self.read_byte()? {
                b'\r' | b'\n' => break,
                0x08 | 0x7f => {
                    if line.pop().is_some() {
                        self.write_str("\x08 \x08")?;
                    }
                }
                b => {
                    let c = char::from(b);
                    line.push(c);
                    let mut buf = [0u8; 4];
                    self.write_str(c.encode_utf8(&mut buf))?;
                }
            }
        }
        self.write_str("\r\n")?;
        Ok(line)
    }

    fn read_char(&mut self, prompt: &str) -> Result<char> {
        self.write_str(prompt)?;
        loop {
            let c = char::from(self.read_byte()?);
            if !c.is_whitespace() {
                let mut buf = [0u8; 4];
                self.write_str(c.encode_utf8(&mut buf))?;
                self.write_str("\r\n")?;
                return Ok(c);
            }
        }
    }

    fn write_line(&mut self, text: &str) -> Result<()> {
        self.write_str(text)?;
        self.write_str("\r\n")
    }

    fn clear_input(&mut self) -> Result<()> {
        while self.io.read_ready().map_err(io_error)? {
            self.read_byte()?;
        }
        Ok(())
    }
}

#[cfg(feature = "std")]
pub use self::stdio::StdConsole;

#[cfg(feature = "std")]
mod stdio {
    use std::io::{self, BufRead, Write};

    use alloc::string::String;
    use embedded_io::ErrorKind;

    use super::Console;
    use crate::error::{Error, Result};

    fn io_error(e: io::Error) -> Error {
        Error::Io(match e.kind() {
            io::ErrorKind::Interrupted => ErrorKind::Interrupted,
            io::ErrorKind::TimedOut => ErrorKind::TimedOut,
            io::ErrorKind::BrokenPipe | io::ErrorKind::UnexpectedEof => ErrorKind::BrokenPipe,
            io::ErrorKind::InvalidData => ErrorKind::InvalidData,
            _ => ErrorKind::Other,
        })
    }

    /// Console on the process' stdin and stdout.  The terminal does the line editing, so
    /// `clear_input` has nothing to drop.
    pub struct StdConsole {
        stdin: io::Stdin,
        stdout: io::Stdout,
    }

    impl StdConsole {
        pub fn new() -> Self {
            Self { stdin: io::stdin(), stdout: io::stdout() }
        }
    }

    impl Default for StdConsole {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Console for StdConsole {
        fn read_line(&mut self, prompt: &str) -> Result<String> {
            let mut out = self.stdout.lock();
            out.write_all(prompt.as_bytes()).map_err(io_error)?;
            out.flush().map_err(io_error)?;
            let mut line = String::new();
            if self.stdin.lock().read_line(&mut line).map_err(io_error)? == 0 {
                return Err(Error::Io(ErrorKind::BrokenPipe));
            }
            let len = line.trim_end_matches(['\r', '\n']).len();
            line.truncate(len);
            Ok(line)
        }

        fn read_char(&mut self, prompt: &str) -> Result<char> {
            loop {
                let line = self.read_line(prompt)?;
                if let Some(c) = line.trim().chars().next() {
                    return Ok(c);
                }
            }
        }

        fn write_line(&mut self, text: &str) -> Result<()> {
            writeln!(self.stdout.lock(), "{}", text).map_err(io_error)
        }

        fn clear_input(&mut self) -> Result<()> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::Register;
    use alloc::collections::VecDeque;
    use alloc::vec::Vec;
    use core::convert::Infallible;

    #[derive(Default)]
    struct Loopback {
        input: VecDeque<u8>,
        output: Vec<u8>,
    }

    impl Loopback {
        fn with_input(text: &str) -> Self {
            Self { input: text.bytes().collect(), output: Vec::new() }
        }
    }

    impl embedded_io::ErrorType for Loopback {
        type Error = Infallible;
    }

    impl Read for Loopback {
        fn read(&mut self, buf: &mut [u8]) -> core::result::Result<usize, Infallible> {
            match self.input.pop_front() {
                Some(b) if !buf.is_empty() => {
                    buf[0] = b;
                    Ok(1)
                }
                _ => Ok(0),
            }
        }
    }

    impl ReadReady for Loopback {
        fn read_ready(&mut self) -> core::result::Result<bool, Infallible> {
            Ok(!self.input.is_empty())
        }
    }

    impl Write for Loopback {
        fn write(&mut self, buf: &[u8]) -> core::result::Result<usize, Infallible> {
            self.output.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> core::result::Result<(), Infallible> {
            Ok(())
        }
    }

    #[test]
    fn radix_detection() {
        let mut reg = Register::new();
        assert_eq!(parse_number_str("0x1F", &mut reg), Ok(Some(0x1f)));
        assert_eq!(reg.len(), 8);
        assert_eq!(parse_number_str("0XaB", &mut reg), Ok(Some(0xab)));
        assert_eq!(parse_number_str("0b101", &mut reg), Ok(Some(5)));
        assert_eq!(reg.len(), 3);
        assert_eq!(parse_number_str("0B1", &mut reg), Ok(Some(1)));
        assert_eq!(parse_number_str(" 1234 ", &mut reg), Ok(Some(1234)));
        assert_eq!(parse_number_str("0", &mut reg), Ok(Some(0)));
        assert_eq!(parse_number_str("0x123456789", &mut reg), Ok(None));
        assert_eq!(reg.len(), 36);
    }

    #[test]
    fn malformed() {
        let mut reg = Register::from_u32(7, 3).unwrap();
        assert_eq!(parse_number_str("0xZZ", &mut reg), Err(Error::BadConversion));
        assert_eq!(parse_number_str("0x", &mut reg), Err(Error::BadPrefixOrSuffix));
        assert_eq!(parse_number_str("0b", &mut reg), Err(Error::BadPrefixOrSuffix));
        assert_eq!(parse_number_str("0b102", &mut reg), Err(Error::BadConversion));
        assert_eq!(parse_number_str("12a", &mut reg), Err(Error::BadConversion));
        assert_eq!(parse_number_str("", &mut reg), Err(Error::BadConversion));
        assert_eq!(reg.to_u32(), Ok(7));
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn serial_line_editing() {
        let mut console = SerialConsole::new(Loopback::with_input("0x1G\x08F\r"));
        let mut reg = Register::new();
        // Type-ahead is dropped before the prompt, leaving nothing to read.
        assert_eq!(
            parse_number(&mut console, "> ", &mut reg),
            Err(Error::Io(ErrorKind::BrokenPipe))
        );
        assert!(reg.is_empty());

        let mut console = SerialConsole::new(Loopback::default());
        console.io.input.extend(b"0x1G\x08F\r");
        let line = console.read_line("> ").unwrap();
        assert_eq!(line, "0x1F");
        let echoed = core::str::from_utf8(&console.io.output).unwrap();
        assert_eq!(echoed, "> 0x1G\x08 \x08F\r\n");
    }

    #[test]
    fn serial_char_and_eof() {
        let mut console = SerialConsole::new(Loopback::with_input("\r\n d"));
        assert_eq!(console.read_char("cmd: "), Ok('d'));
        assert_eq!(
            console.read_char("cmd: "),
            Err(Error::Io(ErrorKind::BrokenPipe))
        );
        console.write_line("done").unwrap();
        assert!(console.into_inner().output.ends_with(b"done\r\n"));
    }
}
