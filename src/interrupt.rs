//! Sentinel conditions that interrupt reading or executing.

use std::fmt;

/// An OS signal intercepted while a command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// `SIGINT`
    Interrupt,
    /// `SIGTERM`
    Terminate,
    /// `SIGQUIT`
    Quit,
}

impl Signal {
    /// Every signal monitored during command execution.
    pub const ALL: [Signal; 3] = [Signal::Interrupt, Signal::Terminate, Signal::Quit];

    /// The platform signal number.
    #[cfg(unix)]
    pub fn number(self) -> i32 {
        use signal_hook::consts::{SIGINT, SIGQUIT, SIGTERM};
        match self {
            Signal::Interrupt => SIGINT,
            Signal::Terminate => SIGTERM,
            Signal::Quit => SIGQUIT,
        }
    }

    /// Maps a platform signal number back to a monitored signal.
    #[cfg(unix)]
    pub fn from_number(number: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|signal| signal.number() == number)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Signal::Interrupt => "interrupt",
            Signal::Terminate => "terminated",
            Signal::Quit => "quit",
        })
    }
}

/// What a menu interrupt handler is registered for.
///
/// `Eof` and `CtrlC` are raised by the line reader while the console waits for input.
/// `Signal` is raised when an OS signal cancels a running command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interrupt {
    /// End of input (Ctrl-D on an empty line).
    Eof,
    /// Ctrl-C while reading a line.
    CtrlC,
    /// A signal caught during command execution.
    Signal(Signal),
}

impl From<Signal> for Interrupt {
    fn from(signal: Signal) -> Self {
        Interrupt::Signal(signal)
    }
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interrupt::Eof => f.write_str("end of input"),
            Interrupt::CtrlC => f.write_str("ctrl-c"),
            Interrupt::Signal(signal) => write!(f, "signal: {signal}"),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_signal_numbers_round_trip() {
        for signal in Signal::ALL {
            assert_eq!(Signal::from_number(signal.number()), Some(signal));
        }
        assert_eq!(Signal::from_number(0), None);
    }
}
