//! Fatal initialization error reporting.
//!
//! Pre-entry failures leave the process in a state where nothing else may
//! run: no unwinding, no destructors, no atexit handlers. The process aborts
//! (SIGABRT on Unix) so a core dump can be captured.

use std::io::{self, Write};

pub const FATAL_PREFIX: &str = "Fatal error during initialization: ";

/// Exact diagnostic line for `message`, trailing newline included
pub fn format_report(message: &str) -> String {
    format!("{}{}\n", FATAL_PREFIX, message)
}

pub fn write_report<W: Write + ?Sized>(out: &mut W, message: &str) -> io::Result<()> {
    out.write_all(format_report(message).as_bytes())?;
    out.flush()
}

/// Print the fatal diagnostic to stderr and abort. Never returns.
pub fn report(message: &str) -> ! {
    let mut stderr = io::stderr().lock();
    // The abort below happens whether or not stderr is writable.
    let _ = write_report(&mut stderr, message);
    std::process::abort()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_format() {
        assert_eq!(
            format_report("bad config"),
            "Fatal error during initialization: bad config\n"
        );
    }

    #[test]
    fn test_write_report_exact_bytes() {
        let mut out = Vec::new();
        write_report(&mut out, "out of memory").unwrap();
        assert_eq!(out, b"Fatal error during initialization: out of memory\n");
    }

    #[test]
    fn test_empty_message_still_terminated() {
        assert_eq!(format_report(""), "Fatal error during initialization: \n");
    }
}
