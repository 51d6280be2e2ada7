use std::io::Write;

use wake_stop_lib::alarm::AlertSink;

/// Console stand-in for the phone's sound + vibration alert: a short
/// terminal-bell pattern and a loud log line. Tracks its own ring count;
/// the session never inspects sink internals.
pub struct ConsoleAlertSink {
    rings: u32,
}

impl ConsoleAlertSink {
    pub fn new() -> Self {
        Self { rings: 0 }
    }
}

impl AlertSink for ConsoleAlertSink {
    fn fire(&mut self) {
        self.rings += 1;

        for _ in 0..4 {
            print!("\x07");
        }
        let _ = std::io::stdout().flush();

        tracing::warn!("Wake up! You're approaching your stop! (alert #{})", self.rings);
    }
}
