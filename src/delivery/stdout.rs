//! Delivery to standard output, for hook debugging and dry runs.

use crate::delivery::{mail_headers, DeliveryBackend, DeliveryTarget};
use crate::error::Result;
use std::io::Write;

/// Writes each notification, header block included, straight to stdout.
/// `finish` is a no-op.
pub struct StdoutBackend;

impl StdoutBackend {
    pub fn new() -> StdoutBackend {
        StdoutBackend
    }
}

impl Default for StdoutBackend {
    fn default() -> Self {
        StdoutBackend::new()
    }
}

impl DeliveryBackend for StdoutBackend {
    fn start(&mut self, target: &DeliveryTarget) -> Result<()> {
        self.write(mail_headers(target).as_bytes())
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        handle.write_all(data)?;
        handle.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}
