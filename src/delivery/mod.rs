//! Delivery backends.
//!
//! A [`DeliveryBackend`] is a polymorphic byte sink for one notification:
//! `start` resolves the header block, `write` appends body bytes, `finish`
//! flushes and releases the transport. The provided `run` drives an external
//! command (the diff program) and streams its output into the sink in bounded
//! chunks, so memory stays flat no matter how large a diff gets.

mod pipe;
mod smtp;
mod stdout;

pub use pipe::PipeBackend;
pub use smtp::SmtpBackend;
pub use stdout::StdoutBackend;

use crate::config::GeneralConfig;
use crate::error::{MailerError, Result};
use chrono::Local;
use std::io::Read;
use std::process::{Command, Stdio};

/// Fixed read size for subprocess output streaming.
pub const CHUNK_SIZE: usize = 128 * 1024;

/// Resolved recipient and header fields for one notification.
///
/// Recomputed per (group, parameters) pair by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryTarget {
    /// Recipient addresses, in configuration order.
    pub to: Vec<String>,
    pub from: String,
    pub reply_to: Option<String>,
    pub subject: String,
}

/// Render the RFC-822-style header block, terminated by a blank line.
pub fn mail_headers(target: &DeliveryTarget) -> String {
    let mut headers = format!(
        "From: {}\n\
         To: {}\n\
         Subject: {}\n\
         Date: {}\n\
         MIME-Version: 1.0\n\
         Content-Type: text/plain; charset=UTF-8\n",
        target.from,
        target.to.join(", "),
        target.subject,
        Local::now().to_rfc2822(),
    );
    if let Some(reply_to) = &target.reply_to {
        headers.push_str(&format!("Reply-To: {}\n", reply_to));
    }
    headers.push('\n');
    headers
}

/// A sink for one notification's bytes.
pub trait DeliveryBackend {
    /// Open the transport for one (group, parameters) pair and emit the
    /// header block.
    fn start(&mut self, target: &DeliveryTarget) -> Result<()>;

    /// Append bytes to the outgoing stream.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Flush and release the transport.
    fn finish(&mut self) -> Result<()>;

    /// Launch `argv`, stream its combined stdout and stderr into `write` in
    /// [`CHUNK_SIZE`] chunks until end-of-stream, then wait for the child.
    ///
    /// The child is waited on on every exit path, including mid-stream write
    /// failures. The exit status is not interpreted: diff commands exit
    /// nonzero whenever the files differ.
    fn run(&mut self, argv: &[String]) -> Result<()> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| MailerError::Delivery("empty subprocess command".to_string()))?;

        // One pipe carries both output streams, in the order the child
        // produced them.
        let (mut reader, writer) = std::io::pipe()?;
        let stderr_writer = writer.try_clone()?;
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(stderr_writer)
            .spawn()
            .map_err(|e| {
                MailerError::Delivery(format!("failed to execute '{}': {}", program, e))
            })?;

        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut stream_result: Result<()> = Ok(());
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if let Err(e) = self.write(&buf[..n]) {
                        stream_result = Err(e);
                        break;
                    }
                }
                Err(e) => {
                    stream_result = Err(e.into());
                    break;
                }
            }
        }

        // Close our read end before waiting: if streaming stopped early the
        // child gets a broken pipe instead of blocking on a full buffer.
        drop(reader);
        let wait_result = child.wait();
        stream_result?;
        wait_result
            .map_err(|e| MailerError::Delivery(format!("failed to wait for '{}': {}", program, e)))?;
        Ok(())
    }
}

/// Choose the transport from the `[general]` settings: a configured
/// `mail_command` wins, then `smtp_hostname`, then standard output.
pub fn select_backend(general: &GeneralConfig) -> Result<Box<dyn DeliveryBackend>> {
    if let Some(command) = &general.mail_command {
        Ok(Box::new(PipeBackend::new(command)?))
    } else if general.smtp_hostname.is_some() {
        Ok(Box::new(SmtpBackend::new(general)?))
    } else {
        Ok(Box::new(StdoutBackend::new()))
    }
}
