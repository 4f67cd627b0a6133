//! Delivery over SMTP.

use crate::config::GeneralConfig;
use crate::delivery::{mail_headers, DeliveryBackend, DeliveryTarget};
use crate::error::{MailerError, Result};
use lettre::address::{Address, Envelope};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};

/// Buffers the whole message and submits it in one SMTP transaction on
/// `finish`, so a partially generated notification is never sent.
pub struct SmtpBackend {
    hostname: String,
    port: Option<u16>,
    credentials: Option<Credentials>,
    envelope_from: String,
    envelope_to: Vec<String>,
    buffer: Vec<u8>,
}

impl SmtpBackend {
    pub fn new(general: &GeneralConfig) -> Result<SmtpBackend> {
        let configured = general
            .smtp_hostname
            .as_deref()
            .ok_or_else(|| MailerError::Config("smtp_hostname is not set".to_string()))?;

        // Accept "host" or "host:port".
        let (hostname, port) = match configured.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    MailerError::Config(format!("bad smtp_hostname port in '{}'", configured))
                })?;
                (host.to_string(), Some(port))
            }
            None => (configured.to_string(), None),
        };

        let credentials = match (&general.smtp_username, &general.smtp_password) {
            (Some(user), Some(pass)) => Some(Credentials::new(user.clone(), pass.clone())),
            (None, None) => None,
            _ => {
                return Err(MailerError::Config(
                    "smtp_username and smtp_password must be set together".to_string(),
                ))
            }
        };

        Ok(SmtpBackend {
            hostname,
            port,
            credentials,
            envelope_from: String::new(),
            envelope_to: Vec::new(),
            buffer: Vec::new(),
        })
    }
}

impl DeliveryBackend for SmtpBackend {
    fn start(&mut self, target: &DeliveryTarget) -> Result<()> {
        self.envelope_from = target.from.clone();
        self.envelope_to = target.to.clone();
        self.buffer.clear();
        self.buffer.extend_from_slice(mail_headers(target).as_bytes());
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let from = parse_address(&self.envelope_from)?;
        let to = self
            .envelope_to
            .iter()
            .map(|addr| parse_address(addr))
            .collect::<Result<Vec<Address>>>()?;
        let envelope = Envelope::new(Some(from), to)
            .map_err(|e| MailerError::Delivery(format!("bad envelope: {}", e)))?;

        let mut builder = SmtpTransport::builder_dangerous(&self.hostname);
        if let Some(port) = self.port {
            builder = builder.port(port);
        }
        if let Some(credentials) = &self.credentials {
            builder = builder.credentials(credentials.clone());
        }
        let transport = builder.build();

        transport
            .send_raw(&envelope, &self.buffer)
            .map_err(|e| {
                MailerError::Delivery(format!("smtp delivery via '{}' failed: {}", self.hostname, e))
            })?;
        self.buffer.clear();
        Ok(())
    }
}

fn parse_address(addr: &str) -> Result<Address> {
    addr.parse::<Address>()
        .map_err(|e| MailerError::Delivery(format!("bad address '{}': {}", addr, e)))
}
