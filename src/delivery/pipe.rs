//! Delivery through an external mail command.

use crate::delivery::{mail_headers, DeliveryBackend, DeliveryTarget};
use crate::error::{MailerError, Result};
use std::io::Write;
use std::process::{Child, ChildStdin, Command, Stdio};

/// Pipes each notification into the configured `mail_command`, invoked as
/// `command -f <from> <to>...` with the full message on stdin.
pub struct PipeBackend {
    argv: Vec<String>,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
}

impl PipeBackend {
    pub fn new(mail_command: &str) -> Result<PipeBackend> {
        let argv = shell_words::split(mail_command).map_err(|e| {
            MailerError::Config(format!(
                "unparseable mail_command '{}': {}",
                mail_command, e
            ))
        })?;
        if argv.is_empty() {
            return Err(MailerError::Config("empty mail_command".to_string()));
        }
        Ok(PipeBackend {
            argv,
            child: None,
            stdin: None,
        })
    }
}

impl DeliveryBackend for PipeBackend {
    fn start(&mut self, target: &DeliveryTarget) -> Result<()> {
        let mut argv = self.argv.clone();
        argv.push("-f".to_string());
        argv.push(target.from.clone());
        argv.extend(target.to.iter().cloned());

        let mut child = Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
            .map_err(|e| {
                MailerError::Delivery(format!("failed to execute '{}': {}", argv[0], e))
            })?;
        self.stdin = child.stdin.take();
        self.child = Some(child);
        self.write(mail_headers(target).as_bytes())
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| MailerError::Delivery("mail command not started".to_string()))?;
        stdin.write_all(data).map_err(|e| {
            MailerError::Delivery(format!("writing to '{}' failed: {}", self.argv[0], e))
        })
    }

    fn finish(&mut self) -> Result<()> {
        // Closing stdin signals end-of-message.
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| MailerError::Delivery("mail command not started".to_string()))?;
        let status = child.wait().map_err(|e| {
            MailerError::Delivery(format!("failed to wait for '{}': {}", self.argv[0], e))
        })?;
        if !status.success() {
            return Err(MailerError::Delivery(format!(
                "'{}' exited with {}",
                self.argv[0], status
            )));
        }
        Ok(())
    }
}

impl Drop for PipeBackend {
    fn drop(&mut self) {
        // Reap a child left over from an aborted delivery.
        if let Some(mut child) = self.child.take() {
            drop(self.stdin.take());
            let _ = child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempdir;

    fn target(to: &[&str]) -> DeliveryTarget {
        DeliveryTarget {
            to: to.iter().map(|s| s.to_string()).collect(),
            from: "commits@example.com".to_string(),
            reply_to: None,
            subject: "r1 - x".to_string(),
        }
    }

    #[test]
    fn rejects_unparseable_command() {
        assert!(PipeBackend::new("sendmail \"unterminated").is_err());
        assert!(PipeBackend::new("").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn passes_sender_and_recipients_and_message() {
        let dir = tempdir().unwrap();
        let argv_file = dir.path().join("argv");
        let body_file = dir.path().join("body");
        let script = dir.path().join("fakemail.sh");
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\nprintf '%s\\n' \"$@\" > {}\ncat > {}\n",
                argv_file.display(),
                body_file.display()
            ),
        )
        .unwrap();
        let mut perms = std::fs::metadata(&script).unwrap().permissions();
        use std::os::unix::fs::PermissionsExt;
        perms.set_mode(0o755);
        std::fs::set_permissions(&script, perms).unwrap();

        let mut backend = PipeBackend::new(&script.display().to_string()).unwrap();
        backend
            .start(&target(&["dev@example.com", "qa@example.com"]))
            .unwrap();
        backend.write(b"message body\n").unwrap();
        backend.finish().unwrap();

        let mut argv = String::new();
        std::fs::File::open(&argv_file)
            .unwrap()
            .read_to_string(&mut argv)
            .unwrap();
        assert_eq!(
            argv,
            "-f\ncommits@example.com\ndev@example.com\nqa@example.com\n"
        );

        let body = std::fs::read_to_string(&body_file).unwrap();
        assert!(body.starts_with("From: commits@example.com\n"));
        assert!(body.ends_with("\n\nmessage body\n"));
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_a_delivery_error() {
        let mut backend = PipeBackend::new("sh -c 'cat > /dev/null; exit 3'").unwrap();
        backend.start(&target(&["dev@example.com"])).unwrap();
        backend.write(b"body").unwrap();
        let err = backend.finish().unwrap_err();
        assert!(matches!(err, MailerError::Delivery(_)));
    }
}
