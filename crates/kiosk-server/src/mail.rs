//! Snapshot delivery
//!
//! [`PickupDirMailer`] renders a complete RFC 5322 message and drops it into
//! a pickup directory watched by the local MTA, so delivery retries and SMTP
//! credentials live outside the kiosk process.

use std::path::PathBuf;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;
use lookbook_infra_common::{Error, ErrorExt, Result};
use lookbook_session_core::SessionId;
use tracing::info;
use uuid::Uuid;

use crate::config::MailConfig;
use crate::media::{EncodedImage, ImageFormat};

const BODY_HTML: &str = "<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;\">\r\n\
<p>Your look is ready. Share it with your friends!</p>\r\n\
</div>";

#[async_trait]
pub trait SnapshotMailer: Send + Sync {
    async fn send(&self, address: &str, image: EncodedImage, session_id: &SessionId) -> Result<()>;
}

/// Attachment filename for a session's snapshot
pub fn attachment_name(session_id: &SessionId, format: ImageFormat) -> String {
    format!("lookbook-snapshot-{}.{}", session_id, format.extension())
}

/// Reject addresses that cannot be a mailbox or would inject headers
pub fn validate_address(address: &str) -> Result<()> {
    let address = address.trim();
    let Some((local, domain)) = address.split_once('@') else {
        return Err(Error::Validation(format!("'{}' is not an email address", address)));
    };
    if local.is_empty() || domain.is_empty() {
        return Err(Error::Validation(format!("'{}' is not an email address", address)));
    }
    if address.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return Err(Error::Validation("email address contains whitespace or control characters".into()));
    }
    Ok(())
}

pub struct PickupDirMailer {
    dir: PathBuf,
    from: String,
    subject: String,
}

impl PickupDirMailer {
    pub fn new(config: &MailConfig) -> Self {
        Self {
            dir: config.pickup_dir.clone(),
            from: config.from.clone(),
            subject: config.subject.clone(),
        }
    }

    /// Full message text with CRLF line endings
    pub fn render(&self, to: &str, image: &EncodedImage, session_id: &SessionId) -> String {
        let boundary = format!("lookbook-{}", Uuid::new_v4().simple());
        let encoded = STANDARD.encode(&image.bytes);

        let mut message = String::with_capacity(encoded.len() + 1024);
        let mut line = |text: &str| {
            message.push_str(text);
            message.push_str("\r\n");
        };

        line(&format!("From: {}", self.from));
        line(&format!("To: {}", to.trim()));
        line(&format!("Subject: {}", self.subject));
        line(&format!("Date: {}", Utc::now().to_rfc2822()));
        line(&format!("Message-ID: <{}@lookbook>", Uuid::new_v4()));
        line("MIME-Version: 1.0");
        line(&format!("Content-Type: multipart/mixed; boundary=\"{}\"", boundary));
        line("");
        line(&format!("--{}", boundary));
        line("Content-Type: text/html; charset=utf-8");
        line("Content-Transfer-Encoding: 8bit");
        line("");
        line(BODY_HTML);
        line(&format!("--{}", boundary));
        line(&format!("Content-Type: {}", image.format.mime_type()));
        line("Content-Transfer-Encoding: base64");
        line(&format!(
            "Content-Disposition: attachment; filename=\"{}\"",
            attachment_name(session_id, image.format)
        ));
        line("");
        // RFC 2045 caps encoded lines at 76 characters; base64 output is ASCII
        for chunk in encoded.as_bytes().chunks(76) {
            line(std::str::from_utf8(chunk).unwrap_or_default());
        }
        line(&format!("--{}--", boundary));
        message
    }
}

#[async_trait]
impl SnapshotMailer for PickupDirMailer {
    async fn send(&self, address: &str, image: EncodedImage, session_id: &SessionId) -> Result<()> {
        validate_address(address)?;
        let message = self.render(address, &image, session_id);

        let write = async {
            tokio::fs::create_dir_all(&self.dir).await?;
            let name = format!("{}-{}", session_id, Uuid::new_v4().simple());
            let staging = self.dir.join(format!(".{}.tmp", name));
            let target = self.dir.join(format!("{}.eml", name));
            tokio::fs::write(&staging, message.as_bytes()).await?;
            // The MTA only picks up complete files
            tokio::fs::rename(&staging, &target).await?;
            Ok::<PathBuf, std::io::Error>(target)
        };

        let path = write
            .await
            .map_err(|e| Error::ExternalService(format!("pickup directory {}: {}", self.dir.display(), e)))
            .with_context("mail", "send_snapshot")?;

        info!("Snapshot for session {} queued for {} at {}", session_id, address, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use pretty_assertions::assert_eq;

    fn png(bytes: Vec<u8>) -> EncodedImage {
        EncodedImage {
            bytes: Bytes::from(bytes),
            format: ImageFormat::Png,
        }
    }

    fn mailer(dir: PathBuf) -> PickupDirMailer {
        PickupDirMailer::new(&MailConfig {
            pickup_dir: dir,
            ..MailConfig::default()
        })
    }

    #[test]
    fn test_validate_address() {
        assert!(validate_address("visitor@example.com").is_ok());
        assert!(validate_address("visitor.example.com").is_err());
        assert!(validate_address("@example.com").is_err());
        assert!(validate_address("visitor@").is_err());
        assert!(validate_address("a@b.com\r\nBcc: x@y.com").is_err());
    }

    #[test]
    fn test_render_message() {
        let mailer = mailer(PathBuf::from("/unused"));
        let id = SessionId::from("session_abc");
        let image = vec![0x89u8; 200];
        let message = mailer.render("visitor@example.com", &png(image.clone()), &id);

        assert!(message.contains("To: visitor@example.com\r\n"));
        assert!(message.contains("Subject: Your look is here.\r\n"));
        assert!(message.contains("Content-Type: image/png\r\n"));
        assert!(message.contains("filename=\"lookbook-snapshot-session_abc.png\""));
        assert!(message.lines().all(|line| line.trim_end_matches('\r').len() <= 998));

        let encoded: String = message
            .split("\r\n\r\n")
            .last()
            .unwrap()
            .lines()
            .take_while(|line| !line.starts_with("--"))
            .collect();
        assert_eq!(STANDARD.decode(encoded).unwrap(), image);
    }

    #[tokio::test]
    async fn test_send_writes_pickup_file() {
        let dir = tempfile::tempdir().unwrap();
        let mailer = mailer(dir.path().join("outbox"));
        let id = SessionId::from("session_mail");

        tokio_test::assert_ok!(
            mailer
                .send("visitor@example.com", png(b"png".to_vec()), &id)
                .await
        );

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("outbox"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].starts_with("session_mail-"));
        assert!(entries[0].ends_with(".eml"));
    }

    #[tokio::test]
    async fn test_send_rejects_bad_address_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let mailer = mailer(dir.path().join("outbox"));
        let result = mailer.send("nobody", png(b"png".to_vec()), &SessionId::new()).await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(!dir.path().join("outbox").exists());
    }

    #[test]
    fn test_jpeg_snapshot_is_labelled_as_jpeg() {
        let mailer = mailer(PathBuf::from("/unused"));
        let id = SessionId::from("session_jpeg");
        let image = EncodedImage::sniffed(Bytes::from_static(b"\xff\xd8\xff\xe0camera")).unwrap();
        let message = mailer.render("visitor@example.com", &image, &id);

        assert!(message.contains("Content-Type: image/jpeg\r\n"));
        assert!(message.contains("filename=\"lookbook-snapshot-session_jpeg.jpg\""));
        assert!(!message.contains("image/png"));
    }

    #[tokio::test]
    async fn test_unwritable_pickup_dir_is_external_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("outbox");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let result = mailer(blocker)
            .send("visitor@example.com", png(b"png".to_vec()), &SessionId::new())
            .await;
        match result {
            Err(Error::ExternalService(msg)) => assert!(msg.ends_with("[mail::send_snapshot]"), "{msg}"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
