//! Digest delivery.
//!
//! # Backends
//!
//! - [`SmtpMailer`]: sends a `multipart/mixed` message through an SMTP relay
//!   using `lettre`
//! - [`ConsoleMailer`]: logs the digest instead of sending it (`--dry-run`)
//!
//! Both take the digest as an ordered slice of [`Content`]. Text items become
//! `text/plain` parts and images become attachments, in the same order.

mod console;
mod smtp;

pub use console::ConsoleMailer;
pub use smtp::SmtpMailer;

use crate::error::DeliveryError;
use crate::models::Content;
use std::path::Path;

/// Subject line of every digest.
pub const SUBJECT: &str = "Look at this...";

/// Something that can deliver a digest to one address.
pub trait Mailer {
    async fn send(&self, to: &str, subject: &str, parts: &[Content]) -> Result<(), DeliveryError>;
}

/// MIME type for an attachment, from its file extension.
pub fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! A [`Mailer`] that records what it was asked to send.

    use super::*;
    use std::cell::RefCell;
    use std::collections::HashSet;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Sent {
        pub to: String,
        pub subject: String,
        pub parts: Vec<Content>,
        /// Whether every image part existed on disk at send time.
        pub images_present: bool,
    }

    #[derive(Debug, Default)]
    pub struct RecordingMailer {
        pub sent: RefCell<Vec<Sent>>,
        failing: HashSet<String>,
    }

    impl RecordingMailer {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every send to `address` fail with a transport-style error.
        pub fn failing_for(mut self, address: &str) -> Self {
            self.failing.insert(address.to_string());
            self
        }
    }

    impl Mailer for RecordingMailer {
        async fn send(
            &self,
            to: &str,
            subject: &str,
            parts: &[Content],
        ) -> Result<(), DeliveryError> {
            if self.failing.contains(to) {
                return Err(DeliveryError::Attachment {
                    path: "unreachable".into(),
                    source: std::io::Error::other("simulated transport failure"),
                });
            }
            let images_present = parts.iter().all(|p| match p {
                Content::Image(path) => path.exists(),
                Content::Text(_) => true,
            });
            self.sent.borrow_mut().push(Sent {
                to: to.to_string(),
                subject: subject.to_string(),
                parts: parts.to_vec(),
                images_present,
            });
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_for() {
        assert_eq!(mime_for(Path::new("res/cataas.jpg")), "image/jpeg");
        assert_eq!(mime_for(Path::new("fox.PNG")), "image/png");
        assert_eq!(mime_for(Path::new("noext")), "application/octet-stream");
    }
}
