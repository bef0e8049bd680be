//! SMTP delivery via `lettre`.

use super::{Mailer, mime_for};
use crate::error::DeliveryError;
use crate::models::{Content, Credentials};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials as SmtpCredentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, instrument};

/// Sends digests from the account in `creds.yaml` over STARTTLS.
pub struct SmtpMailer {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Build the transport. No connection is made until the first send.
    pub fn new(creds: &Credentials) -> Result<Self, DeliveryError> {
        let from = parse_mailbox(&creds.email)?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&creds.smtp_host)?
            .port(creds.smtp_port)
            .credentials(SmtpCredentials::new(
                creds.email.clone(),
                creds.password.clone(),
            ))
            .build();
        Ok(Self { from, transport })
    }
}

impl Mailer for SmtpMailer {
    #[instrument(level = "info", skip(self, parts), fields(parts = parts.len()))]
    async fn send(&self, to: &str, subject: &str, parts: &[Content]) -> Result<(), DeliveryError> {
        let message = compose(&self.from, to, subject, parts).await?;
        self.transport.send(message).await?;
        info!(%to, "Email sent");
        Ok(())
    }
}

/// Build the digest message without sending it.
pub async fn compose(
    from: &Mailbox,
    to: &str,
    subject: &str,
    parts: &[Content],
) -> Result<Message, DeliveryError> {
    let mut singleparts = Vec::with_capacity(parts.len());
    for part in parts {
        singleparts.push(to_singlepart(part).await?);
    }

    let builder = Message::builder()
        .from(from.clone())
        .to(parse_mailbox(to)?)
        .subject(subject);

    let mut singleparts = singleparts.into_iter();
    let message = match singleparts.next() {
        Some(first) => {
            let body = singleparts.fold(MultiPart::mixed().singlepart(first), |mp, p| {
                mp.singlepart(p)
            });
            builder.multipart(body)?
        }
        None => builder.body(String::new())?,
    };
    Ok(message)
}

async fn to_singlepart(part: &Content) -> Result<SinglePart, DeliveryError> {
    match part {
        Content::Text(text) => Ok(SinglePart::builder()
            .header(ContentType::TEXT_PLAIN)
            .body(text.clone())),
        Content::Image(path) => {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|source| DeliveryError::Attachment {
                    path: path.clone(),
                    source,
                })?;
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_string());
            let content_type = ContentType::parse(mime_for(path))
                .unwrap_or(ContentType::TEXT_PLAIN);
            Ok(Attachment::new(filename).body(bytes, content_type))
        }
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, DeliveryError> {
    address.parse().map_err(|source| DeliveryError::Address {
        address: address.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sender() -> Mailbox {
        "sender@example.com".parse().unwrap()
    }

    #[tokio::test]
    async fn test_build_message_with_text_and_image() {
        let dir = tempdir().unwrap();
        let img = dir.path().join("cataas.jpg");
        std::fs::write(&img, [0xFF, 0xD8, 0xFF]).unwrap();

        let message = compose(
            &sender(),
            "alice@example.com",
            "Look at this...",
            &[Content::Text("cats are great".to_string()), Content::Image(img)],
        )
        .await
        .unwrap();

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("To: alice@example.com"));
        assert!(raw.contains("Subject: Look at this..."));
        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("cats are great"));
        assert!(raw.contains("cataas.jpg"));
        assert!(raw.contains("image/jpeg"));
    }

    #[tokio::test]
    async fn test_build_message_rejects_bad_address() {
        let err = compose(&sender(), "not an address", "s", &[Content::Text("x".to_string())])
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Address { .. }));
    }

    #[tokio::test]
    async fn test_build_message_missing_attachment() {
        let err = compose(
            &sender(),
            "alice@example.com",
            "s",
            &[Content::Image("/no/such/file.jpg".into())],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DeliveryError::Attachment { .. }));
    }

    #[tokio::test]
    async fn test_compose_keeps_part_order() {
        let message = compose(
            &sender(),
            "alice@example.com",
            "s",
            &[
                Content::Text("first fact".to_string()),
                Content::Text("second fact".to_string()),
            ],
        )
        .await
        .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        let first = raw.find("first fact").unwrap();
        let second = raw.find("second fact").unwrap();
        assert!(first < second);
    }
}
