//! Logs digests instead of sending them.

use super::Mailer;
use crate::error::DeliveryError;
use crate::models::Content;
use tracing::info;

/// [`Mailer`] that logs each digest instead of sending it.
///
/// Selected by `--dry-run`. Text items are logged in full and images by path;
/// nothing leaves the machine and sending never fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleMailer;

impl Mailer for ConsoleMailer {
    async fn send(&self, to: &str, subject: &str, parts: &[Content]) -> Result<(), DeliveryError> {
        info!(%to, %subject, parts = parts.len(), "[dry run] would send digest");
        for (i, part) in parts.iter().enumerate() {
            match part {
                Content::Text(text) => info!(index = i, %text, "[dry run] text"),
                Content::Image(path) => info!(index = i, path = %path.display(), "[dry run] image"),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_console_mailer_always_succeeds() {
        let parts = vec![
            Content::Text("hello".to_string()),
            Content::Image("res/cataas.jpg".into()),
        ];
        assert!(ConsoleMailer.send("a@example.com", "s", &parts).await.is_ok());
        assert!(ConsoleMailer.send("a@example.com", "s", &[]).await.is_ok());
    }
}
