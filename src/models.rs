//! Data models shared across the application.
//!
//! - [`Content`]: one fetched item in a digest (text or a downloaded image)
//! - [`Edition`]: which of the two daily digests is being sent
//! - [`Credentials`]: the mail account loaded from `creds.yaml`
//! - [`RecipientEntry`] / [`Recipient`]: a recipient as written in
//!   `targets.yaml`, and the same recipient with its services resolved

use crate::services::ContentService;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

/// Default SMTP relay used when `creds.yaml` does not name one.
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";

/// Default SMTP submission port (STARTTLS).
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// A single successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// A formatted line of text.
    Text(String),
    /// Path of an image written to local disk.
    Image(PathBuf),
}

/// Morning or evening digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edition {
    Morning,
    Evening,
}

impl Edition {
    /// The short label used in logs ("AM" / "PM").
    pub fn label(self) -> &'static str {
        match self {
            Edition::Morning => "AM",
            Edition::Evening => "PM",
        }
    }
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edition::Morning => f.write_str("morning"),
            Edition::Evening => f.write_str("evening"),
        }
    }
}

impl std::str::FromStr for Edition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "morning" | "am" => Ok(Edition::Morning),
            "evening" | "pm" => Ok(Edition::Evening),
            other => Err(format!("unknown edition {other:?} (expected morning or evening)")),
        }
    }
}

/// Mail account used to send every digest.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    /// Sender address, also used as the SMTP username.
    pub email: String,
    /// SMTP password (for Gmail, an app password).
    pub password: String,
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
}

fn default_smtp_host() -> String {
    DEFAULT_SMTP_HOST.to_string()
}

fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

// Keep the password out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .finish()
    }
}

/// A recipient record exactly as it appears in `targets.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipientEntry {
    pub name: String,
    #[serde(alias = "address")]
    pub email: String,
    #[serde(default)]
    pub am_services: Vec<String>,
    #[serde(default)]
    pub pm_services: Vec<String>,
}

/// A recipient whose service names have been resolved against the registry.
///
/// Services are borrowed from the [`ServiceRegistry`](crate::services::ServiceRegistry),
/// which outlives every recipient.
#[derive(Debug, Clone)]
pub struct Recipient<'r> {
    pub name: String,
    pub email: String,
    pub morning: Vec<&'r ContentService>,
    pub evening: Vec<&'r ContentService>,
}

impl<'r> Recipient<'r> {
    /// Services to run for the given edition, in configured order.
    pub fn services(&self, edition: Edition) -> &[&'r ContentService] {
        match edition {
            Edition::Morning => &self.morning,
            Edition::Evening => &self.evening,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edition_from_str() {
        assert_eq!("morning".parse::<Edition>().unwrap(), Edition::Morning);
        assert_eq!("PM".parse::<Edition>().unwrap(), Edition::Evening);
        assert!("noon".parse::<Edition>().is_err());
    }

    #[test]
    fn test_edition_display_and_label() {
        assert_eq!(Edition::Morning.to_string(), "morning");
        assert_eq!(Edition::Evening.label(), "PM");
    }

    #[test]
    fn test_credentials_defaults() {
        let creds: Credentials =
            serde_yaml::from_str("email: me@example.com\npassword: hunter2\n").unwrap();
        assert_eq!(creds.smtp_host, DEFAULT_SMTP_HOST);
        assert_eq!(creds.smtp_port, DEFAULT_SMTP_PORT);
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds: Credentials =
            serde_yaml::from_str("email: me@example.com\npassword: hunter2\n").unwrap();
        let dbg = format!("{creds:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("me@example.com"));
    }

    #[test]
    fn test_recipient_entry_accepts_address_alias() {
        let entry: RecipientEntry = serde_yaml::from_str(
            "name: Bob\naddress: bob@example.com\nam_services: [meowfacts]\n",
        )
        .unwrap();
        assert_eq!(entry.email, "bob@example.com");
        assert_eq!(entry.am_services, vec!["meowfacts"]);
        assert!(entry.pm_services.is_empty());
    }
}
