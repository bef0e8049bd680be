//! Loading `creds.yaml` and `targets.yaml`.
//!
//! Both files are read once at startup. Every problem found here is a
//! [`ConfigError`] and stops the process before the scheduler starts; in
//! particular a recipient naming a service the registry does not know is
//! rejected now rather than discovered at send time.
//!
//! # Recipients File
//!
//! `targets.yaml` may hold several YAML documents, and each document may be a
//! single record or a list of records:
//!
//! ```yaml
//! name: Alice
//! email: alice@example.com
//! am_services: [meowfacts, cataas]
//! pm_services: [catfacts]
//! ---
//! - name: Bob
//!   email: bob@example.com
//!   am_services: [dogfacts]
//! ```

use crate::error::ConfigError;
use crate::models::{Credentials, Recipient, RecipientEntry};
use crate::services::{ContentService, ServiceRegistry};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, instrument};

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<RecipientEntry>),
    One(RecipientEntry),
}

/// Read the mail account from a YAML file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn load_credentials(path: &Path) -> Result<Credentials, ConfigError> {
    let text = read(path)?;
    let creds: Credentials = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    info!(email = %creds.email, smtp_host = %creds.smtp_host, "Loaded credentials");
    Ok(creds)
}

/// Read and resolve every recipient in a YAML file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn load_recipients<'r>(
    path: &Path,
    registry: &'r ServiceRegistry,
) -> Result<Vec<Recipient<'r>>, ConfigError> {
    let text = read(path)?;
    let entries = parse_entries(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    if entries.is_empty() {
        return Err(ConfigError::Empty {
            path: path.to_path_buf(),
        });
    }

    let recipients = entries
        .into_iter()
        .map(|entry| resolve(entry, registry))
        .collect::<Result<Vec<_>, _>>()?;
    info!(count = recipients.len(), "Loaded recipients");
    Ok(recipients)
}

/// Parse every document of a recipients file into flat entries.
pub fn parse_entries(text: &str) -> Result<Vec<RecipientEntry>, serde_yaml::Error> {
    let mut entries = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        // An empty document (e.g. a trailing `---`) deserializes as unit.
        let value = serde_yaml::Value::deserialize(document)?;
        if value.is_null() {
            continue;
        }
        match serde_yaml::from_value::<OneOrMany>(value)? {
            OneOrMany::Many(many) => entries.extend(many),
            OneOrMany::One(one) => entries.push(one),
        }
    }
    Ok(entries)
}

/// Trim a raw entry and look each of its services up in the registry.
pub fn resolve<'r>(
    entry: RecipientEntry,
    registry: &'r ServiceRegistry,
) -> Result<Recipient<'r>, ConfigError> {
    let name = entry.name.trim().to_string();
    let lookup = |names: &[String]| -> Result<Vec<&'r ContentService>, ConfigError> {
        names
            .iter()
            .map(|service| {
                registry
                    .get(service)
                    .ok_or_else(|| ConfigError::UnknownService {
                        recipient: name.clone(),
                        service: service.clone(),
                    })
            })
            .collect()
    };

    let morning = lookup(&entry.am_services)?;
    let evening = lookup(&entry.pm_services)?;
    debug!(
        recipient = %name,
        am = morning.len(),
        pm = evening.len(),
        "Resolved recipient services"
    );

    Ok(Recipient {
        email: entry.email.trim().to_string(),
        name,
        morning,
        evening,
    })
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn registry() -> ServiceRegistry {
        ServiceRegistry::builtin(Path::new("res"))
    }

    fn file_with(contents: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_load_credentials() {
        let f = file_with("email: me@example.com\npassword: secret\nsmtp_port: 2525\n");
        let creds = load_credentials(f.path()).unwrap();
        assert_eq!(creds.email, "me@example.com");
        assert_eq!(creds.password, "secret");
        assert_eq!(creds.smtp_port, 2525);
    }

    #[test]
    fn test_load_credentials_missing_file() {
        let err = load_credentials(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_credentials_missing_password() {
        let f = file_with("email: me@example.com\n");
        let err = load_credentials(f.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_recipients_keep_service_order() {
        let registry = registry();
        let f = file_with(
            "name: ' Alice '\nemail: alice@example.com \nam_services: [meowfacts, cataas]\npm_services: [CatFacts]\n",
        );
        let recipients = load_recipients(f.path(), &registry).unwrap();

        assert_eq!(recipients.len(), 1);
        let alice = &recipients[0];
        assert_eq!(alice.name, "Alice");
        assert_eq!(alice.email, "alice@example.com");
        let am: Vec<&str> = alice.morning.iter().map(|s| s.name()).collect();
        assert_eq!(am, vec!["meowfacts", "cataas"]);
        assert_eq!(alice.evening[0].name(), "catfacts");
    }

    #[test]
    fn test_recipients_multi_document_and_lists() {
        let registry = registry();
        let f = file_with(
            "name: Alice\nemail: a@example.com\nam_services: [meowfacts]\n---\n- name: Bob\n  email: b@example.com\n- name: Carol\n  address: c@example.com\n  pm_services: [dogceo]\n---\n",
        );
        let recipients = load_recipients(f.path(), &registry).unwrap();
        let names: Vec<&str> = recipients.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob", "Carol"]);
        assert!(recipients[1].morning.is_empty());
        assert_eq!(recipients[2].email, "c@example.com");
    }

    #[test]
    fn test_unknown_service_is_config_error() {
        let registry = registry();
        let f = file_with("name: Alice\nemail: a@example.com\nam_services: [meowfacts, dogpics]\n");
        match load_recipients(f.path(), &registry) {
            Err(ConfigError::UnknownService { recipient, service }) => {
                assert_eq!(recipient, "Alice");
                assert_eq!(service, "dogpics");
            }
            other => panic!("expected UnknownService, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_recipients_file() {
        let registry = registry();
        let f = file_with("");
        assert!(matches!(
            load_recipients(f.path(), &registry),
            Err(ConfigError::Empty { .. })
        ));
    }

    #[test]
    fn test_malformed_recipients_file() {
        let registry = registry();
        let f = file_with("name: [unterminated\n");
        assert!(matches!(
            load_recipients(f.path(), &registry),
            Err(ConfigError::Parse { .. })
        ));
    }
}
