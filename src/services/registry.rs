//! The table of known content services.
//!
//! # Built-in Services
//!
//! | Name | Kind | Source | Notes |
//! |------|------|--------|-------|
//! | `meowfacts` | Text | meowfacts.herokuapp.com | JSON `data[0]` |
//! | `catfacts` | Text | catfact.ninja | JSON `fact` |
//! | `dogfacts` | Text | dog-api.kinduff.com | JSON `facts[0]` |
//! | `uselessfacts` | Text | uselessfacts.jsph.pl | JSON `text` |
//! | `kanye` | Text | api.kanye.rest | Plain text, attributed |
//! | `cataas` | Image | cataas.com | Direct download |
//! | `dogceo` | Image | dog.ceo | JSON `message` holds the image URL |
//! | `randomfox` | Image | randomfox.ca | JSON `image` holds the image URL |
//! | `randomdog` | Image | random.dog | Body is a file name relative to the site |
//!
//! Image services write into the resource directory passed to
//! [`ServiceRegistry::builtin`].

use super::{ContentService, Extract, Resolve};
use std::path::Path;

/// Immutable name → service lookup, built once at startup.
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    services: Vec<ContentService>,
}

impl ServiceRegistry {
    /// Build a registry from an explicit list of services.
    pub fn new(services: Vec<ContentService>) -> Self {
        debug_assert!(
            {
                let mut names: Vec<&str> = services.iter().map(ContentService::name).collect();
                names.sort_unstable();
                names.windows(2).all(|w| w[0] != w[1])
            },
            "duplicate service names"
        );
        Self { services }
    }

    /// The built-in services, with images stored under `res_dir`.
    pub fn builtin(res_dir: &Path) -> Self {
        Self::new(vec![
            ContentService::text(
                "meowfacts",
                "https://meowfacts.herokuapp.com",
                Extract::JsonPointer("/data/0"),
            ),
            ContentService::text(
                "catfacts",
                "https://catfact.ninja/fact",
                Extract::JsonPointer("/fact"),
            ),
            ContentService::text(
                "dogfacts",
                "https://dog-api.kinduff.com/api/facts",
                Extract::JsonPointer("/facts/0"),
            ),
            ContentService::text(
                "uselessfacts",
                "https://uselessfacts.jsph.pl/api/v2/facts/random?language=en",
                Extract::JsonPointer("/text"),
            ),
            ContentService::text("kanye", "https://api.kanye.rest/text", Extract::Raw)
                .with_attribution("Kanye West"),
            ContentService::image(
                "cataas",
                "https://cataas.com/cat",
                Resolve::Direct,
                res_dir.join("cataas.jpg"),
            ),
            ContentService::image(
                "dogceo",
                "https://dog.ceo/api/breeds/image/random",
                Resolve::JsonPointer("/message"),
                res_dir.join("dogceo.jpg"),
            ),
            ContentService::image(
                "randomfox",
                "https://randomfox.ca/floof/",
                Resolve::JsonPointer("/image"),
                res_dir.join("randomfox.jpg"),
            ),
            ContentService::image(
                "randomdog",
                "https://random.dog/woof?filter=mp4,webm",
                Resolve::RelativePath {
                    base: "https://random.dog/",
                },
                res_dir.join("randomdog.jpg"),
            ),
        ])
    }

    /// Look a service up by name, ignoring case and surrounding whitespace.
    pub fn get(&self, name: &str) -> Option<&ContentService> {
        let wanted = name.trim().to_lowercase();
        self.services.iter().find(|s| s.name() == wanted)
    }

    /// Service names in registration order, as accepted by [`Self::get`].
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.services.iter().map(ContentService::name)
    }

    /// Number of registered services.
    pub fn len(&self) -> usize {
        self.services.len()
    }
}
