use std::{path::PathBuf, time::Duration};

use http::{header, HeaderMap, HeaderValue};

pub const DEFAULT_IDENTIFIER_FIELD: &str = "_id";

/// Settings for a [`QuellClient`](crate::QuellClient)
#[derive(Clone, Debug)]
pub struct Options {
    /// The field (and argument) that identifies an entity.  Defaults to `_id`
    pub identifier_field: String,
    /// How long cached data should live.
    ///
    /// This is reserved: nothing currently expires entries from the store.
    pub cache_time: Option<Duration>,
    /// Which store implementation an integrator should build
    pub storage: StorageBackend,
    /// Headers sent along with every request
    pub headers: HeaderMap,
}

impl Default for Options {
    fn default() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Options {
            identifier_field: DEFAULT_IDENTIFIER_FIELD.to_string(),
            cache_time: Some(Duration::from_secs(600)),
            storage: StorageBackend::default(),
            headers,
        }
    }
}

impl Options {
    #[must_use]
    pub fn with_identifier_field(mut self, identifier_field: impl Into<String>) -> Self {
        self.identifier_field = identifier_field.into();
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum StorageBackend {
    #[default]
    Memory,
    File(PathBuf),
}
