use std::{collections::BTreeMap, path::Path, path::PathBuf, time::Duration};

use anyhow::Context;
use http::{HeaderMap, HeaderName, HeaderValue};
use quell::{Options, StorageBackend, TypeMap, DEFAULT_IDENTIFIER_FIELD};

const DEFAULT_CACHE_PATH: &str = "quell-cache.json";

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Config {
    /// The GraphQL endpoint queries are sent to
    pub endpoint: Option<String>,
    pub cache: CacheConfig,
    /// Headers sent with every request
    pub headers: BTreeMap<String, String>,
    pub types: TypesConfig,
}

#[derive(Debug, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct CacheConfig {
    pub identifier_field: String,
    /// Reserved, entries don't currently expire
    #[serde(deserialize_with = "duration_str::deserialize_option_duration")]
    pub ttl: Option<Duration>,
    pub storage: StorageKind,
    /// Where the file store keeps its records.  Defaults to `quell-cache.json`
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            identifier_field: DEFAULT_IDENTIFIER_FIELD.to_string(),
            ttl: None,
            storage: StorageKind::default(),
            path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum StorageKind {
    #[default]
    Memory,
    File,
}

/// Maps query & field names onto the entity types they return
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct TypesConfig {
    pub queries: BTreeMap<String, String>,
    pub fields: BTreeMap<String, String>,
}

impl Config {
    /// Loads the configuration file, falling back to the defaults if there isn't one
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no configuration at {}, using the defaults", path.display());
                return Ok(Config::default());
            }
            Err(error) => return Err(error).with_context(|| format!("could not read {}", path.display())),
        };

        toml::from_str(&contents).with_context(|| format!("could not parse {}", path.display()))
    }

    pub fn options(&self) -> anyhow::Result<Options> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).with_context(|| format!("invalid header name `{name}`"))?;
            let value = HeaderValue::from_str(value).with_context(|| format!("invalid value for header `{name}`"))?;
            headers.insert(name, value);
        }

        let storage = match self.cache.storage {
            StorageKind::Memory => StorageBackend::Memory,
            StorageKind::File => StorageBackend::File(
                self.cache
                    .path
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_PATH)),
            ),
        };

        let mut options = Options::default()
            .with_identifier_field(&self.cache.identifier_field)
            .with_headers(headers);
        options.storage = storage;
        if let Some(ttl) = self.cache.ttl {
            options.cache_time = Some(ttl);
        }

        Ok(options)
    }

    pub fn type_map(&self) -> TypeMap {
        TypeMap::new(&self.types.queries, &self.types.fields)
    }
}
