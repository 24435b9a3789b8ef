//! Static search dataset served when the upstream search is down.
//!
//! The dataset is read once at startup from a [`FallbackSource`] and held in
//! memory for the life of the process.

use crate::Error;
use serde_json::Value;
use std::path::PathBuf;

/// Where the fallback dataset comes from.
pub trait FallbackSource: Send + Sync {
    /// Load the dataset. `Ok(None)` means "no dataset configured".
    fn load(&self) -> Result<Option<Value>, Error>;
}

/// Dataset stored as a JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileFallback {
    path: PathBuf,
}

impl FileFallback {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FallbackSource for FileFallback {
    fn load(&self) -> Result<Option<Value>, Error> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::Internal(format!("failed to read {}: {}", self.path.display(), e)));
            }
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| Error::Internal(format!("invalid fallback dataset {}: {}", self.path.display(), e)))
    }
}

/// Dataset held in memory, mostly for tests.
#[derive(Debug, Clone)]
pub struct StaticFallback(pub Value);

impl FallbackSource for StaticFallback {
    fn load(&self) -> Result<Option<Value>, Error> {
        Ok(Some(self.0.clone()))
    }
}

/// The loaded dataset, if any.
#[derive(Debug, Clone, Default)]
pub struct FallbackDataset {
    payload: Option<Value>,
}

impl FallbackDataset {
    /// Load the dataset from `source`.
    ///
    /// A load failure is logged and treated as "no dataset": the gateway then
    /// surfaces classified errors instead of degraded results.
    pub fn load(source: &dyn FallbackSource) -> Self {
        match source.load() {
            Ok(Some(payload)) => {
                tracing::info!("search fallback dataset loaded");
                Self { payload: Some(payload) }
            }
            Ok(None) => {
                tracing::warn!("no search fallback dataset available");
                Self::empty()
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load search fallback dataset");
                Self::empty()
            }
        }
    }

    pub fn empty() -> Self {
        Self { payload: None }
    }

    pub fn is_available(&self) -> bool {
        self.payload.is_some()
    }

    /// Render the dataset for a specific request.
    ///
    /// The embedded `query` and `page` fields are rewritten to match the
    /// request. A numeric `page` stays numeric when the requested page parses
    /// as a number.
    pub fn render(&self, query: &str, page: &str) -> Option<Value> {
        let mut payload = self.payload.clone()?;

        if let Some(obj) = payload.as_object_mut() {
            obj.insert("query".into(), Value::String(query.to_string()));

            let page_value = match (obj.get("page"), page.parse::<u64>()) {
                (Some(Value::Number(_)), Ok(n)) => Value::from(n),
                _ => Value::String(page.to_string()),
            };
            obj.insert("page".into(), page_value);
        }

        Some(payload)
    }
}
