//! Engine configuration.
//!
//! Resolved once at process startup and passed into the engine, so no
//! request handler reads process-wide environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use hie_pdq::ServerVariant;
use hie_types::consts::NHS_OID_DEFAULT;

use crate::{EngineError, EngineResult};

/// Configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    broker_url: String,
    consumer_url: String,
    pdq_url: String,
    pdq_server: ServerVariant,
    store_url: String,
    reg_oid: String,
    nhs_oid: String,
    definitions_dir: PathBuf,
    cache_ttl: Option<Duration>,
}

impl EngineConfig {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        broker_url: String,
        consumer_url: String,
        pdq_url: String,
        pdq_server: ServerVariant,
        store_url: String,
        reg_oid: String,
        nhs_oid: String,
        definitions_dir: PathBuf,
        cache_ttl: Option<Duration>,
    ) -> EngineResult<Self> {
        if store_url.trim().is_empty() {
            return Err(EngineError::Config("store url cannot be empty".into()));
        }
        if reg_oid.trim().is_empty() {
            return Err(EngineError::Config(
                "regional authority oid cannot be empty".into(),
            ));
        }
        let nhs_oid = if nhs_oid.trim().is_empty() {
            NHS_OID_DEFAULT.to_string()
        } else {
            nhs_oid
        };
        Ok(Self {
            broker_url,
            consumer_url,
            pdq_url,
            pdq_server,
            store_url,
            reg_oid,
            nhs_oid,
            definitions_dir,
            cache_ttl,
        })
    }

    pub fn broker_url(&self) -> &str {
        &self.broker_url
    }

    pub fn consumer_url(&self) -> &str {
        &self.consumer_url
    }

    pub fn pdq_url(&self) -> &str {
        &self.pdq_url
    }

    pub fn pdq_server(&self) -> ServerVariant {
        self.pdq_server
    }

    pub fn store_url(&self) -> &str {
        &self.store_url
    }

    pub fn reg_oid(&self) -> &str {
        &self.reg_oid
    }

    pub fn nhs_oid(&self) -> &str {
        &self.nhs_oid
    }

    pub fn definitions_dir(&self) -> &Path {
        &self.definitions_dir
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl
    }
}
