use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ContractError;
use crate::normalize::normalize_slug;

/// Routing + policy record for one `slug@major-version`.
///
/// Immutable once constructed; updates happen by replacing the value behind
/// its key in a [`Mirror`], never by mutating a held instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceConfigRecord {
    pub slug: String,
    pub version: u32,
    pub base_url: String,
    pub outbound_api_prefix: String,
    pub port: u16,
    pub enabled: bool,
    pub allow_proxy: bool,
    pub internal_only: bool,
    pub expose_health: bool,
    pub config_revision: u32,
    pub etag: String,
    pub updated_at: String,
    pub updated_by: String,
}

/// Deployment environment; governs whether an explicit port is mandatory
/// on `base_url` (see [`ServiceConfigRecord::validate`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Production,
    NonProduction,
}

impl ServiceConfigRecord {
    /// The stable `slug@version` key this record is mirrored under.
    pub fn key(&self) -> String {
        format!("{}@{}", self.slug, self.version)
    }

    /// The composed base URL S2S calls are sent to:
    /// `<baseUrl><outboundApiPrefix>/<slug>/v<version>`.
    pub fn composed_base(&self) -> String {
        format!(
            "{}{}/{}/v{}",
            self.base_url.trim_end_matches('/'),
            self.outbound_api_prefix,
            self.slug,
            self.version
        )
    }

    pub fn validate(&self, env: Environment) -> Result<(), ContractError> {
        normalize_slug(&self.slug)?;

        if self.version < 1 {
            return Err(ContractError::new(
                "INVALID_VERSION",
                "version",
                "must be >= 1",
            ));
        }

        let url = url::Url::parse(&self.base_url).map_err(|e| {
            ContractError::new("INVALID_BASE_URL", "baseUrl", format!("not a URL: {e}"))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ContractError::new(
                "INVALID_BASE_URL",
                "baseUrl",
                "must be absolute http(s)://",
            ));
        }
        if env == Environment::NonProduction && url.port().is_none() {
            return Err(ContractError::new(
                "INVALID_BASE_URL",
                "baseUrl",
                "must carry an explicit port outside production",
            ));
        }

        if !self.outbound_api_prefix.starts_with('/') {
            return Err(ContractError::new(
                "INVALID_PREFIX",
                "outboundApiPrefix",
                "must begin with '/'",
            ));
        }
        if self.outbound_api_prefix.len() > 1 && self.outbound_api_prefix.ends_with('/') {
            return Err(ContractError::new(
                "INVALID_PREFIX",
                "outboundApiPrefix",
                "must not end with '/'",
            ));
        }

        if self.config_revision < 1 {
            return Err(ContractError::new(
                "INVALID_REVISION",
                "configRevision",
                "must be >= 1",
            ));
        }

        Ok(())
    }
}

/// Where a [`Mirror`] snapshot's entries were last loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MirrorSource {
    Db,
    Lkg,
}

/// In-memory map of `slug@version -> ServiceConfigRecord`, plus provenance.
///
/// Invariant: every entry's key equals `record.key()`, and every entry has
/// `enabled == true` — disabled records are never mirrored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mirror {
    entries: HashMap<String, ServiceConfigRecord>,
    pub source: MirrorSource,
    pub fetched_at: String,
}

impl Mirror {
    /// Build a mirror from a set of records, silently dropping any that are
    /// disabled. Returns an error if a duplicate key survives filtering, or
    /// if an enabled record doesn't validate.
    pub fn from_records(
        records: impl IntoIterator<Item = ServiceConfigRecord>,
        source: MirrorSource,
        fetched_at: String,
        env: Environment,
    ) -> Result<Self, ContractError> {
        let mut entries = HashMap::new();
        for record in records {
            if !record.enabled {
                continue;
            }
            record.validate(env)?;
            let key = record.key();
            if entries.insert(key.clone(), record).is_some() {
                return Err(ContractError::new(
                    "DUPLICATE_KEY",
                    "slug@version",
                    format!("duplicate mirror key '{key}'"),
                ));
            }
        }
        Ok(Self {
            entries,
            source,
            fetched_at,
        })
    }

    pub fn get(&self, slug: &str, version: u32) -> Option<&ServiceConfigRecord> {
        self.entries.get(&format!("{slug}@{version}"))
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Stable wire representation: `Record<"slug@version", ServiceConfigRecordJSON>`.
    pub fn to_object(&self) -> HashMap<String, ServiceConfigRecord> {
        self.entries.clone()
    }
}
