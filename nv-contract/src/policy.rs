use serde::{Deserialize, Serialize};

use crate::error::ContractError;
use crate::normalize::{normalize_method, normalize_path};

/// Per-route access policy. Unique key is `(svcconfig_id, version, method, path)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutePolicy {
    pub svcconfig_id: String,
    pub version: u32,
    pub method: String,
    pub path: String,
    /// 0 = anonymous, >=1 = credential required at that level.
    pub min_access_level: u32,
    pub enabled: bool,
}

/// Which list of policies a [`RoutePolicy`] belongs to, as served by the
/// facilitator's `/resolve` endpoint (`policies: { edge, s2s }`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    Edge,
    S2s,
}

impl RoutePolicy {
    pub fn unique_key(&self) -> (String, u32, String, String) {
        (
            self.svcconfig_id.clone(),
            self.version,
            self.method.clone(),
            self.path.clone(),
        )
    }

    /// Normalize `method`/`path` in place and validate the result.
    pub fn normalize(&mut self) -> Result<(), ContractError> {
        self.method = normalize_method(&self.method)?;
        self.path = normalize_path(&self.path)?;
        Ok(())
    }
}

/// Partition a set of policies into edge-facing and S2S-facing lists,
/// keeping only `enabled == true` entries — mirrors the facilitator's
/// `/resolve` response shape.
pub fn partition_enabled(
    policies: impl IntoIterator<Item = (PolicyKind, RoutePolicy)>,
) -> (Vec<RoutePolicy>, Vec<RoutePolicy>) {
    let mut edge = Vec::new();
    let mut s2s = Vec::new();
    for (kind, policy) in policies {
        if !policy.enabled {
            continue;
        }
        match kind {
            PolicyKind::Edge => edge.push(policy),
            PolicyKind::S2s => s2s.push(policy),
        }
    }
    (edge, s2s)
}
