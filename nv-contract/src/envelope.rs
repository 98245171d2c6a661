use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ContractError;
use crate::normalize::normalize_slug;

/// Canonical success response shape. Errors never use this — they use
/// RFC 7807 Problem JSON (`nv_app::error::Problem`) instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    pub ok: bool,
    pub service: String,
    pub data: EnvelopeData,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvelopeData {
    pub status: u16,
    pub body: Value,
}

impl Envelope {
    pub fn make_ok(service: impl Into<String>, status: u16, body: Value) -> Result<Self, ContractError> {
        let service = service.into();
        normalize_slug(&service)?;
        if !(100..=599).contains(&status) {
            return Err(ContractError::new(
                "INVALID_STATUS",
                "data.status",
                format!("{status} is outside [100,599]"),
            ));
        }
        Ok(Self {
            ok: true,
            service,
            data: EnvelopeData { status, body },
        })
    }
}
