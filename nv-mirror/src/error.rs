use std::fmt;

use nv_contract::ContractError;

/// Component-internal error for the mirror store. Converted to
/// `nv_app::AppError` at the HTTP boundary by each service that embeds it.
#[derive(Debug, Clone)]
pub enum MirrorError {
    /// The DB loader reported a failure (unreachable, query error, etc).
    DbUnavailable(String),
    /// The LKG file exists but failed to parse or validate.
    LkgInvalid(String),
    /// Neither DB nor a usable LKG file is available at boot.
    ColdStartNoDbNoLkg,
    Io(String),
    Contract(ContractError),
}

impl fmt::Display for MirrorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MirrorError::DbUnavailable(msg) => write!(f, "db unavailable: {msg}"),
            MirrorError::LkgInvalid(msg) => write!(f, "lkg invalid: {msg}"),
            MirrorError::ColdStartNoDbNoLkg => write!(f, "mirror_unavailable: no db and no valid lkg"),
            MirrorError::Io(msg) => write!(f, "io error: {msg}"),
            MirrorError::Contract(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for MirrorError {}

impl From<ContractError> for MirrorError {
    fn from(err: ContractError) -> Self {
        MirrorError::Contract(err)
    }
}
