//! Canonical wire schemas and validation for the Nv mesh.
//!
//! Every component that crosses an HTTP boundary — gateway, facilitator,
//! audit receiver, S2S client — builds and validates its requests and
//! responses through the types in this crate rather than ad-hoc maps.

pub mod audit;
pub mod contract;
pub mod envelope;
pub mod error;
pub mod normalize;
pub mod policy;
pub mod record;

pub use audit::{
    AuditBatch, AuditBlob, AuditEntry, AuditMeta, AuditRecord, AuditTarget, FinalizeReason, Phase,
    AUDIT_ENTRIES_CONTRACT_ID,
};
pub use contract::{verify_header, Contract, CONTRACT_HEADER};
pub use envelope::{Envelope, EnvelopeData};
pub use error::{ContractError, ContractResult};
pub use normalize::{normalize_method, normalize_path, normalize_slug};
pub use policy::{partition_enabled, PolicyKind, RoutePolicy};
pub use record::{Environment, Mirror, MirrorSource, ServiceConfigRecord};
