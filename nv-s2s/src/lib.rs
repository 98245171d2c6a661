//! Service-to-service HTTP client.
//!
//! Every outbound call is resolved through the Mirror, signed with a
//! freshly minted S2S token, and retried with jittered backoff on
//! transient failure. Two call shapes: [`client::DtoOp`]-driven typed DTO
//! calls for internal workers, and `call_raw` passthrough for the gateway's
//! proxy path.

pub mod client;
pub mod error;
pub mod resolver;
pub mod token;

pub use client::{DtoOp, RawResponse, RetryPolicy, S2sClient};
pub use error::S2sError;
pub use resolver::Resolver;
pub use token::{HmacSigner, KmsSigner, S2sClaims, S2sSigner, TokenMinter};
