use crate::error::ContractError;

/// The canonical header carrying a contract id. `x-contract-id` is a
/// different header entirely and is never accepted as an alias — a request
/// that sends only `x-contract-id` is treated the same as a request with
/// no contract header at all.
pub const CONTRACT_HEADER: &str = "X-NV-Contract";

/// A wire shape with a stable, versioned identifier (e.g. `audit/entries@v1`).
pub trait Contract {
    const CONTRACT_ID: &'static str;
}

/// Verify a header value against an expected contract id.
///
/// Returns `contract_id_mismatch` (with both the expected and the received
/// id in the message) on any divergence, including a missing header.
pub fn verify_header(expected: &'static str, received: Option<&str>) -> Result<(), ContractError> {
    match received {
        Some(got) if got == expected => Ok(()),
        Some(got) => Err(ContractError::new(
            "contract_id_mismatch",
            "X-NV-Contract",
            format!("expected: {expected}, got: {got}"),
        )),
        None => Err(ContractError::new(
            "contract_id_mismatch",
            "X-NV-Contract",
            format!("expected: {expected}, got: <missing>"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_header_passes() {
        assert!(verify_header("audit/entries@v1", Some("audit/entries@v1")).is_ok());
    }

    #[test]
    fn mismatched_version_fails_with_both_ids_in_message() {
        let err = verify_header("audit/entries@v1", Some("audit/entries@v2")).unwrap_err();
        assert_eq!(err.code, "contract_id_mismatch");
        assert!(err.message.contains("audit/entries@v1"));
        assert!(err.message.contains("audit/entries@v2"));
    }

    #[test]
    fn missing_header_fails() {
        assert!(verify_header("audit/entries@v1", None).is_err());
    }

    #[test]
    fn alternate_header_name_is_not_silently_accepted() {
        // Callers are expected to read only CONTRACT_HEADER; x-contract-id
        // values never reach verify_header at all.
        assert_eq!(CONTRACT_HEADER, "X-NV-Contract");
    }
}
