//! Canonical normalization for slugs, HTTP methods, and route paths.
//!
//! These are pure functions so every component (gateway parsing, facilitator
//! route-policy storage, contract validation) normalizes identically.

use crate::error::ContractError;

static SLUG_RE_MSG: &str = "must match ^[a-z][a-z0-9-]*$";

/// Validate and return a slug unchanged. Slugs are not case-folded: an
/// invalid slug is a hard error, not a thing to coerce.
pub fn normalize_slug(slug: &str) -> Result<String, ContractError> {
    let mut chars = slug.chars();
    let ok = match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {
            chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        }
        _ => false,
    };
    if ok {
        Ok(slug.to_string())
    } else {
        Err(ContractError::new("INVALID_SLUG", "slug", SLUG_RE_MSG))
    }
}

/// Upper-case and validate an HTTP method against the set this mesh routes.
pub fn normalize_method(method: &str) -> Result<String, ContractError> {
    let upper = method.to_ascii_uppercase();
    match upper.as_str() {
        "GET" | "PUT" | "PATCH" | "DELETE" | "POST" | "HEAD" | "OPTIONS" => Ok(upper),
        _ => Err(ContractError::new(
            "INVALID_METHOD",
            "method",
            format!("unrecognized HTTP method '{method}'"),
        )),
    }
}

/// Normalize a route path: leading `/`, no duplicate slashes, no trailing
/// slash except for the root path, and no query string or fragment.
///
/// Idempotent: `normalize_path(normalize_path(x)) == normalize_path(x)`.
pub fn normalize_path(path: &str) -> Result<String, ContractError> {
    if path.contains('?') || path.contains('#') {
        return Err(ContractError::new(
            "INVALID_PATH",
            "path",
            "must not contain a query string or fragment",
        ));
    }

    let collapsed: String = {
        let mut out = String::with_capacity(path.len() + 1);
        if !path.starts_with('/') {
            out.push('/');
        }
        let mut prev_slash = false;
        for c in path.chars() {
            if c == '/' {
                if prev_slash {
                    continue;
                }
                prev_slash = true;
            } else {
                prev_slash = false;
            }
            out.push(c);
        }
        out
    };

    let trimmed = if collapsed.len() > 1 && collapsed.ends_with('/') {
        collapsed[..collapsed.len() - 1].to_string()
    } else {
        collapsed
    };

    Ok(trimmed)
}
