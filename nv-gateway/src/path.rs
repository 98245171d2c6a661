//! Parses the gateway's one public URL convention: `/api/<slug>/v<major>/<rest>`.
//!
//! Hand-rolled rather than a regex crate — mirrors the style of
//! `nv_contract::normalize`, which validates slugs with a plain character
//! scan instead of pulling in a pattern-matching dependency.

/// A parsed `/api/<slug>/v<version>/<subpath>` request target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiTarget {
    pub slug: String,
    pub version: u32,
    /// Always starts with `/`; `/` itself when the request carried no subpath.
    pub subpath: String,
}

/// `^/api/([a-z][a-z0-9-]*)/v([0-9]+)(?:/(.*))?$`
pub fn parse_api_path(path: &str) -> Option<ApiTarget> {
    let rest = path.strip_prefix("/api/")?;
    let (slug, rest) = rest.split_once('/')?;
    if !is_slug(slug) {
        return None;
    }

    let version_str = rest.strip_prefix('v')?;
    let (version_str, subpath) = match version_str.split_once('/') {
        Some((v, sub)) => (v, format!("/{sub}")),
        None => (version_str, "/".to_string()),
    };
    if version_str.is_empty() || !version_str.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let version: u32 = version_str.parse().ok()?;
    if version < 1 {
        return None;
    }

    Some(ApiTarget { slug: slug.to_string(), version, subpath })
}

fn is_slug(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {
            chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        }
        _ => false,
    }
}

/// `^/health(?:/[A-Za-z0-9_-]+)?$`
pub fn is_health_subpath(subpath: &str) -> bool {
    match subpath.strip_prefix("/health") {
        Some("") => true,
        Some(token) => {
            token.starts_with('/')
                && !token[1..].is_empty()
                && token[1..].chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_slug_version_and_subpath() {
        let target = parse_api_path("/api/user/v1/users/u1").unwrap();
        assert_eq!(target.slug, "user");
        assert_eq!(target.version, 1);
        assert_eq!(target.subpath, "/users/u1");
    }

    #[test]
    fn missing_subpath_defaults_to_root() {
        let target = parse_api_path("/api/user/v1").unwrap();
        assert_eq!(target.subpath, "/");
    }

    #[test]
    fn rejects_non_numeric_or_zero_version() {
        assert!(parse_api_path("/api/user/vx/users").is_none());
        assert!(parse_api_path("/api/user/v0/users").is_none());
    }

    #[test]
    fn rejects_bad_slug() {
        assert!(parse_api_path("/api/User/v1/x").is_none());
        assert!(parse_api_path("/api//v1/x").is_none());
    }

    #[test]
    fn recognizes_health_subpaths() {
        assert!(is_health_subpath("/health"));
        assert!(is_health_subpath("/health/live"));
        assert!(!is_health_subpath("/health/"));
        assert!(!is_health_subpath("/healthcheck"));
        assert!(!is_health_subpath("/users"));
    }
}
