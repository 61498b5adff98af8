//! URL resolution against the current page.

use crate::error::NajaError;
use url::Url;

/// Resolve `url` against `base`, the way an anchor's `href` property does.
pub fn resolve(base: &str, url: &str) -> Result<Url, NajaError> {
    let base = Url::parse(base).map_err(|_| NajaError::InvalidUrl(base.to_owned()))?;
    base.join(url)
        .map_err(|_| NajaError::InvalidUrl(url.to_owned()))
}

/// Serialized origin, `None` for opaque origins (`javascript:`, `data:`,
/// `mailto:`, ...).
pub fn origin(url: &Url) -> Option<String> {
    let origin = url.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

/// Normalise an allow-list entry (an origin or any URL) to its origin.
pub fn normalize_origin(entry: &str) -> Option<String> {
    Url::parse(entry).ok().as_ref().and_then(origin)
}

/// Whether `url` resolves to the same origin as `base`.
pub fn is_same_origin(base: &str, url: &str) -> bool {
    match (resolve(base, base), resolve(base, url)) {
        (Ok(base), Ok(target)) => origin(&base).is_some() && origin(&base) == origin(&target),
        _ => false,
    }
}

/// Path and query of `url`, as used for a form without `action`.
pub fn path_and_query(url: &str) -> String {
    match Url::parse(url) {
        Ok(url) => match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_owned(),
        },
        Err(_) => url.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative() {
        let url = resolve("https://example.com/a/b?x=1", "../c").unwrap();
        assert_eq!(url.as_str(), "https://example.com/c");
    }

    #[test]
    fn test_opaque_origin() {
        let url = resolve("https://example.com/", "javascript:void(0)").unwrap();
        assert_eq!(origin(&url), None);
        let url = resolve("https://example.com/", "mailto:a@example.com").unwrap();
        assert_eq!(origin(&url), None);
    }

    #[test]
    fn test_same_origin() {
        assert!(is_same_origin("https://example.com/a", "/b"));
        assert!(!is_same_origin("https://example.com/a", "http://example.com/b"));
        assert!(!is_same_origin("https://example.com/a", "https://evil.example/x"));
    }

    #[test]
    fn test_normalize_origin() {
        assert_eq!(
            normalize_origin("https://cdn.example.com/path").as_deref(),
            Some("https://cdn.example.com")
        );
        assert_eq!(normalize_origin("not a url"), None);
    }

    #[test]
    fn test_path_and_query() {
        assert_eq!(path_and_query("https://example.com/list?page=2"), "/list?page=2");
        assert_eq!(path_and_query("https://example.com/"), "/");
    }
}
