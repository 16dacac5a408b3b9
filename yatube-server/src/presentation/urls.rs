use actix_web::HttpRequest;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::domain::error::DomainError;

/// Characters left as-is in a `next` query value. Slashes stay readable so
/// `/new/` round-trips as `?next=/new/`.
const NEXT_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub fn login_redirect(login_url: &str, next: &str) -> String {
    format!("{login_url}?next={}", utf8_percent_encode(next, NEXT_VALUE))
}

/// Only same-site absolute paths are followed after login.
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.contains('\\'))
}

/// Path of a named route, e.g. `url_path(&req, "profile", ["leo"])` → `/leo/`.
pub fn url_path<U, I>(req: &HttpRequest, name: &str, elements: U) -> Result<String, DomainError>
where
    U: IntoIterator<Item = I>,
    I: AsRef<str>,
{
    req.url_for(name, elements)
        .map(|url| url.path().to_string())
        .map_err(|e| DomainError::Internal(format!("cannot build url for {name}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_keeps_slashes_and_encodes_the_rest() {
        assert_eq!(
            login_redirect("/auth/login/", "/new/"),
            "/auth/login/?next=/new/"
        );
        assert_eq!(
            login_redirect("/auth/login/", "/follow/?page=2"),
            "/auth/login/?next=/follow/%3Fpage%3D2"
        );
    }

    #[test]
    fn only_local_paths_are_safe() {
        assert_eq!(safe_next(Some("/leo/1/")), Some("/leo/1/"));
        assert_eq!(safe_next(Some("//evil.example")), None);
        assert_eq!(safe_next(Some("https://evil.example")), None);
        assert_eq!(safe_next(None), None);
    }
}
