//! URL canonicalization for deduplication.
//!
//! `/about` and `/about/` must land on the same stored record, so every
//! existence check and every write goes through [`normalize_url`].

/// Remove one trailing slash, except where the slash is the whole path.
///
/// `https://x.com/about/` becomes `https://x.com/about`, while the site root
/// `https://x.com/` (and a bare `/`) is returned untouched.
pub fn normalize_url(url: &str) -> String {
    let Some(stripped) = url.strip_suffix('/') else {
        return url.to_string();
    };

    if is_root(url) {
        return url.to_string();
    }

    stripped.to_string()
}

/// True when the trailing slash is the only path segment left.
fn is_root(url: &str) -> bool {
    match url.find("://") {
        Some(scheme_end) => {
            let after_scheme = &url[scheme_end + 3..];
            // First slash after the authority starts the path
            match after_scheme.find('/') {
                Some(path_start) => path_start == after_scheme.len() - 1,
                None => true,
            }
        }
        None => url.trim_matches('/').is_empty(),
    }
}
