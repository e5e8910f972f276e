//! URL path-template helpers.
//!
//! # Design
//! Endpoint URLs are plain strings built once at declaration time by joining
//! the parent's URL with the child's segment. `:name` placeholders survive
//! joining untouched and are only resolved per call by [`substitute`].

use std::collections::BTreeMap;

/// Join a base URL and a relative segment with exactly one `/` between them.
///
/// An empty (or slash-only) segment yields the base without its trailing
/// slash. A trailing slash on the segment is kept.
pub fn join(base: &str, segment: &str) -> String {
    let base = base.trim_end_matches('/');
    let segment = segment.trim_start_matches('/');
    if segment.is_empty() {
        return base.to_string();
    }
    format!("{base}/{segment}")
}

/// Replace every `:key` token in `template` with the matching value.
///
/// Keys are applied longest-first so `:id` cannot eat the prefix of an
/// `:ident` placeholder that is also being resolved. Tokens without a value
/// are left verbatim.
pub fn substitute(template: &str, params: &BTreeMap<String, String>) -> String {
    let mut keys: Vec<&String> = params.keys().collect();
    keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let mut url = template.to_string();
    for key in keys {
        let token = format!(":{key}");
        if url.contains(&token) {
            url = url.replace(&token, &params[key]);
        }
    }
    url
}
