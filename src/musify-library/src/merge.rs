use std::collections::HashSet;

use musify_core::Track;

/// First page of a query: the page's items, minus any repeated key.
pub fn replace_page(page: Vec<Track>) -> Vec<Track> {
    append_page(Vec::new(), page)
}

/// Follow-up page: appends only items whose key is not already present.
/// Order of both the existing list and the page is preserved.
pub fn append_page(mut existing: Vec<Track>, page: Vec<Track>) -> Vec<Track> {
    let mut seen: HashSet<_> = existing.iter().map(|t| t.key.clone()).collect();
    existing.extend(page.into_iter().filter(|t| seen.insert(t.key.clone())));
    existing
}
