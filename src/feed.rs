//! Activity feed across a set of repositories.

use std::collections::BTreeSet;

use crate::error::Result;
use crate::store::Store;
use crate::types::FeedItem;

/// Upper bound on names bound into a single feed query (SQLite's default
/// host parameter limit is 999).
const MAX_NAMES_PER_QUERY: usize = 500;

/// Returns the builds of every named repository, most recent first.
///
/// Ordering is `created` descending with the build id breaking ties, so
/// builds created in the same second still come out newest first. Unknown
/// names contribute nothing and an empty list yields an empty feed.
pub fn get_feed<S: AsRef<str>>(store: &dyn Store, full_names: &[S]) -> Result<Vec<FeedItem>> {
    let names: BTreeSet<&str> = full_names
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| !name.is_empty())
        .collect();
    if names.is_empty() {
        return Ok(Vec::new());
    }

    let names: Vec<&str> = names.into_iter().collect();
    let mut items = Vec::new();
    for chunk in names.chunks(MAX_NAMES_PER_QUERY) {
        items.extend(store.list_feed(chunk)?);
    }

    if names.len() > MAX_NAMES_PER_QUERY {
        items.sort_by(|a, b| {
            b.build
                .created
                .cmp(&a.build.created)
                .then(b.build.id.cmp(&a.build.id))
        });
    }

    tracing::debug!(repos = names.len(), builds = items.len(), "assembled feed");
    Ok(items)
}
