//! Closed tag vocabulary and the boundary filter that enforces it.
//!
//! Membership is a set-intersection check at the enrichment boundary, not a
//! DB-level enumeration, so the vocabulary can grow without a migration.

/// Every tag the system is allowed to store. The LLM is told this list, but
/// its output is filtered here regardless.
pub const KNOWN_TAGS: [&str; 14] = [
    "ai",
    "vibe-code",
    "solo",
    "saas",
    "startup",
    "llm",
    "python",
    "javascript",
    "rust",
    "go",
    "web",
    "mobile",
    "devtools",
    "opensource",
];

/// Drops unrecognized tags and duplicates, preserving first-seen order.
pub fn filter_known_tags(raw: Vec<String>) -> Vec<String> {
    let mut seen = Vec::new();
    for tag in raw {
        let tag = tag.trim().to_lowercase();
        if KNOWN_TAGS.contains(&tag.as_str()) && !seen.contains(&tag) {
            seen.push(tag);
        }
    }
    seen
}
