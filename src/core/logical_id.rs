//! Deterministic logical ID allocation.
//!
//! A logical ID is derived from the construct path below the stack:
//!
//! - `Default` components are dropped everywhere.
//! - A single remaining component is used as-is (non-alphanumerics removed).
//! - Otherwise the ID is a human part followed by 8 uppercase hex characters
//!   of the BLAKE3 hash of the remaining components joined with `/`. The human
//!   part concatenates the components with `Resource` hidden, consecutive
//!   duplicates removed and non-alphanumerics stripped, capped at 240 chars.
//!
//! Nothing else feeds the hash, so editing a resource's properties never
//! changes its logical ID.

use super::hasher;

const HIDDEN_ID: &str = "Default";
const HIDDEN_FROM_HUMAN_ID: &str = "Resource";
const MAX_HUMAN_LEN: usize = 240;
const HASH_LEN: usize = 8;

/// Allocate the logical ID for a path given as components below the stack.
pub fn allocate(components: &[&str]) -> String {
    let components: Vec<&str> = components
        .iter()
        .copied()
        .filter(|c| *c != HIDDEN_ID)
        .collect();

    if components.len() == 1 {
        let candidate = remove_non_alphanumeric(components[0]);
        if !candidate.is_empty() && candidate.len() <= MAX_HUMAN_LEN {
            return candidate;
        }
    }

    let hash = hasher::short_digest(&components.join("/"), HASH_LEN);
    let human: String = remove_dupes(&components)
        .into_iter()
        .filter(|c| *c != HIDDEN_FROM_HUMAN_ID)
        .map(remove_non_alphanumeric)
        .collect::<String>()
        .chars()
        .take(MAX_HUMAN_LEN)
        .collect();

    format!("{}{}", human, hash)
}

/// Allocate from a `/`-separated path below the stack.
pub fn from_path(relative_path: &str) -> String {
    let components: Vec<&str> = relative_path.split('/').filter(|c| !c.is_empty()).collect();
    allocate(&components)
}

fn remove_non_alphanumeric(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

fn remove_dupes<'a>(components: &[&'a str]) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::with_capacity(components.len());
    for c in components {
        if out.last() != Some(c) {
            out.push(*c);
        }
    }
    out
}
