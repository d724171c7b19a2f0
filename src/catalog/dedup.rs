//! Collapses resolved entries that share a canonical executable path.

use std::collections::{HashMap, HashSet};

use super::entry::ProgramEntry;

/// Deduplicate entries sharing a case-insensitive path.
///
/// Within a group: if at least one member carries a description, only the
/// described members are kept, one per distinct description text (first
/// occurrence wins) — two shortcuts to the same executable with deliberately
/// different labels both survive. A group without any description keeps a
/// single member. First-seen order is preserved.
///
/// The rebuild pipeline applies this twice: over the auto-indexed sources
/// (registry, start menu, search path) before validity filtering, where
/// invalid entries still occupy their slot and can displace an undescribed
/// sibling; and over the full concatenation with the custom sources after
/// validity filtering, which upholds the published-catalog identity
/// invariant. Idempotent, so the second application never disturbs the
/// first.
pub fn dedup_by_path(entries: Vec<ProgramEntry>) -> Vec<ProgramEntry> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<ProgramEntry>> = HashMap::new();

    for entry in entries {
        let key = entry.unique_identifier();
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(entry);
    }

    let mut kept = Vec::new();
    for key in order {
        let group = groups.remove(&key).unwrap_or_default();
        let (described, plain): (Vec<ProgramEntry>, Vec<ProgramEntry>) =
            group.into_iter().partition(|e| !e.description.is_empty());

        if described.is_empty() {
            kept.extend(plain.into_iter().take(1));
        } else {
            let mut seen = HashSet::new();
            kept.extend(
                described
                    .into_iter()
                    .filter(|e| seen.insert(e.description.clone())),
            );
        }
    }

    kept
}
