//! CSRF and duplicate-submission guards.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::rules::{Choices, Rule};

/// Name of the hidden CSRF token field.
pub const CSRF_FIELD: &str = "csrf";

/// Name of the hidden duplicate-submission id field.
pub const SUBMISSION_ID_FIELD: &str = "unique_uuid";

/// Store of duplicate-submission ids already accepted, usually kept in a session.
pub trait SubmissionStore {
    /// Returns whether `id` was recorded before.
    fn contains(&self, id: &str) -> bool;

    /// Records `id` as submitted.
    fn record(&mut self, id: &str);
}

/// In-memory [`SubmissionStore`]. Serializable so it can live inside session data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySubmissionStore {
    seen: HashSet<String>,
}

impl MemorySubmissionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of recorded ids.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Returns whether no id was recorded yet.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl SubmissionStore for MemorySubmissionStore {
    fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    fn record(&mut self, id: &str) {
        self.seen.insert(id.to_string());
    }
}

/// Rules for the CSRF field: present, non-empty and equal to `token`.
pub fn csrf_rules(token: &str) -> Vec<Rule> {
    vec![
        Rule::not_empty(),
        Rule::in_list(Choices::from_values([token])),
    ]
}

/// Rules for the duplicate-submission field: non-empty and never seen before.
pub fn submission_id_rules() -> Vec<Rule> {
    vec![Rule::not_empty(), Rule::unused()]
}

/// Generates a random id formatted as an RFC 4122 version 4 UUID.
///
/// The value only has to be unique per session; nothing parses it.
pub fn generate_submission_id() -> String {
    use rand::RngExt;
    let mut rng = rand::rng();
    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes);
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleKind;

    #[test]
    fn test_memory_store_records_ids() {
        let mut store = MemorySubmissionStore::new();
        assert!(!store.contains("abc"));
        store.record("abc");
        store.record("abc");
        assert!(store.contains("abc"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_memory_store_serializes() {
        let mut store = MemorySubmissionStore::new();
        store.record("abc");
        let json = serde_json::to_string(&store).unwrap();
        let back: MemorySubmissionStore = serde_json::from_str(&json).unwrap();
        assert_eq!(back, store);
    }

    #[test]
    fn test_submission_id_format() {
        let id = generate_submission_id();
        assert_eq!(id.len(), 36);
        let parts: Vec<_> = id.split('-').collect();
        assert_eq!(
            parts.iter().map(|p| p.len()).collect::<Vec<_>>(),
            vec![8, 4, 4, 4, 12]
        );
        assert!(parts[2].starts_with('4'));
        assert!(matches!(parts[3].chars().next(), Some('8' | '9' | 'a' | 'b')));
        assert_ne!(id, generate_submission_id());
    }

    #[test]
    fn test_guard_rules() {
        let rules = csrf_rules("T1");
        assert_eq!(rules[0].kind, RuleKind::NotEmpty);
        assert_eq!(rules[1].kind, RuleKind::InList);
        assert!(rules[1]
            .params
            .list
            .as_ref()
            .is_some_and(|l| l.contains("T1", false)));

        let rules = submission_id_rules();
        assert_eq!(rules[1].kind, RuleKind::Unused);
    }
}
