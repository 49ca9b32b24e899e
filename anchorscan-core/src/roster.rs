//! Per-job tag roster.
//!
//! Keys are normalized tag UUIDs kept in a `BTreeMap`, so iteration order (and
//! therefore suffix tie-breaking) is the same on every run regardless of the
//! order the server listed the tags in.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use anchorscan_model::TagRecord;
use tracing::warn;

use crate::beacon::{INSTANCE_LEN, InstanceId};

const SUFFIX_LEN: usize = INSTANCE_LEN * 2;

#[derive(Debug, Clone, Default)]
pub struct TagRoster {
    by_uuid: BTreeMap<String, TagRecord>,
    /// Instance suffix -> roster key of the first entry in iteration order.
    by_suffix: HashMap<String, String>,
    ambiguous: BTreeSet<String>,
}

impl TagRoster {
    pub fn build(records: impl IntoIterator<Item = TagRecord>) -> Self {
        let mut by_uuid = BTreeMap::new();
        for record in records {
            let key = record.normalized_uuid();
            if let Some(previous) = by_uuid.insert(key.clone(), record) {
                warn!(
                    uuid = %key,
                    replaced_tag = %previous.tag_id,
                    "duplicate tag uuid in roster; keeping the later record"
                );
            }
        }

        let mut by_suffix: HashMap<String, String> = HashMap::new();
        let mut ambiguous = BTreeSet::new();
        for key in by_uuid.keys() {
            if key.len() < SUFFIX_LEN || !key.is_ascii() {
                warn!(uuid = %key, "tag uuid too short to carry an instance id");
                continue;
            }
            let suffix = key[key.len() - SUFFIX_LEN..].to_string();
            if let Some(first) = by_suffix.get(&suffix) {
                warn!(
                    suffix = %suffix,
                    kept = %first,
                    shadowed = %key,
                    "instance suffix shared by several tags; only the first can match"
                );
                ambiguous.insert(suffix);
                continue;
            }
            by_suffix.insert(suffix, key.clone());
        }

        Self {
            by_uuid,
            by_suffix,
            ambiguous,
        }
    }

    pub fn len(&self) -> usize {
        self.by_uuid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_uuid.is_empty()
    }

    pub fn get(&self, uuid: &str) -> Option<&TagRecord> {
        self.by_uuid.get(uuid)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TagRecord)> {
        self.by_uuid.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// First roster entry whose key ends with the broadcast instance.
    pub fn find_by_instance(&self, instance: &InstanceId) -> Option<&TagRecord> {
        self.by_suffix
            .get(instance.as_str())
            .and_then(|key| self.by_uuid.get(key))
    }

    /// Instance suffixes that map to more than one tag.
    pub fn ambiguous_suffixes(&self) -> impl Iterator<Item = &str> {
        self.ambiguous.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(id: &str, uuid: &str) -> TagRecord {
        TagRecord {
            tag_id: id.into(),
            uuid: uuid.into(),
            db_id: format!("db-{id}"),
        }
    }

    fn instance(hex: &str) -> InstanceId {
        let mut bytes = [0u8; INSTANCE_LEN];
        hex::decode_to_slice(hex, &mut bytes).unwrap();
        InstanceId::from_bytes(&bytes)
    }

    #[test]
    fn keys_are_uppercased_and_last_write_wins() {
        let roster = TagRoster::build([
            tag("a", "edd1ebeac04e5defa017000000000001"),
            tag("b", "EDD1EBEAC04E5DEFA017000000000001"),
        ]);
        assert_eq!(roster.len(), 1);
        let entry = roster.get("EDD1EBEAC04E5DEFA017000000000001").unwrap();
        assert_eq!(entry.tag_id, "b");
    }

    #[test]
    fn matches_on_instance_suffix() {
        let roster = TagRoster::build([
            tag("a", "EDD1EBEAC04E5DEFA017AABBCCDDEEFF"),
            tag("b", "EDD1EBEAC04E5DEFA017000000000002"),
        ]);
        let hit = roster.find_by_instance(&instance("aabbccddeeff")).unwrap();
        assert_eq!(hit.tag_id, "a");
        assert!(roster.find_by_instance(&instance("000000000003")).is_none());
    }

    #[test]
    fn shared_suffix_is_reported_and_first_key_wins() {
        let roster = TagRoster::build([
            tag("late", "FFFFFFFFFFFFFFFFFFFF000000000009"),
            tag("early", "00000000000000000000000000000009"),
        ]);
        assert_eq!(roster.len(), 2);
        assert_eq!(
            roster.ambiguous_suffixes().collect::<Vec<_>>(),
            vec!["000000000009"]
        );
        let hit = roster.find_by_instance(&instance("000000000009")).unwrap();
        assert_eq!(hit.tag_id, "early");
    }

    #[test]
    fn short_uuids_never_match() {
        let roster = TagRoster::build([tag("tiny", "ABCD")]);
        assert_eq!(roster.len(), 1);
        assert!(roster.find_by_instance(&instance("00000000ABCD")).is_none());
    }
}
