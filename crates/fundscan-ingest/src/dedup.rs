//! Duplicate entity collapsing

use crate::models::{CanonicalRecord, DedupKey};
use fundscan_common::text::push_unique;
use std::collections::HashMap;
use tracing::debug;

struct Group {
    representative: CanonicalRecord,
    investors: Vec<String>,
    members: usize,
}

/// Collapse records that share a [`DedupKey`].
///
/// The representative of a group is the record with the most filled fields;
/// ties go to the one seen first. Investors from every member are merged in
/// first-seen order without case-insensitive duplicates. Groups are returned
/// in order of first appearance. Deduping an already deduped list is a no-op.
pub fn dedupe(records: Vec<CanonicalRecord>) -> Vec<CanonicalRecord> {
    let input_len = records.len();
    let mut slots: HashMap<DedupKey, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for record in records {
        let key = record.dedup_key();
        match slots.get(&key) {
            Some(&slot) => {
                let group = &mut groups[slot];
                for investor in &record.investors {
                    push_unique(&mut group.investors, investor);
                }
                group.members += 1;
                if record.filled_fields() > group.representative.filled_fields() {
                    group.representative = record;
                }
            },
            None => {
                let mut investors = Vec::with_capacity(record.investors.len());
                for investor in &record.investors {
                    push_unique(&mut investors, investor);
                }
                slots.insert(key, groups.len());
                groups.push(Group {
                    representative: record,
                    investors,
                    members: 1,
                });
            },
        }
    }

    let merged = groups.iter().filter(|group| group.members > 1).count();
    debug!(
        phase = "dedupe",
        outcome = "ok",
        input = input_len,
        kept = groups.len(),
        merged_groups = merged,
        "Deduplicated records"
    );

    groups
        .into_iter()
        .map(|group| {
            let mut record = group.representative;
            record.investors = group.investors;
            record
        })
        .collect()
}
