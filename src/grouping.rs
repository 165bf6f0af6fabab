use crate::constants::{EMPTY_STORE_MESSAGE, NO_RESULTS_MESSAGE};
use crate::entry::DreamEntry;
use chrono::{DateTime, Local, NaiveDate, TimeZone};
use serde::Serialize;
use std::collections::HashMap;

fn local_time(created_at_ms: u64) -> Option<DateTime<Local>> {
    Local.timestamp_millis_opt(created_at_ms as i64).single()
}

/// Calendar-day bucket key. Deliberately independent of the display label so
/// formatting quirks can never split or merge groups.
pub fn day_key(created_at_ms: u64) -> NaiveDate {
    local_time(created_at_ms)
        .map(|dt| dt.date_naive())
        .unwrap_or_default()
}

/// Section header: weekday, month and day, no year.
pub fn date_label(created_at_ms: u64) -> String {
    local_time(created_at_ms)
        .map(|dt| dt.format("%A, %B %-d").to_string())
        .unwrap_or_else(|| "Unknown date".to_string())
}

/// An entry passes when the query appears (case-insensitive) in its
/// transcription, its joined tag text, or its formatted date label.
/// The empty query passes everything.
pub fn entry_matches(entry: &DreamEntry, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    entry.transcription.to_lowercase().contains(&query)
        || entry.tags.join(" ").to_lowercase().contains(&query)
        || date_label(entry.created_at_ms).to_lowercase().contains(&query)
}

pub fn filter_entries<'a>(entries: &'a [DreamEntry], query: &str) -> Vec<&'a DreamEntry> {
    entries.iter().filter(|e| entry_matches(e, query)).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayGroup {
    pub label: String,
    pub entries: Vec<DreamEntry>,
}

/// Single left-to-right pass; a new calendar day opens a new group and later
/// entries of an already-seen day join that group. Group order is discovery
/// order, so it is newest-day-first exactly when the input is newest-first.
pub fn group_entries(entries: &[&DreamEntry]) -> Vec<DayGroup> {
    let mut groups: Vec<DayGroup> = Vec::new();
    let mut seen: HashMap<NaiveDate, usize> = HashMap::new();

    for &entry in entries {
        let key = day_key(entry.created_at_ms);
        match seen.get(&key) {
            Some(&index) => groups[index].entries.push(entry.clone()),
            None => {
                seen.insert(key, groups.len());
                groups.push(DayGroup {
                    label: date_label(entry.created_at_ms),
                    entries: vec![entry.clone()],
                });
            }
        }
    }

    groups
}

/// Display-ready journal projection. An empty journal and a search that
/// matched nothing are different states with different messages.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ListOutcome {
    EmptyStore { message: &'static str },
    NoMatches { message: &'static str },
    Groups { groups: Vec<DayGroup> },
}

pub fn build_feed(entries: &[DreamEntry], query: &str) -> ListOutcome {
    if entries.is_empty() {
        return ListOutcome::EmptyStore {
            message: EMPTY_STORE_MESSAGE,
        };
    }
    let filtered = filter_entries(entries, query);
    if filtered.is_empty() {
        return ListOutcome::NoMatches {
            message: NO_RESULTS_MESSAGE,
        };
    }
    ListOutcome::Groups {
        groups: group_entries(&filtered),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::DreamEntry;
    use chrono::{Local, TimeZone};

    fn at(y: i32, m: u32, d: u32, h: u32) -> u64 {
        Local
            .with_ymd_and_hms(y, m, d, h, 0, 0)
            .single()
            .unwrap()
            .timestamp_millis() as u64
    }

    fn entry_at(ms: u64, transcription: &str, tags: &[&str]) -> DreamEntry {
        let mut entry = DreamEntry::manual(transcription);
        entry.created_at_ms = ms;
        entry.tags = tags.iter().map(|t| t.to_string()).collect();
        entry
    }

    // --- filtering ---

    #[test]
    fn empty_query_passes_everything() {
        let entries = vec![
            entry_at(at(2026, 8, 7, 9), "flying", &[]),
            entry_at(at(2026, 8, 6, 9), "falling", &[]),
        ];
        assert_eq!(filter_entries(&entries, "").len(), 2);
        assert_eq!(filter_entries(&entries, "   ").len(), 2);
    }

    #[test]
    fn filter_is_case_insensitive_on_transcription() {
        let entries = vec![entry_at(at(2026, 8, 7, 9), "A GIANT Library", &[])];
        assert_eq!(filter_entries(&entries, "giant").len(), 1);
        assert_eq!(filter_entries(&entries, "LIBRARY").len(), 1);
        assert_eq!(filter_entries(&entries, "ocean").len(), 0);
    }

    #[test]
    fn filter_matches_tags() {
        let entries = vec![entry_at(at(2026, 8, 7, 9), "x", &["Recurring", "Water"])];
        assert_eq!(filter_entries(&entries, "recurring").len(), 1);
        assert_eq!(filter_entries(&entries, "water").len(), 1);
    }

    #[test]
    fn filter_matches_the_formatted_date_label() {
        let ms = at(2026, 8, 7, 9);
        let entries = vec![entry_at(ms, "x", &[])];
        let label = date_label(ms);
        let needle = label.split(',').next().unwrap().to_lowercase();
        assert_eq!(filter_entries(&entries, &needle).len(), 1);
    }

    // --- day keys and labels ---

    #[test]
    fn same_day_different_hours_share_a_key() {
        assert_eq!(day_key(at(2026, 8, 7, 1)), day_key(at(2026, 8, 7, 23)));
        assert_ne!(day_key(at(2026, 8, 7, 23)), day_key(at(2026, 8, 8, 1)));
    }

    #[test]
    fn label_has_no_year() {
        let label = date_label(at(2026, 8, 7, 9));
        assert!(!label.contains("2026"), "label {:?} leaks the year", label);
    }

    // --- grouping ---

    #[test]
    fn grouping_never_produces_empty_groups() {
        let entries = vec![
            entry_at(at(2026, 8, 7, 22), "a", &[]),
            entry_at(at(2026, 8, 7, 6), "b", &[]),
            entry_at(at(2026, 8, 6, 9), "c", &[]),
        ];
        let refs: Vec<&DreamEntry> = entries.iter().collect();
        let groups = group_entries(&refs);
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| !g.entries.is_empty()));
        assert_eq!(groups[0].entries.len(), 2);
    }

    #[test]
    fn newest_first_input_keeps_one_date_in_one_adjacent_group() {
        let entries = vec![
            entry_at(at(2026, 8, 7, 23), "a", &[]),
            entry_at(at(2026, 8, 7, 3), "b", &[]),
            entry_at(at(2026, 8, 6, 12), "c", &[]),
            entry_at(at(2026, 8, 5, 12), "d", &[]),
        ];
        let refs: Vec<&DreamEntry> = entries.iter().collect();
        let groups = group_entries(&refs);
        let labels: Vec<&str> = groups.iter().map(|g| g.label.as_str()).collect();
        let unique: std::collections::HashSet<&str> = labels.iter().copied().collect();
        assert_eq!(labels.len(), unique.len(), "a calendar date split across groups");
        assert_eq!(groups.len(), 3);
    }

    #[test]
    fn group_order_is_discovery_order_for_mixed_input() {
        // Positional grouping: with out-of-order input the groups follow the
        // order days are first seen, and stragglers join their day's group.
        let entries = vec![
            entry_at(at(2026, 8, 6, 9), "old", &[]),
            entry_at(at(2026, 8, 7, 9), "new", &[]),
            entry_at(at(2026, 8, 6, 20), "old again", &[]),
        ];
        let refs: Vec<&DreamEntry> = entries.iter().collect();
        let groups = group_entries(&refs);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].label, date_label(at(2026, 8, 6, 9)));
        assert_eq!(groups[0].entries.len(), 2);
        assert_eq!(groups[1].entries.len(), 1);
    }

    // --- the two empty states ---

    #[test]
    fn empty_store_is_its_own_state() {
        let outcome = build_feed(&[], "anything");
        assert!(matches!(outcome, ListOutcome::EmptyStore { .. }));
    }

    #[test]
    fn no_matches_is_distinct_from_empty_store() {
        let entries = vec![
            entry_at(at(2026, 8, 7, 9), "flying", &[]),
            entry_at(at(2026, 8, 6, 9), "falling", &[]),
            entry_at(at(2026, 8, 5, 9), "teeth", &[]),
        ];
        let outcome = build_feed(&entries, "zzz-no-such-dream");
        assert!(matches!(outcome, ListOutcome::NoMatches { .. }));
        assert_ne!(outcome, build_feed(&[], "zzz-no-such-dream"));
    }

    #[test]
    fn matching_query_yields_groups() {
        let entries = vec![entry_at(at(2026, 8, 7, 9), "flying over water", &[])];
        match build_feed(&entries, "flying") {
            ListOutcome::Groups { groups } => {
                assert_eq!(groups.len(), 1);
                assert_eq!(groups[0].entries[0].transcription, "flying over water");
            }
            other => panic!("expected groups, got {:?}", other),
        }
    }
}
