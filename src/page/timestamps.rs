use std::cmp::Ordering;

use crate::data::{DataFile, RawEntry, TimestampTable};

use super::{query::Route, PageConfig, PageLayout};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntrySource {
    /// Shared by every character of a stage.
    Common,
    Individual,
}

/// A timestamp ready to be listed: its time is resolved for the page's
/// character and route.
#[derive(Debug, Clone, PartialEq)]
pub struct TimestampEntry {
    pub time: f64,
    pub label: String,
    pub content: String,
    pub source: EntrySource,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

fn qualify(
    raw: &RawEntry,
    character: &str,
    route: Option<&Route>,
    source: EntrySource,
) -> Option<TimestampEntry> {
    let label = non_empty(&raw.label)?;
    let content = non_empty(&raw.description)?;
    let time = raw.time.as_ref()?.resolve(character, route)?;
    Some(TimestampEntry {
        time,
        label: label.to_string(),
        content: content.to_string(),
        source,
    })
}

/// Merges shared and page-specific timestamps into one list ordered by time.
///
/// Entries without a label, a description or a time for this character and
/// route are left out. Equal times keep their input order, shared entries
/// first.
pub fn merge_entries(
    common: &[RawEntry],
    individual: &[RawEntry],
    character: &str,
    route: Option<&Route>,
) -> Vec<TimestampEntry> {
    let common = common
        .iter()
        .filter_map(|raw| qualify(raw, character, route, EntrySource::Common));
    let individual = individual
        .iter()
        .filter_map(|raw| qualify(raw, character, route, EntrySource::Individual));

    let mut entries: Vec<TimestampEntry> = common.chain(individual).collect();
    // sort_by is stable
    entries.sort_by(|a, b| a.time.partial_cmp(&b.time).unwrap_or(Ordering::Equal));
    entries
}

/// What the timestamp controller needs from a page, independent of whether
/// the page is a multi-stage run or a single stage.
pub trait StageSource {
    fn is_staged(&self) -> bool;
    fn stage_count(&self) -> usize;
    fn stage_labels(&self) -> &[String];
    fn entries_for_stage(&self, stage: usize) -> Vec<TimestampEntry>;
    fn video_id(&self) -> Option<&str>;
    fn title(&self) -> &str;
    fn original_title(&self) -> &str;
    fn description(&self) -> &str;
}

/// A loaded page together with the shared timestamps of its data file.
pub struct PageSource {
    pub config: PageConfig,
    pub common: TimestampTable,
}

impl PageSource {
    pub fn new(config: PageConfig, data: DataFile) -> PageSource {
        PageSource {
            config,
            common: data.common.timestamps,
        }
    }

    pub fn stage_key(&self, stage: usize) -> String {
        match &self.config.layout {
            PageLayout::Staged { stage_keys, .. } => stage
                .checked_sub(1)
                .and_then(|index| stage_keys.get(index))
                .cloned()
                .unwrap_or_else(|| stage.to_string()),
            PageLayout::Single { .. } => "1".to_string(),
        }
    }
}

impl StageSource for PageSource {
    fn is_staged(&self) -> bool {
        self.config.is_staged()
    }

    fn stage_count(&self) -> usize {
        self.config.stage_count()
    }

    fn stage_labels(&self) -> &[String] {
        self.config.stage_labels()
    }

    fn entries_for_stage(&self, stage: usize) -> Vec<TimestampEntry> {
        let character = &self.config.character_key;
        match &self.config.layout {
            PageLayout::Staged { route, stages, .. } => {
                let key = self.stage_key(stage);
                let individual = stages.get(&key).map_or(&[][..], |entries| &entries[..]);
                merge_entries(
                    self.common.for_stage(&key),
                    individual,
                    character,
                    route.as_ref(),
                )
            }
            PageLayout::Single { timestamps } => {
                merge_entries(self.common.flat(), timestamps, character, None)
            }
        }
    }

    fn video_id(&self) -> Option<&str> {
        self.config.video_id.as_deref()
    }

    fn title(&self) -> &str {
        &self.config.title
    }

    fn original_title(&self) -> &str {
        &self.config.original_title
    }

    fn description(&self) -> &str {
        &self.config.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::Time,
        page::{loader::build_page_config, query::PageRequest},
    };

    fn raw(time: Option<f64>, label: &str, description: &str) -> RawEntry {
        RawEntry {
            time: time.map(Time::Fixed),
            label: Some(label.to_string()).filter(|l| !l.is_empty()),
            description: Some(description.to_string()).filter(|d| !d.is_empty()),
        }
    }

    fn labels(entries: &[TimestampEntry]) -> Vec<&str> {
        entries.iter().map(|entry| entry.label.as_str()).collect()
    }

    #[test]
    fn test_merge_sorts_by_time() {
        let common = vec![raw(Some(40.0), "c1", "d"), raw(Some(10.0), "c2", "d")];
        let individual = vec![raw(Some(25.0), "i1", "d"), raw(Some(5.0), "i2", "d")];
        let merged = merge_entries(&common, &individual, "reimu", None);
        assert_eq!(labels(&merged), vec!["i2", "c2", "i1", "c1"]);
        assert!(merged.windows(2).all(|pair| pair[0].time <= pair[1].time));
    }

    #[test]
    fn test_merge_is_stable_on_ties() {
        let common = vec![raw(Some(10.0), "c1", "d"), raw(Some(10.0), "c2", "d")];
        let individual = vec![raw(Some(10.0), "i1", "d"), raw(Some(3.0), "i2", "d")];
        let merged = merge_entries(&common, &individual, "reimu", None);
        assert_eq!(labels(&merged), vec!["i2", "c1", "c2", "i1"]);
        assert_eq!(merged[1].source, EntrySource::Common);
        assert_eq!(merged[3].source, EntrySource::Individual);
    }

    #[test]
    fn test_merge_drops_incomplete_entries() {
        let common = vec![
            raw(Some(1.0), "", "d"),
            raw(Some(2.0), "no description", ""),
            raw(None, "no time", "d"),
            raw(Some(4.0), "kept", "d"),
        ];
        let merged = merge_entries(&common, &[], "reimu", None);
        assert_eq!(labels(&merged), vec!["kept"]);
    }

    #[test]
    fn test_zero_time_is_kept() {
        let merged = merge_entries(&[], &[raw(Some(0.0), "start", "d")], "reimu", None);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].time, 0.0);
    }

    #[test]
    fn test_common_entry_resolves_per_character() {
        let data = DataFile::from_json(
            r#"{
                "stageLabels": ["1", "2", "3"],
                "common": {"timestamps": {"2": [
                    {"time": {"charA": 30, "charB": 45}, "label": "X", "description": "Y"},
                    {"time": {"charB": 50}, "label": "only B", "description": "Y"}
                ]}},
                "charA": {"label": "A", "videoId": "v", "timestamps": {
                    "2": [{"time": 35, "label": "mine", "description": "Z"}]
                }}
            }"#,
        )
        .unwrap();
        let request = PageRequest::staged("charA", "normal").unwrap();
        let config = build_page_config(&data, &request).unwrap();
        let source = PageSource::new(config, data);

        let entries = source.entries_for_stage(2);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].label, "X");
        assert_eq!(entries[0].time, 30.0);
        assert_eq!(entries[1].label, "mine");
        assert!(source.entries_for_stage(1).is_empty());
    }

    #[test]
    fn test_final_b_last_stage_uses_terminal_key() {
        let data = DataFile::from_json(
            r#"{
                "stageLabels": ["1", "2", "3", "4", "5", "6A", "6B"],
                "common": {"timestamps": {
                    "6": [{"time": {"reimu": {"a": 100, "b": 200}}, "label": "6A boss", "description": "d"}],
                    "7": [{"time": {"reimu": {"a": 300, "b": 400}}, "label": "6B boss", "description": "d"}]
                }},
                "reimu": {"label": "R", "videoIds": {"final_b": "vb"}, "timestamps": {}}
            }"#,
        )
        .unwrap();
        let request = PageRequest::staged("reimu", "final_b").unwrap();
        let config = build_page_config(&data, &request).unwrap();
        let source = PageSource::new(config, data);

        assert_eq!(source.stage_key(6), "7");
        let entries = source.entries_for_stage(6);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].label, "6B boss");
        assert_eq!(entries[0].time, 400.0);
    }

    #[test]
    fn test_single_page_merges_flat_common() {
        let data = DataFile::from_json(
            r#"{
                "common": {"timestamps": [
                    {"time": {"sakuya": 20}, "label": "shared", "description": "d"},
                    {"time": {"remilia": 5}, "label": "other", "description": "d"}
                ]},
                "sakuya": {"label": "S", "videoId": "v", "timestamps": [
                    {"time": 10, "label": "own", "description": "d"}
                ]}
            }"#,
        )
        .unwrap();
        let request = PageRequest::single("sakuya", "extra").unwrap();
        let config = build_page_config(&data, &request).unwrap();
        let source = PageSource::new(config, data);

        assert_eq!(source.stage_count(), 1);
        assert_eq!(labels(&source.entries_for_stage(1)), vec!["own", "shared"]);
    }

    #[test]
    fn test_null_override_in_common_drops_only_that_character() {
        let data = DataFile::from_json(
            r#"{
                "stageLabels": ["1"],
                "common": {"timestamps": {"1": [
                    {"time": {"charA": 30, "charB": null}, "label": "X", "description": "Y"},
                    {"time": "later", "label": "bad", "description": "Y"}
                ]}},
                "charA": {"label": "A", "timestamps": {}},
                "charB": {"label": "B", "timestamps": {}}
            }"#,
        )
        .unwrap();

        let request = PageRequest::staged("charA", "normal").unwrap();
        let config = build_page_config(&data, &request).unwrap();
        let entries = PageSource::new(config, data.clone()).entries_for_stage(1);
        assert_eq!(labels(&entries), vec!["X"]);
        assert_eq!(entries[0].time, 30.0);

        let request = PageRequest::staged("charB", "normal").unwrap();
        let config = build_page_config(&data, &request).unwrap();
        assert!(PageSource::new(config, data).entries_for_stage(1).is_empty());
    }
}
