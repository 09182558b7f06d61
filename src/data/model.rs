use std::collections::{BTreeMap, HashMap};

use serde::{de::DeserializeOwned, Deserialize, Deserializer};

use super::time::Time;

/// Decodes a field that may hold anything; values of the wrong shape become
/// `None` instead of failing the surrounding structure.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| serde_json::from_value(value).ok()))
}

/// A timestamp as written in the data file. Every field is optional and
/// decoded leniently; entries lacking any of them are filtered out when a
/// stage is rendered.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEntry {
    #[serde(default, deserialize_with = "lenient")]
    pub time: Option<Time>,
    #[serde(default, deserialize_with = "lenient")]
    pub label: Option<String>,
    #[serde(default, alias = "content", deserialize_with = "lenient")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StageBlock {
    List(Vec<RawEntry>),
    Wrapped {
        #[serde(default)]
        timestamps: Vec<RawEntry>,
    },
}

impl StageBlock {
    pub fn entries(&self) -> &[RawEntry] {
        match self {
            StageBlock::List(entries) => entries,
            StageBlock::Wrapped { timestamps } => timestamps,
        }
    }
}

/// Either a single list (Extra / Phantasm pages) or one block per stage key
/// (Normal pages).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TimestampTable {
    Flat(Vec<RawEntry>),
    ByStage(BTreeMap<String, StageBlock>),
}

impl Default for TimestampTable {
    fn default() -> Self {
        TimestampTable::Flat(Vec::new())
    }
}

impl TimestampTable {
    pub fn for_stage(&self, stage_key: &str) -> &[RawEntry] {
        match self {
            TimestampTable::ByStage(stages) => {
                stages.get(stage_key).map_or(&[], |block| block.entries())
            }
            TimestampTable::Flat(_) => &[],
        }
    }

    pub fn flat(&self) -> &[RawEntry] {
        match self {
            TimestampTable::Flat(entries) => entries,
            TimestampTable::ByStage(_) => &[],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterRecord {
    #[serde(alias = "title")]
    pub label: String,
    #[serde(default, alias = "message")]
    pub description: Option<String>,
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub video_ids: HashMap<String, String>,
    #[serde(default)]
    pub timestamps: TimestampTable,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommonTimestamps {
    #[serde(default)]
    pub timestamps: TimestampTable,
}

/// Top level of a page data file: character records keyed by page key, plus
/// the optional shared `stageLabels` and `common` blocks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataFile {
    #[serde(default, rename = "stageLabels")]
    pub stage_labels: Vec<String>,
    #[serde(default)]
    pub common: CommonTimestamps,
    #[serde(flatten)]
    pub records: HashMap<String, serde_json::Value>,
}

impl DataFile {
    pub fn from_json(json: &str) -> Result<DataFile, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Records are decoded lazily so that one malformed entry does not
    /// prevent the other pages of the same file from loading.
    pub fn record(&self, key: &str) -> Option<Result<CharacterRecord, serde_json::Error>> {
        self.records
            .get(key)
            .map(|value| serde_json::from_value(value.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NORMAL_DATA: &str = r#"{
        "stageLabels": ["Stage 1", "Stage 2", "Stage 3"],
        "common": {
            "timestamps": {
                "2": [{"time": {"charA": 30, "charB": 45}, "label": "X", "description": "Y"}]
            }
        },
        "charA": {
            "label": "Reimu A",
            "videoId": "abc123",
            "timestamps": {
                "1": [{"time": 12, "label": "Opening", "description": "Start"}],
                "2": {"timestamps": [{"time": 50, "label": "Boss", "description": "Fight"}]}
            }
        }
    }"#;

    #[test]
    fn test_parse_normal_file() {
        let data = DataFile::from_json(NORMAL_DATA).unwrap();
        assert_eq!(data.stage_labels.len(), 3);
        assert_eq!(data.common.timestamps.for_stage("2").len(), 1);
        assert!(data.records.contains_key("charA"));
        assert!(!data.records.contains_key("common"));
        assert!(!data.records.contains_key("stageLabels"));

        let record = data.record("charA").unwrap().unwrap();
        assert_eq!(record.label, "Reimu A");
        assert_eq!(record.video_id.as_deref(), Some("abc123"));
        assert_eq!(record.timestamps.for_stage("1").len(), 1);
        assert_eq!(record.timestamps.for_stage("2")[0].label.as_deref(), Some("Boss"));
        assert!(record.timestamps.for_stage("3").is_empty());
    }

    #[test]
    fn test_parse_extra_file_with_aliases() {
        let data = DataFile::from_json(
            r#"{
                "common": {"timestamps": [{"time": {"sakuya": 5}, "label": "Intro", "description": "d"}]},
                "sakuya": {
                    "title": "Sakuya",
                    "message": "<b>hello</b>",
                    "videoId": "xyz",
                    "timestamps": [{"time": 10, "label": "Midboss"}]
                }
            }"#,
        )
        .unwrap();
        assert_eq!(data.common.timestamps.flat().len(), 1);
        let record = data.record("sakuya").unwrap().unwrap();
        assert_eq!(record.label, "Sakuya");
        assert_eq!(record.description.as_deref(), Some("<b>hello</b>"));
        assert_eq!(record.timestamps.flat().len(), 1);
        assert!(record.timestamps.flat()[0].description.is_none());
    }

    #[test]
    fn test_missing_record() {
        let data = DataFile::from_json(NORMAL_DATA).unwrap();
        assert!(data.record("charZ").is_none());
    }

    #[test]
    fn test_malformed_record() {
        let data = DataFile::from_json(r#"{"broken": {"videoId": "x"}}"#).unwrap();
        assert!(data.record("broken").unwrap().is_err());
    }
}
