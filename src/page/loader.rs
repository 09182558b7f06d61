use std::collections::BTreeMap;

use log::{debug, warn};

use crate::{
    config::site_config,
    data::{DataFile, RawEntry, TimestampTable},
    js_api::{self, SessionMessage},
    site::nav::{game_segment, relativize, SitePage},
};

use super::{
    query::{PageRequest, Route},
    PageConfig, PageError, PageLayout,
};

/// Labels and data keys of the navigable stages for a route.
///
/// Final A runs through the first six stages. Final B shares the first five
/// and then branches to the seventh entry of the label list, whose data lives
/// under key `"7"`.
pub fn stage_slice(route: Option<&Route>, all_labels: &[String]) -> (Vec<String>, Vec<String>) {
    let positions: Vec<usize> = match route {
        Some(Route::FinalA) => (0..6).collect(),
        Some(Route::FinalB) => (0..5).chain(std::iter::once(6)).collect(),
        _ => (0..all_labels.len()).collect(),
    };
    positions
        .into_iter()
        .filter_map(|pos| {
            all_labels
                .get(pos)
                .map(|label| (label.clone(), (pos + 1).to_string()))
        })
        .unzip()
}

pub fn decorate_title(request: &PageRequest, label: &str) -> String {
    let mut title = format!("{}{}", request.difficulty.tag(), label);
    if let Some(suffix) = request.route.as_ref().and_then(|route| route.title_suffix()) {
        title.push_str(suffix);
    }
    title
}

fn stage_entries(table: &TimestampTable) -> BTreeMap<String, Vec<RawEntry>> {
    match table {
        TimestampTable::ByStage(stages) => stages
            .iter()
            .map(|(key, block)| (key.clone(), block.entries().to_vec()))
            .collect(),
        TimestampTable::Flat(entries) => {
            let mut stages = BTreeMap::new();
            stages.insert("1".to_string(), entries.clone());
            stages
        }
    }
}

fn single_entries(table: &TimestampTable) -> Vec<RawEntry> {
    match table {
        TimestampTable::Flat(entries) => entries.clone(),
        TimestampTable::ByStage(_) => table.for_stage("1").to_vec(),
    }
}

/// Builds the page configuration for `request` out of a parsed data file.
pub fn build_page_config(data: &DataFile, request: &PageRequest) -> Result<PageConfig, PageError> {
    let record = match data.record(&request.key) {
        Some(Ok(record)) => record,
        Some(Err(err)) => {
            return Err(PageError::InvalidParameter(format!(
                "record {} is malformed: {}",
                request.key, err
            )))
        }
        None => {
            return Err(PageError::InvalidParameter(format!(
                "no record for {}",
                request.key
            )))
        }
    };

    let video_id = request
        .route
        .as_ref()
        .and_then(|route| record.video_ids.get(&route.to_string()).cloned())
        .or_else(|| record.video_id.clone());

    let layout = if request.difficulty.is_staged() {
        let (stage_labels, stage_keys) = stage_slice(request.route.as_ref(), &data.stage_labels);
        PageLayout::Staged {
            route: request.route.clone(),
            stage_labels,
            stage_keys,
            stages: stage_entries(&record.timestamps),
        }
    } else {
        PageLayout::Single {
            timestamps: single_entries(&record.timestamps),
        }
    };

    Ok(PageConfig {
        title: decorate_title(request, &record.label),
        original_title: record.label,
        description: record.description.unwrap_or_default(),
        video_id,
        character_key: request.key.clone(),
        layout,
    })
}

/// Fetches and parses a page data file. Single attempt.
pub async fn fetch_data_file(data_url: &str) -> Result<DataFile, PageError> {
    let text = js_api::fetch_text(data_url).await?;
    let data = DataFile::from_json(&text)?;
    debug!("Loaded {} records from {}", data.records.len(), data_url);
    Ok(data)
}

pub async fn load(data_url: &str, request: &PageRequest) -> Result<(PageConfig, DataFile), PageError> {
    let data = fetch_data_file(data_url).await?;
    let config = build_page_config(&data, request)?;
    Ok((config, data))
}

/// Where an invalid request is sent: the index page of the game the current
/// page belongs to, or the blog index when the path names no game.
pub fn fallback_url(pathname: &str, base_path: &str) -> String {
    match game_segment(pathname) {
        Some(game) => format!("../{}/index.html", game),
        None => relativize(pathname, &SitePage::Blog.absolute_path(base_path)),
    }
}

/// Stores the localized error message for the page the user is sent to and
/// returns that page's href.
pub fn queue_fallback(reason: &PageError) -> String {
    let config = site_config();
    let pathname = js_api::location_pathname().unwrap_or_default();
    let target = fallback_url(&pathname, &config.base_path);
    warn!("{}; redirecting to {}", reason, target);

    let message = SessionMessage::new(&config.error_storage_key);
    if let Err(err) = message.store(&config.invalid_parameter_message) {
        warn!("Could not store error message: {}", err);
    }
    target
}

/// Queues the localized error message and leaves the page.
pub fn redirect_to_fallback(reason: &PageError) {
    let target = queue_fallback(reason);
    if let Err(err) = js_api::navigate_to(&target) {
        warn!("Redirect failed: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::query::Difficulty;

    fn stage_names(count: usize) -> Vec<String> {
        (1..=count).map(|i| format!("Stage {}", i)).collect()
    }

    const DATA: &str = r#"{
        "stageLabels": ["1", "2", "3", "4", "5", "6A", "6B"],
        "reimu": {
            "label": "霊夢",
            "description": "博麗の巫女",
            "videoIds": {"final_a": "vidA", "final_b": "vidB"},
            "timestamps": {"1": [{"time": 5, "label": "l", "description": "d"}], "7": []}
        },
        "sakuya": {
            "label": "咲夜",
            "videoId": "vidX",
            "timestamps": [{"time": 5, "label": "l", "description": "d"}]
        }
    }"#;

    #[test]
    fn test_final_a_slice() {
        let (labels, keys) = stage_slice(Some(&Route::FinalA), &stage_names(7));
        assert_eq!(labels.len(), 6);
        assert_eq!(labels[5], "Stage 6");
        assert_eq!(keys, vec!["1", "2", "3", "4", "5", "6"]);
    }

    #[test]
    fn test_final_b_slice() {
        let all = stage_names(7);
        let (labels, keys) = stage_slice(Some(&Route::FinalB), &all);
        assert_eq!(labels[..5], all[..5]);
        assert_eq!(labels[5], all[6]);
        assert_eq!(labels.len(), 6);
        assert_eq!(keys.last().map(String::as_str), Some("7"));
    }

    #[test]
    fn test_default_slice_keeps_all() {
        let (labels, keys) = stage_slice(None, &stage_names(4));
        assert_eq!(labels.len(), 4);
        assert_eq!(keys, vec!["1", "2", "3", "4"]);
        let (labels, _) = stage_slice(Some(&Route::Branch('a', "1".to_string())), &stage_names(3));
        assert_eq!(labels.len(), 3);
    }

    #[test]
    fn test_short_label_list() {
        let (labels, keys) = stage_slice(Some(&Route::FinalB), &stage_names(5));
        assert_eq!(labels.len(), 5);
        assert_eq!(keys.len(), 5);
    }

    #[test]
    fn test_build_final_b_page() {
        let data = DataFile::from_json(DATA).unwrap();
        let request = PageRequest::staged("reimu", "final_b").unwrap();
        let config = build_page_config(&data, &request).unwrap();
        assert_eq!(config.title, "【Normal】霊夢（FinalB）");
        assert_eq!(config.original_title, "霊夢");
        assert_eq!(config.description, "博麗の巫女");
        assert_eq!(config.video_id.as_deref(), Some("vidB"));
        assert_eq!(config.stage_count(), 6);
        assert_eq!(config.stage_labels()[5], "6B");
        assert_eq!(config.route(), Some(&Route::FinalB));
    }

    #[test]
    fn test_build_extra_page() {
        let data = DataFile::from_json(DATA).unwrap();
        let request = PageRequest::single("sakuya", "phantasm").unwrap();
        let config = build_page_config(&data, &request).unwrap();
        assert_eq!(config.title, "【Phantasm】咲夜");
        assert_eq!(config.video_id.as_deref(), Some("vidX"));
        assert!(!config.is_staged());
        match &config.layout {
            PageLayout::Single { timestamps } => assert_eq!(timestamps.len(), 1),
            _ => panic!("expected single layout"),
        }
    }

    #[test]
    fn test_unknown_key_is_invalid_parameter() {
        let data = DataFile::from_json(DATA).unwrap();
        let request = PageRequest {
            key: "youmu".to_string(),
            difficulty: Difficulty::Normal,
            route: None,
        };
        let err = build_page_config(&data, &request).unwrap_err();
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn test_fallback_url() {
        assert_eq!(
            fallback_url("/blog/th8/explanation.html", "/"),
            "../th8/index.html"
        );
        assert_eq!(fallback_url("/blog/explanation.html", "/"), "index.html");
        assert_eq!(fallback_url("/explanation.html", "/"), "blog/index.html");
    }

    #[test]
    fn test_malformed_individual_time_drops_the_entry() {
        let data = DataFile::from_json(
            r#"{
                "charA": {"label": "A", "timestamps": [
                    {"time": {"charA": null}, "label": "gone", "description": "d"},
                    {"time": [1, 2], "label": "bad shape", "description": "d"},
                    {"time": 12, "label": 7, "description": "d"},
                    {"time": 20, "label": "kept", "description": "d"}
                ]}
            }"#,
        )
        .unwrap();
        let request = PageRequest::single("charA", "extra").unwrap();
        let config = build_page_config(&data, &request).unwrap();
        let timestamps = match &config.layout {
            PageLayout::Single { timestamps } => timestamps,
            _ => panic!("expected single layout"),
        };
        assert_eq!(timestamps.len(), 4);
        assert!(timestamps[1].time.is_none());
        assert!(timestamps[2].label.is_none());

        let entries = crate::page::timestamps::merge_entries(&[], timestamps, "charA", None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].label, "kept");
    }
}
