use url::Url;

use super::{timestamps::TimestampEntry, PageError};

pub const DEFAULT_PANEL_ID: &str = "content-default";

#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    /// Shown instead of links when a stage has no timestamps.
    Placeholder(String),
    Link {
        label: String,
        time: f64,
        panel_id: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub id: String,
    pub heading: String,
    pub body: String,
}

/// The list rows and content panels of one render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct StageView {
    pub stage: usize,
    pub rows: Vec<Row>,
    pub panels: Vec<Panel>,
}

impl StageView {
    pub fn link_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| matches!(row, Row::Link { .. }))
            .count()
    }

    pub fn panel_ids(&self) -> Vec<String> {
        self.panels.iter().map(|panel| panel.id.clone()).collect()
    }
}

pub fn panel_id(staged: bool, stage: usize, index: usize) -> String {
    if staged {
        format!("content-{}-{}", stage, index)
    } else {
        format!("content-{}", index)
    }
}

pub fn build_stage_view(
    staged: bool,
    stage: usize,
    entries: &[TimestampEntry],
    placeholder: &str,
) -> StageView {
    if entries.is_empty() {
        return StageView {
            stage,
            rows: vec![Row::Placeholder(placeholder.to_string())],
            panels: Vec::new(),
        };
    }

    let (rows, panels) = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let id = panel_id(staged, stage, index);
            let row = Row::Link {
                label: entry.label.clone(),
                time: entry.time,
                panel_id: id.clone(),
            };
            let panel = Panel {
                id,
                heading: entry.label.clone(),
                body: entry.content.clone(),
            };
            (row, panel)
        })
        .unzip();

    StageView {
        stage,
        rows,
        panels,
    }
}

/// Ids of the content panels currently in the document, not counting the
/// default panel.
#[derive(Debug, Default)]
pub struct ContentPanels {
    live: Vec<String>,
}

impl ContentPanels {
    /// Records the panels of a new render pass and returns the ids of the
    /// previous pass, which must be removed.
    pub fn replace(&mut self, ids: Vec<String>) -> Vec<String> {
        std::mem::replace(&mut self.live, ids)
            .into_iter()
            .filter(|id| id != DEFAULT_PANEL_ID)
            .collect()
    }

    pub fn live(&self) -> &[String] {
        &self.live
    }
}

/// Embed URL for `video_id`. Without a start offset the video plays from the
/// beginning.
pub fn embed_url(base: &str, video_id: &str, start: Option<f64>) -> Result<String, PageError> {
    let mut url = Url::parse(base).map_err(|err| PageError::Parse(err.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| PageError::Parse(format!("{} cannot be a base", base)))?
        .pop_if_empty()
        .push(video_id);
    {
        let mut query = url.query_pairs_mut();
        if let Some(seconds) = start {
            query.append_pair("start", &(seconds.max(0.0).floor() as u64).to_string());
        }
        query.append_pair("autoplay", "1");
    }
    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::timestamps::EntrySource;

    const BASE: &str = "https://www.youtube.com/embed/";

    fn entry(time: f64, label: &str) -> TimestampEntry {
        TimestampEntry {
            time,
            label: label.to_string(),
            content: format!("about {}", label),
            source: EntrySource::Individual,
        }
    }

    #[test]
    fn test_empty_stage_has_placeholder_only() {
        let view = build_stage_view(true, 3, &[], "（タイムスタンプなし）");
        assert_eq!(view.rows, vec![Row::Placeholder("（タイムスタンプなし）".to_string())]);
        assert!(view.panels.is_empty());
        assert_eq!(view.link_count(), 0);
    }

    #[test]
    fn test_rows_match_panels() {
        let view = build_stage_view(true, 2, &[entry(5.0, "a"), entry(9.0, "b")], "-");
        assert_eq!(view.link_count(), 2);
        assert_eq!(view.panel_ids(), vec!["content-2-0", "content-2-1"]);
        match &view.rows[1] {
            Row::Link { label, time, panel_id } => {
                assert_eq!(label, "b");
                assert_eq!(*time, 9.0);
                assert_eq!(panel_id, "content-2-1");
            }
            row => panic!("unexpected row {:?}", row),
        }
        assert_eq!(view.panels[0].body, "about a");
    }

    #[test]
    fn test_panel_ids_differ_between_stages() {
        assert_ne!(panel_id(true, 1, 0), panel_id(true, 2, 0));
        assert_eq!(panel_id(false, 1, 4), "content-4");
    }

    #[test]
    fn test_stage_switch_removes_old_panels() {
        let mut panels = ContentPanels::default();
        let first = build_stage_view(true, 1, &[entry(1.0, "a"), entry(2.0, "b")], "-");
        assert!(panels.replace(first.panel_ids()).is_empty());

        let second = build_stage_view(true, 2, &[entry(3.0, "c")], "-");
        let removed = panels.replace(second.panel_ids());
        assert_eq!(removed, vec!["content-1-0", "content-1-1"]);
        assert_eq!(panels.live(), &["content-2-0".to_string()][..]);

        let empty = build_stage_view(true, 3, &[], "-");
        assert_eq!(panels.replace(empty.panel_ids()), vec!["content-2-0"]);
        assert!(panels.live().is_empty());
    }

    #[test]
    fn test_embed_url() {
        assert_eq!(
            embed_url(BASE, "abc123", None).unwrap(),
            "https://www.youtube.com/embed/abc123?autoplay=1"
        );
        assert_eq!(
            embed_url(BASE, "abc123", Some(95.7)).unwrap(),
            "https://www.youtube.com/embed/abc123?start=95&autoplay=1"
        );
        assert_eq!(
            embed_url("https://example.com/embed", "x", Some(0.0)).unwrap(),
            "https://example.com/embed/x?start=0&autoplay=1"
        );
    }

    #[test]
    fn test_embed_url_rejects_bad_base() {
        assert!(embed_url("not a url", "x", None).is_err());
    }
}
