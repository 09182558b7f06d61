use std::fmt;

use log::debug;
use serde::Deserialize;
use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlAnchorElement};

use crate::{
    js_api::{self, fetch_text},
    page::PageError,
};

const TBODY_SELECTOR: &str = ".achievements-table tbody";
const JOINED_CLASS: &str = "no-border-bottom";

/// A year, month or day as written in the data file, number or string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DatePart {
    Number(i64),
    Text(String),
}

impl fmt::Display for DatePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatePart::Number(value) => write!(f, "{}", value),
            DatePart::Text(value) => write!(f, "{}", value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Achievement {
    pub year: DatePart,
    pub month: DatePart,
    pub day: DatePart,
    pub content: String,
    pub url: String,
}

impl Achievement {
    fn same_date(&self, other: &Achievement) -> bool {
        self.year == other.year && self.month == other.month && self.day == other.day
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub text: String,
    pub joined_below: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AchievementRow {
    pub year: Cell,
    pub date: Cell,
    pub link_text: String,
    pub href: String,
}

pub fn build_rows(achievements: &[Achievement]) -> Vec<AchievementRow> {
    achievements
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let previous = index.checked_sub(1).map(|i| &achievements[i]);
            let next = achievements.get(index + 1);

            let year = Cell {
                text: match previous {
                    Some(prev) if prev.year == item.year => String::new(),
                    _ => format!("{}年", item.year),
                },
                joined_below: next.map_or(false, |next| next.year == item.year),
            };
            let date = Cell {
                text: match previous {
                    Some(prev) if prev.same_date(item) => String::new(),
                    _ => format!("{}月{}日", item.month, item.day),
                },
                joined_below: next.map_or(false, |next| next.same_date(item)),
            };

            AchievementRow {
                year,
                date,
                link_text: format!("{} >", item.content),
                href: item.url.clone(),
            }
        })
        .collect()
}

fn create_cell(document: &Document, cell: &Cell) -> Result<web_sys::Element, PageError> {
    let td = document.create_element("td")?;
    td.set_text_content(Some(&cell.text));
    if cell.joined_below {
        td.class_list().add_1(JOINED_CLASS)?;
    }
    Ok(td)
}

/// Replaces the rows of `.achievements-table tbody`, if the page has one.
pub fn fill_table(rows: &[AchievementRow]) -> Result<(), PageError> {
    let document = js_api::document().ok_or(PageError::MissingElement("document"))?;
    let tbody = match document.query_selector(TBODY_SELECTOR)? {
        Some(tbody) => tbody,
        None => {
            debug!("No {} on this page", TBODY_SELECTOR);
            return Ok(());
        }
    };
    tbody.set_inner_html("");

    for row in rows {
        let tr = document.create_element("tr")?;
        let year = create_cell(&document, &row.year)?;
        tr.append_child(&year)?;
        let date = create_cell(&document, &row.date)?;
        tr.append_child(&date)?;

        let content = document.create_element("td")?;
        let link = document
            .create_element("a")?
            .dyn_into::<HtmlAnchorElement>()
            .map_err(|_| PageError::MissingElement("a"))?;
        link.set_href(&row.href);
        link.set_text_content(Some(&row.link_text));
        content.append_child(&link)?;
        tr.append_child(&content)?;

        tbody.append_child(&tr)?;
    }
    Ok(())
}

async fn load_achievements(url: &str) -> Result<(), PageError> {
    let text = fetch_text(url).await?;
    let achievements: Vec<Achievement> = serde_json::from_str(&text)?;
    fill_table(&build_rows(&achievements))
}

pub async fn render_achievements_table(url: &str) {
    if let Err(err) = load_achievements(url).await {
        debug!("Achievements table not rendered: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Vec<Achievement> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_repeated_values_are_blank() {
        let achievements = parse(
            r#"[
                {"year": 2024, "month": 3, "day": 1, "content": "A", "url": "a.html"},
                {"year": 2024, "month": 3, "day": 1, "content": "B", "url": "b.html"},
                {"year": 2024, "month": 5, "day": 2, "content": "C", "url": "c.html"},
                {"year": 2025, "month": 5, "day": 2, "content": "D", "url": "d.html"}
            ]"#,
        );
        let rows = build_rows(&achievements);

        assert_eq!(rows[0].year.text, "2024年");
        assert!(rows[0].year.joined_below);
        assert_eq!(rows[0].date.text, "3月1日");
        assert!(rows[0].date.joined_below);

        assert_eq!(rows[1].year.text, "");
        assert_eq!(rows[1].date.text, "");
        assert!(!rows[1].date.joined_below);

        assert_eq!(rows[2].date.text, "5月2日");
        assert!(!rows[2].year.joined_below);
        // Same month and day in a different year is a new date.
        assert!(!rows[2].date.joined_below);
        assert_eq!(rows[3].year.text, "2025年");
        assert_eq!(rows[3].date.text, "5月2日");
    }

    #[test]
    fn test_link_text_and_string_parts() {
        let rows = build_rows(&parse(
            r#"[{"year": "2023", "month": "12", "day": "24", "content": "大会", "url": "x"}]"#,
        ));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].link_text, "大会 >");
        assert_eq!(rows[0].href, "x");
        assert_eq!(rows[0].date.text, "12月24日");
        assert!(!rows[0].year.joined_below);
    }

    #[test]
    fn test_empty_list() {
        assert!(build_rows(&[]).is_empty());
    }
}
