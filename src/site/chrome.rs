use chrono::{Datelike, Local};
use futures::future::join_all;
use itertools::Itertools;
use log::{debug, error, warn};
use web_sys::{Document, Element, HtmlElement, Node};

use crate::{
    config::{site_config, SiteConfig},
    js_api::{self, SessionMessage},
    page::PageError,
};

use super::nav::{page_context, Crumb, PageContext, SitePage};

const BREADCRUMB_STYLE: &str = "margin-bottom: 20px; font-size: 14px; color: #999;";
const BREADCRUMB_LINK_STYLE: &str = "color: #d97037; text-decoration: none;";
const BREADCRUMB_RETRY_MS: i32 = 50;
const BREADCRUMB_MAX_RETRIES: u32 = 100;
const TITLE_SEPARATOR: &str = " - ";

pub fn footer_text(year: i32, owner: &str) -> String {
    format!("\u{a9} {} {}", year, owner)
}

pub fn favicon_href(emoji: &str) -> String {
    format!(
        "data:image/svg+xml,<svg xmlns='http://www.w3.org/2000/svg' viewBox='0 0 100 100'>\
         <text y='75' font-size='75' text-anchor='middle' x='50'>{}</text></svg>",
        emoji
    )
}

/// `"<page> - <site>"`, unless the page title already carries a site suffix.
pub fn decorated_title(current: &str, home_title: &str) -> Option<String> {
    if current.contains(TITLE_SEPARATOR) {
        None
    } else {
        Some(format!("{}{}{}", current, TITLE_SEPARATOR, home_title))
    }
}

/// Labels of the breadcrumb trail as displayed, for logging.
pub fn breadcrumb_text(crumbs: &[Crumb]) -> String {
    crumbs.iter().map(|crumb| crumb.label.as_str()).join(" > ")
}

fn document() -> Result<Document, PageError> {
    js_api::document().ok_or(PageError::MissingElement("document"))
}

fn body(document: &Document) -> Result<HtmlElement, PageError> {
    document.body().ok_or(PageError::MissingElement("body"))
}

fn prepend(parent: &Node, child: &Node) -> Result<(), PageError> {
    parent.insert_before(child, parent.first_child().as_ref())?;
    Ok(())
}

/// Adds the charset and viewport meta tags, stylesheet and favicon a page
/// does not declare itself.
pub fn initialize_head(context: &PageContext, config: &SiteConfig) -> Result<(), PageError> {
    let document = document()?;
    let head = document.head().ok_or(PageError::MissingElement("head"))?;

    if document.query_selector("meta[charset]")?.is_none() {
        let meta = document.create_element("meta")?;
        meta.set_attribute("charset", "UTF-8")?;
        prepend(&head, &meta)?;
    }

    if document.query_selector("meta[name=\"viewport\"]")?.is_none() {
        let meta = document.create_element("meta")?;
        meta.set_attribute("name", "viewport")?;
        meta.set_attribute("content", "width=device-width, initial-scale=1.0")?;
        let before = head.query_selector("title")?.map(Node::from).or_else(|| head.first_child());
        head.insert_before(&meta, before.as_ref())?;
    }

    if document.query_selector("link[rel=\"stylesheet\"]")?.is_none() {
        let link = document.create_element("link")?;
        link.set_attribute("rel", "stylesheet")?;
        link.set_attribute("href", &context.stylesheet)?;
        head.append_child(&link)?;
    }

    let icon = document.create_element("link")?;
    icon.set_attribute("rel", "icon")?;
    icon.set_attribute("href", &favicon_href(&config.favicon_emoji))?;
    head.append_child(&icon)?;
    Ok(())
}

fn build_header(document: &Document, links: &[(String, String)]) -> Result<Element, PageError> {
    let header = document.create_element("header")?;
    let nav = document.create_element("nav")?;
    let list = document.create_element("ul")?;
    for (href, label) in links {
        let item = document.create_element("li")?;
        let link = document.create_element("a")?;
        link.set_attribute("href", href)?;
        link.set_text_content(Some(label));
        item.append_child(&link)?;
        list.append_child(&item)?;
    }
    nav.append_child(&list)?;
    header.append_child(&nav)?;
    Ok(header)
}

fn build_breadcrumb(document: &Document, crumbs: &[Crumb]) -> Result<Element, PageError> {
    let container = document.create_element("div")?;
    container.set_attribute("style", BREADCRUMB_STYLE)?;
    for (index, crumb) in crumbs.iter().enumerate() {
        if index > 0 {
            container.append_child(&document.create_text_node(" > "))?;
        }
        let item = match &crumb.href {
            Some(href) => {
                let link = document.create_element("a")?;
                link.set_attribute("href", href)?;
                link.set_attribute("style", BREADCRUMB_LINK_STYLE)?;
                link
            }
            None => document.create_element("span")?,
        };
        item.set_text_content(Some(&crumb.label));
        container.append_child(&item)?;
    }
    Ok(container)
}

/// Inserts the breadcrumb at the top of `.container`, waiting for the
/// container to appear when the page builds it late.
fn insert_breadcrumb(breadcrumb: Element, attempt: u32) {
    match js_api::query_selector(".container") {
        Some(container) => {
            if let Err(err) = prepend(&container, &breadcrumb) {
                warn!("Could not insert breadcrumb: {}", err);
            }
        }
        None if attempt < BREADCRUMB_MAX_RETRIES => {
            let retry = move || insert_breadcrumb(breadcrumb, attempt + 1);
            if let Err(err) = js_api::set_timeout(retry, BREADCRUMB_RETRY_MS) {
                warn!("Could not schedule breadcrumb insertion: {}", err);
            }
        }
        None => debug!("No .container for the breadcrumb"),
    }
}

async fn fetch_link_label(page: SitePage, href: String) -> (String, String) {
    let label = match js_api::fetch_page_title(&href).await {
        Ok(Some(title)) => title,
        Ok(None) => page.fallback_label().to_string(),
        Err(err) => {
            warn!("Could not read title of {}: {}", href, err);
            page.fallback_label().to_string()
        }
    };
    (href, label)
}

async fn load_header(context: &PageContext, config: &SiteConfig) -> Result<(), PageError> {
    let document = document()?;
    let body = body(&document)?;

    let links = join_all(
        context
            .links
            .iter()
            .map(|(page, href)| fetch_link_label(*page, href.clone())),
    )
    .await;

    let header = build_header(&document, &links)?;
    prepend(&body, &header)?;

    if let Some(crumbs) = &context.breadcrumb {
        debug!("Breadcrumb: {}", breadcrumb_text(crumbs));
        insert_breadcrumb(build_breadcrumb(&document, crumbs)?, 0);
    }

    if !context.is_home {
        let home_title = links
            .first()
            .map(|(_, label)| label.as_str())
            .unwrap_or_else(|| SitePage::Home.fallback_label());
        if let Some(title) = decorated_title(&document.title(), home_title) {
            document.set_title(&title);
        }
    }
    debug!("Header ready for {}", config.base_path);
    Ok(())
}

pub fn load_footer(config: &SiteConfig) -> Result<(), PageError> {
    let document = document()?;
    let footer = document.create_element("footer")?;
    let paragraph = document.create_element("p")?;
    paragraph.set_text_content(Some(&footer_text(Local::now().year(), &config.footer_owner)));
    footer.append_child(&paragraph)?;
    let body = body(&document)?;
    body.append_child(&footer)?;
    Ok(())
}

/// Shows the message a redirecting page left in session storage, once.
pub fn show_pending_error(config: &SiteConfig) -> Result<(), PageError> {
    let message = match SessionMessage::new(&config.error_storage_key).take()? {
        Some(message) => message,
        None => return Ok(()),
    };
    let document = document()?;
    let banner = document.create_element("div")?;
    banner.set_class_name("error-banner");
    banner.set_attribute("role", "alert")?;
    banner.set_text_content(Some(&message));
    let body = body(&document)?;
    prepend(&body, &banner)?;

    js_api::set_timeout(move || banner.remove(), config.banner_duration_ms)?;
    Ok(())
}

fn reveal_body() {
    if let Some(body) = js_api::document().and_then(|document| document.body()) {
        let _ = body.style().set_property("display", "block");
    }
}

/// Injects the shared head tags, header, breadcrumb and footer into the
/// current page.
pub async fn init_site_chrome() {
    let config = site_config();
    let pathname = js_api::location_pathname().unwrap_or_else(|| config.base_path.clone());
    let context = page_context(&pathname, &config.base_path);

    if let Err(err) = initialize_head(&context, &config) {
        warn!("Could not initialize head: {}", err);
    }
    if let Err(err) = load_footer(&config) {
        warn!("Could not insert footer: {}", err);
    }
    if let Err(err) = show_pending_error(&config) {
        warn!("Could not show pending error: {}", err);
    }
    if let Err(err) = load_header(&context, &config).await {
        error!("ヘッダー読み込みエラー: {}", err);
    }
    reveal_body();
}
