use std::collections::HashMap;

use wasm_bindgen::{prelude::*, JsCast};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Document, DomParser, Element, HtmlElement, Storage, SupportedType, Window};

use crate::page::PageError;

pub fn window() -> Option<Window> {
    web_sys::window()
}

pub fn document() -> Option<Document> {
    window().and_then(|window| window.document())
}

pub fn query_selector(selector: &str) -> Option<Element> {
    document().and_then(|document| document.query_selector(selector).ok().flatten())
}

pub fn query_html_element(selector: &str) -> Option<HtmlElement> {
    query_selector(selector).and_then(|element| element.dyn_into::<HtmlElement>().ok())
}

pub fn element_by_id<T: JsCast>(id: &str) -> Option<T> {
    document()
        .and_then(|document| document.get_element_by_id(id))
        .and_then(|element| element.dyn_into::<T>().ok())
}

pub fn location_pathname() -> Option<String> {
    window().and_then(|window| window.location().pathname().ok())
}

pub fn location_search() -> Option<String> {
    window().and_then(|window| window.location().search().ok())
}

pub fn navigate_to(href: &str) -> Result<(), PageError> {
    let window = window().ok_or(PageError::MissingElement("window"))?;
    window.location().set_href(href)?;
    Ok(())
}

/// Reads the string-valued properties of a plain JS object.
pub fn object_to_params(params: &js_sys::Object) -> HashMap<String, String> {
    let mut result = HashMap::new();
    let keys = js_sys::Object::keys(params);
    for key in keys.iter() {
        let key_str = match key.as_string() {
            Some(key_str) => key_str,
            None => continue,
        };
        let value = js_sys::Reflect::get(params, &key).unwrap_or(JsValue::UNDEFINED);
        let value = value
            .as_string()
            .or_else(|| value.as_f64().map(|number| number.to_string()));
        if let Some(value) = value {
            result.insert(key_str, value);
        }
    }
    result
}

async fn fetch_response(url: &str) -> Result<web_sys::Response, PageError> {
    let window = window().ok_or(PageError::MissingElement("window"))?;
    let response = JsFuture::from(window.fetch_with_str(url)).await?;
    let response = response.dyn_into::<web_sys::Response>()?;
    if !response.ok() {
        return Err(PageError::Fetch(format!(
            "{} responded {}",
            url,
            response.status()
        )));
    }
    Ok(response)
}

pub async fn fetch_text(url: &str) -> Result<String, PageError> {
    let response = fetch_response(url).await?;
    let text = JsFuture::from(response.text()?).await?;
    text.as_string()
        .ok_or_else(|| PageError::Parse(format!("{} returned no text", url)))
}

/// Text of the `<title>` element of an HTML document.
pub fn parse_title(html: &str) -> Result<Option<String>, PageError> {
    let parser = DomParser::new()?;
    let document = parser.parse_from_string(html, SupportedType::TextHtml)?;
    let title = document
        .query_selector("title")?
        .and_then(|title| title.text_content())
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty());
    Ok(title)
}

pub async fn fetch_page_title(url: &str) -> Result<Option<String>, PageError> {
    let html = fetch_text(url).await?;
    parse_title(&html)
}

/// One string value kept in session storage between a redirect and the page
/// it lands on.
pub struct SessionMessage {
    key: String,
}

impl SessionMessage {
    pub fn new(key: &str) -> SessionMessage {
        SessionMessage {
            key: key.to_string(),
        }
    }

    fn storage() -> Result<Storage, PageError> {
        window()
            .ok_or(PageError::MissingElement("window"))?
            .session_storage()?
            .ok_or(PageError::MissingElement("sessionStorage"))
    }

    pub fn store(&self, message: &str) -> Result<(), PageError> {
        Self::storage()?.set_item(&self.key, message)?;
        Ok(())
    }

    /// Reads the message and clears it so it is shown only once.
    pub fn take(&self) -> Result<Option<String>, PageError> {
        let storage = Self::storage()?;
        let message = storage.get_item(&self.key)?;
        if message.is_some() {
            storage.remove_item(&self.key)?;
        }
        Ok(message.filter(|message| !message.is_empty()))
    }
}

pub fn set_timeout(callback: impl FnOnce() + 'static, delay_ms: i32) -> Result<i32, PageError> {
    let window = window().ok_or(PageError::MissingElement("window"))?;
    let callback = Closure::once_into_js(callback);
    let handle = window.set_timeout_with_callback_and_timeout_and_arguments_0(
        callback.unchecked_ref(),
        delay_ms,
    )?;
    Ok(handle)
}
