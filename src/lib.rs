#[macro_use]
pub mod utils;

pub mod config;
pub mod data;
pub mod js_api;
pub mod page;
pub mod rendering;
pub mod site;

use async_std::task::spawn_local;
use log::{debug, error, info};
use utils::{init_logging, set_panic_hook};
use wasm_bindgen::prelude::*;

use page::{
    loader::{self, redirect_to_fallback},
    query::{parse_page_query, PageRequest},
    timestamps::PageSource,
    PageError,
};

#[wasm_bindgen(start)]
pub fn main() {
    set_panic_hook();
    init_logging();
}

/// Overrides site settings from a plain JS object, e.g.
/// `{ basePath: "/guide/", footerOwner: "..." }`.
#[wasm_bindgen]
pub fn set_site_options(params: js_sys::Object) {
    let options = js_api::object_to_params(&params);
    config::update_site_config(&options);
}

async fn run_page(data_url: String, request: PageRequest) {
    let result = async {
        let (config, data) = loader::load(&data_url, &request).await?;
        info!("Showing {} from {}", config.title, data_url);
        rendering::mount_page(Box::new(PageSource::new(config, data)))
    }
    .await;

    match result {
        Ok(()) => {}
        Err(err) if err.is_invalid_parameter() => redirect_to_fallback(&err),
        Err(err) => error!("データ読み込みエラー: {}", err),
    }
}

fn start_page(data_url: String, request: Result<PageRequest, PageError>) {
    match request {
        Ok(request) => {
            spawn_local(run_page(data_url, request));
        }
        Err(err) => redirect_to_fallback(&err),
    }
}

/// Loads the page selected by the `character`, `difficulty` and `route`
/// query parameters of the current URL.
#[wasm_bindgen]
pub fn load_explanation_page(data_url: String) {
    let search = js_api::location_search().unwrap_or_default();
    start_page(data_url, parse_page_query(&search));
}

/// Staged page for `key`. `route_or_difficulty` is a route (`final_a`,
/// `b2`, ...), `normal`, `lunatic` or empty.
#[wasm_bindgen]
pub fn load_normal_page(data_url: String, key: String, route_or_difficulty: String) {
    start_page(data_url, PageRequest::staged(&key, &route_or_difficulty));
}

#[wasm_bindgen]
pub fn load_extra_page(data_url: String, key: String, difficulty: String) {
    start_page(data_url, PageRequest::single(&key, &difficulty));
}

#[wasm_bindgen]
pub fn select_stage(stage: i32) {
    let selected = rendering::with_active_page(|page| {
        page.update_current_stage(i64::from(stage));
        page.current_stage()
    });
    match selected {
        Some(current) => debug!("Stage {} selected", current),
        None => console_warn!("No page loaded; ignoring stage {}", stage),
    }
}

#[wasm_bindgen]
pub fn init_site_chrome() {
    spawn_local(site::chrome::init_site_chrome());
}

#[wasm_bindgen]
pub async fn render_achievements_table(data_url: String) {
    site::achievements::render_achievements_table(&data_url).await;
}
