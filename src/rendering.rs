use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use log::{debug, warn};
use wasm_bindgen::{prelude::*, JsCast};
use web_sys::{
    Document, Element, Event, EventTarget, HtmlAnchorElement, HtmlElement, HtmlIFrameElement,
    HtmlOptionElement, HtmlSelectElement, KeyboardEvent,
};

use crate::{
    config::{site_config, SiteConfig},
    js_api::{self, element_by_id, query_html_element, query_selector},
    page::{
        stage::{StageNavigator, INITIAL_STAGE},
        timestamps::StageSource,
        view::{build_stage_view, embed_url, ContentPanels, Row, StageView, DEFAULT_PANEL_ID},
        PageError,
    },
};

const HIDDEN_CLASS: &str = "hidden";
const STAMP_CONTENT_CLASS: &str = "stamp-content";

/// An event listener registration. Dropping it detaches the listener.
pub struct Listener {
    target: EventTarget,
    event: &'static str,
    closure: Closure<dyn FnMut(Event)>,
}

impl Listener {
    pub fn attach(
        target: &EventTarget,
        event: &'static str,
        handler: impl FnMut(Event) + 'static,
    ) -> Result<Listener, PageError> {
        let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
        target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
        Ok(Listener {
            target: target.clone(),
            event,
            closure,
        })
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.event, self.closure.as_ref().unchecked_ref());
    }
}

/// Elements of an explanation page. Any of them may be absent, in which case
/// the parts of the page that use it are skipped.
struct PageElements {
    document: Document,
    video_frame: Option<HtmlIFrameElement>,
    list: Option<Element>,
    content_panel: Option<Element>,
    default_panel: Option<Element>,
    dropdown: Option<HtmlSelectElement>,
    prev_button: Option<Element>,
    next_button: Option<Element>,
    video_panel: Option<Element>,
    timestamps_panel: Option<HtmlElement>,
}

impl PageElements {
    fn query(document: Document) -> PageElements {
        PageElements {
            video_frame: element_by_id("videoFrame"),
            list: query_selector("#timestamps-list ul"),
            content_panel: element_by_id("content-panel"),
            default_panel: element_by_id(DEFAULT_PANEL_ID),
            dropdown: element_by_id("stage-dropdown"),
            prev_button: element_by_id("prev-stage"),
            next_button: element_by_id("next-stage"),
            video_panel: query_selector(".video-panel"),
            timestamps_panel: query_html_element(".timestamps-panel"),
            document,
        }
    }

    fn stamp_contents(&self) -> Vec<Element> {
        let mut result = Vec::new();
        let panel = match &self.content_panel {
            Some(panel) => panel,
            None => return result,
        };
        if let Ok(nodes) = panel.query_selector_all(&format!(".{}", STAMP_CONTENT_CLASS)) {
            for i in 0..nodes.length() {
                if let Some(element) = nodes.get(i).and_then(|n| n.dyn_into::<Element>().ok()) {
                    result.push(element);
                }
            }
        }
        result
    }
}

struct ControllerState {
    navigator: StageNavigator,
    view: Option<StageView>,
    panels: ContentPanels,
    row_listeners: Vec<Listener>,
    control_listeners: Vec<Listener>,
    layout_listeners: Vec<Listener>,
}

/// Drives the timestamp list, content panels and embedded video of one page.
///
/// Event handlers hold weak references, so dropping the controller releases
/// every listener it registered.
pub struct TimestampController {
    source: Box<dyn StageSource>,
    elements: PageElements,
    config: SiteConfig,
    video_id: Option<String>,
    state: RefCell<ControllerState>,
}

thread_local! {
    static ACTIVE_PAGE: RefCell<Option<Rc<TimestampController>>> = RefCell::new(None);
}

/// Builds a controller for `source` and makes it the page's active one,
/// releasing the previous controller.
pub fn mount_page(source: Box<dyn StageSource>) -> Result<(), PageError> {
    let document = js_api::document().ok_or(PageError::MissingElement("document"))?;
    let previous = ACTIVE_PAGE.with(|slot| slot.borrow_mut().take());
    drop(previous);

    let controller = Rc::new(TimestampController::new(
        source,
        PageElements::query(document),
        site_config(),
    ));
    controller.initialize()?;
    ACTIVE_PAGE.with(|slot| *slot.borrow_mut() = Some(controller));
    Ok(())
}

pub fn with_active_page<R>(f: impl FnOnce(&Rc<TimestampController>) -> R) -> Option<R> {
    let controller = ACTIVE_PAGE.with(|slot| slot.borrow().clone());
    controller.as_ref().map(f)
}

impl TimestampController {
    fn new(
        source: Box<dyn StageSource>,
        elements: PageElements,
        config: SiteConfig,
    ) -> TimestampController {
        let video_id = source.video_id().map(str::to_string).or_else(|| {
            elements
                .video_frame
                .as_ref()
                .and_then(|frame| frame.get_attribute("data-video-id"))
        });
        let navigator = StageNavigator::new(source.stage_count());
        TimestampController {
            source,
            elements,
            config,
            video_id,
            state: RefCell::new(ControllerState {
                navigator,
                view: None,
                panels: ContentPanels::default(),
                row_listeners: Vec::new(),
                control_listeners: Vec::new(),
                layout_listeners: Vec::new(),
            }),
        }
    }

    pub fn current_stage(&self) -> usize {
        self.state.borrow().navigator.current()
    }

    fn initialize(self: &Rc<Self>) -> Result<(), PageError> {
        self.fill_headings();
        if self.source.is_staged() {
            self.build_stage_controls()?;
        }
        self.render_stage(INITIAL_STAGE)?;
        self.set_video(None);
        self.show_default_content();
        self.attach_layout_sync()?;
        Ok(())
    }

    fn fill_headings(&self) {
        let title = self.source.title();
        if let Some(h1) = query_selector("h1") {
            h1.set_text_content(Some(title));
        }
        if let Some(h3) = query_selector(&format!("#{} h3", DEFAULT_PANEL_ID)) {
            let original = self.source.original_title();
            h3.set_text_content(Some(if original.is_empty() { title } else { original }));
        }
        if let Some(message) = query_selector(&format!("#{} #character-message", DEFAULT_PANEL_ID))
        {
            // Multi-stage pages carry markup in their descriptions.
            if self.source.is_staged() {
                message.set_inner_html(self.source.description());
            } else {
                message.set_text_content(Some(self.source.description()));
            }
        }
        if let Some(message) = query_selector(&format!("#{} #instruction-message", DEFAULT_PANEL_ID))
        {
            message.set_text_content(Some(&self.config.instruction_message));
        }
    }

    fn build_stage_controls(self: &Rc<Self>) -> Result<(), PageError> {
        let mut listeners = Vec::new();

        if let Some(dropdown) = &self.elements.dropdown {
            dropdown.set_inner_html("");
            for (index, label) in self.source.stage_labels().iter().enumerate() {
                let option = self
                    .elements
                    .document
                    .create_element("option")?
                    .dyn_into::<HtmlOptionElement>()
                    .map_err(|_| PageError::MissingElement("option"))?;
                option.set_value(&(index + 1).to_string());
                option.set_text_content(Some(label));
                dropdown.append_child(&option)?;
            }
            let weak = Rc::downgrade(self);
            listeners.push(Listener::attach(dropdown, "change", move |_| {
                with_controller(&weak, |page| {
                    let value = page.elements.dropdown.as_ref().map(|d| d.value());
                    match value.as_deref().and_then(|v| v.parse::<i64>().ok()) {
                        Some(stage) => page.update_current_stage(stage),
                        None => warn!("Ignoring stage selection {:?}", value),
                    }
                });
            })?);
        }

        if let Some(button) = &self.elements.prev_button {
            let weak = Rc::downgrade(self);
            listeners.push(Listener::attach(button, "click", move |_| {
                with_controller(&weak, |page| {
                    let stage = page.current_stage() as i64 - 1;
                    page.update_current_stage(stage);
                });
            })?);
        }

        if let Some(button) = &self.elements.next_button {
            let weak = Rc::downgrade(self);
            listeners.push(Listener::attach(button, "click", move |_| {
                with_controller(&weak, |page| {
                    let stage = page.current_stage() as i64 + 1;
                    page.update_current_stage(stage);
                });
            })?);
        }

        self.state.borrow_mut().control_listeners = listeners;
        Ok(())
    }

    /// Switches to `stage` (clamped), re-renders its timestamps and shows the
    /// default panel.
    pub fn update_current_stage(self: &Rc<Self>, stage: i64) {
        let stage = self.state.borrow_mut().navigator.update_current_stage(stage);
        if let Some(dropdown) = &self.elements.dropdown {
            dropdown.set_value(&stage.to_string());
        }
        if let Err(err) = self.render_stage(stage) {
            warn!("Could not render stage {}: {}", stage, err);
        }
        self.show_default_content();
    }

    /// Merges, sorts and renders the timestamps of `stage`.
    fn render_stage(self: &Rc<Self>, stage: usize) -> Result<(), PageError> {
        let entries = self.source.entries_for_stage(stage);
        let view = build_stage_view(
            self.source.is_staged(),
            stage,
            &entries,
            &self.config.empty_placeholder,
        );
        debug!(
            "Rendering stage {} with {} timestamps",
            stage,
            view.link_count()
        );

        let list = match &self.elements.list {
            Some(list) => list,
            None => return Ok(()),
        };

        let stale = self.state.borrow_mut().panels.replace(view.panel_ids());
        for id in stale {
            if let Some(panel) = self.elements.document.get_element_by_id(&id) {
                panel.remove();
            }
        }
        list.set_inner_html("");

        let mut listeners = Vec::new();
        for (index, row) in view.rows.iter().enumerate() {
            let li = self.elements.document.create_element("li")?;
            match row {
                Row::Placeholder(text) => {
                    li.set_text_content(Some(text));
                    let li = li.dyn_ref::<HtmlElement>().ok_or(PageError::MissingElement("li"))?;
                    li.style().set_property("text-align", "center")?;
                    li.style().set_property("opacity", "0.5")?;
                }
                Row::Link { label, .. } => {
                    let link = self
                        .elements
                        .document
                        .create_element("a")?
                        .dyn_into::<HtmlAnchorElement>()
                        .map_err(|_| PageError::MissingElement("a"))?;
                    link.set_href("#");
                    link.set_class_name("timestamp-link");
                    link.set_text_content(Some(label));
                    link.set_tab_index(0);
                    listeners.extend(self.attach_row_handlers(&link, stage, index)?);
                    li.append_child(&link)?;
                }
            }
            list.append_child(&li)?;
        }

        if let Some(content_panel) = &self.elements.content_panel {
            for panel in &view.panels {
                let div = self.elements.document.create_element("div")?;
                div.set_id(&panel.id);
                div.set_class_name(&format!("{} {}", STAMP_CONTENT_CLASS, HIDDEN_CLASS));
                let heading = self.elements.document.create_element("h3")?;
                heading.set_text_content(Some(&panel.heading));
                let body = self.elements.document.create_element("p")?;
                body.set_inner_html(&panel.body);
                div.append_child(&heading)?;
                div.append_child(&body)?;
                content_panel.append_child(&div)?;
            }
        }

        let mut state = self.state.borrow_mut();
        state.view = Some(view);
        state.row_listeners = listeners;
        Ok(())
    }

    fn attach_row_handlers(
        self: &Rc<Self>,
        link: &HtmlAnchorElement,
        stage: usize,
        index: usize,
    ) -> Result<Vec<Listener>, PageError> {
        let weak = Rc::downgrade(self);
        let click = Listener::attach(link, "click", move |event| {
            event.prevent_default();
            with_controller(&weak, |page| page.jump_to_timestamp(stage, index));
        })?;

        let weak = Rc::downgrade(self);
        let keydown = Listener::attach(link, "keydown", move |event| {
            let activates = event
                .dyn_ref::<KeyboardEvent>()
                .map_or(false, |key| key.key() == "Enter" || key.key() == " ");
            if activates {
                event.prevent_default();
                with_controller(&weak, |page| page.jump_to_timestamp(stage, index));
            }
        })?;

        Ok(vec![click, keydown])
    }

    /// Plays the video from the entry's time and reveals its panel.
    pub fn jump_to_timestamp(&self, stage: usize, index: usize) {
        let target = {
            let state = self.state.borrow();
            state
                .view
                .as_ref()
                .filter(|view| view.stage == stage)
                .and_then(|view| view.rows.get(index))
                .and_then(|row| match row {
                    Row::Link { time, panel_id, .. } => Some((*time, panel_id.clone())),
                    Row::Placeholder(_) => None,
                })
        };
        let (time, panel_id) = match target {
            Some(target) => target,
            None => return,
        };

        self.set_video(Some(time));
        self.hide_stamp_contents();
        if let Some(panel) = self.elements.document.get_element_by_id(&panel_id) {
            let _ = panel.class_list().remove_1(HIDDEN_CLASS);
        }
    }

    fn set_video(&self, start: Option<f64>) {
        let (frame, video_id) = match (&self.elements.video_frame, &self.video_id) {
            (Some(frame), Some(video_id)) => (frame, video_id),
            _ => return,
        };
        match embed_url(&self.config.embed_base, video_id, start) {
            Ok(src) => frame.set_src(&src),
            Err(err) => warn!("Could not build embed URL: {}", err),
        }
    }

    fn hide_stamp_contents(&self) {
        for element in self.elements.stamp_contents() {
            let _ = element.class_list().add_1(HIDDEN_CLASS);
        }
    }

    pub fn show_default_content(&self) {
        self.hide_stamp_contents();
        if let Some(panel) = &self.elements.default_panel {
            let _ = panel.class_list().remove_1(HIDDEN_CLASS);
        }
    }

    /// Keeps the timestamp panel as tall as the video panel.
    pub fn sync_panel_heights(&self) {
        if let (Some(video_panel), Some(timestamps_panel)) =
            (&self.elements.video_panel, &self.elements.timestamps_panel)
        {
            let height = video_panel.get_bounding_client_rect().height();
            let _ = timestamps_panel
                .style()
                .set_property("height", &format!("{}px", height));
        }
    }

    fn attach_layout_sync(self: &Rc<Self>) -> Result<(), PageError> {
        let window = js_api::window().ok_or(PageError::MissingElement("window"))?;
        let mut listeners = Vec::new();
        for event in ["load", "resize"].iter().copied() {
            let weak = Rc::downgrade(self);
            listeners.push(Listener::attach(&window, event, move |_| {
                with_controller(&weak, |page| page.sync_panel_heights());
            })?);
        }
        self.state.borrow_mut().layout_listeners = listeners;

        let weak = Rc::downgrade(self);
        js_api::set_timeout(
            move || with_controller(&weak, |page| page.sync_panel_heights()),
            self.config.sync_delay_ms,
        )?;
        Ok(())
    }
}

fn with_controller(weak: &Weak<TimestampController>, f: impl FnOnce(&Rc<TimestampController>)) {
    if let Some(controller) = weak.upgrade() {
        f(&controller);
    }
}
