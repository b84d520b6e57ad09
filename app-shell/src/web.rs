use std::cell::RefCell;
use std::rc::Rc;

use chart_frontend::MountRegistry;
use js_sys::Reflect;
use log::{debug, error, info, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{window, Document, Element, KeyboardEvent};

use crate::logging;
use crate::modal::{ModalBindings, ModalController, ModalState, ModalView, NewsCard};
use crate::{mount_independently, PageConfig, CONFIG_GLOBAL};

thread_local! {
    /// Modals already wired, keyed by modal id.
    static WIRED: RefCell<MountRegistry<()>> = RefCell::new(MountRegistry::new());
}

fn document() -> Result<Document, JsValue> {
    window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))
}

/// Read the page override, if any. A bad override is reported and ignored.
fn load_config() -> PageConfig {
    let raw = Reflect::get(&js_sys::global(), &JsValue::from_str(CONFIG_GLOBAL))
        .ok()
        .and_then(|v| v.as_string());
    match raw {
        None => PageConfig::default(),
        Some(json) => PageConfig::from_json(&json).unwrap_or_else(|err| {
            web_sys::console::warn_1(&JsValue::from_str(&format!(
                "ignoring malformed {CONFIG_GLOBAL}: {err}"
            )));
            PageConfig::default()
        }),
    }
}

/// The modal element and its three display regions.
struct DomModal {
    root: Element,
    title: Option<Element>,
    date: Option<Element>,
    body: Option<Element>,
    open_class: String,
}

impl DomModal {
    fn find(doc: &Document, bindings: &ModalBindings) -> Option<Self> {
        let root = doc.get_element_by_id(&bindings.modal_id)?;
        let region = |id: &str| {
            let el = doc.get_element_by_id(id);
            if el.is_none() {
                warn!("modal region #{id} not found");
            }
            el
        };
        Some(Self {
            title: region(&bindings.title_id),
            date: region(&bindings.date_id),
            body: region(&bindings.body_id),
            root,
            open_class: bindings.open_class.clone(),
        })
    }
}

impl ModalView for DomModal {
    fn show_card(&self, card: &NewsCard) {
        for (region, text) in [
            (&self.title, &card.title),
            (&self.date, &card.date),
            (&self.body, &card.body),
        ] {
            if let Some(region) = region {
                region.set_text_content(Some(text.as_str()));
            }
        }
    }

    fn set_state(&self, state: ModalState) {
        let classes = self.root.class_list();
        let toggled = match state {
            ModalState::Open => classes.add_1(&self.open_class),
            ModalState::Closed => classes.remove_1(&self.open_class),
        };
        let hidden = self.root.set_attribute("aria-hidden", state.aria_hidden());
        if let Err(err) = toggled.and(hidden) {
            error!("failed to mark modal {state}: {err:?}");
        }
    }

    fn state(&self) -> ModalState {
        if self.root.class_list().contains(&self.open_class) {
            ModalState::Open
        } else {
            ModalState::Closed
        }
    }
}

fn elements(doc: &Document, selector: &str) -> Result<Vec<Element>, JsValue> {
    let nodes = doc.query_selector_all(selector)?;
    Ok((0..nodes.length())
        .filter_map(|i| nodes.item(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect())
}

fn wire_modal(doc: &Document, bindings: &ModalBindings) -> Result<(), JsValue> {
    // Both selectors resolve before any listener is attached, so a bad
    // selector leaves nothing half-wired.
    let cards = elements(doc, &bindings.card_selector)?;
    let closers = elements(doc, &bindings.close_selector)?;
    let controller = Rc::new(ModalController::new(DomModal::find(doc, bindings)));

    for card in &cards {
        let controller = controller.clone();
        let bindings = bindings.clone();
        let source = card.clone();
        let on_click = Closure::<dyn FnMut()>::wrap(Box::new(move || {
            let news = NewsCard::from_attributes(&bindings, |name| source.get_attribute(name));
            controller.open(&news);
        }));
        card.add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())?;
        on_click.forget();
    }

    for closer in &closers {
        let controller = controller.clone();
        let on_click = Closure::<dyn FnMut()>::wrap(Box::new(move || controller.close()));
        closer.add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())?;
        on_click.forget();
    }

    {
        let controller = controller.clone();
        let on_key = Closure::<dyn FnMut(KeyboardEvent)>::wrap(Box::new(
            move |event: KeyboardEvent| {
                controller.handle_key(&event.key());
            },
        ));
        doc.add_event_listener_with_callback("keydown", on_key.as_ref().unchecked_ref())?;
        on_key.forget();
    }

    debug!(
        "modal wired: {} cards, {} close triggers",
        cards.len(),
        closers.len()
    );
    Ok(())
}

/// Wire the modal unless an earlier call already did.
fn wire_modal_once(bindings: &ModalBindings) -> Result<bool, JsValue> {
    let doc = document()?;
    WIRED.with(|wired| {
        wired
            .borrow_mut()
            .mount_once(&bindings.modal_id, || wire_modal(&doc, bindings).map(Some))
    })
}

fn mount_chart_logged(bindings: &chart_frontend::ChartBindings) -> Result<(), JsValue> {
    match chart_frontend::web::mount_in_document(bindings) {
        Ok(true) => Ok(()),
        Ok(false) => {
            info!("chart #{} absent or already mounted", bindings.container_id);
            Ok(())
        }
        Err(err) => {
            error!("chart bootstrap failed: {err}");
            Err(JsValue::from_str(&err.to_string()))
        }
    }
}

fn mount_all(config: &PageConfig) -> Result<(), JsValue> {
    mount_independently(
        || {
            wire_modal_once(&config.modal).map(drop).map_err(|err| {
                error!("news modal wiring failed: {err:?}");
                err
            })
        },
        || mount_chart_logged(&config.chart),
    )
}

/// Module entry point. Waits for `DOMContentLoaded` when the document is
/// still loading.
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    let config = load_config();
    logging::init(config.level_filter());

    let doc = document()?;
    if doc.ready_state() != "loading" {
        return mount_all(&config);
    }
    let on_ready = Closure::once(move || {
        if let Err(err) = mount_all(&config) {
            wasm_bindgen::throw_val(err);
        }
    });
    doc.add_event_listener_with_callback("DOMContentLoaded", on_ready.as_ref().unchecked_ref())?;
    on_ready.forget();
    Ok(())
}

/// Mount the chart on demand, e.g. after the host swapped the container in.
/// Resolves to `false` when there is nothing to mount.
#[wasm_bindgen(js_name = mountChart)]
pub fn mount_chart(container_id: Option<String>) -> Result<bool, JsValue> {
    let mut bindings = load_config().chart;
    if let Some(id) = container_id {
        bindings.container_id = id;
    }
    chart_frontend::web::mount_in_document(&bindings)
        .map_err(|err| JsValue::from_str(&err.to_string()))
}

/// Wire the news modal on demand. Resolves to `false` if it was already
/// wired.
#[wasm_bindgen(js_name = mountModal)]
pub fn mount_modal() -> Result<bool, JsValue> {
    wire_modal_once(&load_config().modal)
}
