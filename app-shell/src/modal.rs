use std::fmt;

use log::debug;
use serde::Deserialize;

/// Key that dismisses the modal from anywhere on the page.
pub const CLOSE_KEY: &str = "Escape";

/// DOM contract of the news modal and the cards that open it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModalBindings {
    pub modal_id: String,
    pub title_id: String,
    pub date_id: String,
    pub body_id: String,
    pub card_selector: String,
    pub close_selector: String,
    pub open_class: String,
    pub title_attribute: String,
    pub date_attribute: String,
    pub body_attribute: String,
}

impl Default for ModalBindings {
    fn default() -> Self {
        Self {
            modal_id: "news-modal".to_string(),
            title_id: "modal-title".to_string(),
            date_id: "modal-date".to_string(),
            body_id: "modal-body".to_string(),
            card_selector: ".news-card".to_string(),
            close_selector: "[data-modal-close]".to_string(),
            open_class: "is-open".to_string(),
            title_attribute: "data-title".to_string(),
            date_attribute: "data-date".to_string(),
            body_attribute: "data-body".to_string(),
        }
    }
}

/// What a news card shows once expanded. Read from the card at click time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewsCard {
    pub title: String,
    pub date: String,
    pub body: String,
}

impl NewsCard {
    /// Build from a card's attributes; anything missing becomes "".
    pub fn from_attributes<F>(bindings: &ModalBindings, attribute: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| attribute(name).unwrap_or_default();
        Self {
            title: read(&bindings.title_attribute),
            date: read(&bindings.date_attribute),
            body: read(&bindings.body_attribute),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModalState {
    Open,
    #[default]
    Closed,
}

impl ModalState {
    pub fn is_open(self) -> bool {
        self == ModalState::Open
    }

    /// Value of the `aria-hidden` attribute in this state.
    pub fn aria_hidden(self) -> &'static str {
        match self {
            ModalState::Open => "false",
            ModalState::Closed => "true",
        }
    }
}

impl fmt::Display for ModalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModalState::Open => f.write_str("open"),
            ModalState::Closed => f.write_str("closed"),
        }
    }
}

/// Rendering surface of the modal.
///
/// Methods take `&self`: DOM handles are shared, and the controller is held by
/// every card's click listener at once.
pub trait ModalView {
    /// Fill the title, date and body regions.
    fn show_card(&self, card: &NewsCard);
    fn set_state(&self, state: ModalState);
    fn state(&self) -> ModalState;
}

/// The page's single news modal.
pub struct ModalController<V: ModalView> {
    view: Option<V>,
}

impl<V: ModalView> ModalController<V> {
    /// `view` is `None` when the page has no modal; every operation is then a
    /// no-op.
    pub fn new(view: Option<V>) -> Self {
        if view.is_none() {
            debug!("news modal not found, modal controller is inert");
        }
        Self { view }
    }

    pub fn view(&self) -> Option<&V> {
        self.view.as_ref()
    }

    pub fn state(&self) -> Option<ModalState> {
        self.view.as_ref().map(ModalView::state)
    }

    pub fn open(&self, card: &NewsCard) {
        let Some(view) = &self.view else {
            return;
        };
        view.show_card(card);
        view.set_state(ModalState::Open);
    }

    /// Safe to call in any state.
    pub fn close(&self) {
        if let Some(view) = &self.view {
            view.set_state(ModalState::Closed);
        }
    }

    /// Document-wide keydown handler. Returns true if the key closes the modal.
    pub fn handle_key(&self, key: &str) -> bool {
        if key != CLOSE_KEY {
            return false;
        }
        self.close();
        true
    }
}
