//! Page shell: mounts the price chart and the news modal.

pub mod modal;

#[cfg(target_arch = "wasm32")]
mod logging;
#[cfg(target_arch = "wasm32")]
mod web;

use std::str::FromStr;

use chart_frontend::ChartBindings;
use log::LevelFilter;
use serde::Deserialize;

pub use modal::{ModalBindings, ModalController, ModalState, ModalView, NewsCard};

#[cfg(target_arch = "wasm32")]
pub use web::{mount_chart, mount_modal, start};

/// Global the page may set to a JSON string overriding [`PageConfig`].
pub const CONFIG_GLOBAL: &str = "METAL_PAGE_CONFIG";

/// DOM contract and runtime knobs for one page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub chart: ChartBindings,
    pub modal: ModalBindings,
    pub log_level: String,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            chart: ChartBindings::default(),
            modal: ModalBindings::default(),
            log_level: "info".to_string(),
        }
    }
}

impl PageConfig {
    /// Parse an override; fields not present keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Unknown level names fall back to `info`.
    pub fn level_filter(&self) -> LevelFilter {
        LevelFilter::from_str(self.log_level.trim()).unwrap_or(LevelFilter::Info)
    }
}

/// Run both page components. A failure in one never keeps the other from
/// mounting; the first error is handed back once both have run.
pub fn mount_independently<E, M, C>(modal: M, chart: C) -> Result<(), E>
where
    M: FnOnce() -> Result<(), E>,
    C: FnOnce() -> Result<(), E>,
{
    let modal = modal();
    let chart = chart();
    modal.and(chart)
}
