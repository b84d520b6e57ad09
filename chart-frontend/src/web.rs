//! Browser side: `LightweightCharts` bindings and the container element.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Function, Reflect, JSON};
use log::{debug, error, warn};
use serde::Serialize;
use ts_core::SeriesPoint;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::HtmlElement;

use crate::{
    bootstrap, CandlestickStyle, ChartApi, ChartBindings, ChartContainer, ChartError,
    ChartLibrary, ChartOptions, ChartSize, MountRegistry, MountedChart, SeriesApi,
};

/// Global under which the library registers itself.
const LIBRARY_GLOBAL: &str = "LightweightCharts";

#[wasm_bindgen]
extern "C" {
    /// `IChartApi`
    pub type JsChart;

    #[wasm_bindgen(method, catch, js_name = addCandlestickSeries)]
    fn add_series(this: &JsChart, options: &JsValue) -> Result<JsSeries, JsValue>;

    #[wasm_bindgen(method, catch, js_name = applyOptions)]
    fn apply_options(this: &JsChart, options: &JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = remove)]
    fn remove_chart(this: &JsChart) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = timeScale)]
    fn time_scale(this: &JsChart) -> Result<JsTimeScale, JsValue>;

    /// `ITimeScaleApi`
    pub type JsTimeScale;

    #[wasm_bindgen(method, catch, js_name = fitContent)]
    fn fit_content(this: &JsTimeScale) -> Result<(), JsValue>;

    /// `ISeriesApi<'Candlestick'>`
    pub type JsSeries;

    #[wasm_bindgen(method, catch, js_name = setData)]
    fn set_series_data(this: &JsSeries, data: &JsValue) -> Result<(), JsValue>;
}

fn library_error(err: JsValue) -> ChartError {
    let message = err
        .dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.message()))
        .or_else(|| err.as_string())
        .unwrap_or_else(|| format!("{err:?}"));
    ChartError::Library(message)
}

/// Plain JS object from any serializable value.
fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, ChartError> {
    let json = serde_json::to_string(value)?;
    JSON::parse(&json).map_err(library_error)
}

/// Handle on the `LightweightCharts` namespace, if the page loaded it.
pub struct LightweightCharts {
    namespace: JsValue,
    create_chart: Function,
}

impl LightweightCharts {
    pub fn detect() -> Option<Self> {
        let namespace = Reflect::get(&js_sys::global(), &JsValue::from_str(LIBRARY_GLOBAL)).ok()?;
        if namespace.is_undefined() || namespace.is_null() {
            return None;
        }
        let create_chart = Reflect::get(&namespace, &JsValue::from_str("createChart"))
            .ok()?
            .dyn_into::<Function>()
            .ok()?;
        Some(Self {
            namespace,
            create_chart,
        })
    }

    /// Look the crosshair mode up in the library's own enum, falling back to
    /// the documented numeric value.
    fn crosshair_mode(&self, options: &ChartOptions) -> JsValue {
        let mode = options.crosshair.mode;
        Reflect::get(&self.namespace, &JsValue::from_str("CrosshairMode"))
            .ok()
            .filter(|modes| modes.is_object())
            .and_then(|modes| Reflect::get(&modes, &JsValue::from_str(mode.name())).ok())
            .filter(|value| !value.is_undefined())
            .unwrap_or_else(|| JsValue::from(mode.value()))
    }
}

impl ChartLibrary<HtmlElement> for LightweightCharts {
    type Chart = JsChart;

    fn create_chart(
        &self,
        container: &HtmlElement,
        options: &ChartOptions,
    ) -> Result<JsChart, ChartError> {
        let js_options = to_js(options)?;
        let crosshair = Reflect::get(&js_options, &JsValue::from_str("crosshair"))
            .map_err(library_error)?;
        Reflect::set(
            &crosshair,
            &JsValue::from_str("mode"),
            &self.crosshair_mode(options),
        )
        .map_err(library_error)?;

        let chart = self
            .create_chart
            .call2(&self.namespace, container, &js_options)
            .map_err(library_error)?;
        Ok(chart.unchecked_into::<JsChart>())
    }
}

impl ChartApi for JsChart {
    type Series = JsSeries;

    fn add_candlestick_series(
        &mut self,
        style: &CandlestickStyle,
    ) -> Result<JsSeries, ChartError> {
        self.add_series(&to_js(style)?).map_err(library_error)
    }

    fn fit_content(&mut self) -> Result<(), ChartError> {
        self.time_scale()
            .and_then(|scale| scale.fit_content())
            .map_err(library_error)
    }

    fn apply_size(&mut self, size: ChartSize) -> Result<(), ChartError> {
        self.apply_options(&to_js(&size)?).map_err(library_error)
    }
}

impl SeriesApi for JsSeries {
    fn set_data(&mut self, points: &[SeriesPoint]) -> Result<(), ChartError> {
        self.set_series_data(&to_js(points)?).map_err(library_error)
    }
}

impl ChartContainer for HtmlElement {
    fn attribute(&self, name: &str) -> Option<String> {
        self.get_attribute(name)
    }

    fn client_size(&self) -> ChartSize {
        ChartSize::new(f64::from(self.client_width()), f64::from(self.client_height()))
    }
}

fn find_container(bindings: &ChartBindings) -> Option<HtmlElement> {
    web_sys::window()?
        .document()?
        .get_element_by_id(&bindings.container_id)?
        .dyn_into::<HtmlElement>()
        .ok()
}

/// A mounted chart together with the window listener keeping it sized.
struct ResizeBinding {
    container: HtmlElement,
    mounted: Rc<RefCell<MountedChart<JsChart>>>,
    on_resize: Closure<dyn FnMut()>,
}

impl Drop for ResizeBinding {
    fn drop(&mut self) {
        if let Some(window) = web_sys::window() {
            let on_resize = self.on_resize.as_ref().unchecked_ref();
            let _ = window.remove_event_listener_with_callback("resize", on_resize);
        }
        if let Err(err) = self.mounted.borrow().chart().remove_chart() {
            warn!("failed to remove replaced chart: {err:?}");
        }
    }
}

thread_local! {
    static MOUNTED: RefCell<MountRegistry<ResizeBinding>> = RefCell::new(MountRegistry::new());
}

fn mount_with_listener(
    container: Option<HtmlElement>,
    bindings: &ChartBindings,
) -> Result<Option<ResizeBinding>, ChartError> {
    let library = LightweightCharts::detect();
    if container.is_some() && library.is_none() {
        warn!("{LIBRARY_GLOBAL} is not loaded, skipping chart");
    }
    let Some(mounted) = bootstrap(container.as_ref(), library.as_ref(), bindings)? else {
        return Ok(None);
    };
    let (Some(container), Some(window)) = (container, web_sys::window()) else {
        return Err(ChartError::Library("window is unavailable".into()));
    };

    let mounted = Rc::new(RefCell::new(mounted));
    let on_resize = {
        let mounted = mounted.clone();
        let container = container.clone();
        Closure::<dyn FnMut()>::wrap(Box::new(move || {
            if let Err(err) = mounted.borrow_mut().resize_to(&container) {
                error!("chart resize failed: {err}");
            }
        }))
    };
    window
        .add_event_listener_with_callback("resize", on_resize.as_ref().unchecked_ref())
        .map_err(library_error)?;
    Ok(Some(ResizeBinding {
        container,
        mounted,
        on_resize,
    }))
}

/// Mount the chart described by `bindings` into the current document and
/// keep it sized to its container on window resize.
///
/// Returns `Ok(false)` when the container or the library is missing, or when
/// this container already holds a chart. If the element under the id was
/// replaced since the last mount, the old chart and listener are torn down
/// first.
pub fn mount_in_document(bindings: &ChartBindings) -> Result<bool, ChartError> {
    let id = bindings.container_id.as_str();
    let container = find_container(bindings);
    MOUNTED.with(|registry| {
        let mut registry = registry.borrow_mut();
        let replaced = registry
            .get(id)
            .is_some_and(|binding| Some(&binding.container) != container.as_ref());
        if replaced {
            debug!("container #{id} was replaced, remounting");
            drop(registry.unmount(id));
        }
        registry.mount_once(id, || mount_with_listener(container, bindings))
    })
}
