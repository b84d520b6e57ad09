//! Candlestick chart bootstrapper.
//!
//! Reads the actual and predicted series from the container's attributes,
//! builds a chart through whatever [`ChartLibrary`] is available and keeps it
//! sized to the container. The browser binding lives in [`web`]; everything
//! else runs on the host so it can be tested without a page.

pub mod options;
#[cfg(target_arch = "wasm32")]
pub mod web;

use std::collections::HashMap;

use log::{debug, info};
use serde::Deserialize;
use thiserror::Error;
use ts_core::{parse_series, ParseError, SeriesPoint};

pub use options::{CandlestickStyle, ChartOptions, ChartSize, CrosshairMode};

#[derive(Debug, Error)]
pub enum ChartError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("failed to encode chart payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("charting library call failed: {0}")]
    Library(String),
}

/// Where the chart lives in the page and which attributes carry its data.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChartBindings {
    pub container_id: String,
    pub series_attribute: String,
    pub predict_series_attribute: String,
}

impl Default for ChartBindings {
    fn default() -> Self {
        Self {
            container_id: "candlestick-chart".to_string(),
            series_attribute: "data-series".to_string(),
            predict_series_attribute: "data-predict-series".to_string(),
        }
    }
}

/// The element a chart is mounted into.
pub trait ChartContainer {
    fn attribute(&self, name: &str) -> Option<String>;
    /// Current rendered (client) size.
    fn client_size(&self) -> ChartSize;
}

/// Entry point of an external charting library.
pub trait ChartLibrary<C: ChartContainer> {
    type Chart: ChartApi;

    fn create_chart(&self, container: &C, options: &ChartOptions)
        -> Result<Self::Chart, ChartError>;
}

pub trait ChartApi {
    type Series: SeriesApi;

    fn add_candlestick_series(
        &mut self,
        style: &CandlestickStyle,
    ) -> Result<Self::Series, ChartError>;
    /// `timeScale().fitContent()`.
    fn fit_content(&mut self) -> Result<(), ChartError>;
    /// `applyOptions({ width, height })`.
    fn apply_size(&mut self, size: ChartSize) -> Result<(), ChartError>;
}

pub trait SeriesApi {
    fn set_data(&mut self, points: &[SeriesPoint]) -> Result<(), ChartError>;
}

/// Both series as read from the container, before anything is drawn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartData {
    pub actual: Vec<SeriesPoint>,
    pub predicted: Vec<SeriesPoint>,
}

impl ChartData {
    /// Parses both attributes. Either one failing aborts the whole read.
    pub fn read<C: ChartContainer>(
        container: &C,
        bindings: &ChartBindings,
    ) -> Result<Self, ParseError> {
        let actual = parse_series(
            &bindings.series_attribute,
            container.attribute(&bindings.series_attribute).as_deref(),
        )?;
        let predicted = parse_series(
            &bindings.predict_series_attribute,
            container
                .attribute(&bindings.predict_series_attribute)
                .as_deref(),
        )?;
        Ok(Self { actual, predicted })
    }
}

/// A chart that has been created and loaded.
pub struct MountedChart<Ch: ChartApi> {
    chart: Ch,
    actual: Ch::Series,
    predicted: Option<Ch::Series>,
}

impl<Ch: ChartApi> MountedChart<Ch> {
    pub fn chart(&self) -> &Ch {
        &self.chart
    }

    pub fn actual_series(&self) -> &Ch::Series {
        &self.actual
    }

    pub fn predicted_series(&self) -> Option<&Ch::Series> {
        self.predicted.as_ref()
    }

    pub fn series_count(&self) -> usize {
        1 + usize::from(self.predicted.is_some())
    }

    /// Re-apply the container's current size. Called on every window resize.
    pub fn resize_to<C: ChartContainer>(&mut self, container: &C) -> Result<(), ChartError> {
        self.chart.apply_size(container.client_size())
    }
}

/// Build the chart inside `container`.
///
/// Returns `Ok(None)` without touching anything when either the container or
/// the library is missing. Parse failures are reported before the chart is
/// created, so a bad payload never leaves a half-drawn chart behind.
pub fn bootstrap<C, L>(
    container: Option<&C>,
    library: Option<&L>,
    bindings: &ChartBindings,
) -> Result<Option<MountedChart<L::Chart>>, ChartError>
where
    C: ChartContainer,
    L: ChartLibrary<C>,
{
    let (container, library) = match (container, library) {
        (Some(container), Some(library)) => (container, library),
        (None, _) => {
            debug!("chart container #{} not found", bindings.container_id);
            return Ok(None);
        }
        (_, None) => {
            debug!("charting library unavailable");
            return Ok(None);
        }
    };

    let data = ChartData::read(container, bindings)?;
    let options = ChartOptions::dark(container.client_size());
    let mut chart = library.create_chart(container, &options)?;

    let mut actual = chart.add_candlestick_series(&CandlestickStyle::actual())?;
    actual.set_data(&data.actual)?;

    let predicted = if data.predicted.is_empty() {
        None
    } else {
        let mut series = chart.add_candlestick_series(&CandlestickStyle::predicted())?;
        series.set_data(&data.predicted)?;
        Some(series)
    };

    chart.fit_content()?;
    info!(
        "chart mounted: {} actual points, {} predicted points",
        data.actual.len(),
        data.predicted.len()
    );

    Ok(Some(MountedChart {
        chart,
        actual,
        predicted,
    }))
}

/// What has been mounted on the page, keyed by element id.
///
/// Entry points can be called more than once; a second mount into the same
/// id is refused instead of stacking a second chart and listener.
pub struct MountRegistry<T> {
    mounted: HashMap<String, T>,
}

impl<T> Default for MountRegistry<T> {
    fn default() -> Self {
        Self {
            mounted: HashMap::new(),
        }
    }
}

impl<T> MountRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.mounted.get(id)
    }

    pub fn is_mounted(&self, id: &str) -> bool {
        self.mounted.contains_key(id)
    }

    /// Run `mount` only if nothing is registered under `id`. Returns whether a
    /// new entry was registered.
    pub fn mount_once<E, F>(&mut self, id: &str, mount: F) -> Result<bool, E>
    where
        F: FnOnce() -> Result<Option<T>, E>,
    {
        if self.is_mounted(id) {
            debug!("#{id} already mounted");
            return Ok(false);
        }
        match mount()? {
            Some(entry) => {
                self.mounted.insert(id.to_string(), entry);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Forget `id`, handing back its entry so the caller can tear it down.
    pub fn unmount(&mut self, id: &str) -> Option<T> {
        self.mounted.remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use ts_core::ChartTime;

    struct FakeContainer {
        attrs: HashMap<String, String>,
        size: Cell<ChartSize>,
    }

    impl FakeContainer {
        fn new(attrs: &[(&str, &str)]) -> Self {
            Self {
                attrs: attrs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                size: Cell::new(ChartSize::new(640.0, 360.0)),
            }
        }
    }

    impl ChartContainer for FakeContainer {
        fn attribute(&self, name: &str) -> Option<String> {
            self.attrs.get(name).cloned()
        }

        fn client_size(&self) -> ChartSize {
            self.size.get()
        }
    }

    #[derive(Default)]
    struct FakeLibrary {
        created: RefCell<Vec<ChartOptions>>,
    }

    impl ChartLibrary<FakeContainer> for FakeLibrary {
        type Chart = FakeChart;

        fn create_chart(
            &self,
            _container: &FakeContainer,
            options: &ChartOptions,
        ) -> Result<FakeChart, ChartError> {
            self.created.borrow_mut().push(options.clone());
            Ok(FakeChart::default())
        }
    }

    #[derive(Default)]
    struct FakeChart {
        styles: Vec<CandlestickStyle>,
        fit_calls: usize,
        sizes: Vec<ChartSize>,
    }

    impl ChartApi for FakeChart {
        type Series = FakeSeries;

        fn add_candlestick_series(
            &mut self,
            style: &CandlestickStyle,
        ) -> Result<FakeSeries, ChartError> {
            self.styles.push(style.clone());
            Ok(FakeSeries::default())
        }

        fn fit_content(&mut self) -> Result<(), ChartError> {
            self.fit_calls += 1;
            Ok(())
        }

        fn apply_size(&mut self, size: ChartSize) -> Result<(), ChartError> {
            self.sizes.push(size);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeSeries {
        points: Vec<SeriesPoint>,
    }

    impl SeriesApi for FakeSeries {
        fn set_data(&mut self, points: &[SeriesPoint]) -> Result<(), ChartError> {
            self.points = points.to_vec();
            Ok(())
        }
    }

    struct FailingChart;

    impl ChartApi for FailingChart {
        type Series = FakeSeries;

        fn add_candlestick_series(
            &mut self,
            _style: &CandlestickStyle,
        ) -> Result<FakeSeries, ChartError> {
            Err(ChartError::Library("addCandlestickSeries is not a function".into()))
        }

        fn fit_content(&mut self) -> Result<(), ChartError> {
            Ok(())
        }

        fn apply_size(&mut self, _size: ChartSize) -> Result<(), ChartError> {
            Ok(())
        }
    }

    struct FailingLibrary;

    impl ChartLibrary<FakeContainer> for FailingLibrary {
        type Chart = FailingChart;

        fn create_chart(
            &self,
            _container: &FakeContainer,
            _options: &ChartOptions,
        ) -> Result<FailingChart, ChartError> {
            Ok(FailingChart)
        }
    }

    const ONE_POINT: &str = r#"[{"time":1,"open":10,"high":12,"low":9,"close":11}]"#;

    #[test]
    fn missing_container_is_a_no_op() {
        let library = FakeLibrary::default();
        let mounted =
            bootstrap::<FakeContainer, _>(None, Some(&library), &ChartBindings::default())
                .unwrap();
        assert!(mounted.is_none());
        assert!(library.created.borrow().is_empty());
    }

    #[test]
    fn missing_library_is_a_no_op() {
        let container = FakeContainer::new(&[("data-series", "not json at all")]);
        let mounted = bootstrap::<_, FakeLibrary>(Some(&container), None, &ChartBindings::default())
            .unwrap();
        assert!(mounted.is_none());
    }

    #[test]
    fn single_point_without_prediction_creates_one_series() {
        let container = FakeContainer::new(&[("data-series", ONE_POINT)]);
        let library = FakeLibrary::default();
        let mounted = bootstrap(Some(&container), Some(&library), &ChartBindings::default())
            .unwrap()
            .expect("mounted");

        assert_eq!(mounted.series_count(), 1);
        assert!(mounted.predicted_series().is_none());
        assert_eq!(mounted.chart().styles, vec![CandlestickStyle::actual()]);
        assert_eq!(mounted.chart().fit_calls, 1);
        assert_eq!(
            mounted.actual_series().points,
            vec![SeriesPoint::new(1_i64, (10.0, 12.0, 9.0, 11.0))]
        );
    }

    #[test]
    fn chart_is_created_at_container_size_with_dark_theme() {
        let container = FakeContainer::new(&[]);
        container.size.set(ChartSize::new(1024.0, 480.0));
        let library = FakeLibrary::default();
        bootstrap(Some(&container), Some(&library), &ChartBindings::default()).unwrap();

        let created = library.created.borrow();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0], ChartOptions::dark(ChartSize::new(1024.0, 480.0)));
        assert_eq!(created[0].crosshair.mode, CrosshairMode::Normal);
    }

    #[test]
    fn absent_actual_series_loads_empty_data() {
        let container = FakeContainer::new(&[]);
        let library = FakeLibrary::default();
        let mounted = bootstrap(Some(&container), Some(&library), &ChartBindings::default())
            .unwrap()
            .expect("mounted");
        assert!(mounted.actual_series().points.is_empty());
        assert_eq!(mounted.series_count(), 1);
    }

    #[test]
    fn actual_points_keep_input_order() {
        let raw = r#"[
            {"time":"2024-03-18","open":1,"high":2,"low":0.5,"close":1.5},
            {"time":"2024-03-19","open":1.5,"high":2.5,"low":1,"close":2},
            {"time":"2024-03-20","open":2,"high":3,"low":1.5,"close":1.8}
        ]"#;
        let container = FakeContainer::new(&[("data-series", raw)]);
        let library = FakeLibrary::default();
        let mounted = bootstrap(Some(&container), Some(&library), &ChartBindings::default())
            .unwrap()
            .expect("mounted");
        let times: Vec<_> = mounted
            .actual_series()
            .points
            .iter()
            .map(|p| p.time.clone())
            .collect();
        assert_eq!(
            times,
            vec![
                ChartTime::BusinessDayString("2024-03-18".into()),
                ChartTime::BusinessDayString("2024-03-19".into()),
                ChartTime::BusinessDayString("2024-03-20".into()),
            ]
        );
    }

    #[test]
    fn empty_prediction_array_creates_one_series() {
        let container =
            FakeContainer::new(&[("data-series", ONE_POINT), ("data-predict-series", "[]")]);
        let library = FakeLibrary::default();
        let mounted = bootstrap(Some(&container), Some(&library), &ChartBindings::default())
            .unwrap()
            .expect("mounted");
        assert_eq!(mounted.series_count(), 1);
        assert_eq!(mounted.chart().styles.len(), 1);
    }

    #[test]
    fn prediction_adds_second_styled_series() {
        let predicted = r#"[
            {"time":2,"open":11,"high":13,"low":10,"close":12},
            {"time":3,"open":12,"high":14,"low":11,"close":13}
        ]"#;
        let container = FakeContainer::new(&[
            ("data-series", ONE_POINT),
            ("data-predict-series", predicted),
        ]);
        let library = FakeLibrary::default();
        let mounted = bootstrap(Some(&container), Some(&library), &ChartBindings::default())
            .unwrap()
            .expect("mounted");

        assert_eq!(mounted.series_count(), 2);
        assert_eq!(
            mounted.chart().styles,
            vec![CandlestickStyle::actual(), CandlestickStyle::predicted()]
        );
        let series = mounted.predicted_series().expect("predicted series");
        assert_eq!(series.points.len(), 2);
        assert_eq!(series.points[1].time, ChartTime::from(3_i64));
        assert_eq!(mounted.chart().fit_calls, 1);
    }

    #[test]
    fn malformed_series_fails_before_chart_creation() {
        let container = FakeContainer::new(&[("data-series", "[{")]);
        let library = FakeLibrary::default();
        let err = bootstrap(Some(&container), Some(&library), &ChartBindings::default())
            .err()
            .expect("parse failure");
        assert!(matches!(err, ChartError::Parse(ParseError::Json { .. })));
        assert!(library.created.borrow().is_empty());
    }

    #[test]
    fn malformed_prediction_fails_whole_bootstrap() {
        let container = FakeContainer::new(&[
            ("data-series", ONE_POINT),
            ("data-predict-series", "oops"),
        ]);
        let library = FakeLibrary::default();
        let err = bootstrap(Some(&container), Some(&library), &ChartBindings::default())
            .err()
            .expect("parse failure");
        match err {
            ChartError::Parse(err) => assert_eq!(err.attribute(), "data-predict-series"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(library.created.borrow().is_empty());
    }

    #[test]
    fn library_failures_propagate() {
        let container = FakeContainer::new(&[("data-series", ONE_POINT)]);
        let err = bootstrap(Some(&container), Some(&FailingLibrary), &ChartBindings::default())
            .err()
            .expect("library failure");
        assert!(matches!(err, ChartError::Library(_)));
    }

    #[test]
    fn custom_bindings_read_other_attributes() {
        let bindings = ChartBindings {
            container_id: "silver-chart".into(),
            series_attribute: "data-xag".into(),
            predict_series_attribute: "data-xag-forecast".into(),
        };
        let container = FakeContainer::new(&[("data-xag", ONE_POINT), ("data-series", "[{")]);
        let library = FakeLibrary::default();
        let mounted = bootstrap(Some(&container), Some(&library), &bindings)
            .unwrap()
            .expect("mounted");
        assert_eq!(mounted.actual_series().points.len(), 1);
    }

    #[test]
    fn resize_applies_current_container_size() {
        let container = FakeContainer::new(&[("data-series", ONE_POINT)]);
        let library = FakeLibrary::default();
        let mut mounted = bootstrap(Some(&container), Some(&library), &ChartBindings::default())
            .unwrap()
            .expect("mounted");

        container.size.set(ChartSize::new(320.0, 200.0));
        mounted.resize_to(&container).unwrap();
        container.size.set(ChartSize::new(900.0, 500.0));
        mounted.resize_to(&container).unwrap();

        assert_eq!(
            mounted.chart().sizes,
            vec![ChartSize::new(320.0, 200.0), ChartSize::new(900.0, 500.0)]
        );
    }

    #[test]
    fn second_mount_into_same_container_is_refused() {
        let container = FakeContainer::new(&[("data-series", ONE_POINT)]);
        let library = FakeLibrary::default();
        let bindings = ChartBindings::default();
        let mut registry = MountRegistry::new();

        for _ in 0..2 {
            registry
                .mount_once(&bindings.container_id, || {
                    bootstrap(Some(&container), Some(&library), &bindings)
                })
                .unwrap();
        }

        assert_eq!(library.created.borrow().len(), 1);
        let mounted = registry.get("candlestick-chart").expect("registered");
        assert_eq!(mounted.chart().styles.len(), 1);
        assert_eq!(mounted.series_count(), 1);
    }

    #[test]
    fn mount_once_reports_what_happened() {
        let container = FakeContainer::new(&[("data-series", ONE_POINT)]);
        let library = FakeLibrary::default();
        let bindings = ChartBindings::default();
        let mut registry = MountRegistry::new();

        let first = registry.mount_once("candlestick-chart", || {
            bootstrap(Some(&container), Some(&library), &bindings)
        });
        assert!(first.unwrap());
        let again = registry.mount_once("candlestick-chart", || {
            bootstrap(Some(&container), Some(&library), &bindings)
        });
        assert!(!again.unwrap());
    }

    #[test]
    fn nothing_to_mount_or_failure_leaves_registry_empty() {
        let library = FakeLibrary::default();
        let bindings = ChartBindings::default();
        let mut registry = MountRegistry::new();

        let absent = registry.mount_once("candlestick-chart", || {
            bootstrap::<FakeContainer, _>(None, Some(&library), &bindings)
        });
        assert!(!absent.unwrap());

        let broken = FakeContainer::new(&[("data-series", "[{")]);
        let failed = registry.mount_once("candlestick-chart", || {
            bootstrap(Some(&broken), Some(&library), &bindings)
        });
        assert!(failed.is_err());
        assert!(!registry.is_mounted("candlestick-chart"));
    }

    #[test]
    fn unmount_allows_a_fresh_mount() {
        let container = FakeContainer::new(&[("data-series", ONE_POINT)]);
        let library = FakeLibrary::default();
        let bindings = ChartBindings::default();
        let mut registry = MountRegistry::new();
        let mount = || bootstrap(Some(&container), Some(&library), &bindings);

        assert!(registry.mount_once("candlestick-chart", mount).unwrap());
        assert!(registry.unmount("candlestick-chart").is_some());
        assert!(registry.mount_once("candlestick-chart", mount).unwrap());
        assert_eq!(library.created.borrow().len(), 2);
    }
}
