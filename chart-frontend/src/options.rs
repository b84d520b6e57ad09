use serde::{Serialize, Serializer};

pub const BACKGROUND: &str = "#101621";
pub const TEXT: &str = "#cbd5f5";
pub const FONT_FAMILY: &str = "Inter, sans-serif";
pub const GRID_LINE: &str = "rgba(148, 163, 184, 0.1)";
pub const SCALE_BORDER: &str = "rgba(148, 163, 184, 0.2)";

pub const ACTUAL_UP: &str = "#22c55e";
pub const ACTUAL_DOWN: &str = "#ef4444";
pub const PREDICTED_UP: &str = "#40E0D0";
pub const PREDICTED_DOWN: &str = "#a963ea";

/// Pixel size of the chart surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartSize {
    pub width: f64,
    pub height: f64,
}

impl ChartSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Mirrors the library's `CrosshairMode` enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrosshairMode {
    #[default]
    Normal,
}

impl CrosshairMode {
    /// Key under `LightweightCharts.CrosshairMode`.
    pub fn name(&self) -> &'static str {
        match self {
            CrosshairMode::Normal => "Normal",
        }
    }

    /// Numeric value used when the library's own enum can't be consulted.
    pub fn value(&self) -> u8 {
        match self {
            CrosshairMode::Normal => 0,
        }
    }
}

impl Serialize for CrosshairMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.value())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Background {
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutOptions {
    pub background: Background,
    pub text_color: String,
    pub font_family: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridLineOptions {
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridOptions {
    pub vert_lines: GridLineOptions,
    pub horz_lines: GridLineOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleOptions {
    pub border_color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrosshairOptions {
    pub mode: CrosshairMode,
}

/// Options handed to `createChart`. Only `size` changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartOptions {
    pub layout: LayoutOptions,
    pub grid: GridOptions,
    pub time_scale: ScaleOptions,
    pub right_price_scale: ScaleOptions,
    pub crosshair: CrosshairOptions,
    #[serde(flatten)]
    pub size: ChartSize,
}

impl ChartOptions {
    /// The page's dark theme at the given size.
    pub fn dark(size: ChartSize) -> Self {
        let grid_line = || GridLineOptions {
            color: GRID_LINE.to_string(),
        };
        let border = || ScaleOptions {
            border_color: SCALE_BORDER.to_string(),
        };
        Self {
            layout: LayoutOptions {
                background: Background {
                    color: BACKGROUND.to_string(),
                },
                text_color: TEXT.to_string(),
                font_family: FONT_FAMILY.to_string(),
            },
            grid: GridOptions {
                vert_lines: grid_line(),
                horz_lines: grid_line(),
            },
            time_scale: border(),
            right_price_scale: border(),
            crosshair: CrosshairOptions {
                mode: CrosshairMode::Normal,
            },
            size,
        }
    }
}

/// Style for `addCandlestickSeries`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandlestickStyle {
    pub up_color: String,
    pub down_color: String,
    pub border_up_color: String,
    pub border_down_color: String,
    pub wick_up_color: String,
    pub wick_down_color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_line_visible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_value_visible: Option<bool>,
}

impl CandlestickStyle {
    /// Body, border and wick share one color per direction.
    pub fn with_palette(up: &str, down: &str) -> Self {
        Self {
            up_color: up.to_string(),
            down_color: down.to_string(),
            border_up_color: up.to_string(),
            border_down_color: down.to_string(),
            wick_up_color: up.to_string(),
            wick_down_color: down.to_string(),
            price_line_visible: None,
            last_value_visible: None,
        }
    }

    pub fn actual() -> Self {
        Self::with_palette(ACTUAL_UP, ACTUAL_DOWN)
    }

    pub fn predicted() -> Self {
        Self {
            price_line_visible: Some(true),
            last_value_visible: Some(true),
            ..Self::with_palette(PREDICTED_UP, PREDICTED_DOWN)
        }
    }
}
