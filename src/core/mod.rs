pub mod anchor;
pub mod bars;
pub mod chart_scales;
pub mod price_scale;
pub mod primitives;
pub mod scale;
pub mod types;

pub use anchor::{Anchor, AnchorPosition, copy_data_values};
pub use bars::{BarSource, OhlcBar, PriceSelector};
pub use chart_scales::{ChartContext, ChartScales, HorizontalAxis, LinearChartScales, TimeAxis};
pub use price_scale::{PriceScale, PriceScaleMode};
pub use scale::LinearScale;
pub use types::{PixelPoint, PixelRect, ToolId, Viewport};
