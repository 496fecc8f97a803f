mod series;

pub use series::{CarryIndexPoint, DateWindow, SymbolSeries, group_into_series};
