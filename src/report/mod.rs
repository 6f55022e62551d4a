pub mod catalog;
pub mod day;
pub mod presets;
pub mod query;

pub use catalog::{
    catalog, catalog_for, MetricDef, MetricFormat, MetricGroup, MetricGroupParseError, MetricId,
    MetricIdParseError, MetricShape,
};
pub use day::{day_report, DayReport};
pub use presets::{all_presets, builtin_presets, find_preset, Preset};
pub use query::{
    compute, report_for, run_query, MetricReport, MetricResult, Query, QueryReport, TableRow,
};
