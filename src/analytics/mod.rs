//! The analytics viewer: overview, per-channel pages and generation statistics.

pub mod charts;
pub mod dashboard;
pub mod expandable;
pub mod project;
pub mod render;
pub mod router;

pub use charts::{ChartBackend, ChartSlot, RecordingCharts};
pub use dashboard::{AnalyticsDashboard, GenPill};
pub use project::Project;
pub use router::{Channel, Route, ViewRouter};
