//! Chart lifecycle. The chart library itself is behind [`ChartBackend`].

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use tracing::debug;

use crate::core::models::TimelinePoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ChartHandle(pub u64);

pub trait ChartBackend: Send + Sync {
    /// Draws a chart into the element `target` and returns its instance.
    fn render(&mut self, target: &str, options: Value) -> ChartHandle;
    fn destroy(&mut self, handle: ChartHandle);
}

/// Area chart of counts per day. Categories are the day strings.
pub fn timeline_options(points: &[TimelinePoint], series_name: &str) -> Value {
    let categories: Vec<&str> = points.iter().map(|p| p.day.as_str()).collect();
    let data: Vec<u64> = points.iter().map(|p| p.count).collect();
    json!({
        "chart": {
            "type": "area",
            "height": 220,
            "toolbar": { "show": false },
            "background": "transparent",
            "fontFamily": "inherit"
        },
        "series": [{ "name": series_name, "data": data }],
        "theme": { "mode": "dark" },
        "colors": ["#3b82f6"],
        "dataLabels": { "enabled": false },
        "stroke": { "curve": "smooth", "width": 2 },
        "fill": {
            "type": "gradient",
            "gradient": { "shadeIntensity": 0.3, "opacityFrom": 0.5, "opacityTo": 0.1 }
        },
        "xaxis": { "categories": categories, "labels": { "style": { "colors": "#9ca3af" } } },
        "yaxis": { "labels": { "style": { "colors": "#9ca3af" } } },
        "grid": { "borderColor": "#374151", "strokeDashArray": 4 },
        "tooltip": { "theme": "dark" }
    })
}

/// One chart position on a page. Holds at most one live instance.
#[derive(Debug)]
pub struct ChartSlot {
    target: &'static str,
    handle: Option<ChartHandle>,
}

impl ChartSlot {
    pub const fn new(target: &'static str) -> Self {
        Self {
            target,
            handle: None,
        }
    }

    pub fn target(&self) -> &'static str {
        self.target
    }

    pub fn is_mounted(&self) -> bool {
        self.handle.is_some()
    }

    /// Destroys the current instance, if any, then draws a new one.
    pub fn replace(&mut self, backend: &mut dyn ChartBackend, options: Value) -> ChartHandle {
        self.dispose(backend);
        let handle = backend.render(self.target, options);
        debug!("Chart {} mounted as {:?}", self.target, handle);
        self.handle = Some(handle);
        handle
    }

    pub fn dispose(&mut self, backend: &mut dyn ChartBackend) {
        if let Some(handle) = self.handle.take() {
            backend.destroy(handle);
        }
    }
}

#[derive(Debug, Default)]
struct Recorded {
    next: u64,
    live: BTreeMap<ChartHandle, (String, Value)>,
    destroyed: u64,
}

/// Backend that only remembers what it was asked to draw. Used headless and in tests; clones
/// share state.
#[derive(Clone, Default)]
pub struct RecordingCharts {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingCharts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).live.len()
    }

    pub fn destroyed_count(&self) -> u64 {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).destroyed
    }

    /// Options of the live chart drawn into `target`.
    pub fn options_for(&self, target: &str) -> Option<Value> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .live
            .values()
            .find(|(t, _)| t == target)
            .map(|(_, v)| v.clone())
    }
}

impl ChartBackend for RecordingCharts {
    fn render(&mut self, target: &str, options: Value) -> ChartHandle {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.next += 1;
        let handle = ChartHandle(inner.next);
        inner.live.insert(handle, (target.to_string(), options));
        handle
    }

    fn destroy(&mut self, handle: ChartHandle) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.live.remove(&handle).is_some() {
            inner.destroyed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points() -> Vec<TimelinePoint> {
        vec![
            TimelinePoint {
                day: "2026-10-01".into(),
                count: 2,
            },
            TimelinePoint {
                day: "2026-10-02".into(),
                count: 5,
            },
        ]
    }

    #[test]
    fn options_use_days_as_categories() {
        let opts = timeline_options(&points(), "Запусков");
        assert_eq!(opts["xaxis"]["categories"], json!(["2026-10-01", "2026-10-02"]));
        assert_eq!(opts["series"][0]["data"], json!([2, 5]));
        assert_eq!(opts["series"][0]["name"], "Запусков");
    }

    #[test]
    fn replace_tears_down_previous_instance() {
        let charts = RecordingCharts::new();
        let mut backend = charts.clone();
        let mut slot = ChartSlot::new("timeline-chart");
        slot.replace(&mut backend, timeline_options(&points(), "a"));
        slot.replace(&mut backend, timeline_options(&points()[..1], "b"));
        assert_eq!(charts.live_count(), 1);
        assert_eq!(charts.destroyed_count(), 1);
        assert_eq!(
            charts.options_for("timeline-chart").unwrap()["series"][0]["name"],
            "b"
        );
        slot.dispose(&mut backend);
        assert!(!slot.is_mounted());
        assert_eq!(charts.live_count(), 0);
    }
}
