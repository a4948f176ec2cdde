//! Structured events reported by the render pipeline.
//!
//! The pipeline never logs directly. It reports through an [`EventSink`]
//! supplied by the caller; [`TracingSink`] forwards events to `tracing`.

use std::sync::Mutex;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::visibility::VisibilityStats;

/// Something noteworthy that happened during a render.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RenderEvent {
    Started {
        objects: usize,
        field_of_view: f64,
        magnitude_limit: f64,
    },
    /// A catalog object was excluded from the render.
    ObjectRejected { message: String },
    Visibility(VisibilityStats),
    Projected {
        points: usize,
        outside_disk: usize,
        outside_bounds: usize,
    },
    Labels { placed: usize, suppressed: usize },
    /// A custom icon could not be used and the generated marker was drawn.
    IconFallback { message: String },
    Completed { layers: usize, bytes: usize },
}

/// Receiver of render events. Implementations must tolerate calls from
/// several renders at once.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &RenderEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &RenderEvent) {
        match event {
            RenderEvent::Started {
                objects,
                field_of_view,
                magnitude_limit,
            } => debug!(objects, field_of_view, magnitude_limit, "render started"),
            RenderEvent::ObjectRejected { message } => debug!(%message, "catalog object rejected"),
            RenderEvent::Visibility(stats) => debug!(
                considered = stats.considered,
                below_horizon = stats.below_horizon,
                too_faint = stats.too_faint,
                outside_field = stats.outside_field,
                visible = stats.visible,
                "visibility filter applied"
            ),
            RenderEvent::Projected {
                points,
                outside_disk,
                outside_bounds,
            } => debug!(points, outside_disk, outside_bounds, "projected visible objects"),
            RenderEvent::Labels { placed, suppressed } => {
                debug!(placed, suppressed, "labels decluttered")
            }
            RenderEvent::IconFallback { message } => warn!(%message, "using generated marker"),
            RenderEvent::Completed { layers, bytes } => info!(layers, bytes, "render complete"),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<RenderEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far, in order.
    pub fn events(&self) -> Vec<RenderEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: &RenderEvent) {
        let mut events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collecting_sink_preserves_order() {
        let sink = CollectingSink::new();
        sink.emit(&RenderEvent::Labels { placed: 1, suppressed: 0 });
        sink.emit(&RenderEvent::Completed { layers: 7, bytes: 10 });
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], RenderEvent::Completed { layers: 7, .. }));
    }

    #[test]
    fn events_serialize_with_tag() {
        let json = serde_json::to_string(&RenderEvent::Projected {
            points: 3,
            outside_disk: 1,
            outside_bounds: 0,
        }).unwrap();
        assert!(json.contains(r#""event":"projected""#));
    }
}
