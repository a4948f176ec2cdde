//! Starforge library entry points.
//!
//! This crate renders sky-accurate star charts as SVG for an observer
//! location and time. It exposes the catalog loaders, the render pipeline and
//! the helpers that turn user input (location strings, dates) into an
//! [`Observer`]. Higher-level consumers such as the CLI should only depend on
//! the items exported here.
//!

#![deny(warnings)]

pub mod catalog;
pub mod config;
pub mod coords;
pub mod datetime;
pub mod declutter;
pub mod document;
pub mod error;
pub mod events;
pub mod icons;
pub mod location;
pub mod observer;
pub mod pipeline;
pub mod projection;
pub mod scene;
pub mod time;
pub mod visibility;

pub use catalog::{Catalog, CelestialObject, Constellation, ConstellationEdge, LoadedCatalog, ObjectId};
pub use config::{ChartSettings, CropBounds, RenderConfig, RenderConfigBuilder};
pub use datetime::parse_instant;
pub use declutter::{Anchor, AnchorPolicy, Placement};
pub use error::{Error, Result};
pub use events::{CollectingSink, EventSink, RenderEvent, TracingSink};
pub use icons::{IconSet, StarIcon};
pub use location::{resolve_location, ResolvedLocation};
pub use observer::Observer;
pub use pipeline::{render, render_with_icons, RenderOutput, RenderReport};
pub use projection::{DrawnEdge, ProjectedPoint, ProjectionKind, Projector};
pub use scene::Scene;
