//! fogmap-core: GPS path to reveal-geometry engine (sans-IO).
//!
//! Turns an append-only stream of GPS fixes into geometry describing
//! where a fog-of-war layer is cleared, positioned against a panning and
//! zooming map camera:
//!
//! connection filtering -> viewport culling -> density reduction ->
//! projection -> simplification -> reveal geometry.
//!
//! A stable compute region lets pure pans at fixed zoom reuse the last
//! geometry with an exact pixel translation instead of recomputing.
//!
//! This crate has **no I/O dependencies** and no global state. It never
//! fails on bad numbers: invalid inputs degrade to documented fallbacks
//! with a `tracing` warning. Errors are reserved for rejecting data at
//! the boundary (fixes, configs, tile addresses). Rasterising the
//! geometry lives in `fogmap-render`.

pub mod connection;
pub mod cull;
pub mod diagnostics;
pub mod generation;
pub mod pipeline;
pub mod projection;
pub mod reveal;
pub mod simplify;
pub mod stable_region;
pub mod tile;
pub mod types;

pub use connection::{ConnectionFilter, haversine_meters};
pub use diagnostics::FrameDiagnostics;
pub use generation::{Generation, GenerationSlot};
pub use pipeline::{FogPipeline, Frame, build_reveal};
pub use projection::{GeoProjector, meters_per_pixel, meters_to_pixels, project_to_pixel};
pub use reveal::{PolygonGeometry, RevealGeometry, RevealGeometryBuilder, StrokeGeometry};
pub use stable_region::{RecomputeReason, RegionDecision, StableComputeRegion};
pub use tile::{
    TileBounds, TileCoordinate, lat_lon_to_tile, region_to_zoom, tile_bounds, tiles_around,
    tiles_for_region,
};
pub use types::{
    Chain, FogConfig, FogError, GeoBounds, GeoPoint, GeometryStyle, MapRegion, Path, PixelPoint,
    Polyline, SafeAreaInsets, Segment,
};
