//! fogmap-render: Compositors for reveal geometry (sans-IO)
//!
//! Turns [`RevealGeometry`](fogmap_core::RevealGeometry) into pixels.
//! Two interchangeable [`Compositor`]s produce a luminance mask:
//! [`StrokeMaskCompositor`] rasterises discs and round-capped strokes with
//! `tiny-skia`, and [`PolygonCompositor`] subtracts the union of reveal
//! rings from a world rectangle with `geo` boolean ops. [`apply_fog`]
//! composites a fog colour over a base map through a mask, and [`to_svg`]
//! exports the geometry as a masked SVG fog layer.

pub mod compositor;
pub mod fog;
pub mod mask;
pub mod polygon;
pub mod svg;

pub use compositor::{Compositor, CompositorKind, RenderError};
pub use fog::apply_fog;
pub use mask::StrokeMaskCompositor;
pub use polygon::PolygonCompositor;
pub use svg::{FOG_FILL, SvgMetadata, build_path_data, to_svg};
