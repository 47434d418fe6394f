//!
//! # Ext21 Circuit Extraction
//!
//! Ext21 extracts a netlist-with-parasitics from tile-based IC layout:
//! it sweeps a cell's tile planes into electrically-connected node
//! regions, recognizes and parameterizes devices (transistors, resistors,
//! capacitors) from their gate/body geometry, accumulates capacitance and
//! sheet resistance from area and perimeter sums, and writes one `.ext`
//! file per cell for downstream netlist tools to assemble.
//!
//! The engine is organized as a pipeline over a small tile-database
//! interface ([db]):
//!
//! * [region] - the generic connected-component tracer, shared by every
//!   sweep, with all traversal state held in side tables rather than on
//!   the tiles themselves.
//! * [nodes] - the node finder: per-node capacitance and per-class
//!   resistance accumulation, substrate handling, label attachment.
//! * [devices] - the device analyzer: terminal identification and
//!   canonical ordering, substrate lookup, and rectangular or
//!   boundary-survey length/width computation.
//! * [resist] - the closed-form equivalent-squares resistance model.
//! * [unique] - duplicate-label conflict resolution.
//! * [length] - driver-to-receiver path-length estimation.
//! * [hier] - the per-cell driver: subtree, ancestor, area-restricted,
//!   and timestamp-gated incremental extraction.
//! * [write] / [read] - the `.ext` emitter and the header reader the
//!   incremental mode needs.
//!
//! Technology knowledge - type connectivity, capacitance coefficients,
//! sheet-resistance classes, device templates - lives in a [tech]
//! style, loadable from JSON, YAML, or TOML.
//!
//! Extraction never aborts on questionable geometry: devices missing
//! terminals are repaired, irregular shapes clamp to defensible values,
//! and every such event lands in the run's warning tally rather than an
//! error. Only unreadable inputs or unwritable outputs are fatal, and
//! then only to the one cell involved.
//!

// Internal modules & re-exports
pub use ext21utils as utils;

pub mod db;
pub mod devices;
pub mod error;
pub mod geom;
pub mod hier;
pub mod length;
pub mod nodes;
pub mod read;
pub mod region;
pub mod resist;
pub mod tech;
pub mod unique;
pub mod write;

pub use db::{CellDef, CellUse, Label, LabelKind, Library, Plane, Tile, TileKey};
pub use devices::{DeviceRecord, TransRegion};
pub use error::{ExtContext, ExtError, ExtResult, ExtStats, ExtWarning, WarnKind};
pub use geom::{Int, Point, Rect, Side, Transform};
pub use hier::Extractor;
pub use length::DistanceRecord;
pub use nodes::{ExtractedNodes, NodeRegion};
pub use region::{LabRegion, Region, RegionBase, TileMarks};
pub use tech::{DeviceKind, TechSource, TechStyle, TypeMask};
pub use unique::UniquePolicy;
pub use write::{CellResults, ExtWriter};
