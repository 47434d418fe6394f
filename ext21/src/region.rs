//!
//! # Region Tracer Module
//!
//! The generic connected-component tracer underlying the node finder,
//! the device finder, and the unique-naming pass.
//! Given a type-mask of seed types and the style's connectivity tables,
//! [find_regions] visits every reachable tile from every unvisited seed,
//! grouping them into caller-defined regions through the [RegionObserver]
//! callbacks.
//!
//! Traversal state lives entirely in a [TileMarks] side table owned by the
//! caller - tiles themselves are never mutated - so traversals can never
//! alias one another's marking scheme, and the marks outlive the trace for
//! region lookups by later passes.
//!
//! Expansion runs on an explicit worklist, not the call stack, keeping
//! memory bounded on large flat designs. The tracer itself is not
//! interruptible; callers poll the interrupt flag between calls.
//!

// Crates.io
use enum_dispatch::enum_dispatch;
use slotmap::SecondaryMap;

// Local Imports
use crate::db::{CellDef, TileKey};
use crate::devices::TransRegion;
use crate::geom::{Point, Rect, Side};
use crate::nodes::NodeRegion;
use crate::tech::{PlaneId, TechStyle, TypeMask};

/// Region identifier: an index into the observing pass's region list
pub type RegionId = usize;

/// Traversal marking state for one tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    /// Claimed by a region during a region trace
    Owned(RegionId),
    /// Visited by a scratch traversal (path flooding, substrate search)
    Visited,
}

/// # Tile Mark Side-Table
///
/// Per-traversal marking state, one secondary map per plane.
/// Dropping (or [TileMarks::clear]-ing) it is the reset the original
/// per-tile tag scheme required of its callers.
#[derive(Debug, Clone, Default)]
pub struct TileMarks {
    planes: Vec<SecondaryMap<TileKey, Mark>>,
}
impl TileMarks {
    /// Create an empty table covering `nplanes` planes
    pub fn new(nplanes: usize) -> Self {
        Self {
            planes: (0..nplanes).map(|_| SecondaryMap::new()).collect(),
        }
    }
    /// Get the mark on tile (`plane`, `key`), if any
    pub fn get(&self, plane: PlaneId, key: TileKey) -> Option<Mark> {
        self.planes[plane].get(key).copied()
    }
    /// Mark tile (`plane`, `key`)
    pub fn set(&mut self, plane: PlaneId, key: TileKey, mark: Mark) {
        self.planes[plane].insert(key, mark);
    }
    /// Get the owning region of tile (`plane`, `key`), if region-owned
    pub fn owner(&self, plane: PlaneId, key: TileKey) -> Option<RegionId> {
        match self.get(plane, key) {
            Some(Mark::Owned(r)) => Some(r),
            _ => None,
        }
    }
    /// Reset every mark
    pub fn clear(&mut self) {
        for p in self.planes.iter_mut() {
            p.clear();
        }
    }
}

/// # Region Observer
///
/// The two caller-supplied callbacks of a region trace:
/// `on_first` allocates the region for a newly discovered component and
/// returns its id; `on_each` is invoked exactly once per member tile,
/// and is where per-region accumulation happens.
pub trait RegionObserver {
    fn on_first(&mut self, def: &CellDef, plane: PlaneId, key: TileKey) -> RegionId;
    fn on_each(&mut self, def: &CellDef, plane: PlaneId, key: TileKey, region: RegionId);
}

/// The electrical connectivity table: each type's full connects-mask from
/// the style. The node finder traces with this; the device finder swaps in
/// its own, narrower table.
pub fn electrical_connects(style: &TechStyle) -> Vec<TypeMask> {
    style.types.iter().map(|t| t.connects).collect()
}

/// Trace every connected region of `mask`-typed tiles in `def`,
/// optionally clipped to seed-area `area`, expanding along the symmetric
/// per-type `connect` table.
///
/// Every tile visited is marked in `marks` with its owning region.
/// Tiles already marked (from this or an earlier trace sharing `marks`)
/// are never re-seeded, which is what makes the region set a disjoint
/// partition of the swept tiles.
pub fn find_regions(
    style: &TechStyle,
    def: &CellDef,
    area: Option<&Rect>,
    mask: &TypeMask,
    connect: &[TypeMask],
    observer: &mut impl RegionObserver,
    marks: &mut TileMarks,
) {
    for plane in 0..def.planes.len() {
        let seeds = match area {
            Some(a) => def.planes[plane].search(a, mask),
            None => {
                let mut all: Vec<TileKey> = def.planes[plane]
                    .tiles
                    .iter()
                    .filter(|(_k, t)| mask.contains(t.typ))
                    .map(|(k, _t)| k)
                    .collect();
                all.sort_by_key(|k| {
                    let r = &def.planes[plane].tiles[*k].area;
                    (r.p0.y, r.p0.x)
                });
                all
            }
        };
        for seed in seeds {
            if marks.get(plane, seed).is_some() {
                continue;
            }
            let region = observer.on_first(def, plane, seed);
            expand(style, def, plane, seed, region, connect, observer, marks);
        }
    }
}

/// Expand region `region` outward from one seed tile, marking and
/// reporting every connected tile. Worklist-driven; used directly by the
/// substrate first-pass, which seeds by hand.
pub fn expand(
    style: &TechStyle,
    def: &CellDef,
    plane: PlaneId,
    seed: TileKey,
    region: RegionId,
    connect: &[TypeMask],
    observer: &mut impl RegionObserver,
    marks: &mut TileMarks,
) {
    let mut work: Vec<(PlaneId, TileKey)> = vec![(plane, seed)];
    marks.set(plane, seed, Mark::Owned(region));
    while let Some((p, k)) = work.pop() {
        observer.on_each(def, p, k, region);
        let (area, typ) = {
            let t = def.planes[p].tile(k);
            (t.area, t.typ)
        };
        let tdef = &style.types[typ];
        let conn = connect[typ];

        // Same-plane expansion along all four sides
        for side in Side::ALL {
            for nk in def.planes[p].find_neighbors(k, side) {
                if marks.get(p, nk).is_some() {
                    continue;
                }
                if conn.contains(def.planes[p].tile(nk).typ) {
                    marks.set(p, nk, Mark::Owned(region));
                    work.push((p, nk));
                }
            }
        }
        // Contact expansion: stacked tiles on each contacted plane,
        // registered once per involved plane via the shared marks
        for cp in tdef.contact_planes.iter() {
            for nk in def.planes[cp].search(&area, &conn) {
                if marks.get(cp, nk).is_none() {
                    marks.set(cp, nk, Mark::Owned(region));
                    work.push((cp, nk));
                }
            }
        }
        // Cross-plane connectivity *without* a contact: an areal halo
        // search one lambda out. By far the most expensive path, so it is
        // gated on the style's precomputed per-type plane mask.
        if !tdef.connects_planes.is_empty() {
            let halo = area.expand(1);
            for hp in tdef.connects_planes.iter() {
                for nk in def.planes[hp].search(&halo, &conn) {
                    if marks.get(hp, nk).is_none() {
                        marks.set(hp, nk, Mark::Owned(region));
                        work.push((hp, nk));
                    }
                }
            }
        }
    }
}

///
/// # Region Base Trait
///
/// The accessors every region variant shares: canonical anchor point,
/// anchor plane, and member-tile count. Dispatched from the [Region] enum
/// to its variants by [enum_dispatch].
///
#[enum_dispatch]
pub trait RegionBase {
    /// Canonical anchor: the lowest-leftmost lower-left corner on the
    /// lowest plane visited
    fn anchor(&self) -> Point;
    /// Plane of the anchor
    fn plane(&self) -> PlaneId;
    /// Member-tile count
    fn ntiles(&self) -> usize;
}

///
/// # Region Enumeration
///
/// A traced connected component, in one of its three concrete flavors:
/// an electrical node, a candidate device, or a label-carrier used by the
/// naming passes.
///
#[enum_dispatch(RegionBase)]
#[derive(Debug, Clone)]
pub enum Region {
    Node(NodeRegion),
    Trans(TransRegion),
    Lab(LabRegion),
}

/// # Label-Carrier Region
///
/// The lightest region flavor: just the shared header plus the indices of
/// the labels found attached, used by the unique-naming pass.
#[derive(Debug, Clone)]
pub struct LabRegion {
    pub anchor: Point,
    pub plane: PlaneId,
    pub ntiles: usize,
    /// Indices into the def's label list
    pub labels: Vec<usize>,
}
impl LabRegion {
    pub fn new(anchor: Point, plane: PlaneId) -> Self {
        Self {
            anchor,
            plane,
            ntiles: 0,
            labels: Vec::new(),
        }
    }
    /// Fold tile (`plane`, lower-left `ll`) into the region header,
    /// keeping the anchor canonical under any discovery order.
    pub fn absorb(&mut self, plane: PlaneId, ll: Point) {
        self.ntiles += 1;
        if (plane, ll.x, ll.y) < (self.plane, self.anchor.x, self.anchor.y) {
            self.plane = plane;
            self.anchor = ll;
        }
    }
}
impl RegionBase for LabRegion {
    fn anchor(&self) -> Point {
        self.anchor
    }
    fn plane(&self) -> PlaneId {
        self.plane
    }
    fn ntiles(&self) -> usize {
        self.ntiles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::CellDef;
    use crate::geom::Rect;
    use crate::tech::TechStyle;

    /// Minimal observer collecting [LabRegion]s
    struct LabObserver {
        regions: Vec<LabRegion>,
    }
    impl RegionObserver for LabObserver {
        fn on_first(&mut self, def: &CellDef, plane: PlaneId, key: TileKey) -> RegionId {
            let ll = def.planes[plane].tile(key).area.p0;
            self.regions.push(LabRegion::new(ll, plane));
            self.regions.len() - 1
        }
        fn on_each(&mut self, def: &CellDef, plane: PlaneId, key: TileKey, region: RegionId) {
            let ll = def.planes[plane].tile(key).area.p0;
            self.regions[region].absorb(plane, ll);
        }
    }

    fn trace(def: &CellDef) -> Vec<LabRegion> {
        let style = TechStyle::sample();
        let mut obs = LabObserver {
            regions: Vec::new(),
        };
        let mut marks = TileMarks::new(def.planes.len());
        let connect = electrical_connects(style);
        find_regions(style, def, None, &style.conducting, &connect, &mut obs, &mut marks);
        obs.regions
    }

    #[test]
    fn connected_components() {
        let style = TechStyle::sample();
        let poly = style.type_named("poly").unwrap();
        let m1 = style.type_named("metal1").unwrap();
        let pc = style.type_named("polycont").unwrap();
        let mut def = CellDef::new("t", style);

        // One connected chain: poly - contact - metal
        def.paint(style, Rect::from_coords(0, 0, 10, 2), poly);
        def.paint(style, Rect::from_coords(10, 0, 14, 2), pc);
        def.paint(style, Rect::from_coords(10, 0, 14, 2), m1);
        // And one disjoint poly strip
        def.paint(style, Rect::from_coords(0, 10, 10, 12), poly);

        let regions = trace(&def);
        assert_eq!(regions.len(), 2);
        let total: usize = regions.iter().map(|r| r.ntiles()).sum();
        assert_eq!(total, 4);
        // The chain anchors at the poly strip's lower-left
        assert_eq!(regions[0].anchor(), Point::new(0, 0));
        assert_eq!(regions[0].ntiles(), 3);
    }

    #[test]
    fn trace_is_idempotent() {
        let style = TechStyle::sample();
        let poly = style.type_named("poly").unwrap();
        let ndiff = style.type_named("ndiff").unwrap();
        let mut def = CellDef::new("t", style);
        def.paint(style, Rect::from_coords(0, 0, 4, 4), poly);
        def.paint(style, Rect::from_coords(0, 8, 4, 12), ndiff);
        def.paint(style, Rect::from_coords(4, 8, 8, 12), ndiff);

        // Two traces over unmodified geometry, marks reset between:
        // identical counts and anchors
        let first = trace(&def);
        let second = trace(&def);
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.anchor(), b.anchor());
            assert_eq!(a.ntiles(), b.ntiles());
        }
    }

    #[test]
    fn marks_partition_tiles() {
        let style = TechStyle::sample();
        let poly = style.type_named("poly").unwrap();
        let mut def = CellDef::new("t", style);
        let a = def.paint(style, Rect::from_coords(0, 0, 4, 4), poly);
        let b = def.paint(style, Rect::from_coords(4, 0, 8, 4), poly);
        let c = def.paint(style, Rect::from_coords(20, 0, 24, 4), poly);

        let mut obs = LabObserver {
            regions: Vec::new(),
        };
        let mut marks = TileMarks::new(def.planes.len());
        let connect = electrical_connects(style);
        find_regions(style, &def, None, &style.conducting, &connect, &mut obs, &mut marks);

        let p = style.types[poly].plane;
        assert_eq!(marks.owner(p, a), marks.owner(p, b));
        assert_ne!(marks.owner(p, a), marks.owner(p, c));
        assert!(marks.owner(p, a).is_some());
    }
}
