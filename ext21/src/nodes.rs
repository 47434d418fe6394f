//!
//! # Node Finder Module
//!
//! The specialized region trace building electrical-node regions:
//! one [NodeRegion] per equipotential, with capacitance accumulated from
//! tile areas and boundary perimeters, and per-class resistance sums
//! folded in through the lazy one-node-lookback scheme of [crate::resist].
//!
//! A first pass locates the implicit global substrate node, when the
//! style defines one, seeding from any substrate-typed tile and falling
//! back to a synthetic, degenerate node anchored at minus-infinity.
//! Either way, the substrate node always exists (and is always first)
//! when the technology requires one.
//!

// Local Imports
use crate::db::{CellDef, Label, TileKey};
use crate::geom::{Point, Rect, NINFINITY};
use crate::region::{self, RegionBase, RegionId, RegionObserver, TileMarks};
use crate::resist::{set_resist, ResistAccum};
use crate::tech::{PlaneId, TechStyle, TypeId};

/// # Electrical-Node Region
///
/// One maximal set of electrically-connected tiles, with its accumulated
/// parasitics and attached labels.
#[derive(Debug, Clone)]
pub struct NodeRegion {
    /// Canonical anchor: lowest-leftmost lower-left corner on the lowest plane
    pub anchor: Point,
    pub plane: PlaneId,
    /// Material type at the anchor, naming the node's output record
    pub typ: TypeId,
    pub ntiles: usize,
    /// Accumulated capacitance to substrate, attofarads
    pub cap: f64,
    /// Accumulated resistance, ohms
    pub resist: f64,
    /// Finalized per-class (area, perimeter) sums, for the output record
    pub class_sums: Vec<(i64, i64)>,
    /// Labels found attached to this node's tiles
    pub labels: Vec<Label>,
    /// Whether this is the designated global substrate node
    pub substrate: bool,
}
impl NodeRegion {
    /// Create a new, empty node anchored at (`anchor`, `plane`, `typ`)
    pub fn new_at(anchor: Point, plane: PlaneId, typ: TypeId, style: &TechStyle) -> Self {
        Self {
            anchor,
            plane,
            typ,
            ntiles: 0,
            cap: 0.0,
            resist: 0.0,
            class_sums: vec![(0, 0); style.resist_classes.len()],
            labels: Vec::new(),
            substrate: false,
        }
    }
    /// Fold a member tile's (plane, lower-left, type) into the header,
    /// keeping the anchor canonical under any discovery order.
    pub fn absorb(&mut self, plane: PlaneId, ll: Point, typ: TypeId) {
        self.ntiles += 1;
        if (plane, ll.x, ll.y) < (self.plane, self.anchor.x, self.anchor.y) {
            self.plane = plane;
            self.anchor = ll;
            self.typ = typ;
        }
    }
    /// The node's output name: the substrate's global name for the
    /// substrate node, else the first name-label, else a generated
    /// `<short>_<x>_<y>#` from the canonical anchor.
    pub fn name(&self, style: &TechStyle) -> String {
        if self.substrate {
            if let Some(sub) = &style.substrate {
                return sub.node_name.clone();
            }
        }
        for lab in &self.labels {
            if lab.kind == crate::db::LabelKind::Name {
                return lab.text.clone();
            }
        }
        format!(
            "{}_{}_{}#",
            style.types[self.typ].short,
            fmt_coord(self.anchor.x),
            fmt_coord(self.anchor.y),
        )
    }
}
impl RegionBase for NodeRegion {
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

/// Render a coordinate for a generated node name.
/// Negative values take an `n` prefix rather than a minus sign.
fn fmt_coord(v: isize) -> String {
    if v < 0 {
        format!("n{}", -v)
    } else {
        format!("{}", v)
    }
}

/// # Node-Finding Results
///
/// The node list plus the tile marks mapping every swept tile back to its
/// owning node - consumed by the device analyzer, the naming passes, and
/// the writer.
#[derive(Debug)]
pub struct ExtractedNodes {
    pub nodes: Vec<NodeRegion>,
    pub marks: TileMarks,
}
impl ExtractedNodes {
    /// Look up the node owning tile (`plane`, `key`), if any
    pub fn node_of(&self, plane: PlaneId, key: TileKey) -> Option<RegionId> {
        self.marks.owner(plane, key)
    }
}

/// # Node Observer
///
/// The [RegionObserver] accumulating per-node capacitance and per-class
/// resistance sums during the trace.
struct NodeObserver<'s> {
    style: &'s TechStyle,
    nodes: Vec<NodeRegion>,
    accum: ResistAccum,
    resist_wanted: bool,
}
impl<'s> NodeObserver<'s> {
    /// Lazily finalize the previous node's resistance. Called as each new
    /// region starts, and once more after the sweep completes.
    fn finalize_last(&mut self) {
        if !self.resist_wanted {
            return;
        }
        if let Some(prev) = self.nodes.last_mut() {
            set_resist(prev, &mut self.accum, self.style);
        }
    }
}
impl<'s> RegionObserver for NodeObserver<'s> {
    fn on_first(&mut self, def: &CellDef, plane: PlaneId, key: TileKey) -> RegionId {
        self.finalize_last();
        let tile = def.planes[plane].tile(key);
        self.nodes
            .push(NodeRegion::new_at(tile.area.p0, plane, tile.typ, self.style));
        self.nodes.len() - 1
    }
    fn on_each(&mut self, def: &CellDef, plane: PlaneId, key: TileKey, region: RegionId) {
        let style = self.style;
        let tile = def.planes[plane].tile(key).clone();
        let typ = tile.typ;
        let node = &mut self.nodes[region];
        node.absorb(plane, tile.area.p0, typ);

        // Area term: tile area (half for split tiles) times the type's
        // area capacitance
        node.cap += tile.material_area() * style.types[typ].area_cap;
        let class = style.types[typ].resist_class;
        if self.resist_wanted {
            if let Some(c) = class {
                self.accum.add_area(c, tile.material_area());
            }
        }

        // Perimeter terms, one per boundary segment against anything this
        // type does not connect to (space included)
        for b in def.planes[plane].boundaries(key) {
            let outside = b.outside.map(|nk| def.planes[plane].tile(nk).typ);
            let connected = match outside {
                Some(o) => style.connects(typ, o),
                None => false,
            };
            if connected {
                continue;
            }
            node.cap += b.len as f64 * style.perim_cap(typ, outside);
            if self.resist_wanted {
                if let Some(c) = class {
                    self.accum.add_perim(c, b.len as f64);
                }
            }
        }
        // The diagonal edge of a split tile: Euclidean length on the
        // tile's bounding box, counted against space
        if tile.is_split() {
            node.cap += tile.diag_len() * style.perim_cap(typ, None);
            if self.resist_wanted {
                if let Some(c) = class {
                    self.accum.add_perim(c, tile.diag_len());
                }
            }
        }
    }
}

/// Find every electrical node of `def`, optionally clipped to `clip`.
///
/// When `resist_wanted` is set, per-class resistance sums are gathered
/// and folded into each node; otherwise only capacitance accumulates.
pub fn find_nodes(
    style: &TechStyle,
    def: &CellDef,
    clip: Option<&Rect>,
    resist_wanted: bool,
) -> ExtractedNodes {
    let mut obs = NodeObserver {
        style,
        nodes: Vec::new(),
        accum: ResistAccum::new(style.resist_classes.len()),
        resist_wanted,
    };
    let mut marks = TileMarks::new(def.planes.len());
    let connect = region::electrical_connects(style);

    // Substrate first pass: seed from any substrate-typed tile, or
    // synthesize a degenerate node so the substrate always exists.
    if let Some(sub) = &style.substrate {
        let mut seeded = false;
        'planes: for plane in 0..def.planes.len() {
            let seeds = match clip {
                Some(a) => def.planes[plane].search(a, &sub.types),
                None => {
                    let mut all: Vec<TileKey> = def.planes[plane]
                        .tiles
                        .iter()
                        .filter(|(_k, t)| sub.types.contains(t.typ))
                        .map(|(k, _t)| k)
                        .collect();
                    all.sort_by_key(|k| {
                        let r = &def.planes[plane].tiles[*k].area;
                        (r.p0.y, r.p0.x)
                    });
                    all
                }
            };
            if let Some(&seed) = seeds.first() {
                let rid = obs.on_first(def, plane, seed);
                obs.nodes[rid].substrate = true;
                region::expand(style, def, plane, seed, rid, &connect, &mut obs, &mut marks);
                seeded = true;
                break 'planes;
            }
        }
        if !seeded {
            let mut node = NodeRegion::new_at(Point::new(NINFINITY, NINFINITY), 0, 0, style);
            node.substrate = true;
            obs.nodes.push(node);
        }
    }

    // Main pass over every conducting type
    region::find_regions(style, def, clip, &style.conducting, &connect, &mut obs, &mut marks);
    obs.finalize_last();

    // Attach labels through the marks
    let mut nodes = obs.nodes;
    for lab in def.labels.iter() {
        let plane = &def.planes[lab.plane];
        let key = plane.search_point(&lab.area.p0, &crate::tech::TypeMask::of(lab.typ));
        if let Some(key) = key {
            if let Some(rid) = marks.owner(lab.plane, key) {
                nodes[rid].labels.push(lab.clone());
            }
        }
    }
    ExtractedNodes { nodes, marks }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Rect;

    #[test]
    fn substrate_fallback() {
        let style = TechStyle::sample();
        let def = CellDef::new("empty", style);
        let found = find_nodes(style, &def, None, true);
        // No geometry at all still yields the synthetic substrate node
        assert_eq!(found.nodes.len(), 1);
        assert!(found.nodes[0].substrate);
        assert_eq!(found.nodes[0].anchor.x, NINFINITY);
        assert_eq!(found.nodes[0].name(style), "Gnd!");
    }

    #[test]
    fn single_rect_accumulation() {
        let style = TechStyle::sample();
        let poly = style.type_named("poly").unwrap();
        let mut def = CellDef::new("t", style);
        def.paint(style, Rect::from_coords(0, 0, 10, 2), poly);

        let found = find_nodes(style, &def, None, true);
        // Substrate (synthetic) plus the poly strip
        assert_eq!(found.nodes.len(), 2);
        let n = &found.nodes[1];
        assert_eq!(n.ntiles, 1);
        // 20 sq-lambda of area cap plus 24 lambda of perimeter cap
        let expect = 20.0 * 0.065 + 24.0 * 0.04;
        assert!((n.cap - expect).abs() < 1e-9);
        // One 10x2 rectangle: 5 squares of poly
        assert_eq!(n.class_sums[0], (20, 24));
        assert!((n.resist - 5.0 * 48.0).abs() < 1e-9);
        assert_eq!(n.name(style), "p_0_0#");
    }

    #[test]
    fn split_tile_accumulation() {
        use crate::db::DiagSide;
        let style = TechStyle::sample();
        let poly = style.type_named("poly").unwrap();
        let mut def = CellDef::new("t", style);
        // The NE half of a 3x4 rectangle: half the area, plus a
        // 3-4-5 hypotenuse counted by Euclidean length against space
        def.paint_split(style, Rect::from_coords(0, 0, 3, 4), poly, DiagSide::NE);

        let found = find_nodes(style, &def, None, true);
        let n = found.nodes.last().unwrap();
        let expect = 6.0 * 0.065 + 14.0 * 0.04 + 5.0 * 0.04;
        assert!((n.cap - expect).abs() < 1e-9);
        assert_eq!(n.class_sums[0], (6, 19));
    }

    #[test]
    fn contact_merges_planes() {
        let style = TechStyle::sample();
        let poly = style.type_named("poly").unwrap();
        let pc = style.type_named("polycont").unwrap();
        let m1 = style.type_named("metal1").unwrap();
        let mut def = CellDef::new("t", style);
        def.paint(style, Rect::from_coords(0, 0, 4, 2), poly);
        def.paint(style, Rect::from_coords(4, 0, 8, 2), pc);
        def.paint(style, Rect::from_coords(4, 0, 20, 2), m1);

        let found = find_nodes(style, &def, None, false);
        // Substrate plus one merged poly/contact/metal node
        assert_eq!(found.nodes.len(), 2);
        assert_eq!(found.nodes[1].ntiles, 3);
    }

    #[test]
    fn halo_merges_well_diffusion() {
        let style = TechStyle::sample();
        let pwell = style.type_named("pwell").unwrap();
        let psd = style.type_named("psd").unwrap();
        let mut def = CellDef::new("t", style);
        // Substrate diffusion sitting over the well, on a different plane:
        // connected without a contact, through the halo search
        def.paint(style, Rect::from_coords(0, 0, 20, 20), pwell);
        def.paint(style, Rect::from_coords(5, 5, 10, 10), psd);

        let found = find_nodes(style, &def, None, false);
        assert_eq!(found.nodes.len(), 1);
        let n = &found.nodes[0];
        assert!(n.substrate);
        assert_eq!(n.ntiles, 2);
        assert_eq!(n.name(style), "Gnd!");
    }

    #[test]
    fn labels_attach() {
        let style = TechStyle::sample();
        let m1 = style.type_named("metal1").unwrap();
        let mut def = CellDef::new("t", style);
        def.paint(style, Rect::from_coords(0, 0, 10, 2), m1);
        def.add_label(style, "out", Rect::from_coords(1, 1, 1, 1), m1);
        def.add_label(style, "noisy^", Rect::from_coords(2, 1, 2, 1), m1);

        let found = find_nodes(style, &def, None, false);
        let n = found.nodes.last().unwrap();
        assert_eq!(n.labels.len(), 2);
        assert_eq!(n.name(style), "out");
    }
}
