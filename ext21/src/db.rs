//!
//! # Tile-Database Interface Module
//!
//! The slice of a layout database the extraction passes consume:
//! cell definitions holding per-plane tile sets and labels,
//! cell uses (instances, optionally arrayed) with integer transforms,
//! and the handful of spatial queries the passes are built on -
//! masked area search, point lookup, and neighbor enumeration along a
//! tile side.
//!
//! This is an *interface stand-in*, not a production spatial index:
//! queries are linear scans over each plane's tile arena. The passes only
//! depend on the query contract, so a stitched or tree-indexed plane can
//! replace this module wholesale.
//!

// Crates.io
use chrono::Utc;
use slotmap::{new_key_type, SlotMap};

// Local Imports
use crate::error::ExtResult;
use crate::geom::{Int, Point, Rect, Side, Transform};
use crate::tech::{PlaneId, TechStyle, TypeId, TypeMask};
use ext21utils::{Ptr, PtrList};

new_key_type! {
    /// Keys for [Tile] entries within one [Plane]'s arena.
    /// Traversal passes use these as side-table identities,
    /// so tiles themselves carry no mutable marking state.
    pub struct TileKey;
}

/// Which diagonal half of its rectangle a split tile's material occupies,
/// named by the corner the right angle sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagSide {
    NE,
    NW,
    SE,
    SW,
}

/// # Tile
///
/// A rectangle of a single material type. Split tiles carry a [DiagSide]
/// and hold material in only half their rectangle.
#[derive(Debug, Clone)]
pub struct Tile {
    pub area: Rect,
    pub typ: TypeId,
    pub diag: Option<DiagSide>,
}
impl Tile {
    /// Boolean indication of whether this is a split (half-rectangle) tile
    pub fn is_split(&self) -> bool {
        self.diag.is_some()
    }
    /// Material area in square lambda: the full rectangle,
    /// or half of it for split tiles.
    pub fn material_area(&self) -> f64 {
        let a = self.area.area() as f64;
        if self.is_split() {
            a / 2.0
        } else {
            a
        }
    }
    /// Euclidean length of the diagonal edge, for split tiles
    pub fn diag_len(&self) -> f64 {
        let w = self.area.width() as f64;
        let h = self.area.height() as f64;
        (w * w + h * h).sqrt()
    }
}

/// # Boundary Segment
///
/// One maximal segment of a tile's perimeter facing a single neighbor
/// (or empty space), produced by [Plane::boundaries].
#[derive(Debug, Clone)]
pub struct Boundary {
    /// Which side of the inside tile this segment lies on
    pub side: Side,
    /// The zero-thickness rectangle covering the segment
    pub seg: Rect,
    /// Segment length
    pub len: Int,
    /// The neighboring tile, or `None` for empty space
    pub outside: Option<TileKey>,
}

/// # Tile Plane
///
/// One plane's set of tiles, keyed by [TileKey].
#[derive(Debug, Clone, Default)]
pub struct Plane {
    pub tiles: SlotMap<TileKey, Tile>,
}
impl Plane {
    pub fn new() -> Self {
        Self::default()
    }
    /// Add a full tile of `typ` covering `area`
    pub fn paint(&mut self, area: Rect, typ: TypeId) -> TileKey {
        self.tiles.insert(Tile {
            area,
            typ,
            diag: None,
        })
    }
    /// Add a split (half-rectangle) tile
    pub fn paint_split(&mut self, area: Rect, typ: TypeId, diag: DiagSide) -> TileKey {
        self.tiles.insert(Tile {
            area,
            typ,
            diag: Some(diag),
        })
    }
    /// Get a reference to tile `key`. Panics on stale keys, which indicate
    /// a torn-down plane being queried.
    pub fn tile(&self, key: TileKey) -> &Tile {
        &self.tiles[key]
    }
    /// Area search: every tile of a type in `mask` whose interior overlaps
    /// `area`. Results are ordered by lower-left corner (bottom-most, then
    /// left-most) for deterministic traversal seeding.
    pub fn search(&self, area: &Rect, mask: &TypeMask) -> Vec<TileKey> {
        let mut found: Vec<TileKey> = self
            .tiles
            .iter()
            .filter(|(_k, t)| mask.contains(t.typ) && t.area.overlaps(area))
            .map(|(k, _t)| k)
            .collect();
        found.sort_by_key(|k| (self.tiles[*k].area.p0.y, self.tiles[*k].area.p0.x));
        found
    }
    /// Point lookup: the first tile of a type in `mask` containing `pt`
    /// (boundary-inclusive).
    pub fn search_point(&self, pt: &Point, mask: &TypeMask) -> Option<TileKey> {
        let mut found: Vec<TileKey> = self
            .tiles
            .iter()
            .filter(|(_k, t)| mask.contains(t.typ) && t.area.contains(pt))
            .map(|(k, _t)| k)
            .collect();
        found.sort_by_key(|k| (self.tiles[*k].area.p0.y, self.tiles[*k].area.p0.x));
        found.into_iter().next()
    }
    /// Enumerate the tiles abutting `key` along `side`, i.e. sharing a
    /// positive-length boundary segment there.
    pub fn find_neighbors(&self, key: TileKey, side: Side) -> Vec<TileKey> {
        self.boundaries_side(key, side)
            .into_iter()
            .filter_map(|b| b.outside)
            .collect()
    }
    /// Produce every boundary segment of tile `key`, all four sides,
    /// in perimeter-walk order. Portions of the perimeter with no abutting
    /// tile are reported with `outside: None`.
    pub fn boundaries(&self, key: TileKey) -> Vec<Boundary> {
        let mut out = Vec::new();
        for side in Side::ALL {
            out.extend(self.boundaries_side(key, side));
        }
        out
    }
    /// Boundary segments along one side of tile `key`
    pub fn boundaries_side(&self, key: TileKey, side: Side) -> Vec<Boundary> {
        let tile = &self.tiles[key];
        let line = tile.area.side_line(side);
        let (lo, hi) = tile.area.side_span(side);
        if lo >= hi {
            return Vec::new();
        }
        // Collect abutting neighbor intervals along this side
        let mut covered: Vec<(Int, Int, TileKey)> = Vec::new();
        for (nk, nt) in self.tiles.iter() {
            if nk == key {
                continue;
            }
            // The neighbor must sit on the far side of our boundary line
            let facing = nt.area.side_line(side.opposite());
            if facing != line {
                continue;
            }
            let (nlo, nhi) = nt.area.side_span(side);
            let (slo, shi) = (nlo.max(lo), nhi.min(hi));
            if slo < shi {
                covered.push((slo, shi, nk));
            }
        }
        covered.sort_by_key(|c| c.0);
        // Emit neighbor segments, with space segments filling the gaps
        let mut out = Vec::new();
        let mut pos = lo;
        for (slo, shi, nk) in covered {
            if slo > pos {
                out.push(self.boundary_at(side, line, pos, slo, None));
            }
            out.push(self.boundary_at(side, line, slo, shi, Some(nk)));
            pos = pos.max(shi);
        }
        if pos < hi {
            out.push(self.boundary_at(side, line, pos, hi, None));
        }
        out
    }
    fn boundary_at(
        &self,
        side: Side,
        line: Int,
        lo: Int,
        hi: Int,
        outside: Option<TileKey>,
    ) -> Boundary {
        let seg = if side.is_horizontal() {
            Rect::from_coords(lo, line, hi, line)
        } else {
            Rect::from_coords(line, lo, line, hi)
        };
        Boundary {
            side,
            seg,
            len: hi - lo,
            outside,
        }
    }
}

/// Label classification, decoded from the text's trailing sigil:
/// `@` gate attribute, `$` terminal attribute, `^` node attribute,
/// anything else a node name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    /// A node name (no sigil)
    Name,
    /// Gate attribute (`@`)
    GateAttr,
    /// Terminal attribute (`$`)
    TermAttr,
    /// Node attribute (`^`)
    NodeAttr,
}
impl LabelKind {
    /// Decode `text`, returning its kind and the text with any sigil stripped
    pub fn decode(text: &str) -> (LabelKind, &str) {
        match text.chars().last() {
            Some('@') => (LabelKind::GateAttr, &text[..text.len() - 1]),
            Some('$') => (LabelKind::TermAttr, &text[..text.len() - 1]),
            Some('^') => (LabelKind::NodeAttr, &text[..text.len() - 1]),
            _ => (LabelKind::Name, text),
        }
    }
}

/// # Label
///
/// A name or attribute string attached to layout at a point or rectangle.
#[derive(Debug, Clone)]
pub struct Label {
    /// Label text, sigil stripped
    pub text: String,
    pub kind: LabelKind,
    /// Port number, for port-attributed labels
    pub port: Option<u32>,
    /// Attachment location (often a degenerate, point-sized rectangle)
    pub area: Rect,
    pub plane: PlaneId,
    /// Material type the label attaches to
    pub typ: TypeId,
}
impl Label {
    /// Create a new [Label] at `area`, decoding any trailing sigil in `text`
    pub fn new(text: impl Into<String>, area: Rect, plane: PlaneId, typ: TypeId) -> Self {
        let text = text.into();
        let (kind, stripped) = LabelKind::decode(&text);
        Self {
            text: stripped.to_string(),
            kind,
            port: None,
            area,
            plane,
            typ,
        }
    }
    /// Builder-style port-number attachment. Consumes and returns `self`.
    pub fn with_port(mut self, port: u32) -> Self {
        self.port = Some(port);
        self
    }
}

/// # Array Extents
///
/// Array parameters of an arrayed [CellUse]: inclusive index ranges and
/// center-to-center separations, per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArraySpec {
    pub xlo: Int,
    pub xhi: Int,
    pub xsep: Int,
    pub ylo: Int,
    pub yhi: Int,
    pub ysep: Int,
}
impl ArraySpec {
    /// Iterate over every (xi, yi) element index pair
    pub fn elements(&self) -> impl Iterator<Item = (Int, Int)> {
        let (xlo, xhi, ylo, yhi) = (self.xlo, self.xhi, self.ylo, self.yhi);
        (ylo..=yhi).flat_map(move |yi| (xlo..=xhi).map(move |xi| (xi, yi)))
    }
}

/// # Cell Use
///
/// An instance of another [CellDef], placed by an integer [Transform] and
/// optionally arrayed.
#[derive(Debug, Clone)]
pub struct CellUse {
    /// Use identifier, unique within the parent
    pub use_id: String,
    /// Instantiated cell definition
    pub cell: Ptr<CellDef>,
    pub transform: Transform,
    pub array: Option<ArraySpec>,
}
impl CellUse {
    pub fn new(use_id: impl Into<String>, cell: Ptr<CellDef>, transform: Transform) -> Self {
        Self {
            use_id: use_id.into(),
            cell,
            transform,
            array: None,
        }
    }
    /// The placement transform of array element (xi, yi):
    /// the use transform cascaded onto the element's array offset.
    pub fn element_transform(&self, xi: Int, yi: Int) -> Transform {
        match &self.array {
            None => self.transform,
            Some(a) => Transform::cascade(
                &self.transform,
                &Transform::translate(xi * a.xsep, yi * a.ysep),
            ),
        }
    }
}

/// # Cell Definition
///
/// A named cell: per-plane tile sets, labels, child uses, and the
/// modification timestamp consulted by incremental re-extraction.
#[derive(Debug, Clone)]
pub struct CellDef {
    pub name: String,
    /// Last-modification time, seconds since the epoch
    pub timestamp: i64,
    pub planes: Vec<Plane>,
    pub labels: Vec<Label>,
    pub uses: Vec<CellUse>,
    /// Optional parameter string, passed through to the output header
    pub parameters: Option<String>,
}
impl CellDef {
    /// Create a new, empty [CellDef] named `name`, with one [Plane] per
    /// plane of `style`, stamped with the current time.
    pub fn new(name: impl Into<String>, style: &TechStyle) -> Self {
        Self {
            name: name.into(),
            timestamp: Utc::now().timestamp(),
            planes: (0..style.planes.len()).map(|_| Plane::new()).collect(),
            labels: Vec::new(),
            uses: Vec::new(),
            parameters: None,
        }
    }
    /// Paint a tile of `typ` covering `area`, on the type's home plane
    pub fn paint(&mut self, style: &TechStyle, area: Rect, typ: TypeId) -> TileKey {
        self.planes[style.types[typ].plane].paint(area, typ)
    }
    /// Paint a split tile of `typ`
    pub fn paint_split(
        &mut self,
        style: &TechStyle,
        area: Rect,
        typ: TypeId,
        diag: DiagSide,
    ) -> TileKey {
        self.planes[style.types[typ].plane].paint_split(area, typ, diag)
    }
    /// Attach a label to material of `typ` at `area`
    pub fn add_label(
        &mut self,
        style: &TechStyle,
        text: impl Into<String>,
        area: Rect,
        typ: TypeId,
    ) {
        let plane = style.types[typ].plane;
        self.labels.push(Label::new(text, area, plane, typ));
    }
    /// Bump the modification timestamp to now
    pub fn touch(&mut self) {
        self.timestamp = Utc::now().timestamp();
    }
    /// Bounding box of this def's own paint, child uses excluded
    pub fn bbox_local(&self) -> Rect {
        let mut bbox = Rect::empty();
        for plane in &self.planes {
            for (_k, t) in plane.tiles.iter() {
                bbox = bbox.union(&t.area);
            }
        }
        bbox
    }
    /// Bounding box including child uses, each array element included
    pub fn bbox(&self) -> ExtResult<Rect> {
        let mut bbox = self.bbox_local();
        for u in &self.uses {
            let child = u.cell.read()?.bbox()?;
            if child.is_empty() {
                continue;
            }
            match &u.array {
                None => bbox = bbox.union(&child.transform(&u.transform)),
                Some(a) => {
                    for (xi, yi) in a.elements() {
                        bbox = bbox.union(&child.transform(&u.element_transform(xi, yi)));
                    }
                }
            }
        }
        Ok(bbox)
    }
}

/// # Cell Library
///
/// A collection of cell definitions. Parent-child relationships are
/// derived from uses on demand, keeping the def graph free of cycles of
/// strong references.
#[derive(Debug, Clone, Default)]
pub struct Library {
    pub name: String,
    pub defs: PtrList<CellDef>,
}
impl Library {
    /// Create a new and empty Library
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            defs: PtrList::new(),
        }
    }
    /// Add a definition, returning its shared pointer
    pub fn add(&mut self, def: CellDef) -> Ptr<CellDef> {
        self.defs.add(def)
    }
    /// Find a definition by name
    pub fn find(&self, name: &str) -> ExtResult<Option<Ptr<CellDef>>> {
        for d in self.defs.iter() {
            if d.read()?.name == name {
                return Ok(Some(d.clone()));
            }
        }
        Ok(None)
    }
    /// Every definition which places `def`, directly
    pub fn parents_of(&self, def: &Ptr<CellDef>) -> ExtResult<Vec<Ptr<CellDef>>> {
        let mut parents = Vec::new();
        for d in self.defs.iter() {
            if d == def {
                continue;
            }
            let has = d.read()?.uses.iter().any(|u| &u.cell == def);
            if has {
                parents.push(d.clone());
            }
        }
        Ok(parents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tech::TechStyle;

    #[test]
    fn paint_and_search() {
        let style = TechStyle::sample();
        let poly = style.type_named("poly").unwrap();
        let mut def = CellDef::new("t", style);
        def.paint(style, Rect::from_coords(0, 0, 10, 2), poly);
        def.paint(style, Rect::from_coords(20, 0, 30, 2), poly);

        let plane = &def.planes[style.types[poly].plane];
        let hits = plane.search(&Rect::from_coords(5, 0, 25, 2), &TypeMask::of(poly));
        assert_eq!(hits.len(), 2);
        // Interior overlap only: an abutting search area finds nothing
        let hits = plane.search(&Rect::from_coords(10, 0, 20, 2), &TypeMask::of(poly));
        assert!(hits.is_empty());
    }

    #[test]
    fn neighbors_and_boundaries() {
        let style = TechStyle::sample();
        let poly = style.type_named("poly").unwrap();
        let ndiff = style.type_named("ndiff").unwrap();
        let mut def = CellDef::new("t", style);
        let a = def.paint(style, Rect::from_coords(0, 0, 4, 4), poly);
        let _b = def.paint(style, Rect::from_coords(4, 1, 8, 3), ndiff);

        let plane = &def.planes[style.types[poly].plane];
        let right = plane.boundaries_side(a, Side::Right);
        // Space below, neighbor in the middle, space above
        assert_eq!(right.len(), 3);
        assert!(right[0].outside.is_none());
        assert_eq!(right[0].len, 1);
        assert!(right[1].outside.is_some());
        assert_eq!(right[1].len, 2);
        assert!(right[2].outside.is_none());

        assert_eq!(plane.find_neighbors(a, Side::Right).len(), 1);
        assert!(plane.find_neighbors(a, Side::Left).is_empty());
    }

    #[test]
    fn label_sigils() {
        assert_eq!(LabelKind::decode("out"), (LabelKind::Name, "out"));
        assert_eq!(LabelKind::decode("fast@"), (LabelKind::GateAttr, "fast"));
        assert_eq!(LabelKind::decode("south$"), (LabelKind::TermAttr, "south"));
        assert_eq!(LabelKind::decode("noisy^"), (LabelKind::NodeAttr, "noisy"));
    }
}
