//!
//! # Device Analyzer Module
//!
//! Per-device terminal identification, geometric parameter computation,
//! and output-record construction for every candidate device region found
//! in a cell.
//!
//! Device candidates are traced with the *device* connectivity table
//! (gate types connect only within their own template), then each
//! candidate's perimeter is re-walked and classified edge-by-edge against
//! the template's terminal masks. Simple rectangular devices get their
//! length and width straight from the perimeter accounting; annular and
//! other non-rectangular devices go through the boundary survey of
//! [compute_effective_lw].
//!
//! Throughout, trouble degrades rather than fails: missing terminals are
//! repaired by cloning, split substrates and odd terminal counts warn and
//! continue, and every device that can be parameterized is emitted.
//!

// Local Imports
use crate::db::{CellDef, Label, LabelKind, TileKey};
use crate::error::{ExtContext, WarnKind};
use crate::geom::{Int, Point, Rect, Side};
use crate::nodes::ExtractedNodes;
use crate::region::{self, RegionBase, RegionId, RegionObserver, TileMarks};
use crate::tech::{DeviceKind, PlaneId, TechStyle, TypeId, TypeMask};

/// # Candidate-Device Region
///
/// One connected component of device-identifying (gate/body) tiles,
/// anchored at its lowest-leftmost tile.
#[derive(Debug, Clone)]
pub struct TransRegion {
    pub anchor: Point,
    pub plane: PlaneId,
    /// Gate type at the anchor
    pub typ: TypeId,
    pub ntiles: usize,
    /// Recognized device template index
    pub template: usize,
    /// Member tiles, for the perimeter re-walk
    pub tiles: Vec<(PlaneId, TileKey)>,
    /// Accumulated gate area, square lambda
    pub area: f64,
}
impl RegionBase for TransRegion {
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

/// Observer collecting [TransRegion]s during the device trace
struct TransObserver<'s> {
    style: &'s TechStyle,
    regions: Vec<TransRegion>,
}
impl<'s> RegionObserver for TransObserver<'s> {
    fn on_first(&mut self, def: &CellDef, plane: PlaneId, key: TileKey) -> RegionId {
        let tile = def.planes[plane].tile(key);
        // Seeds are masked to gate types, so the template is always present
        let template = self.style.types[tile.typ].device.unwrap_or(0);
        self.regions.push(TransRegion {
            anchor: tile.area.p0,
            plane,
            typ: tile.typ,
            ntiles: 0,
            template,
            tiles: Vec::new(),
            area: 0.0,
        });
        self.regions.len() - 1
    }
    fn on_each(&mut self, def: &CellDef, plane: PlaneId, key: TileKey, region: RegionId) {
        let tile = def.planes[plane].tile(key);
        let r = &mut self.regions[region];
        r.ntiles += 1;
        if (plane, tile.area.p0.x, tile.area.p0.y) < (r.plane, r.anchor.x, r.anchor.y) {
            r.plane = plane;
            r.anchor = tile.area.p0;
            r.typ = tile.typ;
        }
        r.tiles.push((plane, key));
        r.area += tile.material_area();
    }
}

/// The device-trace connectivity table: each gate type connects only to
/// the gate types of its own template, never across templates and never
/// to its electrical neighbors.
fn device_connects(style: &TechStyle) -> Vec<TypeMask> {
    style
        .types
        .iter()
        .map(|t| match t.device {
            Some(di) => style.devices[di].gate_types,
            None => TypeMask::empty(),
        })
        .collect()
}

/// Trace every candidate-device region in `def`
pub fn find_transistors(style: &TechStyle, def: &CellDef) -> (Vec<TransRegion>, TileMarks) {
    let mut obs = TransObserver {
        style,
        regions: Vec::new(),
    };
    let mut marks = TileMarks::new(def.planes.len());
    let connect = device_connects(style);
    region::find_regions(style, def, None, &style.gate_mask, &connect, &mut obs, &mut marks);
    (obs.regions, marks)
}

/// One direction-tagged boundary-segment rectangle, the unit of the
/// non-rectangular boundary survey. Built per device and fully discarded
/// with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundSeg {
    /// Side of the device tile the segment lies on
    pub side: Side,
    /// Zero-thickness segment rectangle
    pub seg: Rect,
}
impl BoundSeg {
    /// The boundary-line coordinate (x for vertical segments, y for horizontal)
    fn line(&self) -> Int {
        if self.side.is_horizontal() {
            self.seg.p0.y
        } else {
            self.seg.p0.x
        }
    }
    /// The (lo, hi) span along the segment's own axis
    fn span(&self) -> (Int, Int) {
        if self.side.is_horizontal() {
            (self.seg.p0.x, self.seg.p1.x)
        } else {
            (self.seg.p0.y, self.seg.p1.y)
        }
    }
}

/// # Per-Terminal Bookkeeping
///
/// One identified device terminal: its node, the lowest plane touched,
/// canonical position, accumulated edge length, and boundary segments.
#[derive(Debug, Clone)]
pub struct TermInfo {
    pub node: RegionId,
    pub plane: PlaneId,
    pub pos: Point,
    pub len: Int,
    pub segs: Vec<BoundSeg>,
}
impl TermInfo {
    /// Net boundary-traversal vector: the length-weighted sum of outward
    /// side normals. A zero sum means the terminal fully encloses or is
    /// enclosed by the device - the annular case.
    pub fn net_vector(&self) -> Point {
        let mut v = Point::new(0, 0);
        for s in &self.segs {
            let len = s.seg.perim() / 2;
            match s.side {
                Side::Left => v.x -= len,
                Side::Right => v.x += len,
                Side::Bottom => v.y -= len,
                Side::Top => v.y += len,
            }
        }
        v
    }
}

/// A device attribute label, bound to one terminal slot (or to the gate).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevAttr {
    pub text: String,
    /// Terminal index, or `None` for gate attributes
    pub term: Option<usize>,
}

/// Canonicalize terminal order: a stable bubble sort on
/// (plane ascending, x ascending, y ascending), swapping the attribute
/// bindings in lock-step so each attribute follows its terminal.
/// The result depends only on terminal positions, never discovery order.
pub fn sort_terminals(terms: &mut [TermInfo], attrs: &mut [DevAttr]) {
    let key = |t: &TermInfo| (t.plane, t.pos.x, t.pos.y);
    loop {
        let mut swapped = false;
        for i in 1..terms.len() {
            if key(&terms[i - 1]) > key(&terms[i]) {
                terms.swap(i - 1, i);
                for a in attrs.iter_mut() {
                    if a.term == Some(i - 1) {
                        a.term = Some(i);
                    } else if a.term == Some(i) {
                        a.term = Some(i - 1);
                    }
                }
                swapped = true;
            }
        }
        if !swapped {
            break;
        }
    }
}

/// One written terminal block of a device record
#[derive(Debug, Clone, PartialEq)]
pub struct DevTerm {
    pub node: String,
    pub len: i64,
    pub attrs: Vec<String>,
}

/// # Extracted Device Record
///
/// Everything the writer needs for one `fet`/`device` output record.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    pub kind: DeviceKind,
    pub model: Option<String>,
    pub bounds: Rect,
    /// Gate area and perimeter, for legacy `fet` records
    pub area: i64,
    pub perim: i64,
    pub length: i64,
    pub width: i64,
    /// Named parameters appended to the record
    pub params: Vec<(String, f64)>,
    /// Substrate node name
    pub substrate: String,
    pub gate: DevTerm,
    pub terms: Vec<DevTerm>,
}

/// Extract every device of `def`, resolving terminals against the node
/// set of `nodes`. Polls the interrupt flag between devices.
pub fn extract_devices(
    style: &TechStyle,
    def: &CellDef,
    nodes: &ExtractedNodes,
    ctx: &mut ExtContext,
) -> Vec<DeviceRecord> {
    let (regions, _marks) = find_transistors(style, def);
    let mut out = Vec::new();
    for tr in regions.iter() {
        if ctx.interrupted() {
            break;
        }
        if let Some(rec) = extract_one(style, def, nodes, tr, ctx) {
            out.push(rec);
        }
    }
    out
}

/// Locate the tile a label attaches to, by point and type
fn label_tile(def: &CellDef, lab: &Label) -> Option<(PlaneId, TileKey)> {
    def.planes[lab.plane]
        .search_point(&lab.area.p0, &TypeMask::of(lab.typ))
        .map(|k| (lab.plane, k))
}

/// Analyze one candidate device, producing its record.
fn extract_one(
    style: &TechStyle,
    def: &CellDef,
    nodes: &ExtractedNodes,
    tr: &TransRegion,
    ctx: &mut ExtContext,
) -> Option<DeviceRecord> {
    let tmpl = &style.devices[tr.template];
    let term_mask = tmpl.all_term_types();

    // Perimeter re-walk: classify each boundary segment by its outside
    // type. Positional slots for asymmetric templates; discovery order
    // for symmetric ones.
    let positional = !tmpl.symmetric();
    let mut found: Vec<TermInfo> = Vec::new();
    let mut slots: Vec<Option<TermInfo>> = vec![None; tmpl.nterms];
    let mut bounds = Rect::empty();
    let mut perim_total: Int = 0;
    let mut term_total: Int = 0;

    for &(p, k) in tr.tiles.iter() {
        let tile = def.planes[p].tile(k);
        bounds = bounds.union(&tile.area);
        for b in def.planes[p].boundaries(k) {
            let outside = match b.outside {
                Some(nk) => Some(def.planes[p].tile(nk).typ),
                None => None,
            };
            if let Some(o) = outside {
                if tmpl.gate_types.contains(o) {
                    // Internal device edge
                    continue;
                }
            }
            perim_total += b.len;
            let (o, nk) = match (outside, b.outside) {
                (Some(o), Some(nk)) if term_mask.contains(o) => (o, nk),
                _ => continue,
            };
            let node = match nodes.node_of(p, nk) {
                Some(n) => n,
                None => continue,
            };
            term_total += b.len;
            let entry: &mut TermInfo = if positional {
                let slot = (0..tmpl.nterms)
                    .find(|&i| tmpl.term_mask(i).contains(o))
                    .unwrap_or(0);
                slots[slot].get_or_insert_with(|| TermInfo {
                    node,
                    plane: p,
                    pos: b.seg.p0,
                    len: 0,
                    segs: Vec::new(),
                })
            } else {
                match found.iter().position(|t| t.node == node) {
                    Some(i) => &mut found[i],
                    None => {
                        found.push(TermInfo {
                            node,
                            plane: p,
                            pos: b.seg.p0,
                            len: 0,
                            segs: Vec::new(),
                        });
                        let i = found.len() - 1;
                        &mut found[i]
                    }
                }
            };
            entry.len += b.len;
            if (p, b.seg.p0.x, b.seg.p0.y) < (entry.plane, entry.pos.x, entry.pos.y) {
                entry.plane = p;
                entry.pos = b.seg.p0;
            }
            entry.segs.push(BoundSeg {
                side: b.side,
                seg: b.seg,
            });
        }
    }
    if positional {
        // Positional slot assignment: order comes from the template's
        // per-index terminal masks, not from connectivity discovery.
        for slot in slots.into_iter() {
            if let Some(t) = slot {
                found.push(t);
            }
        }
    }
    let mut terms = found;

    // The gate node is the node owning the device's own tiles
    let (gp, gk) = tr.tiles[0];
    let gate_node = nodes.node_of(gp, gk);

    // Substrate sub-search: the device halo, on every plane, against the
    // template's substrate-connectable types
    let substrate = {
        let mut found_subs: Vec<RegionId> = Vec::new();
        if !tmpl.substrate_types.is_empty() {
            let halo = bounds.expand(1);
            for p in 0..def.planes.len() {
                for k in def.planes[p].search(&halo, &tmpl.substrate_types) {
                    if let Some(r) = nodes.node_of(p, k) {
                        if !found_subs.contains(&r) {
                            found_subs.push(r);
                        }
                    }
                }
            }
        }
        if found_subs.len() > 1 {
            ctx.warn(
                WarnKind::SplitSubstrate,
                Some(bounds),
                format!(
                    "Split substrate under device at ({}, {}) in cell {}",
                    bounds.left(),
                    bounds.bottom(),
                    def.name
                ),
            );
        }
        match found_subs.first() {
            Some(&r) => nodes.nodes[r].name(style),
            None => tmpl
                .substrate_node
                .clone()
                .or_else(|| style.substrate.as_ref().map(|s| s.node_name.clone()))
                .unwrap_or_else(|| "None".to_string()),
        }
    };

    // Attribute labels: gate attributes attach on the device's own tiles,
    // terminal attributes bind to the terminal whose node they annotate.
    let mut attrs: Vec<DevAttr> = Vec::new();
    for lab in def.labels.iter() {
        match lab.kind {
            LabelKind::GateAttr => {
                if let Some(loc) = label_tile(def, lab) {
                    if tr.tiles.contains(&loc) {
                        attrs.push(DevAttr {
                            text: lab.text.clone(),
                            term: None,
                        });
                    }
                }
            }
            LabelKind::TermAttr => {
                if let Some((p, k)) = label_tile(def, lab) {
                    if !lab.area.touches(&bounds.expand(1)) {
                        continue;
                    }
                    if let Some(n) = nodes.node_of(p, k) {
                        if let Some(i) = terms.iter().position(|t| t.node == n) {
                            attrs.push(DevAttr {
                                text: lab.text.clone(),
                                term: Some(i),
                            });
                        }
                    }
                }
            }
            _ => {}
        }
    }

    // Repair missing terminals: clone the last-found terminal (or fall
    // back to the gate node) into each empty slot, adding zero length.
    // Degrade, never fail.
    while terms.len() < tmpl.nterms {
        ctx.warn(
            WarnKind::MissingTerminal,
            Some(bounds),
            format!(
                "Device at ({}, {}) in cell {} missing {} terminal(s); cloning",
                bounds.left(),
                bounds.bottom(),
                def.name,
                tmpl.nterms - terms.len()
            ),
        );
        let repaired = match terms.last() {
            Some(last) => TermInfo {
                len: 0,
                segs: Vec::new(),
                ..last.clone()
            },
            None => TermInfo {
                node: gate_node?,
                plane: tr.plane,
                pos: tr.anchor,
                len: 0,
                segs: Vec::new(),
            },
        };
        terms.push(repaired);
    }
    // Unexpected extras on fixed-terminal-count models warn but stay
    if matches!(tmpl.kind, DeviceKind::Resistor | DeviceKind::Capacitor)
        && terms.len() > tmpl.nterms
    {
        ctx.warn(
            WarnKind::TerminalCount,
            Some(bounds),
            format!(
                "{} at ({}, {}) in cell {} has {} terminals (expected {})",
                tmpl.kind,
                bounds.left(),
                bounds.bottom(),
                def.name,
                terms.len(),
                tmpl.nterms
            ),
        );
    }

    // Canonical terminal order, attributes swapped in lock-step
    sort_terminals(&mut terms, &mut attrs);

    // Geometric parameters: a boundary survey when any terminal encloses
    // or is enclosed (annular), plain perimeter accounting otherwise
    let annular = terms
        .iter()
        .any(|t| !t.segs.is_empty() && t.net_vector() == Point::new(0, 0));
    let (length, width) = if annular {
        let (l, w) = compute_effective_lw(&terms, style.corner_chop, bounds, def, ctx);
        (l.round() as i64, w.round() as i64)
    } else {
        let nterms = terms.len().max(1) as Int;
        let w = term_total / nterms;
        let l = (perim_total - term_total) / 2;
        (l as i64, w as i64)
    };

    // Kind-specific parameters
    let mut params: Vec<(String, f64)> = Vec::new();
    match tmpl.kind {
        DeviceKind::Resistor => {
            // Sheet resistance from the body type's class, length over width
            let sheet = style.types[tr.typ]
                .resist_class
                .map(|c| style.sheet_ohms(c))
                .unwrap_or(0.0);
            let r = if width > 0 {
                sheet * length as f64 / width as f64
            } else {
                0.0
            };
            params.push(("r".to_string(), r));
        }
        DeviceKind::Capacitor if tmpl.model.is_none() => {
            // Modelless capacitors skip boundary tracing entirely:
            // purely formulaic area and perimeter capacitance
            let c = tr.area * style.types[tr.typ].area_cap
                + perim_total as f64 * style.perim_cap(tr.typ, None);
            params.push(("c".to_string(), c));
        }
        _ => {}
    }

    // Resolve names and attribute lists into the written terminal blocks
    let gate_name = match gate_node {
        Some(n) => nodes.nodes[n].name(style),
        None => "None".to_string(),
    };
    let gate = DevTerm {
        node: gate_name,
        len: (perim_total - term_total) as i64,
        attrs: attrs
            .iter()
            .filter(|a| a.term.is_none())
            .map(|a| a.text.clone())
            .collect(),
    };
    let terms: Vec<DevTerm> = terms
        .iter()
        .enumerate()
        .map(|(i, t)| DevTerm {
            node: nodes.nodes[t.node].name(style),
            len: t.len as i64,
            attrs: attrs
                .iter()
                .filter(|a| a.term == Some(i))
                .map(|a| a.text.clone())
                .collect(),
        })
        .collect();

    Some(DeviceRecord {
        kind: tmpl.kind,
        model: tmpl.model.clone(),
        bounds,
        area: tr.area.round() as i64,
        perim: perim_total as i64,
        length,
        width,
        params,
        substrate,
        gate,
        terms,
    })
}

/// # Effective Length/Width Boundary Survey
///
/// For annular and other non-rectangular devices: merge each terminal's
/// collinear boundary segments, pick the terminal with the most segments
/// as primary, and pair each of its segments with the nearest
/// opposing-direction segment within corner-extension range. Each pairing
/// contributes a local channel length (the separation) and width (the
/// span overlap, plus corner-chop-scaled extension where the opposing
/// boundary turns past an end).
///
/// Differing local lengths cannot be represented in a single (L, W) pair;
/// widths are proportionally rescaled to the minimum length, which tends
/// to over-estimate the width of devices with angled bends. That
/// approximation, and the warning that flags it, are part of the model's
/// contract with downstream consumers.
pub fn compute_effective_lw(
    terms: &[TermInfo],
    chop: f64,
    bounds: Rect,
    def: &CellDef,
    ctx: &mut ExtContext,
) -> (f64, f64) {
    // Merge collinear, touching segments per terminal
    let merged: Vec<Vec<BoundSeg>> = terms.iter().map(|t| merge_segs(&t.segs)).collect();
    let primary = match merged
        .iter()
        .enumerate()
        .max_by_key(|(_i, v)| v.len())
        .map(|(i, _v)| i)
    {
        Some(p) => p,
        None => return (0.0, 0.0),
    };
    let pool: Vec<&BoundSeg> = merged.iter().flatten().collect();

    // (width, length) contribution per primary segment
    let mut contribs: Vec<(f64, f64)> = Vec::new();
    for s in merged[primary].iter() {
        let sline = s.line();
        let (slo, shi) = s.span();
        let mut best: Option<(Int, &BoundSeg)> = None;
        for &t in pool.iter() {
            if t.side != s.side.opposite() {
                continue;
            }
            let d = (t.line() - sline).abs();
            if d == 0 {
                continue;
            }
            let (tlo, thi) = t.span();
            // Candidates must overlap our span, or fall within
            // corner-extension range of its ends
            if thi.min(shi) - tlo.max(slo) <= -d {
                continue;
            }
            if best.map(|(bd, _)| d < bd).unwrap_or(true) {
                best = Some((d, t));
            }
        }
        let (d, t) = match best {
            Some(b) => b,
            None => continue,
        };
        let (tlo, thi) = t.span();
        let mut w = (thi.min(shi) - tlo.max(slo)).max(0) as f64;
        // Corner extension where the opposing boundary bends past an end
        if tlo < slo {
            w += chop * d as f64;
        }
        if thi > shi {
            w += chop * d as f64;
        }
        contribs.push((w, d as f64));
    }
    if contribs.is_empty() {
        return (0.0, 0.0);
    }
    let lmin = contribs.iter().map(|c| c.1).fold(f64::INFINITY, f64::min);
    let multi = contribs.iter().any(|c| (c.1 - lmin).abs() > 1e-9);
    if multi {
        ctx.warn(
            WarnKind::MultipleLengths,
            Some(bounds),
            format!(
                "Device at ({}, {}) in cell {} has multiple lengths; widths rescaled",
                bounds.left(),
                bounds.bottom(),
                def.name
            ),
        );
    }
    // Rescale each contribution to the canonical length, conserving its
    // width-over-length ratio
    let width: f64 = contribs.iter().map(|(w, l)| w * lmin / l).sum();
    (lmin, width)
}

/// Merge collinear, touching boundary segments
fn merge_segs(segs: &[BoundSeg]) -> Vec<BoundSeg> {
    let mut sorted: Vec<BoundSeg> = segs.to_vec();
    sorted.sort_by_key(|s| (s.side as u8, s.line(), s.span().0));
    let mut out: Vec<BoundSeg> = Vec::new();
    for s in sorted.into_iter() {
        if let Some(last) = out.last_mut() {
            if last.side == s.side && last.line() == s.line() && last.span().1 >= s.span().0 {
                // Extend the prior segment
                let merged = last.seg.union(&s.seg);
                last.seg = merged;
                continue;
            }
        }
        out.push(s);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::find_nodes;

    #[test]
    fn terminal_sort_is_positional() {
        // All 6 discovery orders of three terminals sort identically
        let mk = |plane, x, y, node| TermInfo {
            node,
            plane,
            pos: Point::new(x, y),
            len: 1,
            segs: Vec::new(),
        };
        let canonical = [(0usize, 0isize, 0isize), (0, 4, 0), (1, 0, 0)];
        let perms: [[usize; 3]; 6] = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];
        for perm in perms {
            let mut terms: Vec<TermInfo> = perm
                .iter()
                .map(|&i| mk(canonical[i].0, canonical[i].1, canonical[i].2, i))
                .collect();
            let mut attrs = vec![DevAttr {
                text: "a".into(),
                term: Some(0),
            }];
            // Attribute starts bound to whichever terminal was discovered first
            let attr_node = perm[0];
            sort_terminals(&mut terms, &mut attrs);
            assert_eq!(terms[0].node, 0);
            assert_eq!(terms[1].node, 1);
            assert_eq!(terms[2].node, 2);
            // And the attribute followed its terminal through the swaps
            assert_eq!(terms[attrs[0].term.unwrap()].node, attr_node);
        }
    }

    #[test]
    fn rectangular_transistor() {
        let style = TechStyle::sample();
        let poly = style.type_named("poly").unwrap();
        let ndiff = style.type_named("ndiff").unwrap();
        let nfet = style.type_named("nfet").unwrap();
        let mut def = CellDef::new("t", style);

        // A 2 (long) x 4 (wide) gate, diffusion left and right,
        // poly above and below
        def.paint(style, Rect::from_coords(0, 0, 2, 4), nfet);
        def.paint(style, Rect::from_coords(-6, 0, 0, 4), ndiff);
        def.paint(style, Rect::from_coords(2, 0, 8, 4), ndiff);
        def.paint(style, Rect::from_coords(0, 4, 2, 9), poly);
        def.paint(style, Rect::from_coords(0, -5, 2, 0), poly);
        def.add_label(style, "d1", Rect::from_coords(-5, 1, -5, 1), ndiff);
        def.add_label(style, "d2", Rect::from_coords(3, 1, 3, 1), ndiff);

        let nodes = find_nodes(style, &def, None, false);
        let mut ctx = ExtContext::new();
        let devs = extract_devices(style, &def, &nodes, &mut ctx);
        assert_eq!(devs.len(), 1);
        let d = &devs[0];
        assert_eq!(d.kind, DeviceKind::Mosfet);
        assert_eq!(d.model.as_deref(), Some("nfet"));
        // Gate length is the terminal separation, width the terminal edge
        assert_eq!(d.length, 2);
        assert_eq!(d.width, 4);
        assert_eq!(d.terms.len(), 2);
        // Deterministic order: the lower-left (left-hand) terminal first
        assert_eq!(d.terms[0].node, "d1");
        assert_eq!(d.terms[1].node, "d2");
        assert_eq!(d.terms[0].len, 4);
        assert_eq!(ctx.stats.warnings, 0);
    }

    #[test]
    fn missing_terminal_repair() {
        let style = TechStyle::sample();
        let ndiff = style.type_named("ndiff").unwrap();
        let nfet = style.type_named("nfet").unwrap();
        let mut def = CellDef::new("t", style);

        // Only one diffusion terminal; the second is cloned with zero length
        def.paint(style, Rect::from_coords(0, 0, 2, 4), nfet);
        def.paint(style, Rect::from_coords(2, 0, 8, 4), ndiff);

        let nodes = find_nodes(style, &def, None, false);
        let mut ctx = ExtContext::new();
        let devs = extract_devices(style, &def, &nodes, &mut ctx);
        assert_eq!(devs.len(), 1);
        assert_eq!(devs[0].terms.len(), 2);
        assert_eq!(devs[0].terms[0].node, devs[0].terms[1].node);
        assert_eq!(devs[0].terms[1].len, 0);
        assert_eq!(ctx.stats.warnings, 1);
        assert_eq!(ctx.warnings[0].kind, WarnKind::MissingTerminal);
    }

    #[test]
    fn annular_device_survey() {
        let style = TechStyle::sample();
        let ndiff = style.type_named("ndiff").unwrap();
        let nfet = style.type_named("nfet").unwrap();
        let mut def = CellDef::new("t", style);

        // A square gate ring: outer 12x12, inner hole 4x4 centered.
        // Four gate tiles form the ring; diffusion fills the hole and
        // surrounds the outside.
        def.paint(style, Rect::from_coords(0, 0, 12, 4), nfet);
        def.paint(style, Rect::from_coords(0, 8, 12, 12), nfet);
        def.paint(style, Rect::from_coords(0, 4, 4, 8), nfet);
        def.paint(style, Rect::from_coords(8, 4, 12, 8), nfet);
        // Inner island terminal
        def.paint(style, Rect::from_coords(4, 4, 8, 8), ndiff);
        // Outer surround terminal, as a ring of four diffusion tiles
        def.paint(style, Rect::from_coords(-4, -4, 16, 0), ndiff);
        def.paint(style, Rect::from_coords(-4, 12, 16, 16), ndiff);
        def.paint(style, Rect::from_coords(-4, 0, 0, 12), ndiff);
        def.paint(style, Rect::from_coords(12, 0, 16, 12), ndiff);

        let nodes = find_nodes(style, &def, None, false);
        let mut ctx = ExtContext::new();
        let devs = extract_devices(style, &def, &nodes, &mut ctx);
        assert_eq!(devs.len(), 1);
        let d = &devs[0];
        // Symmetric ring: one channel length everywhere, no rescale warning
        assert_eq!(d.length, 4);
        assert!(d.width > 0);
        assert!(!ctx
            .warnings
            .iter()
            .any(|w| w.kind == WarnKind::MultipleLengths));
    }

    #[test]
    fn formulaic_capacitor() {
        let style = TechStyle::sample();
        let mim = style.type_named("mimcap").unwrap();
        let mut def = CellDef::new("t", style);
        def.paint(style, Rect::from_coords(0, 0, 10, 10), mim);

        let nodes = find_nodes(style, &def, None, false);
        let mut ctx = ExtContext::new();
        let devs = extract_devices(style, &def, &nodes, &mut ctx);
        assert_eq!(devs.len(), 1);
        let d = &devs[0];
        assert_eq!(d.kind, DeviceKind::Capacitor);
        assert!(d.model.is_none());
        // area*areaCap + perim*spaceCap
        let expect = 100.0 * 1.0 + 40.0 * 0.1;
        let c = d.params.iter().find(|p| p.0 == "c").unwrap().1;
        assert!((c - expect).abs() < 1e-9);
    }
}
