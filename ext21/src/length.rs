//!
//! # Path-Length Analyzer Module
//!
//! Driver-to-receiver distance estimation for delay budgeting:
//! for each registered driver label, the connected net is yanked
//! (flattened through the use hierarchy) into a scratch cell, receiver
//! labels are re-resolved against the flattened geometry, and a
//! depth-first flood walks outward from the driver accumulating Manhattan
//! distance tile-to-tile.
//!
//! This is deliberately *not* a shortest-path search: the flood
//! enumerates geometrically distinct physical routes, each branch
//! terminating the moment it touches the receiver (continuing past the
//! destination could only lengthen the path), and reports the extremes -
//! minimum and maximum - over all routes found.
//!

// Local Imports
use crate::db::{CellDef, Label, TileKey};
use crate::error::{ExtContext, ExtResult};
use crate::geom::{Int, Point, Rect, Side, Transform};
use crate::region::{self, Mark, TileMarks};
use crate::tech::{PlaneId, TechStyle, TypeMask};

/// One driver-to-receiver distance result, written as a `distance` record
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceRecord {
    pub driver: String,
    pub receiver: String,
    pub min: i64,
    pub max: i64,
}

/// Compute distance records for every electrically-connected
/// (driver, receiver) pair found among the registered label names.
pub fn find_lengths(
    style: &TechStyle,
    def: &CellDef,
    drivers: &[String],
    receivers: &[String],
    _ctx: &mut ExtContext,
) -> ExtResult<Vec<DistanceRecord>> {
    // Yank the whole cell into a flat scratch def, hierarchical label
    // paths built along the way
    let flat = flatten(style, def)?;
    let connect = region::electrical_connects(style);
    let mut out = Vec::new();
    for drv in drivers.iter() {
        for dlab in flat.labels.iter().filter(|l| &l.text == drv) {
            let start = match flat.planes[dlab.plane]
                .search_point(&dlab.area.p0, &TypeMask::of(dlab.typ))
            {
                Some(k) => k,
                None => continue,
            };
            for rcv in receivers.iter() {
                for rlab in flat.labels.iter().filter(|l| &l.text == rcv) {
                    if let Some((min, max)) =
                        flood(style, &flat, &connect, dlab, dlab.plane, start, rlab)
                    {
                        log::debug!(
                            "distance {} -> {}: min {} max {}",
                            drv,
                            rcv,
                            min,
                            max
                        );
                        out.push(DistanceRecord {
                            driver: drv.clone(),
                            receiver: rcv.clone(),
                            min,
                            max,
                        });
                    }
                }
            }
        }
    }
    Ok(out)
}

/// Flatten `def` and its children into one scratch [CellDef],
/// composing use transforms and building `use/label` path names.
pub fn flatten(style: &TechStyle, def: &CellDef) -> ExtResult<CellDef> {
    let mut flat = CellDef::new(format!("{}@flat", def.name), style);
    flatten_into(def, &Transform::identity(), "", &mut flat)?;
    Ok(flat)
}
/// Internal helper and core recursion for [flatten]
fn flatten_into(
    def: &CellDef,
    trans: &Transform,
    prefix: &str,
    out: &mut CellDef,
) -> ExtResult<()> {
    for (pi, plane) in def.planes.iter().enumerate() {
        for (_k, t) in plane.tiles.iter() {
            out.planes[pi].paint(t.area.transform(trans), t.typ);
        }
    }
    for lab in def.labels.iter() {
        let mut moved = lab.clone();
        moved.area = lab.area.transform(trans);
        if !prefix.is_empty() {
            moved.text = format!("{}{}", prefix, lab.text);
        }
        out.labels.push(moved);
    }
    for u in def.uses.iter() {
        let child = u.cell.read()?;
        match &u.array {
            None => {
                let t = Transform::cascade(trans, &u.transform);
                let p = format!("{}{}/", prefix, u.use_id);
                flatten_into(&child, &t, &p, out)?;
            }
            Some(a) => {
                for (xi, yi) in a.elements() {
                    let t = Transform::cascade(trans, &u.element_transform(xi, yi));
                    let p = format!("{}{}[{},{}]/", prefix, u.use_id, xi, yi);
                    flatten_into(&child, &t, &p, out)?;
                }
            }
        }
    }
    Ok(())
}

/// One pending depth-first frame: where we are, the running reference
/// point, accumulated distance, and the side we entered through.
struct Frame {
    plane: PlaneId,
    key: TileKey,
    refpt: Point,
    dist: Int,
    entered: Option<Side>,
}

/// Depth-first distance flood from the driver tile to the receiver rect.
/// Returns the (min, max) accumulated distance over every distinct route,
/// or `None` if the receiver is not reachable.
fn flood(
    style: &TechStyle,
    def: &CellDef,
    connect: &[TypeMask],
    dlab: &Label,
    start_plane: PlaneId,
    start: TileKey,
    rlab: &Label,
) -> Option<(i64, i64)> {
    let target = rlab.area;
    let target_plane = rlab.plane;
    let mut marks = TileMarks::new(def.planes.len());
    let mut best: Option<(Int, Int)> = None;

    let mut stack = vec![Frame {
        plane: start_plane,
        key: start,
        refpt: dlab.area.p0,
        dist: 0,
        entered: None,
    }];
    marks.set(start_plane, start, Mark::Visited);

    while let Some(frame) = stack.pop() {
        let tile = def.planes[frame.plane].tile(frame.key).clone();

        // Touching the receiver terminates this branch: walking past the
        // destination could only lengthen the route
        if frame.plane == target_plane && tile.area.touches(&target) {
            let total = frame.dist + frame.refpt.manhattan(&target.p0);
            best = Some(match best {
                None => (total, total),
                Some((lo, hi)) => (lo.min(total), hi.max(total)),
            });
            continue;
        }

        let conn = connect[tile.typ];
        let tdef = &style.types[tile.typ];

        // Same-plane steps, through each shared boundary segment
        for b in def.planes[frame.plane].boundaries(frame.key) {
            let nk = match b.outside {
                Some(nk) => nk,
                None => continue,
            };
            if marks.get(frame.plane, nk).is_some() {
                continue;
            }
            if !conn.contains(def.planes[frame.plane].tile(nk).typ) {
                continue;
            }
            let mid = b.seg.center();
            let mut step = frame.refpt.manhattan(&mid);
            // Entering and exiting through the same side means the route
            // passes through the tile's middle and back: credit the
            // perpendicular crossing the straight-line figure misses
            if frame.entered == Some(b.side) {
                step += if b.side.is_horizontal() {
                    tile.area.height()
                } else {
                    tile.area.width()
                };
            }
            marks.set(frame.plane, nk, Mark::Visited);
            stack.push(Frame {
                plane: frame.plane,
                key: nk,
                refpt: mid,
                dist: frame.dist + step,
                entered: Some(b.side.opposite()),
            });
        }
        // Cross-plane steps mirror the node finder: direct lookup through
        // contacts, halo search for contactless connectivity
        let hop = |planes: Vec<PlaneId>,
                   area: Rect,
                   stack: &mut Vec<Frame>,
                   marks: &mut TileMarks| {
            for cp in planes {
                for nk in def.planes[cp].search(&area, &conn) {
                    if marks.get(cp, nk).is_some() {
                        continue;
                    }
                    let other = def.planes[cp].tile(nk).area;
                    let ix = tile.area.intersection(&other);
                    // Halo-connected tiles need not overlap; step to
                    // their center instead of a degenerate intersection
                    let mid = if ix.p0.x > ix.p1.x || ix.p0.y > ix.p1.y {
                        other.center()
                    } else {
                        ix.center()
                    };
                    let step = frame.refpt.manhattan(&mid);
                    marks.set(cp, nk, Mark::Visited);
                    stack.push(Frame {
                        plane: cp,
                        key: nk,
                        refpt: mid,
                        dist: frame.dist + step,
                        entered: None,
                    });
                }
            }
        };
        hop(
            tdef.contact_planes.iter().collect(),
            tile.area,
            &mut stack,
            &mut marks,
        );
        if !tdef.connects_planes.is_empty() {
            hop(
                tdef.connects_planes.iter().collect(),
                tile.area.expand(1),
                &mut stack,
                &mut marks,
            );
        }
    }
    best.map(|(lo, hi)| (lo as i64, hi as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::CellDef;
    use crate::tech::TechStyle;

    #[test]
    fn straight_strip() {
        let style = TechStyle::sample();
        let m1 = style.type_named("metal1").unwrap();
        let mut def = CellDef::new("t", style);
        // Three metal tiles in a row, driver at the left end,
        // receiver label at the right end
        def.paint(style, Rect::from_coords(0, 0, 10, 2), m1);
        def.paint(style, Rect::from_coords(10, 0, 20, 2), m1);
        def.paint(style, Rect::from_coords(20, 0, 30, 2), m1);
        def.add_label(style, "drv", Rect::from_coords(0, 1, 0, 1), m1);
        def.add_label(style, "rcv", Rect::from_coords(29, 1, 29, 1), m1);

        let mut ctx = ExtContext::new();
        let recs = find_lengths(
            style,
            &def,
            &["drv".to_string()],
            &["rcv".to_string()],
            &mut ctx,
        )
        .unwrap();
        assert_eq!(recs.len(), 1);
        let r = &recs[0];
        assert_eq!(r.driver, "drv");
        assert_eq!(r.receiver, "rcv");
        // A single route: the extremes agree
        assert_eq!(r.min, r.max);
        // Roughly the strip length: (0,1)->(10,1)->(20,1)->(29,0)
        assert_eq!(r.min, 29);
    }

    #[test]
    fn unreachable_receiver() {
        let style = TechStyle::sample();
        let m1 = style.type_named("metal1").unwrap();
        let mut def = CellDef::new("t", style);
        def.paint(style, Rect::from_coords(0, 0, 10, 2), m1);
        def.paint(style, Rect::from_coords(20, 0, 30, 2), m1);
        def.add_label(style, "drv", Rect::from_coords(0, 1, 0, 1), m1);
        def.add_label(style, "rcv", Rect::from_coords(29, 1, 29, 1), m1);

        let mut ctx = ExtContext::new();
        let recs = find_lengths(
            style,
            &def,
            &["drv".to_string()],
            &["rcv".to_string()],
            &mut ctx,
        )
        .unwrap();
        assert!(recs.is_empty());
    }

    #[test]
    fn two_routes_report_min_and_max() {
        let style = TechStyle::sample();
        let m1 = style.type_named("metal1").unwrap();
        let mut def = CellDef::new("t", style);
        // Two geometrically distinct routes from driver to receiver:
        // a short direct strip, and a long detour over the top, each
        // arriving at its own receiver-touching tile
        def.paint(style, Rect::from_coords(0, 0, 2, 2), m1); // driver pad
        def.paint(style, Rect::from_coords(2, 0, 22, 2), m1); // short arm
        def.paint(style, Rect::from_coords(0, 2, 2, 30), m1); // detour up
        def.paint(style, Rect::from_coords(2, 28, 40, 30), m1); // detour across
        def.paint(style, Rect::from_coords(22, 0, 24, 28), m1); // detour down
        def.add_label(style, "drv", Rect::from_coords(1, 1, 1, 1), m1);
        // The receiver point sits on the seam both arms reach
        def.add_label(style, "rcv", Rect::from_coords(22, 1, 22, 1), m1);

        let mut ctx = ExtContext::new();
        let recs = find_lengths(
            style,
            &def,
            &["drv".to_string()],
            &["rcv".to_string()],
            &mut ctx,
        )
        .unwrap();
        assert_eq!(recs.len(), 1);
        // The short arm and the detour report different extremes
        assert!(recs[0].min < recs[0].max);
        assert_eq!(recs[0].min, 21);
    }

    #[test]
    fn hierarchical_labels_flatten() {
        let style = TechStyle::sample();
        let m1 = style.type_named("metal1").unwrap();
        let mut child = CellDef::new("leaf", style);
        child.paint(style, Rect::from_coords(0, 0, 4, 2), m1);
        child.add_label(style, "pin", Rect::from_coords(1, 1, 1, 1), m1);
        let child = ext21utils::Ptr::new(child);

        let mut top = CellDef::new("top", style);
        top.uses.push(crate::db::CellUse::new(
            "u1",
            child.clone(),
            Transform::translate(100, 0),
        ));
        let flat = flatten(style, &top).unwrap();
        assert_eq!(flat.labels.len(), 1);
        assert_eq!(flat.labels[0].text, "u1/pin");
        assert_eq!(flat.labels[0].area.p0, Point::new(101, 1));
    }
}
