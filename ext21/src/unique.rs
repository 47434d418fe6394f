//!
//! # Unique-Naming Module
//!
//! Detects name-labels attached to more than one electrically-distinct
//! node within a cell, and resolves each conflict per the selected
//! [UniquePolicy] - renaming with generated `_uqN` suffixes, or warning,
//! or (for `!`-terminated globals) deliberately leaving the duplicate
//! alone.
//!
//! Suffix counters increase monotonically per base name and every
//! candidate is checked against every name present in the cell, so a
//! rename can never collide and never reuses an earlier rename.
//! Re-running the pass over its own output is a no-op.
//!

// Std-Lib
use std::collections::{HashMap, HashSet};

// Local Imports
use crate::db::{CellDef, LabelKind, TileKey};
use crate::error::{ExtContext, WarnKind};
use crate::region::{self, LabRegion, RegionId, RegionObserver, TileMarks};
use crate::tech::{PlaneId, TechStyle};

/// # Duplicate-Label Resolution Policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniquePolicy {
    /// Rename every occurrence after the first, silently
    RenameAll,
    /// Rename only labels ending in `#`; warn otherwise, unless the label
    /// ends in `!` (the author's assertion that the duplicate is intended)
    RenameTagged,
    /// Like [UniquePolicy::RenameAll], but port labels are exempted from
    /// renaming and only warned about
    ExemptPorts,
}

/// Observer collecting [LabRegion]s for the label trace
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

/// Trace label-carrier regions and attach each label index to its region
fn find_label_regions(style: &TechStyle, def: &CellDef) -> (Vec<LabRegion>, TileMarks) {
    let mut obs = LabObserver {
        regions: Vec::new(),
    };
    let mut marks = TileMarks::new(def.planes.len());
    let connect = region::electrical_connects(style);
    region::find_regions(
        style,
        def,
        None,
        &style.conducting,
        &connect,
        &mut obs,
        &mut marks,
    );
    for (i, lab) in def.labels.iter().enumerate() {
        let found = def.planes[lab.plane]
            .search_point(&lab.area.p0, &crate::tech::TypeMask::of(lab.typ));
        if let Some(key) = found {
            if let Some(rid) = marks.owner(lab.plane, key) {
                obs.regions[rid].labels.push(i);
            }
        }
    }
    (obs.regions, marks)
}

/// Resolve duplicate name-labels in `def` under `policy`.
/// Returns the number of labels renamed.
pub fn uniquify(
    style: &TechStyle,
    def: &mut CellDef,
    policy: UniquePolicy,
    ctx: &mut ExtContext,
) -> usize {
    let (regions, _marks) = find_label_regions(style, def);

    // Group name-label occurrences by text, in (region, label) pairs
    let mut by_text: HashMap<String, Vec<(RegionId, usize)>> = HashMap::new();
    for (rid, reg) in regions.iter().enumerate() {
        for &li in reg.labels.iter() {
            if def.labels[li].kind == LabelKind::Name {
                by_text
                    .entry(def.labels[li].text.clone())
                    .or_default()
                    .push((rid, li));
            }
        }
    }
    // Every name present in the cell, for collision-free generation
    let mut names: HashSet<String> = def
        .labels
        .iter()
        .filter(|l| l.kind == LabelKind::Name)
        .map(|l| l.text.clone())
        .collect();
    // Monotonic per-base suffix counters, never reset within the pass
    let mut counters: HashMap<String, usize> = HashMap::new();

    let mut texts: Vec<String> = by_text.keys().cloned().collect();
    texts.sort();
    let mut renamed = 0;
    for text in texts {
        let mut entries = match by_text.remove(&text) {
            Some(e) => e,
            None => continue,
        };
        entries.sort_by_key(|e| e.1);
        // Only labels on electrically-distinct regions conflict;
        // the first-seen region keeps the name
        let keep = entries[0].0;
        for (rid, li) in entries.into_iter().skip(1) {
            if rid == keep {
                continue;
            }
            let loc = def.labels[li].area;
            let rename = match policy {
                UniquePolicy::RenameAll => true,
                UniquePolicy::RenameTagged => {
                    if text.ends_with('!') {
                        // An intentional global; not even a warning
                        continue;
                    }
                    if text.ends_with('#') {
                        true
                    } else {
                        ctx.warn(
                            WarnKind::DuplicateLabel,
                            Some(loc),
                            format!(
                                "Duplicate label \"{}\" on distinct nodes in cell {}",
                                text, def.name
                            ),
                        );
                        false
                    }
                }
                UniquePolicy::ExemptPorts => {
                    if def.labels[li].port.is_some() {
                        ctx.warn(
                            WarnKind::DuplicateLabel,
                            Some(loc),
                            format!(
                                "Duplicate port label \"{}\" on distinct nodes in cell {}",
                                text, def.name
                            ),
                        );
                        false
                    } else {
                        true
                    }
                }
            };
            if !rename {
                continue;
            }
            // Generate the next free suffix. Trailing `#` stays terminal.
            let (base, tail) = match text.strip_suffix('#') {
                Some(b) => (b.to_string(), "#"),
                None => (text.clone(), ""),
            };
            let counter = counters.entry(text.clone()).or_insert(0);
            let fresh = loop {
                let candidate = format!("{}_uq{}{}", base, counter, tail);
                *counter += 1;
                if !names.contains(&candidate) {
                    break candidate;
                }
            };
            names.insert(fresh.clone());
            log::debug!(
                "Renaming duplicate label \"{}\" to \"{}\" in cell {}",
                text,
                fresh,
                def.name
            );
            def.labels[li].text = fresh;
            renamed += 1;
        }
    }
    renamed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Rect;

    fn two_foo_def(style: &TechStyle) -> CellDef {
        let m1 = style.type_named("metal1").unwrap();
        let mut def = CellDef::new("t", style);
        def.paint(style, Rect::from_coords(0, 0, 4, 2), m1);
        def.paint(style, Rect::from_coords(10, 0, 14, 2), m1);
        def.add_label(style, "foo", Rect::from_coords(1, 1, 1, 1), m1);
        def.add_label(style, "foo", Rect::from_coords(11, 1, 11, 1), m1);
        def
    }

    #[test]
    fn rename_all_is_silent_and_idempotent() {
        let style = TechStyle::sample();
        let mut def = two_foo_def(style);
        let mut ctx = ExtContext::new();

        let n = uniquify(style, &mut def, UniquePolicy::RenameAll, &mut ctx);
        assert_eq!(n, 1);
        let mut texts: Vec<&str> = def.labels.iter().map(|l| l.text.as_str()).collect();
        texts.sort();
        assert_eq!(texts, vec!["foo", "foo_uq0"]);
        // Policy 0 renames without warning
        assert_eq!(ctx.stats.warnings, 0);

        // Re-running over the renamed cell is a no-op
        let n = uniquify(style, &mut def, UniquePolicy::RenameAll, &mut ctx);
        assert_eq!(n, 0);
    }

    #[test]
    fn same_node_duplicates_are_fine() {
        let style = TechStyle::sample();
        let m1 = style.type_named("metal1").unwrap();
        let mut def = CellDef::new("t", style);
        def.paint(style, Rect::from_coords(0, 0, 14, 2), m1);
        def.add_label(style, "foo", Rect::from_coords(1, 1, 1, 1), m1);
        def.add_label(style, "foo", Rect::from_coords(11, 1, 11, 1), m1);
        let mut ctx = ExtContext::new();
        let n = uniquify(style, &mut def, UniquePolicy::RenameAll, &mut ctx);
        // One node, two labels: an equiv pair, not a conflict
        assert_eq!(n, 0);
    }

    #[test]
    fn tagged_policy() {
        let style = TechStyle::sample();
        let m1 = style.type_named("metal1").unwrap();
        let mut def = CellDef::new("t", style);
        def.paint(style, Rect::from_coords(0, 0, 4, 2), m1);
        def.paint(style, Rect::from_coords(10, 0, 14, 2), m1);
        def.paint(style, Rect::from_coords(0, 10, 4, 12), m1);
        def.paint(style, Rect::from_coords(10, 10, 14, 12), m1);
        // Bare duplicate: warned, kept
        def.add_label(style, "bare", Rect::from_coords(1, 1, 1, 1), m1);
        def.add_label(style, "bare", Rect::from_coords(11, 1, 11, 1), m1);
        // Hash-tagged duplicate: renamed, hash preserved
        def.add_label(style, "tag#", Rect::from_coords(1, 11, 1, 11), m1);
        def.add_label(style, "tag#", Rect::from_coords(11, 11, 11, 11), m1);

        let mut ctx = ExtContext::new();
        let n = uniquify(style, &mut def, UniquePolicy::RenameTagged, &mut ctx);
        assert_eq!(n, 1);
        assert_eq!(ctx.stats.warnings, 1);
        assert!(def.labels.iter().any(|l| l.text == "tag_uq0#"));
        // Both bare labels survive untouched
        let bare = def.labels.iter().filter(|l| l.text == "bare").count();
        assert_eq!(bare, 2);
    }

    #[test]
    fn global_suppresses_warning() {
        let style = TechStyle::sample();
        let m1 = style.type_named("metal1").unwrap();
        let mut def = CellDef::new("t", style);
        def.paint(style, Rect::from_coords(0, 0, 4, 2), m1);
        def.paint(style, Rect::from_coords(10, 0, 14, 2), m1);
        def.add_label(style, "vdd!", Rect::from_coords(1, 1, 1, 1), m1);
        def.add_label(style, "vdd!", Rect::from_coords(11, 1, 11, 1), m1);
        let mut ctx = ExtContext::new();
        let n = uniquify(style, &mut def, UniquePolicy::RenameTagged, &mut ctx);
        assert_eq!(n, 0);
        assert_eq!(ctx.stats.warnings, 0);
    }

    #[test]
    fn ports_exempt() {
        let style = TechStyle::sample();
        let mut def = two_foo_def(style);
        def.labels[1].port = Some(0);
        let mut ctx = ExtContext::new();
        let n = uniquify(style, &mut def, UniquePolicy::ExemptPorts, &mut ctx);
        assert_eq!(n, 0);
        assert_eq!(ctx.stats.warnings, 1);
    }
}
