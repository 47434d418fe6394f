//!
//! # Hierarchical Extraction Driver
//!
//! Orchestrates per-cell extraction across a def hierarchy:
//! full-subtree extraction, ancestor-only extraction, area-restricted
//! ancestor extraction (array-element aware), and incremental
//! re-extraction gated on the timestamps embedded in previously written
//! `.ext` files.
//!
//! Defs are visited children-first through [DepOrder], each def exactly
//! once. A def that fails to extract increments the fatal counter and is
//! skipped; its siblings proceed, and the run always ends with a printed
//! summary rather than an abort.
//!

// Std-Lib
use std::collections::HashSet;
use std::path::{Path, PathBuf};

// Local Imports
use crate::db::{CellDef, Library};
use crate::devices::extract_devices;
use crate::error::{ExtContext, ExtError, ExtResult, ExtStats};
use crate::geom::Rect;
use crate::length::find_lengths;
use crate::nodes::find_nodes;
use crate::read::ext_timestamp;
use crate::tech::TechStyle;
use crate::unique::{uniquify, UniquePolicy};
use crate::write::{save, CellResults};
use ext21utils::{DepOrder, DepOrderer, Ptr};

/// Children-first ordering over the def graph
struct DefOrder;
impl DepOrder for DefOrder {
    type Item = Ptr<CellDef>;
    type Error = ExtError;

    fn process(item: &Self::Item, orderer: &mut DepOrderer<Self>) -> Result<(), ExtError> {
        let def = item.read()?;
        for u in def.uses.iter() {
            orderer.push(&u.cell)?;
        }
        Ok(())
    }
    fn fail() -> Result<(), ExtError> {
        ExtError::fail("Cyclic cell hierarchy")
    }
}

/// # Extraction Driver
///
/// Owns the run-wide state: the style, the output directory, the
/// diagnostic context, and the driver/receiver registry for the optional
/// path-length pass on root cells.
pub struct Extractor<'s> {
    style: &'s TechStyle,
    out_dir: PathBuf,
    pub ctx: ExtContext,
    /// Gather per-class resistance sums (and node resistances)
    pub resist_wanted: bool,
    /// Run the unique-naming pre-pass with this policy, if set
    pub unique_policy: Option<UniquePolicy>,
    drivers: Vec<String>,
    receivers: Vec<String>,
}
impl<'s> Extractor<'s> {
    /// Create a new [Extractor] writing `.ext` files under `out_dir`
    pub fn new(style: &'s TechStyle, out_dir: impl AsRef<Path>) -> Self {
        Self {
            style,
            out_dir: out_dir.as_ref().to_path_buf(),
            ctx: ExtContext::new(),
            resist_wanted: true,
            unique_policy: None,
            drivers: Vec::new(),
            receivers: Vec::new(),
        }
    }
    /// Register a driver terminal name for the path-length pass
    pub fn register_driver(&mut self, name: impl Into<String>) {
        self.drivers.push(name.into());
    }
    /// Register a receiver terminal name for the path-length pass
    pub fn register_receiver(&mut self, name: impl Into<String>) {
        self.receivers.push(name.into());
    }
    /// The output path for def `name`
    pub fn ext_path(&self, name: &str) -> PathBuf {
        self.out_dir.join(format!("{}.ext", name))
    }

    /// Extract `root` and its entire subtree, children first,
    /// each def exactly once.
    pub fn extract_all(&mut self, root: &Ptr<CellDef>) -> ExtResult<ExtStats> {
        let order = DefOrder::order(&[root.clone()])?;
        for def in order.iter() {
            if self.ctx.interrupted() {
                break;
            }
            if let Err(e) = self.extract_def(def, def == root) {
                self.ctx.fatal(&e);
            }
        }
        log::info!("{}", self.ctx.stats.summary());
        Ok(self.ctx.stats.clone())
    }

    /// Like [Extractor::extract_all], but a def whose existing `.ext`
    /// file records its current timestamp is skipped untouched.
    /// Children are still visited: every def gates itself independently.
    pub fn extract_incremental(&mut self, root: &Ptr<CellDef>) -> ExtResult<ExtStats> {
        let order = DefOrder::order(&[root.clone()])?;
        for def in order.iter() {
            if self.ctx.interrupted() {
                break;
            }
            let (name, ts) = {
                let d = def.read()?;
                (d.name.clone(), d.timestamp)
            };
            if ext_timestamp(self.ext_path(&name))? == Some(ts) {
                log::debug!("Cell {} is up to date; skipping", name);
                self.ctx.stats.skipped += 1;
                continue;
            }
            if let Err(e) = self.extract_def(def, def == root) {
                self.ctx.fatal(&e);
            }
        }
        log::info!("{}", self.ctx.stats.summary());
        Ok(self.ctx.stats.clone())
    }

    /// Extract every ancestor of `def` in `lib`: each def placing it,
    /// directly or transitively, once each.
    pub fn extract_parents(&mut self, def: &Ptr<CellDef>, lib: &Library) -> ExtResult<ExtStats> {
        let mut queue = lib.parents_of(def)?;
        let mut seen: HashSet<Ptr<CellDef>> = queue.iter().cloned().collect();
        let mut i = 0;
        while i < queue.len() {
            let p = queue[i].clone();
            i += 1;
            for gp in lib.parents_of(&p)? {
                if seen.insert(gp.clone()) {
                    queue.push(gp);
                }
            }
        }
        for p in queue.iter() {
            if self.ctx.interrupted() {
                break;
            }
            if let Err(e) = self.extract_def(p, false) {
                self.ctx.fatal(&e);
            }
        }
        log::info!("{}", self.ctx.stats.summary());
        Ok(self.ctx.stats.clone())
    }

    /// Extract the ancestors of `def` affected by a change within
    /// `area` (in `def`'s coordinates). Each use of `def` - every array
    /// element of an arrayed use - maps the area into parent coordinates;
    /// ancestors the transformed area misses entirely are pruned, along
    /// with their whole ancestor branch.
    pub fn extract_parent_area(
        &mut self,
        def: &Ptr<CellDef>,
        lib: &Library,
        area: &Rect,
    ) -> ExtResult<ExtStats> {
        let mut visited: HashSet<Ptr<CellDef>> = HashSet::new();
        self.parent_area_walk(def, lib, *area, &mut visited)?;
        log::info!("{}", self.ctx.stats.summary());
        Ok(self.ctx.stats.clone())
    }
    fn parent_area_walk(
        &mut self,
        def: &Ptr<CellDef>,
        lib: &Library,
        area: Rect,
        visited: &mut HashSet<Ptr<CellDef>>,
    ) -> ExtResult<()> {
        for parent in lib.parents_of(def)? {
            if self.ctx.interrupted() {
                return Ok(());
            }
            // Map the changed area through every placement of `def`
            let mut changed = Rect::empty();
            {
                let p = parent.read()?;
                for u in p.uses.iter().filter(|u| &u.cell == def) {
                    match &u.array {
                        None => changed = changed.union(&area.transform(&u.transform)),
                        Some(a) => {
                            for (xi, yi) in a.elements() {
                                changed = changed
                                    .union(&area.transform(&u.element_transform(xi, yi)));
                            }
                        }
                    }
                }
            }
            let pbbox = parent.read()?.bbox()?;
            if changed.is_empty() || !changed.touches(&pbbox) {
                // This branch of ancestry is unaffected
                continue;
            }
            if visited.insert(parent.clone()) {
                if let Err(e) = self.extract_def(&parent, false) {
                    self.ctx.fatal(&e);
                }
                self.parent_area_walk(&parent, lib, changed, visited)?;
            }
        }
        Ok(())
    }

    /// Extract a single def: unique-naming pre-pass, node finding,
    /// device analysis, the optional root-only path-length pass, and the
    /// `.ext` write.
    pub fn extract_def(&mut self, def: &Ptr<CellDef>, root: bool) -> ExtResult<()> {
        if let Some(policy) = self.unique_policy {
            let mut d = def.write()?;
            uniquify(self.style, &mut d, policy, &mut self.ctx);
        }
        let d = def.read()?;
        log::debug!("Extracting cell {}", d.name);
        let found = find_nodes(self.style, &d, None, self.resist_wanted);
        let devices = extract_devices(self.style, &d, &found, &mut self.ctx);
        let distances = if root && !self.drivers.is_empty() {
            find_lengths(self.style, &d, &self.drivers, &self.receivers, &mut self.ctx)?
        } else {
            Vec::new()
        };
        self.ctx.stats.nodes += found.nodes.len();
        self.ctx.stats.devices += devices.len();
        let results = CellResults {
            nodes: found.nodes,
            devices,
            distances,
        };
        save(self.style, &d, &results, self.ext_path(&d.name))?;
        self.ctx.stats.cells += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Transform;

    /// A two-level library: `top` placing one `leaf`
    fn two_level(style: &TechStyle) -> (Library, Ptr<CellDef>, Ptr<CellDef>) {
        let m1 = style.type_named("metal1").unwrap();
        let mut lib = Library::new("lib");

        let mut leaf = CellDef::new("leaf", style);
        leaf.timestamp = 100;
        leaf.paint(style, Rect::from_coords(0, 0, 4, 2), m1);
        let leaf = lib.add(leaf);

        let mut top = CellDef::new("top", style);
        top.timestamp = 200;
        top.paint(style, Rect::from_coords(0, 10, 8, 12), m1);
        top.uses.push(crate::db::CellUse::new(
            "u1",
            leaf.clone(),
            Transform::translate(0, 0),
        ));
        let top = lib.add(top);
        (lib, top, leaf)
    }

    #[test]
    fn extract_all_children_first() {
        let style = TechStyle::sample();
        let (_lib, top, _leaf) = two_level(style);
        let dir = tempfile::tempdir().unwrap();
        let mut ext = Extractor::new(style, dir.path());
        let stats = ext.extract_all(&top).unwrap();
        assert_eq!(stats.cells, 2);
        assert_eq!(stats.fatals, 0);
        assert!(dir.path().join("leaf.ext").exists());
        assert!(dir.path().join("top.ext").exists());
    }

    #[test]
    fn incremental_skips_up_to_date_defs() {
        let style = TechStyle::sample();
        let (_lib, top, leaf) = two_level(style);
        let dir = tempfile::tempdir().unwrap();
        let mut ext = Extractor::new(style, dir.path());
        ext.extract_all(&top).unwrap();

        // Scribble on the leaf's file past its header: if incremental
        // re-extraction rewrote the file, the sentinel would vanish
        let leaf_path = dir.path().join("leaf.ext");
        let mut contents = std::fs::read_to_string(&leaf_path).unwrap();
        contents.push_str("sentinel untouched\n");
        std::fs::write(&leaf_path, &contents).unwrap();

        // Change only the top cell
        top.write().unwrap().timestamp = 201;

        let mut ext = Extractor::new(style, dir.path());
        let stats = ext.extract_incremental(&top).unwrap();
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.cells, 1);
        let after = std::fs::read_to_string(&leaf_path).unwrap();
        assert!(after.ends_with("sentinel untouched\n"));
        let _ = leaf;
    }

    #[test]
    fn unwritable_output_is_fatal_not_abort() {
        let style = TechStyle::sample();
        let (_lib, top, _leaf) = two_level(style);
        let mut ext = Extractor::new(style, "/no/such/dir/anywhere");
        let stats = ext.extract_all(&top).unwrap();
        // Both cells fail to write; the run still completes and counts
        assert_eq!(stats.fatals, 2);
        assert_eq!(stats.cells, 0);
    }

    #[test]
    fn parents_walk_up() {
        let style = TechStyle::sample();
        let (lib, top, leaf) = two_level(style);
        let dir = tempfile::tempdir().unwrap();
        let mut ext = Extractor::new(style, dir.path());
        let stats = ext.extract_parents(&leaf, &lib).unwrap();
        assert_eq!(stats.cells, 1);
        assert!(dir.path().join("top.ext").exists());
        assert!(!dir.path().join("leaf.ext").exists());
        let _ = top;
    }

    #[test]
    fn parent_area_prunes_misses() {
        let style = TechStyle::sample();
        let (lib, _top, leaf) = two_level(style);
        let dir = tempfile::tempdir().unwrap();

        // A change inside the leaf's geometry reaches the parent
        let mut ext = Extractor::new(style, dir.path());
        let stats = ext
            .extract_parent_area(&leaf, &lib, &Rect::from_coords(0, 0, 2, 2))
            .unwrap();
        assert_eq!(stats.cells, 1);

        // A change far outside everything prunes the whole ancestry
        let dir2 = tempfile::tempdir().unwrap();
        let mut ext = Extractor::new(style, dir2.path());
        let stats = ext
            .extract_parent_area(&leaf, &lib, &Rect::from_coords(5000, 5000, 5002, 5002))
            .unwrap();
        assert_eq!(stats.cells, 0);
    }
}
