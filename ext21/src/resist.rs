//!
//! # Resistance Model Module
//!
//! Converts a node's accumulated area and perimeter, per sheet-resistance
//! class, into an equivalent-squares count and thence a resistance.
//!
//! The region is modeled as the single rectangle satisfying
//! `area = L*W` and `perim = 2*(L+W)` simultaneously; eliminating `W`
//! gives the quadratic `2L^2 - perim*L + 2*area = 0`, whose discriminant
//! root `S = sqrt(perim^2 - 16*area)` yields
//! `L/W = (perim + S) / (perim - S)` squares.
//! Accumulated shapes too irregular for any rectangle fit drive the
//! discriminant negative; those clamp to exactly one square.
//!

// Local Imports
use crate::nodes::NodeRegion;
use crate::tech::TechStyle;

/// # Per-Class Resistance Accumulator
///
/// The (area, perimeter) sums gathered while walking one node's tiles,
/// one pair per sheet-resistance class. Explicitly passed through the
/// node-finding call chain, and reset after each fold so the same
/// accumulator serves every node of a pass in turn.
#[derive(Debug, Clone, Default)]
pub struct ResistAccum {
    /// (area, perimeter) sums per resistance class
    pub sums: Vec<(f64, f64)>,
}
impl ResistAccum {
    /// Create a zeroed accumulator covering `nclasses` classes
    pub fn new(nclasses: usize) -> Self {
        Self {
            sums: vec![(0.0, 0.0); nclasses],
        }
    }
    /// Add `area` square-lambda of class-`c` material
    pub fn add_area(&mut self, c: usize, area: f64) {
        self.sums[c].0 += area;
    }
    /// Add `len` lambda of class-`c` boundary
    pub fn add_perim(&mut self, c: usize, len: f64) {
        self.sums[c].1 += len;
    }
    /// Zero every class sum
    pub fn reset(&mut self) {
        for s in self.sums.iter_mut() {
            *s = (0.0, 0.0);
        }
    }
}

/// Equivalent-squares count for accumulated `area` and `perim`.
///
/// Degenerate inputs (zero or negative area or perimeter) contribute no
/// resistance at all; negative discriminants clamp to one square.
pub fn equivalent_squares(area: f64, perim: f64) -> f64 {
    if area <= 0.0 || perim <= 0.0 {
        return 0.0;
    }
    let disc = perim * perim - 16.0 * area;
    if disc < 0.0 {
        return 1.0;
    }
    let s = disc.sqrt();
    (perim + s) / (perim - s)
}

/// Fold the accumulated class sums into `node`: record the per-class
/// (area, perimeter) pairs for output, add the squares-scaled sheet
/// resistance of each class to the node total, and reset `accum` for the
/// next node.
///
/// Called lazily, when the *next* region begins accumulating (or once
/// after the final region), which is why the accumulator is context
/// rather than per-node state.
pub fn set_resist(node: &mut NodeRegion, accum: &mut ResistAccum, style: &TechStyle) {
    for (c, &(area, perim)) in accum.sums.iter().enumerate() {
        node.class_sums[c] = (area.round() as i64, perim.round() as i64);
        let squares = equivalent_squares(area, perim);
        node.resist += squares * style.sheet_ohms(c);
    }
    accum.reset();
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A true rectangle must come back out as its own aspect ratio.
    #[test]
    fn rectangle_round_trip() {
        for (l, w) in [(4.0f64, 1.0f64), (10.0, 10.0), (7.0, 2.0), (100.0, 3.0)] {
            let area = l * w;
            let perim = 2.0 * (l + w);
            let squares = equivalent_squares(area, perim);
            assert!((squares - l / w).abs() < 1e-9, "L={} W={}", l, w);
        }
    }

    /// Impossible-rectangle inputs clamp to exactly one square,
    /// never a domain error or negative value.
    #[test]
    fn discriminant_clamp() {
        // perim^2 < 16*area
        assert_eq!(equivalent_squares(100.0, 10.0), 1.0);
        assert_eq!(equivalent_squares(25.0, 19.9), 1.0);
    }

    /// Degenerate accumulations contribute nothing.
    #[test]
    fn degenerate() {
        assert_eq!(equivalent_squares(0.0, 12.0), 0.0);
        assert_eq!(equivalent_squares(12.0, 0.0), 0.0);
    }

    #[test]
    fn accum_reset_on_fold() {
        use crate::nodes::NodeRegion;
        use crate::tech::TechStyle;
        let style = TechStyle::sample();
        let mut accum = ResistAccum::new(style.resist_classes.len());
        // One 4x1 rectangle of class 0
        accum.add_area(0, 4.0);
        accum.add_perim(0, 10.0);

        let mut node = NodeRegion::new_at(crate::geom::Point::new(0, 0), 0, 0, style);
        set_resist(&mut node, &mut accum, style);
        assert_eq!(node.class_sums[0], (4, 10));
        // 4 squares of the class-0 sheet resistance
        assert!((node.resist - 4.0 * style.sheet_ohms(0)).abs() < 1e-9);
        // The accumulator is ready for the next node
        assert_eq!(accum.sums[0], (0.0, 0.0));
    }
}
