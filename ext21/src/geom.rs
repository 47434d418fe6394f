//!
//! # Geometry Module
//!
//! Core geometric types for tile-based layout: [Point], [Rect], the
//! boundary [Side] enumeration, and the integer affine [Transform]
//! carried by cell instances.
//!
//! All coordinates are integer lambda units.
//!

// Crates.io
use derive_more::{Add, AddAssign, Sub, SubAssign};
use serde::{Deserialize, Serialize};

/// # Location Integer Type-Alias
///
/// Used for all layout spatial coordinates.
/// Designed for quickly swapping to other integer types, if we so desire.
pub type Int = isize;

/// A "negative infinity" coordinate, used to anchor synthetic geometry
/// such as the fallback substrate node.
/// Half of the true minimum, so downstream arithmetic cannot overflow.
pub const NINFINITY: Int = Int::MIN / 2;

/// # Point in two-dimensional layout-space
#[derive(
    Debug,
    Copy,
    Clone,
    Default,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Add,
    AddAssign,
    Sub,
    SubAssign,
)]
pub struct Point {
    pub x: Int,
    pub y: Int,
}
impl Point {
    /// Create a new [Point] from (x,y) coordinates
    pub fn new(x: Int, y: Int) -> Self {
        Self { x, y }
    }
    /// Manhattan (L1) distance to `other`
    pub fn manhattan(&self, other: &Point) -> Int {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
    /// Create a new [Point], transformed from our location by `trans`.
    pub fn transform(&self, trans: &Transform) -> Point {
        Point {
            x: trans.a[0][0] * self.x + trans.a[0][1] * self.y + trans.b[0],
            y: trans.a[1][0] * self.x + trans.a[1][1] * self.y + trans.b[1],
        }
    }
}

/// # Rectangle Side Enumeration
///
/// The four boundary sides of an axis-aligned rectangle,
/// used to tag boundary segments during perimeter walks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Bottom,
    Right,
    Top,
}
impl Side {
    /// All four sides, in perimeter-walk order
    pub const ALL: [Side; 4] = [Side::Left, Side::Bottom, Side::Right, Side::Top];

    /// Whichever side we are, return the facing one.
    pub fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
            Side::Bottom => Side::Top,
            Side::Top => Side::Bottom,
        }
    }
    /// Boolean indication of whether this side's edge runs horizontally
    /// (i.e. is a top or bottom edge).
    pub fn is_horizontal(self) -> bool {
        matches!(self, Side::Bottom | Side::Top)
    }
}

/// # Rectangle
///
/// Axis-aligned rectangle. `p0` is the lower-left corner and `p1` the
/// upper-right; constructors normalize their arguments to keep it so.
///
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Rect {
    pub p0: Point,
    pub p1: Point,
}
impl Rect {
    /// Create a new [Rect] from two corner [Point]s, in any order.
    pub fn new(p0: Point, p1: Point) -> Self {
        Self {
            p0: Point::new(p0.x.min(p1.x), p0.y.min(p1.y)),
            p1: Point::new(p0.x.max(p1.x), p0.y.max(p1.y)),
        }
    }
    /// Create a new [Rect] from (llx, lly, urx, ury) coordinates.
    pub fn from_coords(llx: Int, lly: Int, urx: Int, ury: Int) -> Self {
        Self::new(Point::new(llx, lly), Point::new(urx, ury))
    }
    /// Create an empty, otherwise invalid [Rect].
    /// Unions with any real rectangle produce that rectangle.
    pub fn empty() -> Self {
        Self {
            p0: Point::new(Int::MAX, Int::MAX),
            p1: Point::new(Int::MIN, Int::MIN),
        }
    }
    /// Boolean indication of whether this box is empty
    pub fn is_empty(&self) -> bool {
        self.p0.x >= self.p1.x || self.p0.y >= self.p1.y
    }

    pub fn left(&self) -> Int {
        self.p0.x
    }
    pub fn bottom(&self) -> Int {
        self.p0.y
    }
    pub fn right(&self) -> Int {
        self.p1.x
    }
    pub fn top(&self) -> Int {
        self.p1.y
    }
    pub fn width(&self) -> Int {
        self.p1.x - self.p0.x
    }
    pub fn height(&self) -> Int {
        self.p1.y - self.p0.y
    }
    /// Enclosed area
    pub fn area(&self) -> Int {
        self.width() * self.height()
    }
    /// Total perimeter length
    pub fn perim(&self) -> Int {
        2 * (self.width() + self.height())
    }
    /// Calculate our center-point.
    /// Rounds down on odd extents, keeping integer coordinates.
    pub fn center(&self) -> Point {
        Point::new((self.p0.x + self.p1.x) / 2, (self.p0.y + self.p1.y) / 2)
    }
    /// Boolean indication of whether [Point] `pt` lies inside our box, inclusive of the boundary.
    pub fn contains(&self, pt: &Point) -> bool {
        self.p0.x <= pt.x && self.p1.x >= pt.x && self.p0.y <= pt.y && self.p1.y >= pt.y
    }
    /// Boolean indication of whether our *interior* overlaps that of `other`.
    /// Rectangles sharing only an edge or corner do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.p0.x < other.p1.x
            && other.p0.x < self.p1.x
            && self.p0.y < other.p1.y
            && other.p0.y < self.p1.y
    }
    /// Boolean indication of whether our closure intersects that of `other`,
    /// i.e. whether the two share any point, edge-adjacency included.
    pub fn touches(&self, other: &Rect) -> bool {
        self.p0.x <= other.p1.x
            && other.p0.x <= self.p1.x
            && self.p0.y <= other.p1.y
            && other.p0.y <= self.p1.y
    }
    /// Compute the intersection with `other`.
    /// Returns an empty [Rect] if the two are disjoint.
    pub fn intersection(&self, other: &Rect) -> Rect {
        let p0 = Point::new(self.p0.x.max(other.p0.x), self.p0.y.max(other.p0.y));
        let p1 = Point::new(self.p1.x.min(other.p1.x), self.p1.y.min(other.p1.y));
        if p0.x > p1.x || p0.y > p1.y {
            return Rect::empty();
        }
        Rect { p0, p1 }
    }
    /// Compute the union (bounding box) with `other`
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            p0: Point::new(self.p0.x.min(other.p0.x), self.p0.y.min(other.p0.y)),
            p1: Point::new(self.p1.x.max(other.p1.x), self.p1.y.max(other.p1.y)),
        }
    }
    /// Create a copy expanded in all directions by `delta`
    pub fn expand(&self, delta: Int) -> Rect {
        Rect {
            p0: Point::new(self.p0.x - delta, self.p0.y - delta),
            p1: Point::new(self.p1.x + delta, self.p1.y + delta),
        }
    }
    /// Get the coordinate of side `side` (the x-line for left/right, the y-line for bottom/top)
    pub fn side_line(&self, side: Side) -> Int {
        match side {
            Side::Left => self.p0.x,
            Side::Right => self.p1.x,
            Side::Bottom => self.p0.y,
            Side::Top => self.p1.y,
        }
    }
    /// Get the (lo, hi) span of side `side` along its own axis
    pub fn side_span(&self, side: Side) -> (Int, Int) {
        if side.is_horizontal() {
            (self.p0.x, self.p1.x)
        } else {
            (self.p0.y, self.p1.y)
        }
    }
    /// Create the zero-thickness [Rect] covering side `side`
    pub fn side_rect(&self, side: Side) -> Rect {
        let line = self.side_line(side);
        let (lo, hi) = self.side_span(side);
        if side.is_horizontal() {
            Rect::from_coords(lo, line, hi, line)
        } else {
            Rect::from_coords(line, lo, line, hi)
        }
    }
    /// Create a new [Rect] transformed by `trans`.
    /// Corners are re-normalized, since rotations and reflections may swap them.
    pub fn transform(&self, trans: &Transform) -> Rect {
        Rect::new(self.p0.transform(trans), self.p1.transform(trans))
    }
}

/// # Integer Affine Transform
///
/// The coordinate transform carried by each cell instance:
/// a 2x2 integer matrix `a` (row-major) and translation vector `b`,
/// mapping child-cell coordinates into parent space as `a*p + b`.
/// Integer-exact; layout rotations are always multiples of 90 degrees.
///
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transform {
    /// Rotation / reflection matrix, row-major
    pub a: [[Int; 2]; 2],
    /// X-Y translation
    pub b: [Int; 2],
}
impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
impl Transform {
    /// The identity transform, leaving any transformed object unmodified
    pub fn identity() -> Self {
        Self {
            a: [[1, 0], [0, 1]],
            b: [0, 0],
        }
    }
    /// Translation by (x, y)
    pub fn translate(x: Int, y: Int) -> Self {
        Self {
            a: [[1, 0], [0, 1]],
            b: [x, y],
        }
    }
    /// Create a new [Transform] that is the cascade of `parent` and `child`,
    /// mapping grandchild coordinates through `child` then `parent`.
    /// Note this operation *is not* commutative.
    pub fn cascade(parent: &Transform, child: &Transform) -> Transform {
        let a = [
            [
                parent.a[0][0] * child.a[0][0] + parent.a[0][1] * child.a[1][0],
                parent.a[0][0] * child.a[0][1] + parent.a[0][1] * child.a[1][1],
            ],
            [
                parent.a[1][0] * child.a[0][0] + parent.a[1][1] * child.a[1][0],
                parent.a[1][0] * child.a[0][1] + parent.a[1][1] * child.a[1][1],
            ],
        ];
        let b = [
            parent.a[0][0] * child.b[0] + parent.a[0][1] * child.b[1] + parent.b[0],
            parent.a[1][0] * child.b[0] + parent.a[1][1] * child.b[1] + parent.b[1],
        ];
        Self { a, b }
    }
    /// The six transform integers in file order:
    /// the x-row (a, b, c) then the y-row (d, e, f) of
    /// `x' = a*x + b*y + c; y' = d*x + e*y + f`.
    pub fn ints(&self) -> [Int; 6] {
        [
            self.a[0][0],
            self.a[0][1],
            self.b[0],
            self.a[1][0],
            self.a[1][1],
            self.b[1],
        ]
    }
}
