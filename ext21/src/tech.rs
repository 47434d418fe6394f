//!
//! # Technology Style Module
//!
//! The extraction half of a technology description:
//! tile-type definitions and their electrical connectivity,
//! capacitance and sheet-resistance coefficients,
//! device-recognition templates, and output scale factors.
//!
//! Two representations, in the manner of every text-sourced config:
//!
//! * [TechSource] is the on-disk form: a plain `serde` data model naming
//!   planes and types by string, loadable from JSON, YAML, or TOML via
//!   [SerdeFile].
//! * [TechStyle] is the compiled form consumed by the extraction passes:
//!   names resolved to dense indices, connectivity flattened into per-type
//!   bit-masks, and the derived masks (notably the expensive
//!   cross-plane-without-contact case) computed exactly once.
//!

// Std-Lib
use std::collections::HashMap;

// Crates.io
use derive_builder::Builder;
use once_cell::sync::Lazy;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// Local Imports
use crate::error::{ErrorContext, ErrorHelper, ExtError, ExtResult};
use ext21utils::{enumstr, EnumStr, SerdeFile};

/// Tile-type index into [TechStyle::types]
pub type TypeId = usize;
/// Plane index into [TechStyle::planes]
pub type PlaneId = usize;

/// # Tile-Type Bit-Mask
///
/// A set of tile-types, one bit per [TypeId]. Styles are limited to 64 types.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash,
)]
pub struct TypeMask(u64);
impl TypeMask {
    /// The empty mask
    pub fn empty() -> Self {
        Self(0)
    }
    /// Create a mask holding the single type `t`
    pub fn of(t: TypeId) -> Self {
        Self(1u64 << t)
    }
    /// Add type `t`
    pub fn set(&mut self, t: TypeId) {
        self.0 |= 1u64 << t;
    }
    /// Boolean indication of whether type `t` is included
    pub fn contains(&self, t: TypeId) -> bool {
        self.0 & (1u64 << t) != 0
    }
    /// Boolean indication of whether no types are included
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
    /// Union with `other`, returning a new mask
    pub fn union(&self, other: &TypeMask) -> TypeMask {
        TypeMask(self.0 | other.0)
    }
    /// Boolean indication of whether we share any type with `other`
    pub fn intersects(&self, other: &TypeMask) -> bool {
        self.0 & other.0 != 0
    }
    /// Iterate over the included [TypeId]s, ascending
    pub fn iter(&self) -> impl Iterator<Item = TypeId> + '_ {
        (0..64usize).filter(move |t| self.contains(*t))
    }
}

/// # Plane Bit-Mask
///
/// A set of planes, one bit per [PlaneId].
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash,
)]
pub struct PlaneMask(u32);
impl PlaneMask {
    pub fn empty() -> Self {
        Self(0)
    }
    pub fn set(&mut self, p: PlaneId) {
        self.0 |= 1u32 << p;
    }
    pub fn contains(&self, p: PlaneId) -> bool {
        self.0 & (1u32 << p) != 0
    }
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
    pub fn iter(&self) -> impl Iterator<Item = PlaneId> + '_ {
        (0..32usize).filter(move |p| self.contains(*p))
    }
}

enumstr!(
    /// # Device Classes
    ///
    /// Enumerated classes of extractable devices,
    /// spelled as written in `device` output records.
    /// [DeviceKind::Fet] is the legacy class, written as its own
    /// `fet` record rather than a `device` record.
    DeviceKind {
        Fet: "fet",
        Mosfet: "mosfet",
        Resistor: "res",
        Capacitor: "cap",
        Diode: "diode",
        Subcircuit: "subckt",
    }
);
/// [DeviceKind] serializes as its record spelling; its schema is a plain string.
impl JsonSchema for DeviceKind {
    fn schema_name() -> String {
        "DeviceKind".into()
    }
    fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        String::json_schema(gen)
    }
}

/// # Tech Source: Tile-Type Definition
#[derive(Clone, Default, Builder, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[builder(pattern = "owned", setter(into))]
pub struct TypeSource {
    /// Full type name, e.g. "polysilicon"
    pub name: String,
    /// Short name written into output records, e.g. "p"
    pub short: String,
    /// Home plane, by name
    pub plane: String,
    /// Area capacitance to substrate, attofarads per square lambda
    #[serde(default)]
    #[builder(default)]
    pub area_cap: f64,
    /// Planes this type connects as a contact (empty for non-contacts)
    #[serde(default)]
    #[builder(default)]
    pub contact_planes: Vec<String>,
}

/// # Tech Source: Perimeter-Capacitance Rule
///
/// Capacitance per lambda of boundary between an `inside` type and an
/// `outside` type. An empty `outside` list denotes the boundary against
/// empty space.
#[derive(Clone, Default, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct PerimCapSource {
    pub inside: Vec<String>,
    #[serde(default)]
    pub outside: Vec<String>,
    /// Attofarads per lambda of boundary
    pub cap: f64,
}

/// # Tech Source: Sheet-Resistance Class
#[derive(Clone, Default, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct ResistClassSource {
    /// Ohms per square
    pub ohms_per_square: f64,
    /// Member types, by name
    pub types: Vec<String>,
}

/// # Tech Source: Device-Recognition Template
#[derive(Clone, Builder, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[builder(pattern = "owned", setter(into))]
pub struct DeviceSource {
    /// Device class
    pub kind: DeviceKind,
    /// Model name, written into output records.
    /// Capacitors may omit it, selecting purely formulaic extraction.
    #[serde(default)]
    #[builder(default)]
    pub model: Option<String>,
    /// Identifying (gate/body) types
    pub gate: Vec<String>,
    /// Terminal type-sets. A single entry serves all terminals of a
    /// symmetric device; multiple entries assign one set per positional
    /// terminal slot of an asymmetric device.
    pub terms: Vec<Vec<String>>,
    /// Declared terminal count
    pub nterms: usize,
    /// Types satisfying this device's substrate connection
    #[serde(default)]
    #[builder(default)]
    pub substrate_types: Vec<String>,
    /// Default substrate node name, e.g. "Gnd!"
    #[serde(default)]
    #[builder(default)]
    pub substrate_node: Option<String>,
}

/// # Tech Source: Global Substrate Definition
#[derive(Clone, Default, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct SubstrateSource {
    /// Types seeding the substrate node
    pub types: Vec<String>,
    /// The substrate node's global name
    pub node_name: String,
}

/// # Tech Source: Output Scale Factors
#[derive(Clone, Default, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct ScaleSource {
    /// Resistance scale: written integer values times 1/`resist` ohms
    pub resist: i64,
    /// Capacitance scale: written values times `cap` attofarads
    pub cap: i64,
    /// Centimicrons per lambda unit
    pub lambda: f64,
}

/// # Technology Style Source
///
/// The on-disk form of an extraction style. All references between
/// sections are by name; [TechStyle::compile] resolves them.
#[derive(Clone, Default, Builder, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[builder(pattern = "owned", setter(into))]
pub struct TechSource {
    /// Style name, written into each output header
    pub name: String,
    /// Technology name, written into each output header
    pub tech: String,
    /// Plane names, lowest first
    pub planes: Vec<String>,
    /// Tile-type definitions
    pub types: Vec<TypeSource>,
    /// Connectivity groups: the types of each group are mutually connected
    #[serde(default)]
    #[builder(default)]
    pub connects: Vec<Vec<String>>,
    #[serde(default)]
    #[builder(default)]
    pub perim_caps: Vec<PerimCapSource>,
    #[serde(default)]
    #[builder(default)]
    pub resist_classes: Vec<ResistClassSource>,
    #[serde(default)]
    #[builder(default)]
    pub devices: Vec<DeviceSource>,
    #[serde(default)]
    #[builder(default)]
    pub substrate: Option<SubstrateSource>,
    pub scale: ScaleSource,
    /// Fraction of a device's corner-extension area credited to channel
    /// width during non-rectangular boundary surveys
    #[serde(default = "default_corner_chop")]
    #[builder(default = "default_corner_chop()")]
    pub corner_chop: f64,
}
fn default_corner_chop() -> f64 {
    1.0
}
impl SerdeFile for TechSource {}

/// # Compiled Tile-Type Definition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeDef {
    pub name: String,
    pub short: String,
    pub plane: PlaneId,
    pub area_cap: f64,
    /// Planes connected by this type as a contact. Empty for non-contacts.
    pub contact_planes: PlaneMask,
    /// All types this type connects to, on any plane (self included)
    pub connects: TypeMask,
    /// Planes reachable through connectivity *without* a contact.
    /// Non-empty entries trigger the halo area-search during traversal,
    /// the most expensive path, so this is precomputed per type.
    pub connects_planes: PlaneMask,
    /// Sheet-resistance class membership
    pub resist_class: Option<usize>,
    /// Device template recognized from this type, if any
    pub device: Option<usize>,
}
impl TypeDef {
    pub fn is_contact(&self) -> bool {
        !self.contact_planes.is_empty()
    }
}

/// # Compiled Sheet-Resistance Class
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResistClass {
    pub ohms_per_square: f64,
    pub types: TypeMask,
}

/// # Compiled Substrate Definition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Substrate {
    pub types: TypeMask,
    pub node_name: String,
}

/// # Compiled Device Template
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceTemplate {
    pub kind: DeviceKind,
    pub model: Option<String>,
    pub gate_types: TypeMask,
    /// Per-slot terminal masks; a single entry serves all slots of a
    /// symmetric device
    pub term_types: Vec<TypeMask>,
    pub nterms: usize,
    pub substrate_types: TypeMask,
    pub substrate_node: Option<String>,
}
impl DeviceTemplate {
    /// Symmetric devices share one terminal mask across every slot, and
    /// assign terminals in discovery order rather than positionally.
    pub fn symmetric(&self) -> bool {
        self.term_types.len() == 1
    }
    /// The terminal mask for positional slot `idx`
    pub fn term_mask(&self, idx: usize) -> &TypeMask {
        if self.symmetric() {
            &self.term_types[0]
        } else {
            &self.term_types[idx]
        }
    }
    /// Union of every slot's terminal mask
    pub fn all_term_types(&self) -> TypeMask {
        let mut m = TypeMask::empty();
        for t in &self.term_types {
            m = m.union(t);
        }
        m
    }
}

/// # Compiled Technology Style
///
/// The form consumed by every extraction pass. Produced solely by
/// [TechStyle::compile]; never hand-built outside tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TechStyle {
    pub name: String,
    pub tech: String,
    pub planes: Vec<String>,
    pub types: Vec<TypeDef>,
    pub resist_classes: Vec<ResistClass>,
    /// Perimeter capacitance, indexed `[inside][outside]`, with one extra
    /// trailing `outside` column for boundaries against empty space
    pub perim_cap: Vec<Vec<f64>>,
    pub devices: Vec<DeviceTemplate>,
    pub substrate: Option<Substrate>,
    pub resist_scale: i64,
    pub cap_scale: i64,
    pub units_per_lambda: f64,
    pub corner_chop: f64,
    /// All types participating in any connectivity group
    pub conducting: TypeMask,
    /// All device-identifying (gate/body) types
    pub gate_mask: TypeMask,
}
impl TechStyle {
    /// Number of tile-types
    pub fn ntypes(&self) -> usize {
        self.types.len()
    }
    /// Look up a type by name
    pub fn type_named(&self, name: &str) -> Option<TypeId> {
        self.types.iter().position(|t| t.name == name)
    }
    /// Boolean indication of whether types `a` and `b` are electrically connected
    pub fn connects(&self, a: TypeId, b: TypeId) -> bool {
        self.types[a].connects.contains(b)
    }
    /// Perimeter capacitance between inside type `a` and neighbor `b`
    /// (`None` for empty space), attofarads per lambda
    pub fn perim_cap(&self, a: TypeId, b: Option<TypeId>) -> f64 {
        match b {
            Some(b) => self.perim_cap[a][b],
            None => self.perim_cap[a][self.ntypes()],
        }
    }
    /// Sheet resistance of class `c`, ohms per square
    pub fn sheet_ohms(&self, c: usize) -> f64 {
        self.resist_classes[c].ohms_per_square
    }
    /// Load and compile a style from `fname` in format `fmt`
    pub fn open(
        fname: impl AsRef<std::path::Path>,
        fmt: ext21utils::SerializationFormat,
    ) -> ExtResult<Self> {
        let src = TechSource::open(fname, fmt)?;
        Self::compile(&src)
    }
    /// Compile source-form `src`, resolving every by-name reference
    pub fn compile(src: &TechSource) -> ExtResult<Self> {
        TechCompiler::compile(src)
    }
    /// The built-in sample style: a small two-poly-levels-free CMOS
    /// flavor used throughout the test suite.
    pub fn sample() -> &'static TechStyle {
        &SAMPLE_STYLE
    }
}

/// # Technology Compiler
///
/// Short-lived helper resolving a [TechSource] into a [TechStyle].
struct TechCompiler<'src> {
    src: &'src TechSource,
    /// Name-to-index maps, built early and consulted throughout
    planes: HashMap<String, PlaneId>,
    types: HashMap<String, TypeId>,
}
impl<'src> TechCompiler<'src> {
    fn compile(src: &'src TechSource) -> ExtResult<TechStyle> {
        let mut this = Self {
            src,
            planes: HashMap::new(),
            types: HashMap::new(),
        };
        this.run()
    }
    fn run(&mut self) -> ExtResult<TechStyle> {
        let src = self.src;
        // Index the planes
        for (i, p) in src.planes.iter().enumerate() {
            if self.planes.insert(p.clone(), i).is_some() {
                return self.fail(format!("Duplicate plane {}", p));
            }
        }
        // Index the types
        if src.types.len() > 64 {
            return self.fail("Styles are limited to 64 tile-types");
        }
        for (i, t) in src.types.iter().enumerate() {
            if self.types.insert(t.name.clone(), i).is_some() {
                return self.fail(format!("Duplicate type {}", t.name));
            }
        }
        // First pass over types: resolve plane references
        let mut types = Vec::with_capacity(src.types.len());
        for t in src.types.iter() {
            let plane = self.plane(&t.plane)?;
            let mut contact_planes = PlaneMask::empty();
            for p in t.contact_planes.iter() {
                contact_planes.set(self.plane(p)?);
            }
            types.push(TypeDef {
                name: t.name.clone(),
                short: t.short.clone(),
                plane,
                area_cap: t.area_cap,
                contact_planes,
                ..Default::default()
            });
        }
        // Flatten the connectivity groups into per-type masks.
        // Group membership is symmetric and includes self-connection.
        for group in src.connects.iter() {
            let ids = self.type_list(group)?;
            for &a in ids.iter() {
                for &b in ids.iter() {
                    types[a].connects.set(b);
                }
            }
        }
        // Build the perimeter-capacitance matrix, space column last
        let ntypes = types.len();
        let mut perim_cap = vec![vec![0.0; ntypes + 1]; ntypes];
        for rule in src.perim_caps.iter() {
            let inside = self.type_list(&rule.inside)?;
            let outside = self.type_list(&rule.outside)?;
            for &i in inside.iter() {
                if outside.is_empty() {
                    perim_cap[i][ntypes] = rule.cap;
                }
                for &o in outside.iter() {
                    perim_cap[i][o] = rule.cap;
                }
            }
        }
        // Resistance classes, and their back-references from each type
        let mut resist_classes = Vec::with_capacity(src.resist_classes.len());
        for (ci, c) in src.resist_classes.iter().enumerate() {
            let mut mask = TypeMask::empty();
            for &t in self.type_list(&c.types)?.iter() {
                if types[t].resist_class.is_some() {
                    return self.fail(format!("Type {} in two resistance classes", types[t].name));
                }
                types[t].resist_class = Some(ci);
                mask.set(t);
            }
            resist_classes.push(ResistClass {
                ohms_per_square: c.ohms_per_square,
                types: mask,
            });
        }
        // Device templates, and their back-references from each gate type
        let mut devices = Vec::with_capacity(src.devices.len());
        for (di, d) in src.devices.iter().enumerate() {
            if d.nterms == 0 {
                return self.fail("Device templates require at least one terminal");
            }
            if d.terms.len() != 1 && d.terms.len() != d.nterms {
                return self.fail("Terminal type-sets must number one (symmetric) or nterms");
            }
            let mut gate_types = TypeMask::empty();
            for &g in self.type_list(&d.gate)?.iter() {
                if types[g].device.is_some() {
                    return self.fail(format!("Type {} identifies two devices", types[g].name));
                }
                types[g].device = Some(di);
                gate_types.set(g);
            }
            let mut term_types = Vec::with_capacity(d.terms.len());
            for slot in d.terms.iter() {
                let mut m = TypeMask::empty();
                for &t in self.type_list(slot)?.iter() {
                    m.set(t);
                }
                term_types.push(m);
            }
            let mut substrate_types = TypeMask::empty();
            for &t in self.type_list(&d.substrate_types)?.iter() {
                substrate_types.set(t);
            }
            devices.push(DeviceTemplate {
                kind: d.kind,
                model: d.model.clone(),
                gate_types,
                term_types,
                nterms: d.nterms,
                substrate_types,
                substrate_node: d.substrate_node.clone(),
            });
        }
        // The global substrate
        let substrate = match &src.substrate {
            None => None,
            Some(s) => {
                let mut mask = TypeMask::empty();
                for &t in self.type_list(&s.types)?.iter() {
                    mask.set(t);
                }
                Some(Substrate {
                    types: mask,
                    node_name: s.node_name.clone(),
                })
            }
        };
        // Derived masks. `connects_planes` holds each plane reachable
        // through connectivity but *not* through this type's contact images;
        // traversal must fall back to a halo area-search for those.
        let mut conducting = TypeMask::empty();
        let mut gate_mask = TypeMask::empty();
        for ti in 0..ntypes {
            let mut cross = PlaneMask::empty();
            for other in types[ti].connects.iter() {
                if other >= ntypes {
                    continue;
                }
                let p = types[other].plane;
                if p != types[ti].plane && !types[ti].contact_planes.contains(p) {
                    cross.set(p);
                }
            }
            types[ti].connects_planes = cross;
            if !types[ti].connects.is_empty() {
                conducting.set(ti);
            }
            if types[ti].device.is_some() {
                gate_mask.set(ti);
            }
        }
        Ok(TechStyle {
            name: src.name.clone(),
            tech: src.tech.clone(),
            planes: src.planes.clone(),
            types,
            resist_classes,
            perim_cap,
            devices,
            substrate,
            resist_scale: src.scale.resist,
            cap_scale: src.scale.cap,
            units_per_lambda: src.scale.lambda,
            corner_chop: src.corner_chop,
            conducting,
            gate_mask,
        })
    }
    /// Resolve plane-name `name`
    fn plane(&self, name: &str) -> ExtResult<PlaneId> {
        self.unwrap(
            self.planes.get(name).copied(),
            format!("Unknown plane {}", name),
        )
    }
    /// Resolve each type-name in `names`
    fn type_list(&self, names: &[String]) -> ExtResult<Vec<TypeId>> {
        names
            .iter()
            .map(|n| {
                self.unwrap(
                    self.types.get(n).copied(),
                    format!("Unknown type {}", n),
                )
            })
            .collect()
    }
}
impl<'src> ErrorHelper for TechCompiler<'src> {
    type Error = ExtError;
    fn err(&self, msg: impl Into<String>) -> Self::Error {
        ExtError::Tech {
            message: msg.into(),
            stack: vec![ErrorContext::Library(self.src.name.clone())],
        }
    }
}

/// The built-in sample style, YAML-sourced and compiled on first use.
static SAMPLE_STYLE: Lazy<TechStyle> = Lazy::new(|| {
    use ext21utils::SerializationFormat::Yaml;
    let src: TechSource = Yaml
        .from_str(SAMPLE_STYLE_YAML)
        .expect("invalid built-in sample style source");
    TechStyle::compile(&src).expect("invalid built-in sample style")
});

/// The sample style's YAML source, shared with the crate tests
#[cfg(test)]
pub(crate) fn sample_style_yaml() -> &'static str {
    SAMPLE_STYLE_YAML
}

/// Source for the built-in sample style: a minimal single-metal CMOS
/// flavor with one transistor, one resistor, and one capacitor template.
const SAMPLE_STYLE_YAML: &str = r#"
name: lambda=1.0(sample)
tech: sample-cmos
planes: [well, active, metal1]
types:
  - {name: pwell,    short: w,    plane: well}
  - {name: poly,     short: p,    plane: active, area_cap: 0.065}
  - {name: ndiff,    short: ndif, plane: active, area_cap: 0.33}
  - {name: nfet,     short: nfet, plane: active}
  - {name: psd,      short: psd,  plane: active, area_cap: 0.30}
  - {name: polycont, short: pc,   plane: active, area_cap: 0.065, contact_planes: [metal1]}
  - {name: ndcont,   short: ndc,  plane: active, area_cap: 0.33,  contact_planes: [metal1]}
  - {name: metal1,   short: m1,   plane: metal1, area_cap: 0.035}
  - {name: rpoly,    short: rp,   plane: active}
  - {name: mimcap,   short: mim,  plane: metal1, area_cap: 1.0}
connects:
  - [poly, polycont, nfet]
  - [ndiff, ndcont]
  - [metal1, polycont, ndcont]
  - [pwell, psd]
  - [rpoly]
  - [mimcap]
perim_caps:
  - {inside: [poly, polycont], cap: 0.04}
  - {inside: [ndiff, ndcont], cap: 0.25}
  - {inside: [metal1], cap: 0.02}
  - {inside: [mimcap], cap: 0.1}
resist_classes:
  - {ohms_per_square: 48.0,   types: [poly, polycont, nfet]}
  - {ohms_per_square: 95.0,   types: [ndiff, ndcont]}
  - {ohms_per_square: 0.07,   types: [metal1]}
  - {ohms_per_square: 1700.0, types: [rpoly]}
devices:
  - kind: Mosfet
    model: nfet
    gate: [nfet]
    terms: [[ndiff, ndcont]]
    nterms: 2
    substrate_types: [pwell]
    substrate_node: Gnd!
  - kind: Resistor
    model: rpoly
    gate: [rpoly]
    terms: [[poly, polycont]]
    nterms: 2
    substrate_node: Gnd!
  - kind: Capacitor
    gate: [mimcap]
    terms: [[metal1]]
    nterms: 1
    substrate_node: Gnd!
substrate: {types: [pwell], node_name: Gnd!}
scale: {resist: 1000, cap: 1, lambda: 100.0}
corner_chop: 1.0
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks() {
        let mut m = TypeMask::empty();
        assert!(m.is_empty());
        m.set(3);
        m.set(17);
        assert!(m.contains(3));
        assert!(!m.contains(4));
        assert_eq!(m.iter().collect::<Vec<_>>(), vec![3, 17]);
        assert!(m.intersects(&TypeMask::of(17)));
        assert!(!m.intersects(&TypeMask::of(16)));
    }

    #[test]
    fn sample_style_compiles() {
        let style = TechStyle::sample();
        assert_eq!(style.tech, "sample-cmos");
        assert_eq!(style.planes.len(), 3);
        assert_eq!(style.resist_classes.len(), 4);

        let poly = style.type_named("poly").unwrap();
        let pc = style.type_named("polycont").unwrap();
        let m1 = style.type_named("metal1").unwrap();
        let ndiff = style.type_named("ndiff").unwrap();
        let nfet = style.type_named("nfet").unwrap();
        let pwell = style.type_named("pwell").unwrap();
        let psd = style.type_named("psd").unwrap();

        // Connectivity: gates conduct with their poly, not with diffusion
        assert!(style.connects(poly, pc));
        assert!(style.connects(nfet, poly));
        assert!(!style.connects(nfet, ndiff));
        assert!(!style.connects(poly, m1));

        // Contacts cross planes without halo searches
        assert!(style.types[pc].is_contact());
        assert!(style.types[pc].connects_planes.is_empty());
        // The well-diffusion coupling is cross-plane *without* a contact,
        // and must land in the halo-search mask
        let well_plane = style.types[pwell].plane;
        assert!(style.types[psd].connects_planes.contains(well_plane));

        // Device recognition back-references
        assert_eq!(style.types[nfet].device, Some(0));
        assert!(style.gate_mask.contains(nfet));
        assert!(style.conducting.contains(poly));
        assert!(style.conducting.contains(nfet));

        // Capacitance tables
        assert_eq!(style.perim_cap(ndiff, None), 0.25);
        assert_eq!(style.perim_cap(ndiff, Some(poly)), 0.0);
    }

    #[test]
    fn compile_errors() {
        let mut src: TechSource = ext21utils::SerializationFormat::Yaml
            .from_str(SAMPLE_STYLE_YAML)
            .unwrap();
        src.types[0].plane = "nosuch".into();
        assert!(TechStyle::compile(&src).is_err());
    }
}
