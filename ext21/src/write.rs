//!
//! # Ext-Format Writing Module
//!
//! Emits one cell's extraction results in the line-oriented,
//! whitespace-separated `.ext` format, section order fixed:
//! header (`timestamp`, `version`, `tech`, `style`, `scale`,
//! `resistclasses`, optional `parameters`, `use` records), then per node
//! its `port`s, the `node`/`substrate` record itself, `attr`s and
//! `equiv`s, then the device records, a blank-line terminator, and
//! finally any `distance` records from the path-length pass.
//!

// Std-Lib
use std::io::Write;
use std::path::Path;

// Crates.io
use serde::{Deserialize, Serialize};

// Local Imports
use crate::db::{CellDef, LabelKind};
use crate::devices::DeviceRecord;
use crate::error::ExtResult;
use crate::geom::Rect;
use crate::length::DistanceRecord;
use crate::nodes::NodeRegion;
use crate::tech::{DeviceKind, TechStyle};
use ext21utils::{enumstr, EnumStr};

enumstr!(
    /// # Ext Record Keys
    ///
    /// The record-keywords of the `.ext` format, one per line-kind.
    /// Keys are context-free: every line's meaning is determined by its
    /// leading token.
    ExtKey {
        Timestamp: "timestamp",
        Version: "version",
        Tech: "tech",
        Style: "style",
        Scale: "scale",
        Resistclasses: "resistclasses",
        Parameters: "parameters",
        Use: "use",
        Port: "port",
        Node: "node",
        Substrate: "substrate",
        Attr: "attr",
        Equiv: "equiv",
        Fet: "fet",
        Device: "device",
        Distance: "distance",
    }
);

/// # One Cell's Extraction Results
///
/// Everything the writer needs beyond the def itself.
#[derive(Debug, Default)]
pub struct CellResults {
    pub nodes: Vec<NodeRegion>,
    pub devices: Vec<DeviceRecord>,
    pub distances: Vec<DistanceRecord>,
}

/// Write `def`'s results to file `fname`
pub fn save(
    style: &TechStyle,
    def: &CellDef,
    results: &CellResults,
    fname: impl AsRef<Path>,
) -> ExtResult<()> {
    let f = std::fs::File::create(fname)?;
    ExtWriter::new(f).write_def(style, def, results)
}
/// Write `def`'s results to an ext-format [String]
pub fn to_string(style: &TechStyle, def: &CellDef, results: &CellResults) -> ExtResult<String> {
    let mut buf = Vec::new();
    ExtWriter::new(&mut buf).write_def(style, def, results)?;
    Ok(String::from_utf8(buf).expect("ext output is always utf8"))
}

/// # Ext Writing Helper
pub struct ExtWriter<'wr> {
    /// Write Destination
    dest: Box<dyn Write + 'wr>,
}
impl<'wr> ExtWriter<'wr> {
    /// Create a new [ExtWriter] to destination `dest`.
    /// Destination is boxed internally.
    pub fn new(dest: impl Write + 'wr) -> Self {
        Self {
            dest: Box::new(dest),
        }
    }
    /// Write one cell, sections in the format's fixed order
    pub fn write_def(
        &mut self,
        style: &TechStyle,
        def: &CellDef,
        results: &CellResults,
    ) -> ExtResult<()> {
        use ExtKey::*;
        writeln!(self.dest, "{} {}", Timestamp, def.timestamp)?;
        writeln!(self.dest, "{} {}", Version, env!("CARGO_PKG_VERSION"))?;
        writeln!(self.dest, "{} {}", Tech, style.tech)?;
        writeln!(self.dest, "{} {}", Style, style.name)?;
        writeln!(
            self.dest,
            "{} {} {} {}",
            Scale, style.resist_scale, style.cap_scale, style.units_per_lambda
        )?;
        write!(self.dest, "{}", Resistclasses)?;
        for c in style.resist_classes.iter() {
            write!(
                self.dest,
                " {}",
                (c.ohms_per_square * style.resist_scale as f64).round() as i64
            )?;
        }
        writeln!(self.dest)?;
        if let Some(p) = &def.parameters {
            writeln!(self.dest, "{} :{} {}", Parameters, def.name, p)?;
        }
        for u in def.uses.iter() {
            let child = u.cell.read()?;
            let mut id = u.use_id.clone();
            if let Some(a) = &u.array {
                id = format!(
                    "{}[{}:{}:{}][{}:{}:{}]",
                    id, a.xlo, a.xhi, a.xsep, a.ylo, a.yhi, a.ysep
                );
            }
            let t = u.transform.ints();
            writeln!(
                self.dest,
                "{} {} {} {} {} {} {} {} {}",
                Use, child.name, id, t[0], t[1], t[2], t[3], t[4], t[5]
            )?;
        }
        for node in results.nodes.iter() {
            self.write_node(style, node)?;
        }
        for dev in results.devices.iter() {
            self.write_device(dev)?;
        }
        // The per-cell blank-line terminator
        writeln!(self.dest)?;
        for d in results.distances.iter() {
            writeln!(
                self.dest,
                "{} \"{}\" \"{}\" {} {}",
                Distance, d.driver, d.receiver, d.min, d.max
            )?;
        }
        Ok(())
    }

    /// Write one node: its ports, the node/substrate record, attributes,
    /// and name equivalences
    fn write_node(&mut self, style: &TechStyle, node: &NodeRegion) -> ExtResult<()> {
        use ExtKey::*;
        let name = node.name(style);
        let short = &style.types[node.typ].short;

        for lab in node.labels.iter() {
            if let Some(portnum) = lab.port {
                writeln!(
                    self.dest,
                    "{} \"{}\" {} {} {} {} {} {}",
                    Port,
                    lab.text,
                    portnum,
                    lab.area.left(),
                    lab.area.bottom(),
                    lab.area.right(),
                    lab.area.top(),
                    short
                )?;
            }
        }
        let key = if node.substrate { Substrate } else { Node };
        let resist = if node.substrate {
            0
        } else {
            (node.resist * style.resist_scale as f64).round() as i64
        };
        let cap = if node.substrate { 0.0 } else { node.cap };
        write!(
            self.dest,
            "{} \"{}\" {} {} {} {} {}",
            key,
            name,
            resist,
            cap,
            node.anchor.x,
            node.anchor.y,
            short
        )?;
        for (a, p) in node.class_sums.iter() {
            write!(self.dest, " {} {}", a, p)?;
        }
        writeln!(self.dest)?;

        for lab in node.labels.iter() {
            if lab.kind == LabelKind::NodeAttr {
                writeln!(
                    self.dest,
                    "{} {} {} {} {} {} {} \"{}\"",
                    Attr,
                    name,
                    lab.area.left(),
                    lab.area.bottom(),
                    lab.area.right(),
                    lab.area.top(),
                    short,
                    lab.text
                )?;
            }
        }
        // Additional names on the same node become equivalences
        let mut seen_first = false;
        for lab in node.labels.iter() {
            if lab.kind != LabelKind::Name {
                continue;
            }
            if !seen_first {
                seen_first = true;
                continue;
            }
            writeln!(self.dest, "{} \"{}\" \"{}\"", Equiv, name, lab.text)?;
        }
        Ok(())
    }

    /// Write one device record: the legacy `fet` form for [DeviceKind::Fet],
    /// the `device` form for everything else
    fn write_device(&mut self, dev: &DeviceRecord) -> ExtResult<()> {
        use ExtKey::*;
        let b: &Rect = &dev.bounds;
        let model = dev.model.as_deref().unwrap_or("none");
        match dev.kind {
            DeviceKind::Fet => {
                write!(
                    self.dest,
                    "{} {} {} {} {} {} {} {} \"{}\"",
                    Fet,
                    model,
                    b.left(),
                    b.bottom(),
                    b.right(),
                    b.top(),
                    dev.area,
                    dev.perim,
                    dev.substrate
                )?;
            }
            _ => {
                write!(
                    self.dest,
                    "{} {} {} {} {} {} {} {} {}",
                    Device,
                    dev.kind,
                    model,
                    b.left(),
                    b.bottom(),
                    b.right(),
                    b.top(),
                    dev.length,
                    dev.width
                )?;
                for (k, v) in dev.params.iter() {
                    write!(self.dest, " {}={}", k, v)?;
                }
                write!(self.dest, " \"{}\"", dev.substrate)?;
            }
        }
        // Terminal blocks: the gate first, then each terminal in
        // canonical order
        self.write_term(&dev.gate)?;
        for t in dev.terms.iter() {
            self.write_term(t)?;
        }
        writeln!(self.dest)?;
        Ok(())
    }

    /// Write one terminal block: node name, edge length, attributes
    fn write_term(&mut self, t: &crate::devices::DevTerm) -> ExtResult<()> {
        write!(self.dest, " \"{}\" {}", t.node, t.len)?;
        for a in t.attrs.iter() {
            write!(self.dest, ",\"{}\"", a)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::CellDef;
    use crate::error::ExtContext;
    use crate::nodes::find_nodes;

    #[test]
    fn header_and_node_records() {
        let style = TechStyle::sample();
        let m1 = style.type_named("metal1").unwrap();
        let mut def = CellDef::new("cell", style);
        def.timestamp = 1234;
        def.paint(style, Rect::from_coords(0, 0, 10, 2), m1);
        def.add_label(style, "out", Rect::from_coords(1, 1, 1, 1), m1);
        def.add_label(style, "alt", Rect::from_coords(2, 1, 2, 1), m1);

        let found = find_nodes(style, &def, None, true);
        let results = CellResults {
            nodes: found.nodes,
            ..Default::default()
        };
        let text = to_string(style, &def, &results).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "timestamp 1234");
        assert!(lines[1].starts_with("version "));
        assert_eq!(lines[2], "tech sample-cmos");
        assert!(lines[3].starts_with("style "));
        assert_eq!(lines[4], "scale 1000 1 100");
        assert_eq!(lines[5], "resistclasses 48000 95000 70 1700000");
        // The synthetic substrate node writes zero resistance and capacitance
        assert!(lines[6].starts_with("substrate \"Gnd!\" 0 0"));
        // The metal node: named by its first label, equiv'd to the second
        let node_line = lines.iter().find(|l| l.starts_with("node ")).unwrap();
        assert!(node_line.starts_with("node \"out\""));
        assert!(lines.iter().any(|l| *l == "equiv \"out\" \"alt\""));
        // Blank-line cell terminator
        assert_eq!(*lines.last().unwrap(), "");
    }

    #[test]
    fn device_record_shape() {
        use crate::devices::{DevTerm, DeviceRecord};
        use crate::tech::DeviceKind;
        let style = TechStyle::sample();
        let def = CellDef::new("cell", style);
        let dev = DeviceRecord {
            kind: DeviceKind::Mosfet,
            model: Some("nfet".into()),
            bounds: Rect::from_coords(0, 0, 2, 4),
            area: 8,
            perim: 12,
            length: 2,
            width: 4,
            params: vec![],
            substrate: "Gnd!".into(),
            gate: DevTerm {
                node: "g".into(),
                len: 4,
                attrs: vec!["fast".into()],
            },
            terms: vec![
                DevTerm {
                    node: "d1".into(),
                    len: 4,
                    attrs: vec![],
                },
                DevTerm {
                    node: "d2".into(),
                    len: 4,
                    attrs: vec![],
                },
            ],
        };
        let results = CellResults {
            devices: vec![dev],
            ..Default::default()
        };
        let text = to_string(style, &def, &results).unwrap();
        let line = text
            .lines()
            .find(|l| l.starts_with("device "))
            .unwrap();
        assert_eq!(
            line,
            "device mosfet nfet 0 0 2 4 2 4 \"Gnd!\" \"g\" 4,\"fast\" \"d1\" 4 \"d2\" 4"
        );
    }

    #[test]
    fn legacy_fet_record_shape() {
        use crate::devices::{DevTerm, DeviceRecord};
        use crate::tech::DeviceKind;
        let style = TechStyle::sample();
        let def = CellDef::new("cell", style);
        let dev = DeviceRecord {
            kind: DeviceKind::Fet,
            model: Some("nfet".into()),
            bounds: Rect::from_coords(0, 0, 2, 4),
            area: 8,
            perim: 12,
            length: 2,
            width: 4,
            params: vec![],
            substrate: "Gnd!".into(),
            gate: DevTerm {
                node: "g".into(),
                len: 4,
                attrs: vec![],
            },
            terms: vec![DevTerm {
                node: "d1".into(),
                len: 4,
                attrs: vec![],
            }],
        };
        let results = CellResults {
            devices: vec![dev],
            ..Default::default()
        };
        let text = to_string(style, &def, &results).unwrap();
        let line = text.lines().find(|l| l.starts_with("fet ")).unwrap();
        // The legacy form writes gate area and perimeter, never L/W
        assert_eq!(line, "fet nfet 0 0 2 4 8 12 \"Gnd!\" \"g\" 4 \"d1\" 4");
    }

    #[test]
    fn distances_follow_terminator() {
        let style = TechStyle::sample();
        let def = CellDef::new("cell", style);
        let results = CellResults {
            distances: vec![DistanceRecord {
                driver: "a".into(),
                receiver: "b".into(),
                min: 5,
                max: 9,
            }],
            ..Default::default()
        };
        let text = to_string(style, &def, &results).unwrap();
        assert!(text.ends_with("\n\ndistance \"a\" \"b\" 5 9\n"));
    }

    #[test]
    fn interrupted_output_stays_wellformed() {
        let style = TechStyle::sample();
        let m1 = style.type_named("metal1").unwrap();
        let mut def = CellDef::new("cell", style);
        def.paint(style, Rect::from_coords(0, 0, 4, 2), m1);

        // Raise the interrupt before device analysis: the device list
        // comes back empty, but node results remain writable
        let found = find_nodes(style, &def, None, false);
        let mut ctx = ExtContext::new();
        ctx.interrupt_handle()
            .store(true, std::sync::atomic::Ordering::Relaxed);
        let devs = crate::devices::extract_devices(style, &def, &found, &mut ctx);
        assert!(devs.is_empty());

        let results = CellResults {
            nodes: found.nodes,
            devices: devs,
            ..Default::default()
        };
        let text = to_string(style, &def, &results).unwrap();
        assert!(text.contains("node "));
        assert!(text.ends_with("\n\n"));
    }
}
