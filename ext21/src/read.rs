//!
//! # Ext-Format Header Reading
//!
//! The sliver of `.ext` parsing the engine itself needs: recovering the
//! `timestamp` record from a previously written file, so incremental
//! re-extraction can compare it against a cell's current timestamp
//! without re-extracting anything.
//!

// Std-Lib
use std::path::Path;

// Local Imports
use crate::error::ExtResult;
use crate::write::ExtKey;
use ext21utils::EnumStr;

/// Read the embedded timestamp of the `.ext` file at `fname`.
///
/// Returns `Ok(None)` when the file does not exist or carries no
/// readable timestamp - both mean "extract afresh", never an error.
pub fn ext_timestamp(fname: impl AsRef<Path>) -> ExtResult<Option<i64>> {
    let fname = fname.as_ref();
    if !fname.exists() {
        return Ok(None);
    }
    let src = std::fs::read_to_string(fname)?;
    for line in src.lines() {
        let mut toks = line.split_whitespace();
        match toks.next().and_then(ExtKey::from_str) {
            Some(ExtKey::Timestamp) => {
                return Ok(toks.next().and_then(|t| t.parse::<i64>().ok()));
            }
            _ => continue,
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_round_trip() {
        use crate::db::CellDef;
        use crate::tech::TechStyle;
        use crate::write::{save, CellResults};

        let style = TechStyle::sample();
        let mut def = CellDef::new("cell", style);
        def.timestamp = 987654;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cell.ext");
        save(style, &def, &CellResults::default(), &path).unwrap();
        assert_eq!(ext_timestamp(&path).unwrap(), Some(987654));
    }

    #[test]
    fn missing_file_is_none() {
        assert_eq!(ext_timestamp("no/such/file.ext").unwrap(), None);
    }
}
