//! # Detector name tables
//!
//! Static correspondence between detector names (`<group>_<name>`, e.g. `R22_S11`),
//! detector numbers and detector serials for one instrument.
//!
//! Tables are CSV files with the columns `group,name,num,serial` (the serial may be
//! empty). The built-in tables are embedded in the binary; other tables can be
//! loaded with [`DetectorTable::from_csv_path`].
use std::fs;

use ahash::AHashMap;
use camino::Utf8Path;
use serde::Deserialize;

use super::bimap::BiMap;
use crate::{constants::DetectorNum, obsinfo_errors::ObsInfoError};

pub(crate) static LSSTCAM_TABLE: &str = include_str!("data/lsstcam.csv");
pub(crate) static COMCAM_TABLE: &str = include_str!("data/comcam.csv");
pub(crate) static IMSIM_TABLE: &str = include_str!("data/imsim.csv");
pub(crate) static TS8_TABLE: &str = include_str!("data/ts8.csv");
pub(crate) static TS3_TABLE: &str = include_str!("data/ts3.csv");
pub(crate) static UCDCAM_TABLE: &str = include_str!("data/ucdcam.csv");

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DetectorEntry {
    pub group: String,
    pub name: String,
    pub num: DetectorNum,
    #[serde(default)]
    pub serial: Option<String>,
}

impl DetectorEntry {
    pub fn full_name(&self) -> String {
        full_name(&self.group, &self.name)
    }
}

/// `<group>_<name>`
pub fn full_name(group: &str, name: &str) -> String {
    format!("{group}_{name}")
}

#[derive(Debug, Clone, Default)]
pub struct DetectorTable {
    entries: Vec<DetectorEntry>,
    names: BiMap<String, DetectorNum>,
    serials: AHashMap<String, usize>,
}

impl DetectorTable {
    /// Build a table from entries.
    ///
    /// Return
    /// ----------
    /// * [`ObsInfoError::DetectorTable`] if a full name or a serial appears twice.
    pub fn from_entries(entries: Vec<DetectorEntry>) -> Result<Self, ObsInfoError> {
        let mut names = BiMap::new();
        let mut serials = AHashMap::new();

        for (i, entry) in entries.iter().enumerate() {
            if !names.insert(entry.full_name(), entry.num) {
                return Err(ObsInfoError::DetectorTable(format!(
                    "detector {} is defined twice",
                    entry.full_name()
                )));
            }
            if let Some(serial) = entry.serial.as_deref().filter(|s| !s.is_empty()) {
                if serials.insert(serial.to_string(), i).is_some() {
                    return Err(ObsInfoError::DetectorTable(format!(
                        "serial {serial} is defined in multiple places"
                    )));
                }
            }
        }

        Ok(DetectorTable {
            entries,
            names,
            serials,
        })
    }

    /// Parse a `group,name,num,serial` CSV table.
    pub fn from_csv_str(data: &str) -> Result<Self, ObsInfoError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(data.as_bytes());
        let entries = reader
            .deserialize::<DetectorEntry>()
            .map(|record| {
                record.map(|mut entry| {
                    entry.serial = entry.serial.filter(|s| !s.is_empty());
                    entry
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_entries(entries)
    }

    /// Read a CSV table from disk.
    pub fn from_csv_path(path: &Utf8Path) -> Result<Self, ObsInfoError> {
        let data = fs::read_to_string(path)?;
        Self::from_csv_str(&data)
    }

    /// Detector number of `group_name`.
    pub fn num(&self, group: &str, name: &str) -> Option<DetectorNum> {
        self.names.get_by_key(&full_name(group, name)).copied()
    }

    /// Full name of a detector number. When two detectors share a number, the
    /// first one listed is returned.
    pub fn name_of(&self, num: DetectorNum) -> Option<&str> {
        self.names.get_by_value(&num).map(String::as_str)
    }

    pub fn by_serial(&self, serial: &str) -> Option<&DetectorEntry> {
        self.serials.get(serial).map(|&i| &self.entries[i])
    }

    /// Largest detector number in the table.
    pub fn max_num(&self) -> Option<DetectorNum> {
        self.entries.iter().map(|e| e.num).max()
    }

    pub fn entries(&self) -> &[DetectorEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod detector_table_test {
    use super::*;

    #[test]
    fn test_lsstcam_numbering() {
        let table = DetectorTable::from_csv_str(LSSTCAM_TABLE).unwrap();
        assert_eq!(table.len(), 205);
        assert_eq!(table.num("R01", "S00"), Some(0));
        assert_eq!(table.num("R10", "S02"), Some(29));
        assert_eq!(table.num("R10", "S22"), Some(35));
        assert_eq!(table.num("R22", "S21"), Some(97));
        assert_eq!(table.num("R00", "SG0"), Some(189));
        assert_eq!(table.max_num(), Some(204));
        assert_eq!(table.name_of(97), Some("R22_S21"));
        assert_eq!(table.num("R99", "S00"), None);
    }

    #[test]
    fn test_serial_lookup() {
        let table = DetectorTable::from_csv_str(TS8_TABLE).unwrap();
        let entry = table.by_serial("E2V-CCD250-179").unwrap();
        assert_eq!(
            (entry.group.as_str(), entry.name.as_str(), entry.num),
            ("RTM-010", "S11", 67)
        );
        assert_eq!(table.num("RTM-005", "S00"), Some(27));
        assert!(table.by_serial("").is_none());

        let ucd = DetectorTable::from_csv_str(UCDCAM_TABLE).unwrap();
        assert_eq!(ucd.by_serial("E2V-CCD250-112-09").map(|e| e.num), Some(0));
        assert_eq!(ucd.name_of(0), Some("R00_S00"));
    }

    #[test]
    fn test_embedded_tables_load() {
        for data in [COMCAM_TABLE, IMSIM_TABLE, TS3_TABLE] {
            assert!(DetectorTable::from_csv_str(data).is_ok());
        }
    }

    #[test]
    fn test_duplicates_rejected() {
        let dup_name = "group,name,num,serial\nR00,S00,0,\nR00,S00,1,\n";
        assert!(matches!(
            DetectorTable::from_csv_str(dup_name),
            Err(ObsInfoError::DetectorTable(_))
        ));

        let dup_serial = "group,name,num,serial\nR00,S00,0,X-1\nR01,S00,1,X-1\n";
        assert!(DetectorTable::from_csv_str(dup_serial).is_err());

        let bad_num = "group,name,num,serial\nR00,S00,zero,\n";
        assert!(DetectorTable::from_csv_str(bad_num).is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            DetectorTable::from_csv_path(Utf8Path::new("does/not/exist.csv")),
            Err(ObsInfoError::IoError(_))
        ));
    }
}
