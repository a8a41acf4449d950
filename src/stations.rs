//! # Station Directory
//!
//! Resolves station names to identifiers and positions. Names are first
//! matched exactly; failing that, a fuzzy match tolerant of case and
//! punctuation differences is tried and the first candidate wins.
//!
//! The backing store is abstracted as [`HarmonicsDatabase`]. The bundled
//! implementation, [`StationIndex`], is a JSON array exported from the
//! harmonics file:
//!
//! ```json
//! [
//!   { "id": 17, "name": "Aberdeen, Scotland", "lat": 57.1433, "lon": -2.0783 }
//! ]
//! ```
//!
//! NOTE: longitudes are -180..180, positive East.

use crate::TideError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Index of a station within the harmonics database
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StationId(pub u32);

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Position part of a station header
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StationHeader {
    pub lat: f64,
    pub lon: f64,
}

/// A resolved station. Immutable once resolved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StationRecord {
    pub id: StationId,
    /// Name as stored in the database
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// Read access to a station database.
pub trait HarmonicsDatabase: Send {
    /// Station whose name matches exactly
    fn find_exact(&self, name: &str) -> Option<StationId>;

    /// Every station whose name loosely matches, in database order
    fn find_fuzzy(&self, name: &str) -> Vec<StationId>;

    /// Header of a station, if readable
    fn station_header(&self, id: StationId) -> Option<StationHeader>;

    /// Stored name of a station
    fn station_name(&self, id: StationId) -> Option<&str>;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct IndexEntry {
    id: u32,
    name: String,
    lat: f64,
    lon: f64,
}

/// JSON-backed station database.
#[derive(Clone, Debug, Default)]
pub struct StationIndex {
    entries: Vec<IndexEntry>,
}

impl StationIndex {
    /// Load an index file, failing with [`TideError::DatabaseOpen`] if it is
    /// missing or not a valid index.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TideError> {
        let path = path.as_ref();
        let open_error = |reason: String| TideError::DatabaseOpen {
            path: path.to_path_buf(),
            reason,
        };
        let data = fs::read(path).map_err(|e| open_error(e.to_string()))?;
        let entries: Vec<IndexEntry> =
            serde_json::from_slice(&data).map_err(|e| open_error(e.to_string()))?;
        info!(path = %path.display(), stations = entries.len(), "station index loaded");
        Ok(StationIndex { entries })
    }

    /// Build an index from `(id, name, lat, lon)` tuples.
    pub fn from_stations<I, S>(stations: I) -> Self
    where
        I: IntoIterator<Item = (u32, S, f64, f64)>,
        S: Into<String>,
    {
        let entries = stations
            .into_iter()
            .map(|(id, name, lat, lon)| IndexEntry {
                id,
                name: name.into(),
                lat,
                lon,
            })
            .collect();
        StationIndex { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, id: StationId) -> Option<&IndexEntry> {
        self.entries.iter().find(|e| e.id == id.0)
    }
}

impl HarmonicsDatabase for StationIndex {
    fn find_exact(&self, name: &str) -> Option<StationId> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| StationId(e.id))
    }

    fn find_fuzzy(&self, name: &str) -> Vec<StationId> {
        fuzzy_matches(name, self.entries.iter().map(|e| (StationId(e.id), e.name.as_str())))
    }

    fn station_header(&self, id: StationId) -> Option<StationHeader> {
        self.entry(id).map(|e| StationHeader {
            lat: e.lat,
            lon: e.lon,
        })
    }

    fn station_name(&self, id: StationId) -> Option<&str> {
        self.entry(id).map(|e| e.name.as_str())
    }
}

/// Lower-case, alphanumeric words separated by single spaces.
fn normalize(name: &str) -> String {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// All candidates whose normalised name contains the normalised query.
///
/// Pure and finite: the full candidate list is returned at once, so there is
/// no search position carried between unrelated queries.
pub fn fuzzy_matches<'a, I>(query: &str, candidates: I) -> Vec<StationId>
where
    I: IntoIterator<Item = (StationId, &'a str)>,
{
    let wanted = normalize(query);
    if wanted.is_empty() {
        return Vec::new();
    }
    candidates
        .into_iter()
        .filter(|(_, name)| normalize(name).contains(&wanted))
        .map(|(id, _)| id)
        .collect()
}

/// Name-to-station resolution with a single-slot memo of the last resolved
/// name.
pub struct StationDirectory {
    database: Option<Box<dyn HarmonicsDatabase>>,
    last_resolved: Option<(String, StationRecord)>,
}

impl StationDirectory {
    /// Directory over a JSON [`StationIndex`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TideError> {
        Ok(Self::with_database(Box::new(StationIndex::load(path)?)))
    }

    pub fn with_database(database: Box<dyn HarmonicsDatabase>) -> Self {
        StationDirectory {
            database: Some(database),
            last_resolved: None,
        }
    }

    /// Directory with no station data; every lookup fails with
    /// [`TideError::StationNotFound`].
    pub fn empty() -> Self {
        StationDirectory {
            database: None,
            last_resolved: None,
        }
    }

    /// Resolve a station name, exactly if possible, otherwise fuzzily.
    pub fn resolve(&mut self, name: &str) -> Result<StationRecord, TideError> {
        if let Some(record) = self.memoized(name) {
            debug!(station = name, "station already resolved");
            return Ok(record.clone());
        }

        let database = self
            .database
            .as_deref()
            .ok_or_else(|| TideError::StationNotFound(name.to_string()))?;

        let id = match database.find_exact(name) {
            Some(id) => id,
            None => {
                debug!(station = name, "exact match failed, trying fuzzy");
                let candidates = database.find_fuzzy(name);
                if candidates.len() > 1 {
                    debug!(station = name, matches = candidates.len(), "several fuzzy matches, using first");
                }
                candidates
                    .first()
                    .copied()
                    .ok_or_else(|| TideError::StationNotFound(name.to_string()))?
            }
        };

        let header = database
            .station_header(id)
            .ok_or(TideError::RecordUnavailable(id))?;
        let record = StationRecord {
            id,
            name: database.station_name(id).unwrap_or(name).to_string(),
            lat: header.lat,
            lon: header.lon,
        };
        debug!(station = name, id = %id, resolved = %record.name, "station resolved");

        self.last_resolved = Some((name.to_string(), record.clone()));
        Ok(record)
    }

    /// Position of a station by identifier.
    pub fn location(&self, id: StationId) -> Result<(f64, f64), TideError> {
        self.database
            .as_deref()
            .and_then(|db| db.station_header(id))
            .map(|h| (h.lat, h.lon))
            .ok_or(TideError::RecordUnavailable(id))
    }

    /// Memo hit only when the given name is the one last resolved.
    fn memoized(&self, name: &str) -> Option<&StationRecord> {
        self.last_resolved
            .as_ref()
            .filter(|(given, _)| given == name)
            .map(|(_, record)| record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn index() -> StationIndex {
        StationIndex::from_stations([
            (1, "Aberdeen, Scotland", 57.1433, -2.0783),
            (2, "Leith, Scotland", 55.9833, -3.1667),
            (3, "Dundee, Scotland", 56.4567, -2.9667),
            (4, "Aberdeen Harbour Entrance", 57.14, -2.07),
        ])
    }

    #[test]
    fn exact_match_wins_over_fuzzy() {
        let mut dir = StationDirectory::with_database(Box::new(index()));
        let rec = dir.resolve("Aberdeen Harbour Entrance").unwrap();
        assert_eq!(rec.id, StationId(4));
    }

    #[test]
    fn fuzzy_match_uses_first_candidate() {
        let mut dir = StationDirectory::with_database(Box::new(index()));
        let rec = dir.resolve("ABERDEEN").unwrap();
        assert_eq!(rec.id, StationId(1));
        assert_eq!(rec.name, "Aberdeen, Scotland");
        assert!((rec.lat - 57.1433).abs() < 1e-9);
    }

    #[test]
    fn fuzzy_search_does_not_leak_between_queries() {
        let mut dir = StationDirectory::with_database(Box::new(index()));
        assert_eq!(dir.resolve("aberdeen").unwrap().id, StationId(1));
        assert_eq!(dir.resolve("leith").unwrap().id, StationId(2));
        assert_eq!(dir.resolve("ABERDEEN").unwrap().id, StationId(1));
    }

    #[test]
    fn unknown_station_is_not_found() {
        let mut dir = StationDirectory::with_database(Box::new(index()));
        assert!(matches!(
            dir.resolve("Le Havre"),
            Err(TideError::StationNotFound(name)) if name == "Le Havre"
        ));
    }

    #[test]
    fn empty_directory_finds_nothing() {
        let mut dir = StationDirectory::empty();
        assert!(matches!(dir.resolve("Leith"), Err(TideError::StationNotFound(_))));
        assert!(matches!(dir.location(StationId(1)), Err(TideError::RecordUnavailable(_))));
    }

    #[test]
    fn normalization_ignores_punctuation_and_case() {
        let found = fuzzy_matches(
            "dundee  scotland",
            [(StationId(9), "DUNDEE, Scotland"), (StationId(8), "Leith")],
        );
        assert_eq!(found, vec![StationId(9)]);
        assert!(fuzzy_matches("  ,, ", [(StationId(1), "Leith")]).is_empty());
    }

    #[test]
    fn location_by_id() {
        let dir = StationDirectory::with_database(Box::new(index()));
        let (lat, lon) = dir.location(StationId(2)).unwrap();
        assert!((lat - 55.9833).abs() < 1e-9);
        assert!((lon + 3.1667).abs() < 1e-9);
        assert!(dir.location(StationId(99)).is_err());
    }

    #[test]
    fn load_index_from_file() {
        let file = NamedTempFile::new().unwrap();
        fs::write(
            file.path(),
            r#"[{"id": 7, "name": "Leith, Scotland", "lat": 55.98, "lon": -3.17}]"#,
        )
        .unwrap();
        let mut dir = StationDirectory::load(file.path()).unwrap();
        assert_eq!(dir.resolve("Leith").unwrap().id, StationId(7));
    }

    #[test]
    fn corrupt_index_is_open_error() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "not json").unwrap();
        assert!(matches!(
            StationDirectory::load(file.path()),
            Err(TideError::DatabaseOpen { .. })
        ));
        assert!(matches!(
            StationDirectory::load("/nonexistent/stations.json"),
            Err(TideError::DatabaseOpen { .. })
        ));
    }
}
