//! City roster: which cities exist and which have been drawn.
//!
//! Rows come from a CSV file with a header row. Column names are matched
//! case-insensitively and may appear in any order:
//!
//! - `name` (or `nome`, `city`): required
//! - `drawn` (or `desenhada`): optional, missing means not drawn
//! - `link`: optional

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use thiserror::Error;
use tracing::{debug, info};

use crate::models::place::normalize_name;
use crate::models::{CityRecord, CityStatus};

const NAME_COLUMNS: &[&str] = &["name", "nome", "city"];
const DRAWN_COLUMNS: &[&str] = &["drawn", "desenhada"];
const LINK_COLUMNS: &[&str] = &["link", "url"];

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("failed to open roster: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to read roster: {0}")]
    Csv(#[from] csv::Error),
    #[error("roster has no name column (expected one of {0:?})")]
    MissingNameColumn(&'static [&'static str]),
    #[error("city name is empty")]
    EmptyQuery,
}

/// Ordered list of cities as they appear in the source.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    records: Vec<CityRecord>,
}

impl Roster {
    pub fn new(records: Vec<CityRecord>) -> Self {
        Self { records }
    }

    pub fn from_csv_path(path: &Path) -> Result<Self, RosterError> {
        info!("Loading city roster from {}", path.display());
        let roster = Self::from_reader(File::open(path)?)?;
        info!(
            "Loaded {} cities ({} drawn)",
            roster.len(),
            roster.drawn().count()
        );
        Ok(roster)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, RosterError> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let name_idx = column(&headers, NAME_COLUMNS)
            .ok_or(RosterError::MissingNameColumn(NAME_COLUMNS))?;
        let drawn_idx = column(&headers, DRAWN_COLUMNS);
        let link_idx = column(&headers, LINK_COLUMNS);

        let mut records = Vec::new();
        for (line, result) in csv_reader.records().enumerate() {
            let row = result?;
            let name = row.get(name_idx).unwrap_or("");
            if name.is_empty() {
                debug!("Skipping roster row {} without a name", line + 2);
                continue;
            }

            records.push(CityRecord {
                name: name.to_string(),
                drawn: drawn_idx
                    .and_then(|i| row.get(i))
                    .is_some_and(parse_drawn),
                link: link_idx
                    .and_then(|i| row.get(i))
                    .filter(|l| !l.is_empty() && *l != "#")
                    .map(String::from),
            });
        }

        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[CityRecord] {
        &self.records
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.name.as_str())
    }

    pub fn drawn(&self) -> impl Iterator<Item = &CityRecord> {
        self.records.iter().filter(|r| r.drawn)
    }

    /// Exact, case-insensitive lookup of a typed city name
    pub fn find(&self, name: &str) -> Option<&CityRecord> {
        let key = normalize_name(name);
        self.records
            .iter()
            .find(|r| normalize_name(&r.name) == key)
    }

    /// Whether the typed city has been drawn
    pub fn check(&self, input: &str) -> Result<CityStatus, RosterError> {
        if input.trim().is_empty() {
            return Err(RosterError::EmptyQuery);
        }

        Ok(match self.find(input) {
            Some(record) if record.drawn => CityStatus::Drawn {
                name: record.name.clone(),
                link: record.link.clone(),
            },
            Some(record) => CityStatus::NotDrawn {
                name: record.name.clone(),
            },
            None => CityStatus::Unknown,
        })
    }

    /// Names starting with `prefix` (case-insensitive), in roster order
    pub fn suggest(&self, prefix: &str, limit: usize) -> Vec<&str> {
        let prefix = normalize_name(prefix);
        self.names()
            .filter(|name| name.to_lowercase().starts_with(&prefix))
            .take(limit)
            .collect()
    }
}

fn column(headers: &StringRecord, candidates: &[&str]) -> Option<usize> {
    headers
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim())
        .position(|h| candidates.iter().any(|c| h.eq_ignore_ascii_case(c)))
}

fn parse_drawn(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "sim" | "yes" | "true" | "1" | "x"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
nome,desenhada,link
Porto Alegre,Sim,https://example.org/poa.png
Pelotas,Não,#
Santa Maria,sim,
,Sim,https://example.org/orphan.png
Santana do Livramento,Não,
";

    fn roster() -> Roster {
        Roster::from_reader(SAMPLE.as_bytes()).unwrap()
    }

    #[test]
    fn test_parse_rows() {
        let roster = roster();
        assert_eq!(roster.len(), 4);
        assert_eq!(
            roster.records()[0],
            CityRecord {
                name: "Porto Alegre".into(),
                drawn: true,
                link: Some("https://example.org/poa.png".into()),
            }
        );
        assert_eq!(roster.records()[1].link, None);
        assert!(roster.records()[2].drawn);
        assert_eq!(roster.records()[2].link, None);

        let drawn: Vec<&str> = roster.drawn().map(|r| r.name.as_str()).collect();
        assert_eq!(drawn, vec!["Porto Alegre", "Santa Maria"]);
    }

    #[test]
    fn test_english_headers_in_any_order() {
        let csv = "link,Name\nhttps://example.org/a.png,Canoas\n";
        let roster = Roster::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(roster.records()[0].name, "Canoas");
        assert!(!roster.records()[0].drawn);
    }

    #[test]
    fn test_header_with_byte_order_mark() {
        let csv = "\u{feff}nome,desenhada\nCanoas,Sim\n";
        let roster = Roster::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.records()[0].name, "Canoas");
        assert!(roster.records()[0].drawn);
    }

    #[test]
    fn test_drawn_flag_values() {
        for value in ["Sim", "YES", "true", "1", "x"] {
            assert!(parse_drawn(value), "{value}");
        }
        for value in ["Não", "s", "y", "no", "", "0"] {
            assert!(!parse_drawn(value), "{value}");
        }
    }

    #[test]
    fn test_missing_name_column() {
        let err = Roster::from_reader("drawn,link\nSim,#\n".as_bytes()).unwrap_err();
        assert!(matches!(err, RosterError::MissingNameColumn(_)));
    }

    #[test]
    fn test_check() {
        let roster = roster();
        assert_eq!(
            roster.check("  porto alegre ").unwrap(),
            CityStatus::Drawn {
                name: "Porto Alegre".into(),
                link: Some("https://example.org/poa.png".into()),
            }
        );
        assert_eq!(
            roster.check("PELOTAS").unwrap(),
            CityStatus::NotDrawn {
                name: "Pelotas".into()
            }
        );
        assert_eq!(roster.check("Gotham").unwrap(), CityStatus::Unknown);
        assert!(matches!(roster.check("   "), Err(RosterError::EmptyQuery)));
    }

    #[test]
    fn test_suggest() {
        let roster = roster();
        assert_eq!(
            roster.suggest("san", 10),
            vec!["Santa Maria", "Santana do Livramento"]
        );
        assert_eq!(roster.suggest("SAN", 1), vec!["Santa Maria"]);
        assert_eq!(roster.suggest("", 2), vec!["Porto Alegre", "Pelotas"]);
        assert!(roster.suggest("xyz", 10).is_empty());
    }

    #[test]
    fn test_from_csv_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let roster = Roster::from_csv_path(file.path()).unwrap();
        assert_eq!(roster.len(), 4);
        assert!(matches!(
            Roster::from_csv_path(Path::new("/no/such/roster.csv")),
            Err(RosterError::Io(_))
        ));
    }
}
