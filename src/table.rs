//! Row sets: who sends, who receives, and which slice each one gets.
//!
//! A row set comes from a CSV file with the columns `direction`, `node`,
//! `path`, `from`, `to`, or from a YAML file of the form
//!
//! ```yaml
//! source:
//!   - nodeA:/data/big.txt
//! destination:
//!   - node: nodeB
//!     path: /out/part0
//!     from: 0
//!     to: 50
//!   - node: nodeC
//!     path: /out/part1
//!     from: 50
//! ```

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use void::Void;

use crate::error::{DistcopyError, Result};
use crate::node::{NodeRef, PathSpec};
use crate::serde::{optional_index, string_or_mapping};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Source,
    Destination,
}

/// Half-open index range `[from, to)`. `to = None` runs to the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRange {
    pub from: usize,
    pub to: Option<usize>,
}

impl IndexRange {
    pub fn new(from: usize, to: Option<usize>) -> Self {
        Self { from, to }
    }

    /// A missing `from` with a present `to` starts at zero.
    fn from_cells(from: Option<usize>, to: Option<usize>) -> Option<Self> {
        match (from, to) {
            (None, None) => None,
            (from, to) => Some(Self::new(from.unwrap_or(0), to)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRow {
    pub direction: Direction,
    pub spec: PathSpec,
    pub range: Option<IndexRange>,
}

impl ConfigRow {
    pub fn source(spec: PathSpec) -> Self {
        Self {
            direction: Direction::Source,
            spec,
            range: None,
        }
    }

    pub fn destination(spec: PathSpec, range: Option<IndexRange>) -> Self {
        Self {
            direction: Direction::Destination,
            spec,
            range,
        }
    }
}

/// The three distribution patterns and the row counts each one accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    Broadcast,
    Scatter,
    Gather,
}

impl Pattern {
    pub fn check_counts(self, sources: usize, destinations: usize) -> Result<()> {
        match self {
            Pattern::Broadcast | Pattern::Scatter if sources < 1 => Err(DistcopyError::Config(
                "There should be at least one source in the configuration.".to_string(),
            )),
            Pattern::Gather if sources != 1 => Err(DistcopyError::Config(
                "There should be exactly one source in the configuration.".to_string(),
            )),
            _ if destinations < 1 => Err(DistcopyError::Config(
                "There should be at least one destination in the configuration.".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Immutable input of one broadcast, scatter, or gather run.
/// Row order within each direction is preserved.
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    sources: Vec<ConfigRow>,
    destinations: Vec<ConfigRow>,
}

impl RowSet {
    pub fn new(rows: impl IntoIterator<Item = ConfigRow>) -> Self {
        let (sources, destinations) = rows
            .into_iter()
            .partition(|row| row.direction == Direction::Source);
        Self {
            sources,
            destinations,
        }
    }

    /// Reads a row set, picking YAML for `.yaml`/`.yml` files and CSV otherwise.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            DistcopyError::Config(format!("Failed to open {}: {}", path.display(), e))
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_reader(file),
            _ => Self::from_csv_reader(file),
        }
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut rows = vec![];
        for record in reader.deserialize() {
            let CsvRow {
                direction,
                node,
                path,
                from,
                to,
            } = record?;
            rows.push(ConfigRow {
                direction,
                spec: PathSpec::new(node, path),
                range: IndexRange::from_cells(from, to),
            });
        }
        Ok(Self::new(rows))
    }

    pub fn from_yaml_reader<R: Read>(reader: R) -> Result<Self> {
        let YamlRowSet {
            source,
            destination,
        } = serde_yaml::from_reader(reader)?;
        let sources = source
            .into_iter()
            .map(|YamlEntry(entry)| entry.into_row(Direction::Source));
        let destinations = destination
            .into_iter()
            .map(|YamlEntry(entry)| entry.into_row(Direction::Destination));
        Ok(Self::new(sources.chain(destinations)))
    }

    pub fn sources(&self) -> &[ConfigRow] {
        &self.sources
    }

    pub fn destinations(&self) -> &[ConfigRow] {
        &self.destinations
    }

    /// Every distinct node named by any row, in sorted order.
    pub fn nodes(&self) -> BTreeSet<NodeRef> {
        self.sources
            .iter()
            .chain(&self.destinations)
            .map(|row| row.spec.node.clone())
            .collect()
    }

    pub fn check(&self, pattern: Pattern) -> Result<()> {
        pattern.check_counts(self.sources.len(), self.destinations.len())
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    direction: Direction,
    node: NodeRef,
    path: String,
    #[serde(default, deserialize_with = "optional_index")]
    from: Option<usize>,
    #[serde(default, deserialize_with = "optional_index")]
    to: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct YamlRowSet {
    #[serde(default)]
    source: Vec<YamlEntry>,
    #[serde(default)]
    destination: Vec<YamlEntry>,
}

#[derive(Debug, Deserialize)]
struct YamlEntry(#[serde(deserialize_with = "string_or_mapping")] EntrySpec);

#[derive(Debug, Deserialize)]
struct EntrySpec {
    node: NodeRef,
    path: String,
    #[serde(default, deserialize_with = "optional_index")]
    from: Option<usize>,
    #[serde(default, deserialize_with = "optional_index")]
    to: Option<usize>,
}

impl EntrySpec {
    fn into_row(self, direction: Direction) -> ConfigRow {
        ConfigRow {
            direction,
            spec: PathSpec::new(self.node, self.path),
            range: IndexRange::from_cells(self.from, self.to),
        }
    }
}

impl FromStr for EntrySpec {
    type Err = Void;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let PathSpec { node, path } = s.parse()?;
        Ok(Self {
            node,
            path,
            from: None,
            to: None,
        })
    }
}
