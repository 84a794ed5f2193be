//! Stage 3: merge parsed detail blocks into one table

use crate::detail::RawBlock;
use crate::{BlockParser, Category};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Header plus positionally aligned rows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// No header and no rows
    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.rows.is_empty()
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Index of a column by name
    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    /// Every row has exactly as many cells as the header
    pub fn is_rectangular(&self) -> bool {
        self.rows.iter().all(|row| row.len() == self.header.len())
    }
}

/// What to do with a row whose width differs from the header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapePolicy {
    /// Drop the row and report it
    #[default]
    Strict,
    /// Append the row as-is
    Permissive,
}

impl FromStr for ShapePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(ShapePolicy::Strict),
            "permissive" => Ok(ShapePolicy::Permissive),
            other => Err(format!("unknown shape policy '{other}' (expected strict or permissive)")),
        }
    }
}

impl fmt::Display for ShapePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapePolicy::Strict => f.write_str("strict"),
            ShapePolicy::Permissive => f.write_str("permissive"),
        }
    }
}

/// Why a block contributed no row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DropReason {
    NoRows,
    ParseError { message: String },
    ShapeMismatch { expected: usize, actual: usize },
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::NoRows => f.write_str("no rows parsed"),
            DropReason::ParseError { message } => write!(f, "parse error: {message}"),
            DropReason::ShapeMismatch { expected, actual } => {
                write!(f, "row has {actual} columns, header has {expected}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedBlock {
    pub category: Category,
    pub identifier: String,
    pub reason: DropReason,
}

/// Normalizer output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
    pub table: Table,
    pub dropped: Vec<DroppedBlock>,
}

/// Merge blocks into a table
///
/// The first block that parses sets the header; each block then contributes
/// at most its first row, in block order. Degenerate blocks are dropped and
/// reported, never raised.
pub fn normalize(blocks: &[RawBlock], parser: &dyn BlockParser, policy: ShapePolicy) -> Normalized {
    let mut out = Normalized::default();
    let mut have_header = false;

    for block in blocks {
        let include_header = !have_header;
        let rows = match parser.parse_rows(&block.text, include_header) {
            Ok(rows) => rows,
            Err(e) => {
                out.dropped.push(dropped(
                    block,
                    DropReason::ParseError {
                        message: e.to_string(),
                    },
                ));
                continue;
            }
        };
        let mut rows = rows.into_iter();

        if include_header {
            let Some(header) = rows.next() else {
                out.dropped.push(dropped(block, DropReason::NoRows));
                continue;
            };
            debug!(columns = header.len(), identifier = %block.identifier, "Header established");
            out.table.header = header;
            have_header = true;
        }

        let Some(row) = rows.next() else {
            out.dropped.push(dropped(block, DropReason::NoRows));
            continue;
        };

        let expected = out.table.header.len();
        if policy == ShapePolicy::Strict && row.len() != expected {
            let reason = DropReason::ShapeMismatch {
                expected,
                actual: row.len(),
            };
            out.dropped.push(dropped(block, reason));
            continue;
        }

        out.table.rows.push(row);
    }

    out
}

fn dropped(block: &RawBlock, reason: DropReason) -> DroppedBlock {
    warn!(
        category = %block.category,
        identifier = %block.identifier,
        %reason,
        "Detail block dropped"
    );
    DroppedBlock {
        category: block.category,
        identifier: block.identifier.clone(),
        reason,
    }
}
