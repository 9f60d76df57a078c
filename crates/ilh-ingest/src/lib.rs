//! Cleaned-batch ingestion: header contract, logical field access and
//! in-batch deduplication ahead of the load engine.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

pub const CRATE_NAME: &str = "ilh-ingest";

/// Logical columns the upstream cleaning pipeline is contracted to
/// provide, independent of physical spelling or order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalColumn {
    ListingId,
    TransactionType,
    ItemType,
    ItemSubtype,
    StartDate,
    ChangeDate,
    Price,
    Area,
    SiteArea,
    Floor,
    RoomCount,
    BalconyCount,
    TerraceCount,
    TerraceArea,
    BuildYear,
    IsNewConstruction,
    HasPassengerLift,
    HasCellar,
    IsFurnished,
    City,
    Zipcode,
    DescriptionFr,
}

impl LogicalColumn {
    pub const ALL: [LogicalColumn; 22] = [
        LogicalColumn::ListingId,
        LogicalColumn::TransactionType,
        LogicalColumn::ItemType,
        LogicalColumn::ItemSubtype,
        LogicalColumn::StartDate,
        LogicalColumn::ChangeDate,
        LogicalColumn::Price,
        LogicalColumn::Area,
        LogicalColumn::SiteArea,
        LogicalColumn::Floor,
        LogicalColumn::RoomCount,
        LogicalColumn::BalconyCount,
        LogicalColumn::TerraceCount,
        LogicalColumn::TerraceArea,
        LogicalColumn::BuildYear,
        LogicalColumn::IsNewConstruction,
        LogicalColumn::HasPassengerLift,
        LogicalColumn::HasCellar,
        LogicalColumn::IsFurnished,
        LogicalColumn::City,
        LogicalColumn::Zipcode,
        LogicalColumn::DescriptionFr,
    ];

    /// Canonical lowercase name used for case-insensitive header matching.
    pub fn name(self) -> &'static str {
        match self {
            LogicalColumn::ListingId => "listing_id",
            LogicalColumn::TransactionType => "transaction_type",
            LogicalColumn::ItemType => "item_type",
            LogicalColumn::ItemSubtype => "item_subtype",
            LogicalColumn::StartDate => "start_date",
            LogicalColumn::ChangeDate => "change_date",
            LogicalColumn::Price => "price",
            LogicalColumn::Area => "area",
            LogicalColumn::SiteArea => "site_area",
            LogicalColumn::Floor => "floor",
            LogicalColumn::RoomCount => "room_count",
            LogicalColumn::BalconyCount => "balcony_count",
            LogicalColumn::TerraceCount => "terrace_count",
            LogicalColumn::TerraceArea => "terrace_area",
            LogicalColumn::BuildYear => "build_year",
            LogicalColumn::IsNewConstruction => "is_new_construction",
            LogicalColumn::HasPassengerLift => "has_passenger_lift",
            LogicalColumn::HasCellar => "has_cellar",
            LogicalColumn::IsFurnished => "is_furnished",
            LogicalColumn::City => "city",
            LogicalColumn::Zipcode => "zipcode",
            LogicalColumn::DescriptionFr => "description_fr",
        }
    }
}

#[derive(Debug, Error)]
pub enum ContractError {
    #[error("batch is missing required columns: {0:?}")]
    MissingColumns(Vec<&'static str>),
    #[error("reading batch {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// Validated mapping from logical columns to physical positions in the
/// batch. Built once, before any data row is touched.
#[derive(Debug, Clone)]
pub struct HeaderMap {
    index: HashMap<LogicalColumn, usize>,
}

impl HeaderMap {
    pub fn from_headers(headers: &[String]) -> Result<Self, ContractError> {
        let lowered: Vec<String> = headers
            .iter()
            .map(|h| h.trim().to_ascii_lowercase())
            .collect();
        let mut index = HashMap::with_capacity(LogicalColumn::ALL.len());
        let mut missing = Vec::new();
        for column in LogicalColumn::ALL {
            match lowered.iter().position(|h| h == column.name()) {
                Some(pos) => {
                    index.insert(column, pos);
                }
                None => missing.push(column.name()),
            }
        }
        if !missing.is_empty() {
            return Err(ContractError::MissingColumns(missing));
        }
        Ok(Self { index })
    }

    pub fn position(&self, column: LogicalColumn) -> usize {
        // Construction guarantees every logical column is present.
        *self
            .index
            .get(&column)
            .expect("header map covers all logical columns")
    }
}

/// One cleaned batch held in memory: physical headers in batch order, raw
/// text rows, and the validated logical header map.
#[derive(Debug, Clone)]
pub struct CleanBatch {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    map: HeaderMap,
}

impl CleanBatch {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, ContractError> {
        let map = HeaderMap::from_headers(&headers)?;
        Ok(Self { headers, rows, map })
    }

    /// Read a cleaned CSV with a header row defining physical spelling
    /// and order.
    pub fn from_csv_path(path: &Path) -> Result<Self, ContractError> {
        let read_err = |source| ContractError::Read {
            path: path.display().to_string(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(read_err)?;
        let headers: Vec<String> = reader
            .headers()
            .map_err(read_err)?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(read_err)?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Self::new(headers, rows)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn header_map(&self) -> &HeaderMap {
        &self.map
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Raw text of a logical field in the given row. Short (ragged) rows
    /// read as empty, which downstream parsing treats as unknown.
    pub fn field<'a>(&self, row: &'a [String], column: LogicalColumn) -> &'a str {
        row.get(self.map.position(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Row indices carrying one fact per business key: the last occurrence
    /// of each key wins, rows with a blank key are dropped. Output order is
    /// ascending by surviving row index.
    pub fn dedup_last_wins(&self) -> Vec<usize> {
        let mut winner: HashMap<&str, usize> = HashMap::new();
        for (idx, row) in self.rows.iter().enumerate() {
            let key = self.field(row, LogicalColumn::ListingId).trim();
            if key.is_empty() {
                continue;
            }
            winner.insert(key, idx);
        }
        let mut indices: Vec<usize> = winner.into_values().collect();
        indices.sort_unstable();
        indices
    }

    /// Longest non-empty description per business key, first-seen winning
    /// ties. Output is sorted by business key.
    pub fn pick_descriptions(&self) -> Vec<(String, String)> {
        let mut best: HashMap<&str, &str> = HashMap::new();
        for row in &self.rows {
            let key = self.field(row, LogicalColumn::ListingId).trim();
            let body = self.field(row, LogicalColumn::DescriptionFr).trim();
            if key.is_empty() || body.is_empty() {
                continue;
            }
            match best.get(key) {
                Some(current) if current.len() >= body.len() => {}
                _ => {
                    best.insert(key, body);
                }
            }
        }
        let mut picked: Vec<(String, String)> = best
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        picked.sort();
        picked
    }
}
