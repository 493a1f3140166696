//! Spreadsheet Loader Module
//! Reads return/fee sheets into raw all-text DataFrames, with a content-hash cache.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use polars::prelude::*;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

impl LoadError {
    fn malformed(path: &Path, reason: impl ToString) -> Self {
        LoadError::Malformed {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

/// Reads tabular files with a fixed number of rows above the header row.
///
/// `header_row` is the zero-based index of the header row: the rows before it
/// are skipped, the row itself supplies column names, and data follows.
pub struct DataLoader;

impl DataLoader {
    /// Load a return or fee sheet as a table of text columns.
    pub fn load(path: &Path, header_row: usize) -> Result<DataFrame, LoadError> {
        let bytes = Self::read(path)?;
        Self::parse(path, bytes, header_row)
    }

    fn read(path: &Path) -> Result<Vec<u8>, LoadError> {
        fs::read(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
            _ => LoadError::Io {
                path: path.to_path_buf(),
                source,
            },
        })
    }

    /// Parse file content already in memory. `path` picks the format and names errors.
    fn parse(path: &Path, bytes: Vec<u8>, header_row: usize) -> Result<DataFrame, LoadError> {
        let df = if Self::is_spreadsheet(path) {
            Self::load_spreadsheet(path, bytes, header_row)?
        } else {
            Self::load_csv(path, bytes, header_row)?
        };

        debug!(
            path = %path.display(),
            rows = df.height(),
            columns = df.width(),
            "loaded raw table"
        );
        Ok(df)
    }

    fn is_spreadsheet(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                matches!(
                    ext.to_ascii_lowercase().as_str(),
                    "xlsx" | "xlsm" | "xls" | "xlsb" | "ods"
                )
            })
            .unwrap_or(false)
    }

    /// Read a CSV export with every column kept as text.
    fn load_csv(path: &Path, bytes: Vec<u8>, header_row: usize) -> Result<DataFrame, LoadError> {
        CsvReadOptions::default()
            .with_has_header(true)
            .with_skip_rows(header_row)
            .with_infer_schema_length(Some(0))
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()
            .map_err(|e| LoadError::malformed(path, e))
    }

    /// Read the first worksheet of a workbook.
    fn load_spreadsheet(
        path: &Path,
        bytes: Vec<u8>,
        header_row: usize,
    ) -> Result<DataFrame, LoadError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|e| LoadError::malformed(path, e))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| LoadError::malformed(path, "workbook has no sheets"))?
            .map_err(|e| LoadError::malformed(path, e))?;

        // Rows are relative to the used range; pad back to sheet row 0.
        let leading_blank = range.start().map(|(row, _)| row as usize).unwrap_or(0);
        let mut rows: Vec<Vec<Option<String>>> = std::iter::repeat_with(Vec::new)
            .take(leading_blank)
            .collect();
        rows.extend(
            range
                .rows()
                .map(|row| row.iter().map(Self::cell_text).collect::<Vec<_>>()),
        );

        let header = rows.get(header_row).ok_or_else(|| {
            LoadError::malformed(path, format!("no header row at line {}", header_row + 1))
        })?;

        let width = rows
            .iter()
            .skip(header_row)
            .map(|r| r.len())
            .max()
            .unwrap_or(0);
        let names = Self::column_names(header, width);

        let data = &rows[header_row + 1..];
        let columns: Vec<Column> = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let values: Vec<Option<String>> = data
                    .iter()
                    .map(|row| row.get(i).cloned().flatten())
                    .collect();
                Column::new(name.as_str().into(), values)
            })
            .collect();

        DataFrame::new(columns).map_err(|e| LoadError::malformed(path, e))
    }

    fn cell_text(cell: &Data) -> Option<String> {
        match cell {
            Data::Empty => None,
            Data::String(s) if s.trim().is_empty() => None,
            other => Some(other.to_string()),
        }
    }

    /// Header names, falling back to positional names for blank or repeated cells.
    fn column_names(header: &[Option<String>], width: usize) -> Vec<String> {
        let mut seen = HashSet::new();
        (0..width)
            .map(|i| {
                let name = header
                    .get(i)
                    .cloned()
                    .flatten()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| format!("column_{}", i));
                if seen.insert(name.clone()) {
                    name
                } else {
                    let fallback = format!("column_{}", i);
                    seen.insert(fallback.clone());
                    fallback
                }
            })
            .collect()
    }
}

/// Identity of a parsed file: content hash plus the header offset it was parsed with.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CacheKey {
    hash: blake3::Hash,
    header_row: usize,
}

/// Memoizes raw tables per path, invalidated when the file content or offset changes.
#[derive(Default)]
pub struct LoadCache {
    entries: HashMap<PathBuf, (CacheKey, DataFrame)>,
}

impl LoadCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached table for `path`, re-parsing when its content changed.
    ///
    /// The file is read once per call; a miss parses the bytes that were hashed.
    pub fn load(&mut self, path: &Path, header_row: usize) -> Result<DataFrame, LoadError> {
        let bytes = match DataLoader::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                if matches!(e, LoadError::NotFound(_)) {
                    self.entries.remove(path);
                }
                return Err(e);
            }
        };

        let key = CacheKey {
            hash: blake3::hash(&bytes),
            header_row,
        };

        if let Some((cached_key, df)) = self.entries.get(path) {
            if *cached_key == key {
                debug!(path = %path.display(), "load cache hit");
                return Ok(df.clone());
            }
        }

        let df = DataLoader::parse(path, bytes, header_row)?;
        self.entries.insert(path.to_path_buf(), (key, df.clone()));
        Ok(df)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::cleaner::Cleaner;
    use crate::data::model::{RESERVE, RETURN_10Y, RETURN_1Y};
    use rust_xlsxwriter::Workbook;
    use std::io::Write;
    use tempfile::TempDir;

    enum Cell {
        Text(&'static str),
        Number(f64),
    }

    const HEADER: [&str; 8] = ["사업자명", "원리금구분", "적립금", "1년", "3년", "5년", "7년", "10년"];

    fn write_csv(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    fn returns_csv() -> String {
        let mut body = String::new();
        for i in 0..7 {
            body.push_str(&format!("title line {}\n", i));
        }
        body.push_str("사업자명,원리금구분,적립금,1년,3년,5년,7년,10년\n");
        body.push_str("OpCo,원리금보장형,\"1,000\",2.50,-,-,-,-\n");
        body.push_str("OpCo,실적배당형,200,5.1,3.2,-,-,-\n");
        body
    }

    fn write_xlsx(dir: &TempDir, name: &str, rows: &[(u32, Vec<Cell>)]) -> PathBuf {
        let path = dir.path().join(name);
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (row, cells) in rows {
            for (col, cell) in cells.iter().enumerate() {
                match cell {
                    Cell::Text(text) => sheet.write_string(*row, col as u16, *text).unwrap(),
                    Cell::Number(value) => sheet.write_number(*row, col as u16, *value).unwrap(),
                };
            }
        }
        workbook.save(&path).unwrap();
        path
    }

    /// Title at `title_row`, header at index 7, two product rows below.
    fn returns_workbook(dir: &TempDir, title_row: u32) -> PathBuf {
        let header = HEADER.iter().map(|&h| Cell::Text(h)).collect();
        let rows = vec![
            (title_row, vec![Cell::Text("2025년 1분기 IRP 수익률")]),
            (7, header),
            (
                8,
                vec![
                    Cell::Text("OpCo"),
                    Cell::Text("원리금보장형"),
                    Cell::Number(1000.0),
                    Cell::Number(2.5),
                    Cell::Text("-"),
                    Cell::Text("-"),
                    Cell::Text("-"),
                ],
            ),
            (
                9,
                vec![
                    Cell::Text("OpCo"),
                    Cell::Text("실적배당형"),
                    Cell::Number(200.0),
                    Cell::Number(5.1),
                    Cell::Number(3.2),
                    Cell::Text("-"),
                    Cell::Text("-"),
                    Cell::Text("-"),
                ],
            ),
        ];
        write_xlsx(dir, "returns.xlsx", &rows)
    }

    #[test]
    fn xlsx_reads_header_at_offset_as_text() {
        let dir = TempDir::new().unwrap();
        let path = returns_workbook(&dir, 0);

        let df = DataLoader::load(&path, 7).unwrap();
        assert_eq!((df.height(), df.width()), (2, 8));
        assert_eq!(
            df.get_column_names()
                .iter()
                .map(|n| n.as_str())
                .collect::<Vec<_>>(),
            HEADER.to_vec()
        );
        assert!(df
            .get_columns()
            .iter()
            .all(|c| c.dtype() == &DataType::String));

        let reserve = df.column("적립금").unwrap().str().unwrap();
        assert_eq!(reserve.get(0), Some("1000"));
        assert_eq!(df.column("1년").unwrap().str().unwrap().get(0), Some("2.5"));
        // Unwritten trailing cell reads as null.
        assert_eq!(df.column("10년").unwrap().str().unwrap().get(0), None);
    }

    #[test]
    fn xlsx_pads_blank_leading_rows() {
        let dir = TempDir::new().unwrap();
        let path = returns_workbook(&dir, 2);

        let df = DataLoader::load(&path, 7).unwrap();
        assert_eq!((df.height(), df.width()), (2, 8));
        assert_eq!(df.get_column_names()[0].as_str(), "사업자명");
        assert_eq!(df.column("사업자명").unwrap().str().unwrap().get(1), Some("OpCo"));
    }

    #[test]
    fn xlsx_rows_clean_into_numbers() {
        let dir = TempDir::new().unwrap();
        let path = returns_workbook(&dir, 0);

        let raw = DataLoader::load(&path, 7).unwrap();
        let cleaned = Cleaner::clean_returns(&raw).unwrap();
        let df = &cleaned.df;
        assert_eq!(df.height(), 2);
        assert_eq!(df.column(RESERVE).unwrap().f64().unwrap().get(0), Some(1000.0));
        assert_eq!(df.column(RETURN_1Y).unwrap().f64().unwrap().get(0), Some(2.5));
        assert_eq!(df.column(RETURN_10Y).unwrap().f64().unwrap().get(0), None);
    }

    #[test]
    fn xlsx_header_past_end_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = returns_workbook(&dir, 0);

        let err = DataLoader::load(&path, 50).unwrap_err();
        assert!(matches!(err, LoadError::Malformed { .. }));
    }

    #[test]
    fn corrupt_workbook_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "broken.xlsx", "not a zip archive");

        let err = DataLoader::load(&path, 7).unwrap_err();
        assert!(matches!(err, LoadError::Malformed { .. }));
    }

    #[test]
    fn ragged_csv_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "ragged.csv", "a,b\n1,2,3,4\n");

        let err = DataLoader::load(&path, 0).unwrap_err();
        assert!(matches!(err, LoadError::Malformed { .. }));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = DataLoader::load(&dir.path().join("absent.csv"), 7).unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
    }

    #[test]
    fn csv_skips_rows_above_header() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "returns.csv", &returns_csv());

        let df = DataLoader::load(&path, 7).unwrap();
        assert_eq!(df.width(), 8);
        assert_eq!(df.height(), 2);
        assert_eq!(df.get_column_names()[0].as_str(), "사업자명");

        let reserve = df.column("적립금").unwrap().str().unwrap();
        assert_eq!(reserve.get(0), Some("1,000"));
    }

    #[test]
    fn csv_columns_stay_text() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "returns.csv", &returns_csv());

        let df = DataLoader::load(&path, 7).unwrap();
        assert!(df
            .get_columns()
            .iter()
            .all(|c| c.dtype() == &DataType::String));
    }

    #[test]
    fn positional_names_fill_blank_and_duplicate_headers() {
        let header = vec![
            Some("a".to_string()),
            None,
            Some("a".to_string()),
            Some("  ".to_string()),
        ];
        assert_eq!(
            DataLoader::column_names(&header, 5),
            vec!["a", "column_1", "column_2", "column_3", "column_4"]
        );
    }

    #[test]
    fn cache_reuses_until_content_changes() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "returns.csv", &returns_csv());
        let mut cache = LoadCache::new();

        let first = cache.load(&path, 7).unwrap();
        let second = cache.load(&path, 7).unwrap();
        assert_eq!(first.height(), second.height());
        assert_eq!(cache.len(), 1);

        let mut changed = returns_csv();
        changed.push_str("NewCo,원리금보장형,50,1.0,-,-,-,-\n");
        write_csv(&dir, "returns.csv", &changed);

        let third = cache.load(&path, 7).unwrap();
        assert_eq!(third.height(), 3);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cache_parses_workbooks_from_hashed_bytes() {
        let dir = TempDir::new().unwrap();
        let path = returns_workbook(&dir, 0);
        let mut cache = LoadCache::new();

        let cached = cache.load(&path, 7).unwrap();
        let direct = DataLoader::load(&path, 7).unwrap();
        assert!(cached.equals_missing(&direct));

        // A different offset is a different key for the same bytes.
        let shifted = cache.load(&path, 8).unwrap();
        assert_eq!(shifted.height(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cache_drops_entry_when_file_disappears() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "returns.csv", &returns_csv());
        let mut cache = LoadCache::new();
        cache.load(&path, 7).unwrap();

        fs::remove_file(&path).unwrap();
        assert!(matches!(cache.load(&path, 7), Err(LoadError::NotFound(_))));
        assert_eq!(cache.len(), 0);
    }
}
