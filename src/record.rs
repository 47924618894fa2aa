//! # Record Source
//!
//! Parses an uploaded CSV table into an ordered list of [`Record`]s.
//!
//! The first row is taken verbatim as the column headers. Each following row
//! becomes one flat `column -> value` mapping. Rows shorter than the header
//! read as empty strings for the missing columns; extra cells are dropped.
//! A repeated header keeps its first column under the plain name; later
//! copies are renamed `name_1`, `name_2`, ... and reported.
//! Rows the reader cannot decode are skipped and reported, never raised.
//!
//! ## Example
//!
//! ```
//! use flyerpress::record::RecordSource;
//!
//! let csv = "customer,phone,message,logo\nAcme,5551234567,Hi!,acme.png\n";
//! let load = RecordSource::parse(csv.as_bytes()).unwrap();
//!
//! assert_eq!(load.records.len(), 1);
//! assert_eq!(load.records[0].customer(), Some("Acme"));
//! assert_eq!(load.records[0].phone(), "5551234567");
//! ```

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Read;

use crate::error::Result;

/// Column holding the logo identifier.
pub const LOGO_COLUMN: &str = "logo";
/// Column holding the phone number.
pub const PHONE_COLUMN: &str = "phone";
/// Column holding the pre-filled text message.
pub const MESSAGE_COLUMN: &str = "message";
/// Optional column holding the customer name (used for export filenames).
pub const CUSTOMER_COLUMN: &str = "customer";

/// One parsed table row: one flyer to generate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, String>,
}

impl Record {
    /// Build a record from `(column, value)` pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Raw value of a column, `None` if the table had no such column.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    /// Value of a column, or the empty string when absent.
    pub fn field(&self, column: &str) -> &str {
        self.get(column).unwrap_or("")
    }

    pub fn logo(&self) -> &str {
        self.field(LOGO_COLUMN)
    }

    pub fn phone(&self) -> &str {
        self.field(PHONE_COLUMN)
    }

    pub fn message(&self) -> &str {
        self.field(MESSAGE_COLUMN)
    }

    /// Customer name, `None` when the column is missing or blank.
    pub fn customer(&self) -> Option<&str> {
        self.get(CUSTOMER_COLUMN).filter(|c| !c.is_empty())
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }
}

/// A row that was dropped while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    /// 1-based line number in the input, when the reader knows it.
    pub line: Option<u64>,
    pub reason: String,
}

/// Result of parsing one table upload.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TableLoad {
    /// Header row, verbatim.
    pub headers: Vec<String>,
    /// Parsed records in input order.
    pub records: Vec<Record>,
    /// Rows that could not be decoded.
    pub skipped: Vec<SkippedRow>,
    /// Header-level notices (renamed duplicate columns).
    pub warnings: Vec<String>,
}

/// CSV-backed record source.
pub struct RecordSource;

impl RecordSource {
    /// Parse a CSV table.
    ///
    /// Only reader-level I/O failures are returned as errors; anything wrong
    /// with an individual row drops that row.
    pub fn parse<R: Read>(reader: R) -> Result<TableLoad> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let raw_headers: Vec<String> = match rdr.headers() {
            Ok(h) => h.iter().map(str::to_string).collect(),
            Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => return Err(e.into()),
            Err(e) => {
                tracing::warn!("Unreadable header row, no records loaded: {}", e);
                return Ok(TableLoad {
                    skipped: vec![SkippedRow {
                        line: Some(1),
                        reason: e.to_string(),
                    }],
                    ..Default::default()
                });
            }
        };

        let (headers, warnings) = dedupe_headers(raw_headers);
        for warning in &warnings {
            tracing::warn!("{}", warning);
        }

        let mut load = TableLoad {
            headers,
            warnings,
            ..Default::default()
        };

        for row in rdr.records() {
            match row {
                Ok(row) => {
                    let record = Record::from_pairs(
                        load.headers
                            .iter()
                            .enumerate()
                            .map(|(i, h)| (h.clone(), row.get(i).unwrap_or("").to_string())),
                    );
                    load.records.push(record);
                }
                Err(e) => {
                    if matches!(e.kind(), csv::ErrorKind::Io(_)) {
                        return Err(e.into());
                    }
                    let line = e.position().map(|p| p.line());
                    tracing::warn!("Skipping malformed row (line {:?}): {}", line, e);
                    load.skipped.push(SkippedRow {
                        line,
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::debug!(
            "Parsed {} record(s), skipped {} row(s)",
            load.records.len(),
            load.skipped.len()
        );

        Ok(load)
    }
}

/// Rename repeated headers so every column keeps its own key.
fn dedupe_headers(raw: Vec<String>) -> (Vec<String>, Vec<String>) {
    let mut taken: HashSet<String> = raw.iter().cloned().collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut suffix: HashMap<String, usize> = HashMap::new();
    let mut warnings = Vec::new();

    let headers = raw
        .into_iter()
        .map(|header| {
            if seen.insert(header.clone()) {
                return header;
            }
            let n = suffix.entry(header.clone()).or_insert(0);
            let renamed = loop {
                *n += 1;
                let candidate = format!("{}_{}", header, n);
                if !taken.contains(&candidate) {
                    break candidate;
                }
            };
            taken.insert(renamed.clone());
            warnings.push(format!(
                "duplicate column '{}' renamed to '{}'",
                header, renamed
            ));
            renamed
        })
        .collect();

    (headers, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_basic_table() {
        let csv = "logo,phone,message,customer\n\
                   acme.png,5551234567,Hi!,Acme\n\
                   globex.png,5559876543,Call us,Globex\n";
        let load = RecordSource::parse(csv.as_bytes()).unwrap();

        assert_eq!(load.headers, vec!["logo", "phone", "message", "customer"]);
        assert_eq!(load.records.len(), 2);
        assert_eq!(load.records[0].logo(), "acme.png");
        assert_eq!(load.records[1].customer(), Some("Globex"));
        assert!(load.skipped.is_empty());
    }

    #[test]
    fn test_missing_columns_read_as_empty() {
        let csv = "logo,phone\nacme.png,555\n";
        let load = RecordSource::parse(csv.as_bytes()).unwrap();

        let record = &load.records[0];
        assert_eq!(record.message(), "");
        assert_eq!(record.customer(), None);
        assert_eq!(record.get("message"), None);
    }

    #[test]
    fn test_short_and_long_rows_are_kept() {
        let csv = "logo,phone,message\na.png,1\nb.png,2,hello,extra\n";
        let load = RecordSource::parse(csv.as_bytes()).unwrap();

        assert_eq!(load.records.len(), 2);
        assert_eq!(load.records[0].get("message"), Some(""));
        assert_eq!(load.records[1].message(), "hello");
        assert_eq!(load.records[1].fields().len(), 3);
    }

    #[test]
    fn test_headers_are_not_normalized() {
        let csv = "Logo, phone\nx.png,1\n";
        let load = RecordSource::parse(csv.as_bytes()).unwrap();

        assert_eq!(load.records[0].logo(), "");
        assert_eq!(load.records[0].get("Logo"), Some("x.png"));
        assert_eq!(load.records[0].get(" phone"), Some("1"));
    }

    #[test]
    fn test_blank_lines_skipped() {
        let csv = "logo,phone\n\na.png,1\n\n\nb.png,2\n";
        let load = RecordSource::parse(csv.as_bytes()).unwrap();
        assert_eq!(load.records.len(), 2);
        assert!(load.skipped.is_empty());
    }

    #[test]
    fn test_invalid_utf8_row_is_skipped() {
        let mut data = b"logo,phone\na.png,1\n".to_vec();
        data.extend_from_slice(b"b.png,\xff\xfe\n");
        data.extend_from_slice(b"c.png,3\n");

        let load = RecordSource::parse(data.as_slice()).unwrap();

        assert_eq!(load.records.len(), 2);
        assert_eq!(load.records[1].logo(), "c.png");
        assert_eq!(load.skipped.len(), 1);
        assert!(load.skipped[0].line.is_some());
    }

    #[test]
    fn test_empty_input() {
        let load = RecordSource::parse("".as_bytes()).unwrap();
        assert!(load.records.is_empty());
        assert!(load.headers.is_empty());
    }

    #[test]
    fn test_duplicate_headers_keep_first_column() {
        let csv = "phone,logo,phone,phone
111,a.png,222,333
";
        let load = RecordSource::parse(csv.as_bytes()).unwrap();

        assert_eq!(load.headers, vec!["phone", "logo", "phone_1", "phone_2"]);
        assert_eq!(load.records[0].phone(), "111");
        assert_eq!(load.records[0].get("phone_1"), Some("222"));
        assert_eq!(load.records[0].get("phone_2"), Some("333"));
        assert_eq!(load.warnings.len(), 2);
        assert!(load.warnings[0].contains("phone_1"));
    }

    #[test]
    fn test_renamed_header_skips_existing_name() {
        let csv = "logo,logo_1,logo
a,b,c
";
        let load = RecordSource::parse(csv.as_bytes()).unwrap();

        assert_eq!(load.headers, vec!["logo", "logo_1", "logo_2"]);
        assert_eq!(load.records[0].logo(), "a");
        assert_eq!(load.records[0].get("logo_1"), Some("b"));
        assert_eq!(load.records[0].get("logo_2"), Some("c"));
    }

    #[test]
    fn test_blank_customer_is_none() {
        let record = Record::from_pairs([("customer", ""), ("phone", "1")]);
        assert_eq!(record.customer(), None);
    }
}
