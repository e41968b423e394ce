//! Event corpus loader.
//!
//! Reads the historical events CSV and normalizes rows into
//! [`EventRecord`]s. The table must carry `date` and `event_description`
//! columns; `location` and `category` are optional. Rows missing a required
//! field are skipped with a warning, never fatal. A missing file or a file
//! that yields zero usable rows is fatal; the system cannot function
//! without a corpus.

use std::path::Path;

use tracing::warn;

use crate::error::GenerateError;
use crate::models::EventRecord;

/// Load the corpus from a CSV file.
///
/// # Errors
///
/// - [`GenerateError::CorpusNotFound`] if the file does not exist or
///   cannot be read.
/// - [`GenerateError::CorpusEmpty`] if it yields zero usable rows.
pub fn load_corpus(path: &Path) -> Result<Vec<EventRecord>, GenerateError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| GenerateError::CorpusNotFound(format!("{}: {}", path.display(), e)))?;

    let records = parse_csv(&content);

    if records.is_empty() {
        return Err(GenerateError::CorpusEmpty(path.display().to_string()));
    }

    Ok(records)
}

/// Parse CSV content into event records, skipping unusable rows.
fn parse_csv(content: &str) -> Vec<EventRecord> {
    let mut rows = split_rows(content).into_iter();

    let header = match rows.next() {
        Some(h) => h,
        None => return Vec::new(),
    };

    let columns = Columns::from_header(&header);
    let (date_col, description_col) = match (columns.date, columns.description) {
        (Some(d), Some(e)) => (d, e),
        _ => {
            warn!("corpus header missing 'date' or 'event_description' column");
            return Vec::new();
        }
    };

    let mut records = Vec::new();

    for (line_no, fields) in rows.enumerate() {
        if fields.iter().all(|f| f.trim().is_empty()) {
            continue;
        }

        let date = fields.get(date_col).map(|s| s.trim()).unwrap_or("");
        let description = fields.get(description_col).map(|s| s.trim()).unwrap_or("");

        if date.is_empty() || description.is_empty() {
            // Header is line 1, first data row is line 2.
            warn!(line = line_no + 2, "skipping corpus row with missing date or description");
            continue;
        }

        records.push(EventRecord {
            date: date.to_string(),
            description: description.to_string(),
            location: optional_field(&fields, columns.location),
            category: optional_field(&fields, columns.category),
        });
    }

    records
}

fn optional_field(fields: &[String], col: Option<usize>) -> Option<String> {
    col.and_then(|i| fields.get(i))
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

struct Columns {
    date: Option<usize>,
    description: Option<usize>,
    location: Option<usize>,
    category: Option<usize>,
}

impl Columns {
    fn from_header(header: &[String]) -> Self {
        let find = |name: &str| {
            header
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        Columns {
            date: find("date"),
            description: find("event_description"),
            location: find("location"),
            category: find("category"),
        }
    }
}

/// Split CSV content into rows of fields.
///
/// Handles RFC-4180 quoting: fields may be wrapped in double quotes,
/// quoted fields may contain commas and newlines, and `""` inside a quoted
/// field is a literal quote.
fn split_rows(content: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ => field.push(c),
            }
        } else {
            match c {
                '"' => in_quotes = true,
                ',' => {
                    row.push(std::mem::take(&mut field));
                }
                '\r' => {}
                '\n' => {
                    row.push(std::mem::take(&mut field));
                    rows.push(std::mem::take(&mut row));
                }
                _ => field.push(c),
            }
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_corpus(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_load_basic_corpus() {
        let f = write_corpus(
            "date,event_description,location,category\n\
             1789-07-14,Storming of the Bastille,Paris,Politics\n\
             1812,Napoleon invades Russia,,War\n",
        );
        let records = load_corpus(f.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date, "1789-07-14");
        assert_eq!(records[0].location.as_deref(), Some("Paris"));
        assert_eq!(records[1].location, None);
        assert_eq!(records[1].category.as_deref(), Some("War"));
    }

    #[test]
    fn test_missing_file_is_corpus_not_found() {
        let err = load_corpus(Path::new("/nonexistent/events.csv")).unwrap_err();
        assert!(matches!(err, GenerateError::CorpusNotFound(_)));
    }

    #[test]
    fn test_header_only_is_corpus_empty() {
        let f = write_corpus("date,event_description\n");
        let err = load_corpus(f.path()).unwrap_err();
        assert!(matches!(err, GenerateError::CorpusEmpty(_)));
    }

    #[test]
    fn test_rows_missing_required_fields_are_skipped() {
        let f = write_corpus(
            "date,event_description\n\
             ,missing date\n\
             1805-12-02,Battle of Austerlitz\n\
             1810,\n",
        );
        let records = load_corpus(f.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].description, "Battle of Austerlitz");
    }

    #[test]
    fn test_quoted_fields_with_commas() {
        let f = write_corpus(
            "date,event_description,location\n\
             1789-07-14,\"Storming of the Bastille, a fortress\",\"Paris, France\"\n",
        );
        let records = load_corpus(f.path()).unwrap();
        assert_eq!(
            records[0].description,
            "Storming of the Bastille, a fortress"
        );
        assert_eq!(records[0].location.as_deref(), Some("Paris, France"));
    }

    #[test]
    fn test_escaped_quotes() {
        let f = write_corpus(
            "date,event_description\n\
             1605-11-05,\"The \"\"Gunpowder Plot\"\" uncovered\"\n",
        );
        let records = load_corpus(f.path()).unwrap();
        assert_eq!(records[0].description, "The \"Gunpowder Plot\" uncovered");
    }

    #[test]
    fn test_missing_optional_columns_tolerated() {
        let f = write_corpus(
            "date,event_description\n\
             1815-06-18,Battle of Waterloo\n",
        );
        let records = load_corpus(f.path()).unwrap();
        assert_eq!(records[0].location, None);
        assert_eq!(records[0].category, None);
    }

    #[test]
    fn test_no_trailing_newline() {
        let f = write_corpus("date,event_description\n1815-06-18,Battle of Waterloo");
        let records = load_corpus(f.path()).unwrap();
        assert_eq!(records.len(), 1);
    }
}
