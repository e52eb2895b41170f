//! Delimited-text parser for guest lists.
//!
//! Accepts CSV file contents or text pasted from a spreadsheet. The delimiter
//! is a tab when the header line contains one, otherwise a comma. Rows are
//! coerced to the header width: short rows are padded with empty strings and
//! long rows are truncated.
//!
//! Input is split into lines before fields are split, so quoting only
//! applies within a line and a stray quote cannot swallow the rows below it.

use thiserror::Error;

use crate::models::guest_import::{GuestField, RawGuestRecord};

/// Errors raised while parsing delimited text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("No data found in input")]
    Empty,

    #[error("Missing required column: {0}")]
    MissingHeader(&'static str),

    #[error("Malformed input near line {line}: {message}")]
    Malformed { line: u64, message: String },
}

/// Header row plus the data rows beneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRecords {
    pub headers: Vec<String>,
    pub records: Vec<RawGuestRecord>,
}

/// Picks the delimiter from the first non-blank line.
pub fn detect_delimiter(text: &str) -> u8 {
    let header_line = text.lines().find(|line| !line.trim().is_empty());
    match header_line {
        Some(line) if line.contains('\t') => b'\t',
        _ => b',',
    }
}

/// Parses delimited text into header-keyed records.
pub fn parse_records(text: &str) -> Result<ParsedRecords, ParseError> {
    let delimiter = detect_delimiter(text);
    let mut rows = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| split_line(line, delimiter, idx as u64 + 1));

    let headers = match rows.next() {
        Some(row) => row?,
        None => return Err(ParseError::Empty),
    };

    if let Some(missing) = GuestField::REQUIRED
        .iter()
        .find(|field| !headers.iter().any(|h| field.matches_header(h)))
    {
        return Err(ParseError::MissingHeader(missing.header()));
    }

    let mut records = Vec::new();
    for row in rows {
        let row = row?;
        let mut pairs: Vec<(String, String)> = Vec::with_capacity(headers.len());
        for (idx, header) in headers.iter().enumerate() {
            if header.is_empty() || pairs.iter().any(|(h, _)| h == header) {
                continue;
            }
            let value = row.get(idx).map(String::as_str).unwrap_or_default();
            pairs.push((header.clone(), value.to_string()));
        }
        records.push(RawGuestRecord::from_pairs(pairs));
    }

    Ok(ParsedRecords { headers, records })
}

/// Splits one line into trimmed fields, honoring quotes within the line.
fn split_line(line: &str, delimiter: u8, line_number: u64) -> Result<Vec<String>, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(line.as_bytes());

    match reader.records().next() {
        Some(Ok(record)) => Ok(record.iter().map(str::to_string).collect()),
        Some(Err(err)) => Err(ParseError::Malformed {
            line: line_number,
            message: err.to_string(),
        }),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO_CSV: &str = "Name,Email,Household,Child,Teenager\n\
        John Smith,john@example.com,Smith Family,,\n\
        Jane Smith,jane@example.com,Smith Family,,\n\
        Billy Smith,,Smith Family,yes,\n";

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("Name\tHousehold\nA\tB"), b'\t');
        assert_eq!(detect_delimiter("Name,Household\nA,B"), b',');
        assert_eq!(detect_delimiter("\n\nName\tHousehold"), b'\t');
        assert_eq!(detect_delimiter(""), b',');
    }

    #[test]
    fn test_parse_scenario_csv() {
        let parsed = parse_records(SCENARIO_CSV).unwrap();
        assert_eq!(
            parsed.headers,
            vec!["Name", "Email", "Household", "Child", "Teenager"]
        );
        assert_eq!(parsed.records.len(), 3);
        assert_eq!(parsed.records[2].get(GuestField::Name), Some("Billy Smith"));
        assert_eq!(parsed.records[2].get(GuestField::Child), Some("yes"));
        assert_eq!(parsed.records[2].get(GuestField::Email), Some(""));
    }

    #[test]
    fn test_parse_tab_delimited_with_crlf() {
        let text = "Name\tHousehold\tDietary Notes\r\nAnn Lee\tLee House\tvegan\r\n\r\nBo Lee\tLee House\t\r\n";
        let parsed = parse_records(text).unwrap();
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0].get(GuestField::DietaryNotes), Some("vegan"));
        assert_eq!(parsed.records[1].get(GuestField::Name), Some("Bo Lee"));
    }

    #[test]
    fn test_short_rows_are_padded() {
        let parsed = parse_records("Name,Household,Email,Child\nAnn,Lee House\n").unwrap();
        let record = &parsed.records[0];
        assert_eq!(record.len(), 4);
        assert_eq!(record.get(GuestField::Email), Some(""));
        assert_eq!(record.get(GuestField::Child), Some(""));
    }

    #[test]
    fn test_long_rows_are_truncated() {
        let parsed = parse_records("Name,Household\nAnn,Lee House,extra,more\n").unwrap();
        assert_eq!(parsed.records[0].len(), 2);
        assert_eq!(parsed.records[0].get(GuestField::Household), Some("Lee House"));
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let text = "\n   \nName,Household\n\nAnn,H1\n   \n\nBo,H2\n\n";
        let parsed = parse_records(text).unwrap();
        assert_eq!(parsed.records.len(), 2);
    }

    #[test]
    fn test_missing_household_header_is_rejected() {
        let err = parse_records("Name,Email\nAnn,ann@example.com\n").unwrap_err();
        assert_eq!(err, ParseError::MissingHeader("Household"));
    }

    #[test]
    fn test_missing_name_header_is_rejected() {
        let err = parse_records("Household,Email\nH1,ann@example.com\n").unwrap_err();
        assert_eq!(err, ParseError::MissingHeader("Name"));
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert_eq!(parse_records("").unwrap_err(), ParseError::Empty);
        assert_eq!(parse_records("  \n\n ").unwrap_err(), ParseError::Empty);
    }

    #[test]
    fn test_header_only_yields_no_records() {
        let parsed = parse_records("Name,Household\n").unwrap();
        assert!(parsed.records.is_empty());
    }

    #[test]
    fn test_quoted_fields_keep_delimiters() {
        let parsed = parse_records("Name,Household\n\"Smith, John\",\"Smith, Family\"\n").unwrap();
        assert_eq!(parsed.records[0].get(GuestField::Name), Some("Smith, John"));
        assert_eq!(parsed.records[0].get(GuestField::Household), Some("Smith, Family"));
    }

    #[test]
    fn test_unterminated_quote_stays_on_its_line() {
        let parsed = parse_records("Name,Household\n\"Ann,H1\nBo,H1\nCy,H1\n").unwrap();
        assert_eq!(parsed.records.len(), 3);
        assert_eq!(parsed.records[0].get(GuestField::Household), Some(""));
        assert_eq!(parsed.records[1].get(GuestField::Name), Some("Bo"));
        assert_eq!(parsed.records[2].get(GuestField::Name), Some("Cy"));
        assert_eq!(parsed.records[2].get(GuestField::Household), Some("H1"));
    }

    #[test]
    fn test_quoted_newline_does_not_join_rows() {
        let parsed = parse_records("Name,Household\n\"Ann\nLee\",H1\n").unwrap();
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[1].get(GuestField::Household), Some("H1"));
    }

    #[test]
    fn test_row_with_empty_name_is_kept_for_reconciler() {
        let parsed = parse_records("Name,Email,Household,Child,Teenager\n,,Household X,,\n").unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].get(GuestField::Name), Some(""));
    }

    #[test]
    fn test_header_case_and_spacing_accepted() {
        let parsed = parse_records("name , HOUSEHOLD\nAnn,H1\n").unwrap();
        assert_eq!(parsed.records[0].get(GuestField::Household), Some("H1"));
    }
}
