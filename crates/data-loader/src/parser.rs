//! Parser for the seed ratings file.
//!
//! Format: `userId,itemId,rating`, one observation per line.
//! - An optional header row (`userId,itemId,rating`) is skipped
//! - Item ids are written either as `12` or with the catalog prefix `i12`
//! - Files are ISO-8859-1 encoded

use crate::error::{DataLoadError, Result};
use crate::types::*;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Read a file as ISO-8859-1 (Latin-1) and split it into lines
///
/// Every Latin-1 byte maps directly onto the Unicode code point of the same
/// value, so decoding is a per-byte cast.
fn read_lines_latin1(path: &Path) -> Result<Vec<String>> {
    let mut file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => DataLoadError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => DataLoadError::IoError(e),
    })?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    let content: String = bytes.iter().map(|&b| b as char).collect();
    Ok(content.lines().map(|s| s.to_string()).collect())
}

/// Parse the ratings file at `path`
pub fn parse_ratings(path: &Path) -> Result<Vec<Rating>> {
    let lines = read_lines_latin1(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    parse_rating_lines(&file_name, lines.iter().map(String::as_str))
}

/// Parse already-decoded rating lines
///
/// `file` is only used to label parse errors.
pub fn parse_rating_lines<'a>(
    file: &str,
    lines: impl IntoIterator<Item = &'a str>,
) -> Result<Vec<Rating>> {
    let mut ratings = Vec::new();

    for (idx, line) in lines.into_iter().enumerate() {
        let line_no = idx + 1;
        let line_trimmed = line.trim();
        if line_trimmed.is_empty() {
            continue;
        }
        if line_no == 1 && is_header(line_trimmed) {
            continue;
        }

        let parse_error = |reason: String| DataLoadError::ParseError {
            file: file.to_string(),
            line: line_no,
            reason,
        };

        let mut parts = line_trimmed.split(',').map(str::trim);

        let user_id = parts
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| parse_error("Missing userId".to_string()))?;
        let item_id = parts
            .next()
            .ok_or_else(|| parse_error("Missing itemId".to_string()))?;
        let rating_value = parts
            .next()
            .ok_or_else(|| parse_error("Missing rating".to_string()))?;

        let rating = Rating {
            user_id: user_id.to_string(),
            item_id: parse_item_id(item_id)
                .map_err(|e| parse_error(format!("Invalid itemId: {}", e)))?,
            rating: parse_rating_value(rating_value)
                .map_err(|e| parse_error(format!("Invalid rating: {}", e)))?,
        };

        ratings.push(rating);
    }

    Ok(ratings)
}

/// A header row has a non-numeric rating column
fn is_header(line: &str) -> bool {
    line.split(',')
        .nth(2)
        .map(|field| field.trim().parse::<f64>().is_err())
        .unwrap_or(false)
}

/// Parse an item id, accepting the `i` prefix used by the catalog images
///
/// Example: "i12" -> Ok(12), "12" -> Ok(12)
pub fn parse_item_id(s: &str) -> Result<ItemId> {
    let digits = s.strip_prefix('i').unwrap_or(s);
    digits.parse().map_err(|_| DataLoadError::InvalidValue {
        field: "itemId".to_string(),
        value: s.to_string(),
    })
}

/// Parse a star value. Integral floats such as "4.0" are accepted.
pub fn parse_rating_value(s: &str) -> Result<RatingValue> {
    let invalid = || DataLoadError::InvalidValue {
        field: "rating".to_string(),
        value: s.to_string(),
    };

    let value: f64 = s.parse().map_err(|_| invalid())?;
    if value.fract() != 0.0 {
        return Err(invalid());
    }
    let value = value as i64;
    if value < *RATING_RANGE.start() as i64 || value > *RATING_RANGE.end() as i64 {
        return Err(invalid());
    }
    Ok(value as RatingValue)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_item_id() {
        assert_eq!(parse_item_id("i12").unwrap(), 12);
        assert_eq!(parse_item_id("7").unwrap(), 7);
        assert!(parse_item_id("shirt").is_err());
    }

    #[test]
    fn test_parse_rating_value() {
        assert_eq!(parse_rating_value("4").unwrap(), 4);
        assert_eq!(parse_rating_value("5.0").unwrap(), 5);
        assert!(parse_rating_value("0").is_err());
        assert!(parse_rating_value("6").is_err());
        assert!(parse_rating_value("3.5").is_err());
    }

    #[test]
    fn test_parse_lines_with_header() {
        let lines = ["userId,itemId,rating", "u1,i1,5", "", "u2,2,3"];
        let ratings = parse_rating_lines("ratings.csv", lines).unwrap();

        assert_eq!(ratings.len(), 2);
        assert_eq!(ratings[0], Rating::new("u1", 1, 5));
        assert_eq!(ratings[1], Rating::new("u2", 2, 3));
    }

    #[test]
    fn test_parse_lines_reports_line_number() {
        let lines = ["u1,i1,5", "u2,i2"];
        let err = parse_rating_lines("ratings.csv", lines).unwrap_err();

        match err {
            DataLoadError::ParseError { line, reason, .. } => {
                assert_eq!(line, 2);
                assert!(reason.contains("rating"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_file() {
        let err = parse_ratings(Path::new("does/not/exist.csv")).unwrap_err();
        assert!(matches!(err, DataLoadError::FileNotFound { .. }));
    }

    #[test]
    fn test_latin1_file_is_decoded_per_byte() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ratings.csv");
        std::fs::write(&path, b"userId,itemId,rating\nJos\xe9,i12,5\nRen\xe9e,3,2.0\n").unwrap();

        let ratings = parse_ratings(&path).unwrap();

        assert_eq!(ratings.len(), 2);
        assert_eq!(ratings[0], Rating::new("Jos\u{e9}", 12, 5));
        assert_eq!(ratings[1], Rating::new("Ren\u{e9}e", 3, 2));
    }

    #[test]
    fn test_file_parse_error_names_the_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("seed.csv");
        std::fs::write(&path, "u1,i1,5\nu2,i2,seven\n").unwrap();

        match parse_ratings(&path).unwrap_err() {
            DataLoadError::ParseError { file, line, reason } => {
                assert_eq!(file, "seed.csv");
                assert_eq!(line, 2);
                assert!(reason.contains("seven"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unreadable_path_is_an_io_error() {
        let dir = tempfile::TempDir::new().unwrap();

        // Opening succeeds on a directory; reading it does not
        let err = parse_ratings(dir.path()).unwrap_err();
        assert!(matches!(err, DataLoadError::IoError(_)));
    }
}
