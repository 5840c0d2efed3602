use std::cmp::Ordering;
use std::str::FromStr;

use crate::error::SortError;

const DELIMITER: &str = ". ";

/// Split a `<integer>. <text>` line into its number and text.
///
/// The line is split on the first `". "` only, so the text may itself contain the delimiter.
/// A trailing `\n` or `\r\n` is not part of the text.
///
/// # Examples
/// ```
/// use numbered_text_sort::line_record::parse_line;
///
/// let (number, text) = parse_line("42. Something. Else").unwrap();
/// assert_eq!(number, 42);
/// assert_eq!(text, "Something. Else");
/// assert!(parse_line("not-a-number. oops").is_err());
/// ```
pub fn parse_line(line: &str) -> Result<(i64, &str), SortError> {
    let line = trim_line_end(line);
    let (number, text_start) = split_line(line)?;
    Ok((number, &line[text_start..]))
}

fn trim_line_end(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

fn split_line(line: &str) -> Result<(i64, usize), SortError> {
    let position = line.find(DELIMITER).ok_or_else(|| SortError::MalformedLine {
        line: line.to_string(),
        reason: format!("missing {:?} delimiter", DELIMITER),
    })?;
    let number = i64::from_str(&line[..position]).map_err(|e| SortError::MalformedLine {
        line: line.to_string(),
        reason: format!("invalid number: {e}"),
    })?;
    Ok((number, position + DELIMITER.len()))
}

/// A parsed line. Ordered by text (bytewise), then by number.
#[derive(Debug)]
pub(crate) struct LineRecord {
    line: String,
    number: i64,
    text_start: usize,
}

impl LineRecord {
    pub(crate) fn new(mut line: String) -> Result<LineRecord, SortError> {
        let len = trim_line_end(&line).len();
        line.truncate(len);
        let (number, text_start) = split_line(&line)?;
        Ok(
            LineRecord {
                line,
                number,
                text_start,
            }
        )
    }

    pub(crate) fn line(&self) -> &str {
        &self.line
    }

    pub(crate) fn text(&self) -> &str {
        &self.line[self.text_start..]
    }
}

impl Eq for LineRecord {}

impl PartialEq<Self> for LineRecord {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd<Self> for LineRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LineRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.text().as_bytes().cmp(other.text().as_bytes())
            .then_with(|| self.number.cmp(&other.number))
    }
}
