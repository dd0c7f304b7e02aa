//! Search criteria and their IMAP rendering

use chrono::NaiveDate;
use std::fmt;

/// A single search criterion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    /// Every message in the mailbox
    All,
    /// From header contains the text
    From(SearchText),
    /// Internal date on or after the given day
    Since(NaiveDate),
    /// Subject contains the text
    Subject(SearchText),
    /// Body contains the text
    Body(SearchText),
}

/// Search argument that cannot be sent to the server
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidQuery {
    #[error("Invalid date {0:?}, expected YYYY-MM-DD")]
    Date(String),

    /// CR, LF and NUL cannot appear in an IMAP quoted string
    #[error("Search text {0:?} contains a line break or NUL")]
    Text(String),
}

/// Text that is safe to send as an IMAP quoted string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchText(String);

impl SearchText {
    pub fn new(text: &str) -> Result<Self, InvalidQuery> {
        if text.contains(['\r', '\n', '\0']) {
            return Err(InvalidQuery::Text(text.to_string()));
        }
        Ok(Self(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl SearchQuery {
    /// `From` criterion
    pub fn from_sender(text: &str) -> Result<Self, InvalidQuery> {
        SearchText::new(text).map(SearchQuery::From)
    }

    /// `Subject` criterion
    pub fn subject(text: &str) -> Result<Self, InvalidQuery> {
        SearchText::new(text).map(SearchQuery::Subject)
    }

    /// `Body` criterion
    pub fn body(text: &str) -> Result<Self, InvalidQuery> {
        SearchText::new(text).map(SearchQuery::Body)
    }

    /// `Since` from an ISO calendar date such as `2024-03-05`
    pub fn since_iso(date: &str) -> Result<Self, InvalidQuery> {
        NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map(SearchQuery::Since)
            .map_err(|_| InvalidQuery::Date(date.to_string()))
    }

    /// Render as UID SEARCH arguments
    pub fn to_imap(&self) -> String {
        match self {
            SearchQuery::All => "ALL".to_string(),
            SearchQuery::From(text) => keyed("FROM", text),
            SearchQuery::Since(date) => format!("SINCE {}", imap_date(*date)),
            SearchQuery::Subject(text) => keyed("SUBJECT", text),
            SearchQuery::Body(text) => keyed("BODY", text),
        }
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_imap())
    }
}

/// IMAP date literal, e.g. `5-Mar-2024`
///
/// chrono's `%b` is always the English abbreviation, independent of the
/// process locale.
pub fn imap_date(date: NaiveDate) -> String {
    date.format("%-d-%b-%Y").to_string()
}

/// Non-ASCII text goes out as 8-bit UTF-8 inside the quoted string.
///
/// RFC 3501 asks for a literal there. async-imap sends the search line in
/// one piece and cannot wait for a literal continuation, so this relies on
/// the server accepting 8-bit quoted strings, as Outlook does.
fn keyed(key: &str, text: &SearchText) -> String {
    if text.as_str().is_ascii() {
        format!("{} {}", key, quote(text))
    } else {
        format!("CHARSET UTF-8 {} {}", key, quote(text))
    }
}

/// IMAP quoted string
fn quote(text: &SearchText) -> String {
    let mut quoted = String::with_capacity(text.as_str().len() + 2);
    quoted.push('"');
    for c in text.as_str().chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
