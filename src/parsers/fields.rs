//! Field-level normalization and record assembly.
//!
//! The tokenizer hands back raw fields in source order; this module knows
//! the combined-log layout, reshapes the timestamp and request-line fields
//! into their final forms, and assembles the canonical [`LogRecord`].

use anyhow::{Result, bail};

use crate::models::LogRecord;
use crate::parsers::line::split_line;
use crate::utils::clean_field;

// Raw token positions in a combined-format line.
const RAW_IP: usize = 0;
const RAW_IDENT: usize = 1;
const RAW_AUTH_USER: usize = 2;
const RAW_TIMESTAMP: usize = 3;
const RAW_REQUEST: usize = 4;
const RAW_RESPONSE: usize = 5;
const RAW_SIZE: usize = 6;
const RAW_REFERRER: usize = 7;
const RAW_USER_AGENT: usize = 8;
const RAW_BROWSER: usize = 9;

/// Minimum tokens a line must carry; everything up to the user agent.
const REQUIRED_FIELDS: usize = 9;

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// The request-line field split into its four parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestParts {
    pub method: String,
    pub url: String,
    pub query_string: String,
    pub http_version: String,
}

/// Parse one raw log line into a [`LogRecord`].
///
/// A line with fewer than the nine required fields, or with a request field
/// that has no method separator, is a structural fault and returns an
/// error; callers treat that as fatal for the current input file. A
/// malformed timestamp is not an error: the field just comes out absent.
pub fn parse_record(line: &str) -> Result<LogRecord> {
    let tokens = split_line(line);
    if tokens.len() < REQUIRED_FIELDS {
        bail!("line has {} fields, expected at least {}", tokens.len(), REQUIRED_FIELDS);
    }

    let request = split_request(&tokens[RAW_REQUEST])?;

    Ok(LogRecord {
        stored_id: None,
        ip: clean_field(&tokens[RAW_IP]),
        ident: clean_field(&tokens[RAW_IDENT]),
        auth_user: clean_field(&tokens[RAW_AUTH_USER]),
        timestamp: normalize_timestamp(&tokens[RAW_TIMESTAMP]),
        method: request.method,
        url: request.url,
        query_string: request.query_string,
        http_version: request.http_version,
        response: parse_count(&tokens[RAW_RESPONSE]),
        size: parse_count(&tokens[RAW_SIZE]),
        referrer: clean_field(&tokens[RAW_REFERRER]),
        user_agent: LogRecord::truncate_user_agent(clean_field(&tokens[RAW_USER_AGENT])),
        browser: tokens.get(RAW_BROWSER).map(|t| clean_field(t)).unwrap_or_default(),
    })
}

/// Convert a raw `DD/Mon/YYYY:HH:MM:SS +ZZZZ` timestamp into
/// `YYYY-MM-DD HH:MM:SS`.
///
/// Anything that does not fit the shape (too short, unknown month
/// abbreviation) yields `None`. The zone offset is read but discarded, so
/// entries logged in different zones collapse to the same naive time; see
/// DESIGN.md before changing this.
pub fn normalize_timestamp(raw: &str) -> Option<String> {
    let day = raw.get(0..2)?;
    let mon_name = raw.get(3..6)?;
    let year = raw.get(7..11)?;
    let time = raw.get(12..20)?;
    let month = MONTHS.iter().position(|m| mon_name.eq_ignore_ascii_case(m))?;
    Some(format!("{year}-{:02}-{day} {time}", month + 1))
}

/// Split a raw `METHOD PATH[?QUERY] PROTOCOL` request field.
///
/// The protocol is empty when there is no second space, and the query
/// string is empty when there is no `?`. A separator at position zero does
/// not split. A request with no space at all cannot be laid out and is an
/// error.
pub fn split_request(raw: &str) -> Result<RequestParts> {
    let Some(space) = raw.find(' ') else {
        bail!("request field has no method separator: {raw:?}");
    };
    let method = &raw[..space];
    let mut rest = &raw[space + 1..];

    let mut http_version = "";
    if let Some(pos) = rest.find(' ').filter(|&p| p > 0) {
        http_version = &rest[pos + 1..];
        rest = &rest[..pos];
    }

    let mut url = rest;
    let mut query_string = "";
    if let Some(pos) = rest.find('?').filter(|&p| p > 0) {
        query_string = &rest[pos + 1..];
        url = &rest[..pos];
    }

    Ok(RequestParts {
        method: method.to_string(),
        url: url.to_string(),
        query_string: query_string.to_string(),
        http_version: http_version.to_string(),
    })
}

/// Parse a numeric field, treating `-`, empty, and non-numeric values as
/// absent.
fn parse_count(raw: &str) -> Option<i64> {
    let cleaned = clean_field(raw);
    if cleaned.is_empty() { None } else { cleaned.parse().ok() }
}
