use crate::utils::{escape_csv, sha256_hex};

/// Maximum user-agent length kept on a record.
const USER_AGENT_MAX: usize = 200;

/// One access-log entry in its normalized form.
///
/// This is the single canonical record type for both construction paths:
/// [`parse_record`](crate::parsers::parse_record) builds one from a raw log
/// line, and the storage scan rebuilds one from a stored row (with
/// `stored_id` set, and `ident`, `auth_user`, and `http_version` empty
/// because those columns are not persisted).
///
/// String fields hold `""` where the source had the `-` sentinel or
/// nothing; numeric fields and the timestamp are `None` in that case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogRecord {
    /// Identifier the record was read from storage with, if any.
    pub stored_id: Option<String>,
    pub ip: String,
    pub ident: String,
    pub auth_user: String,
    /// Normalized `YYYY-MM-DD HH:MM:SS`, absent when unparseable.
    pub timestamp: Option<String>,
    pub method: String,
    pub url: String,
    pub query_string: String,
    pub http_version: String,
    pub response: Option<i64>,
    pub size: Option<i64>,
    pub referrer: String,
    pub user_agent: String,
    pub browser: String,
}

impl LogRecord {
    /// The record's identity.
    ///
    /// For a record loaded from storage this is the stored identifier,
    /// unchanged. For a freshly parsed record it is the hex SHA-256 of the
    /// concatenation of every normalized column, in fixed order, so the
    /// same content always maps to the same id and inserts are idempotent.
    pub fn id(&self) -> String {
        if let Some(id) = &self.stored_id {
            return id.clone();
        }
        let mut joined = String::new();
        for column in self.columns() {
            joined.push_str(&column);
        }
        sha256_hex(&joined)
    }

    /// Every normalized column as a string, in the fixed order used by both
    /// the identity hash and the CSV output. Absent values are empty.
    fn columns(&self) -> [String; 13] {
        [
            self.ip.clone(),
            self.ident.clone(),
            self.auth_user.clone(),
            self.timestamp.clone().unwrap_or_default(),
            self.method.clone(),
            self.url.clone(),
            self.query_string.clone(),
            self.http_version.clone(),
            self.response.map(|v| v.to_string()).unwrap_or_default(),
            self.size.map(|v| v.to_string()).unwrap_or_default(),
            self.referrer.clone(),
            self.user_agent.clone(),
            self.browser.clone(),
        ]
    }

    /// Render the record as one CSV line: every field double-quote-wrapped
    /// with internal quotes doubled, ordered id first and the ignore reason
    /// last.
    pub fn to_csv(&self, ignore_reason: u32) -> String {
        let mut out = String::new();
        out.push('"');
        out.push_str(&self.id());
        out.push('"');
        for column in self.columns() {
            out.push_str(",\"");
            out.push_str(&escape_csv(&column));
            out.push('"');
        }
        out.push_str(",\"");
        out.push_str(&ignore_reason.to_string());
        out.push('"');
        out
    }

    /// Cap a user-agent value at 200 characters.
    pub fn truncate_user_agent(value: String) -> String {
        if value.chars().count() <= USER_AGENT_MAX {
            value
        } else {
            value.chars().take(USER_AGENT_MAX).collect()
        }
    }
}
