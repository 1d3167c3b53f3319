//! The classification engine: a pure function from record and rule set to
//! an ignore-reason bitmask and a delete decision.

use crate::models::LogRecord;
use crate::rules::RuleSet;

// Bit weights of the four independent ignore reasons.
pub const REASON_IP: u32 = 2;
pub const REASON_URL: u32 = 4;
pub const REASON_SERVER: u32 = 8;
pub const REASON_METHOD: u32 = 16;

/// Which of the four ignore categories matched a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IgnoreFlags {
    pub ip: bool,
    pub url: bool,
    pub server: bool,
    pub method: bool,
}

impl IgnoreFlags {
    /// The flags folded into the ignore-reason bitmask; zero means no
    /// ignore rule matched.
    pub fn reason(&self) -> u32 {
        let mut reason = 0;
        if self.ip {
            reason |= REASON_IP;
        }
        if self.url {
            reason |= REASON_URL;
        }
        if self.server {
            reason |= REASON_SERVER;
        }
        if self.method {
            reason |= REASON_METHOD;
        }
        reason
    }
}

/// Outcome of classifying one record.
///
/// The delete decision is computed independently of the ignore flags: an
/// ignored record is still persisted (with its reason), a deleted record is
/// written nowhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub ignore: IgnoreFlags,
    pub delete: bool,
}

impl Classification {
    pub fn ignore_reason(&self) -> u32 {
        self.ignore.reason()
    }
}

/// Classify a record against the rule set.
///
/// IP and method rules are exact, case-insensitive matches; URL rules test
/// the record's URL and server rules the record's referrer, each as a
/// case-insensitive prefix anchored at the start. The rule set is already
/// case-normalized, so only the record side is folded here.
pub fn classify(record: &LogRecord, rules: &RuleSet) -> Classification {
    let ignore = IgnoreFlags {
        ip: rules.ignore_ips.contains(&record.ip.to_lowercase()),
        url: has_prefix_match(&record.url, &rules.ignore_urls),
        server: has_prefix_match(&record.referrer, &rules.ignore_servers),
        method: rules.ignore_methods.contains(&record.method.to_uppercase()),
    };

    let delete = rules.delete_ips.contains(&record.ip.to_lowercase())
        || has_prefix_match(&record.url, &rules.delete_urls)
        || has_prefix_match(&record.referrer, &rules.delete_servers)
        || rules.delete_methods.contains(&record.method.to_uppercase());

    Classification { ignore, delete }
}

/// True when the lowercased value starts with any of the prefixes.
fn has_prefix_match(value: &str, prefixes: &[String]) -> bool {
    if prefixes.is_empty() {
        return false;
    }
    let value = value.to_lowercase();
    prefixes.iter().any(|prefix| value.starts_with(prefix.as_str()))
}
