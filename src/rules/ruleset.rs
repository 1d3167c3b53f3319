use std::collections::HashSet;

/// The four rule categories, shared by the ignore and delete lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleCategory {
    Ip,
    Url,
    Server,
    Method,
}

impl RuleCategory {
    pub const ALL: [RuleCategory; 4] =
        [RuleCategory::Ip, RuleCategory::Url, RuleCategory::Server, RuleCategory::Method];

    /// Plural label used in operator-facing output.
    pub fn label(&self) -> &'static str {
        match self {
            RuleCategory::Ip => "IPs",
            RuleCategory::Url => "URLs",
            RuleCategory::Server => "servers",
            RuleCategory::Method => "methods",
        }
    }
}

/// Whether a rule flags a record or drops it entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RulePurpose {
    Ignore,
    Delete,
}

impl RulePurpose {
    pub fn label(&self) -> &'static str {
        match self {
            RulePurpose::Ignore => "ignore",
            RulePurpose::Delete => "delete",
        }
    }
}

/// Immutable snapshot of the ignore/delete criteria, loaded once per run.
///
/// IP and method rules match exactly and live in hash sets; URL and server
/// rules are prefix matches and stay as lists. Entries are case-normalized
/// here so the engine can compare without re-normalizing rule values: IPs,
/// URLs, and servers are lowercased, methods uppercased.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub ignore_ips: HashSet<String>,
    pub ignore_urls: Vec<String>,
    pub ignore_servers: Vec<String>,
    pub ignore_methods: HashSet<String>,
    pub delete_ips: HashSet<String>,
    pub delete_urls: Vec<String>,
    pub delete_servers: Vec<String>,
    pub delete_methods: HashSet<String>,
}

impl RuleSet {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ignore_ips: Vec<String>,
        ignore_urls: Vec<String>,
        ignore_servers: Vec<String>,
        ignore_methods: Vec<String>,
        delete_ips: Vec<String>,
        delete_urls: Vec<String>,
        delete_servers: Vec<String>,
        delete_methods: Vec<String>,
    ) -> Self {
        Self {
            ignore_ips: lower_set(ignore_ips),
            ignore_urls: lower_list(ignore_urls),
            ignore_servers: lower_list(ignore_servers),
            ignore_methods: upper_set(ignore_methods),
            delete_ips: lower_set(delete_ips),
            delete_urls: lower_list(delete_urls),
            delete_servers: lower_list(delete_servers),
            delete_methods: upper_set(delete_methods),
        }
    }

    /// An empty rule set; nothing is ignored or deleted.
    pub fn empty() -> Self {
        Self::default()
    }

    /// One-line summary for verbose output.
    pub fn summary(&self) -> String {
        format!(
            "ignore: {} IPs, {} URLs, {} servers, {} methods; \
             delete: {} IPs, {} URLs, {} servers, {} methods",
            self.ignore_ips.len(),
            self.ignore_urls.len(),
            self.ignore_servers.len(),
            self.ignore_methods.len(),
            self.delete_ips.len(),
            self.delete_urls.len(),
            self.delete_servers.len(),
            self.delete_methods.len(),
        )
    }
}

fn lower_list(values: Vec<String>) -> Vec<String> {
    values.into_iter().map(|v| v.to_lowercase()).collect()
}

fn lower_set(values: Vec<String>) -> HashSet<String> {
    values.into_iter().map(|v| v.to_lowercase()).collect()
}

fn upper_set(values: Vec<String>) -> HashSet<String> {
    values.into_iter().map(|v| v.to_uppercase()).collect()
}
