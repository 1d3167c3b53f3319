//! Shared test utilities for integration tests
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Scratch workspace holding input logs, a database, and rule documents.
pub struct Workspace {
    temp_dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self { temp_dir: TempDir::new().expect("Failed to create temp dir") }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path of the workspace database (not created until first use).
    pub fn db_path(&self) -> PathBuf {
        self.temp_dir.path().join("access_logs.db")
    }

    /// Write a log file with the given lines and return its path.
    pub fn write_log(&self, name: &str, lines: &[String]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, lines.join("\n")).expect("Failed to write log file");
        path
    }

    /// Write a JSON rules document and return its path.
    pub fn write_rules(&self, name: &str, json: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, json).expect("Failed to write rules file");
        path
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for one combined-format access-log line.
pub struct LogLineBuilder {
    ip: String,
    timestamp: String,
    request: String,
    status: String,
    size: String,
    referrer: String,
    user_agent: String,
}

impl LogLineBuilder {
    pub fn new() -> Self {
        Self {
            ip: "192.168.1.100".to_string(),
            timestamp: "01/Jan/2024:12:00:00 +0000".to_string(),
            request: "GET /index.html HTTP/1.1".to_string(),
            status: "200".to_string(),
            size: "1234".to_string(),
            referrer: "-".to_string(),
            user_agent: "Mozilla/5.0".to_string(),
        }
    }

    pub fn ip(mut self, ip: &str) -> Self {
        self.ip = ip.to_string();
        self
    }

    pub fn timestamp(mut self, timestamp: &str) -> Self {
        self.timestamp = timestamp.to_string();
        self
    }

    pub fn request(mut self, request: &str) -> Self {
        self.request = request.to_string();
        self
    }

    pub fn status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }

    pub fn size(mut self, size: &str) -> Self {
        self.size = size.to_string();
        self
    }

    pub fn referrer(mut self, referrer: &str) -> Self {
        self.referrer = referrer.to_string();
        self
    }

    pub fn user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    pub fn build(&self) -> String {
        format!(
            "{} - - [{}] \"{}\" {} {} \"{}\" \"{}\"",
            self.ip, self.timestamp, self.request, self.status, self.size, self.referrer,
            self.user_agent,
        )
    }
}

impl Default for LogLineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
