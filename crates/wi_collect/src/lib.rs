//! wi_collect - Collection pipeline for WLAN Inventory
//!
//! This crate provides:
//! - The Session trait and its transports (SSH shell, capture replay)
//! - The working-mode guard that always restores the session
//! - The three pipeline stages: enumerate, collect details, normalize
//! - The Collector trait and the built-in WLAN detail collector

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use wi_template::{Record, Template, TemplateError};

pub mod category;
pub mod detail;
pub mod enumerate;
pub mod executor;
pub mod normalize;
pub mod replay;
pub mod session;
pub mod wlan;

pub use category::Category;
pub use detail::RawBlock;
pub use enumerate::{Enumeration, IDENTIFIER_FIELD};
pub use normalize::{DropReason, DroppedBlock, Normalized, ShapePolicy, Table, normalize};
pub use replay::ReplaySession;
pub use session::{Session, SessionMode, WorkingSession, run_with_restore};
pub use wlan::{CategoryCount, CollectReport, WlanDetailCollector};

/// Collection errors
#[derive(Error, Debug)]
pub enum CollectError {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Failed to parse {category} summary: {reason}")]
    ParseFailure { category: Category, reason: String },

    #[error("Unsupported device OS: {0}")]
    UnsupportedOs(String),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Invalid prompt pattern: {0}")]
    Prompt(#[from] regex::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CollectError {
    /// Whether the command channel itself failed
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            CollectError::Transport(_) | CollectError::Timeout(_) | CollectError::IoError(_)
        )
    }
}

/// Turns one raw command response into rows or records
///
/// Implementations must be pure: the same text always yields the same rows.
pub trait BlockParser: Send + Sync {
    /// Parse into value rows, with the header row first when requested
    fn parse_rows(&self, raw: &str, include_header: bool) -> Result<Vec<Vec<String>>, TemplateError>;

    /// Parse into records keyed by column name
    fn parse_records(&self, raw: &str) -> Result<Vec<Record>, TemplateError>;
}

impl BlockParser for Template {
    fn parse_rows(&self, raw: &str, include_header: bool) -> Result<Vec<Vec<String>>, TemplateError> {
        Template::parse_rows(self, raw, include_header)
    }

    fn parse_records(&self, raw: &str) -> Result<Vec<Record>, TemplateError> {
        Template::parse_records(self, raw)
    }
}

/// The core Collector trait
#[async_trait]
pub trait Collector: Send + Sync {
    /// Unique name, also used as the artifact name in output files
    fn name(&self) -> &'static str;

    /// One-line description for listings
    fn description(&self) -> &'static str;

    /// Run the collection against a session that is already in working mode
    async fn collect(&self, session: &mut dyn Session) -> Result<CollectReport, CollectError>;
}

/// Registry of available collectors
pub struct CollectorRegistry {
    collectors: HashMap<String, Box<dyn Collector>>,
}

impl CollectorRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            collectors: HashMap::new(),
        }
    }

    /// Register a collector
    pub fn register(&mut self, collector: Box<dyn Collector>) {
        let name = collector.name().to_string();
        self.collectors.insert(name, collector);
    }

    /// Get a collector by name
    pub fn get(&self, name: &str) -> Option<&dyn Collector> {
        self.collectors.get(name).map(|c| c.as_ref())
    }

    /// List all registered collector names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.collectors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Create registry with all built-in collectors, parsing with the given templates
    pub fn with_builtins(
        summary: Box<dyn BlockParser>,
        detail: Box<dyn BlockParser>,
        shape_policy: ShapePolicy,
    ) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(WlanDetailCollector::new(
            summary,
            detail,
            shape_policy,
        )));
        registry
    }
}

impl Default for CollectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_registry_empty() {
        let registry = CollectorRegistry::new();
        assert!(registry.names().is_empty());
        assert!(registry.get(WlanDetailCollector::NAME).is_none());
    }

    #[test]
    fn test_collector_registry_builtins() {
        let registry = CollectorRegistry::with_builtins(
            Box::new(Template::builtin(wi_template::BuiltinTemplate::WlanSummary).unwrap()),
            Box::new(Template::builtin(wi_template::BuiltinTemplate::WlanDetail).unwrap()),
            ShapePolicy::Strict,
        );
        assert_eq!(registry.names(), vec![WlanDetailCollector::NAME]);
        let collector = registry.get("wlan-detail").unwrap();
        assert!(!collector.description().is_empty());
    }

    #[test]
    fn test_transport_classification() {
        assert!(CollectError::Transport("closed".into()).is_transport());
        assert!(CollectError::Timeout(Duration::from_secs(1)).is_transport());
        assert!(
            !CollectError::ParseFailure {
                category: Category::Guest,
                reason: "x".into()
            }
            .is_transport()
        );
        assert!(!CollectError::UnsupportedOs("IOS".into()).is_transport());
    }

    #[test]
    fn test_template_implements_block_parser() {
        let template = Template::builtin(wi_template::BuiltinTemplate::WlanDetail).unwrap();
        let parser: &dyn BlockParser = &template;
        let rows = parser.parse_rows("", true).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], template.header());
    }
}
