//! wi_template - Template-driven text extraction for WLAN Inventory
//!
//! This crate provides:
//! - A TextFSM-compatible template language (values, states, rules, actions)
//! - A line-oriented state machine that turns raw command output into records
//! - Built-in templates for AireOS WLAN summary and detail output

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::path::Path;
use thiserror::Error;

mod engine;
pub mod syntax;

pub use syntax::{Template, ValueDef, ValueOptions};

/// Template errors
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("Invalid regex at line {line}: {source}")]
    Regex {
        line: usize,
        #[source]
        source: regex::Error,
    },

    #[error("Error action at input line {line}: {message}")]
    Action { line: usize, message: String },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Templates compiled into the binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinTemplate {
    /// `show wlan|remote-lan|guest-lan summary`
    WlanSummary,
    /// `show wlan|remote-lan|guest-lan <id>`
    WlanDetail,
}

impl BuiltinTemplate {
    pub const ALL: [BuiltinTemplate; 2] = [BuiltinTemplate::WlanSummary, BuiltinTemplate::WlanDetail];

    /// Short name used on the command line
    pub fn name(self) -> &'static str {
        match self {
            BuiltinTemplate::WlanSummary => "summary",
            BuiltinTemplate::WlanDetail => "detail",
        }
    }

    /// Template file name
    pub fn file_name(self) -> &'static str {
        match self {
            BuiltinTemplate::WlanSummary => "cisco_aireos_show_wlan_summary.template",
            BuiltinTemplate::WlanDetail => "cisco_aireos_show_wlan_detail.template",
        }
    }

    /// Raw template source
    pub fn source(self) -> &'static str {
        match self {
            BuiltinTemplate::WlanSummary => {
                include_str!("../templates/cisco_aireos_show_wlan_summary.template")
            }
            BuiltinTemplate::WlanDetail => {
                include_str!("../templates/cisco_aireos_show_wlan_detail.template")
            }
        }
    }

    /// Look up a built-in by short name or file name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == name || t.file_name() == name)
    }
}

impl Template {
    /// Compile a built-in template
    pub fn builtin(which: BuiltinTemplate) -> Result<Self, TemplateError> {
        Template::parse(which.source())
    }

    /// Load and compile a template from disk
    pub fn from_path(path: &Path) -> Result<Self, TemplateError> {
        let source = std::fs::read_to_string(path)?;
        Template::parse(&source)
    }
}

/// One parsed entity: column name to value, in template declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    /// Build a record from ordered pairs
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Value for a column, if the column exists
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_compile() {
        for which in BuiltinTemplate::ALL {
            let template = Template::builtin(which).unwrap();
            assert!(!template.header().is_empty(), "{} has no values", which.name());
        }
    }

    #[test]
    fn test_builtin_lookup() {
        assert_eq!(
            BuiltinTemplate::from_name("detail"),
            Some(BuiltinTemplate::WlanDetail)
        );
        assert_eq!(
            BuiltinTemplate::from_name("cisco_aireos_show_wlan_summary.template"),
            Some(BuiltinTemplate::WlanSummary)
        );
        assert_eq!(BuiltinTemplate::from_name("nope"), None);
    }

    #[test]
    fn test_record_accessors() {
        let record = Record::from_pairs([("WLAN_Identifier", "1"), ("Profile_Name", "corp")]);
        assert_eq!(record.get("WLAN_Identifier"), Some("1"));
        assert_eq!(record.get("SSID"), None);
        assert_eq!(record.keys().collect::<Vec<_>>(), ["WLAN_Identifier", "Profile_Name"]);
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn test_record_serializes_in_order() {
        let record = Record::from_pairs([("b", "2"), ("a", "1")]);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"b":"2","a":"1"}"#);
    }
}
