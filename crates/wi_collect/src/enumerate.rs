//! Stage 1: enumerate configured entities from the summary commands

use crate::session::Session;
use crate::{BlockParser, Category, CollectError};
use tracing::{debug, instrument, warn};
use wi_template::Record;

/// Summary field holding the entity identifier
pub const IDENTIFIER_FIELD: &str = "WLAN_Identifier";

/// Summary records per category, in collection order
#[derive(Debug, Clone, Default)]
pub struct Enumeration {
    pub categories: Vec<(Category, Vec<Record>)>,
    /// Categories that failed to parse
    pub warnings: Vec<String>,
    pub commands_issued: usize,
}

impl Enumeration {
    /// Total identifiers across all categories
    pub fn total(&self) -> usize {
        self.categories.iter().map(|(_, records)| records.len()).sum()
    }

    pub fn count(&self, category: Category) -> usize {
        self.categories
            .iter()
            .filter(|(c, _)| *c == category)
            .map(|(_, records)| records.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Run one category's summary command and parse it
///
/// An empty response means the category is absent and yields no records.
#[instrument(skip(session, parser))]
pub async fn enumerate_category<S: Session + ?Sized>(
    session: &mut S,
    parser: &dyn BlockParser,
    category: Category,
) -> Result<Vec<Record>, CollectError> {
    let raw = session.run_command(&category.summary_command()).await?;

    let records = parser
        .parse_records(&raw)
        .map_err(|e| CollectError::ParseFailure {
            category,
            reason: e.to_string(),
        })?;

    if let Some(pos) = records
        .iter()
        .position(|r| r.get(IDENTIFIER_FIELD).is_none_or(|id| id.trim().is_empty()))
    {
        return Err(CollectError::ParseFailure {
            category,
            reason: format!("record {pos} has no {IDENTIFIER_FIELD}"),
        });
    }

    debug!(count = records.len(), "Enumerated entities");
    Ok(records)
}

/// Enumerate every category; a parse failure only empties its own category
pub async fn enumerate_all<S: Session + ?Sized>(
    session: &mut S,
    parser: &dyn BlockParser,
) -> Result<Enumeration, CollectError> {
    let mut enumeration = Enumeration::default();

    for category in Category::ALL {
        enumeration.commands_issued += 1;
        let records = match enumerate_category(session, parser, category).await {
            Ok(records) => records,
            Err(err @ CollectError::ParseFailure { .. }) => {
                warn!(%category, error = %err, "Category skipped");
                enumeration.warnings.push(err.to_string());
                Vec::new()
            }
            Err(err) => return Err(err),
        };
        enumeration.categories.push((category, records));
    }

    Ok(enumeration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReplaySession;
    use std::collections::HashMap;
    use wi_template::{BuiltinTemplate, Template};

    const WLAN_SUMMARY: &str = "\
Number of WLANs.................................. 2

WLAN ID  WLAN Profile Name / SSID               Status    Interface Name        PMIPv6 Mobility
-------  -------------------------------------  --------  --------------------  ---------------
1        corp / corp                            Enabled   management            none
2        guest / Guest WiFi                     Disabled  guest-vlan            none
";

    fn summary_template() -> Template {
        Template::builtin(BuiltinTemplate::WlanSummary).unwrap()
    }

    #[tokio::test]
    async fn test_enumerate_primary() {
        let mut session = ReplaySession::from_map(
            "wlc",
            HashMap::from([("show wlan summary".to_string(), WLAN_SUMMARY.to_string())]),
        );
        let records = enumerate_category(&mut session, &summary_template(), Category::Primary)
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get(IDENTIFIER_FIELD), Some("1"));
        assert_eq!(records[1].get("SSID"), Some("Guest WiFi"));
        assert_eq!(records[1].get("Interface_Name"), Some("guest-vlan"));
    }

    #[tokio::test]
    async fn test_empty_categories_are_absent() {
        let mut session = ReplaySession::from_map("wlc", HashMap::new());
        let enumeration = enumerate_all(&mut session, &summary_template()).await.unwrap();

        assert!(enumeration.is_empty());
        assert!(enumeration.warnings.is_empty());
        assert_eq!(enumeration.commands_issued, 3);
        assert_eq!(
            session.commands(),
            [
                "show wlan summary",
                "show remote-lan summary",
                "show guest-lan summary"
            ]
        );
    }

    #[tokio::test]
    async fn test_parse_failure_is_category_local() {
        let mut session = ReplaySession::from_map(
            "wlc",
            HashMap::from([
                ("show wlan summary".to_string(), WLAN_SUMMARY.to_string()),
                (
                    "show remote-lan summary".to_string(),
                    "Incorrect usage. Use the '?' or <TAB> key to list commands.".to_string(),
                ),
            ]),
        );
        let enumeration = enumerate_all(&mut session, &summary_template()).await.unwrap();

        assert_eq!(enumeration.count(Category::Primary), 2);
        assert_eq!(enumeration.count(Category::Remote), 0);
        assert_eq!(enumeration.count(Category::Guest), 0);
        assert_eq!(enumeration.warnings.len(), 1);
        assert!(enumeration.warnings[0].contains("remote-lan"));
    }
}
