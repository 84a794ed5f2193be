//! Stage 2: fetch the detail output for every enumerated entity

use crate::enumerate::{Enumeration, IDENTIFIER_FIELD};
use crate::session::Session;
use crate::{Category, CollectError};
use serde::Serialize;
use tracing::{debug, instrument};

/// Unparsed detail output for one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawBlock {
    pub category: Category,
    pub identifier: String,
    pub text: String,
}

/// Issue one detail command per identifier, in enumeration order
///
/// Empty or error responses are kept as blocks; only a transport failure
/// stops collection.
#[instrument(skip_all, fields(identifiers = enumeration.total()))]
pub async fn collect_details<S: Session + ?Sized>(
    session: &mut S,
    enumeration: &Enumeration,
) -> Result<Vec<RawBlock>, CollectError> {
    let mut blocks = Vec::with_capacity(enumeration.total());

    for (category, records) in &enumeration.categories {
        for (pos, record) in records.iter().enumerate() {
            let identifier = record
                .get(IDENTIFIER_FIELD)
                .filter(|id| !id.trim().is_empty())
                .ok_or_else(|| CollectError::ParseFailure {
                    category: *category,
                    reason: format!("record {pos} has no {IDENTIFIER_FIELD}"),
                })?;

            let text = session
                .run_command(&category.detail_command(identifier))
                .await?;
            if text.trim().is_empty() {
                debug!(%category, identifier, "Empty detail response");
            }

            blocks.push(RawBlock {
                category: *category,
                identifier: identifier.to_string(),
                text,
            });
        }
    }

    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReplaySession;
    use crate::enumerate::enumerate_all;
    use proptest::prelude::*;
    use std::collections::HashMap;
    use wi_template::{BuiltinTemplate, Record, Template};

    fn ids(values: &[&str]) -> Vec<Record> {
        values
            .iter()
            .map(|id| Record::from_pairs([(IDENTIFIER_FIELD, *id)]))
            .collect()
    }

    #[tokio::test]
    async fn test_detail_order_and_count() {
        let enumeration = Enumeration {
            categories: vec![
                (Category::Primary, ids(&["1", "2"])),
                (Category::Remote, ids(&[])),
                (Category::Guest, ids(&["3"])),
            ],
            ..Default::default()
        };
        let mut session = ReplaySession::from_map(
            "wlc",
            HashMap::from([("show wlan 2".to_string(), "detail two".to_string())]),
        );

        let blocks = collect_details(&mut session, &enumeration).await.unwrap();

        assert_eq!(
            session.commands(),
            ["show wlan 1", "show wlan 2", "show guest-lan 3"]
        );
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].text, "");
        assert_eq!(blocks[1].text, "detail two");
        assert_eq!(blocks[2].category, Category::Guest);
        assert_eq!(blocks[2].identifier, "3");
    }

    #[tokio::test]
    async fn test_missing_identifier_is_an_error() {
        let enumeration = Enumeration {
            categories: vec![(
                Category::Remote,
                vec![Record::from_pairs([("Profile_Name", "rlan")])],
            )],
            ..Default::default()
        };
        let mut session = ReplaySession::from_map("wlc", HashMap::new());

        let err = collect_details(&mut session, &enumeration)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CollectError::ParseFailure {
                category: Category::Remote,
                ..
            }
        ));
        assert!(session.commands().is_empty());
    }

    #[tokio::test]
    async fn test_no_identifiers_no_commands() {
        let enumeration = Enumeration {
            categories: Category::ALL.iter().map(|c| (*c, Vec::new())).collect(),
            ..Default::default()
        };
        let mut session = ReplaySession::from_map("wlc", HashMap::new());

        let blocks = collect_details(&mut session, &enumeration).await.unwrap();

        assert!(blocks.is_empty());
        assert!(session.commands().is_empty());
    }

    proptest! {
        #[test]
        fn prop_one_detail_command_per_identifier(counts in proptest::array::uniform3(0usize..5)) {
            let summary = Template::builtin(BuiltinTemplate::WlanSummary).unwrap();
            let mut responses = HashMap::new();
            let mut expected = Vec::new();
            let mut next_id = 1;
            for (category, count) in Category::ALL.into_iter().zip(counts) {
                let mut text = String::new();
                for _ in 0..count {
                    text.push_str(&format!("{next_id}        prof-{next_id}        Enabled   vlan{next_id}\n"));
                    expected.push(category.detail_command(&next_id.to_string()));
                    next_id += 1;
                }
                responses.insert(category.summary_command(), text);
            }
            let mut session = ReplaySession::from_map("wlc", responses);

            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let blocks = runtime.block_on(async {
                let enumeration = enumerate_all(&mut session, &summary).await.unwrap();
                collect_details(&mut session, &enumeration).await.unwrap()
            });

            let total: usize = counts.iter().sum();
            prop_assert_eq!(blocks.len(), total);
            // three summary commands come first
            prop_assert_eq!(session.commands()[3..].to_vec(), expected);
            let categories: Vec<Category> = blocks.iter().map(|b| b.category).collect();
            let mut sorted = categories.clone();
            sorted.sort();
            prop_assert_eq!(categories, sorted);
        }
    }
}
