//! WLAN detail collector
//!
//! Enumerates WLANs, remote LANs and guest LANs from their summary output,
//! fetches each entity's detail output and merges the parsed details into
//! one table.

use crate::detail::{RawBlock, collect_details};
use crate::enumerate::enumerate_all;
use crate::normalize::{DroppedBlock, ShapePolicy, Table, normalize};
use crate::session::Session;
use crate::{BlockParser, Category, CollectError, Collector};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{info, instrument};
use wi_template::{BuiltinTemplate, Template};

/// Identifiers found per category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: Category,
    pub count: usize,
}

/// Result of one collection run
#[derive(Debug, Clone, Serialize)]
pub struct CollectReport {
    pub device: String,
    pub table: Table,
    pub identifiers: Vec<CategoryCount>,
    pub commands_issued: usize,
    /// Raw detail output, kept for debugging
    #[serde(skip)]
    pub blocks: Vec<RawBlock>,
    pub dropped: Vec<DroppedBlock>,
    /// Non-fatal warnings encountered
    pub warnings: Vec<String>,
    pub duration: Duration,
    pub collected_at: DateTime<Utc>,
}

impl CollectReport {
    /// Total identifiers across all categories
    pub fn total_identifiers(&self) -> usize {
        self.identifiers.iter().map(|c| c.count).sum()
    }
}

pub struct WlanDetailCollector {
    summary: Box<dyn BlockParser>,
    detail: Box<dyn BlockParser>,
    shape_policy: ShapePolicy,
}

impl WlanDetailCollector {
    pub const NAME: &'static str = "wlan-detail";

    pub fn new(
        summary: Box<dyn BlockParser>,
        detail: Box<dyn BlockParser>,
        shape_policy: ShapePolicy,
    ) -> Self {
        Self {
            summary,
            detail,
            shape_policy,
        }
    }

    /// Collector using the bundled AireOS templates
    pub fn with_builtin_templates(shape_policy: ShapePolicy) -> Result<Self, CollectError> {
        Ok(Self::new(
            Box::new(Template::builtin(BuiltinTemplate::WlanSummary)?),
            Box::new(Template::builtin(BuiltinTemplate::WlanDetail)?),
            shape_policy,
        ))
    }

    /// Run all three stages against a session already in working mode
    #[instrument(skip_all, fields(device = %session.device_name()))]
    pub async fn run<S: Session + ?Sized>(
        &self,
        session: &mut S,
    ) -> Result<CollectReport, CollectError> {
        let start = Instant::now();
        let collected_at = Utc::now();

        let enumeration = enumerate_all(session, self.summary.as_ref()).await?;
        let total = enumeration.total();
        let identifiers = enumeration
            .categories
            .iter()
            .map(|(category, records)| CategoryCount {
                category: *category,
                count: records.len(),
            })
            .collect();

        let blocks = collect_details(session, &enumeration).await?;
        let normalized = normalize(&blocks, self.detail.as_ref(), self.shape_policy);

        let mut warnings = enumeration.warnings;
        warnings.extend(
            normalized
                .dropped
                .iter()
                .map(|d| format!("{} {}: {}", d.category, d.identifier, d.reason)),
        );

        info!(
            identifiers = total,
            rows = normalized.table.len(),
            dropped = normalized.dropped.len(),
            "WLAN detail collection complete"
        );

        Ok(CollectReport {
            device: session.device_name().to_string(),
            table: normalized.table,
            identifiers,
            commands_issued: enumeration.commands_issued + blocks.len(),
            blocks,
            dropped: normalized.dropped,
            warnings,
            duration: start.elapsed(),
            collected_at,
        })
    }
}

#[async_trait]
impl Collector for WlanDetailCollector {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "WLAN, remote LAN and guest LAN configuration details from AireOS controllers"
    }

    async fn collect(&self, session: &mut dyn Session) -> Result<CollectReport, CollectError> {
        self.run(session).await
    }
}
