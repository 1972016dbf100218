//! Rule-change audit trail
//!
//! Every create/update/delete of a coverage rule appends one record with
//! full before/after snapshots. Bulk edits (admin imports) share a generated
//! change-batch id so they can be reviewed, and in principle reverted, as a
//! unit. The trail is append-only and is never consulted by the resolver.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use core_kernel::{ChangeBatchId, RuleHistoryId, RuleId, UserId};
use crate::rule::InsuranceCoverageRule;

/// What happened to the rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleChangeAction {
    Created,
    Updated,
    Deleted,
}

/// One append-only history row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleChangeRecord {
    pub id: RuleHistoryId,
    pub rule_id: RuleId,
    pub action: RuleChangeAction,
    /// Snapshot before the change; None for creates
    pub before: Option<Value>,
    /// Snapshot after the change; None for deletes
    pub after: Option<Value>,
    /// Correlates the rows of one bulk edit
    pub change_batch_id: Option<ChangeBatchId>,
    pub changed_by: UserId,
    pub changed_at: DateTime<Utc>,
}

/// Collects rule-change records for persistence
///
/// The auditor buffers records in memory; the repository flushes them in
/// the same transaction as the rule write itself.
#[derive(Debug, Default)]
pub struct RuleAuditor {
    records: Vec<RuleChangeRecord>,
    current_batch: Option<ChangeBatchId>,
}

impl RuleAuditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a bulk edit; subsequent records share the returned batch id
    /// until [`end_bulk`](Self::end_bulk) is called.
    pub fn begin_bulk(&mut self) -> ChangeBatchId {
        let id = ChangeBatchId::new_v7();
        self.current_batch = Some(id);
        id
    }

    pub fn end_bulk(&mut self) {
        self.current_batch = None;
    }

    /// Records a rule creation
    pub fn record_created(&mut self, rule: &InsuranceCoverageRule, changed_by: UserId) {
        self.append(rule.id, RuleChangeAction::Created, None, snapshot(rule), changed_by);
    }

    /// Records a rule update with before/after snapshots
    pub fn record_updated(
        &mut self,
        before: &InsuranceCoverageRule,
        after: &InsuranceCoverageRule,
        changed_by: UserId,
    ) {
        self.append(
            after.id,
            RuleChangeAction::Updated,
            snapshot(before),
            snapshot(after),
            changed_by,
        );
    }

    /// Records a rule deletion (soft or hard) with its final snapshot
    pub fn record_deleted(&mut self, rule: &InsuranceCoverageRule, changed_by: UserId) {
        self.append(rule.id, RuleChangeAction::Deleted, snapshot(rule), None, changed_by);
    }

    fn append(
        &mut self,
        rule_id: RuleId,
        action: RuleChangeAction,
        before: Option<Value>,
        after: Option<Value>,
        changed_by: UserId,
    ) {
        debug!(rule_id = %rule_id, ?action, "recording rule change");
        self.records.push(RuleChangeRecord {
            id: RuleHistoryId::new_v7(),
            rule_id,
            action,
            before,
            after,
            change_batch_id: self.current_batch,
            changed_by,
            changed_at: Utc::now(),
        });
    }

    /// All buffered records, oldest first
    pub fn records(&self) -> &[RuleChangeRecord] {
        &self.records
    }

    /// Records belonging to one bulk edit
    pub fn records_for_batch(&self, batch_id: ChangeBatchId) -> Vec<&RuleChangeRecord> {
        self.records
            .iter()
            .filter(|r| r.change_batch_id == Some(batch_id))
            .collect()
    }

    /// Drains the buffer for persistence
    pub fn take_records(&mut self) -> Vec<RuleChangeRecord> {
        std::mem::take(&mut self.records)
    }
}

fn snapshot(rule: &InsuranceCoverageRule) -> Option<Value> {
    // Serialization of a plain data struct cannot fail in practice; a None
    // snapshot is still a valid (if less useful) history row.
    serde_json::to_value(rule).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{EffectiveWindow, PlanId};
    use crate::rule::{CoverageCategory, CoverageTerms, RuleScope};
    use rust_decimal_macros::dec;

    fn rule() -> InsuranceCoverageRule {
        InsuranceCoverageRule {
            id: RuleId::new_v7(),
            scope: RuleScope {
                plan_id: PlanId::new(),
                category: CoverageCategory::Lab,
                item_code: None,
            },
            terms: CoverageTerms::percentage(dec!(50)),
            is_unmapped: false,
            is_active: true,
            effective_window: EffectiveWindow::unbounded(),
        }
    }

    #[test]
    fn test_create_records_after_snapshot_only() {
        let mut auditor = RuleAuditor::new();
        auditor.record_created(&rule(), UserId::new());

        let records = auditor.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, RuleChangeAction::Created);
        assert!(records[0].before.is_none());
        assert!(records[0].after.is_some());
    }

    #[test]
    fn test_update_records_both_snapshots() {
        let before = rule();
        let mut after = before.clone();
        after.terms.coverage_value = Some(dec!(70));

        let mut auditor = RuleAuditor::new();
        auditor.record_updated(&before, &after, UserId::new());

        let record = &auditor.records()[0];
        assert!(record.before.is_some());
        assert!(record.after.is_some());
        assert_ne!(record.before, record.after);
    }

    #[test]
    fn test_bulk_edits_share_batch_id() {
        let mut auditor = RuleAuditor::new();
        let batch = auditor.begin_bulk();
        auditor.record_created(&rule(), UserId::new());
        auditor.record_created(&rule(), UserId::new());
        auditor.end_bulk();
        auditor.record_created(&rule(), UserId::new());

        assert_eq!(auditor.records_for_batch(batch).len(), 2);
        assert_eq!(auditor.records()[2].change_batch_id, None);
    }

    #[test]
    fn test_take_records_drains_buffer() {
        let mut auditor = RuleAuditor::new();
        auditor.record_deleted(&rule(), UserId::new());

        let taken = auditor.take_records();
        assert_eq!(taken.len(), 1);
        assert!(auditor.records().is_empty());
    }
}
