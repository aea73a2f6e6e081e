//! Per-engine execution diagnostics.

use std::collections::BTreeMap;

use crate::{Fault, FaultClass};

/// Saturating counters updated by an engine with counters enabled.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ExecutionCounters {
    /// Instructions whose condition passed and which ran.
    pub executed: u64,
    /// Instructions skipped by a failing condition.
    pub skipped: u64,
    /// Hits per registry entry name (`MNEMONIC template`).
    pub entry_hits: BTreeMap<String, u64>,
    /// Decode-class faults.
    pub fault_count_decode: u32,
    /// Unmanaged-instruction faults.
    pub fault_count_unmanaged: u32,
    /// Illegal memory accesses.
    pub fault_count_memory: u32,
    /// Unrecognized conditions.
    pub fault_count_condition: u32,
    /// Program counter guard failures.
    pub fault_count_sequencing: u32,
    /// Address of the most recent fault.
    pub last_fault_pc: Option<u32>,
}

impl ExecutionCounters {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one run of the named entry.
    pub fn record_executed(&mut self, entry: &str) {
        self.executed = self.executed.saturating_add(1);
        match self.entry_hits.get_mut(entry) {
            Some(hits) => *hits = hits.saturating_add(1),
            None => {
                self.entry_hits.insert(entry.to_owned(), 1);
            }
        }
    }

    /// Counts one conditionally skipped instruction.
    #[allow(clippy::missing_const_for_fn)]
    pub fn record_skipped(&mut self) {
        self.skipped = self.skipped.saturating_add(1);
    }

    /// Records a fault raised at `pc`, bumping its class counter.
    pub fn record_fault(&mut self, fault: &Fault, pc: u32) {
        self.last_fault_pc = Some(pc);
        let counter = match fault.class() {
            FaultClass::Decode => &mut self.fault_count_decode,
            FaultClass::Unmanaged => &mut self.fault_count_unmanaged,
            FaultClass::Memory => &mut self.fault_count_memory,
            FaultClass::Condition => &mut self.fault_count_condition,
            FaultClass::Sequencing => &mut self.fault_count_sequencing,
        };
        *counter = counter.saturating_add(1);
    }

    /// Total faults across every class.
    #[must_use]
    pub fn total_faults(&self) -> u64 {
        [
            self.fault_count_decode,
            self.fault_count_unmanaged,
            self.fault_count_memory,
            self.fault_count_condition,
            self.fault_count_sequencing,
        ]
        .into_iter()
        .map(u64::from)
        .sum()
    }

    /// Entries ordered by descending hit count, ties by name.
    #[must_use]
    pub fn hottest(&self) -> Vec<(&str, u64)> {
        let mut hits: Vec<_> = self
            .entry_hits
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
            .collect();
        hits.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        hits
    }

    /// Resets every counter.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::ExecutionCounters;
    use crate::Fault;

    #[test]
    fn counters_default_to_zero() {
        let counters = ExecutionCounters::new();
        assert_eq!(counters.executed, 0);
        assert_eq!(counters.total_faults(), 0);
        assert_eq!(counters.last_fault_pc, None);
    }

    #[test]
    fn faults_are_bucketed_by_class() {
        let mut counters = ExecutionCounters::new();
        counters.record_fault(
            &Fault::IllegalMemoryAccess {
                address: 0,
                size: 4,
            },
            0x8004,
        );
        counters.record_fault(&Fault::invalid("x"), 0x8006);
        assert_eq!(counters.fault_count_memory, 1);
        assert_eq!(counters.fault_count_decode, 1);
        assert_eq!(counters.total_faults(), 2);
        assert_eq!(counters.last_fault_pc, Some(0x8006));
    }

    #[test]
    fn fault_counters_saturate() {
        let mut counters = ExecutionCounters {
            fault_count_sequencing: u32::MAX,
            ..ExecutionCounters::default()
        };
        counters.record_fault(
            &Fault::ProgramCounterMismatch {
                expected: 0,
                actual: 2,
            },
            0,
        );
        assert_eq!(counters.fault_count_sequencing, u32::MAX);
    }

    #[test]
    fn hottest_entries_sort_by_count() {
        let mut counters = ExecutionCounters::new();
        counters.record_executed("ADD {rd}, {rn}, #{imm}");
        counters.record_executed("B {target}");
        counters.record_executed("B {target}");
        counters.record_skipped();
        assert_eq!(
            counters.hottest(),
            vec![("B {target}", 2), ("ADD {rd}, {rn}, #{imm}", 1)]
        );
        assert_eq!(counters.executed, 3);
        assert_eq!(counters.skipped, 1);

        counters.reset();
        assert_eq!(counters, ExecutionCounters::default());
    }
}
