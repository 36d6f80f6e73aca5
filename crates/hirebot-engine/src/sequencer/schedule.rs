use hirebot_common::protocol::ElementHandle;
use std::collections::HashSet;

/// Remembers which schedule cards were clicked during one run.
#[derive(Debug, Default)]
pub struct ScheduleMemory {
    clicked: HashSet<String>,
    last: Option<String>,
}

impl ScheduleMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks a card uniformly at random and records it.
    ///
    /// Cards never clicked before are preferred. Once all were tried, any card
    /// but the previous pick is eligible; the previous pick is repeated only
    /// when it is the sole candidate.
    pub fn pick<'c>(
        &mut self,
        candidates: &'c [ElementHandle],
        rng: &mut fastrand::Rng,
    ) -> Option<&'c ElementHandle> {
        if candidates.is_empty() {
            return None;
        }

        let fresh: Vec<&ElementHandle> = candidates
            .iter()
            .filter(|c| !self.clicked.contains(&c.id))
            .collect();
        let pool = if !fresh.is_empty() {
            fresh
        } else {
            let others: Vec<&ElementHandle> = candidates
                .iter()
                .filter(|c| self.last.as_deref() != Some(c.id.as_str()))
                .collect();
            if others.is_empty() {
                candidates.iter().collect()
            } else {
                others
            }
        };

        let choice = pool[rng.usize(..pool.len())];
        self.clicked.insert(choice.id.clone());
        self.last = Some(choice.id.clone());
        Some(choice)
    }

    pub fn was_clicked(&self, id: &str) -> bool {
        self.clicked.contains(id)
    }

    pub fn last(&self) -> Option<&str> {
        self.last.as_deref()
    }

    pub fn len(&self) -> usize {
        self.clicked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clicked.is_empty()
    }
}
