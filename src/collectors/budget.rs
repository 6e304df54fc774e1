use chrono::NaiveDate;

use crate::models::{percent_change, BudgetUsage};

/// Daily social item budget.
///
/// Owned by the orchestrator and lent to the social collector for each cycle.
/// The counter resets the first time it is used on a new calendar date.
#[derive(Debug, Clone)]
pub struct BudgetTracker {
    budget: u32,
    per_token_cap: u32,
    date: Option<NaiveDate>,
    used: u32,
    last_cycle_items: Option<u32>,
}

impl BudgetTracker {
    pub fn new(budget: u32, per_token_cap: u32) -> Self {
        Self {
            budget,
            per_token_cap,
            date: None,
            used: 0,
            last_cycle_items: None,
        }
    }

    /// Resets the counter when `today` differs from the tracked date.
    pub fn roll_over(&mut self, today: NaiveDate) {
        if self.date != Some(today) {
            self.date = Some(today);
            self.used = 0;
        }
    }

    /// Even share of the budget across `tokens`, bounded by the per-token cap.
    pub fn cap_for(&self, tokens: usize) -> u32 {
        let share = self.budget / tokens.max(1) as u32;
        share.min(self.per_token_cap)
    }

    pub fn remaining(&self) -> u32 {
        self.budget.saturating_sub(self.used)
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.budget
    }

    /// Items the next request may ask for.
    pub fn allowance(&self, cap: u32) -> u32 {
        cap.min(self.remaining())
    }

    pub fn record(&mut self, items: u32) {
        self.used = self.used.saturating_add(items).min(self.budget);
    }

    /// Closes a cycle with `total` items and returns the change against the
    /// previous cycle in percent (0 without a previous non-empty cycle).
    pub fn complete_cycle(&mut self, total: u32) -> f64 {
        let change = match self.last_cycle_items {
            Some(previous) => percent_change(total as f64, previous as f64),
            None => 0.0,
        };
        self.last_cycle_items = Some(total);
        change
    }

    pub fn usage(&self) -> BudgetUsage {
        BudgetUsage {
            used: self.used,
            budget: self.budget,
            remaining: self.remaining(),
        }
    }
}
