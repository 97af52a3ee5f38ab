// ABOUTME: Run-scoped frontier state (saved count, budget, seen URLs) behind one mutex.
// ABOUTME: Exposes only atomic try-reserve operations so concurrent workers cannot overshoot or double-enqueue.

//! Frontier state.
//!
//! All shared mutable crawl state lives in [`FrontierState`] and is reachable
//! only through [`Frontier`], whose operations each take the single lock once:
//!
//! - [`Frontier::try_enqueue`]: check-dedupe-then-insert for a new target URL.
//! - [`Frontier::try_save`]: check-budget-then-increment plus record dedupe.
//!
//! The lock is never held across an await point.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Budget value meaning "no limit".
pub const UNBOUNDED: u64 = u64::MAX;

/// Process-scoped crawl state. Discarded when the run ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierState {
    pub saved_count: u64,
    pub budget: u64,
    /// Every URL ever enqueued, listing and detail alike.
    pub seen_urls: HashSet<String>,
    /// Source URLs of emitted records.
    pub saved_urls: HashSet<String>,
    pub page_budget_per_chain: u32,
}

/// Outcome of trying to save one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveDecision {
    Saved,
    Duplicate,
    BudgetExhausted,
}

/// Single owner of [`FrontierState`].
#[derive(Debug)]
pub struct Frontier {
    dedupe: bool,
    state: Mutex<FrontierState>,
}

impl Frontier {
    pub fn new(budget: u64, page_budget_per_chain: u32, dedupe: bool) -> Self {
        Self {
            dedupe,
            state: Mutex::new(FrontierState {
                saved_count: 0,
                budget: budget.max(1),
                seen_urls: HashSet::new(),
                saved_urls: HashSet::new(),
                page_budget_per_chain: page_budget_per_chain.max(1),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        // state is only mutated in whole steps, so a poisoned lock is still consistent
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserves `url` for fetching.
    ///
    /// Fails once the budget is spent, or when dedupe is on and the URL was seen before.
    pub fn try_enqueue(&self, url: &str) -> bool {
        let mut state = self.lock();
        if state.saved_count >= state.budget {
            return false;
        }
        if self.dedupe {
            return state.seen_urls.insert(url.to_string());
        }
        true
    }

    /// Reserves one unit of budget for a record with `source_url`.
    ///
    /// The URL is also marked seen so later listings do not enqueue it again.
    pub fn try_save(&self, source_url: &str) -> SaveDecision {
        let mut state = self.lock();
        if state.saved_count >= state.budget {
            return SaveDecision::BudgetExhausted;
        }
        if self.dedupe {
            if !state.saved_urls.insert(source_url.to_string()) {
                return SaveDecision::Duplicate;
            }
            state.seen_urls.insert(source_url.to_string());
        }
        state.saved_count += 1;
        SaveDecision::Saved
    }

    pub fn saved_count(&self) -> u64 {
        self.lock().saved_count
    }

    /// Units of budget not yet spent, saturated to `usize`.
    pub fn remaining(&self) -> usize {
        let state = self.lock();
        usize::try_from(state.budget.saturating_sub(state.saved_count)).unwrap_or(usize::MAX)
    }

    pub fn budget_reached(&self) -> bool {
        let state = self.lock();
        state.saved_count >= state.budget
    }

    /// Whether a listing chain at `page_number` may advance to the next page.
    pub fn may_paginate(&self, page_number: u32) -> bool {
        let state = self.lock();
        state.saved_count < state.budget && page_number < state.page_budget_per_chain
    }

    /// A copy of the current state, for diagnostics.
    pub fn snapshot(&self) -> FrontierState {
        self.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn enqueue_dedupes_globally() {
        let frontier = Frontier::new(10, 5, true);
        assert!(frontier.try_enqueue("https://example.com/jobs"));
        assert!(!frontier.try_enqueue("https://example.com/jobs"));
        assert!(frontier.try_enqueue("https://example.com/projects/a-1"));
    }

    #[test]
    fn enqueue_without_dedupe_accepts_repeats() {
        let frontier = Frontier::new(10, 5, false);
        assert!(frontier.try_enqueue("https://example.com/jobs"));
        assert!(frontier.try_enqueue("https://example.com/jobs"));
    }

    #[test]
    fn save_respects_budget_and_dedupe() {
        let frontier = Frontier::new(2, 5, true);
        assert_eq!(frontier.try_save("a"), SaveDecision::Saved);
        assert_eq!(frontier.try_save("a"), SaveDecision::Duplicate);
        assert_eq!(frontier.try_save("b"), SaveDecision::Saved);
        assert_eq!(frontier.try_save("c"), SaveDecision::BudgetExhausted);
        assert_eq!(frontier.saved_count(), 2);
        assert!(frontier.budget_reached());
        assert_eq!(frontier.remaining(), 0);
    }

    #[test]
    fn saved_detail_url_is_not_a_duplicate_of_its_enqueue() {
        let frontier = Frontier::new(5, 5, true);
        assert!(frontier.try_enqueue("https://example.com/projects/a-1"));
        assert_eq!(
            frontier.try_save("https://example.com/projects/a-1"),
            SaveDecision::Saved
        );
    }

    #[test]
    fn saved_api_url_blocks_later_enqueue() {
        let frontier = Frontier::new(5, 5, true);
        assert_eq!(frontier.try_save("https://example.com/projects/a-1"), SaveDecision::Saved);
        assert!(!frontier.try_enqueue("https://example.com/projects/a-1"));
    }

    #[test]
    fn nothing_is_enqueued_once_budget_is_spent() {
        let frontier = Frontier::new(1, 5, true);
        assert_eq!(frontier.try_save("a"), SaveDecision::Saved);
        assert!(!frontier.try_enqueue("https://example.com/jobs/2"));
        assert!(!frontier.may_paginate(1));
    }

    #[test]
    fn pagination_stops_at_page_limit() {
        let frontier = Frontier::new(100, 3, true);
        assert!(frontier.may_paginate(1));
        assert!(frontier.may_paginate(2));
        assert!(!frontier.may_paginate(3));
    }

    #[test]
    fn unbounded_budget_reports_large_remaining() {
        let frontier = Frontier::new(UNBOUNDED, 1, true);
        assert!(frontier.remaining() > 1_000_000);
        assert!(!frontier.budget_reached());
    }

    #[test]
    fn zero_budget_and_page_limit_clamp_to_one() {
        let frontier = Frontier::new(0, 0, true);
        let state = frontier.snapshot();
        assert_eq!(state.budget, 1);
        assert_eq!(state.page_budget_per_chain, 1);
    }

    #[test]
    fn concurrent_saves_never_overshoot_budget() {
        let frontier = Arc::new(Frontier::new(50, 5, true));
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let frontier = Arc::clone(&frontier);
                thread::spawn(move || {
                    let mut saved: u64 = 0;
                    for i in 0..100 {
                        if frontier.try_save(&format!("w{}-{}", worker, i)) == SaveDecision::Saved {
                            saved += 1;
                        }
                    }
                    saved
                })
            })
            .collect();
        let total: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 50);
        assert_eq!(frontier.saved_count(), 50);
    }

    #[test]
    fn concurrent_enqueues_admit_each_url_once() {
        let frontier = Arc::new(Frontier::new(UNBOUNDED, 5, true));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let frontier = Arc::clone(&frontier);
                thread::spawn(move || {
                    (0..200)
                        .filter(|i| frontier.try_enqueue(&format!("https://example.com/p/{}", i)))
                        .count()
                })
            })
            .collect();
        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 200);
    }
}
