use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

use crate::models::summary::{CategoryCount, Summary};
use crate::models::ticket::Ticket;

/// Read-only statistics over an ordered batch of tickets.
pub struct Aggregator<'a> {
    tickets: &'a [Ticket],
}

impl<'a> Aggregator<'a> {
    pub fn new(tickets: &'a [Ticket]) -> Self {
        Self { tickets }
    }

    pub fn total(&self) -> usize {
        self.tickets.len()
    }

    pub fn closed_count(&self) -> usize {
        self.tickets.iter().filter(|t| t.is_closed()).count()
    }

    pub fn tickets_per_day(&self) -> BTreeMap<NaiveDate, usize> {
        count_by_date(self.tickets.iter().map(|t| t.opened_date()))
    }

    /// Closed tickets grouped by close date. A closed ticket without a close
    /// date is counted by [`closed_count`](Self::closed_count) but not here.
    pub fn closed_per_day(&self) -> BTreeMap<NaiveDate, usize> {
        count_by_date(
            self.tickets
                .iter()
                .filter(|t| t.is_closed())
                .filter_map(|t| t.closed_date()),
        )
    }

    /// Descending by count; equal counts keep first-seen order.
    pub fn category_distribution(&self) -> Vec<CategoryCount> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut counts: Vec<CategoryCount> = Vec::new();

        for ticket in self.tickets {
            match index.get(ticket.category()) {
                Some(&i) => counts[i].count += 1,
                None => {
                    index.insert(ticket.category(), counts.len());
                    counts.push(CategoryCount {
                        category: ticket.category().to_string(),
                        count: 1,
                    });
                }
            }
        }

        // stable sort
        counts.sort_by(|a, b| b.count.cmp(&a.count));
        counts
    }

    pub fn closure_rate(&self) -> f64 {
        closure_rate(self.closed_count(), self.total())
    }

    pub fn summary(&self) -> Summary {
        let total = self.total();
        let closed = self.closed_count();

        Summary {
            total,
            closed,
            closure_rate: closure_rate(closed, total),
            tickets_per_day: self.tickets_per_day(),
            closed_per_day: self.closed_per_day(),
            by_category: self.category_distribution(),
        }
    }
}

fn count_by_date(dates: impl Iterator<Item = NaiveDate>) -> BTreeMap<NaiveDate, usize> {
    let mut counts = BTreeMap::new();
    for date in dates {
        *counts.entry(date).or_insert(0) += 1;
    }
    counts
}

/// Percentage rounded to two decimals, 0 for an empty batch.
///
/// Exact halves round to the even neighbour, so 0.125% reports as 0.12.
pub fn closure_rate(closed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let rate = 100.0 * closed as f64 / total as f64;
    (rate * 100.0).round_ties_even() / 100.0
}
