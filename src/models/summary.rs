use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

/// Aggregate statistics for one batch of tickets. Built by
/// [`Aggregator::summary`](crate::aggregator::Aggregator::summary), never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub closed: usize,
    pub closure_rate: f64,
    pub tickets_per_day: BTreeMap<NaiveDate, usize>,
    pub closed_per_day: BTreeMap<NaiveDate, usize>,
    pub by_category: Vec<CategoryCount>,
}

/// A summary field as rendered in text and document reports.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionValue {
    Scalar(String),
    Entries(Vec<(String, String)>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummarySection {
    pub label: &'static str,
    pub value: SectionValue,
}

impl Summary {
    pub fn empty() -> Self {
        Summary {
            total: 0,
            closed: 0,
            closure_rate: 0.0,
            tickets_per_day: BTreeMap::new(),
            closed_per_day: BTreeMap::new(),
            by_category: Vec::new(),
        }
    }

    /// Report sections in display order.
    pub fn sections(&self) -> Vec<SummarySection> {
        vec![
            SummarySection {
                label: "Total Tickets",
                value: SectionValue::Scalar(self.total.to_string()),
            },
            SummarySection {
                label: "Closed Tickets",
                value: SectionValue::Scalar(self.closed.to_string()),
            },
            SummarySection {
                label: "Closure Rate (%)",
                value: SectionValue::Scalar(format_rate(self.closure_rate)),
            },
            SummarySection {
                label: "Tickets per Day",
                value: SectionValue::Entries(date_entries(&self.tickets_per_day)),
            },
            SummarySection {
                label: "Closed per Day",
                value: SectionValue::Entries(date_entries(&self.closed_per_day)),
            },
            SummarySection {
                label: "By Category",
                value: SectionValue::Entries(
                    self.by_category
                        .iter()
                        .map(|c| (c.category.clone(), c.count.to_string()))
                        .collect(),
                ),
            },
        ]
    }
}

fn date_entries(counts: &BTreeMap<NaiveDate, usize>) -> Vec<(String, String)> {
    counts
        .iter()
        .map(|(date, count)| (date.format("%Y-%m-%d").to_string(), count.to_string()))
        .collect()
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for section in self.sections() {
            match section.value {
                SectionValue::Scalar(value) => writeln!(f, "{}: {}", section.label, value)?,
                SectionValue::Entries(entries) if entries.is_empty() => {
                    writeln!(f, "{}: (none)", section.label)?
                }
                SectionValue::Entries(entries) => {
                    writeln!(f, "{}:", section.label)?;
                    for (key, value) in entries {
                        writeln!(f, "   {}: {}", key, value)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Always keeps a fractional part: `50.0`, `33.33`, `0.0`.
fn format_rate(rate: f64) -> String {
    format!("{:?}", rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_renders_nested_sections() {
        let mut summary = Summary::empty();
        summary.total = 2;
        summary.closed = 1;
        summary.closure_rate = 50.0;
        summary
            .tickets_per_day
            .insert(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 2);
        summary.by_category.push(CategoryCount {
            category: "network".to_string(),
            count: 2,
        });

        let text = summary.to_string();
        assert!(text.contains("Total Tickets: 2\n"));
        assert!(text.contains("Closure Rate (%): 50.0\n"));
        assert!(text.contains("Tickets per Day:\n   2024-01-01: 2\n"));
        assert!(text.contains("Closed per Day: (none)\n"));
        assert!(text.contains("By Category:\n   network: 2\n"));
    }

    #[test]
    fn closure_rate_keeps_a_fractional_part() {
        assert_eq!(format_rate(50.0), "50.0");
        assert_eq!(format_rate(100.0), "100.0");
        assert_eq!(format_rate(33.33), "33.33");
        assert!(Summary::empty().to_string().contains("Closure Rate (%): 0.0\n"));
    }

    #[test]
    fn serializes_dates_as_keys() {
        let mut summary = Summary::empty();
        summary
            .closed_per_day
            .insert(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), 1);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["closed_per_day"]["2024-01-02"], 1);
        assert_eq!(json["total"], 0);
    }
}
