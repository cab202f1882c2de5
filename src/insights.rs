use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;

use crate::models::{
    CloserInsights, CloserSummary, SetterInsights, SetterSummary, SheetSnapshot, SourceRow,
};
use crate::source::RowSource;

pub const TOP_CLOSERS: usize = 5;
pub const TOP_SETTERS: usize = 10;

pub fn average(total: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

/// Percentage of `sold` over `total`, zero when there is nothing to divide by.
pub fn conversion_rate(sold: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        sold as f64 / total as f64 * 100.0
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Net-deal totals per closer, best first. Names are grouped exactly as
/// written in the sheet; ties keep first-seen order.
pub fn rank_closers(rows: &[SourceRow]) -> Vec<CloserSummary> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut closers: Vec<CloserSummary> = Vec::new();

    for row in rows.iter().filter(|row| row.is_realized()) {
        let Some(name) = row.closer_name.as_deref() else {
            continue;
        };
        let slot = *index.entry(name).or_insert_with(|| {
            closers.push(CloserSummary {
                name: name.to_string(),
                total_deals_count: 0,
                total_kw: 0.0,
            });
            closers.len() - 1
        });
        let entry = &mut closers[slot];
        entry.total_deals_count += 1;
        entry.total_kw += row.system_size_kw;
    }

    closers.sort_by(|a, b| descending(a.total_kw, b.total_kw));
    closers
}

struct SetterTally<'a> {
    name: &'a str,
    total_leads: usize,
    sold_leads: usize,
    total_kw_from_sold: f64,
    closers: HashSet<&'a str>,
}

/// Gross lead volume and sold subset per setter, best conversion first.
pub fn rank_setters(rows: &[SourceRow]) -> Vec<SetterSummary> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut tallies: Vec<SetterTally<'_>> = Vec::new();

    for row in rows {
        let Some(name) = row.setter_name.as_deref() else {
            continue;
        };
        let slot = *index.entry(name).or_insert_with(|| {
            tallies.push(SetterTally {
                name,
                total_leads: 0,
                sold_leads: 0,
                total_kw_from_sold: 0.0,
                closers: HashSet::new(),
            });
            tallies.len() - 1
        });
        let tally = &mut tallies[slot];
        tally.total_leads += 1;
        if row.is_realized() {
            tally.sold_leads += 1;
            tally.total_kw_from_sold += row.system_size_kw;
        }
        if let Some(closer) = row.closer_name.as_deref() {
            tally.closers.insert(closer);
        }
    }

    let mut setters: Vec<SetterSummary> = tallies
        .into_iter()
        .map(|tally| SetterSummary {
            name: tally.name.to_string(),
            total_leads: tally.total_leads,
            sold_leads: tally.sold_leads,
            total_kw_from_sold: tally.total_kw_from_sold,
            unique_closers_worked_with: tally.closers.len(),
            conversion_rate: conversion_rate(tally.sold_leads, tally.total_leads),
        })
        .collect();

    setters.sort_by(|a, b| descending(a.conversion_rate, b.conversion_rate));
    setters
}

pub fn aggregate_closer_insights(rows: &[SourceRow]) -> Option<CloserInsights> {
    aggregate_closer_insights_at(rows, Utc::now())
}

/// `None` means the sheet gave us nothing, which is not the same as zero deals.
pub fn aggregate_closer_insights_at(
    rows: &[SourceRow],
    as_of: DateTime<Utc>,
) -> Option<CloserInsights> {
    if rows.is_empty() {
        return None;
    }

    let mut closers = rank_closers(rows);
    let total_deals = closers.iter().map(|c| c.total_deals_count).sum();
    let total_kw = closers.iter().map(|c| c.total_kw).sum();
    closers.truncate(TOP_CLOSERS);

    Some(CloserInsights {
        total_deals,
        total_kw,
        top_closers: closers,
        data_freshness: as_of,
    })
}

pub fn aggregate_setter_insights(rows: &[SourceRow]) -> Option<SetterInsights> {
    aggregate_setter_insights_at(rows, Utc::now())
}

/// The overall rate is sold over leads across every setter row, not a mean
/// of per-setter rates.
pub fn aggregate_setter_insights_at(
    rows: &[SourceRow],
    as_of: DateTime<Utc>,
) -> Option<SetterInsights> {
    let mut setters = rank_setters(rows);
    if setters.is_empty() {
        return None;
    }

    let total_leads: usize = setters.iter().map(|s| s.total_leads).sum();
    let total_sold: usize = setters.iter().map(|s| s.sold_leads).sum();
    setters.truncate(TOP_SETTERS);

    Some(SetterInsights {
        total_leads,
        total_sold,
        overall_conversion_rate: conversion_rate(total_sold, total_leads),
        top_setters: setters,
        data_freshness: as_of,
    })
}

impl SheetSnapshot {
    /// Derives every aggregate from one fetched row list.
    pub fn from_rows(rows: &[SourceRow]) -> Self {
        Self {
            closers: aggregate_closer_insights(rows),
            setters: aggregate_setter_insights(rows),
            self_gen_count: rows.iter().filter(|row| row.is_self_gen()).count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.closers.is_none() && self.setters.is_none()
    }
}

/// Per-request snapshot, fetched on first use and shared by every consumer
/// in that request.
pub struct SnapshotCell<'a, S> {
    source: &'a S,
    cell: OnceCell<SheetSnapshot>,
}

impl<'a, S: RowSource> SnapshotCell<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            cell: OnceCell::new(),
        }
    }

    pub async fn get(&self) -> &SheetSnapshot {
        self.cell
            .get_or_init(|| async move {
                let rows = self.source.fetch_rows().await;
                SheetSnapshot::from_rows(&rows)
            })
            .await
    }

    #[cfg(test)]
    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(closer: Option<&str>, setter: Option<&str>, watts: f64, flag: f64) -> SourceRow {
        SourceRow {
            closer_name: closer.map(str::to_string),
            setter_name: setter.map(str::to_string),
            system_size_kw: watts / 1000.0,
            realization_flag: flag,
        }
    }

    #[test]
    fn closer_totals_only_count_net_deals() {
        let rows = vec![
            row(Some("Amy"), None, 5000.0, 1.0),
            row(Some("Amy"), None, 3000.0, 1.0),
            row(Some("Bo"), None, 10000.0, 0.0),
        ];

        let insights = aggregate_closer_insights(&rows).unwrap();
        assert_eq!(insights.total_deals, 2);
        assert!((insights.total_kw - 8.0).abs() < 1e-9);
        assert_eq!(insights.top_closers.len(), 1);
        let amy = &insights.top_closers[0];
        assert_eq!(amy.name, "Amy");
        assert_eq!(amy.total_deals_count, 2);
        assert!((amy.total_kw - 8.0).abs() < 1e-9);
        assert!((amy.avg_kw_per_deal() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn empty_rows_give_no_insights() {
        assert!(aggregate_closer_insights(&[]).is_none());
        assert!(aggregate_setter_insights(&[]).is_none());
        assert!(SheetSnapshot::from_rows(&[]).is_empty());
    }

    #[test]
    fn setter_insights_need_setter_names() {
        let rows = vec![row(Some("Amy"), None, 5000.0, 1.0)];
        assert!(aggregate_setter_insights(&rows).is_none());
        assert!(aggregate_closer_insights(&rows).is_some());
    }

    #[test]
    fn top_closers_truncated_and_descending() {
        let rows: Vec<SourceRow> = (1..=8)
            .map(|i| {
                let name = format!("Closer {i}");
                row(Some(&name), None, f64::from(i) * 1000.0, 1.0)
            })
            .collect();

        let insights = aggregate_closer_insights(&rows).unwrap();
        assert_eq!(insights.top_closers.len(), 5);
        assert_eq!(insights.total_deals, 8);
        for pair in insights.top_closers.windows(2) {
            assert!(pair[0].total_kw > pair[1].total_kw);
        }
        assert_eq!(insights.top_closers[0].name, "Closer 8");
    }

    #[test]
    fn ties_keep_encounter_order() {
        let rows = vec![
            row(Some("Zed"), None, 4000.0, 1.0),
            row(Some("Amy"), None, 4000.0, 1.0),
            row(Some("Moe"), None, 4000.0, 1.0),
        ];
        let names: Vec<_> = rank_closers(&rows).into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Zed", "Amy", "Moe"]);
    }

    #[test]
    fn names_are_not_normalized() {
        let rows = vec![
            row(Some("Amy Smith"), None, 4000.0, 1.0),
            row(Some("amy smith"), None, 4000.0, 1.0),
        ];
        assert_eq!(rank_closers(&rows).len(), 2);
    }

    #[test]
    fn setter_counts_gross_leads_but_only_sold_kw() {
        let rows = vec![
            row(Some("Amy"), Some("Carl"), 5000.0, 1.0),
            row(Some("Bo"), Some("Carl"), 7000.0, 0.0),
            row(None, Some("Carl"), 9000.0, 0.0),
            row(Some("Amy"), Some("Carl"), 3000.0, 1.0),
        ];

        let setters = rank_setters(&rows);
        assert_eq!(setters.len(), 1);
        let carl = &setters[0];
        assert_eq!(carl.total_leads, 4);
        assert_eq!(carl.sold_leads, 2);
        assert!((carl.total_kw_from_sold - 8.0).abs() < 1e-9);
        assert_eq!(carl.unique_closers_worked_with, 2);
        assert!((carl.conversion_rate - 50.0).abs() < 1e-9);
        assert!((carl.avg_kw_per_sale() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn overall_rate_is_population_rate() {
        // Dee 1/1 and Eve 1/4: mean of rates would be 62.5, population rate is 40.
        let rows = vec![
            row(None, Some("Dee"), 1000.0, 1.0),
            row(None, Some("Eve"), 1000.0, 1.0),
            row(None, Some("Eve"), 1000.0, 0.0),
            row(None, Some("Eve"), 1000.0, 0.0),
            row(None, Some("Eve"), 1000.0, 0.0),
        ];

        let insights = aggregate_setter_insights(&rows).unwrap();
        assert_eq!(insights.total_leads, 5);
        assert_eq!(insights.total_sold, 2);
        assert!((insights.overall_conversion_rate - 40.0).abs() < 1e-9);
        assert_eq!(insights.top_setters[0].name, "Dee");
    }

    #[test]
    fn top_setters_capped_at_ten() {
        let rows: Vec<SourceRow> = (0..14)
            .map(|i| {
                let name = format!("Setter {i}");
                row(None, Some(&name), 1000.0, if i % 2 == 0 { 1.0 } else { 0.0 })
            })
            .collect();
        let insights = aggregate_setter_insights(&rows).unwrap();
        assert_eq!(insights.top_setters.len(), 10);
        assert_eq!(insights.total_leads, 14);
        assert_eq!(insights.top_setters[0].conversion_rate, 100.0);
    }

    #[test]
    fn divide_by_zero_guards() {
        assert_eq!(conversion_rate(0, 0), 0.0);
        assert_eq!(average(12.0, 0), 0.0);

        let idle = SetterSummary {
            name: "Idle".to_string(),
            total_leads: 0,
            sold_leads: 0,
            total_kw_from_sold: 0.0,
            unique_closers_worked_with: 0,
            conversion_rate: conversion_rate(0, 0),
        };
        assert!(idle.conversion_rate.is_finite());
        assert_eq!(idle.avg_kw_per_sale(), 0.0);
    }

    #[test]
    fn aggregation_is_deterministic() {
        let rows = vec![
            row(Some("Amy"), Some("Carl"), 5000.0, 1.0),
            row(Some("Bo"), Some("Dana"), 5000.0, 1.0),
            row(Some("Cy"), Some("Carl"), 2000.0, 0.0),
            row(Some("Bo"), Some("Eve"), 6000.0, 1.0),
        ];
        let as_of = Utc::now();

        let first = aggregate_closer_insights_at(&rows, as_of);
        let second = aggregate_closer_insights_at(&rows, as_of);
        assert_eq!(first, second);

        let first = aggregate_setter_insights_at(&rows, as_of);
        let second = aggregate_setter_insights_at(&rows, as_of);
        assert_eq!(first, second);
    }

    #[test]
    fn snapshot_counts_self_gen_rows() {
        let rows = vec![
            row(Some("Amy"), Some("Amy"), 5000.0, 1.0),
            row(Some("Amy"), Some("Carl"), 5000.0, 1.0),
        ];
        let snapshot = SheetSnapshot::from_rows(&rows);
        assert_eq!(snapshot.self_gen_count, 1);
        assert!(snapshot.closers.is_some());
        assert!(snapshot.setters.is_some());
    }
}
