use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::insights::{aggregate_closer_insights_at, aggregate_setter_insights_at, rank_closers, rank_setters};
use crate::models::SourceRow;

/// Markdown leaderboard over the full rankings, not just the chat top-N.
pub fn build_report(source_label: &str, generated_at: DateTime<Utc>, rows: &[SourceRow]) -> String {
    let closers = rank_closers(rows);
    let setters = rank_setters(rows);
    let closer_totals = aggregate_closer_insights_at(rows, generated_at);
    let setter_totals = aggregate_setter_insights_at(rows, generated_at);
    let self_gen = rows.iter().filter(|row| row.is_self_gen()).count();

    let mut output = String::new();

    let _ = writeln!(output, "# LeadFlow Sales Report");
    let _ = writeln!(
        output,
        "Generated {} from {} ({} rows)",
        generated_at.format("%Y-%m-%d %H:%M UTC"),
        source_label,
        rows.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");

    match &closer_totals {
        Some(totals) => {
            let _ = writeln!(
                output,
                "- Net deals: {} ({:.1} kW)",
                totals.total_deals, totals.total_kw
            );
        }
        None => {
            let _ = writeln!(output, "- No sales data available.");
        }
    }
    if let Some(totals) = &setter_totals {
        let _ = writeln!(
            output,
            "- Leads: {} total, {} sold ({:.1}% conversion)",
            totals.total_leads, totals.total_sold, totals.overall_conversion_rate
        );
    }
    let _ = writeln!(output, "- Self-gen deals: {self_gen}");

    let _ = writeln!(output);
    let _ = writeln!(output, "## Closer Leaderboard");

    if closers.is_empty() {
        let _ = writeln!(output, "No net deals recorded.");
    } else {
        let _ = writeln!(output, "| Rank | Closer | Net deals | kW | Avg kW |");
        let _ = writeln!(output, "|---|---|---|---|---|");
        for (i, closer) in closers.iter().enumerate() {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {:.1} | {:.1} |",
                i + 1,
                closer.name,
                closer.total_deals_count,
                closer.total_kw,
                closer.avg_kw_per_deal()
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Setter Leaderboard");

    if setters.is_empty() {
        let _ = writeln!(output, "No setter activity recorded.");
    } else {
        let _ = writeln!(output, "| Rank | Setter | Leads | Sold | Conversion | Avg kW | Closers |");
        let _ = writeln!(output, "|---|---|---|---|---|---|---|");
        for (i, setter) in setters.iter().enumerate() {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {:.1}% | {:.1} | {} |",
                i + 1,
                setter.name,
                setter.total_leads,
                setter.sold_leads,
                setter.conversion_rate,
                setter.avg_kw_per_sale(),
                setter.unique_closers_worked_with
            );
        }
    }

    output
}
