/// Output formatting: terminal tables, JSON and CSV export.
use std::io::{self, Write};

use serde::Serialize;
use tierpick_core::{
    BoundsReport, CollectionSummary, ItemSnapshot, RankingMetric, TierDistribution, TierRow,
};

#[derive(Serialize)]
struct JsonRankedItem<'a> {
    rank: usize,
    #[serde(flatten)]
    item: &'a ItemSnapshot,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    metric: RankingMetric,
    summary: &'a CollectionSummary,
    items: Vec<JsonRankedItem<'a>>,
    distribution: &'a [TierRow],
    bounds: &'a BoundsReport,
}

/// Print rankings as a formatted terminal table.
pub fn print_table(rankings: &[ItemSnapshot], metric: RankingMetric) {
    let name_width = rankings.iter().map(|s| s.id.len()).max().unwrap_or(4).max(4);

    println!("Ranked by {metric:?}");
    println!(" # | {:<name_width$} | Tier | Votes |  W-L  | Win % | Stability | Confidence", "Item");
    println!("---|-{}-|------|-------|-------|-------|-----------|-----------", "-".repeat(name_width));

    for (i, s) in rankings.iter().enumerate() {
        let record = format!("{}-{}", s.wins, s.losses);
        println!(
            "{:>2} | {:<name_width$} | {:>+4} | {:>5} | {:>5} | {:>5.1} | {:>9.3} | {:>10.3}",
            i + 1,
            s.id,
            s.tier,
            s.votes,
            record,
            s.win_rate * 100.0,
            s.stability,
            s.confidence,
        );
    }
}

pub fn print_summary(summary: &CollectionSummary) {
    println!(
        "\n{} items, {} votes ({:.1} per item), {} never voted",
        summary.total_items, summary.total_votes, summary.average_votes_per_item, summary.never_voted_items,
    );
    println!(
        "Confidence: mean {:.3}, min {:.3}, max {:.3}, sd {:.3}",
        summary.confidence.mean, summary.confidence.min, summary.confidence.max, summary.confidence.std_dev,
    );
}

pub fn print_distribution(distribution: &TierDistribution) {
    println!("\nTier | Actual | Expected | Ratio");
    println!("-----|--------|----------|------");
    // Highest tier on top.
    for row in distribution.rows().iter().rev() {
        let flag = if row.overflowing { "  overflowing" } else { "" };
        println!(
            "{:>+4} | {:>6} | {:>8.2} | {:>5.2}{flag}",
            row.tier, row.actual, row.expected, row.ratio,
        );
    }
}

pub fn print_bounds(report: &BoundsReport) {
    match report.bounds {
        Some(b) => println!(
            "\nBounds {:+}..={:+} ({}x spread{}): {} at lower, {} at upper, {} may exceed \
             (needs {} votes and confidence {:.2})",
            b.lower,
            b.upper,
            report.multiplier,
            if report.adaptive { ", adaptive" } else { "" },
            report.at_lower_bound,
            report.at_upper_bound,
            report.qualified_to_exceed,
            report.min_votes_to_exceed,
            report.min_confidence_to_exceed,
        ),
        None => println!("\nTier bounds disabled"),
    }
}

/// Print everything `stats --json` reports as one JSON document.
pub fn print_json(
    rankings: &[ItemSnapshot],
    metric: RankingMetric,
    summary: &CollectionSummary,
    distribution: &TierDistribution,
    bounds: &BoundsReport,
) -> serde_json::Result<()> {
    let output = JsonOutput {
        metric,
        summary,
        items: rankings
            .iter()
            .enumerate()
            .map(|(i, item)| JsonRankedItem { rank: i + 1, item })
            .collect(),
        distribution: distribution.rows(),
        bounds,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

const CSV_HEADER: &str = "id,tier,votes,wins,losses,win_rate,stability,confidence,last_voted";

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn write_csv(out: &mut impl Write, rankings: &[ItemSnapshot]) -> io::Result<()> {
    writeln!(out, "{CSV_HEADER}")?;
    for s in rankings {
        let last_voted = s.last_voted.map(|r| r.to_string()).unwrap_or_default();
        writeln!(
            out,
            "{},{},{},{},{},{:.4},{:.4},{:.4},{}",
            csv_field(&s.id),
            s.tier,
            s.votes,
            s.wins,
            s.losses,
            s.win_rate,
            s.stability,
            s.confidence,
            last_voted,
        )?;
    }
    Ok(())
}
