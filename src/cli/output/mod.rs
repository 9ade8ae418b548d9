//! Plain text rendering. Rows are tab separated so they can be piped into `cut` or `column -t`.

use std::{collections::BTreeMap, fmt::Write};

use ansi_term::Style;

use crate::{
    analysis::{
        aggregate::{Aggregate, BucketKey},
        insights::{InsightReport, JournalStats, GOOD_LEVEL},
        streak::StreakState,
        trend::TrendReport,
    },
    journal::entities::{Entry, Level},
    utils::time::{format_date_key, DateKey},
};

const NO_DATA: &str = "-";

pub fn heading(text: &str) -> String {
    Style::new().bold().paint(text).to_string()
}

pub fn format_average(average: Option<f64>) -> String {
    average.map_or_else(|| NO_DATA.to_string(), |v| format!("{v:.1}"))
}

/// Bar scaled to the level range, one cell per level point.
pub fn bar(average: Option<f64>) -> String {
    let cells = average.map_or(0, |v| v.round().clamp(0., Level::MAX as f64) as usize);
    "#".repeat(cells)
}

pub fn format_entries(entries: &[Entry]) -> String {
    let mut out = String::new();
    if entries.is_empty() {
        let _ = writeln!(out, "No entries");
        return out;
    }
    for entry in entries {
        let time = entry
            .time()
            .map_or_else(|| NO_DATA.to_string(), |v| v.format("%H:%M").to_string());
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}",
            format_date_key(entry.date()),
            time,
            entry.value(),
            entry.note()
        );
    }
    out
}

pub fn format_streak(streak: &StreakState) -> String {
    let last = streak
        .last_active
        .map_or_else(|| NO_DATA.to_string(), format_date_key);
    format!(
        "Current streak\t{}\nLongest streak\t{}\nLast active\t{}\n",
        streak.current, streak.longest, last
    )
}

fn format_trend(trend: Option<&TrendReport>) -> String {
    match trend {
        Some(trend) => format!(
            "Trend\t{}\t{} vs {}\n",
            trend.direction,
            format_average(Some(trend.recent_mean)),
            format_average(trend.prior_mean)
        ),
        None => format!("Trend\t{NO_DATA}\n"),
    }
}

/// Rows of `key count average bar`.
pub fn format_buckets<K: std::fmt::Display>(
    buckets: impl IntoIterator<Item = (K, Aggregate)>,
) -> String {
    let mut out = String::new();
    for (key, aggregate) in buckets {
        let average = aggregate.average();
        let _ = writeln!(
            out,
            "{key}\t{}\t{}\t{}",
            aggregate.count,
            format_average(average),
            bar(average)
        );
    }
    out
}

pub fn format_hour_chart(chart: &BTreeMap<u32, Aggregate>) -> String {
    format_buckets(chart.iter().map(|(hour, v)| (BucketKey::Hour(*hour), *v)))
}

pub fn format_days(days: &[(DateKey, Aggregate)]) -> String {
    format_buckets(days.iter().map(|(day, v)| {
        (format!("{} {}", day.format("%a"), format_date_key(*day)), *v)
    }))
}

pub fn format_report(report: &InsightReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", heading("Buckets"));
    out.push_str(&format_buckets(report.buckets.iter().map(|(k, v)| (*k, *v))));
    let _ = writeln!(out, "\n{}", heading("Summary"));
    let _ = writeln!(out, "Entries\t{}", report.totals.count);
    let _ = writeln!(out, "Active days\t{}", report.totals.active_days);
    let _ = writeln!(out, "Average\t{}", format_average(report.totals.average));
    match report.peak {
        Some((key, average)) => {
            let _ = writeln!(out, "Peak\t{key}\t{}", format_average(Some(average)));
        }
        None => {
            let _ = writeln!(out, "Peak\t{NO_DATA}");
        }
    }
    out.push_str(&format_trend(report.trend.as_ref()));
    out.push_str(&format_streak(&report.streak));
    out
}

pub fn format_stats(stats: &JournalStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", heading("Totals"));
    let _ = writeln!(out, "Entries\t{}", stats.total.count);
    let _ = writeln!(out, "Active days\t{}", stats.active_days);
    let _ = writeln!(out, "Entries per day\t{}", format_average(stats.entries_per_day));
    let _ = writeln!(out, "Average\t{}", format_average(stats.total.average()));

    if stats.total.measured > 0 {
        let _ = writeln!(out, "\n{}", heading("Distribution"));
        for (level, count) in &stats.distribution {
            let _ = writeln!(out, "{level}\t{count}\t{}", "#".repeat(*count));
        }
    }

    let _ = writeln!(out, "\n{}", heading("Streaks"));
    out.push_str(&format_streak(&stats.streak));
    if stats.total.measured > 0 {
        let _ = writeln!(
            out,
            "Good days ({GOOD_LEVEL}+)\t{} current\t{} longest",
            stats.good_streak.current, stats.good_streak.longest
        );
    }
    out
}
