use anyhow::Result;
use clap::{CommandFactory, Subcommand};

use crate::{
    analysis::aggregate::{Granularity, HourDomain},
    journal::storage::JournalStorage,
    tracker::Tracker,
};

use super::{
    dates::{parse_day_range, DateStyle},
    output::{
        format_days, format_entries, format_hour_chart, format_report, format_stats,
        format_streak, heading,
    },
    Args,
};

#[derive(Subcommand, Debug)]
pub enum JournalCommand {
    #[command(about = "Log an entry. Levels are 1-5, habits take done or skip")]
    Log {
        value: String,
        #[arg(trailing_var_arg = true, help = "Optional note")]
        note: Vec<String>,
    },
    #[command(about = "Entries logged today")]
    Today,
    #[command(about = "Entries of the last few days")]
    Show {
        #[arg(long, default_value_t = 14, help = "Number of days to show")]
        days: u32,
        #[arg(long, help = "Show this many most recent entries instead")]
        last: Option<usize>,
    },
    #[command(about = "Entries between two days")]
    Range {
        #[arg(
            long,
            short,
            help = "First day. Examples are \"2024-06-01\", \"last monday\", \"3 days ago\", \"15/03/2025\""
        )]
        from: Option<String>,
        #[arg(long, short, help = "Last day, today by default")]
        to: Option<String>,
        #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
        date_style: DateStyle,
    },
    #[command(about = "Average level by hour of day")]
    Chart {
        #[arg(long, help = "First hour shown")]
        from: Option<u32>,
        #[arg(long, help = "Last hour shown")]
        to: Option<u32>,
    },
    #[command(about = "Last seven days, one line per day")]
    Week,
    #[command(about = "Buckets, trend and streak")]
    Insights {
        #[arg(long, default_value_t = Granularity::Day, help = "Bucket size")]
        by: Granularity,
        #[arg(long, default_value_t = 7, help = "Buckets per trend window")]
        window: usize,
    },
    #[command(about = "All-time totals, distribution and streaks")]
    Stats,
    #[command(about = "Current and longest streak")]
    Streak,
}

pub async fn process_journal_command<S: JournalStorage>(
    tracker: Tracker<S>,
    command: JournalCommand,
) -> Result<()> {
    match command {
        JournalCommand::Log { value, note } => {
            let entry = tracker.log(&value, &note.join(" ")).await?;
            println!("Logged {} for {}", entry.value(), entry.date());
            if tracker.profile().cache_streak {
                print!("{}", format_streak(&tracker.streak().await?));
            }
        }
        JournalCommand::Today => {
            println!("{}", heading(&format!("Today, {}", tracker.today())));
            print!("{}", format_entries(&tracker.today_entries().await?));
            if tracker.profile().cache_streak {
                print!("{}", format_streak(&tracker.streak().await?));
            }
        }
        JournalCommand::Show { days, last } => {
            let entries = match last {
                Some(count) => tracker.recent(count).await?,
                None => tracker.within_days(days).await?,
            };
            print!("{}", format_entries(&entries));
        }
        JournalCommand::Range {
            from,
            to,
            date_style,
        } => {
            let now = tracker.now();
            let range = parse_day_range(from.as_deref(), to.as_deref(), date_style, now)?;
            println!("{}", heading(&format!("{} to {}", range.from, range.to)));
            print!(
                "{}",
                format_entries(&tracker.query_range(range.from, range.to).await?)
            );
        }
        JournalCommand::Chart { from, to } => {
            let domain = match (from, to) {
                (None, None) => None,
                (from, to) => {
                    let profile = tracker.profile().hour_domain;
                    let domain = HourDomain::new(
                        from.unwrap_or(profile.start()),
                        to.unwrap_or(profile.end()),
                    )
                    .map_err(|e| {
                        Args::command().error(clap::error::ErrorKind::ValueValidation, e)
                    })?;
                    Some(domain)
                }
            };
            print!("{}", format_hour_chart(&tracker.hour_chart(domain).await?));
        }
        JournalCommand::Week => {
            print!("{}", format_days(&tracker.last_days(7).await?));
        }
        JournalCommand::Insights { by, window } => {
            let report = tracker.compute_insights(by, window).await?;
            print!("{}", format_report(&report));
        }
        JournalCommand::Stats => {
            print!("{}", format_stats(&tracker.stats().await?));
        }
        JournalCommand::Streak => {
            print!("{}", format_streak(&tracker.streak().await?));
        }
    }
    Ok(())
}
