pub mod dates;
pub mod journal;
pub mod output;

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use journal::{process_journal_command, JournalCommand};
use tokio::io::AsyncReadExt;
use tracing::{debug, level_filters::LevelFilter};

use crate::{
    analysis::streak::{compute_streak, ActivityDateSource, DateLinesSource},
    tracker::{Tracker, TrackerKind},
    utils::{
        clock::{local_today, Clock, DefaultClock, FixedClock},
        dir::{create_application_default_path, ensure_dir},
        logging::{enable_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "daystreak", version, long_about = None)]
#[command(about = "Mood, energy, gratitude and habit journals with streaks and trends", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, global = true, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        help = "Act as if today was this day (YYYY-MM-DD). Logged entries are stamped at noon"
    )]
    as_of: Option<NaiveDate>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Daily mood, levels 1-5, one entry per day")]
    Mood {
        #[command(subcommand)]
        command: JournalCommand,
    },
    #[command(about = "Energy levels 1-5 throughout the day")]
    Energy {
        #[command(subcommand)]
        command: JournalCommand,
    },
    #[command(about = "Things you are grateful for")]
    Gratitude {
        #[command(subcommand)]
        command: JournalCommand,
    },
    #[command(about = "Daily habit check, done or skip")]
    Habit {
        #[command(subcommand)]
        command: JournalCommand,
    },
    #[command(about = "Streak over a list of days, e.g. git log --date=short --pretty=%ad")]
    Streak {
        #[arg(long, help = "File with one YYYY-MM-DD per line, - reads stdin")]
        dates: String,
    },
}

pub async fn run_cli(args: Args) -> Result<()> {
    let dir = match args.dir {
        Some(dir) => ensure_dir(dir)?,
        None => create_application_default_path()?,
    };

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &dir, logging_level, args.log)?;
    debug!("Using {dir:?}");

    let clock = create_clock(args.as_of)?;

    let (kind, command) = match args.commands {
        Commands::Mood { command } => (TrackerKind::Mood, command),
        Commands::Energy { command } => (TrackerKind::Energy, command),
        Commands::Gratitude { command } => (TrackerKind::Gratitude, command),
        Commands::Habit { command } => (TrackerKind::Habit, command),
        Commands::Streak { dates } => return process_streak_command(&dates, clock.as_ref()).await,
    };
    process_journal_command(Tracker::open(&dir, kind, clock), command).await
}

fn create_clock(as_of: Option<NaiveDate>) -> Result<Box<dyn Clock>> {
    let Some(day) = as_of else {
        return Ok(Box::new(DefaultClock));
    };
    let offset = DefaultClock.offset();
    let time = day
        .and_hms_opt(12, 0, 0)
        .and_then(|v| v.and_local_timezone(offset).single())
        .ok_or_else(|| anyhow!("Can't represent noon of {day}"))?;
    Ok(Box::new(FixedClock::new(time.to_utc(), offset)))
}

async fn process_streak_command(dates: &str, clock: &dyn Clock) -> Result<()> {
    let text = if dates == "-" {
        let mut text = String::new();
        tokio::io::stdin().read_to_string(&mut text).await?;
        text
    } else {
        tokio::fs::read_to_string(dates).await?
    };

    let active = DateLinesSource::new(text).active_dates()?;
    debug!("Read {} distinct days", active.len());
    let streak = compute_streak(&active, local_today(clock));
    print!("{}", output::format_streak(&streak));
    Ok(())
}
