use std::collections::BTreeSet;

use tracing::trace;

use crate::{
    journal::{
        entities::{Entry, Journal},
        error::{JournalError, ValidationError},
    },
    utils::time::{days_between, parse_date_key, DateKey},
};

/// Distinct days on which something qualifying happened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveDateSet(BTreeSet<DateKey>);

impl ActiveDateSet {
    /// Days of all active entries.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a Entry>) -> Self {
        Self::from_entries_where(entries, |_| true)
    }

    /// Days of active entries that also satisfy `predicate`, e.g. "good" mood days.
    pub fn from_entries_where<'a>(
        entries: impl IntoIterator<Item = &'a Entry>,
        predicate: impl Fn(&Entry) -> bool,
    ) -> Self {
        entries
            .into_iter()
            .filter(|v| v.is_active() && predicate(v))
            .map(|v| v.date())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, date: DateKey) -> bool {
        self.0.contains(&date)
    }

    pub fn most_recent(&self) -> Option<DateKey> {
        self.0.last().copied()
    }

    /// Newest day first.
    pub fn descending(&self) -> impl Iterator<Item = DateKey> + '_ {
        self.0.iter().rev().copied()
    }
}

impl FromIterator<DateKey> for ActiveDateSet {
    fn from_iter<T: IntoIterator<Item = DateKey>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Consecutive-day streaks derived from an [ActiveDateSet]. Always recomputed, never stored as
/// truth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreakState {
    /// Run of consecutive days ending today or yesterday. Zero once a full day was missed.
    pub current: u32,
    /// Longest run anywhere in the history.
    pub longest: u32,
    pub last_active: Option<DateKey>,
}

impl StreakState {
    pub fn is_active(&self) -> bool {
        self.current > 0
    }
}

/// Computes current and longest streaks as seen on `today`.
pub fn compute_streak(dates: &ActiveDateSet, today: DateKey) -> StreakState {
    let Some(most_recent) = dates.most_recent() else {
        return StreakState::default();
    };

    let descending = dates.descending().collect::<Vec<_>>();
    let consecutive = |pair: &[DateKey]| days_between(pair[1], pair[0]) == 1;

    let is_active = most_recent == today || days_between(most_recent, today) == 1;
    let current = if is_active {
        1 + descending
            .windows(2)
            .take_while(|pair| consecutive(pair))
            .count() as u32
    } else {
        0
    };

    let mut longest = 1u32;
    let mut run = 1u32;
    for pair in descending.windows(2) {
        if consecutive(pair) {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 1;
        }
    }

    trace!("Streak as of {today}: current {current}, longest {longest}");
    StreakState {
        current,
        longest,
        last_active: Some(most_recent),
    }
}

/// Anything that can tell on which days there was activity: a journal, a list of commit dates.
pub trait ActivityDateSource {
    fn active_dates(&self) -> Result<ActiveDateSet, JournalError>;
}

impl ActivityDateSource for Journal {
    fn active_dates(&self) -> Result<ActiveDateSet, JournalError> {
        Ok(ActiveDateSet::from_entries(self.entries()))
    }
}

/// Activity dates given as text, one `YYYY-MM-DD` per line, as printed by
/// `git log --date=short --pretty=%ad`. Full timestamps are cut down to their date.
#[derive(Debug, Clone)]
pub struct DateLinesSource {
    text: String,
}

impl DateLinesSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl ActivityDateSource for DateLinesSource {
    fn active_dates(&self) -> Result<ActiveDateSet, JournalError> {
        self.text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                let split = line.char_indices().nth(10).map_or(line.len(), |(i, _)| i);
                let (day, rest) = line.split_at(split);
                let date_only = rest.is_empty() || rest.starts_with(|c: char| c == 'T' || c == ' ');
                parse_date_key(day)
                    .filter(|_| date_only)
                    .ok_or_else(|| {
                        JournalError::from(ValidationError::InvalidDate(line.to_string()))
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, FixedOffset, NaiveDate, TimeZone, Utc};

    use crate::journal::{
        entities::{AppendPolicy, Entry, EntryValue, Journal, Level},
        error::JournalError,
    };

    use super::{compute_streak, ActiveDateSet, ActivityDateSource, DateLinesSource, StreakState};

    const TODAY: NaiveDate = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();

    fn days_ago(days: &[i64]) -> ActiveDateSet {
        days.iter().map(|v| TODAY - Duration::days(*v)).collect()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    #[test]
    fn test_empty_set() {
        assert_eq!(
            compute_streak(&ActiveDateSet::default(), TODAY),
            StreakState::default()
        );
        let state = compute_streak(&ActiveDateSet::default(), TODAY);
        assert_eq!((state.current, state.longest), (0, 0));
    }

    #[test]
    fn test_consecutive_run_ending_today() {
        for size in 1..10 {
            let set = days_ago(&(0..size).collect::<Vec<_>>());
            let state = compute_streak(&set, TODAY);
            assert_eq!(state.current as i64, size);
            assert_eq!(state.longest as i64, size);
        }
    }

    #[test]
    fn test_three_days_in_a_row() {
        let set = [date(1), date(2), date(3)].into_iter().collect();
        let state = compute_streak(&set, TODAY);
        assert_eq!((state.current, state.longest), (3, 3));
        assert_eq!(state.last_active, Some(TODAY));
    }

    #[test]
    fn test_gap_before_today() {
        let set = [date(1), date(3)].into_iter().collect();
        let state = compute_streak(&set, TODAY);
        assert_eq!((state.current, state.longest), (1, 1));
    }

    #[test]
    fn test_yesterday_keeps_streak_alive() {
        let state = compute_streak(&days_ago(&[1, 2, 3]), TODAY);
        assert_eq!((state.current, state.longest), (3, 3));
        assert!(state.is_active());
    }

    #[test]
    fn test_two_day_gap_resets_current_only() {
        // Five day run that ended two days ago
        let state = compute_streak(&days_ago(&[2, 3, 4, 5, 6]), TODAY);
        assert_eq!(state.current, 0);
        assert_eq!(state.longest, 5);
    }

    #[test]
    fn test_longest_from_history() {
        let state = compute_streak(&days_ago(&[0, 1, 5, 6, 7, 8, 12]), TODAY);
        assert_eq!(state.current, 2);
        assert_eq!(state.longest, 4);
    }

    #[test]
    fn test_single_old_date() {
        let state = compute_streak(&days_ago(&[10]), TODAY);
        assert_eq!((state.current, state.longest), (0, 1));
        assert!(!state.is_active());
    }

    #[test]
    fn test_future_dates_break_activity() {
        let set = [TODAY + Duration::days(1)].into_iter().collect();
        let state = compute_streak(&set, TODAY);
        assert_eq!((state.current, state.longest), (0, 1));
    }

    #[test]
    fn test_duplicates_collapse() {
        let set = [date(3), date(3), date(2), date(2)]
            .into_iter()
            .collect::<ActiveDateSet>();
        assert_eq!(set.len(), 2);
        assert_eq!(set.descending().collect::<Vec<_>>(), vec![date(3), date(2)]);
    }

    #[test]
    fn test_journal_source_ignores_inactive_entries() {
        let offset = FixedOffset::east_opt(0).unwrap();
        let habit = |day: u32, done: bool| {
            Entry::new(
                EntryValue::Completion(done),
                "",
                Utc.with_ymd_and_hms(2024, 6, day, 9, 0, 0).unwrap(),
                &offset,
            )
        };
        let journal = Journal::default()
            .append(habit(1, true), AppendPolicy::ReplaceSameDay)
            .append(habit(2, false), AppendPolicy::ReplaceSameDay)
            .append(habit(3, true), AppendPolicy::ReplaceSameDay);

        let set = journal.active_dates().unwrap();
        assert_eq!(set.len(), 2);
        assert!(!set.contains(date(2)));
        assert_eq!(compute_streak(&set, TODAY).current, 1);
    }

    #[test]
    fn test_predicate_runs() {
        let offset = FixedOffset::east_opt(0).unwrap();
        let entries = [5i64, 4, 2, 4, 5]
            .into_iter()
            .zip(1..)
            .map(|(level, day)| {
                Entry::new(
                    EntryValue::Level(Level::try_from(level).unwrap()),
                    "",
                    Utc.with_ymd_and_hms(2024, 6, day, 9, 0, 0).unwrap(),
                    &offset,
                )
            })
            .collect::<Vec<_>>();

        let good = ActiveDateSet::from_entries_where(&entries, |v| {
            v.level().is_some_and(|l| *l >= 4)
        });
        assert_eq!(good.len(), 4);

        let state = compute_streak(&good, date(5));
        assert_eq!((state.current, state.longest), (2, 2));
        assert_eq!(compute_streak(&ActiveDateSet::from_entries(&entries), date(5)).current, 5);
    }

    #[test]
    fn test_date_lines_source() {
        let source = DateLinesSource::new(
            "2024-06-03\n2024-06-03\n\n 2024-06-02 \n2024-06-01T23:10:00+02:00\n",
        );
        let set = source.active_dates().unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(compute_streak(&set, TODAY).current, 3);
    }

    #[test]
    fn test_date_lines_source_rejects_garbage() {
        let source = DateLinesSource::new("2024-06-03\nyesterday\n");
        assert!(matches!(
            source.active_dates(),
            Err(JournalError::Validation(_))
        ));
        assert!(DateLinesSource::new("2024-06-03junk").active_dates().is_err());
    }
}
