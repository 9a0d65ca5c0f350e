use crate::domain::models::weekday_from_sunday_index;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

/// Longest DST gap we step over when local midnight does not exist.
const MAX_GAP_MINUTES: i64 = 180;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl DayWindow {
    /// Whether `instant` falls in `[start, end)`.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start.with_timezone(&Utc) && instant < self.end.with_timezone(&Utc)
    }
}

/// Local midnight of every weekday in the week containing "today".
///
/// Index 0 is Sunday. The week is anchored on today's date, so Sunday can be
/// in the past and Saturday in the future depending on the current weekday.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekdayDateMap {
    time_zone: Tz,
    anchors: [DateTime<Tz>; 7],
}

impl WeekdayDateMap {
    pub fn current_week(now: DateTime<Utc>, time_zone: Tz) -> Self {
        let today = now.with_timezone(&time_zone).date_naive();
        let today_index = i64::from(today.weekday().num_days_from_sunday());

        let anchors = std::array::from_fn(|index| {
            let offset = index as i64 - today_index;
            local_midnight(today + Duration::days(offset), time_zone)
        });

        Self { time_zone, anchors }
    }

    pub fn anchor(&self, weekday: Weekday) -> DateTime<Tz> {
        self.anchors[weekday.num_days_from_sunday() as usize]
    }

    /// Fetch window for one day: its midnight up to the next calendar day's midnight.
    pub fn day_window(&self, weekday: Weekday) -> DayWindow {
        let start = self.anchor(weekday);
        let next_date = start.date_naive() + Duration::days(1);
        DayWindow {
            start,
            end: local_midnight(next_date, self.time_zone),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Weekday, DateTime<Tz>)> + '_ {
        self.anchors
            .iter()
            .enumerate()
            .map(|(index, anchor)| (weekday_from_sunday_index(index), *anchor))
    }
}

/// Earliest instant of `date` in `time_zone`.
pub fn local_midnight(date: NaiveDate, time_zone: Tz) -> DateTime<Tz> {
    let midnight = date.and_time(NaiveTime::MIN);
    (0..=MAX_GAP_MINUTES)
        .find_map(|minutes| {
            time_zone
                .from_local_datetime(&(midnight + Duration::minutes(minutes)))
                .earliest()
        })
        .unwrap_or_else(|| time_zone.from_utc_datetime(&midnight))
}
