// schedule.rs
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Calendario de ejecuciones por intervalo fijo de días.
///
/// Una fecha lógica `d` cubre el intervalo `[d, d + every)` y queda lista
/// para correr cuando ese intervalo ya cerró, es decir cuando
/// `d + every <= hoy`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub start: NaiveDate,
    pub every_days: u32,
}

impl Schedule {
    pub fn daily(start: NaiveDate) -> Self {
        Self { start,
               every_days: 1 }
    }

    fn interval(&self) -> Duration {
        Duration::days(i64::from(self.every_days.max(1)))
    }

    /// Fechas lógicas cuyo intervalo ya cerró a `until` (inclusive).
    pub fn logical_dates_until(&self, until: NaiveDate) -> Vec<NaiveDate> {
        let mut out = Vec::new();
        let mut d = self.start;
        while d + self.interval() <= until {
            out.push(d);
            d += self.interval();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn daily_due_dates_exclude_open_interval() {
        let s = Schedule::daily(date("2023-09-01"));
        assert!(s.logical_dates_until(date("2023-09-01")).is_empty());
        assert_eq!(s.logical_dates_until(date("2023-09-03")),
                   vec![date("2023-09-01"), date("2023-09-02")]);
    }

    #[test]
    fn due_dates_follow_the_interval() {
        let s = Schedule { start: date("2023-09-01"),
                           every_days: 2 };
        assert_eq!(s.logical_dates_until(date("2023-09-06")),
                   vec![date("2023-09-01"), date("2023-09-03")]);
    }
}
