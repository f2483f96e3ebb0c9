use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 3_600;

/// Hours, minutes and seconds of a running timer.
///
/// Minutes and seconds stay in `0..=59` after every [`ClockTime::normalize`].
/// Hours are unbounded; a negative hour count marks an expired countdown.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ClockTime {
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl ClockTime {
    pub const ZERO: ClockTime = ClockTime {
        hours: 0,
        minutes: 0,
        seconds: 0,
    };

    pub fn new(hours: i64, minutes: i64, seconds: i64) -> Self {
        Self {
            hours,
            minutes,
            seconds,
        }
    }

    /// Adds `delta_seconds` and folds the result back into base 60.
    ///
    /// Borrowing uses floor division, so `00:01:00 - 1` is `00:00:59` and
    /// `00:00:00 - 1` lands on hour `-1` instead of wrapping around.
    /// The seconds total saturates at the `i64` limits; parsed times are
    /// rejected well before that, so only runaway increments can reach it.
    pub fn normalize(self, delta_seconds: i64) -> Self {
        let total = self
            .hours
            .saturating_mul(SECONDS_PER_HOUR)
            .saturating_add(self.minutes.saturating_mul(SECONDS_PER_MINUTE))
            .saturating_add(self.seconds)
            .saturating_add(delta_seconds);
        Self {
            hours: total.div_euclid(SECONDS_PER_HOUR),
            minutes: total.rem_euclid(SECONDS_PER_HOUR) / SECONDS_PER_MINUTE,
            seconds: total.rem_euclid(SECONDS_PER_MINUTE),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.hours < 0
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hours, self.minutes, self.seconds
        )
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ParseTimeError {
    #[error("expected HH:MM:SS, found {found} field(s)")]
    FieldCount { found: usize },
    #[error("{field} field is empty")]
    EmptyField { field: &'static str },
    #[error("{field} field '{value}' is not an unsigned number")]
    InvalidField { field: &'static str, value: String },
    #[error("{field} field is too large")]
    OutOfRange { field: &'static str },
}

impl FromStr for ClockTime {
    type Err = ParseTimeError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let fields = input.split(':').collect::<Vec<_>>();
        let [hours, minutes, seconds] = fields.as_slice() else {
            return Err(ParseTimeError::FieldCount {
                found: fields.len(),
            });
        };

        let total = [
            ("hours", *hours, SECONDS_PER_HOUR),
            ("minutes", *minutes, SECONDS_PER_MINUTE),
            ("seconds", *seconds, 1),
        ]
        .into_iter()
        .try_fold(0_i64, |total, (field, value, scale)| {
            parse_field(field, value)?
                .checked_mul(scale)
                .and_then(|secs| total.checked_add(secs))
                .ok_or(ParseTimeError::OutOfRange { field })
        })?;
        Ok(ClockTime::ZERO.normalize(total))
    }
}

fn parse_field(field: &'static str, value: &str) -> Result<i64, ParseTimeError> {
    if value.is_empty() {
        return Err(ParseTimeError::EmptyField { field });
    }
    // `i64::from_str` would accept a leading sign, which the timer never takes.
    if !value.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(ParseTimeError::InvalidField {
            field,
            value: value.to_string(),
        });
    }
    // All digits, so the only way left to fail is overflow.
    value
        .parse::<i64>()
        .map_err(|_| ParseTimeError::OutOfRange { field })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(hours: i64, minutes: i64, seconds: i64) -> ClockTime {
        ClockTime::new(hours, minutes, seconds)
    }

    #[test]
    fn zero_delta_is_identity() {
        for value in [time(0, 0, 0), time(1, 59, 59), time(27, 3, 0)] {
            assert_eq!(value.normalize(0), value);
        }
    }

    #[test]
    fn normalize_round_trips_for_any_delta() {
        let samples = [time(0, 0, 0), time(0, 1, 0), time(3, 59, 59), time(100, 0, 1)];
        let deltas = [-7_201, -3_600, -61, -1, 1, 59, 60, 3_599, 86_400];
        for value in samples {
            for delta in deltas {
                assert_eq!(
                    value.normalize(delta).normalize(-delta),
                    value,
                    "{value} with delta {delta}"
                );
            }
        }
    }

    #[test]
    fn decrement_from_zero_expires_instead_of_wrapping() {
        let next = ClockTime::ZERO.normalize(-1);
        assert_eq!(next.hours, -1);
        assert!(next.is_expired());
        assert!(!ClockTime::ZERO.is_expired());
    }

    #[test]
    fn borrows_and_carries_across_minute_boundary() {
        assert_eq!(time(0, 1, 0).normalize(-1), time(0, 0, 59));
        assert_eq!(time(0, 0, 59).normalize(1), time(0, 1, 0));
        assert_eq!(time(1, 0, 0).normalize(-1), time(0, 59, 59));
        assert_eq!(time(0, 59, 59).normalize(1), time(1, 0, 0));
    }

    #[test]
    fn large_increment_carries_into_hours() {
        assert_eq!(time(0, 0, 5).normalize(3_600 + 120), time(1, 2, 5));
    }

    #[test]
    fn parses_well_formed_time() {
        assert_eq!("01:02:03".parse::<ClockTime>(), Ok(time(1, 2, 3)));
        assert_eq!("00:00:00".parse::<ClockTime>(), Ok(ClockTime::ZERO));
        assert_eq!("120:0:7".parse::<ClockTime>(), Ok(time(120, 0, 7)));
    }

    #[test]
    fn out_of_range_minutes_and_seconds_are_folded() {
        assert_eq!("00:00:90".parse::<ClockTime>(), Ok(time(0, 1, 30)));
        assert_eq!("00:75:00".parse::<ClockTime>(), Ok(time(1, 15, 0)));
    }

    #[test]
    fn oversized_fields_are_rejected_instead_of_clamped() {
        assert_eq!(
            "3000000000000000:00:00".parse::<ClockTime>(),
            Err(ParseTimeError::OutOfRange { field: "hours" })
        );
        assert_eq!(
            "99999999999999999999:00:00".parse::<ClockTime>(),
            Err(ParseTimeError::OutOfRange { field: "hours" })
        );
        assert_eq!(
            "2562047788015215:30:08".parse::<ClockTime>(),
            Err(ParseTimeError::OutOfRange { field: "seconds" })
        );

        let largest = "2562047788015215:30:07".parse::<ClockTime>();
        assert_eq!(largest, Ok(time(2_562_047_788_015_215, 30, 7)));
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert_eq!(
            "1:2".parse::<ClockTime>(),
            Err(ParseTimeError::FieldCount { found: 2 })
        );
        assert_eq!(
            "1:2:3:4".parse::<ClockTime>(),
            Err(ParseTimeError::FieldCount { found: 4 })
        );
    }

    #[test]
    fn rejects_non_numeric_and_signed_fields() {
        assert!(matches!(
            "a:b:c".parse::<ClockTime>(),
            Err(ParseTimeError::InvalidField { field: "hours", .. })
        ));
        assert!(matches!(
            "-1:0:0".parse::<ClockTime>(),
            Err(ParseTimeError::InvalidField { field: "hours", .. })
        ));
        assert!(matches!(
            "00:00:05s".parse::<ClockTime>(),
            Err(ParseTimeError::InvalidField { field: "seconds", .. })
        ));
        assert!(matches!(
            "00::05".parse::<ClockTime>(),
            Err(ParseTimeError::EmptyField { field: "minutes" })
        ));
    }

    #[test]
    fn displays_two_digit_fields() {
        assert_eq!(time(1, 2, 3).to_string(), "01:02:03");
    }
}
