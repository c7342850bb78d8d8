//! Reservation domain entity

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::shared::time::{format_timestamp, parse_timestamp};

/// Hour of creation from which the payment deadline moves to the next day.
const LATE_BOOKING_HOUR: u32 = 17;

/// Unpaid reservations must be paid by this time of day.
const PAYMENT_DEADLINE: (u32, u32, u32) = (18, 0, 0);

/// Reservation status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationStatus {
    /// Holds the room provisionally until the payment deadline
    Unpaid,
    /// Paid; holds the room
    Confirmed,
    /// Guest is in the room
    CheckedIn,
    /// Guest left; the room is free whatever the stored dates say
    CheckedOut,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "Unpaid",
            Self::Confirmed => "Confirmed",
            Self::CheckedIn => "CheckedIn",
            Self::CheckedOut => "CheckedOut",
        }
    }

    /// Whether the reservation no longer occupies its room.
    pub fn is_vacated(&self) -> bool {
        *self == Self::CheckedOut
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Unpaid" => Ok(Self::Unpaid),
            "Confirmed" => Ok(Self::Confirmed),
            "CheckedIn" => Ok(Self::CheckedIn),
            "CheckedOut" => Ok(Self::CheckedOut),
            other => Err(format!("unknown reservation status '{}'", other)),
        }
    }
}

/// Half-open stay `[start, end)`: the night of `end` is not occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// `None` unless `start < end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    /// Billable nights, never less than one.
    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days().max(1)
    }
}

/// Room reservation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    /// Server-generated reservation ID
    pub id: String,
    pub room_number: String,
    pub guest_name: String,
    pub check_in: NaiveDate,
    /// Exclusive
    pub check_out: NaiveDate,
    pub guest_count: u32,
    pub phone: String,
    pub status: ReservationStatus,
    /// Creation timestamp as persisted (`yyyy-MM-dd HH:mm:ss`). Kept verbatim
    /// so a damaged value never prevents the record from loading.
    pub created_at: String,
    /// Free-text guest request, never contains line breaks
    pub request: String,
}

impl Reservation {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        room_number: impl Into<String>,
        guest_name: impl Into<String>,
        stay: DateRange,
        guest_count: u32,
        phone: impl Into<String>,
        created_at: NaiveDateTime,
        request: &str,
    ) -> Self {
        Self {
            id: id.into(),
            room_number: room_number.into(),
            guest_name: guest_name.into(),
            check_in: stay.start,
            check_out: stay.end,
            guest_count,
            phone: phone.into(),
            status: ReservationStatus::Unpaid,
            created_at: format_timestamp(created_at),
            request: normalize_request(request),
        }
    }

    pub fn stay(&self) -> DateRange {
        DateRange {
            start: self.check_in,
            end: self.check_out,
        }
    }

    /// Payment recorded
    pub fn confirm(&mut self) {
        self.status = ReservationStatus::Confirmed;
    }

    /// Guest arrived
    pub fn check_in(&mut self) {
        self.status = ReservationStatus::CheckedIn;
    }

    /// Guest departed
    pub fn check_out(&mut self) {
        self.status = ReservationStatus::CheckedOut;
    }

    pub fn set_request(&mut self, text: &str) {
        self.request = normalize_request(text);
    }

    /// Whether this reservation still blocks its room on the given stay.
    pub fn blocks(&self, room_number: &str, stay: &DateRange) -> bool {
        self.room_number == room_number && !self.status.is_vacated() && self.stay().overlaps(stay)
    }

    pub fn created_at_time(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.created_at)
    }

    /// Latest moment an unpaid reservation may stay on the books: 18:00 the
    /// same day when created before 17:00, otherwise 18:00 the next day.
    /// `None` when the creation timestamp cannot be parsed.
    pub fn payment_deadline(&self) -> Option<NaiveDateTime> {
        let created = self.created_at_time()?;
        let day = if created.hour() < LATE_BOOKING_HOUR {
            created.date()
        } else {
            created.date() + Duration::days(1)
        };
        let (h, m, s) = PAYMENT_DEADLINE;
        Some(day.and_time(NaiveTime::from_hms_opt(h, m, s)?))
    }
}

/// Requests are stored in a line-oriented record: every line break becomes
/// a single space.
pub fn normalize_request(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\r', '\n'], " ")
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::time::parse_date;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn range(a: &str, b: &str) -> DateRange {
        DateRange::new(date(a), date(b)).unwrap()
    }

    fn created(ts: &str) -> Reservation {
        let mut r = Reservation::new(
            "R-1",
            "101",
            "Kim",
            range("2025-01-10", "2025-01-12"),
            2,
            "010-1234-5678",
            parse_timestamp("2025-01-01 00:00:00").unwrap(),
            "",
        );
        r.created_at = ts.to_string();
        r
    }

    #[test]
    fn new_reservation_is_unpaid() {
        let r = created("2025-01-10 16:00:00");
        assert_eq!(r.status, ReservationStatus::Unpaid);
        assert_eq!(r.stay().nights(), 2);
    }

    #[test]
    fn lifecycle_transitions() {
        let mut r = created("2025-01-10 16:00:00");
        r.confirm();
        assert_eq!(r.status, ReservationStatus::Confirmed);
        r.check_in();
        assert_eq!(r.status, ReservationStatus::CheckedIn);
        r.check_out();
        assert!(r.status.is_vacated());
    }

    #[test]
    fn date_range_rejects_empty_and_inverted() {
        assert!(DateRange::new(date("2025-01-10"), date("2025-01-10")).is_none());
        assert!(DateRange::new(date("2025-01-11"), date("2025-01-10")).is_none());
    }

    #[test]
    fn check_out_day_does_not_overlap() {
        let first = range("2025-01-10", "2025-01-12");
        let next = range("2025-01-12", "2025-01-14");
        assert!(!first.overlaps(&next));
        assert!(!next.overlaps(&first));
        assert!(first.overlaps(&range("2025-01-11", "2025-01-13")));
        assert!(first.overlaps(&range("2025-01-09", "2025-01-15")));
        assert!(!first.contains(date("2025-01-12")));
        assert!(first.contains(date("2025-01-10")));
    }

    #[test]
    fn checked_out_reservations_do_not_block() {
        let mut r = created("2025-01-10 16:00:00");
        let stay = range("2025-01-11", "2025-01-12");
        assert!(r.blocks("101", &stay));
        assert!(!r.blocks("102", &stay));
        r.check_out();
        assert!(!r.blocks("101", &stay));
    }

    #[test]
    fn deadline_same_day_before_five_pm() {
        let r = created("2025-01-10 16:59:59");
        assert_eq!(
            r.payment_deadline(),
            parse_timestamp("2025-01-10 18:00:00")
        );
    }

    #[test]
    fn deadline_next_day_from_five_pm() {
        let r = created("2025-01-10 17:00:00");
        assert_eq!(
            r.payment_deadline(),
            parse_timestamp("2025-01-11 18:00:00")
        );
    }

    #[test]
    fn unparseable_created_at_has_no_deadline() {
        let r = created("yesterday afternoon");
        assert!(r.payment_deadline().is_none());
    }

    #[test]
    fn request_line_breaks_become_spaces() {
        let mut r = created("2025-01-10 16:00:00");
        r.set_request("late arrival\r\nextra pillow\nno smoking\rthanks");
        assert_eq!(r.request, "late arrival extra pillow no smoking thanks");
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert_eq!(
            "Confirmed".parse::<ReservationStatus>(),
            Ok(ReservationStatus::Confirmed)
        );
        assert!("Cancelled".parse::<ReservationStatus>().is_err());
    }
}
