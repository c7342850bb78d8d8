//! Room availability over snapshots of rooms and reservations.
//!
//! Pure functions: callers that act on the answer must hold the lifecycle
//! critical section between reading the snapshot and writing.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::domain::{DateRange, Reservation, Room, RoomType};

/// Occupancy of a room on one date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomOccupancy {
    Available,
    Booked,
}

impl RoomOccupancy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Booked => "Booked",
        }
    }
}

/// Whether `room_number` is free for the whole of `stay`. Checked-out
/// reservations never block.
pub fn is_room_available(room_number: &str, stay: &DateRange, reservations: &[Reservation]) -> bool {
    !reservations.iter().any(|r| r.blocks(room_number, stay))
}

/// Room types with at least one free room for `stay`, in ascending order.
pub fn available_types(
    rooms: &[Room],
    reservations: &[Reservation],
    stay: &DateRange,
) -> BTreeSet<RoomType> {
    rooms
        .iter()
        .filter(|room| is_room_available(&room.number, stay, reservations))
        .map(|room| room.room_type)
        .collect()
}

/// First room of `room_type`, in the given order, that is free for `stay`.
pub fn first_available_of_type<'a>(
    rooms: &'a [Room],
    room_type: RoomType,
    reservations: &[Reservation],
    stay: &DateRange,
) -> Option<&'a Room> {
    rooms
        .iter()
        .filter(|room| room.room_type == room_type)
        .find(|room| is_room_available(&room.number, stay, reservations))
}

/// Booked iff a non-vacated reservation of the room covers the night of
/// `date`. The check-out day is free.
pub fn status_of(room_number: &str, date: NaiveDate, reservations: &[Reservation]) -> RoomOccupancy {
    let booked = reservations.iter().any(|r| {
        r.room_number == room_number && !r.status.is_vacated() && r.stay().contains(date)
    });
    if booked {
        RoomOccupancy::Booked
    } else {
        RoomOccupancy::Available
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::time::{parse_date, parse_timestamp};

    fn range(a: &str, b: &str) -> DateRange {
        DateRange::new(parse_date(a).unwrap(), parse_date(b).unwrap()).unwrap()
    }

    fn booking(room: &str, a: &str, b: &str) -> Reservation {
        Reservation::new(
            format!("R-{}-{}", room, a),
            room,
            "Kim",
            range(a, b),
            2,
            "010",
            parse_timestamp("2025-01-01 09:00:00").unwrap(),
            "",
        )
    }

    fn rooms() -> Vec<Room> {
        vec![
            Room::new("101", RoomType::Standard, 100_000, 2, ""),
            Room::new("102", RoomType::Standard, 100_000, 2, ""),
            Room::new("201", RoomType::Deluxe, 180_000, 3, ""),
        ]
    }

    #[test]
    fn overlapping_stay_is_unavailable() {
        let existing = vec![booking("101", "2025-01-10", "2025-01-12")];
        assert!(!is_room_available("101", &range("2025-01-11", "2025-01-13"), &existing));
        assert!(!is_room_available("101", &range("2025-01-09", "2025-01-11"), &existing));
        assert!(is_room_available("102", &range("2025-01-11", "2025-01-13"), &existing));
    }

    #[test]
    fn back_to_back_stays_are_available() {
        let existing = vec![booking("101", "2025-01-10", "2025-01-12")];
        assert!(is_room_available("101", &range("2025-01-12", "2025-01-14"), &existing));
        assert!(is_room_available("101", &range("2025-01-08", "2025-01-10"), &existing));
    }

    #[test]
    fn checked_out_reservation_frees_the_room() {
        let mut r = booking("101", "2025-01-10", "2025-01-12");
        r.check_out();
        assert!(is_room_available("101", &range("2025-01-10", "2025-01-12"), &[r]));
    }

    #[test]
    fn order_of_non_overlapping_bookings_does_not_matter() {
        let a = booking("101", "2025-01-10", "2025-01-12");
        let b = booking("101", "2025-01-12", "2025-01-15");
        assert_eq!(
            is_room_available("101", &b.stay(), std::slice::from_ref(&a)),
            is_room_available("101", &a.stay(), std::slice::from_ref(&b)),
        );
    }

    #[test]
    fn lists_types_with_a_free_room() {
        let stay = range("2025-01-10", "2025-01-11");
        let existing = vec![booking("201", "2025-01-09", "2025-01-12")];
        let types: Vec<_> = available_types(&rooms(), &existing, &stay).into_iter().collect();
        assert_eq!(types, vec![RoomType::Standard]);

        let existing = vec![
            booking("101", "2025-01-09", "2025-01-12"),
            booking("102", "2025-01-10", "2025-01-11"),
        ];
        let types: Vec<_> = available_types(&rooms(), &existing, &stay).into_iter().collect();
        assert_eq!(types, vec![RoomType::Deluxe]);
    }

    #[test]
    fn picks_first_free_room_of_type() {
        let rooms = rooms();
        let stay = range("2025-01-10", "2025-01-11");
        let existing = vec![booking("101", "2025-01-10", "2025-01-11")];
        let room = first_available_of_type(&rooms, RoomType::Standard, &existing, &stay).unwrap();
        assert_eq!(room.number, "102");
        assert!(first_available_of_type(&rooms, RoomType::Suite, &existing, &stay).is_none());
    }

    #[test]
    fn check_out_day_shows_available() {
        let existing = vec![booking("101", "2025-01-10", "2025-01-12")];
        let d = |s| parse_date(s).unwrap();
        assert_eq!(status_of("101", d("2025-01-10"), &existing), RoomOccupancy::Booked);
        assert_eq!(status_of("101", d("2025-01-11"), &existing), RoomOccupancy::Booked);
        assert_eq!(status_of("101", d("2025-01-12"), &existing), RoomOccupancy::Available);
        assert_eq!(status_of("102", d("2025-01-10"), &existing), RoomOccupancy::Available);
    }
}
