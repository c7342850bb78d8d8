//! Stay pricing

use crate::domain::{DateRange, Room};

/// Default surcharge per guest above the room's capacity, per night.
pub const DEFAULT_EXTRA_PERSON_RATE: i64 = 20_000;

/// `(price + extra guests * rate) * nights`, with at least one night.
/// `None` when the total does not fit in an `i64`.
pub fn stay_total(
    room: &Room,
    stay: &DateRange,
    guest_count: u32,
    extra_person_rate: i64,
) -> Option<i64> {
    let extra_guests = i64::from(guest_count.saturating_sub(room.capacity));
    extra_guests
        .checked_mul(extra_person_rate)?
        .checked_add(room.price)?
        .checked_mul(stay.nights())
}
