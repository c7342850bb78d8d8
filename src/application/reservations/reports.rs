//! Read-only views: availability by type, per-room status, the front-desk
//! dashboard, guest history and room sales.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use tracing::debug;

use super::service::ReservationService;
use crate::application::availability::{self, RoomOccupancy};
use crate::domain::{DateRange, DomainResult, Reservation, ReservationStatus, Room, RoomType};
use crate::shared::errors::BookingError;
use crate::shared::time::nights_between;

/// Status shown for a room on a given date
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomStatus {
    Available,
    Booked,
    Cleaning,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Booked => "Booked",
            Self::Cleaning => "Cleaning",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoomStatusRow {
    pub room: Room,
    pub status: RoomStatus,
}

/// What the dashboard shows in a room's status column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardState {
    Occupied(ReservationStatus),
    Empty,
    Cleaning,
}

impl DashboardState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Occupied(status) => status.as_str(),
            Self::Empty => "Empty",
            Self::Cleaning => "Cleaning",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DashboardRow {
    pub room: Room,
    pub state: DashboardState,
    pub reservation: Option<Reservation>,
}

/// A guest's reservation joined with its room, which may have been deleted
#[derive(Debug, Clone)]
pub struct GuestReservation {
    pub reservation: Reservation,
    pub room: Option<Room>,
}

impl ReservationService {
    /// Room types with at least one free room for the stay.
    pub async fn available_types(
        &self,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<BTreeSet<RoomType>, BookingError> {
        let stay = DateRange::new(check_in, check_out).ok_or(BookingError::InvalidDateRange)?;
        let rooms = self.repos.rooms().find_all().await?;
        let reservations = self.repos.reservations().find_all().await?;
        Ok(availability::available_types(&rooms, &reservations, &stay))
    }

    /// Per-room status on `date`. A free room flagged for cleaning shows
    /// `Cleaning`.
    pub async fn room_status_list(&self, date: NaiveDate) -> DomainResult<Vec<RoomStatusRow>> {
        let rooms = self.repos.rooms().find_all().await?;
        let reservations = self.repos.reservations().find_all().await?;

        Ok(rooms
            .into_iter()
            .map(|room| {
                let status = match availability::status_of(&room.number, date, &reservations) {
                    RoomOccupancy::Booked => RoomStatus::Booked,
                    RoomOccupancy::Available if self.is_cleaning(&room.number) => {
                        RoomStatus::Cleaning
                    }
                    RoomOccupancy::Available => RoomStatus::Available,
                };
                RoomStatusRow { room, status }
            })
            .collect())
    }

    /// One row per room with the reservation covering `date`, if any. An
    /// active reservation wins over a checked-out one. Empty rooms flagged
    /// for cleaning show `Cleaning` only when `date` is today.
    pub async fn dashboard(&self, date: NaiveDate) -> DomainResult<Vec<DashboardRow>> {
        let rooms = self.repos.rooms().find_all().await?;
        let reservations = self.repos.reservations().find_all().await?;
        let today = self.clock.today();

        Ok(rooms
            .into_iter()
            .map(|room| {
                let covering = reservations
                    .iter()
                    .filter(|r| r.room_number == room.number && r.stay().contains(date));
                let reservation = covering
                    .clone()
                    .find(|r| !r.status.is_vacated())
                    .or_else(|| covering.clone().next())
                    .cloned();

                let state = match &reservation {
                    Some(r) => DashboardState::Occupied(r.status),
                    None if date == today && self.is_cleaning(&room.number) => {
                        DashboardState::Cleaning
                    }
                    None => DashboardState::Empty,
                };
                DashboardRow {
                    room,
                    state,
                    reservation,
                }
            })
            .collect())
    }

    /// All reservations under `guest_name`, each joined with its room.
    pub async fn reservations_by_guest(&self, guest_name: &str) -> DomainResult<Vec<GuestReservation>> {
        let guest_name = guest_name.trim();
        let rooms: HashMap<String, Room> = self
            .repos
            .rooms()
            .find_all()
            .await?
            .into_iter()
            .map(|r| (r.number.clone(), r))
            .collect();

        Ok(self
            .repos
            .reservations()
            .find_all()
            .await?
            .into_iter()
            .filter(|r| r.guest_name == guest_name)
            .map(|reservation| GuestReservation {
                room: rooms.get(&reservation.room_number).cloned(),
                reservation,
            })
            .collect())
    }

    /// Revenue per night over `[start, end]` (both inclusive). Each
    /// confirmed reservation contributes its room's nightly price for every
    /// night it occupies inside the range. Every date of the range is
    /// present, zero when nothing was sold. Totals saturate at `i64::MAX`.
    pub async fn room_sales(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, i64>, BookingError> {
        if start > end {
            return Err(BookingError::InvalidDateRange);
        }

        let prices: HashMap<String, i64> = self
            .repos
            .rooms()
            .find_all()
            .await?
            .into_iter()
            .map(|r| (r.number, r.price))
            .collect();

        let mut sales: BTreeMap<NaiveDate, i64> =
            start.iter_days().take_while(|d| *d <= end).map(|d| (d, 0)).collect();

        for reservation in self.repos.reservations().find_all().await? {
            if reservation.status != ReservationStatus::Confirmed {
                continue;
            }
            let Some(price) = prices.get(&reservation.room_number) else {
                debug!(
                    reservation_id = %reservation.id,
                    room_number = %reservation.room_number,
                    "Sales skip reservation of unknown room"
                );
                continue;
            };
            for night in nights_between(reservation.check_in, reservation.check_out) {
                if let Some(total) = sales.get_mut(&night) {
                    *total = total.saturating_add(*price);
                }
            }
        }

        Ok(sales)
    }
}
