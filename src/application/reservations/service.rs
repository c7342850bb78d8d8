//! Reservation lifecycle service
//!
//! Owns every state change of reservations, payments and rooms. Mutating
//! operations and any read that gates a write run under one process-wide
//! critical section, so availability-check-then-create is atomic across all
//! connections and the expiry sweep.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use dashmap::DashSet;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::pricing::{stay_total, DEFAULT_EXTRA_PERSON_RATE};
use crate::application::availability::{first_available_of_type, is_room_available};
use crate::domain::payment::is_stored_card_method;
use crate::domain::{
    CardDetails, DateRange, DomainError, DomainResult, Payment, RepositoryProvider, Reservation,
    ReservationStatus, Room, RoomType,
};
use crate::shared::errors::BookingError;
use crate::shared::time::{Clock, SystemClock};

/// Method recorded for the card entered with `PAY_AND_RESERVE`.
pub const CARD_PAYMENT_METHOD: &str = "CreditCard";

/// Guest-supplied part of a booking
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub guest_name: String,
    pub phone: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guest_count: u32,
    pub note: String,
}

impl BookingRequest {
    fn validate(&self) -> Result<DateRange, BookingError> {
        check_text_field("GuestName", &self.guest_name)?;
        check_text_field("Phone", &self.phone)?;
        if self.guest_count == 0 {
            return Err(BookingError::InvalidField {
                field: "Guests",
                reason: "at least one guest is required".into(),
            });
        }
        DateRange::new(self.check_in, self.check_out).ok_or(BookingError::InvalidDateRange)
    }
}

/// Outcome of a paid booking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaidBooking {
    pub reservation_id: String,
    pub room_number: String,
    pub amount: i64,
}

/// Outcome of one expiry sweep
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExpirySweep {
    pub expired: Vec<String>,
    pub skipped: usize,
}

pub struct ReservationService {
    pub(super) repos: Arc<dyn RepositoryProvider>,
    pub(super) clock: Arc<dyn Clock>,
    critical: Mutex<()>,
    pub(super) cleaning: DashSet<String>,
    extra_person_rate: i64,
}

impl ReservationService {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self::with_clock(repos, Arc::new(SystemClock))
    }

    pub fn with_clock(repos: Arc<dyn RepositoryProvider>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repos,
            clock,
            critical: Mutex::new(()),
            cleaning: DashSet::new(),
            extra_person_rate: DEFAULT_EXTRA_PERSON_RATE,
        }
    }

    pub fn with_extra_person_rate(mut self, rate: i64) -> Self {
        self.extra_person_rate = rate;
        self
    }

    pub fn repos(&self) -> &Arc<dyn RepositoryProvider> {
        &self.repos
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    // ── Booking ─────────────────────────────────────────────────

    /// Book a specific room. The reservation starts `Unpaid`.
    pub async fn create_by_room_number(
        &self,
        room_number: &str,
        request: &BookingRequest,
    ) -> Result<Reservation, BookingError> {
        let stay = request.validate()?;
        let _guard = self.critical.lock().await;

        let room = self
            .repos
            .rooms()
            .find_by_number(room_number)
            .await?
            .ok_or_else(|| BookingError::NoSuchRoom(room_number.to_string()))?;

        let existing = self.repos.reservations().find_all().await?;
        if !is_room_available(&room.number, &stay, &existing) {
            debug!(room_number, "Room not available for requested stay");
            return Err(BookingError::RoomNotAvailable);
        }

        let reservation = self.new_reservation(&room, stay, request, &existing);
        self.save_reservation(reservation, "room").await
    }

    /// Book the first free room of a type, in the store's room order.
    pub async fn create_by_room_type(
        &self,
        room_type: &str,
        request: &BookingRequest,
    ) -> Result<Reservation, BookingError> {
        let room_type: RoomType = room_type
            .parse()
            .map_err(|_| BookingError::UnknownRoomType(room_type.to_string()))?;
        let stay = request.validate()?;
        let _guard = self.critical.lock().await;

        let rooms = self.repos.rooms().find_all().await?;
        let existing = self.repos.reservations().find_all().await?;
        let room = first_available_of_type(&rooms, room_type, &existing, &stay).ok_or_else(|| {
            debug!(room_type = room_type.code(), "No room of type available");
            BookingError::RoomNotAvailable
        })?;

        let reservation = self.new_reservation(room, stay, request, &existing);
        self.save_reservation(reservation, "type").await
    }

    /// Book and pay in one step. The reservation is written `Confirmed`; if
    /// the payment cannot be written the reservation is removed again.
    pub async fn create_with_payment(
        &self,
        room_number: &str,
        request: &BookingRequest,
        card: &CardDetails,
    ) -> Result<PaidBooking, BookingError> {
        let stay = request.validate()?;
        let _guard = self.critical.lock().await;

        let room = self
            .repos
            .rooms()
            .find_by_number(room_number)
            .await?
            .ok_or_else(|| BookingError::NoSuchRoom(room_number.to_string()))?;

        let existing = self.repos.reservations().find_all().await?;
        if !is_room_available(&room.number, &stay, &existing) {
            return Err(BookingError::RoomNotAvailable);
        }

        let amount = stay_total(&room, &stay, request.guest_count, self.extra_person_rate)
            .ok_or_else(|| BookingError::InvalidField {
                field: "Amount",
                reason: "stay total is too large".into(),
            })?;
        let mut reservation = self.new_reservation(&room, stay, request, &existing);
        reservation.confirm();
        let reservation_id = reservation.id.clone();

        self.repos
            .reservations()
            .add(reservation)
            .await
            .map_err(BookingError::ReservationSave)?;

        let payment = Payment::new(
            new_payment_id(),
            &reservation_id,
            CARD_PAYMENT_METHOD,
            card,
            amount,
            self.clock.now(),
        );
        if let Err(e) = self.repos.payments().add(payment).await {
            error!(reservation_id = %reservation_id, error = %e, "Payment write failed, rolling back reservation");
            if let Err(rollback) = self.repos.reservations().delete(&reservation_id).await {
                error!(reservation_id = %reservation_id, error = %rollback, "Rollback of reservation failed");
            }
            return Err(BookingError::PaymentSave(e));
        }

        metrics::counter!("hms_reservations_created_total", "channel" => "payment").increment(1);
        metrics::counter!("hms_payments_recorded_total").increment(1);
        info!(reservation_id = %reservation_id, room_number = %room.number, amount, "Reservation paid and confirmed");

        Ok(PaidBooking {
            reservation_id,
            room_number: room.number,
            amount,
        })
    }

    /// Record a payment for an existing reservation and confirm it.
    ///
    /// Stored-card methods reuse the card of the reservation's latest
    /// payment instead of `card`.
    pub async fn record_payment(
        &self,
        reservation_id: &str,
        method: &str,
        card: &CardDetails,
        amount: i64,
    ) -> Result<Payment, BookingError> {
        if amount < 0 {
            return Err(BookingError::InvalidField {
                field: "Amount",
                reason: "must not be negative".into(),
            });
        }
        check_text_field("Method", method)?;

        let _guard = self.critical.lock().await;

        let mut reservation = self
            .repos
            .reservations()
            .find_by_id(reservation_id)
            .await?
            .ok_or_else(|| BookingError::ReservationNotFound(reservation_id.to_string()))?;

        let card = if is_stored_card_method(method) {
            self.repos
                .payments()
                .find_latest_by_reservation_id(reservation_id)
                .await?
                .map(|p| p.card)
                .ok_or_else(|| BookingError::NoStoredCard(reservation_id.to_string()))?
        } else {
            card.clone()
        };

        let payment = Payment::new(
            new_payment_id(),
            reservation_id,
            method.trim(),
            &card,
            amount,
            self.clock.now(),
        );
        self.repos
            .payments()
            .add(payment.clone())
            .await
            .map_err(BookingError::PaymentSave)?;

        reservation.confirm();
        self.repos.reservations().update(reservation).await?;

        metrics::counter!("hms_payments_recorded_total").increment(1);
        info!(reservation_id, payment_id = %payment.id, amount, "Payment recorded");
        Ok(payment)
    }

    // ── Status changes ──────────────────────────────────────────

    pub async fn check_in(&self, reservation_id: &str) -> DomainResult<bool> {
        self.transition(reservation_id, Reservation::check_in).await
    }

    pub async fn check_out(&self, reservation_id: &str) -> DomainResult<bool> {
        self.transition(reservation_id, Reservation::check_out).await
    }

    /// Set any status directly (back-office correction).
    pub async fn update_status(
        &self,
        reservation_id: &str,
        status: ReservationStatus,
    ) -> DomainResult<bool> {
        self.transition(reservation_id, |r| r.status = status).await
    }

    pub async fn update_guest_note(&self, reservation_id: &str, text: &str) -> DomainResult<bool> {
        self.transition(reservation_id, |r| r.set_request(text)).await
    }

    /// Delete a reservation whatever its status. `false` when the id is
    /// unknown; the store is left untouched.
    pub async fn cancel(&self, reservation_id: &str) -> DomainResult<bool> {
        let _guard = self.critical.lock().await;
        let removed = self.repos.reservations().delete(reservation_id).await?;
        if removed {
            info!(reservation_id, "Reservation cancelled");
        }
        Ok(removed)
    }

    async fn transition<F>(&self, reservation_id: &str, change: F) -> DomainResult<bool>
    where
        F: FnOnce(&mut Reservation),
    {
        let _guard = self.critical.lock().await;
        let Some(mut reservation) = self.repos.reservations().find_by_id(reservation_id).await?
        else {
            return Ok(false);
        };
        change(&mut reservation);
        let status = reservation.status;
        self.repos.reservations().update(reservation).await?;
        debug!(reservation_id, status = %status, "Reservation updated");
        Ok(true)
    }

    // ── Rooms ───────────────────────────────────────────────────

    /// Flip the transient cleaning flag. Returns `true` when it is now on.
    pub async fn toggle_housekeeping(&self, room_number: &str) -> bool {
        let _guard = self.critical.lock().await;
        if self.cleaning.remove(room_number).is_some() {
            false
        } else {
            self.cleaning.insert(room_number.to_string());
            true
        }
    }

    pub fn is_cleaning(&self, room_number: &str) -> bool {
        self.cleaning.contains(room_number)
    }

    pub async fn list_rooms(&self) -> DomainResult<Vec<Room>> {
        self.repos.rooms().find_all().await
    }

    pub async fn add_room(&self, room: Room) -> DomainResult<()> {
        validate_room(&room)?;
        let _guard = self.critical.lock().await;
        self.repos.rooms().add(room.clone()).await?;
        info!(room_number = %room.number, room_type = room.room_type.code(), "Room added");
        Ok(())
    }

    pub async fn update_room(&self, room: Room) -> DomainResult<()> {
        validate_room(&room)?;
        let _guard = self.critical.lock().await;
        self.repos.rooms().update(room.clone()).await?;
        info!(room_number = %room.number, "Room updated");
        Ok(())
    }

    /// Refused with `Conflict` while a reservation that has not checked out
    /// still references the room.
    pub async fn delete_room(&self, room_number: &str) -> DomainResult<bool> {
        let _guard = self.critical.lock().await;
        let referenced = self
            .repos
            .reservations()
            .find_all()
            .await?
            .iter()
            .any(|r| r.room_number == room_number && !r.status.is_vacated());
        if referenced {
            return Err(DomainError::Conflict(format!(
                "room {} has active reservations",
                room_number
            )));
        }
        let removed = self.repos.rooms().delete(room_number).await?;
        if removed {
            self.cleaning.remove(room_number);
            info!(room_number, "Room deleted");
        }
        Ok(removed)
    }

    // ── Expiry ──────────────────────────────────────────────────

    /// Delete every `Unpaid` reservation whose payment deadline is before
    /// `now`. Records with an unreadable creation time are skipped.
    pub async fn expire_unpaid(&self, now: NaiveDateTime) -> DomainResult<ExpirySweep> {
        let _guard = self.critical.lock().await;
        let mut sweep = ExpirySweep::default();

        for reservation in self.repos.reservations().find_all().await? {
            if reservation.status != ReservationStatus::Unpaid {
                continue;
            }
            let Some(deadline) = reservation.payment_deadline() else {
                warn!(
                    reservation_id = %reservation.id,
                    created_at = %reservation.created_at,
                    "Skipping reservation with unreadable creation time"
                );
                sweep.skipped += 1;
                continue;
            };
            if deadline >= now {
                continue;
            }
            match self.repos.reservations().delete(&reservation.id).await {
                Ok(true) => {
                    info!(reservation_id = %reservation.id, %deadline, "Unpaid reservation expired");
                    sweep.expired.push(reservation.id);
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(reservation_id = %reservation.id, error = %e, "Failed to expire reservation");
                    sweep.skipped += 1;
                }
            }
        }

        metrics::counter!("hms_reservations_expired_total").increment(sweep.expired.len() as u64);
        Ok(sweep)
    }

    // ── Helpers ─────────────────────────────────────────────────

    fn new_reservation(
        &self,
        room: &Room,
        stay: DateRange,
        request: &BookingRequest,
        existing: &[Reservation],
    ) -> Reservation {
        let taken: HashSet<&str> = existing.iter().map(|r| r.id.as_str()).collect();
        let id = loop {
            let candidate = new_reservation_id();
            if !taken.contains(candidate.as_str()) {
                break candidate;
            }
        };

        Reservation::new(
            id,
            &room.number,
            request.guest_name.trim(),
            stay,
            request.guest_count,
            request.phone.trim(),
            self.clock.now(),
            &request.note,
        )
    }

    async fn save_reservation(
        &self,
        reservation: Reservation,
        channel: &'static str,
    ) -> Result<Reservation, BookingError> {
        self.repos
            .reservations()
            .add(reservation.clone())
            .await
            .map_err(BookingError::ReservationSave)?;

        metrics::counter!("hms_reservations_created_total", "channel" => channel).increment(1);
        info!(
            reservation_id = %reservation.id,
            room_number = %reservation.room_number,
            check_in = %reservation.check_in,
            check_out = %reservation.check_out,
            "Reservation created"
        );
        Ok(reservation)
    }
}

fn new_reservation_id() -> String {
    let hex = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("R-{}", &hex[..8])
}

fn new_payment_id() -> String {
    let hex = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("P-{}", &hex[..12])
}

fn check_text_field(field: &'static str, value: &str) -> Result<(), BookingError> {
    let reason = if value.trim().is_empty() {
        "must not be blank"
    } else if value.contains([',', '\n', '\r']) {
        "must not contain ',' or line breaks"
    } else {
        return Ok(());
    };
    Err(BookingError::InvalidField {
        field,
        reason: reason.into(),
    })
}

fn validate_room(room: &Room) -> DomainResult<()> {
    if room.number.trim().is_empty() || room.number.contains([',', '\n', '\r']) {
        return Err(DomainError::Validation(format!(
            "invalid room number '{}'",
            room.number
        )));
    }
    if room.price < 0 {
        return Err(DomainError::Validation("price must not be negative".into()));
    }
    if room.capacity == 0 {
        return Err(DomainError::Validation("capacity must be at least 1".into()));
    }
    if room.description.contains(['\n', '\r']) {
        return Err(DomainError::Validation(
            "description must not contain line breaks".into(),
        ));
    }
    Ok(())
}
