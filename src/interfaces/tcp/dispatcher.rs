//! Request dispatcher
//!
//! Turns one parsed request line into a call on the reservation engine and
//! formats the single-line reply. Engine results are typed; they become
//! wire strings only here.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use futures_util::FutureExt;
use tracing::{debug, error, warn};

use super::command::{parse_request, CommandError, CommandKind, Request};
use crate::application::reservations::{
    BookingRequest, DashboardRow, GuestReservation, ReservationService, RoomStatusRow,
};
use crate::application::AuthService;
use crate::domain::{CardDetails, DomainError, ReservationStatus, Room, RoomType};
use crate::shared::errors::BookingError;
use crate::shared::time::{format_date, parse_date};

const NO_ROOM_AVAILABLE: &str = "RESERVE_FAIL:No Room Available";
const ROW_SEPARATOR: &str = "|";
const EMPTY_CELL: &str = "-";

type CommandResult = Result<String, CommandError>;

/// Record command dispatch outcome and latency.
fn record_command(command: &'static str, outcome: &'static str, start: Instant) {
    let duration = start.elapsed().as_secs_f64();
    metrics::histogram!("hms_command_duration_seconds", "command" => command).record(duration);
    metrics::counter!("hms_commands_total", "command" => command, "outcome" => outcome)
        .increment(1);
}

#[derive(Clone)]
pub struct Dispatcher {
    reservations: Arc<ReservationService>,
    auth: Arc<AuthService>,
}

impl Dispatcher {
    pub fn new(reservations: Arc<ReservationService>, auth: Arc<AuthService>) -> Self {
        Self { reservations, auth }
    }

    /// Handle one request line and produce exactly one reply line.
    pub async fn handle_line(&self, line: &str) -> String {
        let start = Instant::now();
        let request = match parse_request(line) {
            Ok(request) => request,
            Err(e) => {
                debug!(error = %e, "Rejected request line");
                return e.reply();
            }
        };
        let command = request.name();

        let result = AssertUnwindSafe(self.execute(&request))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                let message = panic_message(panic);
                error!(command, panic = %message, "Command handler panicked");
                Err(CommandError::Internal(message))
            });

        match result {
            Ok(reply) => {
                record_command(command, "ok", start);
                reply
            }
            Err(e) => {
                record_command(command, e.outcome(), start);
                e.reply()
            }
        }
    }

    async fn execute(&self, req: &Request<'_>) -> CommandResult {
        match req.kind() {
            CommandKind::Login => self.login(req).await,
            CommandKind::GetRooms => self.get_rooms().await,
            CommandKind::AddRoom => self.save_room(req, false).await,
            CommandKind::UpdateRoom => self.save_room(req, true).await,
            CommandKind::DeleteRoom => self.delete_room(req).await,
            CommandKind::CheckAvailability => self.check_availability(req).await,
            CommandKind::GetRoomStatus => self.room_status(req).await,
            CommandKind::AddReservation => self.add_reservation(req).await,
            CommandKind::ReserveByType => self.reserve_by_type(req).await,
            CommandKind::PayAndReserve => self.pay_and_reserve(req).await,
            CommandKind::ProcessPayment => self.process_payment(req).await,
            CommandKind::GetMyReservations => self.my_reservations(req).await,
            CommandKind::UpdateReservationRequest => {
                let done = self
                    .reservations
                    .update_guest_note(req.field(0), req.field(1))
                    .await;
                Ok(flag_reply(req, done, "UPDATE_SUCCESS", "UPDATE_FAIL"))
            }
            CommandKind::UpdateReservationStatus => {
                let status: ReservationStatus = req.field(1).parse().map_err(CommandError::Format)?;
                let done = self.reservations.update_status(req.field(0), status).await;
                Ok(flag_reply(req, done, "UPDATE_SUCCESS", "UPDATE_FAIL"))
            }
            CommandKind::DeleteReservation => {
                let done = self.reservations.cancel(req.field(0)).await;
                Ok(flag_reply(req, done, "DELETE_SUCCESS", "DELETE_FAIL"))
            }
            CommandKind::CheckIn => {
                let done = self.reservations.check_in(req.field(0)).await;
                Ok(flag_reply(req, done, "SUCCESS", "FAIL"))
            }
            CommandKind::CheckOut => {
                let done = self.reservations.check_out(req.field(0)).await;
                Ok(flag_reply(req, done, "SUCCESS", "FAIL"))
            }
            CommandKind::ToggleCleaning => {
                let on = self.reservations.toggle_housekeeping(req.field(0).trim()).await;
                Ok(format!("CLEANING:{}", if on { "ON" } else { "OFF" }))
            }
            CommandKind::GetDashboard => self.dashboard(req).await,
            CommandKind::GetRoomSales => self.room_sales(req).await,
        }
    }

    // ── Identity ────────────────────────────────────────────────

    async fn login(&self, req: &Request<'_>) -> CommandResult {
        match self.auth.login(req.field(0), req.field(1)).await {
            Ok(user) => Ok(format!("LOGIN_SUCCESS:{}", user.role)),
            Err(DomainError::Unauthorized(_)) => Ok("LOGIN_FAIL:Invalid credentials".into()),
            Err(e) => Err(internal(e)),
        }
    }

    // ── Rooms ───────────────────────────────────────────────────

    async fn get_rooms(&self) -> CommandResult {
        let rooms = self.reservations.list_rooms().await.map_err(internal)?;
        let rows: Vec<String> = rooms.iter().map(room_cells).collect();
        Ok(format!("ROOM_LIST:{}", rows.join(ROW_SEPARATOR)))
    }

    async fn save_room(&self, req: &Request<'_>, update: bool) -> CommandResult {
        let room_type: RoomType = req
            .field(1)
            .parse()
            .map_err(|t| CommandError::Format(format!("Unknown room type {}", t)))?;
        let room = Room::new(
            req.field(0).trim(),
            room_type,
            parse_number(req.field(2), "price")?,
            parse_number(req.field(3), "capacity")?,
            req.field(4),
        );

        let (result, ok, fail) = if update {
            (
                self.reservations.update_room(room).await,
                "ROOM_UPDATE_SUCCESS",
                "ROOM_UPDATE_FAIL",
            )
        } else {
            (
                self.reservations.add_room(room).await,
                "ROOM_ADD_SUCCESS",
                "ROOM_ADD_FAIL",
            )
        };
        Ok(flag_reply(req, result.map(|()| true), ok, fail))
    }

    async fn delete_room(&self, req: &Request<'_>) -> CommandResult {
        let done = self.reservations.delete_room(req.field(0).trim()).await;
        Ok(flag_reply(req, done, "ROOM_DELETE_SUCCESS", "ROOM_DELETE_FAIL"))
    }

    async fn check_availability(&self, req: &Request<'_>) -> CommandResult {
        let check_in = parse_date_field(req.field(0), "check-in")?;
        let check_out = parse_date_field(req.field(1), "check-out")?;
        let types = self
            .reservations
            .available_types(check_in, check_out)
            .await
            .map_err(booking_to_command)?;
        let codes: Vec<&str> = types.iter().map(|t| t.code()).collect();
        Ok(format!("AVAILABLE_TYPES:{}", codes.join(",")))
    }

    async fn room_status(&self, req: &Request<'_>) -> CommandResult {
        let date = parse_date_field(req.field(0), "date")?;
        let rows = self
            .reservations
            .room_status_list(date)
            .await
            .map_err(internal)?;
        let rows: Vec<String> = rows.iter().map(room_status_cells).collect();
        Ok(format!("ROOM_STATUS_LIST:{}", rows.join(ROW_SEPARATOR)))
    }

    // ── Reservations ────────────────────────────────────────────

    async fn add_reservation(&self, req: &Request<'_>) -> CommandResult {
        let booking = booking_request(req, 1, req.field(6))?;
        let room_number = req.field(0).trim();
        let result = self
            .reservations
            .create_by_room_number(room_number, &booking)
            .await;
        reserve_reply(req, result.map(|r| r.room_number))
    }

    async fn reserve_by_type(&self, req: &Request<'_>) -> CommandResult {
        let booking = booking_request(req, 1, "")?;
        let result = self
            .reservations
            .create_by_room_type(req.field(0).trim(), &booking)
            .await;
        reserve_reply(req, result.map(|r| r.room_number))
    }

    async fn pay_and_reserve(&self, req: &Request<'_>) -> CommandResult {
        let booking = booking_request(req, 1, req.field(6))?;
        let card = CardDetails::new(req.field(7), req.field(8), req.field(9), req.field(10));
        match self
            .reservations
            .create_with_payment(req.field(0).trim(), &booking, &card)
            .await
        {
            Ok(paid) => Ok(format!("SUCCESS:{}:{}", paid.reservation_id, paid.amount)),
            Err(e) => {
                log_booking_failure(req, &e);
                Ok(format!("FAIL:{}", e.code()))
            }
        }
    }

    async fn process_payment(&self, req: &Request<'_>) -> CommandResult {
        let amount: i64 = parse_number(req.field(6), "amount")?;
        let card = CardDetails::new(req.field(2), req.field(3), req.field(4), req.field(5));
        match self
            .reservations
            .record_payment(req.field(0).trim(), req.field(1), &card, amount)
            .await
        {
            Ok(_) => Ok("PAYMENT_SUCCESS".into()),
            Err(e) => {
                log_booking_failure(req, &e);
                Ok("PAYMENT_FAIL".into())
            }
        }
    }

    async fn my_reservations(&self, req: &Request<'_>) -> CommandResult {
        let rows = self
            .reservations
            .reservations_by_guest(req.field(0))
            .await
            .map_err(internal)?;
        let rows: Vec<String> = rows.iter().map(guest_reservation_cells).collect();
        Ok(format!("MY_RESERVATIONS:{}", rows.join(ROW_SEPARATOR)))
    }

    // ── Reports ─────────────────────────────────────────────────

    async fn dashboard(&self, req: &Request<'_>) -> CommandResult {
        let date = parse_date_field(req.field(0), "date")?;
        let rows = self.reservations.dashboard(date).await.map_err(internal)?;
        let rows: Vec<String> = rows.iter().map(dashboard_cells).collect();
        Ok(format!("DASHBOARD_LIST:{}", rows.join(ROW_SEPARATOR)))
    }

    async fn room_sales(&self, req: &Request<'_>) -> CommandResult {
        let start = parse_date_field(req.field(0), "start date")?;
        let end = parse_date_field(req.field(1), "end date")?;
        let sales = self
            .reservations
            .room_sales(start, end)
            .await
            .map_err(booking_to_command)?;
        let cells: Vec<String> = sales
            .iter()
            .map(|(date, amount)| format!("{}={}", format_date(*date), amount))
            .collect();
        Ok(format!("ROOM_SALES:{}", cells.join(",")))
    }
}

// ── Field parsing ──────────────────────────────────────────────

fn parse_date_field(value: &str, name: &str) -> Result<NaiveDate, CommandError> {
    parse_date(value).ok_or_else(|| {
        CommandError::Format(format!("Invalid {} date '{}', expected yyyy-MM-dd", name, value))
    })
}

fn parse_number<T: std::str::FromStr>(value: &str, name: &str) -> Result<T, CommandError> {
    value
        .trim()
        .parse()
        .map_err(|_| CommandError::Format(format!("Invalid {} '{}'", name, value)))
}

/// Guest fields start at `first`: name, check-in, check-out, guests, phone.
fn booking_request(req: &Request<'_>, first: usize, note: &str) -> Result<BookingRequest, CommandError> {
    Ok(BookingRequest {
        guest_name: req.field(first).to_string(),
        check_in: parse_date_field(req.field(first + 1), "check-in")?,
        check_out: parse_date_field(req.field(first + 2), "check-out")?,
        guest_count: parse_number(req.field(first + 3), "guest count")?,
        phone: req.field(first + 4).to_string(),
        note: note.to_string(),
    })
}

// ── Replies ────────────────────────────────────────────────────

fn internal(e: DomainError) -> CommandError {
    error!(error = %e, "Record store failure");
    CommandError::Internal(e.to_string())
}

fn booking_to_command(e: BookingError) -> CommandError {
    match e {
        BookingError::Store(e) | BookingError::ReservationSave(e) | BookingError::PaymentSave(e) => {
            internal(e)
        }
        other => CommandError::Format(other.to_string()),
    }
}

fn log_booking_failure(req: &Request<'_>, e: &BookingError) {
    if e.is_rejection() {
        debug!(command = req.name(), code = e.code(), reason = %e, "Booking rejected");
    } else {
        error!(command = req.name(), code = e.code(), error = %e, "Booking failed");
    }
}

/// Map a yes/no engine result to its two reply words.
fn flag_reply(
    req: &Request<'_>,
    result: Result<bool, DomainError>,
    ok: &str,
    fail: &str,
) -> String {
    match result {
        Ok(true) => ok.to_string(),
        Ok(false) => fail.to_string(),
        Err(e) if e.is_storage() => {
            error!(command = req.name(), error = %e, "Record store failure");
            fail.to_string()
        }
        Err(e) => {
            debug!(command = req.name(), reason = %e, "Request refused");
            fail.to_string()
        }
    }
}

fn reserve_reply(req: &Request<'_>, result: Result<String, BookingError>) -> CommandResult {
    match result {
        Ok(room_number) => Ok(format!("RESERVE_SUCCESS:{}", room_number)),
        Err(e @ (BookingError::InvalidDateRange | BookingError::InvalidField { .. })) => {
            Err(CommandError::Format(e.to_string()))
        }
        Err(
            e @ (BookingError::NoSuchRoom(_)
            | BookingError::RoomNotAvailable
            | BookingError::UnknownRoomType(_)),
        ) => {
            log_booking_failure(req, &e);
            Ok(NO_ROOM_AVAILABLE.to_string())
        }
        Err(e) => {
            log_booking_failure(req, &e);
            Ok(format!("RESERVE_FAIL:{}", e.code()))
        }
    }
}

fn room_cells(room: &Room) -> String {
    format!(
        "{},{},{},{},{}",
        room.number,
        room.room_type.code(),
        room.price,
        room.capacity,
        room.description
    )
}

fn room_status_cells(row: &RoomStatusRow) -> String {
    format!("{},{}", room_cells(&row.room), row.status.as_str())
}

fn guest_reservation_cells(row: &GuestReservation) -> String {
    let r = &row.reservation;
    let (room_type, price, capacity) = match &row.room {
        Some(room) => (room.room_type.code(), room.price, room.capacity),
        None => {
            warn!(reservation_id = %r.id, room_number = %r.room_number, "Reservation references unknown room");
            (EMPTY_CELL, 0, 0)
        }
    };
    format!(
        "{},{},{},{},{},{},{},{},{},{},{},{},{}",
        r.id,
        r.room_number,
        r.guest_name,
        format_date(r.check_in),
        format_date(r.check_out),
        r.guest_count,
        r.phone,
        r.status,
        r.created_at,
        r.request,
        room_type,
        price,
        capacity
    )
}

fn dashboard_cells(row: &DashboardRow) -> String {
    let room = &row.room;
    match &row.reservation {
        Some(r) => format!(
            "{},{},{},{},{},{},{},{},{},{},{},{}",
            room.number,
            room.room_type.code(),
            room.price,
            row.state.as_str(),
            r.guest_name,
            r.id,
            r.guest_count,
            r.phone,
            format_date(r.check_in),
            format_date(r.check_out),
            room.description,
            or_placeholder(&r.request)
        ),
        None => format!(
            "{},{},{},{},{e},{e},0,{e},{e},{e},{},{e}",
            room.number,
            room.room_type.code(),
            room.price,
            row.state.as_str(),
            room.description,
            e = EMPTY_CELL
        ),
    }
}

fn or_placeholder(text: &str) -> &str {
    if text.trim().is_empty() {
        EMPTY_CELL
    } else {
        text
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
