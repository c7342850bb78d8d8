//! Flat-file record store
//!
//! Four comma-delimited files in one data directory, one per collection.
//! Every repository call reads the file fresh, so hand edits made while the
//! server runs are picked up on the next request.

mod records;
mod table;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

pub use table::{CsvRecord, CsvTable, DELIMITER};

use crate::domain::{
    DomainError, DomainResult, Payment, PaymentRepository, RepositoryProvider, Reservation,
    ReservationRepository, Room, RoomRepository, User, UserRepository,
};
use crate::shared::errors::InfraError;

// ── Rooms ──────────────────────────────────────────────────────

pub struct CsvRoomRepository {
    table: CsvTable<Room>,
}

#[async_trait]
impl RoomRepository for CsvRoomRepository {
    async fn find_all(&self) -> DomainResult<Vec<Room>> {
        Ok(self.table.read_all().await?)
    }

    async fn find_by_number(&self, number: &str) -> DomainResult<Option<Room>> {
        Ok(self
            .table
            .read_all()
            .await?
            .into_iter()
            .find(|r| r.number == number))
    }

    async fn add(&self, room: Room) -> DomainResult<()> {
        self.table
            .append_checked(&room, |rooms| {
                if rooms.iter().any(|r| r.number == room.number) {
                    return Err(DomainError::Conflict(format!("room {}", room.number)));
                }
                Ok(())
            })
            .await
    }

    async fn update(&self, room: Room) -> DomainResult<()> {
        self.table
            .modify(|rooms| match rooms.iter_mut().find(|r| r.number == room.number) {
                Some(existing) => {
                    *existing = room;
                    Ok(((), true))
                }
                None => Err(DomainError::not_found("Room", "number", room.number)),
            })
            .await
    }

    async fn delete(&self, number: &str) -> DomainResult<bool> {
        self.table
            .modify::<_, DomainError, _>(|rooms| {
                let before = rooms.len();
                rooms.retain(|r| r.number != number);
                let removed = rooms.len() != before;
                Ok((removed, removed))
            })
            .await
    }
}

// ── Reservations ───────────────────────────────────────────────

pub struct CsvReservationRepository {
    table: CsvTable<Reservation>,
}

#[async_trait]
impl ReservationRepository for CsvReservationRepository {
    async fn find_all(&self) -> DomainResult<Vec<Reservation>> {
        Ok(self.table.read_all().await?)
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Reservation>> {
        Ok(self.table.read_all().await?.into_iter().find(|r| r.id == id))
    }

    async fn add(&self, reservation: Reservation) -> DomainResult<()> {
        self.table
            .append_checked(&reservation, |all| {
                if all.iter().any(|r| r.id == reservation.id) {
                    return Err(DomainError::Conflict(format!(
                        "reservation {}",
                        reservation.id
                    )));
                }
                Ok(())
            })
            .await
    }

    async fn update(&self, reservation: Reservation) -> DomainResult<()> {
        self.table
            .modify(|all| match all.iter_mut().find(|r| r.id == reservation.id) {
                Some(existing) => {
                    *existing = reservation;
                    Ok(((), true))
                }
                None => Err(DomainError::not_found("Reservation", "id", reservation.id)),
            })
            .await
    }

    async fn delete(&self, id: &str) -> DomainResult<bool> {
        self.table
            .modify::<_, DomainError, _>(|all| {
                let before = all.len();
                all.retain(|r| r.id != id);
                let removed = all.len() != before;
                Ok((removed, removed))
            })
            .await
    }
}

// ── Payments ───────────────────────────────────────────────────

pub struct CsvPaymentRepository {
    table: CsvTable<Payment>,
}

#[async_trait]
impl PaymentRepository for CsvPaymentRepository {
    async fn find_all(&self) -> DomainResult<Vec<Payment>> {
        Ok(self.table.read_all().await?)
    }

    async fn find_latest_by_reservation_id(
        &self,
        reservation_id: &str,
    ) -> DomainResult<Option<Payment>> {
        Ok(self
            .table
            .read_all()
            .await?
            .into_iter()
            .rev()
            .find(|p| p.reservation_id == reservation_id))
    }

    async fn add(&self, payment: Payment) -> DomainResult<()> {
        Ok(self.table.append(&payment).await?)
    }
}

// ── Users ──────────────────────────────────────────────────────

pub struct CsvUserRepository {
    table: CsvTable<User>,
}

#[async_trait]
impl UserRepository for CsvUserRepository {
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<User>> {
        Ok(self.table.read_all().await?.into_iter().find(|u| u.id == id))
    }

    async fn find_all(&self) -> DomainResult<Vec<User>> {
        Ok(self.table.read_all().await?)
    }
}

// ── Provider ───────────────────────────────────────────────────

pub struct CsvRepositoryProvider {
    data_dir: PathBuf,
    rooms: CsvRoomRepository,
    reservations: CsvReservationRepository,
    payments: CsvPaymentRepository,
    users: CsvUserRepository,
}

impl CsvRepositoryProvider {
    /// Open the store in `data_dir`, creating the directory if needed.
    /// Missing files are treated as empty collections.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, InfraError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir).map_err(|source| InfraError::Io {
            path: data_dir.display().to_string(),
            source,
        })?;

        info!(data_dir = %data_dir.display(), "Opened flat-file record store");

        Ok(Self {
            rooms: CsvRoomRepository {
                table: CsvTable::new(&data_dir),
            },
            reservations: CsvReservationRepository {
                table: CsvTable::new(&data_dir),
            },
            payments: CsvPaymentRepository {
                table: CsvTable::new(&data_dir),
            },
            users: CsvUserRepository {
                table: CsvTable::new(&data_dir),
            },
            data_dir,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

impl RepositoryProvider for CsvRepositoryProvider {
    fn rooms(&self) -> &dyn RoomRepository {
        &self.rooms
    }

    fn reservations(&self) -> &dyn ReservationRepository {
        &self.reservations
    }

    fn payments(&self) -> &dyn PaymentRepository {
        &self.payments
    }

    fn users(&self) -> &dyn UserRepository {
        &self.users
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CardDetails, DateRange, ReservationStatus, RoomType};
    use crate::shared::time::{parse_date, parse_timestamp};
    use tempfile::TempDir;

    fn store() -> (TempDir, CsvRepositoryProvider) {
        let dir = TempDir::new().unwrap();
        let repos = CsvRepositoryProvider::open(dir.path()).unwrap();
        (dir, repos)
    }

    fn reservation(id: &str, request: &str) -> Reservation {
        Reservation::new(
            id,
            "101",
            "Kim",
            DateRange::new(
                parse_date("2025-01-10").unwrap(),
                parse_date("2025-01-12").unwrap(),
            )
            .unwrap(),
            2,
            "010-1234-5678",
            parse_timestamp("2025-01-09 16:00:00").unwrap(),
            request,
        )
    }

    #[tokio::test]
    async fn missing_files_read_as_empty() {
        let (_dir, repos) = store();
        assert!(repos.rooms().find_all().await.unwrap().is_empty());
        assert!(repos.reservations().find_all().await.unwrap().is_empty());
        assert!(repos.users().find_by_id("admin").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn first_add_writes_the_header() {
        let (dir, repos) = store();
        repos
            .reservations()
            .add(reservation("R-1", "quiet, please"))
            .await
            .unwrap();

        let text = std::fs::read_to_string(dir.path().join("reservation.csv")).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("ResID,RoomNum,GuestName,CheckIn,CheckOut,Guests,Phone,ReservationStatus,CreatedAt,Request")
        );
        assert!(lines.next().unwrap().ends_with(",quiet, please"));
        assert!(lines.next().is_none());
    }

    #[tokio::test]
    async fn update_and_delete_survive_reopen() {
        let (dir, repos) = store();
        repos.reservations().add(reservation("R-1", "")).await.unwrap();
        repos.reservations().add(reservation("R-2", "")).await.unwrap();

        let mut r = repos.reservations().find_by_id("R-1").await.unwrap().unwrap();
        r.confirm();
        repos.reservations().update(r).await.unwrap();
        assert!(repos.reservations().delete("R-2").await.unwrap());
        assert!(!repos.reservations().delete("R-2").await.unwrap());

        let reopened = CsvRepositoryProvider::open(dir.path()).unwrap();
        let all = reopened.reservations().find_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, ReservationStatus::Confirmed);
        assert!(!dir.path().join("reservation.csv.tmp").exists());
    }

    #[tokio::test]
    async fn stale_temp_file_is_replaced_by_rewrite() {
        let (dir, repos) = store();
        repos.reservations().add(reservation("R-1", "")).await.unwrap();
        let tmp = dir.path().join("reservation.csv.tmp");
        std::fs::write(&tmp, "garbage from an interrupted rewrite\n".repeat(64)).unwrap();

        assert!(repos.reservations().delete("R-1").await.unwrap());

        assert!(!tmp.exists());
        let text = std::fs::read_to_string(dir.path().join("reservation.csv")).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(!text.contains("garbage"));
        assert!(repos.reservations().find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_ids_are_conflicts() {
        let (_dir, repos) = store();
        repos.reservations().add(reservation("R-1", "")).await.unwrap();
        let err = repos
            .reservations()
            .add(reservation("R-1", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_of_unknown_room_is_not_found() {
        let (_dir, repos) = store();
        let err = repos
            .rooms()
            .update(Room::new("999", RoomType::Deluxe, 1, 1, ""))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn hand_edited_file_is_read() {
        let (dir, repos) = store();
        std::fs::write(
            dir.path().join("rooms.csv"),
            "RoomNum,Type,Price,Capacity,Description\r\n101,Standard,100000,2,City view\r\n\r\n301,Suite,350000,4,Top floor, living room",
        )
        .unwrap();

        let rooms = repos.rooms().find_all().await.unwrap();
        assert_eq!(rooms.len(), 2);
        assert_eq!(rooms[1].description, "Top floor, living room");

        // Appending after a line without a trailing newline starts a new line.
        repos
            .rooms()
            .add(Room::new("201", RoomType::Deluxe, 180_000, 3, "Balcony"))
            .await
            .unwrap();
        let numbers: Vec<_> = repos
            .rooms()
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.number)
            .collect();
        assert_eq!(numbers, vec!["101", "301", "201"]);
    }

    #[tokio::test]
    async fn malformed_row_fails_the_read() {
        let (dir, repos) = store();
        std::fs::write(
            dir.path().join("rooms.csv"),
            "RoomNum,Type,Price,Capacity,Description\n101,Standard,lots,2,x\n",
        )
        .unwrap();

        let err = repos.rooms().find_all().await.unwrap_err();
        assert!(err.is_storage());
        assert!(err.to_string().contains("rooms.csv line 2"));
    }

    #[tokio::test]
    async fn wrong_header_fails_the_read() {
        let (dir, repos) = store();
        std::fs::write(dir.path().join("users.csv"), "id,pw\nadmin,1234\n").unwrap();
        assert!(repos.users().find_all().await.unwrap_err().is_storage());
    }

    #[tokio::test]
    async fn latest_payment_is_the_last_line() {
        let (_dir, repos) = store();
        let at = parse_timestamp("2025-01-09 16:00:00").unwrap();
        let card = CardDetails::new("1111222233334444", "123", "01/30", "12");
        for (id, amount) in [("P-1", 100), ("P-2", 300)] {
            repos
                .payments()
                .add(Payment::new(id, "R-1", "CreditCard", &card, amount, at))
                .await
                .unwrap();
        }

        let latest = repos
            .payments()
            .find_latest_by_reservation_id("R-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.amount, 300);
        assert_eq!(latest.card.number, "************4444");
    }

    #[tokio::test]
    async fn record_with_delimiter_in_name_is_not_written() {
        let (dir, repos) = store();
        let mut r = reservation("R-1", "");
        r.guest_name = "Kim,Minsu".into();
        assert!(repos.reservations().add(r).await.unwrap_err().is_storage());
        assert!(!dir.path().join("reservation.csv").exists()
            || repos.reservations().find_all().await.unwrap().is_empty());
    }
}
