//! In-memory record store for development and testing

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::RwLock;

use crate::domain::{
    DomainError, DomainResult, Payment, PaymentRepository, RepositoryProvider, Reservation,
    ReservationRepository, Room, RoomRepository, RoomType, User, UserRepository,
};

// ── Rooms ──────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryRoomRepository {
    rooms: DashMap<String, Room>,
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn find_all(&self) -> DomainResult<Vec<Room>> {
        let mut rooms: Vec<Room> = self.rooms.iter().map(|e| e.value().clone()).collect();
        rooms.sort_by(|a, b| a.number.cmp(&b.number));
        Ok(rooms)
    }

    async fn find_by_number(&self, number: &str) -> DomainResult<Option<Room>> {
        Ok(self.rooms.get(number).map(|r| r.clone()))
    }

    async fn add(&self, room: Room) -> DomainResult<()> {
        if self.rooms.contains_key(&room.number) {
            return Err(DomainError::Conflict(format!("room {}", room.number)));
        }
        self.rooms.insert(room.number.clone(), room);
        Ok(())
    }

    async fn update(&self, room: Room) -> DomainResult<()> {
        match self.rooms.get_mut(&room.number) {
            Some(mut existing) => {
                *existing = room;
                Ok(())
            }
            None => Err(DomainError::not_found("Room", "number", room.number)),
        }
    }

    async fn delete(&self, number: &str) -> DomainResult<bool> {
        Ok(self.rooms.remove(number).is_some())
    }
}

// ── Reservations ───────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryReservationRepository {
    reservations: DashMap<String, Reservation>,
}

#[async_trait]
impl ReservationRepository for InMemoryReservationRepository {
    async fn find_all(&self) -> DomainResult<Vec<Reservation>> {
        let mut all: Vec<Reservation> = self
            .reservations
            .iter()
            .map(|e| e.value().clone())
            .collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Reservation>> {
        Ok(self.reservations.get(id).map(|r| r.clone()))
    }

    async fn add(&self, reservation: Reservation) -> DomainResult<()> {
        if self.reservations.contains_key(&reservation.id) {
            return Err(DomainError::Conflict(format!("reservation {}", reservation.id)));
        }
        self.reservations.insert(reservation.id.clone(), reservation);
        Ok(())
    }

    async fn update(&self, reservation: Reservation) -> DomainResult<()> {
        match self.reservations.get_mut(&reservation.id) {
            Some(mut existing) => {
                *existing = reservation;
                Ok(())
            }
            None => Err(DomainError::not_found("Reservation", "id", reservation.id)),
        }
    }

    async fn delete(&self, id: &str) -> DomainResult<bool> {
        Ok(self.reservations.remove(id).is_some())
    }
}

// ── Payments ───────────────────────────────────────────────────

/// Kept as a log so "latest" means "last written".
#[derive(Default)]
pub struct InMemoryPaymentRepository {
    payments: RwLock<Vec<Payment>>,
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn find_all(&self) -> DomainResult<Vec<Payment>> {
        Ok(self.payments.read().await.clone())
    }

    async fn find_latest_by_reservation_id(
        &self,
        reservation_id: &str,
    ) -> DomainResult<Option<Payment>> {
        Ok(self
            .payments
            .read()
            .await
            .iter()
            .rev()
            .find(|p| p.reservation_id == reservation_id)
            .cloned())
    }

    async fn add(&self, payment: Payment) -> DomainResult<()> {
        self.payments.write().await.push(payment);
        Ok(())
    }
}

// ── Users ──────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: DashMap<String, User>,
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<User>> {
        Ok(self.users.get(id).map(|u| u.clone()))
    }

    async fn find_all(&self) -> DomainResult<Vec<User>> {
        let mut users: Vec<User> = self.users.iter().map(|e| e.value().clone()).collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(users)
    }
}

// ── Provider ───────────────────────────────────────────────────

/// In-memory storage for development and testing
#[derive(Default)]
pub struct InMemoryRepositoryProvider {
    rooms: InMemoryRoomRepository,
    reservations: InMemoryReservationRepository,
    payments: InMemoryPaymentRepository,
    users: InMemoryUserRepository,
}

impl InMemoryRepositoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A small hotel: two standard rooms, one deluxe, one suite.
    pub fn seeded() -> Self {
        Self::new().with_rooms([
            Room::new("101", RoomType::Standard, 100_000, 2, "City view"),
            Room::new("102", RoomType::Standard, 100_000, 2, "Courtyard view"),
            Room::new("201", RoomType::Deluxe, 180_000, 3, "Balcony"),
            Room::new("301", RoomType::Suite, 350_000, 4, "Top floor, living room"),
        ])
    }

    pub fn with_rooms(self, rooms: impl IntoIterator<Item = Room>) -> Self {
        for room in rooms {
            self.rooms.rooms.insert(room.number.clone(), room);
        }
        self
    }

    pub fn with_users(self, users: impl IntoIterator<Item = User>) -> Self {
        for user in users {
            self.users.users.insert(user.id.clone(), user);
        }
        self
    }
}

impl RepositoryProvider for InMemoryRepositoryProvider {
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
    use crate::domain::{CardDetails, DateRange};
    use crate::shared::time::{parse_date, parse_timestamp};

    fn reservation(id: &str) -> Reservation {
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
            "010",
            parse_timestamp("2025-01-01 10:00:00").unwrap(),
            "",
        )
    }

    #[tokio::test]
    async fn rooms_are_listed_in_number_order() {
        let repos = InMemoryRepositoryProvider::seeded();
        let numbers: Vec<_> = repos
            .rooms()
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.number)
            .collect();
        assert_eq!(numbers, vec!["101", "102", "201", "301"]);
    }

    #[tokio::test]
    async fn duplicate_room_is_a_conflict() {
        let repos = InMemoryRepositoryProvider::seeded();
        let err = repos
            .rooms()
            .add(Room::new("101", RoomType::Suite, 1, 1, ""))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn deleting_a_missing_reservation_leaves_store_alone() {
        let repos = InMemoryRepositoryProvider::new();
        repos.reservations().add(reservation("R-1")).await.unwrap();

        assert!(!repos.reservations().delete("R-404").await.unwrap());
        assert!(repos.reservations().delete("R-1").await.unwrap());
        assert!(!repos.reservations().delete("R-1").await.unwrap());
        assert!(repos.reservations().find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_of_unknown_reservation_is_not_found() {
        let repos = InMemoryRepositoryProvider::new();
        let err = repos
            .reservations()
            .update(reservation("R-9"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn latest_payment_wins() {
        let repos = InMemoryRepositoryProvider::new();
        let at = parse_timestamp("2025-01-01 10:00:00").unwrap();
        let card = CardDetails::new("1111222233334444", "123", "01/30", "12");
        repos
            .payments()
            .add(Payment::new("P-1", "R-1", "CreditCard", &card, 100, at))
            .await
            .unwrap();
        repos
            .payments()
            .add(Payment::new("P-2", "R-1", "Stored", &card, 250, at))
            .await
            .unwrap();

        let latest = repos
            .payments()
            .find_latest_by_reservation_id("R-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, "P-2");
        assert_eq!(latest.amount, 250);
        assert!(repos
            .payments()
            .find_latest_by_reservation_id("R-2")
            .await
            .unwrap()
            .is_none());
    }
}
