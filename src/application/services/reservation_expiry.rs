//! Background task that expires unpaid reservations.
//!
//! Sweeps once at start to catch up on deadlines that passed while the
//! server was down, then once a day at a fixed local time of day (18:00 by
//! default, the payment deadline itself).

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, NaiveDateTime, NaiveTime};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::application::reservations::ReservationService;
use crate::shared::shutdown::ShutdownSignal;

const SWEEP_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

pub struct ExpiryScheduler {
    service: Arc<ReservationService>,
    anchor: NaiveTime,
    shutdown: ShutdownSignal,
}

impl ExpiryScheduler {
    pub fn new(service: Arc<ReservationService>, anchor: NaiveTime, shutdown: ShutdownSignal) -> Self {
        Self {
            service,
            anchor,
            shutdown,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(self) {
        info!(anchor = %self.anchor, "📅 Reservation expiry task started");

        self.sweep().await;

        let now = self.service.clock().now();
        let first = next_anchor(now, self.anchor);
        let delay = (first - now).to_std().unwrap_or(Duration::ZERO);
        info!(next_sweep = %first, "📅 Next expiry sweep scheduled");

        let mut interval = interval_at(Instant::now() + delay, SWEEP_PERIOD);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => self.sweep().await,
                _ = self.shutdown.notified().wait() => {
                    info!("📅 Reservation expiry task shutting down");
                    break;
                }
            }
        }

        info!("📅 Reservation expiry task stopped");
    }

    async fn sweep(&self) {
        let now = self.service.clock().now();
        match self.service.expire_unpaid(now).await {
            Ok(sweep) if sweep.expired.is_empty() && sweep.skipped == 0 => {
                debug!(%now, "Expiry sweep found nothing to do");
            }
            Ok(sweep) => {
                info!(
                    %now,
                    expired = sweep.expired.len(),
                    skipped = sweep.skipped,
                    "Expiry sweep finished"
                );
            }
            Err(e) => error!(error = %e, "Expiry sweep failed"),
        }
    }
}

/// Next occurrence of `anchor` strictly after `now`.
pub fn next_anchor(now: NaiveDateTime, anchor: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(anchor);
    if today > now {
        today
    } else {
        today + ChronoDuration::days(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::reservations::BookingRequest;
    use crate::domain::{RepositoryProvider, ReservationRepository};
    use crate::infrastructure::InMemoryRepositoryProvider;
    use crate::shared::time::{parse_date, parse_time_of_day, parse_timestamp, FixedClock};

    fn ts(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn anchor_later_today() {
        let six = parse_time_of_day("18:00:00").unwrap();
        assert_eq!(next_anchor(ts("2025-01-10 09:30:00"), six), ts("2025-01-10 18:00:00"));
    }

    #[test]
    fn anchor_passed_moves_to_tomorrow() {
        let six = parse_time_of_day("18:00:00").unwrap();
        assert_eq!(next_anchor(ts("2025-01-10 18:00:00"), six), ts("2025-01-11 18:00:00"));
        assert_eq!(next_anchor(ts("2025-01-10 23:59:59"), six), ts("2025-01-11 18:00:00"));
    }

    #[tokio::test]
    async fn catch_up_sweep_runs_at_start_and_task_stops_on_shutdown() {
        let repos = Arc::new(InMemoryRepositoryProvider::seeded());
        let clock = Arc::new(FixedClock::at("2025-01-10 16:00:00").unwrap());
        let service = Arc::new(ReservationService::with_clock(repos.clone(), clock.clone()));

        let request = BookingRequest {
            guest_name: "Kim".into(),
            phone: "010".into(),
            check_in: parse_date("2025-02-01").unwrap(),
            check_out: parse_date("2025-02-02").unwrap(),
            guest_count: 1,
            note: String::new(),
        };
        service.create_by_room_number("101", &request).await.unwrap();

        // Server was down past the deadline.
        clock.set(ts("2025-01-10 19:00:00"));

        let shutdown = ShutdownSignal::new();
        let handle = ExpiryScheduler::new(
            service.clone(),
            parse_time_of_day("18:00:00").unwrap(),
            shutdown.clone(),
        )
        .spawn();

        for _ in 0..100 {
            if repos.reservations().find_all().await.unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(repos.reservations().find_all().await.unwrap().is_empty());

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
