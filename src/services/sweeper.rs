//! Periodic reservation expiry sweep
//!
//! Runs on the server's runtime next to the HTTP handlers and shares the
//! database pool with them. A failed iteration is logged and retried on the
//! next tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::{error::AppResult, models::reservation::SweepReport};

use super::reservations::ExpirySweep;

/// Shortest period the sweeper accepts; `tokio::time::interval` rejects zero
const MIN_PERIOD: Duration = Duration::from_secs(1);

pub struct ReservationSweeper {
    sweep: Arc<dyn ExpirySweep>,
    period: Duration,
}

impl ReservationSweeper {
    pub fn new(sweep: Arc<dyn ExpirySweep>, period: Duration) -> Self {
        Self {
            sweep,
            period: period.max(MIN_PERIOD),
        }
    }

    /// Run a single sweep iteration
    pub async fn run_once(&self) -> AppResult<SweepReport> {
        let report = self.sweep.sweep_expired(Utc::now()).await?;

        if report.is_empty() {
            tracing::debug!("Reservation sweep: nothing expired");
        } else {
            tracing::info!(
                expired = ?report.expired,
                released_copies = ?report.released_copies,
                "Reservation sweep released {} copies",
                report.released_copies.len()
            );
        }

        Ok(report)
    }

    /// Sweep on every tick until `shutdown` flips to true or its sender is dropped.
    /// The first sweep happens immediately.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(period_secs = self.period.as_secs(), "Reservation sweeper started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        tracing::error!("Reservation sweep failed: {}", e);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Reservation sweeper stopped");
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::services::reservations::MockExpirySweep;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_run_once_returns_report() {
        let mut mock = MockExpirySweep::new();
        mock.expect_sweep_expired().times(1).returning(|_| {
            Ok(SweepReport {
                expired: vec![4],
                released_copies: vec![40],
            })
        });

        let sweeper = ReservationSweeper::new(Arc::new(mock), Duration::from_secs(3600));
        let report = sweeper.run_once().await.unwrap();
        assert_eq!(report.expired, vec![4]);
        assert_eq!(report.released_copies, vec![40]);
    }

    #[tokio::test]
    async fn test_run_once_passes_current_time() {
        let before = Utc::now();
        let mut mock = MockExpirySweep::new();
        mock.expect_sweep_expired()
            .withf(move |now| *now >= before)
            .times(1)
            .returning(|_| Ok(SweepReport::default()));

        let sweeper = ReservationSweeper::new(Arc::new(mock), Duration::from_secs(3600));
        assert!(sweeper.run_once().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_once_propagates_errors() {
        let mut mock = MockExpirySweep::new();
        mock.expect_sweep_expired()
            .returning(|_| Err(AppError::Internal("connection reset".to_string())));

        let sweeper = ReservationSweeper::new(Arc::new(mock), Duration::from_secs(3600));
        assert!(sweeper.run_once().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_period_is_raised_to_minimum() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut mock = MockExpirySweep::new();
        mock.expect_sweep_expired().returning(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(SweepReport::default())
        });

        let sweeper = ReservationSweeper::new(Arc::new(mock), Duration::ZERO);
        assert_eq!(sweeper.period, MIN_PERIOD);

        let (tx, rx) = watch::channel(false);
        let handle = sweeper.spawn(rx);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeps_every_period_and_survives_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut mock = MockExpirySweep::new();
        mock.expect_sweep_expired().returning(move |_| {
            // first iteration fails, later ones succeed
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(AppError::Internal("database unavailable".to_string()))
            } else {
                Ok(SweepReport::default())
            }
        });

        let (tx, rx) = watch::channel(false);
        let period = Duration::from_secs(3600);
        let handle = ReservationSweeper::new(Arc::new(mock), period).spawn(rx);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(period).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        tx.send(true).unwrap();
        handle.await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
