#[cfg(test)]
mod tests {
    use crate::error::BookingError;
    use crate::reminders::{default_thresholds, ReminderScheduler, ReminderThreshold, ScanReport};
    use crate::test_support::appointment;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use chrono_tz::Tz;
    use mockall::{mock, Sequence};
    use slotkeeper_common::memory::{InMemoryCalendar, InMemoryMetadataStore};
    use slotkeeper_common::models::{AppointmentMetadata, AppointmentStatus, ReminderAction};
    use slotkeeper_common::{
        GatewayError, ManualClock, MetadataStore, NotificationSink, NotifyError, StoreError,
    };
    use slotkeeper_config::ReminderConfig;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    mock! {
        pub Sink {}

        #[async_trait]
        impl NotificationSink for Sink {
            async fn notify(
                &self,
                customer_id: &str,
                message: &str,
                actions: &[ReminderAction],
            ) -> Result<(), NotifyError>;
        }
    }

    mock! {
        pub Store {}

        #[async_trait]
        impl MetadataStore for Store {
            async fn get_metadata(&self, appointment_id: &str) -> Result<AppointmentMetadata, StoreError>;

            async fn save_metadata(
                &self,
                appointment_id: &str,
                metadata: &AppointmentMetadata,
            ) -> Result<(), StoreError>;
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    struct Fixture {
        calendar: Arc<InMemoryCalendar>,
        store: Arc<InMemoryMetadataStore>,
        clock: Arc<ManualClock>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                calendar: Arc::new(InMemoryCalendar::new()),
                store: Arc::new(InMemoryMetadataStore::new()),
                clock: Arc::new(ManualClock::new(now())),
            }
        }

        /// Insert an hour-long appointment starting `lead` from now.
        fn book_in(&self, lead: Duration) -> String {
            self.calendar.insert(appointment(60, now() + lead))
        }

        fn scheduler(&self, sink: MockSink) -> ReminderScheduler {
            ReminderScheduler::new(
                self.calendar.clone(),
                self.store.clone(),
                Arc::new(sink),
                self.clock.clone(),
            )
        }
    }

    fn accepting(times: usize) -> MockSink {
        let mut sink = MockSink::new();
        sink.expect_notify().times(times).returning(|_, _, _| Ok(()));
        sink
    }

    #[tokio::test]
    async fn test_three_day_reminder_sent_once() {
        let f = Fixture::new();
        let id = f.book_in(Duration::hours(71) + Duration::minutes(30));
        let expected_actions = vec![
            ReminderAction::Confirm {
                appointment_id: id.clone(),
            },
            ReminderAction::Cancel {
                appointment_id: id.clone(),
            },
        ];

        let mut sink = MockSink::new();
        sink.expect_notify()
            .withf(move |customer_id, message, actions| {
                customer_id == "4711"
                    && message.contains("Hello Ada")
                    && message.contains("in 3 days")
                    && actions.to_vec() == expected_actions
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        let scheduler = f.scheduler(sink);
        let cancel = CancellationToken::new();

        let first = scheduler.scan_once(&cancel).await.unwrap();
        assert_eq!(
            first,
            ScanReport {
                sent: 1,
                skipped: 0,
                failed: 0
            }
        );
        let metadata = f.store.get_metadata(&id).await.unwrap();
        assert!(metadata.has_sent("72h"));
        assert!(!metadata.has_sent("24h"));

        // Ten minutes later the threshold is still due but already recorded.
        f.clock.advance(Duration::minutes(10));
        let second = scheduler.scan_once(&cancel).await.unwrap();
        assert!(second.is_quiet());
        assert_eq!(f.store.saves(), 1);
    }

    #[tokio::test]
    async fn test_due_window_boundaries() {
        let f = Fixture::new();
        f.book_in(Duration::hours(72));
        f.book_in(Duration::hours(71));
        f.book_in(Duration::hours(72) + Duration::minutes(1));
        let scheduler = f.scheduler(accepting(1));

        let report = scheduler.scan_once(&CancellationToken::new()).await.unwrap();

        assert_eq!(report.sent, 1);
    }

    #[tokio::test]
    async fn test_day_before_reminder_for_unconfirmed_appointment() {
        let f = Fixture::new();
        f.book_in(Duration::hours(23) + Duration::minutes(30));

        let mut sink = MockSink::new();
        sink.expect_notify()
            .withf(|_, message, _| message.contains("tomorrow"))
            .times(1)
            .returning(|_, _, _| Ok(()));
        let scheduler = f.scheduler(sink);

        let report = scheduler.scan_once(&CancellationToken::new()).await.unwrap();
        assert_eq!(report.sent, 1);
    }

    #[tokio::test]
    async fn test_day_before_reminder_skipped_when_confirmed() {
        let f = Fixture::new();
        let id = f.book_in(Duration::hours(23) + Duration::minutes(30));
        let confirmed = AppointmentMetadata {
            confirmed_at: Some(now() - Duration::days(1)),
            ..Default::default()
        };
        f.store.save_metadata(&id, &confirmed).await.unwrap();
        let scheduler = f.scheduler(accepting(0));

        let report = scheduler.scan_once(&CancellationToken::new()).await.unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.sent, 0);
        assert!(!f.store.get_metadata(&id).await.unwrap().has_sent("24h"));
    }

    #[tokio::test]
    async fn test_three_day_reminder_ignores_confirmation() {
        let f = Fixture::new();
        let id = f.book_in(Duration::hours(71) + Duration::minutes(30));
        let confirmed = AppointmentMetadata {
            confirmed_at: Some(now()),
            ..Default::default()
        };
        f.store.save_metadata(&id, &confirmed).await.unwrap();
        let scheduler = f.scheduler(accepting(1));

        let report = scheduler.scan_once(&CancellationToken::new()).await.unwrap();

        assert_eq!(report.sent, 1);
    }

    #[tokio::test]
    async fn test_failed_send_is_retried_next_tick() {
        let f = Fixture::new();
        let id = f.book_in(Duration::hours(71) + Duration::minutes(30));

        let mut seq = Sequence::new();
        let mut sink = MockSink::new();
        sink.expect_notify()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| {
                Err(NotifyError::Rejected {
                    status: 502,
                    message: "bad gateway".to_string(),
                })
            });
        sink.expect_notify()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));
        let scheduler = f.scheduler(sink);
        let cancel = CancellationToken::new();

        let first = scheduler.scan_once(&cancel).await.unwrap();
        assert_eq!(first.failed, 1);
        assert!(!f.store.get_metadata(&id).await.unwrap().has_sent("72h"));
        assert_eq!(f.store.saves(), 0);

        f.clock.advance(Duration::minutes(10));
        let second = scheduler.scan_once(&cancel).await.unwrap();
        assert_eq!(second.sent, 1);
        assert!(f.store.get_metadata(&id).await.unwrap().has_sent("72h"));
    }

    #[tokio::test]
    async fn test_unrecorded_send_is_repeated() {
        let f = Fixture::new();
        f.book_in(Duration::hours(71) + Duration::minutes(30));
        let scheduler = f.scheduler(accepting(2));
        let cancel = CancellationToken::new();

        f.store.set_save_failure(true);
        let first = scheduler.scan_once(&cancel).await.unwrap();
        assert_eq!(first.failed, 1);

        f.store.set_save_failure(false);
        let second = scheduler.scan_once(&cancel).await.unwrap();
        assert_eq!(second.sent, 1);

        let third = scheduler.scan_once(&cancel).await.unwrap();
        assert!(third.is_quiet());
    }

    #[tokio::test]
    async fn test_cancelled_and_anonymous_appointments_are_ignored() {
        let f = Fixture::new();
        let mut cancelled = appointment(60, now() + Duration::hours(71) + Duration::minutes(30));
        cancelled.status = AppointmentStatus::Cancelled;
        f.calendar.insert(cancelled);
        let mut anonymous = appointment(60, now() + Duration::hours(71) + Duration::minutes(20));
        anonymous.customer.id = String::new();
        f.calendar.insert(anonymous);
        let scheduler = f.scheduler(accepting(0));

        let report = scheduler.scan_once(&CancellationToken::new()).await.unwrap();

        assert!(report.is_quiet());
        assert_eq!(f.store.saves(), 0);
    }

    #[tokio::test]
    async fn test_unreadable_metadata_skips_appointment() {
        let calendar = Arc::new(InMemoryCalendar::new());
        calendar.insert(appointment(60, now() + Duration::hours(71) + Duration::minutes(30)));
        let mut store = MockStore::new();
        store.expect_get_metadata().times(1).returning(|id| {
            Err(StoreError::Corrupt {
                id: id.to_string(),
                message: "bad timestamp".to_string(),
            })
        });
        store.expect_save_metadata().times(0);
        let scheduler = ReminderScheduler::new(
            calendar,
            Arc::new(store),
            Arc::new(accepting(0)),
            Arc::new(ManualClock::new(now())),
        );

        let report = scheduler.scan_once(&CancellationToken::new()).await.unwrap();

        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn test_appointments_outside_horizon_are_not_read() {
        let mut store = MockStore::new();
        store.expect_get_metadata().times(0);
        let calendar = Arc::new(InMemoryCalendar::new());
        calendar.insert(appointment(60, now() + Duration::hours(80)));
        // Nothing due either.
        calendar.insert(appointment(60, now() + Duration::hours(48)));
        let scheduler = ReminderScheduler::new(
            calendar,
            Arc::new(store),
            Arc::new(accepting(0)),
            Arc::new(ManualClock::new(now())),
        );

        let report = scheduler.scan_once(&CancellationToken::new()).await.unwrap();

        assert!(report.is_quiet());
    }

    #[tokio::test]
    async fn test_scan_fails_when_listing_is_cancelled() {
        let f = Fixture::new();
        let scheduler = f.scheduler(accepting(0));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = scheduler.scan_once(&cancel).await.unwrap_err();

        assert!(matches!(err, GatewayError::Cancelled));
    }

    #[tokio::test]
    async fn test_message_uses_business_timezone() {
        let f = Fixture::new();
        // 2025-06-04 11:30 UTC, 13:30 in Zurich.
        f.book_in(Duration::hours(71) + Duration::minutes(30));
        let mut sink = MockSink::new();
        sink.expect_notify()
            .withf(|_, message, _| message.contains("04.06.2025 13:30"))
            .times(1)
            .returning(|_, _, _| Ok(()));
        let scheduler = f.scheduler(sink).with_timezone(Tz::Europe__Zurich);

        scheduler.scan_once(&CancellationToken::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_record_confirmation_is_idempotent() {
        let f = Fixture::new();
        let id = f.book_in(Duration::hours(48));
        let scheduler = f.scheduler(accepting(0));
        let cancel = CancellationToken::new();

        let first = scheduler.record_confirmation(&id, &cancel).await.unwrap();
        assert_eq!(first.confirmed_at, Some(now()));

        f.clock.advance(Duration::hours(2));
        let second = scheduler.record_confirmation(&id, &cancel).await.unwrap();

        assert_eq!(second.confirmed_at, Some(now()));
        assert_eq!(f.store.saves(), 1);
    }

    #[tokio::test]
    async fn test_record_confirmation_keeps_sent_labels() {
        let f = Fixture::new();
        let id = f.book_in(Duration::hours(48));
        let mut metadata = AppointmentMetadata::default();
        metadata.mark_sent("72h");
        f.store.save_metadata(&id, &metadata).await.unwrap();
        let scheduler = f.scheduler(accepting(0));

        let confirmed = scheduler
            .record_confirmation(&id, &CancellationToken::new())
            .await
            .unwrap();

        assert!(confirmed.is_confirmed());
        assert!(confirmed.has_sent("72h"));
    }

    #[tokio::test]
    async fn test_confirming_unknown_appointment_writes_nothing() {
        let f = Fixture::new();
        let scheduler = f.scheduler(accepting(0));

        let err = scheduler
            .record_confirmation("never-booked", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, BookingError::NotFound(id) if id == "never-booked"));
        assert_eq!(f.store.saves(), 0);
        assert!(!f.store.get_metadata("never-booked").await.unwrap().is_confirmed());
    }

    #[tokio::test]
    async fn test_confirming_cancelled_appointment_is_refused() {
        let f = Fixture::new();
        let mut cancelled = appointment(60, now() + Duration::hours(48));
        cancelled.status = AppointmentStatus::Cancelled;
        let id = f.calendar.insert(cancelled);
        let scheduler = f.scheduler(accepting(0));

        let err = scheduler
            .record_confirmation(&id, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, BookingError::NotFound(_)));
        assert_eq!(f.store.saves(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ticks_until_cancelled() {
        let f = Fixture::new();
        f.book_in(Duration::hours(71) + Duration::minutes(30));
        let config = ReminderConfig {
            tick_interval_secs: 60,
            horizon_hours: 73,
        };
        let scheduler = Arc::new(f.scheduler(accepting(1)).with_config(&config));
        assert_eq!(scheduler.tick_interval(), std::time::Duration::from_secs(60));

        let cancel = CancellationToken::new();
        let handle = {
            let scheduler = scheduler.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { scheduler.run(cancel).await })
        };

        // Several ticks pass; the reminder goes out on the first one only.
        tokio::time::sleep(std::time::Duration::from_secs(185)).await;
        assert_eq!(f.store.saves(), 1);

        cancel.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
    }

    #[test]
    fn test_threshold_window_is_half_open() {
        let threshold = ReminderThreshold::new("72h", Duration::hours(72), Duration::hours(1), false);
        assert!(threshold.is_due(Duration::hours(72)));
        assert!(threshold.is_due(Duration::hours(71) + Duration::seconds(1)));
        assert!(!threshold.is_due(Duration::hours(71)));
        assert!(!threshold.is_due(Duration::hours(72) + Duration::seconds(1)));
    }

    #[test]
    fn test_default_thresholds() {
        let thresholds = default_thresholds();
        let labels: Vec<&str> = thresholds.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["72h", "24h"]);
        assert!(!thresholds[0].skip_if_confirmed);
        assert!(thresholds[1].skip_if_confirmed);
    }
}
