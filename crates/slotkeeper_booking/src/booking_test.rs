#[cfg(test)]
mod tests {
    use crate::error::BookingError;
    use crate::test_support::{appointment, at, customer, day, harness, service};
    use chrono::{Duration, TimeZone, Utc};
    use slotkeeper_common::models::{Appointment, AppointmentStatus, TimeSlot};
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_booking_free_slot_creates_appointment() {
        let h = harness();
        let candidate = h.booking.draft("cut", at(10, 0), customer(), "first visit").unwrap();

        let created = h.booking.book(&candidate, &CancellationToken::new()).await.unwrap();

        assert!(created.id.is_some());
        assert_eq!(created.start, at(10, 0));
        assert_eq!(created.end, at(11, 0));
        assert_eq!(created.status, AppointmentStatus::Confirmed);
        assert_eq!(h.calendar.appointments().len(), 1);
    }

    #[tokio::test]
    async fn test_slot_crossing_closing_time_is_outside_hours() {
        let h = harness();
        // Half an hour past close; the slot is also busy, but hours are checked first.
        h.calendar.block(at(17, 0), at(18, 0));
        let candidate = appointment(60, at(17, 30));

        let err = h.booking.book(&candidate, &CancellationToken::new()).await.unwrap_err();

        assert!(
            matches!(err, BookingError::OutsideWorkingHours { start, end } if start == at(17, 30) && end == at(18, 30)),
            "got {:?}",
            err
        );
        assert_eq!(h.calendar.busy_queries(), 0);
    }

    #[tokio::test]
    async fn test_slot_before_opening_is_outside_hours() {
        let h = harness();
        let err = h
            .booking
            .book(&appointment(60, at(8, 30)), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::OutsideWorkingHours { .. }));
    }

    #[tokio::test]
    async fn test_past_start_is_rejected_before_hours_check() {
        let h = harness();
        h.clock.set(at(20, 0));

        // Both in the past and outside hours.
        let err = h
            .booking
            .book(&appointment(60, at(7, 0)), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, BookingError::AppointmentInPast { start } if start == at(7, 0)));
    }

    #[tokio::test]
    async fn test_start_equal_to_now_is_past() {
        let h = harness();
        h.clock.set(at(10, 0));
        let err = h
            .booking
            .book(&appointment(60, at(10, 0)), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::AppointmentInPast { .. }));
    }

    #[tokio::test]
    async fn test_missing_fields_are_checked_first() {
        let h = harness();
        h.clock.set(at(20, 0));
        let mut candidate = appointment(60, at(7, 0));
        candidate.service.id = String::new();

        let err = h.booking.book(&candidate, &CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, BookingError::InvalidAppointment(_)));
    }

    #[tokio::test]
    async fn test_end_must_follow_service_duration() {
        let h = harness();
        let mut candidate = appointment(60, at(10, 0));
        candidate.end = at(10, 30);

        let err = h.booking.book(&candidate, &CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, BookingError::InvalidAppointment(_)));
        assert!(h.calendar.appointments().is_empty());
    }

    #[tokio::test]
    async fn test_non_positive_service_duration_is_invalid() {
        let h = harness();
        let candidate = Appointment::new(service("cut", 0), at(10, 0), customer(), "").unwrap();
        let err = h.booking.book(&candidate, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, BookingError::InvalidAppointment(_)));
    }

    #[tokio::test]
    async fn test_unrepresentable_service_duration_is_invalid() {
        let h = harness();
        let mut candidate = appointment(60, at(10, 0));
        for minutes in [10_000_000_000_000, i64::MAX] {
            candidate.service.duration_minutes = minutes;

            let err = h.booking.book(&candidate, &CancellationToken::new()).await.unwrap_err();

            assert!(matches!(err, BookingError::InvalidAppointment(_)), "got {:?}", err);
        }
        assert_eq!(h.calendar.busy_queries(), 0);
    }

    #[test]
    fn test_appointment_end_overflow_has_no_appointment() {
        assert!(Appointment::new(service("cut", i64::MAX), at(10, 0), customer(), "").is_none());
        assert!(Appointment::new(service("cut", 10_000_000_000_000), at(10, 0), customer(), "").is_none());
    }

    #[tokio::test]
    async fn test_overlapping_busy_time_is_unavailable() {
        let h = harness();
        h.calendar.block(at(10, 30), at(11, 30));

        let err = h
            .booking
            .book(&appointment(60, at(10, 0)), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, BookingError::SlotUnavailable { .. }));
        assert!(h.calendar.appointments().is_empty());
    }

    #[tokio::test]
    async fn test_touching_busy_time_is_fine() {
        let h = harness();
        h.calendar.block(at(9, 0), at(10, 0));
        h.calendar.block(at(11, 0), at(12, 0));

        h.booking
            .book(&appointment(60, at(10, 0)), &CancellationToken::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_second_booking_of_same_slot_conflicts() {
        let h = harness();
        let cancel = CancellationToken::new();
        h.booking.book(&appointment(60, at(10, 0)), &cancel).await.unwrap();

        let err = h
            .booking
            .book(&appointment(60, at(10, 0)), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, BookingError::SlotUnavailable { .. }));
        assert_eq!(h.calendar.appointments().len(), 1);
    }

    #[tokio::test]
    async fn test_busy_lookup_failure_fails_closed() {
        let h = harness();
        h.calendar.set_busy_failure(true);

        let err = h
            .booking
            .book(&appointment(60, at(10, 0)), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, BookingError::Upstream(_)));
        assert!(h.calendar.appointments().is_empty());
    }

    #[tokio::test]
    async fn test_creation_failure_leaves_cache_untouched() {
        let h = harness();
        h.calendar.set_create_failure(true);
        let cancel = CancellationToken::new();

        let err = h.booking.book(&appointment(60, at(10, 0)), &cancel).await.unwrap_err();

        assert!(matches!(err, BookingError::Creation(_)));
        assert_eq!(h.cache.len(), 1);
        assert_eq!(h.calendar.busy_queries(), 1);
    }

    #[tokio::test]
    async fn test_booking_invalidates_cached_day() {
        let h = harness();
        let cancel = CancellationToken::new();

        let before = h.availability.available_slots(day(), 60, &cancel).await.unwrap();
        assert!(before.contains(&TimeSlot::new(at(14, 0), at(15, 0))));
        assert_eq!(h.calendar.busy_queries(), 1);

        h.booking.book(&appointment(60, at(14, 0)), &cancel).await.unwrap();
        // The booking itself was served from cache.
        assert_eq!(h.calendar.busy_queries(), 1);

        let after = h.availability.available_slots(day(), 60, &cancel).await.unwrap();
        assert_eq!(h.calendar.busy_queries(), 2);
        assert!(!after.contains(&TimeSlot::new(at(14, 0), at(15, 0))));
        assert_eq!(after.len(), before.len() - 1);
    }

    #[tokio::test]
    async fn test_booking_keeps_other_days_cached() {
        let h = harness();
        let cancel = CancellationToken::new();
        let next_day = day().succ_opt().unwrap();
        h.availability.available_slots(next_day, 60, &cancel).await.unwrap();

        h.booking.book(&appointment(60, at(14, 0)), &cancel).await.unwrap();

        h.availability.available_slots(next_day, 60, &cancel).await.unwrap();
        // One lookup for the next day, one for the booked day.
        assert_eq!(h.calendar.busy_queries(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_token_aborts_booking() {
        let h = harness();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = h.booking.book(&appointment(60, at(10, 0)), &cancel).await.unwrap_err();

        assert!(matches!(err, BookingError::Cancelled));
        assert!(h.calendar.appointments().is_empty());
    }

    #[tokio::test]
    async fn test_draft_uses_catalog_duration() {
        let h = harness();
        let draft = h.booking.draft("massage", at(10, 0), customer(), "").unwrap();
        assert_eq!(draft.end - draft.start, Duration::minutes(90));
        assert!(draft.id.is_none());

        let err = h.booking.draft("nails", at(10, 0), customer(), "").unwrap_err();
        assert!(matches!(err, BookingError::InvalidAppointment(_)));
    }

    #[tokio::test]
    async fn test_cancel_requires_id() {
        let h = harness();
        for id in ["", "   "] {
            let err = h.booking.cancel(id, &CancellationToken::new()).await.unwrap_err();
            assert!(matches!(err, BookingError::InvalidAppointment(_)));
        }
    }

    #[tokio::test]
    async fn test_cancel_unknown_id_is_not_found() {
        let h = harness();
        let err = h
            .booking
            .cancel("does-not-exist", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::NotFound(id) if id == "does-not-exist"));
    }

    #[tokio::test]
    async fn test_cancel_frees_the_slot_again() {
        let h = harness();
        let cancel = CancellationToken::new();
        let created = h.booking.book(&appointment(60, at(14, 0)), &cancel).await.unwrap();
        let booked = h.availability.available_slots(day(), 60, &cancel).await.unwrap();
        assert!(!booked.contains(&created.slot()));

        h.booking
            .cancel(created.id.as_deref().unwrap(), &cancel)
            .await
            .unwrap();

        assert!(h.cache.is_empty());
        let freed = h.availability.available_slots(day(), 60, &cancel).await.unwrap();
        assert!(freed.contains(&created.slot()));
        assert!(h.calendar.appointments().is_empty());
    }

    #[tokio::test]
    async fn test_local_day_decides_hours_in_business_timezone() {
        use crate::hours::BusinessHours;
        use crate::test_support::harness_with;
        use chrono_tz::Tz;

        // 09:00 Zurich is 07:00 UTC in June.
        let h = harness_with(BusinessHours::new(Tz::Europe__Zurich, 9, 18, 60).unwrap());
        let start = Utc.with_ymd_and_hms(2025, 6, 2, 7, 0, 0).unwrap();

        h.booking
            .book(&appointment(60, start), &CancellationToken::new())
            .await
            .unwrap();

        let err = h
            .booking
            .book(&appointment(60, at(16, 30)), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::OutsideWorkingHours { .. }));
    }
}
