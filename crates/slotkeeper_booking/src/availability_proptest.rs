#[cfg(test)]
mod tests {
    use crate::availability::{candidate_slots, free_slots};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;
    use slotkeeper_common::models::{BusyInterval, TimeSlot};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap()
    }

    fn minutes(m: i64) -> DateTime<Utc> {
        base() + Duration::minutes(m)
    }

    proptest! {
        #[test]
        fn test_slots_are_inside_window_future_sorted_and_free(
            open in 0i64..(12 * 60),
            length in 30i64..(12 * 60),
            duration in 15i64..240,
            step in 5i64..120,
            now_offset in -120i64..(24 * 60),
            busy_raw in prop::collection::vec((0i64..(24 * 60), 1i64..180), 0..8),
        ) {
            let window = TimeSlot::new(minutes(open), minutes(open + length));
            let now = minutes(now_offset);
            let busy: Vec<BusyInterval> = busy_raw
                .iter()
                .map(|(start, len)| BusyInterval::new(minutes(*start), minutes(start + len)))
                .collect();

            let candidates = candidate_slots(
                window,
                Duration::minutes(duration),
                Duration::minutes(step),
                now,
            );
            let slots = free_slots(candidates, &busy);

            for slot in &slots {
                prop_assert!(slot.start >= window.start);
                prop_assert!(slot.end <= window.end);
                prop_assert!(slot.start > now);
                prop_assert_eq!(slot.end - slot.start, Duration::minutes(duration));
                prop_assert!(!busy.iter().any(|b| slot.overlaps_busy(b)));
            }
            for pair in slots.windows(2) {
                prop_assert!(pair[0].start < pair[1].start);
                prop_assert!(pair[0].end <= pair[1].start);
            }
        }

        #[test]
        fn test_candidates_step_from_window_start(
            duration in 15i64..120,
            step in 5i64..120,
        ) {
            let window = TimeSlot::new(minutes(9 * 60), minutes(18 * 60));
            let candidates = candidate_slots(
                window,
                Duration::minutes(duration),
                Duration::minutes(step),
                base(),
            );

            for candidate in &candidates {
                let offset = (candidate.start - window.start).num_minutes();
                prop_assert_eq!(offset % step, 0);
            }
            // The next step would no longer fit.
            if let Some(last) = candidates.last() {
                prop_assert!(last.start + Duration::minutes(step + duration) > window.end);
            }
        }
    }
}
