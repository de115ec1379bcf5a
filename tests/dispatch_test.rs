use chrono::{Duration, TimeZone, Utc};
use hon_rs::dispatch::{DEADLINE_QUEUE, FINISHED_QUEUE, QUEUES, deadline_delay};

#[test]
fn delay_rounds_up_to_whole_seconds() {
    let now = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();
    assert_eq!(deadline_delay(now + Duration::seconds(90), now), 90);
    assert_eq!(deadline_delay(now + Duration::milliseconds(1500), now), 2);
    assert_eq!(deadline_delay(now + Duration::milliseconds(1), now), 1);
}

#[test]
fn past_deadline_delivers_immediately() {
    let now = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();
    assert_eq!(deadline_delay(now, now), 0);
    assert_eq!(deadline_delay(now - Duration::hours(3), now), 0);
}

#[test]
fn far_deadline_saturates() {
    let now = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();
    assert_eq!(
        deadline_delay(now + Duration::days(365 * 100), now),
        i32::MAX
    );
}

#[test]
fn queues_are_distinct() {
    assert_ne!(DEADLINE_QUEUE, FINISHED_QUEUE);
    assert!(QUEUES.contains(&DEADLINE_QUEUE));
    assert!(QUEUES.contains(&FINISHED_QUEUE));
}
