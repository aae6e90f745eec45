use crate::sim::{ClockError, SimDuration, SimTime, SimulationClock};

#[test]
fn clock_starts_at_zero_and_advances() {
    let clock = SimulationClock::new();
    assert_eq!(clock.time(), SimTime::ZERO);

    let (now, delta) = clock
        .increase_clock_time_to(SimTime::from_secs(30))
        .expect("advance clock");
    assert_eq!(now, SimTime::from_secs(30));
    assert_eq!(delta, SimDuration::from_secs(30));
    assert_eq!(clock.time(), SimTime::from_secs(30));
}

#[test]
fn clock_accepts_equal_timestamp_with_zero_delta() {
    let clock = SimulationClock::new();
    clock
        .increase_clock_time_to(SimTime::from_secs(10))
        .expect("advance clock");
    let (now, delta) = clock
        .increase_clock_time_to(SimTime::from_secs(10))
        .expect("equal timestamp is allowed");
    assert_eq!(now, SimTime::from_secs(10));
    assert_eq!(delta, SimDuration::ZERO);
}

#[test]
fn clock_rejects_moving_backwards() {
    let clock = SimulationClock::new();
    clock
        .increase_clock_time_to(SimTime::from_secs(60))
        .expect("advance clock");

    let err = clock
        .increase_clock_time_to(SimTime::from_secs(59))
        .expect_err("moving backwards must fail");
    assert_eq!(
        err,
        ClockError::OutOfOrder {
            current: SimTime::from_secs(60),
            requested: SimTime::from_secs(59),
        }
    );
    // The failed call must not have clamped or moved the clock.
    assert_eq!(clock.time(), SimTime::from_secs(60));
}

#[test]
fn clock_increments_by_fixed_duration() {
    let clock = SimulationClock::new();
    assert_eq!(
        clock.increment_clock_by(SimDuration::from_secs(60)),
        SimTime::from_secs(60)
    );
    assert_eq!(
        clock.increment_clock_by(SimDuration::from_secs(60)),
        SimTime::from_secs(120)
    );
}
