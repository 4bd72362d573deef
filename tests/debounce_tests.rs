//! Debouncer behaviour against realistic reed switch signals

use garage_sentry::{
    debounce::{DebounceSettings, Debouncer, Edge},
    hal::MockInputs,
    traits::PullMode,
    Error,
};

type Recorded = Vec<(u8, u8, bool)>;

fn reed_debouncer(delay_ms: u32) -> Debouncer<MockInputs, u8> {
    let mut d = Debouncer::new(MockInputs::new());
    d.set_bounce_delay(delay_ms);
    d
}

fn run(d: &mut Debouncer<MockInputs, u8>, from: u32, to: u32, out: &mut Recorded) {
    for now in from..=to {
        d.update(now, &mut |door: &u8, e: Edge| out.push((*door, e.pin, e.state)));
    }
}

// ============================================================================
// Settling
// ============================================================================

#[test]
fn bouncing_contact_reports_one_edge() {
    let mut d = reed_debouncer(150);
    d.add_input(13, PullMode::PullUp, 1, DebounceSettings::NORMAL)
        .unwrap();
    let mut out = Recorded::new();
    run(&mut d, 0, 999, &mut out);

    // Contact chatters for 100ms, then rests high from t=1100
    let mut level = false;
    for now in 1000..1100 {
        if now % 20 == 0 {
            level = !level;
            d.inputs_mut().set(13, level);
        }
        d.update(now, &mut |door: &u8, e: Edge| out.push((*door, e.pin, e.state)));
    }
    d.inputs_mut().set(13, true);
    run(&mut d, 1100, 1500, &mut out);

    assert_eq!(out, vec![(1, 13, true)]);
}

#[test]
fn edge_lands_just_after_bounce_delay() {
    let mut d = reed_debouncer(150);
    d.add_input(13, PullMode::PullUp, 1, DebounceSettings::NORMAL)
        .unwrap();
    let mut out = Recorded::new();

    d.inputs_mut().set(13, true);
    run(&mut d, 5000, 5150, &mut out);
    assert!(out.is_empty());

    run(&mut d, 5151, 5151, &mut out);
    assert_eq!(out, vec![(1, 13, true)]);
}

#[test]
fn glitch_shorter_than_delay_is_ignored() {
    let mut d = reed_debouncer(150);
    let handle = d
        .add_input(12, PullMode::PullUp, 2, DebounceSettings::NORMAL)
        .unwrap();
    let mut out = Recorded::new();

    d.inputs_mut().set(12, true);
    run(&mut d, 100, 200, &mut out);
    d.inputs_mut().set(12, false);
    run(&mut d, 201, 1000, &mut out);

    assert!(out.is_empty());
    assert_eq!(d.stable_state(handle), Some(false));
}

// ============================================================================
// Multiple channels
// ============================================================================

#[test]
fn simultaneous_edges_follow_registration_order() {
    let mut d = reed_debouncer(10);
    d.add_input(14, PullMode::PullUp, 3, DebounceSettings::NORMAL)
        .unwrap();
    d.add_input(13, PullMode::PullUp, 1, DebounceSettings::NORMAL)
        .unwrap();
    d.add_input(12, PullMode::PullUp, 2, DebounceSettings::NORMAL)
        .unwrap();
    let mut out = Recorded::new();

    d.inputs_mut().set(13, true);
    d.inputs_mut().set(12, true);
    d.inputs_mut().set(14, true);
    run(&mut d, 100, 120, &mut out);

    assert_eq!(out, vec![(3, 14, true), (1, 13, true), (2, 12, true)]);
}

#[test]
fn channels_settle_independently() {
    let mut d = reed_debouncer(50);
    d.add_input(13, PullMode::PullUp, 1, DebounceSettings::NORMAL)
        .unwrap();
    d.add_input(12, PullMode::PullUp, 2, DebounceSettings::NORMAL)
        .unwrap();
    let mut out = Recorded::new();

    d.inputs_mut().set(13, true);
    run(&mut d, 0, 30, &mut out);
    d.inputs_mut().set(12, true);
    run(&mut d, 31, 200, &mut out);

    assert_eq!(out, vec![(1, 13, true), (2, 12, true)]);
}

#[test]
fn sixth_channel_is_rejected() {
    let mut d = reed_debouncer(150);
    for (tag, pin) in [13u8, 12, 14, 4, 5].into_iter().enumerate() {
        d.add_input(pin, PullMode::PullUp, tag as u8, DebounceSettings::NORMAL)
            .unwrap();
    }

    assert_eq!(
        d.add_input(15, PullMode::PullUp, 5, DebounceSettings::NORMAL),
        Err(Error::ChannelCapacity)
    );
    assert_eq!(d.len(), 5);
    assert_eq!(d.inputs().mode(15), None);
}

// ============================================================================
// Settings
// ============================================================================

#[test]
fn skip_falling_reports_only_openings() {
    let mut d = reed_debouncer(10);
    d.add_input(13, PullMode::PullUp, 1, DebounceSettings::SKIP_FALLING)
        .unwrap();
    let mut out = Recorded::new();

    for cycle in 0..3u32 {
        let base = cycle * 100;
        d.inputs_mut().set(13, true);
        run(&mut d, base, base + 49, &mut out);
        d.inputs_mut().set(13, false);
        run(&mut d, base + 50, base + 99, &mut out);
    }

    assert_eq!(out, vec![(1, 13, true); 3]);
}

#[test]
fn inverted_channel_reports_closed_contact_as_open() {
    let mut inputs = MockInputs::new();
    inputs.set(13, true);
    let mut d: Debouncer<MockInputs, u8> = Debouncer::new(inputs);
    d.set_bounce_delay(10);
    let handle = d
        .add_input(13, PullMode::PullUp, 1u8, DebounceSettings::INVERT)
        .unwrap();
    assert_eq!(d.reported_state(handle), Some(false));

    let mut out = Vec::new();
    d.inputs_mut().set(13, false);
    for now in 0..=20 {
        d.update(now, &mut |_: &u8, e: Edge| out.push(e.state));
    }
    assert_eq!(out, vec![true]);
    assert_eq!(d.stable_state(handle), Some(false));
    assert_eq!(d.reported_state(handle), Some(true));
}

#[test]
fn fast_callback_then_settles_before_next_edge() {
    let mut d = reed_debouncer(10);
    d.add_input(13, PullMode::PullUp, 1, DebounceSettings::FAST_CALLBACK)
        .unwrap();
    let mut out = Recorded::new();

    d.inputs_mut().set(13, true);
    run(&mut d, 100, 100, &mut out);
    assert_eq!(out, vec![(1, 13, true)]);

    // Bounces back immediately; the release is held until it rests
    d.inputs_mut().set(13, false);
    run(&mut d, 101, 110, &mut out);
    assert_eq!(out.len(), 1);
    run(&mut d, 111, 120, &mut out);
    assert_eq!(out, vec![(1, 13, true), (1, 13, false)]);
}

#[test]
fn update_returns_number_of_edges() {
    let mut d = reed_debouncer(0);
    d.add_input(13, PullMode::PullUp, 1, DebounceSettings::NORMAL)
        .unwrap();
    d.add_input(12, PullMode::PullUp, 2, DebounceSettings::SKIP_RISING)
        .unwrap();

    d.inputs_mut().set(13, true);
    d.inputs_mut().set(12, true);
    let mut sink = |_: &u8, _: Edge| {};
    assert_eq!(d.update(1, &mut sink), 0);
    // Both commit; only door 1 is reported
    assert_eq!(d.update(2, &mut sink), 1);
    assert_eq!(d.update(3, &mut sink), 0);
}
