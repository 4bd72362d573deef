//! End-to-end monitor scenarios: reed switch levels in, MQTT messages out

use garage_sentry::{
    config::{Config, DoorConfig, DoorList},
    debounce::DebounceSettings,
    hal::{MockIndicator, MockInputs, MockLink, MockMqtt, MockOutput},
    traits::{Offline, Rgb},
    Error, GarageMonitor, LinkState,
};

type TestMonitor = GarageMonitor<MockInputs, MockMqtt, MockLink, MockIndicator, MockOutput>;

const STATUS: &str = "SENSOR/GARAGE/STATUS";
const PORT_1: &str = "SENSOR/GARAGE/PORT/1";
const PORT_2: &str = "SENSOR/GARAGE/PORT/2";
const PORT_3: &str = "SENSOR/GARAGE/PORT/3";
const ALERT_1: &str = "ALERT/GARAGE/PORT/1";
const ALERT_2: &str = "ALERT/GARAGE/PORT/2";

const DOOR_1: u8 = 13;
const DOOR_2: u8 = 12;

/// Every message the broker saw, with the loop time it was sent at.
#[derive(Default)]
struct Trace {
    seen: usize,
    messages: Vec<(u32, String, String)>,
}

impl Trace {
    fn on(&self, topic: &str) -> Vec<(u32, &str)> {
        self.messages
            .iter()
            .filter(|(_, t, _)| t == topic)
            .map(|(at, _, payload)| (*at, payload.as_str()))
            .collect()
    }

    fn topics(&self) -> Vec<&str> {
        self.messages.iter().map(|(_, t, _)| t.as_str()).collect()
    }
}

fn monitor(inputs: MockInputs, mqtt: MockMqtt) -> TestMonitor {
    GarageMonitor::new(
        &Config::default(),
        inputs,
        mqtt,
        MockLink::up(),
        MockIndicator::new(),
        MockOutput::new(),
    )
    .unwrap()
}

fn collect(m: &TestMonitor, now: u32, trace: &mut Trace) {
    let published = &m.connectivity().mqtt().published;
    for (topic, payload, _) in &published[trace.seen..] {
        trace.messages.push((
            now,
            topic.clone(),
            String::from_utf8_lossy(payload).into_owned(),
        ));
    }
    trace.seen = published.len();
}

fn start(m: &mut TestMonitor, trace: &mut Trace) {
    m.start(0).unwrap();
    collect(m, 0, trace);
}

/// Poll every `step` ms over `from..=to`.
fn run(m: &mut TestMonitor, from: u32, to: u32, step: u32, trace: &mut Trace) {
    let mut now = from;
    while now <= to {
        m.poll(now);
        collect(m, now, trace);
        now += step;
    }
}

// ============================================================================
// Boot
// ============================================================================

#[test]
fn boot_announces_every_door_after_started() {
    let mut inputs = MockInputs::new();
    inputs.set(DOOR_2, true);
    let mut m = monitor(inputs, MockMqtt::new());
    let mut trace = Trace::default();
    start(&mut m, &mut trace);

    assert_eq!(trace.topics(), vec![STATUS, PORT_1, PORT_2, PORT_3]);
    assert_eq!(trace.on(PORT_1), vec![(0, "Garage Door 1 => Close")]);
    assert_eq!(trace.on(PORT_2), vec![(0, "Garage Door 2 => Open")]);
    assert_eq!(trace.on(PORT_3), vec![(0, "Garage Door 3 => Close")]);

    assert_eq!(m.indicator().color(0), Rgb::CLOSED);
    assert_eq!(m.indicator().color(1), Rgb::OPEN);
    assert_eq!(m.indicator().color(2), Rgb::CLOSED);
}

#[test]
fn door_open_at_boot_alerts_without_an_edge() {
    let mut inputs = MockInputs::new();
    inputs.set(DOOR_1, true);
    let mut m = monitor(inputs, MockMqtt::new());
    let mut trace = Trace::default();
    start(&mut m, &mut trace);

    run(&mut m, 0, 300_000, 100, &mut trace);
    assert_eq!(
        trace.on(ALERT_1),
        vec![(300_000, "Garage Door 1 => Open for 5 minutes")]
    );
}

// ============================================================================
// Open too long
// ============================================================================

#[test]
fn open_door_alerts_every_five_minutes_until_closed() {
    let mut inputs = MockInputs::new();
    inputs.set(DOOR_1, true);
    let mut m = monitor(inputs, MockMqtt::new());
    let mut trace = Trace::default();
    start(&mut m, &mut trace);

    run(&mut m, 1, 649_999, 1, &mut trace);
    assert_eq!(m.door(1).unwrap().open_minutes(), 10);

    m.inputs_mut().set(DOOR_1, false);
    run(&mut m, 650_000, 1_000_000, 1, &mut trace);

    assert_eq!(
        trace.on(ALERT_1),
        vec![
            (300_000, "Garage Door 1 => Open for 5 minutes"),
            (600_000, "Garage Door 1 => Open for 10 minutes"),
        ]
    );
    assert_eq!(
        trace.on(PORT_1),
        vec![
            (0, "Garage Door 1 => Open"),
            (650_151, "Garage Door 1 => Close"),
        ]
    );

    let door = m.door(1).unwrap();
    assert!(!door.is_open());
    assert_eq!(door.open_minutes(), 0);
    assert!(door.open_timer().is_none());
    assert_eq!(m.indicator().color(0), Rgb::CLOSED);
}

#[test]
fn reopening_restarts_the_count() {
    let mut m = monitor(MockInputs::new(), MockMqtt::new());
    let mut trace = Trace::default();
    start(&mut m, &mut trace);

    m.inputs_mut().set(DOOR_1, true);
    run(&mut m, 0, 400_000, 10, &mut trace);
    m.inputs_mut().set(DOOR_1, false);
    run(&mut m, 400_010, 500_000, 10, &mut trace);
    m.inputs_mut().set(DOOR_1, true);
    run(&mut m, 500_010, 900_000, 10, &mut trace);

    let alerts: Vec<&str> = trace.on(ALERT_1).into_iter().map(|(_, p)| p).collect();
    assert_eq!(
        alerts,
        vec![
            "Garage Door 1 => Open for 5 minutes",
            "Garage Door 1 => Open for 5 minutes",
        ]
    );
}

#[test]
fn doors_alert_independently() {
    let mut inputs = MockInputs::new();
    inputs.set(DOOR_1, true);
    let mut m = monitor(inputs, MockMqtt::new());
    let mut trace = Trace::default();
    start(&mut m, &mut trace);

    run(&mut m, 0, 99_990, 10, &mut trace);
    m.inputs_mut().set(DOOR_2, true);
    run(&mut m, 100_000, 349_990, 10, &mut trace);
    m.inputs_mut().set(DOOR_1, false);
    run(&mut m, 350_000, 800_000, 10, &mut trace);

    // Door 2's edge lands at 100_160 with 10ms ticks
    assert_eq!(
        trace.on(ALERT_2),
        vec![
            (400_160, "Garage Door 2 => Open for 5 minutes"),
            (700_160, "Garage Door 2 => Open for 10 minutes"),
        ]
    );
    assert_eq!(trace.on(ALERT_1).len(), 1);
    assert!(m.door(2).unwrap().is_open());
    assert!(!m.door(1).unwrap().is_open());
}

#[test]
fn bouncing_door_reports_once() {
    let mut m = monitor(MockInputs::new(), MockMqtt::new());
    let mut trace = Trace::default();
    start(&mut m, &mut trace);

    // Door rattles shut for 300ms, then rests open
    for now in (1_000..1_300).step_by(10) {
        m.inputs_mut().set(DOOR_1, (now / 30) % 2 == 0);
        m.poll(now);
        collect(&m, now, &mut trace);
    }
    m.inputs_mut().set(DOOR_1, true);
    run(&mut m, 1_300, 3_000, 10, &mut trace);

    assert_eq!(
        trace.on(PORT_1),
        vec![(0, "Garage Door 1 => Close"), (1_460, "Garage Door 1 => Open")]
    );
}

// ============================================================================
// Connectivity
// ============================================================================

#[test]
fn heartbeat_follows_started() {
    let mut m = monitor(MockInputs::new(), MockMqtt::new());
    let mut trace = Trace::default();
    start(&mut m, &mut trace);
    run(&mut m, 0, 200_000, 100, &mut trace);

    assert_eq!(
        trace.on(STATUS),
        vec![
            (0, "STARTED"),
            (60_000, "ACTIVE"),
            (120_000, "ACTIVE"),
            (180_000, "ACTIVE"),
        ]
    );
}

#[test]
fn events_while_broker_down_are_delivered_on_reconnect() {
    let mut mqtt = MockMqtt::new();
    mqtt.refuse = true;
    let mut m = monitor(MockInputs::new(), mqtt);
    let mut trace = Trace::default();
    start(&mut m, &mut trace);
    assert!(trace.messages.is_empty());

    m.inputs_mut().set(DOOR_1, true);
    run(&mut m, 5_000, 8_000, 10, &mut trace);
    assert!(m.door(1).unwrap().is_open());
    assert_eq!(m.connectivity().queued(), 4);

    m.connectivity_mut().mqtt_mut().refuse = false;
    run(&mut m, 8_010, 10_000, 10, &mut trace);

    assert_eq!(trace.topics(), vec![STATUS, PORT_1, PORT_2, PORT_3, PORT_1]);
    assert_eq!(
        trace.on(PORT_1),
        vec![
            (10_000, "Garage Door 1 => Close"),
            (10_000, "Garage Door 1 => Open"),
        ]
    );
}

#[test]
fn door_tracking_continues_across_link_loss() {
    let mut m = monitor(MockInputs::new(), MockMqtt::new());
    let mut trace = Trace::default();
    start(&mut m, &mut trace);
    run(&mut m, 0, 1_000, 10, &mut trace);

    m.connectivity_mut().link_mut().drop_link();
    run(&mut m, 1_010, 2_000, 10, &mut trace);
    assert!(!m.connectivity().is_connected());

    m.inputs_mut().set(DOOR_1, true);
    run(&mut m, 2_010, 3_000, 10, &mut trace);
    assert!(m.door(1).unwrap().is_open());
    assert_eq!(trace.on(PORT_1).len(), 1);

    m.connectivity_mut().link_mut().bring_up();
    run(&mut m, 3_010, 3_100, 10, &mut trace);
    assert!(m.connectivity().is_connected());
    assert_eq!(
        trace.on(PORT_1),
        vec![(0, "Garage Door 1 => Close"), (3_010, "Garage Door 1 => Open")]
    );
    assert_eq!(trace.on(STATUS), vec![(0, "STARTED"), (3_010, "STARTED")]);
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn added_door_after_start_announces_immediately() {
    let mut m = monitor(MockInputs::new(), MockMqtt::new());
    let mut trace = Trace::default();
    start(&mut m, &mut trace);
    run(&mut m, 0, 500, 10, &mut trace);

    m.inputs_mut().set(5, true);
    let door = m.add_door(&DoorConfig::new(5, 3)).unwrap();
    collect(&m, 500, &mut trace);

    assert_eq!(door, 4);
    assert_eq!(
        trace.on("SENSOR/GARAGE/PORT/4"),
        vec![(500, "Garage Door 4 => Open")]
    );
    assert!(m.door(4).unwrap().open_timer().is_some());
}

#[test]
fn inverted_contact_reports_open_when_low() {
    let mut doors = DoorList::new();
    doors
        .push(DoorConfig::new(DOOR_1, 0).with_settings(DebounceSettings::INVERT))
        .unwrap();
    let config = Config::default().with_doors(doors);

    let mut inputs = MockInputs::new();
    inputs.set(DOOR_1, true);
    let mut m: TestMonitor = GarageMonitor::new(
        &config,
        inputs,
        MockMqtt::new(),
        MockLink::up(),
        MockIndicator::new(),
        MockOutput::new(),
    )
    .unwrap();
    let mut trace = Trace::default();
    start(&mut m, &mut trace);

    m.inputs_mut().set(DOOR_1, false);
    run(&mut m, 0, 500, 10, &mut trace);

    assert_eq!(
        trace.on(PORT_1),
        vec![(0, "Garage Door 1 => Close"), (160, "Garage Door 1 => Open")]
    );
}

#[test]
fn offline_device_keeps_tracking_doors() {
    let mut inputs = MockInputs::new();
    inputs.set(DOOR_1, true);
    let mut m = GarageMonitor::new(
        &Config::default(),
        inputs,
        Offline,
        Offline,
        MockIndicator::new(),
        MockOutput::new(),
    )
    .unwrap();
    m.start(0).unwrap();

    let mut now = 0;
    while now <= 600_000 {
        m.poll(now);
        now += 100;
    }

    let door = m.door(1).unwrap();
    assert!(door.is_open());
    assert_eq!(door.open_minutes(), 10);
    assert_eq!(m.indicator().color(0), Rgb::OPEN);

    let net = m.connectivity();
    assert_eq!(net.link_state(), LinkState::Down);
    assert!(!net.is_connected());
    // Three boot announcements and two alerts held for a session that never comes
    assert_eq!(net.queued(), 5);
}

#[test]
fn rejected_door_pin_fails_setup() {
    let mut inputs = MockInputs::new();
    inputs.reject(DOOR_2);
    let result = GarageMonitor::new(
        &Config::default(),
        inputs,
        MockMqtt::new(),
        MockLink::up(),
        MockIndicator::new(),
        MockOutput::new(),
    );
    assert_eq!(result.err(), Some(Error::InputConfig(DOOR_2)));
}
