use smartglove::domain::models::{MessageSeverity, JOINT_COUNT};
use smartglove::infrastructure::bluetooth::simulated::{Call, Fault, SimulatedTransport};
use smartglove::{AppEvent, ConnectionStatus, GloveError, GloveId, GloveService, JointLimits};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tokio::sync::mpsc;

const FIVE: &str = "{00600501-7374-7265-7563-6873656e7365}";
const TEN: &str = "{00001001-7374-7265-7563-6873656e7365}";
const FIFTEEN: &str = "{00601501-7374-7265-7563-6873656e7365}";

fn host(
    identifiers: &[&str],
) -> (
    Arc<SimulatedTransport>,
    GloveService<SimulatedTransport>,
    mpsc::UnboundedReceiver<AppEvent>,
) {
    let transport = Arc::new(SimulatedTransport::new());
    for identifier in identifiers {
        transport.add_glove(identifier);
    }
    let (tx, rx) = mpsc::unbounded_channel();
    let service = GloveService::new(Arc::clone(&transport), tx);
    (transport, service, rx)
}

fn connect(service: &mut GloveService<SimulatedTransport>, identifier: &str) -> GloveId {
    let id = service.register(identifier).unwrap();
    service.connect(id).unwrap();
    id
}

#[test]
fn five_sensor_glove_spreads_one_sensor_over_a_finger() {
    let (transport, mut service, _rx) = host(&[FIVE]);
    let id = connect(&mut service, FIVE);
    let mut max = [1.0; JOINT_COUNT];
    max[0..3].fill(90.0);
    service.set_angle_range(id, [0.0; JOINT_COUNT], max).unwrap();

    for raw in [100, 500, 300] {
        transport.notify_stretch(FIVE, &[raw, 0, 0, 0, 0]);
    }

    let reading = service.reading(id).unwrap();
    for joint in 0..3 {
        assert!((reading[3 + joint] - 45.0).abs() < 1e-9);
    }
}

#[test]
fn ten_sensor_odd_sensor_drives_both_distal_joints() {
    let (transport, mut service, _rx) = host(&[TEN]);
    let id = connect(&mut service, TEN);
    service
        .set_joint_limits(id, JointLimits::new([10.0; JOINT_COUNT], [80.0; JOINT_COUNT]))
        .unwrap();

    let mut raw = [0u16; 10];
    transport.notify_stretch(TEN, &raw);
    raw[1] = 400;
    transport.notify_stretch(TEN, &raw);
    raw[1] = 100;
    transport.notify_stretch(TEN, &raw);

    let reading = service.reading(id).unwrap();
    let joints = &reading[3..];
    assert!((joints[1] - 30.0).abs() < 1e-9);
    assert!((joints[2] - 30.0).abs() < 1e-9);
    assert_eq!(joints[0], 10.0);
}

#[test]
fn fifteen_sensor_glove_maps_one_to_one() {
    let (transport, mut service, _rx) = host(&[FIFTEEN]);
    let id = connect(&mut service, FIFTEEN);
    service
        .set_angle_range(id, [0.0; JOINT_COUNT], [1.0; JOINT_COUNT])
        .unwrap();

    let mut raw = [0u16; 15];
    transport.notify_stretch(FIFTEEN, &raw);
    raw[7] = 200;
    transport.notify_stretch(FIFTEEN, &raw);

    let reading = service.reading(id).unwrap();
    for (joint, value) in reading[3..].iter().enumerate() {
        let expected = if joint == 7 { 1.0 } else { 0.0 };
        assert_eq!(*value, expected, "joint {}", joint);
    }
}

#[test]
fn incomplete_service_count_aborts_before_allocation() {
    let (transport, mut service, _rx) = host(&[FIVE]);
    transport.inject_fault(FIVE, Fault::ServiceCountComplete);
    let id = service.register(FIVE).unwrap();

    let err = service.connect(id).unwrap_err();
    assert!(matches!(err, GloveError::ProtocolEnumeration { .. }));
    assert_eq!(
        transport.calls(),
        vec![Call::ResolveHandle, Call::ServiceCount, Call::ReleaseHandle]
    );
    assert!(!service.is_connected(id));
}

#[test]
fn missing_configuration_descriptor_fails_whole_attempt() {
    let (transport, mut service, _rx) = host(&[FIFTEEN]);
    transport.inject_fault(FIFTEEN, Fault::MissingCccd { channel: 1 });
    let id = service.register(FIFTEEN).unwrap();

    assert!(service.connect(id).is_err());
    assert_eq!(transport.active_subscriptions(FIFTEEN), 0);
    assert_eq!(transport.open_handles(), 0);
    assert_eq!(transport.notify_stretch(FIFTEEN, &[1; 15]), 0);
}

#[test]
fn reset_calibration_zeroes_joints_until_new_range() {
    let (transport, mut service, _rx) = host(&[FIFTEEN]);
    let id = connect(&mut service, FIFTEEN);
    service
        .set_joint_limits(id, JointLimits::new([0.0; JOINT_COUNT], [1.0; JOINT_COUNT]))
        .unwrap();
    transport.notify_stretch(FIFTEEN, &[0; 15]);
    transport.notify_stretch(FIFTEEN, &[800; 15]);
    assert!(service.reading(id).unwrap()[3..].iter().all(|v| *v == 1.0));

    service.reset_calibration(id).unwrap();
    assert!(service.reading(id).unwrap()[3..].iter().all(|v| *v == 0.0));

    transport.notify_stretch(FIFTEEN, &[200; 15]);
    assert!(service.reading(id).unwrap()[3..].iter().all(|v| *v == 0.0));
    transport.notify_stretch(FIFTEEN, &[600; 15]);
    assert!(service.reading(id).unwrap()[3..].iter().all(|v| *v == 1.0));
}

#[test]
fn readings_never_observe_half_applied_notifications() {
    let (transport, mut service, _rx) = host(&[FIFTEEN]);
    let id = connect(&mut service, FIFTEEN);
    service
        .set_joint_limits(id, JointLimits::new([0.0; JOINT_COUNT], [1.0; JOINT_COUNT]))
        .unwrap();
    transport.notify_stretch(FIFTEEN, &[0; 15]);
    transport.notify_stretch(FIFTEEN, &[1000; 15]);

    let done = Arc::new(AtomicBool::new(false));
    let writer = {
        let transport = Arc::clone(&transport);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut raw = 0u16;
            while !done.load(Ordering::Relaxed) {
                transport.notify_stretch(FIFTEEN, &[raw; 15]);
                raw = (raw + 37) % 1000;
            }
        })
    };

    for _ in 0..2000 {
        let reading = service.reading(id).unwrap();
        let first = reading[3];
        assert!(reading[3..].iter().all(|v| *v == first), "{:?}", reading);
    }
    done.store(true, Ordering::Relaxed);
    writer.join().unwrap();
}

#[test]
fn clear_stops_delivery_and_restarts_ids() {
    let (transport, mut service, _rx) = host(&[FIVE, TEN]);
    connect(&mut service, FIVE);
    connect(&mut service, TEN);
    assert_eq!(service.identifiers(), vec![FIVE.to_string(), TEN.to_string()]);

    service.clear();
    assert!(service.is_empty());
    assert_eq!(transport.open_handles(), 0);
    assert_eq!(transport.notify_stretch(TEN, &[5; 10]), 0);
    assert!(matches!(
        service.reading(GloveId(0)),
        Err(GloveError::InvalidHandle(_))
    ));
    assert_eq!(service.register(TEN).unwrap(), GloveId(0));
}

#[tokio::test]
async fn connection_events_follow_the_session() {
    let (_transport, mut service, mut rx) = host(&[FIVE]);
    let id = connect(&mut service, FIVE);
    service.disconnect(id).unwrap();

    let mut statuses = Vec::new();
    let mut saw_success = false;
    rx.close();
    while let Some(event) = rx.recv().await {
        match event {
            AppEvent::ConnectionStatus { glove, status } => {
                assert_eq!(glove, id);
                statuses.push(status);
            }
            AppEvent::LogMessage(msg) => {
                saw_success |= msg.severity == MessageSeverity::Success;
            }
        }
    }
    assert!(saw_success);
    assert_eq!(
        statuses,
        vec![
            ConnectionStatus::Connecting,
            ConnectionStatus::Connected,
            ConnectionStatus::Disconnected,
        ]
    );
}
