use arxlink_backend_mock::MockAccessory;
use arxlink_common::backend::AccessoryEventSink;
use arxlink_common::types::{ControllerState, IgnoredEvent, PermissionFlowOutcome, Resolution};
use arxlink_host::AccessoryConnectionController;
use tokio::sync::mpsc;

type MockController = AccessoryConnectionController<MockAccessory, MockAccessory, MockAccessory, MockAccessory>;

fn initialized(mock: &MockAccessory) -> MockController {
    let mut controller =
        AccessoryConnectionController::new(mock.clone(), mock.clone(), mock.clone(), mock.clone(), Resolution::Hd720);
    let (tx, _rx) = mpsc::unbounded_channel();
    controller.initialize(tx).unwrap();
    controller
}

/// Launch a flow and hand back the controller with one pending ticket.
fn awaiting_permission(mock: &MockAccessory) -> MockController {
    let mut controller = initialized(mock);
    controller.on_permission_denied();
    assert_eq!(mock.launches().len(), 1);
    controller
}

#[test]
fn attempt_start_issues_start_iff_ready() {
    for ready in [false, true] {
        let mock = MockAccessory::new();
        mock.set_all_connected(ready);
        let mut controller = initialized(&mock);
        let expected = usize::from(ready);
        assert_eq!(mock.starts().len(), expected);

        controller.attempt_start();
        assert_eq!(mock.starts().len(), expected * 2);
    }
}

#[test]
fn permission_denied_launches_iff_not_permitted() {
    for permitted in [false, true] {
        let mock = MockAccessory::new();
        mock.set_headset_permitted(permitted);
        let mut controller = initialized(&mock);
        controller.on_permission_denied();
        assert_eq!(mock.launches().len(), usize::from(!permitted));
    }
}

#[test]
fn activation_always_starts() {
    for ready in [false, true] {
        let mock = MockAccessory::new();
        mock.set_ready(ready);
        let mut controller = initialized(&mock);
        let before = mock.starts().len();
        controller.on_activation_event();
        assert_eq!(mock.starts().len(), before + 1);
        assert_eq!(controller.state(), ControllerState::Running);
    }
}

#[test]
fn scenario_1_device_absent_no_start() {
    let mock = MockAccessory::new();
    let controller = initialized(&mock);
    assert!(mock.starts().is_empty());
    assert_eq!(controller.state(), ControllerState::Idle);
}

#[test]
fn scenario_2_device_ready_single_start_at_fixed_resolution() {
    let mock = MockAccessory::new_ready();
    let controller = initialized(&mock);
    assert_eq!(mock.starts(), vec![Resolution::Hd720]);
    assert_eq!(controller.state(), ControllerState::Running);
}

#[tokio::test]
async fn scenario_3_denied_then_granted_starts_once() {
    let mock = MockAccessory::new();
    let mut controller = awaiting_permission(&mock);
    assert_eq!(mock.launches(), vec![true]);
    assert_eq!(controller.state(), ControllerState::AwaitingPermission);

    mock.set_ready(true);
    assert!(mock.resolve_flow(PermissionFlowOutcome::AllPermissionsGranted));
    let outcome = controller.next_flow_outcome().await.unwrap();
    controller.on_permission_flow_result(outcome);

    assert_eq!(mock.starts(), vec![Resolution::Hd720]);
    assert_eq!(mock.launches().len(), 1);
    assert_eq!(controller.state(), ControllerState::Running);
}

#[test]
fn scenario_4_stale_denial_no_flow() {
    let mock = MockAccessory::new();
    mock.set_headset_permitted(true);
    let mut controller = initialized(&mock);
    controller.on_permission_denied();
    assert!(mock.launches().is_empty());
    assert!(!controller.has_pending_flow());
}

#[test]
fn scenario_5_close_requested_terminates_once() {
    let mock = MockAccessory::new();
    let mut controller = awaiting_permission(&mock);
    mock.set_ready(true);
    controller.on_permission_flow_result(PermissionFlowOutcome::CloseAppRequested);

    assert_eq!(mock.terminations(), 1);
    assert!(mock.starts().is_empty());
    assert_eq!(controller.state(), ControllerState::Terminated);

    // terminated is absorbing
    controller.on_activation_event();
    controller.attempt_start();
    controller.on_permission_denied();
    controller.on_permission_flow_result(PermissionFlowOutcome::CloseAppRequested);
    assert!(mock.starts().is_empty());
    assert_eq!(mock.terminations(), 1);
    assert_eq!(mock.launches().len(), 1);
}

#[test]
fn scenario_6_activation_after_start_restarts() {
    let mock = MockAccessory::new_ready();
    let mut controller = initialized(&mock);
    controller.on_activation_event();
    assert_eq!(mock.starts(), vec![Resolution::Hd720, Resolution::Hd720]);
}

#[test]
fn granted_without_readiness_stays_idle() {
    let mock = MockAccessory::new();
    let mut controller = awaiting_permission(&mock);
    controller.on_permission_flow_result(PermissionFlowOutcome::AllPermissionsGranted);
    assert!(mock.starts().is_empty());
    assert_eq!(controller.state(), ControllerState::Idle);
}

#[test]
fn disconnect_and_back_are_no_ops() {
    for outcome in [PermissionFlowOutcome::UsbDisconnected, PermissionFlowOutcome::BackPressed] {
        let mock = MockAccessory::new();
        let mut controller = awaiting_permission(&mock);
        mock.set_ready(true);
        controller.on_permission_flow_result(outcome);
        assert!(mock.starts().is_empty());
        assert_eq!(mock.terminations(), 0);
        assert_eq!(mock.launches().len(), 1);
        assert_eq!(controller.state(), ControllerState::Idle);
    }
}

#[test]
fn activation_during_flow_keeps_running_after_flow_ends() {
    for outcome in [
        PermissionFlowOutcome::BackPressed,
        PermissionFlowOutcome::UsbDisconnected,
        PermissionFlowOutcome::AllPermissionsGranted,
    ] {
        let mock = MockAccessory::new();
        let mut controller = awaiting_permission(&mock);
        controller.on_activation_event();
        assert_eq!(mock.starts().len(), 1);

        controller.on_permission_flow_result(outcome);
        assert_eq!(controller.state(), ControllerState::Running, "{outcome:?}");
        assert_eq!(mock.starts().len(), 1);
        assert_eq!(mock.stops(), 0);
    }
}

#[test]
fn start_before_a_later_flow_does_not_leak_into_it() {
    let mock = MockAccessory::new();
    let mut controller = awaiting_permission(&mock);
    controller.on_activation_event();
    controller.on_permission_flow_result(PermissionFlowOutcome::BackPressed);
    assert_eq!(controller.state(), ControllerState::Running);

    // helper refused again: the new flow starts from a clean slate
    controller.on_permission_denied();
    assert_eq!(mock.launches().len(), 2);
    controller.on_permission_flow_result(PermissionFlowOutcome::BackPressed);
    assert_eq!(controller.state(), ControllerState::Idle);
}

#[test]
fn ignored_events_have_no_effect() {
    let mock = MockAccessory::new();
    let mut controller = initialized(&mock);
    let events = vec![
        IgnoredEvent::Disconnect,
        IgnoredEvent::DeviceConnectionError("usb reset".into()),
        IgnoredEvent::CameraResolutionUpdate {
            available: Resolution::ALL.to_vec(),
            current: Resolution::Hd720,
        },
        IgnoredEvent::StillPhotoReceived {
            resolution: Resolution::FullHd1080,
            bytes: vec![0xff, 0xd8],
        },
    ];
    for event in events {
        controller.on_accessory_event(event.into());
    }
    assert!(mock.starts().is_empty());
    assert!(mock.launches().is_empty());
    assert_eq!(mock.stops(), 0);
    assert_eq!(controller.state(), ControllerState::Idle);
}
