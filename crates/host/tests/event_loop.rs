use std::time::Duration;

use anyhow::Result;
use arxlink_backend_mock::MockAccessory;
use arxlink_common::types::{AccessoryEvent, ControllerState, PermissionFlowOutcome, Resolution};
use arxlink_host::{run_event_loop, AccessoryConnectionController, HostEvent};
use tokio::sync::mpsc;

async fn eventually(mut check: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached");
}

fn spawn_loop(
    mock: &MockAccessory,
) -> (
    mpsc::UnboundedSender<HostEvent>,
    tokio::task::JoinHandle<Result<ControllerState, arxlink_host::ControllerError>>,
) {
    let controller =
        AccessoryConnectionController::new(mock.clone(), mock.clone(), mock.clone(), mock.clone(), Resolution::Hd720);
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, tokio::spawn(run_event_loop(controller, rx)))
}

#[tokio::test]
async fn denial_flow_grant_and_shutdown() -> Result<()> {
    let mock = MockAccessory::new();
    let (tx, handle) = spawn_loop(&mock);
    eventually(|| mock.connects() == 1).await;

    assert!(mock.emit(AccessoryEvent::PermissionDenied));
    eventually(|| mock.launches().len() == 1).await;

    mock.set_ready(true);
    assert!(mock.resolve_flow(PermissionFlowOutcome::AllPermissionsGranted));
    eventually(|| mock.starts().len() == 1).await;

    tx.send(HostEvent::Activation)?;
    eventually(|| mock.starts().len() == 2).await;

    tx.send(HostEvent::Shutdown)?;
    let state = handle.await??;
    assert_eq!(state, ControllerState::Running);
    assert_eq!(mock.stops(), 1);
    Ok(())
}

#[tokio::test]
async fn close_requested_ends_loop() -> Result<()> {
    let mock = MockAccessory::new();
    let (tx, handle) = spawn_loop(&mock);
    eventually(|| mock.connects() == 1).await;

    tx.send(HostEvent::Accessory(AccessoryEvent::PermissionDenied))?;
    eventually(|| mock.launches().len() == 1).await;
    assert!(mock.resolve_flow(PermissionFlowOutcome::CloseAppRequested));

    let state = tokio::time::timeout(Duration::from_secs(5), handle).await???;
    assert_eq!(state, ControllerState::Terminated);
    assert_eq!(mock.terminations(), 1);
    assert!(mock.starts().is_empty());
    Ok(())
}

#[tokio::test]
async fn closed_host_channel_stops_loop() -> Result<()> {
    let mock = MockAccessory::new_ready();
    let (tx, handle) = spawn_loop(&mock);
    eventually(|| mock.starts().len() == 1).await;
    drop(tx);
    let state = handle.await??;
    assert_eq!(state, ControllerState::Running);
    assert_eq!(mock.stops(), 1);
    Ok(())
}

#[tokio::test]
async fn abandoned_flow_returns_to_idle_and_relaunches() -> Result<()> {
    let mock = MockAccessory::new();
    let controller =
        AccessoryConnectionController::new(mock.clone(), mock.clone(), mock.clone(), mock.clone(), Resolution::Hd720);
    let status = controller.subscribe();
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(run_event_loop(controller, rx));
    eventually(|| mock.connects() == 1).await;

    assert!(mock.emit(AccessoryEvent::PermissionDenied));
    eventually(|| status.borrow().state == ControllerState::AwaitingPermission).await;
    assert_eq!(mock.launches().len(), 1);

    assert!(mock.abandon_flow());
    eventually(|| status.borrow().state == ControllerState::Idle).await;

    assert!(mock.emit(AccessoryEvent::PermissionDenied));
    eventually(|| mock.launches().len() == 2).await;
    eventually(|| status.borrow().state == ControllerState::AwaitingPermission).await;

    tx.send(HostEvent::Shutdown)?;
    let state = handle.await??;
    assert_eq!(state, ControllerState::AwaitingPermission);
    assert!(mock.starts().is_empty());
    Ok(())
}
