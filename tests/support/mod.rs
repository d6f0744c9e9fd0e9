#![allow(dead_code)]

use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;

use assist_engine::{PanelView, SectionDistributor, SessionController, SingleSlot};
use assist_transport::StreamTransport;
use assist_transport_mock::ScriptedTransport;
use serde_json::{json, Value};

/// Upper bound for any blocking wait in these tests.
pub const WAIT: Duration = Duration::from_secs(5);

pub fn single_slot_controller(transport: &Arc<ScriptedTransport>) -> SessionController {
    controller_with(transport, Box::new(SingleSlot))
}

pub fn controller_with(
    transport: &Arc<ScriptedTransport>,
    distributor: Box<dyn SectionDistributor>,
) -> SessionController {
    let transport: Arc<dyn StreamTransport> = Arc::<ScriptedTransport>::clone(transport);
    SessionController::new(transport, distributor)
}

pub fn hint_payload(level: u8) -> Value {
    json!({"problemId": "two-sum", "hintLevel": level})
}

/// Everything published so far, without blocking.
pub fn drain_views(views: &Receiver<PanelView>) -> Vec<PanelView> {
    views.try_iter().collect()
}

pub fn settle(controller: &mut SessionController) {
    assert!(
        controller.wait_until_settled(WAIT),
        "controller should settle within {WAIT:?}"
    );
}
