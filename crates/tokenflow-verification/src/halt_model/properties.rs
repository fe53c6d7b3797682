//! Safety, liveness and reachability properties for the halt model.
//!
//! - **Safety** ("always"): no worker retires before it has halted, and once the quitter has
//!   halted every running worker has a halt packet pending.
//! - **Liveness** ("eventually"): every worker retires.
//! - **Reachability** ("sometimes"): LIFO draining can deliver data after the halt flag is set,
//!   data can share a batch with the halt packet, and a worker can retire with
//!   packets still queued.

use stateright::Property;

use super::{
    HaltModel,
    state::{Message, SystemState},
};

/// Name of the data-after-halt reachability property.
pub const CAN_DELIVER_AFTER_HALT_NAME: &str = "data can be delivered after halt";
/// Name of the mixed-batch reachability property.
pub const CAN_BATCH_DATA_WITH_HALT_NAME: &str = "data can share a batch with halt";
/// Name of the abandoned-mail reachability property.
pub const CAN_RETIRE_WITH_MAIL_NAME: &str = "a worker can retire with packets queued";

#[must_use]
fn halt_reaches_running_workers(state: &SystemState, quitter: usize) -> bool {
    if !state.worker(quitter).is_some_and(|w| w.halted) {
        return true;
    }
    state
        .workers
        .iter()
        .all(|w| w.halted || w.halt_pending())
}

/// Safety property: a retired worker has halted.
#[must_use]
pub fn retired_workers_are_halted() -> Property<HaltModel> {
    Property::always("retired workers are halted", |_model, state: &SystemState| {
        state.workers.iter().all(|w| !w.retired || w.halted)
    })
}

/// Safety property: after the quit, every worker is halted or has halt queued.
#[must_use]
pub fn halt_is_pending_everywhere() -> Property<HaltModel> {
    Property::always(
        "halt is pending on every running worker after quit",
        |model: &HaltModel, state: &SystemState| halt_reaches_running_workers(state, model.quitter),
    )
}

/// Liveness property: every worker eventually retires.
#[must_use]
pub fn every_worker_retires() -> Property<HaltModel> {
    Property::eventually("every worker retires", |_model, state: &SystemState| {
        state.workers.iter().all(|w| w.retired)
    })
}

/// Reachability property: a data packet is handled after its worker halted.
#[must_use]
pub fn can_deliver_after_halt() -> Property<HaltModel> {
    Property::sometimes(CAN_DELIVER_AFTER_HALT_NAME, |_model, state: &SystemState| {
        state.workers.iter().any(|w| w.delivered_after_halt)
    })
}

/// Reachability property: a mailbox holds data and halt at once.
#[must_use]
pub fn can_batch_data_with_halt() -> Property<HaltModel> {
    Property::sometimes(CAN_BATCH_DATA_WITH_HALT_NAME, |_model, state: &SystemState| {
        state
            .workers
            .iter()
            .any(|w| w.halt_pending() && w.mailbox.contains(&Message::Data))
    })
}

/// Reachability property: a worker retires before draining its mailbox.
#[must_use]
pub fn can_retire_with_mail() -> Property<HaltModel> {
    Property::sometimes(CAN_RETIRE_WITH_MAIL_NAME, |_model, state: &SystemState| {
        state.workers.iter().any(|w| w.abandoned_mail)
    })
}
