//! Capture `tracing` events so tests can assert on structured fields.
//!
//! A [`Layer`] on a thread-local [`Registry`] records each event that passes
//! its level filter.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

use tracing::{
    Event,
    Level,
    Subscriber,
    field::{Field, Visit},
};
use tracing_subscriber::{
    Layer,
    Registry,
    filter::filter_fn,
    layer::{Context, SubscriberExt},
};

type Sink = Arc<Mutex<Vec<CapturedEvent>>>;

fn lock(sink: &Sink) -> MutexGuard<'_, Vec<CapturedEvent>> {
    match sink.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Level, message and fields of one captured event.
#[derive(Debug)]
pub(crate) struct CapturedEvent {
    level: Level,
    message: Option<String>,
    fields: HashMap<String, String>,
}

impl CapturedEvent {
    fn empty(level: Level) -> Self {
        Self {
            level,
            message: None,
            fields: HashMap::new(),
        }
    }

    fn store(&mut self, field: &Field, text: String) {
        match field.name() {
            "message" => self.message = Some(text),
            name => {
                self.fields.insert(name.to_owned(), text);
            }
        }
    }

    pub(crate) const fn level(&self) -> Level { self.level }

    pub(crate) fn message(&self) -> Option<&str> { self.message.as_deref() }

    pub(crate) fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

impl Visit for CapturedEvent {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.store(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) { self.store(field, value.to_owned()); }
}

struct CaptureLayer(Sink);

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut captured = CapturedEvent::empty(*event.metadata().level());
        event.record(&mut captured);
        lock(&self.0).push(captured);
    }
}

/// Run `f` with a capturing subscriber installed on this thread and return
/// its events at exactly `level`.
pub(crate) fn capture_events_at(level: Level, f: impl FnOnce()) -> Vec<CapturedEvent> {
    let sink = Sink::default();
    let layer = CaptureLayer(Arc::clone(&sink))
        .with_filter(filter_fn(move |metadata| *metadata.level() == level));
    tracing::subscriber::with_default(Registry::default().with(layer), f);
    std::mem::take(&mut *lock(&sink))
}
