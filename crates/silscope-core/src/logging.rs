//! Logging macros shared by every silscope crate.
//!
//! Every event goes to the [`TARGET`] tracing target whichever crate emits
//! it, so `RUST_LOG=silscope=debug` turns on the whole pipeline at once. The
//! `component` field names the part of the pipeline that logged. Callers must
//! depend on `tracing` themselves.
//!
//! ```ignore
//! log_warn!(Component::Runner, limit, "output cap reached");
//! ```

use std::fmt;

/// Tracing target of every event emitted through these macros.
pub const TARGET: &str = "silscope";

/// Part of the pipeline an event comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    Orchestrator,
    Runner,
    Demangler,
    Server,
    Cli,
}

impl Component {
    pub const fn as_str(self) -> &'static str {
        match self {
            Component::Orchestrator => "orchestrator",
            Component::Runner => "runner",
            Component::Demangler => "demangler",
            Component::Server => "server",
            Component::Cli => "cli",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[macro_export]
macro_rules! log_error {
    ($component:expr, $($arg:tt)*) => {
        tracing::event!(
            target: $crate::logging::TARGET,
            tracing::Level::ERROR,
            component = $crate::logging::Component::as_str($component),
            $($arg)*
        );
    }
}

#[macro_export]
macro_rules! log_warn {
    ($component:expr, $($arg:tt)*) => {
        tracing::event!(
            target: $crate::logging::TARGET,
            tracing::Level::WARN,
            component = $crate::logging::Component::as_str($component),
            $($arg)*
        );
    }
}

#[macro_export]
macro_rules! log_info {
    ($component:expr, $($arg:tt)*) => {
        tracing::event!(
            target: $crate::logging::TARGET,
            tracing::Level::INFO,
            component = $crate::logging::Component::as_str($component),
            $($arg)*
        );
    }
}

#[macro_export]
macro_rules! log_debug {
    ($component:expr, $($arg:tt)*) => {
        tracing::event!(
            target: $crate::logging::TARGET,
            tracing::Level::DEBUG,
            component = $crate::logging::Component::as_str($component),
            $($arg)*
        );
    }
}

#[macro_export]
macro_rules! log_trace {
    ($component:expr, $($arg:tt)*) => {
        tracing::event!(
            target: $crate::logging::TARGET,
            tracing::Level::TRACE,
            component = $crate::logging::Component::as_str($component),
            $($arg)*
        );
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::Debug;
    use std::sync::{Arc, Mutex};

    use tracing::field::{Field, Visit};
    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    use super::*;

    #[derive(Clone, Default)]
    struct Recorded(Arc<Mutex<Vec<(String, tracing::Level, String)>>>);

    struct ComponentField(String);

    impl Visit for ComponentField {
        fn record_str(&mut self, field: &Field, value: &str) {
            if field.name() == "component" {
                self.0 = value.to_string();
            }
        }

        fn record_debug(&mut self, _field: &Field, _value: &dyn Debug) {}
    }

    impl<S: Subscriber> Layer<S> for Recorded {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let mut component = ComponentField(String::new());
            event.record(&mut component);
            let meta = event.metadata();
            self.0
                .lock()
                .unwrap()
                .push((meta.target().to_string(), *meta.level(), component.0));
        }
    }

    #[test]
    fn events_share_target_and_carry_component() {
        let recorded = Recorded::default();
        let subscriber = tracing_subscriber::registry().with(recorded.clone());
        tracing::subscriber::with_default(subscriber, || {
            log_error!(Component::Orchestrator, stage = "ast", "stage failed: {}", "boom");
            log_warn!(Component::Demangler, "demangler fell back");
            log_info!(Component::Server, exit_code = 0, "stage finished");
            log_debug!(Component::Runner, "spawned");
            log_trace!(Component::Cli, "polling");
        });

        let events = recorded.0.lock().unwrap().clone();
        let expected = [
            (tracing::Level::ERROR, "orchestrator"),
            (tracing::Level::WARN, "demangler"),
            (tracing::Level::INFO, "server"),
            (tracing::Level::DEBUG, "runner"),
            (tracing::Level::TRACE, "cli"),
        ];
        assert_eq!(events.len(), expected.len());
        for ((target, level, component), (want_level, want_component)) in
            events.iter().zip(expected)
        {
            assert_eq!(target, TARGET);
            assert_eq!(*level, want_level);
            assert_eq!(component, want_component);
        }
    }

    #[test]
    fn component_names_are_stable() {
        assert_eq!(Component::Runner.to_string(), "runner");
        assert_eq!(Component::Demangler.as_str(), "demangler");
    }
}
