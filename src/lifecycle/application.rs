//! Application lifecycle.
//!
//! An application compiles its inventory, validates every component that
//! can validate itself, then starts every startable component in
//! registration order. It runs until its context is cancelled, an
//! interruption signal arrives, or a start hook fails. Stop hooks are then
//! called in reverse registration order, each within the grace period.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::lifecycle::signals::{self, Signals};
use crate::lifecycle::types::{LifecycleError, LifecycleResult, State};
use crate::lifecycle::{shutdown, startup};
use crate::registry::{init, BindingPolicy, Component, Configurable, Inventory, Mutator};

/// Grace period given to each stop hook unless configured otherwise.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(1);

/// An application made of registered components.
pub struct Application {
    name: String,
    version: String,
    grace_period: Duration,
    handle_signals: bool,
    inventory: Inventory,
    state: watch::Sender<State>,
}

impl Configurable for Application {
    fn defaults(&mut self) {
        self.name = binary_name();
        self.version = "0.0.0".to_string();
        self.grace_period = DEFAULT_GRACE_PERIOD;
        self.handle_signals = true;
        self.inventory = Inventory::new();
    }
}

impl fmt::Display for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.version)
    }
}

impl Application {
    /// Build an application and customize it with the given mutators.
    pub fn new(mutators: &[Mutator]) -> LifecycleResult<Self> {
        let (state, _) = watch::channel(State::Created);
        let mut app = Self {
            name: String::new(),
            version: String::new(),
            grace_period: DEFAULT_GRACE_PERIOD,
            handle_signals: true,
            inventory: Inventory::new(),
            state,
        };
        init(&mut app, mutators)?;
        Ok(app)
    }

    /// Register a component; see `Inventory::add`.
    pub fn register<T: Component>(&mut self, component: T, mutators: &[Mutator]) -> &mut Self {
        self.inventory.add(component, mutators);
        self
    }

    /// Register an already-shared component; see `Inventory::add_arc`.
    pub fn register_arc<T: Component>(&mut self, component: Arc<T>, mutators: &[Mutator]) -> &mut Self {
        self.inventory.add_arc(component, mutators);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn state(&self) -> State {
        *self.state.borrow()
    }

    /// Observe state transitions, including while `run` is in progress.
    pub fn watch_state(&self) -> watch::Receiver<State> {
        self.state.subscribe()
    }

    fn transition(&self, state: State) {
        tracing::info!(application = %self, state = %state, "Application state changed");
        self.state.send_replace(state);
    }

    fn validate(&self) -> LifecycleResult<()> {
        for container in self.inventory.containers() {
            let Some(validator) = container.component().and_then(|c| c.as_validate()) else {
                continue;
            };
            validator
                .validate()
                .map_err(|source| LifecycleError::Validation {
                    component: container.name().to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Run the application until `ctx` is cancelled, an interruption signal
    /// arrives, or a component fails while running.
    ///
    /// Returns the runtime failure if there was one, otherwise the first stop failure.
    pub async fn run(mut self, ctx: CancellationToken) -> LifecycleResult<()> {
        tracing::info!(
            application = %self,
            components = self.inventory.len(),
            grace_period = ?self.grace_period,
            "Application starting"
        );

        self.inventory.compile()?;
        self.transition(State::Compiled);
        self.validate()?;
        self.transition(State::Validated);

        let mut interrupts = if self.handle_signals {
            Some(Signals::install().map_err(LifecycleError::Signal)?)
        } else {
            None
        };

        let run_ctx = ctx.child_token();
        let (errors_tx, mut errors_rx) = mpsc::unbounded_channel();
        let mut launched = startup::launch(
            self.inventory.containers(),
            &ctx,
            &run_ctx,
            &errors_tx,
            &mut interrupts,
        )
        .await;
        drop(errors_tx);

        let mut result = Ok(());
        if launched.interrupted.is_none() {
            self.transition(State::Running);
            result = wait(&ctx, &mut interrupts, &mut errors_rx).await;
        }

        self.transition(State::Stopping);
        run_ctx.cancel();
        let stops = std::mem::take(&mut launched.stops);
        let stopped = shutdown::stop_all(&stops, self.grace_period).await;
        if result.is_ok() {
            result = stopped;
        }
        launched.drain(self.grace_period).await;

        self.transition(State::Terminated);
        match &result {
            Ok(()) => tracing::info!(application = %self, "Shutdown complete"),
            Err(err) => tracing::error!(application = %self, error = %err, "Application failed"),
        }
        result
    }
}

/// Block until cancellation, a signal, or the first runtime failure.
async fn wait(
    ctx: &CancellationToken,
    interrupts: &mut Option<Signals>,
    errors: &mut mpsc::UnboundedReceiver<LifecycleError>,
) -> LifecycleResult<()> {
    let mut errors_open = true;
    loop {
        tokio::select! {
            _ = ctx.cancelled() => {
                tracing::info!("Context cancelled, shutting down");
                return Ok(());
            }
            signal = signals::recv(interrupts) => {
                tracing::info!(signal, "Signal received, shutting down");
                return Ok(());
            }
            err = errors.recv(), if errors_open => match err {
                Some(err) => return Err(err),
                None => errors_open = false,
            },
        }
    }
}

fn binary_name() -> String {
    std::env::args()
        .next()
        .and_then(|arg| {
            Path::new(&arg)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
}

/// Set the application name; defaults to the binary name.
pub fn with_name(name: impl Into<String>) -> Mutator {
    let name = name.into();
    Mutator::new(move |app: &mut Application| {
        app.name = name.clone();
        Ok(())
    })
}

/// Set the application version; defaults to `0.0.0`.
pub fn with_version(version: impl Into<String>) -> Mutator {
    let version = version.into();
    Mutator::new(move |app: &mut Application| {
        app.version = version.clone();
        Ok(())
    })
}

/// Set the time allotted to each stop hook. The default is one second.
pub fn with_grace_period(grace_period: Duration) -> Mutator {
    Mutator::new(move |app: &mut Application| {
        if grace_period.is_zero() {
            return Err("grace period must be greater than zero".into());
        }
        app.grace_period = grace_period;
        Ok(())
    })
}

/// Enable or disable SIGINT/SIGTERM handling.
pub fn with_signals(enabled: bool) -> Mutator {
    Mutator::new(move |app: &mut Application| {
        app.handle_signals = enabled;
        Ok(())
    })
}

pub fn with_binding_policy(policy: BindingPolicy) -> Mutator {
    Mutator::new(move |app: &mut Application| {
        app.inventory.set_policy(policy);
        Ok(())
    })
}

/// Register a component as part of the application's construction.
///
/// The mutator keeps a reference to `component`, so component-level mutators
/// cannot be applied here; use `Application::register` for those.
pub fn with_component<T: Component>(component: Arc<T>, mutators: Vec<Mutator>) -> Mutator {
    Mutator::new(move |app: &mut Application| {
        app.inventory.add_arc(component.clone(), &mutators);
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::with_name as named;

    struct Plain;
    impl Configurable for Plain {}
    impl Component for Plain {}

    #[test]
    fn test_defaults() {
        let app = Application::new(&[]).unwrap();
        assert_eq!(app.version(), "0.0.0");
        assert_eq!(app.grace_period(), Duration::from_secs(1));
        assert!(!app.name().is_empty());
        assert_eq!(app.state(), State::Created);
        assert!(app.inventory().is_empty());
    }

    #[test]
    fn test_mutators() {
        let app = Application::new(&[
            with_name("billing"),
            with_version("1.2.3"),
            with_grace_period(Duration::from_millis(250)),
            with_binding_policy(BindingPolicy::Strict),
            with_component(Arc::new(Plain), vec![named("plain")]),
        ])
        .unwrap();

        assert_eq!(app.to_string(), "billing (1.2.3)");
        assert_eq!(app.grace_period(), Duration::from_millis(250));
        assert_eq!(app.inventory().policy(), BindingPolicy::Strict);
        assert_eq!(app.inventory().containers()[0].name(), "plain");
    }

    #[test]
    fn test_zero_grace_period_is_rejected() {
        let err = Application::new(&[with_grace_period(Duration::ZERO)]).err().unwrap();
        assert!(matches!(err, LifecycleError::Config(_)));
    }
}
