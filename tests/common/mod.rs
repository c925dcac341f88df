//! Shared components and helpers for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use scaffolder::lifecycle::application::{with_grace_period, with_signals};
use scaffolder::registry::{BoxError, Component, Configurable, Mutator, Start, Stop, Validate};
use scaffolder::{Application, State};

/// Ordered log of lifecycle hook calls, shared between components.
#[derive(Clone, Default)]
pub struct Events(Arc<Mutex<Vec<String>>>);

impl Events {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Only the events starting with `prefix`.
    pub fn with_prefix(&self, prefix: &str) -> Vec<String> {
        self.snapshot()
            .into_iter()
            .filter(|e| e.starts_with(prefix))
            .collect()
    }
}

#[derive(Clone, Copy, Debug)]
pub enum OnStart {
    /// Run until the context is cancelled.
    Block,
    /// Return success right away.
    Return,
    /// Return an error right away.
    Fail(&'static str),
}

#[derive(Clone, Copy, Debug)]
pub enum OnStop {
    Succeed,
    Fail(&'static str),
    /// Never return.
    Hang,
}

/// Component recording `start:<label>` and `stop:<label>` events.
pub struct Probe {
    label: &'static str,
    events: Events,
    on_start: OnStart,
    on_stop: OnStop,
    valid: bool,
}

impl Probe {
    pub fn new(label: &'static str, events: &Events) -> Self {
        Self {
            label,
            events: events.clone(),
            on_start: OnStart::Block,
            on_stop: OnStop::Succeed,
            valid: true,
        }
    }

    pub fn on_start(mut self, behavior: OnStart) -> Self {
        self.on_start = behavior;
        self
    }

    pub fn on_stop(mut self, behavior: OnStop) -> Self {
        self.on_stop = behavior;
        self
    }

    pub fn invalid(mut self) -> Self {
        self.valid = false;
        self
    }
}

impl Configurable for Probe {}

impl Component for Probe {
    fn as_validate(&self) -> Option<&dyn Validate> {
        Some(self)
    }

    fn as_start(&self) -> Option<&dyn Start> {
        Some(self)
    }

    fn as_stop(&self) -> Option<&dyn Stop> {
        Some(self)
    }
}

impl Validate for Probe {
    fn validate(&self) -> Result<(), BoxError> {
        self.events.push(format!("validate:{}", self.label));
        if self.valid {
            Ok(())
        } else {
            Err(format!("{} is misconfigured", self.label).into())
        }
    }
}

#[async_trait]
impl Start for Probe {
    async fn start(&self, ctx: CancellationToken) -> Result<(), BoxError> {
        self.events.push(format!("start:{}", self.label));
        match self.on_start {
            OnStart::Block => {
                ctx.cancelled().await;
                Ok(())
            }
            OnStart::Return => Ok(()),
            OnStart::Fail(message) => Err(message.into()),
        }
    }
}

#[async_trait]
impl Stop for Probe {
    async fn stop(&self, _ctx: CancellationToken) -> Result<(), BoxError> {
        self.events.push(format!("stop:{}", self.label));
        match self.on_stop {
            OnStop::Succeed => Ok(()),
            OnStop::Fail(message) => Err(message.into()),
            OnStop::Hang => std::future::pending().await,
        }
    }
}

/// An application that ignores process signals, with the given grace period.
pub fn test_app(grace: Duration, extra: &[Mutator]) -> Application {
    let mut mutators = vec![with_signals(false), with_grace_period(grace)];
    mutators.extend_from_slice(extra);
    Application::new(&mutators).unwrap()
}

/// Cancel `ctx` once the application reports Running.
pub fn cancel_when_running(app: &Application, ctx: &CancellationToken) {
    let mut states = app.watch_state();
    let ctx = ctx.clone();
    tokio::spawn(async move {
        if states.wait_for(|s| *s == State::Running).await.is_ok() {
            ctx.cancel();
        }
    });
}

/// Minimal HTTP/1.1 GET over a raw TCP stream, returning status code and body.
pub async fn http_get(addr: std::net::SocketAddr, path: &str) -> (u16, String) {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let raw = String::from_utf8_lossy(&raw).into_owned();

    let status = raw
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .unwrap();
    let body = raw
        .split_once("\r\n\r\n")
        .map(|(_, body)| body.to_string())
        .unwrap_or_default();
    (status, body)
}
