//! Deferred-initialization lifecycle for the authorizer.
//!
//! A [`Gate`] starts without an authorizer. Route data and grants usually
//! arrive asynchronously, so every call that needs a real answer is queued
//! until [`Gate::init`] installs one, then drained in FIFO order by a single
//! flusher. Synchronous checks answer `true` while uninitialized.

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use parking_lot::Mutex;
use tokio::sync::{broadcast, oneshot};

use crate::authz::{Authorizer, GrantedPermissions, PermissionRequirement, RouteSpec};
use crate::config::GateConfig;
use crate::errors::{GuardError, GuardResult};
use crate::events::{init_event_bus, publish, EventBus, GateEvent};
use crate::navigation::{BackOptions, NavigateOptions, NavigationKind, NavigationOutcome, NavigationProvider};

/// Eventual result of a gate operation.
///
/// The operation is queued when the method is called, not when the future is
/// first polled. Dropping the future does not cancel it.
pub type Pending<T> = BoxFuture<'static, GuardResult<T>>;

type DeferredTask = Box<dyn FnOnce(Arc<Authorizer>) -> BoxFuture<'static, ()> + Send>;

#[derive(Default)]
struct GateState {
    authorizer: Option<Arc<Authorizer>>,
    queue: VecDeque<DeferredTask>,
    flushing: bool,
}

struct Shared {
    state: Mutex<GateState>,
    provider: Arc<dyn NavigationProvider>,
    config: GateConfig,
    events: EventBus,
}

/// Cloneable handle to one authorization lifecycle.
#[derive(Clone)]
pub struct Gate {
    shared: Arc<Shared>,
}

impl Gate {
    pub fn new(provider: Arc<dyn NavigationProvider>) -> Self {
        Self::with_config(provider, GateConfig::default())
    }

    pub fn with_config(provider: Arc<dyn NavigationProvider>, config: GateConfig) -> Self {
        let events = init_event_bus(config.event_capacity);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(GateState::default()),
                provider,
                config,
                events,
            }),
        }
    }

    /// Installs a fresh authorizer, replacing any previous one, and starts
    /// draining deferred operations against it.
    ///
    /// The drain runs on the current tokio runtime. Outside a runtime the
    /// queue stays put until [`Gate::flush`] is awaited.
    pub fn init(&self, routes: Vec<RouteSpec>, granted: GrantedPermissions) {
        let route_count = routes.len();
        let authorizer = Authorizer::new(routes, granted, Arc::clone(&self.shared.provider))
            .with_config(&self.shared.config);

        let (replaced, queued) = {
            let mut state = self.shared.state.lock();
            let replaced = state.authorizer.replace(Arc::new(authorizer)).is_some();
            (replaced, state.queue.len())
        };

        tracing::info!(routes = route_count, queued, replaced, "gate initialized");
        self.spawn_flush();
        publish(&self.shared.events, GateEvent::Initialized);
    }

    pub fn is_initialized(&self) -> bool {
        self.shared.state.lock().authorizer.is_some()
    }

    /// Number of operations waiting for the drain.
    pub fn pending(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GateEvent> {
        self.shared.events.subscribe()
    }

    /// Current grants, if an authorizer is installed.
    pub fn granted_permissions(&self) -> Option<Arc<GrantedPermissions>> {
        self.authorizer().map(|authorizer| authorizer.granted_permissions())
    }

    /// Replaces the grants now, or once the gate is initialized.
    pub fn update_granted_permissions(&self, next: GrantedPermissions) -> Pending<()> {
        let events = self.shared.events.clone();
        self.live_or_defer("update_granted_permissions", move |authorizer| {
            authorizer.update_granted_permissions(next);
            publish(&events, GateEvent::PermissionsUpdated);
            future::ready(Ok(())).boxed()
        })
    }

    /// Optimistic check: `true` until an authorizer is installed.
    pub fn authorize_route(&self, route_id: &str) -> bool {
        match self.authorizer() {
            Some(authorizer) => authorizer.authorize_route(route_id),
            None => true,
        }
    }

    /// The real answer, waiting for initialization if needed.
    pub fn authorize_route_async(&self, route_id: impl Into<String>) -> Pending<bool> {
        let route_id = route_id.into();
        self.live_or_defer("authorize_route", move |authorizer| {
            future::ready(Ok(authorizer.authorize_route(&route_id))).boxed()
        })
    }

    /// `true` until an authorizer is installed.
    pub fn check_requirements(&self, requirements: &[PermissionRequirement], match_any: bool) -> bool {
        match self.authorizer() {
            Some(authorizer) => authorizer.check_requirements(requirements, match_any),
            None => true,
        }
    }

    pub fn navigate(&self, kind: NavigationKind, options: NavigateOptions) -> Pending<NavigationOutcome> {
        self.live_or_defer(kind.as_str(), move |authorizer| {
            async move { authorizer.navigate(kind, options).await }.boxed()
        })
    }

    pub fn navigate_forward(&self, options: NavigateOptions) -> Pending<NavigationOutcome> {
        self.navigate(NavigationKind::Forward, options)
    }

    pub fn navigate_replace(&self, options: NavigateOptions) -> Pending<NavigationOutcome> {
        self.navigate(NavigationKind::Replace, options)
    }

    pub fn navigate_switch_tab(&self, options: NavigateOptions) -> Pending<NavigationOutcome> {
        self.navigate(NavigationKind::SwitchTab, options)
    }

    /// Never queued and never checked. Before initialization the provider is
    /// called directly and its failure is passed through.
    pub fn navigate_back(&self, options: BackOptions) -> Pending<NavigationOutcome> {
        match self.authorizer() {
            Some(authorizer) => async move { Ok(authorizer.navigate_back(options).await) }.boxed(),
            None => {
                let provider = Arc::clone(&self.shared.provider);
                async move { provider.back(options).await.map_err(GuardError::from) }.boxed()
            }
        }
    }

    /// Queues `op` behind every earlier deferred operation, even when the
    /// gate is already initialized.
    pub fn defer<T, F>(&self, op: F) -> Pending<T>
    where
        T: Send + 'static,
        F: FnOnce(Arc<Authorizer>) -> Pending<T> + Send + 'static,
    {
        let (task, pending) = deferred(op);
        let initialized = {
            let mut state = self.shared.state.lock();
            state.queue.push_back(task);
            tracing::debug!(operation = "defer", queued = state.queue.len(), "operation queued");
            state.authorizer.is_some()
        };

        if initialized {
            self.spawn_flush();
        }
        pending
    }

    /// Drains the queue against the current authorizer until it is empty,
    /// including operations queued while draining.
    ///
    /// Returns immediately if another drain is running or the gate is not
    /// initialized.
    pub async fn flush(&self) {
        {
            let mut state = self.shared.state.lock();
            if state.flushing || state.authorizer.is_none() {
                return;
            }
            state.flushing = true;
        }

        let mut guard = FlushGuard { gate: self, armed: true };
        let mut drained = 0usize;

        loop {
            let step = {
                let mut state = self.shared.state.lock();
                let authorizer = state.authorizer.clone();
                let step = authorizer.and_then(|authorizer| state.queue.pop_front().map(|task| (task, authorizer)));
                if step.is_none() {
                    state.flushing = false;
                }
                step
            };

            let Some((task, authorizer)) = step else {
                guard.armed = false;
                break;
            };

            let run = async move { task(authorizer).await };
            if AssertUnwindSafe(run).catch_unwind().await.is_err() {
                tracing::error!("deferred operation panicked");
            }
            drained += 1;
        }

        if drained > 0 {
            tracing::debug!(drained, "deferred operations flushed");
        }
    }

    fn authorizer(&self) -> Option<Arc<Authorizer>> {
        self.shared.state.lock().authorizer.clone()
    }

    /// Runs `op` against the live authorizer, or queues it when there is none.
    fn live_or_defer<T, F>(&self, operation: &'static str, op: F) -> Pending<T>
    where
        T: Send + 'static,
        F: FnOnce(Arc<Authorizer>) -> Pending<T> + Send + 'static,
    {
        let mut state = self.shared.state.lock();
        if let Some(authorizer) = state.authorizer.clone() {
            drop(state);
            return op(authorizer);
        }

        let (task, pending) = deferred(op);
        state.queue.push_back(task);
        tracing::debug!(operation, queued = state.queue.len(), "gate not initialized, operation deferred");
        pending
    }

    fn spawn_flush(&self) {
        let gate = self.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { gate.flush().await });
            }
            Err(_) => {
                tracing::warn!("no async runtime available, deferred operations wait for Gate::flush");
            }
        }
    }
}

impl std::fmt::Debug for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Gate")
            .field("initialized", &state.authorizer.is_some())
            .field("queued", &state.queue.len())
            .field("flushing", &state.flushing)
            .field("config", &self.shared.config)
            .finish()
    }
}

/// Wraps `op` so that running it settles the returned future.
fn deferred<T, F>(op: F) -> (DeferredTask, Pending<T>)
where
    T: Send + 'static,
    F: FnOnce(Arc<Authorizer>) -> Pending<T> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let task: DeferredTask = Box::new(move |authorizer| {
        async move {
            let result = op(authorizer).await;
            // the caller may have stopped waiting
            let _ = tx.send(result);
        }
        .boxed()
    });
    let pending = async move { rx.await.unwrap_or(Err(GuardError::Abandoned)) }.boxed();
    (task, pending)
}

/// Releases the flushing flag if a drain is dropped part way through.
struct FlushGuard<'a> {
    gate: &'a Gate,
    armed: bool,
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let remaining = {
            let mut state = self.gate.shared.state.lock();
            state.flushing = false;
            state.queue.len()
        };

        tracing::warn!(remaining, "flush interrupted before the queue drained");
        if remaining > 0 {
            self.gate.spawn_flush();
        }
    }
}
