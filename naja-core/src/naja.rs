//! # Dispatcher
//!
//! [`Naja`] is the context object handed to every extension and the
//! orchestrator of one request's lifecycle:
//!
//! 1. merge caller options over the defaults,
//! 2. fire `before` (cancelable),
//! 3. freeze the [`Request`] and fire `start` with its abort handle,
//! 4. await the transport, then fire `success` or `error`,
//! 5. fire `complete` and `load`.
//!
//! Steps 3 to 5 always run to completion: a transport failure, an abort and
//! even dropping the request future all end in exactly one `complete`.

use crate::{
    bus::{Event, EventBus, EventDetail, ListenerId, ListenerOptions},
    dom::Dom,
    error::NajaError,
    events::{Before, Complete, Failure, Init, Load, Start, Success},
    extension::{Extension, LifecycleEvent},
    history::HistoryApi,
    location,
    options::Options,
    payload::Payload,
    request::{FormData, HttpResponse, Request, RequestId},
    spawn::Spawn,
    transport::DynTransport,
};
use futures::future::{AbortHandle, Abortable, Aborted};
use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    future::Future,
    sync::{
        Arc, Mutex, PoisonError, Weak,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

/// Header marking requests as asynchronous for the server.
pub const REQUESTED_WITH: (&str, &str) = ("X-Requested-With", "XMLHttpRequest");

/// The collaborators Naja runs against.
#[derive(Clone)]
pub struct Environment {
    /// Host document.
    pub dom: Arc<dyn Dom>,
    /// Session history.
    pub history: Arc<dyn HistoryApi>,
    /// Network transport.
    pub transport: Arc<dyn DynTransport>,
    /// Background scheduler.
    pub spawner: Arc<dyn Spawn>,
}

struct Inner {
    bus: EventBus,
    extensions: Vec<Arc<dyn Extension>>,
    registry: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    default_options: Mutex<Options>,
    env: Environment,
    initialized: AtomicBool,
    next_request: AtomicU64,
}

/// The request dispatcher and extension context.
///
/// Cloning is cheap; all clones share the same state.
#[derive(Clone)]
pub struct Naja {
    inner: Arc<Inner>,
}

/// A non-owning reference to [`Naja`].
#[derive(Clone, Default)]
pub struct WeakNaja(Weak<Inner>);

impl WeakNaja {
    /// Upgrade if Naja is still alive.
    pub fn upgrade(&self) -> Option<Naja> {
        self.0.upgrade().map(|inner| Naja { inner })
    }
}

impl fmt::Debug for WeakNaja {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakNaja")
            .field("alive", &(self.0.strong_count() > 0))
            .finish()
    }
}

impl fmt::Debug for Naja {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Naja")
            .field("initialized", &self.is_initialized())
            .field(
                "extensions",
                &self
                    .inner
                    .extensions
                    .iter()
                    .map(|e| e.name())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Builder resolving the ordered extension list into a [`Naja`] instance.
pub struct NajaBuilder {
    env: Environment,
    default_options: Options,
    extensions: Vec<Arc<dyn Extension>>,
    registry: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl NajaBuilder {
    /// Start from a set of collaborators.
    pub fn new(env: Environment) -> Self {
        Self {
            env,
            default_options: Options::new(),
            extensions: Vec::new(),
            registry: HashMap::new(),
        }
    }

    /// Options every request starts from.
    pub fn default_options(mut self, options: Options) -> Self {
        self.default_options = options;
        self
    }

    /// Register an extension. Hooks run in registration order.
    ///
    /// Registering a second extension of the same type keeps both in the
    /// hook order, but [`Naja::extension`] returns the last one.
    pub fn extension<E: Extension>(mut self, extension: E) -> Self {
        let extension = Arc::new(extension);
        self.registry
            .insert(TypeId::of::<E>(), extension.clone() as Arc<dyn Any + Send + Sync>);
        self.extensions.push(extension);
        self
    }

    /// Finish construction. Call [`Naja::initialize`] once the page is ready.
    pub fn build(self) -> Naja {
        Naja {
            inner: Arc::new(Inner {
                bus: EventBus::new(),
                extensions: self.extensions,
                registry: self.registry,
                default_options: Mutex::new(self.default_options),
                env: self.env,
                initialized: AtomicBool::new(false),
                next_request: AtomicU64::new(1),
            }),
        }
    }
}

impl Naja {
    /// Start building an instance.
    pub fn builder(env: Environment) -> NajaBuilder {
        NajaBuilder::new(env)
    }

    /// A non-owning handle.
    pub fn downgrade(&self) -> WeakNaja {
        WeakNaja(Arc::downgrade(&self.inner))
    }

    /// Fire `init`, then `load`.
    ///
    /// `init` listeners may amend the default options.
    pub fn initialize(&self) -> Result<(), NajaError> {
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            return Err(NajaError::AlreadyInitialized);
        }

        let mut event = Event::new(Init {
            default_options: self.default_options(),
        });
        self.dispatch(&mut event);
        self.set_default_options(event.into_detail().default_options);
        tracing::debug!(extensions = self.inner.extensions.len(), "naja initialized");

        self.load();
        Ok(())
    }

    /// Whether [`initialize`](Self::initialize) has run.
    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::SeqCst)
    }

    /// Fire `load`.
    pub fn load(&self) {
        self.dispatch(&mut Event::new(Load));
    }

    /// Host document.
    pub fn dom(&self) -> &Arc<dyn Dom> {
        &self.inner.env.dom
    }

    /// Session history.
    pub fn history(&self) -> &Arc<dyn HistoryApi> {
        &self.inner.env.history
    }

    /// Background scheduler.
    pub fn spawner(&self) -> &Arc<dyn Spawn> {
        &self.inner.env.spawner
    }

    /// The registered extension of type `E`.
    pub fn extension<E: Extension>(&self) -> Option<Arc<E>> {
        self.inner
            .registry
            .get(&TypeId::of::<E>())
            .and_then(|extension| extension.clone().downcast::<E>().ok())
    }

    /// Current default options.
    pub fn default_options(&self) -> Options {
        self.inner
            .default_options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the default options.
    pub fn set_default_options(&self, options: Options) {
        *self
            .inner
            .default_options
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = options;
    }

    /// Merge `options` over the defaults.
    pub fn prepare_options(&self, options: Options) -> Options {
        Options::merge(&self.default_options(), options)
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Subscribe to a lifecycle event.
    pub fn on<D, F>(&self, listener: F) -> ListenerId
    where
        D: EventDetail,
        F: Fn(&mut Event<D>) + Send + Sync + 'static,
    {
        self.inner.bus.on(listener)
    }

    /// Subscribe with explicit registration flags.
    pub fn add_listener<D, F>(&self, listener: F, options: ListenerOptions) -> ListenerId
    where
        D: EventDetail,
        F: Fn(&mut Event<D>) + Send + Sync + 'static,
    {
        self.inner.bus.add_listener(listener, options)
    }

    /// Unsubscribe.
    pub fn off<D: EventDetail>(&self, id: ListenerId) -> bool {
        self.inner.bus.off::<D>(id)
    }

    /// Run extension hooks, then bus listeners.
    ///
    /// Returns `false` if the event is cancelable and was canceled.
    pub fn dispatch<D: LifecycleEvent>(&self, event: &mut Event<D>) -> bool {
        tracing::trace!(event = D::TYPE, "dispatching");
        for extension in &self.inner.extensions {
            if event.propagation_stopped() {
                break;
            }
            D::notify(extension.as_ref(), self, event);
        }
        self.inner.bus.dispatch(event)
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Run one request through the full lifecycle.
    ///
    /// Resolves with an empty payload when a `before` listener cancels the
    /// request. Failures are returned here and also delivered through the
    /// `error` and `complete` events.
    pub async fn make_request(
        &self,
        method: &str,
        url: &str,
        data: Option<FormData>,
        options: Options,
    ) -> Result<Payload, NajaError> {
        let options = self.prepare_options(options);
        let mut headers = vec![(REQUESTED_WITH.0.to_owned(), REQUESTED_WITH.1.to_owned())];
        headers.extend(options.headers());

        let mut before = Event::new(Before {
            method: method.to_ascii_uppercase(),
            url: url.to_owned(),
            data,
            headers,
            options,
        });
        if !self.dispatch(&mut before) {
            tracing::debug!(method, url, "request canceled by a before listener");
            return Ok(Payload::default());
        }

        let Before {
            method,
            url,
            data,
            headers,
            options,
        } = before.into_detail();
        let url = location::resolve(&self.dom().location(), &url)?;

        let request = Arc::new(Request {
            id: RequestId(self.inner.next_request.fetch_add(1, Ordering::Relaxed)),
            method: method.to_ascii_uppercase(),
            url: url.into(),
            data,
            headers,
            options: Arc::new(options),
        });
        tracing::debug!(
            request_id = %request.id,
            method = %request.method,
            url = %request.url,
            "request started"
        );

        let (abort, registration) = AbortHandle::new_pair();
        let in_flight = InFlight::new(self.clone(), request.clone());
        self.dispatch(&mut Event::new(Start {
            request: request.clone(),
            abort,
        }));

        let send = send(self.inner.env.transport.clone(), request.clone());
        let outcome = match Abortable::new(send, registration).await {
            Ok(outcome) => outcome,
            Err(Aborted) => Err(NajaError::Aborted),
        };
        in_flight.settle(outcome)
    }

    /// Schedule a request nobody awaits.
    ///
    /// Failures are only observable through the `error` and `complete`
    /// events; the returned error is logged and dropped.
    pub fn spawn_request<F>(&self, request: F)
    where
        F: Future<Output = Result<Payload, NajaError>> + Send + 'static,
    {
        self.spawner().spawn(Box::pin(async move {
            if let Err(error) = request.await {
                tracing::debug!(%error, "detached request failed; reported via error event");
            }
        }));
    }

    fn complete(
        &self,
        request: Arc<Request>,
        response: Option<HttpResponse>,
        payload: Option<Payload>,
        error: Option<NajaError>,
    ) {
        tracing::debug!(
            request_id = %request.id,
            success = error.is_none(),
            "request complete"
        );
        self.dispatch(&mut Event::new(Complete {
            request,
            response,
            payload,
            error,
        }));
        self.load();
    }
}

/// Transport call with the timeout and attempts policy of the request.
async fn send(
    transport: Arc<dyn DynTransport>,
    request: Arc<Request>,
) -> Result<HttpResponse, NajaError> {
    let attempts = request.options.attempts();
    let mut attempt = 1;
    loop {
        let sent = transport.send_dyn(&request);
        let result = match request.options.timeout() {
            Some(limit) if tokio::runtime::Handle::try_current().is_ok() => {
                match tokio::time::timeout(limit, sent).await {
                    Ok(result) => result.map_err(NajaError::from),
                    Err(_) => Err(NajaError::Timeout(limit)),
                }
            }
            Some(limit) => {
                tracing::warn!(
                    request_id = %request.id,
                    ?limit,
                    "no Tokio runtime to time the transport; timeout not enforced"
                );
                sent.await.map_err(NajaError::from)
            }
            None => sent.await.map_err(NajaError::from),
        };

        match result {
            Ok(response) => return Ok(response),
            Err(error) if error.is_retryable() && attempt < attempts => {
                tracing::debug!(
                    request_id = %request.id,
                    attempt,
                    attempts,
                    %error,
                    "transport attempt failed, retrying"
                );
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}

/// Guarantees `complete` for a started request.
///
/// If the request future is dropped before the transport settles, the
/// request is reported as aborted.
struct InFlight {
    naja: Naja,
    request: Arc<Request>,
    settled: bool,
}

impl InFlight {
    fn new(naja: Naja, request: Arc<Request>) -> Self {
        Self {
            naja,
            request,
            settled: false,
        }
    }

    fn settle(
        mut self,
        outcome: Result<HttpResponse, NajaError>,
    ) -> Result<Payload, NajaError> {
        self.settled = true;
        let naja = self.naja.clone();
        let request = self.request.clone();

        let result = match outcome {
            Err(error) => Err((error, None)),
            Ok(response) if !response.is_success() => Err((
                NajaError::Http {
                    status: response.status,
                    url: response.url.clone(),
                },
                Some(response),
            )),
            Ok(response) => match Payload::parse(&response.body) {
                Ok(payload) => Ok((response, payload)),
                Err(error) => Err((error, Some(response))),
            },
        };

        match result {
            Ok((response, payload)) => {
                naja.dispatch(&mut Event::new(Success {
                    request: request.clone(),
                    response: response.clone(),
                    payload: payload.clone(),
                }));
                naja.complete(request, Some(response), Some(payload.clone()), None);
                Ok(payload)
            }
            Err((error, response)) => {
                tracing::debug!(request_id = %request.id, %error, "request failed");
                naja.dispatch(&mut Event::new(Failure {
                    request: request.clone(),
                    error: error.clone(),
                    response: response.clone(),
                }));
                naja.complete(request, response, None, Some(error.clone()));
                Err(error)
            }
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        tracing::debug!(request_id = %self.request.id, "request future dropped before settling");
        self.naja.dispatch(&mut Event::new(Failure {
            request: self.request.clone(),
            error: NajaError::Aborted,
            response: None,
        }));
        self.naja
            .complete(self.request.clone(), None, None, Some(NajaError::Aborted));
    }
}
