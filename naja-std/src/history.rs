//! # History Handler
//!
//! Records successful requests in the session history and replays them on
//! back/forward navigation.
//!
//! Every entry stores the URL, the title and, unless the UI cache is off, a
//! snapshot of all snippets. Popping an entry with a snapshot restores the
//! snippets without touching the network; an entry without one is refetched
//! with a `GET` that does not create history itself.
//!
//! The handler owns its own bus:
//!
//! - `buildState` lets listeners amend an entry before it is stored
//! - `restoreState` (cancelable) fires before an entry is replayed

use crate::snippet::SnippetHandler;
use naja_core::{
    Event, EventBus, EventDetail, EventTarget, Extension, HistoryEntry, HistoryMode, Init,
    Interaction, ListenerId, Naja, NativeEvent, NativeEventKind, NativeListener, Options,
    SnippetContent, Success,
    options::{HISTORY, HISTORY_UI_CACHE},
};
use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard, PoisonError},
};
use tracing::debug;

/// `buildState`: an entry is about to be stored.
#[derive(Debug)]
pub struct BuildState {
    /// The entry, may be rewritten.
    pub entry: HistoryEntry,
    /// How it will be stored.
    pub mode: HistoryMode,
}

impl EventDetail for BuildState {
    const TYPE: &'static str = "buildState";
}

/// `restoreState` (cancelable): an entry is about to be replayed.
#[derive(Debug)]
pub struct RestoreState {
    /// The popped entry.
    pub entry: HistoryEntry,
}

impl EventDetail for RestoreState {
    const TYPE: &'static str = "restoreState";
    const CANCELABLE: bool = true;
}

/// Whether the handler is replaying a popped entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryPhase {
    /// Requests create entries.
    #[default]
    Navigating,
    /// A popped entry is being applied.
    Replaying,
}

#[derive(Default)]
struct HistoryState {
    phase: HistoryPhase,
    last_pushed: Option<String>,
}

/// Keeps the session history in sync with AJAX navigation.
pub struct HistoryHandler {
    bus: EventBus,
    ui_cache: bool,
    state: Mutex<HistoryState>,
}

impl Default for HistoryHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryHandler {
    /// Handler storing snippet snapshots.
    pub fn new() -> Self {
        Self {
            bus: EventBus::new(),
            ui_cache: true,
            state: Mutex::default(),
        }
    }

    /// Whether entries carry snippet snapshots unless a request says otherwise.
    pub fn with_ui_cache(mut self, enabled: bool) -> Self {
        self.ui_cache = enabled;
        self
    }

    /// Subscribe to `buildState` or `restoreState`.
    pub fn on<D, F>(&self, listener: F) -> ListenerId
    where
        D: EventDetail,
        F: Fn(&mut Event<D>) + Send + Sync + 'static,
    {
        self.bus.on(listener)
    }

    /// Unsubscribe.
    pub fn off<D: EventDetail>(&self, id: ListenerId) -> bool {
        self.bus.off::<D>(id)
    }

    /// Current phase.
    pub fn phase(&self) -> HistoryPhase {
        self.lock().phase
    }

    fn lock(&self) -> MutexGuard<'_, HistoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn build_entry(&self, naja: &Naja, href: String, ui_cache: bool, mode: HistoryMode) -> HistoryEntry {
        let dom = naja.dom();
        let ui = if ui_cache {
            naja.extension::<SnippetHandler>()
                .map(|snippets| snippets.find_snippets(dom.as_ref()))
        } else {
            None
        };
        let entry = HistoryEntry {
            href,
            title: dom.title(),
            ui,
        };
        self.bus.emit(BuildState { entry, mode }).into_detail().entry
    }

    /// Native `popstate` listener body.
    pub fn handle_pop_state(&self, naja: &Naja, state: Option<&HistoryEntry>) {
        let Some(entry) = state else {
            debug!("popped an entry naja did not create, ignoring");
            return;
        };
        {
            let mut history = self.lock();
            if history.last_pushed.as_deref() == Some(entry.href.as_str())
                && entry.href == naja.dom().location()
            {
                debug!(href = %entry.href, "popped the current entry, ignoring");
                return;
            }
            history.last_pushed = None;
        }

        let mut restore = Event::new(RestoreState {
            entry: entry.clone(),
        });
        if !self.bus.dispatch(&mut restore) {
            debug!(href = %entry.href, "history restore canceled");
            return;
        }
        let entry = restore.into_detail().entry;

        match entry.ui {
            Some(ui) => {
                debug!(href = %entry.href, snippets = ui.len(), "replaying history entry");
                self.lock().phase = HistoryPhase::Replaying;
                if let Some(snippets) = naja.extension::<SnippetHandler>() {
                    let ui: BTreeMap<String, SnippetContent> = ui
                        .into_iter()
                        .map(|(id, html)| (id, SnippetContent::Html(html)))
                        .collect();
                    snippets.update_snippets(naja, &ui, true);
                }
                naja.dom().set_title(&entry.title);
                self.lock().phase = HistoryPhase::Navigating;
                naja.load();
            }
            None => {
                debug!(href = %entry.href, "history entry has no snapshot, refetching");
                let options = Options::new()
                    .with(HISTORY, false)
                    .with(HISTORY_UI_CACHE, false);
                let refetch = naja.clone();
                let href = entry.href;
                naja.spawn_request(async move { refetch.make_request("GET", &href, None, options).await });
            }
        }
    }
}

impl Extension for HistoryHandler {
    fn name(&self) -> &'static str {
        "history"
    }

    fn on_init(&self, naja: &Naja, _event: &mut Event<Init>) {
        let weak = naja.downgrade();
        let listener = NativeListener::new(move |event| {
            let NativeEvent::PopState { state } = event else {
                return;
            };
            let Some(naja) = weak.upgrade() else {
                return;
            };
            if let Some(history) = naja.extension::<HistoryHandler>() {
                history.handle_pop_state(&naja, state.as_ref());
            }
        });
        naja.dom()
            .add_event_listener(EventTarget::Window, NativeEventKind::PopState, &listener);

        let href = naja.dom().location();
        let entry = self.build_entry(naja, href.clone(), self.ui_cache, HistoryMode::Replace);
        naja.history().replace_state(entry.clone(), &entry.title, &href);
        self.lock().last_pushed = Some(href);
    }

    fn on_interaction(&self, _naja: &Naja, event: &mut Event<Interaction>) {
        let directives = &event.detail.directives;
        let history = directives.history;
        let ui_cache = directives.history_ui_cache;
        if let Some(mode) = history {
            event.detail.options.set_default(HISTORY, mode.to_value());
        }
        if let Some(ui_cache) = ui_cache {
            event.detail.options.set_default(HISTORY_UI_CACHE, ui_cache);
        }
    }

    fn on_success(&self, naja: &Naja, event: &mut Event<Success>) {
        let request = &event.detail.request;
        let mode = request.options.history();
        if mode == HistoryMode::Off || self.phase() == HistoryPhase::Replaying {
            return;
        }

        let payload = &event.detail.payload;
        let href = payload
            .url
            .as_ref()
            .filter(|_| payload.post_get)
            .and_then(|url| naja_core::location::resolve(&request.url, url).ok())
            .map_or_else(|| request.url.clone(), String::from);
        let ui_cache = request.options.history_ui_cache().unwrap_or(self.ui_cache);
        let entry = self.build_entry(naja, href, ui_cache, mode);

        let history = naja.history();
        let (title, href) = (entry.title.clone(), entry.href.clone());
        match mode {
            HistoryMode::Replace => history.replace_state(entry, &title, &href),
            HistoryMode::Push | HistoryMode::Off => history.push_state(entry, &title, &href),
        }
        debug!(%href, ?mode, "history entry stored");
        self.lock().last_pushed = Some(href);
    }
}
