//! # Host Document Contract
//!
//! Naja never touches a concrete DOM. Everything it needs from the host page
//! (element lookup, selector matching, attribute reads, content updates,
//! script insertion and native event subscription) goes through [`Dom`].
//!
//! A browser binding implements this trait over the real document; the
//! in-memory `MemoryDom` in `naja-std` implements it for tests.

use crate::{history::HistoryEntry, request::FormData};
use std::{fmt, sync::Arc};

/// Opaque handle to an element of the host document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

/// Where a native listener is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTarget {
    /// The window object.
    Window,
    /// The document root.
    Document,
    /// A single element.
    Element(ElementId),
}

/// Native event kinds Naja subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeEventKind {
    /// Mouse click.
    Click,
    /// Form submission.
    Submit,
    /// Key press.
    KeyDown,
    /// History navigation.
    PopState,
}

/// Modifier keys held during an input event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Alt / Option.
    pub alt: bool,
    /// Control.
    pub ctrl: bool,
    /// Shift.
    pub shift: bool,
    /// Meta / Command.
    pub meta: bool,
}

impl Modifiers {
    /// Whether any modifier is held.
    pub fn any(&self) -> bool {
        self.alt || self.ctrl || self.shift || self.meta
    }
}

/// Where [`Dom::insert_adjacent_html`] puts the fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    /// Before the first child.
    AfterBegin,
    /// After the last child.
    BeforeEnd,
}

/// A script element extracted from snippet content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    /// Attributes in source order.
    pub attributes: Vec<(String, String)>,
    /// Inline source.
    pub text: String,
}

impl Script {
    /// Attribute lookup.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An event raised by the host page.
#[derive(Debug)]
pub enum NativeEvent {
    /// Click on an element.
    Click {
        /// Innermost element clicked.
        target: ElementId,
        /// Element the listener is attached to, `None` for window/document.
        current_target: Option<ElementId>,
        /// Mouse button, `0` for the primary one.
        button: i16,
        /// Modifier keys.
        modifiers: Modifiers,
        /// Set by [`NativeEvent::prevent_default`].
        default_prevented: std::sync::atomic::AtomicBool,
    },
    /// Submission of a form.
    Submit {
        /// The submitted form.
        target: ElementId,
        /// Element the listener is attached to, `None` for window/document.
        current_target: Option<ElementId>,
        /// The button that triggered the submission.
        submitter: Option<ElementId>,
        /// Set by [`NativeEvent::prevent_default`].
        default_prevented: std::sync::atomic::AtomicBool,
    },
    /// Key press anywhere in the page.
    KeyDown {
        /// Key name, e.g. `"Escape"`.
        key: String,
        /// Modifier keys.
        modifiers: Modifiers,
    },
    /// Browser back/forward navigation.
    PopState {
        /// State stored with the entry, if Naja created it.
        state: Option<HistoryEntry>,
    },
}

impl NativeEvent {
    /// A primary-button click without modifiers.
    pub fn click(target: ElementId, current_target: Option<ElementId>) -> Self {
        NativeEvent::Click {
            target,
            current_target,
            button: 0,
            modifiers: Modifiers::default(),
            default_prevented: Default::default(),
        }
    }

    /// A form submission.
    pub fn submit(
        target: ElementId,
        current_target: Option<ElementId>,
        submitter: Option<ElementId>,
    ) -> Self {
        NativeEvent::Submit {
            target,
            current_target,
            submitter,
            default_prevented: Default::default(),
        }
    }

    /// Event kind.
    pub fn kind(&self) -> NativeEventKind {
        match self {
            NativeEvent::Click { .. } => NativeEventKind::Click,
            NativeEvent::Submit { .. } => NativeEventKind::Submit,
            NativeEvent::KeyDown { .. } => NativeEventKind::KeyDown,
            NativeEvent::PopState { .. } => NativeEventKind::PopState,
        }
    }

    /// Suppress the browser's default action (navigation, submission).
    pub fn prevent_default(&self) {
        match self {
            NativeEvent::Click {
                default_prevented, ..
            }
            | NativeEvent::Submit {
                default_prevented, ..
            } => default_prevented.store(true, std::sync::atomic::Ordering::SeqCst),
            NativeEvent::KeyDown { .. } | NativeEvent::PopState { .. } => {}
        }
    }

    /// Whether [`prevent_default`](Self::prevent_default) was called.
    pub fn default_prevented(&self) -> bool {
        match self {
            NativeEvent::Click {
                default_prevented, ..
            }
            | NativeEvent::Submit {
                default_prevented, ..
            } => default_prevented.load(std::sync::atomic::Ordering::SeqCst),
            NativeEvent::KeyDown { .. } | NativeEvent::PopState { .. } => false,
        }
    }
}

/// Callback attached to the host page.
#[derive(Clone)]
pub struct NativeListener(Arc<dyn Fn(&NativeEvent) + Send + Sync>);

impl NativeListener {
    /// Wrap a callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&NativeEvent) + Send + Sync + 'static,
    {
        Self(Arc::new(callback))
    }

    /// Invoke the callback.
    pub fn call(&self, event: &NativeEvent) {
        (self.0)(event)
    }

    /// Identity comparison, the way the host deduplicates listeners.
    pub fn same(&self, other: &NativeListener) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for NativeListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NativeListener")
            .field(&Arc::as_ptr(&self.0))
            .finish()
    }
}

/// The host document.
///
/// Implementations must tolerate stale [`ElementId`]s: lookups on removed
/// elements return empty values and mutations are ignored.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a host document",
    label = "missing `Dom` implementation",
    note = "Implement `Dom` over the page Naja runs in."
)]
pub trait Dom: Send + Sync + 'static {
    /// Absolute URL of the current page.
    fn location(&self) -> String;

    /// Full page load of `url`.
    fn navigate(&self, url: &str);

    /// Document title.
    fn title(&self) -> String;

    /// Set the document title.
    fn set_title(&self, title: &str);

    /// The document element (`<html>`).
    fn root(&self) -> ElementId;

    /// The `<body>` element.
    fn body(&self) -> ElementId;

    /// Element with the given `id` attribute.
    fn element_by_id(&self, id: &str) -> Option<ElementId>;

    /// Descendants of `root` matching `selector`, in document order.
    fn query_selector_all(&self, root: ElementId, selector: &str) -> Vec<ElementId>;

    /// Whether `element` matches `selector`.
    fn matches(&self, element: ElementId, selector: &str) -> bool;

    /// `element` or its nearest ancestor matching `selector`.
    fn closest(&self, element: ElementId, selector: &str) -> Option<ElementId>;

    /// Lower-case tag name.
    fn tag_name(&self, element: ElementId) -> String;

    /// Attribute value; an empty string for bare attributes.
    fn attribute(&self, element: ElementId, name: &str) -> Option<String>;

    /// Form owning `element` (submit buttons and inputs).
    fn form_of(&self, element: ElementId) -> Option<ElementId>;

    /// Form fields of `form`, including `submitter`'s name/value pair.
    fn form_data(&self, form: ElementId, submitter: Option<ElementId>) -> FormData;

    /// Serialized inner HTML.
    fn inner_html(&self, element: ElementId) -> String;

    /// Replace the content of `element`.
    fn set_inner_html(&self, element: ElementId, html: &str);

    /// Insert a fragment at the start or end of `element`.
    fn insert_adjacent_html(&self, element: ElementId, position: InsertPosition, html: &str);

    /// Append a fresh script element to `<head>` so that it executes.
    fn insert_script(&self, script: &Script);

    /// Attach a native listener. Attaching the same listener twice is a no-op.
    fn add_event_listener(&self, target: EventTarget, kind: NativeEventKind, listener: &NativeListener);

    /// Detach a native listener.
    fn remove_event_listener(
        &self,
        target: EventTarget,
        kind: NativeEventKind,
        listener: &NativeListener,
    );
}
