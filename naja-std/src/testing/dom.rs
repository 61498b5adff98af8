use super::{
    html::{Node, Tree},
    selector::Selector,
};
use naja_core::{
    Dom, ElementId, EventTarget, FormData, HistoryApi, HistoryEntry, InsertPosition, Modifiers,
    NativeEvent, NativeEventKind, NativeListener, Script, location,
};
use std::sync::{Mutex, MutexGuard, PoisonError};

// ============================================================================
// Memory DOM
// ============================================================================

/// An in-memory document and session history.
///
/// Implements [`Dom`] and [`HistoryApi`] and simulates the user: clicks,
/// submissions, key presses and back/forward navigation dispatch native
/// events to the attached listeners and run the browser's default action
/// unless a listener prevented it.
///
/// # Example
///
/// ```rust,ignore
/// let dom = Arc::new(MemoryDom::new(
///     "https://example.com/",
///     r#"<a id="go" class="ajax" href="/next">next</a>"#,
/// ));
/// dom.click(dom.element("go"));
/// ```
pub struct MemoryDom {
    state: Mutex<State>,
}

struct State {
    tree: Tree,
    document: u64,
    html: u64,
    head: u64,
    body: u64,
    location: String,
    listeners: Vec<(EventTarget, NativeEventKind, NativeListener)>,
    entries: Vec<(Option<HistoryEntry>, String)>,
    current: usize,
    navigations: Vec<String>,
    scripts: Vec<Script>,
}

impl State {
    fn resolve(&self, url: &str) -> String {
        location::resolve(&self.location, url).map_or_else(|_| url.to_owned(), String::from)
    }

    fn find(&self, root: u64, selector: &Selector) -> Vec<u64> {
        self.tree
            .descendants(root)
            .into_iter()
            .filter(|id| self.tree.get(*id).is_some_and(|e| selector.matches(e)))
            .collect()
    }

    fn title_element(&self) -> Option<u64> {
        self.find(self.document, &Selector::parse("title")).first().copied()
    }
}

impl MemoryDom {
    /// Parse a document located at `url`.
    ///
    /// `html` may be a full document or just body content; missing `<html>`,
    /// `<head>` and `<body>` elements are created.
    pub fn new(url: impl Into<String>, html: &str) -> Self {
        let url = url.into();
        let mut tree = Tree::default();
        let document = tree.create("#document", Vec::new());
        let nodes = tree.parse_fragment(document, html);
        if let Some(element) = tree.get_mut(document) {
            element.children = nodes;
        }

        let first = |tree: &Tree, tag: &str| {
            tree.descendants(document)
                .into_iter()
                .find(|id| tree.get(*id).is_some_and(|e| e.tag == tag))
        };

        let html_element = match first(&tree, "html") {
            Some(id) => id,
            None => {
                let id = tree.create("html", Vec::new());
                let content = tree.get_mut(document).map(|d| std::mem::take(&mut d.children));
                tree.append_child(document, id);
                let body = tree.create("body", Vec::new());
                for node in content.unwrap_or_default() {
                    match node {
                        Node::Element(child) => tree.append_child(body, child),
                        text => {
                            if let Some(element) = tree.get_mut(body) {
                                element.children.push(text);
                            }
                        }
                    }
                }
                tree.append_child(id, body);
                id
            }
        };
        let head = first(&tree, "head").unwrap_or_else(|| {
            let head = tree.create("head", Vec::new());
            if let Some(element) = tree.get_mut(head) {
                element.parent = Some(html_element);
            }
            if let Some(element) = tree.get_mut(html_element) {
                element.children.insert(0, Node::Element(head));
            }
            head
        });
        let body = first(&tree, "body").unwrap_or_else(|| {
            let body = tree.create("body", Vec::new());
            tree.append_child(html_element, body);
            body
        });

        Self {
            state: Mutex::new(State {
                tree,
                document,
                html: html_element,
                head,
                body,
                location: url.clone(),
                listeners: Vec::new(),
                entries: vec![(None, url)],
                current: 0,
                navigations: Vec::new(),
                scripts: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ------------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------------

    /// The element with the given `id`.
    ///
    /// # Panics
    ///
    /// If there is no such element.
    pub fn element(&self, id: &str) -> ElementId {
        self.element_by_id(id)
            .unwrap_or_else(|| panic!("no element with id `{id}`"))
    }

    /// Inner HTML of the element with the given `id`.
    pub fn html_of(&self, id: &str) -> String {
        self.inner_html(self.element(id))
    }

    /// URLs of full page loads, in order.
    pub fn navigations(&self) -> Vec<String> {
        self.lock().navigations.clone()
    }

    /// Scripts inserted through [`Dom::insert_script`], in order.
    pub fn executed_scripts(&self) -> Vec<Script> {
        self.lock().scripts.clone()
    }

    /// Number of session history entries.
    pub fn history_len(&self) -> usize {
        self.lock().entries.len()
    }

    /// State of the current history entry.
    pub fn history_state(&self) -> Option<HistoryEntry> {
        let state = self.lock();
        state.entries[state.current].0.clone()
    }

    /// Number of native listeners attached to `target` for `kind`.
    pub fn listener_count(&self, target: EventTarget, kind: NativeEventKind) -> usize {
        self.lock()
            .listeners
            .iter()
            .filter(|(t, k, _)| *t == target && *k == kind)
            .count()
    }

    // ------------------------------------------------------------------------
    // User simulation
    // ------------------------------------------------------------------------

    /// Primary-button click on `element`.
    ///
    /// Returns `true` if a listener prevented the default action. Otherwise
    /// the enclosing link is followed, or the owning form is submitted when
    /// `element` is a submit button.
    pub fn click(&self, element: ElementId) -> bool {
        self.click_with(element, 0, Modifiers::default())
    }

    /// Click with an explicit mouse button and modifiers.
    pub fn click_with(&self, element: ElementId, button: i16, modifiers: Modifiers) -> bool {
        let prevented = self.dispatch_path(element, NativeEventKind::Click, |current| {
            NativeEvent::Click {
                target: element,
                current_target: current,
                button,
                modifiers,
                default_prevented: Default::default(),
            }
        });
        if prevented || button != 0 {
            return prevented;
        }

        if let Some(link) = self.closest(element, "a[href]") {
            if let Some(href) = self.attribute(link, "href") {
                self.navigate(&href);
            }
        } else if self.matches(element, "button, input[type=submit], input[type=image]")
            && self
                .attribute(element, "type")
                .is_none_or(|t| !t.eq_ignore_ascii_case("button") && !t.eq_ignore_ascii_case("reset"))
        {
            if let Some(form) = self.form_of(element) {
                self.submit(form, Some(element));
            }
        }
        false
    }

    /// Submit `form`, optionally through `submitter`.
    ///
    /// Returns `true` if a listener prevented the default action. Otherwise
    /// the form's action is loaded as a full page.
    pub fn submit(&self, form: ElementId, submitter: Option<ElementId>) -> bool {
        let prevented = self.dispatch_path(form, NativeEventKind::Submit, |current| {
            NativeEvent::submit(form, current, submitter)
        });
        if !prevented {
            let action = submitter
                .and_then(|s| self.attribute(s, "formaction"))
                .or_else(|| self.attribute(form, "action"))
                .unwrap_or_default();
            self.navigate(&action);
        }
        prevented
    }

    /// Key press with focus on the body.
    pub fn key_down(&self, key: &str, modifiers: Modifiers) {
        for target in [EventTarget::Document, EventTarget::Window] {
            for listener in self.listeners(target, NativeEventKind::KeyDown) {
                listener.call(&NativeEvent::KeyDown {
                    key: key.to_owned(),
                    modifiers,
                });
            }
        }
    }

    /// Browser back button. Returns `false` at the start of the history.
    pub fn back(&self) -> bool {
        self.traverse(-1)
    }

    /// Browser forward button. Returns `false` at the end of the history.
    pub fn forward(&self) -> bool {
        self.traverse(1)
    }

    fn traverse(&self, delta: isize) -> bool {
        let state = {
            let mut state = self.lock();
            let Some(target) = state
                .current
                .checked_add_signed(delta)
                .filter(|target| *target < state.entries.len())
            else {
                return false;
            };
            state.current = target;
            state.location = state.entries[target].1.clone();
            state.entries[target].0.clone()
        };
        for listener in self.listeners(EventTarget::Window, NativeEventKind::PopState) {
            listener.call(&NativeEvent::PopState {
                state: state.clone(),
            });
        }
        true
    }

    fn listeners(&self, target: EventTarget, kind: NativeEventKind) -> Vec<NativeListener> {
        self.lock()
            .listeners
            .iter()
            .filter(|(t, k, _)| *t == target && *k == kind)
            .map(|(_, _, listener)| listener.clone())
            .collect()
    }

    /// Bubble an event from `element` up to the window. Listeners run
    /// without the state lock held.
    fn dispatch_path<F>(&self, element: ElementId, kind: NativeEventKind, make: F) -> bool
    where
        F: Fn(Option<ElementId>) -> NativeEvent,
    {
        let path: Vec<EventTarget> = {
            let state = self.lock();
            std::iter::once(element.0)
                .chain(state.tree.ancestors(element.0))
                .filter(|id| *id != state.document)
                .map(|id| EventTarget::Element(ElementId(id)))
                .chain([EventTarget::Document, EventTarget::Window])
                .collect()
        };

        let mut prevented = false;
        for target in path {
            let current = match target {
                EventTarget::Element(id) => Some(id),
                EventTarget::Document | EventTarget::Window => None,
            };
            for listener in self.listeners(target, kind) {
                let event = make(current);
                if prevented {
                    event.prevent_default();
                }
                listener.call(&event);
                prevented |= event.default_prevented();
            }
        }
        prevented
    }
}

impl Dom for MemoryDom {
    fn location(&self) -> String {
        self.lock().location.clone()
    }

    fn navigate(&self, url: &str) {
        let mut state = self.lock();
        let url = state.resolve(url);
        state.navigations.push(url.clone());
        state.location = url;
    }

    fn title(&self) -> String {
        let state = self.lock();
        state
            .title_element()
            .map(|title| state.tree.text_content(title).trim().to_owned())
            .unwrap_or_default()
    }

    fn set_title(&self, title: &str) {
        let mut state = self.lock();
        let element = match state.title_element() {
            Some(element) => element,
            None => {
                let head = state.head;
                let element = state.tree.create("title", Vec::new());
                state.tree.append_child(head, element);
                element
            }
        };
        state.tree.set_text(element, title);
    }

    fn root(&self) -> ElementId {
        ElementId(self.lock().html)
    }

    fn body(&self) -> ElementId {
        ElementId(self.lock().body)
    }

    fn element_by_id(&self, id: &str) -> Option<ElementId> {
        let state = self.lock();
        state
            .tree
            .descendants(state.document)
            .into_iter()
            .find(|element| {
                state
                    .tree
                    .get(*element)
                    .is_some_and(|e| e.attribute("id") == Some(id))
            })
            .map(ElementId)
    }

    fn query_selector_all(&self, root: ElementId, selector: &str) -> Vec<ElementId> {
        let state = self.lock();
        state
            .find(root.0, &Selector::parse(selector))
            .into_iter()
            .map(ElementId)
            .collect()
    }

    fn matches(&self, element: ElementId, selector: &str) -> bool {
        let state = self.lock();
        state
            .tree
            .get(element.0)
            .is_some_and(|e| Selector::parse(selector).matches(e))
    }

    fn closest(&self, element: ElementId, selector: &str) -> Option<ElementId> {
        let state = self.lock();
        state.tree.get(element.0)?;
        let selector = Selector::parse(selector);
        std::iter::once(element.0)
            .chain(state.tree.ancestors(element.0))
            .find(|id| state.tree.get(*id).is_some_and(|e| selector.matches(e)))
            .map(ElementId)
    }

    fn tag_name(&self, element: ElementId) -> String {
        self.lock()
            .tree
            .get(element.0)
            .map(|e| e.tag.clone())
            .unwrap_or_default()
    }

    fn attribute(&self, element: ElementId, name: &str) -> Option<String> {
        self.lock()
            .tree
            .get(element.0)?
            .attribute(name)
            .map(str::to_owned)
    }

    fn form_of(&self, element: ElementId) -> Option<ElementId> {
        if let Some(form) = self.attribute(element, "form") {
            return self
                .element_by_id(&form)
                .filter(|id| self.tag_name(*id) == "form");
        }
        let state = self.lock();
        state
            .tree
            .ancestors(element.0)
            .into_iter()
            .find(|id| state.tree.get(*id).is_some_and(|e| e.tag == "form"))
            .map(ElementId)
    }

    fn form_data(&self, form: ElementId, submitter: Option<ElementId>) -> FormData {
        let state = self.lock();
        let tree = &state.tree;
        let mut data = FormData::new();
        let mut submitter_seen = false;

        let push = |id: u64, is_submitter: bool, data: &mut FormData| {
            let Some(element) = tree.get(id) else {
                return;
            };
            let Some(name) = element.attribute("name").filter(|n| !n.is_empty()) else {
                return;
            };
            if element.attribute("disabled").is_some() {
                return;
            }
            if let Some(value) = control_value(tree, id, is_submitter) {
                data.append(name, value);
            }
        };

        for id in tree.descendants(form.0) {
            let is_submitter = submitter == Some(ElementId(id));
            submitter_seen |= is_submitter;
            push(id, is_submitter, &mut data);
        }
        if let Some(submitter) = submitter.filter(|_| !submitter_seen) {
            push(submitter.0, true, &mut data);
        }
        data
    }

    fn inner_html(&self, element: ElementId) -> String {
        self.lock().tree.inner_html(element.0)
    }

    fn set_inner_html(&self, element: ElementId, html: &str) {
        self.lock().tree.set_inner_html(element.0, html);
    }

    fn insert_adjacent_html(&self, element: ElementId, position: InsertPosition, html: &str) {
        let at_start = position == InsertPosition::AfterBegin;
        self.lock().tree.insert_html(element.0, at_start, html);
    }

    fn insert_script(&self, script: &Script) {
        let mut state = self.lock();
        let head = state.head;
        let element = state.tree.create("script", script.attributes.clone());
        state.tree.set_text(element, &script.text);
        state.tree.append_child(head, element);
        state.scripts.push(script.clone());
    }

    fn add_event_listener(&self, target: EventTarget, kind: NativeEventKind, listener: &NativeListener) {
        let mut state = self.lock();
        let attached = state
            .listeners
            .iter()
            .any(|(t, k, l)| *t == target && *k == kind && l.same(listener));
        if !attached {
            state.listeners.push((target, kind, listener.clone()));
        }
    }

    fn remove_event_listener(
        &self,
        target: EventTarget,
        kind: NativeEventKind,
        listener: &NativeListener,
    ) {
        self.lock()
            .listeners
            .retain(|(t, k, l)| !(*t == target && *k == kind && l.same(listener)));
    }
}

impl HistoryApi for MemoryDom {
    fn push_state(&self, entry: HistoryEntry, _title: &str, url: &str) {
        let mut state = self.lock();
        let url = state.resolve(url);
        let keep = state.current + 1;
        state.entries.truncate(keep);
        state.entries.push((Some(entry), url.clone()));
        state.current = keep;
        state.location = url;
    }

    fn replace_state(&self, entry: HistoryEntry, _title: &str, url: &str) {
        let mut state = self.lock();
        let url = state.resolve(url);
        let current = state.current;
        state.entries[current] = (Some(entry), url.clone());
        state.location = url;
    }
}

/// Value a successful control contributes to the form data set.
fn control_value(tree: &Tree, id: u64, is_submitter: bool) -> Option<String> {
    let element = tree.get(id)?;
    let value = || element.attribute("value").unwrap_or_default().to_owned();
    match element.tag.as_str() {
        "input" => {
            let kind = element.attribute("type").unwrap_or("text").to_ascii_lowercase();
            match kind.as_str() {
                "submit" | "image" => is_submitter.then(value),
                "button" | "reset" | "file" => None,
                "checkbox" | "radio" => element
                    .attribute("checked")
                    .map(|_| element.attribute("value").unwrap_or("on").to_owned()),
                _ => Some(value()),
            }
        }
        "button" => {
            let submit = element
                .attribute("type")
                .is_none_or(|t| t.eq_ignore_ascii_case("submit"));
            (is_submitter && submit).then(value)
        }
        "textarea" => Some(tree.text_content(id)),
        "select" => {
            let options: Vec<u64> = tree
                .descendants(id)
                .into_iter()
                .filter(|o| tree.get(*o).is_some_and(|e| e.tag == "option"))
                .collect();
            let chosen = options
                .iter()
                .find(|o| tree.get(**o).is_some_and(|e| e.attribute("selected").is_some()))
                .or(options.first())?;
            let option = tree.get(*chosen)?;
            Some(
                option
                    .attribute("value")
                    .map_or_else(|| tree.text_content(*chosen).trim().to_owned(), str::to_owned),
            )
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    const PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>Home</title></head><body>
<div id="snippet-content"><a id="link" class="ajax" href="/next"><span id="label">next</span></a></div>
<form id="form" method="post" action="/save">
  <input name="q" value="rust">
  <input type="checkbox" name="on" checked>
  <input type="checkbox" name="off">
  <select name="size"><option value="s">S</option><option value="m" selected>M</option></select>
  <textarea name="note">hello</textarea>
  <button id="save" name="op" value="save">Save</button>
  <button id="delete" name="op" value="delete" formaction="/delete">Delete</button>
</form>
</body></html>"#;

    fn dom() -> MemoryDom {
        MemoryDom::new("https://example.com/", PAGE)
    }

    #[test]
    fn test_document_structure() {
        let dom = dom();
        assert_eq!(dom.title(), "Home");
        assert_eq!(dom.tag_name(dom.body()), "body");
        assert_eq!(dom.tag_name(dom.root()), "html");
        assert_eq!(dom.query_selector_all(dom.root(), r#"[id^="snippet-"]"#).len(), 1);
    }

    #[test]
    fn test_fragment_gets_a_body() {
        let dom = MemoryDom::new("https://example.com/", r#"<p id="p">x</p>"#);
        assert_eq!(dom.closest(dom.element("p"), "body"), Some(dom.body()));
        dom.set_title("Fresh");
        assert_eq!(dom.title(), "Fresh");
    }

    #[test]
    fn test_form_data_with_submitter() {
        let dom = dom();
        let form = dom.element("form");
        let data = dom.form_data(form, Some(dom.element("delete")));
        let pairs: Vec<_> = data.iter().collect();
        assert_eq!(
            pairs,
            vec![
                ("q", "rust"),
                ("on", "on"),
                ("size", "m"),
                ("note", "hello"),
                ("op", "delete"),
            ]
        );
        assert_eq!(dom.form_of(dom.element("save")), Some(form));
    }

    #[test]
    fn test_unhandled_click_follows_link() {
        let dom = dom();
        assert!(!dom.click(dom.element("label")));
        assert_eq!(dom.navigations(), vec!["https://example.com/next".to_owned()]);
        assert_eq!(dom.location(), "https://example.com/next");
    }

    #[test]
    fn test_listener_prevents_default_and_sees_current_target() {
        let dom = dom();
        let link = dom.element("link");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let listener = {
            let seen = seen.clone();
            NativeListener::new(move |event| {
                if let NativeEvent::Click { current_target, .. } = event {
                    seen.lock().unwrap().push(*current_target);
                }
                event.prevent_default();
            })
        };
        dom.add_event_listener(EventTarget::Element(link), NativeEventKind::Click, &listener);
        dom.add_event_listener(EventTarget::Element(link), NativeEventKind::Click, &listener);
        dom.add_event_listener(EventTarget::Window, NativeEventKind::Click, &listener);

        assert!(dom.click(dom.element("label")));
        assert_eq!(*seen.lock().unwrap(), vec![Some(link), None]);
        assert!(dom.navigations().is_empty());
    }

    #[test]
    fn test_submit_button_click_submits_form() {
        let dom = dom();
        let submits = Arc::new(AtomicUsize::new(0));
        let listener = {
            let submits = submits.clone();
            NativeListener::new(move |event| {
                if let NativeEvent::Submit { submitter, .. } = event {
                    assert!(submitter.is_some());
                    submits.fetch_add(1, Ordering::SeqCst);
                }
            })
        };
        dom.add_event_listener(EventTarget::Document, NativeEventKind::Submit, &listener);
        dom.click(dom.element("delete"));
        assert_eq!(submits.load(Ordering::SeqCst), 1);
        assert_eq!(dom.navigations(), vec!["https://example.com/delete".to_owned()]);
    }

    #[test]
    fn test_history_traversal_fires_pop_state() {
        let dom = dom();
        let popped = Arc::new(Mutex::new(Vec::new()));
        let listener = {
            let popped = popped.clone();
            NativeListener::new(move |event| {
                if let NativeEvent::PopState { state } = event {
                    popped.lock().unwrap().push(state.as_ref().map(|s| s.href.clone()));
                }
            })
        };
        dom.add_event_listener(EventTarget::Window, NativeEventKind::PopState, &listener);

        let entry = |href: &str| HistoryEntry {
            href: href.into(),
            ..Default::default()
        };
        dom.push_state(entry("https://example.com/a"), "", "/a");
        dom.push_state(entry("https://example.com/b"), "", "/b");
        assert_eq!(dom.history_len(), 3);

        assert!(dom.back());
        assert_eq!(dom.location(), "https://example.com/a");
        assert!(dom.back());
        assert!(!dom.back());
        assert!(dom.forward());
        assert_eq!(
            *popped.lock().unwrap(),
            vec![Some("https://example.com/a".to_owned()), None, Some("https://example.com/a".to_owned())]
        );

        dom.push_state(entry("https://example.com/c"), "", "/c");
        assert_eq!(dom.history_len(), 3);
        assert!(!dom.forward());
    }
}
