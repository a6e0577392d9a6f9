//! Rows: the leaves of the list model.
//!
//! A [`Row`] is a cheap, cloneable handle. Clones refer to the same row;
//! equality is identity. A row belongs to at most one [`Section`] at a time
//! and holds only a weak reference back to it.
//!
//! Rows are created with [`RowBuilder`]:
//!
//! ```
//! use trellis::model::{Row, RowKind};
//!
//! let row = Row::toggle("Wi-Fi", true)
//!     .identifier("wifi")
//!     .action(|row: &Row| println!("wifi is now {:?}", row.value()))
//!     .build();
//!
//! assert_eq!(row.kind(), RowKind::Toggle);
//! assert!(row.section().is_none());
//! ```

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use trellis_core::logging::targets;

use super::index::IndexPath;
use super::section::{Section, SectionInner};
use super::value::RowValue;

/// Global counter for row IDs.
static NEXT_ROW_ID: AtomicU64 = AtomicU64::new(1);

/// A process-unique row identity, stable for the row's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(u64);

impl RowId {
    fn next() -> Self {
        Self(NEXT_ROW_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw u64 value of this ID.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// The presentation kind of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RowKind {
    #[default]
    Plain,
    Subtitle,
    /// Title with a trailing value text.
    Value,
    /// One option of a radio group.
    Radio,
    /// On/off switch; selecting the row flips its boolean value.
    Toggle,
    Text,
    SecureText,
    Label,
    Button,
    DatePicker,
    Slider,
}

/// Lifecycle events delivered to a row's event handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowEvent {
    /// The row was attached to a section for the first time.
    Initial,
    /// The application became active again.
    AppBecameActive,
    /// The hosting list is about to appear.
    ListWillAppear,
    /// The hosting list is about to disappear.
    ListWillDisappear,
    /// The hosting list disappeared.
    ListDidDisappear,
}

/// Interaction flags for a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowFlags {
    /// Whether the row accepts interaction.
    pub enabled: bool,
    /// Whether selecting the row triggers its action.
    pub selectable: bool,
}

impl Default for RowFlags {
    fn default() -> Self {
        Self {
            enabled: true,
            selectable: true,
        }
    }
}

impl RowFlags {
    /// Flags for a row that ignores selection.
    pub fn inert() -> Self {
        Self {
            enabled: true,
            selectable: false,
        }
    }

    /// Builder method to set enabled.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Builder method to set selectable.
    pub fn with_selectable(mut self, selectable: bool) -> Self {
        self.selectable = selectable;
        self
    }
}

/// What a row does when the user selects it.
pub trait RowAction: Send + Sync {
    /// Perform the action. Runs synchronously on the main context.
    fn perform(&self, row: &Row);
}

impl<F> RowAction for F
where
    F: Fn(&Row) + Send + Sync,
{
    fn perform(&self, row: &Row) {
        self(row)
    }
}

type RowHook = Arc<dyn Fn(&Row) + Send + Sync>;
type EventHandler = Arc<dyn Fn(&Row, RowEvent) + Send + Sync>;
type Represented = Arc<dyn Any + Send + Sync>;

struct RowState {
    title: Option<String>,
    detail: Option<String>,
    value: Option<RowValue>,
    flags: RowFlags,
    selected: bool,
    represented: Option<Represented>,
}

#[derive(Default)]
struct RowHooks {
    view_sync: Option<RowHook>,
    appearance_sync: Option<RowHook>,
    action: Option<Arc<dyn RowAction>>,
    event_handler: Option<EventHandler>,
}

pub(crate) struct RowInner {
    id: RowId,
    identifier: Option<String>,
    group_identifier: Option<String>,
    kind: RowKind,
    state: RwLock<RowState>,
    hooks: RwLock<RowHooks>,
    section: Mutex<Weak<SectionInner>>,
    initialized: AtomicBool,
}

/// A handle to one list entry.
#[derive(Clone)]
pub struct Row {
    pub(crate) inner: Arc<RowInner>,
}

impl Row {
    /// Start building a row of the given kind.
    pub fn builder(kind: RowKind) -> RowBuilder {
        RowBuilder::new(kind)
    }

    /// A switch row holding a boolean value.
    pub fn toggle(title: impl Into<String>, on: bool) -> RowBuilder {
        RowBuilder::new(RowKind::Toggle).title(title).value(on)
    }

    /// One option of the radio group `group`.
    pub fn radio(label: impl Into<String>, value: impl Into<RowValue>, group: impl Into<String>) -> RowBuilder {
        RowBuilder::new(RowKind::Radio)
            .title(label)
            .value(value)
            .group_identifier(group)
    }

    /// A text entry row; `secure` hides the content.
    pub fn text_field(placeholder: impl Into<String>, text: impl Into<String>, secure: bool) -> RowBuilder {
        let kind = if secure { RowKind::SecureText } else { RowKind::Text };
        RowBuilder::new(kind)
            .detail(placeholder)
            .value(RowValue::Text(text.into()))
            .selectable(false)
    }

    /// A read-only title/detail row.
    pub fn label(title: impl Into<String>, detail: impl Into<String>) -> RowBuilder {
        RowBuilder::new(RowKind::Label)
            .title(title)
            .detail(detail)
            .selectable(false)
    }

    /// A row with a title and subtitle.
    pub fn subtitle(title: impl Into<String>, subtitle: impl Into<String>) -> RowBuilder {
        RowBuilder::new(RowKind::Subtitle).title(title).detail(subtitle)
    }

    /// A tappable button row.
    pub fn button(title: impl Into<String>) -> RowBuilder {
        RowBuilder::new(RowKind::Button).title(title)
    }

    /// A date picker row.
    pub fn date_picker(date: DateTime<Utc>) -> RowBuilder {
        RowBuilder::new(RowKind::DatePicker).value(date)
    }

    /// The row's process-unique ID.
    pub fn id(&self) -> RowId {
        self.inner.id
    }

    /// The caller-assigned identifier used for lookups.
    pub fn identifier(&self) -> Option<&str> {
        self.inner.identifier.as_deref()
    }

    /// The radio group this row belongs to.
    pub fn group_identifier(&self) -> Option<&str> {
        self.inner.group_identifier.as_deref()
    }

    pub fn kind(&self) -> RowKind {
        self.inner.kind
    }

    pub fn title(&self) -> Option<String> {
        self.inner.state.read().title.clone()
    }

    pub fn detail(&self) -> Option<String> {
        self.inner.state.read().detail.clone()
    }

    /// Set the title and resync the view.
    pub fn set_title(&self, title: impl Into<String>) {
        self.inner.state.write().title = Some(title.into());
        self.sync_view();
    }

    /// Set the detail text and resync the view.
    pub fn set_detail(&self, detail: impl Into<String>) {
        self.inner.state.write().detail = Some(detail.into());
        self.sync_view();
    }

    pub fn value(&self) -> Option<RowValue> {
        self.inner.state.read().value.clone()
    }

    /// Replace the value and run the view-sync hook.
    pub fn set_value(&self, value: impl Into<RowValue>) {
        self.inner.state.write().value = Some(value.into());
        self.sync_view();
    }

    pub fn flags(&self) -> RowFlags {
        self.inner.state.read().flags
    }

    pub fn is_enabled(&self) -> bool {
        self.flags().enabled
    }

    /// Enable or disable the row; runs the appearance hook on change.
    pub fn set_enabled(&self, enabled: bool) {
        let changed = {
            let mut state = self.inner.state.write();
            let changed = state.flags.enabled != enabled;
            state.flags.enabled = enabled;
            changed
        };
        if changed {
            self.sync_appearance();
        }
    }

    pub fn is_selectable(&self) -> bool {
        self.flags().selectable
    }

    pub fn set_selectable(&self, selectable: bool) {
        self.inner.state.write().flags.selectable = selectable;
    }

    /// Whether the row is the selected option of its radio group.
    pub fn is_selected(&self) -> bool {
        self.inner.state.read().selected
    }

    /// Update the selected mark; returns `true` if it changed.
    pub(crate) fn set_selected_mark(&self, selected: bool) -> bool {
        let changed = {
            let mut state = self.inner.state.write();
            let changed = state.selected != selected;
            state.selected = selected;
            changed
        };
        if changed {
            self.sync_view();
        }
        changed
    }

    /// The opaque object the call site associated with this row.
    pub fn represented_object(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.inner.state.read().represented.clone()
    }

    pub fn set_represented_object<T: Any + Send + Sync>(&self, object: T) {
        self.inner.state.write().represented = Some(Arc::new(object));
    }

    /// Replace the action run on selection.
    pub fn set_action<A: RowAction + 'static>(&self, action: A) {
        self.inner.hooks.write().action = Some(Arc::new(action));
    }

    /// Replace the hook that pushes model state into the view.
    pub fn set_view_sync<F>(&self, hook: F)
    where
        F: Fn(&Row) + Send + Sync + 'static,
    {
        self.inner.hooks.write().view_sync = Some(Arc::new(hook));
    }

    /// Replace the hook that updates enabled/disabled appearance.
    pub fn set_appearance_sync<F>(&self, hook: F)
    where
        F: Fn(&Row) + Send + Sync + 'static,
    {
        self.inner.hooks.write().appearance_sync = Some(Arc::new(hook));
    }

    pub fn set_event_handler<F>(&self, handler: F)
    where
        F: Fn(&Row, RowEvent) + Send + Sync + 'static,
    {
        self.inner.hooks.write().event_handler = Some(Arc::new(handler));
    }

    /// The owning section, if attached to one.
    pub fn section(&self) -> Option<Section> {
        self.inner
            .section
            .lock()
            .upgrade()
            .map(|inner| Section { inner })
    }

    /// Position within the owning section.
    pub fn index(&self) -> Option<usize> {
        self.section()?.index_of_row(self)
    }

    /// Position within the owning controller.
    ///
    /// `None` unless both the row and its section are attached.
    pub fn index_path(&self) -> Option<IndexPath> {
        let section = self.section()?;
        let section_index = section.index()?;
        let row = section.index_of_row(self)?;
        Some(IndexPath::new(section_index, row))
    }

    /// Whether the row is part of a controller's model.
    pub fn is_attached(&self) -> bool {
        self.section().is_some_and(|section| section.is_attached())
    }

    /// Deliver a lifecycle event to the row's event handler.
    pub fn dispatch_event(&self, event: RowEvent) {
        let handler = self.inner.hooks.read().event_handler.clone();
        if let Some(handler) = handler {
            handler(self, event);
        }
    }

    /// Run the row's selection behavior.
    ///
    /// Toggles flip their value, radio rows become the selected option of
    /// their group, then the action runs. Returns `false` without doing
    /// anything if the row is disabled or not selectable.
    pub fn activate(&self) -> bool {
        let flags = self.flags();
        if !flags.enabled || !flags.selectable {
            tracing::trace!(target: targets::MODEL, row = self.id().as_u64(), "activation ignored");
            return false;
        }

        match self.kind() {
            RowKind::Toggle => {
                let on = self.value().and_then(|v| v.as_bool()).unwrap_or(false);
                self.set_value(!on);
            }
            RowKind::Radio => {
                if let Some(section) = self.section() {
                    section.select_radio_row(self);
                }
            }
            _ => {}
        }

        let action = self.inner.hooks.read().action.clone();
        if let Some(action) = action {
            action.perform(self);
        }
        true
    }

    /// Copy the row's plain data for use off the main context.
    pub fn snapshot(&self) -> RowSnapshot {
        let state = self.inner.state.read();
        RowSnapshot {
            id: self.inner.id,
            identifier: self.inner.identifier.clone(),
            group_identifier: self.inner.group_identifier.clone(),
            kind: self.inner.kind,
            title: state.title.clone(),
            detail: state.detail.clone(),
            value: state.value.clone(),
            flags: state.flags,
            selected: state.selected,
        }
    }

    pub(crate) fn set_parent(&self, section: &Arc<SectionInner>) {
        *self.inner.section.lock() = Arc::downgrade(section);
    }

    pub(crate) fn clear_parent(&self) {
        *self.inner.section.lock() = Weak::new();
    }

    /// Fire `Initial` the first time the row is attached.
    pub(crate) fn fire_initial_once(&self) {
        if !self.inner.initialized.swap(true, Ordering::AcqRel) {
            self.dispatch_event(RowEvent::Initial);
        }
    }

    fn sync_view(&self) {
        let hook = self.inner.hooks.read().view_sync.clone();
        if let Some(hook) = hook {
            hook(self);
        }
    }

    fn sync_appearance(&self) {
        let hook = self.inner.hooks.read().appearance_sync.clone();
        if let Some(hook) = hook {
            hook(self);
        }
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Row {}

impl std::hash::Hash for Row {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("Row")
            .field("id", &self.inner.id)
            .field("identifier", &self.inner.identifier)
            .field("kind", &self.inner.kind)
            .field("title", &state.title)
            .field("value", &state.value)
            .finish_non_exhaustive()
    }
}

/// A detached copy of a row's data.
#[derive(Debug, Clone, PartialEq)]
pub struct RowSnapshot {
    pub id: RowId,
    pub identifier: Option<String>,
    pub group_identifier: Option<String>,
    pub kind: RowKind,
    pub title: Option<String>,
    pub detail: Option<String>,
    pub value: Option<RowValue>,
    pub flags: RowFlags,
    pub selected: bool,
}

/// Builder for [`Row`].
#[must_use = "call build() to create the row"]
pub struct RowBuilder {
    kind: RowKind,
    identifier: Option<String>,
    group_identifier: Option<String>,
    title: Option<String>,
    detail: Option<String>,
    value: Option<RowValue>,
    flags: RowFlags,
    selected: bool,
    represented: Option<Represented>,
    hooks: RowHooks,
}

impl RowBuilder {
    pub fn new(kind: RowKind) -> Self {
        Self {
            kind,
            identifier: None,
            group_identifier: None,
            title: None,
            detail: None,
            value: None,
            flags: RowFlags::default(),
            selected: false,
            represented: None,
            hooks: RowHooks::default(),
        }
    }

    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn group_identifier(mut self, group: impl Into<String>) -> Self {
        self.group_identifier = Some(group.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn value(mut self, value: impl Into<RowValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn flags(mut self, flags: RowFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.flags.enabled = enabled;
        self
    }

    pub fn selectable(mut self, selectable: bool) -> Self {
        self.flags.selectable = selectable;
        self
    }

    /// Start out as the selected option of the row's radio group.
    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    pub fn represented_object<T: Any + Send + Sync>(mut self, object: T) -> Self {
        self.represented = Some(Arc::new(object));
        self
    }

    pub fn action<A: RowAction + 'static>(mut self, action: A) -> Self {
        self.hooks.action = Some(Arc::new(action));
        self
    }

    pub fn view_sync<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Row) + Send + Sync + 'static,
    {
        self.hooks.view_sync = Some(Arc::new(hook));
        self
    }

    pub fn appearance_sync<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Row) + Send + Sync + 'static,
    {
        self.hooks.appearance_sync = Some(Arc::new(hook));
        self
    }

    pub fn event_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Row, RowEvent) + Send + Sync + 'static,
    {
        self.hooks.event_handler = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> Row {
        Row {
            inner: Arc::new(RowInner {
                id: RowId::next(),
                identifier: self.identifier,
                group_identifier: self.group_identifier,
                kind: self.kind,
                state: RwLock::new(RowState {
                    title: self.title,
                    detail: self.detail,
                    value: self.value,
                    flags: self.flags,
                    selected: self.selected,
                    represented: self.represented,
                }),
                hooks: RwLock::new(self.hooks),
                section: Mutex::new(Weak::new()),
                initialized: AtomicBool::new(false),
            }),
        }
    }
}

static_assertions::assert_impl_all!(Row: Send, Sync, Clone);
