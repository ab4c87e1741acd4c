//! Form state bound to a single remote entity.
//!
//! A [`BoundEntityForm`] edits the entity identified by the key its host page
//! assigns with [`BoundEntityForm::set_instance_id`]. Loading is lazy: nothing is
//! fetched until the form is on screen, and then exactly once per key. Refresh
//! signals reload the current key unconditionally.
//!
//! Loads are tagged with a ticket. When keys are reassigned quickly the response
//! for the most recently issued load wins, whatever order the responses arrive in.
//! Saves remember the key they were issued for and are dropped if the form has
//! been rebound or cleared by the time they finish.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::async_task::TaskManager;
use crate::error::{LoadError, SaveError, SourceError};
use crate::refresh::{RefreshBus, RefreshListener};
use crate::state::Identified;
use crate::visibility::{Visibility, VisibilityChange};

/// Keys a bound form can be addressed by (numbers, strings, UUIDs).
pub trait EntityKey: Clone + PartialEq + fmt::Display + fmt::Debug + Send + Sync + 'static {}

impl<K> EntityKey for K where K: Clone + PartialEq + fmt::Display + fmt::Debug + Send + Sync + 'static {}

/// Loads and saves single entities.
pub trait EntitySource<K, T>: Send + Sync + 'static {
    fn load_instance(&self, id: &K) -> Result<T, SourceError>;

    /// Instance shown before any key is assigned ("create new" forms).
    fn default_instance(&self) -> Option<T> {
        None
    }

    /// Creates (`id` is `None`) or updates an entity, returning the stored copy.
    fn send(&self, id: Option<&K>, data: T) -> Result<T, SourceError>;
}

enum Completion<K, T> {
    Loaded {
        ticket: u64,
        id: K,
        result: Result<T, SourceError>,
    },
    Saved {
        id: Option<K>,
        result: Result<T, SourceError>,
    },
}

/// What a poll applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
    Loaded,
    LoadFailed(LoadError),
    /// A load or save for a key that has since been replaced finished and was
    /// dropped.
    Stale,
    Saved,
    SaveFailed(SaveError),
}

pub struct BoundEntityForm<K, T> {
    name: String,
    source: Arc<dyn EntitySource<K, T>>,
    tasks: TaskManager<Completion<K, T>>,
    refresh: Option<RefreshListener>,
    visibility: Visibility,

    id: Option<K>,
    /// Key the latest load was issued for.
    requested: Option<K>,
    instance: Option<T>,
    ticket: u64,
    loading: bool,
    submitting: bool,
    revision: u64,
}

impl<K, T> BoundEntityForm<K, T>
where
    K: EntityKey,
    T: Identified<Key = K> + Clone + Send + 'static,
{
    pub fn new(name: impl Into<String>, source: Arc<dyn EntitySource<K, T>>) -> Self {
        let instance = source.default_instance();
        Self {
            name: name.into(),
            source,
            tasks: TaskManager::new(),
            refresh: None,
            visibility: Visibility::new(),
            id: None,
            requested: None,
            instance,
            ticket: 0,
            loading: false,
            submitting: false,
            revision: 0,
        }
    }

    /// Subscribes to refresh signals on `bus`. Successful saves bubble from it.
    pub fn listen(&mut self, bus: &RefreshBus) {
        self.refresh = Some(bus.subscribe());
    }

    pub fn instance(&self) -> Option<&T> {
        self.instance.as_ref()
    }

    pub fn instance_id(&self) -> Option<&K> {
        self.id.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn is_visible(&self) -> bool {
        self.visibility.is_visible()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Binds the form to `id`. Loads now if visible, otherwise once it becomes so.
    pub fn set_instance_id(&mut self, id: K) {
        debug!(form = %self.name, %id, visible = self.visibility.is_visible(), "instance id assigned");
        self.id = Some(id.clone());
        self.touch();
        if self.visibility.is_visible() {
            self.load(id);
        }
    }

    /// Unbinds the form and falls back to the default instance.
    pub fn clear_instance_id(&mut self) {
        self.id = None;
        self.requested = None;
        self.instance = self.source.default_instance();
        // Any load still running belongs to the old key.
        self.ticket += 1;
        self.loading = false;
        self.touch();
    }

    /// Render-time visibility check. Issues the pending load for the assigned key
    /// if none has been issued for it yet.
    pub fn mark_visible(&mut self, visible: bool) -> VisibilityChange {
        let change = self.visibility.update(visible);
        if visible {
            if let Some(id) = self.id.clone() {
                if self.requested.as_ref() != Some(&id) {
                    self.load(id);
                }
            }
        }
        change
    }

    /// Reloads the bound entity. Returns `false` when no key is assigned.
    pub fn refresh(&mut self) -> bool {
        match self.id.clone() {
            Some(id) => {
                self.load(id);
                true
            }
            None => false,
        }
    }

    fn load(&mut self, id: K) {
        self.ticket += 1;
        let ticket = self.ticket;
        debug!(form = %self.name, %id, ticket, "loading instance");

        self.requested = Some(id.clone());
        self.loading = true;
        let source = Arc::clone(&self.source);
        self.tasks.spawn(move || {
            let result = source.load_instance(&id);
            Completion::Loaded { ticket, id, result }
        });
        self.touch();
    }

    /// Saves `data` for the bound key, or creates it when no key is bound.
    ///
    /// Returns `false` while a previous submission is still running.
    pub fn submit(&mut self, data: T) -> bool {
        if self.submitting {
            debug!(form = %self.name, "submit dropped, save in flight");
            return false;
        }

        self.submitting = true;
        let id = self.id.clone();
        let source = Arc::clone(&self.source);
        debug!(form = %self.name, id = ?id, "submitting");
        self.tasks.spawn(move || {
            let result = source.send(id.as_ref(), data);
            Completion::Saved { id, result }
        });
        self.touch();
        true
    }

    /// Applies a refresh signal and one finished load or save, if any.
    pub fn poll(&mut self) -> Option<FormEvent> {
        self.take_refresh_signal();
        let completion = self.tasks.try_recv()?;
        Some(self.apply(completion))
    }

    /// Like [`BoundEntityForm::poll`], waiting up to `timeout` for a running task.
    pub fn poll_blocking(&mut self, timeout: Duration) -> Option<FormEvent> {
        self.take_refresh_signal();
        let completion = self.tasks.recv_timeout(timeout)?;
        Some(self.apply(completion))
    }

    fn take_refresh_signal(&mut self) {
        if self.refresh.as_ref().is_some_and(RefreshListener::take) {
            debug!(form = %self.name, "refresh signal received");
            self.refresh();
        }
    }

    fn apply(&mut self, completion: Completion<K, T>) -> FormEvent {
        self.touch();
        match completion {
            Completion::Loaded { ticket, id, .. } if ticket != self.ticket => {
                debug!(form = %self.name, %id, ticket, latest = self.ticket, "stale load discarded");
                FormEvent::Stale
            }
            Completion::Loaded { id, result, .. } => {
                self.loading = false;
                match result {
                    Ok(instance) => {
                        debug!(form = %self.name, %id, "instance loaded");
                        self.instance = Some(instance);
                        FormEvent::Loaded
                    }
                    Err(source) => {
                        warn!(form = %self.name, %id, error = %source, "load failed");
                        FormEvent::LoadFailed(LoadError {
                            id: id.to_string(),
                            source,
                        })
                    }
                }
            }
            Completion::Saved { id, result } if id != self.id => {
                self.submitting = false;
                match result {
                    Ok(saved) => {
                        info!(form = %self.name, id = %saved.key(), "saved for a replaced key, not applied");
                        self.bubble_refresh();
                    }
                    Err(source) => {
                        warn!(form = %self.name, id = ?id, error = %source, "save for a replaced key failed");
                    }
                }
                FormEvent::Stale
            }
            Completion::Saved { result, .. } => {
                self.submitting = false;
                match result {
                    Ok(saved) => {
                        let key = saved.key();
                        info!(form = %self.name, id = %key, "saved");
                        if self.id.is_none() {
                            self.requested = Some(key.clone());
                            self.id = Some(key);
                        }
                        self.instance = Some(saved);
                        self.bubble_refresh();
                        FormEvent::Saved
                    }
                    Err(source) => {
                        warn!(form = %self.name, error = %source, "save failed");
                        FormEvent::SaveFailed(SaveError::from(source))
                    }
                }
            }
        }
    }

    fn bubble_refresh(&self) {
        if let Some(listener) = &self.refresh {
            listener.bus().bubble();
        }
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::{unbounded, Receiver, Sender};
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    const WAIT: Duration = Duration::from_secs(5);

    #[derive(Debug, Clone, PartialEq)]
    struct Record {
        id: String,
        name: String,
    }

    impl Identified for Record {
        type Key = String;

        fn key(&self) -> String {
            self.id.clone()
        }
    }

    /// Records calls; loads of `slow` and saves named `hold*` wait for the gate.
    struct Store {
        loads: Mutex<Vec<String>>,
        saves: Mutex<Vec<Option<String>>>,
        gate: Receiver<()>,
        default: Option<Record>,
    }

    impl Store {
        fn new() -> (Arc<Self>, Sender<()>) {
            let (release, gate) = unbounded();
            let store = Arc::new(Self {
                loads: Mutex::new(Vec::new()),
                saves: Mutex::new(Vec::new()),
                gate,
                default: None,
            });
            (store, release)
        }

        fn loads(&self) -> Vec<String> {
            self.loads.lock().unwrap().clone()
        }
    }

    impl EntitySource<String, Record> for Store {
        fn load_instance(&self, id: &String) -> Result<Record, SourceError> {
            self.loads.lock().unwrap().push(id.clone());
            match id.as_str() {
                "missing" => Err(SourceError::NotFound {
                    kind: "record",
                    id: id.clone(),
                }),
                "slow" => {
                    let _ = self.gate.recv();
                    Ok(Record {
                        id: id.clone(),
                        name: "slow".into(),
                    })
                }
                _ => Ok(Record {
                    id: id.clone(),
                    name: format!("name of {id}"),
                }),
            }
        }

        fn default_instance(&self) -> Option<Record> {
            self.default.clone()
        }

        fn send(&self, id: Option<&String>, data: Record) -> Result<Record, SourceError> {
            self.saves.lock().unwrap().push(id.cloned());
            if data.name.starts_with("hold") {
                let _ = self.gate.recv();
            }
            if data.name.is_empty() {
                let mut fields = BTreeMap::new();
                fields.insert("name".to_string(), vec!["This field may not be blank.".to_string()]);
                return Err(SourceError::Invalid(fields));
            }
            Ok(Record {
                id: id.cloned().unwrap_or_else(|| "new-1".to_string()),
                ..data
            })
        }
    }

    fn form(store: &Arc<Store>) -> BoundEntityForm<String, Record> {
        BoundEntityForm::new("records", Arc::clone(store) as Arc<dyn EntitySource<String, Record>>)
    }

    #[test]
    fn test_hidden_assignment_defers_load() {
        let (store, _release) = Store::new();
        let mut f = form(&store);

        f.set_instance_id("abc".into());
        assert!(f.poll_blocking(Duration::from_millis(50)).is_none());
        assert!(store.loads().is_empty());

        f.mark_visible(true);
        assert_eq!(f.poll_blocking(WAIT), Some(FormEvent::Loaded));
        assert_eq!(store.loads(), vec!["abc".to_string()]);

        // Later render passes do not reload.
        f.mark_visible(true);
        f.mark_visible(false);
        f.mark_visible(true);
        assert!(!f.is_loading());
        assert_eq!(store.loads().len(), 1);
        assert_eq!(f.instance().map(|r| r.name.as_str()), Some("name of abc"));
    }

    #[test]
    fn test_visible_assignment_loads_once() {
        let (store, _release) = Store::new();
        let mut f = form(&store);
        f.mark_visible(true);
        assert!(store.loads().is_empty());

        f.set_instance_id("abc".into());
        assert!(f.is_loading());
        f.mark_visible(true);
        assert_eq!(f.poll_blocking(WAIT), Some(FormEvent::Loaded));
        assert_eq!(store.loads(), vec!["abc".to_string()]);
    }

    #[test]
    fn test_reassignment_while_hidden_loads_latest_key() {
        let (store, _release) = Store::new();
        let mut f = form(&store);
        f.set_instance_id("a".into());
        f.set_instance_id("b".into());

        f.mark_visible(true);
        f.poll_blocking(WAIT);
        assert_eq!(store.loads(), vec!["b".to_string()]);
    }

    #[test]
    fn test_refresh_without_key_is_noop() {
        let (store, _release) = Store::new();
        let mut f = form(&store);
        f.mark_visible(true);

        assert!(!f.refresh());
        assert!(f.poll_blocking(Duration::from_millis(50)).is_none());
        assert!(store.loads().is_empty());
    }

    #[test]
    fn test_refresh_reloads_loaded_key() {
        let (store, _release) = Store::new();
        let bus = RefreshBus::new();
        let mut f = form(&store);
        f.listen(&bus);
        f.mark_visible(true);
        f.set_instance_id("abc".into());
        f.poll_blocking(WAIT);

        bus.emit();
        assert_eq!(f.poll_blocking(WAIT), Some(FormEvent::Loaded));
        assert_eq!(store.loads(), vec!["abc".to_string(), "abc".to_string()]);
    }

    #[test]
    fn test_refresh_signal_reloads_even_when_hidden() {
        let (store, _release) = Store::new();
        let bus = RefreshBus::new();
        let mut f = form(&store);
        f.listen(&bus);
        f.set_instance_id("abc".into());

        bus.emit();
        assert_eq!(f.poll_blocking(WAIT), Some(FormEvent::Loaded));
        assert_eq!(store.loads(), vec!["abc".to_string()]);

        // Already loaded for this key, becoming visible does not load again.
        f.mark_visible(true);
        assert!(!f.is_loading());
        assert_eq!(store.loads().len(), 1);
    }

    #[test]
    fn test_default_instance_before_key() {
        let (release, gate) = unbounded();
        drop(release);
        let store = Arc::new(Store {
            loads: Mutex::new(Vec::new()),
            saves: Mutex::new(Vec::new()),
            gate,
            default: Some(Record {
                id: String::new(),
                name: "New record".into(),
            }),
        });
        let mut f = form(&store);
        assert_eq!(f.instance().map(|r| r.name.as_str()), Some("New record"));

        f.mark_visible(true);
        f.set_instance_id("abc".into());
        f.poll_blocking(WAIT);
        f.clear_instance_id();
        assert_eq!(f.instance_id(), None);
        assert_eq!(f.instance().map(|r| r.name.as_str()), Some("New record"));
    }

    #[test]
    fn test_load_failure_leaves_instance_unset() {
        let (store, _release) = Store::new();
        let mut f = form(&store);
        f.mark_visible(true);
        f.set_instance_id("missing".into());

        match f.poll_blocking(WAIT) {
            Some(FormEvent::LoadFailed(err)) => {
                assert_eq!(err.id, "missing");
                assert!(matches!(err.source, SourceError::NotFound { .. }));
            }
            other => panic!("expected load failure, got {other:?}"),
        }
        assert!(f.instance().is_none());
        assert!(!f.is_loading());
        // No automatic retry.
        assert!(f.poll_blocking(Duration::from_millis(50)).is_none());
        assert_eq!(store.loads().len(), 1);
    }

    #[test]
    fn test_latest_issued_load_wins() {
        let (store, release) = Store::new();
        let mut f = form(&store);
        f.mark_visible(true);

        f.set_instance_id("slow".into());
        f.set_instance_id("fast".into());
        assert_eq!(f.poll_blocking(WAIT), Some(FormEvent::Loaded));
        assert_eq!(f.instance().map(|r| r.id.as_str()), Some("fast"));

        release.send(()).unwrap();
        assert_eq!(f.poll_blocking(WAIT), Some(FormEvent::Stale));
        assert_eq!(f.instance().map(|r| r.id.as_str()), Some("fast"));
    }

    #[test]
    fn test_submit_saves_and_bubbles_refresh() {
        let (store, _release) = Store::new();
        let page = RefreshBus::new();
        let scope = page.scope("detail");
        let page_listener = page.subscribe();
        let mut f = form(&store);
        f.listen(&scope);
        f.mark_visible(true);
        f.set_instance_id("abc".into());
        f.poll_blocking(WAIT);

        let mut edited = f.instance().cloned().unwrap();
        edited.name = "renamed".into();
        assert!(f.submit(edited.clone()));
        assert!(f.is_submitting());
        assert!(!f.submit(edited));

        assert_eq!(f.poll_blocking(WAIT), Some(FormEvent::Saved));
        assert!(!f.is_submitting());
        assert_eq!(f.instance().map(|r| r.name.as_str()), Some("renamed"));
        assert!(page_listener.take());
        assert_eq!(*store.saves.lock().unwrap(), vec![Some("abc".to_string())]);
    }

    #[test]
    fn test_submit_without_key_creates() {
        let (store, _release) = Store::new();
        let mut f = form(&store);
        f.mark_visible(true);

        f.submit(Record {
            id: String::new(),
            name: "fresh".into(),
        });
        assert_eq!(f.poll_blocking(WAIT), Some(FormEvent::Saved));
        assert_eq!(f.instance_id().map(String::as_str), Some("new-1"));
        // The created instance counts as loaded for its key.
        f.mark_visible(true);
        assert!(store.loads().is_empty());
    }

    #[test]
    fn test_submit_validation_failure() {
        let (store, _release) = Store::new();
        let mut f = form(&store);
        f.submit(Record {
            id: String::new(),
            name: String::new(),
        });

        match f.poll_blocking(WAIT) {
            Some(FormEvent::SaveFailed(err)) => {
                assert_eq!(err.field_errors("name").len(), 1);
            }
            other => panic!("expected save failure, got {other:?}"),
        }
        assert!(f.instance().is_none());
        assert!(f.instance_id().is_none());
    }

    #[test]
    fn test_save_finishing_after_rebind_is_stale() {
        let (store, release) = Store::new();
        let mut f = form(&store);
        f.mark_visible(true);
        f.set_instance_id("a".into());
        assert_eq!(f.poll_blocking(WAIT), Some(FormEvent::Loaded));

        assert!(f.submit(Record {
            id: "a".into(),
            name: "hold a".into(),
        }));
        f.set_instance_id("b".into());
        assert_eq!(f.poll_blocking(WAIT), Some(FormEvent::Loaded));

        release.send(()).unwrap();
        assert_eq!(f.poll_blocking(WAIT), Some(FormEvent::Stale));
        assert!(!f.is_submitting());
        assert_eq!(f.instance_id().map(String::as_str), Some("b"));
        assert_eq!(f.instance().map(|r| r.name.as_str()), Some("name of b"));
    }

    #[test]
    fn test_save_finishing_after_clear_is_stale() {
        let (store, release) = Store::new();
        let mut f = form(&store);
        f.mark_visible(true);
        f.set_instance_id("a".into());
        f.poll_blocking(WAIT);

        f.submit(Record {
            id: "a".into(),
            name: "hold a".into(),
        });
        f.clear_instance_id();

        release.send(()).unwrap();
        assert_eq!(f.poll_blocking(WAIT), Some(FormEvent::Stale));
        assert_eq!(f.instance_id(), None);
        assert!(f.instance().is_none());
        // The form can save again.
        assert!(f.submit(Record {
            id: String::new(),
            name: "fresh".into(),
        }));
        assert_eq!(f.poll_blocking(WAIT), Some(FormEvent::Saved));
        assert_eq!(f.instance_id().map(String::as_str), Some("new-1"));
    }
}
