//! In-memory identity directory.
//!
//! [`Directory`] stands in for the console's REST API: it serves paginated,
//! searchable, ordered user and group lists and loads/saves single users. Calls
//! sleep for a configurable latency and can be told to fail, so the views'
//! loading and error paths are exercised the same way a remote API would.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use color_eyre::eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ConsoleConfig;
use crate::error::SourceError;
use crate::page::Page;
use crate::state::{CollectionSource, EntitySource, Identified, PageRequest, SortKey};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub pk: u32,
    pub username: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default)]
    pub groups: Vec<Uuid>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub pk: Uuid,
    pub name: String,
    #[serde(default)]
    pub is_superuser: bool,
}

impl Identified for User {
    type Key = u32;

    fn key(&self) -> u32 {
        self.pk
    }
}

impl Identified for Group {
    type Key = Uuid;

    fn key(&self) -> Uuid {
        self.pk
    }
}

const USER_ORDERING: &[&str] = &["pk", "username", "name", "email", "is_active", "last_login"];
const GROUP_ORDERING: &[&str] = &["name", "is_superuser"];

/// Serialized form of a directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectoryData {
    pub users: Vec<User>,
    pub groups: Vec<Group>,
}

#[derive(Debug, Default)]
pub struct Directory {
    data: RwLock<DirectoryData>,
    latency: Duration,
    failures: AtomicU32,
    path: Option<PathBuf>,
}

impl Directory {
    pub fn new(data: DirectoryData) -> Self {
        Self {
            data: RwLock::new(data),
            ..Default::default()
        }
    }

    /// A directory populated with sample users and groups.
    pub fn sample() -> Self {
        let admins = Group {
            pk: Uuid::new_v4(),
            name: "admins".into(),
            is_superuser: true,
        };
        let engineering = Group {
            pk: Uuid::new_v4(),
            name: "engineering".into(),
            is_superuser: false,
        };
        let support = Group {
            pk: Uuid::new_v4(),
            name: "support".into(),
            is_superuser: false,
        };
        let contractors = Group {
            pk: Uuid::new_v4(),
            name: "contractors".into(),
            is_superuser: false,
        };

        let first = [
            "Alice", "Bob", "Carol", "Dave", "Eve", "Frank", "Grace", "Heidi", "Ivan",
        ];
        let last = ["Chen", "Smith", "Davis", "Wilson", "Johnson"];
        let epoch = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).single();

        let users = first
            .iter()
            .flat_map(|f| last.iter().map(move |l| (*f, *l)))
            .enumerate()
            .map(|(idx, (f, l))| {
                let pk = idx as u32 + 1;
                let groups = match pk % 4 {
                    0 => vec![admins.pk],
                    1 => vec![engineering.pk],
                    2 => vec![support.pk, engineering.pk],
                    _ => vec![contractors.pk],
                };
                User {
                    pk,
                    username: format!("{}.{}", f.to_lowercase(), l.to_lowercase()),
                    name: format!("{f} {l}"),
                    email: format!("{}.{}@example.com", f.to_lowercase(), l.to_lowercase()),
                    is_active: pk % 7 != 0,
                    last_login: if pk % 5 == 0 {
                        None
                    } else {
                        epoch.map(|e| e + chrono::Duration::hours(i64::from(pk) * 13))
                    },
                    groups,
                }
            })
            .collect();

        Self::new(DirectoryData {
            users,
            groups: vec![admins, engineering, support, contractors],
        })
    }

    /// Loads a directory from a JSON fixture; later saves are written back to it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .wrap_err_with(|| format!("reading directory {}", path.display()))?;
        let data: DirectoryData = serde_json::from_str(&raw)
            .wrap_err_with(|| format!("parsing directory {}", path.display()))?;
        Ok(Self {
            path: Some(path.to_path_buf()),
            ..Self::new(data)
        })
    }

    /// Builds the directory a console run talks to: the configured fixture or
    /// the sample data, with the configured latency and startup failures.
    pub fn from_config(config: &ConsoleConfig) -> Result<Self> {
        let directory = match &config.directory {
            Some(path) => Self::load(path)?,
            None => Self::sample(),
        }
        .with_latency(config.latency());
        if config.fail_first_n > 0 {
            debug!(count = config.fail_first_n, "injecting directory failures");
            directory.fail_next(config.fail_first_n);
        }
        Ok(directory)
    }

    /// Writes the directory as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&*self.read())?;
        fs::write(path, json).wrap_err_with(|| format!("writing directory {}", path.display()))?;
        Ok(())
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Makes the next `count` calls fail as if the API were unreachable.
    pub fn fail_next(&self, count: u32) {
        self.failures.store(count, AtomicOrdering::SeqCst);
    }

    pub fn user_count(&self) -> usize {
        self.read().users.len()
    }

    fn read(&self) -> RwLockReadGuard<'_, DirectoryData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, DirectoryData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Simulates the round trip and any injected failure.
    fn round_trip(&self) -> Result<(), SourceError> {
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        let failed = self
            .failures
            .fetch_update(AtomicOrdering::SeqCst, AtomicOrdering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(SourceError::Unavailable("directory did not respond".into()));
        }
        Ok(())
    }

    fn persist(&self) {
        if let Some(path) = &self.path {
            if let Err(err) = self.save(path) {
                warn!(path = %path.display(), error = %err, "failed to persist directory");
            }
        }
    }

    fn validate_user(
        directory: &DirectoryData,
        id: Option<u32>,
        user: &User,
    ) -> Result<(), SourceError> {
        let mut fields: BTreeMap<String, Vec<String>> = BTreeMap::new();
        if user.username.trim().is_empty() {
            fields
                .entry("username".into())
                .or_default()
                .push("This field may not be blank.".into());
        } else if directory
            .users
            .iter()
            .any(|u| u.username == user.username && Some(u.pk) != id)
        {
            fields
                .entry("username".into())
                .or_default()
                .push("A user with that username already exists.".into());
        }
        if !user.email.is_empty() && !user.email.contains('@') {
            fields
                .entry("email".into())
                .or_default()
                .push("Enter a valid email address.".into());
        }

        if fields.is_empty() {
            Ok(())
        } else {
            Err(SourceError::Invalid(fields))
        }
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Orders `items` by the request's ordering, rejecting unknown fields.
fn ordered<T>(
    mut items: Vec<T>,
    ordering: Option<&str>,
    fields: &[&str],
    compare: impl Fn(&T, &T, &str) -> Ordering,
) -> Result<Vec<T>, SourceError> {
    if let Some(raw) = ordering {
        let key = SortKey::parse(raw);
        if !fields.contains(&key.field()) {
            return Err(SourceError::Rejected(format!(
                "cannot order by `{}`",
                key.field()
            )));
        }
        items.sort_by(|a, b| {
            let order = compare(a, b, key.field());
            if key.is_descending() {
                order.reverse()
            } else {
                order
            }
        });
    }
    Ok(items)
}

fn compare_users(a: &User, b: &User, field: &str) -> Ordering {
    match field {
        "username" => a.username.cmp(&b.username),
        "name" => a.name.cmp(&b.name),
        "email" => a.email.cmp(&b.email),
        "is_active" => a.is_active.cmp(&b.is_active),
        "last_login" => a.last_login.cmp(&b.last_login),
        _ => a.pk.cmp(&b.pk),
    }
}

fn compare_groups(a: &Group, b: &Group, field: &str) -> Ordering {
    match field {
        "is_superuser" => a.is_superuser.cmp(&b.is_superuser),
        _ => a.name.cmp(&b.name),
    }
}

impl CollectionSource<User> for Directory {
    fn fetch_page(&self, request: &PageRequest) -> Result<Page<User>, SourceError> {
        self.round_trip()?;
        let needle = request.search.as_deref().map(str::to_lowercase);
        let users: Vec<User> = self
            .read()
            .users
            .iter()
            .filter(|u| {
                needle.as_deref().is_none_or(|n| {
                    contains_ci(&u.username, n) || contains_ci(&u.name, n) || contains_ci(&u.email, n)
                })
            })
            .cloned()
            .collect();

        let users = ordered(users, request.ordering.as_deref(), USER_ORDERING, compare_users)?;
        debug!(page = request.page, matched = users.len(), "serving users");
        Ok(Page::paginate(users, request.page, request.page_size))
    }
}

impl CollectionSource<Group> for Directory {
    fn fetch_page(&self, request: &PageRequest) -> Result<Page<Group>, SourceError> {
        self.round_trip()?;
        let needle = request.search.as_deref().map(str::to_lowercase);
        let mut groups: Vec<Group> = self
            .read()
            .groups
            .iter()
            .filter(|g| needle.as_deref().is_none_or(|n| contains_ci(&g.name, n)))
            .cloned()
            .collect();
        groups.sort_by(|a, b| a.name.cmp(&b.name));

        let groups = ordered(groups, request.ordering.as_deref(), GROUP_ORDERING, compare_groups)?;
        Ok(Page::paginate(groups, request.page, request.page_size))
    }
}

impl EntitySource<u32, User> for Directory {
    fn load_instance(&self, id: &u32) -> Result<User, SourceError> {
        self.round_trip()?;
        self.read()
            .users
            .iter()
            .find(|u| u.pk == *id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound {
                kind: "user",
                id: id.to_string(),
            })
    }

    fn send(&self, id: Option<&u32>, data: User) -> Result<User, SourceError> {
        self.round_trip()?;

        let saved = {
            let mut directory = self.write();
            Self::validate_user(&directory, id.copied(), &data)?;
            match id {
                Some(pk) => {
                    let slot = directory
                        .users
                        .iter_mut()
                        .find(|u| u.pk == *pk)
                        .ok_or_else(|| SourceError::NotFound {
                            kind: "user",
                            id: pk.to_string(),
                        })?;
                    *slot = User { pk: *pk, ..data };
                    slot.clone()
                }
                None => {
                    let pk = directory
                        .users
                        .iter()
                        .map(|u| u.pk)
                        .max()
                        .unwrap_or(0)
                        .checked_add(1)
                        .ok_or_else(|| SourceError::Rejected("user ids exhausted".into()))?;
                    let user = User { pk, ..data };
                    directory.users.push(user.clone());
                    user
                }
            }
        };
        self.persist();
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(page: u32) -> PageRequest {
        PageRequest {
            page,
            page_size: 20,
            ordering: None,
            search: None,
        }
    }

    fn users(directory: &Directory, request: &PageRequest) -> Result<Page<User>, SourceError> {
        CollectionSource::<User>::fetch_page(directory, request)
    }

    #[test]
    fn test_sample_paginates() {
        let directory = Directory::sample();
        assert_eq!(directory.user_count(), 45);

        let page = users(&directory, &request(3)).unwrap();
        assert_eq!(page.pagination.count, 45);
        assert_eq!(page.pagination.total_pages, 3);
        assert_eq!(page.len(), 5);
        assert_eq!(page.results[0].pk, 41);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let directory = Directory::sample();
        let page = users(
            &directory,
            &PageRequest {
                search: Some("ALICE".into()),
                ..request(1)
            },
        )
        .unwrap();
        assert_eq!(page.pagination.count, 5);
        assert!(page.results.iter().all(|u| u.username.starts_with("alice.")));
    }

    #[test]
    fn test_ordering_descending() {
        let directory = Directory::sample();
        let page = users(
            &directory,
            &PageRequest {
                ordering: Some("-username".into()),
                ..request(1)
            },
        )
        .unwrap();
        let names: Vec<_> = page.results.iter().map(|u| u.username.clone()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        sorted.reverse();
        assert_eq!(names, sorted);
        assert!(names[0].starts_with("ivan."));
    }

    #[test]
    fn test_unknown_ordering_rejected() {
        let directory = Directory::sample();
        let err = users(
            &directory,
            &PageRequest {
                ordering: Some("password".into()),
                ..request(1)
            },
        )
        .unwrap_err();
        assert_eq!(err, SourceError::Rejected("cannot order by `password`".into()));
    }

    #[test]
    fn test_groups_page() {
        let directory = Directory::sample();
        let page = CollectionSource::<Group>::fetch_page(&directory, &request(1)).unwrap();
        let names: Vec<_> = page.results.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["admins", "contractors", "engineering", "support"]);
    }

    #[test]
    fn test_injected_failures() {
        let directory = Directory::sample();
        directory.fail_next(1);
        assert!(matches!(
            users(&directory, &request(1)),
            Err(SourceError::Unavailable(_))
        ));
        assert!(users(&directory, &request(1)).is_ok());
    }

    #[test]
    fn test_configured_failures() {
        let config = ConsoleConfig {
            latency_ms: 0,
            fail_first_n: 2,
            ..ConsoleConfig::default()
        };
        let directory = Directory::from_config(&config).unwrap();
        assert!(users(&directory, &request(1)).is_err());
        assert!(directory.load_instance(&1).is_err());
        assert!(users(&directory, &request(1)).is_ok());
    }

    #[test]
    fn test_load_missing_user() {
        let directory = Directory::sample();
        assert_eq!(
            directory.load_instance(&999),
            Err(SourceError::NotFound {
                kind: "user",
                id: "999".into()
            })
        );
        assert_eq!(directory.load_instance(&1).unwrap().username, "alice.chen");
    }

    #[test]
    fn test_save_updates_user() {
        let directory = Directory::sample();
        let mut user = directory.load_instance(&2).unwrap();
        user.name = "Alice Smythe".into();
        user.pk = 77;

        let saved = directory.send(Some(&2), user).unwrap();
        assert_eq!(saved.pk, 2);
        assert_eq!(directory.load_instance(&2).unwrap().name, "Alice Smythe");
    }

    #[test]
    fn test_save_validates() {
        let directory = Directory::sample();
        let mut user = directory.load_instance(&2).unwrap();
        user.username = "alice.chen".into();
        user.email = "nope".into();

        match directory.send(Some(&2), user) {
            Err(SourceError::Invalid(fields)) => {
                assert_eq!(
                    fields.keys().cloned().collect::<Vec<_>>(),
                    ["email", "username"]
                );
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_create_assigns_next_pk() {
        let directory = Directory::sample();
        let created = directory
            .send(
                None,
                User {
                    pk: 0,
                    username: "judy.new".into(),
                    name: "Judy New".into(),
                    email: String::new(),
                    is_active: true,
                    last_login: None,
                    groups: Vec::new(),
                },
            )
            .unwrap();
        assert_eq!(created.pk, 46);
        assert_eq!(directory.user_count(), 46);
    }

    fn new_user(username: &str) -> User {
        User {
            pk: 0,
            username: username.into(),
            name: "New User".into(),
            email: String::new(),
            is_active: true,
            last_login: None,
            groups: Vec::new(),
        }
    }

    #[test]
    fn test_create_after_last_pk_is_rejected() {
        let last = User {
            pk: u32::MAX,
            ..new_user("last")
        };
        let directory = Directory::new(DirectoryData {
            users: vec![last],
            groups: Vec::new(),
        });

        assert_eq!(
            directory.send(None, new_user("one.more")),
            Err(SourceError::Rejected("user ids exhausted".into()))
        );
        assert_eq!(directory.user_count(), 1);
    }

    #[test]
    fn test_concurrent_creates_keep_usernames_unique() {
        let directory = Directory::sample().with_latency(Duration::from_millis(30));
        let results: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = (0..2)
                .map(|_| scope.spawn(|| directory.send(None, new_user("twin"))))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(SourceError::Invalid(fields)) if fields.contains_key("username"))));
        assert_eq!(directory.user_count(), 46);
    }

    #[test]
    fn test_fixture_roundtrip_persists_saves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("directory.json");
        Directory::sample().save(&path).unwrap();

        let directory = Directory::load(&path).unwrap();
        let mut user = directory.load_instance(&3).unwrap();
        user.is_active = false;
        directory.send(Some(&3), user).unwrap();

        let reloaded = Directory::load(&path).unwrap();
        assert!(!reloaded.load_instance(&3).unwrap().is_active);
        assert_eq!(reloaded.user_count(), 45);
    }

    #[test]
    fn test_fixture_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("directory.json");
        fs::write(
            &path,
            r#"{"users": [{"pk": 1, "username": "root", "name": "Root"}], "groups": []}"#,
        )
        .unwrap();

        let directory = Directory::load(&path).unwrap();
        let root = directory.load_instance(&1).unwrap();
        assert!(root.is_active);
        assert!(root.last_login.is_none());
    }
}
