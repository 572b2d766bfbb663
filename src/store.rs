use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eyre::{Result, WrapErr};
use fs2::FileExt;
use log::debug;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;

use crate::summarize::StructuredSummary;

/// Account holding a credit balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub credits: i64,
}

/// A persisted summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub id: String,
    pub user_id: String,
    pub video_id: String,
    pub video_title: String,
    pub summary_data: StructuredSummary,
    pub created_at: DateTime<Utc>,
}

/// Fields of a summary before the store assigns its id
#[derive(Debug, Clone, PartialEq)]
pub struct NewSummary {
    pub user_id: String,
    pub video_id: String,
    pub video_title: String,
    pub summary_data: StructuredSummary,
}

/// User accounts and their credit balances. Lookups return `Ok(None)` for unknown users.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn create(&self, user: User) -> Result<User>;
    /// Set the balance; `Ok(None)` when no such user exists
    async fn update_credits(&self, id: &str, credits: i64) -> Result<Option<User>>;
}

/// Persisted summaries. Ownership checks are the caller's job.
#[async_trait]
pub trait SummaryStore: Send + Sync {
    async fn insert_summary(&self, summary: NewSummary) -> Result<String>;
    /// Newest first; `page` is 1-based. Returns the page and the total count.
    async fn list_by_user(&self, user_id: &str, page: usize, page_size: usize) -> Result<(Vec<SummaryRecord>, usize)>;
    async fn get_by_id(&self, id: &str) -> Result<Option<SummaryRecord>>;
    /// `false` when nothing was deleted
    async fn delete_by_id(&self, id: &str) -> Result<bool>;
}

/// Store backed by `users.json` and `summaries.json` in a data directory.
///
/// Every operation holds an exclusive lock on `ytsum.lock` in that directory,
/// so separate handles and separate processes sharing it see each other's writes.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

const USERS_FILE: &str = "users.json";
const SUMMARIES_FILE: &str = "summaries.json";
const LOCK_FILE: &str = "ytsum.lock";

impl JsonFileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).wrap_err_with(|| format!("creating data dir {}", dir.display()))?;
        debug!("Opened store at {}", dir.display());
        Ok(Self { dir })
    }

    /// Run `op` on the blocking pool with the data dir locked
    async fn locked<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> Result<T> + Send + 'static,
    {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || {
            let _lock = lock_dir(&dir)?;
            op(dir.as_path())
        })
        .await
        .wrap_err("store task did not complete")?
    }
}

/// Released when the returned file is dropped
fn lock_dir(dir: &Path) -> Result<File> {
    let path = dir.join(LOCK_FILE);
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&path)
        .wrap_err_with(|| format!("opening {}", path.display()))?;
    file.lock_exclusive()
        .wrap_err_with(|| format!("locking {}", path.display()))?;
    Ok(file)
}

fn load<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = std::fs::read_to_string(path).wrap_err_with(|| format!("reading {}", path.display()))?;
    if data.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&data).wrap_err_with(|| format!("parsing {}", path.display()))
}

fn save<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).wrap_err_with(|| format!("creating temp file in {}", dir.display()))?;
    serde_json::to_writer_pretty(&mut tmp, rows).wrap_err_with(|| format!("writing {}", tmp.path().display()))?;
    tmp.flush()?;
    tmp.persist(path).wrap_err_with(|| format!("replacing {}", path.display()))?;
    Ok(())
}

#[async_trait]
impl UserStore for JsonFileStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let id = id.to_string();
        self.locked(move |dir| {
            let users: Vec<User> = load(&dir.join(USERS_FILE))?;
            Ok(users.into_iter().find(|u| u.id == id))
        })
        .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.to_string();
        self.locked(move |dir| {
            let users: Vec<User> = load(&dir.join(USERS_FILE))?;
            Ok(users.into_iter().find(|u| u.email.eq_ignore_ascii_case(&email)))
        })
        .await
    }

    async fn create(&self, user: User) -> Result<User> {
        self.locked(move |dir| {
            let path = dir.join(USERS_FILE);
            let mut users: Vec<User> = load(&path)?;
            if users.iter().any(|u| u.id == user.id || u.email.eq_ignore_ascii_case(&user.email)) {
                eyre::bail!("user {} already exists", user.email);
            }
            users.push(user.clone());
            save(&path, &users)?;
            debug!("Created user {}", user.id);
            Ok(user)
        })
        .await
    }

    async fn update_credits(&self, id: &str, credits: i64) -> Result<Option<User>> {
        let id = id.to_string();
        self.locked(move |dir| {
            let path = dir.join(USERS_FILE);
            let mut users: Vec<User> = load(&path)?;
            let Some(user) = users.iter_mut().find(|u| u.id == id) else {
                return Ok(None);
            };
            user.credits = credits;
            let updated = user.clone();
            save(&path, &users)?;
            Ok(Some(updated))
        })
        .await
    }
}

#[async_trait]
impl SummaryStore for JsonFileStore {
    async fn insert_summary(&self, summary: NewSummary) -> Result<String> {
        self.locked(move |dir| {
            let path = dir.join(SUMMARIES_FILE);
            let mut rows: Vec<SummaryRecord> = load(&path)?;
            let id = uuid::Uuid::new_v4().to_string();
            rows.push(SummaryRecord {
                id: id.clone(),
                user_id: summary.user_id,
                video_id: summary.video_id,
                video_title: summary.video_title,
                summary_data: summary.summary_data,
                created_at: Utc::now(),
            });
            save(&path, &rows)?;
            debug!("Stored summary {id}");
            Ok(id)
        })
        .await
    }

    async fn list_by_user(&self, user_id: &str, page: usize, page_size: usize) -> Result<(Vec<SummaryRecord>, usize)> {
        let user_id = user_id.to_string();
        self.locked(move |dir| {
            let rows: Vec<SummaryRecord> = load(&dir.join(SUMMARIES_FILE))?;
            let mut owned: Vec<SummaryRecord> = rows.into_iter().filter(|r| r.user_id == user_id).collect();
            // Reversed first so equal timestamps stay newest-first under the stable sort
            owned.reverse();
            owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));

            let total = owned.len();
            let offset = page.saturating_sub(1).saturating_mul(page_size);
            let records = owned.into_iter().skip(offset).take(page_size).collect();
            Ok((records, total))
        })
        .await
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<SummaryRecord>> {
        let id = id.to_string();
        self.locked(move |dir| {
            let rows: Vec<SummaryRecord> = load(&dir.join(SUMMARIES_FILE))?;
            Ok(rows.into_iter().find(|r| r.id == id))
        })
        .await
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.locked(move |dir| {
            let path = dir.join(SUMMARIES_FILE);
            let mut rows: Vec<SummaryRecord> = load(&path)?;
            let before = rows.len();
            rows.retain(|r| r.id != id);
            if rows.len() == before {
                return Ok(false);
            }
            save(&path, &rows)?;
            Ok(true)
        })
        .await
    }
}
