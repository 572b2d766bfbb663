use std::sync::Arc;

use log::{debug, info};
use serde::Serialize;

use crate::store::{SummaryRecord, SummaryStore, User, UserStore};
use crate::{Error, Result};

pub const DEFAULT_PAGE_SIZE: usize = 12;

/// One page of a user's summaries, newest first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryPage {
    pub summaries: Vec<SummaryRecord>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}

impl HistoryPage {
    pub fn total_pages(&self) -> usize {
        if self.limit == 0 { 0 } else { self.total.div_ceil(self.limit) }
    }
}

/// Browsing and deleting stored summaries
#[derive(Clone)]
pub struct History {
    users: Arc<dyn UserStore>,
    summaries: Arc<dyn SummaryStore>,
}

impl History {
    pub fn new(users: Arc<dyn UserStore>, summaries: Arc<dyn SummaryStore>) -> Self {
        Self { users, summaries }
    }

    /// Account registered under `email`
    pub async fn user_by_email(&self, email: &str) -> Result<User> {
        if email.trim().is_empty() {
            return Err(Error::MissingInput("user"));
        }
        self.users
            .find_by_email(email)
            .await
            .map_err(|e| Error::Unexpected(format!("user lookup failed: {e:#}")))?
            .ok_or_else(|| Error::SessionInvalid(format!("no account for {email}")))
    }

    pub async fn list(&self, user_id: &str, page: usize, limit: usize) -> Result<HistoryPage> {
        if user_id.is_empty() {
            return Err(Error::MissingInput("user"));
        }
        let page = page.max(1);
        let limit = if limit == 0 { DEFAULT_PAGE_SIZE } else { limit };
        debug!("Listing summaries for {user_id}: page={page} limit={limit}");

        let (summaries, total) = self
            .summaries
            .list_by_user(user_id, page, limit)
            .await
            .map_err(|e| Error::PersistenceFailed(format!("{e:#}")))?;

        Ok(HistoryPage {
            summaries,
            total,
            page,
            limit,
        })
    }

    pub async fn get(&self, summary_id: &str) -> Result<SummaryRecord> {
        if summary_id.is_empty() {
            return Err(Error::MissingInput("summary id"));
        }
        self.summaries
            .get_by_id(summary_id)
            .await
            .map_err(|e| Error::PersistenceFailed(format!("{e:#}")))?
            .ok_or_else(|| Error::SummaryNotFound(summary_id.to_string()))
    }

    /// Delete a summary after confirming `user_id` owns it
    pub async fn delete(&self, summary_id: &str, user_id: &str) -> Result<()> {
        if summary_id.is_empty() {
            return Err(Error::MissingInput("summary id"));
        }
        if user_id.is_empty() {
            return Err(Error::MissingInput("user id"));
        }

        let record = self.get(summary_id).await?;
        if record.user_id != user_id {
            return Err(Error::NotOwner {
                summary_id: summary_id.to_string(),
                user_id: user_id.to_string(),
            });
        }

        let deleted = self
            .summaries
            .delete_by_id(summary_id)
            .await
            .map_err(|e| Error::PersistenceFailed(format!("{e:#}")))?;
        if !deleted {
            return Err(Error::SummaryNotFound(summary_id.to_string()));
        }

        info!("Deleted summary {summary_id}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{JsonFileStore, NewSummary};
    use crate::summarize::StructuredSummary;

    async fn setup() -> (tempfile::TempDir, History, String) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::open(dir.path()).unwrap());
        store
            .create(User {
                id: "owner".into(),
                email: "owner@example.com".into(),
                credits: 3,
            })
            .await
            .unwrap();
        let id = store
            .insert_summary(NewSummary {
                user_id: "owner".into(),
                video_id: "vid".into(),
                video_title: "A video".into(),
                summary_data: StructuredSummary {
                    overall_summary: "overview".into(),
                    sections: vec![],
                },
            })
            .await
            .unwrap();
        (dir, History::new(store.clone(), store), id)
    }

    #[tokio::test]
    async fn test_list_defaults() {
        let (_dir, history, _) = setup().await;
        let page = history.list("owner", 0, 0).await.unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(page.total, 1);
        assert_eq!(page.total_pages(), 1);
    }

    #[tokio::test]
    async fn test_delete_requires_owner() {
        let (_dir, history, id) = setup().await;
        let err = history.delete(&id, "intruder").await.unwrap_err();
        assert!(matches!(err, Error::NotOwner { .. }));
        assert!(history.get(&id).await.is_ok());

        history.delete(&id, "owner").await.unwrap();
        assert!(matches!(history.get(&id).await.unwrap_err(), Error::SummaryNotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_missing_inputs() {
        let (_dir, history, id) = setup().await;
        assert!(matches!(history.delete("", "owner").await.unwrap_err(), Error::MissingInput(_)));
        assert!(matches!(history.delete(&id, "").await.unwrap_err(), Error::MissingInput(_)));
        assert!(matches!(
            history.delete("nope", "owner").await.unwrap_err(),
            Error::SummaryNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_user_by_email() {
        let (_dir, history, _) = setup().await;
        assert_eq!(history.user_by_email("owner@example.com").await.unwrap().credits, 3);
        assert!(matches!(
            history.user_by_email("ghost@example.com").await.unwrap_err(),
            Error::SessionInvalid(_)
        ));
    }

    #[test]
    fn test_total_pages() {
        let page = HistoryPage {
            summaries: vec![],
            total: 25,
            page: 1,
            limit: 12,
        };
        assert_eq!(page.total_pages(), 3);
    }
}
