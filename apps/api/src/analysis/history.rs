//! History recorder: durable records for identities, ephemeral buffers for sessions.
//!
//! Anonymous callers never touch the database. Their results live in a bounded,
//! most-recent-first buffer keyed by session id, evicted once the session goes idle.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sqlx::types::Json;
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::models::analysis::{AnalysisRecord, AnalysisResult};

/// Who an analysis belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// A registered identity; results are persisted.
    Identity(i64),
    /// An anonymous client session; results stay in memory.
    Session(Uuid),
}

/// Where a result ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    Durable(i64),
    Ephemeral(i64),
}

struct SessionBuffer {
    records: VecDeque<AnalysisRecord>,
    next_id: i64,
    last_seen: DateTime<Utc>,
    /// Store-wide touch counter; the smallest value is the least recently used session.
    touched: u64,
}

#[derive(Default)]
struct Sessions {
    buffers: HashMap<Uuid, SessionBuffer>,
    clock: u64,
}

impl Sessions {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

/// Per-session ephemeral history. Cheap to clone; clones share the same map.
///
/// Each buffer holds at most `limit` records, and at most `max_sessions`
/// buffers are held at once. Making room for a new session evicts the least
/// recently used one.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<Sessions>>,
    limit: usize,
    max_sessions: usize,
    idle: Duration,
}

impl SessionStore {
    pub fn new(limit: usize, idle_minutes: i64, max_sessions: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Sessions::default())),
            limit: limit.max(1),
            max_sessions: max_sessions.max(1),
            idle: Duration::minutes(idle_minutes.max(1)),
        }
    }

    /// Prepends `record` to the session's buffer, dropping the oldest entry
    /// beyond the limit. Returns the session-local id assigned to it.
    pub async fn push(&self, session: Uuid, mut record: AnalysisRecord) -> i64 {
        let now = Utc::now();
        let mut sessions = self.inner.lock().await;
        self.evict_idle(&mut sessions, now);
        if !sessions.buffers.contains_key(&session) {
            self.make_room(&mut sessions);
        }

        let touched = sessions.tick();
        let buffer = sessions.buffers.entry(session).or_insert_with(|| SessionBuffer {
            records: VecDeque::new(),
            next_id: 1,
            last_seen: now,
            touched,
        });
        record.id = buffer.next_id;
        record.owner_id = None;
        buffer.next_id += 1;
        buffer.last_seen = now;
        buffer.touched = touched;
        buffer.records.push_front(record);
        buffer.records.truncate(self.limit);
        buffer.next_id - 1
    }

    /// Most-recent-first snapshot; empty for an unknown or expired session.
    pub async fn list(&self, session: Uuid) -> Vec<AnalysisRecord> {
        let now = Utc::now();
        let mut sessions = self.inner.lock().await;
        self.evict_idle(&mut sessions, now);

        let touched = sessions.tick();
        match sessions.buffers.get_mut(&session) {
            Some(buffer) => {
                buffer.last_seen = now;
                buffer.touched = touched;
                buffer.records.iter().cloned().collect()
            }
            None => Vec::new(),
        }
    }

    #[cfg(test)]
    pub async fn session_count(&self) -> usize {
        self.inner.lock().await.buffers.len()
    }

    fn evict_idle(&self, sessions: &mut Sessions, now: DateTime<Utc>) {
        let before = sessions.buffers.len();
        sessions
            .buffers
            .retain(|_, buffer| now - buffer.last_seen < self.idle);
        let evicted = before - sessions.buffers.len();
        if evicted > 0 {
            debug!("Evicted {evicted} idle anonymous sessions");
        }
    }

    fn make_room(&self, sessions: &mut Sessions) {
        while sessions.buffers.len() >= self.max_sessions {
            let oldest = sessions
                .buffers
                .iter()
                .min_by_key(|(_, buffer)| buffer.touched)
                .map(|(id, _)| *id);
            match oldest {
                Some(id) => {
                    sessions.buffers.remove(&id);
                    debug!("Session cap of {} reached; evicted {id}", self.max_sessions);
                }
                None => break,
            }
        }
    }
}

/// Appends results to durable or ephemeral history and reads them back.
#[derive(Clone)]
pub struct HistoryRecorder {
    db: SqlitePool,
    sessions: SessionStore,
}

impl HistoryRecorder {
    pub fn new(db: SqlitePool, sessions: SessionStore) -> Self {
        Self { db, sessions }
    }

    pub async fn record(
        &self,
        result: &AnalysisResult,
        resume_name: &str,
        job_title: &str,
        recipient: Recipient,
    ) -> Result<Recorded, sqlx::Error> {
        let created_at = Utc::now();
        match recipient {
            Recipient::Identity(owner_id) => {
                let id: i64 = sqlx::query_scalar(
                    r#"
                    INSERT INTO analysis_history
                        (resume_name, job_title, match_percentage, missing_skills,
                         recommendation, created_at, owner_id)
                    VALUES (?, ?, ?, ?, ?, ?, ?)
                    RETURNING id
                    "#,
                )
                .bind(resume_name)
                .bind(job_title)
                .bind(result.match_percentage)
                .bind(Json(&result.missing_skills))
                .bind(&result.recommendation)
                .bind(created_at)
                .bind(owner_id)
                .fetch_one(&self.db)
                .await?;
                Ok(Recorded::Durable(id))
            }
            Recipient::Session(session) => {
                let record = AnalysisRecord {
                    id: 0,
                    resume_name: resume_name.to_string(),
                    job_title: job_title.to_string(),
                    match_percentage: result.match_percentage,
                    missing_skills: Json(result.missing_skills.clone()),
                    recommendation: result.recommendation.clone(),
                    created_at,
                    owner_id: None,
                };
                let id = self.sessions.push(session, record).await;
                Ok(Recorded::Ephemeral(id))
            }
        }
    }

    /// Durable records newest first for an identity, the session buffer for a
    /// session, nothing for a caller with neither.
    pub async fn history(
        &self,
        recipient: Option<Recipient>,
    ) -> Result<Vec<AnalysisRecord>, sqlx::Error> {
        match recipient {
            Some(Recipient::Identity(owner_id)) => {
                sqlx::query_as::<_, AnalysisRecord>(
                    r#"
                    SELECT id, resume_name, job_title, match_percentage, missing_skills,
                           recommendation, created_at, owner_id
                    FROM analysis_history
                    WHERE owner_id = ?
                    ORDER BY created_at DESC, id DESC
                    "#,
                )
                .bind(owner_id)
                .fetch_all(&self.db)
                .await
            }
            Some(Recipient::Session(session)) => Ok(self.sessions.list(session).await),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    fn result(score: f64) -> AnalysisResult {
        AnalysisResult {
            match_percentage: score,
            missing_skills: vec!["AWS".to_string(), "Terraform".to_string()],
            recommendation: "Add cloud experience".to_string(),
        }
    }

    async fn insert_user(pool: &SqlitePool, username: &str) -> i64 {
        sqlx::query_scalar(
            "INSERT INTO users (username, email, password_hash, created_at) VALUES (?, ?, 'x', ?) RETURNING id",
        )
        .bind(username)
        .bind(format!("{username}@example.com"))
        .bind(Utc::now())
        .fetch_one(pool)
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_durable_record_round_trips_exact_values() {
        let pool = memory_pool().await;
        let owner = insert_user(&pool, "ada").await;
        let recorder = HistoryRecorder::new(pool, SessionStore::new(5, 60, 100));

        let recorded = recorder
            .record(&result(72.5), "resume.pdf", "job.txt", Recipient::Identity(owner))
            .await
            .unwrap();
        assert!(matches!(recorded, Recorded::Durable(_)));

        let rows = recorder
            .history(Some(Recipient::Identity(owner)))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].resume_name, "resume.pdf");
        assert_eq!(rows[0].job_title, "job.txt");
        assert_eq!(rows[0].match_percentage, 72.5);
        assert_eq!(rows[0].missing_skills.0, vec!["AWS", "Terraform"]);
        assert_eq!(rows[0].owner_id, Some(owner));
    }

    #[tokio::test]
    async fn test_durable_history_is_newest_first_and_per_owner() {
        let pool = memory_pool().await;
        let ada = insert_user(&pool, "ada").await;
        let bob = insert_user(&pool, "bob").await;
        let recorder = HistoryRecorder::new(pool, SessionStore::new(5, 60, 100));

        for (score, owner) in [(10.0, ada), (20.0, bob), (30.0, ada)] {
            recorder
                .record(&result(score), "cv.pdf", "jd.pdf", Recipient::Identity(owner))
                .await
                .unwrap();
        }

        let rows = recorder.history(Some(Recipient::Identity(ada))).await.unwrap();
        let scores: Vec<f64> = rows.iter().map(|r| r.match_percentage).collect();
        assert_eq!(scores, vec![30.0, 10.0]);
    }

    #[tokio::test]
    async fn test_unknown_owner_fails_foreign_key() {
        let pool = memory_pool().await;
        let recorder = HistoryRecorder::new(pool, SessionStore::new(5, 60, 100));

        let err = recorder
            .record(&result(50.0), "cv.pdf", "jd.pdf", Recipient::Identity(999))
            .await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_session_records_stay_out_of_the_database() {
        let pool = memory_pool().await;
        let recorder = HistoryRecorder::new(pool.clone(), SessionStore::new(5, 60, 100));
        let session = Uuid::new_v4();

        let recorded = recorder
            .record(&result(40.0), "cv.pdf", "jd.pdf", Recipient::Session(session))
            .await
            .unwrap();
        assert_eq!(recorded, Recorded::Ephemeral(1));

        let durable: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM analysis_history")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(durable, 0);

        let rows = recorder
            .history(Some(Recipient::Session(session)))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].owner_id, None);
    }

    #[tokio::test]
    async fn test_session_buffer_is_bounded_and_most_recent_first() {
        let store = SessionStore::new(2, 60, 100);
        let pool = memory_pool().await;
        let recorder = HistoryRecorder::new(pool, store.clone());
        let session = Uuid::new_v4();

        for score in [1.0, 2.0, 3.0] {
            recorder
                .record(&result(score), "cv.pdf", "jd.pdf", Recipient::Session(session))
                .await
                .unwrap();
        }

        let rows = store.list(session).await;
        let scores: Vec<f64> = rows.iter().map(|r| r.match_percentage).collect();
        assert_eq!(scores, vec![3.0, 2.0]);
        assert_eq!(rows[0].id, 3);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = SessionStore::new(5, 60, 100);
        let pool = memory_pool().await;
        let recorder = HistoryRecorder::new(pool, store.clone());
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        recorder
            .record(&result(1.0), "cv.pdf", "jd.pdf", Recipient::Session(a))
            .await
            .unwrap();

        assert_eq!(store.list(a).await.len(), 1);
        assert!(store.list(b).await.is_empty());
        assert_eq!(store.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_no_recipient_has_no_history() {
        let pool = memory_pool().await;
        let recorder = HistoryRecorder::new(pool, SessionStore::new(5, 60, 100));
        assert!(recorder.history(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_session_count_is_capped() {
        let store = SessionStore::new(3, 60, 4);
        let pool = memory_pool().await;
        let recorder = HistoryRecorder::new(pool, store.clone());

        let mut last = Uuid::nil();
        for _ in 0..50 {
            last = Uuid::new_v4();
            recorder
                .record(&result(1.0), "cv.pdf", "jd.pdf", Recipient::Session(last))
                .await
                .unwrap();
        }

        assert_eq!(store.session_count().await, 4);
        assert_eq!(store.list(last).await.len(), 1);
    }

    #[tokio::test]
    async fn test_cap_evicts_least_recently_used_session() {
        let store = SessionStore::new(3, 60, 2);
        let pool = memory_pool().await;
        let recorder = HistoryRecorder::new(pool, store.clone());
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        for session in [a, b] {
            recorder
                .record(&result(1.0), "cv.pdf", "jd.pdf", Recipient::Session(session))
                .await
                .unwrap();
        }
        // reading a keeps it warm, so b is the one to go
        assert_eq!(store.list(a).await.len(), 1);
        recorder
            .record(&result(2.0), "cv.pdf", "jd.pdf", Recipient::Session(c))
            .await
            .unwrap();

        assert_eq!(store.session_count().await, 2);
        assert_eq!(store.list(a).await.len(), 1);
        assert!(store.list(b).await.is_empty());
        assert_eq!(store.list(c).await.len(), 1);
    }

    #[tokio::test]
    async fn test_existing_session_at_cap_is_not_evicted() {
        let store = SessionStore::new(3, 60, 1);
        let pool = memory_pool().await;
        let recorder = HistoryRecorder::new(pool, store.clone());
        let session = Uuid::new_v4();

        for score in [1.0, 2.0] {
            recorder
                .record(&result(score), "cv.pdf", "jd.pdf", Recipient::Session(session))
                .await
                .unwrap();
        }
        assert_eq!(store.list(session).await.len(), 2);
    }
}
