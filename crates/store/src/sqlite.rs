//! SQLite 스토어
//!
//! 단일 `advisories` 테이블을 사용합니다. 식별자가 PRIMARY KEY이므로 중복 삽입은
//! 제약 조건 위반으로 감지되어 [`StorageError::Duplicate`]로 변환됩니다.
//!
//! rusqlite 호출은 블로킹이므로 모두 `spawn_blocking`에서 실행합니다.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use tracing::{debug, info};

use errwatch_core::error::StorageError;
use errwatch_core::pipeline::AdvisoryStore;
use errwatch_core::types::{Advisory, AdvisoryId, AdvisoryRecord, CveId};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS advisories (
    id          TEXT PRIMARY KEY,
    synopsis    TEXT NOT NULL,
    link        TEXT NOT NULL,
    severity    REAL,
    cves        TEXT NOT NULL DEFAULT '',
    observed_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_advisories_observed_at ON advisories (observed_at);
"#;

const SELECT_COLUMNS: &str = "id, synopsis, link, severity, cves, observed_at";

/// SQLite 기반 권고 스토어
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// 경로의 데이터베이스를 열거나 생성합니다. 상위 디렉토리가 없으면 만듭니다.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Connection(format!(
                    "failed to create store directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let conn = Connection::open(path).map_err(|e| {
            StorageError::Connection(format!("failed to open {}: {e}", path.display()))
        })?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(query_error)?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(query_error)?;

        let store = Self::from_connection(conn, Some(path.to_path_buf()))?;
        info!(path = %path.display(), "advisory store opened");
        Ok(store)
    }

    /// 메모리 데이터베이스를 엽니다.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Self::from_connection(conn, None)
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self, StorageError> {
        conn.execute_batch(SCHEMA_SQL).map_err(query_error)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    /// 데이터베이스 파일 경로 (메모리 DB는 `None`)
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn call<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StorageError::Connection("sqlite connection lock poisoned".to_owned()))?;
            f(&guard)
        })
        .await
        .map_err(|e| StorageError::Connection(format!("blocking task failed: {e}")))?
    }
}

impl AdvisoryStore for SqliteStore {
    async fn find(&self, id: &AdvisoryId) -> Result<Option<AdvisoryRecord>, StorageError> {
        let id = id.as_str().to_owned();
        self.call(move |conn| {
            conn.query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM advisories WHERE id = ?1"),
                params![id],
                read_row,
            )
            .optional()
            .map_err(query_error)?
            .transpose()
        })
        .await
    }

    async fn insert(&self, advisory: &Advisory) -> Result<(), StorageError> {
        let record = AdvisoryRecord::observed_now(advisory.clone());
        self.call(move |conn| {
            let advisory = &record.advisory;
            let cves = advisory
                .cves
                .iter()
                .map(CveId::as_str)
                .collect::<Vec<_>>()
                .join(",");
            conn.execute(
                "INSERT INTO advisories (id, synopsis, link, severity, cves, observed_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    advisory.id.as_str(),
                    advisory.synopsis,
                    advisory.link,
                    advisory.severity,
                    cves,
                    record
                        .observed_at
                        .to_rfc3339_opts(SecondsFormat::Micros, true),
                ],
            )
            .map_err(|e| match e.sqlite_error_code() {
                Some(ErrorCode::ConstraintViolation) => StorageError::Duplicate {
                    id: advisory.id.to_string(),
                },
                _ => query_error(e),
            })?;
            debug!(advisory = %advisory.id, "advisory recorded");
            Ok(())
        })
        .await
    }

    async fn list_all(&self) -> Result<Vec<AdvisoryRecord>, StorageError> {
        self.call(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {SELECT_COLUMNS} FROM advisories ORDER BY observed_at DESC, rowid DESC"
                ))
                .map_err(query_error)?;
            let rows = stmt.query_map([], read_row).map_err(query_error)?;

            let mut records = Vec::new();
            for row in rows {
                records.push(row.map_err(query_error)??);
            }
            Ok(records)
        })
        .await
    }
}

/// 행을 레코드로 변환합니다. 시각 형식 오류는 내부 결과로 돌려줍니다.
fn read_row(row: &Row<'_>) -> rusqlite::Result<Result<AdvisoryRecord, StorageError>> {
    let id: String = row.get(0)?;
    let synopsis: String = row.get(1)?;
    let link: String = row.get(2)?;
    let severity: Option<f64> = row.get(3)?;
    let cves: String = row.get(4)?;
    let observed_at: String = row.get(5)?;

    let observed_at = match DateTime::parse_from_rfc3339(&observed_at) {
        Ok(ts) => ts.with_timezone(&Utc),
        Err(e) => {
            return Ok(Err(StorageError::Query(format!(
                "invalid observed_at '{observed_at}' for {id}: {e}"
            ))));
        }
    };

    let mut advisory = Advisory::new(AdvisoryId::new(id), synopsis, link);
    advisory.severity = severity;
    advisory.cves = cves.split(',').filter_map(CveId::parse).collect();

    Ok(Ok(AdvisoryRecord {
        advisory,
        observed_at,
    }))
}

fn query_error(e: rusqlite::Error) -> StorageError {
    StorageError::Query(e.to_string())
}
