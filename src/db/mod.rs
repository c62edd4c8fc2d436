use crate::models::{
    Department, EventStatus, Nomination, Role, SurveyEvaluation, User, Vote, VotingEvent,
};
use chrono::{DateTime, Utc};
use sqlx::{
    Row, Sqlite,
    migrate::MigrateDatabase,
    sqlite::{SqlitePool, SqlitePoolOptions},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("invalid stored json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid stored timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),
    #[error("unknown event status: {0}")]
    UnknownStatus(String),
    #[error("unknown role: {0}")]
    UnknownRole(String),
    #[error("unknown department: {0}")]
    UnknownDepartment(String),
}

// Everything the calculator needs for one event, fetched in one go before
// any computation happens.
#[derive(Debug, Clone)]
pub struct EventSnapshot {
    pub event: VotingEvent,
    pub nominations: Vec<Nomination>,
    pub votes: Vec<Vote>,
    pub evaluations: Vec<SurveyEvaluation>,
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(db_url: &str) -> Result<Self, StoreError> {
        if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            Sqlite::create_database(db_url).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await?;

        Self::init_schema(&pool).await?;

        Ok(Self { pool })
    }

    // A fresh in-memory store. Single connection: every pooled sqlite
    // `:memory:` connection would otherwise see its own empty database.
    #[cfg(test)]
    pub(crate) async fn connect_in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        Self::init_schema(&pool).await?;

        Ok(Self { pool })
    }

    async fn init_schema(pool: &SqlitePool) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                department TEXT NOT NULL,
                role TEXT NOT NULL,
                avatar TEXT
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS voting_events (
                id TEXT PRIMARY KEY,
                month_label TEXT NOT NULL,
                status TEXT NOT NULL,
                start_date TEXT,
                end_date TEXT,
                questions TEXT NOT NULL,
                winner_id TEXT,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS nominations (
                id TEXT PRIMARY KEY,
                event_id TEXT NOT NULL,
                collaborator_id TEXT NOT NULL,
                nominated_by_id TEXT NOT NULL,
                nomination_date TEXT NOT NULL,
                FOREIGN KEY (event_id) REFERENCES voting_events(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        // One ballot per voter per event; re-voting replaces the ballot.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS votes (
                id TEXT PRIMARY KEY,
                event_id TEXT NOT NULL,
                voter_id TEXT NOT NULL,
                voted_for TEXT NOT NULL,
                vote_date TEXT NOT NULL,
                UNIQUE (event_id, voter_id),
                FOREIGN KEY (event_id) REFERENCES voting_events(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS survey_evaluations (
                id TEXT PRIMARY KEY,
                event_id TEXT NOT NULL,
                evaluator_id TEXT NOT NULL,
                evaluated_user_id TEXT NOT NULL,
                scores TEXT NOT NULL,
                UNIQUE (event_id, evaluator_id, evaluated_user_id),
                FOREIGN KEY (event_id) REFERENCES voting_events(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    // --- users ---

    pub async fn upsert_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, department, role, avatar)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id)
            DO UPDATE SET name = excluded.name, department = excluded.department,
                          role = excluded.role, avatar = excluded.avatar
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(user.department.as_str())
        .bind(user.role.as_str())
        .bind(&user.avatar)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, department, role, avatar
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(user_from_row).transpose()
    }

    pub async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, department, role, avatar
            FROM users
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(user_from_row).collect()
    }

    // --- voting events ---

    pub async fn create_event(&self, event: &VotingEvent) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO voting_events (id, month_label, status, start_date, end_date, questions, winner_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.id)
        .bind(&event.month_label)
        .bind(event.status.as_str())
        .bind(event.start_date.map(|dt| dt.to_rfc3339()))
        .bind(event.end_date.map(|dt| dt.to_rfc3339()))
        .bind(serde_json::to_string(&event.questions)?)
        .bind(&event.winner_id)
        .bind(event.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_event(&self, event_id: &str) -> Result<Option<VotingEvent>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, month_label, status, start_date, end_date, questions, winner_id, created_at
            FROM voting_events
            WHERE id = ?
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(event_from_row).transpose()
    }

    pub async fn list_events(&self) -> Result<Vec<VotingEvent>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, month_label, status, start_date, end_date, questions, winner_id, created_at
            FROM voting_events
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(event_from_row).collect()
    }

    pub async fn list_active_events(&self) -> Result<Vec<VotingEvent>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, month_label, status, start_date, end_date, questions, winner_id, created_at
            FROM voting_events
            WHERE status = 'active'
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(event_from_row).collect()
    }

    pub async fn set_event_status(
        &self,
        event_id: &str,
        status: EventStatus,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE voting_events
            SET status = ?
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(event_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn set_event_winner(
        &self,
        event_id: &str,
        winner_id: Option<&str>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE voting_events
            SET winner_id = ?
            WHERE id = ?
            "#,
        )
        .bind(winner_id)
        .bind(event_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // --- nominations ---

    pub async fn insert_nomination(&self, nomination: &Nomination) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO nominations (id, event_id, collaborator_id, nominated_by_id, nomination_date)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&nomination.id)
        .bind(&nomination.event_id)
        .bind(&nomination.collaborator_id)
        .bind(&nomination.nominated_by_id)
        .bind(nomination.nomination_date.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn nominations_for_event(
        &self,
        event_id: &str,
    ) -> Result<Vec<Nomination>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_id, collaborator_id, nominated_by_id, nomination_date
            FROM nominations
            WHERE event_id = ?
            ORDER BY nomination_date
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(nomination_from_row).collect()
    }

    // --- votes ---

    pub async fn save_vote(&self, vote: &Vote) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO votes (id, event_id, voter_id, voted_for, vote_date)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(event_id, voter_id)
            DO UPDATE SET voted_for = excluded.voted_for, vote_date = excluded.vote_date
            "#,
        )
        .bind(&vote.id)
        .bind(&vote.event_id)
        .bind(&vote.voter_id)
        .bind(serde_json::to_string(&vote.voted_for)?)
        .bind(vote.vote_date.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn votes_for_event(&self, event_id: &str) -> Result<Vec<Vote>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_id, voter_id, voted_for, vote_date
            FROM votes
            WHERE event_id = ?
            ORDER BY vote_date
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(vote_from_row).collect()
    }

    // --- survey evaluations ---

    pub async fn save_evaluation(&self, evaluation: &SurveyEvaluation) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO survey_evaluations (id, event_id, evaluator_id, evaluated_user_id, scores)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(event_id, evaluator_id, evaluated_user_id)
            DO UPDATE SET scores = excluded.scores
            "#,
        )
        .bind(&evaluation.id)
        .bind(&evaluation.event_id)
        .bind(&evaluation.evaluator_id)
        .bind(&evaluation.evaluated_user_id)
        .bind(serde_json::to_string(&evaluation.scores)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn evaluations_for_event(
        &self,
        event_id: &str,
    ) -> Result<Vec<SurveyEvaluation>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_id, evaluator_id, evaluated_user_id, scores
            FROM survey_evaluations
            WHERE event_id = ?
            ORDER BY id
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(evaluation_from_row).collect()
    }

    // Gather every collection the calculator reads, then let it compute
    // over the snapshot. None if the event does not exist.
    pub async fn event_snapshot(
        &self,
        event_id: &str,
    ) -> Result<Option<EventSnapshot>, StoreError> {
        let Some(event) = self.get_event(event_id).await? else {
            return Ok(None);
        };

        let nominations = self.nominations_for_event(event_id).await?;
        let votes = self.votes_for_event(event_id).await?;
        let evaluations = self.evaluations_for_event(event_id).await?;

        Ok(Some(EventSnapshot {
            event,
            nominations,
            votes,
            evaluations,
        }))
    }
}

// --- row mapping ---

fn parse_datetime(value: &str) -> Result<DateTime<Utc>, StoreError> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

fn parse_optional_datetime(value: Option<String>) -> Result<Option<DateTime<Utc>>, StoreError> {
    value.as_deref().map(parse_datetime).transpose()
}

fn parse_status(value: &str) -> Result<EventStatus, StoreError> {
    match value {
        "pending" => Ok(EventStatus::Pending),
        "active" => Ok(EventStatus::Active),
        "closed" => Ok(EventStatus::Closed),
        other => Err(StoreError::UnknownStatus(other.to_string())),
    }
}

fn parse_role(value: &str) -> Result<Role, StoreError> {
    match value {
        "admin" => Ok(Role::Admin),
        "supervisor" => Ok(Role::Supervisor),
        "coordinator" => Ok(Role::Coordinator),
        "collaborator" => Ok(Role::Collaborator),
        other => Err(StoreError::UnknownRole(other.to_string())),
    }
}

fn parse_department(value: &str) -> Result<Department, StoreError> {
    match value {
        "operations" => Ok(Department::Operations),
        "sales" => Ok(Department::Sales),
        "finance" => Ok(Department::Finance),
        "human_resources" => Ok(Department::HumanResources),
        "technology" => Ok(Department::Technology),
        "customer_service" => Ok(Department::CustomerService),
        other => Err(StoreError::UnknownDepartment(other.to_string())),
    }
}

fn user_from_row(row: sqlx::sqlite::SqliteRow) -> Result<User, StoreError> {
    Ok(User {
        id: row.get("id"),
        name: row.get("name"),
        department: parse_department(&row.get::<String, _>("department"))?,
        role: parse_role(&row.get::<String, _>("role"))?,
        avatar: row.get("avatar"),
    })
}

fn event_from_row(row: sqlx::sqlite::SqliteRow) -> Result<VotingEvent, StoreError> {
    Ok(VotingEvent {
        id: row.get("id"),
        month_label: row.get("month_label"),
        status: parse_status(&row.get::<String, _>("status"))?,
        start_date: parse_optional_datetime(row.get("start_date"))?,
        end_date: parse_optional_datetime(row.get("end_date"))?,
        questions: serde_json::from_str(&row.get::<String, _>("questions"))?,
        winner_id: row.get("winner_id"),
        created_at: parse_datetime(&row.get::<String, _>("created_at"))?,
    })
}

fn nomination_from_row(row: sqlx::sqlite::SqliteRow) -> Result<Nomination, StoreError> {
    Ok(Nomination {
        id: row.get("id"),
        event_id: row.get("event_id"),
        collaborator_id: row.get("collaborator_id"),
        nominated_by_id: row.get("nominated_by_id"),
        nomination_date: parse_datetime(&row.get::<String, _>("nomination_date"))?,
    })
}

fn vote_from_row(row: sqlx::sqlite::SqliteRow) -> Result<Vote, StoreError> {
    Ok(Vote {
        id: row.get("id"),
        event_id: row.get("event_id"),
        voter_id: row.get("voter_id"),
        voted_for: serde_json::from_str(&row.get::<String, _>("voted_for"))?,
        vote_date: parse_datetime(&row.get::<String, _>("vote_date"))?,
    })
}

fn evaluation_from_row(row: sqlx::sqlite::SqliteRow) -> Result<SurveyEvaluation, StoreError> {
    Ok(SurveyEvaluation {
        id: row.get("id"),
        event_id: row.get("event_id"),
        evaluator_id: row.get("evaluator_id"),
        evaluated_user_id: row.get("evaluated_user_id"),
        scores: serde_json::from_str(&row.get::<String, _>("scores"))?,
    })
}
