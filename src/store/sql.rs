use super::{GroupStore, StoreError};
use crate::model::{
    Division, EvaluationParameter, Group, GroupId, Guide, GuideId, Member, MemberId,
    ParameterDraft, ParameterId,
};
use crate::policy::MembershipPolicy;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};
use tracing::{debug, info};

const SCHEMA: [&str; 4] = [
    "CREATE TABLE IF NOT EXISTS guides (
        id VARCHAR(64) PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        email VARCHAR(255)
    )",
    "CREATE TABLE IF NOT EXISTS project_groups (
        id VARCHAR(64) PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        project_title VARCHAR(255) NOT NULL DEFAULT '',
        project_description VARCHAR(2000) NOT NULL DEFAULT '',
        project_technology VARCHAR(255) NOT NULL DEFAULT '',
        year INTEGER,
        course VARCHAR(64),
        semester INTEGER,
        guide_id VARCHAR(64)
    )",
    "CREATE TABLE IF NOT EXISTS students (
        id VARCHAR(64) PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        enrollment_number VARCHAR(64) NOT NULL DEFAULT '',
        group_id VARCHAR(64),
        position INTEGER
    )",
    "CREATE TABLE IF NOT EXISTS evaluation_parameters (
        id VARCHAR(64) PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        description VARCHAR(2000) NOT NULL DEFAULT '',
        marks BIGINT NOT NULL
    )",
];

/// Group store backed directly by a database. Unlike the REST API, this
/// store checks group sizes itself: it refuses to grow a group past the hard
/// cap or to shrink it below the minimum, whatever the client decided.
pub struct SqlGroupStore {
    pool: AnyPool,
    policy: MembershipPolicy,
}

/// Narrow an integer column, refusing values the model cannot hold.
fn narrow<T: TryFrom<i64>>(column: &str, value: i64) -> Result<T, sqlx::Error> {
    T::try_from(value)
        .map_err(|_| sqlx::Error::Decode(format!("{column} out of range: {value}").into()))
}

fn member_from_row(row: &AnyRow) -> Result<Member, sqlx::Error> {
    Ok(Member::new(
        row.try_get::<String, _>("id")?,
        row.try_get::<String, _>("name")?,
        row.try_get::<String, _>("enrollment_number")?,
    ))
}

fn guide_from_row(row: &AnyRow) -> Result<Guide, sqlx::Error> {
    Ok(Guide {
        id: GuideId(row.try_get("id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
    })
}

fn parameter_from_row(row: &AnyRow) -> Result<EvaluationParameter, sqlx::Error> {
    Ok(EvaluationParameter {
        id: ParameterId(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        marks: narrow("marks", row.try_get("marks")?)?,
    })
}

fn new_id() -> String {
    format!("{:016x}", rand::random::<u64>())
}

impl SqlGroupStore {
    pub async fn connect(url: &str, policy: MembershipPolicy) -> Result<Self, StoreError> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new().max_connections(1).connect(url).await?;
        debug!(%url, "connected to database");
        Ok(Self { pool, policy })
    }

    pub async fn init_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("database schema ready");
        Ok(())
    }

    async fn ensure_group(&self, id: &GroupId) -> Result<(), StoreError> {
        sqlx::query("SELECT id FROM project_groups WHERE id = ?")
            .bind(id.0.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("group {id}")))
    }

    async fn members(&self, id: &GroupId) -> Result<Vec<Member>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, enrollment_number FROM students \
             WHERE group_id = ? ORDER BY position, name",
        )
        .bind(id.0.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(member_from_row).collect::<Result<_, _>>()?)
    }
}

impl GroupStore for SqlGroupStore {
    async fn group(&self, id: &GroupId) -> Result<Group, StoreError> {
        let row = sqlx::query(
            "SELECT g.id, g.name, g.project_title, g.project_description, \
             g.project_technology, g.year, g.course, g.semester, g.guide_id, \
             t.name AS guide_name, t.email AS guide_email \
             FROM project_groups g LEFT JOIN guides t ON t.id = g.guide_id \
             WHERE g.id = ?",
        )
        .bind(id.0.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("group {id}")))?;
        let course: Option<String> = row.try_get("course")?;
        let semester: Option<i64> = row.try_get("semester")?;
        let guide_id: Option<String> = row.try_get("guide_id")?;
        let guide_name: Option<String> = row.try_get("guide_name")?;
        let year: Option<i64> = row.try_get("year")?;
        let division = match course {
            Some(course) => Some(Division {
                course,
                semester: narrow("semester", semester.unwrap_or_default())?,
            }),
            None => None,
        };
        let guide = match (guide_id, guide_name) {
            (Some(guide_id), Some(name)) => Some(Guide {
                id: GuideId(guide_id),
                name,
                email: row.try_get("guide_email")?,
            }),
            _ => None,
        };
        Ok(Group {
            id: GroupId(row.try_get("id")?),
            name: row.try_get("name")?,
            project_title: row.try_get("project_title")?,
            project_description: row.try_get("project_description")?,
            project_technology: row.try_get("project_technology")?,
            year: year.map(|y| narrow("year", y)).transpose()?,
            division,
            members: self.members(id).await?,
            guide,
        })
    }

    async fn add_students(&self, id: &GroupId, students: &[MemberId]) -> Result<(), StoreError> {
        self.ensure_group(id).await?;
        let mut trans = self.pool.begin().await?;
        let current = sqlx::query(
            "SELECT COUNT(*) AS n, COALESCE(MAX(position), 0) AS last \
             FROM students WHERE group_id = ?",
        )
        .bind(id.0.as_str())
        .fetch_one(&mut *trans)
        .await?;
        let count: usize = narrow("n", current.try_get("n")?)?;
        let mut position = current.try_get::<i64, _>("last")?;
        self.policy.check_stored_size(count + students.len())?;
        for student in students {
            position += 1;
            let done = sqlx::query(
                "UPDATE students SET group_id = ?, position = ? \
                 WHERE id = ? AND group_id IS NULL",
            )
            .bind(id.0.as_str())
            .bind(position)
            .bind(student.0.as_str())
            .execute(&mut *trans)
            .await?;
            if done.rows_affected() == 0 {
                return Err(StoreError::Rejected(format!(
                    "student {student} is not available"
                )));
            }
        }
        trans.commit().await?;
        info!(group = %id, added = students.len(), "students added");
        Ok(())
    }

    async fn remove_student(&self, id: &GroupId, student: &MemberId) -> Result<(), StoreError> {
        self.ensure_group(id).await?;
        let mut trans = self.pool.begin().await?;
        sqlx::query("SELECT id FROM students WHERE id = ? AND group_id = ?")
            .bind(student.0.as_str())
            .bind(id.0.as_str())
            .fetch_optional(&mut *trans)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("student {student} in group {id}")))?;
        let count = sqlx::query("SELECT COUNT(*) AS n FROM students WHERE group_id = ?")
            .bind(id.0.as_str())
            .fetch_one(&mut *trans)
            .await?
            .try_get("n")?;
        self.policy.check_removal(narrow("n", count)?, 1)?;
        sqlx::query(
            "UPDATE students SET group_id = NULL, position = NULL \
             WHERE id = ? AND group_id = ?",
        )
        .bind(student.0.as_str())
        .bind(id.0.as_str())
        .execute(&mut *trans)
        .await?;
        trans.commit().await?;
        info!(group = %id, %student, "student removed");
        Ok(())
    }

    async fn delete_group(&self, id: &GroupId) -> Result<(), StoreError> {
        let mut trans = self.pool.begin().await?;
        sqlx::query("UPDATE students SET group_id = NULL, position = NULL WHERE group_id = ?")
            .bind(id.0.as_str())
            .execute(&mut *trans)
            .await?;
        let done = sqlx::query("DELETE FROM project_groups WHERE id = ?")
            .bind(id.0.as_str())
            .execute(&mut *trans)
            .await?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("group {id}")));
        }
        trans.commit().await?;
        info!(group = %id, "group deleted");
        Ok(())
    }

    async fn available_students(&self, id: &GroupId) -> Result<Vec<Member>, StoreError> {
        self.ensure_group(id).await?;
        let rows = sqlx::query(
            "SELECT id, name, enrollment_number FROM students \
             WHERE group_id IS NULL ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(member_from_row).collect::<Result<_, _>>()?)
    }

    async fn guides(&self) -> Result<Vec<Guide>, StoreError> {
        let rows = sqlx::query("SELECT id, name, email FROM guides ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(guide_from_row).collect::<Result<_, _>>()?)
    }

    async fn set_guide(&self, id: &GroupId, guide: &GuideId) -> Result<(), StoreError> {
        sqlx::query("SELECT id FROM guides WHERE id = ?")
            .bind(guide.0.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("guide {guide}")))?;
        let done = sqlx::query("UPDATE project_groups SET guide_id = ? WHERE id = ?")
            .bind(guide.0.as_str())
            .bind(id.0.as_str())
            .execute(&self.pool)
            .await?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("group {id}")));
        }
        info!(group = %id, %guide, "guide assigned");
        Ok(())
    }

    async fn parameters(&self) -> Result<Vec<EvaluationParameter>, StoreError> {
        let rows =
            sqlx::query("SELECT id, name, description, marks FROM evaluation_parameters ORDER BY name")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .iter()
            .map(parameter_from_row)
            .collect::<Result<_, _>>()?)
    }

    async fn create_parameter(&self, draft: &ParameterDraft) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO evaluation_parameters (id, name, description, marks) VALUES (?, ?, ?, ?)",
        )
        .bind(new_id())
        .bind(draft.name.as_str())
        .bind(draft.description.as_str())
        .bind(i64::from(draft.marks))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_parameter(
        &self,
        id: &ParameterId,
        draft: &ParameterDraft,
    ) -> Result<(), StoreError> {
        let done = sqlx::query(
            "UPDATE evaluation_parameters SET name = ?, description = ?, marks = ? WHERE id = ?",
        )
        .bind(draft.name.as_str())
        .bind(draft.description.as_str())
        .bind(i64::from(draft.marks))
        .bind(id.0.as_str())
        .execute(&self.pool)
        .await?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("parameter {id}")));
        }
        Ok(())
    }

    async fn delete_parameter(&self, id: &ParameterId) -> Result<(), StoreError> {
        let done = sqlx::query("DELETE FROM evaluation_parameters WHERE id = ?")
            .bind(id.0.as_str())
            .execute(&self.pool)
            .await?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("parameter {id}")));
        }
        Ok(())
    }
}
