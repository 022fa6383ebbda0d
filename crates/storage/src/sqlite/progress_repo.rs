use std::collections::BTreeSet;

use course_core::model::{
    AssessmentId, CourseId, EvaluationId, LessonId, ModuleId, ModuleStepId, OptionId, Rating,
    SkillEvaluationId, SkillId, SubskillEvaluationId, UserId,
};
use sqlx::{Row, SqliteConnection};

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, ser};
use crate::repository::{ModuleAnswer, ProgressRepository, StorageError};

async fn ensure_exists(
    db: &mut SqliteConnection,
    table: &'static str,
    id: i64,
) -> Result<(), StorageError> {
    let sql = format!("SELECT 1 FROM {table} WHERE id = ?1");
    sqlx::query(&sql)
        .bind(id)
        .fetch_optional(&mut *db)
        .await
        .map_err(conn)?
        .map(|_| ())
        .ok_or(StorageError::NotFound)
}

/// Insert a presence marker; an existing marker keeps its timestamp.
async fn touch(
    repo: &SqliteRepository,
    table: &'static str,
    target_table: &'static str,
    target_column: &'static str,
    user: UserId,
    target: i64,
) -> Result<(), StorageError> {
    let user_id = id_to_i64("user_id", user.value())?;
    let mut tx = repo.pool.begin().await.map_err(conn)?;
    ensure_exists(&mut tx, target_table, target).await?;

    let sql = format!(
        "INSERT INTO {table} (user_id, {target_column}, created_at) VALUES (?1, ?2, ?3) \
         ON CONFLICT(user_id, {target_column}) DO NOTHING"
    );
    sqlx::query(&sql)
        .bind(user_id)
        .bind(target)
        .bind(repo.clock.now())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

    tx.commit().await.map_err(conn)?;
    tracing::debug!(user = %user, table, target, "stored marker");
    Ok(())
}

/// Upsert rating markers, all or nothing.
async fn rate(
    repo: &SqliteRepository,
    table: &'static str,
    target_table: &'static str,
    target_column: &'static str,
    user: UserId,
    ratings: &[(i64, f64)],
) -> Result<(), StorageError> {
    let user_id = id_to_i64("user_id", user.value())?;
    let now = repo.clock.now();
    let mut tx = repo.pool.begin().await.map_err(conn)?;

    let sql = format!(
        "INSERT INTO {table} (user_id, {target_column}, value, created_at) VALUES (?1, ?2, ?3, ?4) \
         ON CONFLICT(user_id, {target_column}) DO UPDATE SET \
         value = excluded.value, created_at = excluded.created_at"
    );
    for &(target, value) in ratings {
        ensure_exists(&mut tx, target_table, target).await?;
        sqlx::query(&sql)
            .bind(user_id)
            .bind(target)
            .bind(value)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
    }

    tx.commit().await.map_err(conn)?;
    tracing::debug!(user = %user, table, count = ratings.len(), "stored ratings");
    Ok(())
}

fn rating_pairs<Id: Copy>(
    field: &'static str,
    ratings: &[Rating<Id>],
    value_of: impl Fn(&Id) -> u64,
) -> Result<Vec<(i64, f64)>, StorageError> {
    ratings
        .iter()
        .map(|r| -> Result<(i64, f64), StorageError> {
            Ok((id_to_i64(field, value_of(&r.id()))?, r.value()))
        })
        .collect()
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn enroll_course(&self, user: UserId, course: CourseId) -> Result<(), StorageError> {
        let course = id_to_i64("course_id", course.value())?;
        touch(self, "user_courses", "courses", "course_id", user, course).await
    }

    async fn complete_lesson(&self, user: UserId, lesson: LessonId) -> Result<(), StorageError> {
        let lesson = id_to_i64("lesson_id", lesson.value())?;
        touch(self, "user_lessons", "lessons", "lesson_id", user, lesson).await
    }

    async fn submit_answers(
        &self,
        user: UserId,
        options: &[OptionId],
    ) -> Result<(), StorageError> {
        let user_id = id_to_i64("user_id", user.value())?;
        let option_ids = options
            .iter()
            .map(|o| id_to_i64("option_id", o.value()))
            .collect::<Result<Vec<_>, _>>()?;
        let now = self.clock.now();
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let mut questions = BTreeSet::new();
        for option in &option_ids {
            let row = sqlx::query("SELECT question_id FROM options WHERE id = ?1")
                .bind(option)
                .fetch_optional(&mut *tx)
                .await
                .map_err(conn)?
                .ok_or(StorageError::NotFound)?;
            questions.insert(row.try_get::<i64, _>("question_id").map_err(ser)?);
        }

        for question in &questions {
            sqlx::query(
                r"
                    DELETE FROM user_answers
                    WHERE user_id = ?1
                      AND option_id IN (SELECT id FROM options WHERE question_id = ?2)
                ",
            )
            .bind(user_id)
            .bind(question)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        for option in &option_ids {
            sqlx::query(
                r"
                    INSERT INTO user_answers (user_id, option_id, created_at)
                    VALUES (?1, ?2, ?3)
                    ON CONFLICT(user_id, option_id) DO NOTHING
                ",
            )
            .bind(user_id)
            .bind(option)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        tracing::debug!(
            user = %user,
            options = option_ids.len(),
            questions = questions.len(),
            "stored answers"
        );
        Ok(())
    }

    async fn submit_evaluations(
        &self,
        user: UserId,
        ratings: &[Rating<EvaluationId>],
    ) -> Result<(), StorageError> {
        let pairs = rating_pairs("evaluation_id", ratings, EvaluationId::value)?;
        rate(
            self,
            "user_evaluations",
            "evaluations",
            "evaluation_id",
            user,
            &pairs,
        )
        .await
    }

    async fn submit_assessment(
        &self,
        user: UserId,
        rating: Rating<AssessmentId>,
    ) -> Result<(), StorageError> {
        let pairs = rating_pairs("assessment_id", &[rating], AssessmentId::value)?;
        rate(
            self,
            "user_assessments",
            "assessments",
            "assessment_id",
            user,
            &pairs,
        )
        .await
    }

    async fn submit_skill_assessment(
        &self,
        user: UserId,
        rating: Rating<SkillId>,
    ) -> Result<(), StorageError> {
        let pairs = rating_pairs("skill_id", &[rating], SkillId::value)?;
        rate(
            self,
            "user_skill_assessments",
            "skills",
            "skill_id",
            user,
            &pairs,
        )
        .await
    }

    async fn start_module(&self, user: UserId, module: ModuleId) -> Result<(), StorageError> {
        let module = id_to_i64("module_id", module.value())?;
        touch(self, "user_modules", "modules", "module_id", user, module).await
    }

    async fn complete_module_step(
        &self,
        user: UserId,
        step: ModuleStepId,
    ) -> Result<(), StorageError> {
        let step = id_to_i64("step_id", step.value())?;
        touch(self, "user_module_steps", "module_steps", "step_id", user, step).await
    }

    async fn submit_module_answers(
        &self,
        user: UserId,
        answers: &[ModuleAnswer],
    ) -> Result<(), StorageError> {
        let user_id = id_to_i64("user_id", user.value())?;
        let now = self.clock.now();
        let mut tx = self.pool.begin().await.map_err(conn)?;

        for answer in answers {
            let question = id_to_i64("question_id", answer.question_id.value())?;
            ensure_exists(&mut tx, "module_questions", question).await?;
            sqlx::query(
                r"
                    INSERT INTO user_module_answers (user_id, question_id, answer, created_at)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(user_id, question_id) DO UPDATE SET
                        answer = excluded.answer,
                        created_at = excluded.created_at
                ",
            )
            .bind(user_id)
            .bind(question)
            .bind(&answer.answer)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        tracing::debug!(user = %user, count = answers.len(), "stored module answers");
        Ok(())
    }

    async fn submit_skill_evaluation(
        &self,
        user: UserId,
        rating: Rating<SkillEvaluationId>,
    ) -> Result<(), StorageError> {
        let pairs = rating_pairs("evaluation_id", &[rating], SkillEvaluationId::value)?;
        rate(
            self,
            "user_skill_evaluations",
            "module_skill_evaluations",
            "evaluation_id",
            user,
            &pairs,
        )
        .await
    }

    async fn submit_subskill_evaluations(
        &self,
        user: UserId,
        ratings: &[Rating<SubskillEvaluationId>],
    ) -> Result<(), StorageError> {
        let pairs = rating_pairs("evaluation_id", ratings, SubskillEvaluationId::value)?;
        rate(
            self,
            "user_subskill_evaluations",
            "module_subskill_evaluations",
            "evaluation_id",
            user,
            &pairs,
        )
        .await
    }
}
