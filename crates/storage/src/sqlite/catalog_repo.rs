use course_core::model::{
    AssessmentId, CourseId, CreatorId, EvaluationId, LessonId, ModuleId, ModuleQuestionId,
    ModuleStepId, OptionId, QuestionId, RawAssessment, RawCourse, RawCreator, RawEvaluation,
    RawLesson, RawModule, RawModuleQuestion, RawModuleSkillEvaluation, RawModuleStep,
    RawModuleSubskillEvaluation, RawOption, RawQuestion, RawSkill, RawSubskill, SkillEvaluationId,
    SkillId, SubskillEvaluationId, SubskillId, UserId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{
    conn, id_from_row, id_to_i64, map_answer_row, map_rating_row, map_touch_row,
    optional_id_from_row, optional_text_from_row, ser, sort_order_from_row, text_from_row,
};
use crate::repository::{CatalogRepository, StorageError};

type RowMapper<T> = fn(&SqliteRow) -> Result<T, StorageError>;

const COURSE_COLUMNS: &str = r"
    SELECT
        c.id, c.slug, c.title, c.description, c.kind, c.sort_order,
        c.skill_id, c.creator_id,
        cr.name AS creator_name, cr.avatar_url AS creator_avatar_url
    FROM courses c
    LEFT JOIN creators cr ON cr.id = c.creator_id
";

impl SqliteRepository {
    /// The user's join rows for one content node.
    async fn user_rows<T>(
        &self,
        sql: &'static str,
        user: i64,
        node: i64,
        map: RowMapper<T>,
    ) -> Result<Vec<T>, StorageError> {
        let rows = sqlx::query(sql)
            .bind(user)
            .bind(node)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
        rows.iter().map(map).collect()
    }

    async fn load_skill(&self, user: i64, skill_id: i64) -> Result<Option<RawSkill>, StorageError> {
        let Some(row) = sqlx::query("SELECT id, title FROM skills WHERE id = ?1")
            .bind(skill_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
        else {
            return Ok(None);
        };

        let subskills = sqlx::query(
            r"
                SELECT id, title, sort_order
                FROM subskills
                WHERE skill_id = ?1
                ORDER BY sort_order IS NULL, sort_order, id
            ",
        )
        .bind(skill_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?
        .iter()
        .map(|r| -> Result<RawSubskill, StorageError> {
            Ok(RawSubskill {
                id: id_from_row(r, "id", SubskillId::new)?,
                title: text_from_row(r, "title")?,
                sort_order: sort_order_from_row(r)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

        let user_assessments = self
            .user_rows(
                "SELECT value, created_at FROM user_skill_assessments WHERE user_id = ?1 AND skill_id = ?2",
                user,
                skill_id,
                map_rating_row,
            )
            .await?;

        Ok(Some(RawSkill {
            id: id_from_row(&row, "id", SkillId::new)?,
            title: text_from_row(&row, "title")?,
            subskills,
            user_assessments,
        }))
    }

    async fn load_course(&self, user: i64, row: &SqliteRow) -> Result<RawCourse, StorageError> {
        let id: i64 = row.try_get("id").map_err(ser)?;

        let skill = match row.try_get::<Option<i64>, _>("skill_id").map_err(ser)? {
            Some(skill_id) => self.load_skill(user, skill_id).await?,
            None => None,
        };
        let creator = match optional_id_from_row(row, "creator_id", CreatorId::new)? {
            Some(creator_id) => Some(RawCreator {
                id: creator_id,
                name: row
                    .try_get::<Option<String>, _>("creator_name")
                    .map_err(ser)?
                    .unwrap_or_default(),
                avatar_url: row.try_get("creator_avatar_url").map_err(ser)?,
            }),
            None => None,
        };
        let user_courses = self
            .user_rows(
                "SELECT created_at FROM user_courses WHERE user_id = ?1 AND course_id = ?2",
                user,
                id,
                map_touch_row,
            )
            .await?;

        Ok(RawCourse {
            id: id_from_row(row, "id", CourseId::new)?,
            slug: row.try_get("slug").map_err(ser)?,
            title: text_from_row(row, "title")?,
            description: optional_text_from_row(row, "description")?,
            kind: row.try_get("kind").map_err(ser)?,
            sort_order: sort_order_from_row(row)?,
            user_courses,
            skill,
            lessons: self.load_lessons(user, id).await?,
            creator,
        })
    }

    async fn load_lessons(&self, user: i64, course_id: i64) -> Result<Vec<RawLesson>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, title, description, kind, sort_order, body
                FROM lessons
                WHERE course_id = ?1
                ORDER BY sort_order IS NULL, sort_order, id
            ",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut lessons = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i64 = row.try_get("id").map_err(ser)?;
            lessons.push(RawLesson {
                id: id_from_row(row, "id", LessonId::new)?,
                title: text_from_row(row, "title")?,
                description: optional_text_from_row(row, "description")?,
                kind: row.try_get("kind").map_err(ser)?,
                sort_order: sort_order_from_row(row)?,
                body: row.try_get("body").map_err(ser)?,
                user_lessons: self
                    .user_rows(
                        "SELECT created_at FROM user_lessons WHERE user_id = ?1 AND lesson_id = ?2",
                        user,
                        id,
                        map_touch_row,
                    )
                    .await?,
                questions: self.load_questions(user, id).await?,
                assessment: self.load_assessment(user, id).await?,
                evaluations: self.load_evaluations(user, id).await?,
            });
        }
        Ok(lessons)
    }

    async fn load_questions(
        &self,
        user: i64,
        lesson_id: i64,
    ) -> Result<Vec<RawQuestion>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, text, sort_order
                FROM questions
                WHERE lesson_id = ?1
                ORDER BY sort_order IS NULL, sort_order, id
            ",
        )
        .bind(lesson_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut questions = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i64 = row.try_get("id").map_err(ser)?;
            questions.push(RawQuestion {
                id: id_from_row(row, "id", QuestionId::new)?,
                text: text_from_row(row, "text")?,
                sort_order: sort_order_from_row(row)?,
                options: self.load_options(user, id).await?,
            });
        }
        Ok(questions)
    }

    async fn load_options(&self, user: i64, question_id: i64) -> Result<Vec<RawOption>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, text, sort_order, is_correct
                FROM options
                WHERE question_id = ?1
                ORDER BY sort_order IS NULL, sort_order, id
            ",
        )
        .bind(question_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut options = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i64 = row.try_get("id").map_err(ser)?;
            options.push(RawOption {
                id: id_from_row(row, "id", OptionId::new)?,
                text: text_from_row(row, "text")?,
                sort_order: sort_order_from_row(row)?,
                is_correct: row.try_get("is_correct").map_err(ser)?,
                user_answers: self
                    .user_rows(
                        "SELECT created_at FROM user_answers WHERE user_id = ?1 AND option_id = ?2",
                        user,
                        id,
                        map_touch_row,
                    )
                    .await?,
            });
        }
        Ok(options)
    }

    async fn load_evaluations(
        &self,
        user: i64,
        lesson_id: i64,
    ) -> Result<Vec<RawEvaluation>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, title, sort_order
                FROM evaluations
                WHERE lesson_id = ?1
                ORDER BY sort_order IS NULL, sort_order, id
            ",
        )
        .bind(lesson_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut evaluations = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i64 = row.try_get("id").map_err(ser)?;
            evaluations.push(RawEvaluation {
                id: id_from_row(row, "id", EvaluationId::new)?,
                title: text_from_row(row, "title")?,
                sort_order: sort_order_from_row(row)?,
                user_evaluations: self
                    .user_rows(
                        "SELECT value, created_at FROM user_evaluations WHERE user_id = ?1 AND evaluation_id = ?2",
                        user,
                        id,
                        map_rating_row,
                    )
                    .await?,
            });
        }
        Ok(evaluations)
    }

    async fn load_assessment(
        &self,
        user: i64,
        lesson_id: i64,
    ) -> Result<Option<RawAssessment>, StorageError> {
        let Some(row) = sqlx::query("SELECT id, title FROM assessments WHERE lesson_id = ?1")
            .bind(lesson_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
        else {
            return Ok(None);
        };

        let id: i64 = row.try_get("id").map_err(ser)?;
        Ok(Some(RawAssessment {
            id: id_from_row(&row, "id", AssessmentId::new)?,
            title: text_from_row(&row, "title")?,
            user_assessments: self
                .user_rows(
                    "SELECT value, created_at FROM user_assessments WHERE user_id = ?1 AND assessment_id = ?2",
                    user,
                    id,
                    map_rating_row,
                )
                .await?,
        }))
    }

    async fn load_module(&self, user: i64, row: &SqliteRow) -> Result<RawModule, StorageError> {
        let id: i64 = row.try_get("id").map_err(ser)?;
        let skills = match row.try_get::<Option<i64>, _>("skill_id").map_err(ser)? {
            Some(skill_id) => self.load_skill(user, skill_id).await?,
            None => None,
        };

        Ok(RawModule {
            id: id_from_row(row, "id", ModuleId::new)?,
            title: text_from_row(row, "title")?,
            description: optional_text_from_row(row, "description")?,
            sort_order: sort_order_from_row(row)?,
            skills,
            module_steps: self.load_module_steps(user, id).await?,
            user_modules: self
                .user_rows(
                    "SELECT created_at FROM user_modules WHERE user_id = ?1 AND module_id = ?2",
                    user,
                    id,
                    map_touch_row,
                )
                .await?,
        })
    }

    async fn load_module_steps(
        &self,
        user: i64,
        module_id: i64,
    ) -> Result<Vec<RawModuleStep>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, title, kind, sort_order, body
                FROM module_steps
                WHERE module_id = ?1
                ORDER BY sort_order IS NULL, sort_order, id
            ",
        )
        .bind(module_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut steps = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i64 = row.try_get("id").map_err(ser)?;
            steps.push(RawModuleStep {
                id: id_from_row(row, "id", ModuleStepId::new)?,
                title: text_from_row(row, "title")?,
                kind: row.try_get("kind").map_err(ser)?,
                sort_order: sort_order_from_row(row)?,
                body: row.try_get("body").map_err(ser)?,
                module_questions: self.load_module_questions(user, id).await?,
                module_skill_evaluations: self.load_skill_evaluations(user, id).await?,
                module_subskill_evaluations: self.load_subskill_evaluations(user, id).await?,
                user_module_steps: self
                    .user_rows(
                        "SELECT created_at FROM user_module_steps WHERE user_id = ?1 AND step_id = ?2",
                        user,
                        id,
                        map_touch_row,
                    )
                    .await?,
            });
        }
        Ok(steps)
    }

    async fn load_module_questions(
        &self,
        user: i64,
        step_id: i64,
    ) -> Result<Vec<RawModuleQuestion>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, text, sort_order
                FROM module_questions
                WHERE step_id = ?1
                ORDER BY sort_order IS NULL, sort_order, id
            ",
        )
        .bind(step_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut questions = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i64 = row.try_get("id").map_err(ser)?;
            questions.push(RawModuleQuestion {
                id: id_from_row(row, "id", ModuleQuestionId::new)?,
                text: text_from_row(row, "text")?,
                sort_order: sort_order_from_row(row)?,
                user_answers: self
                    .user_rows(
                        "SELECT answer, created_at FROM user_module_answers WHERE user_id = ?1 AND question_id = ?2",
                        user,
                        id,
                        map_answer_row,
                    )
                    .await?,
            });
        }
        Ok(questions)
    }

    async fn load_skill_evaluations(
        &self,
        user: i64,
        step_id: i64,
    ) -> Result<Vec<RawModuleSkillEvaluation>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, skill_id FROM module_skill_evaluations WHERE step_id = ?1 ORDER BY id",
        )
        .bind(step_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut evaluations = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i64 = row.try_get("id").map_err(ser)?;
            evaluations.push(RawModuleSkillEvaluation {
                id: id_from_row(row, "id", SkillEvaluationId::new)?,
                skill_id: optional_id_from_row(row, "skill_id", SkillId::new)?,
                user_skill_evaluations: self
                    .user_rows(
                        "SELECT value, created_at FROM user_skill_evaluations WHERE user_id = ?1 AND evaluation_id = ?2",
                        user,
                        id,
                        map_rating_row,
                    )
                    .await?,
            });
        }
        Ok(evaluations)
    }

    async fn load_subskill_evaluations(
        &self,
        user: i64,
        step_id: i64,
    ) -> Result<Vec<RawModuleSubskillEvaluation>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, subskill_id, sort_order
                FROM module_subskill_evaluations
                WHERE step_id = ?1
                ORDER BY sort_order IS NULL, sort_order, id
            ",
        )
        .bind(step_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut evaluations = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i64 = row.try_get("id").map_err(ser)?;
            evaluations.push(RawModuleSubskillEvaluation {
                id: id_from_row(row, "id", SubskillEvaluationId::new)?,
                subskill_id: id_from_row(row, "subskill_id", SubskillId::new)?,
                sort_order: sort_order_from_row(row)?,
                user_subskill_evaluations: self
                    .user_rows(
                        "SELECT value, created_at FROM user_subskill_evaluations WHERE user_id = ?1 AND evaluation_id = ?2",
                        user,
                        id,
                        map_rating_row,
                    )
                    .await?,
            });
        }
        Ok(evaluations)
    }
}

#[async_trait::async_trait]
impl CatalogRepository for SqliteRepository {
    async fn list_courses(&self, user: UserId) -> Result<Vec<RawCourse>, StorageError> {
        let user = id_to_i64("user_id", user.value())?;
        let sql = format!("{COURSE_COLUMNS} ORDER BY c.sort_order IS NULL, c.sort_order, c.id");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let mut courses = Vec::with_capacity(rows.len());
        for row in &rows {
            courses.push(self.load_course(user, row).await?);
        }
        Ok(courses)
    }

    async fn get_course(&self, user: UserId, id: CourseId) -> Result<RawCourse, StorageError> {
        let user = id_to_i64("user_id", user.value())?;
        let sql = format!("{COURSE_COLUMNS} WHERE c.id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_to_i64("course_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;

        self.load_course(user, &row).await
    }

    async fn list_modules(&self, user: UserId) -> Result<Vec<RawModule>, StorageError> {
        let user = id_to_i64("user_id", user.value())?;
        let rows = sqlx::query(
            r"
                SELECT id, title, description, sort_order, skill_id
                FROM modules
                ORDER BY sort_order IS NULL, sort_order, id
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut modules = Vec::with_capacity(rows.len());
        for row in &rows {
            modules.push(self.load_module(user, row).await?);
        }
        Ok(modules)
    }

    async fn get_module(&self, user: UserId, id: ModuleId) -> Result<RawModule, StorageError> {
        let user = id_to_i64("user_id", user.value())?;
        let row = sqlx::query(
            "SELECT id, title, description, sort_order, skill_id FROM modules WHERE id = ?1",
        )
        .bind(id_to_i64("module_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        self.load_module(user, &row).await
    }
}
