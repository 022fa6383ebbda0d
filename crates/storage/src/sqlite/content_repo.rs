use course_core::model::{
    RawCourse, RawCreator, RawLesson, RawModule, RawModuleStep, RawQuestion, RawSkill,
};
use sqlx::{Row, SqliteConnection};

use super::SqliteRepository;
use super::mapping::{
    conn, id_to_i64, optional_text_to_sql, ser, sort_order_to_i64, text_to_sql,
};
use crate::repository::{ContentRepository, StorageError};

/// Delete rows of `table` under `parent_id` whose id is not in `keep`.
async fn prune(
    db: &mut SqliteConnection,
    table: &'static str,
    parent_column: &'static str,
    parent_id: i64,
    keep: &[i64],
) -> Result<(), StorageError> {
    let select = format!("SELECT id FROM {table} WHERE {parent_column} = ?1");
    let rows = sqlx::query(&select)
        .bind(parent_id)
        .fetch_all(&mut *db)
        .await
        .map_err(conn)?;

    let delete = format!("DELETE FROM {table} WHERE id = ?1");
    for row in &rows {
        let id: i64 = row.try_get("id").map_err(ser)?;
        if !keep.contains(&id) {
            sqlx::query(&delete)
                .bind(id)
                .execute(&mut *db)
                .await
                .map_err(conn)?;
        }
    }
    Ok(())
}

fn ids<T>(
    items: &[T],
    field: &'static str,
    id: impl Fn(&T) -> u64,
) -> Result<Vec<i64>, StorageError> {
    items.iter().map(|item| id_to_i64(field, id(item))).collect()
}

async fn upsert_creator(db: &mut SqliteConnection, creator: &RawCreator) -> Result<(), StorageError> {
    sqlx::query(
        r"
            INSERT INTO creators (id, name, avatar_url)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                avatar_url = excluded.avatar_url
        ",
    )
    .bind(id_to_i64("creator_id", creator.id.value())?)
    .bind(&creator.name)
    .bind(creator.avatar_url.as_deref())
    .execute(&mut *db)
    .await
    .map_err(conn)?;
    Ok(())
}

async fn upsert_skill(db: &mut SqliteConnection, skill: &RawSkill) -> Result<(), StorageError> {
    let skill_id = id_to_i64("skill_id", skill.id.value())?;
    sqlx::query(
        r"
            INSERT INTO skills (id, title)
            VALUES (?1, ?2)
            ON CONFLICT(id) DO UPDATE SET title = excluded.title
        ",
    )
    .bind(skill_id)
    .bind(text_to_sql(&skill.title)?)
    .execute(&mut *db)
    .await
    .map_err(conn)?;

    let keep = ids(&skill.subskills, "subskill_id", |s| s.id.value())?;
    prune(db, "subskills", "skill_id", skill_id, &keep).await?;

    for subskill in &skill.subskills {
        sqlx::query(
            r"
                INSERT INTO subskills (id, skill_id, title, sort_order)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(id) DO UPDATE SET
                    skill_id = excluded.skill_id,
                    title = excluded.title,
                    sort_order = excluded.sort_order
            ",
        )
        .bind(id_to_i64("subskill_id", subskill.id.value())?)
        .bind(skill_id)
        .bind(text_to_sql(&subskill.title)?)
        .bind(sort_order_to_i64(subskill.sort_order))
        .execute(&mut *db)
        .await
        .map_err(conn)?;
    }
    Ok(())
}

async fn upsert_question(
    db: &mut SqliteConnection,
    lesson_id: i64,
    question: &RawQuestion,
) -> Result<(), StorageError> {
    let question_id = id_to_i64("question_id", question.id.value())?;
    sqlx::query(
        r"
            INSERT INTO questions (id, lesson_id, text, sort_order)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                lesson_id = excluded.lesson_id,
                text = excluded.text,
                sort_order = excluded.sort_order
        ",
    )
    .bind(question_id)
    .bind(lesson_id)
    .bind(text_to_sql(&question.text)?)
    .bind(sort_order_to_i64(question.sort_order))
    .execute(&mut *db)
    .await
    .map_err(conn)?;

    let keep = ids(&question.options, "option_id", |o| o.id.value())?;
    prune(db, "options", "question_id", question_id, &keep).await?;

    for option in &question.options {
        sqlx::query(
            r"
                INSERT INTO options (id, question_id, text, sort_order, is_correct)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(id) DO UPDATE SET
                    question_id = excluded.question_id,
                    text = excluded.text,
                    sort_order = excluded.sort_order,
                    is_correct = excluded.is_correct
            ",
        )
        .bind(id_to_i64("option_id", option.id.value())?)
        .bind(question_id)
        .bind(text_to_sql(&option.text)?)
        .bind(sort_order_to_i64(option.sort_order))
        .bind(option.is_correct)
        .execute(&mut *db)
        .await
        .map_err(conn)?;
    }
    Ok(())
}

async fn upsert_lesson(
    db: &mut SqliteConnection,
    course_id: i64,
    lesson: &RawLesson,
) -> Result<(), StorageError> {
    let lesson_id = id_to_i64("lesson_id", lesson.id.value())?;
    sqlx::query(
        r"
            INSERT INTO lessons (id, course_id, title, description, kind, sort_order, body)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                course_id = excluded.course_id,
                title = excluded.title,
                description = excluded.description,
                kind = excluded.kind,
                sort_order = excluded.sort_order,
                body = excluded.body
        ",
    )
    .bind(lesson_id)
    .bind(course_id)
    .bind(text_to_sql(&lesson.title)?)
    .bind(optional_text_to_sql(lesson.description.as_ref())?)
    .bind(&lesson.kind)
    .bind(sort_order_to_i64(lesson.sort_order))
    .bind(lesson.body.as_deref())
    .execute(&mut *db)
    .await
    .map_err(conn)?;

    let keep = ids(&lesson.questions, "question_id", |q| q.id.value())?;
    prune(db, "questions", "lesson_id", lesson_id, &keep).await?;
    for question in &lesson.questions {
        upsert_question(db, lesson_id, question).await?;
    }

    let keep = ids(&lesson.evaluations, "evaluation_id", |e| e.id.value())?;
    prune(db, "evaluations", "lesson_id", lesson_id, &keep).await?;
    for evaluation in &lesson.evaluations {
        sqlx::query(
            r"
                INSERT INTO evaluations (id, lesson_id, title, sort_order)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(id) DO UPDATE SET
                    lesson_id = excluded.lesson_id,
                    title = excluded.title,
                    sort_order = excluded.sort_order
            ",
        )
        .bind(id_to_i64("evaluation_id", evaluation.id.value())?)
        .bind(lesson_id)
        .bind(text_to_sql(&evaluation.title)?)
        .bind(sort_order_to_i64(evaluation.sort_order))
        .execute(&mut *db)
        .await
        .map_err(conn)?;
    }

    let keep = match &lesson.assessment {
        Some(a) => vec![id_to_i64("assessment_id", a.id.value())?],
        None => Vec::new(),
    };
    prune(db, "assessments", "lesson_id", lesson_id, &keep).await?;
    if let Some(assessment) = &lesson.assessment {
        sqlx::query(
            r"
                INSERT INTO assessments (id, lesson_id, title)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(id) DO UPDATE SET
                    lesson_id = excluded.lesson_id,
                    title = excluded.title
            ",
        )
        .bind(id_to_i64("assessment_id", assessment.id.value())?)
        .bind(lesson_id)
        .bind(text_to_sql(&assessment.title)?)
        .execute(&mut *db)
        .await
        .map_err(conn)?;
    }
    Ok(())
}

async fn upsert_module_step(
    db: &mut SqliteConnection,
    module_id: i64,
    step: &RawModuleStep,
) -> Result<(), StorageError> {
    let step_id = id_to_i64("step_id", step.id.value())?;
    sqlx::query(
        r"
            INSERT INTO module_steps (id, module_id, title, kind, sort_order, body)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                module_id = excluded.module_id,
                title = excluded.title,
                kind = excluded.kind,
                sort_order = excluded.sort_order,
                body = excluded.body
        ",
    )
    .bind(step_id)
    .bind(module_id)
    .bind(text_to_sql(&step.title)?)
    .bind(&step.kind)
    .bind(sort_order_to_i64(step.sort_order))
    .bind(step.body.as_deref())
    .execute(&mut *db)
    .await
    .map_err(conn)?;

    let keep = ids(&step.module_questions, "question_id", |q| q.id.value())?;
    prune(db, "module_questions", "step_id", step_id, &keep).await?;
    for question in &step.module_questions {
        sqlx::query(
            r"
                INSERT INTO module_questions (id, step_id, text, sort_order)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(id) DO UPDATE SET
                    step_id = excluded.step_id,
                    text = excluded.text,
                    sort_order = excluded.sort_order
            ",
        )
        .bind(id_to_i64("question_id", question.id.value())?)
        .bind(step_id)
        .bind(text_to_sql(&question.text)?)
        .bind(sort_order_to_i64(question.sort_order))
        .execute(&mut *db)
        .await
        .map_err(conn)?;
    }

    let keep = ids(&step.module_skill_evaluations, "evaluation_id", |e| {
        e.id.value()
    })?;
    prune(db, "module_skill_evaluations", "step_id", step_id, &keep).await?;
    for evaluation in &step.module_skill_evaluations {
        let skill_id = evaluation
            .skill_id
            .map(|s| id_to_i64("skill_id", s.value()))
            .transpose()?;
        sqlx::query(
            r"
                INSERT INTO module_skill_evaluations (id, step_id, skill_id)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(id) DO UPDATE SET
                    step_id = excluded.step_id,
                    skill_id = excluded.skill_id
            ",
        )
        .bind(id_to_i64("evaluation_id", evaluation.id.value())?)
        .bind(step_id)
        .bind(skill_id)
        .execute(&mut *db)
        .await
        .map_err(conn)?;
    }

    let keep = ids(&step.module_subskill_evaluations, "evaluation_id", |e| {
        e.id.value()
    })?;
    prune(db, "module_subskill_evaluations", "step_id", step_id, &keep).await?;
    for evaluation in &step.module_subskill_evaluations {
        sqlx::query(
            r"
                INSERT INTO module_subskill_evaluations (id, step_id, subskill_id, sort_order)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(id) DO UPDATE SET
                    step_id = excluded.step_id,
                    subskill_id = excluded.subskill_id,
                    sort_order = excluded.sort_order
            ",
        )
        .bind(id_to_i64("evaluation_id", evaluation.id.value())?)
        .bind(step_id)
        .bind(id_to_i64("subskill_id", evaluation.subskill_id.value())?)
        .bind(sort_order_to_i64(evaluation.sort_order))
        .execute(&mut *db)
        .await
        .map_err(conn)?;
    }
    Ok(())
}

#[async_trait::async_trait]
impl ContentRepository for SqliteRepository {
    async fn upsert_course(&self, course: &RawCourse) -> Result<(), StorageError> {
        let course_id = id_to_i64("course_id", course.id.value())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        if let Some(creator) = &course.creator {
            upsert_creator(&mut tx, creator).await?;
        }
        if let Some(skill) = &course.skill {
            upsert_skill(&mut tx, skill).await?;
        }

        sqlx::query(
            r"
                INSERT INTO courses (
                    id, slug, title, description, kind, sort_order, skill_id, creator_id
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(id) DO UPDATE SET
                    slug = excluded.slug,
                    title = excluded.title,
                    description = excluded.description,
                    kind = excluded.kind,
                    sort_order = excluded.sort_order,
                    skill_id = excluded.skill_id,
                    creator_id = excluded.creator_id
            ",
        )
        .bind(course_id)
        .bind(&course.slug)
        .bind(text_to_sql(&course.title)?)
        .bind(optional_text_to_sql(course.description.as_ref())?)
        .bind(&course.kind)
        .bind(sort_order_to_i64(course.sort_order))
        .bind(
            course
                .skill
                .as_ref()
                .map(|s| id_to_i64("skill_id", s.id.value()))
                .transpose()?,
        )
        .bind(
            course
                .creator
                .as_ref()
                .map(|c| id_to_i64("creator_id", c.id.value()))
                .transpose()?,
        )
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        let keep = ids(&course.lessons, "lesson_id", |l| l.id.value())?;
        prune(&mut tx, "lessons", "course_id", course_id, &keep).await?;
        for lesson in &course.lessons {
            upsert_lesson(&mut tx, course_id, lesson).await?;
        }

        tx.commit().await.map_err(conn)?;
        tracing::debug!(
            course = %course.id,
            lessons = course.lessons.len(),
            "stored course content"
        );
        Ok(())
    }

    async fn upsert_module(&self, module: &RawModule) -> Result<(), StorageError> {
        let module_id = id_to_i64("module_id", module.id.value())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        if let Some(skill) = &module.skills {
            upsert_skill(&mut tx, skill).await?;
        }

        sqlx::query(
            r"
                INSERT INTO modules (id, title, description, sort_order, skill_id)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    description = excluded.description,
                    sort_order = excluded.sort_order,
                    skill_id = excluded.skill_id
            ",
        )
        .bind(module_id)
        .bind(text_to_sql(&module.title)?)
        .bind(optional_text_to_sql(module.description.as_ref())?)
        .bind(sort_order_to_i64(module.sort_order))
        .bind(
            module
                .skills
                .as_ref()
                .map(|s| id_to_i64("skill_id", s.id.value()))
                .transpose()?,
        )
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        let keep = ids(&module.module_steps, "step_id", |s| s.id.value())?;
        prune(&mut tx, "module_steps", "module_id", module_id, &keep).await?;
        for step in &module.module_steps {
            upsert_module_step(&mut tx, module_id, step).await?;
        }

        tx.commit().await.map_err(conn)?;
        tracing::debug!(
            module = %module.id,
            steps = module.module_steps.len(),
            "stored module content"
        );
        Ok(())
    }
}
