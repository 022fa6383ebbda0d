use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Version 1: content tree, user join tables and their indexes.
const SCHEMA_V1: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS creators (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            avatar_url TEXT
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS skills (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS subskills (
            id INTEGER PRIMARY KEY,
            skill_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            sort_order INTEGER CHECK (sort_order >= 0),
            FOREIGN KEY (skill_id) REFERENCES skills(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS courses (
            id INTEGER PRIMARY KEY,
            slug TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            kind TEXT NOT NULL,
            sort_order INTEGER CHECK (sort_order >= 0),
            skill_id INTEGER,
            creator_id INTEGER,
            FOREIGN KEY (skill_id) REFERENCES skills(id) ON DELETE SET NULL,
            FOREIGN KEY (creator_id) REFERENCES creators(id) ON DELETE SET NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS lessons (
            id INTEGER PRIMARY KEY,
            course_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            kind TEXT NOT NULL,
            sort_order INTEGER CHECK (sort_order >= 0),
            body TEXT,
            FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS questions (
            id INTEGER PRIMARY KEY,
            lesson_id INTEGER NOT NULL,
            text TEXT NOT NULL,
            sort_order INTEGER CHECK (sort_order >= 0),
            FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS options (
            id INTEGER PRIMARY KEY,
            question_id INTEGER NOT NULL,
            text TEXT NOT NULL,
            sort_order INTEGER CHECK (sort_order >= 0),
            is_correct INTEGER,
            FOREIGN KEY (question_id) REFERENCES questions(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS evaluations (
            id INTEGER PRIMARY KEY,
            lesson_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            sort_order INTEGER CHECK (sort_order >= 0),
            FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS assessments (
            id INTEGER PRIMARY KEY,
            lesson_id INTEGER NOT NULL UNIQUE,
            title TEXT NOT NULL,
            FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS modules (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            sort_order INTEGER CHECK (sort_order >= 0),
            skill_id INTEGER,
            FOREIGN KEY (skill_id) REFERENCES skills(id) ON DELETE SET NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS module_steps (
            id INTEGER PRIMARY KEY,
            module_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            kind TEXT NOT NULL,
            sort_order INTEGER CHECK (sort_order >= 0),
            body TEXT,
            FOREIGN KEY (module_id) REFERENCES modules(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS module_questions (
            id INTEGER PRIMARY KEY,
            step_id INTEGER NOT NULL,
            text TEXT NOT NULL,
            sort_order INTEGER CHECK (sort_order >= 0),
            FOREIGN KEY (step_id) REFERENCES module_steps(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS module_skill_evaluations (
            id INTEGER PRIMARY KEY,
            step_id INTEGER NOT NULL,
            skill_id INTEGER,
            FOREIGN KEY (step_id) REFERENCES module_steps(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS module_subskill_evaluations (
            id INTEGER PRIMARY KEY,
            step_id INTEGER NOT NULL,
            subskill_id INTEGER NOT NULL,
            sort_order INTEGER CHECK (sort_order >= 0),
            FOREIGN KEY (step_id) REFERENCES module_steps(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS user_courses (
            user_id INTEGER NOT NULL,
            course_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (user_id, course_id),
            FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS user_lessons (
            user_id INTEGER NOT NULL,
            lesson_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (user_id, lesson_id),
            FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS user_answers (
            user_id INTEGER NOT NULL,
            option_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (user_id, option_id),
            FOREIGN KEY (option_id) REFERENCES options(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS user_evaluations (
            user_id INTEGER NOT NULL,
            evaluation_id INTEGER NOT NULL,
            value REAL NOT NULL CHECK (value >= 0),
            created_at TEXT NOT NULL,
            PRIMARY KEY (user_id, evaluation_id),
            FOREIGN KEY (evaluation_id) REFERENCES evaluations(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS user_assessments (
            user_id INTEGER NOT NULL,
            assessment_id INTEGER NOT NULL,
            value REAL NOT NULL CHECK (value >= 0),
            created_at TEXT NOT NULL,
            PRIMARY KEY (user_id, assessment_id),
            FOREIGN KEY (assessment_id) REFERENCES assessments(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS user_skill_assessments (
            user_id INTEGER NOT NULL,
            skill_id INTEGER NOT NULL,
            value REAL NOT NULL CHECK (value >= 0),
            created_at TEXT NOT NULL,
            PRIMARY KEY (user_id, skill_id),
            FOREIGN KEY (skill_id) REFERENCES skills(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS user_modules (
            user_id INTEGER NOT NULL,
            module_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (user_id, module_id),
            FOREIGN KEY (module_id) REFERENCES modules(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS user_module_steps (
            user_id INTEGER NOT NULL,
            step_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (user_id, step_id),
            FOREIGN KEY (step_id) REFERENCES module_steps(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS user_module_answers (
            user_id INTEGER NOT NULL,
            question_id INTEGER NOT NULL,
            answer TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (user_id, question_id),
            FOREIGN KEY (question_id) REFERENCES module_questions(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS user_skill_evaluations (
            user_id INTEGER NOT NULL,
            evaluation_id INTEGER NOT NULL,
            value REAL NOT NULL CHECK (value >= 0),
            created_at TEXT NOT NULL,
            PRIMARY KEY (user_id, evaluation_id),
            FOREIGN KEY (evaluation_id) REFERENCES module_skill_evaluations(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS user_subskill_evaluations (
            user_id INTEGER NOT NULL,
            evaluation_id INTEGER NOT NULL,
            value REAL NOT NULL CHECK (value >= 0),
            created_at TEXT NOT NULL,
            PRIMARY KEY (user_id, evaluation_id),
            FOREIGN KEY (evaluation_id) REFERENCES module_subskill_evaluations(id) ON DELETE CASCADE
        );
    ",
    "CREATE INDEX IF NOT EXISTS idx_subskills_skill ON subskills (skill_id);",
    "CREATE INDEX IF NOT EXISTS idx_lessons_course ON lessons (course_id, sort_order);",
    "CREATE INDEX IF NOT EXISTS idx_questions_lesson ON questions (lesson_id);",
    "CREATE INDEX IF NOT EXISTS idx_options_question ON options (question_id);",
    "CREATE INDEX IF NOT EXISTS idx_evaluations_lesson ON evaluations (lesson_id);",
    "CREATE INDEX IF NOT EXISTS idx_module_steps_module ON module_steps (module_id, sort_order);",
    "CREATE INDEX IF NOT EXISTS idx_module_questions_step ON module_questions (step_id);",
    "CREATE INDEX IF NOT EXISTS idx_module_skill_evaluations_step ON module_skill_evaluations (step_id);",
    "CREATE INDEX IF NOT EXISTS idx_module_subskill_evaluations_step ON module_subskill_evaluations (step_id);",
];

/// Applies pending schema versions, recording each in `schema_migrations`.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        for &statement in SCHEMA_V1 {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(version = 1, "applied schema migration");
    }

    Ok(())
}
