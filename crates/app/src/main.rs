use std::fmt;
use std::str::FromStr;

use course_core::model::{
    Course, CourseId, LessonId, Module, ModuleId, ModuleStepId, OptionId, ParseIdError, UserId,
    FALLBACK_LOCALE,
};
use services::{AppServices, Applied, CatalogImport, Clock, Notification};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_DB_URL: &str = "sqlite://dev.sqlite3";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArgument { name: &'static str },
    UnknownArg(String),
    InvalidId { raw: String, source: course_core::Error },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { name } => write!(f, "missing argument: <{name}>"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidId { raw, source } => write!(f, "invalid id {raw:?}: {source}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  learn <command> [--db <sqlite_url>] [--user <id>] [--locale <tag>] [--json]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  import <file.json>                 store courses and modules");
    eprintln!("  courses                            list courses with progress");
    eprintln!("  course <course-id>                 show one course");
    eprintln!("  modules                            list modules with progress");
    eprintln!("  module <module-id>                 show one module");
    eprintln!("  enroll <course-id>");
    eprintln!("  complete-lesson <course-id> <lesson-id>");
    eprintln!("  answer <course-id> <option-id>...");
    eprintln!("  start-module <module-id>");
    eprintln!("  complete-step <module-id> <step-id>");
    eprintln!("  reorder-courses <course-id>...");
    eprintln!("  reorder-modules <module-id>...");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!("  --user 1");
    eprintln!("  --locale {FALLBACK_LOCALE}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LEARN_DB_URL, LEARN_USER_ID, LEARN_LOCALE, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Import,
    Courses,
    Course,
    Modules,
    Module,
    Enroll,
    CompleteLesson,
    Answer,
    StartModule,
    CompleteStep,
    ReorderCourses,
    ReorderModules,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "import" => Some(Self::Import),
            "courses" => Some(Self::Courses),
            "course" => Some(Self::Course),
            "modules" => Some(Self::Modules),
            "module" => Some(Self::Module),
            "enroll" => Some(Self::Enroll),
            "complete-lesson" => Some(Self::CompleteLesson),
            "answer" => Some(Self::Answer),
            "start-module" => Some(Self::StartModule),
            "complete-step" => Some(Self::CompleteStep),
            "reorder-courses" => Some(Self::ReorderCourses),
            "reorder-modules" => Some(Self::ReorderModules),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    user: UserId,
    locale: String,
    json: bool,
    positional: Vec<String>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("LEARN_DB_URL")
            .ok()
            .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url);
        let mut user = std::env::var("LEARN_USER_ID")
            .ok()
            .and_then(|value| value.parse::<UserId>().ok())
            .unwrap_or(UserId::new(1));
        let mut locale =
            std::env::var("LEARN_LOCALE").unwrap_or_else(|_| FALLBACK_LOCALE.to_string());
        let mut json = false;
        let mut positional = Vec::new();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--user" => {
                    let value = require_value(args, "--user")?;
                    user = parse_id(&value)?;
                }
                "--locale" => locale = require_value(args, "--locale")?,
                "--json" => json = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positional.push(arg),
            }
        }

        Ok(Self {
            db_url,
            user,
            locale,
            json,
            positional,
        })
    }

    fn arg(&self, index: usize, name: &'static str) -> Result<&str, ArgsError> {
        self.positional
            .get(index)
            .map(String::as_str)
            .ok_or(ArgsError::MissingArgument { name })
    }

    fn id<T: FromStr<Err = ParseIdError>>(
        &self,
        index: usize,
        name: &'static str,
    ) -> Result<T, ArgsError> {
        parse_id(self.arg(index, name)?)
    }

    fn ids_from<T: FromStr<Err = ParseIdError>>(
        &self,
        index: usize,
        name: &'static str,
    ) -> Result<Vec<T>, ArgsError> {
        let rest = self.positional.get(index..).unwrap_or_default();
        if rest.is_empty() {
            return Err(ArgsError::MissingArgument { name });
        }
        rest.iter().map(|raw| parse_id(raw)).collect()
    }
}

fn parse_id<T: FromStr<Err = ParseIdError>>(raw: &str) -> Result<T, ArgsError> {
    raw.parse().map_err(|err: ParseIdError| ArgsError::InvalidId {
        raw: raw.to_string(),
        source: err.into(),
    })
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout carries command output.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_course_line(course: &Course, locale: &str) {
    println!(
        "{:>4}  {:<11}  {:>3}%  {}",
        course.id.to_string(),
        course.status.as_str(),
        course.progress,
        course.title.resolve(locale)
    );
}

fn print_module_line(module: &Module, locale: &str) {
    println!(
        "{:>4}  {:<11}  {:>3}%  {}",
        module.id.to_string(),
        module.status.as_str(),
        module.progress,
        module.title.resolve(locale)
    );
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Wait for the persistence call so the process does not exit before it lands.
async fn settle<T>(applied: Applied<T>) -> Result<std::sync::Arc<T>, Notification> {
    let Applied {
        snapshot,
        dispatched,
    } = applied;
    dispatched.outcome().await?;
    Ok(snapshot)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let cmd = match argv.next() {
        None => {
            print_usage();
            return Ok(());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let args = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite in the binary glue so core/services stay storage-agnostic.
    prepare_sqlite_file(&args.db_url)?;
    let (app, _notifications) = AppServices::new_sqlite(&args.db_url, Clock::system()).await?;
    info!(db = %args.db_url, user = %args.user, ?cmd, "starting");

    let user = args.user;
    let locale = args.locale.as_str();
    match cmd {
        Command::Import => {
            let path = args.arg(0, "file.json")?;
            let bundle: CatalogImport = serde_json::from_str(&std::fs::read_to_string(path)?)?;
            let summary = app.catalog().import(&bundle).await?;
            if args.json {
                print_json(&summary)?;
            } else {
                println!(
                    "imported {} courses, {} modules",
                    summary.courses, summary.modules
                );
            }
        }
        Command::Courses => {
            let courses = app.catalog().list_courses(user).await?;
            if args.json {
                print_json(&courses)?;
            } else {
                courses.iter().for_each(|c| print_course_line(c, locale));
            }
        }
        Command::Course => {
            let course = app.catalog().course(user, args.id::<CourseId>(0, "course-id")?).await?;
            if args.json {
                print_json(&course)?;
            } else {
                print_course_line(&course, locale);
                for lesson in &course.lessons {
                    let mark = if lesson.completed { "x" } else { " " };
                    println!(
                        "      [{mark}] {:>4}  {:<11}  {}",
                        lesson.id.to_string(),
                        lesson.content.step_type().as_str(),
                        lesson.title.resolve(locale)
                    );
                }
            }
        }
        Command::Modules => {
            let modules = app.catalog().list_modules(user).await?;
            if args.json {
                print_json(&modules)?;
            } else {
                modules.iter().for_each(|m| print_module_line(m, locale));
            }
        }
        Command::Module => {
            let module = app.catalog().module(user, args.id::<ModuleId>(0, "module-id")?).await?;
            if args.json {
                print_json(&module)?;
            } else {
                print_module_line(&module, locale);
                for step in &module.steps {
                    let mark = if step.completed { "x" } else { " " };
                    println!(
                        "      [{mark}] {:>4}  {:<11}  {}",
                        step.id.to_string(),
                        step.content.step_type().as_str(),
                        step.title.resolve(locale)
                    );
                }
            }
        }
        Command::Enroll => {
            let session = app
                .progress()
                .open_course(user, args.id::<CourseId>(0, "course-id")?)
                .await?;
            let snapshot = settle(session.enroll()?).await?;
            print_course_line(snapshot.view(), locale);
        }
        Command::CompleteLesson => {
            let session = app
                .progress()
                .open_course(user, args.id::<CourseId>(0, "course-id")?)
                .await?;
            let lesson: LessonId = args.id(1, "lesson-id")?;
            let snapshot = settle(session.complete_lesson(lesson)?).await?;
            print_course_line(snapshot.view(), locale);
        }
        Command::Answer => {
            let session = app
                .progress()
                .open_course(user, args.id::<CourseId>(0, "course-id")?)
                .await?;
            let options: Vec<OptionId> = args.ids_from(1, "option-id")?;
            let snapshot = settle(session.answer(&options)?).await?;
            print_course_line(snapshot.view(), locale);
        }
        Command::StartModule => {
            let session = app
                .progress()
                .open_module(user, args.id::<ModuleId>(0, "module-id")?)
                .await?;
            let snapshot = settle(session.start()?).await?;
            print_module_line(snapshot.view(), locale);
        }
        Command::CompleteStep => {
            let session = app
                .progress()
                .open_module(user, args.id::<ModuleId>(0, "module-id")?)
                .await?;
            let step: ModuleStepId = args.id(1, "step-id")?;
            let snapshot = settle(session.complete_step(step)?).await?;
            print_module_line(snapshot.view(), locale);
        }
        Command::ReorderCourses => {
            let ids: Vec<CourseId> = args.ids_from(0, "course-id")?;
            let list = app.course_list(user).await?;
            let snapshot = settle(list.reorder_ids(&ids)?).await?;
            snapshot.iter().for_each(|c| print_course_line(c, locale));
        }
        Command::ReorderModules => {
            let ids: Vec<ModuleId> = args.ids_from(0, "module-id")?;
            let list = app.module_list(user).await?;
            let snapshot = settle(list.reorder_ids(&ids)?).await?;
            snapshot.iter().for_each(|m| print_module_line(m, locale));
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    init_logging();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
