use clap::{Parser, Subcommand};
use forge::auth::{CryptError, hash_password};
use forge::model::entity::{
    Course, CourseCreateUpdate, Exercise, ExerciseCreate, Lesson, LessonCreate, Module,
    ModuleCreate, Profile, ProfileCreateUpdate,
};
use forge::model::{CrudRepository, DatabaseError, DbConnection, ModelManager};
use forge::web::{AuthenticatedUser, UserRole};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("DATABASE_URL is not set")]
    MissingDatabaseUrl,
    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("password hashing failed: {0}")]
    Crypt(#[from] CryptError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

type CliResult<T> = Result<T, CliError>;

#[derive(Parser, Debug)]
#[command(about = "CLI tool for filling the course DB", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserCommands,
    },

    /// Manage courses
    Course {
        #[command(subcommand)]
        action: CourseCommands,
    },

    /// Manage modules
    Module {
        #[command(subcommand)]
        action: ModuleCommands,
    },

    /// Manage lessons
    Lesson {
        #[command(subcommand)]
        action: LessonCommands,
    },

    /// Manage exercises
    Exercise {
        #[command(subcommand)]
        action: ExerciseCommands,
    },

    /// Create the default instructor and the three starter courses
    Seed,
}

/// User management
#[derive(Subcommand, Debug)]
pub enum UserCommands {
    Add {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "")]
        full_name: String,
        /// student, instructor or admin
        #[arg(long, default_value = "student")]
        role: String,
    },
}

/// Course management
#[derive(Subcommand, Debug)]
pub enum CourseCommands {
    Add {
        /// Username of the owning instructor
        #[arg(long)]
        instructor: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long, default_value = "general")]
        category: String,
        #[arg(long, default_value = "beginner")]
        difficulty: String,
        #[arg(long, default_value_t = 0)]
        price: i64,
        #[arg(long, default_value = "KES")]
        currency: String,
    },
    Publish {
        #[arg(long)]
        title: String,
        /// Pass to hide the course again
        #[arg(long, default_value_t = false)]
        unpublish: bool,
    },
}

/// Module management
#[derive(Subcommand, Debug)]
pub enum ModuleCommands {
    Add {
        /// Course title to attach the module to
        #[arg(long)]
        course_title: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        order_index: Option<i32>,
    },
}

/// Lesson management
#[derive(Subcommand, Debug)]
pub enum LessonCommands {
    Add {
        /// Module title to attach the lesson to
        #[arg(long)]
        module_title: String,
        #[arg(long)]
        title: String,
        /// Path to a Markdown file with lesson content
        #[arg(long)]
        file: String,
        #[arg(long, default_value = "text")]
        lesson_type: String,
        #[arg(long)]
        video_url: Option<String>,
        #[arg(long, default_value_t = 0)]
        duration_minutes: i32,
        #[arg(long)]
        order_index: Option<i32>,
    },
}

/// Exercise management
#[derive(Subcommand, Debug)]
pub enum ExerciseCommands {
    Add {
        /// Lesson title to attach the exercise to
        #[arg(long)]
        lesson_title: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        /// Path to a file with starter code
        #[arg(long)]
        starter_file: Option<String>,
        #[arg(long, default_value = "python")]
        language: String,
        #[arg(long, default_value = "beginner")]
        difficulty: String,
        #[arg(long, default_value_t = 10)]
        points: i32,
        #[arg(long)]
        order_index: Option<i32>,
    },
}

struct SeedCourse {
    title: &'static str,
    description: &'static str,
    category: &'static str,
}

const SEED_INSTRUCTOR: &str = "campocode_instructor";
const SEED_INSTRUCTOR_EMAIL: &str = "instructor@campocodeforge.com";
const SEED_INSTRUCTOR_PASSWORD: &str = "InstructorPass123!";
const SEED_PRICE: i64 = 5000;

const SEED_COURSES: [SeedCourse; 3] = [
    SeedCourse {
        title: "Frontend Development Fundamentals",
        description: "Master HTML, CSS, JavaScript, and modern frameworks to create beautiful, responsive websites.",
        category: "frontend",
    },
    SeedCourse {
        title: "Backend Development with Python",
        description: "Master backend development with Python, FastAPI, and modern web technologies.",
        category: "backend",
    },
    SeedCourse {
        title: "Data Analytics with Python",
        description: "Master data analytics with Python, pandas, and visualization tools.",
        category: "data_analytics",
    },
];

async fn find_instructor(
    mm: &ModelManager,
    actor: &AuthenticatedUser,
    username: &str,
) -> CliResult<AuthenticatedUser> {
    let profile = Profile::find_by_username(mm, actor, username)
        .await?
        .ok_or_else(|| CliError::NotFound("user", username.to_string()))?;
    Ok(AuthenticatedUser::new(profile.id(), profile.role()))
}

async fn find_course(
    mm: &ModelManager,
    actor: &AuthenticatedUser,
    title: &str,
) -> CliResult<Course> {
    Course::find_by_title(mm, actor, title)
        .await?
        .ok_or_else(|| CliError::NotFound("course", title.to_string()))
}

async fn id_by_title(mm: &ModelManager, table: &'static str, title: &str) -> CliResult<uuid::Uuid> {
    let query = format!("SELECT id FROM {table} WHERE title = $1 LIMIT 1");
    let id: Option<uuid::Uuid> = sqlx::query_scalar(&query)
        .bind(title)
        .fetch_optional(mm.executor())
        .await
        .map_err(DatabaseError::SqlxError)?;
    id.ok_or_else(|| CliError::NotFound(table, title.to_string()))
}

async fn seed(mm: &ModelManager, actor: &AuthenticatedUser) -> CliResult<()> {
    let instructor = match Profile::find_by_username(mm, actor, SEED_INSTRUCTOR).await? {
        Some(profile) => {
            println!("Instructor already exists: {}", profile.username());
            profile
        }
        None => {
            let profile = Profile::create(
                mm,
                actor,
                ProfileCreateUpdate {
                    username: SEED_INSTRUCTOR.to_string(),
                    email: SEED_INSTRUCTOR_EMAIL.to_string(),
                    full_name: "CampoCode Instructor".to_string(),
                    password_hash: hash_password(SEED_INSTRUCTOR_PASSWORD)?,
                    role: UserRole::Instructor,
                },
            )
            .await?;
            println!("Created instructor: {}", profile.username());
            profile
        }
    };
    let owner = AuthenticatedUser::new(instructor.id(), UserRole::Instructor);

    for course in SEED_COURSES {
        if Course::find_by_title(mm, actor, course.title).await?.is_some() {
            println!("Course already exists: {}", course.title);
            continue;
        }

        let created = Course::create(
            mm,
            &owner,
            CourseCreateUpdate {
                title: course.title.to_string(),
                description: course.description.to_string(),
                category: course.category.to_string(),
                difficulty: "beginner".to_string(),
                price: SEED_PRICE,
                currency: "KES".to_string(),
            },
        )
        .await?;
        let created = created.set_published(mm, &owner, true).await?;
        println!("Created course: {} - KES {}", created.title(), SEED_PRICE);
    }

    Ok(())
}

async fn run(args: Cli) -> CliResult<()> {
    let database_url = std::env::var("DATABASE_URL").map_err(|_| CliError::MissingDatabaseUrl)?;
    let db_con = DbConnection::connect(&database_url)?;
    db_con.migrate().await?;
    let mm = ModelManager::new(db_con);
    let actor = AuthenticatedUser::admin();

    match args.command {
        Commands::User { action } => match action {
            UserCommands::Add { username, email, password, full_name, role } => {
                let profile = Profile::create(
                    &mm,
                    &actor,
                    ProfileCreateUpdate {
                        username,
                        email,
                        full_name,
                        password_hash: hash_password(&password)?,
                        role: UserRole::from(role.as_str()),
                    },
                )
                .await?;
                println!("User created: {:?}", profile);
            }
        },

        Commands::Course { action } => match action {
            CourseCommands::Add {
                instructor,
                title,
                description,
                category,
                difficulty,
                price,
                currency,
            } => {
                let owner = find_instructor(&mm, &actor, &instructor).await?;
                let course = Course::create(
                    &mm,
                    &owner,
                    CourseCreateUpdate {
                        title,
                        description,
                        category,
                        difficulty,
                        price,
                        currency: currency.to_uppercase(),
                    },
                )
                .await?;
                println!("Course created: {:?}", course);
            }
            CourseCommands::Publish { title, unpublish } => {
                let course = find_course(&mm, &actor, &title)
                    .await?
                    .set_published(&mm, &actor, !unpublish)
                    .await?;
                println!("Course updated: {:?}", course);
            }
        },

        Commands::Module { action } => match action {
            ModuleCommands::Add { course_title, title, description, order_index } => {
                let course = find_course(&mm, &actor, &course_title).await?;
                let module = Module::create(
                    &mm,
                    &actor,
                    ModuleCreate {
                        course_id: course.id(),
                        title,
                        description,
                        order_index,
                    },
                )
                .await?;
                println!("Module created: {:?}", module);
            }
        },

        Commands::Lesson { action } => match action {
            LessonCommands::Add {
                module_title,
                title,
                file,
                lesson_type,
                video_url,
                duration_minutes,
                order_index,
            } => {
                let module_id = id_by_title(&mm, "modules", &module_title).await?;
                let content = std::fs::read_to_string(file)?;
                let lesson = Lesson::create(
                    &mm,
                    &actor,
                    LessonCreate {
                        module_id,
                        title,
                        content,
                        lesson_type,
                        video_url,
                        duration_minutes,
                        order_index,
                    },
                )
                .await?;
                println!("Lesson created: {:?}", lesson);
            }
        },

        Commands::Exercise { action } => match action {
            ExerciseCommands::Add {
                lesson_title,
                title,
                description,
                starter_file,
                language,
                difficulty,
                points,
                order_index,
            } => {
                let lesson_id = id_by_title(&mm, "lessons", &lesson_title).await?;
                let starter_code = match starter_file {
                    Some(path) => std::fs::read_to_string(path)?,
                    None => String::new(),
                };
                let exercise = Exercise::create(
                    &mm,
                    &actor,
                    ExerciseCreate {
                        lesson_id,
                        title,
                        description,
                        starter_code,
                        language: language.to_lowercase(),
                        difficulty,
                        points,
                        order_index,
                    },
                )
                .await?;
                println!("Exercise created: {:?}", exercise);
            }
        },

        Commands::Seed => seed(&mm, &actor).await?,
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    if let Err(e) = run(Cli::parse()).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
