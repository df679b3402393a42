mod api;
mod commands;
mod error;
mod forms;
mod judge;
mod listing;
mod notify;
mod poller;
mod reconciler;

use anyhow::Result;
use clap::{Parser, Subcommand};
use edutrack_common::config::Config;
use std::path::PathBuf;

use commands::{AppContext, DownloadKind};
use forms::{AssignmentForm, NewStudentForm};
use listing::ALL_SUBJECTS;

#[derive(Parser)]
#[command(name = "edutrack")]
#[command(about = "EduTrack CLI - Assignments, submissions and code runs for your classroom", long_about = None)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in as a student or teacher
    Login {
        /// Student or teacher id (4-digit ids sign in as teachers)
        #[arg(short, long)]
        user_id: String,

        #[arg(short, long)]
        password: String,
    },

    /// Sign out and forget the cached session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Show the dashboard summary
    Dashboard,

    /// Browse and manage assignments
    Assignments {
        #[command(subcommand)]
        command: AssignmentCommands,
    },

    /// Submit, review and grade submissions
    Submissions {
        #[command(subcommand)]
        command: SubmissionCommands,
    },

    /// Manage students
    Students {
        #[command(subcommand)]
        command: StudentCommands,
    },

    /// Run a source file on the remote code executor
    Run {
        /// Source file to run
        #[arg(short, long)]
        file: PathBuf,

        /// python, c, cpp or java (defaults to the file extension)
        #[arg(short, long)]
        language: Option<String>,
    },
}

#[derive(Subcommand)]
enum AssignmentCommands {
    /// List assignments, three per page
    List {
        #[arg(short, long, default_value = ALL_SUBJECTS)]
        subject: String,

        #[arg(short, long, default_value = "1")]
        page: usize,
    },

    /// Publish a new assignment (teachers)
    Create {
        #[arg(short, long)]
        title: String,

        /// Required unless your subject is fixed by your account
        #[arg(short, long)]
        subject: Option<String>,

        #[arg(short, long)]
        description: String,

        /// Due date, e.g. 2025-03-01T09:00
        #[arg(long)]
        due: String,

        /// Student year (1-4)
        #[arg(short, long)]
        year: u8,

        /// Assignment PDF
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Delete an assignment (teachers)
    Delete {
        id: i64,

        /// Skip the confirmation prompt
        #[arg(short, long, default_value = "false")]
        yes: bool,
    },

    /// Download an assignment PDF
    Download {
        id: i64,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum SubmissionCommands {
    /// Show each assignment with your submission status (students)
    Status {
        #[arg(short, long, default_value = "1")]
        page: usize,
    },

    /// Submit a PDF for an assignment (students)
    Submit {
        #[arg(short, long)]
        assignment_id: i64,

        #[arg(short, long)]
        file: PathBuf,
    },

    /// List submissions, fifty per page
    List {
        #[arg(long, default_value = ALL_SUBJECTS)]
        subject: String,

        /// Match on student id or file name
        #[arg(short, long, default_value = "")]
        search: String,

        #[arg(short, long, default_value = "1")]
        page: usize,
    },

    /// Set the marks of a submission (teachers)
    Grade {
        id: i64,

        /// 0-100
        #[arg(short, long)]
        marks: u32,
    },

    /// Download a submitted PDF
    Download {
        id: i64,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum StudentCommands {
    /// Register a new student (teachers)
    Add {
        #[arg(long)]
        user_id: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        /// 1-4
        #[arg(long)]
        year: String,

        #[arg(long)]
        mobile_no: String,

        #[arg(long)]
        password: String,

        /// Optional profile image
        #[arg(long)]
        image: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let ctx = AppContext::from_config(Config::from_env())?;

    match cli.command {
        Commands::Login { user_id, password } => {
            commands::login(&ctx, &user_id, &password).await?;
        }
        Commands::Logout => commands::logout(&ctx)?,
        Commands::Whoami => commands::whoami(&ctx)?,
        Commands::Dashboard => commands::dashboard(&ctx).await?,
        Commands::Assignments { command } => match command {
            AssignmentCommands::List { subject, page } => {
                commands::list_assignments(&ctx, &subject, page).await?;
            }
            AssignmentCommands::Create {
                title,
                subject,
                description,
                due,
                year,
                file,
            } => {
                let form = AssignmentForm {
                    title,
                    subject,
                    description,
                    due_date: due,
                    year,
                    file,
                };
                commands::create_assignment(&ctx, form).await?;
            }
            AssignmentCommands::Delete { id, yes } => {
                commands::delete_assignment(&ctx, id, yes).await?;
            }
            AssignmentCommands::Download { id, out } => {
                commands::download(&ctx, DownloadKind::Assignment, id, out).await?;
            }
        },
        Commands::Submissions { command } => match command {
            SubmissionCommands::Status { page } => {
                commands::submission_status(&ctx, page).await?;
            }
            SubmissionCommands::Submit {
                assignment_id,
                file,
            } => {
                commands::submit(&ctx, assignment_id, &file).await?;
            }
            SubmissionCommands::List {
                subject,
                search,
                page,
            } => {
                commands::list_submissions(&ctx, &subject, &search, page).await?;
            }
            SubmissionCommands::Grade { id, marks } => {
                commands::grade(&ctx, id, marks).await?;
            }
            SubmissionCommands::Download { id, out } => {
                commands::download(&ctx, DownloadKind::Submission, id, out).await?;
            }
        },
        Commands::Students { command } => match command {
            StudentCommands::Add {
                user_id,
                name,
                email,
                year,
                mobile_no,
                password,
                image,
            } => {
                let form = NewStudentForm {
                    user_id,
                    name,
                    email,
                    year,
                    mobile_no,
                    password,
                    image,
                };
                commands::add_student(&ctx, form).await?;
            }
        },
        Commands::Run { file, language } => {
            commands::run_code(&ctx, &file, language.as_deref()).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_requires_description() {
        let base = [
            "edutrack", "assignments", "create", "--title", "Lab", "--due", "2030-01-01",
            "--year", "2", "--file", "lab.pdf",
        ];
        assert!(Cli::try_parse_from(base).is_err());

        let with_description = base.iter().copied().chain(["--description", "Pendulum"]);
        let cli = Cli::try_parse_from(with_description).unwrap();
        match cli.command {
            Commands::Assignments {
                command: AssignmentCommands::Create { description, .. },
            } => assert_eq!(description, "Pendulum"),
            _ => panic!("expected assignments create"),
        }
    }
}
