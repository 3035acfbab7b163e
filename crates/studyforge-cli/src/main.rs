//! studyforge CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "studyforge", version, about = "Assessment and scoring engine for student practice")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory (overrides `data_dir` from the config)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter config and roster
    Init,

    /// Show the configured generator and the models it serves
    Status {
        /// Check a specific provider instead of the default
        #[arg(long)]
        provider: Option<String>,
    },

    /// Generate and grade multiple-choice quizzes
    Quiz {
        #[command(subcommand)]
        action: QuizAction,
    },

    /// Grade a written assignment against a rubric
    Grade {
        /// Assignment identifier (results are stored under it)
        #[arg(long)]
        assignment_id: String,

        /// File holding the student's text
        #[arg(long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// The student's text inline
        #[arg(long)]
        text: Option<String>,

        /// Grading criteria
        #[arg(long)]
        rubric: String,

        /// Maximum marks (default from config)
        #[arg(long)]
        max_marks: Option<u32>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate crossword or word-search content
    Puzzle {
        #[command(subcommand)]
        kind: PuzzleKind,
    },

    /// Record a finished game round
    Score {
        /// Student identifier
        #[arg(long)]
        student: String,

        /// Game: tictactoe, crossword, wordsearch
        #[arg(long)]
        game: String,

        /// Tic-tac-toe outcome: win, draw, loss
        #[arg(long)]
        outcome: Option<String>,

        /// Correct (crossword) or found (word search) words
        #[arg(long)]
        solved: Option<u32>,

        /// Words in the puzzle
        #[arg(long)]
        total: Option<u32>,

        /// Seconds taken
        #[arg(long)]
        elapsed: Option<u32>,
    },

    /// Show the top students for a game
    Leaderboard {
        /// Game: tictactoe, crossword, wordsearch
        #[arg(long)]
        game: String,

        /// Number of rows
        #[arg(long, default_value = "10")]
        top: usize,

        /// Roster file mapping student ids to display names
        #[arg(long)]
        roster: Option<PathBuf>,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },
}

#[derive(Subcommand)]
enum QuizAction {
    /// Generate a new 10-question quiz
    Start {
        #[arg(long)]
        subject: String,

        /// Level: easy, medium, hard
        #[arg(long, default_value = "easy")]
        level: String,

        /// Print the student view as JSON
        #[arg(long)]
        json: bool,
    },

    /// Grade answers for a stored quiz
    Submit {
        #[arg(long)]
        quiz_id: String,

        /// Comma-separated answers, A-D or 0-3; `-` or empty for unanswered
        #[arg(long, allow_hyphen_values = true)]
        answers: String,

        /// Also show correct answers and explanations
        #[arg(long)]
        review: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct PuzzleArgs {
    #[arg(long)]
    subject: String,

    /// Level: easy, medium, hard
    #[arg(long, default_value = "easy")]
    level: String,

    /// Number of words
    #[arg(long, default_value = "10")]
    count: usize,

    /// Print the puzzle as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum PuzzleKind {
    /// Words with clues
    Crossword(PuzzleArgs),
    /// Words to hide in a grid
    Wordsearch(PuzzleArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,studyforge=info")),
        )
        .init();

    let cli = Cli::parse();
    let global = commands::Global {
        config: cli.config,
        data_dir: cli.data_dir,
    };

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Status { provider } => commands::status::execute(&global, provider).await,
        Commands::Quiz { action } => match action {
            QuizAction::Start {
                subject,
                level,
                json,
            } => commands::quiz::start(&global, subject, level, json).await,
            QuizAction::Submit {
                quiz_id,
                answers,
                review,
                json,
            } => commands::quiz::submit(&global, quiz_id, answers, review, json).await,
        },
        Commands::Grade {
            assignment_id,
            file,
            text,
            rubric,
            max_marks,
            json,
        } => {
            commands::grade::execute(&global, assignment_id, file, text, rubric, max_marks, json)
                .await
        }
        Commands::Puzzle { kind } => match kind {
            PuzzleKind::Crossword(args) => {
                commands::puzzle::crossword(&global, args.subject, args.level, args.count, args.json)
                    .await
            }
            PuzzleKind::Wordsearch(args) => {
                commands::puzzle::wordsearch(&global, args.subject, args.level, args.count, args.json)
                    .await
            }
        },
        Commands::Score {
            student,
            game,
            outcome,
            solved,
            total,
            elapsed,
        } => {
            commands::score::execute(&global, student, game, outcome, solved, total, elapsed).await
        }
        Commands::Leaderboard {
            game,
            top,
            roster,
            format,
        } => commands::leaderboard::execute(&global, game, top, roster, format).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
