//! Command line definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Track practice-exam progress against a question bank.
#[derive(Debug, Parser)]
#[command(name = "exam-progress", version)]
pub struct Cli {
    /// Progress store: `sqlite://<path>`, `dir:<path>` or `memory`
    #[arg(
        long = "db",
        env = "EXAM_DB_URL",
        global = true,
        default_value = "sqlite://progress.sqlite3"
    )]
    pub db: String,

    /// Question bank JSON document (required)
    #[arg(long = "bank", env = "EXAM_BANK_PATH", global = true)]
    pub bank: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(short = 'l', long = "log-level", env = "EXAM_LOG", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Show session and lifetime statistics
    Status,

    /// Start a new session, archiving the active one
    Start,

    /// Continue the active session and print its page
    Resume,

    /// Remember the page being viewed
    Page {
        #[arg(value_name = "PAGE")]
        page: u32,
    },

    /// Answer a question with one or more choice ids
    Answer {
        question: String,
        #[arg(required = true, num_args = 1..)]
        choices: Vec<String>,
    },

    /// Flag a question for review
    Flag {
        question: String,

        /// Clear the flag instead of setting it
        #[arg(long)]
        off: bool,
    },

    /// Complete the active session
    Complete,

    /// List archived sessions, newest first
    History,

    /// Delete an archived session from the history
    Forget {
        #[arg(value_name = "SESSION")]
        session: u32,
    },

    /// List questions waiting for review
    Review,

    /// Delete all stored progress for the bank
    Reset,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn answer_takes_several_choices() {
        let cli = Cli::try_parse_from([
            "exam-progress",
            "--bank",
            "bank.json",
            "answer",
            "q2",
            "a",
            "c",
        ])
        .unwrap();
        assert_eq!(cli.db, "sqlite://progress.sqlite3");
        match cli.command {
            Command::Answer { question, choices } => {
                assert_eq!(question, "q2");
                assert_eq!(choices, vec!["a", "c"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn answer_without_choices_is_rejected() {
        let parsed = Cli::try_parse_from(["exam-progress", "--bank", "b.json", "answer", "q1"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "exam-progress",
            "flag",
            "q1",
            "--off",
            "--bank",
            "b.json",
            "--db",
            "memory",
        ])
        .unwrap();
        assert_eq!(cli.db, "memory");
        assert_eq!(cli.bank, Some(PathBuf::from("b.json")));
        assert!(matches!(cli.command, Command::Flag { off: true, .. }));
    }
}
