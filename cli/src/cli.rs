//! CLI command definitions

use clap::{Parser, Subcommand};
use todo_core::Filter;

/// Todo list kept in sync with a PostgREST backend
#[derive(Debug, Parser)]
#[command(
    name = "todo",
    about = "Todo list synced with a PostgREST backend (local-only when SUPABASE_URL/SUPABASE_ANON_KEY are unset)",
    version
)]
pub struct Cli {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    /// Which todos to print: all, active or completed
    #[arg(short, long, global = true, default_value = "all")]
    pub filter: Filter,

    /// Subcommand to execute; prints the list when omitted
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Print the list
    List,

    /// Add a todo
    Add {
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Flip a todo between active and completed
    Toggle { id: String },

    /// Replace a todo's text
    Edit {
        id: String,
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Delete a todo
    #[command(alias = "remove")]
    Rm { id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_defaults_to_all() {
        let cli = Cli::try_parse_from(["todo"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.filter, Filter::All);
    }

    #[test]
    fn add_collects_words() {
        let cli = Cli::try_parse_from(["todo", "add", "buy", "milk"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Command::Add {
                text: vec!["buy".to_string(), "milk".to_string()]
            })
        );
    }

    #[test]
    fn filter_is_global() {
        let cli = Cli::try_parse_from(["todo", "toggle", "7", "--filter", "completed"]).unwrap();
        assert_eq!(cli.filter, Filter::Completed);
        assert_eq!(cli.command, Some(Command::Toggle { id: "7".to_string() }));
    }

    #[test]
    fn bad_filter_is_rejected() {
        assert!(Cli::try_parse_from(["todo", "--filter", "done"]).is_err());
    }

    #[test]
    fn edit_requires_text() {
        assert!(Cli::try_parse_from(["todo", "edit", "7"]).is_err());
    }
}
