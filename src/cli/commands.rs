use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "scriptbridge")]
#[command(author, version, about = "Expose documented Lua commands as tools", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to config/$CONFIG_ENV plus APP__ environment variables)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the descriptors of every registered tool
    List {
        /// Print the descriptors as JSON
        #[arg(long)]
        json: bool,
    },

    /// Call one tool and print its outcome
    Call {
        tool: String,

        /// Arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_call() {
        let cli = Cli::parse_from([
            "scriptbridge",
            "call",
            "add_stock",
            "--args",
            r#"{"name": "bolt"}"#,
            "--config",
            "dev.toml",
        ]);

        assert_eq!(cli.config, Some(PathBuf::from("dev.toml")));
        match cli.command {
            Commands::Call { tool, args } => {
                assert_eq!(tool, "add_stock");
                assert_eq!(args, r#"{"name": "bolt"}"#);
            }
            _ => panic!("expected call"),
        }
    }

    #[test]
    fn test_parse_list_defaults() {
        let cli = Cli::parse_from(["scriptbridge", "list"]);
        assert!(cli.config.is_none());
        assert!(matches!(cli.command, Commands::List { json: false }));
    }
}
