mod api;
mod config;
mod deck;
mod effects;
mod errors;
mod gesture;
mod inspector;
mod logging;
mod models;
mod session;
mod source;
mod tui;

use anyhow::{Context, Result, anyhow};
use api::ApiClient;
use clap::{Parser, Subcommand};
use config::Config;
use models::Candidate;
use session::{Session, SessionStore};
use source::{HttpMatchSource, MatchSource, PlaceholderSource};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "matchdeck")]
#[command(about = "Review AI-ranked job matches for your resume, one card at a time")]
struct Cli {
    /// Matching service base URL (overrides MATCHDECK_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Use random demo matches instead of the matching service
    #[arg(long, global = true)]
    placeholder: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Swipe through your matches (default)
    Swipe,

    /// Print your ranked matches
    Matches {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Search job listings
    Jobs {
        /// Free-text search over title, description and skills
        #[arg(short, long)]
        query: Option<String>,

        /// Filter by location
        #[arg(short, long)]
        location: Option<String>,

        /// Number of listings to show
        #[arg(long, default_value = "20")]
        limit: u32,

        /// Number of listings to skip
        #[arg(long, default_value = "0")]
        skip: u32,
    },

    /// Log in to the matching service
    Login {
        email: String,

        #[arg(short, long)]
        password: String,
    },

    /// Create an account on the matching service
    Register {
        full_name: String,

        email: String,

        #[arg(short, long)]
        password: String,
    },

    /// Forget the current identity and resume
    Logout,

    /// Show the current session
    Session,

    /// Manage the resume your matches are based on
    Resume {
        #[command(subcommand)]
        command: ResumeCommands,
    },
}

#[derive(Subcommand)]
enum ResumeCommands {
    /// Upload a resume for skill extraction and matching
    Upload {
        /// Path to resume file (PDF or DOCX)
        file: PathBuf,
    },

    /// Use an already-uploaded resume by its id
    Set {
        id: String,
    },

    /// Stop using the current resume
    Clear,
}

fn match_source(config: &Config, session: &Session) -> Result<Arc<dyn MatchSource>> {
    if config.placeholder {
        Ok(Arc::new(PlaceholderSource::new(session.skills.clone())))
    } else {
        Ok(Arc::new(HttpMatchSource::new(ApiClient::new(config)?)))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(url) = cli.api_url {
        config.api_url = url.trim_end_matches('/').to_string();
    }
    if cli.placeholder {
        config.placeholder = true;
    }

    let log_path = logging::init(&config)?;
    info!("Starting matchdeck v{} against {}", env!("CARGO_PKG_VERSION"), config.api_url);

    let store = SessionStore::open()?;
    let session = store.load()?;

    match cli.command.unwrap_or(Commands::Swipe) {
        Commands::Swipe => {
            let source = match_source(&config, &session)?;
            let tally = tui::run_swipe(&config, session, source)?;

            if tally.is_empty() {
                println!("No decisions made.");
            } else {
                println!("Applied ({}):", tally.applied.len());
                for c in &tally.applied {
                    println!("  + {} at {} ({}%)", c.title, c.company, c.score);
                }
                println!("Passed ({}):", tally.passed.len());
                for c in &tally.passed {
                    println!("  - {} at {} ({}%)", c.title, c.company, c.score);
                }
            }
            println!("Log: {}", log_path.display());
        }

        Commands::Matches { json } => {
            let source = match_source(&config, &session)?;
            let mut ranked = match source::load(&session, source.as_ref()) {
                Ok(candidates) => candidates,
                Err(e) => {
                    eprintln!("Could not load matches: {}", e);
                    Vec::new()
                }
            };
            // deck order is worst-first; print best-first
            ranked.reverse();

            if json {
                println!("{}", serde_json::to_string_pretty(&ranked)?);
            } else if ranked.is_empty() {
                if session.resume_ref().is_none() {
                    println!("No matches yet. Upload a resume with 'matchdeck resume upload <file>'.");
                } else {
                    println!("No matches found.");
                }
            } else {
                print_matches(&ranked);
            }
        }

        Commands::Jobs { query, location, limit, skip } => {
            let api = ApiClient::new(&config)?;
            let jobs = api.list_jobs(query.as_deref(), location.as_deref(), limit, skip)?;
            if jobs.is_empty() {
                println!("No jobs found matching your criteria.");
            } else {
                println!("{:<30} {:<20} {:<18} {:<30}", "TITLE", "COMPANY", "LOCATION", "SKILLS");
                println!("{}", "-".repeat(101));
                for job in jobs {
                    println!(
                        "{:<30} {:<20} {:<18} {:<30}",
                        truncate(&job.title, 28),
                        truncate(&job.company, 18),
                        truncate(&job.location, 16),
                        truncate(&job.skills_required.join(", "), 30)
                    );
                }
            }
        }

        Commands::Login { email, password } => {
            let api = ApiClient::new(&config)?;
            let identity = api.login(&email, &password)?;
            store.set_identity(&identity)?;
            info!("Logged in as {}", identity.id);
            println!("Logged in as {} <{}>", identity.full_name, identity.email);
        }

        Commands::Register { full_name, email, password } => {
            let api = ApiClient::new(&config)?;
            let identity = api.register(&full_name, &email, &password)?;
            store.set_identity(&identity)?;
            info!("Registered {}", identity.id);
            println!("Registered and logged in as {} <{}>", identity.full_name, identity.email);
        }

        Commands::Logout => {
            store.clear()?;
            println!("Logged out.");
        }

        Commands::Session => {
            match &session.identity {
                Some(identity) => {
                    println!("User: {} <{}> (ID: {})", identity.full_name, identity.email, identity.id)
                }
                None => println!("User: (not logged in)"),
            }
            match session.resume_ref() {
                Some(id) => println!("Resume: {}", id),
                None => println!("Resume: (none uploaded)"),
            }
            if !session.skills.is_empty() {
                println!("Skills: {}", session.skills.join(", "));
            }
            println!("Store: {}", store.path().display());
        }

        Commands::Resume { command } => match command {
            ResumeCommands::Upload { file } => {
                let identity = session
                    .identity
                    .as_ref()
                    .ok_or_else(|| anyhow!("Not logged in. Run 'matchdeck login <email>' first."))?;
                if !file.is_file() {
                    return Err(anyhow!("Resume file not found: {}", file.display()));
                }

                let api = ApiClient::new(&config)?;
                println!("Uploading {}...", file.display());
                let uploaded = api
                    .upload_resume(&identity.id, &file)
                    .with_context(|| format!("Failed to upload {}", file.display()))?;
                store.set_resume(&uploaded.id, &uploaded.skills_detected)?;
                info!("Uploaded resume {} ({:?})", uploaded.id, uploaded.filename);

                println!("Resume uploaded (ID: {})", uploaded.id);
                if uploaded.skills_detected.is_empty() {
                    println!("No skills detected.");
                } else {
                    println!("Skills detected: {}", uploaded.skills_detected.join(", "));
                }
            }

            ResumeCommands::Set { id } => {
                let id = id.trim();
                if id.is_empty() {
                    return Err(anyhow!("Resume id must not be empty"));
                }
                store.set_resume(id, &session.skills)?;
                println!("Using resume {}", id);
            }

            ResumeCommands::Clear => {
                store.clear_resume()?;
                println!("Resume cleared.");
            }
        },
    }

    Ok(())
}

fn print_matches(ranked: &[Candidate]) {
    println!("{:<5} {:>6} {:<28} {:<20} {:<18}", "RANK", "SCORE", "TITLE", "COMPANY", "LOCATION");
    println!("{}", "-".repeat(81));
    for c in ranked {
        println!(
            "{:<5} {:>5}% {:<28} {:<20} {:<18}",
            c.id.to_string(),
            c.score,
            truncate(&c.title, 26),
            truncate(&c.company, 18),
            truncate(&c.location, 16)
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Senior Platform Engineer", 10), "Senior ...");
        assert_eq!(truncate("Zürich Zürich Zürich", 8), "Züric...");
    }

    #[test]
    fn test_cli_defaults_to_swipe() {
        let cli = Cli::try_parse_from(["matchdeck"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.placeholder);
    }

    #[test]
    fn test_cli_parses_jobs_filters() {
        let cli = Cli::try_parse_from(["matchdeck", "jobs", "-q", "rust", "--limit", "5"]).unwrap();
        match cli.command {
            Some(Commands::Jobs { query, location, limit, skip }) => {
                assert_eq!(query.as_deref(), Some("rust"));
                assert!(location.is_none());
                assert_eq!(limit, 5);
                assert_eq!(skip, 0);
            }
            _ => panic!("expected jobs command"),
        }
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["matchdeck", "matches", "--json", "--placeholder"]).unwrap();
        assert!(cli.placeholder);
        assert!(matches!(cli.command, Some(Commands::Matches { json: true })));
    }

    #[test]
    fn test_placeholder_source_selected_by_config() {
        let config = Config { placeholder: true, ..Config::default() };
        let source = match_source(&config, &Session::default()).unwrap();
        assert_eq!(source.name(), "placeholder");
    }
}
