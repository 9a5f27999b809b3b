use crate::config::{Backend, Config};
use crate::controller::GroupDetailController;
use crate::display::*;
use crate::error::ActionError;
use crate::model::{GroupId, MemberId, ParameterId};
use crate::notify::Notifier;
use crate::parameters::ParameterController;
use crate::session::{AuthSession, SessionStorage, TOKEN_KEY, USER_KEY};
use crate::store::{GroupStore, RestGroupStore, SqlGroupStore};
use clap::{Parser, Subcommand};
use eyre::{Report, Result, WrapErr, ensure};
use std::io::Write;
use std::path::PathBuf;
use tracing::Level;

mod config;
mod controller;
mod display;
mod error;
mod inflight;
mod model;
mod notify;
mod parameters;
mod policy;
mod session;
mod store;
#[cfg(test)]
mod testing;

#[derive(Parser)]
#[command(version, about = "Manage student project groups")]
struct Options {
    /// Use FILE instead of groupdesk.toml
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Set verbosity level
    #[arg(short, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store an API token for later commands
    Login {
        #[arg(long)]
        token: String,
        /// JSON description of the logged-in user
        #[arg(long)]
        user: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the stored session
    Status,
    /// Inspect and change project groups
    #[command(subcommand)]
    Group(GroupCommand),
    /// Manage evaluation parameters
    #[command(subcommand)]
    Params(ParamsCommand),
    /// Prepare the database used by the sql backend
    #[command(subcommand)]
    Db(DbCommand),
}

#[derive(Subcommand)]
enum GroupCommand {
    /// Show a group and its members
    Show { group: String },
    /// List students not assigned to any group
    Available { group: String },
    /// Add students to a group
    Add {
        group: String,
        #[arg(required = true)]
        students: Vec<String>,
        /// Allow the group to grow past its usual size
        #[arg(long = "override")]
        override_enabled: bool,
    },
    /// Remove a student from a group
    Remove {
        group: String,
        student: String,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Assign a guide to a group by name
    Guide { group: String, name: String },
    /// Delete a group
    Delete {
        group: String,
        #[arg(short, long)]
        yes: bool,
    },
    /// Write the member roster as CSV
    Export {
        group: String,
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ParamsCommand {
    List,
    Create {
        name: String,
        marks: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    Update {
        id: String,
        name: String,
        marks: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    Delete { id: String },
}

#[derive(Subcommand)]
enum DbCommand {
    /// Create missing tables
    Init,
}

fn confirm(question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn rest_store(config: &Config, storage: &SessionStorage) -> Result<RestGroupStore> {
    let session = AuthSession::init(storage)?;
    ensure!(
        session.is_authenticated(),
        "not logged in, run `groupdesk login --token TOKEN` first"
    );
    Ok(RestGroupStore::new(
        &config.api.base_url,
        session,
        config.api.timeout(),
    )?)
}

async fn sql_store(config: &Config) -> Result<SqlGroupStore> {
    SqlGroupStore::connect(&config.store.url, config.policy)
        .await
        .wrap_err("cannot connect to database")
}

/// Action failures have already been shown in the notification banner.
fn already_shown(error: &Report) -> bool {
    error.is::<ActionError>()
}

fn finish(notifier: &Notifier, result: Result<()>) -> Result<()> {
    display_notification(notifier);
    match result {
        Err(e) if already_shown(&e) => std::process::exit(1),
        other => other,
    }
}

async fn run_group<S: GroupStore>(
    c: &GroupDetailController<S>,
    notifier: &Notifier,
    command: GroupCommand,
) -> Result<()> {
    let result: Result<()> = async {
        match command {
            GroupCommand::Show { group } => {
                display_group(&c.load_group_details(&GroupId(group)).await?);
            }
            GroupCommand::Available { group } => {
                let candidates = c.available_students(&GroupId(group)).await?;
                display_members("Available students", &candidates);
            }
            GroupCommand::Add {
                group,
                students,
                override_enabled,
            } => {
                let id = GroupId(group);
                c.load_group_details(&id).await?;
                for student in students {
                    c.select(MemberId(student));
                }
                display_group(&c.add_selected(&id, override_enabled).await?);
            }
            GroupCommand::Remove {
                group,
                student,
                yes,
            } => {
                let id = GroupId(group);
                let loaded = c.load_group_details(&id).await?;
                let member = c.request_removal(&id, &MemberId(student))?;
                if yes || confirm(&format!("Remove {member} from {}?", loaded.name))? {
                    display_group(&c.confirm_removal().await?);
                } else {
                    c.cancel_removal();
                    println!("Removal cancelled");
                }
            }
            GroupCommand::Guide { group, name } => {
                let id = GroupId(group);
                c.load_group_details(&id).await?;
                c.load_guides().await?;
                display_group(&c.change_guide(&id, &name).await?);
            }
            GroupCommand::Delete { group, yes } => {
                let id = GroupId(group);
                let loaded = c.load_group_details(&id).await?;
                if yes || confirm(&format!("Delete group {}?", loaded.name))? {
                    c.delete_group(&id).await?;
                } else {
                    println!("Deletion cancelled");
                }
            }
            GroupCommand::Export { group, output } => {
                let loaded = c.load_group_details(&GroupId(group)).await?;
                match output {
                    Some(path) => {
                        let file = std::fs::File::create(&path)
                            .wrap_err_with(|| format!("cannot create {}", path.display()))?;
                        write_members_csv(&loaded, file)?;
                    }
                    None => write_members_csv(&loaded, std::io::stdout())?,
                }
            }
        }
        Ok(())
    }
    .await;
    finish(notifier, result)
}

async fn run_params<S: GroupStore>(
    c: &ParameterController<S>,
    notifier: &Notifier,
    command: ParamsCommand,
) -> Result<()> {
    let result: Result<()> = async {
        match command {
            ParamsCommand::List => {
                c.load().await?;
            }
            ParamsCommand::Create {
                name,
                marks,
                description,
            } => {
                c.create(&name, &description, &marks).await?;
            }
            ParamsCommand::Update {
                id,
                name,
                marks,
                description,
            } => {
                c.update(&ParameterId(id), &name, &description, &marks)
                    .await?;
            }
            ParamsCommand::Delete { id } => {
                c.delete(&ParameterId(id)).await?;
            }
        }
        display_parameters(&c.parameters());
        Ok(())
    }
    .await;
    finish(notifier, result)
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let options = Options::parse();
    let level = match options.verbose {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
    let config = Config::load(options.config.as_deref())?;
    let storage = SessionStorage::new(&config.session.file);
    let notifier = Notifier::new(config.notifications.duration());
    match options.command {
        Command::Login { token, user } => {
            storage.set(TOKEN_KEY, &token)?;
            if let Some(user) = user {
                storage.set(USER_KEY, &user)?;
            }
            ensure!(
                AuthSession::init(&storage)?.is_authenticated(),
                "empty token"
            );
            println!("Logged in");
        }
        Command::Logout => {
            AuthSession::clear(&storage)?;
            println!("Logged out");
        }
        Command::Status => {
            let session = AuthSession::init(&storage)?;
            if session.is_authenticated() {
                println!("Logged in as {}", session.user().unwrap_or("(unknown user)"));
            } else {
                println!("Not logged in");
            }
            if session.is_student() {
                println!(
                    "Student session: {}",
                    session.student_data().unwrap_or("(no details)")
                );
            }
        }
        Command::Group(command) => match config.store.backend {
            Backend::Rest => {
                let store = rest_store(&config, &storage)?;
                let c = GroupDetailController::new(store, notifier.clone(), config.policy);
                run_group(&c, &notifier, command).await?;
            }
            Backend::Sql => {
                let store = sql_store(&config).await?;
                let c = GroupDetailController::new(store, notifier.clone(), config.policy);
                run_group(&c, &notifier, command).await?;
            }
        },
        Command::Params(command) => match config.store.backend {
            Backend::Rest => {
                let c = ParameterController::new(rest_store(&config, &storage)?, notifier.clone());
                run_params(&c, &notifier, command).await?;
            }
            Backend::Sql => {
                let c = ParameterController::new(sql_store(&config).await?, notifier.clone());
                run_params(&c, &notifier, command).await?;
            }
        },
        Command::Db(DbCommand::Init) => {
            ensure!(
                config.store.backend == Backend::Sql,
                "`db init` needs `backend = \"sql\"` in the [store] section"
            );
            sql_store(&config).await?.init_schema().await?;
            println!("Database ready");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_failures_are_not_reported_twice() {
        let action = Report::from(ActionError::NotLoaded);
        assert!(already_shown(&action));
        let io = Report::from(std::io::Error::other("disk full"));
        assert!(!already_shown(&io));
        assert!(!already_shown(&io.wrap_err("cannot create roster.csv")));
    }
}
