use clap::{Parser, Subcommand};
use organiser::components::event_store::projection::render;
use organiser::components::event_store::{EventDraft, EventId, EventStoreHandle};
use organiser::components::notifications::{Notification, NotificationKind, Notifications};
use organiser::components::ComponentManager;
use organiser::error::{Error, OrganiserResult};
use owo_colors::OwoColorize;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::broadcast;
use tracing::debug;

const CONFIRM_DELETE: &str = "Are you sure you want to delete this event?";

#[derive(Parser)]
#[command(name = "organiser", about = "Manage the events of the organiser service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// One line typed into the interactive shell
#[derive(Parser)]
#[command(no_binary_name = true, disable_help_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// List events, earliest first
    List,
    /// Add a new event
    Add {
        #[arg(long)]
        title: String,
        /// YYYY-MM-DD
        #[arg(long)]
        date: String,
        /// HH:MM
        #[arg(long)]
        time: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Edit an event; fields left out keep their current value
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        time: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete an event
    Delete {
        id: String,
        /// Skip the confirmation question
        #[arg(long)]
        yes: bool,
    },
    /// Interactive session
    Shell,
    /// Leave the interactive session
    Quit,
}

/// Console front end over the event store
pub struct Console {
    store: EventStoreHandle,
    components: Arc<ComponentManager>,
    toasts: broadcast::Receiver<Notification>,
}

impl Console {
    pub fn new(
        store: EventStoreHandle,
        components: Arc<ComponentManager>,
        toasts: broadcast::Receiver<Notification>,
    ) -> Self {
        Self {
            store,
            components,
            toasts,
        }
    }

    /// Run a single command given on the command line
    pub async fn run_once(&mut self, command: Commands) -> OrganiserResult<()> {
        let result = match command {
            Commands::Delete { id, yes } => {
                let confirmed = yes || confirm_in_terminal().await?;
                self.delete(id, confirmed).await
            }
            Commands::Shell | Commands::Quit => Ok(()),
            command => self.execute(command).await,
        };
        self.print_toasts();
        result
    }

    /// Read commands from stdin until `quit` or end of input
    pub async fn run_shell(&mut self) -> OrganiserResult<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        self.print_events().await?;

        loop {
            self.prompt().await?;
            let Some(line) = lines.next_line().await? else {
                break;
            };
            let args = split_args(&line);
            if args.is_empty() {
                continue;
            }

            let command = match ShellLine::try_parse_from(&args) {
                Ok(parsed) => parsed.command,
                Err(e) => {
                    println!("{}", e);
                    continue;
                }
            };

            let refresh = !matches!(command, Commands::List);
            let result = match command {
                Commands::Quit => break,
                Commands::Shell => Ok(()),
                Commands::Delete { id, yes } => {
                    let confirmed = yes || confirm_from_lines(&mut lines).await?;
                    self.delete(id, confirmed).await
                }
                command => self.execute(command).await,
            };

            self.print_toasts();
            // Store failures were already reported as toasts
            match result {
                Err(Error::Other(message)) => println!("{} {}", "✖".red(), message),
                Err(e) if e.is_local() => debug!("Command rejected before sending: {}", e),
                Err(e) => debug!("Command failed: {}", e),
                Ok(()) if refresh => self.print_events().await?,
                Ok(()) => {}
            }
        }

        Ok(())
    }

    async fn execute(&mut self, command: Commands) -> OrganiserResult<()> {
        match command {
            Commands::List => self.print_events().await,
            Commands::Add {
                title,
                date,
                time,
                description,
            } => {
                let draft = EventDraft::new(title, date, time, description);
                self.store.create(draft).await.map(|_| ())
            }
            Commands::Edit {
                id,
                title,
                date,
                time,
                description,
            } => {
                let id = EventId::new(id);
                let current = self
                    .store
                    .get(id.clone())
                    .await?
                    .ok_or_else(|| Error::Other(format!("Event {} not found", id)))?
                    .to_draft();

                let draft = EventDraft::new(
                    title.unwrap_or(current.title),
                    date.unwrap_or(current.date),
                    time.unwrap_or(current.time),
                    description.unwrap_or(current.description),
                );
                self.store.update(id, draft).await.map(|_| ())
            }
            Commands::Delete { id, .. } => self.delete(id, true).await,
            Commands::Shell | Commands::Quit => Ok(()),
        }
    }

    async fn delete(&mut self, id: String, confirmed: bool) -> OrganiserResult<()> {
        if !confirmed {
            println!("Delete cancelled");
            return Ok(());
        }
        self.store.delete(EventId::new(id)).await.map(|_| ())
    }

    async fn print_events(&self) -> OrganiserResult<()> {
        let views = self.store.events().await?;
        print!("{}", render(&views));
        Ok(())
    }

    /// Print the notifications raised by the last command
    fn print_toasts(&mut self) {
        while let Ok(notification) = self.toasts.try_recv() {
            print_toast(&notification);
        }
    }

    async fn prompt(&self) -> OrganiserResult<()> {
        let toast = match self.components.get::<Notifications>("notifications") {
            Some(notifications) => notifications.current_toast().await,
            None => None,
        };

        let mut stdout = tokio::io::stdout();
        match toast {
            Some(toast) if toast.is_error() => {
                stdout
                    .write_all(format!("organiser [{}]> ", toast.message.red()).as_bytes())
                    .await?
            }
            _ => stdout.write_all(b"organiser> ").await?,
        }
        stdout.flush().await?;
        Ok(())
    }
}

fn print_toast(notification: &Notification) {
    match notification.kind {
        NotificationKind::Success => println!("{} {}", "✔".green(), notification.message),
        NotificationKind::Error => println!("{} {}", "✖".red(), notification.message.red()),
    }
}

async fn confirm_in_terminal() -> OrganiserResult<bool> {
    tokio::task::spawn_blocking(|| {
        dialoguer::Confirm::new()
            .with_prompt(CONFIRM_DELETE)
            .default(false)
            .interact()
    })
    .await
    .map_err(|e| Error::Other(format!("Confirmation prompt failed: {}", e)))?
    .map_err(|e| Error::Other(format!("Confirmation prompt failed: {}", e)))
}

async fn confirm_from_lines(lines: &mut Lines<BufReader<Stdin>>) -> OrganiserResult<bool> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(format!("{} [y/N] ", CONFIRM_DELETE).as_bytes())
        .await?;
    stdout.flush().await?;

    let answer = lines.next_line().await?.unwrap_or_default();
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Split a shell line on whitespace, keeping double-quoted parts together
fn split_args(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut has_token = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                has_token = true;
            }
            c if c.is_whitespace() && !quoted => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        args.push(current);
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_args() {
        assert_eq!(
            split_args(r#"add --title "Team lunch" --date 2024-01-01 --time 12:00"#),
            vec!["add", "--title", "Team lunch", "--date", "2024-01-01", "--time", "12:00"]
        );
        assert_eq!(split_args("   "), Vec::<String>::new());
        assert_eq!(split_args(r#"add --description """#), vec!["add", "--description", ""]);
    }

    #[test]
    fn test_shell_line_parses_edit() {
        let parsed = ShellLine::try_parse_from(split_args("edit 4 --title Retro")).unwrap();
        assert_eq!(
            parsed.command,
            Commands::Edit {
                id: "4".to_string(),
                title: Some("Retro".to_string()),
                date: None,
                time: None,
                description: None,
            }
        );
    }

    #[test]
    fn test_shell_line_parses_delete_with_yes() {
        let parsed = ShellLine::try_parse_from(split_args("delete 4 --yes")).unwrap();
        assert_eq!(
            parsed.command,
            Commands::Delete {
                id: "4".to_string(),
                yes: true
            }
        );
    }

    #[test]
    fn test_add_requires_title_flag() {
        assert!(ShellLine::try_parse_from(split_args("add --date 2024-01-01 --time 09:00")).is_err());
    }
}
