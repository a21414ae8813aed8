//! Task list commands for CLI.

use clap::Subcommand;

use super::{open_app, print_events, CmdResult};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task at the top of the list
    Add {
        /// Task text
        text: Vec<String>,
    },
    /// Flip a task between open and done
    Toggle {
        /// Task ID
        id: i64,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: i64,
    },
    /// List tasks, newest first
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(action: TaskAction) -> CmdResult {
    let mut app = open_app().await?;

    match action {
        TaskAction::Add { text } => {
            let text = text.join(" ");
            match app.add_task(&text) {
                Some(event) => print_events(&[event])?,
                None => return Err("task text is empty".into()),
            }
        }
        TaskAction::Toggle { id } => match app.toggle_task(id) {
            Some(event) => print_events(&[event])?,
            None => return Err(format!("task not found: {id}").into()),
        },
        TaskAction::Delete { id } => match app.delete_task(id) {
            Some(event) => print_events(&[event])?,
            None => return Err(format!("task not found: {id}").into()),
        },
        TaskAction::List { json } => {
            let tasks = app.tasks().tasks();
            if json {
                println!("{}", serde_json::to_string_pretty(tasks)?);
            } else if tasks.is_empty() {
                println!("No tasks yet. Add one to get started!");
            } else {
                for task in tasks {
                    let mark = if task.completed { "x" } else { " " };
                    println!("[{mark}] {}  {}", task.id, task.text);
                }
            }
        }
    }

    app.flush().await;
    Ok(())
}
