use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::Result;

use doeet::chat::{Assistant, ChatRelay, GeminiClient};
use doeet::store::LocalStore;
use doeet::tasks::{BatchReport, RemoteTaskClient, TaskService};
use doeet::types::{Priority, Task, TaskId, UserProfile};

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; environment always wins.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let store = Arc::new(LocalStore::open_default()?);
    let tasks = TaskService::new(Arc::new(RemoteTaskClient::public_demo()?), store.clone());
    let relay = ChatRelay::new(Arc::new(GeminiClient::from_env()?));
    let assistant = Assistant::new(relay, store.clone());

    greet(&store);
    println!("Type 'help' for commands.");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));

        match command {
            "list" => match tasks.tasks().await {
                Ok(view) => render_tasks(&view),
                Err(e) => eprintln!("error: {}", e),
            },
            "add" => {
                let (priority, text) = parse_add_args(rest);
                if text.is_empty() {
                    eprintln!("usage: add [!high|!medium|!low] <text>");
                    continue;
                }
                match tasks.add_task(text, priority).await {
                    Ok(task) => println!("added {} ({})", task.id, task.todo),
                    Err(e) => eprintln!("error: {}", e),
                }
            }
            "done" => match parse_ids(rest) {
                Ok(ids) if !ids.is_empty() => match tasks.complete_tasks(&ids).await {
                    Ok(report) => render_report("completed", &report),
                    Err(e) => eprintln!("error: {}", e),
                },
                Ok(_) => eprintln!("usage: done <id> [<id>...]"),
                Err(e) => eprintln!("error: {}", e),
            },
            "rm" => match parse_ids(rest) {
                Ok(ids) if !ids.is_empty() => match tasks.delete_tasks(&ids).await {
                    Ok(report) => render_report("deleted", &report),
                    Err(e) => eprintln!("error: {}", e),
                },
                Ok(_) => eprintln!("usage: rm <id> [<id>...]"),
                Err(e) => eprintln!("error: {}", e),
            },
            "refresh" => {
                tasks.invalidate();
                println!("view invalidated");
            }
            "chat" => {
                if rest.is_empty() {
                    eprintln!("usage: chat <message>");
                    continue;
                }
                match assistant.send(rest).await {
                    Ok(reply) => println!("{}", reply),
                    Err(e) => eprintln!("error: {}", e),
                }
            }
            "history" => match assistant.transcript() {
                Ok(messages) => {
                    for msg in messages {
                        println!("[{:?}] {}", msg.role, msg.content);
                    }
                }
                Err(e) => eprintln!("error: {}", e),
            },
            "clear-chat" => match assistant.clear() {
                Ok(()) => println!("chat cleared"),
                Err(e) => eprintln!("error: {}", e),
            },
            "login" => {
                let mut parts = rest.split_whitespace();
                match (parts.next(), parts.next()) {
                    (Some(username), Some(email)) => {
                        let profile = UserProfile {
                            username: username.to_string(),
                            email: email.to_string(),
                            avatar: None,
                        };
                        match store.set_user_profile(&profile) {
                            Ok(()) => println!("welcome, {}!", profile.username),
                            Err(e) => eprintln!("error: {}", e),
                        }
                    }
                    _ => eprintln!("usage: login <username> <email>"),
                }
            }
            "logout" => match store.clear_user_profile() {
                Ok(()) => println!("logged out"),
                Err(e) => eprintln!("error: {}", e),
            },
            "help" => print_help(),
            "quit" | "exit" => break,
            other => eprintln!("unknown command: {} (try 'help')", other),
        }
    }

    Ok(())
}

fn greet(store: &LocalStore) {
    match store.user_profile() {
        Ok(Some(profile)) => println!("Hi {}, let's doeet!", profile.username),
        _ => println!("Hi there, let's doeet!"),
    }
}

fn print_help() {
    println!("commands:");
    println!("  list                        show the unified task list");
    println!("  add [!high|!medium|!low] <text>   create a local task");
    println!("  done <id> [<id>...]         mark tasks completed");
    println!("  rm <id> [<id>...]           delete tasks");
    println!("  refresh                     drop the cached view");
    println!("  chat <message>              ask the assistant");
    println!("  history                     show the chat transcript");
    println!("  clear-chat                  forget the chat transcript");
    println!("  login <username> <email>    store a user profile");
    println!("  logout                      clear the user profile");
    println!("  quit                        leave");
}

fn parse_add_args(rest: &str) -> (Option<Priority>, &str) {
    if let Some(tail) = rest.strip_prefix('!') {
        let (word, text) = tail.split_once(' ').unwrap_or((tail, ""));
        if let Ok(priority) = word.parse::<Priority>() {
            return (Some(priority), text.trim());
        }
    }
    (None, rest.trim())
}

fn parse_ids(rest: &str) -> Result<Vec<TaskId>, String> {
    rest.split_whitespace()
        .map(|word| word.parse::<TaskId>())
        .collect()
}

fn render_tasks(view: &[Task]) {
    if view.is_empty() {
        // Zero tasks is a valid state, rendered distinctly from errors.
        println!("All done! No tasks available just yet.");
        return;
    }
    for task in view {
        let mark = if task.completed { "x" } else { " " };
        let priority = task
            .priority
            .map(|p| format!(" ({})", p))
            .unwrap_or_default();
        println!("[{}] {:>9}  {}{}", mark, task.id.to_string(), task.todo, priority);
    }
    let done = view.iter().filter(|t| t.completed).count();
    println!("{} of {} completed", done, view.len());
}

fn render_report(verb: &str, report: &BatchReport) {
    if report.all_ok() {
        println!("{} {} task(s)", verb, report.succeeded.len());
        return;
    }
    println!(
        "{} {} task(s), {} failed:",
        verb,
        report.succeeded.len(),
        report.failed.len()
    );
    for (id, reason) in &report.failed {
        println!("  {}: {}", id, reason);
    }
}
