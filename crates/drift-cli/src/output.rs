//! Terminal rendering of action results

use colored::Colorize;
use serde_json::Value;

fn text<'a>(value: &'a Value, field: &str) -> &'a str {
    value.get(field).and_then(Value::as_str).unwrap_or("-")
}

pub fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(rendered) => println!("{}", rendered),
        Err(_) => println!("{}", value),
    }
}

fn status(value: &Value) -> colored::ColoredString {
    match text(value, "status") {
        "success" => "success".green(),
        "error" => "error".red(),
        "running" => "running".yellow(),
        other => other.dimmed(),
    }
}

pub fn print_task(task: &Value) {
    println!(
        "{} {} [{}] retries left: {}",
        text(task, "id").cyan(),
        text(task, "type"),
        status(task),
        task.get("retries").and_then(Value::as_u64).unwrap_or(0)
    );
    if let Some(previous) = task.get("previous_id").and_then(Value::as_str) {
        println!("  {}: {}", "retry of".dimmed(), previous);
    }
    if let Some(result) = task.get("result").filter(|r| !r.is_null()) {
        match result.get("error").and_then(Value::as_str) {
            Some(error) => println!("  {}: {}", "error".red(), error),
            None => println!("  {}: {}", "result".dimmed(), result),
        }
    }
}

pub fn print_tasks(tasks: &Value) {
    let tasks = tasks.as_array().map(Vec::as_slice).unwrap_or_default();
    if tasks.is_empty() {
        println!("{}", "No tasks".dimmed());
    }
    for task in tasks {
        print_task(task);
    }
}

pub fn print_repository(repository: &Value) {
    println!(
        "{} ({}) {}",
        text(repository, "name").bold(),
        text(repository, "type"),
        text(repository, "remote").dimmed()
    );
    let modules = repository
        .get("modules")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    if modules.is_empty() {
        println!("  {}", "No modules".dimmed());
    }
    for module in modules {
        println!(
            "  {} {} ({}) {}",
            "+".green(),
            text(module, "name").cyan(),
            text(module, "type"),
            text(module, "current")
        );
        let dependencies = module
            .get("dependencies")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for dependency in dependencies {
            println!(
                "      {} {} {}",
                "->".dimmed(),
                text(dependency, "name"),
                text(dependency, "version")
            );
        }
    }
}

pub fn print_repositories(repositories: &Value) {
    let repositories = repositories.as_array().map(Vec::as_slice).unwrap_or_default();
    if repositories.is_empty() {
        println!("{} (use {} to add)", "None".dimmed(), "drift repo add".cyan());
    }
    for repository in repositories {
        println!(
            "{} {} ({}) {}",
            "+".green(),
            text(repository, "name").cyan(),
            text(repository, "type"),
            text(repository, "remote").dimmed()
        );
    }
}

pub fn print_updates(updates: &Value) {
    let updates = updates.as_array().map(Vec::as_slice).unwrap_or_default();
    if updates.is_empty() {
        println!("{}", "No updates".dimmed());
    }
    for update in updates {
        println!(
            "{}/{} {} -> {} in {}/{}",
            text(update, "src_repository"),
            text(update, "src_module").cyan(),
            text(update, "from_version"),
            text(update, "to_version").green(),
            text(update, "dest_repository"),
            text(update, "dest_module")
        );
    }
}

pub fn print_pull_requests(pull_requests: &Value) {
    let pull_requests = pull_requests.as_array().map(Vec::as_slice).unwrap_or_default();
    if pull_requests.is_empty() {
        println!("{}", "No pull requests".dimmed());
    }
    for pr in pull_requests {
        println!(
            "{}#{} {} {}",
            text(pr, "repository"),
            pr.get("number").and_then(Value::as_u64).unwrap_or(0),
            text(pr, "title").bold(),
            text(pr, "link").dimmed()
        );
    }
}
