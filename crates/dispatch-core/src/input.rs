use std::path::Path;

use crate::models::CoreError;

/// Reads a task file: one task per non-empty line, surrounding whitespace
/// removed. A missing or task-less file is an error.
pub fn load_tasks(path: &Path) -> Result<Vec<String>, CoreError> {
    let contents = std::fs::read_to_string(path).map_err(|error| {
        CoreError::storage(format!("read task file '{}': {error}", path.display()))
    })?;

    let tasks = parse_tasks(&contents);
    if tasks.is_empty() {
        return Err(CoreError::invalid_input(format!(
            "task file '{}' contains no tasks",
            path.display()
        )));
    }
    Ok(tasks)
}

pub fn parse_tasks(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
