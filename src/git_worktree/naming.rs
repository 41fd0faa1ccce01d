//! Branch naming for task worktrees.

/// Length of generated branch suffixes.
const SUFFIX_LEN: usize = 6;

/// Generate the branch name for a task.
///
/// Format: `rover-task-{id}-{suffix}`
/// Example: `rover-task-7-k3j9x2`
///
/// The suffix is sanitized; an empty suffix yields `rover-task-{id}`.
pub fn task_branch_name(task_id: u64, suffix: &str) -> String {
    let suffix = sanitize_slug(suffix);
    if suffix.is_empty() {
        format!("rover-task-{}", task_id)
    } else {
        format!("rover-task-{}-{}", task_id, suffix)
    }
}

/// A short random lowercase alphanumeric suffix.
pub fn random_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..SUFFIX_LEN].to_string()
}

/// Sanitize a string for use in branch names.
///
/// Converts to lowercase, replaces spaces and special chars with hyphens,
/// removes consecutive hyphens, and trims leading/trailing hyphens.
pub fn sanitize_slug(s: &str) -> String {
    let mut result = String::new();
    let mut last_was_hyphen = true;

    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            result.push(c.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            result.push('-');
            last_was_hyphen = true;
        }
    }

    while result.ends_with('-') {
        result.pop();
    }

    result
}
