use crate::models::Task;

/// Completion filter on the manager dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskFilter {
    #[default]
    All,
    Pending,
    Completed,
}

impl TaskFilter {
    fn matches(&self, task: &Task) -> bool {
        match self {
            TaskFilter::All => true,
            TaskFilter::Pending => !task.is_completed,
            TaskFilter::Completed => task.is_completed,
        }
    }
}

/// Case-insensitive substring search over title and description, combined
/// with the completion filter. An empty term matches everything.
pub fn filter_tasks<'a>(tasks: &'a [Task], term: &str, filter: TaskFilter) -> Vec<&'a Task> {
    let term = term.to_lowercase();
    tasks
        .iter()
        .filter(|task| {
            let matches_search = term.is_empty()
                || task.title.to_lowercase().contains(&term)
                || task
                    .description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&term));
            matches_search && filter.matches(task)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn task(title: &str, description: Option<&str>, completed: bool) -> Task {
        let now = Utc::now();
        Task {
            id: title.to_string(),
            title: title.to_string(),
            description: description.map(str::to_string),
            due_date: None,
            is_completed: completed,
            created_at: now,
            updated_at: now,
            user_id: "u1".to_string(),
            feedback: None,
            completed_at: completed.then_some(now),
            owner: None,
        }
    }

    #[test]
    fn search_matches_title_and_description() {
        let tasks = vec![
            task("Write report", None, false),
            task("Standup", Some("weekly report sync"), false),
            task("Review PR", None, false),
        ];

        let hits = filter_tasks(&tasks, "report", TaskFilter::All);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|t| t.title != "Review PR"));
    }

    #[test]
    fn search_is_case_insensitive() {
        let tasks = vec![task("Write Report", None, false)];
        assert_eq!(filter_tasks(&tasks, "wRiTe", TaskFilter::All).len(), 1);
    }

    #[test]
    fn completion_filter_splits_pending_and_done() {
        let tasks = vec![
            task("a", None, true),
            task("b", None, false),
            task("c", None, true),
        ];

        assert_eq!(filter_tasks(&tasks, "", TaskFilter::All).len(), 3);
        assert_eq!(filter_tasks(&tasks, "", TaskFilter::Pending).len(), 1);
        assert_eq!(filter_tasks(&tasks, "", TaskFilter::Completed).len(), 2);
    }
}
