use thiserror::Error;

use crate::models::next_id;
use crate::store::{Store, StoreError};
use shared::{CreateTaskRequest, Task, UpdateTaskRequest};

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Task not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
}

fn validate_name(name: &str) -> Result<String, TaskError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TaskError::Validation("Task name is required".to_string()));
    }
    Ok(name.to_string())
}

fn validate_reward(reward: i64) -> Result<i64, TaskError> {
    if reward <= 0 {
        return Err(TaskError::Validation("Reward must be a positive number".to_string()));
    }
    Ok(reward)
}

pub fn list_tasks(store: &Store, active_only: bool) -> Result<Vec<Task>, TaskError> {
    Ok(store.read(|doc| {
        doc.tasks
            .iter()
            .filter(|t| !active_only || t.active)
            .cloned()
            .collect()
    })?)
}

pub fn create_task(store: &Store, request: &CreateTaskRequest) -> Result<Task, TaskError> {
    let name = validate_name(&request.name)?;
    let reward = validate_reward(request.reward)?;

    let task = store.write(|doc| {
        let task = Task {
            id: next_id(doc.tasks.iter().map(|t| t.id)),
            name,
            reward,
            active: true,
        };
        doc.tasks.push(task.clone());
        Ok::<_, TaskError>(task)
    })?;

    log::info!("Created task {} ({})", task.id, task.name);
    Ok(task)
}

/// Merge only the provided fields. Deactivation is the only way to remove a
/// task, so submissions keep pointing at something.
pub fn update_task(store: &Store, task_id: i64, request: &UpdateTaskRequest) -> Result<Task, TaskError> {
    let name = request.name.as_deref().map(validate_name).transpose()?;
    let reward = request.reward.map(validate_reward).transpose()?;

    store.write(|doc| {
        let task = doc
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or(TaskError::NotFound)?;

        if let Some(name) = name {
            task.name = name;
        }
        if let Some(reward) = reward {
            task.reward = reward;
        }
        if let Some(active) = request.active {
            task.active = active;
        }

        Ok::<_, TaskError>(task.clone())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_tasks_active_only() {
        let store = Store::in_memory().unwrap();
        update_task(
            &store,
            1,
            &UpdateTaskRequest {
                active: Some(false),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(list_tasks(&store, false).unwrap().len(), 3);
        let active = list_tasks(&store, true).unwrap();
        assert_eq!(active.len(), 2);
        assert!(active.iter().all(|t| t.id != 1));
    }

    #[test]
    fn test_create_task_assigns_fresh_id() {
        let store = Store::in_memory().unwrap();

        let first = create_task(
            &store,
            &CreateTaskRequest {
                name: "Brush the fur".to_string(),
                reward: 7,
            },
        )
        .unwrap();
        let second = create_task(
            &store,
            &CreateTaskRequest {
                name: "Clean the bowl".to_string(),
                reward: 4,
            },
        )
        .unwrap();

        assert!(first.active);
        assert_ne!(first.id, second.id);
        assert!(second.id > first.id);
        let stored = list_tasks(&store, false).unwrap();
        assert!(stored.contains(&first));
    }

    #[test]
    fn test_create_task_validation() {
        let store = Store::in_memory().unwrap();

        let empty_name = create_task(
            &store,
            &CreateTaskRequest {
                name: "  ".to_string(),
                reward: 5,
            },
        );
        assert!(matches!(empty_name, Err(TaskError::Validation(_))));

        let zero_reward = create_task(
            &store,
            &CreateTaskRequest {
                name: "Nap".to_string(),
                reward: 0,
            },
        );
        assert!(matches!(zero_reward, Err(TaskError::Validation(_))));
        assert_eq!(list_tasks(&store, false).unwrap().len(), 3);
    }

    #[test]
    fn test_update_task_merges_provided_fields() {
        let store = Store::in_memory().unwrap();

        let task = update_task(
            &store,
            2,
            &UpdateTaskRequest {
                reward: Some(15),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(task.reward, 15);
        assert_eq!(task.name, "Поиграть с персонажем");
        assert!(task.active);
    }

    #[test]
    fn test_update_unknown_task() {
        let store = Store::in_memory().unwrap();

        let result = update_task(&store, 999, &UpdateTaskRequest::default());
        assert!(matches!(result, Err(TaskError::NotFound)));
    }
}
