use std::collections::BTreeSet;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::auth::{Session, SessionError};
use crate::ports::{KeyValueStore, TaskApi, TaskListView};
use crate::types::task::{NewTask, Task};

#[derive(Debug, Default)]
struct BoardState {
    tasks: Vec<Task>,
    highlighted: BTreeSet<String>,
}

/// The signed-in user's task list as the page shows it, including which
/// rows are currently highlighted by a notification click.
pub struct TaskBoard<A, K> {
    api: Arc<A>,
    session: Session<K>,
    state: Arc<Mutex<BoardState>>,
}

impl<A, K> Clone for TaskBoard<A, K> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            session: self.session.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl<A: TaskApi, K: KeyValueStore> TaskBoard<A, K> {
    pub fn new(api: Arc<A>, session: Session<K>) -> Self {
        Self {
            api,
            session,
            state: Arc::new(Mutex::new(BoardState::default())),
        }
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state.lock().expect("board lock").tasks.clone()
    }

    pub fn is_highlighted(&self, task_id: &str) -> bool {
        self.state
            .lock()
            .expect("board lock")
            .highlighted
            .contains(task_id)
    }

    pub async fn refresh(&self) -> Result<(), SessionError> {
        let token = self.session.require_token()?;
        let tasks = self
            .api
            .list_tasks(&token)
            .await
            .map_err(|err| SessionError::Backend(err.to_string()))?;
        debug!(count = tasks.len(), "task list loaded");
        self.state.lock().expect("board lock").tasks = tasks;
        Ok(())
    }

    pub async fn add(&self, task: NewTask) -> Result<Task, SessionError> {
        let token = self.session.require_token()?;
        let created = self
            .api
            .create_task(&task, &token)
            .await
            .map_err(|err| SessionError::Backend(err.to_string()))?;
        self.state
            .lock()
            .expect("board lock")
            .tasks
            .push(created.clone());
        Ok(created)
    }

    /// Flips completion of a known task. `None` if the id is not on the board.
    pub async fn toggle(&self, id: i64) -> Result<Option<Task>, SessionError> {
        let Some(mut task) = self.find(id) else {
            return Ok(None);
        };
        task.completed = !task.completed;

        let token = self.session.require_token()?;
        let updated = self
            .api
            .update_task(&task, &token)
            .await
            .map_err(|err| SessionError::Backend(err.to_string()))?;
        self.replace(updated.clone());
        Ok(Some(updated))
    }

    pub async fn remove(&self, id: i64) -> Result<(), SessionError> {
        let token = self.session.require_token()?;
        self.api
            .delete_task(id, &token)
            .await
            .map_err(|err| SessionError::Backend(err.to_string()))?;
        let mut state = self.state.lock().expect("board lock");
        state.tasks.retain(|task| task.id != id);
        state.highlighted.remove(&id.to_string());
        Ok(())
    }

    fn find(&self, id: i64) -> Option<Task> {
        self.state
            .lock()
            .expect("board lock")
            .tasks
            .iter()
            .find(|task| task.id == id)
            .cloned()
    }

    fn replace(&self, updated: Task) {
        let mut state = self.state.lock().expect("board lock");
        if let Some(existing) = state.tasks.iter_mut().find(|task| task.id == updated.id) {
            *existing = updated;
        }
    }
}

impl<A, K> TaskListView for TaskBoard<A, K>
where
    A: TaskApi + 'static,
    K: KeyValueStore + 'static,
{
    type Error = SessionError;
    type Fut<'a>
        = Pin<Box<dyn Future<Output = Result<(), SessionError>> + Send + 'a>>
    where
        Self: 'a;

    fn reload<'a>(&'a self) -> Self::Fut<'a> {
        Box::pin(self.refresh())
    }

    fn contains(&self, task_id: &str) -> bool {
        self.state
            .lock()
            .expect("board lock")
            .tasks
            .iter()
            .any(|task| task.matches_id(task_id))
    }

    fn set_highlight(&self, task_id: &str, highlighted: bool) {
        let mut state = self.state.lock().expect("board lock");
        if highlighted {
            state.highlighted.insert(task_id.trim().to_string());
        } else {
            state.highlighted.remove(task_id.trim());
        }
    }
}
