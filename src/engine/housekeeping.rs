use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use tracing::info;

use crate::limits::MAX_TASK_MINUTES;
use crate::model::*;
use crate::repo::TaskRepo;

use super::conflict::validate_text;
use super::{Authority, Engine, EngineError, Entity};

/// Housekeeping board over an [`Engine`].
pub struct Tasks<'a> {
    engine: &'a Engine,
}

impl<'a> Tasks<'a> {
    pub(super) fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    pub async fn get(&self, id: TaskId) -> Result<HousekeepingTask, EngineError> {
        let shared = self
            .engine
            .get_task(&id)
            .ok_or_else(|| EngineError::not_found(Entity::Task, id))?;
        let task = shared.read().await.clone();
        Ok(task)
    }

    /// Tasks grouped by column, each column in id order.
    pub async fn board(&self) -> TaskBoard {
        let mut board = TaskBoard::default();
        for task in self.list().await {
            match task.status {
                TaskStatus::ToClean => board.to_clean.push(task),
                TaskStatus::InProgress => board.in_progress.push(task),
                TaskStatus::Completed => board.completed.push(task),
            }
        }
        board
    }

    pub async fn summary(&self) -> BoardSummary {
        let tasks = self.list().await;
        if tasks.is_empty() {
            return BoardSummary::default();
        }
        let count = |status| tasks.iter().filter(|t| t.status == status).count();
        let minutes: u64 = tasks.iter().map(|t| u64::from(t.estimated_minutes)).sum();
        BoardSummary {
            pending: tasks.len() - count(TaskStatus::Completed),
            in_progress: count(TaskStatus::InProgress),
            completed: count(TaskStatus::Completed),
            average_minutes: (minutes as f64 / tasks.len() as f64).round() as u32,
        }
    }

    async fn lock_task(&self, id: TaskId) -> Result<OwnedRwLockWriteGuard<HousekeepingTask>, EngineError> {
        let shared = self
            .engine
            .get_task(&id)
            .ok_or_else(|| EngineError::not_found(Entity::Task, id))?;
        let guard = shared.write_owned().await;
        if !self.engine.tasks.contains_key(&id) {
            return Err(EngineError::not_found(Entity::Task, id));
        }
        Ok(guard)
    }
}

#[async_trait]
impl TaskRepo for Tasks<'_> {
    async fn list(&self) -> Vec<HousekeepingTask> {
        let shared: Vec<_> = self.engine.tasks.iter().map(|e| e.value().clone()).collect();
        let mut tasks = Vec::with_capacity(shared.len());
        for t in shared {
            tasks.push(t.read().await.clone());
        }
        tasks.sort_by_key(|t| t.id);
        tasks
    }

    async fn create(&self, draft: TaskDraft) -> Result<HousekeepingTask, EngineError> {
        validate_text("room number", &draft.room_number)?;
        validate_text("assignee", &draft.assigned_to)?;
        if draft.estimated_minutes == 0 {
            return Err(EngineError::invalid("estimated minutes must be positive"));
        }
        if draft.estimated_minutes > MAX_TASK_MINUTES {
            return Err(EngineError::LimitExceeded("task longer than a day"));
        }
        if self.engine.room_id_by_number(&draft.room_number).is_none() {
            return Err(EngineError::not_found(Entity::Room, &draft.room_number));
        }
        self.engine.suspend().await;

        let task = HousekeepingTask {
            id: self.engine.next_task_id(),
            room_number: draft.room_number,
            task_type: draft.task_type,
            priority: draft.priority,
            assigned_to: draft.assigned_to,
            status: TaskStatus::ToClean,
            estimated_minutes: draft.estimated_minutes,
            due_at: self.engine.clock.now() + Duration::minutes(i64::from(draft.estimated_minutes)),
        };
        self.engine
            .tasks
            .insert(task.id, Arc::new(RwLock::new(task.clone())));
        info!(task_id = task.id, room_number = %task.room_number, task_type = %task.task_type, "task created");
        Ok(task)
    }

    async fn delete(&self, id: TaskId) -> Result<HousekeepingTask, EngineError> {
        let task = self.lock_task(id).await?;
        self.engine.suspend().await;
        self.engine.tasks.remove(&id);
        info!(task_id = id, "task deleted");
        Ok(task.clone())
    }

    /// Completing a cleaning task vacates its room and emits
    /// `housekeeping.task-completed`. Nothing is undone when a task leaves
    /// the completed column.
    async fn move_to(&self, id: TaskId, column: TaskStatus) -> Result<HousekeepingTask, EngineError> {
        let mut task = self.lock_task(id).await?;
        if task.status == column {
            return Ok(task.clone());
        }

        let completes_cleaning = column == TaskStatus::Completed && task.task_type == TaskType::Cleaning;
        let mut change = None;
        if completes_cleaning {
            let room_id = self
                .engine
                .room_id_by_number(&task.room_number)
                .ok_or_else(|| EngineError::not_found(Entity::Room, &task.room_number))?;
            let mut room = self.engine.lock_room(room_id).await?;
            self.engine.suspend().await;
            change = self
                .engine
                .transition_room(&mut room, RoomStatus::Vacant, None, Authority::Desk)?;
        } else {
            self.engine.suspend().await;
        }

        let from = task.status;
        task.status = column;
        info!(task_id = id, from = %from, to = %column, "task moved");

        self.engine.announce([change]);
        if completes_cleaning {
            self.engine.publish(HotelEvent::TaskCompleted {
                room_number: task.room_number.clone(),
                task_type: task.task_type,
            });
        }
        Ok(task.clone())
    }
}
