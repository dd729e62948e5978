//! Integration tests for the reconciled task service.
//!
//! A mock remote source stands in for the demo API so every network outcome
//! can be scripted.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use doeet::error::TaskError;
use doeet::store::LocalStore;
use doeet::tasks::{RemoteTaskSource, TaskService};
use doeet::types::{Priority, Task, TaskId};

fn remote_task(id: u32, todo: &str) -> Task {
    Task {
        id: TaskId::Remote(id),
        todo: todo.into(),
        completed: false,
        priority: None,
        created_at: None,
    }
}

#[derive(Default)]
struct MockSource {
    page: Vec<Task>,
    fail_fetch: bool,
    fail_deletes: bool,
    deletes: Mutex<Vec<u32>>,
    completions: Mutex<Vec<u32>>,
}

#[async_trait]
impl RemoteTaskSource for MockSource {
    async fn fetch_page(&self) -> Result<Vec<Task>, TaskError> {
        if self.fail_fetch {
            return Err(TaskError::Network("connection refused".into()));
        }
        Ok(self.page.clone())
    }

    async fn mark_completed(&self, id: u32, _completed: bool) -> Result<(), TaskError> {
        self.completions.lock().unwrap().push(id);
        Ok(())
    }

    async fn delete(&self, id: u32) -> Result<(), TaskError> {
        self.deletes.lock().unwrap().push(id);
        if self.fail_deletes {
            return Err(TaskError::Network("delete rejected".into()));
        }
        Ok(())
    }
}

fn service_with(source: MockSource) -> (TaskService, Arc<LocalStore>, Arc<MockSource>) {
    let source = Arc::new(source);
    let store = Arc::new(LocalStore::in_memory());
    let service = TaskService::new(source.clone(), store.clone());
    (service, store, source)
}

mod reconciliation {
    use super::*;

    #[tokio::test]
    async fn suppressed_remote_ids_never_reach_the_view() {
        let (service, store, _) = service_with(MockSource {
            page: vec![remote_task(1, "a"), remote_task(2, "b"), remote_task(3, "c")],
            ..Default::default()
        });
        store.suppress_remote_ids(&[2]).unwrap();

        let view = service.tasks().await.unwrap();
        assert_eq!(view.len(), 2);
        assert!(view.iter().all(|t| t.id != TaskId::Remote(2)));
    }

    #[tokio::test]
    async fn empty_everything_is_an_empty_view_not_an_error() {
        let (service, _, _) = service_with(MockSource::default());
        assert!(service.tasks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fetch_failure_surfaces_as_network_error() {
        let (service, _, _) = service_with(MockSource {
            fail_fetch: true,
            ..Default::default()
        });
        assert!(matches!(
            service.tasks().await,
            Err(TaskError::Network(_))
        ));
    }

    #[tokio::test]
    async fn cached_view_survives_until_invalidated() {
        let (service, store, _) = service_with(MockSource {
            page: vec![remote_task(1, "a")],
            ..Default::default()
        });

        assert_eq!(service.tasks().await.unwrap().len(), 1);

        // A store write behind the cache's back is invisible until the
        // view is invalidated.
        store.add_local_task("sneaky", None).unwrap();
        assert_eq!(service.tasks().await.unwrap().len(), 1);

        service.invalidate();
        assert_eq!(service.tasks().await.unwrap().len(), 2);
    }
}

mod deletion {
    use super::*;

    #[tokio::test]
    async fn deleting_a_local_task_touches_nothing_else() {
        let (service, store, _) = service_with(MockSource {
            page: vec![remote_task(1, "remote")],
            ..Default::default()
        });
        let keep = service.add_task("keep me", None).await.unwrap();
        let gone = service.add_task("drop me", None).await.unwrap();

        let report = service.delete_tasks(&[gone.id]).await.unwrap();
        assert!(report.all_ok());
        assert_eq!(report.succeeded, vec![gone.id]);

        let locals = store.local_tasks().unwrap();
        assert_eq!(locals.len(), 1);
        assert_eq!(locals[0].id, keep.id);
        assert!(store.deleted_remote_ids().unwrap().is_empty());

        let view = service.tasks().await.unwrap();
        assert!(view.iter().all(|t| t.id != gone.id));
    }

    #[tokio::test]
    async fn deleting_a_remote_task_suppresses_it() {
        let (service, store, source) = service_with(MockSource {
            page: vec![remote_task(5, "remote")],
            ..Default::default()
        });

        let report = service.delete_tasks(&[TaskId::Remote(5)]).await.unwrap();
        assert!(report.all_ok());
        assert_eq!(*source.deletes.lock().unwrap(), vec![5]);
        assert_eq!(
            store.deleted_remote_ids().unwrap(),
            BTreeSet::from([5])
        );
        assert!(service.tasks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_remote_delete_is_reported_but_still_suppressed() {
        let (service, store, _) = service_with(MockSource {
            page: vec![remote_task(9, "stubborn")],
            fail_deletes: true,
            ..Default::default()
        });

        let report = service.delete_tasks(&[TaskId::Remote(9)]).await.unwrap();
        assert!(!report.all_ok());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, TaskId::Remote(9));

        // Suppression is the source of truth regardless of the call.
        assert!(store.deleted_remote_ids().unwrap().contains(&9));
        assert!(service.tasks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mixed_batch_reports_per_item_outcomes() {
        let (service, _, _) = service_with(MockSource {
            page: vec![remote_task(1, "a"), remote_task(2, "b")],
            fail_deletes: true,
            ..Default::default()
        });
        let local = service.add_task("local", None).await.unwrap();

        let report = service
            .delete_tasks(&[TaskId::Remote(1), TaskId::Remote(2), local.id])
            .await
            .unwrap();
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.succeeded, vec![local.id]);
        assert!(service.tasks().await.unwrap().is_empty());
    }
}

mod completion {
    use super::*;

    #[tokio::test]
    async fn completion_updates_both_origins() {
        let (service, store, source) = service_with(MockSource {
            page: vec![remote_task(3, "remote")],
            ..Default::default()
        });
        let local = service
            .add_task("local", Some(Priority::Medium))
            .await
            .unwrap();

        let report = service
            .complete_tasks(&[TaskId::Remote(3), local.id])
            .await
            .unwrap();
        assert!(report.all_ok());
        assert_eq!(*source.completions.lock().unwrap(), vec![3]);
        assert!(store.local_tasks().unwrap()[0].completed);
    }

    #[tokio::test]
    async fn completing_an_unknown_local_id_is_a_per_item_failure() {
        let (service, _, _) = service_with(MockSource::default());
        let report = service
            .complete_tasks(&[TaskId::Local(404)])
            .await
            .unwrap();
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].1.contains("local-404"));
    }
}
