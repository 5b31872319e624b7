use std::sync::{
    mpsc,
    Arc,
};

use tokio::runtime::Runtime;
use tracing::warn;

use super::{
    TaskResult,
    Ticket,
};
use crate::{
    api::{
        BatchLoader,
        ItemSource,
        OutcomeSubmitter,
    },
    core::{
        models::{
            ItemId,
            Outcome,
            SessionId,
        },
        PracticeError,
    },
    practice::{
        PracticeTasks,
        ResultSubmitter,
    },
};

/// Invoked after a result is queued so the UI can repaint without waiting for input.
pub type Waker = Arc<dyn Fn() + Send + Sync>;

/// Runs network work on a private runtime and hands results back through a channel
/// that the UI thread drains every frame.
pub struct TaskManager {
    runtime: Arc<Runtime>,
    receiver: mpsc::Receiver<TaskResult>,
    sender: mpsc::Sender<TaskResult>,
    loader: Arc<BatchLoader>,
    submitter: ResultSubmitter,
    waker: Option<Waker>,
}

impl TaskManager {
    pub fn new(
        source: Arc<dyn ItemSource>,
        submitter: Arc<dyn OutcomeSubmitter>,
    ) -> Result<Self, PracticeError> {
        let runtime = Arc::new(Runtime::new()?);
        let (sender, receiver) = mpsc::channel();

        Ok(Self {
            runtime,
            receiver,
            sender,
            loader: Arc::new(BatchLoader::new(source)),
            submitter: ResultSubmitter::new(submitter),
            waker: None,
        })
    }

    pub fn with_waker(mut self, waker: Waker) -> Self {
        self.waker = Some(waker);
        self
    }

    pub fn poll_results(&mut self) -> Vec<TaskResult> {
        let mut results = Vec::new();

        while let Ok(result) = self.receiver.try_recv() {
            results.push(result);
        }

        results
    }

    fn task_context(&self) -> (Reporter, Arc<Runtime>) {
        (Reporter { sender: self.sender.clone(), waker: self.waker.clone() }, self.runtime.clone())
    }
}

struct Reporter {
    sender: mpsc::Sender<TaskResult>,
    waker: Option<Waker>,
}

impl Reporter {
    fn send(&self, result: TaskResult) {
        let task_type = result.task_type();
        if self.sender.send(result).is_err() {
            warn!(task_type, "result dropped, receiver is gone");
            return;
        }
        if let Some(waker) = &self.waker {
            waker();
        }
    }
}

impl PracticeTasks for TaskManager {
    fn load_session(&self, ticket: Ticket, session_id: SessionId, count: usize) {
        let (reporter, runtime) = self.task_context();
        let loader = Arc::clone(&self.loader);

        runtime.spawn(async move {
            let result = futures::try_join!(
                loader.source().fetch_session(&session_id),
                loader.load(ticket, &session_id, count),
            );
            reporter.send(TaskResult::SessionLoaded { ticket, requested: count, result });
        });
    }

    fn fetch_batch(&self, ticket: Ticket, session_id: SessionId, count: usize) {
        let (reporter, runtime) = self.task_context();
        let loader = Arc::clone(&self.loader);

        runtime.spawn(async move {
            let result = loader.load(ticket, &session_id, count).await;
            reporter.send(TaskResult::BatchFetched { ticket, requested: count, result });
        });
    }

    fn submit_outcome(
        &self,
        ticket: Ticket,
        session_id: SessionId,
        item_id: ItemId,
        outcome: Outcome,
    ) {
        let (reporter, runtime) = self.task_context();
        let submitter = self.submitter.clone();

        runtime.spawn(async move {
            let result = submitter.submit(&session_id, &item_id, outcome).await;
            reporter.send(TaskResult::OutcomeSubmitted { ticket, result });
        });
    }
}
