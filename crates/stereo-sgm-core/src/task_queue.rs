//! Static dependency-graph task scheduler with bounded parallelism.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, RecvTimeoutError};
use log::{debug, warn};

/// Caller-chosen task identifier, referenced by dependency lists.
pub type TaskId = usize;

type Thunk<'scope, E> = Box<dyn FnOnce() -> Result<(), E> + Send + 'scope>;

struct TaskItem<'scope, E> {
    id: TaskId,
    thunk: Option<Thunk<'scope, E>>,
    deps: Vec<TaskId>,
}

/// Cloneable handle requesting cooperative shutdown of a running queue.
///
/// Running tasks complete; no new ones start.
#[derive(Clone, Debug)]
pub struct QueueStop(Arc<AtomicBool>);

impl QueueStop {
    pub fn end(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// Single-use scheduler for a fixed set of interdependent tasks.
///
/// Tasks are added up front with explicit prerequisite ids. `run` consumes
/// the queue, starts ready tasks on scoped worker threads up to the
/// parallelism cap, polls completions with a bounded wait and releases
/// dependents as their prerequisites finish. The first task error is
/// returned once in-flight tasks have drained; the queue never swallows
/// errors.
pub struct StaticTaskQueue<'scope, E> {
    max_parallel: usize,
    tasks: Vec<TaskItem<'scope, E>>,
    stop: Arc<AtomicBool>,
}

impl<'scope, E: Send + 'scope> StaticTaskQueue<'scope, E> {
    pub fn new(max_parallel: usize) -> Self {
        Self {
            max_parallel: max_parallel.max(1),
            tasks: Vec::new(),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Register a task. `deps` lists ids that must finish before it starts.
    pub fn add_task(
        &mut self,
        id: TaskId,
        deps: &[TaskId],
        thunk: impl FnOnce() -> Result<(), E> + Send + 'scope,
    ) {
        debug_assert!(
            self.tasks.iter().all(|t| t.id != id),
            "duplicate task id {id}"
        );
        self.tasks.push(TaskItem {
            id,
            thunk: Some(Box::new(thunk)),
            deps: deps.to_vec(),
        });
    }

    pub fn stop_handle(&self) -> QueueStop {
        QueueStop(Arc::clone(&self.stop))
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Run the graph to completion, cancellation or first error.
    pub fn run(mut self) -> Result<(), E> {
        let total = self.tasks.len();
        if total == 0 {
            return Ok(());
        }

        let mut index_of = HashMap::with_capacity(total);
        for (idx, task) in self.tasks.iter().enumerate() {
            index_of.insert(task.id, idx);
        }

        let mut pending = vec![0usize; total];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); total];
        for (idx, task) in self.tasks.iter().enumerate() {
            for dep in &task.deps {
                let Some(&dep_idx) = index_of.get(dep) else {
                    debug_assert!(false, "task {} depends on unknown id {dep}", task.id);
                    continue;
                };
                pending[idx] += 1;
                dependents[dep_idx].push(idx);
            }
        }

        let mut ready: VecDeque<usize> = (0..total).filter(|&i| pending[i] == 0).collect();
        debug!("running {total} tasks, {} in parallel at most", self.max_parallel);
        let (done_tx, done_rx) = unbounded::<(usize, Result<(), E>)>();
        let mut first_error: Option<E> = None;
        let mut in_flight = 0usize;
        let mut finished = 0usize;

        thread::scope(|scope| {
            loop {
                let halted = self.stop.load(Ordering::Relaxed) || first_error.is_some();
                if !halted {
                    while in_flight < self.max_parallel {
                        let Some(next) = ready.pop_front() else { break };
                        let thunk = self.tasks[next].thunk.take().expect("task scheduled once");
                        let tx = done_tx.clone();
                        scope.spawn(move || {
                            let result = thunk();
                            let _ = tx.send((next, result));
                        });
                        in_flight += 1;
                    }
                }

                if in_flight == 0 {
                    debug_assert!(
                        halted || finished == total,
                        "task graph stalled with {} of {total} tasks finished (dependency cycle?)",
                        finished
                    );
                    break;
                }

                match done_rx.recv_timeout(Duration::from_millis(1)) {
                    Ok((idx, result)) => {
                        in_flight -= 1;
                        finished += 1;
                        match result {
                            Ok(()) => {
                                for &dep in &dependents[idx] {
                                    pending[dep] -= 1;
                                    if pending[dep] == 0 {
                                        ready.push_back(dep);
                                    }
                                }
                            }
                            Err(err) => {
                                warn!("task {} failed, draining queue", self.tasks[idx].id);
                                if first_error.is_none() {
                                    first_error = Some(err);
                                }
                            }
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
