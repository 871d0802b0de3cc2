//! Queue of remote stem-separation jobs awaiting completion.
//!
//! The queue never talks to the network itself: a [`JobStatusProvider`]
//! answers status requests and a [`Notifier`] announces finished songs.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{JobError, LibraryError};
use crate::library::{read_json_list, write_json_list};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Processing,
    Ready,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingItem {
    pub session_id: String,
    pub source_url: String,
    /// Unix time in milliseconds
    pub created_at: u64,
    pub status: JobStatus,
    pub title: Option<String>,
}

/// Answer from the separation backend for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStatus {
    Processing,
    Ready { title: String },
    Failed,
}

pub trait JobStatusProvider {
    fn status(&self, session_id: &str) -> Result<RemoteStatus, JobError>;
}

pub trait Notifier {
    fn notify(&self, title: &str, body: &str);
}

/// Notifications written to the log
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, body: &str) {
        log::info!("{}: {}", title, body);
    }
}

pub trait QueueStore {
    fn load(&self) -> Result<Vec<ProcessingItem>, LibraryError>;
    fn save(&self, items: &[ProcessingItem]) -> Result<(), LibraryError>;
}

pub struct JsonQueueStore {
    path: PathBuf,
}

impl JsonQueueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl QueueStore for JsonQueueStore {
    fn load(&self) -> Result<Vec<ProcessingItem>, LibraryError> {
        read_json_list(&self.path)
    }

    fn save(&self, items: &[ProcessingItem]) -> Result<(), LibraryError> {
        write_json_list(&self.path, items)
    }
}

#[derive(Default)]
pub struct MemoryQueueStore {
    items: Mutex<Vec<ProcessingItem>>,
}

impl QueueStore for MemoryQueueStore {
    fn load(&self) -> Result<Vec<ProcessingItem>, LibraryError> {
        Ok(self.items.lock().clone())
    }

    fn save(&self, items: &[ProcessingItem]) -> Result<(), LibraryError> {
        *self.items.lock() = items.to_vec();
        Ok(())
    }
}

/// A status change observed by [`ProcessingQueue::poll`]
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub session_id: String,
    pub from: JobStatus,
    pub to: JobStatus,
    pub title: Option<String>,
}

pub struct ProcessingQueue<S: QueueStore, N: Notifier> {
    store: S,
    notifier: N,
    items: Vec<ProcessingItem>,
}

impl<S: QueueStore, N: Notifier> ProcessingQueue<S, N> {
    pub fn open(store: S, notifier: N) -> Result<Self, JobError> {
        let items = store.load()?;
        Ok(Self {
            store,
            notifier,
            items,
        })
    }

    pub fn items(&self) -> &[ProcessingItem] {
        &self.items
    }

    pub fn get(&self, session_id: &str) -> Option<&ProcessingItem> {
        self.items.iter().find(|i| i.session_id == session_id)
    }

    /// True while any job is still processing
    pub fn has_pending(&self) -> bool {
        self.items.iter().any(|i| i.status == JobStatus::Processing)
    }

    /// Add a new job in the Processing state, newest first.
    /// Re-enqueuing a known session id restarts it.
    pub fn enqueue(&mut self, session_id: &str, source_url: &str) -> Result<(), JobError> {
        self.items.retain(|i| i.session_id != session_id);
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        self.items.insert(
            0,
            ProcessingItem {
                session_id: session_id.to_string(),
                source_url: source_url.to_string(),
                created_at,
                status: JobStatus::Processing,
                title: None,
            },
        );
        self.persist()?;
        log::info!("Queued session {} ({})", session_id, source_url);
        Ok(())
    }

    /// Returns false if the session is unknown. Moving a job to Ready
    /// announces it, same as a poll would.
    pub fn update_status(
        &mut self,
        session_id: &str,
        status: JobStatus,
        title: Option<String>,
    ) -> Result<bool, JobError> {
        let Some(item) = self.items.iter_mut().find(|i| i.session_id == session_id) else {
            return Ok(false);
        };
        let previous = item.status;
        item.status = status;
        if title.is_some() {
            item.title = title;
        }
        if previous != JobStatus::Ready && status == JobStatus::Ready {
            let name = item.title.as_deref().unwrap_or(&item.session_id);
            announce_ready(&self.notifier, name);
        }
        self.persist()?;
        Ok(true)
    }

    pub fn remove(&mut self, session_id: &str) -> Result<Option<ProcessingItem>, JobError> {
        let Some(index) = self.items.iter().position(|i| i.session_id == session_id) else {
            return Ok(None);
        };
        let removed = self.items.remove(index);
        self.persist()?;
        Ok(Some(removed))
    }

    /// Ask the provider about every Processing job and record what changed.
    ///
    /// Provider errors leave the job Processing; it is asked again next poll.
    pub fn poll<P: JobStatusProvider + ?Sized>(
        &mut self,
        provider: &P,
    ) -> Result<Vec<Transition>, JobError> {
        let mut transitions = Vec::new();

        for item in self
            .items
            .iter_mut()
            .filter(|i| i.status == JobStatus::Processing)
        {
            let remote = match provider.status(&item.session_id) {
                Ok(remote) => remote,
                Err(e) => {
                    log::warn!("{}", e);
                    continue;
                }
            };

            match remote {
                RemoteStatus::Processing => {}
                RemoteStatus::Ready { title } => {
                    item.status = JobStatus::Ready;
                    item.title = Some(title.clone());
                    announce_ready(&self.notifier, &title);
                    transitions.push(Transition {
                        session_id: item.session_id.clone(),
                        from: JobStatus::Processing,
                        to: JobStatus::Ready,
                        title: Some(title),
                    });
                }
                RemoteStatus::Failed => {
                    item.status = JobStatus::Failed;
                    log::warn!("Session {} failed", item.session_id);
                    transitions.push(Transition {
                        session_id: item.session_id.clone(),
                        from: JobStatus::Processing,
                        to: JobStatus::Failed,
                        title: item.title.clone(),
                    });
                }
            }
        }

        if !transitions.is_empty() {
            self.persist()?;
        }
        Ok(transitions)
    }

    fn persist(&self) -> Result<(), JobError> {
        self.store.save(&self.items)?;
        Ok(())
    }
}

fn announce_ready<N: Notifier>(notifier: &N, title: &str) {
    notifier.notify("Song Ready", &format!("'{}' is ready to play", title));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    struct FakeProvider {
        answers: HashMap<String, Result<RemoteStatus, String>>,
    }

    impl FakeProvider {
        fn new(answers: &[(&str, Result<RemoteStatus, String>)]) -> Self {
            Self {
                answers: answers
                    .iter()
                    .map(|(id, a)| (id.to_string(), a.clone()))
                    .collect(),
            }
        }
    }

    impl JobStatusProvider for FakeProvider {
        fn status(&self, session_id: &str) -> Result<RemoteStatus, JobError> {
            match self.answers.get(session_id) {
                Some(Ok(status)) => Ok(status.clone()),
                Some(Err(reason)) => Err(JobError::Provider {
                    session_id: session_id.to_string(),
                    reason: reason.clone(),
                }),
                None => Ok(RemoteStatus::Processing),
            }
        }
    }

    #[derive(Default, Clone)]
    struct RecordingNotifier {
        sent: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, title: &str, body: &str) {
            self.sent.lock().push((title.to_string(), body.to_string()));
        }
    }

    fn queue() -> (ProcessingQueue<MemoryQueueStore, RecordingNotifier>, RecordingNotifier) {
        let notifier = RecordingNotifier::default();
        let queue = ProcessingQueue::open(MemoryQueueStore::default(), notifier.clone()).unwrap();
        (queue, notifier)
    }

    #[test]
    fn poll_records_transitions_and_notifies() {
        let (mut queue, notifier) = queue();
        queue.enqueue("a", "https://example.com/a").unwrap();
        queue.enqueue("b", "https://example.com/b").unwrap();
        queue.enqueue("c", "https://example.com/c").unwrap();
        assert!(queue.has_pending());

        let provider = FakeProvider::new(&[
            ("a", Ok(RemoteStatus::Ready { title: "Song A".into() })),
            ("b", Ok(RemoteStatus::Failed)),
        ]);
        let transitions = queue.poll(&provider).unwrap();
        assert_eq!(transitions.len(), 2);
        assert_eq!(queue.get("a").unwrap().status, JobStatus::Ready);
        assert_eq!(queue.get("a").unwrap().title.as_deref(), Some("Song A"));
        assert_eq!(queue.get("b").unwrap().status, JobStatus::Failed);
        assert_eq!(queue.get("c").unwrap().status, JobStatus::Processing);

        let sent = notifier.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "Song Ready");

        // Finished jobs are not asked again
        drop(sent);
        assert!(queue.poll(&provider).unwrap().is_empty());
    }

    #[test]
    fn provider_error_keeps_job_processing() {
        let (mut queue, notifier) = queue();
        queue.enqueue("a", "url").unwrap();
        let provider = FakeProvider::new(&[("a", Err("timeout".into()))]);
        assert!(queue.poll(&provider).unwrap().is_empty());
        assert_eq!(queue.get("a").unwrap().status, JobStatus::Processing);
        assert!(notifier.sent.lock().is_empty());
    }

    #[test]
    fn enqueue_is_newest_first_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.json");
        {
            let mut queue = ProcessingQueue::open(JsonQueueStore::new(&path), LogNotifier).unwrap();
            queue.enqueue("old", "u1").unwrap();
            queue.enqueue("new", "u2").unwrap();
            queue
                .update_status("old", JobStatus::Ready, Some("Old".into()))
                .unwrap();
        }
        let queue = ProcessingQueue::open(JsonQueueStore::new(&path), LogNotifier).unwrap();
        let ids: Vec<_> = queue.items().iter().map(|i| i.session_id.as_str()).collect();
        assert_eq!(ids, ["new", "old"]);
        assert_eq!(queue.get("old").unwrap().title.as_deref(), Some("Old"));
    }

    #[test]
    fn manual_ready_notifies_once() {
        let (mut queue, notifier) = queue();
        queue.enqueue("a", "url-a").unwrap();
        queue.enqueue("b", "url-b").unwrap();

        queue
            .update_status("a", JobStatus::Ready, Some("Song A".into()))
            .unwrap();
        queue.update_status("a", JobStatus::Ready, None).unwrap();
        queue.update_status("b", JobStatus::Failed, None).unwrap();
        queue.update_status("b", JobStatus::Ready, None).unwrap();

        let sent = notifier.sent.lock();
        assert_eq!(
            *sent,
            vec![
                ("Song Ready".to_string(), "'Song A' is ready to play".to_string()),
                ("Song Ready".to_string(), "'b' is ready to play".to_string()),
            ]
        );
        assert!(!queue.has_pending());
    }

    #[test]
    fn update_and_remove_unknown_sessions() {
        let (mut queue, _) = queue();
        assert!(!queue.update_status("x", JobStatus::Ready, None).unwrap());
        assert!(queue.remove("x").unwrap().is_none());
        queue.enqueue("x", "u").unwrap();
        assert!(queue.remove("x").unwrap().is_some());
        assert!(!queue.has_pending());
    }
}
