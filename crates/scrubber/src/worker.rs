use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError, TrySendError};
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, ScrubError};
use crate::media::{FrameExtractor, FrameImage};
use crate::sampler::{SamplePlan, ThumbnailSampler, ThumbnailStrip};
use crate::time::FrameTime;

const REQUEST_CHANNEL_CAPACITY: usize = 4;
const EVENT_CHANNEL_CAPACITY: usize = 8;

/// Identifies one frame request within a load session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(pub u64);

/// Why a frame was requested.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RequestKind {
    /// Thumb refresh for the selection at `percent`.
    Refresh { percent: f64 },
    /// One-off still requested by the caller.
    Snapshot,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRequest {
    pub token: RequestToken,
    pub time: FrameTime,
    pub kind: RequestKind,
}

#[derive(Debug)]
pub struct FrameCompletion {
    pub token: RequestToken,
    pub time: FrameTime,
    pub kind: RequestKind,
    pub result: Result<FrameImage>,
}

/// Messages posted by the worker thread back to the owning thread.
#[derive(Debug)]
pub enum WorkerEvent {
    StripSampled(ThumbnailStrip),
    FrameExtracted(FrameCompletion),
}

/// Background thread owning the bound extractor of one load session.
///
/// The thread samples the strip first, then serves frame requests one at a
/// time. A refresh with a newer refresh queued behind it is skipped without a
/// completion; snapshots are always served. Dropping the worker closes its request channel; the thread exits as
/// soon as the extraction it is running returns, and that result is discarded.
#[derive(Debug)]
pub struct FrameWorker {
    request_tx: SyncSender<FrameRequest>,
    event_rx: Receiver<WorkerEvent>,
}

impl FrameWorker {
    pub fn spawn<E>(mut extractor: E, plan: SamplePlan) -> Self
    where
        E: FrameExtractor + 'static,
    {
        let (request_tx, request_rx) = mpsc::sync_channel::<FrameRequest>(REQUEST_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::sync_channel::<WorkerEvent>(EVENT_CHANNEL_CAPACITY);

        thread::spawn(move || {
            let strip = ThumbnailSampler::sample_all(&plan, &mut extractor);
            if event_tx.send(WorkerEvent::StripSampled(strip)).is_err() {
                return;
            }

            let mut backlog = VecDeque::new();
            loop {
                let request = match backlog.pop_front() {
                    Some(request) => request,
                    None => match request_rx.recv() {
                        Ok(request) => request,
                        Err(_) => break,
                    },
                };
                backlog.extend(request_rx.try_iter());
                if is_superseded(&request, &backlog) {
                    debug!(token = request.token.0, "skipping superseded refresh");
                    continue;
                }

                let result = extractor.extract_frame(request.time);
                let completion = FrameCompletion {
                    token: request.token,
                    time: request.time,
                    kind: request.kind,
                    result,
                };
                if event_tx.send(WorkerEvent::FrameExtracted(completion)).is_err() {
                    return;
                }
            }
            debug!("frame worker stopped");
        });

        Self {
            request_tx,
            event_rx,
        }
    }

    /// Queues a request without blocking.
    pub fn request(&self, request: FrameRequest) -> Result<()> {
        self.request_tx.try_send(request).map_err(|error| match error {
            TrySendError::Full(_) => ScrubError::WorkerBusy,
            TrySendError::Disconnected(_) => ScrubError::WorkerDisconnected,
        })
    }

    /// Returns the next posted event, if any.
    pub fn try_next(&self) -> Result<Option<WorkerEvent>> {
        match self.event_rx.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(ScrubError::WorkerDisconnected),
        }
    }

    /// Blocks until the next event is posted or `timeout` elapses.
    pub fn next_timeout(&self, timeout: Duration) -> Result<WorkerEvent> {
        self.event_rx
            .recv_timeout(timeout)
            .map_err(|error| match error {
                RecvTimeoutError::Timeout => ScrubError::WorkerTimeout,
                RecvTimeoutError::Disconnected => ScrubError::WorkerDisconnected,
            })
    }
}

fn is_superseded(request: &FrameRequest, backlog: &VecDeque<FrameRequest>) -> bool {
    matches!(request.kind, RequestKind::Refresh { .. })
        && backlog
            .iter()
            .any(|later| matches!(later.kind, RequestKind::Refresh { .. }))
}
