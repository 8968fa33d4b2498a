// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Off-thread parsing
//!
//! [`ParseWorker::spawn`] runs [`parse`] on tokio's blocking pool and sends
//! progress reports, then the finished store (or the error), over an
//! unbounded channel. Must be called from within a tokio runtime.

use std::sync::Arc;

use futures_util::stream::{self, Stream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::parse::{parse, Progress};
use crate::store::DataStore;

/// Message from a running parse
#[derive(Debug)]
pub enum WorkerEvent {
    Progress(Progress),
    /// Always the last event
    Done(Result<DataStore>),
}

/// Handle to a parse running on the blocking pool
#[derive(Debug)]
pub struct ParseWorker {
    events: mpsc::UnboundedReceiver<WorkerEvent>,
    task: JoinHandle<()>,
}

impl ParseWorker {
    /// Start parsing `buffer` in the background
    pub fn spawn(buffer: impl Into<Arc<[u8]>>, config: StoreConfig) -> Self {
        let buffer: Arc<[u8]> = buffer.into();
        let (tx, events) = mpsc::unbounded_channel();

        let task = tokio::task::spawn_blocking(move || {
            let progress_tx = tx.clone();
            let result = parse(buffer, &config, |progress| {
                // The receiver may be gone; the parse still runs to completion
                let _ = progress_tx.send(WorkerEvent::Progress(progress));
            });
            if let Err(err) = &result {
                tracing::warn!(error = %err, "Background parse failed");
            }
            let _ = tx.send(WorkerEvent::Done(result));
        });

        Self { events, task }
    }

    /// Next event, `None` once the worker is finished and drained
    pub async fn next_event(&mut self) -> Option<WorkerEvent> {
        self.events.recv().await
    }

    /// Events as a stream
    pub fn events(self) -> impl Stream<Item = WorkerEvent> {
        stream::unfold(self.events, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        })
    }

    /// Wait for the store, passing progress reports to `on_progress`
    pub async fn finish<F>(self, mut on_progress: F) -> Result<DataStore>
    where
        F: FnMut(Progress),
    {
        let Self { mut events, task } = self;
        while let Some(event) = events.recv().await {
            match event {
                WorkerEvent::Progress(progress) => on_progress(progress),
                WorkerEvent::Done(result) => return result,
            }
        }
        // Channel closed without a result: surface a panic from the task if any
        task.await?;
        Err(Error::Worker("parse task ended without a result".into()))
    }
}
