// CLASSIFICATION: COMMUNITY
// Filename: worker.rs v0.6
// Author: Lukas Bower
// Date Modified: 2026-07-03

//! Core-affine serial workers.
//!
//! Each core owns exactly one worker thread consuming a single-slot mailbox.
//! Posting into an occupied slot supersedes the not-yet-started request;
//! a request already executing always runs to completion. The requester
//! blocks on a completion channel until the worker reports the outcome.

use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use log::debug;

use crate::errors::FreqError;
use crate::sched;

/// One queued frequency-set operation.
pub(crate) struct FreqRequest {
    pub target_khz: u32,
    pub index: usize,
    pub reply: mpsc::Sender<Result<(), FreqError>>,
}

struct Slot {
    pending: Option<FreqRequest>,
    shutdown: bool,
}

/// Single-slot mailbox with latest-request-wins semantics.
pub(crate) struct Mailbox {
    slot: Mutex<Slot>,
    ready: Condvar,
}

impl Mailbox {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            slot: Mutex::new(Slot {
                pending: None,
                shutdown: false,
            }),
            ready: Condvar::new(),
        })
    }

    /// Post a request, returning the superseded one if the slot was full.
    pub fn post(&self, req: FreqRequest) -> Option<FreqRequest> {
        let mut slot = self.slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let superseded = slot.pending.replace(req);
        self.ready.notify_one();
        superseded
    }

    fn close(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        slot.shutdown = true;
        self.ready.notify_one();
    }

    /// Block until a request arrives; `None` once the mailbox is closed.
    fn take(&self) -> Option<FreqRequest> {
        let mut slot = self.slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        loop {
            if let Some(req) = slot.pending.take() {
                return Some(req);
            }
            if slot.shutdown {
                return None;
            }
            slot = self
                .ready
                .wait(slot)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
    }
}

/// Dedicated serial worker for one core.
pub(crate) struct CoreWorker {
    core: usize,
    mailbox: Arc<Mailbox>,
    handle: Option<JoinHandle<()>>,
}

impl CoreWorker {
    /// Spawn the worker thread, pinned to `core` where the OS allows it.
    pub fn spawn<F>(core: usize, exec: F) -> Self
    where
        F: Fn(&FreqRequest) -> Result<(), FreqError> + Send + 'static,
    {
        let mailbox = Mailbox::new();
        let inbox = Arc::clone(&mailbox);
        let handle = thread::spawn(move || {
            sched::pin_to_core(core);
            while let Some(req) = inbox.take() {
                let result = exec(&req);
                // requester may have given up; a dead channel is fine
                let _ = req.reply.send(result);
            }
        });
        Self {
            core,
            mailbox,
            handle: Some(handle),
        }
    }

    /// Queue a request, superseding any pending unstarted one.
    pub fn post(&self, req: FreqRequest) {
        if let Some(old) = self.mailbox.post(req) {
            debug!(
                "core{}: superseding queued request for {} kHz",
                self.core, old.target_khz
            );
        }
    }
}

impl Drop for CoreWorker {
    fn drop(&mut self) {
        self.mailbox.close();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
