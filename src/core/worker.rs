//! One-shot conversion workers.
//!
//! A [`ConversionWorker`] runs a single request on tokio's blocking pool and
//! talks to its host only through messages. Posting a request consumes the
//! worker, so it cannot be reused, and the returned [`WorkerHandle`] releases
//! the worker when it is terminated or dropped on any path.
//!
//! Termination drops the response channel. The worker does not poll for
//! cancellation; its next attempt to post a message fails, it stops there,
//! and whatever it had produced is discarded.

use crate::core::controller::ConversionController;
use crate::domain::ports::RecordDecoder;
use crate::domain::protocol::{ConversionRequest, ConversionResponse};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;

pub struct ConversionWorker<D: RecordDecoder + ?Sized + 'static> {
    decoder: Arc<D>,
}

impl<D: RecordDecoder + ?Sized + 'static> ConversionWorker<D> {
    pub fn new(decoder: Arc<D>) -> Self {
        Self { decoder }
    }

    /// Starts the conversion. Must be called from within a tokio runtime.
    pub fn post(self, request: ConversionRequest) -> WorkerHandle {
        let (sender, receiver) = mpsc::unbounded_channel();
        let decoder = self.decoder;

        let task = tokio::task::spawn_blocking(move || {
            let options = request.options.clone();
            let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
                let mut controller = ConversionController::new(decoder.as_ref(), sender.clone(), options);
                controller.run(request);
            }));

            if let Err(panic) = outcome {
                let message = panic_message(panic.as_ref());
                tracing::error!("Conversion worker panicked: {}", message);
                let _ = sender.send(ConversionResponse::error(format!("internal error: {}", message)));
            }
        });

        WorkerHandle {
            receiver: Some(receiver),
            task: Some(task),
            finished: false,
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// The host's end of a running conversion.
pub struct WorkerHandle {
    receiver: Option<UnboundedReceiver<ConversionResponse>>,
    task: Option<JoinHandle<()>>,
    finished: bool,
}

impl WorkerHandle {
    /// Next message from the worker, or `None` once the terminal response
    /// has been delivered or the handle was terminated. A worker that exits
    /// without a terminal response is reported as an `error`.
    pub async fn recv(&mut self) -> Option<ConversionResponse> {
        if self.finished {
            return None;
        }
        let receiver = self.receiver.as_mut()?;

        match receiver.recv().await {
            Some(response) => {
                if response.is_terminal() {
                    self.finished = true;
                    self.release();
                }
                Some(response)
            }
            None => {
                self.finished = true;
                self.release();
                Some(ConversionResponse::error("worker exited without a result"))
            }
        }
    }

    /// Waits for the terminal response, handing every intermediate message
    /// to `on_message`.
    pub async fn wait<F>(mut self, mut on_message: F) -> ConversionResponse
    where
        F: FnMut(&ConversionResponse),
    {
        while let Some(response) = self.recv().await {
            if response.is_terminal() {
                return response;
            }
            on_message(&response);
        }
        ConversionResponse::error("conversion was terminated")
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Unconditionally stops listening to the worker. Partial output is lost.
    pub fn terminate(mut self) {
        if !self.finished {
            tracing::info!("Terminating running conversion worker");
        }
        self.finished = true;
        self.release();
    }

    fn release(&mut self) {
        self.receiver = None;
        // 阻塞任務無法中止，只能分離；它會在下一次送訊息時自行結束
        self.task = None;
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if !self.finished && self.receiver.is_some() {
            tracing::debug!("Worker handle dropped mid-conversion, releasing worker");
        }
        self.release();
    }
}
