//! Plumbing shared by the board feeds.
//!
//! Both feeds stream a response body through a tokenizer into a mapper,
//! reporting progress to the caller as they go, and both fail with a
//! [`BoardError`] that maps onto the stable result codes.

use std::io;
use std::ops::ControlFlow;

use crate::domain::UpdateCode;
use crate::http::{BodySink, TransportError};
use crate::json::{JsonListener, JsonStream};
use crate::xml::{XmlListener, XmlStream};

/// Progress of a board refresh, reported through the caller's callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The request has been written.
    RequestSent,
    /// The body is being read; reported on every tick, even while stalled.
    Receiving { entries: usize },
    /// The board has been published (or found unchanged).
    Complete { entries: usize },
}

/// Errors from a board refresh.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The document parsed but lacked something essential
    #[error("data incomplete: {0}")]
    Incomplete(&'static str),

    /// The document could not be used
    #[error("data error: {0}")]
    Data(String),
}

impl BoardError {
    /// The stable result code for this error.
    pub fn code(&self) -> UpdateCode {
        match self {
            BoardError::Transport(e) => e.code(),
            BoardError::Incomplete(_) => UpdateCode::Incomplete,
            BoardError::Data(_) => UpdateCode::DataError,
        }
    }
}

/// Collapse a refresh result into its result code.
pub fn outcome(result: &Result<UpdateCode, BoardError>) -> UpdateCode {
    match result {
        Ok(code) => *code,
        Err(e) => e.code(),
    }
}

/// A mapper that can say how much it has mapped so far.
pub trait EntryCount {
    fn entries(&self) -> usize;
}

/// A parser fed from a response body.
pub trait DocumentSink {
    /// Consume body bytes. Break when the document needs nothing more.
    fn consume(&mut self, bytes: &[u8]) -> ControlFlow<()>;

    /// Entries mapped so far, for progress reports.
    fn entries(&self) -> usize;
}

impl<L: XmlListener + EntryCount> DocumentSink for XmlStream<L> {
    fn consume(&mut self, bytes: &[u8]) -> ControlFlow<()> {
        self.feed_slice(bytes);
        ControlFlow::Continue(())
    }

    fn entries(&self) -> usize {
        self.listener().entries()
    }
}

impl<L: JsonListener + EntryCount> DocumentSink for JsonStream<L> {
    fn consume(&mut self, bytes: &[u8]) -> ControlFlow<()> {
        self.feed_slice(bytes);
        if self.is_done() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    fn entries(&self) -> usize {
        self.listener().entries()
    }
}

/// Adapts a [`DocumentSink`] to a [`BodySink`], reporting progress on ticks.
pub struct ProgressSink<'a, D, P> {
    document: &'a mut D,
    progress: &'a mut P,
}

impl<'a, D: DocumentSink, P: FnMut(Progress)> ProgressSink<'a, D, P> {
    pub fn new(document: &'a mut D, progress: &'a mut P) -> Self {
        Self { document, progress }
    }
}

impl<D: DocumentSink, P: FnMut(Progress)> BodySink for ProgressSink<'_, D, P> {
    async fn accept(&mut self, chunk: &[u8]) -> io::Result<ControlFlow<()>> {
        Ok(self.document.consume(chunk))
    }

    fn on_tick(&mut self) {
        (self.progress)(Progress::Receiving {
            entries: self.document.entries(),
        });
    }
}
