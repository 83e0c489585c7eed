//! Export streamer implementation.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use futures::stream::BoxStream;
use pin_project::{pin_project, pinned_drop};
use quire_shared::types::FormId;
use tracing::{debug, info};

use super::error::ExportError;
use super::types::{ExportQuery, ExportRow};

/// Rows as produced by a repository cursor.
pub type RowStream<'a> = BoxStream<'a, Result<ExportRow, ExportError>>;

/// Repository trait for export queries.
///
/// This trait is implemented by the db crate to provide actual database operations.
pub trait ExportRepository: Send + Sync {
    /// Open a cursor over every row `query` admits.
    ///
    /// Rows must be pulled lazily; the stream borrows the repository's
    /// connection for as long as it lives.
    fn stream(
        &self,
        query: ExportQuery,
    ) -> impl std::future::Future<Output = Result<RowStream<'_>, ExportError>> + Send;
}

/// Export service.
pub struct ExportStreamer<R: ExportRepository> {
    repo: Arc<R>,
}

impl<R: ExportRepository> ExportStreamer<R> {
    /// Create a new export streamer.
    #[must_use]
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Stream the attachments `query` selects.
    pub async fn stream(&self, query: ExportQuery) -> Result<ExportStream<'_>, ExportError> {
        if let Some(filter) = &query.filter {
            filter.validate()?;
        }
        let form_id = query.form_id;
        info!(form_id = %form_id, draft = query.draft, "export started");
        let rows = self.repo.stream(query).await?;
        Ok(ExportStream::new(form_id, rows))
    }
}

/// A live export. Dropping it closes the underlying cursor.
#[pin_project(PinnedDrop)]
pub struct ExportStream<'a> {
    #[pin]
    rows: RowStream<'a>,
    form_id: FormId,
    emitted: u64,
    done: bool,
}

impl<'a> ExportStream<'a> {
    fn new(form_id: FormId, rows: RowStream<'a>) -> Self {
        Self {
            rows,
            form_id,
            emitted: 0,
            done: false,
        }
    }

    /// Rows yielded so far.
    #[must_use]
    pub const fn emitted(&self) -> u64 {
        self.emitted
    }
}

impl Stream for ExportStream<'_> {
    type Item = Result<ExportRow, ExportError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        if *this.done {
            return Poll::Ready(None);
        }

        match this.rows.poll_next(cx) {
            Poll::Ready(Some(Ok(row))) => {
                *this.emitted += 1;
                Poll::Ready(Some(Ok(row)))
            }
            Poll::Ready(Some(Err(e))) => {
                // a failed cursor is not resumed
                *this.done = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                *this.done = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[pinned_drop]
impl<'a> PinnedDrop for ExportStream<'a> {
    fn drop(self: Pin<&mut Self>) {
        let this = self.project();
        if *this.done {
            info!(form_id = %this.form_id, rows = *this.emitted, "export finished");
        } else {
            debug!(form_id = %this.form_id, rows = *this.emitted, "export cancelled");
        }
    }
}
