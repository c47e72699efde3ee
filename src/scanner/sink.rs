//! Writes matches to the output destination as they arrive.
use log::debug;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;

use super::Match;

/// What the sink hands back once the output queue is closed and drained.
#[derive(Debug)]
pub struct SinkReport<W> {
    pub lines: usize,
    pub writer: W,
}

/// Single writer of result lines, in receipt order.
#[derive(Debug)]
pub struct ResultSink<W> {
    writer: BufWriter<W>,
}

impl<W: AsyncWrite + Unpin + Send> ResultSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    /// Appends one line.
    pub async fn write_match(&mut self, found: &Match) -> std::io::Result<()> {
        self.writer.write_all(format!("{found}\n").as_bytes()).await
    }

    /// Consumes matches until every sender is dropped, then flushes.
    ///
    /// Returning is the sink's completion signal: nothing it received is left
    /// unwritten by then.
    pub async fn drain(mut self, mut matches: mpsc::Receiver<Match>) -> std::io::Result<SinkReport<W>> {
        let mut lines = 0;
        while let Some(found) = matches.recv().await {
            self.write_match(&found).await?;
            // Flush whenever the queue runs dry so a terminal sees results live.
            if matches.is_empty() {
                self.writer.flush().await?;
            }
            lines += 1;
        }

        self.writer.flush().await?;
        debug!("Result sink drained after {lines} lines");
        Ok(SinkReport {
            lines,
            writer: self.writer.into_inner(),
        })
    }
}
