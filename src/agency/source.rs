//! Ordered source of raw bet lines.
//!
//! Lines are read one at a time from any `AsyncBufRead`. Input ends at EOF
//! or at the first line shorter than two characters, whichever comes first.

use std::io::Cursor;
use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

use crate::error::Result;

/// Lines shorter than this end the input.
const MIN_LINE_LEN: usize = 2;

/// Line reader feeding an agency run.
pub struct BetSource<R> {
    lines: Lines<R>,
    finished: bool,
}

impl<R: AsyncBufRead + Unpin> BetSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            finished: false,
        }
    }

    /// Next raw line, or `None` at end of input.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        if self.finished {
            return Ok(None);
        }

        match self.lines.next_line().await? {
            Some(line) if line.trim_end_matches('\r').len() >= MIN_LINE_LEN => Ok(Some(line)),
            _ => {
                self.finished = true;
                Ok(None)
            }
        }
    }

    /// Up to `size` lines. An empty vector means the input is exhausted.
    pub async fn next_batch(&mut self, size: usize) -> Result<Vec<String>> {
        let mut batch = Vec::with_capacity(size);
        while batch.len() < size {
            match self.next_line().await? {
                Some(line) => batch.push(line),
                None => break,
            }
        }
        Ok(batch)
    }
}

impl BetSource<BufReader<File>> {
    /// Open a bets file (e.g. [`ClientConfig::agency_file`](crate::ClientConfig::agency_file)).
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path).await?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl BetSource<Cursor<Vec<u8>>> {
    /// In-memory source over the given lines.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut text = String::new();
        for line in lines {
            text.push_str(line.as_ref());
            text.push('\n');
        }
        Self::new(Cursor::new(text.into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_from_lines_batches() {
        let mut source = BetSource::from_lines([
            "a,b,1,2000-01-01,1",
            "c,d,2,2000-01-01,2",
            "e,f,3,2000-01-01,3",
        ]);

        assert_eq!(source.next_batch(2).await.unwrap().len(), 2);
        assert_eq!(source.next_batch(2).await.unwrap(), vec!["e,f,3,2000-01-01,3"]);
        assert!(source.next_batch(2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_short_line_ends_input() {
        let mut source = BetSource::from_lines(["a,b,1,2000-01-01,1", "", "c,d,2,2000-01-01,2"]);

        assert!(source.next_line().await.unwrap().is_some());
        assert!(source.next_line().await.unwrap().is_none());
        // Stays finished even though more lines follow.
        assert!(source.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_single_char_line_ends_input() {
        let mut source = BetSource::from_lines(["x", "a,b,1,2000-01-01,1"]);
        assert!(source.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Ana,Lopez,1001,1990-01-01,42").unwrap();
        writeln!(file, "Ben,Cruz,1002,1985-05-05,7").unwrap();

        let mut source = BetSource::open(file.path()).await.unwrap();
        let batch = source.next_batch(10).await.unwrap();
        assert_eq!(batch, vec!["Ana,Lopez,1001,1990-01-01,42", "Ben,Cruz,1002,1985-05-05,7"]);
    }

    #[tokio::test]
    async fn test_open_missing_file() {
        let result = BetSource::open("/nonexistent/agency-1.csv").await;
        assert!(matches!(result, Err(crate::BetwireError::Io(_))));
    }
}
