//! JSON-lines observation feeds.
//!
//! A feed is a text stream with one JSON [`Observation`] per line, as
//! written by a browser bridge or replayed from a capture file. Blank lines
//! are skipped. A line that does not parse yields a recoverable
//! [`IngestError::InvalidObservation`] and the feed continues.

use futures::Stream;
use futures::stream;
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

use crate::error::IngestError;
use crate::session::Observation;

/// Parses one feed line.
///
/// # Errors
///
/// Returns [`IngestError::InvalidObservation`] with the given line number.
pub fn parse_line(line: &str, line_no: usize) -> Result<Observation, IngestError> {
    serde_json::from_str(line).map_err(|source| IngestError::InvalidObservation {
        line: line_no,
        source,
    })
}

/// Turns a buffered reader into a stream of observations.
pub fn observations<R>(reader: R) -> impl Stream<Item = Result<Observation, IngestError>>
where
    R: AsyncBufRead + Unpin,
{
    stream::unfold(Some((reader.lines(), 0usize)), next_observation)
}

/// Opens a capture file as an observation stream.
///
/// # Errors
///
/// Returns an error if the file cannot be opened.
pub async fn open_file(
    path: &Path,
) -> Result<impl Stream<Item = Result<Observation, IngestError>> + use<>, IngestError> {
    let file = tokio::fs::File::open(path).await?;
    Ok(observations(BufReader::new(file)))
}

type FeedState<R> = Option<(Lines<R>, usize)>;

async fn next_observation<R>(
    state: FeedState<R>,
) -> Option<(Result<Observation, IngestError>, FeedState<R>)>
where
    R: AsyncBufRead + Unpin,
{
    let (mut lines, mut line_no) = state?;
    loop {
        line_no += 1;
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => {}
            Ok(Some(line)) => {
                return Some((parse_line(&line, line_no), Some((lines, line_no))));
            }
            Ok(None) => return None,
            // A read error ends the feed after being reported.
            Err(e) => return Some((Err(e.into()), None)),
        }
    }
}
