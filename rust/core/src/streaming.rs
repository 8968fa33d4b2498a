// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Streaming scan - records interleaved with progress events
//!
//! The event stream is a cooperative yield point: a host can stop pulling
//! after any `Progress` event and resume later. Records come out in source
//! order no matter where the consumer pauses.

use crate::tokenizer::{EntityScanner, EntityRecord, ScanMode};

/// Streaming scan configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StreamConfig {
    pub mode: ScanMode,
    /// Records between two progress events (0 disables them)
    pub progress_interval: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            mode: ScanMode::Strict,
            progress_interval: 10_000,
        }
    }
}

/// Event emitted by [`StreamingScan`]
#[derive(Debug, Clone, PartialEq)]
pub enum ParseEvent<'a> {
    Entity(EntityRecord<'a>),
    Progress {
        entities: usize,
        bytes_processed: usize,
        total_bytes: usize,
    },
    Complete {
        entities: usize,
        total_bytes: usize,
    },
}

impl ParseEvent<'_> {
    /// Percent of the buffer scanned (100 on completion, `None` for records)
    pub fn percent(&self) -> Option<f32> {
        match self {
            ParseEvent::Progress {
                bytes_processed,
                total_bytes,
                ..
            } => Some(byte_percent(*bytes_processed, *total_bytes)),
            ParseEvent::Complete { .. } => Some(100.0),
            ParseEvent::Entity(_) => None,
        }
    }
}

#[inline]
fn byte_percent(done: usize, total: usize) -> f32 {
    if total == 0 {
        100.0
    } else {
        (done as f64 / total as f64 * 100.0) as f32
    }
}

/// Iterator over [`ParseEvent`]s
pub struct StreamingScan<'a> {
    scanner: EntityScanner<'a>,
    total_bytes: usize,
    interval: usize,
    since_progress: usize,
    entities: usize,
    done: bool,
}

/// Start a streaming scan over a buffer
pub fn parse_stream(buffer: &[u8], config: StreamConfig) -> StreamingScan<'_> {
    StreamingScan {
        scanner: EntityScanner::new(buffer, config.mode),
        total_bytes: buffer.len(),
        interval: config.progress_interval,
        since_progress: 0,
        entities: 0,
        done: false,
    }
}

impl<'a> StreamingScan<'a> {
    /// Records yielded so far
    pub fn entities(&self) -> usize {
        self.entities
    }

    /// Current percent of the buffer scanned
    pub fn percent(&self) -> f32 {
        byte_percent(self.scanner.position(), self.total_bytes)
    }
}

impl<'a> Iterator for StreamingScan<'a> {
    type Item = ParseEvent<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if self.interval > 0 && self.since_progress >= self.interval {
            self.since_progress = 0;
            return Some(ParseEvent::Progress {
                entities: self.entities,
                bytes_processed: self.scanner.position(),
                total_bytes: self.total_bytes,
            });
        }

        match self.scanner.next_entity() {
            Some(record) => {
                self.entities += 1;
                self.since_progress += 1;
                Some(ParseEvent::Entity(record))
            }
            None => {
                self.done = true;
                Some(ParseEvent::Complete {
                    entities: self.entities,
                    total_bytes: self.total_bytes,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(n: u32) -> String {
        (1..=n)
            .map(|i| format!("#{}=IFCWALL('w{}',$,$,$,$,$,$,$);\n", i, i))
            .collect()
    }

    #[test]
    fn test_progress_interleaving() {
        let content = content(10);
        let config = StreamConfig {
            mode: ScanMode::Fast,
            progress_interval: 4,
        };
        let events: Vec<_> = parse_stream(content.as_bytes(), config).collect();

        let ids: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                ParseEvent::Entity(r) => Some(r.id),
                _ => None,
            })
            .collect();
        assert_eq!(ids, (1..=10).collect::<Vec<_>>());

        let progress: Vec<f32> = events
            .iter()
            .filter(|e| matches!(e, ParseEvent::Progress { .. }))
            .filter_map(ParseEvent::percent)
            .collect();
        assert_eq!(progress.len(), 2);
        assert!(progress[0] < progress[1]);
        assert!(progress[1] < 100.0);

        assert_eq!(
            events.last(),
            Some(&ParseEvent::Complete {
                entities: 10,
                total_bytes: content.len()
            })
        );
    }

    #[test]
    fn test_no_progress_when_disabled() {
        let content = content(3);
        let config = StreamConfig {
            progress_interval: 0,
            ..Default::default()
        };
        let events: Vec<_> = parse_stream(content.as_bytes(), config).collect();
        assert_eq!(events.len(), 4);
        assert!(events[..3].iter().all(|e| matches!(e, ParseEvent::Entity(_))));
    }

    #[test]
    fn test_empty_buffer_completes() {
        let mut stream = parse_stream(b"", StreamConfig::default());
        assert_eq!(
            stream.next(),
            Some(ParseEvent::Complete {
                entities: 0,
                total_bytes: 0
            })
        );
        assert_eq!(stream.next(), None);
    }
}
