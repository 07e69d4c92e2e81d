use std::fmt::Display;

use bytes::{Bytes, BytesMut};
use futures::{pin_mut, Stream, StreamExt};
use log::debug;
use sha2::{Digest, Sha256};

use crate::error::DemuxError;
use crate::models::ArtifactBlob;
use crate::utils::hash::finalize_hex;

/// Splits one upload body into discrete artifacts using caller-declared lengths.
///
/// Bytes are hashed as they arrive, so a file is finalized the moment its
/// last byte is consumed. Chunks may cross any number of file boundaries:
/// a single [`push`](Self::push) can finalize zero, one or several files.
/// Zero-length files are finalized as soon as they become current, with the
/// hash of the empty input.
pub struct StreamDemultiplexer {
    declared: Vec<u64>,
    /// Index of the file currently being filled
    index: usize,
    buffer: BytesMut,
    hasher: Sha256,
    received: u64,
    finished: Vec<ArtifactBlob>,
}

impl StreamDemultiplexer {
    pub fn new(declared: Vec<u64>) -> Self {
        let mut demux = Self {
            finished: Vec::with_capacity(declared.len()),
            declared,
            index: 0,
            buffer: BytesMut::new(),
            hasher: Sha256::new(),
            received: 0,
        };
        demux.finalize_empty_files();
        demux
    }

    /// Sum of all declared lengths, `None` if it does not fit in a `u64`
    pub fn declared_total(&self) -> Option<u64> {
        checked_total(&self.declared)
    }

    pub fn bytes_received(&self) -> u64 {
        self.received
    }

    /// True once every declared file has been finalized
    pub fn is_complete(&self) -> bool {
        self.index >= self.declared.len()
    }

    /// Artifacts finalized so far, in declaration order
    pub fn artifacts(&self) -> &[ArtifactBlob] {
        &self.finished
    }

    /// Consume one chunk of the body.
    ///
    /// Returns how many files were finalized by this chunk. Fails with
    /// [`DemuxError::Overflow`] as soon as a byte arrives after the last
    /// declared file is complete.
    pub fn push(&mut self, mut chunk: &[u8]) -> Result<usize, DemuxError> {
        let before = self.finished.len();

        while !chunk.is_empty() {
            let Some(&expected) = self.declared.get(self.index) else {
                // Every declared file is complete, so the total equals what was received
                return Err(DemuxError::Overflow {
                    expected: self.received,
                });
            };

            let remaining = expected - self.buffer.len() as u64;
            let take = remaining.min(chunk.len() as u64) as usize;
            let (head, rest) = chunk.split_at(take);

            self.hasher.update(head);
            self.buffer.extend_from_slice(head);
            self.received += take as u64;
            chunk = rest;

            if self.buffer.len() as u64 == expected {
                self.finalize_current();
                self.finalize_empty_files();
            }
        }

        Ok(self.finished.len() - before)
    }

    /// Close the stream and hand back every artifact.
    ///
    /// An unfinished file is discarded and reported as
    /// [`DemuxError::TruncatedUpload`]; no partial artifact is ever returned.
    pub fn finish(self) -> Result<Vec<ArtifactBlob>, DemuxError> {
        if let Some(&expected) = self.declared.get(self.index) {
            return Err(DemuxError::TruncatedUpload {
                file_index: self.index,
                received: self.buffer.len() as u64,
                expected,
            });
        }
        Ok(self.finished)
    }

    fn finalize_current(&mut self) {
        let data: Bytes = self.buffer.split().freeze();
        let content_hash = finalize_hex(std::mem::take(&mut self.hasher));

        debug!(
            "Reading of file {} completed ({} bytes, sha256 {})",
            self.index,
            data.len(),
            content_hash
        );

        self.finished.push(ArtifactBlob { data, content_hash });
        self.index += 1;
    }

    fn finalize_empty_files(&mut self) {
        while self.declared.get(self.index) == Some(&0) {
            self.finalize_current();
        }
    }
}

/// Sum of declared lengths without wrapping around.
pub fn checked_total(lengths: &[u64]) -> Option<u64> {
    lengths.iter().try_fold(0u64, |total, &len| total.checked_add(len))
}

/// Demultiplex a whole body stream.
///
/// A stream error (for example the client disconnecting) discards everything
/// accumulated so far.
pub async fn demultiplex<S, E>(declared: Vec<u64>, stream: S) -> Result<Vec<ArtifactBlob>, DemuxError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    let mut demux = StreamDemultiplexer::new(declared);
    pin_mut!(stream);

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| DemuxError::Stream(e.to_string()))?;
        demux.push(&chunk)?;
    }

    demux.finish()
}
