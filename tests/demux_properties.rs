//! Property tests for the stream demultiplexer.

use proptest::prelude::*;

use artifact_relay::error::DemuxError;
use artifact_relay::pipeline::StreamDemultiplexer;
use artifact_relay::utils::hash::sha256_hex;

/// Files plus a list of cut points into their concatenation
fn files_and_cuts() -> impl Strategy<Value = (Vec<Vec<u8>>, Vec<usize>)> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..6).prop_flat_map(|files| {
        let total: usize = files.iter().map(Vec::len).sum();
        let cuts = prop::collection::vec(0..=total, 0..8);
        (Just(files), cuts)
    })
}

fn split_at_cuts(body: &[u8], mut cuts: Vec<usize>) -> Vec<&[u8]> {
    cuts.sort_unstable();
    let mut chunks = Vec::new();
    let mut last = 0;
    for cut in cuts {
        chunks.push(&body[last..cut]);
        last = cut;
    }
    chunks.push(&body[last..]);
    chunks
}

proptest! {
    #[test]
    fn prop_chunking_never_changes_the_result((files, cuts) in files_and_cuts()) {
        let declared: Vec<u64> = files.iter().map(|f| f.len() as u64).collect();
        let body = files.concat();

        let mut demux = StreamDemultiplexer::new(declared);
        for chunk in split_at_cuts(&body, cuts) {
            demux.push(chunk).unwrap();
        }
        let blobs = demux.finish().unwrap();

        prop_assert_eq!(blobs.len(), files.len());
        for (blob, file) in blobs.iter().zip(&files) {
            prop_assert_eq!(blob.data.as_ref(), file.as_slice());
            prop_assert_eq!(&blob.content_hash, &sha256_hex(file));
        }
    }

    #[test]
    fn prop_short_body_is_truncated(
        files in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..32), 1..5),
        missing in 1usize..32,
    ) {
        let declared: Vec<u64> = files.iter().map(|f| f.len() as u64).collect();
        let body = files.concat();
        let keep = body.len().saturating_sub(missing);

        let mut demux = StreamDemultiplexer::new(declared);
        demux.push(&body[..keep]).unwrap();
        let is_truncated = matches!(demux.finish(), Err(DemuxError::TruncatedUpload { .. }));
        prop_assert!(is_truncated);
    }
}
