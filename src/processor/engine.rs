use anyhow::{anyhow, Context, Result};
use crossbeam_channel::unbounded;
use std::thread;
use tracing::debug;

use crate::capture::{decode_frame, CaptureReader};
use crate::types::{FlowConfig, SessionRecord};

use super::flow::Flow;

/// Run one capture through the reader, decoder and aggregator.
///
/// A capture holds the packets of a single session, so the first admitted
/// packet seeds the flow and every later one feeds it. `Ok(None)` means the
/// capture produced no row: either no frame decoded to an admissible packet,
/// or every packet shared one timestamp. Malformed capture headers are the
/// only fatal errors; malformed frames are skipped.
pub fn process_capture(data: &[u8], cfg: &FlowConfig) -> Result<Option<SessionRecord>> {
    let reader = CaptureReader::new(data).context("invalid capture header")?;

    let mut flow: Option<Flow> = None;
    let mut next_id: u64 = 0;
    let mut admitted: u64 = 0;
    let mut skipped: u64 = 0;

    for (timestamp, frame) in reader {
        next_id += 1;
        let Some(packet) = decode_frame(next_id, timestamp, frame) else {
            skipped += 1;
            continue;
        };
        admitted += 1;

        flow.get_or_insert_with(|| Flow::new(&packet, cfg.clone()))
            .add_packet(&packet);
    }

    debug!(admitted, skipped, "capture drained");

    let Some(mut flow) = flow else {
        return Ok(None);
    };
    flow.end_session();

    let payloads = flow.payload_matrix();
    Ok(flow
        .features()
        .map(|features| SessionRecord { features, payloads }))
}

/// Process many independent captures on a small worker pool.
///
/// Sessions share no state, so the captures fan out over a channel-fed pool
/// of scoped threads. Output order matches input order, and a failed capture
/// carries its error in place instead of aborting the batch.
pub fn process_captures(
    captures: &[Vec<u8>],
    cfg: &FlowConfig,
    workers: usize,
) -> Vec<Result<Option<SessionRecord>>> {
    let workers = workers.max(1).min(captures.len().max(1));
    let (job_tx, job_rx) = unbounded::<(usize, &[u8])>();
    let (out_tx, out_rx) = unbounded::<(usize, Result<Option<SessionRecord>>)>();

    thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let out_tx = out_tx.clone();
            scope.spawn(move || {
                for (idx, data) in job_rx.iter() {
                    let _ = out_tx.send((idx, process_capture(data, cfg)));
                }
            });
        }
        drop(out_tx);

        for job in captures.iter().map(Vec::as_slice).enumerate() {
            let _ = job_tx.send(job);
        }
        drop(job_tx);

        let mut results: Vec<Option<Result<Option<SessionRecord>>>> =
            (0..captures.len()).map(|_| None).collect();
        for (idx, result) in out_rx.iter() {
            results[idx] = Some(result);
        }
        results
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| Err(anyhow!("worker dropped its result"))))
            .collect()
    })
}
