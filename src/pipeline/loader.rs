// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Producer side of the pipeline.
//!
//! Walks the partition table of one row partition and feeds every lane's
//! queue in lockstep:
//!
//! ```text
//! for each column partition j:
//!     START(slice j)         -> every lane
//!     word 0..max_len        -> lane k gets its record while w < lane_lengths[k]
//!     NEXT                   -> every lane
//! EXIT                       -> every lane
//! ```
//!
//! Padding past a lane's recorded length is never sent.

use std::sync::Arc;

use crossbeam_channel::Sender;

use super::token::{LaneEvent, VectorSlice};
use super::AbortSignal;
use crate::codec::config::ColumnIndexing;
use crate::codec::layout::EncodedMatrix;
use crate::error::{CodecError, Result};
use crate::scalar::Scalar;

/// Check every table entry against the layout geometry and channel stores.
///
/// # Errors
///
/// Returns [`CodecError::LayoutCorruption`] if the table has the wrong number
/// of entries, an entry has the wrong number of lanes, a store has the wrong
/// slot count, or a tile runs past the end of any store.
pub fn check_table<T: Scalar>(layout: &EncodedMatrix<T>) -> Result<()> {
    let geometry = layout.geometry();
    if layout.table().len() != geometry.num_tiles() {
        return Err(CodecError::LayoutCorruption(format!(
            "partition table has {} entries, geometry needs {}",
            layout.table().len(),
            geometry.num_tiles()
        )));
    }
    if layout.channels().len() != geometry.channels {
        return Err(CodecError::LayoutCorruption(format!(
            "{} channel stores for {} channels",
            layout.channels().len(),
            geometry.channels
        )));
    }
    for (ch, store) in layout.channels().iter().enumerate() {
        if store.pack_size() != geometry.pack_size {
            return Err(CodecError::LayoutCorruption(format!(
                "channel {ch} packs {} lanes, geometry says {}",
                store.pack_size(),
                geometry.pack_size
            )));
        }
    }

    for (t, entry) in layout.table().iter().enumerate() {
        if entry.lane_lengths.len() != geometry.lane_count() {
            return Err(CodecError::LayoutCorruption(format!(
                "tile {t} records {} lane lengths for {} lanes",
                entry.lane_lengths.len(),
                geometry.lane_count()
            )));
        }
        let end = entry
            .start_offset
            .checked_add(u64::from(entry.max_length()))
            .ok_or_else(|| {
                CodecError::LayoutCorruption(format!(
                    "tile {t} start offset {} overflows",
                    entry.start_offset
                ))
            })?;
        for (ch, store) in layout.channels().iter().enumerate() {
            if end > store.num_words() as u64 {
                return Err(CodecError::LayoutCorruption(format!(
                    "tile {t} ends at word {end}, channel {ch} holds {}",
                    store.num_words()
                )));
            }
        }
    }
    Ok(())
}

/// Stream one row partition to the lanes, then close their queues.
///
/// Stops early without error once `abort` is set; the failure is already
/// recorded there.
///
/// # Errors
///
/// Returns [`CodecError::Resource`] if a lane queue closes while the
/// pipeline is healthy, and [`CodecError::LayoutCorruption`] if a table entry
/// or record is missing.
pub fn stream_row_partition<T: Scalar>(
    layout: &EncodedMatrix<T>,
    x: &[T],
    row_partition: usize,
    lanes: Vec<Sender<LaneEvent<T>>>,
    abort: &AbortSignal,
) -> Result<()> {
    let geometry = *layout.geometry();
    let pack_size = geometry.pack_size;
    let feed = Feed { lanes, abort };

    for j in 0..geometry.num_col_partitions() {
        if abort.is_set() {
            return Ok(());
        }
        let entry = layout.entry(row_partition, j).ok_or_else(|| {
            CodecError::LayoutCorruption(format!("no table entry for tile ({row_partition}, {j})"))
        })?;
        let start = usize::try_from(entry.start_offset).map_err(|_| {
            CodecError::LayoutCorruption(format!("start offset {} overflows", entry.start_offset))
        })?;

        let cols = geometry.partition_cols(j);
        let index_base = match geometry.column_indexing {
            ColumnIndexing::Global => cols.start,
            ColumnIndexing::TileLocal => 0,
        };
        let operands = x.get(cols.clone()).ok_or_else(|| CodecError::ShapeMismatch {
            expected: vec![cols.end],
            actual: vec![x.len()],
        })?;
        let slice = Arc::new(VectorSlice::new(index_base, operands.to_vec()));

        if !feed.broadcast(|| LaneEvent::Start(Arc::clone(&slice)))? {
            return Ok(());
        }
        for w in 0..entry.max_length() as usize {
            if abort.is_set() {
                return Ok(());
            }
            for (lane, &len) in entry.lane_lengths.iter().enumerate() {
                if w >= len as usize {
                    continue;
                }
                let record = layout.channels()[lane / pack_size]
                    .record(start + w, lane % pack_size)
                    .ok_or_else(|| {
                        CodecError::LayoutCorruption(format!(
                            "lane {lane} record {w} of tile ({row_partition}, {j}) missing"
                        ))
                    })?;
                if !feed.send(lane, LaneEvent::Record(record))? {
                    return Ok(());
                }
            }
        }
        if !feed.broadcast(|| LaneEvent::Next)? {
            return Ok(());
        }
    }

    feed.broadcast(|| LaneEvent::Exit)?;
    tracing::debug!(
        row_partition,
        col_partitions = geometry.num_col_partitions(),
        "row partition streamed"
    );
    Ok(())
}

struct Feed<'a, T> {
    lanes: Vec<Sender<LaneEvent<T>>>,
    abort: &'a AbortSignal,
}

impl<T> Feed<'_, T> {
    /// Push one event; `Ok(false)` means the pipeline is aborting.
    fn send(&self, lane: usize, event: LaneEvent<T>) -> Result<bool> {
        match self.lanes[lane].send(event) {
            Ok(()) => Ok(true),
            Err(_) if self.abort.is_set() => Ok(false),
            Err(_) => Err(CodecError::Resource(format!("lane {lane} queue closed"))),
        }
    }

    fn broadcast(&self, event: impl Fn() -> LaneEvent<T>) -> Result<bool> {
        for lane in 0..self.lanes.len() {
            if !self.send(lane, event())? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
