// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Per-lane decode state machine.
//!
//! ```text
//!          START                 NEXT
//!   IDLE ---------> ACTIVE ---------------> IDLE
//!    |                 | (SENTINEL, s): row_counter += lane_count * s
//!    | EXIT            | (col, v):      acc[row_counter] += v * x[col]
//!    v
//!   EXIT
//! ```
//!
//! A lane owns rows `k, k + L, k + 2L, ...` of its row partition and
//! accumulates each of them directly. Partial sums persist across the
//! column-partition blocks of the row partition and are handed back on EXIT.

use std::sync::Arc;

use crossbeam_channel::Receiver;

use super::token::{LaneEvent, VectorSlice};
use crate::error::{CodecError, Result};
use crate::scalar::Scalar;

/// Observable phase of a lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneState {
    /// Waiting for `START`.
    Idle,
    /// Consuming records of a block.
    Active,
    /// Shut down.
    Exited,
}

#[derive(Debug)]
enum Phase<T> {
    Idle,
    Active(Arc<VectorSlice<T>>),
    Exited,
}

/// Decoder for one lane of one row partition.
#[derive(Debug)]
pub struct LaneWorker<T> {
    lane: usize,
    lane_count: usize,
    partition_rows: usize,
    phase: Phase<T>,
    row_counter: usize,
    partials: Vec<T>,
}

impl<T: Scalar> LaneWorker<T> {
    /// Idle lane `lane` of `lane_count`, for a partition of `partition_rows` rows.
    #[must_use]
    pub fn new(lane: usize, lane_count: usize, partition_rows: usize) -> Self {
        let owned = partition_rows.saturating_sub(lane).div_ceil(lane_count.max(1));
        Self {
            lane,
            lane_count,
            partition_rows,
            phase: Phase::Idle,
            row_counter: lane,
            partials: vec![T::ZERO; owned],
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn state(&self) -> LaneState {
        match self.phase {
            Phase::Idle => LaneState::Idle,
            Phase::Active(_) => LaneState::Active,
            Phase::Exited => LaneState::Exited,
        }
    }

    /// Reconstructed row of the next record, local to the row partition.
    #[must_use]
    pub const fn row_counter(&self) -> usize {
        self.row_counter
    }

    /// Partial sums of the rows this lane owns, in row order.
    #[must_use]
    pub fn partials(&self) -> &[T] {
        &self.partials
    }

    /// Apply one event.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::ColumnOutOfRange`] for an entry outside the
    /// block's vector slice, and [`CodecError::LayoutCorruption`] for any
    /// token out of protocol order, a zero or unreadable skip count, an
    /// entry past the last row, or a block that did not cover every row.
    pub fn handle(&mut self, event: LaneEvent<T>) -> Result<()> {
        if matches!(self.phase, Phase::Exited) {
            return Err(self.corrupt("event after EXIT"));
        }
        match event {
            LaneEvent::Start(slice) => {
                if !matches!(self.phase, Phase::Idle) {
                    return Err(self.corrupt("START inside a block"));
                }
                self.row_counter = self.lane;
                self.phase = Phase::Active(slice);
                Ok(())
            }
            LaneEvent::Record(record) => {
                let Phase::Active(slice) = &self.phase else {
                    return Err(self.corrupt("record before START"));
                };
                if record.is_sentinel() {
                    let skip = record
                        .value_or_count
                        .to_count()
                        .filter(|&s| s > 0)
                        .ok_or_else(|| {
                            self.corrupt(&format!("bad skip count {:?}", record.value_or_count))
                        })?;
                    self.row_counter = (skip as usize)
                        .checked_mul(self.lane_count)
                        .and_then(|step| self.row_counter.checked_add(step))
                        .ok_or_else(|| self.corrupt("row counter overflow"))?;
                    return Ok(());
                }

                let operand = slice.resolve(record.tag_or_index).ok_or(
                    CodecError::ColumnOutOfRange {
                        lane: self.lane,
                        col: record.tag_or_index,
                        len: slice.len(),
                    },
                )?;
                if self.row_counter >= self.partition_rows {
                    return Err(self.corrupt(&format!(
                        "entry for row {} past partition of {} rows",
                        self.row_counter, self.partition_rows
                    )));
                }
                let slot = (self.row_counter - self.lane) / self.lane_count;
                self.partials[slot] = self.partials[slot] + record.value_or_count * operand;
                Ok(())
            }
            LaneEvent::Next => {
                if !matches!(self.phase, Phase::Active(_)) {
                    return Err(self.corrupt("NEXT before START"));
                }
                let expected = self.lane + self.partition_rows;
                if self.row_counter != expected {
                    return Err(self.corrupt(&format!(
                        "block ended at row {}, expected {expected}",
                        self.row_counter
                    )));
                }
                self.phase = Phase::Idle;
                Ok(())
            }
            LaneEvent::Exit => {
                if !matches!(self.phase, Phase::Idle) {
                    return Err(self.corrupt("EXIT inside a block"));
                }
                self.phase = Phase::Exited;
                Ok(())
            }
        }
    }

    /// Consume events until EXIT and return the partial sums.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`handle`](Self::handle), or
    /// [`CodecError::LayoutCorruption`] if the queue closes before EXIT.
    pub fn run(mut self, events: &Receiver<LaneEvent<T>>) -> Result<Vec<T>> {
        loop {
            let event = events
                .recv()
                .map_err(|_| self.corrupt("stream ended before EXIT"))?;
            self.handle(event)?;
            if self.state() == LaneState::Exited {
                return Ok(self.partials);
            }
        }
    }

    fn corrupt(&self, what: &str) -> CodecError {
        CodecError::LayoutCorruption(format!("lane {}: {what}", self.lane))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::layout::Record;
    use crossbeam_channel::unbounded;

    fn slice(values: Vec<i32>) -> Arc<VectorSlice<i32>> {
        Arc::new(VectorSlice::new(0, values))
    }

    #[test]
    fn test_lane_accumulates_owned_rows() -> Result<()> {
        // lane 1 of 2 over 4 rows: rows 1 and 3
        let mut lane = LaneWorker::new(1, 2, 4);
        lane.handle(LaneEvent::Start(slice(vec![1, 2, 3, 4])))?;
        assert_eq!(lane.state(), LaneState::Active);
        lane.handle(LaneEvent::Record(Record::entry(1, 3)))?;
        lane.handle(LaneEvent::Record(Record::marker(1)))?;
        assert_eq!(lane.row_counter(), 3);
        lane.handle(LaneEvent::Record(Record::entry(0, 5)))?;
        lane.handle(LaneEvent::Record(Record::entry(3, 6)))?;
        lane.handle(LaneEvent::Record(Record::marker(1)))?;
        lane.handle(LaneEvent::Next)?;
        assert_eq!(lane.state(), LaneState::Idle);
        assert_eq!(lane.partials(), &[6, 5 + 24]);
        Ok(())
    }

    #[test]
    fn test_partials_span_blocks() -> Result<()> {
        let (tx, rx) = unbounded();
        for x in [vec![1, 1], vec![10, 10]] {
            tx.send(LaneEvent::Start(slice(x))).unwrap();
            tx.send(LaneEvent::Record(Record::entry(1, 2))).unwrap();
            tx.send(LaneEvent::Record(Record::marker(1))).unwrap();
            tx.send(LaneEvent::Next).unwrap();
        }
        tx.send(LaneEvent::Exit).unwrap();
        let partials = LaneWorker::new(0, 1, 1).run(&rx)?;
        assert_eq!(partials, vec![22]);
        Ok(())
    }

    #[test]
    fn test_multi_row_skip() -> Result<()> {
        let mut lane = LaneWorker::<i32>::new(0, 2, 6);
        lane.handle(LaneEvent::Start(slice(vec![1])))?;
        lane.handle(LaneEvent::Record(Record::marker(3)))?;
        assert_eq!(lane.row_counter(), 6);
        lane.handle(LaneEvent::Next)?;
        Ok(())
    }

    #[test]
    fn test_column_out_of_range() {
        let mut lane = LaneWorker::new(0, 1, 1);
        lane.handle(LaneEvent::Start(slice(vec![1, 2]))).unwrap();
        let err = lane
            .handle(LaneEvent::Record(Record::entry(2, 1)))
            .unwrap_err();
        assert!(matches!(
            err,
            CodecError::ColumnOutOfRange { lane: 0, col: 2, len: 2 }
        ));
    }

    #[test]
    fn test_protocol_violations() {
        let mut lane = LaneWorker::<i32>::new(0, 1, 1);
        assert!(lane.handle(LaneEvent::Record(Record::entry(0, 1))).is_err());
        assert!(lane.handle(LaneEvent::Next).is_err());

        let mut lane = LaneWorker::<i32>::new(0, 1, 1);
        lane.handle(LaneEvent::Start(slice(vec![1]))).unwrap();
        assert!(lane.handle(LaneEvent::Start(slice(vec![1]))).is_err());
        assert!(lane.handle(LaneEvent::Exit).is_err());
        assert!(lane.handle(LaneEvent::Record(Record::marker(0))).is_err());

        let mut lane = LaneWorker::<i32>::new(0, 1, 1);
        lane.handle(LaneEvent::Exit).unwrap();
        assert!(lane.handle(LaneEvent::Exit).unwrap_err().is_layout_corruption());
    }

    #[test]
    fn test_missing_marker_detected_at_next() {
        let mut lane = LaneWorker::<i32>::new(0, 2, 4);
        lane.handle(LaneEvent::Start(slice(vec![1]))).unwrap();
        lane.handle(LaneEvent::Record(Record::marker(1))).unwrap();
        // row 2 never advanced
        let err = lane.handle(LaneEvent::Next).unwrap_err();
        assert!(err.is_layout_corruption());
    }

    #[test]
    fn test_entry_past_last_row() {
        let mut lane = LaneWorker::<i32>::new(0, 1, 1);
        lane.handle(LaneEvent::Start(slice(vec![1]))).unwrap();
        lane.handle(LaneEvent::Record(Record::marker(1))).unwrap();
        assert!(lane
            .handle(LaneEvent::Record(Record::entry(0, 1)))
            .unwrap_err()
            .is_layout_corruption());
    }

    #[test]
    fn test_missing_exit() {
        let (tx, rx) = unbounded();
        tx.send(LaneEvent::Start(slice(vec![1]))).unwrap();
        tx.send(LaneEvent::Record(Record::marker(1))).unwrap();
        tx.send(LaneEvent::Next).unwrap();
        drop(tx);
        let err = LaneWorker::new(0, 1, 1).run(&rx).unwrap_err();
        assert!(err.to_string().contains("before EXIT"));
    }
}
