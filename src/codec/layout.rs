// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! The lane-interleaved layout contract.
//!
//! Rows of a tile are dealt round-robin to `lane_count = channels * pack_size`
//! lanes. Lane `k` lives in channel `k / pack_size`, slot `k % pack_size`.
//! A channel is a sequence of words, each word holding one record per slot:
//!
//! ```text
//! channel c, word w:  | slot P-1 | ... | slot 1 | slot 0 |
//! record:             | tag_or_index: u32 | value_or_count: 32-bit scalar |
//! ```
//!
//! A record is a row-advance marker iff `tag_or_index == SENTINEL`; its
//! payload is then the skip count. Padding records are `(0, 0)` and only
//! appear past a lane's recorded length.
//!
//! ## Channel Images
//!
//! [`EncodedMatrix::channel_image`] serialises one channel, little-endian:
//!
//! ```text
//! header   magic "LSPV" | version u32 | pack_size u32 | num_tiles u32 | num_words u64
//! table    2 words per tile
//!          word 0: slot 0 = (start_offset low 32 bits, start_offset high 32 bits)
//!          word 1: slot p = (length of lane c*P + p, 0)
//! data     num_words words
//! ```

use std::fmt::{self, Write as _};

use super::config::ColumnIndexing;
use crate::error::{CodecError, Result};
use crate::scalar::Scalar;

/// Reserved index marking a row-advance record.
pub const SENTINEL: u32 = 0xFFFF_FFFF;

/// Bytes per serialised record.
pub const RECORD_BYTES: usize = 8;

const IMAGE_MAGIC: [u8; 4] = *b"LSPV";
const IMAGE_VERSION: u32 = 1;
const IMAGE_HEADER_BYTES: usize = 24;

/// One 2-field record of a lane stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Record<T> {
    /// Column index, or [`SENTINEL`] for a row-advance marker.
    pub tag_or_index: u32,
    /// Matrix value, or skip count for a row-advance marker.
    pub value_or_count: T,
}

impl<T: Scalar> Record<T> {
    /// A real non-zero entry.
    #[must_use]
    pub const fn entry(col: u32, value: T) -> Self {
        Self {
            tag_or_index: col,
            value_or_count: value,
        }
    }

    /// A row-advance marker skipping `skip` rows of this lane.
    #[must_use]
    pub fn marker(skip: u32) -> Self {
        Self {
            tag_or_index: SENTINEL,
            value_or_count: T::from_count(skip),
        }
    }

    /// The neutral `(0, 0)` padding record.
    #[must_use]
    pub const fn padding() -> Self {
        Self {
            tag_or_index: 0,
            value_or_count: T::ZERO,
        }
    }

    /// Whether this record is a row-advance marker.
    #[must_use]
    pub const fn is_sentinel(&self) -> bool {
        self.tag_or_index == SENTINEL
    }

    /// Serialise as 8 little-endian bytes.
    #[must_use]
    pub fn to_le_bytes(self) -> [u8; RECORD_BYTES] {
        let mut out = [0u8; RECORD_BYTES];
        out[..4].copy_from_slice(&self.tag_or_index.to_le_bytes());
        out[4..].copy_from_slice(&self.value_or_count.to_bits().to_le_bytes());
        out
    }

    /// Parse 8 little-endian bytes.
    #[must_use]
    pub fn from_le_bytes(bytes: [u8; RECORD_BYTES]) -> Self {
        let (index, value) = split_record(bytes);
        Self {
            tag_or_index: index,
            value_or_count: T::from_bits(value),
        }
    }
}

fn split_record(bytes: [u8; RECORD_BYTES]) -> (u32, u32) {
    let [a, b, c, d, e, f, g, h] = bytes;
    (u32::from_le_bytes([a, b, c, d]), u32::from_le_bytes([e, f, g, h]))
}

/// Per-tile metadata locating the tile's words and bounding each lane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionTableEntry {
    /// Word offset of the tile in every channel store.
    pub start_offset: u64,
    /// Pre-padding length of every lane.
    pub lane_lengths: Vec<u32>,
}

impl PartitionTableEntry {
    /// Longest lane; the number of words the decoder streams.
    #[must_use]
    pub fn max_length(&self) -> u32 {
        self.lane_lengths.iter().copied().max().unwrap_or(0)
    }
}

/// Lane streams of one tile, padded to a common length.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedTile<T> {
    /// One padded record sequence per lane.
    pub lanes: Vec<Vec<Record<T>>>,
    /// Pre-padding length of every lane.
    pub lane_lengths: Vec<u32>,
    /// Common padded length of every lane.
    pub padded_length: usize,
}

/// Word-addressed record store of one memory channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelStore<T> {
    pack_size: usize,
    records: Vec<Record<T>>,
}

impl<T: Scalar> ChannelStore<T> {
    /// Empty store with `pack_size` slots per word.
    #[must_use]
    pub const fn new(pack_size: usize) -> Self {
        Self {
            pack_size,
            records: Vec::new(),
        }
    }

    /// Slots per word.
    #[must_use]
    pub const fn pack_size(&self) -> usize {
        self.pack_size
    }

    /// Number of words written; also the write cursor.
    #[must_use]
    pub fn num_words(&self) -> usize {
        self.records.len() / self.pack_size
    }

    /// Record at `(word, slot)`.
    #[must_use]
    pub fn record(&self, word: usize, slot: usize) -> Option<Record<T>> {
        if slot >= self.pack_size {
            return None;
        }
        let index = word.checked_mul(self.pack_size)?.checked_add(slot)?;
        self.records.get(index).copied()
    }

    /// Append `len` words whose slot `p` is `lanes[p][w]`.
    pub(crate) fn append_words(&mut self, lanes: &[Vec<Record<T>>], len: usize) {
        debug_assert_eq!(lanes.len(), self.pack_size);
        self.records.reserve(len * self.pack_size);
        for w in 0..len {
            for lane in lanes {
                self.records.push(lane[w]);
            }
        }
    }

    /// Overwrite one record in place.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::LayoutCorruption`] if `(word, slot)` is outside
    /// the store.
    pub fn set_record(&mut self, word: usize, slot: usize, record: Record<T>) -> Result<()> {
        if slot >= self.pack_size || word >= self.num_words() {
            return Err(CodecError::LayoutCorruption(format!(
                "record ({word}, {slot}) outside store of {} words",
                self.num_words()
            )));
        }
        self.records[word * self.pack_size + slot] = record;
        Ok(())
    }
}

/// Dimensions and lane geometry of an encoded matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutGeometry {
    /// Memory channels.
    pub channels: usize,
    /// Lanes per channel.
    pub pack_size: usize,
    /// Rows per full row partition.
    pub row_partition_size: usize,
    /// Columns per full column partition.
    pub col_partition_size: usize,
    /// Rows of the source matrix.
    pub num_rows: usize,
    /// Columns of the source matrix.
    pub num_cols: usize,
    /// Column index convention inside tiles.
    pub column_indexing: ColumnIndexing,
}

impl LayoutGeometry {
    /// Reject geometries with no lanes or empty partitions.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidConfig`] if a lane or partition dimension
    /// is zero, or the lane count overflows.
    pub fn validate(&self) -> Result<()> {
        let lanes = self.channels.checked_mul(self.pack_size);
        if matches!(lanes, None | Some(0))
            || self.row_partition_size == 0
            || self.col_partition_size == 0
        {
            return Err(CodecError::InvalidConfig(format!(
                "degenerate layout geometry {self:?}"
            )));
        }
        Ok(())
    }

    /// Total lanes.
    #[must_use]
    pub const fn lane_count(&self) -> usize {
        self.channels * self.pack_size
    }

    /// Number of row partitions.
    #[must_use]
    pub const fn num_row_partitions(&self) -> usize {
        self.num_rows.div_ceil(self.row_partition_size)
    }

    /// Number of column partitions.
    #[must_use]
    pub const fn num_col_partitions(&self) -> usize {
        self.num_cols.div_ceil(self.col_partition_size)
    }

    /// Number of tiles.
    #[must_use]
    pub const fn num_tiles(&self) -> usize {
        self.num_row_partitions() * self.num_col_partitions()
    }

    /// Rows in row partition `i`.
    #[must_use]
    pub fn partition_rows(&self, i: usize) -> usize {
        let start = i * self.row_partition_size;
        self.row_partition_size.min(self.num_rows.saturating_sub(start))
    }

    /// Column range of column partition `j`.
    #[must_use]
    pub fn partition_cols(&self, j: usize) -> std::ops::Range<usize> {
        let start = j * self.col_partition_size;
        start..(start + self.col_partition_size).min(self.num_cols)
    }
}

/// A complete matrix in lane-interleaved form.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedMatrix<T> {
    geometry: LayoutGeometry,
    table: Vec<PartitionTableEntry>,
    channels: Vec<ChannelStore<T>>,
}

impl<T: Scalar> EncodedMatrix<T> {
    /// Empty layout ready to receive tiles.
    #[must_use]
    pub fn new(geometry: LayoutGeometry) -> Self {
        Self {
            geometry,
            table: Vec::with_capacity(geometry.num_tiles()),
            channels: (0..geometry.channels)
                .map(|_| ChannelStore::new(geometry.pack_size))
                .collect(),
        }
    }

    /// Geometry the layout was encoded with.
    #[must_use]
    pub const fn geometry(&self) -> &LayoutGeometry {
        &self.geometry
    }

    /// Partition table, one entry per tile, row-partition-major.
    #[must_use]
    pub fn table(&self) -> &[PartitionTableEntry] {
        &self.table
    }

    /// Mutable partition table.
    pub fn table_mut(&mut self) -> &mut [PartitionTableEntry] {
        &mut self.table
    }

    /// Table entry of tile `(i, j)`.
    #[must_use]
    pub fn entry(&self, row_partition: usize, col_partition: usize) -> Option<&PartitionTableEntry> {
        self.table
            .get(row_partition * self.geometry.num_col_partitions() + col_partition)
    }

    /// Per-channel stores.
    #[must_use]
    pub fn channels(&self) -> &[ChannelStore<T>] {
        &self.channels
    }

    /// Mutable per-channel stores.
    pub fn channels_mut(&mut self) -> &mut [ChannelStore<T>] {
        &mut self.channels
    }

    /// Current write cursor (identical on every channel).
    #[must_use]
    pub fn cursor(&self) -> u64 {
        self.channels.first().map_or(0, |c| c.num_words() as u64)
    }

    /// Append an encoded tile and record its table entry.
    ///
    /// Every channel advances by the tile's padded length.
    pub(crate) fn append_tile(&mut self, tile: EncodedTile<T>) -> &PartitionTableEntry {
        let start_offset = self.cursor();
        let pack_size = self.geometry.pack_size;
        for (store, lanes) in self.channels.iter_mut().zip(tile.lanes.chunks(pack_size)) {
            store.append_words(lanes, tile.padded_length);
        }
        self.table.push(PartitionTableEntry {
            start_offset,
            lane_lengths: tile.lane_lengths,
        });
        &self.table[self.table.len() - 1]
    }

    /// Records of one lane of one tile, up to its recorded length.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::LayoutCorruption`] if the tile or lane does not
    /// exist or the lane runs past the end of its channel store.
    pub fn lane_records(&self, tile_index: usize, lane: usize) -> Result<Vec<Record<T>>> {
        let entry = self.table.get(tile_index).ok_or_else(|| {
            CodecError::LayoutCorruption(format!("no table entry for tile {tile_index}"))
        })?;
        if lane >= self.geometry.lane_count() {
            return Err(CodecError::LayoutCorruption(format!(
                "lane {lane} outside {} lanes",
                self.geometry.lane_count()
            )));
        }
        let len = *entry.lane_lengths.get(lane).ok_or_else(|| {
            CodecError::LayoutCorruption(format!("tile {tile_index} has no lane {lane}"))
        })? as usize;
        let store = &self.channels[lane / self.geometry.pack_size];
        let slot = lane % self.geometry.pack_size;
        let start = usize::try_from(entry.start_offset).map_err(|_| {
            CodecError::LayoutCorruption(format!("start offset {} overflows", entry.start_offset))
        })?;
        let end = start.checked_add(len).ok_or_else(|| {
            CodecError::LayoutCorruption(format!(
                "lane {lane} of tile {tile_index} overflows past start offset {start}"
            ))
        })?;
        (start..end)
            .map(|w| {
                store.record(w, slot).ok_or_else(|| {
                    CodecError::LayoutCorruption(format!(
                        "lane {lane} of tile {tile_index} runs past word {w}"
                    ))
                })
            })
            .collect()
    }

    /// Total stored bytes over all channels, table included.
    #[must_use]
    pub fn stored_bytes(&self) -> usize {
        let data_words: usize = self.channels.iter().map(ChannelStore::num_words).sum();
        let table_words = 2 * self.table.len() * self.channels.len();
        (data_words + table_words) * self.geometry.pack_size * RECORD_BYTES
    }

    /// Size of [`channel_image`](Self::channel_image) for `channel`, or
    /// `None` if there is no such channel.
    #[must_use]
    pub fn channel_image_bytes(&self, channel: usize) -> Option<usize> {
        let store = self.channels.get(channel)?;
        let words = 2 * self.table.len() + store.num_words();
        Some(IMAGE_HEADER_BYTES + words * self.geometry.pack_size * RECORD_BYTES)
    }

    /// Serialise one channel: header, partition table, data words.
    ///
    /// # Panics
    ///
    /// Panics if `channel >= geometry.channels`.
    #[must_use]
    pub fn channel_image(&self, channel: usize) -> Vec<u8> {
        let store = &self.channels[channel];
        let pack_size = self.geometry.pack_size;
        let mut out = Vec::with_capacity(
            IMAGE_HEADER_BYTES + (2 * self.table.len() + store.num_words()) * pack_size * RECORD_BYTES,
        );

        out.extend_from_slice(&IMAGE_MAGIC);
        out.extend_from_slice(&IMAGE_VERSION.to_le_bytes());
        out.extend_from_slice(&to_u32(pack_size).to_le_bytes());
        out.extend_from_slice(&to_u32(self.table.len()).to_le_bytes());
        out.extend_from_slice(&(store.num_words() as u64).to_le_bytes());

        let blank = [0u8; RECORD_BYTES];
        for entry in &self.table {
            // word 0: start offset split over the index and value fields of slot 0
            #[allow(clippy::cast_possible_truncation)]
            let (low, high) = (entry.start_offset as u32, (entry.start_offset >> 32) as u32);
            out.extend_from_slice(&low.to_le_bytes());
            out.extend_from_slice(&high.to_le_bytes());
            for _ in 1..pack_size {
                out.extend_from_slice(&blank);
            }
            // word 1: this channel's lane lengths
            for slot in 0..pack_size {
                let len = entry.lane_lengths[channel * pack_size + slot];
                out.extend_from_slice(&len.to_le_bytes());
                out.extend_from_slice(&0u32.to_le_bytes());
            }
        }

        for record in &store.records {
            out.extend_from_slice(&record.to_le_bytes());
        }
        out
    }

    /// Rebuild a layout from per-channel images.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidConfig`] for a degenerate `geometry`,
    /// [`CodecError::LaneCountMismatch`] if the number of images or
    /// their slot count disagrees with `geometry`, and
    /// [`CodecError::LayoutCorruption`] if an image is truncated, carries a
    /// bad header, or the channels disagree on tile start offsets.
    pub fn from_channel_images<B: AsRef<[u8]>>(geometry: LayoutGeometry, images: &[B]) -> Result<Self> {
        geometry.validate()?;
        if images.len() != geometry.channels {
            return Err(CodecError::LaneCountMismatch {
                encoded: images.len() * geometry.pack_size,
                configured: geometry.lane_count(),
            });
        }

        let pack_size = geometry.pack_size;
        let num_tiles = geometry.num_tiles();
        let mut table: Vec<PartitionTableEntry> = (0..num_tiles)
            .map(|_| PartitionTableEntry {
                start_offset: 0,
                lane_lengths: vec![0; geometry.lane_count()],
            })
            .collect();
        let mut channels = Vec::with_capacity(geometry.channels);

        for (ch, image) in images.iter().enumerate() {
            let mut reader = ImageReader::new(image.as_ref(), ch);
            if reader.take::<4>()? != IMAGE_MAGIC {
                return Err(reader.corrupt("bad magic"));
            }
            let version = u32::from_le_bytes(reader.take()?);
            if version != IMAGE_VERSION {
                return Err(reader.corrupt(&format!("unsupported version {version}")));
            }
            let image_pack = u32::from_le_bytes(reader.take()?) as usize;
            if image_pack != pack_size {
                return Err(CodecError::LaneCountMismatch {
                    encoded: image_pack * geometry.channels,
                    configured: geometry.lane_count(),
                });
            }
            let image_tiles = u32::from_le_bytes(reader.take()?) as usize;
            if image_tiles != num_tiles {
                return Err(reader.corrupt(&format!(
                    "{image_tiles} table entries, geometry needs {num_tiles}"
                )));
            }
            let num_words = usize::try_from(u64::from_le_bytes(reader.take()?))
                .map_err(|_| reader.corrupt("word count overflows"))?;

            for (t, entry) in table.iter_mut().enumerate() {
                let (low, high) = split_record(reader.take()?);
                for _ in 1..pack_size {
                    reader.take::<RECORD_BYTES>()?;
                }
                let start = u64::from(low) | (u64::from(high) << 32);
                if ch == 0 {
                    entry.start_offset = start;
                } else if entry.start_offset != start {
                    return Err(reader.corrupt(&format!(
                        "tile {t} starts at {start}, channel 0 says {}",
                        entry.start_offset
                    )));
                }
                for slot in 0..pack_size {
                    let (len, _) = split_record(reader.take()?);
                    entry.lane_lengths[ch * pack_size + slot] = len;
                }
            }

            let mut store = ChannelStore::new(pack_size);
            let total = num_words
                .checked_mul(pack_size)
                .ok_or_else(|| reader.corrupt("word count overflows"))?;
            store.records.reserve(total.min(reader.remaining() / RECORD_BYTES));
            for _ in 0..total {
                store.records.push(Record::from_le_bytes(reader.take()?));
            }
            if reader.remaining() != 0 {
                return Err(reader.corrupt(&format!("{} trailing bytes", reader.remaining())));
            }
            channels.push(store);
        }

        Ok(Self {
            geometry,
            table,
            channels,
        })
    }

    /// Human-readable dump of one tile's lanes.
    ///
    /// Sentinels print as `+`, padding past a lane's length as blanks.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::LayoutCorruption`] if the tile is missing or
    /// runs past its channel store.
    pub fn describe_tile(&self, tile_index: usize) -> Result<String> {
        let entry = self.table.get(tile_index).ok_or_else(|| {
            CodecError::LayoutCorruption(format!("no table entry for tile {tile_index}"))
        })?;
        let width = entry.max_length() as usize;
        let mut out = String::new();
        let _ = writeln!(
            out,
            "---- tile {tile_index} @ word {} ({width} words) ----",
            entry.start_offset
        );
        for lane in 0..self.geometry.lane_count() {
            let records = self.lane_records(tile_index, lane)?;
            let mut indices = String::new();
            let mut values = String::new();
            for i in 0..width {
                match records.get(i) {
                    Some(r) if r.is_sentinel() => {
                        indices.push_str("  +,");
                        values.push_str("    ,");
                    }
                    Some(r) => {
                        let _ = write!(indices, "{:>3},", r.tag_or_index);
                        let _ = write!(values, "{:>4?},", r.value_or_count);
                    }
                    None => {
                        indices.push_str("    ");
                        values.push_str("     ");
                    }
                }
            }
            let _ = writeln!(out, "lane {lane:>3} indices [{indices}]");
            let _ = writeln!(out, "         values  [{values}]");
        }
        Ok(out)
    }
}

impl<T: Scalar> fmt::Display for EncodedMatrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let g = &self.geometry;
        write!(
            f,
            "EncodedMatrix {}x{} lanes={} ({}x{}) tiles={} words/channel={}",
            g.num_rows,
            g.num_cols,
            g.lane_count(),
            g.channels,
            g.pack_size,
            self.table.len(),
            self.cursor()
        )
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_u32(v: usize) -> u32 {
    // lane and tile counts are bounded far below u32::MAX by construction
    v as u32
}

struct ImageReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    channel: usize,
}

impl<'a> ImageReader<'a> {
    const fn new(bytes: &'a [u8], channel: usize) -> Self {
        Self {
            bytes,
            pos: 0,
            channel,
        }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.bytes;
        let Some(chunk) = bytes.get(self.pos..self.pos + N) else {
            return Err(self.corrupt(&format!("truncated at byte {}", self.pos)));
        };
        self.pos += N;
        let mut out = [0u8; N];
        out.copy_from_slice(chunk);
        Ok(out)
    }

    const fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn corrupt(&self, what: &str) -> CodecError {
        CodecError::LayoutCorruption(format!("channel {} image: {what}", self.channel))
    }
}
