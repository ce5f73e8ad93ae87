//! Frame source abstractions.
//!
//! A [`FrameSource`] yields captured frames one at a time, each carrying
//! the link type its bytes start with. File readers live in the
//! application crate; [`MemorySource`] serves frames already in memory
//! (tests, fuzzing, reassembled output).

use std::collections::VecDeque;

use bytes::Bytes;

use crate::error::Error;

/// A captured frame, before decoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawFrame {
    /// Frame number (1-indexed, matching Wireshark)
    pub frame_number: u64,
    /// Timestamp in microseconds since the Unix epoch
    pub timestamp_us: i64,
    /// Length on the wire; larger than `data` when the capture was cut
    pub original_length: u32,
    /// Link-layer type (e.g., 1 = Ethernet)
    pub link_type: u16,
    pub data: Bytes,
}

impl RawFrame {
    pub fn new(frame_number: u64, link_type: u16, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            frame_number,
            timestamp_us: 0,
            original_length: data.len() as u32,
            link_type,
            data,
        }
    }

    /// Whether the snapshot length cut this frame short.
    pub fn is_truncated(&self) -> bool {
        (self.data.len() as u64) < self.original_length as u64
    }
}

/// Sequential reader of captured frames.
pub trait FrameSource {
    /// Read the next frame.
    ///
    /// Returns `Ok(None)` at end of input.
    fn next_frame(&mut self) -> Result<Option<RawFrame>, Error>;

    /// Link type of the capture, when it has a single one.
    fn link_type(&self) -> Option<u16>;

    /// Read up to `max` frames into `buffer`, which is cleared first.
    ///
    /// Returns the number of frames read (0 means end of input).
    fn read_batch(&mut self, buffer: &mut Vec<RawFrame>, max: usize) -> Result<usize, Error> {
        buffer.clear();
        buffer.reserve(max);
        while buffer.len() < max {
            match self.next_frame()? {
                Some(frame) => buffer.push(frame),
                None => break,
            }
        }
        Ok(buffer.len())
    }
}

/// Frames held in memory.
#[derive(Clone, Debug)]
pub struct MemorySource {
    link_type: Option<u16>,
    frames: VecDeque<RawFrame>,
    next_number: u64,
}

impl Default for MemorySource {
    fn default() -> Self {
        Self {
            link_type: None,
            frames: VecDeque::new(),
            next_number: 1,
        }
    }
}

impl MemorySource {
    pub fn new(link_type: u16) -> Self {
        Self {
            link_type: Some(link_type),
            frames: VecDeque::new(),
            next_number: 1,
        }
    }

    /// Append a frame with the source's link type, numbered in order.
    pub fn push(&mut self, data: impl Into<Bytes>) -> &mut Self {
        let link_type = self.link_type.unwrap_or(0);
        let frame = RawFrame::new(self.next_number, link_type, data);
        self.push_frame(frame)
    }

    /// Append a prepared frame. A link type differing from the others makes
    /// the source mixed.
    pub fn push_frame(&mut self, frame: RawFrame) -> &mut Self {
        let first = self.next_number == 1;
        self.link_type = match self.link_type {
            None if first => Some(frame.link_type),
            Some(lt) if lt == frame.link_type => Some(lt),
            _ => None,
        };
        self.next_number = frame.frame_number.max(self.next_number) + 1;
        self.frames.push_back(frame);
        self
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for MemorySource {
    fn next_frame(&mut self) -> Result<Option<RawFrame>, Error> {
        Ok(self.frames.pop_front())
    }

    fn link_type(&self) -> Option<u16> {
        self.link_type
    }
}

impl FromIterator<RawFrame> for MemorySource {
    fn from_iter<I: IntoIterator<Item = RawFrame>>(iter: I) -> Self {
        let mut source = MemorySource::default();
        for frame in iter {
            source.push_frame(frame);
        }
        source
    }
}
