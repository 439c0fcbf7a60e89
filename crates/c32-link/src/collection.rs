//! Monitoring batches: one outbound message per task run.
//!
//! Layout after the response header: `{item_count u32}`, then per item
//! `{function u32, offset u16, size u16}`, then the concatenated value
//! bytes. Offsets index into the value bytes, so a batch is flushed
//! early when the next item would not be addressable by a `u16`.

use c32_blocks::IoValue;
use c32_core::{EntityId, FunctionId};

use crate::codec::Frame;
use crate::protocol::MessageType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Item {
    function: u32,
    offset: u16,
    size: u16,
}

#[derive(Debug, Default)]
pub struct MonitoringCollector {
    max_items: usize,
    items: Vec<Item>,
    data: Vec<u8>,
}

impl MonitoringCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a batch for up to `max_items` items. Buffers grow but never
    /// shrink, so steady-state collection does not allocate.
    pub fn begin(&mut self, max_items: usize) {
        self.max_items = max_items.max(1);
        self.items.clear();
        self.data.clear();
        if self.items.capacity() < self.max_items {
            self.items.reserve(self.max_items);
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Buffer one item. Returns a finished frame when the current batch
    /// had to be flushed to make room.
    pub fn add(&mut self, function: FunctionId, values: &[IoValue], timestamp_ms: u32) -> Option<Frame> {
        let size = values.len() * 4;
        let Ok(size16) = u16::try_from(size) else {
            return None;
        };
        let full = self.items.len() >= self.max_items
            || u16::try_from(self.data.len()).is_err();
        let flushed = if full { self.finish(timestamp_ms) } else { None };

        // offset is the start of this item's bytes
        let offset = u16::try_from(self.data.len()).unwrap_or(u16::MAX);
        self.items.push(Item {
            function: function.raw(),
            offset,
            size: size16,
        });
        for value in values {
            self.data.extend_from_slice(&value.to_le_bytes());
        }
        flushed
    }

    /// Serialize the batch and reset it. Empty batches produce nothing.
    pub fn finish(&mut self, timestamp_ms: u32) -> Option<Frame> {
        if self.items.is_empty() {
            return None;
        }
        let mut frame = Frame::response(MessageType::MonitoringReport.as_u32(), 0, true, timestamp_ms);
        frame.put_u32(self.items.len() as u32);
        for item in &self.items {
            frame
                .put_u32(item.function)
                .put_u16(item.offset)
                .put_u16(item.size);
        }
        frame.put_bytes(&self.data);
        self.items.clear();
        self.data.clear();
        Some(frame)
    }
}

/// One decoded monitoring item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportItem {
    pub function: u32,
    pub values: Vec<IoValue>,
}

/// Decode a monitoring payload (after the response header).
pub fn decode_report(payload: &[u8]) -> crate::LinkResult<Vec<ReportItem>> {
    use crate::codec::Reader;

    let mut r = Reader::new(payload);
    let count = r.u32("item count")? as usize;
    let mut index = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        let function = r.u32("item function")?;
        let offset = r.u16("item offset")? as usize;
        let size = r.u16("item size")? as usize;
        index.push((function, offset, size));
    }
    let data = r.rest();
    index
        .into_iter()
        .map(|(function, offset, size)| {
            let bytes = data
                .get(offset..offset + size)
                .ok_or(crate::LinkError::Truncated {
                    what: "item data",
                    needed: offset + size,
                    len: data.len(),
                })?;
            let values = bytes
                .chunks_exact(4)
                .map(|c| IoValue::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect();
            Ok(ReportItem { function, values })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{RESPONSE_HEADER_LEN, ResponseHeader};
    use c32_core::{EntityKind, Handle};

    fn fid(slot: u32) -> FunctionId {
        FunctionId::from_handle(Handle::new(EntityKind::Function, slot, 0)).unwrap()
    }

    fn values(n: usize, base: u32) -> Vec<IoValue> {
        (0..n as u32).map(|i| IoValue::from_u32(base + i)).collect()
    }

    #[test]
    fn batch_indexes_concatenated_values() {
        let mut c = MonitoringCollector::new();
        c.begin(2);
        assert!(c.add(fid(0), &values(3, 10), 5).is_none());
        assert!(c.add(fid(1), &values(2, 20), 5).is_none());
        let frame = c.finish(5).unwrap().into_bytes();
        assert_eq!(frame.len(), RESPONSE_HEADER_LEN + 4 + 2 * 8 + 5 * 4);

        let (header, payload) = ResponseHeader::decode(&frame).unwrap();
        assert_eq!(header.msg_type, 9);
        assert_eq!(header.request_id, 0);
        assert!(header.success());

        let items = decode_report(payload).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].function, fid(0).raw());
        assert_eq!(items[0].values, values(3, 10));
        assert_eq!(items[1].values, values(2, 20));
    }

    #[test]
    fn empty_batch_is_not_sent() {
        let mut c = MonitoringCollector::new();
        c.begin(4);
        assert!(c.finish(0).is_none());
    }

    #[test]
    fn item_capacity_flushes_early() {
        let mut c = MonitoringCollector::new();
        c.begin(1);
        assert!(c.add(fid(0), &values(1, 0), 0).is_none());
        let flushed = c.add(fid(1), &values(1, 1), 0).unwrap();
        let (_, payload) = ResponseHeader::decode(flushed.as_bytes()).unwrap();
        assert_eq!(decode_report(payload).unwrap().len(), 1);
        assert_eq!(c.len(), 1);
        let rest = c.finish(0).unwrap();
        let (_, payload) = ResponseHeader::decode(rest.as_bytes()).unwrap();
        assert_eq!(decode_report(payload).unwrap()[0].function, fid(1).raw());
    }

    #[test]
    fn offset_range_flushes_early() {
        let mut c = MonitoringCollector::new();
        c.begin(1000);
        // 510 values per item, 2040 bytes each
        let big = values(510, 0);
        let mut frames = 0;
        for slot in 0..40 {
            if c.add(fid(slot), &big, 0).is_some() {
                frames += 1;
            }
        }
        assert!(c.finish(0).is_some());
        assert_eq!(frames, 1);
    }
}
