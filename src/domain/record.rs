use bytes::{BufMut, Bytes, BytesMut};
use std::collections::LinkedList;

use super::error::BootLogError;

/// Size of the little-endian length prefix written by [`Record::length_prefixed`].
pub const LENGTH_PREFIX_LEN: usize = 4;

/// One already-formatted monitoring entry queued for persistence.
///
/// The payload is opaque to the engine. Only its byte length matters, and the
/// whole payload is written to the log file as one contiguous append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    payload: Bytes,
}

impl Record {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// Builds a record whose first four bytes carry its total length
    /// (prefix included), so consumers can frame it without a delimiter.
    pub fn length_prefixed(body: &[u8]) -> Result<Self, BootLogError> {
        let total = body.len() + LENGTH_PREFIX_LEN;
        let declared =
            u32::try_from(total).map_err(|_| BootLogError::RecordTooLarge { len: total })?;

        let mut buf = BytesMut::with_capacity(total);
        buf.put_u32_le(declared);
        buf.put_slice(body);
        Ok(Self {
            payload: buf.freeze(),
        })
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn into_payload(self) -> Bytes {
        self.payload
    }
}

impl From<Bytes> for Record {
    fn from(payload: Bytes) -> Self {
        Self { payload }
    }
}

impl From<Vec<u8>> for Record {
    fn from(payload: Vec<u8>) -> Self {
        Self::new(payload)
    }
}

/// Owning FIFO of records.
///
/// A record lives in exactly one list at a time: moving records between lists
/// goes through [`RecordList::detach`] and [`RecordList::append`], both of which
/// transfer ownership of every node without copying or allocating.
#[derive(Debug, Default)]
pub struct RecordList {
    records: LinkedList<Record>,
    byte_len: usize,
}

impl RecordList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_back(&mut self, record: Record) {
        self.byte_len += record.len();
        self.records.push_back(record);
    }

    pub fn pop_front(&mut self) -> Option<Record> {
        let record = self.records.pop_front()?;
        self.byte_len -= record.len();
        Some(record)
    }

    /// Swaps the contents out for an empty list and returns them. O(1).
    pub fn detach(&mut self) -> RecordList {
        std::mem::take(self)
    }

    /// Splices all of `source` onto the tail of `self`, leaving `source` empty. O(1).
    pub fn append(&mut self, source: &mut RecordList) {
        self.byte_len += std::mem::take(&mut source.byte_len);
        self.records.append(&mut source.records);
    }

    /// Drops records from the head until at most `max` remain.
    /// Returns how many were dropped.
    pub fn truncate_front(&mut self, max: usize) -> usize {
        let mut dropped = 0;
        while self.records.len() > max {
            if self.pop_front().is_none() {
                break;
            }
            dropped += 1;
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sum of the payload lengths of every queued record.
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }
}

impl IntoIterator for RecordList {
    type Item = Record;
    type IntoIter = std::collections::linked_list::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl FromIterator<Record> for RecordList {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let mut list = RecordList::new();
        for record in iter {
            list.push_back(record);
        }
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_of(tags: &[&str]) -> RecordList {
        tags.iter().map(|t| Record::new(t.as_bytes().to_vec())).collect()
    }

    fn tags(list: &RecordList) -> Vec<String> {
        list.iter()
            .map(|r| String::from_utf8(r.payload().to_vec()).unwrap())
            .collect()
    }

    #[test]
    fn test_length_prefixed_declares_total_length() {
        let record = Record::length_prefixed(b"hello").unwrap();
        assert_eq!(record.len(), 9);
        assert_eq!(&record.payload()[..4], &9u32.to_le_bytes());
        assert_eq!(&record.payload()[4..], b"hello");
    }

    #[test]
    fn test_detach_leaves_empty_list() {
        let mut list = list_of(&["a", "b"]);
        let detached = list.detach();

        assert!(list.is_empty());
        assert_eq!(list.byte_len(), 0);
        assert_eq!(tags(&detached), vec!["a", "b"]);
    }

    #[test]
    fn test_detach_then_insert_holds_only_new_record() {
        let mut list = list_of(&["a", "b", "c"]);
        let _ = list.detach();
        list.push_back(Record::new(b"d".to_vec()));

        assert_eq!(tags(&list), vec!["d"]);
        assert_eq!(list.byte_len(), 1);
    }

    #[test]
    fn test_append_moves_to_tail_and_empties_source() {
        let mut dest = list_of(&["a", "b"]);
        let mut source = list_of(&["c", "dd"]);
        dest.append(&mut source);

        assert_eq!(tags(&dest), vec!["a", "b", "c", "dd"]);
        assert_eq!(dest.byte_len(), 5);
        assert!(source.is_empty());
        assert_eq!(source.byte_len(), 0);
    }

    #[test]
    fn test_append_empty_source_is_noop() {
        let mut dest = list_of(&["a"]);
        let mut source = RecordList::new();
        dest.append(&mut source);

        assert_eq!(tags(&dest), vec!["a"]);
    }

    #[test]
    fn test_truncate_front_drops_oldest() {
        let mut list = list_of(&["a", "b", "c", "d"]);
        let dropped = list.truncate_front(2);

        assert_eq!(dropped, 2);
        assert_eq!(tags(&list), vec!["c", "d"]);
        assert_eq!(list.truncate_front(10), 0);
    }
}
