use super::error::PersistenceError;
use super::header::{LOG_HEADER_LEN, LogHeader};
use crate::domain::LENGTH_PREFIX_LEN;
use bytes::Bytes;
use std::path::Path;

/// How a consumer learns a record's length before reading it.
pub trait RecordFraming {
    /// Length of the record starting at `remaining[0]`, prefix included.
    fn record_len(&self, remaining: &[u8]) -> Result<usize, PersistenceError>;

    /// Smallest length a well-formed record can declare.
    fn min_len(&self) -> usize {
        1
    }
}

/// Records carry their total length as a little-endian u32 at offset 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct LengthPrefixed;

impl RecordFraming for LengthPrefixed {
    fn record_len(&self, remaining: &[u8]) -> Result<usize, PersistenceError> {
        let prefix: [u8; LENGTH_PREFIX_LEN] = remaining
            .get(..LENGTH_PREFIX_LEN)
            .and_then(|p| p.try_into().ok())
            .ok_or(PersistenceError::Truncated {
                needed: LENGTH_PREFIX_LEN,
                available: remaining.len(),
            })?;
        Ok(u32::from_le_bytes(prefix) as usize)
    }

    fn min_len(&self) -> usize {
        LENGTH_PREFIX_LEN
    }
}

/// Every record has the same size.
#[derive(Debug, Clone, Copy)]
pub struct FixedSize(pub usize);

impl RecordFraming for FixedSize {
    fn record_len(&self, _remaining: &[u8]) -> Result<usize, PersistenceError> {
        Ok(self.0)
    }
}

/// Consumer-side decoder for a boot log file.
#[derive(Debug)]
pub struct LogReader<F = LengthPrefixed> {
    header: LogHeader,
    data: Bytes,
    offset: usize,
    framing: F,
    failed: bool,
}

impl LogReader<LengthPrefixed> {
    pub async fn open(path: &Path) -> Result<Self, PersistenceError> {
        Self::open_with(path, LengthPrefixed).await
    }
}

impl<F: RecordFraming> LogReader<F> {
    pub async fn open_with(path: &Path, framing: F) -> Result<Self, PersistenceError> {
        let data = tokio::fs::read(path).await?;
        Self::from_bytes(Bytes::from(data), framing)
    }

    pub fn from_bytes(data: Bytes, framing: F) -> Result<Self, PersistenceError> {
        let header = LogHeader::decode(&data)?;
        Ok(Self {
            header,
            data,
            offset: LOG_HEADER_LEN,
            framing,
            failed: false,
        })
    }

    pub fn header(&self) -> &LogHeader {
        &self.header
    }

    /// Byte offset of the next record.
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn next_record(&mut self) -> Result<Bytes, PersistenceError> {
        let remaining = &self.data[self.offset..];
        let len = self.framing.record_len(remaining)?;
        if len < self.framing.min_len() {
            return Err(PersistenceError::InvalidRecordLength {
                len,
                offset: self.offset,
            });
        }
        if len > remaining.len() {
            return Err(PersistenceError::Truncated {
                needed: len,
                available: remaining.len(),
            });
        }

        let record = self.data.slice(self.offset..self.offset + len);
        self.offset += len;
        Ok(record)
    }
}

impl<F: RecordFraming> Iterator for LogReader<F> {
    type Item = Result<Bytes, PersistenceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.data.len() {
            return None;
        }
        let result = self.next_record();
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}
