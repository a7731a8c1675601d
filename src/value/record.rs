//! Record reader for the value store.
//!
//! A value store built for bulk loading holds records back to back:
//!
//! ```text
//! <keyLen>,<keyBytes>,<valueLen>,<valueBytes><keyLen>,<keyBytes>,...
//! ```
//!
//! Lengths are ASCII decimal and end with a comma. One comma follows the key
//! bytes. Nothing follows the value bytes. [`RecordReader`] walks these
//! records and yields each key with the descriptor of its value, skipping the
//! value bytes instead of reading them.

use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};

use crate::common::{Error, Result};
use crate::value::{ValueDescriptor, ValueStore};

/// Longest decimal length accepted (`u64::MAX` has 20 digits).
const MAX_LENGTH_DIGITS: u64 = 20;

/// One record: a key and where its value lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: Vec<u8>,
    pub value: ValueDescriptor,
}

/// `Read + Seek` over a [`ValueStore`] using positioned reads.
struct StoreCursor<'a, V: ValueStore + ?Sized> {
    store: &'a V,
    pos: u64,
    len: u64,
}

impl<V: ValueStore + ?Sized> Read for StoreCursor<'_, V> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.len.saturating_sub(self.pos);
        let n = (buf.len() as u64).min(remaining) as usize;
        if n == 0 {
            return Ok(0);
        }
        self.store
            .read_at(self.pos, &mut buf[..n])
            .map_err(io::Error::other)?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl<V: ValueStore + ?Sized> Seek for StoreCursor<'_, V> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(p) => Some(p),
            SeekFrom::End(d) => self.len.checked_add_signed(d),
            SeekFrom::Current(d) => self.pos.checked_add_signed(d),
        };
        let target = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek out of range")
        })?;
        self.pos = target;
        Ok(target)
    }
}

/// Streaming parser over the records of a value store.
///
/// Yields `Result<Record>`. The first error ends the iteration: a malformed
/// store cannot be resynchronized.
///
/// # Example
/// ```
/// use blobindex::value::{RecordReader, ValueDescriptor};
///
/// let store = b"3,abc,5,hello1,z,0,".to_vec();
/// let records: Vec<_> = RecordReader::new(&store, 16, 1024)
///     .unwrap()
///     .collect::<Result<_, _>>()
///     .unwrap();
///
/// assert_eq!(records[0].key, b"abc");
/// assert_eq!(records[0].value, ValueDescriptor::new(5, 8));
/// assert_eq!(records[1].value, ValueDescriptor::new(0, 19));
/// ```
pub struct RecordReader<'a, V: ValueStore + ?Sized> {
    reader: BufReader<StoreCursor<'a, V>>,
    /// Offset of the next unread byte.
    pos: u64,
    len: u64,
    key_max_len: usize,
    max_value_len: u64,
    done: bool,
}

impl<'a, V: ValueStore + ?Sized> RecordReader<'a, V> {
    /// Start reading records at the beginning of `store`.
    ///
    /// Keys longer than `key_max_len` or values longer than `max_value_len`
    /// end the iteration with `Error::CapacityExceeded`.
    pub fn new(store: &'a V, key_max_len: usize, max_value_len: u64) -> Result<Self> {
        let len = store.len()?;
        let cursor = StoreCursor { store, pos: 0, len };
        Ok(Self {
            reader: BufReader::new(cursor),
            pos: 0,
            len,
            key_max_len,
            max_value_len,
            done: false,
        })
    }

    /// Offset of the next record.
    pub fn position(&self) -> u64 {
        self.pos
    }

    fn malformed(&self, reason: impl Into<String>) -> Error {
        Error::MalformedRecord {
            offset: self.pos,
            reason: reason.into(),
        }
    }

    /// Parse a comma-terminated decimal length.
    fn read_length(&mut self, field: &str) -> Result<u64> {
        let mut raw = Vec::with_capacity(8);
        let n = self
            .reader
            .by_ref()
            .take(MAX_LENGTH_DIGITS + 1)
            .read_until(b',', &mut raw)?;

        if raw.last() != Some(&b',') {
            return Err(if n as u64 > MAX_LENGTH_DIGITS {
                self.malformed(format!("{field} length has too many digits"))
            } else {
                self.malformed(format!("{field} length is not terminated by a comma"))
            });
        }
        raw.pop();

        if raw.is_empty() {
            return Err(self.malformed(format!("empty {field} length")));
        }
        if !raw.iter().all(u8::is_ascii_digit) {
            return Err(self.malformed(format!("non-digit in {field} length")));
        }

        let mut value: u64 = 0;
        for digit in &raw {
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(u64::from(digit - b'0')))
                .ok_or_else(|| self.malformed(format!("{field} length overflows")))?;
        }

        self.pos += n as u64;
        Ok(value)
    }

    fn check_in_bounds(&self, length: u64, field: &str) -> Result<()> {
        match self.pos.checked_add(length) {
            Some(end) if end <= self.len => Ok(()),
            _ => Err(self.malformed(format!(
                "{field} of {length} bytes runs past end of store ({} bytes)",
                self.len
            ))),
        }
    }

    fn read_record(&mut self) -> Result<Record> {
        let key_len = self.read_length("key")?;
        if key_len > self.key_max_len as u64 {
            return Err(Error::CapacityExceeded {
                what: "key",
                len: key_len,
                max: self.key_max_len as u64,
            });
        }
        self.check_in_bounds(key_len, "key")?;

        let mut key = vec![0u8; key_len as usize];
        self.reader.read_exact(&mut key)?;
        self.pos += key_len;

        let mut comma = [0u8; 1];
        match self.reader.read(&mut comma)? {
            1 if comma[0] == b',' => self.pos += 1,
            1 => return Err(self.malformed("key is not followed by a comma")),
            _ => return Err(self.malformed("store ends after key")),
        }

        let value_len = self.read_length("value")?;
        if value_len > self.max_value_len {
            return Err(Error::CapacityExceeded {
                what: "value",
                len: value_len,
                max: self.max_value_len,
            });
        }
        self.check_in_bounds(value_len, "value")?;

        let value = ValueDescriptor::new(value_len, self.pos);
        let skip = i64::try_from(value_len)
            .map_err(|_| self.malformed("value length exceeds seekable range"))?;
        self.reader.seek_relative(skip)?;
        self.pos += value_len;

        Ok(Record { key, value })
    }
}

impl<V: ValueStore + ?Sized> Iterator for RecordReader<'_, V> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.pos >= self.len {
            self.done = true;
            return None;
        }

        let record = self.read_record();
        if record.is_err() {
            self.done = true;
        }
        Some(record)
    }
}

impl<V: ValueStore + ?Sized> std::iter::FusedIterator for RecordReader<'_, V> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(store: &[u8]) -> Vec<Result<Record>> {
        let store = store.to_vec();
        RecordReader::new(&store, 16, 1 << 20).unwrap().collect()
    }

    fn reason(result: &Result<Record>) -> String {
        match result {
            Err(Error::MalformedRecord { reason, .. }) => reason.clone(),
            other => panic!("expected MalformedRecord, got {:?}", other),
        }
    }

    #[test]
    fn test_reads_records_back_to_back() {
        let store = b"1,a,3,xyz2,bc,0,3,def,1,!".to_vec();
        let records: Vec<Record> = RecordReader::new(&store, 16, 1024)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].key, b"a");
        assert_eq!(records[0].value, ValueDescriptor::new(3, 6));
        assert_eq!(records[1].key, b"bc");
        assert_eq!(records[1].value, ValueDescriptor::new(0, 16));
        assert_eq!(records[2].key, b"def");
        assert_eq!(records[2].value, ValueDescriptor::new(1, 24));
        assert_eq!(store.read_value(records[0].value).unwrap(), b"xyz");
    }

    #[test]
    fn test_position_tracks_next_record() {
        let store = b"1,a,3,xyz2,bc,0,".to_vec();
        let mut reader = RecordReader::new(&store, 16, 1024).unwrap();
        assert_eq!(reader.position(), 0);

        reader.next().unwrap().unwrap();
        assert_eq!(reader.position(), 9);
        reader.next().unwrap().unwrap();
        assert_eq!(reader.position(), 16);
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_key_may_contain_commas() {
        let records = read_all(b"3,a,b,2,hi");
        let record = records[0].as_ref().unwrap();
        assert_eq!(record.key, b"a,b");
        assert_eq!(record.value, ValueDescriptor::new(2, 8));
    }

    #[test]
    fn test_empty_store_yields_nothing() {
        assert!(read_all(b"").is_empty());
    }

    #[test]
    fn test_skips_large_values() {
        let mut store = b"1,k,100000,".to_vec();
        store.extend(std::iter::repeat(b'v').take(100_000));
        store.extend_from_slice(b"1,m,1,w");

        let records = read_all(&store);
        assert_eq!(records.len(), 2);
        let last = records[1].as_ref().unwrap();
        assert_eq!(last.key, b"m");
        assert_eq!(last.value, ValueDescriptor::new(1, store.len() as u64 - 1));
    }

    #[test]
    fn test_non_digit_length() {
        let records = read_all(b"x,a,1,v");
        assert_eq!(records.len(), 1);
        assert!(reason(&records[0]).contains("non-digit"));
    }

    #[test]
    fn test_empty_length() {
        let records = read_all(b",a,1,v");
        assert!(reason(&records[0]).contains("empty key length"));
    }

    #[test]
    fn test_missing_comma_after_length() {
        let records = read_all(b"12");
        assert!(reason(&records[0]).contains("not terminated"));
    }

    #[test]
    fn test_missing_comma_after_key() {
        let records = read_all(b"1,ab1,v");
        assert!(reason(&records[0]).contains("not followed by a comma"));
    }

    #[test]
    fn test_value_past_end() {
        let records = read_all(b"1,a,1,v1,b,9,short");
        assert_eq!(records.len(), 2);
        assert!(records[0].is_ok());
        let err = &records[1];
        assert!(reason(err).contains("past end"));
        assert!(matches!(err, Err(Error::MalformedRecord { offset: 13, .. })));
    }

    #[test]
    fn test_length_overflow() {
        let records = read_all(b"99999999999999999999,a");
        assert!(reason(&records[0]).contains("overflows"));
    }

    #[test]
    fn test_too_many_digits() {
        let records = read_all(b"000000000000000000001,a");
        assert!(reason(&records[0]).contains("too many digits"));
    }

    #[test]
    fn test_key_too_long() {
        let store = b"4,abcd,0,".to_vec();
        let mut reader = RecordReader::new(&store, 3, 1024).unwrap();
        assert!(matches!(
            reader.next(),
            Some(Err(Error::CapacityExceeded {
                what: "key",
                len: 4,
                max: 3
            }))
        ));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_value_too_long() {
        let store = b"1,a,5,abcde".to_vec();
        let mut reader = RecordReader::new(&store, 16, 4).unwrap();
        assert!(matches!(
            reader.next(),
            Some(Err(Error::CapacityExceeded { what: "value", .. }))
        ));
    }

    #[test]
    fn test_stops_after_first_error() {
        let records = read_all(b"1,a,1,vz,b,1,w1,c,1,x");
        assert_eq!(records.len(), 2);
        assert!(records[0].is_ok());
        assert!(records[1].is_err());
    }
}
