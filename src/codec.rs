//! Binary codecs and the dump record format.
//!
//! Every type stored in a cache that is dumped or loaded implements
//! [`Codec`]: a pair of functions turning a value into a chunk of bytes and
//! back. Built-in codecs cover fixed-width integers (plus `bool` and `char`),
//! sequences of them (`Vec`, `VecDeque`, `LinkedList`, boxed slices, arrays),
//! `String` and `bytes::Bytes`. User types compose these, see the `Codec`
//! docs for an example.
//!
//! ## Record format
//!
//! A dump is a plain concatenation of records, one per item:
//!
//! ```text
//! [key length: u64 LE][key bytes][value length: u64 LE][value bytes]
//! ```
//!
//! Items are emitted from the least recently used to the most recently used,
//! so replaying the records through `set` rebuilds the original order.
//! All integers, including the length prefixes, are little-endian.

use std::collections::{LinkedList, VecDeque};
use std::io::{self, Read};
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::mem;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{CacheError, CacheResult, CodecError};

/// Width of a record length prefix.
pub const LEN_WIDTH: usize = mem::size_of::<u64>();

/// Conversion of a value to and from one chunk of bytes.
///
/// `decode` always receives exactly the bytes `encode` produced for the
/// value: the record layer stores the chunk length, so a codec never has to
/// delimit itself.
///
/// # Example
/// ```
/// use bytes::BytesMut;
/// use typed_lru_cache::{Codec, CodecError};
///
/// #[derive(Debug, PartialEq)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// impl Codec for Point {
///     fn encode(&self, out: &mut BytesMut) {
///         self.x.encode(out);
///         self.y.encode(out);
///     }
///
///     fn decode(chunk: &[u8]) -> Result<Self, CodecError> {
///         if chunk.len() != 8 {
///             return Err(CodecError::Custom(format!("point needs 8 bytes, got {}", chunk.len())));
///         }
///         let (x, y) = chunk.split_at(4);
///         Ok(Point { x: i32::decode(x)?, y: i32::decode(y)? })
///     }
/// }
///
/// let point = Point { x: -3, y: 7 };
/// assert_eq!(Point::decode(&point.to_bytes()).unwrap(), point);
/// ```
pub trait Codec: Sized {
    /// Append the encoding of `self` to `out`.
    fn encode(&self, out: &mut BytesMut);

    /// Rebuild a value from a chunk produced by `encode`.
    fn decode(chunk: &[u8]) -> Result<Self, CodecError>;

    /// Rebuild a value from a shared chunk.
    ///
    /// Called when loading from a `Bytes` source. Types that can keep a view
    /// into the chunk (like `Bytes` itself) override this to avoid a copy.
    fn decode_shared(chunk: Bytes) -> Result<Self, CodecError> {
        Self::decode(&chunk)
    }

    /// Encode `self` into a fresh buffer.
    fn to_bytes(&self) -> Bytes {
        let mut out = BytesMut::new();
        self.encode(&mut out);
        out.freeze()
    }
}

/// Codec whose encoding always has the same width.
///
/// Sequences of fixed-width values are encoded without separators and split
/// back by `WIDTH`.
pub trait FixedWidth: Codec {
    /// Encoded width in bytes.
    const WIDTH: usize;
}

macro_rules! impl_integer_codec {
    ($($ty:ty),* $(,)?) => {$(
        impl Codec for $ty {
            fn encode(&self, out: &mut BytesMut) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn decode(chunk: &[u8]) -> Result<Self, CodecError> {
                let raw: [u8; mem::size_of::<$ty>()] =
                    chunk.try_into().map_err(|_| CodecError::Width {
                        type_name: stringify!($ty),
                        expected: mem::size_of::<$ty>(),
                        actual: chunk.len(),
                    })?;
                Ok(<$ty>::from_le_bytes(raw))
            }
        }

        impl FixedWidth for $ty {
            const WIDTH: usize = mem::size_of::<$ty>();
        }
    )*};
}

impl_integer_codec!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);

impl Codec for bool {
    fn encode(&self, out: &mut BytesMut) {
        out.put_u8(u8::from(*self));
    }

    fn decode(chunk: &[u8]) -> Result<Self, CodecError> {
        match chunk {
            [0] => Ok(false),
            [1] => Ok(true),
            [other] => Err(CodecError::InvalidValue {
                type_name: "bool",
                value: u32::from(*other),
            }),
            _ => Err(CodecError::Width {
                type_name: "bool",
                expected: 1,
                actual: chunk.len(),
            }),
        }
    }
}

impl FixedWidth for bool {
    const WIDTH: usize = 1;
}

impl Codec for char {
    fn encode(&self, out: &mut BytesMut) {
        out.extend_from_slice(&u32::from(*self).to_le_bytes());
    }

    fn decode(chunk: &[u8]) -> Result<Self, CodecError> {
        let raw: [u8; 4] = chunk.try_into().map_err(|_| CodecError::Width {
            type_name: "char",
            expected: 4,
            actual: chunk.len(),
        })?;
        let code = u32::from_le_bytes(raw);
        char::from_u32(code).ok_or(CodecError::InvalidValue {
            type_name: "char",
            value: code,
        })
    }
}

impl FixedWidth for char {
    const WIDTH: usize = 4;
}

/// A container that sequence decoding can fill one element at a time.
///
/// Containers that can only grow at the front set `HEAD_INSERTION`; the
/// decoder then reverses them once after the last element so the decoded
/// order matches the encoded one.
pub trait Accumulate<T>: Sized {
    /// Whether `accumulate` inserts at the front.
    const HEAD_INSERTION: bool = false;

    /// Create an empty container for `len` elements.
    fn with_len(len: usize) -> Self;

    /// Add one decoded element.
    fn accumulate(&mut self, item: T);

    /// Reverse the element order. Only called for head-insertion containers.
    fn reverse(&mut self) {}
}

impl<T> Accumulate<T> for Vec<T> {
    fn with_len(len: usize) -> Self {
        Vec::with_capacity(len)
    }

    fn accumulate(&mut self, item: T) {
        self.push(item);
    }
}

impl<T> Accumulate<T> for VecDeque<T> {
    fn with_len(len: usize) -> Self {
        VecDeque::with_capacity(len)
    }

    fn accumulate(&mut self, item: T) {
        self.push_back(item);
    }
}

impl<T> Accumulate<T> for LinkedList<T> {
    fn with_len(_len: usize) -> Self {
        LinkedList::new()
    }

    fn accumulate(&mut self, item: T) {
        self.push_back(item);
    }
}

/// Encode each element in order, without separators.
pub fn encode_sequence<'a, T, I>(items: I, out: &mut BytesMut)
where
    T: FixedWidth + 'a,
    I: IntoIterator<Item = &'a T>,
{
    for item in items {
        item.encode(out);
    }
}

/// Decode a chunk of back-to-back fixed-width elements into `C`.
pub fn decode_sequence<T, C>(chunk: &[u8]) -> Result<C, CodecError>
where
    T: FixedWidth,
    C: Accumulate<T>,
{
    if chunk.len() % T::WIDTH != 0 {
        return Err(CodecError::Misaligned {
            len: chunk.len(),
            width: T::WIDTH,
        });
    }

    let mut seq = C::with_len(chunk.len() / T::WIDTH);
    for raw in chunk.chunks_exact(T::WIDTH) {
        seq.accumulate(T::decode(raw)?);
    }
    if C::HEAD_INSERTION {
        seq.reverse();
    }
    Ok(seq)
}

impl<T: FixedWidth> Codec for Vec<T> {
    fn encode(&self, out: &mut BytesMut) {
        encode_sequence(self, out);
    }

    fn decode(chunk: &[u8]) -> Result<Self, CodecError> {
        decode_sequence(chunk)
    }
}

impl<T: FixedWidth> Codec for VecDeque<T> {
    fn encode(&self, out: &mut BytesMut) {
        encode_sequence(self, out);
    }

    fn decode(chunk: &[u8]) -> Result<Self, CodecError> {
        decode_sequence(chunk)
    }
}

impl<T: FixedWidth> Codec for LinkedList<T> {
    fn encode(&self, out: &mut BytesMut) {
        encode_sequence(self, out);
    }

    fn decode(chunk: &[u8]) -> Result<Self, CodecError> {
        decode_sequence(chunk)
    }
}

impl<T: FixedWidth> Codec for Box<[T]> {
    fn encode(&self, out: &mut BytesMut) {
        encode_sequence(self.iter(), out);
    }

    fn decode(chunk: &[u8]) -> Result<Self, CodecError> {
        decode_sequence::<T, Vec<T>>(chunk).map(Vec::into_boxed_slice)
    }
}

impl<T: FixedWidth, const N: usize> Codec for [T; N] {
    fn encode(&self, out: &mut BytesMut) {
        encode_sequence(self, out);
    }

    fn decode(chunk: &[u8]) -> Result<Self, CodecError> {
        let items: Vec<T> = decode_sequence(chunk)?;
        let actual = items.len();
        items
            .try_into()
            .map_err(|_| CodecError::ArrayLength { expected: N, actual })
    }
}

impl Codec for String {
    fn encode(&self, out: &mut BytesMut) {
        out.extend_from_slice(self.as_bytes());
    }

    fn decode(chunk: &[u8]) -> Result<Self, CodecError> {
        Ok(std::str::from_utf8(chunk)?.to_owned())
    }
}

impl Codec for Bytes {
    fn encode(&self, out: &mut BytesMut) {
        out.extend_from_slice(self);
    }

    fn decode(chunk: &[u8]) -> Result<Self, CodecError> {
        Ok(Bytes::copy_from_slice(chunk))
    }

    fn decode_shared(chunk: Bytes) -> Result<Self, CodecError> {
        Ok(chunk)
    }
}

/// Builds dump records, reusing one scratch buffer.
#[derive(Debug, Default)]
pub struct RecordEncoder {
    scratch: BytesMut,
}

impl RecordEncoder {
    /// Create an encoder with an empty scratch buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode one record and return its bytes.
    ///
    /// The returned slice is valid until the next call.
    pub fn encode<K: Codec, V: Codec>(&mut self, key: &K, value: &V) -> &[u8] {
        self.scratch.clear();
        Self::put_chunk(&mut self.scratch, key);
        Self::put_chunk(&mut self.scratch, value);
        &self.scratch
    }

    fn put_chunk<T: Codec>(buf: &mut BytesMut, item: &T) {
        let at = buf.len();
        buf.put_u64_le(0);
        item.encode(buf);
        let len = (buf.len() - at - LEN_WIDTH) as u64;
        buf[at..at + LEN_WIDTH].copy_from_slice(&len.to_le_bytes());
    }
}

/// Input that records are decoded from.
///
/// Implemented for contiguous slices, shared `Bytes` buffers and any
/// single-pass `io::Read`.
pub trait RecordSource {
    /// Read the next length prefix.
    ///
    /// Returns `Ok(None)` when the input is exhausted exactly at this point.
    fn next_len(&mut self) -> CacheResult<Option<u64>>;

    /// Consume a chunk of `len` bytes and decode it.
    fn decode_chunk<T: Codec>(&mut self, len: u64) -> CacheResult<T>;
}

fn checked_len(len: u64, available: usize) -> CacheResult<usize> {
    if len > available as u64 {
        return Err(CacheError::TruncatedChunk {
            expected: len,
            available: available as u64,
        });
    }
    Ok(len as usize)
}

/// Zero-copy source over a borrowed slice.
#[derive(Debug)]
pub struct SliceSource<'a> {
    rest: &'a [u8],
}

impl<'a> SliceSource<'a> {
    /// Read records from the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { rest: data }
    }
}

impl RecordSource for SliceSource<'_> {
    fn next_len(&mut self) -> CacheResult<Option<u64>> {
        match self.rest.len() {
            0 => Ok(None),
            got if got < LEN_WIDTH => Err(CacheError::TruncatedLength { got }),
            _ => Ok(Some(self.rest.get_u64_le())),
        }
    }

    fn decode_chunk<T: Codec>(&mut self, len: u64) -> CacheResult<T> {
        let len = checked_len(len, self.rest.len())?;
        let (chunk, rest) = self.rest.split_at(len);
        self.rest = rest;
        Ok(T::decode(chunk)?)
    }
}

/// Zero-copy source over a shared buffer; chunks are `Bytes` views.
#[derive(Debug)]
pub struct BytesSource {
    rest: Bytes,
}

impl BytesSource {
    /// Read records from the start of `data`.
    pub fn new(data: Bytes) -> Self {
        Self { rest: data }
    }
}

impl RecordSource for BytesSource {
    fn next_len(&mut self) -> CacheResult<Option<u64>> {
        match self.rest.len() {
            0 => Ok(None),
            got if got < LEN_WIDTH => Err(CacheError::TruncatedLength { got }),
            _ => Ok(Some(self.rest.get_u64_le())),
        }
    }

    fn decode_chunk<T: Codec>(&mut self, len: u64) -> CacheResult<T> {
        let len = checked_len(len, self.rest.len())?;
        let chunk = self.rest.split_to(len);
        Ok(T::decode_shared(chunk)?)
    }
}

/// Single-pass source over a reader.
///
/// Each chunk is copied into a reusable buffer before decoding. Nothing is
/// read beyond the current record.
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: R,
    chunk: Vec<u8>,
}

impl<R: Read> ReaderSource<R> {
    /// Read records from `reader`, one chunk at a time.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            chunk: Vec::new(),
        }
    }
}

impl<R: Read> RecordSource for ReaderSource<R> {
    fn next_len(&mut self) -> CacheResult<Option<u64>> {
        let mut raw = [0u8; LEN_WIDTH];
        let mut got = 0;
        while got < LEN_WIDTH {
            match self.reader.read(&mut raw[got..]) {
                Ok(0) => break,
                Ok(n) => got += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
        match got {
            0 => Ok(None),
            LEN_WIDTH => Ok(Some(u64::from_le_bytes(raw))),
            got => Err(CacheError::TruncatedLength { got }),
        }
    }

    fn decode_chunk<T: Codec>(&mut self, len: u64) -> CacheResult<T> {
        self.chunk.clear();
        // `take` bounds the read, so a corrupt prefix cannot force a huge allocation.
        let read = self.reader.by_ref().take(len).read_to_end(&mut self.chunk)?;
        if (read as u64) < len {
            return Err(CacheError::TruncatedChunk {
                expected: len,
                available: read as u64,
            });
        }
        Ok(T::decode(&self.chunk)?)
    }
}

/// Iterator decoding `(key, value)` records from a source.
///
/// Yields `Err` once on malformed input and then stops.
///
/// ```
/// use typed_lru_cache::{Cache, RecordDecoder};
///
/// let mut cache: Cache<u32, String> = Cache::default();
/// cache.set(1, "one".to_string());
/// cache.set(2, "two".to_string());
/// let dump = cache.dump();
///
/// // Least recently used first.
/// let records: Vec<(u32, String)> = RecordDecoder::from_slice(&dump)
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(records, vec![(1, "one".to_string()), (2, "two".to_string())]);
/// ```
#[derive(Debug)]
pub struct RecordDecoder<K, V, Src> {
    source: Src,
    finished: bool,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V, Src: RecordSource> RecordDecoder<K, V, Src> {
    /// Decode records from `source`.
    pub fn new(source: Src) -> Self {
        Self {
            source,
            finished: false,
            _marker: PhantomData,
        }
    }
}

impl<'a, K, V> RecordDecoder<K, V, SliceSource<'a>> {
    /// Decode from a contiguous slice with zero-copy chunk views.
    pub fn from_slice(data: &'a [u8]) -> Self {
        Self::new(SliceSource::new(data))
    }
}

impl<K, V> RecordDecoder<K, V, BytesSource> {
    /// Decode from a shared buffer; chunks are handed out as `Bytes` views.
    pub fn from_bytes(data: Bytes) -> Self {
        Self::new(BytesSource::new(data))
    }
}

impl<K, V, R: Read> RecordDecoder<K, V, ReaderSource<R>> {
    /// Decode from a single-pass reader.
    pub fn from_reader(reader: R) -> Self {
        Self::new(ReaderSource::new(reader))
    }
}

impl<K: Codec, V: Codec, Src: RecordSource> RecordDecoder<K, V, Src> {
    fn read_record(&mut self) -> CacheResult<Option<(K, V)>> {
        let Some(key_len) = self.source.next_len()? else {
            return Ok(None);
        };
        let key = self.source.decode_chunk(key_len)?;
        let value_len = self
            .source
            .next_len()?
            .ok_or(CacheError::TruncatedLength { got: 0 })?;
        let value = self.source.decode_chunk(value_len)?;
        Ok(Some((key, value)))
    }
}

impl<K: Codec, V: Codec, Src: RecordSource> Iterator for RecordDecoder<K, V, Src> {
    type Item = CacheResult<(K, V)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

impl<K: Codec, V: Codec, Src: RecordSource> FusedIterator for RecordDecoder<K, V, Src> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip<T: Codec>(value: &T) -> T {
        T::decode(&value.to_bytes()).unwrap()
    }

    #[test]
    fn test_integers_are_little_endian() {
        assert_eq!(&0x0102_0304u32.to_bytes()[..], &[4, 3, 2, 1]);
        assert_eq!(&(-2i16).to_bytes()[..], &[0xfe, 0xff]);
        assert_eq!(u64::WIDTH, 8);
        assert_eq!(roundtrip(&u128::MAX), u128::MAX);
        assert_eq!(roundtrip(&i64::MIN), i64::MIN);
    }

    #[test]
    fn test_integer_wrong_width() {
        let err = u32::decode(&[1, 2, 3]).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Width {
                type_name: "u32",
                expected: 4,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_bool_and_char() {
        assert!(roundtrip(&true));
        assert!(!roundtrip(&false));
        assert!(matches!(
            bool::decode(&[2]),
            Err(CodecError::InvalidValue { type_name: "bool", value: 2 })
        ));

        assert_eq!(roundtrip(&'ж'), 'ж');
        assert!(matches!(
            char::decode(&0xD800u32.to_le_bytes()),
            Err(CodecError::InvalidValue { type_name: "char", .. })
        ));
    }

    #[test]
    fn test_sequences_keep_order() {
        let vec = vec![1u16, 2, 3, 500];
        assert_eq!(&vec.to_bytes()[..], &[1, 0, 2, 0, 3, 0, 0xf4, 0x01]);
        assert_eq!(roundtrip(&vec), vec);

        let deque: VecDeque<i32> = [-1, 0, 1].into_iter().collect();
        assert_eq!(roundtrip(&deque), deque);

        let list: LinkedList<u64> = [9, 8, 7].into_iter().collect();
        assert_eq!(roundtrip(&list), list);

        let boxed: Box<[u8]> = vec![5, 6].into_boxed_slice();
        assert_eq!(roundtrip(&boxed), boxed);

        let array = [10u32, 20, 30];
        assert_eq!(roundtrip(&array), array);

        let empty: Vec<u64> = Vec::new();
        assert_eq!(roundtrip(&empty), empty);
    }

    #[test]
    fn test_sequence_misaligned() {
        let err = Vec::<u32>::decode(&[0; 6]).unwrap_err();
        assert!(matches!(err, CodecError::Misaligned { len: 6, width: 4 }));
    }

    #[test]
    fn test_array_length_mismatch() {
        let err = <[u16; 3]>::decode(&[0; 4]).unwrap_err();
        assert!(matches!(
            err,
            CodecError::ArrayLength {
                expected: 3,
                actual: 2
            }
        ));
    }

    /// Singly linked stack that can only grow at the front.
    #[derive(Debug, PartialEq)]
    struct Stack(Option<Box<(u32, Stack)>>);

    impl Stack {
        fn to_vec(&self) -> Vec<u32> {
            let mut out = Vec::new();
            let mut node = &self.0;
            while let Some(cell) = node {
                out.push(cell.0);
                node = &cell.1 .0;
            }
            out
        }
    }

    impl Accumulate<u32> for Stack {
        const HEAD_INSERTION: bool = true;

        fn with_len(_len: usize) -> Self {
            Stack(None)
        }

        fn accumulate(&mut self, item: u32) {
            let rest = Stack(self.0.take());
            self.0 = Some(Box::new((item, rest)));
        }

        fn reverse(&mut self) {
            let items = self.to_vec();
            *self = Stack(None);
            for item in items {
                self.accumulate(item);
            }
        }
    }

    #[test]
    fn test_head_insertion_container_is_reversed_once() {
        let mut out = BytesMut::new();
        encode_sequence(&[1u32, 2, 3], &mut out);

        let stack: Stack = decode_sequence(&out).unwrap();
        assert_eq!(stack.to_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn test_string_and_bytes() {
        let s = "héllo wörld".to_string();
        assert_eq!(roundtrip(&s), s);
        assert!(matches!(
            String::decode(&[0xff, 0xfe]),
            Err(CodecError::Utf8(_))
        ));

        let shared = Bytes::from_static(b"\x00\x01binary");
        assert_eq!(roundtrip(&shared), shared);
        let view = Bytes::decode_shared(shared.slice(2..)).unwrap();
        assert_eq!(&view[..], b"binary");
    }

    #[test]
    fn test_record_layout() {
        let mut encoder = RecordEncoder::new();
        let record = encoder.encode(&7u16, &"ab".to_string()).to_vec();

        let mut expected = Vec::new();
        expected.extend_from_slice(&2u64.to_le_bytes());
        expected.extend_from_slice(&[7, 0]);
        expected.extend_from_slice(&2u64.to_le_bytes());
        expected.extend_from_slice(b"ab");
        assert_eq!(record, expected);

        // The scratch buffer is reset between records.
        let second = encoder.encode(&1u8, &true).to_vec();
        assert_eq!(second.len(), 2 * LEN_WIDTH + 2);
    }

    fn sample_dump() -> Vec<u8> {
        let mut encoder = RecordEncoder::new();
        let mut dump = Vec::new();
        dump.extend_from_slice(encoder.encode(&1u32, &"one".to_string()));
        dump.extend_from_slice(encoder.encode(&2u32, &"two".to_string()));
        dump
    }

    #[test]
    fn test_decoder_sources_agree() {
        let dump = sample_dump();
        let expected = vec![(1u32, "one".to_string()), (2u32, "two".to_string())];

        let from_slice: Vec<(u32, String)> = RecordDecoder::from_slice(&dump)
            .collect::<CacheResult<_>>()
            .unwrap();
        let from_bytes: Vec<(u32, String)> = RecordDecoder::from_bytes(Bytes::from(dump.clone()))
            .collect::<CacheResult<_>>()
            .unwrap();
        let from_reader: Vec<(u32, String)> = RecordDecoder::from_reader(&dump[..])
            .collect::<CacheResult<_>>()
            .unwrap();

        assert_eq!(from_slice, expected);
        assert_eq!(from_bytes, expected);
        assert_eq!(from_reader, expected);
    }

    #[test]
    fn test_decoder_truncated_prefix() {
        let mut dump = sample_dump();
        dump.truncate(dump.len() - 3 - 5);

        let mut decoder = RecordDecoder::<u32, String, _>::from_slice(&dump);
        assert!(decoder.next().unwrap().is_ok());
        assert!(matches!(
            decoder.next(),
            Some(Err(CacheError::TruncatedLength { got: 3 }))
        ));
        assert!(decoder.next().is_none());
    }

    #[test]
    fn test_decoder_truncated_chunk() {
        let mut dump = sample_dump();
        dump.truncate(dump.len() - 1);

        let mut decoder = RecordDecoder::<u32, String, _>::from_reader(&dump[..]);
        assert!(decoder.next().unwrap().is_ok());
        assert!(matches!(
            decoder.next(),
            Some(Err(CacheError::TruncatedChunk {
                expected: 3,
                available: 2
            }))
        ));
        assert!(decoder.next().is_none());
    }

    #[test]
    fn test_decoder_missing_value() {
        let mut encoder = RecordEncoder::new();
        let record = encoder.encode(&1u32, &2u32).to_vec();
        let key_only = &record[..LEN_WIDTH + 4];

        let mut decoder = RecordDecoder::<u32, u32, _>::from_slice(key_only);
        assert!(matches!(
            decoder.next(),
            Some(Err(CacheError::TruncatedLength { got: 0 }))
        ));
    }

    #[test]
    fn test_decoder_huge_prefix() {
        let mut dump = Vec::new();
        dump.extend_from_slice(&u64::MAX.to_le_bytes());
        dump.extend_from_slice(&[1, 2, 3]);

        let mut slice = RecordDecoder::<u32, u32, _>::from_slice(&dump);
        assert!(matches!(
            slice.next(),
            Some(Err(CacheError::TruncatedChunk { available: 3, .. }))
        ));

        let mut reader = RecordDecoder::<u32, u32, _>::from_reader(&dump[..]);
        assert!(matches!(
            reader.next(),
            Some(Err(CacheError::TruncatedChunk { available: 3, .. }))
        ));
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        let mut decoder = RecordDecoder::<u32, u32, _>::from_slice(&[]);
        assert!(decoder.next().is_none());
    }
}
