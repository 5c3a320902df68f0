//! The JSON envelope used by file, HTTP and object storage sources.
//!
//! On the wire this is `{"Flags": [ ... ]}`, which is also what the cache's
//! export produces, so an exported file can be fed straight back in through
//! the `json_file` driver.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use flagcache_entity::Flag;
use flagcache_entity::models::null_as_default;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest payload any source will buffer before giving up.
pub const MAX_ENVELOPE_BYTES: u64 = 64 * 1024 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "Flags", default, deserialize_with = "null_as_default")]
    pub flags: Vec<Flag>,
}
impl Envelope {
    pub fn new(flags: Vec<Flag>) -> Self {
        Self { flags }
    }

    pub fn into_flags(self) -> Vec<Flag> {
        self.flags
    }

    /// Consume `reader` to the end and decode it.
    ///
    /// The reader is taken by value and dropped before this returns, whether
    /// decoding succeeds or not.
    pub async fn read<R>(reader: R) -> Result<Self>
    where
        R: AsyncRead + Unpin,
    {
        Self::read_limited(reader, MAX_ENVELOPE_BYTES).await
    }

    /// [`read`](Self::read) with a custom size bound. Reading stops one byte
    /// past `max_bytes`, so an oversized payload is never fully buffered.
    pub async fn read_limited<R>(reader: R, max_bytes: u64) -> Result<Self>
    where
        R: AsyncRead + Unpin,
    {
        let mut bytes = Vec::new();
        let mut limited = reader.take(max_bytes.saturating_add(1));
        limited.read_to_end(&mut bytes).await.map_err(ErrorKind::Io)?;
        drop(limited);
        Self::from_slice_limited(&bytes, max_bytes)
    }

    /// Decode an already-buffered payload.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Self::from_slice_limited(bytes, MAX_ENVELOPE_BYTES)
    }

    pub fn from_slice_limited(bytes: &[u8], max_bytes: u64) -> Result<Self> {
        if bytes.len() as u64 > max_bytes {
            exn::bail!(ErrorKind::TooLarge(max_bytes));
        }
        serde_json::from_slice(bytes).or_raise(|| ErrorKind::Decode)
    }

    /// Encode as pretty-printed JSON.
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).or_raise(|| ErrorKind::Encode)
    }

    /// Encode and write to `writer`, flushing before returning.
    pub async fn write<W>(&self, mut writer: W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let bytes = self.to_vec()?;
        writer.write_all(&bytes).await.map_err(ErrorKind::Io)?;
        writer.flush().await.map_err(ErrorKind::Io)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    /// Reader that records when it gets dropped.
    struct Tracked {
        inner: Cursor<Vec<u8>>,
        dropped: Arc<AtomicBool>,
    }
    impl AsyncRead for Tracked {
        fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
            Pin::new(&mut self.inner).poll_read(cx, buf)
        }
    }
    impl Drop for Tracked {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    fn tracked(bytes: &[u8]) -> (Tracked, Arc<AtomicBool>) {
        let dropped = Arc::new(AtomicBool::new(false));
        (Tracked { inner: Cursor::new(bytes.to_vec()), dropped: dropped.clone() }, dropped)
    }

    #[tokio::test]
    async fn test_read_envelope() {
        let json = br#"{"Flags": [{"ID": 1, "Key": "a"}, {"ID": 2}, {"Key": "b"}]}"#;
        let (reader, dropped) = tracked(json);
        let envelope = Envelope::read(reader).await.unwrap();
        assert!(dropped.load(Ordering::SeqCst));
        assert_eq!(envelope.flags.len(), 3);
        assert_eq!(envelope.flags[0].key, "a");
        assert_eq!(envelope.flags[1].id, 2);
        assert_eq!(envelope.flags[2].id, 0);
    }

    #[tokio::test]
    async fn test_read_malformed_releases_reader() {
        let (reader, dropped) = tracked(br#"{"Flags": [{"ID": "#);
        let err = Envelope::read(reader).await.unwrap_err();
        assert!(matches!(*err, ErrorKind::Decode));
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[test]
    fn test_missing_flags_is_empty() {
        assert_eq!(Envelope::from_slice(b"{}").unwrap(), Envelope::default());
        assert_eq!(Envelope::from_slice(br#"{"Flags": null}"#).unwrap(), Envelope::default());
    }

    #[tokio::test]
    async fn test_read_oversized_releases_reader() {
        let payload = format!(r#"{{"Flags": [{{"ID": 1, "Key": "{}"}}]}}"#, "x".repeat(64));
        let (reader, dropped) = tracked(payload.as_bytes());
        let err = Envelope::read_limited(reader, 32).await.unwrap_err();
        assert!(matches!(*err, ErrorKind::TooLarge(32)));
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_read_stops_past_the_default_limit() {
        // An endless reader still terminates, one byte past the bound.
        let reader = tokio::io::repeat(b' ').take(MAX_ENVELOPE_BYTES + 1);
        let err = Envelope::read(reader).await.unwrap_err();
        assert!(matches!(*err, ErrorKind::TooLarge(MAX_ENVELOPE_BYTES)));
    }

    #[test]
    fn test_payload_at_the_limit_is_accepted() {
        let payload = br#"{"Flags": []}"#;
        assert!(Envelope::from_slice_limited(payload, payload.len() as u64).is_ok());
    }

    #[test]
    fn test_wrong_shape_is_decode_error() {
        let err = Envelope::from_slice(br#"{"Flags": {"ID": 1}}"#).unwrap_err();
        assert!(matches!(*err, ErrorKind::Decode));
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let envelope = Envelope::new(vec![
            Flag { id: 1, key: "a".to_string(), ..Default::default() },
            Flag { id: 2, enabled: true, ..Default::default() },
        ]);
        let mut buffer = Vec::new();
        envelope.write(&mut buffer).await.unwrap();
        let text = String::from_utf8(buffer.clone()).unwrap();
        assert!(text.contains(r#""Flags""#));
        assert_eq!(Envelope::read(buffer.as_slice()).await.unwrap(), envelope);
    }
}
