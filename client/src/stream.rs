use async_trait::async_trait;
use std::io::{Error, ErrorKind};
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufStream,
};

/// Longest line accepted from the server, terminator included.
pub(crate) const MAX_LINE_LEN: usize = 8 * 1024;

/// The byte-stream primitives the protocol is driven through.
#[async_trait]
pub trait ByteStream: Send {
    /// Reads one line and returns it without its terminator. Fails on EOF, and
    /// with `InvalidData` on an over-long or non-UTF-8 line.
    async fn read_line(&mut self) -> std::io::Result<String>;
    /// Reads exactly `n` bytes. Fails if the stream ends first.
    async fn read_exact(&mut self, n: usize) -> std::io::Result<Vec<u8>>;
    async fn write(&mut self, bytes: &[u8]) -> std::io::Result<()>;
    async fn flush(&mut self) -> std::io::Result<()>;
    async fn close(&mut self) -> std::io::Result<()>;
}

/// [`ByteStream`] over any tokio reader/writer, buffered in both directions.
#[derive(Debug)]
pub struct BufferedStream<S> {
    inner: BufStream<S>,
}

impl<S: AsyncRead + AsyncWrite> BufferedStream<S> {
    pub fn new(stream: S) -> Self {
        Self {
            inner: BufStream::new(stream),
        }
    }
}

#[async_trait]
impl<S> ByteStream for BufferedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn read_line(&mut self) -> std::io::Result<String> {
        let mut line = Vec::new();
        (&mut self.inner)
            .take(MAX_LINE_LEN as u64)
            .read_until(b'\n', &mut line)
            .await?;
        if line.len() == MAX_LINE_LEN && line.last() != Some(&b'\n') {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("line exceeds {MAX_LINE_LEN} bytes"),
            ));
        }
        if line.pop() != Some(b'\n') {
            return Err(Error::new(
                ErrorKind::UnexpectedEof,
                "stream closed before end of line",
            ));
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        String::from_utf8(line).map_err(|e| Error::new(ErrorKind::InvalidData, e))
    }

    async fn read_exact(&mut self, n: usize) -> std::io::Result<Vec<u8>> {
        let mut buf = vec![0; n];
        self.inner.read_exact(&mut buf).await?;
        Ok(buf)
    }

    async fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.inner.write_all(bytes).await
    }

    async fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush().await
    }

    async fn close(&mut self) -> std::io::Result<()> {
        self.inner.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_read_line_strips_terminator() {
        let mock = Builder::new().read(b"STORED\r\nEND\n").build();
        let mut stream = BufferedStream::new(mock);

        assert_eq!(stream.read_line().await.unwrap(), "STORED");
        assert_eq!(stream.read_line().await.unwrap(), "END");
    }

    #[tokio::test]
    async fn test_read_line_at_eof() {
        let mock = Builder::new().read(b"STOR").build();
        let mut stream = BufferedStream::new(mock);

        let err = stream.read_line().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn test_read_line_length_limit() {
        let mut data = vec![b'a'; MAX_LINE_LEN - 2];
        data.extend_from_slice(b"\r\n");
        data.extend_from_slice(&[b'b'; MAX_LINE_LEN]);
        let mock = Builder::new()
            .read(&data[..MAX_LINE_LEN])
            .read(&data[MAX_LINE_LEN..])
            .build();
        let mut stream = BufferedStream::new(mock);

        assert_eq!(stream.read_line().await.unwrap().len(), MAX_LINE_LEN - 2);
        let err = stream.read_line().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn test_read_line_rejects_invalid_utf8() {
        let mock = Builder::new().read(b"\xff\xfe\r\n").build();
        let mut stream = BufferedStream::new(mock);

        let err = stream.read_line().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn test_read_exact_after_line() {
        let mock = Builder::new().read(b"VALUE k 0 3\r\n").read(b"a\r\nb\r\n").build();
        let mut stream = BufferedStream::new(mock);

        assert_eq!(stream.read_line().await.unwrap(), "VALUE k 0 3");
        assert_eq!(stream.read_exact(5).await.unwrap(), b"a\r\nb\r");
        assert_eq!(stream.read_exact(1).await.unwrap(), b"\n");
    }

    #[tokio::test]
    async fn test_read_exact_shortfall() {
        let mock = Builder::new().read(b"ab").build();
        let mut stream = BufferedStream::new(mock);

        let err = stream.read_exact(3).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn test_write_is_sent_on_flush() {
        let mock = Builder::new().write(b"version\r\n").build();
        let mut stream = BufferedStream::new(mock);

        stream.write(b"vers").await.unwrap();
        stream.write(b"ion\r\n").await.unwrap();
        stream.flush().await.unwrap();
    }
}
