use crate::stream::{BufferedStream, ByteStream};
use log::{debug, info, trace};
use protocol::{
    decode_block, decode_value_line, Error, FromValueUnit, MemcachedCodec, MemcachedRequest,
    Result, ValueLine, DEFAULT_MAX_VALUE_LEN, TERMINATOR,
};
use std::io::ErrorKind;
use tokio::net::{lookup_host, TcpStream};
use tokio_util::bytes::BytesMut;
use tokio_util::codec::Encoder;

/// A single connection to a cache server.
///
/// Commands are strictly serialized: each one writes its request and consumes
/// its whole response before returning. After a fatal error the stream
/// position is unknown and the connection should be dropped.
pub struct Connection<S = BufferedStream<TcpStream>> {
    stream: S,
    max_value_len: usize,
}

impl Connection<BufferedStream<TcpStream>> {
    /// Resolves `host` and connects to the first address that accepts.
    pub async fn open(host: &str, port: u16) -> Result<Self> {
        let addresses = lookup_host((host, port)).await.map_err(|source| {
            debug!("Lookup of {host} failed: {source}");
            Error::Resolve {
                host: host.to_string(),
                source,
            }
        })?;

        let mut last_error = None;
        for address in addresses {
            match TcpStream::connect(address).await {
                Ok(socket) => {
                    info!("Connected to {address}");
                    return Ok(Self::new(BufferedStream::new(socket)));
                }
                Err(e) => {
                    debug!("Connect to {address} failed: {e}");
                    last_error = Some((address, e));
                }
            }
        }

        match last_error {
            Some((address, source)) => Err(Error::Connect {
                address: address.to_string(),
                source,
            }),
            None => Err(Error::Resolve {
                host: host.to_string(),
                source: std::io::Error::new(ErrorKind::NotFound, "no addresses found"),
            }),
        }
    }
}

impl<S: ByteStream> Connection<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            max_value_len: DEFAULT_MAX_VALUE_LEN,
        }
    }

    /// Data blocks announced as longer than `len` fail to decode instead of
    /// being read.
    pub fn with_max_value_len(mut self, len: usize) -> Self {
        self.max_value_len = len;
        self
    }

    pub async fn close(mut self) -> Result<()> {
        self.stream.close().await?;
        info!("Connection closed");
        Ok(())
    }

    pub(crate) async fn send(&mut self, request: MemcachedRequest<'_>) -> Result<()> {
        let mut buf = BytesMut::new();
        MemcachedCodec.encode(request, &mut buf)?;
        if log::log_enabled!(log::Level::Trace) {
            let line_end = buf
                .windows(TERMINATOR.len())
                .position(|w| w == TERMINATOR)
                .unwrap_or(buf.len());
            trace!("Request: {}", String::from_utf8_lossy(&buf[..line_end]));
        }

        self.stream.write(&buf).await?;
        self.stream.flush().await?;
        Ok(())
    }

    pub(crate) async fn read_line(&mut self) -> Result<String> {
        let line = self.stream.read_line().await.map_err(|e| match e.kind() {
            ErrorKind::InvalidData => Error::decode(e.to_string()),
            _ => Error::from(e),
        })?;
        trace!("Response: {line}");
        Ok(line)
    }

    /// Reads value units up to the `END` line.
    ///
    /// With `single` set, a second unit is a decode failure.
    pub(crate) async fn read_values<T: FromValueUnit>(
        &mut self,
        single: bool,
    ) -> Result<Vec<(String, T)>> {
        let mut values = Vec::new();
        loop {
            let line = self.read_line().await?;
            let header = match decode_value_line(&line, T::FAMILY)? {
                ValueLine::End => return Ok(values),
                ValueLine::Value(header) => header,
            };
            if single && !values.is_empty() {
                debug!("Second value for a single key: {line:?}");
                return Err(Error::decode(format!(
                    "more than one value for a single key: {line:?}"
                )));
            }

            if header.bytes > self.max_value_len {
                debug!("Value exceeds {} bytes: {line:?}", self.max_value_len);
                return Err(Error::decode(format!(
                    "value of {} bytes exceeds limit of {}",
                    header.bytes, self.max_value_len
                )));
            }

            let block = self
                .stream
                .read_exact(header.bytes.saturating_add(TERMINATOR.len()))
                .await?;
            let data = decode_block(block, header.bytes)?;
            let key = header.key.clone();
            values.push((key, T::from_unit(header, data)?));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MAX_LINE_LEN;
    use protocol::{CasValue, Value};
    use tokio_test::io::{Builder, Mock};

    fn connection(mock: Mock) -> Connection<BufferedStream<Mock>> {
        Connection::new(BufferedStream::new(mock))
    }

    #[tokio::test]
    async fn test_send_writes_request() {
        let mock = Builder::new().write(b"delete foo\r\n").build();
        let mut conn = connection(mock);

        conn.send(MemcachedRequest::Delete {
            key: "foo",
            noreply: false,
        })
        .await
        .expect("Can send");
    }

    #[tokio::test]
    async fn test_read_values_until_end() {
        let mock = Builder::new()
            .read(b"VALUE foo 0 3\r\nbar\r\nVALUE foo01 0 1\r\n1\r\nEND\r\n")
            .build();
        let mut conn = connection(mock);

        let values: Vec<(String, Value)> = conn.read_values(false).await.unwrap();
        assert_eq!(
            values,
            vec![
                (
                    "foo".to_string(),
                    Value {
                        flags: 0,
                        data: b"bar".to_vec()
                    }
                ),
                (
                    "foo01".to_string(),
                    Value {
                        flags: 0,
                        data: b"1".to_vec()
                    }
                ),
            ]
        );
    }

    #[tokio::test]
    async fn test_read_values_binary_data() {
        let mock = Builder::new()
            .read(b"VALUE k 7 4 9\r\n\r\n\0\xff\r\nEND\r\n")
            .build();
        let mut conn = connection(mock);

        let values: Vec<(String, CasValue)> = conn.read_values(true).await.unwrap();
        assert_eq!(
            values,
            vec![(
                "k".to_string(),
                CasValue {
                    flags: 7,
                    unique: 9,
                    data: b"\r\n\0\xff".to_vec()
                }
            )]
        );
    }

    #[tokio::test]
    async fn test_read_values_second_unit_for_single_key() {
        let mock = Builder::new()
            .read(b"VALUE foo 0 3\r\nbar\r\nVALUE foo 0 3\r\nbaz\r\nEND\r\n")
            .build();
        let mut conn = connection(mock);

        let result = conn.read_values::<Value>(true).await;
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[tokio::test]
    async fn test_read_values_bad_terminator() {
        let mock = Builder::new().read(b"VALUE foo 0 3\r\nbarXYEND\r\n").build();
        let mut conn = connection(mock);

        let result = conn.read_values::<Value>(false).await;
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[tokio::test]
    async fn test_read_values_byte_count_too_large() {
        let mock = Builder::new()
            .read(b"VALUE foo 0 18446744073709551613\r\n")
            .build();
        let mut conn = connection(mock);

        let result = conn.read_values::<Value>(false).await;
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[tokio::test]
    async fn test_read_values_over_configured_limit() {
        let mock = Builder::new()
            .read(b"VALUE foo 0 4\r\nabcd\r\nEND\r\n")
            .build();
        let mut conn = connection(mock).with_max_value_len(3);

        let result = conn.read_values::<Value>(false).await;
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[tokio::test]
    async fn test_read_values_at_configured_limit() {
        let mock = Builder::new()
            .read(b"VALUE foo 0 3\r\nabc\r\nEND\r\n")
            .build();
        let mut conn = connection(mock).with_max_value_len(3);

        let values = conn.read_values::<Value>(false).await.unwrap();
        assert_eq!(values[0].1.data, b"abc");
    }

    #[tokio::test]
    async fn test_read_line_too_long() {
        let mock = Builder::new().read(&vec![b'a'; MAX_LINE_LEN]).build();
        let mut conn = connection(mock);

        assert!(matches!(conn.read_line().await, Err(Error::Decode(_))));
    }

    #[tokio::test]
    async fn test_read_line_invalid_utf8() {
        let mock = Builder::new().read(b"VALUE \xff 0 1\r\n").build();
        let mut conn = connection(mock);

        assert!(matches!(conn.read_line().await, Err(Error::Decode(_))));
    }

    #[tokio::test]
    async fn test_read_values_short_block() {
        let mock = Builder::new().read(b"VALUE foo 0 3\r\nba\r\n").build();
        let mut conn = connection(mock);

        let result = conn.read_values::<Value>(false).await;
        match result {
            Err(Error::Transport(e)) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
            other => panic!("unexpected {other:?}"),
        }
    }
}
