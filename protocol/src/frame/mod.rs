use log::{debug, warn};
use std::fmt::Write;
use std::str::FromStr;
use tokio_util::bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;

mod request;
mod response;

pub use request::*;
pub use response::*;

use crate::{Error, ProtocolError, Result};

/// Ends every protocol line and every data block.
pub const TERMINATOR: &[u8] = b"\r\n";

/// Largest data block accepted from a `VALUE` line, matching the server's
/// default item size limit.
pub const DEFAULT_MAX_VALUE_LEN: usize = 1024 * 1024;

const END: &str = "END";

trait ParseField {
    fn parse_field<I: FromStr>(self, name: &str, line: &str) -> Result<I>;
}

impl ParseField for Option<&str> {
    fn parse_field<I: FromStr>(self, name: &str, line: &str) -> Result<I> {
        self.and_then(|s| I::from_str(s).ok())
            .ok_or_else(|| Error::decode(format!("invalid {name} in {line:?}")))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MemcachedCodec;

impl MemcachedCodec {
    fn encode_line(item: &MemcachedRequest<'_>, dst: &mut BytesMut) -> std::fmt::Result {
        match item {
            MemcachedRequest::Store {
                verb,
                key,
                value,
                options,
            } => write!(
                dst,
                "{} {key} {} {} {}",
                verb.as_str(),
                options.flags,
                options.exptime,
                value.len()
            )?,
            MemcachedRequest::Cas {
                key,
                value,
                unique,
                options,
            } => write!(
                dst,
                "cas {key} {} {} {} {unique}",
                options.flags,
                options.exptime,
                value.len()
            )?,
            MemcachedRequest::Get { keys } => {
                dst.write_str("get")?;
                for key in keys.iter() {
                    write!(dst, " {key}")?;
                }
            }
            MemcachedRequest::Gets { keys } => {
                dst.write_str("gets")?;
                for key in keys.iter() {
                    write!(dst, " {key}")?;
                }
            }
            MemcachedRequest::Delete { key, .. } => write!(dst, "delete {key}")?,
            MemcachedRequest::Counter {
                verb, key, amount, ..
            } => write!(dst, "{} {key} {amount}", verb.as_str())?,
            MemcachedRequest::FlushAll { delay } => write!(dst, "flush_all {delay}")?,
            MemcachedRequest::Version => dst.write_str("version")?,
        }
        if !item.expects_reply() {
            dst.write_str(" noreply")?;
        }
        dst.write_str("\r\n")
    }
}

impl<'a> Encoder<MemcachedRequest<'a>> for MemcachedCodec {
    type Error = std::io::Error;

    fn encode(&mut self, item: MemcachedRequest<'a>, dst: &mut BytesMut) -> std::io::Result<()> {
        Self::encode_line(&item, dst)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        if let Some(data) = item.data() {
            dst.reserve(data.len() + TERMINATOR.len());
            dst.put_slice(data);
            dst.put_slice(TERMINATOR);
        }
        Ok(())
    }
}

fn protocol_error(line: &str) -> Option<ProtocolError> {
    let (head, message) = line.split_once(' ').unwrap_or((line, ""));
    match head {
        "ERROR" => Some(ProtocolError::Generic),
        "CLIENT_ERROR" => Some(ProtocolError::Client(message.to_string())),
        "SERVER_ERROR" => Some(ProtocolError::Server(message.to_string())),
        _ => None,
    }
}

/// Fails if `line` is one of the error lines.
pub fn check_error_line(line: &str) -> Result<()> {
    match protocol_error(line) {
        None => Ok(()),
        Some(e) => {
            if let ProtocolError::Server(message) = &e {
                warn!("Server error, connection should be discarded: {message}");
            }
            Err(e.into())
        }
    }
}

/// Decode failure for a line that does not fit the command that was sent.
pub fn unexpected_response(line: &str) -> Error {
    debug!("Unexpected response line: {line:?}");
    Error::decode(format!("unexpected response {line:?}"))
}

pub fn decode_response(line: &str) -> Result<MemcachedResponse> {
    check_error_line(line)?;
    match line {
        "STORED" => Ok(MemcachedResponse::Stored),
        "NOT_STORED" => Ok(MemcachedResponse::NotStored),
        "EXISTS" => Ok(MemcachedResponse::Exists),
        "NOT_FOUND" => Ok(MemcachedResponse::NotFound),
        "DELETED" => Ok(MemcachedResponse::Deleted),
        "OK" => Ok(MemcachedResponse::Ok),
        _ => match line.strip_prefix("VERSION ") {
            Some(version) => Ok(MemcachedResponse::Version(version.to_string())),
            None => Err(unexpected_response(line)),
        },
    }
}

pub fn decode_reply(line: &str) -> Result<Reply> {
    match decode_response(line)? {
        MemcachedResponse::Stored => Ok(Reply::Stored),
        MemcachedResponse::NotStored => Ok(Reply::NotStored),
        MemcachedResponse::Exists => Ok(Reply::Exists),
        MemcachedResponse::NotFound => Ok(Reply::NotFound),
        _ => Err(unexpected_response(line)),
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ValueLine {
    Value(ValueHeader),
    End,
}

pub fn decode_value_line(line: &str, family: ValueFamily) -> Result<ValueLine> {
    check_error_line(line)?;
    if line == END {
        return Ok(ValueLine::End);
    }
    ValueHeader::parse(line, family).map(ValueLine::Value)
}

impl ValueHeader {
    pub fn parse(line: &str, family: ValueFamily) -> Result<Self> {
        let fields: Vec<&str> = line.split(' ').collect();
        let expected = match family {
            ValueFamily::Get => 4,
            ValueFamily::Gets => 5,
        };
        if fields.len() != expected || fields[0] != "VALUE" || fields[1].is_empty() {
            return Err(unexpected_response(line));
        }

        let mut fields = fields.into_iter().skip(1);
        let key = fields.next().unwrap_or_default().to_string();
        let flags = fields.next().parse_field("flags", line)?;
        let bytes = fields.next().parse_field("byte count", line)?;
        let unique = match family {
            ValueFamily::Get => None,
            ValueFamily::Gets => Some(fields.next().parse_field("CAS token", line)?),
        };

        Ok(ValueHeader {
            key,
            flags,
            bytes,
            unique,
        })
    }
}

/// Checks a data block read as `bytes + 2` raw bytes and strips its terminator.
pub fn decode_block(mut block: Vec<u8>, bytes: usize) -> Result<Vec<u8>> {
    if block.len() != bytes + TERMINATOR.len() || !block.ends_with(TERMINATOR) {
        debug!("Data block of {bytes} bytes is not terminated by CRLF");
        return Err(Error::decode(format!(
            "data block of {bytes} bytes not terminated by CRLF"
        )));
    }
    block.truncate(bytes);
    Ok(block)
}

fn counter_digits(line: &str) -> Result<Option<&str>> {
    check_error_line(line)?;
    if line == "NOT_FOUND" {
        return Ok(None);
    }
    let digits = line.trim_end_matches(' ');
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(unexpected_response(line));
    }
    Ok(Some(digits))
}

/// Decodes the answer to `incr`/`decr` as an unsigned 64-bit value.
pub fn decode_counter(line: &str) -> Result<Option<u64>> {
    counter_digits(line)?
        .map(|digits| Some(digits).parse_field("counter", line))
        .transpose()
}

/// Decodes the answer to `incr`/`decr`, keeping the decimal text as sent.
pub fn decode_counter_text(line: &str) -> Result<Option<String>> {
    let Some(digits) = counter_digits(line)? else {
        return Ok(None);
    };
    let _: u64 = Some(digits).parse_field("counter", line)?;
    Ok(Some(digits.to_string()))
}
