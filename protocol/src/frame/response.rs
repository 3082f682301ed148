/// Outcome of a storage command. None of these are errors.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Reply {
    Stored,
    NotStored,
    Exists,
    NotFound,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum MemcachedResponse {
    Stored,
    NotStored,
    Exists,
    NotFound,
    Deleted,
    Ok,
    Version(String),
}

/// Which `VALUE` line grammar a retrieval response uses.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ValueFamily {
    /// `VALUE <key> <flags> <bytes>`
    Get,
    /// `VALUE <key> <flags> <bytes> <unique>`
    Gets,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ValueHeader {
    pub key: String,
    pub flags: u32,
    pub bytes: usize,
    pub unique: Option<u64>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Value {
    pub flags: u32,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CasValue {
    pub flags: u32,
    pub unique: u64,
    pub data: Vec<u8>,
}

/// Builds a typed item from a value unit of its family.
pub trait FromValueUnit: Sized {
    const FAMILY: ValueFamily;

    fn from_unit(header: ValueHeader, data: Vec<u8>) -> crate::Result<Self>;
}

impl FromValueUnit for Value {
    const FAMILY: ValueFamily = ValueFamily::Get;

    fn from_unit(header: ValueHeader, data: Vec<u8>) -> crate::Result<Self> {
        Ok(Value {
            flags: header.flags,
            data,
        })
    }
}

impl FromValueUnit for CasValue {
    const FAMILY: ValueFamily = ValueFamily::Gets;

    fn from_unit(header: ValueHeader, data: Vec<u8>) -> crate::Result<Self> {
        let unique = header
            .unique
            .ok_or_else(|| crate::Error::decode(format!("no CAS token for {}", header.key)))?;
        Ok(CasValue {
            flags: header.flags,
            unique,
            data,
        })
    }
}
