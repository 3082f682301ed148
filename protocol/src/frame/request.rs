/// Per-call options for storage commands.
///
/// `exptime` of 0 means the item never expires. The server reads values up to
/// 30 days (2592000 seconds) as an offset from now and larger values as an
/// absolute Unix time; nothing here interprets it.
///
/// With `noreply` set the server sends nothing back and the client reports
/// success without knowing whether the command actually took effect.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct StoreOptions {
    pub flags: u32,
    pub exptime: i64,
    pub noreply: bool,
}

impl StoreOptions {
    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_exptime(mut self, exptime: i64) -> Self {
        self.exptime = exptime;
        self
    }

    pub fn with_noreply(mut self, noreply: bool) -> Self {
        self.noreply = noreply;
        self
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum StoreVerb {
    Set,
    Add,
    Replace,
    Append,
    Prepend,
}

impl StoreVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreVerb::Set => "set",
            StoreVerb::Add => "add",
            StoreVerb::Replace => "replace",
            StoreVerb::Append => "append",
            StoreVerb::Prepend => "prepend",
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CounterVerb {
    Incr,
    Decr,
}

impl CounterVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            CounterVerb::Incr => "incr",
            CounterVerb::Decr => "decr",
        }
    }
}

#[derive(Debug, Clone)]
pub enum MemcachedRequest<'a> {
    Store {
        verb: StoreVerb,
        key: &'a str,
        value: &'a [u8],
        options: StoreOptions,
    },
    Cas {
        key: &'a str,
        value: &'a [u8],
        unique: u64,
        options: StoreOptions,
    },
    Get {
        keys: &'a [&'a str],
    },
    Gets {
        keys: &'a [&'a str],
    },
    Delete {
        key: &'a str,
        noreply: bool,
    },
    Counter {
        verb: CounterVerb,
        key: &'a str,
        amount: u64,
        noreply: bool,
    },
    FlushAll {
        delay: i64,
    },
    Version,
}

impl MemcachedRequest<'_> {
    /// Whether the server will answer this request.
    pub fn expects_reply(&self) -> bool {
        match self {
            MemcachedRequest::Store { options, .. } | MemcachedRequest::Cas { options, .. } => {
                !options.noreply
            }
            MemcachedRequest::Delete { noreply, .. } | MemcachedRequest::Counter { noreply, .. } => {
                !noreply
            }
            _ => true,
        }
    }

    pub(crate) fn data(&self) -> Option<&[u8]> {
        match self {
            MemcachedRequest::Store { value, .. } | MemcachedRequest::Cas { value, .. } => {
                Some(*value)
            }
            _ => None,
        }
    }
}
