use crate::connection::Connection;
use crate::stream::ByteStream;
use protocol::{
    decode_counter, decode_counter_text, decode_reply, decode_response, unexpected_response,
    CasValue, CounterVerb, FromValueUnit, MemcachedRequest, MemcachedResponse, Reply, Result,
    StoreOptions, StoreVerb, Value,
};
use std::collections::HashMap;

impl<S: ByteStream> Connection<S> {
    async fn storage(&mut self, request: MemcachedRequest<'_>) -> Result<Reply> {
        let expects_reply = request.expects_reply();
        self.send(request).await?;
        if !expects_reply {
            return Ok(Reply::Stored);
        }
        let line = self.read_line().await?;
        decode_reply(&line)
    }

    async fn store(
        &mut self,
        verb: StoreVerb,
        key: &str,
        value: &[u8],
        options: &StoreOptions,
    ) -> Result<Reply> {
        self.storage(MemcachedRequest::Store {
            verb,
            key,
            value,
            options: *options,
        })
        .await
    }

    /// With `options.noreply` the result is always [`Reply::Stored`], whatever
    /// the server did. The same holds for every storage command.
    pub async fn set(
        &mut self,
        key: &str,
        value: impl AsRef<[u8]>,
        options: &StoreOptions,
    ) -> Result<Reply> {
        self.store(StoreVerb::Set, key, value.as_ref(), options)
            .await
    }

    pub async fn add(
        &mut self,
        key: &str,
        value: impl AsRef<[u8]>,
        options: &StoreOptions,
    ) -> Result<Reply> {
        self.store(StoreVerb::Add, key, value.as_ref(), options)
            .await
    }

    pub async fn replace(
        &mut self,
        key: &str,
        value: impl AsRef<[u8]>,
        options: &StoreOptions,
    ) -> Result<Reply> {
        self.store(StoreVerb::Replace, key, value.as_ref(), options)
            .await
    }

    pub async fn append(
        &mut self,
        key: &str,
        value: impl AsRef<[u8]>,
        options: &StoreOptions,
    ) -> Result<Reply> {
        self.store(StoreVerb::Append, key, value.as_ref(), options)
            .await
    }

    pub async fn prepend(
        &mut self,
        key: &str,
        value: impl AsRef<[u8]>,
        options: &StoreOptions,
    ) -> Result<Reply> {
        self.store(StoreVerb::Prepend, key, value.as_ref(), options)
            .await
    }

    /// [`Reply::Exists`] means the token is stale, [`Reply::NotFound`] that
    /// the item is gone.
    pub async fn cas(
        &mut self,
        key: &str,
        unique: u64,
        value: impl AsRef<[u8]>,
        options: &StoreOptions,
    ) -> Result<Reply> {
        self.storage(MemcachedRequest::Cas {
            key,
            value: value.as_ref(),
            unique,
            options: *options,
        })
        .await
    }

    async fn retrieve_one<T: FromValueUnit>(
        &mut self,
        request: MemcachedRequest<'_>,
    ) -> Result<Option<T>> {
        self.send(request).await?;
        Ok(self.read_values(true).await?.pop().map(|(_, value)| value))
    }

    async fn retrieve_many<T: FromValueUnit>(
        &mut self,
        request: MemcachedRequest<'_>,
    ) -> Result<Vec<(String, T)>> {
        self.send(request).await?;
        self.read_values(false).await
    }

    pub async fn get(&mut self, key: &str) -> Result<Option<Value>> {
        let keys = std::slice::from_ref(&key);
        self.retrieve_one(MemcachedRequest::Get { keys }).await
    }

    pub async fn gets(&mut self, key: &str) -> Result<Option<CasValue>> {
        let keys = std::slice::from_ref(&key);
        self.retrieve_one(MemcachedRequest::Gets { keys }).await
    }

    /// Fetches several keys in one round trip, in the order the server
    /// returns them. Missing keys are left out.
    pub async fn get_multi(&mut self, keys: &[&str]) -> Result<Vec<(String, Value)>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        self.retrieve_many(MemcachedRequest::Get { keys }).await
    }

    pub async fn get_multi_map(&mut self, keys: &[&str]) -> Result<HashMap<String, Value>> {
        Ok(self.get_multi(keys).await?.into_iter().collect())
    }

    pub async fn gets_multi(&mut self, keys: &[&str]) -> Result<Vec<(String, CasValue)>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        self.retrieve_many(MemcachedRequest::Gets { keys }).await
    }

    pub async fn gets_multi_map(&mut self, keys: &[&str]) -> Result<HashMap<String, CasValue>> {
        Ok(self.gets_multi(keys).await?.into_iter().collect())
    }

    /// Returns false if the key was not found. Always true with `noreply`.
    pub async fn delete(&mut self, key: &str, noreply: bool) -> Result<bool> {
        self.send(MemcachedRequest::Delete { key, noreply }).await?;
        if noreply {
            return Ok(true);
        }
        let line = self.read_line().await?;
        match decode_response(&line)? {
            MemcachedResponse::Deleted => Ok(true),
            MemcachedResponse::NotFound => Ok(false),
            _ => Err(unexpected_response(&line)),
        }
    }

    async fn counter<T>(
        &mut self,
        verb: CounterVerb,
        key: &str,
        amount: u64,
        noreply: bool,
        decode: fn(&str) -> Result<Option<T>>,
    ) -> Result<Option<T>> {
        self.send(MemcachedRequest::Counter {
            verb,
            key,
            amount,
            noreply,
        })
        .await?;
        if noreply {
            return Ok(None);
        }
        let line = self.read_line().await?;
        decode(&line)
    }

    /// `None` means the key was not found, and is also what `noreply` returns.
    pub async fn incr(&mut self, key: &str, amount: u64, noreply: bool) -> Result<Option<u64>> {
        self.counter(CounterVerb::Incr, key, amount, noreply, decode_counter)
            .await
    }

    pub async fn decr(&mut self, key: &str, amount: u64, noreply: bool) -> Result<Option<u64>> {
        self.counter(CounterVerb::Decr, key, amount, noreply, decode_counter)
            .await
    }

    /// Like [`Connection::incr`], returning the new value as the server wrote it.
    pub async fn incr_str(
        &mut self,
        key: &str,
        amount: u64,
        noreply: bool,
    ) -> Result<Option<String>> {
        self.counter(CounterVerb::Incr, key, amount, noreply, decode_counter_text)
            .await
    }

    pub async fn decr_str(
        &mut self,
        key: &str,
        amount: u64,
        noreply: bool,
    ) -> Result<Option<String>> {
        self.counter(CounterVerb::Decr, key, amount, noreply, decode_counter_text)
            .await
    }

    pub async fn flush_all(&mut self, delay: i64) -> Result<()> {
        self.send(MemcachedRequest::FlushAll { delay }).await?;
        let line = self.read_line().await?;
        match decode_response(&line)? {
            MemcachedResponse::Ok => Ok(()),
            _ => Err(unexpected_response(&line)),
        }
    }

    pub async fn version(&mut self) -> Result<String> {
        self.send(MemcachedRequest::Version).await?;
        let line = self.read_line().await?;
        match decode_response(&line)? {
            MemcachedResponse::Version(version) => Ok(version),
            _ => Err(unexpected_response(&line)),
        }
    }
}
