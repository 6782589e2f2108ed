//! Redis backend over a `deadpool-redis` connection pool.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::redis::cmd;
use deadpool_redis::{Connection, Pool, PoolConfig, Runtime};

use crate::error::{StoreError, StoreResult};
use crate::kv::{KeyKind, KvStore, LogEntry};

/// XREAD reply: `[(log_key, [(entry_id, {field: value})])]`, nil on timeout.
type XReadReply = Option<Vec<(String, Vec<(String, HashMap<String, String>)>)>>;

/// Create a connection pool for `url` holding at most `max_size` connections.
pub fn create_pool(url: &str, max_size: usize) -> StoreResult<Pool> {
    let mut cfg = deadpool_redis::Config::from_url(url);
    cfg.pool = Some(PoolConfig::new(max_size));
    cfg.create_pool(Some(Runtime::Tokio1))
        .map_err(|e| StoreError::Pool(e.to_string()))
}

/// Store backed by a shared Redis instance.
#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn connect(url: &str, max_size: usize) -> StoreResult<Self> {
        Ok(Self::new(create_pool(url, max_size)?))
    }

    async fn conn(&self) -> StoreResult<Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn().await?;
        let value: Option<String> = cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        let mut command = cmd("SET");
        command.arg(key).arg(value);
        if let Some(ttl) = ttl {
            command.arg("EX").arg(ttl.as_secs().max(1));
        }
        let _: () = command.query_async(&mut conn).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let removed: i64 = cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let found: i64 = cmd("EXISTS").arg(key).query_async(&mut conn).await?;
        Ok(found > 0)
    }

    async fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn().await?;
        let values: Vec<Option<String>> = cmd("MGET").arg(keys).query_async(&mut conn).await?;
        Ok(values)
    }

    async fn scan_page(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
        kind: KeyKind,
    ) -> StoreResult<(u64, Vec<String>)> {
        let type_name = match kind {
            KeyKind::Value => "string",
            KeyKind::Log => "stream",
        };
        let mut conn = self.conn().await?;
        let (next, batch): (u64, Vec<String>) = cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count.max(1))
            .arg("TYPE")
            .arg(type_name)
            .query_async(&mut conn)
            .await?;
        Ok((next, batch))
    }

    async fn append_to_log(
        &self,
        log_key: &str,
        fields: &[(String, String)],
        id: &str,
    ) -> StoreResult<String> {
        if fields.is_empty() {
            return Err(StoreError::Rejected("log entries need at least one field".into()));
        }
        let mut conn = self.conn().await?;
        let mut command = cmd("XADD");
        command.arg(log_key).arg(id);
        for (field, value) in fields {
            command.arg(field).arg(value);
        }
        let assigned: String = command.query_async(&mut conn).await?;
        Ok(assigned)
    }

    async fn read_log_from(
        &self,
        log_key: &str,
        offset: &str,
        block: Option<Duration>,
        count: Option<usize>,
    ) -> StoreResult<Vec<LogEntry>> {
        let mut conn = self.conn().await?;
        let mut command = cmd("XREAD");
        if let Some(count) = count {
            command.arg("COUNT").arg(count);
        }
        if let Some(block) = block {
            command.arg("BLOCK").arg(block.as_millis() as u64);
        }
        command.arg("STREAMS").arg(log_key).arg(offset);

        let reply: XReadReply = command.query_async(&mut conn).await?;
        let entries = reply
            .unwrap_or_default()
            .into_iter()
            .filter(|(key, _)| key == log_key)
            .flat_map(|(_, entries)| entries)
            .map(|(id, fields)| LogEntry {
                id,
                fields: fields.into_iter().collect::<BTreeMap<_, _>>(),
            })
            .collect();
        Ok(entries)
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        let _: String = cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
