//! Redis Store Module
//!
//! Production backend speaking the Redis protocol over a managed,
//! auto-reconnecting connection.

use std::sync::Once;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::store::{KeyTtl, Store};

// == Redis Store ==
/// Redis-backed store.
///
/// Construction never touches the network. The connection is established on
/// the first operation and reused afterwards; the connection manager
/// reconnects on its own after a drop.
///
/// Requires Redis 7.0 or later: the counter transaction uses `EXPIRE ... NX`.
/// Older servers abort every such transaction, which the rate limiter then
/// treats as an outage and fails open.
pub struct RedisStore {
    client: redis::Client,
    conn: OnceCell<ConnectionManager>,
    addr: String,
    nx_hint: Once,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("addr", &self.addr)
            .field("connected", &self.conn.initialized())
            .finish()
    }
}

impl RedisStore {
    /// Creates a store for `host:port` without connecting.
    pub fn new(host: &str, port: u16) -> StoreResult<Self> {
        let addr = format!("{}:{}", host, port);
        let client = redis::Client::open(format!("redis://{}/", addr)).map_err(|e| {
            error!(%addr, error = %e, "invalid store address");
            StoreError::Unavailable(e.to_string())
        })?;

        Ok(Self {
            client,
            conn: OnceCell::new(),
            addr,
            nx_hint: Once::new(),
        })
    }

    /// Address this store talks to.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn connection(&self) -> StoreResult<ConnectionManager> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                let conn = self.client.get_connection_manager().await.map_err(|e| {
                    error!(addr = %self.addr, error = %e, "failed to connect to store");
                    StoreError::from(e)
                })?;
                info!(addr = %self.addr, "connected to store");
                Ok::<_, StoreError>(conn)
            })
            .await?;
        Ok(conn.clone())
    }

    fn hint_if_nx_unsupported(&self, err: &StoreError) {
        if expire_nx_unsupported(err) {
            self.nx_hint.call_once(|| {
                warn!(
                    addr = %self.addr,
                    error = %err,
                    "store rejected EXPIRE NX; Redis 7.0 or later is required, rate limiting is failing open"
                );
            });
        }
    }
}

/// Whether a transaction failure looks like a server that predates `EXPIRE NX`.
fn expire_nx_unsupported(err: &StoreError) -> bool {
    match err {
        StoreError::Malformed(msg) => {
            msg.contains("EXECABORT")
                || msg.contains("wrong number of arguments")
                || msg.contains("unsupported option")
        }
        StoreError::Unavailable(_) => false,
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;
        let value: Option<Vec<u8>> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl_ms: u64) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.connection().await?;
        let removed: i64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(removed > 0)
    }

    async fn ttl(&self, key: &str) -> StoreResult<KeyTtl> {
        let mut conn = self.connection().await?;
        let reply: i64 = redis::cmd("TTL").arg(key).query_async(&mut conn).await?;
        Ok(KeyTtl::from_reply(reply))
    }

    async fn pttl(&self, key: &str) -> StoreResult<KeyTtl> {
        let mut conn = self.connection().await?;
        let reply: i64 = redis::cmd("PTTL").arg(key).query_async(&mut conn).await?;
        Ok(KeyTtl::from_pttl_reply(reply))
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.connection().await?;
        let found: i64 = redis::cmd("EXISTS").arg(key).query_async(&mut conn).await?;
        Ok(found > 0)
    }

    async fn incr(&self, key: &str) -> StoreResult<i64> {
        let mut conn = self.connection().await?;
        let count: i64 = redis::cmd("INCR").arg(key).query_async(&mut conn).await?;
        Ok(count)
    }

    async fn expire(&self, key: &str, seconds: u64) -> StoreResult<bool> {
        let mut conn = self.connection().await?;
        let applied: i64 = redis::cmd("EXPIRE")
            .arg(key)
            .arg(seconds)
            .query_async(&mut conn)
            .await?;
        Ok(applied == 1)
    }

    async fn incr_with_expiry(&self, key: &str, seconds: u64) -> StoreResult<i64> {
        let mut conn = self.connection().await?;
        let reply: Result<(i64,), redis::RedisError> = redis::pipe()
            .atomic()
            .cmd("INCR")
            .arg(key)
            .cmd("EXPIRE")
            .arg(key)
            .arg(seconds.max(1))
            .arg("NX")
            .ignore()
            .query_async(&mut conn)
            .await;

        match reply {
            Ok((count,)) => Ok(count),
            Err(e) => {
                let err = StoreError::from(e);
                self.hint_if_nx_unsupported(&err);
                Err(err)
            }
        }
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
