//! Redis-backed challenge store.
//!
//! Each challenge is a JSON value under `resume:challenge:{email}` with a
//! TTL matching its retention horizon, so nothing needs cleaning up.
//! Conditional replacement runs as a Lua script, which Redis executes
//! atomically; `WATCH` is unusable on a shared multiplexed connection.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::domain::foundation::{DomainError, EmailAddress, ErrorCode};
use crate::domain::resume::ResumeChallenge;
use crate::ports::ChallengeStore;

const KEY_PREFIX: &str = "resume:challenge";

/// KEYS[1] challenge key; ARGV: expected id, expected revision, new JSON, TTL.
const REPLACE_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
if not current then
    return 0
end
local stored = cjson.decode(current)
if stored.id ~= ARGV[1] or tonumber(stored.revision or 0) ~= tonumber(ARGV[2]) then
    return 0
end
redis.call('SET', KEYS[1], ARGV[3], 'EX', ARGV[4])
return 1
"#;

#[derive(Clone)]
pub struct RedisChallengeStore {
    conn: MultiplexedConnection,
}

impl RedisChallengeStore {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }
}

fn key_for(email: &EmailAddress) -> String {
    format!("{}:{}", KEY_PREFIX, email.as_str())
}

fn cache_error(context: &str, e: impl std::fmt::Display) -> DomainError {
    DomainError::new(ErrorCode::CacheError, format!("{}: {}", context, e))
}

#[async_trait]
impl ChallengeStore for RedisChallengeStore {
    async fn get(&self, email: &EmailAddress) -> Result<Option<ResumeChallenge>, DomainError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .get(key_for(email))
            .await
            .map_err(|e: redis::RedisError| cache_error("Failed to read resume challenge", e))?;

        match raw {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| cache_error("Corrupt resume challenge", e)),
            None => Ok(None),
        }
    }

    async fn put(&self, challenge: &ResumeChallenge, ttl_secs: u64) -> Result<(), DomainError> {
        let json = serde_json::to_string(challenge)
            .map_err(|e| cache_error("Failed to encode resume challenge", e))?;

        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(key_for(&challenge.email))
            .arg(json)
            .arg("EX")
            .arg(ttl_secs.max(1))
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e: redis::RedisError| cache_error("Failed to store resume challenge", e))?;
        Ok(())
    }

    async fn replace(
        &self,
        expected: &ResumeChallenge,
        next: &ResumeChallenge,
        ttl_secs: u64,
    ) -> Result<bool, DomainError> {
        let json = serde_json::to_string(next)
            .map_err(|e| cache_error("Failed to encode resume challenge", e))?;

        let mut conn = self.conn.clone();
        let swapped: i64 = redis::Script::new(REPLACE_SCRIPT)
            .key(key_for(&expected.email))
            .arg(expected.id.to_string())
            .arg(expected.revision)
            .arg(json)
            .arg(ttl_secs.max(1))
            .invoke_async(&mut conn)
            .await
            .map_err(|e: redis::RedisError| cache_error("Failed to replace resume challenge", e))?;
        Ok(swapped == 1)
    }
}
