use async_trait::async_trait;
use brewline_core::{SessionState, SessionStore, StoreError, StoreResult, UserId};
use redis::AsyncCommands;
use tracing::warn;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
    key_prefix: String,
}

impl RedisClient {
    /// Opening the client does not connect; the first command does.
    pub fn new(connection_string: &str, key_prefix: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self {
            client,
            key_prefix: key_prefix.to_string(),
        })
    }

    pub fn session_key(&self, user_id: UserId) -> String {
        format!("{}:auth:token:{}", self.key_prefix, user_id)
    }

    pub async fn get_session_token(&self, user_id: UserId) -> Result<Option<String>, redis::RedisError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let token: Option<String> = conn.get(self.session_key(user_id)).await?;
        Ok(token)
    }
}

#[async_trait]
impl SessionStore for RedisClient {
    async fn check_session(&self, user_id: UserId, token: &str) -> StoreResult<SessionState> {
        let cached = self.get_session_token(user_id).await.map_err(|e| {
            warn!("Redis error while checking session for user {}: {}", user_id, e);
            StoreError::backend(e)
        })?;

        Ok(match cached {
            None => SessionState::Expired,
            Some(cached) if cached == token => SessionState::Valid,
            Some(_) => SessionState::Mismatch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key_layout() {
        let client = RedisClient::new("redis://127.0.0.1/", "brewline").unwrap();
        assert_eq!(client.session_key(42), "brewline:auth:token:42");
    }
}
