use pkr_core::ID;
use pkr_wallet::PlayerProfile;

/// JWT payload: `{player_id, username, iat, exp}`.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    pub player_id: uuid::Uuid,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(player: ID<PlayerProfile>, username: String, ttl: std::time::Duration) -> Self {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time")
            .as_secs() as i64;
        Self {
            player_id: player.inner(),
            username,
            iat: now,
            exp: now + ttl.as_secs() as i64,
        }
    }
    pub fn expired(&self) -> bool {
        self.exp
            < std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time")
                .as_secs() as i64
    }
    pub fn player(&self) -> ID<PlayerProfile> {
        ID::from(self.player_id)
    }
}
