#[derive(Debug, serde::Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, serde::Serialize)]
pub struct RegisterResponse {
    pub account_id: String,
    pub player_id: String,
    pub username: String,
}

#[derive(Debug, serde::Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, serde::Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub player_id: String,
    pub account_id: String,
    pub username: String,
    pub display_name: String,
}

#[derive(Debug, serde::Serialize)]
pub struct TicketResponse {
    pub ticket: String,
    /// Seconds the ticket stays valid.
    pub expires_in: u64,
    pub ws_url: String,
}

#[derive(Debug, serde::Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_deserialize_from_wire_shape() {
        let req: LoginRequest =
            serde_json::from_str(r#"{"username":"alice","password":"hunter2!"}"#).unwrap();
        assert_eq!(req.username, "alice");
        let req: RegisterRequest = serde_json::from_str(
            r#"{"username":"alice","email":"a@b.c","password":"hunter2!"}"#,
        )
        .unwrap();
        assert_eq!(req.email, "a@b.c");
    }
}
