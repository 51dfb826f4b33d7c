use super::claims::Claims;
use super::crypto::Crypto;
use super::dto::ErrorBody;
use super::dto::LoginRequest;
use super::dto::LoginResponse;
use super::dto::RegisterRequest;
use super::dto::RegisterResponse;
use super::dto::TicketResponse;
use super::middleware::Auth;
use super::service::AuthError;
use super::service::AuthService;
use super::ticket::Tickets;
use actix_web::web;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
use actix_web::Responder;
use pkr_core::Config;
use pkr_core::Unique;

fn error(status: actix_web::http::StatusCode, code: &'static str, message: String) -> HttpResponse {
    HttpResponse::build(status).json(ErrorBody {
        error: code,
        message,
    })
}

fn auth_error(e: AuthError) -> HttpResponse {
    use actix_web::http::StatusCode;
    let message = e.to_string();
    match e {
        AuthError::InvalidInput(_) => error(StatusCode::BAD_REQUEST, "invalid_request", message),
        AuthError::InvalidCredentials => {
            error(StatusCode::UNAUTHORIZED, "invalid_credentials", message)
        }
        AuthError::AccountLocked => error(StatusCode::FORBIDDEN, "account_locked", message),
        AuthError::AccountSuspended => error(StatusCode::FORBIDDEN, "account_suspended", message),
        AuthError::AccountBanned => error(StatusCode::FORBIDDEN, "account_banned", message),
        AuthError::UsernameExists => error(StatusCode::CONFLICT, "username_exists", message),
        AuthError::EmailExists => error(StatusCode::CONFLICT, "email_exists", message),
        AuthError::Internal(_) | AuthError::Store(_) => {
            log::error!("[auth] internal error: {}", message);
            error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal server error".into(),
            )
        }
    }
}

pub async fn register(
    auth: web::Data<AuthService>,
    req: web::Json<RegisterRequest>,
) -> impl Responder {
    match auth
        .register(&req.username, &req.email, &req.password)
        .await
    {
        Ok((account, profile)) => HttpResponse::Created().json(RegisterResponse {
            account_id: account.id().to_string(),
            player_id: profile.id().to_string(),
            username: account.username,
        }),
        Err(e) => auth_error(e),
    }
}

pub async fn login(
    auth: web::Data<AuthService>,
    crypto: web::Data<Crypto>,
    http: HttpRequest,
    req: web::Json<LoginRequest>,
) -> impl Responder {
    let ip = http
        .connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string();
    let (account, profile) = match auth.authenticate(&req.username, &req.password, &ip).await {
        Ok(found) => found,
        Err(e) => return auth_error(e),
    };
    let claims = Claims::new(profile.id(), account.username.clone(), Crypto::duration());
    match crypto.encode(&claims) {
        Ok(token) => HttpResponse::Ok().json(LoginResponse {
            token,
            player_id: profile.id().to_string(),
            account_id: account.id().to_string(),
            username: account.username,
            display_name: profile.display_name,
        }),
        Err(e) => {
            log::error!("[auth] token encoding failed: {}", e);
            error(
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "failed to generate token".into(),
            )
        }
    }
}

/// Issues a one-shot WebSocket ticket for an authenticated player.
pub async fn ticket(
    tickets: web::Data<Tickets>,
    config: web::Data<Config>,
    http: HttpRequest,
    auth: Auth,
) -> impl Responder {
    let player_id = auth.player().to_string();
    let ttl = config.ticket_ttl;
    let ticket = match tickets.generate(&player_id, ttl).await {
        Ok(ticket) => ticket,
        Err(e) => {
            log::error!("[auth] ticket generation failed for {}: {}", player_id, e);
            return error(
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "failed to generate ticket".into(),
            );
        }
    };
    log::info!(
        "[auth] ticket issued for {} ({}...)",
        player_id,
        &ticket[..8]
    );
    let info = http.connection_info();
    let scheme = if info.scheme() == "https" { "wss" } else { "ws" };
    HttpResponse::Ok().json(TicketResponse {
        ws_url: format!("{}://{}/ws?ticket={}", scheme, info.host(), ticket),
        expires_in: ttl.as_secs(),
        ticket,
    })
}
