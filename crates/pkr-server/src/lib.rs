//! The poker server: HTTP auth surface, WebSocket gateway, and the wiring
//! between sessions, tables, and the wallet.
//!
//! ## Submodules
//!
//! - [`hub`] — live connection registry
//! - [`session`] — per-player sessions and the table-cohort broadcaster
//! - [`handler`] — inbound frame routing
//! - [`connection`] — WebSocket read/write pump
//! - [`messages`] — wire DTOs
pub mod connection;
pub mod handler;
pub mod hub;
pub mod messages;
pub mod session;

pub use handler::MessageHandler;
pub use hub::Hub;
pub use messages::*;
pub use session::PlayerSession;
pub use session::SessionManager;
pub use session::TableNotifier;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use anyhow::Context;
use actix_web::web;
use actix_web::App;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
use actix_web::HttpServer;
use actix_web::Responder;
use pkr_auth::AuthService;
use pkr_auth::Crypto;
use pkr_auth::RedisTicketStore;
use pkr_auth::Tickets;
use pkr_core::Config;
use pkr_core::ID;
use pkr_engine::EventSink;
use pkr_engine::HandCompleteFn;
use pkr_engine::TableCommand;
use pkr_engine::TableManager;
use pkr_wallet::Db;
use pkr_wallet::GameService;
use pkr_wallet::ProfileRepository;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared state behind the WebSocket upgrade endpoint.
pub struct Gateway {
    pub db: Db,
    pub hub: Arc<Hub>,
    pub sessions: Arc<SessionManager>,
    pub handler: Arc<MessageHandler>,
}

async fn health(db: web::Data<Db>) -> impl Responder {
    let client = db.lock().await;
    match client
        .execute("SELECT 1", &[])
        .await
        .inspect_err(|e| log::error!("health check failed: {}", e))
    {
        Ok(_) => HttpResponse::Ok().body("ok"),
        Err(_) => HttpResponse::ServiceUnavailable().body("database unavailable"),
    }
}

/// `GET /ws?ticket=...`: consumes the one-shot ticket, registers the
/// connection, and spawns its pump.
async fn ws_upgrade(
    req: HttpRequest,
    body: web::Payload,
    query: web::Query<HashMap<String, String>>,
    tickets: web::Data<Tickets>,
    gateway: web::Data<Gateway>,
) -> impl Responder {
    let Some(ticket) = query.get("ticket") else {
        return HttpResponse::Unauthorized().body("missing ticket");
    };
    let player_id = match tickets.validate(ticket).await {
        Ok(player_id) => player_id,
        Err(e) => {
            log::warn!("[ws] ticket rejected: {}", e);
            return HttpResponse::Unauthorized().body("invalid ticket");
        }
    };
    let Ok(player_uuid) = uuid::Uuid::parse_str(&player_id) else {
        log::error!("[ws] ticket resolved to malformed player id");
        return HttpResponse::Unauthorized().body("invalid ticket");
    };
    let player: ID<pkr_wallet::PlayerProfile> = ID::from(player_uuid);
    let profile = {
        let client = gateway.db.lock().await;
        client.profile_by_id(player).await
    };
    let profile = match profile {
        Ok(Some(profile)) => profile,
        Ok(None) => return HttpResponse::Unauthorized().body("unknown player"),
        Err(e) => {
            log::error!("[ws] profile lookup failed: {}", e);
            return HttpResponse::InternalServerError().body("internal error");
        }
    };
    match actix_ws::handle(&req, body) {
        Ok((response, ws, stream)) => {
            let outbound = gateway.hub.register(&player_id);
            let sender = gateway
                .hub
                .sender(&player_id)
                .expect("connection just registered");
            let session = Arc::new(PlayerSession::new(player, profile.display_name, sender));
            gateway.sessions.add(session);
            log::info!("[ws] {} upgraded", player_id);
            actix_web::rt::spawn(connection::serve(
                ws,
                stream,
                outbound,
                player,
                gateway.hub.clone(),
                gateway.sessions.clone(),
                gateway.handler.clone(),
            ));
            response
        }
        Err(e) => {
            log::error!("[ws] upgrade failed: {}", e);
            HttpResponse::InternalServerError().body("upgrade failed")
        }
    }
}

/// Builds the full service graph and runs the HTTP/WebSocket server until
/// shutdown.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let db = pkr_wallet::connect(&config.db_url)
        .await
        .context("database connection failed")?;
    pkr_wallet::migrate(&*db.lock().await)
        .await
        .context("schema migration failed")?;

    let game = Arc::new(GameService::new(db.clone(), config.default_currency.clone()));
    let sessions = Arc::new(SessionManager::new(game.clone()));

    // Tables publish into the session layer; the session layer signals
    // tables back through the notifier. Both sides see only a callback.
    let sink: EventSink = {
        let sessions = sessions.clone();
        Arc::new(move |event| sessions.dispatch(event))
    };
    let on_hand_complete: HandCompleteFn = {
        let sessions = sessions.clone();
        Arc::new(move |table_id, chips| sessions.sync_chips(&table_id, &chips))
    };
    let tables = Arc::new(
        TableManager::new(sink, on_hand_complete).with_min_players(config.min_players),
    );
    sessions.set_notifier({
        let tables = tables.clone();
        Arc::new(move |table_id: &str, command: TableCommand| {
            if let Some(handle) = tables.get(table_id) {
                let _ = handle.try_send(command);
            }
        })
    });
    sessions.spawn_cleanup();

    let handler = Arc::new(MessageHandler::new(
        sessions.clone(),
        tables.clone(),
        game.clone(),
        config.max_players,
    ));
    let gateway = web::Data::new(Gateway {
        db: db.clone(),
        hub: Arc::new(Hub::new()),
        sessions: sessions.clone(),
        handler,
    });
    let auth = web::Data::new(AuthService::new(db.clone()));
    let crypto = web::Data::new(Crypto::new(config.jwt_secret.as_bytes()));
    let tickets = web::Data::new(Tickets::Redis(
        RedisTicketStore::open(&config.redis_url)
            .with_context(|| format!("invalid redis url {}", config.redis_url))?,
    ));
    let db = web::Data::new(db);
    let conf = web::Data::new(config.clone());

    log::info!("starting server on {}", config.bind_addr);
    let bind_addr = config.bind_addr.clone();
    let result = HttpServer::new(move || {
        let cors = if config.allowed_origins.is_empty() {
            Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
        } else {
            config
                .allowed_origins
                .iter()
                .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
                .allow_any_method()
                .allow_any_header()
        };
        App::new()
            .wrap(Logger::new("%r %s %Ts"))
            .wrap(cors)
            .app_data(gateway.clone())
            .app_data(auth.clone())
            .app_data(crypto.clone())
            .app_data(tickets.clone())
            .app_data(db.clone())
            .app_data(conf.clone())
            .route("/health", web::get().to(health))
            .service(
                web::scope("/api/auth")
                    .route("/register", web::post().to(pkr_auth::register))
                    .route("/login", web::post().to(pkr_auth::login))
                    .route("/ticket", web::post().to(pkr_auth::ticket)),
            )
            .route("/ws", web::get().to(ws_upgrade))
    })
    .bind(&bind_addr)
    .with_context(|| format!("cannot bind {}", bind_addr))?
    .run()
    .await;

    tables.close_all();
    sessions.stop();
    result.context("server terminated abnormally")
}
