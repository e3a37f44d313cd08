use super::*;
use crate::Chips;
use crate::Error;
use crate::Identity;
use crate::gateway::ClientMessage;
use crate::gateway::ServerMessage;
use crate::reconcile::Notice;
use crate::reconcile::Outcome;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
use actix_web::Responder;
use actix_web::web;
use futures::StreamExt;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct BidRequest {
    pub amount: Option<Chips>,
}

#[derive(Deserialize)]
pub struct WithdrawRequest {
    pub amount: Chips,
}

#[derive(Deserialize)]
pub struct ReloadRequest {
    pub amount: Chips,
}

#[derive(Deserialize)]
pub struct SettingsRequest {
    pub settings: serde_json::Value,
}

/// Map a domain error onto the HTTP surface. Bodies keep the same
/// `success`/`detail` shape whatever the status.
fn failure(error: &Error) -> HttpResponse {
    let body = serde_json::json!({
        "success": false,
        "code": error.code(),
        "detail": error.to_string(),
    });
    match error {
        Error::Validation(_) => HttpResponse::BadRequest().json(body),
        Error::InsufficientFunds => HttpResponse::BadRequest().json(body),
        Error::NotFound(_) => HttpResponse::NotFound().json(body),
        Error::StateConflict(_) => HttpResponse::Conflict().json(body),
        Error::DuplicateCredit(_) => HttpResponse::Conflict().json(body),
        Error::Gateway(_) => HttpResponse::BadGateway().json(body),
        Error::Store(_) => HttpResponse::ServiceUnavailable().json(body),
    }
}

pub async fn health(state: web::Data<State>) -> impl Responder {
    match state
        .ledger
        .ping()
        .await
        .inspect_err(|e| log::error!("health check failed: {}", e))
    {
        Ok(_) => HttpResponse::Ok().body("ok"),
        Err(_) => HttpResponse::ServiceUnavailable().body("ledger unavailable"),
    }
}

pub async fn register(state: web::Data<State>, req: web::Json<RegisterRequest>) -> impl Responder {
    if req.username.len() < 3 || req.username.len() > 32 {
        return HttpResponse::BadRequest().body("username must be 3-32 characters");
    }
    if req.password.len() < 8 {
        return HttpResponse::BadRequest().body("password must be at least 8 characters");
    }
    let hashword = match password::hash(&req.password) {
        Ok(h) => h,
        Err(e) => return HttpResponse::InternalServerError().body(e.to_string()),
    };
    let account = match state.ledger.create(&req.username, &hashword).await {
        Ok(account) => account,
        Err(Error::StateConflict(_)) => {
            return HttpResponse::Conflict().body("username already exists");
        }
        Err(e) => return failure(&e),
    };
    let (session, token) = Session::mint(account.identity.clone());
    if let Err(e) = state.ledger.open_session(&session).await {
        return failure(&e);
    }
    log::info!("[hosting] registered {}", account.identity);
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "token": token,
        "account": account,
    }))
}

pub async fn login(state: web::Data<State>, req: web::Json<LoginRequest>) -> impl Responder {
    let (account, hashword) = match state.ledger.lookup(&req.username).await {
        Ok(Some(row)) => row,
        Ok(None) => return HttpResponse::Unauthorized().body("invalid credentials"),
        Err(e) => return failure(&e),
    };
    if !password::verify(&req.password, &hashword) {
        return HttpResponse::Unauthorized().body("invalid credentials");
    }
    let (session, token) = Session::mint(account.identity.clone());
    if let Err(e) = state.ledger.open_session(&session).await {
        return failure(&e);
    }
    log::info!("[hosting] {} logged in", account.identity);
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "token": token,
        "account": account,
    }))
}

pub async fn logout(auth: Auth, state: web::Data<State>) -> impl Responder {
    match state.ledger.drop_session(auth.session().hash()).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Err(e) => failure(&e),
    }
}

pub async fn me(auth: Auth, state: web::Data<State>) -> impl Responder {
    match state.ledger.account(auth.identity()).await {
        Ok(account) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "account": account,
        })),
        Err(e) => failure(&e),
    }
}

pub async fn profile(state: web::Data<State>, path: web::Path<Identity>) -> impl Responder {
    match state.ledger.account(&path.into_inner()).await {
        Ok(account) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "account": account,
        })),
        Err(e) => failure(&e),
    }
}

pub async fn update_settings(
    auth: Auth,
    state: web::Data<State>,
    req: web::Json<SettingsRequest>,
) -> impl Responder {
    if !req.settings.is_object() {
        return failure(&Error::Validation(String::from(
            "settings must be a JSON object",
        )));
    }
    match state
        .ledger
        .update_settings(auth.identity(), &req.settings)
        .await
    {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Err(e) => failure(&e),
    }
}

pub async fn stats(state: web::Data<State>) -> impl Responder {
    let accounts = match state.ledger.accounts().await {
        Ok(accounts) => accounts,
        Err(e) => return failure(&e),
    };
    let leaders = accounts
        .iter()
        .map(|account| {
            serde_json::json!({
                "identity": account.identity,
                "wins": account.wins,
                "entries": account.entries,
                "wagered": account.wagered,
                "collected": account.collected,
                "losses": account.wagered - account.collected,
            })
        })
        .collect::<Vec<_>>();
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "leaders": leaders,
    }))
}

pub async fn compete(
    auth: Auth,
    state: web::Data<State>,
    req: Option<web::Json<BidRequest>>,
) -> impl Responder {
    let amount = req.and_then(|r| r.amount);
    match state.game.bid(auth.identity().clone(), amount).await {
        Ok(receipt) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "receipt": receipt,
        })),
        Err(e) => failure(&e),
    }
}

pub async fn withdraw(
    auth: Auth,
    state: web::Data<State>,
    req: web::Json<WithdrawRequest>,
) -> impl Responder {
    if req.amount <= 0 {
        return failure(&Error::Validation(String::from(
            "withdrawal amount must be positive",
        )));
    }
    match state.ledger.debit(auth.identity(), req.amount).await {
        Ok(balance) => {
            log::info!(
                "[hosting] {} withdrew {}, balance {}",
                auth.identity(),
                req.amount,
                balance
            );
            state.gateway.publish(&ServerMessage::coins(
                auth.identity().clone(),
                balance,
                Some("withdraw"),
            ));
            HttpResponse::Ok().json(serde_json::json!({ "success": true, "balance": balance }))
        }
        Err(e) => failure(&e),
    }
}

/// Open a pending top-up reference for the payment gateway. The actual
/// checkout happens on the gateway's side; its webhook notice is what
/// eventually moves the balance.
pub async fn reload(
    auth: Auth,
    state: web::Data<State>,
    req: web::Json<ReloadRequest>,
) -> impl Responder {
    if req.amount <= 0 {
        return failure(&Error::Validation(String::from(
            "reload amount must be positive",
        )));
    }
    if let Err(e) = state.ledger.account(auth.identity()).await {
        return failure(&e);
    }
    let reference = format!("reload-{}", uuid::Uuid::now_v7());
    log::info!(
        "[hosting] reload {} opened by {} for {}",
        reference,
        auth.identity(),
        req.amount
    );
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "payment": {
            "id": reference,
            "account": auth.identity(),
            "amount": req.amount,
            "status": "pending",
        },
    }))
}

/// Payment gateway webhook. Replays answer 200 so the gateway stops
/// redelivering; retryable failures answer 503 so it does not.
pub async fn webhook(state: web::Data<State>, notice: web::Json<Notice>) -> impl Responder {
    let notice = notice.into_inner();
    match state.reconciler.reconcile(&notice).await {
        Ok(Outcome::Applied(balance)) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "outcome": "applied",
            "balance": balance,
        })),
        Ok(outcome) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "outcome": outcome.code(),
        })),
        Err(e) if e.retryable() => {
            log::error!("[hosting] webhook {} failed, expecting redelivery: {}", notice.id, e);
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "success": false,
                "code": e.code(),
                "detail": e.to_string(),
            }))
        }
        Err(e) => failure(&e),
    }
}

pub async fn cancel(auth: Auth, state: web::Data<State>) -> impl Responder {
    match &state.operator {
        Some(operator) if operator == auth.identity() => {}
        _ => {
            return HttpResponse::Forbidden().json(serde_json::json!({
                "success": false,
                "detail": "operator only",
            }));
        }
    }
    log::warn!("[hosting] round cancel requested by {}", auth.identity());
    match state.game.cancel().await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Err(e) => failure(&e),
    }
}

pub async fn live(
    auth: Auth,
    state: web::Data<State>,
    body: web::Payload,
    req: HttpRequest,
) -> impl Responder {
    match actix_ws::handle(&req, body) {
        Ok((response, session, stream)) => {
            bridge(auth.identity().clone(), state, session, stream);
            response.map_into_left_body()
        }
        Err(e) => HttpResponse::InternalServerError()
            .body(e.to_string())
            .map_into_right_body(),
    }
}

/// Pump one WebSocket connection: gateway fan-out goes down the socket,
/// client messages come up into the coordinator and the chat. Presence
/// is only entered by an explicit `join` and always left on teardown.
fn bridge(
    identity: Identity,
    state: web::Data<State>,
    mut session: actix_ws::Session,
    mut stream: actix_ws::MessageStream,
) {
    let (id, mut rx) = state.gateway.subscribe(identity.clone());
    log::info!("[hosting] {} connected", identity);
    actix_web::rt::spawn(async move {
        if !catch_up(&state, &mut session).await {
            state.gateway.unsubscribe(id);
            return;
        }
        let mut joined = false;
        'sesh: loop {
            tokio::select! {
                biased;
                msg = rx.recv() => match msg {
                    Some(json) => if session.text(json).await.is_err() { break 'sesh },
                    None => break 'sesh,
                },
                msg = stream.next() => match msg {
                    Some(Ok(actix_ws::Message::Text(text))) => {
                        if !consume(&text, &identity, &mut joined, &mut session, &state).await {
                            break 'sesh;
                        }
                    }
                    Some(Ok(actix_ws::Message::Close(_))) => break 'sesh,
                    Some(Err(_)) => break 'sesh,
                    None => break 'sesh,
                    _ => continue 'sesh,
                },
            }
        }
        if joined {
            retire(&state, &identity);
        }
        state.gateway.unsubscribe(id);
        log::info!("[hosting] {} disconnected", identity);
    });
}

/// One timer snapshot and one roster, so a fresh connection never waits
/// a full tick to learn the state of the world.
async fn catch_up(state: &State, session: &mut actix_ws::Session) -> bool {
    let Ok(summary) = state.game.snapshot().await else {
        return false;
    };
    let timer = ServerMessage::timer(
        summary.round,
        summary.seconds,
        summary.pot,
        summary.last_bidder,
    );
    let roster = ServerMessage::presence(state.presence.roster());
    session.text(timer.to_json()).await.is_ok() && session.text(roster.to_json()).await.is_ok()
}

/// Handle one inbound frame. Returns false once the socket is dead.
async fn consume(
    text: &str,
    identity: &Identity,
    joined: &mut bool,
    session: &mut actix_ws::Session,
    state: &State,
) -> bool {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            let rejection = ServerMessage::rejection(&Error::Validation(e.to_string()));
            return session.text(rejection.to_json()).await.is_ok();
        }
    };
    match message {
        ClientMessage::Join => {
            if !*joined {
                *joined = true;
                announce(state, identity);
            }
            true
        }
        ClientMessage::Leave => {
            if *joined {
                *joined = false;
                retire(state, identity);
            }
            true
        }
        ClientMessage::Bid { amount } => match state.game.bid(identity.clone(), amount).await {
            Ok(receipt) => {
                let coins = ServerMessage::coins(identity.clone(), receipt.balance, None);
                state.gateway.unicast(identity, &coins);
                true
            }
            Err(e) => session.text(ServerMessage::rejection(&e).to_json()).await.is_ok(),
        },
        ClientMessage::Chat { text, kind } => {
            if !text.trim().is_empty() {
                state
                    .gateway
                    .publish(&ServerMessage::chat(identity.clone(), text, kind));
            }
            true
        }
    }
}

fn announce(state: &State, identity: &Identity) {
    if state.presence.join(identity) {
        state.gateway.publish(&ServerMessage::joined(identity.clone()));
        state
            .gateway
            .publish(&ServerMessage::presence(state.presence.roster()));
    }
}

fn retire(state: &State, identity: &Identity) {
    if state.presence.leave(identity) {
        state.gateway.publish(&ServerMessage::left(identity.clone()));
        state
            .gateway
            .publish(&ServerMessage::presence(state.presence.roster()));
    }
}
