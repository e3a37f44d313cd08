use super::*;
use crate::Identity;
use crate::game::Coordinator;
use crate::game::Handle;
use crate::game::RoundConfig;
use crate::gateway::Broadcast;
use crate::gateway::Presence;
use crate::ledger::Ledger;
use crate::ledger::MemLedger;
use crate::ledger::PgLedger;
use crate::reconcile::Reconciler;
use actix_cors::Cors;
use actix_web::App;
use actix_web::HttpServer;
use actix_web::middleware::Logger;
use actix_web::web;
use clap::Parser;
use std::sync::Arc;

/// Everything a handler can reach, shared across workers.
pub struct State {
    pub ledger: Arc<dyn Ledger>,
    pub game: Handle,
    pub gateway: Arc<Broadcast>,
    pub presence: Arc<Presence>,
    pub reconciler: Reconciler,
    pub operator: Option<Identity>,
}

#[derive(Parser, Debug)]
pub struct Settings {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind: String,
    /// Run on an in-memory ledger. Nothing survives a restart.
    #[arg(long)]
    pub memory: bool,
    /// Account that collects the operator fee and may cancel rounds.
    #[arg(long, env = "OPERATOR_ACCOUNT")]
    pub operator: Option<Identity>,
    /// Chips a single bid commits to the pot.
    #[arg(long, env = "STAKE", default_value_t = crate::STAKE)]
    pub stake: crate::Chips,
    /// Seconds each bid leaves on the countdown.
    #[arg(long, env = "ROUND_SECS", default_value_t = crate::ROUND_DURATION.as_secs())]
    pub round_secs: u64,
    /// Milliseconds between clock ticks and timer broadcasts.
    #[arg(long, env = "TICK_MILLIS", default_value_t = crate::TICK_INTERVAL.as_millis() as u64)]
    pub tick_millis: u64,
}

impl Settings {
    fn round(&self) -> RoundConfig {
        RoundConfig {
            stake: self.stake,
            duration: std::time::Duration::from_secs(self.round_secs),
            tick: std::time::Duration::from_millis(self.tick_millis),
        }
    }
}

pub struct Server;

impl Server {
    pub async fn run(settings: Settings) -> Result<(), std::io::Error> {
        let ledger: Arc<dyn Ledger> = match settings.memory {
            true => {
                log::warn!("[hosting] in-memory ledger, nothing survives a restart");
                Arc::new(MemLedger::new())
            }
            false => {
                let ledger = PgLedger::new(crate::ledger::db().await);
                ledger.migrate().await.expect("migrations apply");
                Arc::new(ledger)
            }
        };
        if settings.operator.is_none() {
            log::warn!("[hosting] no operator account, fees will be retired");
        }
        let config = settings.round();
        let gateway = Arc::new(Broadcast::new());
        let game = Coordinator::spawn(
            config,
            ledger.clone(),
            gateway.clone(),
            settings.operator.clone(),
        );
        game.start_ticker(config.tick);
        let state = web::Data::new(State {
            ledger: ledger.clone(),
            game,
            gateway: gateway.clone(),
            presence: Arc::new(Presence::new()),
            reconciler: Reconciler::new(ledger, gateway),
            operator: settings.operator,
        });
        log::info!("[hosting] listening on {}", settings.bind);
        #[rustfmt::skip]
        let server = HttpServer::new(move || {
            App::new()
                .wrap(Logger::new("%r %s %Ts"))
                .wrap(
                    Cors::default()
                        .allow_any_origin()
                        .allow_any_method()
                        .allow_any_header(),
                )
                .app_data(state.clone())
                .route("/health",              web::get() .to(health))
                .route("/register",            web::post().to(register))
                .route("/login",               web::post().to(login))
                .route("/logout",              web::post().to(logout))
                .route("/me",                  web::get() .to(me))
                .route("/account/{identity}",  web::get() .to(profile))
                .route("/settings",            web::post().to(update_settings))
                .route("/stats",               web::get() .to(stats))
                .route("/compete",             web::post().to(compete))
                .route("/withdraw",            web::post().to(withdraw))
                .route("/reload",              web::post().to(reload))
                .route("/webhook",             web::post().to(webhook))
                .route("/cancel",              web::post().to(cancel))
                .route("/live",                web::get() .to(live))
        });
        server.workers(4).bind(settings.bind)?.run().await
    }
}
