use crate::cli::ServeArgs;
use crate::infra::{
    listing_store, AppState, LoggingMailTransport, LoggingPortalGateway, QueuedMailbox,
    ServiceAuditLog, ServiceDesk,
};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use estate_flow::clock::SystemClock;
use estate_flow::config::AppConfig;
use estate_flow::error::AppError;
use estate_flow::runtime::{
    run_follow_up_loop, run_mail_dispatcher, run_mailbox_poller, run_publish_dispatcher,
    run_reply_worker, ChannelOutbox, ReplyRouter, RetryPolicy,
};
use estate_flow::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

const MAILBOX_POLL_INTERVAL: Duration = Duration::from_secs(5);

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let audit = ServiceAuditLog::from_config(&config.storage)?;
    let audit_storage = audit.describe();
    let (store, listing_storage) = listing_store(&config.storage)?;
    let (outbox, receivers) = ChannelOutbox::new();
    let desk = Arc::new(
        ServiceDesk::new(
            Arc::new(audit),
            Arc::new(outbox),
            Arc::new(SystemClock),
            config.workspace.clone(),
        )
        .with_store(store)?,
    );

    let policy = RetryPolicy::new(config.workspace.delivery_max_attempts);
    tokio::spawn(run_mail_dispatcher(
        receivers.mail,
        Arc::new(LoggingMailTransport::default()),
        policy,
        desk.clone(),
    ));
    tokio::spawn(run_publish_dispatcher(
        receivers.publish,
        Arc::new(LoggingPortalGateway),
        policy,
        desk.clone(),
    ));

    let (reply_router, inboxes) = ReplyRouter::new(config.workspace.reply_workers);
    for (index, inbox) in inboxes.into_iter().enumerate() {
        tokio::spawn(run_reply_worker(index, inbox, desk.clone()));
    }

    let (shutdown, shutdown_rx) = watch::channel(false);
    let mailbox = Arc::new(QueuedMailbox::default());
    tokio::spawn(run_mailbox_poller(
        mailbox.clone(),
        reply_router.clone(),
        MAILBOX_POLL_INTERVAL,
        shutdown_rx.clone(),
    ));
    tokio::spawn(run_follow_up_loop(
        desk.clone(),
        config.workspace.tick_interval,
        shutdown_rx,
    ));

    let app = with_service_routes(desk, mailbox, reply_router)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        %audit_storage,
        %listing_storage,
        reply_workers = config.workspace.reply_workers,
        cadence = %config.workspace.follow_up_cadence,
        "listing desk ready"
    );

    let served = axum::serve(listener, app).await;
    shutdown.send(true).ok();
    served?;
    Ok(())
}
