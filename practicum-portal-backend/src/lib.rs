pub mod auth;
pub mod csrf;
pub mod error;
pub mod registration;
pub mod routes;
pub mod session;
pub mod telemetry;
pub mod templating;

use std::convert::Infallible;
use std::pin::pin;
use std::sync::Arc;

use auth::{Authenticator, OpenIdAuthenticator};
use bytes::Bytes;
use error::AppError;
use http::header::{CONTENT_TYPE, LOCATION};
use http::{Method, Request, Response, StatusCode};
use http_body::Body;
use http_body_util::{BodyExt as _, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use practicum_portal_config::Config;
use practicum_portal_database::postgres::PgStore;
use practicum_portal_database::{get_database_connection, run_migrations, PortalStore};
use session::{ResponseSessionExt as _, Session};
use templating::Templates;
use tokio::net::TcpListener;
use tokio::select;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::routes::admin;

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn PortalStore>,
    pub authenticator: Arc<dyn Authenticator>,
    pub templates: Templates,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn PortalStore>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Result<Self, AppError> {
        Ok(Self {
            config,
            store,
            authenticator,
            templates: Templates::new()?,
        })
    }
}

pub type ResponseBody = Full<Bytes>;

pub fn html(
    session: Session,
    status: StatusCode,
    body: String,
) -> Result<Response<ResponseBody>, AppError> {
    Ok(Response::builder()
        .with_session(session)
        .status(status)
        .header(CONTENT_TYPE, "text/html; charset=utf-8")
        .body(Full::new(Bytes::from(body)))?)
}

/// Post/redirect/get.
pub fn see_other(session: Session, location: &str) -> Result<Response<ResponseBody>, AppError> {
    Ok(Response::builder()
        .with_session(session)
        .status(StatusCode::SEE_OTHER)
        .header(LOCATION, location)
        .body(Full::new(Bytes::new()))?)
}

async fn route(
    state: &AppState,
    request: Request<Bytes>,
    session: Session,
) -> Result<Response<ResponseBody>, AppError> {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    match (&method, path.as_str()) {
        (&Method::GET, "/") => routes::index::index(state, request, session).await,
        (&Method::POST, "/") => routes::index::verify(state, request, session).await,
        (&Method::GET, "/schools") => routes::schools::browse(state, request, session).await,
        (&Method::POST, "/register") => routes::register::register(state, request, session).await,
        (&Method::POST, "/logout") => routes::profile::logout(state, request, session).await,
        (&Method::POST, "/openidconnect-login") => {
            routes::openid_login::openid_login(state, request, session).await
        }
        (&Method::GET, "/openidconnect-redirect") => {
            routes::openid_redirect::openid_redirect(state, request, session).await
        }
        (&Method::POST, "/openidconnect-logout") => {
            routes::openid_login::openid_logout(state, request, session).await
        }
        (&Method::GET, "/admin/login") => admin::login(state, request, session).await,
        (&Method::GET, "/admin") => admin::dashboard::dashboard(state, request, session).await,
        (&Method::POST, "/admin/schools") => admin::schools::create(state, request, session).await,
        (&Method::GET, "/admin/schools/delete") => {
            admin::schools::confirm_delete(state, request, session).await
        }
        (&Method::POST, "/admin/schools/delete") => {
            admin::schools::delete(state, request, session).await
        }
        (&Method::POST, "/admin/quotas") => admin::quotas::create(state, request, session).await,
        (&Method::POST, "/admin/quotas/update") => {
            admin::quotas::update(state, request, session).await
        }
        (&Method::GET, "/admin/quotas/delete") => {
            admin::quotas::confirm_delete(state, request, session).await
        }
        (&Method::POST, "/admin/quotas/delete") => {
            admin::quotas::delete(state, request, session).await
        }
        _ => Ok(Response::builder()
            .with_session(session)
            .status(StatusCode::NOT_FOUND)
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(Full::new(Bytes::from_static(b"Not Found")))?),
    }
}

/// Largest request body that is buffered. Forms of this portal are far smaller.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Buffers the request body, dispatches it and turns errors into the error page.
pub async fn handle<B>(state: Arc<AppState>, request: Request<B>) -> Response<ResponseBody>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = request.into_parts();
    let session = Session::new(&parts.headers);
    let method = parts.method.clone();
    let uri = parts.uri.clone();
    let result = match Limited::new(body, MAX_BODY_BYTES).collect().await {
        Ok(body) => {
            let request = Request::from_parts(parts, body.to_bytes());
            route(&state, request, session.clone()).await
        }
        Err(err) if err.is::<LengthLimitError>() => Err(AppError::PayloadTooLarge),
        Err(err) => Err(AppError::Body(err)),
    };
    match result {
        Ok(response) => {
            debug!(%method, %uri, status = %response.status(), "handled request");
            response
        }
        Err(app_error) => {
            if app_error.status().is_server_error() {
                error!(%method, %uri, "request failed: {app_error}");
            } else {
                warn!(%method, %uri, "request rejected: {app_error}");
            }
            app_error.build_error_template(&state.templates, session)
        }
    }
}

pub async fn setup_server(config: Config) -> Result<Arc<AppState>, AppError> {
    info!("starting up server...");

    run_migrations(&config.database_url).await?;
    let pool = get_database_connection(&config.database_url)?;

    let authenticator = OpenIdAuthenticator::new(config.clone());
    Ok(Arc::new(AppState::new(
        config,
        Arc::new(PgStore::new(pool)),
        Arc::new(authenticator),
    )?))
}

pub async fn run_server(state: Arc<AppState>) -> Result<(), AppError> {
    let listener = TcpListener::bind(&state.config.listen_address).await?;
    info!("listening on {}", state.config.listen_address);

    // tell the connections to shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let shutdown_tx = Arc::new(shutdown_tx);

    // wait for the connections to finish shutdown
    let (closed_tx, closed_rx) = watch::channel(());

    let mut shutdown = pin!(shutdown_signal());

    #[allow(clippy::redundant_pub_crate)]
    loop {
        select! {
            accept = listener.accept() => {
                let (socket, remote_addr) = match accept {
                    Ok(accepted) => accepted,
                    Err(err) => {
                        error!("failed to accept connection: {err}");
                        continue;
                    }
                };
                debug!(%remote_addr, "accepted connection");

                let state = Arc::clone(&state);
                let shutdown_tx = Arc::clone(&shutdown_tx);
                let closed_rx = closed_rx.clone();

                tokio::spawn(async move {
                    let service = hyper::service::service_fn(move |request: Request<Incoming>| {
                        let state = Arc::clone(&state);
                        async move { Ok::<_, Infallible>(handle(state, request).await) }
                    });

                    let builder = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new());
                    let mut connection =
                        pin!(builder.serve_connection_with_upgrades(TokioIo::new(socket), service));

                    let result = select! {
                        result = connection.as_mut() => result,
                        () = shutdown_tx.closed() => {
                            connection.as_mut().graceful_shutdown();
                            connection.as_mut().await
                        }
                    };
                    if let Err(err) = result {
                        debug!(%remote_addr, "connection closed with error: {err}");
                    }

                    drop(closed_rx);
                });
            }
            () = &mut shutdown => {
                warn!("shutting down");
                drop(shutdown_rx); // initiate shutdown
                drop(closed_rx);
                closed_tx.closed().await;
                break;
            }
        }
    }

    Ok(())
}

#[allow(clippy::redundant_pub_crate)]
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
