//! HTTP relay server.
//!
//! Routes (GET only):
//! - `/report?page=<url>[&prerender=1]`  image report table for a page
//! - `/convert/<ext>/<url>`              one image re-encoded as `<ext>`
//! - `/observer.js`                      the browser observer script
//! - anything else                       static file under the configured root
//!
//! Every failure is answered with an empty 404.

pub mod query;

use crate::codec::ImageFormat;
use crate::config::Settings;
use crate::convert::convert_url;
use crate::fetch::Fetcher;
use crate::render::render_report_table;
use crate::report::generate_page_report;
use crate::rewrite::observer_script;
use crate::Result;

use anyhow::{Context, anyhow, bail};
use std::net::SocketAddr;
use std::path::{Component, Path};
use std::sync::Arc;
use tracing::{error, info};
use warp::Filter;
use warp::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE, HeaderValue};
use warp::http::StatusCode;
use warp::path::FullPath;
use warp::reply::Response;

const CONVERT_PATH: &str = "/convert/";

/// Shared, read-only server state.
#[derive(Debug)]
pub struct AppState {
    pub settings: Settings,
    pub fetcher: Fetcher,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            fetcher: Fetcher::new(),
        }
    }
}

/// All routes as one filter: the raw path and query go to `dispatch`.
pub fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Response,), Error = warp::Rejection> + Clone {
    let with_state = warp::any().map(move || state.clone());
    let raw_query = warp::query::raw()
        .or(warp::any().map(String::new))
        .unify();

    warp::get()
        .and(warp::path::full())
        .and(raw_query)
        .and(with_state)
        .then(|path: FullPath, query: String, state: Arc<AppState>| async move {
            dispatch(&state, path.as_str(), &query).await
        })
}

async fn dispatch(state: &AppState, path: &str, query: &str) -> Response {
    info!("GET {}", path);

    let result = if path == "/report" {
        serve_report(state, query).await
    } else if path == "/observer.js" {
        serve_observer_script(state)
    } else if let Some(rest) = path.strip_prefix(CONVERT_PATH).filter(|r| !r.is_empty()) {
        serve_convert(state, rest, query).await
    } else {
        serve_static_file(&state.settings.static_root, path).await
    };

    result.unwrap_or_else(|err| {
        error!("{} failed: {:#}", path, err);
        not_found()
    })
}

async fn serve_report(state: &AppState, raw_query: &str) -> Result<Response> {
    let params = query::parse_query(raw_query);
    let page = params
        .get("page")
        .filter(|p| !p.is_empty())
        .ok_or_else(|| anyhow!("no `page` provided"))?;
    let prerender = params.get("prerender").is_some_and(|v| v == "1");
    info!("Will try to handle {}", page);

    let report = generate_page_report(&state.fetcher, &state.settings, page, prerender).await?;
    let table = render_report_table(&report, &state.settings.public_base);

    let mut response = respond(table.into_bytes(), HeaderValue::from_static("text/html; charset=utf-8"));
    response
        .headers_mut()
        .insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    Ok(response)
}

/// `rest` is `<ext>/<url>`; the request's query string belongs to `<url>`.
async fn serve_convert(state: &AppState, rest: &str, raw_query: &str) -> Result<Response> {
    let (ext, src) = rest
        .split_once('/')
        .ok_or_else(|| anyhow!("no source URL in /convert/{}", rest))?;
    let format =
        ImageFormat::from_extension(ext).ok_or_else(|| anyhow!("don't know how to encode {}", ext))?;
    if src.is_empty() {
        bail!("empty source URL");
    }

    let src = if raw_query.is_empty() {
        src.to_string()
    } else {
        format!("{}?{}", src, raw_query)
    };

    let encoded = convert_url(&state.fetcher, &state.settings, &src, format).await?;
    Ok(respond(encoded, HeaderValue::from_static(format.mime())))
}

fn serve_observer_script(state: &AppState) -> Result<Response> {
    let script = observer_script(&state.settings.src_prefix, state.settings.prefix_policy)?;
    Ok(respond(
        script.into_bytes(),
        HeaderValue::from_static("application/javascript; charset=utf-8"),
    ))
}

async fn serve_static_file(root: &Path, path: &str) -> Result<Response> {
    let relative = match path.trim_start_matches('/') {
        "" => "index.html",
        p => p,
    };
    let relative = Path::new(relative);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        bail!("refusing to serve {}", path);
    }

    let full = root.join(relative);
    let body = tokio::fs::read(&full)
        .await
        .with_context(|| format!("read {}", full.display()))?;
    let mime = mime_guess::from_path(&full).first_or_octet_stream();
    let content_type = HeaderValue::from_str(mime.as_ref())
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    Ok(respond(body, content_type))
}

fn respond(body: Vec<u8>, content_type: HeaderValue) -> Response {
    let mut response = Response::new(body.into());
    response.headers_mut().insert(CONTENT_TYPE, content_type);
    response
}

fn not_found() -> Response {
    let mut response = Response::new(Vec::new().into());
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

/// Run the server until Ctrl-C.
pub async fn serve(settings: Settings) -> Result<()> {
    let port = settings.port;
    let state = Arc::new(AppState::new(settings));
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let (bound, server) = warp::serve(routes(state))
        .try_bind_with_graceful_shutdown(addr, async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .with_context(|| format!("could not bind port {}", port))?;

    info!("Started HTTP server at http://localhost:{}", bound.port());
    server.await;
    Ok(())
}
