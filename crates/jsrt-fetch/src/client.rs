//! The fetch state machine.
//!
//! One fetch walks ParsingUrl -> ResolvingDns -> Connecting ->
//! (Handshaking) -> Sending -> Receiving -> Settled, yielding to the event
//! loop only at the I/O boundaries. Any failure is reported with the
//! state it occurred in.

use crate::error::{FetchError, FetchResult, FetchState};
use crate::parser::ResponseParser;
use crate::request::{FetchUrl, RequestInit, serialize_request};
use crate::response::Response;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::debug;

/// Overall deadline for one fetch.
const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

static TLS_CONFIG: OnceLock<FetchResult<Arc<rustls::ClientConfig>>> = OnceLock::new();

fn tls_config() -> FetchResult<Arc<rustls::ClientConfig>> {
    let config = TLS_CONFIG.get_or_init(|| {
        let mut roots = rustls::RootCertStore::empty();
        let certs = rustls_native_certs::load_native_certs()
            .map_err(|err| FetchError::at(FetchState::Handshaking, err))?;
        for cert in certs {
            // Individually unusable platform certs are skipped.
            let _ = roots.add(cert);
        }
        Ok(Arc::new(
            rustls::ClientConfig::builder()
                .with_root_certificates(roots)
                .with_no_client_auth(),
        ))
    });
    match config {
        Ok(config) => Ok(config.clone()),
        Err(err) => Err(FetchError::at(FetchState::Handshaking, err)),
    }
}

/// Perform one fetch. Resolves with a [`Response`] once the HTTP parser
/// reports a complete message (or a usable one at EOF); rejects with the
/// failing state otherwise.
pub async fn fetch(url: &str, init: Option<RequestInit>) -> FetchResult<Response> {
    let init = init.unwrap_or_default();
    tokio::time::timeout(FETCH_TIMEOUT, fetch_inner(url, init))
        .await
        .map_err(|_| FetchError::at(FetchState::Receiving, "fetch timed out"))?
}

/// Perform a fetch from a pre-built [`Request`](crate::Request).
pub async fn fetch_request(request: crate::Request) -> FetchResult<Response> {
    let (url, init) = request.into_init();
    fetch(&url, Some(init)).await
}

async fn fetch_inner(url: &str, init: RequestInit) -> FetchResult<Response> {
    debug!(url, "fetch: parsing URL");
    let parsed = FetchUrl::parse(url)?;
    let request = serialize_request(&parsed, &init);

    debug!(host = %parsed.host, "fetch: resolving DNS");
    let address = resolve(&parsed).await?;

    debug!(%address, "fetch: connecting");
    let tcp = TcpStream::connect(address)
        .await
        .map_err(|err| FetchError::at(FetchState::Connecting, err))?;

    if parsed.is_https {
        debug!(host = %parsed.host, "fetch: TLS handshake");
        let connector = TlsConnector::from(tls_config()?);
        let server_name = rustls::pki_types::ServerName::try_from(parsed.host.clone())
            .map_err(|err| FetchError::at(FetchState::Handshaking, err))?;
        let tls = connector
            .connect(server_name, tcp)
            .await
            .map_err(|err| FetchError::at(FetchState::Handshaking, err))?;
        exchange(tls, &request).await
    } else {
        exchange(tcp, &request).await
    }
}

async fn resolve(url: &FetchUrl) -> FetchResult<SocketAddr> {
    let mut addresses = tokio::net::lookup_host((url.host.as_str(), url.port))
        .await
        .map_err(|err| FetchError::at(FetchState::ResolvingDns, err))?;
    addresses.next().ok_or_else(|| {
        FetchError::at(
            FetchState::ResolvingDns,
            format!("no addresses for '{}'", url.host),
        )
    })
}

/// Sending and Receiving over an established (possibly TLS) stream.
async fn exchange<S>(mut stream: S, request: &[u8]) -> FetchResult<Response>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream
        .write_all(request)
        .await
        .map_err(|err| FetchError::at(FetchState::Sending, err))?;

    let mut parser = ResponseParser::new();
    let mut chunk = [0u8; 16 * 1024];
    loop {
        let read = stream
            .read(&mut chunk)
            .await
            .map_err(|err| FetchError::at(FetchState::Receiving, err))?;
        if read == 0 {
            // EOF settles the parse one way or the other.
            let (head, body) = parser.finish()?;
            debug!(status = head.status, "fetch: settled at EOF");
            return Ok(Response::new(head, body));
        }
        parser.feed(&chunk[..read])?;
        if parser.is_complete() {
            let (head, body) = parser.finish()?;
            debug!(status = head.status, "fetch: settled");
            return Ok(Response::new(head, body));
        }
    }
}
