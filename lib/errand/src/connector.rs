//! HTTPS connector using rustls, over a TCP connector that can route
//! through an HTTP or SOCKS5 proxy.
//!
//! - direct: plain TCP to the target
//! - HTTP proxy, `http://` target: TCP to the proxy, requests sent in
//!   absolute form
//! - HTTP proxy, `https://` target: `CONNECT` tunnel, then TLS to the target
//! - SOCKS5 proxy: SOCKS5 `CONNECT` (no authentication, remote DNS)
//!
//! The route is picked for every connection from the scheme of the target
//! being dialed, so redirect hops that change scheme change route too.

use std::future::Future;
use std::io;
use std::net::IpAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use http::Uri;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::{Connected, Connection, HttpConnector};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tower::{Service, ServiceExt};

use crate::{Error, Proxy};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const MAX_CONNECT_RESPONSE: usize = 8 * 1024;

const SOCKS_VERSION: u8 = 0x05;
const SOCKS_NO_AUTH: u8 = 0x00;
const SOCKS_CMD_CONNECT: u8 = 0x01;
const SOCKS_ATYP_IPV4: u8 = 0x01;
const SOCKS_ATYP_DOMAIN: u8 = 0x03;
const SOCKS_ATYP_IPV6: u8 = 0x04;

/// Create an HTTPS connector with rustls, routed through the entries of
/// `proxy` when set.
///
/// HTTP/1.1 only, with TLS using the Mozilla root certificates. A
/// malformed proxy URL is reported when a connection is first dialed.
#[must_use]
pub fn https_connector(proxy: Option<&Proxy>, connect_timeout: Duration) -> HttpsConnector<ProxyConnector> {
    // Build rustls client config with webpki roots
    let root_store: rustls::RootCertStore =
        webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();

    let tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    HttpsConnectorBuilder::new()
        .with_tls_config(tls_config)
        .https_or_http()
        .enable_http1()
        .wrap_connector(ProxyConnector::new(proxy, connect_timeout))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Route {
    Direct,
    Http(Uri),
    Socks5(Uri),
    Invalid(String),
}

impl Route {
    fn parse(proxy: Option<&str>) -> Self {
        match proxy {
            None => Self::Direct,
            Some(proxy) => parse_proxy(proxy).unwrap_or_else(Self::Invalid),
        }
    }
}

fn parse_proxy(proxy: &str) -> Result<Route, String> {
    let uri: Uri = proxy
        .parse()
        .map_err(|err| format!("invalid proxy URL {proxy:?}: {err}"))?;
    let host = uri
        .host()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| format!("proxy URL {proxy:?} has no host"))?;
    let (socks, default_port) = match uri.scheme_str() {
        Some("http") => (false, 80),
        Some("socks5" | "socks5h") => (true, 1080),
        Some(other) => return Err(format!("unsupported proxy scheme {other:?}")),
        None => return Err(format!("proxy URL {proxy:?} has no scheme")),
    };
    let port = uri.port_u16().unwrap_or(default_port);
    let dial: Uri = format!("http://{host}:{port}")
        .parse()
        .map_err(|err| format!("invalid proxy URL {proxy:?}: {err}"))?;

    Ok(if socks {
        Route::Socks5(dial)
    } else {
        Route::Http(dial)
    })
}

/// Routes parsed once per target scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Routes {
    http: Route,
    https: Route,
}

impl Routes {
    fn new(proxy: Option<&Proxy>) -> Self {
        let route = |scheme: &str| Route::parse(proxy.and_then(|proxy| proxy.select(scheme)));
        Self {
            http: route("http"),
            https: route("https"),
        }
    }

    fn for_target(&self, dst: &Uri) -> &Route {
        if dst.scheme() == Some(&http::uri::Scheme::HTTPS) {
            &self.https
        } else {
            &self.http
        }
    }
}

/// TCP connector dialing either the target or a proxy.
#[derive(Debug, Clone)]
pub struct ProxyConnector {
    http: HttpConnector,
    routes: Arc<Routes>,
}

impl ProxyConnector {
    /// Connector for the given proxy map (`None` for direct connections).
    #[must_use]
    pub fn new(proxy: Option<&Proxy>, connect_timeout: Duration) -> Self {
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_connect_timeout(Some(connect_timeout));
        http.set_nodelay(true);

        Self {
            http,
            routes: Arc::new(Routes::new(proxy)),
        }
    }
}

impl Service<Uri> for ProxyConnector {
    type Response = ProxyStream;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<ProxyStream, BoxError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), BoxError>> {
        self.http.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, dst: Uri) -> Self::Future {
        let http = self.http.clone();
        let route = self.routes.for_target(&dst).clone();

        Box::pin(async move {
            match route {
                Route::Direct => {
                    let io = http.oneshot(dst).await?;
                    Ok(ProxyStream::new(io, false))
                }
                Route::Invalid(message) => Err(Error::proxy(message).into()),
                Route::Http(proxy) => {
                    tracing::debug!(%proxy, target = %dst, "dialing through HTTP proxy");
                    let io = dial_proxy(http, proxy).await?;
                    if dst.scheme() == Some(&http::uri::Scheme::HTTPS) {
                        let stream = connect_tunnel(io.into_inner(), &dst).await?;
                        Ok(ProxyStream::new(TokioIo::new(stream), false))
                    } else {
                        Ok(ProxyStream::new(io, true))
                    }
                }
                Route::Socks5(proxy) => {
                    tracing::debug!(%proxy, target = %dst, "dialing through SOCKS5 proxy");
                    let io = dial_proxy(http, proxy).await?;
                    let stream = socks5_connect(io.into_inner(), &dst).await?;
                    Ok(ProxyStream::new(TokioIo::new(stream), false))
                }
            }
        })
    }
}

async fn dial_proxy(http: HttpConnector, proxy: Uri) -> Result<TokioIo<TcpStream>, Error> {
    http.oneshot(proxy.clone())
        .await
        .map_err(|err| Error::proxy(format!("cannot reach proxy {proxy}: {err}")))
}

/// Target host (without IPv6 brackets) and port.
fn target(dst: &Uri) -> Result<(&str, u16), Error> {
    let host = dst
        .host()
        .ok_or_else(|| Error::proxy(format!("target {dst} has no host")))?;
    let default_port = if dst.scheme() == Some(&http::uri::Scheme::HTTPS) {
        443
    } else {
        80
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');
    Ok((host, dst.port_u16().unwrap_or(default_port)))
}

async fn connect_tunnel(mut stream: TcpStream, dst: &Uri) -> Result<TcpStream, Error> {
    let (host, port) = target(dst)?;
    let authority = match host.parse::<IpAddr>() {
        Ok(IpAddr::V6(_)) => format!("[{host}]:{port}"),
        _ => format!("{host}:{port}"),
    };
    let request = format!("CONNECT {authority} HTTP/1.1\r\nHost: {authority}\r\n\r\n");
    stream
        .write_all(request.as_bytes())
        .await
        .map_err(|err| Error::proxy(format!("cannot send CONNECT: {err}")))?;

    let head = read_response_head(&mut stream).await?;
    let status_line = head.lines().next().unwrap_or_default();
    if status_line.split_whitespace().nth(1) != Some("200") {
        return Err(Error::proxy(format!(
            "CONNECT to {authority} rejected: {}",
            status_line.trim()
        )));
    }
    Ok(stream)
}

async fn read_response_head(stream: &mut TcpStream) -> Result<String, Error> {
    let mut head = Vec::with_capacity(128);
    let mut byte = [0_u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        if head.len() >= MAX_CONNECT_RESPONSE {
            return Err(Error::proxy("CONNECT response too large"));
        }
        let read = stream
            .read(&mut byte)
            .await
            .map_err(|err| Error::proxy(format!("cannot read CONNECT response: {err}")))?;
        if read == 0 {
            return Err(Error::proxy("proxy closed the connection during CONNECT"));
        }
        head.extend_from_slice(&byte);
    }
    Ok(String::from_utf8_lossy(&head).into_owned())
}

fn socks_io(err: io::Error) -> Error {
    Error::proxy(format!("SOCKS5 handshake failed: {err}"))
}

async fn socks5_connect(mut stream: TcpStream, dst: &Uri) -> Result<TcpStream, Error> {
    let (host, port) = target(dst)?;

    stream
        .write_all(&[SOCKS_VERSION, 1, SOCKS_NO_AUTH])
        .await
        .map_err(socks_io)?;
    let mut method = [0_u8; 2];
    stream.read_exact(&mut method).await.map_err(socks_io)?;
    if method != [SOCKS_VERSION, SOCKS_NO_AUTH] {
        return Err(Error::proxy("SOCKS5 proxy requires authentication"));
    }

    let mut request = vec![SOCKS_VERSION, SOCKS_CMD_CONNECT, 0x00];
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => {
            request.push(SOCKS_ATYP_IPV4);
            request.extend_from_slice(&ip.octets());
        }
        Ok(IpAddr::V6(ip)) => {
            request.push(SOCKS_ATYP_IPV6);
            request.extend_from_slice(&ip.octets());
        }
        Err(_) => {
            let len = u8::try_from(host.len())
                .map_err(|_| Error::proxy(format!("host name too long for SOCKS5: {host}")))?;
            request.push(SOCKS_ATYP_DOMAIN);
            request.push(len);
            request.extend_from_slice(host.as_bytes());
        }
    }
    request.extend_from_slice(&port.to_be_bytes());
    stream.write_all(&request).await.map_err(socks_io)?;

    let mut header = [0_u8; 4];
    stream.read_exact(&mut header).await.map_err(socks_io)?;
    let [version, reply, _, address_type] = header;
    if version != SOCKS_VERSION {
        return Err(Error::proxy(format!("unexpected SOCKS version {version}")));
    }
    if reply != 0x00 {
        return Err(Error::proxy(format!(
            "SOCKS5 connect to {host}:{port} failed: {}",
            socks_reply_message(reply)
        )));
    }

    // bound address and port, unused
    let remaining = match address_type {
        SOCKS_ATYP_IPV4 => 4 + 2,
        SOCKS_ATYP_IPV6 => 16 + 2,
        SOCKS_ATYP_DOMAIN => {
            let [len] = {
                let mut len = [0_u8; 1];
                stream.read_exact(&mut len).await.map_err(socks_io)?;
                len
            };
            usize::from(len) + 2
        }
        other => {
            return Err(Error::proxy(format!("unknown SOCKS5 address type {other}")));
        }
    };
    let mut bound = vec![0_u8; remaining];
    stream.read_exact(&mut bound).await.map_err(socks_io)?;

    Ok(stream)
}

fn socks_reply_message(reply: u8) -> &'static str {
    match reply {
        0x01 => "general failure",
        0x02 => "connection not allowed by ruleset",
        0x03 => "network unreachable",
        0x04 => "host unreachable",
        0x05 => "connection refused",
        0x06 => "TTL expired",
        0x07 => "command not supported",
        0x08 => "address type not supported",
        _ => "unknown error",
    }
}

/// Connection returned by [`ProxyConnector`].
#[derive(Debug)]
pub struct ProxyStream {
    io: TokioIo<TcpStream>,
    forward: bool,
}

impl ProxyStream {
    fn new(io: TokioIo<TcpStream>, forward: bool) -> Self {
        Self { io, forward }
    }
}

impl Connection for ProxyStream {
    fn connected(&self) -> Connected {
        // forwarded requests must use absolute-form URIs
        self.io.inner().connected().proxy(self.forward)
    }
}

impl hyper::rt::Read for ProxyStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: hyper::rt::ReadBufCursor<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_read(cx, buf)
    }
}

impl hyper::rt::Write for ProxyStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.io).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_shutdown(cx)
    }

    fn is_write_vectored(&self) -> bool {
        self.io.is_write_vectored()
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.io).poll_write_vectored(cx, bufs)
    }
}
