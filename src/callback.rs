//! One-shot HTTP listener that catches Google's OAuth redirect.
//!
//! Binding and waiting are separate steps so the caller can open the
//! browser only once the port is actually held.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use gcalendar_core::{GcalError, GcalResult};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use url::Url;

const DEFAULT_CALLBACK_PORT: u16 = 3000;

/// Upper bound on the request line plus headers of one callback request.
const MAX_REQUEST_BYTES: u64 = 8192;

const SUCCESS_PAGE: &str = "<!DOCTYPE html>
<html>
<head><title>gcalendar-mcp</title></head>
<body style=\"font-family: sans-serif; text-align: center; padding-top: 4em;\">
<h1>Authentication successful!</h1>
<p>You can close this window and return to the terminal.</p>
</body>
</html>
";

/// A receiver that has not claimed its port yet.
#[derive(Debug, Clone)]
pub struct CallbackReceiver {
    addr: SocketAddr,
    path: String,
    also_ipv6: bool,
}

impl CallbackReceiver {
    pub fn new(addr: SocketAddr, path: impl Into<String>) -> Self {
        Self {
            addr,
            path: path.into(),
            also_ipv6: false,
        }
    }

    /// Listen on the port and path of the configured redirect URI.
    /// Without an explicit port, 3000 is used.
    ///
    /// A `localhost` redirect is served on both `127.0.0.1` and `::1`, since
    /// the browser may resolve it to either.
    pub fn from_redirect_uri(redirect_uri: &str) -> GcalResult<Self> {
        let url = Url::parse(redirect_uri)
            .map_err(|e| GcalError::Config(format!("Invalid redirect URI {}: {}", redirect_uri, e)))?;

        let port = url.port().unwrap_or(DEFAULT_CALLBACK_PORT);
        let mut receiver = Self::new(SocketAddr::from((Ipv4Addr::LOCALHOST, port)), url.path());
        receiver.also_ipv6 = url.host_str() == Some("localhost");
        Ok(receiver)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub async fn bind(self) -> GcalResult<ListeningReceiver> {
        let listener = TcpListener::bind(self.addr).await.map_err(|e| {
            GcalError::Callback(format!("Failed to bind callback server on {}: {}", self.addr, e))
        })?;

        let ipv6 = if self.also_ipv6 {
            bind_ipv6_loopback(&listener).await
        } else {
            None
        };

        tracing::debug!(addr = %self.addr, path = %self.path, "OAuth callback server listening");

        Ok(ListeningReceiver {
            listener,
            ipv6,
            path: self.path,
        })
    }
}

/// Same port as `listener`, on `::1`. Hosts without IPv6 loopback just skip it.
async fn bind_ipv6_loopback(listener: &TcpListener) -> Option<TcpListener> {
    let port = listener.local_addr().ok()?.port();
    let addr = SocketAddr::from((Ipv6Addr::LOCALHOST, port));

    match TcpListener::bind(addr).await {
        Ok(listener) => Some(listener),
        Err(e) => {
            tracing::debug!(%addr, "IPv6 loopback unavailable: {}", e);
            None
        }
    }
}

/// A bound receiver. Consumed by [`ListeningReceiver::await_code`], which
/// closes the listener when it returns.
#[derive(Debug)]
pub struct ListeningReceiver {
    listener: TcpListener,
    ipv6: Option<TcpListener>,
    path: String,
}

#[derive(Debug, PartialEq)]
enum Outcome {
    Ignored,
    Code(String),
    Failed(String),
}

impl ListeningReceiver {
    pub fn local_addr(&self) -> GcalResult<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| GcalError::Callback(e.to_string()))
    }

    /// Serve requests until one hits the callback path.
    ///
    /// Connections are served concurrently, so a browser's idle preconnect
    /// socket cannot hold up the real redirect. Other paths get a 404 and
    /// are otherwise ignored. A callback carrying `code` completes; one
    /// without it (or carrying `error`) fails. Connections still open when
    /// this returns are dropped.
    pub async fn await_code(self) -> GcalResult<String> {
        let path: Arc<str> = Arc::from(self.path.as_str());
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                accepted = accept(&self.listener, self.ipv6.as_ref()) => {
                    let (stream, peer) = accepted
                        .map_err(|e| GcalError::Callback(format!("Failed to accept connection: {}", e)))?;
                    let path = path.clone();
                    connections.spawn(async move { (peer, handle_connection(stream, &path).await) });
                }
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    match joined {
                        Ok((_, Ok(Outcome::Code(code)))) => return Ok(code),
                        Ok((_, Ok(Outcome::Failed(reason)))) => return Err(GcalError::Callback(reason)),
                        Ok((_, Ok(Outcome::Ignored))) => {}
                        Ok((peer, Err(e))) => {
                            tracing::debug!(%peer, "Dropped callback connection: {}", e);
                        }
                        Err(e) => tracing::debug!("Callback connection task failed: {}", e),
                    }
                }
            }
        }
    }
}

async fn accept(
    listener: &TcpListener,
    ipv6: Option<&TcpListener>,
) -> std::io::Result<(TcpStream, SocketAddr)> {
    match ipv6 {
        Some(ipv6) => tokio::select! {
            accepted = listener.accept() => accepted,
            accepted = ipv6.accept() => accepted,
        },
        None => listener.accept().await,
    }
}

async fn handle_connection<S>(stream: S, callback_path: &str) -> std::io::Result<Outcome>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (read_half, mut write_half) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half.take(MAX_REQUEST_BYTES));

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    // Opened and closed without a request
    if request_line.trim().is_empty() {
        return Ok(Outcome::Ignored);
    }

    if !request_line.ends_with('\n') {
        write_half
            .write_all(http_response("400 Bad Request", "text/plain", "Request too large").as_bytes())
            .await?;
        return Ok(Outcome::Ignored);
    }

    loop {
        let mut header = String::new();
        let n = reader.read_line(&mut header).await?;
        if n == 0 || header.trim().is_empty() {
            break;
        }
    }

    let target = request_line.split_whitespace().nth(1).unwrap_or("/");
    let url = Url::parse(&format!("http://localhost{}", target)).ok();

    let Some(url) = url.filter(|u| u.path() == callback_path) else {
        write_half
            .write_all(http_response("404 Not Found", "text/plain", "Not found").as_bytes())
            .await?;
        return Ok(Outcome::Ignored);
    };

    let param = |name: &str| {
        url.query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    };

    let outcome = match (param("code"), param("error")) {
        (_, Some(error)) => Outcome::Failed(format!("Authorization denied: {}", error)),
        (Some(code), None) if !code.is_empty() => Outcome::Code(code),
        _ => Outcome::Failed("Authorization code not received".to_string()),
    };

    let response = match &outcome {
        Outcome::Code(_) => http_response("200 OK", "text/html; charset=utf-8", SUCCESS_PAGE),
        Outcome::Failed(reason) => http_response("400 Bad Request", "text/plain", reason),
        Outcome::Ignored => http_response("404 Not Found", "text/plain", "Not found"),
    };
    write_half.write_all(response.as_bytes()).await?;
    write_half.flush().await?;

    Ok(outcome)
}

fn http_response(status: &str, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        content_type,
        body.len(),
        body
    )
}
