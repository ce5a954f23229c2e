//! Remote archive source.
//!
//! Servers that advertise byte ranges and a length are read with Range
//! requests through [`ReadAt`]. Anything else is fetched with one plain
//! GET by [`HttpReader::download`].

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use super::ReadAt;
use crate::error::{Error, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RETRY: u32 = 10;

/// An archive behind an HTTP or HTTPS URL
pub struct HttpReader {
    client: Client,
    url: String,
    size: Option<u64>,
    ranged: bool,
    transferred_bytes: AtomicU64,
}

impl HttpReader {
    /// Probe the URL with a HEAD request.
    ///
    /// Only a non-success status is an error; a server without Range
    /// support or without `Content-Length` is still usable via
    /// [`download`](Self::download).
    pub async fn connect(url: String) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let resp = client.head(&url).send().await?;
        check_status(&resp, StatusCode::OK)?;

        let size = header(&resp, "content-length").and_then(|s| s.parse().ok());
        let ranged =
            size.is_some() && header(&resp, "accept-ranges").is_some_and(|v| v.contains("bytes"));
        debug!("{}: size {:?}, range requests {}", url, size, ranged);

        Ok(Self {
            client,
            url,
            size,
            ranged,
            transferred_bytes: AtomicU64::new(0),
        })
    }

    /// Whether [`ReadAt::read_at`] can be used on this source.
    pub fn supports_ranges(&self) -> bool {
        self.ranged
    }

    /// Total bytes received so far
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }

    /// Fetch the whole body with a single GET.
    pub async fn download(&self) -> Result<Vec<u8>> {
        let mut resp = self.send(|| self.client.get(&self.url)).await?;
        check_status(&resp, StatusCode::OK)?;

        let mut data = Vec::with_capacity(self.size.unwrap_or(0) as usize);
        while let Some(chunk) = resp.chunk().await? {
            data.extend_from_slice(&chunk);
            self.transferred_bytes
                .fetch_add(chunk.len() as u64, Ordering::Relaxed);
        }

        if let Some(size) = self.size.filter(|&size| size != data.len() as u64) {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("download ended at {} of {} bytes", data.len(), size),
            )));
        }
        Ok(data)
    }

    /// Send a request, retrying timeouts and connection failures.
    async fn send(&self, request: impl Fn() -> RequestBuilder) -> Result<Response> {
        let mut retry_count = 0;
        loop {
            match request().send().await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_timeout() || e.is_connect() => {
                    retry_count += 1;
                    if retry_count >= MAX_RETRY {
                        return Err(Error::Remote(format!("{}: max retries exceeded", self.url)));
                    }
                    warn!("Connection error, retry {}/{}: {}", retry_count, MAX_RETRY, e);
                    tokio::time::sleep(Duration::from_millis(500 * retry_count as u64)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn header<'a>(resp: &'a Response, name: &str) -> Option<&'a str> {
    resp.headers().get(name).and_then(|v| v.to_str().ok())
}

fn check_status(resp: &Response, expected: StatusCode) -> Result<()> {
    if resp.status() == expected {
        Ok(())
    } else {
        Err(Error::Remote(format!(
            "unexpected HTTP status {} (wanted {})",
            resp.status(),
            expected
        )))
    }
}

#[async_trait]
impl ReadAt for HttpReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if !self.ranged {
            return Err(Error::Remote(format!(
                "{} does not accept range requests",
                self.url
            )));
        }
        let size = self.size();
        if buf.is_empty() || offset >= size {
            return Ok(0);
        }

        let end = (offset + buf.len() as u64 - 1).min(size - 1);
        let wanted = (end - offset + 1) as usize;

        let mut received = 0;
        while received < wanted {
            let range = format!("bytes={}-{}", offset + received as u64, end);
            let resp = self
                .send(|| self.client.get(&self.url).header("Range", &range))
                .await?;
            check_status(&resp, StatusCode::PARTIAL_CONTENT)?;

            let bytes = resp.bytes().await?;
            if bytes.is_empty() {
                break;
            }
            let n = bytes.len().min(wanted - received);
            buf[received..received + n].copy_from_slice(&bytes[..n]);
            received += n;
            self.transferred_bytes.fetch_add(n as u64, Ordering::Relaxed);
        }

        Ok(received)
    }

    fn size(&self) -> u64 {
        self.size.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const BODY: &[u8] = b"JUNKfLaCAAAAfLaCBBBB";

    #[derive(Clone, Copy)]
    enum Server {
        /// Advertises ranges and answers each with at most 5 bytes
        Ranged,
        /// Ignores Range headers and never advertises them
        Plain,
        Missing,
    }

    async fn serve(kind: Server) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(respond(socket, kind));
            }
        });
        format!("http://{addr}/zm_test.all.sabs")
    }

    async fn respond(mut socket: TcpStream, kind: Server) {
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }
        let request = String::from_utf8_lossy(&request).into_owned();
        let is_head = request.starts_with("HEAD ");
        let range = request.lines().find_map(|line| {
            let (name, value) = line.split_once(':')?;
            let spec = value.trim().strip_prefix("bytes=")?;
            let (start, end) = spec.split_once('-')?;
            name.eq_ignore_ascii_case("range")
                .then(|| (start.parse::<usize>().ok(), end.parse::<usize>().ok()))
        });

        let (status, extra, payload) = match (kind, range) {
            (Server::Missing, _) => ("404 Not Found", String::new(), &b""[..]),
            (Server::Ranged, Some((Some(start), Some(end)))) => {
                let end = end.min(start + 4).min(BODY.len() - 1);
                (
                    "206 Partial Content",
                    format!("Content-Range: bytes {start}-{end}/{}\r\n", BODY.len()),
                    &BODY[start..=end],
                )
            }
            (Server::Ranged, _) => ("200 OK", "Accept-Ranges: bytes\r\n".to_string(), BODY),
            (Server::Plain, _) => ("200 OK", String::new(), BODY),
        };

        let head = format!(
            "HTTP/1.1 {status}\r\nContent-Length: {}\r\n{extra}Connection: close\r\n\r\n",
            payload.len()
        );
        let _ = socket.write_all(head.as_bytes()).await;
        if !is_head {
            let _ = socket.write_all(payload).await;
        }
        let _ = socket.shutdown().await;
    }

    #[tokio::test]
    async fn ranged_server_is_read_in_pieces() {
        let reader = HttpReader::connect(serve(Server::Ranged).await).await.unwrap();
        assert!(reader.supports_ranges());
        assert_eq!(reader.size(), BODY.len() as u64);

        let mut buf = [0u8; 12];
        let n = reader.read_at(4, &mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"fLaCAAAAfLaC");
        assert_eq!(reader.transferred_bytes(), 12);
    }

    #[tokio::test]
    async fn server_without_ranges_falls_back_to_download() {
        let reader = HttpReader::connect(serve(Server::Plain).await).await.unwrap();
        assert!(!reader.supports_ranges());

        let mut buf = [0u8; 4];
        assert!(matches!(reader.read_at(0, &mut buf).await, Err(Error::Remote(_))));

        assert_eq!(reader.download().await.unwrap(), BODY);
        assert_eq!(reader.transferred_bytes(), BODY.len() as u64);
    }

    #[tokio::test]
    async fn missing_url_is_remote_error() {
        let err = HttpReader::connect(serve(Server::Missing).await).await.err().unwrap();
        assert!(matches!(err, Error::Remote(_)));
    }
}
