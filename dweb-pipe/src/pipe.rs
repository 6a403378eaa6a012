use crate::links::LinkTable;
use async_trait::async_trait;
use dweb_common::{DwebError, Result};
use std::ffi::OsString;
use std::io;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, instrument, warn};

/// Outcome of a page load.
#[derive(Debug, Clone, Default)]
pub struct RenderReport {
    /// Lines read from the browser.
    pub lines: usize,
    /// Link lines recorded into the table.
    pub links: usize,
    pub browser_status: Option<ExitStatus>,
    pub pager_status: Option<ExitStatus>,
    /// The pager stopped reading before the page ended.
    pub pager_closed_early: bool,
}

/// Displays a target and refreshes the link table from what it rendered.
///
/// Targets are raw bytes: whatever the user typed or the page linked to,
/// encoding and all.
#[async_trait]
pub trait Renderer: Send {
    async fn render(&mut self, target: &[u8], links: &mut LinkTable) -> Result<RenderReport>;
}

/// `browser | (scan links) | pager`, with the scanner running in-process.
#[derive(Debug, Clone)]
pub struct PipeRenderer {
    browser: String,
    dump_args: Vec<String>,
    pager: String,
    pager_args: Vec<String>,
}

impl PipeRenderer {
    pub fn new(browser: impl Into<String>, pager: impl Into<String>) -> Self {
        Self {
            browser: browser.into(),
            dump_args: Vec::new(),
            pager: pager.into(),
            pager_args: Vec::new(),
        }
    }

    /// Arguments placed between the browser program and the target.
    pub fn with_dump_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dump_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_pager_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pager_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn browser(&self) -> &str {
        &self.browser
    }

    pub fn pager(&self) -> &str {
        &self.pager
    }

    fn spawn_browser(&self, target: &[u8]) -> Result<Child> {
        Command::new(&self.browser)
            .args(&self.dump_args)
            .arg(os_arg(target))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DwebError::spawn(&self.browser, e))
    }

    fn spawn_pager(&self) -> Result<Child> {
        Command::new(&self.pager)
            .args(&self.pager_args)
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|e| DwebError::spawn(&self.pager, e))
    }
}

#[async_trait]
impl Renderer for PipeRenderer {
    #[instrument(skip_all)]
    async fn render(&mut self, target: &[u8], links: &mut LinkTable) -> Result<RenderReport> {
        debug!(browser = %self.browser, pager = %self.pager, "starting page load");
        let mut browser = self.spawn_browser(target)?;
        let browser_out = browser
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("browser stdout was not captured"))?;

        let mut pager = match self.spawn_pager() {
            Ok(pager) => pager,
            Err(e) => {
                if let Err(kill_err) = browser.kill().await {
                    debug!(error = %kill_err, "browser already gone");
                }
                return Err(e);
            }
        };
        let pager_in = match pager.stdin.take() {
            Some(stdin) => stdin,
            None => {
                let _ = browser.kill().await;
                let _ = pager.wait().await;
                return Err(io::Error::other("pager stdin was not captured").into());
            }
        };

        // Both children are up; the previous page's links are stale from here on.
        links.clear();

        let pumped = pump(BufReader::new(browser_out), pager_in, links).await;
        if pumped.is_err() {
            let _ = browser.start_kill();
        }

        let browser_status = browser.wait().await?;
        let pager_status = pager.wait().await?;
        if !browser_status.success() {
            warn!(status = %browser_status, "browser exited unsuccessfully");
        }
        if !pager_status.success() {
            warn!(status = %pager_status, "pager exited unsuccessfully");
        }

        let stats = pumped?;
        info!(
            lines = stats.lines,
            links = stats.links,
            pager_closed_early = stats.pager_closed_early,
            "page rendered"
        );

        Ok(RenderReport {
            lines: stats.lines,
            links: stats.links,
            browser_status: Some(browser_status),
            pager_status: Some(pager_status),
            pager_closed_early: stats.pager_closed_early,
        })
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PumpStats {
    pub lines: usize,
    pub links: usize,
    pub pager_closed_early: bool,
}

/// Copy `reader` to `writer` line by line, recording link lines on the way.
///
/// Bytes are forwarded untouched. Once the writer fails it is dropped, but
/// the reader is still drained so every link on the page is recorded.
pub(crate) async fn pump<R, W>(
    mut reader: R,
    writer: W,
    links: &mut LinkTable,
) -> io::Result<PumpStats>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut stats = PumpStats::default();
    let mut sink = Some(writer);
    let mut buf = Vec::with_capacity(256);

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        stats.lines += 1;
        if links.extract(&buf).is_some() {
            stats.links += 1;
        }

        if let Some(w) = sink.as_mut() {
            if let Err(e) = w.write_all(&buf).await {
                log_write_error(&e);
                stats.pager_closed_early = true;
                sink = None;
            }
        }
    }

    if let Some(mut w) = sink {
        if let Err(e) = w.shutdown().await {
            log_write_error(&e);
        }
    }

    Ok(stats)
}

#[cfg(unix)]
fn os_arg(bytes: &[u8]) -> OsString {
    use std::os::unix::ffi::OsStringExt;
    OsString::from_vec(bytes.to_vec())
}

// Without byte-level argv the best we can do is a lossy string.
#[cfg(not(unix))]
fn os_arg(bytes: &[u8]) -> OsString {
    OsString::from(String::from_utf8_lossy(bytes).into_owned())
}

fn log_write_error(e: &io::Error) {
    if e.kind() == io::ErrorKind::BrokenPipe {
        debug!("pager closed its input");
    } else {
        warn!(error = %e, "writing to pager failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// Accepts `budget` writes, then reports a broken pipe.
    struct ClosingWriter {
        budget: usize,
        written: Vec<u8>,
    }

    impl AsyncWrite for ClosingWriter {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            if self.budget == 0 {
                return Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()));
            }
            self.budget -= 1;
            self.written.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    const PAGE: &[u8] = b"Example Domain\n\
        More information...\n\
        \n\
        References:\n\
        \n\
        [1] https://www.iana.org/domains/example\n\
        [2] https://example.org/two";

    #[tokio::test]
    async fn forwards_bytes_and_collects_links() {
        let mut links = LinkTable::new();
        let mut out = Vec::new();

        let stats = pump(PAGE, &mut out, &mut links).await.unwrap();

        assert_eq!(out, PAGE);
        assert_eq!(stats.lines, 7);
        assert_eq!(stats.links, 2);
        assert!(!stats.pager_closed_early);
        assert_eq!(links.get(1), Ok(&b"https://www.iana.org/domains/example"[..]));
        assert_eq!(links.get(2), Ok(&b"https://example.org/two"[..]));
    }

    #[tokio::test]
    async fn keeps_scanning_after_pager_closes() {
        let mut links = LinkTable::new();
        let mut out = ClosingWriter {
            budget: 1,
            written: Vec::new(),
        };

        let stats = pump(PAGE, &mut out, &mut links).await.unwrap();

        assert!(stats.pager_closed_early);
        assert_eq!(out.written, b"Example Domain\n");
        assert_eq!(stats.links, 2);
        assert_eq!(links.get(2), Ok(&b"https://example.org/two"[..]));
    }

    #[tokio::test]
    async fn non_utf8_lines_pass_through() {
        let page: &[u8] = b"caf\xe9\n[4] http://latin1.example/caf\xe9\n";
        let mut links = LinkTable::new();
        let mut out = Vec::new();

        pump(page, &mut out, &mut links).await.unwrap();

        assert_eq!(out, page);
        assert_eq!(links.get(4), Ok(&b"http://latin1.example/caf\xe9"[..]));
    }

    #[tokio::test]
    async fn missing_browser_is_a_spawn_error() {
        let mut renderer = PipeRenderer::new("dweb-no-such-browser-binary", "cat");
        let mut links = LinkTable::new();
        links.extract(b"[1] http://kept.example/");

        let err = renderer.render(b"http://x", &mut links).await.unwrap_err();

        assert!(matches!(
            err,
            DwebError::Spawn { ref program, .. } if program == "dweb-no-such-browser-binary"
        ));
        assert_eq!(links.get(1), Ok(&b"http://kept.example/"[..]));
    }
}
