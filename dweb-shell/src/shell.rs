use crate::command::{Command, parse_command};
use dweb_common::{DEFAULT_PROGRAM_NAME, DwebError, Result};
use dweb_pipe::{LinkTable, Renderer};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};
use url::Url;

pub const USAGE: &str = "dweb usage:\n \
    <url>     go to URL\n \
    <number>  follow link\n \
    q         quit\n";

/// The read/dispatch loop: URLs are rendered, numbers follow links from the
/// last rendered page, `q` quits.
pub struct Shell<R> {
    renderer: R,
    links: LinkTable,
    program: String,
    prompt: String,
    chatty: bool,
    start_page: Option<Vec<u8>>,
}

impl<R: Renderer> Shell<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            links: LinkTable::new(),
            program: DEFAULT_PROGRAM_NAME.to_string(),
            prompt: "> ".to_string(),
            chatty: false,
            start_page: None,
        }
    }

    /// Print the banner, prompts, link echoes and blank separators.
    pub fn with_chatty(mut self, chatty: bool) -> Self {
        self.chatty = chatty;
        self
    }

    /// Prefix for error lines, normally `argv[0]`.
    pub fn with_program_name(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Page rendered once before the first prompt.
    pub fn with_start_page(mut self, target: Option<String>) -> Self {
        self.start_page = target.map(String::into_bytes);
        self
    }

    pub fn links(&self) -> &LinkTable {
        &self.links
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Run until end of input or `q`.
    ///
    /// Lines are handled as bytes, so input in any encoding reaches the
    /// browser as typed. Only an I/O failure on `input` ends the loop with an
    /// error; page load problems are reported on `err` and the loop carries on.
    pub async fn run<I, O, E>(&mut self, mut input: I, out: &mut O, err: &mut E) -> Result<()>
    where
        I: AsyncBufRead + Unpin,
        O: Write,
        E: Write,
    {
        if self.chatty {
            writeln!(out, "{USAGE}")?;
        }

        if let Some(target) = self.start_page.take() {
            self.visit(&target, out, err).await?;
            self.separate(out)?;
        }

        let mut line = Vec::new();
        loop {
            if self.chatty {
                write!(out, "{}", self.prompt)?;
                out.flush()?;
            }

            line.clear();
            let read = input
                .read_until(b'\n', &mut line)
                .await
                .map_err(|e| DwebError::Input(e.to_string()))?;
            if read == 0 {
                debug!("end of input");
                break;
            }
            let entry = line.strip_suffix(b"\n").unwrap_or(&line[..]);
            let entry = entry.strip_suffix(b"\r").unwrap_or(entry);

            match parse_command(entry) {
                Command::Empty => continue,
                Command::Quit => break,
                Command::Follow(index) => self.follow(index, out, err).await?,
                Command::Visit(target) => self.visit(&target, out, err).await?,
            }

            self.separate(out)?;
        }

        Ok(())
    }

    async fn follow<O, E>(&mut self, index: i64, out: &mut O, err: &mut E) -> Result<()>
    where
        O: Write,
        E: Write,
    {
        let target = match self.links.get(index) {
            Ok(url) => url.to_vec(),
            Err(e) => {
                debug!(index, error = %e, "link lookup failed");
                writeln!(err, "{}: {}\n", self.program, e)?;
                return Ok(());
            }
        };

        if self.chatty {
            out.write_all(b"(")?;
            out.write_all(&target)?;
            out.write_all(b")\n")?;
        }
        self.visit(&target, out, err).await
    }

    async fn visit<O, E>(&mut self, target: &[u8], out: &mut O, err: &mut E) -> Result<()>
    where
        O: Write,
        E: Write,
    {
        // The pager shares our terminal; anything buffered must land first.
        out.flush()?;

        let label = log_label(target);
        match self.renderer.render(target, &mut self.links).await {
            Ok(report) => {
                info!(page = %label, lines = report.lines, links = report.links, "visited");
            }
            Err(e) => {
                warn!(page = %label, error = %e, "page load failed");
                writeln!(err, "{}: {}", self.program, e)?;
            }
        }
        Ok(())
    }

    fn separate<O: Write>(&self, out: &mut O) -> Result<()> {
        if self.chatty {
            writeln!(out)?;
        }
        Ok(())
    }
}

/// Scheme, host and path only; query strings and fragments stay out of logs.
fn log_label(target: &[u8]) -> String {
    let target = String::from_utf8_lossy(target);
    match Url::parse(&target) {
        Ok(url) => match url.host_str() {
            Some(host) => format!("{}://{}{}", url.scheme(), host, url.path()),
            None => format!("{}:{}", url.scheme(), url.path()),
        },
        Err(_) => target.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_label_drops_query_and_fragment() {
        assert_eq!(
            log_label(b"https://example.org/search?q=secret#top"),
            "https://example.org/search"
        );
        assert_eq!(log_label(b"about:blank"), "about:blank");
        assert_eq!(log_label(b"index.html"), "index.html");
        assert_eq!(log_label(b"caf\xe9.html"), "caf\u{fffd}.html");
    }

    #[test]
    fn usage_lists_every_command() {
        assert!(USAGE.starts_with("dweb usage:\n"));
        assert!(USAGE.contains(" <url>     go to URL\n"));
        assert!(USAGE.contains(" <number>  follow link\n"));
        assert!(USAGE.ends_with(" q         quit\n"));
    }
}
