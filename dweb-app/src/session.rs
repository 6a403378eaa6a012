use anyhow::Result;
use dweb_common::DwebError;
use dweb_common::observability::{LogConfig, init_logging};
use dweb_config::{DwebConfig, DwebConfigLoader, default_config_path};
use dweb_pipe::PipeRenderer;
use dweb_shell::Shell;

use std::io::Write;
use std::path::PathBuf;

use crate::cli::Cli;

/// An explicit `--config` must exist; the per-user default is optional.
pub fn load_config(cli: &Cli) -> Result<DwebConfig> {
    let loader = DwebConfigLoader::new();
    let loader = match (&cli.config, default_config_path()) {
        (Some(path), _) => loader.with_file(path),
        (None, Some(path)) => loader.with_optional_file(path),
        (None, None) => loader,
    };
    let cfg = loader.load().map_err(|e| DwebError::Config(e.to_string()))?;
    Ok(cfg)
}

pub fn log_config(cfg: &DwebConfig, verbose: bool) -> LogConfig {
    LogConfig {
        app_name: "dweb",
        log_dir: cfg.log.dir.clone(),
        emit_stderr: verbose,
        format: cfg.log.format,
        default_filter: cfg.log.filter.clone(),
    }
}

/// Logging is optional: when the sink cannot be set up the shell still runs,
/// with one warning on `err`.
pub fn start_logging<E: Write>(
    cfg: &DwebConfig,
    verbose: bool,
    program: &str,
    err: &mut E,
) -> Option<PathBuf> {
    match init_logging(log_config(cfg, verbose)) {
        Ok(path) => Some(path),
        Err(e) => {
            let _ = writeln!(err, "{program}: logging disabled: {e:#}");
            None
        }
    }
}

pub fn build_renderer(cfg: &DwebConfig, cli: &Cli) -> PipeRenderer {
    let browser = cli.browser.as_deref().unwrap_or(&cfg.browser.program);
    let pager = cli.pager.as_deref().unwrap_or(&cfg.pager.program);

    PipeRenderer::new(browser, pager)
        .with_dump_args(cfg.browser.dump_args.iter().cloned())
        .with_pager_args(cfg.pager.args.iter().cloned())
}

/// Flags beat config; with neither, a terminal on stdin means chatty.
pub fn resolve_chatty(cli: &Cli, cfg: &DwebConfig, stdin_is_tty: bool) -> bool {
    cli.chatty_override()
        .or(cfg.shell.chatty)
        .unwrap_or(stdin_is_tty)
}

pub fn build_shell(
    cfg: &DwebConfig,
    cli: &Cli,
    program: &str,
    stdin_is_tty: bool,
) -> Shell<PipeRenderer> {
    Shell::new(build_renderer(cfg, cli))
        .with_program_name(program)
        .with_prompt(cfg.shell.prompt.clone())
        .with_chatty(resolve_chatty(cli, cfg, stdin_is_tty))
        .with_start_page(cli.url.clone())
}
