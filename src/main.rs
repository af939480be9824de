//!
//! admin-console binary
//! --------------------
//! Interactive terminal front-end for the user and role administration
//! backend. Keeps one cookie session for the whole run; notifications go to
//! stderr and confirmations are read from stdin.

use std::env;
use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

use admin_console::app::Console;
use admin_console::cli::{execute, parse_command, Command, Flow};
use admin_console::config::ConsoleConfig;
use admin_console::transport::HttpSession;
use admin_console::ui::{Confirmer, Notifier, Severity};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--url <base_url>] [--user <u> --password <p>] [--debounce-ms <ms>]\n\nFlags:\n  --url <url>             Backend base URL (default from ADMIN_CONSOLE_URL or http://127.0.0.1:5000)\n  --user <u>              Sign in at startup (requires --password)\n  --password <p>          Password for --user\n  --debounce-ms <ms>      Quiet period for 'users search' (default 500)\n  -h, --help              Show this help\n\nType 'help' inside the console for the command list."
    );
}

struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        let color = match severity {
            Severity::Success => 32,
            Severity::Warning => 33,
            Severity::Error => 31,
        };
        eprintln!("[\x1b[{}m{}\x1b[0m] {}", color, severity, message);
    }
}

/// Reads a y/N answer from stdin on the blocking pool.
struct ConsoleConfirmer;

#[async_trait]
impl Confirmer for ConsoleConfirmer {
    async fn confirm(&self, prompt: &str) -> bool {
        let prompt = prompt.to_string();
        let answer = tokio::task::spawn_blocking(move || {
            eprint!("{} [y/N] ", prompt);
            let _ = io::stderr().flush();
            let mut s = String::new();
            io::stdin().read_line(&mut s).map(|_| s)
        })
        .await;
        match answer {
            Ok(Ok(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "y" | "yes" | "s" | "si"),
            _ => false,
        }
    }
}

struct Flags {
    url: Option<String>,
    user: Option<String>,
    password: Option<String>,
    debounce_ms: Option<u64>,
}

fn flag_value(program: &str, args: &[String], i: usize, name: &str) -> Result<String> {
    match args.get(i + 1) {
        Some(v) => Ok(v.clone()),
        None => {
            print_usage(program);
            anyhow::bail!("{} requires a value", name)
        }
    }
}

fn parse_flags(program: &str, args: &[String]) -> Result<Flags> {
    let mut flags = Flags { url: None, user: None, password: None, debounce_ms: None };
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--url" => flags.url = Some(flag_value(program, args, i, "--url")?),
            "--user" => flags.user = Some(flag_value(program, args, i, "--user")?),
            "--password" => flags.password = Some(flag_value(program, args, i, "--password")?),
            "--debounce-ms" => {
                let v = flag_value(program, args, i, "--debounce-ms")?;
                flags.debounce_ms = Some(v.parse().with_context(|| format!("invalid --debounce-ms '{}'", v))?);
            }
            "-h" | "--help" => {
                print_usage(program);
                std::process::exit(0);
            }
            other => {
                print_usage(program);
                anyhow::bail!("unknown argument '{}'", other);
            }
        }
        i += 2;
    }
    Ok(flags)
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).try_init();

    let mut args: Vec<String> = env::args().collect();
    let program = args.remove(0);
    let flags = parse_flags(&program, &args)?;

    let mut config = ConsoleConfig::from_env();
    if let Some(url) = flags.url {
        config.base_url = url;
    }
    if let Some(ms) = flags.debounce_ms {
        config.debounce_ms = ms;
    }
    tracing::info!(target: "console", base_url = %config.base_url, debounce_ms = config.debounce_ms, "admin console starting");

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    let _enter = rt.enter();

    let transport = Arc::new(HttpSession::new(&config.base_url, config.request_timeout())?);
    let console = Console::new(config, transport, Arc::new(ConsoleNotifier), Arc::new(ConsoleConfirmer));
    let loc = rt.block_on(console.start("/"));
    println!("at {}", loc.path);
    let _router = console.spawn_router_loop();

    match (flags.user, flags.password) {
        (Some(usuario), Some(contrasena)) => {
            let cmd = Command::Login { usuario, contrasena };
            match rt.block_on(execute(&console, cmd)) {
                Ok(Flow::Continue(text)) => println!("{}", text),
                Ok(Flow::Quit) => return Ok(()),
                Err(e) => eprintln!("login failed: {}", e),
            }
        }
        (Some(_), None) | (None, Some(_)) => eprintln!("--user and --password must be given together; starting signed out"),
        (None, None) => {}
    }

    let mut rl = DefaultEditor::new().context("failed to initialise line editor")?;
    println!("admin console. Type 'help' for commands.");
    loop {
        let prompt = format!("{}> ", console.location().path);
        let line = match rl.readline(&prompt) {
            Ok(l) => l,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("failed to read input"),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line);
        let cmd = match parse_command(line) {
            Ok(Some(c)) => c,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("error: {}", e);
                continue;
            }
        };
        match rt.block_on(execute(&console, cmd)) {
            Ok(Flow::Continue(text)) => println!("{}", text),
            Ok(Flow::Quit) => break,
            Err(e) => eprintln!("error: {:#}", e),
        }
        // Pick up redirects scheduled by the last command.
        rt.block_on(console.sync());
    }
    Ok(())
}
