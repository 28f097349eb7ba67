use std::io::{Read, Write};
use std::path::Path;

use girafscript::cli::{self, CliArgs, ConfigFile};
use girafscript::config::Config;
use girafscript::render::{render_fragment, try_render};

const USAGE: &str = "Usage: girafscript [-f[<file>]] [-D<name>=<value>]... [-e<text>] [-d] [<input>]";

fn main() {
    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("girafscript: {e}");
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    };

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if args.debug {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    if let Err(e) = run(args) {
        eprintln!("girafscript: {e}");
        std::process::exit(1);
    }
}

fn run(args: CliArgs) -> Result<(), String> {
    let mut config = load_config(&args.config)?;
    for def in &args.defines {
        config.define(def).map_err(|e| format!("-D{def}: {e}"))?;
    }

    let input = match &args.input {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("{}: {e}", path.display()))?,
        None => {
            let mut s = String::new();
            std::io::stdin()
                .read_to_string(&mut s)
                .map_err(|e| format!("stdin: {e}"))?;
            s
        }
    };

    let engine = config.engine();
    let mut ctx = config.context();
    let output = match args.fallback.as_deref().or(config.fallback.as_deref()) {
        Some(fallback) => render_fragment(&engine, &input, &mut ctx, Some(fallback)),
        None => try_render(&engine, &input, &mut ctx).map_err(|e| e.to_string())?,
    };

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(output.as_bytes())
        .and_then(|()| stdout.flush())
        .map_err(|e| format!("stdout: {e}"))
}

// ── rc file ───────────────────────────────────────────────────────────────────

fn load_config(choice: &ConfigFile) -> Result<Config, String> {
    match choice {
        ConfigFile::Skip => Ok(Config::new()),
        ConfigFile::Explicit(path) => load_rc(path),
        ConfigFile::Search => match cli::find_user_config() {
            Some(path) => load_rc(&path),
            None => {
                log::debug!("no rc file found");
                Ok(Config::new())
            }
        },
    }
}

fn load_rc(path: &Path) -> Result<Config, String> {
    log::debug!("loading {}", path.display());
    let (config, errors) =
        Config::load_file(path).map_err(|e| format!("{}: {e}", path.display()))?;
    for e in &errors {
        log::warn!("{}: {e}", path.display());
    }
    Ok(config)
}
