use anyhow::{bail, Result};
use explain::{ErrorDomain, Errno, GaiCode, Options};

pub fn run(cli: crate::cli::Cli) -> Result<()> {
    crate::logger::init(crate::logger::level_for(cli.verbose))?;
    let opts = options(cli.options.as_deref());
    log::debug!("options: {opts:?}");

    match cli.cmd {
        crate::cli::Cmd::Call { errno, syscall, args } => {
            let diagnostic = crate::calls::diagnose(&opts, &errno, &syscall, &args)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&diagnostic)?);
            } else {
                println!("{}", explain::die::render(&opts, None, &diagnostic));
            }
            Ok(())
        }
        crate::cli::Cmd::Errno { code } => lookup(&code, cli.json),
        crate::cli::Cmd::List => {
            for name in explain::syscall::SUPPORTED {
                println!("{name}");
            }
            Ok(())
        }
        crate::cli::Cmd::CheckIoctlTable => check_ioctl_table(cli.json),
    }
}

/// `EXPLAIN_OPTIONS` first, then `--options`, so the command line wins.
fn options(extra: Option<&str>) -> Options {
    let env = std::env::var(explain::ENV_VAR).unwrap_or_default();
    Options::parse(&format!("{},{}", env, extra.unwrap_or_default()))
}

fn lookup(code: &str, json: bool) -> Result<()> {
    let (domain, raw, symbol, message) = if let Some(e) = Errno::parse(code) {
        ("errno", e.raw(), ErrorDomain::symbol(e), ErrorDomain::message(e))
    } else if let Some(g) = GaiCode::parse(code) {
        ("getaddrinfo", g.raw(), g.symbol(), g.message())
    } else {
        bail!("unknown error code {code:?}");
    };

    if json {
        let value = serde_json::json!({
            "domain": domain,
            "code": raw,
            "symbol": symbol,
            "message": message,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{} {} {}", symbol.unwrap_or("?"), raw, message);
    }
    Ok(())
}

fn check_ioctl_table(json: bool) -> Result<()> {
    let problems = explain::ioctl::check_table(explain::ioctl::TABLE);
    if json {
        println!("{}", serde_json::to_string_pretty(&problems)?);
    } else {
        for problem in &problems {
            println!("{problem}");
        }
    }
    if !problems.is_empty() {
        bail!("{} problem(s) in the ioctl table", problems.len());
    }
    log::info!("{} ioctl requests checked", explain::ioctl::TABLE.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_options_win() {
        let opts = options(Some("numeric-errno=false,dialect=bsd"));
        assert!(!opts.numeric_errno);
        assert_eq!(opts.dialect, explain::Dialect::Bsd);
    }

    #[test]
    fn test_lookup_unknown() {
        assert!(lookup("ENOTHING", false).is_err());
        assert!(lookup("EAI_NONAME", true).is_ok());
    }
}
