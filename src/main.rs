use std::io::Read;
use std::path::PathBuf;

use clap::Parser;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use tasksh::{Shell, ShellConfig, ShellError};

#[derive(Parser)]
#[command(name = "tasksh")]
#[command(about = "Embeddable POSIX-style shell for task runners")]
#[command(version)]
struct Cli {
    /// Execute the script from command line argument
    #[arg(short = 'c')]
    command: Option<String>,

    /// Exit immediately if a command exits with non-zero status
    #[arg(short = 'e', long = "errexit")]
    errexit: bool,

    /// TOML file with option defaults, variables and limits
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Print {"exitCode": N} after the run
    #[arg(long = "json")]
    json: bool,

    /// off, error, warn, info, debug or trace (default: $TASKSH_LOG or warn)
    #[arg(long = "log-level")]
    log_level: Option<String>,

    /// Script file to execute (with -c: the value of $0)
    #[arg()]
    script_file: Option<String>,

    /// Positional parameters
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn init_logging(level: Option<String>) {
    let level = level
        .or_else(|| std::env::var("TASKSH_LOG").ok())
        .and_then(|v| v.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Warn);
    // A second logger or a missing terminal only loses diagnostics.
    let _ = TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto);
}

/// Script text from raw bytes. Invalid UTF-8 sequences become U+FFFD,
/// with a warning naming the script.
fn decode_script(bytes: Vec<u8>, name: &str) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            let valid = e.utf8_error().valid_up_to();
            log::warn!("{}: invalid UTF-8 at byte {}; replacing undecodable bytes", name, valid);
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    }
}

fn finish(json: bool, code: i32) -> ! {
    if json {
        println!("{}", serde_json::json!({ "exitCode": code }));
    }
    std::process::exit(code);
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    let mut config = match &cli.config {
        Some(path) => match ShellConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("tasksh: {}", e);
                finish(cli.json, 2);
            }
        },
        None => ShellConfig::default(),
    };
    // vars() panics on a non-UTF-8 entry; the host environment may hold one.
    config = config.with_env(
        std::env::vars_os().map(|(k, v)| (k.to_string_lossy().into_owned(), v.to_string_lossy().into_owned())),
    );
    if cli.errexit {
        config.options.errexit = true;
    }

    let (name, source) = if let Some(command) = cli.command {
        (cli.script_file.clone().unwrap_or_else(|| "tasksh".to_string()), command)
    } else if let Some(file) = &cli.script_file {
        match std::fs::read(file) {
            Ok(bytes) => (file.clone(), decode_script(bytes, file)),
            Err(e) => {
                eprintln!("tasksh: {}: {}", file, tasksh::interpreter::errors::io_message(&e));
                finish(cli.json, 127);
            }
        }
    } else {
        let mut buf = Vec::new();
        if let Err(e) = std::io::stdin().read_to_end(&mut buf) {
            eprintln!("tasksh: cannot read script from stdin: {}", e);
            finish(cli.json, 1);
        }
        ("tasksh".to_string(), decode_script(buf, "stdin"))
    };
    config.script_name.get_or_insert(name.clone());
    if !cli.args.is_empty() {
        config.args = cli.args;
    }

    let script = match tasksh::parse(&source, &name) {
        Ok(script) => script,
        Err(e) => {
            eprintln!("tasksh: {}: {}", name, e);
            finish(cli.json, 2);
        }
    };

    let mut shell = Shell::new(config);
    let code = match shell.run(&script) {
        Ok(code) => code,
        Err(ShellError::Cancelled) => 130,
        Err(e) => {
            eprintln!("tasksh: {}", e);
            1
        }
    };
    finish(cli.json, code);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_script() {
        assert_eq!(decode_script(b"echo ok\n".to_vec(), "a.sh"), "echo ok\n");
        assert_eq!(decode_script(b"echo \xff\n".to_vec(), "b.sh"), "echo \u{fffd}\n");
    }

    #[test]
    fn test_cli_arguments() {
        let cli = Cli::parse_from(["tasksh", "-e", "--json", "-c", "echo $0 $1", "name", "one"]);
        assert_eq!(cli.command.as_deref(), Some("echo $0 $1"));
        assert!(cli.errexit && cli.json);
        assert_eq!(cli.script_file.as_deref(), Some("name"));
        assert_eq!(cli.args, vec!["one"]);
    }
}
