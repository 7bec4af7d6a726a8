mod board;
mod session;

use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use lockbox_core::Config;
use session::{Session, SessionOptions};

const USAGE: &str = "Usage: lockbox-emulator [--transcript <path>] [--lock-secs <n>] [--plain]";

struct Args {
    options: SessionOptions,
    styled: bool,
}

fn main() -> io::Result<()> {
    let args = parse_args(env::args().skip(1)).unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("{USAGE}");
        process::exit(2);
    });

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut session = Session::new(args.options)?;
    let mut line = String::new();

    writeln!(
        writer,
        "Lock box emulator ready. Type `help` for commands or `exit` to quit."
    )?;
    for output in session.drain() {
        writeln!(writer, "{}", render(&output, args.styled))?;
    }

    loop {
        line.clear();
        write!(writer, "[{}] > ", session.now())?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if should_terminate(trimmed) {
            writeln!(writer, "Session closed.")?;
            break;
        }

        for output in session.handle_command(trimmed)? {
            writeln!(writer, "{}", render(&output, args.styled))?;
        }
    }

    Ok(())
}

fn render(output: &session::Output, styled: bool) -> String {
    if styled {
        output.styled()
    } else {
        output.text.clone()
    }
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut parsed = Args {
        options: SessionOptions::default(),
        styled: true,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--plain" => parsed.styled = false,
            "--transcript" => {
                let path = args
                    .next()
                    .ok_or_else(|| "Expected path after --transcript".to_string())?;
                parsed.options.transcript = Some(PathBuf::from(path));
            }
            "--lock-secs" => {
                let value = args
                    .next()
                    .ok_or_else(|| "Expected seconds after --lock-secs".to_string())?;
                let secs: u32 = value
                    .parse()
                    .map_err(|_| format!("Invalid lock duration `{value}`"))?;
                let ms = secs
                    .checked_mul(1_000)
                    .ok_or_else(|| format!("Lock duration `{value}` is too long"))?;
                parsed.options.config = Config::DEFAULT.with_lock_duration(ms);
            }
            other => {
                if let Some(path) = other.strip_prefix("--transcript=") {
                    parsed.options.transcript = Some(PathBuf::from(path));
                } else {
                    return Err(format!("Unexpected argument `{other}`"));
                }
            }
        }
    }

    Ok(parsed)
}
