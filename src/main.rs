use std::env;
use std::io::{ self, BufRead, Write };

use lispy::{ Session, PROMPT };

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args();

    // Ignore the program name.
    args.next();

    if let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            println!("{HELP_MSG}");
            return Ok(());
        }
        eprintln!("unexpected argument '{arg}'\n\n{HELP_MSG}");
        std::process::exit(2);
    }

    run(io::stdin().lock(), io::stdout())?;
    Ok(())
}

/// Prompts, reads a line, and writes its result until `input` runs dry.
/// Lines are decoded lossily, so bad UTF-8 only spoils its own line.
fn run(mut input: impl BufRead, mut output: impl Write) -> io::Result<()> {
    let mut session = Session::new();
    let mut buf = Vec::new();

    loop {
        write!(output, "{PROMPT} ")?;
        output.flush()?;

        buf.clear();
        if input.read_until(b'\n', &mut buf)? == 0 {
            writeln!(output)?;
            return Ok(());
        }

        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']);
        writeln!(output, "{}", session.run_line(line))?;
    }
}

const HELP_MSG: &str = r#"Usage: lispy [--help|-h]

Reads one expression per line from stdin and prints its value.

Options:
  -h, --help  Print this message"#;
