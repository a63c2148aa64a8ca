mod builtin;
mod error;
mod eval;
mod job;
mod parser;
mod redirect;
mod types;

use std::fs;
use std::io;
use std::io::BufRead;
use std::io::Write;
use std::os::unix::io::AsRawFd;
use std::process;

use argh::FromArgs;
use log::debug;
use nix::unistd;

use error::ShellResult;

const PROMPT: &str = "nsh> ";

const BANNER: &str = r"==============================================================
.__   __.      _______. __    __   _______  __       __
|  \ |  |     /       ||  |  |  | |   ____||  |     |  |
|   \|  |    |   (----`|  |__|  | |  |__   |  |     |  |
|  . `  |     \   \    |   __   | |   __|  |  |     |  |
|  |\   | .----)   |   |  |  |  | |  |____ |  `----.|  `----.
|__| \__| |_______/    |__|  |__| |_______||_______||_______|
			WELCOME TO NSHELL
==============================================================
";

#[derive(FromArgs)]
/// A small command interpreter with pipes and file redirection.
struct Args {
	/// log interpreter events to stderr
	#[argh(switch, short = 'v')]
	verbose: bool,

	/// read commands from this file instead of the terminal
	#[argh(positional)]
	batch_file: Option<String>,
}

/// Reads one line without its trailing newline. `None` at end of input.
fn read_line<R: BufRead>(input: &mut R) -> io::Result<Option<String>> {
	let mut line: Vec<u8> = vec![];
	let n = input.read_until(b'\n', &mut line)?;
	if n == 0 {
		return Ok(None);
	}
	if line.last() == Some(&b'\n') {
		line.pop();
	}
	Ok(Some(String::from_utf8_lossy(&line).into_owned()))
}

/// Makes the batch file the interpreter's standard input for the whole run.
fn redirect_stdin(path: &str) -> ShellResult<()> {
	let file = fs::File::open(path)?;
	unistd::dup2(file.as_raw_fd(), libc::STDIN_FILENO)?;
	Ok(())
}

fn run<R: BufRead>(input: &mut R, interactive: bool) -> ShellResult<()> {
	let mut stdout = io::stdout();
	if interactive {
		let _ = stdout.write_all(BANNER.as_bytes());
	}
	loop {
		if interactive {
			let _ = stdout.write_all(PROMPT.as_bytes());
			let _ = stdout.flush();
		}
		let line = match read_line(input)? {
			Some(line) => line,
			None => {
				debug!("end of input");
				break;
			},
		};
		if eval::eval_line(&line)?.is_terminate() {
			break;
		}
	}
	Ok(())
}

fn main() {
	let args: Args = argh::from_env();

	let log_level = if args.verbose { "debug" } else { "warn" };
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

	let interactive = match args.batch_file {
		Some(ref path) => {
			if let Err(e) = redirect_stdin(path) {
				eprintln!("nsh: {}: {}", path, e);
				process::exit(1);
			}
			false
		},
		None => true,
	};

	let stdin = io::stdin();
	let mut input = stdin.lock();
	if let Err(e) = run(&mut input, interactive) {
		eprintln!("nsh: {}", e);
		process::exit(1);
	}
}
