use std::ffi::CString;
use std::os::unix::io::RawFd;

use log::debug;
use nix::fcntl::OFlag;
use nix::unistd::{self, ForkResult};

use crate::builtin;
use crate::error::{ShellError, ShellResult};
use crate::job;
use crate::parser;
use crate::redirect;
use crate::types::*;

fn report(e: &ShellError) {
	eprintln!("nsh: {}", e);
}

/// Recoverable errors are reported and swallowed; fatal ones propagate.
fn recover<T>(r: ShellResult<T>) -> ShellResult<Option<T>> {
	match r {
		Ok(v) => Ok(Some(v)),
		Err(ref e) if !e.is_fatal() => {
			report(e);
			Ok(None)
		},
		Err(e) => Err(e),
	}
}

/// Replaces the current (child) process with `argv[0]`. Never returns.
fn exec_external(argv: &[&str]) -> ! {
	let cargv: Result<Vec<CString>, _> = argv.iter().map(|&s| CString::new(s)).collect();
	match cargv {
		Ok(cargv) => {
			match unistd::execvp(&cargv[0], &cargv) {
				Ok(_) => unreachable!(),
				Err(e) => eprintln!("nsh: {}: {}", argv[0], e.desc()),
			}
		},
		Err(e) => report(&ShellError::from(e)),
	}
	job::exit_child(1)
}

/// Runs a single external command in a child with its redirections.
fn launch(argv: &[&str], streams: redirect::Streams) -> ShellResult<Status> {
	match job::fork()? {
		ForkResult::Child => {
			if let Err(e) = streams.install() {
				report(&ShellError::from(e));
				job::exit_child(1);
			}
			exec_external(argv)
		},
		ForkResult::Parent { child } => {
			drop(streams);
			job::wait_terminated(child)?;
			Ok(Status::Continue)
		},
	}
}

/// The sole stage of a statement: builtins run right here in the
/// interpreter, anything else goes through `launch`.
fn run_single(command: &Command) -> ShellResult<Status> {
	let resolved = match recover(parser::resolve(command))? {
		Some(r) => r,
		None => { return Ok(Status::Continue); },
	};
	let streams = match recover(redirect::open(&resolved.redirects))? {
		Some(s) => s,
		None => { return Ok(Status::Continue); },
	};
	let name = match resolved.name() {
		Some(name) => name,
		None => { return Ok(Status::Continue); },
	};
	if let Some(builtin) = builtin::match_builtin(name) {
		if streams.is_empty() {
			return Ok(builtin.run(&resolved.argv[1 ..]));
		}
		let saved = streams.install_saved()?;
		let status = builtin.run(&resolved.argv[1 ..]);
		saved.restore()?;
		return Ok(status);
	}
	launch(&resolved.argv, streams)
}

/// Body of a forked pipeline stage. Pipe ends are wired first, so explicit
/// redirections override them. Returns only for builtins and for stages
/// that did nothing; external commands exec.
fn run_stage(command: &Command, input: Option<RawFd>, output: Option<RawFd>) -> nix::Result<Status> {
	if let Some(fd) = input {
		unistd::dup2(fd, libc::STDIN_FILENO)?;
		unistd::close(fd)?;
	}
	if let Some(fd) = output {
		unistd::dup2(fd, libc::STDOUT_FILENO)?;
		unistd::close(fd)?;
	}

	let resolved = match parser::resolve(command) {
		Ok(r) => r,
		Err(e) => {
			report(&e);
			return Ok(Status::Continue);
		},
	};
	match redirect::open(&resolved.redirects) {
		Ok(streams) => streams.install()?,
		Err(e) => {
			report(&e);
			return Ok(Status::Continue);
		},
	}
	let name = match resolved.name() {
		Some(name) => name,
		None => { return Ok(Status::Continue); },
	};
	match builtin::match_builtin(name) {
		Some(builtin) => Ok(builtin.run(&resolved.argv[1 ..])),
		None => exec_external(&resolved.argv),
	}
}

/// Forks one pipeline stage, waits for it and collects its status over a
/// status channel. `unused` is the read end of the stage's own output pipe,
/// which only the next stage needs.
fn spawn_stage(command: &Command, input: Option<RawFd>, output: Option<RawFd>, unused: Option<RawFd>) -> ShellResult<Status> {
	let channel = job::StatusChannel::new()?;
	match job::fork()? {
		ForkResult::Child => {
			let sender = channel.into_sender();
			if let Some(fd) = unused {
				let _ = unistd::close(fd);
			}
			match run_stage(command, input, output) {
				Ok(status) => {
					sender.send(status);
					job::exit_child(0)
				},
				Err(e) => {
					report(&ShellError::from(e));
					job::exit_child(1)
				},
			}
		},
		ForkResult::Parent { child } => {
			let receiver = channel.into_receiver();
			if let Some(fd) = output {
				unistd::close(fd)?;
			}
			if let Some(fd) = input {
				unistd::close(fd)?;
			}
			job::wait_terminated(child)?;
			let status = receiver.receive();
			debug!("stage {:?} reported {:?}", command.words, status);
			Ok(status)
		},
	}
}

fn spawn_commands(init: &[Command], last: &Command) -> ShellResult<Status> {
	let mut input: Option<RawFd> = None;
	for command in init {
		let (pipe_read, pipe_write) = unistd::pipe2(OFlag::O_CLOEXEC)?;
		let status = spawn_stage(command, input, Some(pipe_write), Some(pipe_read))?;
		input = Some(pipe_read);
		if status.is_terminate() {
			unistd::close(pipe_read)?;
			return Ok(Status::Terminate);
		}
	}
	spawn_stage(last, input, None, None)
}

pub fn eval_pipeline(pipeline: &Pipeline) -> ShellResult<Status> {
	debug!("pipeline of {} stage(s)", pipeline.commands.len());
	match pipeline.commands.split_last() {
		None => Ok(Status::Continue),
		Some((only, [])) => run_single(only),
		Some((last, init)) => spawn_commands(init, last),
	}
}

pub fn eval_statement(statement: &str) -> ShellResult<Status> {
	let pipeline = parser::parse_pipeline(statement);
	eval_pipeline(&pipeline)
}

/// Runs every `;`-separated statement of `line` in order, stopping at the
/// first one that asks the interpreter to terminate.
pub fn eval_line(line: &str) -> ShellResult<Status> {
	for statement in parser::split_statements(line) {
		if eval_statement(statement)?.is_terminate() {
			debug!("statement {:?} terminated the loop", statement);
			return Ok(Status::Terminate);
		}
	}
	Ok(Status::Continue)
}
