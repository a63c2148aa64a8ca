use std::io;
use std::io::Write;

use log::debug;
use nix::unistd;

use crate::types::Status;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Builtin { Cd, Help, Exit }

impl Builtin {
	pub const ALL: [Builtin; 3] = [Builtin::Cd, Builtin::Help, Builtin::Exit];

	pub fn name(self) -> &'static str {
		match self {
			Builtin::Cd => "cd",
			Builtin::Help => "help",
			Builtin::Exit => "exit",
		}
	}

	/// `args` excludes the builtin's own name.
	pub fn run(self, args: &[&str]) -> Status {
		debug!("builtin {} {:?}", self.name(), args);
		match self {
			Builtin::Cd => builtin_cd(args),
			Builtin::Help => builtin_help(),
			Builtin::Exit => Status::Terminate,
		}
	}
}

pub fn match_builtin(name: &str) -> Option<Builtin> {
	Builtin::ALL.iter().cloned().find(|b| b.name() == name)
}

fn builtin_cd(args: &[&str]) -> Status {
	match args.first() {
		None => {
			eprintln!("nsh: no argument received for \"cd\"");
		},
		Some(dir) => {
			if let Err(e) = unistd::chdir(*dir) {
				eprintln!("nsh: cd: {}: {}", dir, e.desc());
			}
		},
	}
	Status::Continue
}

const HELP_RULE: &str = "==============================================================";

fn builtin_help() -> Status {
	let stdout = io::stdout();
	let mut out = stdout.lock();
	let _ = writeln!(out, "{}", HELP_RULE);
	let _ = writeln!(out, "\t\t\tNSHELL HELP");
	let _ = writeln!(out, "{}", HELP_RULE);
	let _ = writeln!(out, "Following commands are builtin");
	for b in Builtin::ALL.iter() {
		let _ = writeln!(out, "{}", b.name());
	}
	let _ = writeln!(out, "Use the man command for information on other programs.");
	let _ = out.flush();
	Status::Continue
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::env;

	#[test]
	fn lookup_by_name() {
		assert_eq!(match_builtin("cd"), Some(Builtin::Cd));
		assert_eq!(match_builtin("help"), Some(Builtin::Help));
		assert_eq!(match_builtin("exit"), Some(Builtin::Exit));
		assert_eq!(match_builtin("ls"), None);
		assert_eq!(match_builtin("EXIT"), None);
	}

	#[test]
	fn exit_terminates() {
		assert_eq!(Builtin::Exit.run(&[]), Status::Terminate);
		assert_eq!(Builtin::Exit.run(&["3"]), Status::Terminate);
	}

	#[test]
	fn cd_without_argument_continues() {
		let before = env::current_dir().unwrap();
		assert_eq!(Builtin::Cd.run(&[]), Status::Continue);
		assert_eq!(env::current_dir().unwrap(), before);
	}

	#[test]
	fn cd_to_missing_directory_continues() {
		let before = env::current_dir().unwrap();
		assert_eq!(Builtin::Cd.run(&["/nonexistent/nsh-test-dir"]), Status::Continue);
		assert_eq!(env::current_dir().unwrap(), before);
	}

	#[test]
	fn help_continues() {
		assert_eq!(Builtin::Help.run(&[]), Status::Continue);
	}
}
