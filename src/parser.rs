use crate::error::{ShellError, ShellResult};
use crate::types::*;

pub const STATEMENT_DELIM: &str = ";";
pub const PIPE_DELIM: &str = "|";
pub const WORD_DELIM: &str = " \t\n\r\x07";

/// Splits a line on a set of single-character delimiters, skipping the
/// empty pieces between consecutive delimiters.
pub struct Tokens<'a> {
	line: &'a str,
	delims: &'a str,
	i: usize,
}

impl<'a> Tokens<'a> {
	fn proceed_while<F>(&mut self, f: F) where F: Fn(char) -> bool {
		while let Some(c) = self.line[self.i ..].chars().next() {
			if !f(c) { break; }
			self.i += c.len_utf8();
		}
	}
}

impl<'a> Iterator for Tokens<'a> {
	type Item = &'a str;

	fn next(&mut self) -> Option<&'a str> {
		let delims = self.delims;
		self.proceed_while(|c| delims.contains(c));
		let orig = self.i;
		self.proceed_while(|c| !delims.contains(c));
		if orig == self.i {
			None
		} else {
			Some(&self.line[orig .. self.i])
		}
	}
}

pub fn tokens<'a>(line: &'a str, delims: &'a str) -> Tokens<'a> {
	Tokens { line: line, delims: delims, i: 0 }
}

pub fn split<'a>(line: &'a str, delims: &'a str) -> Vec<&'a str> {
	tokens(line, delims).collect()
}

pub fn split_statements(line: &str) -> Vec<&str> {
	split(line, STATEMENT_DELIM)
}

/// Always yields at least one command; a blank statement becomes a single
/// empty command.
pub fn parse_pipeline(statement: &str) -> Pipeline {
	let mut commands: Vec<Command> = tokens(statement, PIPE_DELIM)
		.map(parse_command)
		.collect();
	if commands.is_empty() {
		commands.push(Command::default());
	}
	Pipeline { commands: commands }
}

pub fn parse_command(stage: &str) -> Command {
	Command { words: split(stage, WORD_DELIM) }
}

fn redirect_type(word: &str) -> Option<RedirectType> {
	RedirectType::ALL.iter().cloned().find(|t| t.operator() == word)
}

/// Pulls the first `<`, `>` and `>>` (and the word after each) out of the
/// command. Repeats of an operator that was already taken stay in argv.
pub fn resolve<'a>(command: &Command<'a>) -> ShellResult<Resolved<'a>> {
	let words = &command.words;
	let mut redirects: Vec<Redirect<'a>> = vec![];
	let mut argv: Vec<&'a str> = Vec::with_capacity(words.len());

	let mut i = 0;
	while i < words.len() {
		let word = words[i];
		match redirect_type(word) {
			Some(typ) if !redirects.iter().any(|r| r.typ == typ) => {
				let target = match words.get(i + 1) {
					Some(&t) => t,
					None => { return Err(ShellError::MissingTarget(typ.operator())); },
				};
				redirects.push(Redirect { target: target, typ: typ, position: i });
				i += 2;
			},
			_ => {
				argv.push(word);
				i += 1;
			},
		}
	}
	Ok(Resolved { argv: argv, redirects: redirects })
}
