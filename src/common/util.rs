use std::borrow::Cow;
use std::ffi::OsString;
use std::path::Path;

/// Symlink names the tool answers to, and the subcommand each one runs.
pub const MULTICALL_NAMES: &[(&str, &str)] = &[
    ("rpleft", "left"),
    ("rpright", "right"),
    ("rprenumber", "renumber"),
    ("rpinsert", "insert"),
    ("rpsignal", "signal"),
];

/// Quotes `word` for `/bin/sh` if it contains anything beyond a safe set.
pub fn shell_quote(word: &str) -> Cow<'_, str> {
    let safe = !word.is_empty()
        && word
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"_-./=:,+@%".contains(&b));
    if safe {
        Cow::Borrowed(word)
    } else {
        Cow::Owned(format!("'{}'", word.replace('\'', r"'\''")))
    }
}

/// Builds the command line handed to the window manager's `exec`.
///
/// A single argument is taken as an already-formed shell command line;
/// several are quoted word by word.
pub fn command_line<S: AsRef<str>>(words: &[S]) -> String {
    match words {
        [single] => single.as_ref().to_string(),
        _ => words.iter().map(|w| shell_quote(w.as_ref())).collect::<Vec<_>>().join(" "),
    }
}

/// Rewrites argv so that invoking the binary as e.g. `rpleft` behaves like
/// `rparrange left`.
pub fn multicall_args(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    let mut args: Vec<OsString> = args.into_iter().collect();
    let invoked = args
        .first()
        .and_then(|argv0| Path::new(argv0).file_name())
        .and_then(|name| name.to_str())
        .and_then(|name| MULTICALL_NAMES.iter().find(|(alias, _)| *alias == name))
        .map(|(_, subcommand)| *subcommand);
    if let Some(subcommand) = invoked {
        args.insert(1, subcommand.into());
    }
    args
}
