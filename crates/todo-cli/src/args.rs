use domain::TodoId;
use std::path::PathBuf;
use thiserror::Error;

pub const USAGE: &str = "\
usage:
  todo list
  todo add <title...>
  todo toggle <id>
  todo show <id>
  todo edit <id> [--title T] [--memo M] [--done|--undone]
  todo attach <id> <path>
  todo delete <id> [--yes]";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgsError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("unexpected argument: {0}")]
    UnexpectedArgument(String),

    #[error("--done and --undone cannot be used together")]
    ConflictingFlags,
}

/// `todo edit` で変更する項目
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditArgs {
    pub title: Option<String>,
    pub memo: Option<String>,
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Add { title: String },
    Toggle { id: TodoId },
    Show { id: TodoId },
    Edit { id: TodoId, edit: EditArgs },
    Attach { id: TodoId, path: PathBuf },
    Delete { id: TodoId, yes: bool },
    Help,
}

impl Command {
    /// プログラム名を除いた引数から解析
    pub fn parse<I>(args: I) -> Result<Self, ArgsError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let Some(name) = args.next() else {
            return Ok(Command::Help);
        };

        let command = match name.as_str() {
            "list" | "ls" => Command::List,
            "add" => {
                let title = args.by_ref().collect::<Vec<_>>().join(" ");
                if title.is_empty() {
                    return Err(ArgsError::MissingArgument("title"));
                }
                Command::Add { title }
            }
            "toggle" => Command::Toggle { id: id_arg(&mut args)? },
            "show" => Command::Show { id: id_arg(&mut args)? },
            "edit" => {
                let id = id_arg(&mut args)?;
                let edit = edit_args(&mut args)?;
                Command::Edit { id, edit }
            }
            "attach" => {
                let id = id_arg(&mut args)?;
                let path = args.next().ok_or(ArgsError::MissingArgument("path"))?;
                Command::Attach {
                    id,
                    path: PathBuf::from(path),
                }
            }
            "delete" | "rm" => {
                let id = id_arg(&mut args)?;
                let mut yes = false;
                for arg in args.by_ref() {
                    match arg.as_str() {
                        "--yes" | "-y" => yes = true,
                        _ => return Err(ArgsError::UnexpectedArgument(arg)),
                    }
                }
                Command::Delete { id, yes }
            }
            "help" | "--help" | "-h" => Command::Help,
            other => return Err(ArgsError::UnknownCommand(other.to_string())),
        };

        match args.next() {
            Some(extra) => Err(ArgsError::UnexpectedArgument(extra)),
            None => Ok(command),
        }
    }
}

fn id_arg(args: &mut impl Iterator<Item = String>) -> Result<TodoId, ArgsError> {
    args.next()
        .map(TodoId::from_string)
        .ok_or(ArgsError::MissingArgument("id"))
}

fn edit_args(args: &mut impl Iterator<Item = String>) -> Result<EditArgs, ArgsError> {
    let mut edit = EditArgs::default();
    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--title" => edit.title = Some(args.next().ok_or(ArgsError::MissingArgument("--title"))?),
            "--memo" => edit.memo = Some(args.next().ok_or(ArgsError::MissingArgument("--memo"))?),
            "--done" | "--undone" => {
                let completed = flag == "--done";
                if edit.completed.is_some_and(|c| c != completed) {
                    return Err(ArgsError::ConflictingFlags);
                }
                edit.completed = Some(completed);
            }
            _ => return Err(ArgsError::UnexpectedArgument(flag)),
        }
    }
    Ok(edit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command, ArgsError> {
        Command::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn add_joins_remaining_words() {
        assert_eq!(
            parse(&["add", "Buy", "milk"]).unwrap(),
            Command::Add {
                title: "Buy milk".into()
            }
        );
        assert_eq!(parse(&["add"]).unwrap_err(), ArgsError::MissingArgument("title"));
    }

    #[test]
    fn edit_collects_flags() {
        let command = parse(&["edit", "7", "--title", "Buy milk", "--memo", "2%", "--undone"]).unwrap();
        assert_eq!(
            command,
            Command::Edit {
                id: TodoId::from(7),
                edit: EditArgs {
                    title: Some("Buy milk".into()),
                    memo: Some("2%".into()),
                    completed: Some(false),
                },
            }
        );

        assert_eq!(
            parse(&["edit", "7", "--done", "--undone"]).unwrap_err(),
            ArgsError::ConflictingFlags
        );
        assert_eq!(
            parse(&["edit", "7", "--title"]).unwrap_err(),
            ArgsError::MissingArgument("--title")
        );
    }

    #[test]
    fn delete_confirms_unless_yes() {
        assert_eq!(
            parse(&["delete", "3"]).unwrap(),
            Command::Delete {
                id: TodoId::from(3),
                yes: false
            }
        );
        assert_eq!(
            parse(&["rm", "3", "--yes"]).unwrap(),
            Command::Delete {
                id: TodoId::from(3),
                yes: true
            }
        );
    }

    #[test]
    fn rejects_unknown_and_extra_arguments() {
        assert_eq!(parse(&[]).unwrap(), Command::Help);
        assert_eq!(
            parse(&["frobnicate"]).unwrap_err(),
            ArgsError::UnknownCommand("frobnicate".into())
        );
        assert_eq!(
            parse(&["show", "1", "2"]).unwrap_err(),
            ArgsError::UnexpectedArgument("2".into())
        );
        assert_eq!(parse(&["toggle"]).unwrap_err(), ArgsError::MissingArgument("id"));
    }
}
