use crate::Data;

pub mod help;
pub mod quote;
pub mod status;
pub mod sync;
pub mod transfer;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Show(Option<String>),
    Select(String),
    Add { category: String, text: String },
    List(Option<String>),
    Categories,
    Export(String),
    Import(String),
    Sync,
    Status,
    Help,
    Quit,
}

impl Command {
    /// Parses a console line. `Ok(None)` means the line was blank.
    pub fn parse(line: &str) -> Result<Option<Command>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };
        let rest_opt = (!rest.is_empty()).then(|| rest.to_string());

        let command = match name {
            "show" | "new" => Command::Show(rest_opt),
            "select" => Command::Select(rest_opt.ok_or("usage: select <category|all>")?),
            "add" => {
                // `|` separates a multi-word category from the text
                let (category, text) = rest
                    .split_once('|')
                    .or_else(|| rest.split_once(char::is_whitespace))
                    .ok_or("usage: add <category> <text...> or add <category...> | <text...>")?;

                Command::Add {
                    category: category.trim().to_string(),
                    text: text.trim().to_string(),
                }
            }
            "list" | "ls" => Command::List(rest_opt),
            "categories" => Command::Categories,
            "export" => Command::Export(rest_opt.ok_or("usage: export <path>")?),
            "import" => Command::Import(rest_opt.ok_or("usage: import <path>")?),
            "sync" => Command::Sync,
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(format!("unknown command \"{other}\". type `help` for a list.")),
        };

        Ok(Some(command))
    }
}

/// Runs a command and returns the text to print, if any.
/// Outcomes of `add` and `import` are reported as notifications instead.
pub async fn execute(data: &Data, command: Command) -> anyhow::Result<Option<String>> {
    let reply = match command {
        Command::Show(category) => Some(quote::show(data, category.as_deref()).await?),
        Command::Select(category) => Some(quote::select(data, &category).await?),
        Command::Add { category, text } => {
            quote::add(data, &text, &category).await?;
            None
        }
        Command::List(category) => Some(quote::list(data, category.as_deref()).await),
        Command::Categories => Some(quote::categories(data).await),
        Command::Export(path) => Some(transfer::export(data, &path).await?),
        Command::Import(path) => {
            transfer::import(data, &path).await;
            None
        }
        Command::Sync => Some(sync::sync(data).await),
        Command::Status => Some(status::status(data).await),
        Command::Help => Some(help::help()),
        Command::Quit => None,
    };

    Ok(reply)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_add_with_multi_word_text() {
        assert_eq!(
            Command::parse("add Life  Be yourself; everyone else is already taken."),
            Ok(Some(Command::Add {
                category: "Life".into(),
                text: "Be yourself; everyone else is already taken.".into(),
            }))
        );
    }

    #[test]
    fn parses_add_with_multi_word_category() {
        assert_eq!(
            Command::parse("add Self Care | Rest is productive too."),
            Ok(Some(Command::Add {
                category: "Self Care".into(),
                text: "Rest is productive too.".into(),
            }))
        );
    }

    #[test]
    fn parses_optional_arguments() {
        assert_eq!(Command::parse("show"), Ok(Some(Command::Show(None))));
        assert_eq!(
            Command::parse("new Motivation"),
            Ok(Some(Command::Show(Some("Motivation".into()))))
        );
        assert_eq!(Command::parse("   "), Ok(None));
    }

    #[test]
    fn rejects_missing_arguments() {
        assert!(Command::parse("add Life").is_err());
        assert!(Command::parse("select").is_err());
        assert!(Command::parse("import").is_err());
    }

    #[test]
    fn rejects_unknown_commands() {
        assert!(Command::parse("delete everything").is_err());
    }
}
