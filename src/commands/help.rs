const HELP: &str = "\
commands:
  show [category]          show a random quote (alias: new)
  select <category|all>    change the selected category
  add <category> <text>    add a quote
  add <category> | <text>  add a quote to a category with spaces
  list [category]          list quotes
  categories               list categories, the selected one is starred
  export <path>            write all quotes to a JSON file
  import <path>            add quotes from a JSON file
  sync                     sync with the quote server now
  status                   show version, counts and sync health
  help                     print this message
  quit                     exit";

/// print the list of commands and their usage
pub fn help() -> String {
    HELP.to_string()
}
