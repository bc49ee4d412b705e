use std::io::{self, Write};
use std::str::FromStr;

use anyhow::{bail, Error, Result};
use itertools::Itertools;
use tokio::io::{AsyncBufRead, Lines};

use crate::model::user::UserRecord;
use crate::model::view::DirectoryView;

pub const HELP: &str = "\
commands:
  list               show the (filtered) directory
  search <text>      filter by name, `search` alone clears it
  more               scroll to the bottom, loads the next page
  show <email>       details of one user
  delete <email>     delete a user (asks first)
  refresh            throw everything away and reload page 1
  retry              retry the fetch that failed
  help               this text
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Search(String),
    More,
    Show(String),
    Delete(String),
    Refresh,
    Retry,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let command = match word.to_lowercase().as_str() {
            "" | "list" | "ls" => Command::List,
            "search" | "/" => Command::Search(rest.to_owned()),
            "clear" => Command::Search(String::new()),
            "more" | "next" => Command::More,
            "show" => Command::Show(key_arg(word, rest)?),
            "delete" | "rm" => Command::Delete(key_arg(word, rest)?),
            "refresh" => Command::Refresh,
            "retry" => Command::Retry,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => bail!("Unknown command '{}', try `help`", other),
        };
        Ok(command)
    }
}

fn key_arg(word: &str, rest: &str) -> Result<String> {
    if rest.is_empty() {
        bail!("`{}` needs an email address", word);
    }
    Ok(rest.to_owned())
}

pub fn render_list(view: &DirectoryView) -> String {
    let mut lines = vec![];
    if view.is_loading {
        lines.push("Loading users...".to_owned());
    }
    if let Some(reason) = &view.error {
        lines.push(format!("Error: {} (type `retry`)", reason));
    }
    if view.is_empty_result() {
        lines.push("No users found.".to_owned());
    } else {
        lines.extend(
            view.users
                .iter()
                .enumerate()
                .map(|(i, u)| format!("{:>3}. {:<30} {}", i + 1, u.display_name(), u.email)),
        );
    }
    if view.is_fetching_next_page {
        lines.push("More users on the way...".to_owned());
    }
    lines.push(render_status(view));
    lines.into_iter().join("\n")
}

pub fn render_status(view: &DirectoryView) -> String {
    let filter = if view.query.is_empty() {
        String::new()
    } else {
        format!(" matching '{}'", view.query)
    };
    let tail = if view.has_next_page {
        "`more` for the next page"
    } else {
        "end of directory"
    };
    format!("-- {} of {} users{}, {}", view.users.len(), view.total, filter, tail)
}

pub fn render_detail(user: &UserRecord) -> String {
    [
        user.display_name(),
        format!("  email:    {}", user.email),
        format!("  phone:    {}", user.phone),
        format!("  location: {}, {}", user.location.city, user.location.country),
        format!("  avatar:   {}", user.avatar),
    ]
    .iter()
    .join("\n")
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Asks a yes/no question on stdout and reads the answer from `input`.
/// End of input counts as no.
pub async fn confirm<R>(input: &mut Lines<R>, question: &str) -> io::Result<bool>
where
    R: AsyncBufRead + Unpin,
{
    print!("{} [y/N] ", question);
    io::stdout().flush()?;
    Ok(input.next_line().await?.map_or(false, |a| is_yes(&a)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::FetchState;
    use crate::model::user::{Location, PersonName};
    use rstest::rstest;
    use tokio::io::AsyncBufReadExt;

    fn zina() -> UserRecord {
        UserRecord {
            email: "zina@example.com".to_owned(),
            name: PersonName {
                first: "Zina".to_owned(),
                last: "Moreau".to_owned(),
            },
            phone: "01-23".to_owned(),
            location: Location {
                city: "Lyon".to_owned(),
                country: "France".to_owned(),
            },
            avatar: "https://example.com/z.jpg".to_owned(),
        }
    }

    fn view(users: Vec<UserRecord>) -> DirectoryView {
        DirectoryView {
            total: users.len(),
            users,
            query: String::new(),
            fetch: FetchState::Idle,
            is_loading: false,
            is_fetching_next_page: false,
            has_next_page: true,
            error: None,
        }
    }

    #[rstest]
    #[case::blank("", Command::List)]
    #[case::list("list", Command::List)]
    #[case::search("search zin", Command::Search("zin".to_owned()))]
    #[case::search_with_spaces("  search   lucie zin ", Command::Search("lucie zin".to_owned()))]
    #[case::search_clears("search", Command::Search(String::new()))]
    #[case::clear("clear", Command::Search(String::new()))]
    #[case::more("MORE", Command::More)]
    #[case::show("show zina@example.com", Command::Show("zina@example.com".to_owned()))]
    #[case::delete("delete zina@example.com", Command::Delete("zina@example.com".to_owned()))]
    #[case::refresh("refresh", Command::Refresh)]
    #[case::retry("retry", Command::Retry)]
    #[case::quit("q", Command::Quit)]
    fn parses_commands(#[case] line: &str, #[case] expected: Command) {
        assert_eq!(line.parse::<Command>().unwrap(), expected);
    }

    #[rstest]
    #[case::unknown("dance")]
    #[case::show_without_key("show")]
    #[case::delete_without_key("delete   ")]
    fn rejects_bad_commands(#[case] line: &str) {
        assert!(line.parse::<Command>().is_err());
    }

    #[rstest]
    #[case::yes("y", true)]
    #[case::yes_word(" Yes\n", true)]
    #[case::no("n", false)]
    #[case::empty("", false)]
    fn reads_yes_no(#[case] answer: &str, #[case] expected: bool) {
        assert_eq!(is_yes(answer), expected);
    }

    #[test]
    fn renders_list_with_status_line() {
        let rendered = render_list(&view(vec![zina()]));
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Zina Moreau"));
        assert!(lines[0].contains("zina@example.com"));
        assert_eq!(lines[1], "-- 1 of 1 users, `more` for the next page");
    }

    #[test]
    fn renders_empty_result_and_error() {
        let mut v = view(vec![]);
        v.query = "xyz".to_owned();
        v.has_next_page = false;
        v.error = Some("boom".to_owned());
        let rendered = render_list(&v);
        assert!(rendered.contains("Error: boom"));
        assert!(rendered.contains("No users found."));
        assert!(rendered.ends_with("-- 0 of 0 users matching 'xyz', end of directory"));
    }

    #[test]
    fn renders_detail_view() {
        let detail = render_detail(&zina());
        assert!(detail.starts_with("Zina Moreau\n"));
        assert!(detail.contains("phone:    01-23"));
        assert!(detail.contains("location: Lyon, France"));
    }

    #[tokio::test]
    async fn confirm_reads_one_answer() {
        let mut input = tokio::io::BufReader::new(&b"yes\nno\n"[..]).lines();
        assert!(confirm(&mut input, "Delete?").await.unwrap());
        assert!(!confirm(&mut input, "Delete?").await.unwrap());
        assert!(!confirm(&mut input, "Delete?").await.unwrap());
    }
}
