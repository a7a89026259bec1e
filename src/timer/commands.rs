use std::str::FromStr;

use crate::{
    app::WorkoutApp,
    presentation::{plan_summary, render_status, session_title},
};

/// User intents relayed by a front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    List,
    /// Zero-based catalog index.
    Select(usize),
    Start,
    Pause,
    Toggle,
    Reset,
    Cadence(u32),
    Status,
    Back,
    Help,
    Quit,
}

impl FromStr for Intent {
    type Err = String;

    /// Parses one typed line. Plan numbers are one-based, as shown on screen.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = words.next().ok_or_else(|| "empty command".to_string())?;
        let argument = words.next();

        let intent = match command.to_ascii_lowercase().as_str() {
            "list" | "ls" => Intent::List,
            "select" | "open" => {
                let number: usize = parse_argument(command, argument)?;
                if number == 0 {
                    return Err("plan numbers start at 1".into());
                }
                Intent::Select(number - 1)
            }
            "start" => Intent::Start,
            "pause" => Intent::Pause,
            "toggle" | "t" => Intent::Toggle,
            "reset" => Intent::Reset,
            "cadence" | "bpm" => Intent::Cadence(parse_argument(command, argument)?),
            "status" | "s" => Intent::Status,
            "back" => Intent::Back,
            "help" | "?" => Intent::Help,
            "quit" | "exit" | "q" => Intent::Quit,
            other => return Err(format!("unknown command {other:?}, try `help`")),
        };

        if let Some(extra) = words.next() {
            return Err(format!("unexpected argument {extra:?}"));
        }
        Ok(intent)
    }
}

fn parse_argument<T: FromStr>(command: &str, argument: Option<&str>) -> Result<T, String> {
    let argument = argument.ok_or_else(|| format!("`{command}` needs a number"))?;
    argument
        .parse()
        .map_err(|_| format!("`{argument}` is not a valid number"))
}

pub const HELP: &str = "commands: list | select N | start | pause | toggle | reset | cadence BPM | status | back | quit";

/// Applies an intent to the app and returns the text to show, if any.
/// `Quit` is left to the caller.
pub async fn dispatch(app: &mut WorkoutApp, intent: Intent) -> Result<Option<String>, String> {
    match intent {
        Intent::List => Ok(Some(catalog_listing(app))),
        Intent::Help => Ok(Some(HELP.to_string())),
        Intent::Quit => Ok(None),
        Intent::Select(index) => {
            let controller = app.select_plan(index).await.map_err(|e| e.to_string())?;
            Ok(Some(format!(
                "{}: {}\n{}",
                session_title(index),
                plan_summary(controller.plan()),
                render_status(&controller.snapshot())
            )))
        }
        Intent::Back => {
            app.back().await.map_err(|e| e.to_string())?;
            Ok(Some(catalog_listing(app)))
        }
        Intent::Cadence(bpm) => {
            app.set_default_cadence(bpm);
            if let Some(controller) = app.session() {
                controller.set_cadence(bpm).map_err(|e| e.to_string())?;
            }
            Ok(None)
        }
        Intent::Status => {
            let controller = app.session().ok_or_else(no_session)?;
            Ok(Some(render_status(&controller.snapshot())))
        }
        Intent::Start | Intent::Pause | Intent::Toggle | Intent::Reset => {
            let controller = app.session().ok_or_else(no_session)?;
            let sent = match intent {
                Intent::Start => controller.start(),
                Intent::Pause => controller.pause(),
                Intent::Toggle => controller.toggle(),
                _ => controller.reset(),
            };
            sent.map_err(|e| e.to_string())?;
            Ok(None)
        }
    }
}

fn no_session() -> String {
    "no session selected, use `select N` first".to_string()
}

pub fn catalog_listing(app: &WorkoutApp) -> String {
    app.catalog()
        .iter()
        .enumerate()
        .map(|(index, plan)| format!("{:>2}. {}: {}", index + 1, session_title(index), plan_summary(plan)))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_intents() {
        assert_eq!("select 3".parse(), Ok(Intent::Select(2)));
        assert_eq!("  START ".parse(), Ok(Intent::Start));
        assert_eq!("cadence 175".parse(), Ok(Intent::Cadence(175)));
        assert_eq!("t".parse(), Ok(Intent::Toggle));
        assert_eq!("q".parse(), Ok(Intent::Quit));
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!("".parse::<Intent>().is_err());
        assert!("select".parse::<Intent>().is_err());
        assert!("select 0".parse::<Intent>().is_err());
        assert!("cadence fast".parse::<Intent>().is_err());
        assert!("start now".parse::<Intent>().is_err());
        assert!("jump".parse::<Intent>().is_err());
    }
}
