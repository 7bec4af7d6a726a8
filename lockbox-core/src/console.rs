//! Line-oriented command grammar for driving the box by hand.
//!
//! Each line is a verb followed by verb-specific arguments. Verbs are looked
//! up case-insensitively in [`VERBS`]; arguments are parsed with `winnow`
//! combinators and must consume the rest of the line.

use core::fmt;

use winnow::ascii::{Caseless, digit1, space0};
use winnow::combinator::{alt, empty, eof, opt, preceded, terminated};
use winnow::prelude::*;
use winnow::token::take_while;

use crate::flags::Flag;

/// Parsed console command.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConsoleCommand {
    /// Advance simulated time by this many milliseconds.
    Advance(u32),
    /// Insert a flag directly, as an interrupt handler would.
    Inject(Flag),
    /// Force a transition to a raw mode index.
    Goto(u8),
    Phone { present: bool },
    Lid { open: bool },
    Move,
    Rotate,
    Press,
    /// Sound above the audio threshold.
    Noise,
    Knock { matched: bool },
    Status,
    Events,
    Help,
}

/// Why a line was rejected.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConsoleError<'a> {
    Empty,
    UnknownVerb(&'a str),
    BadArguments { verb: &'static str, usage: &'static str },
}

impl fmt::Display for ConsoleError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsoleError::Empty => f.write_str("empty command"),
            ConsoleError::UnknownVerb(verb) => write!(f, "unknown command `{verb}`, try `help`"),
            ConsoleError::BadArguments { verb, usage } => {
                write!(f, "bad arguments for `{verb}`, usage: {usage}")
            }
        }
    }
}

/// A console verb, its usage line and its argument parser.
pub struct Verb {
    pub name: &'static str,
    pub usage: &'static str,
    pub summary: &'static str,
    arguments: fn(&mut &str) -> ModalResult<ConsoleCommand>,
}

pub static VERBS: [Verb; 13] = [
    Verb {
        name: "advance",
        usage: "advance <n>[ms|s]",
        summary: "run the scheduler for a stretch of simulated time",
        arguments: advance,
    },
    Verb {
        name: "inject",
        usage: "inject <flag>",
        summary: "insert a raw flag",
        arguments: inject,
    },
    Verb {
        name: "goto",
        usage: "goto <state-index>",
        summary: "force a transition through the normal path",
        arguments: goto,
    },
    Verb {
        name: "phone",
        usage: "phone in|out",
        summary: "place or remove the phone",
        arguments: phone,
    },
    Verb {
        name: "lid",
        usage: "lid open|closed",
        summary: "open or close the lid",
        arguments: lid,
    },
    Verb {
        name: "move",
        usage: "move",
        summary: "jostle the box",
        arguments: bare_move,
    },
    Verb {
        name: "rotate",
        usage: "rotate",
        summary: "turn the dial one detent",
        arguments: rotate,
    },
    Verb {
        name: "press",
        usage: "press",
        summary: "press the dial button",
        arguments: press,
    },
    Verb {
        name: "noise",
        usage: "noise",
        summary: "make a sound above the audio threshold",
        arguments: noise,
    },
    Verb {
        name: "knock",
        usage: "knock match|miss",
        summary: "finish a knock pattern",
        arguments: knock,
    },
    Verb {
        name: "status",
        usage: "status",
        summary: "show mode, flags and countdown",
        arguments: status,
    },
    Verb {
        name: "events",
        usage: "events",
        summary: "list scheduled events",
        arguments: events,
    },
    Verb {
        name: "help",
        usage: "help",
        summary: "list commands",
        arguments: help,
    },
];

/// Parses one console line.
pub fn parse_command(line: &str) -> Result<ConsoleCommand, ConsoleError<'_>> {
    let mut input = line.trim();
    if input.is_empty() {
        return Err(ConsoleError::Empty);
    }

    let name: &str = word
        .parse_next(&mut input)
        .map_err(|_| ConsoleError::UnknownVerb(line.trim()))?;
    let verb = VERBS
        .iter()
        .find(|verb| verb.name.eq_ignore_ascii_case(name))
        .ok_or(ConsoleError::UnknownVerb(name))?;

    terminated(preceded(space0, verb.arguments), (space0, eof))
        .parse_next(&mut input)
        .map_err(|_| ConsoleError::BadArguments {
            verb: verb.name,
            usage: verb.usage,
        })
}

fn word<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '-').parse_next(input)
}

/// `<n>`, `<n>ms` or `<n>s`, in milliseconds.
fn duration(input: &mut &str) -> ModalResult<u32> {
    (
        digit1.verify_map(|digits: &str| digits.parse::<u32>().ok()),
        opt(alt((Caseless("ms").value(1u32), Caseless("s").value(1_000u32)))),
    )
        .verify_map(|(value, scale): (u32, Option<u32>)| value.checked_mul(scale.unwrap_or(1)))
        .parse_next(input)
}

fn advance(input: &mut &str) -> ModalResult<ConsoleCommand> {
    duration.map(ConsoleCommand::Advance).parse_next(input)
}

fn inject(input: &mut &str) -> ModalResult<ConsoleCommand> {
    word.verify_map(Flag::from_name)
        .map(ConsoleCommand::Inject)
        .parse_next(input)
}

fn goto(input: &mut &str) -> ModalResult<ConsoleCommand> {
    digit1
        .verify_map(|digits: &str| digits.parse::<u8>().ok())
        .map(ConsoleCommand::Goto)
        .parse_next(input)
}

fn phone(input: &mut &str) -> ModalResult<ConsoleCommand> {
    alt((Caseless("in").value(true), Caseless("out").value(false)))
        .map(|present| ConsoleCommand::Phone { present })
        .parse_next(input)
}

fn lid(input: &mut &str) -> ModalResult<ConsoleCommand> {
    alt((Caseless("open").value(true), Caseless("closed").value(false)))
        .map(|open| ConsoleCommand::Lid { open })
        .parse_next(input)
}

fn knock(input: &mut &str) -> ModalResult<ConsoleCommand> {
    alt((Caseless("match").value(true), Caseless("miss").value(false)))
        .map(|matched| ConsoleCommand::Knock { matched })
        .parse_next(input)
}

fn bare_move(input: &mut &str) -> ModalResult<ConsoleCommand> {
    empty.value(ConsoleCommand::Move).parse_next(input)
}

fn rotate(input: &mut &str) -> ModalResult<ConsoleCommand> {
    empty.value(ConsoleCommand::Rotate).parse_next(input)
}

fn press(input: &mut &str) -> ModalResult<ConsoleCommand> {
    empty.value(ConsoleCommand::Press).parse_next(input)
}

fn noise(input: &mut &str) -> ModalResult<ConsoleCommand> {
    empty.value(ConsoleCommand::Noise).parse_next(input)
}

fn status(input: &mut &str) -> ModalResult<ConsoleCommand> {
    empty.value(ConsoleCommand::Status).parse_next(input)
}

fn events(input: &mut &str) -> ModalResult<ConsoleCommand> {
    empty.value(ConsoleCommand::Events).parse_next(input)
}

fn help(input: &mut &str) -> ModalResult<ConsoleCommand> {
    empty.value(ConsoleCommand::Help).parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_scale_by_unit() {
        assert_eq!(parse_command("advance 250"), Ok(ConsoleCommand::Advance(250)));
        assert_eq!(parse_command("advance 250ms"), Ok(ConsoleCommand::Advance(250)));
        assert_eq!(parse_command("ADVANCE 3S"), Ok(ConsoleCommand::Advance(3_000)));
        assert_eq!(
            parse_command("advance 5000000s"),
            Err(ConsoleError::BadArguments {
                verb: "advance",
                usage: "advance <n>[ms|s]",
            })
        );
    }

    #[test]
    fn keyword_arguments() {
        assert_eq!(
            parse_command("phone in"),
            Ok(ConsoleCommand::Phone { present: true })
        );
        assert_eq!(
            parse_command("  lid   closed  "),
            Ok(ConsoleCommand::Lid { open: false })
        );
        assert_eq!(
            parse_command("knock miss"),
            Ok(ConsoleCommand::Knock { matched: false })
        );
        assert!(matches!(
            parse_command("phone inside"),
            Err(ConsoleError::BadArguments { verb: "phone", .. })
        ));
    }

    #[test]
    fn inject_takes_flag_names() {
        assert_eq!(
            parse_command("inject box-open"),
            Ok(ConsoleCommand::Inject(Flag::BoxOpen))
        );
        assert!(matches!(
            parse_command("inject box-ajar"),
            Err(ConsoleError::BadArguments { verb: "inject", .. })
        ));
    }

    #[test]
    fn goto_accepts_any_byte() {
        assert_eq!(parse_command("goto 7"), Ok(ConsoleCommand::Goto(7)));
        assert_eq!(parse_command("goto 200"), Ok(ConsoleCommand::Goto(200)));
        assert!(parse_command("goto 256").is_err());
        assert!(parse_command("goto").is_err());
    }

    #[test]
    fn bare_verbs_reject_trailing_text() {
        assert_eq!(parse_command("status"), Ok(ConsoleCommand::Status));
        assert_eq!(parse_command("Press"), Ok(ConsoleCommand::Press));
        assert!(matches!(
            parse_command("move fast"),
            Err(ConsoleError::BadArguments { verb: "move", .. })
        ));
    }

    #[test]
    fn unknown_and_empty_lines() {
        assert_eq!(parse_command("   "), Err(ConsoleError::Empty));
        assert_eq!(parse_command("unlock now"), Err(ConsoleError::UnknownVerb("unlock")));
        assert_eq!(parse_command("?"), Err(ConsoleError::UnknownVerb("?")));
    }

    #[test]
    fn every_verb_parses_its_own_usage_example() {
        let examples = [
            "advance 1s",
            "inject dial-pressed",
            "goto 0",
            "phone out",
            "lid open",
            "move",
            "rotate",
            "press",
            "noise",
            "knock match",
            "status",
            "events",
            "help",
        ];
        for (verb, example) in VERBS.iter().zip(examples) {
            assert!(parse_command(example).is_ok(), "{} failed on {example}", verb.name);
        }
    }
}
