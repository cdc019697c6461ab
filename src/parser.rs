use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_until},
    character::complete::{char, digit1, multispace0, multispace1},
    combinator::{map_res, opt},
    multi::separated_list0,
    sequence::{delimited, preceded},
    IResult,
};

use crate::model::RecordId;

#[derive(Debug, PartialEq, Clone)]
pub enum Command {
    Think { content: String, category: String, author: String },
    Dream { content: String, themes: Vec<String>, dreamer: String },
    GetThought { id: RecordId },
    GetDream { id: RecordId },
    ThoughtsBy { author: String },
    ThoughtsIn { category: String },
    DreamsBy { dreamer: String },
    Delete { id: RecordId, caller: String },
    AnalyzeThoughts,
    AnalyzeDreams,
    Help,
    Exit,
}

// --- BASIC PARSERS ---

fn parse_id(input: &str) -> IResult<&str, RecordId> {
    map_res(digit1, |s: &str| s.parse::<RecordId>())(input)
}

fn parse_quoted_string(input: &str) -> IResult<&str, String> {
    let (input, _) = char('"')(input)?;
    let (input, content) = take_until("\"")(input)?;
    let (input, _) = char('"')(input)?;
    Ok((input, content.to_string()))
}

fn parse_string_list(input: &str) -> IResult<&str, Vec<String>> {
    delimited(
        char('['),
        ws(separated_list0(ws(char(',')), parse_quoted_string)),
        char(']'),
    )(input)
}

// --- HELPERS ---
fn ws<'a, F, O, E: nom::error::ParseError<&'a str>>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O, E>
where F: FnMut(&'a str) -> IResult<&'a str, O, E> {
    delimited(multispace0, inner, multispace0)
}

fn tag_ci(t: &'static str) -> impl FnMut(&str) -> IResult<&str, &str> {
    move |input| tag_no_case(t)(input)
}

// --- COMMAND PARSERS ---

fn parse_think(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("THINK")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, content) = parse_quoted_string(input)?;
    let (input, _) = ws(tag_ci("IN"))(input)?;
    let (input, category) = parse_quoted_string(input)?;
    let (input, _) = ws(tag_ci("AS"))(input)?;
    let (input, author) = parse_quoted_string(input)?;
    Ok((input, Command::Think { content, category, author }))
}

fn parse_dream(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("DREAM")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, content) = parse_quoted_string(input)?;
    let (input, themes) = opt(preceded(ws(tag_ci("THEMES")), parse_string_list))(input)?;
    let (input, _) = ws(tag_ci("AS"))(input)?;
    let (input, dreamer) = parse_quoted_string(input)?;
    Ok((input, Command::Dream { content, themes: themes.unwrap_or_default(), dreamer }))
}

fn parse_get(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("GET")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, kind) = alt((tag_ci("THOUGHT"), tag_ci("DREAM")))(input)?;
    let (input, _) = multispace1(input)?;
    let (input, id) = parse_id(input)?;

    let cmd = if kind.eq_ignore_ascii_case("THOUGHT") {
        Command::GetThought { id }
    } else {
        Command::GetDream { id }
    };
    Ok((input, cmd))
}

fn parse_thoughts(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("THOUGHTS")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, by) = alt((tag_ci("BY"), tag_ci("IN")))(input)?;
    let (input, _) = multispace0(input)?;
    let (input, key) = parse_quoted_string(input)?;

    let cmd = if by.eq_ignore_ascii_case("BY") {
        Command::ThoughtsBy { author: key }
    } else {
        Command::ThoughtsIn { category: key }
    };
    Ok((input, cmd))
}

fn parse_dreams(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("DREAMS")(input)?;
    let (input, _) = ws(tag_ci("BY"))(input)?;
    let (input, dreamer) = parse_quoted_string(input)?;
    Ok((input, Command::DreamsBy { dreamer }))
}

fn parse_delete(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("DELETE")(input)?;
    let (input, _) = opt(ws(tag_ci("THOUGHT")))(input)?;
    let (input, id) = ws(parse_id)(input)?;
    let (input, _) = ws(tag_ci("AS"))(input)?;
    let (input, caller) = parse_quoted_string(input)?;
    Ok((input, Command::Delete { id, caller }))
}

fn parse_analyze(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("ANALYZE")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, target) = alt((tag_ci("THOUGHTS"), tag_ci("DREAMS")))(input)?;

    let cmd = if target.eq_ignore_ascii_case("THOUGHTS") {
        Command::AnalyzeThoughts
    } else {
        Command::AnalyzeDreams
    };
    Ok((input, cmd))
}

fn parse_help(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("HELP")(input)?;
    Ok((input, Command::Help))
}

fn parse_exit(input: &str) -> IResult<&str, Command> {
    let (input, _) = alt((tag_ci("EXIT"), tag_ci("QUIT")))(input)?;
    Ok((input, Command::Exit))
}

pub fn parse_command(input: &str) -> Result<Command, String> {
    let input = input.trim();
    let result = alt((
        parse_think,
        parse_thoughts,
        parse_dreams,
        parse_dream,
        parse_get,
        parse_delete,
        parse_analyze,
        parse_help,
        parse_exit,
    ))(input);

    match result {
        Ok((remainder, cmd)) => {
            if !remainder.trim().is_empty() {
                return Err(format!("Unexpected tokens at end: '{}'", remainder));
            }
            Ok(cmd)
        },
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let context: String = e.input.chars().take(20).collect();
            let ellipsis = if e.input.chars().count() > 20 { "..." } else { "" };
            Err(format!("Invalid syntax near: '{}{}'", context, ellipsis))
        },
        Err(nom::Err::Incomplete(_)) => Err("Incomplete command.".to_string()),
    }
}
