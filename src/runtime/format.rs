//! `printf` directives and the text-to-number conversion behind `number()`.

use crate::runtime::{
    error::{RuntimeError, RuntimeResult},
    value::{format_number, Value},
};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_till1},
    character::complete::{char, digit0, digit1, one_of},
    combinator::{all_consuming, map, opt, recognize},
    multi::many0,
    sequence::{pair, preceded, tuple},
    IResult,
};

const DEFAULT_PRECISION: usize = 6;

#[derive(Debug, PartialEq)]
pub enum Segment<'a> {
    Text(&'a str),
    Percent,
    Directive { verb: char, precision: Option<usize> },
}

fn parse_text(input: &str) -> IResult<&str, Segment<'_>> {
    map(take_till1(|c| c == '%'), Segment::Text)(input)
}

fn parse_percent(input: &str) -> IResult<&str, Segment<'_>> {
    map(tag("%%"), |_| Segment::Percent)(input)
}

fn parse_directive(input: &str) -> IResult<&str, Segment<'_>> {
    let (input, _) = char('%')(input)?;
    let (input, precision) = opt(preceded(char('.'), digit1))(input)?;
    let (input, verb) = one_of("vsqdft")(input)?;
    Ok((
        input,
        Segment::Directive {
            verb,
            precision: precision.and_then(|digits: &str| digits.parse().ok()),
        },
    ))
}

pub fn parse_format(format: &str) -> RuntimeResult<Vec<Segment<'_>>> {
    all_consuming(many0(alt((parse_text, parse_percent, parse_directive))))(format)
        .map(|(_, segments)| segments)
        .map_err(|_| RuntimeError::InvalidFormat {
            format: format.to_string(),
        })
}

/// Expands `format` against `args`, consuming one argument per directive.
/// Surplus arguments are ignored.
pub fn render(format: &str, args: &[Value]) -> RuntimeResult<String> {
    let mut out = String::with_capacity(format.len());
    let mut args = args.iter();
    for segment in parse_format(format)? {
        let (verb, precision) = match segment {
            Segment::Text(text) => {
                out.push_str(text);
                continue;
            }
            Segment::Percent => {
                out.push('%');
                continue;
            }
            Segment::Directive { verb, precision } => (verb, precision),
        };
        let arg = args.next().ok_or_else(|| RuntimeError::InvalidFormat {
            format: format!("{format} (missing argument for %{verb})"),
        })?;
        match verb {
            'v' | 's' => out.push_str(&arg.display()),
            'q' => out.push_str(&arg.repr()),
            'd' => out.push_str(&format_number(arg.expect_number("%d")?.trunc())),
            'f' => {
                let n = arg.expect_number("%f")?;
                out.push_str(&format!("{:.*}", precision.unwrap_or(DEFAULT_PRECISION), n));
            }
            't' => out.push_str(if arg.expect_bool("%t")? { "true" } else { "false" }),
            _ => unreachable!("directive verbs are limited by the parser"),
        }
    }
    Ok(out)
}

fn parse_decimal(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        opt(one_of("+-")),
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    )))(input)
}

/// Decimal text with optional sign, fraction and exponent. Surrounding
/// whitespace is ignored.
pub fn parse_number(text: &str) -> Option<f64> {
    all_consuming(parse_decimal)(text.trim())
        .ok()
        .and_then(|(_, digits)| digits.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn segments() {
        assert_eq!(
            parse_format("a %v %.2f%%").ok(),
            Some(vec![
                Segment::Text("a "),
                Segment::Directive {
                    verb: 'v',
                    precision: None
                },
                Segment::Text(" "),
                Segment::Directive {
                    verb: 'f',
                    precision: Some(2)
                },
                Segment::Percent,
            ])
        );
        assert!(parse_format("%z").is_err());
        assert!(parse_format("trailing %").is_err());
    }

    #[test]
    fn renders_each_verb() {
        let args = [
            Value::String("hi".into()),
            Value::String("hi".into()),
            Value::Number(3.9),
            Value::Number(2.0),
            Value::Bool(true),
        ];
        assert_eq!(
            render("%s %q %d %.3f %t", &args).ok().as_deref(),
            Some("hi \"hi\" 3 2.000 true")
        );
    }

    #[test]
    fn missing_argument_is_an_error() {
        assert!(matches!(
            render("%v %v", &[Value::Nil]),
            Err(RuntimeError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn numbers() {
        assert_eq!(parse_number("42"), Some(42.0));
        assert_eq!(parse_number(" -1.5e2 "), Some(-150.0));
        assert_eq!(parse_number(".25"), Some(0.25));
        assert_eq!(parse_number("3."), Some(3.0));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("1x"), None);
        assert_eq!(parse_number(""), None);
    }
}
