use anyhow::{Result, anyhow, bail, ensure};
use logos::{Lexer, Logos};

/// Parse a human readable duration (`"150ms"`, `"1s 500ms"`, `"2.5h"`)
/// into a number of seconds.
///
/// Every number must be followed by its unit, successive components are
/// summed.
pub(crate) fn parse_seconds(s: &str) -> Result<f64> {
    let mut lex = Lexer::<'_, Token>::new(s);

    let mut seconds = 0.0;
    let mut components = 0;

    while let Some(next) = lex.next() {
        let number: Token = next.map_err(|()| anyhow!("Failed to parse: {s}"))?;

        ensure!(
            number == Token::Value,
            "Expecting duration to starts with number. Cannot parse {s}"
        );
        let number: f64 = lex.slice().parse()?;

        let Some(Ok(measure)) = lex.next() else {
            bail!("Expecting a measure, failed to parse: {s}")
        };
        let scale = match measure {
            Token::NanoSeconds => 1e-9,
            Token::MicroSeconds => 1e-6,
            Token::MilliSeconds => 1e-3,
            Token::Seconds => 1.0,
            Token::Minutes => 60.0,
            Token::Hours => 3_600.0,
            Token::Value => bail!("Failed to parse `{s}', expecting a measure."),
        };
        seconds += number * scale;
        components += 1;
    }

    ensure!(components > 0, "Expecting at least one duration, got `{s}'");

    Ok(seconds)
}

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\n\f]+")] // Ignore this regex pattern between tokens
enum Token {
    #[token("ns")]
    NanoSeconds,
    #[regex("us|µs|μs")]
    MicroSeconds,
    #[token("ms")]
    MilliSeconds,
    #[token("s")]
    Seconds,
    #[token("m")]
    Minutes,
    #[token("h")]
    Hours,

    #[regex(r"[0-9]+(\.[0-9]+)?")]
    Value,
}
