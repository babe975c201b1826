use anyhow::{bail, Context};
use desk_core::chart::ChartKind;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// The name is passed through as typed; the store normalizes it.
    Add { name: String, weight: u32 },
    /// The weight stays raw text so the store applies its own validation.
    Set { target: Target, weight: String },
    Remove { target: Target },
    Pick,
    Select { ticker: String },
    Save,
    Dismiss,
    Show,
    Chart(ChartKind),
}

/// An existing entry: `NAME` or `NAME#N`, where `N` is the 1-based
/// occurrence among entries sharing the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub ticker: String,
    /// 0-based.
    pub occurrence: usize,
}

impl Target {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        let Some((name, n)) = raw.split_once('#') else {
            return Ok(Target {
                ticker: ticker(raw),
                occurrence: 0,
            });
        };
        let n: usize = n
            .parse()
            .with_context(|| format!("invalid occurrence {n:?} in {raw}"))?;
        anyhow::ensure!(n >= 1, "occurrences count from 1 (got {raw})");
        Ok(Target {
            ticker: ticker(name),
            occurrence: n - 1,
        })
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.occurrence == 0 {
            f.write_str(&self.ticker)
        } else {
            write!(f, "{}#{}", self.ticker, self.occurrence + 1)
        }
    }
}

fn ticker(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Parses one script line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> anyhow::Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let words: Vec<&str> = line.split_whitespace().collect();
    let command = match words.as_slice() {
        ["add", name] => Command::Add {
            name: name.to_string(),
            weight: 0,
        },
        ["add", name, weight] => Command::Add {
            name: name.to_string(),
            weight: weight
                .parse()
                .with_context(|| format!("invalid weight {weight:?} for {name}"))?,
        },
        ["set", name, weight] => Command::Set {
            target: Target::parse(name)?,
            weight: weight.to_string(),
        },
        ["remove", name] => Command::Remove {
            target: Target::parse(name)?,
        },
        ["pick"] => Command::Pick,
        ["select", name] => Command::Select { ticker: ticker(name) },
        ["save"] => Command::Save,
        ["dismiss"] => Command::Dismiss,
        ["show"] => Command::Show,
        ["chart", kind] => Command::Chart(kind.parse()?),
        _ => bail!("unrecognized command: {line}"),
    };
    Ok(Some(command))
}

/// Parses a whole script, keeping 1-based line numbers for diagnostics.
/// A bad line becomes an error in its own slot; the lines around it still
/// parse.
pub fn parse_script(source: &str) -> Vec<(usize, anyhow::Result<Command>)> {
    source
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| {
            let line_no = idx + 1;
            match parse_line(line).with_context(|| format!("script line {line_no}")) {
                Ok(None) => None,
                Ok(Some(command)) => Some((line_no, Ok(command))),
                Err(err) => Some((line_no, Err(err))),
            }
        })
        .collect()
}

/// `NAME=WEIGHT` from `--entry`.
pub fn parse_seed(raw: &str) -> anyhow::Result<(String, u32)> {
    let (name, weight) = raw
        .split_once('=')
        .with_context(|| format!("--entry must look like NAME=WEIGHT (got {raw:?})"))?;
    let name = ticker(name);
    anyhow::ensure!(!name.is_empty(), "--entry name must be non-empty (got {raw:?})");
    let weight = weight
        .trim()
        .parse::<u32>()
        .with_context(|| format!("--entry weight must be a non-negative integer (got {raw:?})"))?;
    Ok((name, weight))
}
