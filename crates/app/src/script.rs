use std::f32::consts::TAU;

use imagic_core::{ImagicError, Point, Result};

/// One line of an input script.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Tap(u64),
    Press(u64),
    Hold(u64),
    Release(u64),
    /// A synthetic closed loop drawn with one finger.
    Circle,
    /// A synthetic straight stroke.
    Line,
    /// One capture buffer at the given RMS level.
    Blow(f32),
    Shake(f32),
    Cover,
    Uncover,
    /// Visible media reached its natural end.
    End,
    /// The next media load fails.
    Fail(String),
}

pub fn parse(source: &str) -> Result<Vec<Step>> {
    source
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let line = line.split('#').next().unwrap_or_default().trim();
            (!line.is_empty()).then(|| parse_line(line).map_err(|err| {
                ImagicError::msg(format!("script line {}: {err}", index + 1))
            }))
        })
        .collect()
}

fn parse_line(line: &str) -> Result<Step> {
    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or_default();
    let argument = words.next();

    let millis = || -> Result<u64> {
        argument
            .ok_or_else(|| ImagicError::msg(format!("`{command}` needs a time in ms")))?
            .parse()
            .map_err(|_| ImagicError::msg(format!("`{command}` needs a time in ms")))
    };
    let level = || -> Result<f32> {
        argument
            .ok_or_else(|| ImagicError::msg(format!("`{command}` needs a level")))?
            .parse()
            .map_err(|_| ImagicError::msg(format!("`{command}` needs a level")))
    };

    Ok(match command {
        "tap" => Step::Tap(millis()?),
        "press" => Step::Press(millis()?),
        "hold" => Step::Hold(millis()?),
        "release" => Step::Release(millis()?),
        "circle" => Step::Circle,
        "line" => Step::Line,
        "blow" => Step::Blow(level()?),
        "shake" => Step::Shake(level()?),
        "cover" => Step::Cover,
        "uncover" => Step::Uncover,
        "end" => Step::End,
        "fail" => {
            let reason: Vec<&str> = argument.into_iter().chain(words).collect();
            Step::Fail(if reason.is_empty() {
                "scripted failure".to_string()
            } else {
                reason.join(" ")
            })
        }
        other => return Err(ImagicError::msg(format!("unknown command `{other}`"))),
    })
}

/// Points of a nearly closed 200x160 loop.
pub fn circle_trace() -> Vec<Point> {
    (0..48)
        .map(|i| {
            let theta = (TAU - 0.3) * i as f32 / 47.0;
            Point::new(200.0 + 100.0 * theta.cos(), 300.0 + 80.0 * theta.sin())
        })
        .collect()
}

pub fn line_trace() -> Vec<Point> {
    (0..30).map(|i| Point::new(200.0, 100.0 + i as f32 * 10.0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_and_comments() {
        let steps = parse(
            "# warm up\ntap 0\ntap 300 # second\n\nblow 0.4\ncover\nend\nfail missing codec\n",
        )
        .unwrap();
        assert_eq!(
            steps,
            vec![
                Step::Tap(0),
                Step::Tap(300),
                Step::Blow(0.4),
                Step::Cover,
                Step::End,
                Step::Fail("missing codec".into()),
            ]
        );
    }

    #[test]
    fn reports_bad_lines() {
        let err = parse("tap\n").unwrap_err();
        assert!(err.to_string().contains("line 1"));
        assert!(parse("wave 3\n").is_err());
    }

    #[test]
    fn synthetic_traces_classify_as_expected() {
        let params = imagic_core::classifiers::CircleParams::default();
        assert!(imagic_core::classifiers::is_circle(&circle_trace(), &params));
        assert!(!imagic_core::classifiers::is_circle(&line_trace(), &params));
    }
}
