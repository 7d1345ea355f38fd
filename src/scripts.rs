//! Built-in flight scripts.

use crate::command::BATTERY_QUERY;
use crate::sequencer::CommandStep;

/// Take off, flip in all four directions, land and report the battery.
pub const TEST_FLIGHT: &str = "testflight";

/// Fly a 250cm square at 1m, land and report the battery.
pub const SQUARE: &str = "square";

pub fn names() -> &'static [&'static str] {
    &[TEST_FLIGHT, SQUARE]
}

/// Looks up a script by name.
pub fn predefined(name: &str) -> Option<Vec<CommandStep>> {
    match name {
        TEST_FLIGHT => Some(test_flight()),
        SQUARE => Some(square()),
        _ => None,
    }
}

fn test_flight() -> Vec<CommandStep> {
    vec![
        CommandStep::new("takeoff", 0),
        CommandStep::new("up 100", 0),
        CommandStep::new("flip f", 50),
        CommandStep::new("flip b", 50),
        CommandStep::new("flip l", 50),
        CommandStep::new("flip r", 50),
        CommandStep::new("down 50", 0),
        CommandStep::new("land", 500),
        CommandStep::last(BATTERY_QUERY),
    ]
}

fn square() -> Vec<CommandStep> {
    let mut steps = vec![CommandStep::new("takeoff", 0), CommandStep::new("up 100", 0)];
    for side in 0..4 {
        if side > 0 {
            steps.push(CommandStep::new("cw 90", 0));
        }
        steps.push(CommandStep::new("forward 250", 0));
    }
    steps.push(CommandStep::new("land", 500));
    steps.push(CommandStep::last(BATTERY_QUERY));
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::PostDelay;

    #[test]
    fn test_every_name_resolves() {
        for name in names() {
            assert!(predefined(name).is_some(), "{name}");
        }
        assert!(predefined("loop-the-loop").is_none());
    }

    #[test]
    fn test_test_flight() {
        let steps = predefined(TEST_FLIGHT).unwrap();
        let texts: Vec<_> = steps.iter().map(|s| s.text.as_str()).collect();

        assert_eq!(
            texts,
            vec!["takeoff", "up 100", "flip f", "flip b", "flip l", "flip r", "down 50", "land", "battery?"]
        );
        assert_eq!(steps[2].post_delay, PostDelay::Millis(50));
        assert_eq!(steps[7].post_delay, PostDelay::Millis(500));
        assert_eq!(steps[8].post_delay, PostDelay::NoAutoAdvance);
    }

    #[test]
    fn test_square_turns_between_sides() {
        let steps = predefined(SQUARE).unwrap();

        assert_eq!(steps.iter().filter(|s| s.text == "forward 250").count(), 4);
        assert_eq!(steps.iter().filter(|s| s.text == "cw 90").count(), 3);
        assert_eq!(steps.len(), 2 + 7 + 2);
        assert_eq!(steps.last().unwrap().post_delay, PostDelay::NoAutoAdvance);
    }
}
