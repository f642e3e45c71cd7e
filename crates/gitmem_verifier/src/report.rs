use {
    crate::{Exploration, FinalState},
    colorful::{Color, Colorful},
};

/// A schedule as one line of thread ids, the way traces are reported.
pub fn schedule_line(state: &FinalState) -> String {
    state
        .schedule
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Print the failing and deadlocked schedules to stdout, one line of
/// thread ids per trace. Quiet when every schedule passed.
pub fn print_report(exploration: &Exploration) {
    let failing: Vec<_> = exploration.failing().collect();
    if !failing.is_empty() {
        println!(
            "{}",
            format!("Found {} trace(s) with errors:", failing.len()).color(Color::Red)
        );
        for state in failing {
            println!("{}", schedule_line(state));
        }
    }

    let deadlocked: Vec<_> = exploration.deadlocked().collect();
    if !deadlocked.is_empty() {
        println!(
            "{}",
            format!("Found {} trace(s) leading to deadlock:", deadlocked.len()).color(Color::Yellow)
        );
        for state in deadlocked {
            println!("{}", schedule_line(state));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{Explorer, Verdict};
    use gitmem_lang::parse;

    #[test]
    fn schedules_format_as_space_separated_tids() {
        let exploration = Explorer::new(parse("join spawn { nop; };").unwrap()).run();
        let state = &exploration.states[0];
        assert_eq!(state.verdict, Verdict::Passed);
        assert_eq!(schedule_line(state), "0 0");
    }
}
