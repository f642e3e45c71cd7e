//! Interactive stepping: the user chooses which thread to drive to its
//! next sync point, inspecting thread views, lock ownership, and the
//! event graph between steps.

use {
    anyhow::{bail, Result},
    gitmem::{progress_thread, GlobalContext, Lock},
    gitmem_core::{memory::Global, Block, StepOutcome, TerminationStatus, ThreadId},
    std::{
        io::{self, BufRead, Write},
        process::ExitCode,
    },
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Command {
    /// Run the given thread to its next sync point.
    Step(ThreadId),
    /// Run the rest of the program.
    Finish,
    /// Start over from the beginning.
    Restart,
    /// List all threads, including completed ones.
    List,
    /// Write the event graph now.
    Print,
    /// Toggle writing the event graph after every step.
    Graph,
    Quit,
    /// Show the command summary.
    Info,
    /// Do nothing; used for unrecognised input.
    Skip,
}

type GraphWriter<'a> = &'a dyn Fn(&GlobalContext) -> Result<()>;

pub(crate) fn run(program: Block, write_graph: GraphWriter<'_>) -> Result<ExitCode> {
    let mut gctx = GlobalContext::new(program.clone());
    let mut command = Command::List;
    let mut message = String::new();
    let mut print_graphs = true;
    let mut prev_thread_count = 1;
    write_graph(&gctx)?;

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    while command != Command::Quit {
        if command != Command::Skip || prev_thread_count != gctx.threads.len() {
            show_global_context(&gctx, command == Command::List);
        }
        prev_thread_count = gctx.threads.len();

        if !message.is_empty() {
            println!("{message}");
            message.clear();
        }

        print!("> ");
        io::stdout().flush()?;
        let input = match lines.next() {
            Some(line) => line?,
            None => break, // stdin closed
        };
        if !input.trim().is_empty() {
            command = parse_command(input.trim());
        }

        match command {
            Command::Step(tid) => {
                if !step_thread(tid, &mut gctx, &mut message)? {
                    command = Command::Skip;
                }
                if print_graphs {
                    write_graph(&gctx)?;
                }
            }
            Command::Finish => {
                if gitmem::run_threads(&mut gctx) {
                    message = "Program terminated with an error".into();
                } else {
                    message = "Program finished successfully".into();
                }
                if print_graphs {
                    write_graph(&gctx)?;
                }
            }
            Command::Restart => {
                gctx = GlobalContext::new(program.clone());
                command = Command::List;
                if print_graphs {
                    write_graph(&gctx)?;
                }
            }
            Command::Graph => {
                print_graphs = !print_graphs;
                println!(
                    "graphs {} print automatically",
                    if print_graphs { "will" } else { "won't" }
                );
                command = Command::Skip;
            }
            Command::Print => {
                write_graph(&gctx)?;
                command = Command::Skip;
            }
            Command::Info => {
                println!("Commands:");
                println!("s [tid] - Step to next sync point in thread");
                println!("[tid] - Step to next sync point in thread");
                println!("f - Finish the program");
                println!("r - Restart the program");
                println!("l - List all threads");
                println!("g - Toggle printing the event graph at sync points");
                println!("p - Print the event graph now");
                println!("q - Quit the interpreter");
                println!("? - Display this help message");
                command = Command::Skip;
            }
            Command::List | Command::Skip | Command::Quit => {}
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn parse_command(input: &str) -> Command {
    // A bare number steps that thread.
    if !input.is_empty() && input.bytes().all(|b| b.is_ascii_digit()) {
        return Command::Step(ThreadId::from(input.parse::<usize>().unwrap_or(0)));
    }
    let is_step = input == "s"
        || (input.starts_with('s') && !input.chars().nth(1).is_some_and(char::is_alphabetic));
    if is_step {
        let arg = input[1..].trim();
        if !arg.is_empty() && arg.bytes().all(|b| b.is_ascii_digit()) {
            return Command::Step(ThreadId::from(arg.parse::<usize>().unwrap_or(0)));
        }
        println!("Expected thread id");
        return Command::Skip;
    }
    match input {
        "q" => Command::Quit,
        "r" => Command::Restart,
        "f" => Command::Finish,
        "l" => Command::List,
        "g" => Command::Graph,
        "p" => Command::Print,
        "?" => Command::Info,
        _ => {
            println!("Unknown command: {input}");
            Command::Skip
        }
    }
}

/// Step one thread. The return value says whether the thread display
/// should refresh. Data races and assertion failures are part of a
/// stepping session; unbound reads and bad unlocks abort it.
fn step_thread(tid: ThreadId, gctx: &mut GlobalContext, message: &mut String) -> Result<bool> {
    if usize::from(tid) >= gctx.threads.len() {
        *message = format!("Invalid thread id: {tid}");
        return Ok(false);
    }

    if let Some(status) = gctx.threads[tid].terminated {
        *message = if status == TerminationStatus::Completed {
            format!("Thread {tid} has terminated normally")
        } else {
            format!("Thread {tid} has terminated with an error")
        };
        return Ok(false);
    }

    match progress_thread(gctx, tid) {
        StepOutcome::NoProgress => {
            let stmt = gctx.threads[tid]
                .current_stmt()
                .map(ToString::to_string)
                .unwrap_or_default();
            *message = format!("Thread {tid} is blocking on '{stmt}'");
            Ok(false)
        }
        StepOutcome::Progress => Ok(true),
        StepOutcome::Terminated(TerminationStatus::Completed) => {
            *message = format!("Thread {tid} terminated normally");
            Ok(true)
        }
        StepOutcome::Terminated(TerminationStatus::DataRace) => {
            *message = format!("Thread {tid} encountered a data race and was terminated");
            Ok(false)
        }
        StepOutcome::Terminated(TerminationStatus::AssertionFailure) => {
            let stmt = gctx.threads[tid]
                .current_stmt()
                .map(ToString::to_string)
                .unwrap_or_default();
            *message = format!("Thread {tid} failed '{stmt}' and was terminated");
            Ok(false)
        }
        StepOutcome::Terminated(TerminationStatus::UnboundRead) => {
            bail!("Thread {tid} read an uninitialised variable")
        }
        StepOutcome::Terminated(TerminationStatus::UnownedUnlock) => {
            bail!("Thread {tid} unlocked a lock it does not own")
        }
    }
}

fn show_global(var: &str, global: &Global) {
    let pending = global
        .pending
        .map(|commit| commit.to_string())
        .unwrap_or_else(|| "_".into());
    let history = global
        .history
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    println!("{var} = {} [{pending}; {history}]", global.val);
}

fn show_thread(gctx: &GlobalContext, tid: usize) {
    let thread = &gctx.threads[tid];
    println!("---- Thread {tid}");
    if !thread.locals.is_empty() {
        for (reg, val) in &thread.locals {
            println!("${reg} = {val}");
        }
        println!("--");
    }
    if !thread.globals.is_empty() {
        for (var, global) in &thread.globals {
            show_global(var, global);
        }
        println!("--");
    }

    for (idx, stmt) in thread.block.iter().enumerate() {
        let marker = if idx == thread.pc { "-> " } else { "   " };
        println!("{marker}{stmt};");
    }
    if thread.pc == thread.block.len() {
        println!("-> ");
    }
}

fn show_lock(name: &str, lock: &Lock) {
    match lock.owner {
        Some(owner) => println!("{name}: held by thread {owner}"),
        None => println!("{name}: <free>"),
    }
    for (var, global) in &lock.globals {
        show_global(var, global);
    }
}

/// Print the live threads (all of them when `show_all` is set) followed by
/// the locks.
fn show_global_context(gctx: &GlobalContext, show_all: bool) {
    let mut showed_any = false;
    for tid in 0..gctx.threads.len() {
        let terminated = gctx.threads[tid].terminated;
        if show_all || terminated != Some(TerminationStatus::Completed) {
            show_thread(gctx, tid);
            println!();
            showed_any = true;
        }
    }

    if showed_any && !gctx.locks.is_empty() {
        println!("---- Locks");
        for (name, lock) in &gctx.locks {
            show_lock(name, lock);
        }
        println!("--");
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bare_numbers_step_that_thread() {
        assert_eq!(parse_command("2"), Command::Step(ThreadId::from(2)));
        assert_eq!(parse_command("s 2"), Command::Step(ThreadId::from(2)));
        assert_eq!(parse_command("s2"), Command::Step(ThreadId::from(2)));
    }

    #[test]
    fn step_without_an_id_is_skipped() {
        assert_eq!(parse_command("s"), Command::Skip);
        assert_eq!(parse_command("s x"), Command::Skip);
    }

    #[test]
    fn letter_commands_map_one_to_one() {
        assert_eq!(parse_command("q"), Command::Quit);
        assert_eq!(parse_command("r"), Command::Restart);
        assert_eq!(parse_command("f"), Command::Finish);
        assert_eq!(parse_command("l"), Command::List);
        assert_eq!(parse_command("g"), Command::Graph);
        assert_eq!(parse_command("p"), Command::Print);
        assert_eq!(parse_command("?"), Command::Info);
    }

    #[test]
    fn unknown_input_is_skipped() {
        assert_eq!(parse_command("step"), Command::Skip);
        assert_eq!(parse_command("hello"), Command::Skip);
    }
}
