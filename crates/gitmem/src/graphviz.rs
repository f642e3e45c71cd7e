//! Graphviz digraph view of an execution's event graph. One cluster per
//! thread; program order solid, read-from dashed and labelled `rf`, sync
//! edges bold, conflict edges dashed red with the detecting node filled
//! red. Pure text, no side effects.

use {
    crate::{context::GlobalContext, graph::EventKind},
    std::fmt::Write,
};

pub fn render(gctx: &GlobalContext) -> String {
    let mut out = String::from("digraph G {\n");
    let mut cross = Vec::new();

    for (i, thread) in gctx.threads.iter().enumerate() {
        let _ = writeln!(out, "subgraph cluster_thread_{i} {{");
        let _ = writeln!(out, "\tlabel = \"Thread #{i}\";");
        out.push_str("\tcolor=black;\n");
        for ix in gctx.graph.chain(thread.start) {
            let id = ix.as_usize();
            match gctx.graph.kind(ix) {
                EventKind::Start { .. } => {
                    let _ = writeln!(
                        out,
                        "\tn{id}[label=\"\", shape=circle, width=.3, style=filled, color=black];"
                    );
                }
                EventKind::End => {
                    let _ = writeln!(out, "\tn{id}[label=\"\", shape=doublecircle, width=.2];");
                }
                EventKind::Write { var, value, .. } => {
                    emit_node(&mut out, id, &format!("W{var} = {value}"));
                }
                EventKind::Read {
                    var,
                    value,
                    source,
                    ..
                } => {
                    emit_node(&mut out, id, &format!("R{var} = {value}"));
                    cross.push(format!(
                        "\tn{id} -> n{}[style=dashed, constraint=false, label=\"rf\"];",
                        source.as_usize()
                    ));
                }
                EventKind::Spawn { tid, start } => {
                    emit_node(&mut out, id, &format!("Spawn {tid}"));
                    cross.push(sync_edge(id, start.as_usize()));
                }
                EventKind::Join {
                    tid,
                    joinee,
                    conflict,
                } => {
                    emit_node(&mut out, id, &format!("Join {tid}"));
                    cross.push(sync_edge(joinee.as_usize(), id));
                    if let Some(conflict) = conflict {
                        cross.push(format!("\tn{id}[fillcolor=red];"));
                        cross.push(race_edge(id, conflict.sources.0.as_usize()));
                        cross.push(race_edge(id, conflict.sources.1.as_usize()));
                    }
                }
                EventKind::Lock {
                    lock,
                    after,
                    conflict,
                } => {
                    emit_node(&mut out, id, &format!("lock {lock}"));
                    if let Some(after) = after {
                        cross.push(sync_edge(after.as_usize(), id));
                    }
                    if let Some(conflict) = conflict {
                        cross.push(format!("\tn{id}[fillcolor=red];"));
                        cross.push(race_edge(id, conflict.sources.0.as_usize()));
                        cross.push(race_edge(id, conflict.sources.1.as_usize()));
                    }
                }
                EventKind::Unlock { lock } => {
                    emit_node(&mut out, id, &format!("unlock {lock}"));
                }
                EventKind::AssertionFailure { cond } => {
                    let _ = writeln!(
                        out,
                        "\tn{id}[label=\"assert failed: {}\", shape=rectangle, \
                         style=\"rounded,filled\", fillcolor=red];",
                        escape(cond)
                    );
                }
                EventKind::Pending { stmt } => {
                    let _ = writeln!(
                        out,
                        "\tn{id}[label=\"{}\", shape=rectangle, style=\"rounded,dashed\"];",
                        escape(stmt)
                    );
                }
            }
            if let Some(next) = gctx.graph.next(ix) {
                let _ = writeln!(out, "\tn{id} -> n{};", next.as_usize());
            }
        }
        out.push_str("}\n");
    }

    for line in cross {
        out.push_str(&line);
        out.push('\n');
    }
    out.push_str("}\n");
    out
}

fn emit_node(out: &mut String, id: usize, label: &str) {
    let _ = writeln!(
        out,
        "\tn{id}[label=\"{}\", shape=rectangle, style=\"rounded,filled\"];",
        escape(label)
    );
}

fn sync_edge(from: usize, to: usize) -> String {
    format!("\tn{from} -> n{to}[style=bold, constraint=false, label=\"sync\"];")
}

fn race_edge(from: usize, to: usize) -> String {
    format!("\tn{from} -> n{to}[style=dashed, color=red, constraint=false, label=\"race\"];")
}

fn escape(label: &str) -> String {
    label.replace('"', "\\\"")
}
