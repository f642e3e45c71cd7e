//! Mermaid flowchart view of an execution's event graph. One subgraph per
//! thread; program order as plain arrows, read-from as dashed `rf` arrows,
//! conflicts as dashed arrows from a red-filled node to the two racing
//! writes. Pure text, no side effects.

use {
    crate::{context::GlobalContext, graph::EventKind},
    std::fmt::Write,
};

pub fn render(gctx: &GlobalContext) -> String {
    let mut out = String::from("flowchart TB\n");
    let mut cross = Vec::new();

    for (i, thread) in gctx.threads.iter().enumerate() {
        let _ = writeln!(out, "subgraph Thread {i}");
        out.push_str("\tdirection TB\n");
        for ix in gctx.graph.chain(thread.start) {
            let id = ix.as_usize();
            match gctx.graph.kind(ix) {
                EventKind::Start { .. } => {
                    let _ = writeln!(out, "\tn{id}@{{ shape: circle, label: \"start\" }}");
                }
                EventKind::End => {
                    let _ = writeln!(out, "\tn{id}@{{ shape: dbl-circ, label: \"end\" }}");
                }
                EventKind::Write { var, value, commit } => {
                    let _ = writeln!(out, "\tn{id}(\"write {var} = {value} : #{commit}\")");
                }
                EventKind::Read {
                    var,
                    value,
                    commit,
                    source,
                } => {
                    let _ = writeln!(out, "\tn{id}(\"read {var} = {value} : #{commit}\")");
                    cross.push(format!("n{id} -.rf.-> n{}", source.as_usize()));
                }
                EventKind::Spawn { tid, start } => {
                    let _ = writeln!(out, "\tn{id}(\"spawn {tid}\")");
                    cross.push(format!("n{id} --> n{}", start.as_usize()));
                }
                EventKind::Join {
                    tid,
                    joinee,
                    conflict,
                } => {
                    let _ = writeln!(out, "\tn{id}(\"join Thread {tid}\")");
                    cross.push(format!("n{} --> n{id}", joinee.as_usize()));
                    if let Some(conflict) = conflict {
                        cross.push(format!("style n{id} fill:red"));
                        cross.push(format!("n{id} -.-> n{}", conflict.sources.0.as_usize()));
                        cross.push(format!("n{id} -.-> n{}", conflict.sources.1.as_usize()));
                    }
                }
                EventKind::Lock {
                    lock,
                    after,
                    conflict,
                } => {
                    let _ = writeln!(out, "\tn{id}(\"lock {lock}\")");
                    if let Some(after) = after {
                        cross.push(format!("n{} --> n{id}", after.as_usize()));
                    }
                    if let Some(conflict) = conflict {
                        cross.push(format!("style n{id} fill:red"));
                        cross.push(format!("n{id} -.-> n{}", conflict.sources.0.as_usize()));
                        cross.push(format!("n{id} -.-> n{}", conflict.sources.1.as_usize()));
                    }
                }
                EventKind::Unlock { lock } => {
                    let _ = writeln!(out, "\tn{id}(\"unlock {lock}\")");
                }
                EventKind::AssertionFailure { cond } => {
                    let _ = writeln!(out, "\tn{id}(\"assert failed: {cond}\")");
                    cross.push(format!("style n{id} fill:red"));
                }
                EventKind::Pending { stmt } => {
                    let _ = writeln!(out, "\tn{id}(\"{stmt}\")");
                    cross.push(format!("style n{id} stroke-dasharray: 5 5"));
                }
            }
            if let Some(next) = gctx.graph.next(ix) {
                let _ = writeln!(out, "\tn{id} --> n{}", next.as_usize());
            }
        }
        out.push_str("end\n");
    }

    for line in cross {
        out.push_str(&line);
        out.push('\n');
    }
    out
}
