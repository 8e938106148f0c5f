//! Completion-condition expressions.
//!
//! A condition is a conjunction of atomic predicates joined by ` and `:
//! `input(name)`, `output(name)` or `task(id)`. A task definition may list
//! several conditions; the first condition whose full conjunction holds
//! completes the task. A condition with no well-formed predicates never
//! fires.

/// One atomic predicate of a completion condition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Predicate {
    Input(String),
    Output(String),
    Task(String),
}

/// Parse a condition string into predicates. Malformed atoms (no method,
/// missing brackets, unknown method) yield `None`, which poisons the whole
/// conjunction: a condition that cannot be parsed must never be satisfied.
pub fn parse(condition: &str) -> Option<Vec<Predicate>> {
    if condition.trim().is_empty() {
        return None;
    }
    let mut predicates = Vec::new();
    for atom in condition.split(" and ") {
        let atom = atom.trim();
        let open = atom.find('(')?;
        let close = atom.find(')')?;
        if close <= open + 1 {
            return None;
        }
        let param = atom[open + 1..close].to_string();
        match &atom[..open] {
            "input" => predicates.push(Predicate::Input(param)),
            "output" => predicates.push(Predicate::Output(param)),
            "task" => predicates.push(Predicate::Task(param)),
            _ => return None,
        }
    }
    Some(predicates)
}
