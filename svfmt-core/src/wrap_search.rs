//! Cost-minimizing wrap search over one unwrapped line
//!
//!     Best-first (Dijkstra) search over states `(token position, column)`. From each
//!     state the next token is either appended (column advances by its spacing and
//!     width) or wrapped (column restarts at the continuation indent, paying the
//!     token's break penalty). Either move pays the over-column-limit penalty for any
//!     columns past the limit. Tokens marked `Preserve` take a single forced
//!     transition that copies the original whitespace.
//!
//!     States at the same token position are pruned by dominance: a state is dropped
//!     when another state reaches the same position with column, penalty, and wrap
//!     count all no worse and at least one strictly better. Equal-cost states are
//!     kept so that equally optimal wrappings can be reported.
//!
//!     The search is deterministic: ties pop in (penalty, wrap count, insertion)
//!     order, and among equally optimal complete paths the one with fewer wraps and
//!     the lexicographically earliest wrap positions is emitted first.
//!
//!     A state budget bounds the search. On exhaustion the best complete path found
//!     so far (or a greedy completion of the cheapest frontier state) is returned
//!     with `completed_formatting = false`.

use crate::format_token::{PreFormatToken, SpacingOptions};
use crate::style::FormatStyle;
use crate::unwrapped_line::{FormattedExcerpt, FormattedToken, PreSpacing, UnwrappedLine};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;
use std::ops::Range;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};

/// The cooperative cancel flag was raised mid-search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCancelled;

impl fmt::Display for SearchCancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wrap search cancelled")
    }
}

impl std::error::Error for SearchCancelled {}

/// How one token is placed relative to its predecessor on the search path.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SpacingChoice {
    Appended(usize),
    Wrapped(usize),
    Preserved(Range<usize>),
}

/// One node of the search DAG. Paths are shared via `prev` chains.
struct StateNode {
    /// Position within the line, 0-based.
    position: usize,
    column: usize,
    penalty: i64,
    wraps: u32,
    spacing: SpacingChoice,
    prev: Option<Rc<StateNode>>,
}

/// Search the optimal wrappings of one unwrapped line.
///
/// Returns every equally optimal solution, best-ordered; the first is the one
/// to emit. `max_search_states` bounds state expansions.
pub fn search_line_wraps(
    line: &UnwrappedLine,
    ftokens: &[PreFormatToken],
    source: &str,
    style: &FormatStyle,
    max_search_states: usize,
    cancel: Option<&AtomicBool>,
) -> Result<Vec<FormattedExcerpt>, SearchCancelled> {
    let token_count = line.len();
    if token_count == 0 {
        return Ok(vec![FormattedExcerpt {
            indentation_spaces: line.indentation_spaces,
            tokens: Vec::new(),
            completed_formatting: true,
        }]);
    }

    let first = &ftokens[line.range.start];
    let initial = Rc::new(StateNode {
        position: 0,
        column: line.indentation_spaces + first.width(source),
        penalty: over_limit_penalty(line.indentation_spaces + first.width(source), style),
        wraps: 0,
        spacing: SpacingChoice::Appended(0),
        prev: None,
    });

    let mut states: Vec<Rc<StateNode>> = vec![initial.clone()];
    let mut heap: BinaryHeap<Reverse<(i64, u32, usize)>> = BinaryHeap::new();
    heap.push(Reverse((initial.penalty, 0, 0)));

    // Pareto frontiers per token position for dominance pruning.
    let mut frontiers: Vec<Vec<(usize, i64, u32)>> = vec![Vec::new(); token_count];
    frontiers[0].push((initial.column, initial.penalty, 0));

    let mut optimal: Vec<Rc<StateNode>> = Vec::new();
    let mut best_penalty: Option<i64> = None;
    let mut expansions = 0usize;
    let mut exhausted = false;
    let mut cheapest_frontier: Option<Rc<StateNode>> = None;

    while let Some(Reverse((penalty, _, state_id))) = heap.pop() {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            return Err(SearchCancelled);
        }
        let state = states[state_id].clone();
        if let Some(best) = best_penalty {
            if penalty > best {
                break;
            }
        }
        if state.position == token_count - 1 {
            best_penalty.get_or_insert(penalty);
            optimal.push(state);
            continue;
        }

        expansions += 1;
        if expansions > max_search_states {
            exhausted = true;
            cheapest_frontier = Some(state);
            break;
        }

        for successor in transitions(&state, line, ftokens, source, style) {
            let successor = Rc::new(successor);
            if dominated(&frontiers[successor.position], &successor) {
                continue;
            }
            admit(&mut frontiers[successor.position], &successor);
            let id = states.len();
            heap.push(Reverse((successor.penalty, successor.wraps, id)));
            states.push(successor);
        }
    }

    if !optimal.is_empty() {
        let mut excerpts: Vec<(Vec<usize>, u32, FormattedExcerpt)> = optimal
            .iter()
            .map(|terminal| {
                let excerpt = build_excerpt(terminal, line, ftokens, !exhausted);
                (wrap_positions(terminal), terminal.wraps, excerpt)
            })
            .collect();
        // Fewer wraps first; then earliest wrap positions.
        excerpts.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        return Ok(excerpts.into_iter().map(|(_, _, e)| e).collect());
    }

    // Budget ran out before any complete path: finish the cheapest frontier
    // state greedily, honoring hard constraints only.
    let mut state = cheapest_frontier.unwrap_or(initial);
    while state.position < token_count - 1 {
        let mut successors = transitions(&state, line, ftokens, source, style);
        state = Rc::new(successors.remove(0));
    }
    Ok(vec![build_excerpt(&state, line, ftokens, false)])
}

fn over_limit_penalty(column: usize, style: &FormatStyle) -> i64 {
    let excess = column.saturating_sub(style.column_limit);
    style.over_column_limit_penalty * excess as i64
}

/// Legal successor states, append before wrap.
fn transitions(
    state: &Rc<StateNode>,
    line: &UnwrappedLine,
    ftokens: &[PreFormatToken],
    source: &str,
    style: &FormatStyle,
) -> Vec<StateNode> {
    let next_position = state.position + 1;
    let token = &ftokens[line.range.start + next_position];
    let width = token.width(source);
    let mut out = Vec::with_capacity(2);

    match token.before.break_decision {
        SpacingOptions::Preserve => {
            let start = token
                .before
                .preserved_space_start
                .unwrap_or(token.range.start);
            let preserved = &source[start..token.range.start];
            let column = match preserved.rfind('\n') {
                Some(last) => preserved[last + 1..].chars().count() + width,
                None => state.column + preserved.chars().count() + width,
            };
            out.push(StateNode {
                position: next_position,
                column,
                penalty: state.penalty,
                wraps: state.wraps,
                spacing: SpacingChoice::Preserved(start..token.range.start),
                prev: Some(state.clone()),
            });
        }
        decision => {
            if matches!(
                decision,
                SpacingOptions::Undecided | SpacingOptions::MustAppend
            ) {
                let column = state.column + token.before.spaces_required + width;
                out.push(StateNode {
                    position: next_position,
                    column,
                    penalty: state.penalty + over_limit_penalty(column, style),
                    wraps: state.wraps,
                    spacing: SpacingChoice::Appended(token.before.spaces_required),
                    prev: Some(state.clone()),
                });
            }
            if matches!(
                decision,
                SpacingOptions::Undecided | SpacingOptions::MustWrap
            ) {
                let indent = line.indentation_spaces + style.wrap_spaces;
                let column = indent + width;
                out.push(StateNode {
                    position: next_position,
                    column,
                    penalty: state.penalty
                        + token.before.break_penalty
                        + over_limit_penalty(column, style),
                    wraps: state.wraps + 1,
                    spacing: SpacingChoice::Wrapped(indent),
                    prev: Some(state.clone()),
                });
            }
        }
    }
    out
}

/// True when an existing frontier entry is no worse in every dimension and
/// strictly better in at least one.
fn dominated(frontier: &[(usize, i64, u32)], state: &StateNode) -> bool {
    frontier.iter().any(|&(column, penalty, wraps)| {
        column <= state.column
            && penalty <= state.penalty
            && wraps <= state.wraps
            && (column < state.column || penalty < state.penalty || wraps < state.wraps)
    })
}

/// Record a state on the frontier, dropping entries it now dominates.
fn admit(frontier: &mut Vec<(usize, i64, u32)>, state: &StateNode) {
    frontier.retain(|&(column, penalty, wraps)| {
        !(state.column <= column
            && state.penalty <= penalty
            && state.wraps <= wraps
            && (state.column < column || state.penalty < penalty || state.wraps < wraps))
    });
    frontier.push((state.column, state.penalty, state.wraps));
}

fn wrap_positions(terminal: &Rc<StateNode>) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut cursor = Some(terminal);
    while let Some(state) = cursor {
        if matches!(state.spacing, SpacingChoice::Wrapped(_)) {
            positions.push(state.position);
        }
        cursor = state.prev.as_ref();
    }
    positions.reverse();
    positions
}

fn build_excerpt(
    terminal: &Rc<StateNode>,
    line: &UnwrappedLine,
    ftokens: &[PreFormatToken],
    completed: bool,
) -> FormattedExcerpt {
    let mut chain = Vec::with_capacity(line.len());
    let mut cursor = Some(terminal);
    while let Some(state) = cursor {
        chain.push(state);
        cursor = state.prev.as_ref();
    }
    chain.reverse();

    let tokens = chain
        .iter()
        .map(|state| {
            let token = &ftokens[line.range.start + state.position];
            let before = if state.position == 0 {
                PreSpacing::None
            } else {
                match &state.spacing {
                    SpacingChoice::Appended(spaces) => PreSpacing::Spaces(*spaces),
                    SpacingChoice::Wrapped(indent) => PreSpacing::NewlineIndent(*indent),
                    SpacingChoice::Preserved(range) => PreSpacing::Preserved(range.clone()),
                }
            };
            FormattedToken {
                range: token.range.clone(),
                before,
            }
        })
        .collect();

    FormattedExcerpt {
        indentation_spaces: line.indentation_spaces,
        tokens,
        completed_formatting: completed,
    }
}
