//! Synthesis of the ACTION and GOTO tables from a finished automaton.

use crate::{
    grammar::{Grammar, RuleID, SymbolID},
    lr1::{LR1Automaton, StateID},
    types::Map,
    util::display_fn,
};
use std::fmt;

/// The operation a shift-reduce parser performs in a state on a
/// particular lookahead symbol.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    /// Consume the lookahead and transition to the given state.
    Shift(StateID),

    /// Reduce by the given production rule.
    Reduce(RuleID),

    /// The input is a complete derivation of the start symbol.
    Accept,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shift(next) => write!(f, "SHIFT({})", next),
            Self::Reduce(rule) => write!(f, "REDUCE(R{})", rule),
            Self::Accept => f.write_str("ACCEPT"),
        }
    }
}

/// Table synthesis failure: two incompatible actions were demanded for
/// the same state/lookahead slot, so the grammar is not LR(1). Nothing
/// partial is produced.
#[derive(Debug, thiserror::Error)]
pub enum ConflictError {
    #[error(
        "shift/reduce conflict in state {} on lookahead `{}': {} vs {}",
        state, lookahead, shift, reduce
    )]
    ShiftReduce {
        state: StateID,
        lookahead: String,
        shift: Action,
        reduce: Action,
    },

    #[error(
        "reduce/reduce conflict in state {} on lookahead `{}': {} vs {}",
        state, lookahead, first, second
    )]
    ReduceReduce {
        state: StateID,
        lookahead: String,
        first: Action,
        second: Action,
    },
}

/// The ACTION and GOTO tables of a canonical-LR(1) grammar, indexed by
/// state. Built once after the collection stabilizes; immutable.
#[derive(Debug)]
pub struct ParseTable {
    actions: Vec<Map<SymbolID, Action>>,
    gotos: Vec<Map<SymbolID, StateID>>,
}

impl ParseTable {
    /// Fold the canonical collection into ACTION and GOTO tables.
    ///
    /// Shifts and gotos come straight from the transition edges; reduces
    /// and the accept entry come from the complete items. The first
    /// state/lookahead slot demanded twice fails the whole build; no
    /// partial table is produced. A grammar is canonical-LR(1) exactly
    /// when this pass finishes without a collision.
    pub fn generate(grammar: &Grammar, automaton: &LR1Automaton) -> Result<Self, ConflictError> {
        let mut actions: Vec<Map<SymbolID, Action>> =
            (0..automaton.len()).map(|_| Map::default()).collect();
        let mut gotos: Vec<Map<SymbolID, StateID>> =
            (0..automaton.len()).map(|_| Map::default()).collect();

        for (id, state) in automaton.states() {
            for (symbol, target) in state.transitions() {
                if grammar.is_variable(symbol) {
                    gotos[id.index()].insert(symbol, target);
                } else {
                    actions[id.index()].insert(symbol, Action::Shift(target));
                }
            }
        }

        for (id, state) in automaton.states() {
            for (item, lookaheads) in state.items() {
                if !item.is_complete(grammar) {
                    continue;
                }
                if item.rule() == RuleID::ACCEPT {
                    record(grammar, &mut actions[id.index()], id, SymbolID::EOI, Action::Accept)?;
                    continue;
                }
                for &lookahead in lookaheads {
                    record(
                        grammar,
                        &mut actions[id.index()],
                        id,
                        lookahead,
                        Action::Reduce(item.rule()),
                    )?;
                }
            }
        }

        tracing::debug!(states = automaton.len(), "parse table complete");
        Ok(Self { actions, gotos })
    }

    /// The action of `state` on a terminal or `$` lookahead, if any.
    pub fn action(&self, state: StateID, lookahead: SymbolID) -> Option<Action> {
        self.actions[state.index()].get(&lookahead).copied()
    }

    /// The goto target of `state` over a variable, if any.
    pub fn goto(&self, state: StateID, variable: SymbolID) -> Option<StateID> {
        self.gotos[state.index()].get(&variable).copied()
    }

    pub fn actions(&self) -> impl Iterator<Item = (StateID, &Map<SymbolID, Action>)> + '_ {
        self.actions
            .iter()
            .enumerate()
            .map(|(index, row)| (StateID::from_index(index), row))
    }

    pub fn gotos(&self) -> impl Iterator<Item = (StateID, &Map<SymbolID, StateID>)> + '_ {
        self.gotos
            .iter()
            .enumerate()
            .map(|(index, row)| (StateID::from_index(index), row))
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            for (index, (id, row)) in self.actions().enumerate() {
                if index > 0 {
                    writeln!(f)?;
                }
                writeln!(f, "#### State {:02}", id)?;
                writeln!(f, "## actions")?;
                for (lookahead, action) in row {
                    writeln!(f, "- {} => {}", g.symbol_name(*lookahead), action)?;
                }
                writeln!(f, "## gotos")?;
                for (variable, target) in &self.gotos[id.index()] {
                    writeln!(f, "- {} => goto({:02})", g.symbol_name(*variable), target)?;
                }
            }
            Ok(())
        })
    }
}

fn record(
    grammar: &Grammar,
    row: &mut Map<SymbolID, Action>,
    state: StateID,
    lookahead: SymbolID,
    action: Action,
) -> Result<(), ConflictError> {
    if let Some(&existing) = row.get(&lookahead) {
        let lookahead = grammar.symbol_name(lookahead).to_owned();
        return Err(match existing {
            Action::Shift(_) => ConflictError::ShiftReduce {
                state,
                lookahead,
                shift: existing,
                reduce: action,
            },
            _ => ConflictError::ReduceReduce {
                state,
                lookahead,
                first: existing,
                second: action,
            },
        });
    }
    row.insert(lookahead, action);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Rule;

    fn pipeline(source: &str) -> (Grammar, LR1Automaton, Result<ParseTable, ConflictError>) {
        let grammar = Grammar::from_str(source).unwrap();
        let automaton = LR1Automaton::generate(&grammar);
        let table = ParseTable::generate(&grammar, &automaton);
        (grammar, automaton, table)
    }

    #[test]
    fn action_display() {
        let (grammar, _, table) = pipeline("S: A;\nA: a;");
        let table = table.unwrap();

        let a_term = grammar.symbol("a").unwrap();
        let shift = table.action(StateID::START, a_term).unwrap();
        assert_eq!(shift.to_string(), "SHIFT(3)");

        let reduce = table.action(StateID::from_index(1), SymbolID::EOI).unwrap();
        assert_eq!(reduce.to_string(), "REDUCE(R1)");

        assert_eq!(Action::Accept.to_string(), "ACCEPT");
    }

    #[test]
    fn simple_grammar_tables() {
        // Rules: 0: S' -> S, 1: S -> A, 2: A -> a. From state 0 the
        // successors are discovered in name order (A, S, a), pinning the
        // numbering: 1 = {S: A •}, 2 = {S': S •}, 3 = {A: a •}.
        let (grammar, automaton, table) = pipeline("S: A;\nA: a;");
        let table = table.unwrap();
        assert_eq!(automaton.len(), 4);

        let s = grammar.symbol("S").unwrap();
        let a_var = grammar.symbol("A").unwrap();
        let a_term = grammar.symbol("a").unwrap();
        let s1 = StateID::from_index(1);
        let s2 = StateID::from_index(2);
        let s3 = StateID::from_index(3);

        assert_eq!(table.action(StateID::START, a_term), Some(Action::Shift(s3)));
        assert_eq!(table.goto(StateID::START, a_var), Some(s1));
        assert_eq!(table.goto(StateID::START, s), Some(s2));

        let rule_s_a = grammar.find_rule_index(&Rule::new(s, [a_var])).unwrap();
        let rule_a_a = grammar.find_rule_index(&Rule::new(a_var, [a_term])).unwrap();
        assert_eq!(table.action(s1, SymbolID::EOI), Some(Action::Reduce(rule_s_a)));
        assert_eq!(table.action(s2, SymbolID::EOI), Some(Action::Accept));
        assert_eq!(table.action(s3, SymbolID::EOI), Some(Action::Reduce(rule_a_a)));

        // No other entries exist in those rows.
        assert_eq!(table.action(StateID::START, SymbolID::EOI), None);
        assert_eq!(table.goto(s1, a_var), None);
    }

    #[test]
    fn accept_is_unique_and_under_eoi() {
        let (_, _, table) = pipeline(
            "\
S: document*;
document: BOM? HEADER value+ TRAILER;
value: map;
map: ID COLON STRING NL;
",
        );
        let table = table.unwrap();

        let mut accepts = vec![];
        for (state, row) in table.actions() {
            for (lookahead, action) in row {
                if *action == Action::Accept {
                    accepts.push((state, *lookahead));
                }
            }
        }
        assert_eq!(accepts.len(), 1);
        assert_eq!(accepts[0].1, SymbolID::EOI);
    }

    #[test]
    fn ambiguous_grammar_is_rejected() {
        let (_, _, table) = pipeline("A: a A a;\nA: epsilon;");
        let err = table.unwrap_err();
        assert!(
            matches!(&err, ConflictError::ShiftReduce { lookahead, .. } if lookahead == "a"),
            "unexpected conflict: {}",
            err
        );
    }

    #[test]
    fn reference_grammar_is_lr1() {
        let (_, automaton, table) = pipeline(
            "\
S: document*;
document: BOM? HEADER value+ TRAILER;
value: map;
map: ID COLON STRING NL;
",
        );
        assert!(table.is_ok());
        assert_eq!(automaton.len(), 17);
    }
}
