//! Construction of the canonical LR(1) automaton.

use crate::{
    grammar::{Grammar, RuleID, SymbolID},
    types::Map,
    util::display_fn,
};
use std::{
    collections::{btree_map, BTreeMap, BTreeSet},
    fmt,
};

/// Identifier of a state in the canonical collection, assigned in
/// discovery order. State numbering is part of the observable output:
/// it provides the SHIFT and GOTO operands of the generated tables.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct StateID {
    raw: u32,
}

impl StateID {
    /// The initial state, seeded from the augmenting rule.
    pub const START: Self = Self::new(0);

    #[inline]
    const fn new(raw: u32) -> Self {
        Self { raw }
    }

    #[inline]
    pub(crate) const fn from_index(index: usize) -> Self {
        Self::new(index as u32)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.raw as usize
    }
}

impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

/// A production rule with a dot marking how much of its right-hand side
/// has been recognized.
///
/// This is the LR(0) projection of an LR(1) item: the lookahead set
/// lives beside it as the payload of an [`ItemSet`] entry, keyed by this
/// type, so merging lookaheads never disturbs a lookup key.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LR1Item {
    rule: RuleID,
    dot: usize,
}

impl LR1Item {
    pub(crate) const fn new(rule: RuleID, dot: usize) -> Self {
        Self { rule, dot }
    }

    pub fn rule(&self) -> RuleID {
        self.rule
    }

    pub fn dot(&self) -> usize {
        self.dot
    }

    /// The symbol immediately after the dot, or `None` when the item is
    /// complete.
    pub fn next_symbol(&self, g: &Grammar) -> Option<SymbolID> {
        g.rule(self.rule).right().get(self.dot).copied()
    }

    /// Whether the dot has reached the end of the right-hand side, making
    /// the item ready to reduce.
    pub fn is_complete(&self, g: &Grammar) -> bool {
        self.dot == g.rule(self.rule).right().len()
    }

    // `"lhs: a • b"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            let rule = g.rule(self.rule);
            write!(f, "{}:", g.symbol_name(rule.left()))?;
            for (position, symbol) in rule.right().iter().enumerate() {
                if position == self.dot {
                    f.write_str(" •")?;
                }
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            if self.dot == rule.right().len() {
                f.write_str(" •")?;
            }
            Ok(())
        })
    }
}

/// The items of one state: lookahead sets keyed by LR(0) item.
///
/// `BTreeMap`/`BTreeSet` keep the whole structure ordered, `Eq` and
/// `Hash`, so two states are the same state exactly when their item maps
/// compare equal: set equality including lookaheads, independent of the
/// order anything was inserted in.
pub type ItemSet = BTreeMap<LR1Item, BTreeSet<SymbolID>>;

/// Close a core item set under the grammar's production rules.
///
/// Every item `A -> α • B β` with lookahead set `L` where `B` is a
/// variable contributes, for each rule `B -> γ`, the item `B -> • γ`
/// with lookahead `FIRST(β L)`. Candidates are staged per pass and
/// merged afterwards, so the map is never mutated while it is iterated.
fn close(grammar: &Grammar, items: &mut ItemSet) {
    let mut changed = true;
    while changed {
        changed = false;

        let mut staged: Map<LR1Item, BTreeSet<SymbolID>> = Map::default();
        for (item, lookaheads) in items.iter() {
            let rule = grammar.rule(item.rule());
            let (next, beta) = match &rule.right()[item.dot()..] {
                [next, beta @ ..] if grammar.is_variable(*next) => (*next, beta),
                _ => continue,
            };

            let propagated = grammar.first_of(beta, lookaheads.iter().copied());
            for (rule_id, _) in grammar.rules_for(next) {
                staged
                    .entry(LR1Item::new(rule_id, 0))
                    .or_default()
                    .extend(propagated.iter().copied());
            }
        }

        for (item, lookaheads) in staged {
            match items.entry(item) {
                btree_map::Entry::Vacant(entry) => {
                    entry.insert(lookaheads);
                    changed = true;
                }
                btree_map::Entry::Occupied(mut entry) => {
                    let existing = entry.get_mut();
                    for lookahead in lookaheads {
                        changed |= existing.insert(lookahead);
                    }
                }
            }
        }
    }
}

/// A state of the canonical collection: a core item set closed under the
/// grammar's rules, plus the outgoing transitions discovered for it.
///
/// Transitions address their targets by [`StateID`] rather than by
/// reference; the collection is a graph with back-edges and self-loops.
#[derive(Debug)]
pub struct LR1State {
    items: ItemSet,
    transitions: Map<SymbolID, StateID>,
}

impl LR1State {
    /// Close the given core items into a state. Closure is deterministic
    /// and idempotent: a state is fully determined by its core and the
    /// grammar.
    pub fn from_core(grammar: &Grammar, core: ItemSet) -> Self {
        let mut items = core;
        close(grammar, &mut items);
        Self {
            items,
            transitions: Map::default(),
        }
    }

    pub fn items(&self) -> impl Iterator<Item = (&LR1Item, &BTreeSet<SymbolID>)> + '_ {
        self.items.iter()
    }

    pub fn item_set(&self) -> &ItemSet {
        &self.items
    }

    pub fn transitions(&self) -> impl Iterator<Item = (SymbolID, StateID)> + '_ {
        self.transitions.iter().map(|(&symbol, &target)| (symbol, target))
    }

    pub fn transition(&self, symbol: SymbolID) -> Option<StateID> {
        self.transitions.get(&symbol).copied()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            for (item, lookaheads) in self.items() {
                write!(f, "- {}  [", item.display(g))?;
                for (position, lookahead) in lookaheads.iter().enumerate() {
                    if position > 0 {
                        f.write_str(" ")?;
                    }
                    f.write_str(g.symbol_name(*lookahead))?;
                }
                f.write_str("]\n")?;
            }
            Ok(())
        })
    }
}

/// The canonical collection: every distinct LR(1) state reachable from
/// the initial one, in discovery order.
#[derive(Debug)]
pub struct LR1Automaton {
    states: Vec<LR1State>,
    known: Map<ItemSet, StateID>,
}

impl LR1Automaton {
    /// Build the canonical collection for the grammar.
    ///
    /// States are discovered by a strict index walk over the growing
    /// state list, with each state's transition symbols visited in name
    /// order, so state numbering is reproducible across runs by
    /// construction.
    pub fn generate(grammar: &Grammar) -> Self {
        let span = tracing::debug_span!("generate_automaton");
        let _entered = span.enter();

        let mut builder = Builder {
            grammar,
            states: vec![],
            known: Map::default(),
        };
        builder.populate();

        tracing::debug!(states = builder.states.len(), "canonical collection complete");
        Self {
            states: builder.states,
            known: builder.known,
        }
    }

    pub fn states(&self) -> impl Iterator<Item = (StateID, &LR1State)> + '_ {
        self.states
            .iter()
            .enumerate()
            .map(|(index, state)| (StateID::new(index as u32), state))
    }

    pub fn state(&self, id: StateID) -> &LR1State {
        &self.states[id.index()]
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Locate a state by its item set. Absent states yield `None`.
    pub fn find_state(&self, items: &ItemSet) -> Option<StateID> {
        self.known.get(items).copied()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            for (index, (id, state)) in self.states().enumerate() {
                if index > 0 {
                    writeln!(f)?;
                }
                writeln!(f, "#### State {:02}", id)?;
                writeln!(f, "## items")?;
                write!(f, "{}", state.display(g))?;
                writeln!(f, "## transitions")?;
                for (symbol, target) in state.transitions() {
                    writeln!(f, "- {} => {:02}", g.symbol_name(symbol), target)?;
                }
            }
            Ok(())
        })
    }
}

struct Builder<'g> {
    grammar: &'g Grammar,
    states: Vec<LR1State>,
    // item set → state, so a rebuilt state is recognized by content
    known: Map<ItemSet, StateID>,
}

impl<'g> Builder<'g> {
    fn populate(&mut self) {
        let mut core = ItemSet::new();
        core.insert(
            LR1Item::new(RuleID::ACCEPT, 0),
            BTreeSet::from([SymbolID::EOI]),
        );
        self.add_state(LR1State::from_core(self.grammar, core));

        let mut index = 0;
        while index < self.states.len() {
            self.process(StateID::new(index as u32));
            index += 1;
        }
    }

    fn process(&mut self, id: StateID) {
        // Distinct symbols appearing after a dot, visited in name order:
        // the discovery order of successor states defines their numbering.
        let state = &self.states[id.index()];
        let mut symbols: Vec<SymbolID> = Vec::new();
        for (item, _) in state.items() {
            if let Some(next) = item.next_symbol(self.grammar) {
                if !symbols.contains(&next) {
                    symbols.push(next);
                }
            }
        }
        if symbols.is_empty() {
            tracing::debug!(state = %id, "no outgoing transitions; all items are reductions");
            return;
        }
        symbols.sort_by(|a, b| {
            self.grammar
                .symbol_name(*a)
                .cmp(self.grammar.symbol_name(*b))
        });

        for symbol in symbols {
            let core = self.advance(id, symbol);
            let next = LR1State::from_core(self.grammar, core);
            let target = match self.known.get(next.item_set()).copied() {
                Some(existing) => existing,
                None => self.add_state(next),
            };
            tracing::trace!(
                from = %id,
                over = self.grammar.symbol_name(symbol),
                to = %target,
                "transition"
            );
            self.states[id.index()].transitions.insert(symbol, target);
        }
    }

    /// The core of the successor of `id` over `symbol`: every item whose
    /// next symbol matches, dot advanced, lookahead set cloned so it is
    /// never shared with the source item.
    fn advance(&self, id: StateID, symbol: SymbolID) -> ItemSet {
        let mut core = ItemSet::new();
        for (item, lookaheads) in self.states[id.index()].items() {
            if item.next_symbol(self.grammar) == Some(symbol) {
                core.insert(
                    LR1Item::new(item.rule(), item.dot() + 1),
                    lookaheads.clone(),
                );
            }
        }
        core
    }

    fn add_state(&mut self, state: LR1State) -> StateID {
        let id = StateID::new(self.states.len() as u32);
        self.known.insert(state.item_set().clone(), id);
        self.states.push(state);
        id
    }
}
