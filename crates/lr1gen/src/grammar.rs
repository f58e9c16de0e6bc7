//! Grammar definition and analysis.
//!
//! A grammar is a sequence of semicolon-terminated rule declarations
//! compatible with a subset of the ANTLR4 format:
//!
//! ```text
//! comment_line: HASH SPACE STRING nl;
//! nl: CR | LF;
//! ```
//!
//! Alternatives are separated by `|`; a term may carry one of the
//! modifiers `*` (zero or more), `+` (one or more) or `?` (zero or one),
//! which are expanded into auxiliary productions before any analysis
//! runs. Classification is purely positional: a symbol defined by some
//! rule's left-hand side is a variable, everything else is a terminal.
//!
//! Construction parses the rule text, expands modifiers, classifies the
//! symbols and computes the nullable set and the FIRST/FOLLOW sets. The
//! resulting [`Grammar`] is immutable; nothing is recomputed later.

use crate::{
    types::{Map, Set},
    util::display_fn,
};
use std::{fmt, fs, io, path::Path};

/// The empty-production marker in rule text. It is never interned as a
/// symbol: an `epsilon` alternative becomes a rule with an empty
/// right-hand side.
pub const EPSILON: &str = "epsilon";

const REPEAT_SUFFIX: &str = "_repeat";
const REPEAT1_SUFFIX: &str = "_repeat1";
const OPT_SUFFIX: &str = "_opt";

/// Handle of an interned grammar symbol.
///
/// Handles issued by the same [`Grammar`] compare equal exactly when the
/// underlying symbol names are equal, so handle equality is value
/// equality on names.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct SymbolID {
    raw: u32,
}

impl SymbolID {
    /// Reserved symbol meaning the end of input, displayed as `$`. Never
    /// part of the grammar text.
    pub const EOI: Self = Self::new(0);

    #[inline]
    const fn new(raw: u32) -> Self {
        Self { raw }
    }

    #[inline]
    const fn index(self) -> usize {
        self.raw as usize
    }
}

/// Identifier of a production rule: its position in the grammar's rule
/// list. Stable across the grammar's lifetime and used as the REDUCE
/// operand in the generated tables.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct RuleID {
    raw: u16,
}

impl RuleID {
    /// The synthesized augmenting rule `S' -> start`, always at index 0.
    pub const ACCEPT: Self = Self::new(0);

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.raw as usize
    }
}

impl fmt::Display for RuleID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

/// A production rule: one left-hand variable and an ordered sequence of
/// right-hand symbols. An empty right-hand side is the empty production.
/// Rules are immutable and compare element-wise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    left: SymbolID,
    right: Vec<SymbolID>,
}

impl Rule {
    pub fn new<I>(left: SymbolID, right: I) -> Self
    where
        I: IntoIterator<Item = SymbolID>,
    {
        Self {
            left,
            right: right.into_iter().collect(),
        }
    }

    /// The left-hand side of this production.
    pub fn left(&self) -> SymbolID {
        self.left
    }

    /// The right-hand side of this production.
    pub fn right(&self) -> &[SymbolID] {
        &self.right[..]
    }

    // `"lhs: r1 r2;"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            write!(f, "{}:", g.symbol_name(self.left))?;
            for symbol in &self.right {
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            f.write_str(";")
        })
    }
}

/// A rule as written in the grammar file, before modifier expansion:
/// modifier suffixes and `epsilon` appear verbatim. Kept for diagnostics
/// only; no analysis consumes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedRule {
    left: String,
    right: Vec<String>,
}

impl ExtendedRule {
    pub fn left(&self) -> &str {
        &self.left
    }

    pub fn right(&self) -> &[String] {
        &self.right[..]
    }
}

impl fmt::Display for ExtendedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.left)?;
        for term in &self.right {
            write!(f, " {}", term)?;
        }
        f.write_str(";")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error("IO error: {}", _0)]
    Io(io::Error),

    #[error("missing semicolon: leftover rule text at end of grammar")]
    UnterminatedRule,

    #[error("malformed rule declaration: `{}'", text)]
    MalformedRule { text: String },

    #[error("the grammar contains no rule declarations")]
    EmptyGrammar,
}

/// The grammar definition used to derive the parser tables.
///
/// Owns the symbol interner, the expanded rule list, the pre-expansion
/// rule list, the symbol classification and every derived set. All of it
/// is computed once by [`Grammar::from_str`] and read-only afterwards.
#[derive(Debug)]
pub struct Grammar {
    symbols: Set<String>,
    rules: Vec<Rule>,
    extended_rules: Vec<ExtendedRule>,
    terminals: Set<SymbolID>,
    variables: Set<SymbolID>,
    repeats: Map<SymbolID, SymbolID>,
    repeat1s: Map<SymbolID, SymbolID>,
    optionals: Map<SymbolID, SymbolID>,
    start_symbol: SymbolID,
    accept_symbol: SymbolID,
    nullables: Set<SymbolID>,
    first_sets: Map<SymbolID, Set<SymbolID>>,
    follow_sets: Map<SymbolID, Set<SymbolID>>,
}

impl Grammar {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GrammarError> {
        let source = fs::read_to_string(path).map_err(GrammarError::Io)?;
        Self::from_str(&source)
    }

    pub fn from_str(source: &str) -> Result<Self, GrammarError> {
        let mut builder = GrammarBuilder::new();
        builder.parse(source)?;
        let grammar = builder.finish()?;
        tracing::debug!(
            rules = grammar.rules.len(),
            terminals = grammar.terminals.len(),
            variables = grammar.variables.len(),
            "grammar analysis complete"
        );
        Ok(grammar)
    }

    /// The name of an interned symbol.
    pub fn symbol_name(&self, id: SymbolID) -> &str {
        self.symbols
            .get_index(id.index())
            .expect("symbol handle out of range")
    }

    /// Look up a symbol handle by name.
    pub fn symbol(&self, name: &str) -> Option<SymbolID> {
        self.symbols
            .get_index_of(name)
            .map(|index| SymbolID::new(index as u32))
    }

    /// All rules in index order, the augmenting rule first.
    pub fn rules(&self) -> impl Iterator<Item = (RuleID, &Rule)> + '_ {
        self.rules
            .iter()
            .enumerate()
            .map(|(index, rule)| (RuleID::new(index as u16), rule))
    }

    pub fn rule(&self, id: RuleID) -> &Rule {
        &self.rules[id.index()]
    }

    /// The rules whose left-hand side is `left`.
    pub fn rules_for(&self, left: SymbolID) -> impl Iterator<Item = (RuleID, &Rule)> + '_ {
        self.rules().filter(move |(_, rule)| rule.left() == left)
    }

    /// Locate a rule by value. Absent rules yield `None`, not an error.
    pub fn find_rule_index(&self, rule: &Rule) -> Option<RuleID> {
        self.rules()
            .find(|(_, candidate)| *candidate == rule)
            .map(|(id, _)| id)
    }

    /// The rules as written in the grammar file, before modifier
    /// expansion.
    pub fn extended_rules(&self) -> &[ExtendedRule] {
        &self.extended_rules[..]
    }

    /// The left-hand side of the first declared rule.
    pub fn start_symbol(&self) -> SymbolID {
        self.start_symbol
    }

    /// The synthetic `S'` introduced by the augmenting rule.
    pub fn accept_symbol(&self) -> SymbolID {
        self.accept_symbol
    }

    pub fn terminals(&self) -> impl Iterator<Item = SymbolID> + '_ {
        self.terminals.iter().copied()
    }

    pub fn variables(&self) -> impl Iterator<Item = SymbolID> + '_ {
        self.variables.iter().copied()
    }

    pub fn is_terminal(&self, id: SymbolID) -> bool {
        self.terminals.contains(&id)
    }

    pub fn is_variable(&self, id: SymbolID) -> bool {
        self.variables.contains(&id)
    }

    /// Base symbols that carried a `*` modifier somewhere in the grammar.
    pub fn repeats(&self) -> impl Iterator<Item = SymbolID> + '_ {
        self.repeats.keys().copied()
    }

    /// Base symbols that carried a `+` modifier.
    pub fn repeat1s(&self) -> impl Iterator<Item = SymbolID> + '_ {
        self.repeat1s.keys().copied()
    }

    /// Base symbols that carried a `?` modifier.
    pub fn optionals(&self) -> impl Iterator<Item = SymbolID> + '_ {
        self.optionals.keys().copied()
    }

    /// Whether the symbol can derive the empty string. Terminals never
    /// can.
    pub fn is_nullable(&self, id: SymbolID) -> bool {
        self.nullables.contains(&id)
    }

    pub fn nullables(&self) -> impl Iterator<Item = SymbolID> + '_ {
        self.nullables.iter().copied()
    }

    /// The FIRST set of a variable: every terminal that can begin one of
    /// its derivations. Nullability is tracked by [`Grammar::is_nullable`]
    /// instead of an epsilon member.
    pub fn first(&self, variable: SymbolID) -> &Set<SymbolID> {
        &self.first_sets[&variable]
    }

    pub fn first_sets(&self) -> &Map<SymbolID, Set<SymbolID>> {
        &self.first_sets
    }

    /// The FOLLOW set of a variable: every terminal (or `$`) that can
    /// appear immediately after it in a derivation from `S'`.
    pub fn follow(&self, variable: SymbolID) -> &Set<SymbolID> {
        &self.follow_sets[&variable]
    }

    pub fn follow_sets(&self) -> &Map<SymbolID, Set<SymbolID>> {
        &self.follow_sets
    }

    /// `FIRST(prefix · lookaheads)`: walk the prefix left to right,
    /// unioning each symbol's FIRST set and stopping at the first
    /// non-nullable symbol; when the whole prefix can vanish, the
    /// `lookaheads` take its place.
    pub fn first_of<I>(&self, prefix: &[SymbolID], lookaheads: I) -> Set<SymbolID>
    where
        I: IntoIterator<Item = SymbolID>,
    {
        sequence_first(
            prefix,
            lookaheads,
            &self.variables,
            &self.nullables,
            &self.first_sets,
        )
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## extended rules:")?;
        for rule in &self.extended_rules {
            writeln!(f, "{}", rule)?;
        }

        writeln!(f, "\n## rules:")?;
        for (id, rule) in self.rules() {
            writeln!(f, "{}: {}", id, rule.display(self))?;
        }

        writeln!(f, "\n## start symbol:\n{}", self.symbol_name(self.start_symbol))?;

        writeln!(f, "\n## variables:")?;
        for variable in self.variables() {
            writeln!(f, "{}", self.symbol_name(variable))?;
        }

        writeln!(f, "\n## terminals:")?;
        for terminal in self.terminals() {
            writeln!(f, "{}", self.symbol_name(terminal))?;
        }

        writeln!(f, "\n## nullables:")?;
        for nullable in self.nullables() {
            writeln!(f, "{}", self.symbol_name(nullable))?;
        }

        let dump_sets = |f: &mut fmt::Formatter<'_>,
                         sets: &Map<SymbolID, Set<SymbolID>>|
         -> fmt::Result {
            for (variable, set) in sets {
                write!(f, "{}:", self.symbol_name(*variable))?;
                for symbol in set {
                    write!(f, " {}", self.symbol_name(*symbol))?;
                }
                writeln!(f)?;
            }
            Ok(())
        };

        writeln!(f, "\n## first sets:")?;
        dump_sets(&mut *f, &self.first_sets)?;

        writeln!(f, "\n## follow sets:")?;
        dump_sets(&mut *f, &self.follow_sets)?;

        Ok(())
    }
}

/// Accumulates rule text into a [`Grammar`]. Finalization freezes the
/// classification and computes the derived sets; nothing mutates the
/// grammar afterwards.
#[derive(Debug)]
struct GrammarBuilder {
    symbols: Set<String>,
    rules: Vec<Rule>,
    extended_rules: Vec<ExtendedRule>,
    terminals: Set<SymbolID>,
    variables: Set<SymbolID>,
    repeats: Map<SymbolID, SymbolID>,
    repeat1s: Map<SymbolID, SymbolID>,
    optionals: Map<SymbolID, SymbolID>,
    start: Option<SymbolID>,
    accept: Option<SymbolID>,
}

/// Line prefixes of ANTLR4 constructs that carry no rule text. A line
/// starting with `@` additionally opens a block that a line starting
/// with `}` closes. This is a lexical skip, not a parser.
const SKIP_PREFIXES: &[&str] = &["/", "@", "}", "parser ", "options ", "tokens "];

impl GrammarBuilder {
    fn new() -> Self {
        let mut symbols = Set::default();
        symbols.insert("$".to_owned());

        Self {
            symbols,
            rules: vec![],
            extended_rules: vec![],
            terminals: Set::default(),
            variables: Set::default(),
            repeats: Map::default(),
            repeat1s: Map::default(),
            optionals: Map::default(),
            start: None,
            accept: None,
        }
    }

    fn intern(&mut self, name: &str) -> SymbolID {
        match self.symbols.get_index_of(name) {
            Some(index) => SymbolID::new(index as u32),
            None => {
                let (index, _) = self.symbols.insert_full(name.to_owned());
                SymbolID::new(index as u32)
            }
        }
    }

    fn parse(&mut self, source: &str) -> Result<(), GrammarError> {
        let mut pending = String::new();
        let mut in_block = false;

        for line in source.lines() {
            let skip = SKIP_PREFIXES.iter().any(|prefix| line.starts_with(prefix));
            if line.starts_with('@') {
                in_block = true;
            }
            if line.starts_with('}') {
                in_block = false;
            }
            if in_block || skip {
                continue;
            }

            pending.push_str(line);
            if line.trim_end().ends_with(';') {
                self.declaration(pending.trim())?;
                pending.clear();
            }
        }

        if !pending.trim().is_empty() {
            return Err(GrammarError::UnterminatedRule);
        }

        Ok(())
    }

    fn declaration(&mut self, text: &str) -> Result<(), GrammarError> {
        let malformed = || GrammarError::MalformedRule {
            text: text.to_owned(),
        };

        let body = text.strip_suffix(';').ok_or_else(malformed)?;
        let (left, alternatives) = body.split_once(':').ok_or_else(malformed)?;
        let left = left.trim();
        if left.is_empty() {
            return Err(malformed());
        }

        let is_first = self.rules.is_empty();
        let left_id = self.intern(left);
        self.variables.insert(left_id);

        if is_first {
            // The first declared left-hand side is the start symbol; the
            // augmenting rule takes index 0 before any declared rule.
            self.start.replace(left_id);
            let accept = self.intern("S'");
            self.variables.insert(accept);
            self.accept.replace(accept);
            self.rules.push(Rule::new(accept, [left_id]));
        }

        for choice in alternatives.split('|') {
            let terms: Vec<&str> = choice.split_whitespace().collect();
            self.extended_rules.push(ExtendedRule {
                left: left.to_owned(),
                right: terms.iter().map(|term| (*term).to_owned()).collect(),
            });

            let mut right = Vec::with_capacity(terms.len());
            for term in terms {
                if term == EPSILON {
                    continue;
                }
                let id = if let Some(base) = term.strip_suffix('*') {
                    let (base_id, aux_id) = self.modifier(base, REPEAT_SUFFIX);
                    self.repeats.insert(base_id, aux_id);
                    aux_id
                } else if let Some(base) = term.strip_suffix('+') {
                    let (base_id, aux_id) = self.modifier(base, REPEAT1_SUFFIX);
                    self.repeat1s.insert(base_id, aux_id);
                    aux_id
                } else if let Some(base) = term.strip_suffix('?') {
                    let (base_id, aux_id) = self.modifier(base, OPT_SUFFIX);
                    self.optionals.insert(base_id, aux_id);
                    aux_id
                } else {
                    let id = self.intern(term);
                    self.terminals.insert(id);
                    id
                };
                right.push(id);
            }
            self.rules.push(Rule::new(left_id, right));
        }

        Ok(())
    }

    /// Strip a modifier suffix from a term: the base symbol and the
    /// auxiliary symbol replacing the rule slot are both interned and
    /// provisionally terminals; variable status wins at finalization.
    fn modifier(&mut self, base: &str, suffix: &str) -> (SymbolID, SymbolID) {
        let base_id = self.intern(base);
        self.terminals.insert(base_id);
        let aux_id = self.intern(&format!("{}{}", base, suffix));
        self.terminals.insert(aux_id);
        (base_id, aux_id)
    }

    /// Append the auxiliary productions for every distinct modified base:
    /// `X_repeat -> | X X_repeat`, `X_repeat1 -> X | X X_repeat1`,
    /// `X_opt -> | X`.
    fn modifier_rules(&mut self) {
        let repeats: Vec<(SymbolID, SymbolID)> = self.repeats.iter().map(|(&b, &a)| (b, a)).collect();
        for (base, aux) in repeats {
            self.rules.push(Rule::new(aux, []));
            self.rules.push(Rule::new(aux, [base, aux]));
            self.variables.insert(aux);
        }

        let repeat1s: Vec<(SymbolID, SymbolID)> =
            self.repeat1s.iter().map(|(&b, &a)| (b, a)).collect();
        for (base, aux) in repeat1s {
            self.rules.push(Rule::new(aux, [base]));
            self.rules.push(Rule::new(aux, [base, aux]));
            self.variables.insert(aux);
        }

        let optionals: Vec<(SymbolID, SymbolID)> =
            self.optionals.iter().map(|(&b, &a)| (b, a)).collect();
        for (base, aux) in optionals {
            self.rules.push(Rule::new(aux, []));
            self.rules.push(Rule::new(aux, [base]));
            self.variables.insert(aux);
        }
    }

    fn finish(mut self) -> Result<Grammar, GrammarError> {
        if self.rules.is_empty() {
            return Err(GrammarError::EmptyGrammar);
        }

        self.modifier_rules();

        // A symbol that is both was provisionally classified while
        // scanning right-hand sides; being defined by a rule wins.
        for variable in &self.variables {
            self.terminals.shift_remove(variable);
        }

        let start_symbol = self.start.expect("start symbol is set with the first rule");
        let accept_symbol = self.accept.expect("accept symbol is set with the first rule");

        let nullables = nullables_set(&self.rules);
        let first_sets = first_sets(&self.rules, &self.variables, &nullables);
        let follow_sets = follow_sets(
            &self.rules,
            accept_symbol,
            &self.variables,
            &nullables,
            &first_sets,
        );

        Ok(Grammar {
            symbols: self.symbols,
            rules: self.rules,
            extended_rules: self.extended_rules,
            terminals: self.terminals,
            variables: self.variables,
            repeats: self.repeats,
            repeat1s: self.repeat1s,
            optionals: self.optionals,
            start_symbol,
            accept_symbol,
            nullables,
            first_sets,
            follow_sets,
        })
    }
}

/// The set of variables that can derive the empty string: fixed point of
/// "some rule's right-hand side is entirely nullable" (an empty one
/// trivially is).
fn nullables_set(rules: &[Rule]) -> Set<SymbolID> {
    let mut nullables = Set::default();

    let mut changed = true;
    while changed {
        changed = false;
        for rule in rules {
            if nullables.contains(&rule.left()) {
                continue;
            }
            if rule.right().iter().all(|symbol| nullables.contains(symbol)) {
                nullables.insert(rule.left());
                changed = true;
            }
        }
    }

    nullables
}

/// `FIRST(prefix · lookaheads)` over the given analysis state. Terminals
/// contribute themselves; variables contribute their current FIRST set;
/// the walk stops at the first non-nullable symbol. Falling off the end
/// unions in the lookaheads.
fn sequence_first<I>(
    prefix: &[SymbolID],
    lookaheads: I,
    variables: &Set<SymbolID>,
    nullables: &Set<SymbolID>,
    first_sets: &Map<SymbolID, Set<SymbolID>>,
) -> Set<SymbolID>
where
    I: IntoIterator<Item = SymbolID>,
{
    let mut result = Set::default();

    for &symbol in prefix {
        if variables.contains(&symbol) {
            result.extend(first_sets[&symbol].iter().copied());
        } else {
            result.insert(symbol);
        }
        if !nullables.contains(&symbol) {
            return result;
        }
    }

    result.extend(lookaheads);
    result
}

/// FIRST sets of every variable (the synthetic `S'` included, via the
/// augmenting rule). The sets start empty and only ever grow over a
/// finite symbol universe, so the passes reach a fixed point.
fn first_sets(
    rules: &[Rule],
    variables: &Set<SymbolID>,
    nullables: &Set<SymbolID>,
) -> Map<SymbolID, Set<SymbolID>> {
    let mut first_sets: Map<SymbolID, Set<SymbolID>> = variables
        .iter()
        .map(|&variable| (variable, Set::default()))
        .collect();

    let mut changed = true;
    while changed {
        changed = false;
        for rule in rules {
            let addition = sequence_first(
                rule.right(),
                std::iter::empty(),
                variables,
                nullables,
                &first_sets,
            );
            let set = &mut first_sets[&rule.left()];
            for symbol in addition {
                changed |= set.insert(symbol);
            }
        }
    }

    first_sets
}

/// FOLLOW sets of every variable. `follow(S') = {$}`; every occurrence
/// `A -> ... B tail` contributes `FIRST(tail)` to `follow(B)`, plus
/// `follow(A)` when the tail is empty or can vanish. Same fixed-point
/// argument as for FIRST.
fn follow_sets(
    rules: &[Rule],
    accept_symbol: SymbolID,
    variables: &Set<SymbolID>,
    nullables: &Set<SymbolID>,
    first_sets: &Map<SymbolID, Set<SymbolID>>,
) -> Map<SymbolID, Set<SymbolID>> {
    let mut follow_sets: Map<SymbolID, Set<SymbolID>> = variables
        .iter()
        .map(|&variable| (variable, Set::default()))
        .collect();
    follow_sets[&accept_symbol].insert(SymbolID::EOI);

    let mut changed = true;
    while changed {
        changed = false;
        for rule in rules {
            for (position, &symbol) in rule.right().iter().enumerate() {
                if !variables.contains(&symbol) {
                    continue;
                }
                let addition = sequence_first(
                    &rule.right()[position + 1..],
                    follow_sets[&rule.left()].iter().copied(),
                    variables,
                    nullables,
                    first_sets,
                );
                let set = &mut follow_sets[&symbol];
                for follower in addition {
                    changed |= set.insert(follower);
                }
            }
        }
    }

    follow_sets
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCE: &str = "\
S: document*;
document: BOM? HEADER value+ TRAILER;
value: map;
map: ID COLON STRING NL;
";

    fn symbol(grammar: &Grammar, name: &str) -> SymbolID {
        grammar
            .symbol(name)
            .unwrap_or_else(|| panic!("symbol `{}' not interned", name))
    }

    fn names(grammar: &Grammar, set: &Set<SymbolID>) -> Vec<String> {
        let mut names: Vec<String> = set
            .iter()
            .map(|&id| grammar.symbol_name(id).to_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn reference_first_sets() {
        let grammar = Grammar::from_str(REFERENCE).unwrap();

        let document = symbol(&grammar, "document");
        assert!(grammar.first(document).contains(&symbol(&grammar, "HEADER")));
        assert_eq!(names(&grammar, grammar.first(document)), ["BOM", "HEADER"]);
        assert!(!grammar.is_nullable(document));

        // S: document* is entirely optional, so S is nullable and its
        // FIRST set is that of document.
        let s = symbol(&grammar, "S");
        assert!(grammar.is_nullable(s));
        assert_eq!(names(&grammar, grammar.first(s)), ["BOM", "HEADER"]);
        assert_eq!(
            grammar.first(grammar.accept_symbol()),
            grammar.first(grammar.start_symbol())
        );
    }

    #[test]
    fn reference_follow_sets() {
        let grammar = Grammar::from_str(REFERENCE).unwrap();

        assert_eq!(
            names(&grammar, grammar.follow(grammar.accept_symbol())),
            ["$"]
        );
        assert_eq!(
            names(&grammar, grammar.follow(symbol(&grammar, "value"))),
            ["ID", "TRAILER"]
        );
        assert_eq!(
            names(&grammar, grammar.follow(symbol(&grammar, "value_repeat1"))),
            ["TRAILER"]
        );
    }

    #[test]
    fn rule_indexing() {
        let grammar = Grammar::from_str("S: HEADER FOO;").unwrap();
        let s = symbol(&grammar, "S");
        let header = symbol(&grammar, "HEADER");
        let foo = symbol(&grammar, "FOO");

        let declared = Rule::new(s, [header, foo]);
        assert_eq!(
            grammar.find_rule_index(&declared).map(RuleID::index),
            Some(1)
        );

        // Index 0 is always the augmenting rule.
        let augmenting = Rule::new(grammar.accept_symbol(), [s]);
        assert_eq!(grammar.find_rule_index(&augmenting), Some(RuleID::ACCEPT));

        // A rule that was never declared is absent, not an error.
        let undeclared = Rule::new(s, [foo]);
        assert_eq!(grammar.find_rule_index(&undeclared), None);
    }

    #[test]
    fn unterminated_rule_is_rejected() {
        let err = Grammar::from_str("S: HEADER").unwrap_err();
        assert!(matches!(err, GrammarError::UnterminatedRule));
    }

    #[test]
    fn declaration_without_colon_is_rejected() {
        let err = Grammar::from_str("S HEADER;").unwrap_err();
        assert!(matches!(err, GrammarError::MalformedRule { .. }));
    }

    #[test]
    fn empty_grammar_is_rejected() {
        let err = Grammar::from_str("").unwrap_err();
        assert!(matches!(err, GrammarError::EmptyGrammar));
    }

    #[test]
    fn epsilon_becomes_the_empty_production() {
        let grammar = Grammar::from_str("S: epsilon;").unwrap();

        let s = symbol(&grammar, "S");
        assert_eq!(grammar.rule(RuleID::new(1)), &Rule::new(s, []));
        assert!(grammar.is_nullable(s));

        // `epsilon` is a marker, not a symbol: it is neither interned nor
        // a terminal.
        assert_eq!(grammar.symbol(EPSILON), None);
        assert_eq!(grammar.terminals().count(), 0);
    }

    #[test]
    fn modifier_expansion() {
        let grammar = Grammar::from_str(REFERENCE).unwrap();

        let document = symbol(&grammar, "document");
        let document_repeat = symbol(&grammar, "document_repeat");
        let value = symbol(&grammar, "value");
        let value_repeat1 = symbol(&grammar, "value_repeat1");
        let bom = symbol(&grammar, "BOM");
        let bom_opt = symbol(&grammar, "BOM_opt");

        for rule in [
            Rule::new(document_repeat, []),
            Rule::new(document_repeat, [document, document_repeat]),
            Rule::new(value_repeat1, [value]),
            Rule::new(value_repeat1, [value, value_repeat1]),
            Rule::new(bom_opt, []),
            Rule::new(bom_opt, [bom]),
        ] {
            assert!(
                grammar.find_rule_index(&rule).is_some(),
                "missing auxiliary rule {}",
                rule.display(&grammar)
            );
        }

        // The auxiliary symbols are variables even though BOM itself is a
        // terminal.
        assert!(grammar.is_variable(document_repeat));
        assert!(grammar.is_variable(value_repeat1));
        assert!(grammar.is_variable(bom_opt));
        assert!(grammar.is_terminal(bom));
        assert!(!grammar.is_terminal(bom_opt));

        assert_eq!(grammar.repeats().collect::<Vec<_>>(), [document]);
        assert_eq!(grammar.repeat1s().collect::<Vec<_>>(), [value]);
        assert_eq!(grammar.optionals().collect::<Vec<_>>(), [bom]);
    }

    #[test]
    fn boilerplate_lines_are_skipped() {
        let with_boilerplate = format!(
            "\
/* A documented grammar. */
parser grammar mfield;
options {{ language = Java; }}
@members {{
    int docCount = 0;
}}
{}",
            REFERENCE
        );
        let grammar = Grammar::from_str(&with_boilerplate).unwrap();
        let plain = Grammar::from_str(REFERENCE).unwrap();

        assert_eq!(grammar.rules().count(), plain.rules().count());
        assert_eq!(
            grammar.symbol_name(grammar.start_symbol()),
            plain.symbol_name(plain.start_symbol())
        );
    }

    #[test]
    fn undefined_reference_stays_terminal() {
        // `nl` is referenced but never defined; it silently classifies as
        // a terminal.
        let grammar = Grammar::from_str("line: HASH STRING nl;").unwrap();
        assert!(grammar.is_terminal(symbol(&grammar, "nl")));
        assert!(!grammar.is_variable(symbol(&grammar, "nl")));
    }

    #[test]
    fn extended_rules_keep_the_surface_form() {
        let grammar = Grammar::from_str(REFERENCE).unwrap();
        let document = &grammar.extended_rules()[1];
        assert_eq!(document.left(), "document");
        assert_eq!(document.right(), ["BOM?", "HEADER", "value+", "TRAILER"]);
    }

    #[test]
    fn duplicate_rules_keep_their_indices() {
        let grammar = Grammar::from_str("S: A;\nS: A;\nA: x;").unwrap();
        let s = symbol(&grammar, "S");
        let a = symbol(&grammar, "A");

        assert_eq!(grammar.rules().count(), 4);
        // find_rule_index reports the first of the duplicates.
        assert_eq!(
            grammar.find_rule_index(&Rule::new(s, [a])).map(RuleID::index),
            Some(1)
        );
    }
}
