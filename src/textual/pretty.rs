//! Rendering terms, literals, clauses and result bags back into the surface
//! syntax. Printed output parses back in: constants whose interned text
//! starts with an uppercase letter are quoted, and freshened variables are
//! given synthetic `V<n>` names.

use crate::database::{CommandKind, Database, QueryResult};
use crate::term::{Clause, Literal, Term};

impl Database {
    /// Render a term using the interned names.
    pub fn term_string(&self, term: Term) -> String {
        let symbols = self.symbols.read().expect("lock poisoned");
        match term {
            Term::Constant(id) => match symbols.lookup(id) {
                Some(name) => {
                    let upper = name
                        .chars()
                        .next()
                        .map_or(false, |c| c.is_ascii_uppercase());
                    if upper {
                        format!("'{}'", name)
                    } else {
                        name.to_owned()
                    }
                }
                // Ground-set handles and other nameless ids.
                None => format!("Unknown:{}", id),
            },
            Term::Variable(id) => match symbols.lookup(id) {
                Some(name) => name.to_owned(),
                None => format!("V{}", id.unsigned_abs()),
            },
        }
    }

    /// Render a literal, including its negation marker.
    pub fn literal_string(&self, literal: &Literal) -> String {
        let mut out = String::new();
        self.write_literal(&mut out, literal);
        out
    }

    fn write_literal(&self, out: &mut String, literal: &Literal) {
        if literal.negated {
            out.push('!');
        }
        out.push_str(&literal.predicate);
        if let Some((first, rest)) = literal.terms.split_first() {
            out.push('(');
            out.push_str(&self.term_string(*first));
            for &t in rest {
                out.push_str(", ");
                out.push_str(&self.term_string(t));
            }
            out.push(')');
        }
    }

    /// Render a clause as a command with the given terminator, trailing
    /// newline included.
    pub fn clause_string(&self, clause: &Clause, kind: CommandKind) -> String {
        let mut out = String::new();
        self.write_literal(&mut out, &clause.head);
        if let Some((first, rest)) = clause.body.split_first() {
            out.push_str(" :- ");
            self.write_literal(&mut out, first);
            for l in rest {
                out.push_str(", ");
                self.write_literal(&mut out, l);
            }
        }
        out.push_str(match kind {
            CommandKind::Assert => ".\n",
            CommandKind::Query => "?\n",
            CommandKind::Retract => "~\n",
        });
        out
    }

    /// Reformat query results for display, one derived fact per line. The
    /// output happens to be a valid program.
    pub fn format_results(&self, results: &[QueryResult]) -> String {
        let mut out = String::new();
        for r in results {
            self.write_literal(&mut out, &r.literal);
            out.push_str(".\n");
        }
        out
    }
}
