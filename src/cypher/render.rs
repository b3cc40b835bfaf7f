//! Cypher text rendering.
//!
//! Rendering is a pure function of the AST: the same statement always
//! yields the same text, which is what builder tests assert against.

use std::borrow::Cow;
use std::fmt::Write;

use super::ast::*;

/// True when `name` can appear unquoted as a label, type, key or alias.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Backtick-quote `name` unless it is already a plain identifier.
pub fn quote_identifier(name: &str) -> Cow<'_, str> {
    if is_identifier(name) {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("`{}`", name.replace('`', "``")))
    }
}

/// Render a statement as Cypher text.
pub fn render(statement: &Statement) -> String {
    let mut out = String::new();
    for clause in &statement.clauses {
        if !out.is_empty() {
            out.push(' ');
        }
        render_clause(&mut out, clause);
    }
    out
}

fn render_clause(out: &mut String, clause: &Clause) {
    match clause {
        Clause::Match { optional, path, predicate } => {
            out.push_str(if *optional { "OPTIONAL MATCH " } else { "MATCH " });
            render_path(out, path);
            if let Some(predicate) = predicate {
                out.push_str(" WHERE ");
                render_predicate(out, predicate);
            }
        }
        Clause::With { distinct, items } => {
            out.push_str(if *distinct { "WITH DISTINCT " } else { "WITH " });
            let items: Vec<Cow<'_, str>> = items.iter().map(|i| quote_identifier(i)).collect();
            out.push_str(&items.join(", "));
        }
        Clause::Create(CreatePattern::Node(node)) => {
            out.push_str("CREATE ");
            render_node(out, node);
        }
        Clause::Create(CreatePattern::Relationship { src, rel, dst }) => {
            let _ = write!(out, "CREATE ({})", quote_identifier(src));
            render_rel(out, rel);
            let _ = write!(out, "({})", quote_identifier(dst));
        }
        Clause::Merge { node, on_create } => {
            out.push_str("MERGE ");
            render_node(out, node);
            if !on_create.is_empty() {
                out.push_str(" ON CREATE SET ");
                for (i, (key, expr)) in on_create.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    let _ = write!(out, "{}.{} = ", quote_identifier(&node.alias), quote_identifier(key));
                    render_expr(out, expr);
                }
            }
        }
        Clause::Delete { aliases, detach } => {
            out.push_str(if *detach { "DETACH DELETE " } else { "DELETE " });
            let aliases: Vec<Cow<'_, str>> = aliases.iter().map(|a| quote_identifier(a)).collect();
            out.push_str(&aliases.join(", "));
        }
        Clause::Set { items } => {
            out.push_str("SET ");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{}.{} = ", quote_identifier(&item.alias), quote_identifier(&item.key));
                render_expr(out, &item.expr);
            }
        }
        Clause::Return { items, order_by } => {
            out.push_str("RETURN ");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render_expr(out, &item.expr);
                if item.expr != Expr::Variable(item.alias.clone()) {
                    let _ = write!(out, " AS {}", quote_identifier(&item.alias));
                }
            }
            if !order_by.is_empty() {
                out.push_str(" ORDER BY ");
                for (i, key) in order_by.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    render_expr(out, &key.expr);
                    if key.descending {
                        out.push_str(" DESC");
                    }
                }
            }
        }
        Clause::CreateConstraint { label, property } => {
            let _ = write!(
                out,
                "CREATE CONSTRAINT IF NOT EXISTS FOR (n:{}) REQUIRE n.{} IS UNIQUE",
                quote_identifier(label),
                quote_identifier(property)
            );
        }
    }
}

fn render_path(out: &mut String, path: &PathPattern) {
    render_node(out, &path.start);
    for hop in &path.hops {
        render_rel(out, &hop.rel);
        render_node(out, &hop.node);
    }
}

fn render_node(out: &mut String, node: &NodePattern) {
    out.push('(');
    out.push_str(&quote_identifier(&node.alias));
    for label in &node.labels {
        out.push(':');
        out.push_str(&quote_identifier(label));
    }
    render_properties(out, &node.properties);
    out.push(')');
}

fn render_rel(out: &mut String, rel: &RelPattern) {
    out.push_str("-[");
    if let Some(alias) = &rel.alias {
        out.push_str(&quote_identifier(alias));
    }
    if let Some(rel_type) = &rel.rel_type {
        out.push(':');
        out.push_str(&quote_identifier(rel_type));
    }
    render_properties(out, &rel.properties);
    out.push_str("]->");
}

fn render_properties(out: &mut String, properties: &[(String, Expr)]) {
    if properties.is_empty() {
        return;
    }
    out.push_str(" {");
    for (i, (key, expr)) in properties.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{}: ", quote_identifier(key));
        render_expr(out, expr);
    }
    out.push('}');
}

fn render_predicate(out: &mut String, predicate: &Predicate) {
    match predicate {
        Predicate::Compare { left, op, right } => {
            render_expr(out, left);
            let _ = write!(out, " {} ", op.symbol());
            render_expr(out, right);
        }
        Predicate::And(parts) => {
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    out.push_str(" AND ");
                }
                render_predicate(out, part);
            }
        }
        // Parenthesized so it can sit inside an AND.
        Predicate::Or(parts) => {
            out.push('(');
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    out.push_str(" OR ");
                }
                render_predicate(out, part);
            }
            out.push(')');
        }
        Predicate::IsNull(expr) => {
            render_expr(out, expr);
            out.push_str(" IS NULL");
        }
    }
}

fn render_expr(out: &mut String, expr: &Expr) {
    match expr {
        Expr::Param(name) => {
            out.push('$');
            out.push_str(&quote_identifier(name));
        }
        Expr::Literal(value) => {
            let _ = write!(out, "{value}");
        }
        Expr::Property { alias, key } => {
            let _ = write!(out, "{}.{}", quote_identifier(alias), quote_identifier(key));
        }
        Expr::Id(alias) => {
            let _ = write!(out, "id({})", quote_identifier(alias));
        }
        Expr::Variable(alias) => out.push_str(&quote_identifier(alias)),
    }
}
