//! Statement nodes and the statement arena.
//!
//! Statements live in a flat arena addressed by [`NodeId`]; children are
//! id lists inside each node and the parent link is just another index.
//! That keeps the tree strictly owned while still supporting upward
//! queries like "nearest enclosing media rule" without back-references.

use brine_source_map::Span;

use crate::ast::expression::{
    ArgumentDeclaration, ArgumentInvocation, Expression, SupportsCondition,
};
use crate::interpolation::Interpolation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub struct StatementNode {
    pub span: Span,
    pub parent: Option<NodeId>,
    pub kind: Statement,
}

/// One `@if`/`@else if` arm.
#[derive(Debug, Clone, PartialEq)]
pub struct IfClause {
    pub condition: Expression,
    pub children: Vec<NodeId>,
    pub span: Span,
}

/// The trailing `{ ... }` block of an `@include`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentBlock {
    pub arguments: ArgumentDeclaration,
    pub children: Vec<NodeId>,
    pub span: Span,
}

/// One argument of an `@import` rule.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportArgument {
    /// Recognized as plain CSS (URL, `url(...)`, `.css`, or carrying
    /// supports/media modifiers); passed through to the output verbatim.
    Static {
        url: Interpolation,
        supports: Option<SupportsCondition>,
        media: Option<Interpolation>,
        span: Span,
    },
    /// A Sass import, resolved later by the import resolver collaborator.
    Dynamic { url: String, span: Span },
}

/// A `$name: value` entry in a `with (...)` configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfiguredVariable {
    pub name: String,
    pub expression: Expression,
    pub guarded: bool,
    pub span: Span,
}

/// `show`/`hide` lists on `@forward`.
#[derive(Debug, Clone, PartialEq)]
pub enum ForwardVisibility {
    Show(Vec<String>),
    Hide(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Root {
        children: Vec<NodeId>,
    },
    StyleRule {
        selector: Interpolation,
        children: Vec<NodeId>,
    },
    Declaration {
        name: Interpolation,
        value: Option<Expression>,
        /// The raw interpolated value of a `--custom` property; these
        /// bypass expression parsing entirely.
        custom_value: Option<Interpolation>,
        children: Vec<NodeId>,
    },
    VariableDeclaration {
        namespace: Option<String>,
        name: String,
        value: Expression,
        guarded: bool,
        global: bool,
    },
    LoudComment {
        text: Interpolation,
    },
    SilentComment {
        text: String,
    },
    AtRoot {
        query: Option<Interpolation>,
        children: Vec<NodeId>,
    },
    Content {
        arguments: ArgumentInvocation,
    },
    Debug {
        expression: Expression,
    },
    Each {
        variables: Vec<String>,
        list: Expression,
        children: Vec<NodeId>,
    },
    Error {
        expression: Expression,
    },
    Extend {
        selector: Interpolation,
        optional: bool,
    },
    For {
        variable: String,
        from: Expression,
        to: Expression,
        inclusive: bool,
        children: Vec<NodeId>,
    },
    Function {
        name: String,
        arguments: ArgumentDeclaration,
        children: Vec<NodeId>,
    },
    If {
        clauses: Vec<IfClause>,
        else_children: Option<Vec<NodeId>>,
    },
    Import {
        imports: Vec<ImportArgument>,
    },
    Include {
        namespace: Option<String>,
        name: String,
        arguments: ArgumentInvocation,
        content: Option<ContentBlock>,
    },
    Media {
        query: Interpolation,
        children: Vec<NodeId>,
    },
    Mixin {
        name: String,
        arguments: ArgumentDeclaration,
        children: Vec<NodeId>,
    },
    Return {
        expression: Expression,
    },
    Supports {
        condition: SupportsCondition,
        children: Vec<NodeId>,
    },
    Use {
        url: String,
        /// `None` derives the namespace from the URL; `Some(None)` is
        /// `as *`; `Some(Some(ns))` is an explicit namespace.
        namespace: Option<Option<String>>,
        configuration: Vec<ConfiguredVariable>,
    },
    Forward {
        url: String,
        prefix: Option<String>,
        visibility: Option<ForwardVisibility>,
        configuration: Vec<ConfiguredVariable>,
    },
    Warn {
        expression: Expression,
    },
    While {
        condition: Expression,
        children: Vec<NodeId>,
    },
    /// An at-rule Sass doesn't recognize: optional interpolated value,
    /// then either a body or a statement separator.
    AtRule {
        name: Interpolation,
        value: Option<Interpolation>,
        children: Option<Vec<NodeId>>,
    },
}

impl Statement {
    /// Child ids, for traversal. Nodes without bodies yield an empty slice.
    pub fn children(&self) -> &[NodeId] {
        match self {
            Statement::Root { children }
            | Statement::StyleRule { children, .. }
            | Statement::Declaration { children, .. }
            | Statement::AtRoot { children, .. }
            | Statement::Each { children, .. }
            | Statement::For { children, .. }
            | Statement::Function { children, .. }
            | Statement::Media { children, .. }
            | Statement::Mixin { children, .. }
            | Statement::Supports { children, .. }
            | Statement::While { children, .. } => children,
            Statement::AtRule {
                children: Some(children),
                ..
            } => children,
            _ => &[],
        }
    }
}

/// A parsed stylesheet: the arena plus its root node.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleSheet {
    nodes: Vec<StatementNode>,
    root: NodeId,
}

impl StyleSheet {
    pub fn new(nodes: Vec<StatementNode>, root: NodeId) -> Self {
        StyleSheet { nodes, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &StatementNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Walks parent links from [id] (exclusive) to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut current = self.node(id).parent;
        std::iter::from_fn(move || {
            let id = current?;
            current = self.node(id).parent;
            Some(id)
        })
    }

    /// The nearest enclosing ancestor matching [predicate].
    pub fn nearest_ancestor(
        &self,
        id: NodeId,
        predicate: impl Fn(&Statement) -> bool,
    ) -> Option<NodeId> {
        self.ancestors(id).find(|&a| predicate(&self.node(a).kind))
    }
}

/// Mutable arena used while parsing; frozen into a [`StyleSheet`].
#[derive(Debug, Default)]
pub struct Arena {
    nodes: Vec<StatementNode>,
}

impl Arena {
    pub fn new() -> Self {
        Arena::default()
    }

    pub fn add(&mut self, kind: Statement, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(StatementNode {
            span,
            parent: None,
            kind,
        });
        id
    }

    pub fn node(&self, id: NodeId) -> &StatementNode {
        &self.nodes[id.0]
    }

    /// Sets [parent] on every node in [children].
    pub fn adopt(&mut self, parent: NodeId, children: &[NodeId]) {
        for &child in children {
            self.nodes[child.0].parent = Some(parent);
        }
    }

    pub fn into_stylesheet(self, root: NodeId) -> StyleSheet {
        StyleSheet::new(self.nodes, root)
    }
}
