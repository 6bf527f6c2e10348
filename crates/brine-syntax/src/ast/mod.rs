//! The styling syntax tree.

pub mod expression;
pub mod statement;

pub use expression::{
    Argument, ArgumentDeclaration, ArgumentInvocation, AtRootQuery, BinaryOperator, Expression,
    ExpressionKind, ListSeparator, MediaQuery, SupportsCondition, UnaryOperator,
};
pub use statement::{
    Arena, ConfiguredVariable, ContentBlock, ForwardVisibility, IfClause, ImportArgument, NodeId,
    Statement, StatementNode, StyleSheet,
};
