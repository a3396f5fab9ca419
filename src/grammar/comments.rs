//! Comment extraction from the CST.
//!
//! Comments are real tokens in the stream, collected by the parser's
//! dedicated comments rule rather than discarded. This module turns those
//! token groups back into a typed comment list for doc-string extraction.

use serde::Serialize;

use super::cst::{CstNode, LabelName, RuleName, SlotName};
use super::token::TokenKind;

/// Comment flavor, distinguished by syntax: `//`/`#`, `/* */`, `/** */`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CommentKind {
    Line,
    Block,
    Doc,
}

/// A comment with its opening marker stripped (`// Just` yields `" Just"`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub kind: CommentKind,
    pub value: String,
}

fn collect(comments_node: &CstNode, filter: Option<CommentKind>) -> Vec<Comment> {
    let wanted = |kind: CommentKind| filter.is_none() || filter == Some(kind);
    let mut out = Vec::new();

    if wanted(CommentKind::Line) {
        for token in comments_node.tokens_of(TokenKind::SingleLineComment) {
            out.push(Comment {
                kind: CommentKind::Line,
                value: token.text_payload().unwrap_or_default().to_string(),
            });
        }
    }

    if wanted(CommentKind::Block) {
        for token in comments_node.tokens_of(TokenKind::BlockComment) {
            out.push(Comment {
                kind: CommentKind::Block,
                value: token.text_payload().unwrap_or_default().to_string(),
            });
        }
    }

    if wanted(CommentKind::Doc) {
        for token in comments_node.tokens_of(TokenKind::DocComment) {
            out.push(Comment {
                kind: CommentKind::Doc,
                value: token.text_payload().unwrap_or_default().to_string(),
            });
        }
    }

    out
}

/// Comments attached to `node` through its first `Comments` child.
pub fn extract_comments(node: &CstNode, filter: Option<CommentKind>) -> Vec<Comment> {
    match node.slot(SlotName::Rule(RuleName::Comments)).next() {
        Some(comments_node) => collect(comments_node, filter),
        None => Vec::new(),
    }
}

/// Comments trailing the last definition, attached to the document root.
pub fn extract_post_comments(node: &CstNode, filter: Option<CommentKind>) -> Vec<Comment> {
    match node.slot(SlotName::Label(LabelName::PostComments)).next() {
        Some(comments_node) => collect(comments_node, filter),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::ThriftGrammar;

    fn parse_root(source: &str) -> CstNode {
        ThriftGrammar::new().parse(source).cst
    }

    fn first_definition(root: &CstNode) -> &CstNode {
        root.slot(SlotName::Rule(RuleName::Definition))
            .next()
            .expect("definition")
    }

    #[test]
    fn document_level_comments_collect_at_the_root() {
        let root = parse_root("// one\n# two\nenum E { A }");
        let comments = extract_comments(&root, None);
        assert_eq!(comments.len(), 2);
        assert!(comments.iter().all(|c| c.kind == CommentKind::Line));
        let values: Vec<&str> = comments.iter().map(|c| c.value.as_str()).collect();
        assert_eq!(values, vec![" one", " two"]);
    }

    // Comments before the first construct belong to the document; the ones
    // below sit after a header, so they attach to the definition.
    #[test]
    fn markers_are_stripped_per_flavor() {
        let root =
            parse_root("namespace rs x\n// slashes\n# hash\n/* block */\n/** doc */\nenum E { A }");
        let comments = extract_comments(first_definition(&root), None);
        let values: Vec<&str> = comments.iter().map(|c| c.value.as_str()).collect();
        assert!(values.contains(&" slashes"));
        assert!(values.contains(&" hash"));
        assert!(values.contains(&" block "));
        assert!(values.contains(&" doc "));
    }

    #[test]
    fn filter_selects_one_flavor() {
        let root = parse_root("namespace rs x\n// line\n/** doc */\nenum E { A }");
        let docs = extract_comments(first_definition(&root), Some(CommentKind::Doc));
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].kind, CommentKind::Doc);
        assert_eq!(docs[0].value, " doc ");
    }

    #[test]
    fn post_comments_are_separate_from_leading_comments() {
        let root = parse_root("enum E { A }\n// trailing");
        let trailing = extract_post_comments(&root, None);
        assert_eq!(trailing.len(), 1);
        assert_eq!(trailing[0].value, " trailing");
        assert!(extract_comments(&root, None).is_empty());
    }

    #[test]
    fn nodes_without_comments_yield_nothing() {
        let root = parse_root("enum E { A }");
        assert!(extract_comments(first_definition(&root), None).is_empty());
        assert!(extract_post_comments(&root, None).is_empty());
    }
}
