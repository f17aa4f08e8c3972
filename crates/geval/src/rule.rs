//! Parsed rules.

use std::fmt;

use geval_eval::{DataContext, EvalOptions, EvalResult, Evaluator, FunctionContext};
use geval_parser::parse_rule;
use geval_types::ast::Block;
use geval_types::SourceFile;
use sha2::{Digest, Sha256};

/// Name given to rule text in parse error locations.
const RULE_FILE: &str = "rule";

/// A rule parsed once and ready to evaluate.
///
/// The rule itself is immutable; all state lives in the [`DataContext`]
/// passed to [`RuleNode::eval`].
#[derive(Clone)]
pub struct RuleNode {
    source: String,
    block: Block,
    functions: FunctionContext,
}

impl RuleNode {
    /// Parse `source` and attach the functions it may call.
    pub fn new(source: &str, functions: FunctionContext) -> EvalResult<Self> {
        let sf = SourceFile::new(RULE_FILE, source);
        let block = parse_rule(&sf).into_result()?;
        tracing::debug!(stmts = block.stmts.len(), "rule parsed");
        Ok(Self {
            source: source.to_string(),
            block,
            functions,
        })
    }

    /// Parse `source` with only the built-in functions available.
    pub fn parse(source: &str) -> EvalResult<Self> {
        Self::new(source, FunctionContext::new())
    }

    /// Evaluate against `data` without a step budget.
    pub fn eval(&self, data: &mut DataContext) -> EvalResult<()> {
        self.eval_with(data, EvalOptions::default())
    }

    pub fn eval_with(&self, data: &mut DataContext, options: EvalOptions) -> EvalResult<()> {
        self.eval_in(data, &self.functions, options)
    }

    /// Evaluate with a function registry other than the one the rule was
    /// created with.
    pub fn eval_in(
        &self,
        data: &mut DataContext,
        functions: &FunctionContext,
        options: EvalOptions,
    ) -> EvalResult<()> {
        Evaluator::with_options(data, functions, options).eval_rule(&self.block)
    }

    /// Hex SHA-256 of the rule text.
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.source)
    }

    /// Pretty-printed syntax tree.
    pub fn dump_ast(&self) -> String {
        format!("{:#?}", self.block)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn block(&self) -> &Block {
        &self.block
    }

    pub fn functions(&self) -> &FunctionContext {
        &self.functions
    }
}

impl fmt::Debug for RuleNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleNode")
            .field("fingerprint", &self.fingerprint())
            .field("stmts", &self.block.stmts.len())
            .finish()
    }
}

pub(crate) fn fingerprint(source: &str) -> String {
    Sha256::digest(source.as_bytes())
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geval_eval::EvalError;

    #[test]
    fn fingerprint_is_hex_sha256() {
        assert_eq!(
            fingerprint(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        let rule = RuleNode::parse("a := 1").unwrap();
        assert_eq!(rule.fingerprint().len(), 64);
        assert_ne!(rule.fingerprint(), RuleNode::parse("a := 2").unwrap().fingerprint());
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn parsed_rules_are_shareable_across_threads() {
        assert_send_sync::<RuleNode>();

        let rule = std::sync::Arc::new(RuleNode::parse("n := 1").unwrap());
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let rule = rule.clone();
                std::thread::spawn(move || {
                    let mut data = DataContext::new();
                    rule.eval(&mut data).map(|_| data.contains("n"))
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap().unwrap());
        }
    }

    #[test]
    fn parse_failure_surfaces_at_construction() {
        let err = RuleNode::parse("a := (1").unwrap_err();
        assert!(matches!(err, EvalError::Parse(errors) if errors.has_errors()));
    }

    #[test]
    fn dump_ast_shows_nodes() {
        let rule = RuleNode::parse("a := 1").unwrap();
        let dump = rule.dump_ast();
        assert!(dump.contains("Assign"));
        assert!(dump.contains("IntLit"));
    }
}
