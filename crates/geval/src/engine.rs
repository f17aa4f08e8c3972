//! A rule set evaluated against one shared pair of contexts.

use geval_eval::{
    Bindable, DataContext, EvalError, EvalOptions, EvalResult, Function, FunctionContext,
};

use crate::rule::RuleNode;

#[derive(Debug)]
struct LoadedRule {
    node: RuleNode,
    priority: i32,
    fingerprint: String,
}

/// Owns host bindings, registered functions and a priority-ordered list of
/// rules.
///
/// Rules run in descending priority; rules of equal priority run in the
/// order they were added. Functions registered after a rule was added are
/// still visible to it.
#[derive(Debug, Default)]
pub struct Engine {
    data: DataContext,
    functions: FunctionContext,
    rules: Vec<LoadedRule>,
    options: EvalOptions,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: EvalOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Bind host data under `name`.
    pub fn add_data(&mut self, name: impl Into<String>, target: impl Into<Bindable>) -> EvalResult<()> {
        self.data.bind(name, target)
    }

    pub fn add_func(&mut self, name: impl Into<String>, function: Function) -> EvalResult<()> {
        self.functions.bind(name, function)
    }

    /// Parse and load a rule. Returns its fingerprint.
    pub fn add_rule(&mut self, source: &str, priority: i32) -> EvalResult<String> {
        let node = RuleNode::parse(source)?;
        let fingerprint = node.fingerprint();
        if self.rules.iter().any(|r| r.fingerprint == fingerprint) {
            return Err(EvalError::DuplicateRule { fingerprint });
        }
        // After every rule of the same or higher priority
        let at = self
            .rules
            .iter()
            .position(|r| r.priority < priority)
            .unwrap_or(self.rules.len());
        tracing::debug!(%fingerprint, priority, position = at, "rule loaded");
        self.rules.insert(
            at,
            LoadedRule {
                node,
                priority,
                fingerprint: fingerprint.clone(),
            },
        );
        Ok(fingerprint)
    }

    /// Unload the rule with `fingerprint`. Returns whether one was loaded.
    pub fn remove_rule(&mut self, fingerprint: &str) -> bool {
        let before = self.rules.len();
        self.rules.retain(|r| r.fingerprint != fingerprint);
        self.rules.len() != before
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Fingerprints in evaluation order.
    pub fn fingerprints(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.fingerprint.as_str())
    }

    /// Run every rule in order, stopping at the first failure. Locals left
    /// by a previous run are cleared first; rules within one run share them.
    pub fn eval(&mut self) -> EvalResult<()> {
        self.data.clear_locals();
        for rule in &self.rules {
            if let Err(e) = rule.node.eval_in(&mut self.data, &self.functions, self.options) {
                tracing::debug!(fingerprint = %rule.fingerprint, error = %e, "rule failed");
                return Err(e);
            }
        }
        Ok(())
    }

    pub fn data(&self) -> &DataContext {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut DataContext {
        &mut self.data
    }

    pub fn functions(&self) -> &FunctionContext {
        &self.functions
    }
}
