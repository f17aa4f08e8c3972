//! Tree-walking evaluator for rule bodies.
//!
//! Statements run in order against a [`DataContext`]. Every assignment goes
//! through [`DataContext::set`], so writes to host bindings are converted to
//! the host's declared type and stored immediately. Nested container writes
//! are resolved to a [`Place`] first, then rebuilt from the root.

use geval_types::ast::*;
use geval_types::Span;

use crate::container::{self, PathStep};
use crate::context::DataContext;
use crate::convert::{self, convert, ArithOp, CompareOp};
use crate::error::{EvalError, EvalResult};
use crate::function::{Function, FunctionContext};
use crate::value::{SliceValue, Type, Value};

/// Per-evaluation settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvalOptions {
    /// Maximum number of statements plus loop iterations. `None` runs
    /// without a budget.
    pub step_limit: Option<u64>,
}

impl EvalOptions {
    pub fn with_step_limit(limit: u64) -> Self {
        Self {
            step_limit: Some(limit),
        }
    }
}

/// How a statement finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Normal,
    Break,
    Continue,
}

/// An assignable location: a named binding and the path below it.
#[derive(Debug)]
struct Place {
    root: String,
    steps: Vec<PathStep>,
}

/// The rule evaluator.
pub struct Evaluator<'a> {
    data: &'a mut DataContext,
    functions: &'a FunctionContext,
    options: EvalOptions,
    /// Steps consumed so far.
    steps: u64,
    /// Number of enclosing loops.
    loop_depth: u32,
}

impl<'a> Evaluator<'a> {
    pub fn new(data: &'a mut DataContext, functions: &'a FunctionContext) -> Self {
        Self::with_options(data, functions, EvalOptions::default())
    }

    pub fn with_options(
        data: &'a mut DataContext,
        functions: &'a FunctionContext,
        options: EvalOptions,
    ) -> Self {
        Self {
            data,
            functions,
            options,
            steps: 0,
            loop_depth: 0,
        }
    }

    /// Steps consumed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Consume one step of the budget.
    fn tick(&mut self) -> EvalResult<()> {
        self.steps += 1;
        match self.options.step_limit {
            Some(limit) if self.steps > limit => Err(EvalError::StepLimitExceeded { limit }),
            _ => Ok(()),
        }
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Rules & Blocks
    // ══════════════════════════════════════════════════════════════════════════

    /// Run a rule body to completion.
    #[tracing::instrument(level = "debug", skip_all, fields(stmts = block.stmts.len()))]
    pub fn eval_rule(&mut self, block: &Block) -> EvalResult<()> {
        let result = self.exec_block(block);
        match &result {
            Ok(_) => tracing::debug!(steps = self.steps, "rule finished"),
            Err(e) => tracing::debug!(steps = self.steps, error = %e, "rule failed"),
        }
        result.map(|_| ())
    }

    fn exec_block(&mut self, block: &Block) -> EvalResult<Signal> {
        for stmt in &block.stmts {
            let signal = self.exec_stmt(stmt)?;
            if signal != Signal::Normal {
                return Ok(signal);
            }
        }
        Ok(Signal::Normal)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════════

    fn exec_stmt(&mut self, stmt: &Stmt) -> EvalResult<Signal> {
        self.tick()?;
        tracing::trace!(node = stmt.node_name(), line = stmt.span().start_line, "exec");
        match stmt {
            Stmt::Assign(assign) => self.exec_assign(assign).map(|_| Signal::Normal),
            Stmt::IncDec(inc_dec) => self.exec_inc_dec(inc_dec).map(|_| Signal::Normal),
            Stmt::If(if_stmt) => self.exec_if(if_stmt),
            Stmt::For(for_stmt) => self.exec_for(for_stmt),
            Stmt::Branch(branch) => {
                if self.loop_depth == 0 {
                    return Err(EvalError::unsupported(
                        format!("'{}' outside a loop", branch.kind.as_str()),
                        branch.span,
                    ));
                }
                Ok(match branch.kind {
                    BranchKind::Break => Signal::Break,
                    BranchKind::Continue => Signal::Continue,
                })
            }
            Stmt::Block(block) => self.exec_block(block),
            Stmt::Return(ret) => Err(EvalError::unsupported("return statement", ret.span)),
            Stmt::Expr(expr_stmt) => {
                match &expr_stmt.expr.kind {
                    // Results of a call statement are discarded
                    ExprKind::Call { callee, args } => {
                        self.eval_call(callee, args)?;
                    }
                    _ => {
                        self.eval_expr(&expr_stmt.expr)?;
                    }
                }
                Ok(Signal::Normal)
            }
        }
    }

    fn exec_assign(&mut self, assign: &AssignStmt) -> EvalResult<()> {
        if assign.values.len() > 1 {
            return Err(EvalError::unsupported(
                "assignment with more than one value",
                assign.span,
            ));
        }
        let Some(value_expr) = assign.values.first() else {
            return Err(EvalError::unsupported("assignment without a value", assign.span));
        };

        // Left-hand index operands are evaluated before the right-hand side
        let places = assign
            .targets
            .iter()
            .map(|target| self.resolve_place(target))
            .collect::<EvalResult<Vec<_>>>()?;

        if let Some(op) = assign.op.binary_op() {
            let [place] = <[Place; 1]>::try_from(places).map_err(|places| EvalError::ArityMismatch {
                context: format!("'{}' assignment", assign.op.as_str()),
                expected: 1,
                found: places.len(),
            })?;
            let rhs = self.eval_expr(value_expr)?;
            let current = self.read_place(&place)?;
            let result = apply_binary(op, current, rhs, assign.span)?;
            return self.write_place(place, result);
        }

        let values = match &value_expr.kind {
            ExprKind::Call { callee, args } => self.eval_call(callee, args)?,
            _ => vec![self.eval_expr(value_expr)?],
        };
        if values.len() != places.len() {
            return Err(EvalError::ArityMismatch {
                context: "assignment".to_string(),
                expected: places.len(),
                found: values.len(),
            });
        }
        for (place, value) in places.into_iter().zip(values) {
            self.write_place(place, value)?;
        }
        Ok(())
    }

    fn exec_inc_dec(&mut self, stmt: &IncDecStmt) -> EvalResult<()> {
        let place = self.resolve_place(&stmt.target)?;
        let current = self.read_place(&place)?;
        let op = match stmt.op {
            IncDecOp::Inc => ArithOp::Add,
            IncDecOp::Dec => ArithOp::Sub,
        };
        let result = convert::arith(op, &current, &Value::Int(1))?;
        self.write_place(place, result)
    }

    fn exec_if(&mut self, stmt: &IfStmt) -> EvalResult<Signal> {
        if let Some(init) = &stmt.init {
            self.exec_stmt(init)?;
        }
        if self.eval_condition(&stmt.condition, "if condition")? {
            return self.exec_block(&stmt.then_block);
        }
        match &stmt.else_branch {
            Some(ElseBranch::ElseIf(else_if)) => self.exec_if(else_if),
            Some(ElseBranch::Block(block)) => self.exec_block(block),
            None => Ok(Signal::Normal),
        }
    }

    fn exec_for(&mut self, stmt: &ForStmt) -> EvalResult<Signal> {
        let Some(condition) = &stmt.condition else {
            return Err(EvalError::unsupported("for loop without a condition", stmt.span));
        };
        if let Some(init) = &stmt.init {
            self.exec_stmt(init)?;
        }
        self.loop_depth += 1;
        let result = self.run_loop(stmt, condition);
        self.loop_depth -= 1;
        result
    }

    fn run_loop(&mut self, stmt: &ForStmt, condition: &Expr) -> EvalResult<Signal> {
        loop {
            self.tick()?;
            if !self.eval_condition(condition, "for condition")? {
                break;
            }
            if self.exec_block(&stmt.body)? == Signal::Break {
                break;
            }
            if let Some(post) = &stmt.post {
                self.exec_stmt(post)?;
            }
        }
        Ok(Signal::Normal)
    }

    fn eval_condition(&mut self, expr: &Expr, context: &str) -> EvalResult<bool> {
        let value = self.eval_expr(expr)?;
        value
            .as_bool()
            .ok_or_else(|| EvalError::mismatch(context, Type::Bool, value.ty()))
    }

    // ── Places ──────────────────────────────────────────────────────────────

    /// Resolve an assignment target, evaluating its index operands once.
    fn resolve_place(&mut self, expr: &Expr) -> EvalResult<Place> {
        match &expr.kind {
            ExprKind::Identifier(name) if is_predeclared(name) => Err(EvalError::unsupported(
                format!("assignment to '{name}'"),
                expr.span,
            )),
            ExprKind::Identifier(name) => Ok(Place {
                root: name.clone(),
                steps: Vec::new(),
            }),
            ExprKind::Paren(inner) => self.resolve_place(inner),
            ExprKind::Index { object, index } => {
                let mut place = self.resolve_place(object)?;
                let index = self.eval_expr(index)?;
                place.steps.push(PathStep::Index(index));
                Ok(place)
            }
            ExprKind::Selector { object, field } => {
                let mut place = self.resolve_place(object)?;
                place.steps.push(PathStep::Field(field.name.clone()));
                Ok(place)
            }
            _ => Err(EvalError::unsupported(
                "assignment to a non-addressable expression",
                expr.span,
            )),
        }
    }

    fn read_place(&self, place: &Place) -> EvalResult<Value> {
        let root = self.data.get(&place.root)?;
        container::read_path(&root, &place.steps)
    }

    fn write_place(&mut self, place: Place, value: Value) -> EvalResult<()> {
        if place.steps.is_empty() {
            return self.data.set(&place.root, value);
        }
        let root = self.data.get(&place.root)?;
        let rebuilt = container::write_path(root, &place.steps, value)?;
        self.data.set(&place.root, rebuilt)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════════

    /// Evaluate an expression to a single value.
    pub fn eval_expr(&mut self, expr: &Expr) -> EvalResult<Value> {
        match &expr.kind {
            ExprKind::IntLit(n) => Ok(Value::Int(*n)),
            ExprKind::FloatLit(n) => Ok(Value::Float64(*n)),
            ExprKind::StringLit(s) => Ok(Value::Str(s.clone())),
            ExprKind::SliceLit { elem, elements } => self.eval_slice_lit(elem, elements),
            ExprKind::MapType { key, value } => {
                let key = Type::from_literal_name(&key.name)?;
                if !key.is_valid_key() {
                    return Err(EvalError::InvalidMapKey { ty: key });
                }
                let value = Type::from_literal_name(&value.name)?;
                Ok(Value::MapType { key, value })
            }
            ExprKind::Identifier(name) => self.lookup(name),
            ExprKind::Selector { object, field } => {
                let object = self.eval_expr(object)?;
                container::field(&object, &field.name)
            }
            ExprKind::Index { object, index } => {
                let object = self.eval_expr(object)?;
                let index = self.eval_expr(index)?;
                container::index(&object, index)
            }
            ExprKind::Call { callee, args } => {
                let results = self.eval_call(callee, args)?;
                results.into_iter().next().ok_or_else(|| EvalError::ArityMismatch {
                    context: "call used as a value".to_string(),
                    expected: 1,
                    found: 0,
                })
            }
            ExprKind::Binary { left, op, right } => self.eval_binary(left, *op, right, expr.span),
            ExprKind::Unary { op, operand } => {
                let value = self.eval_expr(operand)?;
                match op {
                    UnaryOp::Neg => convert::negate(value),
                    UnaryOp::Plus => convert::plus(value),
                    UnaryOp::Not => convert::not(value),
                }
            }
            ExprKind::Paren(inner) => self.eval_expr(inner),
        }
    }

    fn lookup(&self, name: &str) -> EvalResult<Value> {
        match name {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            "nil" => Ok(Value::Nil),
            _ => self.data.get(name),
        }
    }

    /// `[]T{a, b, ...}`: each element converted to `T`, left to right.
    fn eval_slice_lit(&mut self, elem: &Ident, elements: &[Expr]) -> EvalResult<Value> {
        let elem = Type::from_literal_name(&elem.name)?;
        let mut items = Vec::with_capacity(elements.len());
        for element in elements {
            let value = self.eval_expr(element)?;
            items.push(convert(value, &elem)?);
        }
        Ok(Value::Slice(SliceValue::new(elem, items)))
    }

    // ── Operators ───────────────────────────────────────────────────────────

    fn eval_binary(&mut self, left: &Expr, op: BinOp, right: &Expr, span: Span) -> EvalResult<Value> {
        // Short-circuit logical operators
        if matches!(op, BinOp::And | BinOp::Or) {
            let l = self.eval_bool_operand(left, op)?;
            if (op == BinOp::And) != l {
                return Ok(Value::Bool(l));
            }
            return self.eval_bool_operand(right, op).map(Value::Bool);
        }
        let l = self.eval_expr(left)?;
        let r = self.eval_expr(right)?;
        apply_binary(op, l, r, span)
    }

    fn eval_bool_operand(&mut self, expr: &Expr, op: BinOp) -> EvalResult<bool> {
        let value = self.eval_expr(expr)?;
        value.as_bool().ok_or_else(|| {
            EvalError::mismatch(format!("operator '{}'", op.as_str()), Type::Bool, value.ty())
        })
    }

    // ── Calls ───────────────────────────────────────────────────────────────

    /// Evaluate a call and return all of its results.
    fn eval_call(&mut self, callee: &Expr, args: &[Expr]) -> EvalResult<Vec<Value>> {
        match &callee.kind {
            ExprKind::Identifier(name) => {
                let function = match self.functions.get(name) {
                    Some(function) => function,
                    // A callable bound as data
                    None => match self.data.get(name) {
                        Ok(Value::Func(function)) => function,
                        _ => {
                            return Err(EvalError::UnknownFunction { name: name.clone() });
                        }
                    },
                };
                let args = self.eval_args(args)?;
                self.invoke(&function, args)
            }
            ExprKind::Selector { object, field } => self.eval_method_call(object, field, args),
            ExprKind::Paren(inner) => self.eval_call(inner, args),
            _ => match self.eval_expr(callee)? {
                Value::Func(function) => {
                    let args = self.eval_args(args)?;
                    self.invoke(&function, args)
                }
                other => Err(EvalError::InvalidOperation {
                    operation: "call",
                    found: other.ty(),
                }),
            },
        }
    }

    /// `x.f(args)`.
    ///
    /// Resolution order:
    /// 1. `pkg.f` registered verbatim, when `pkg` is not a bound variable
    /// 2. `<Record>.f` with the receiver as first argument
    /// 3. `f` with the receiver as first argument
    /// 4. a callable stored in record field `f`, without the receiver
    fn eval_method_call(&mut self, object: &Expr, field: &Ident, args: &[Expr]) -> EvalResult<Vec<Value>> {
        if let ExprKind::Identifier(pkg) = &object.kind {
            if !self.data.contains(pkg) {
                if let Some(function) = self.functions.get(&format!("{pkg}.{}", field.name)) {
                    let args = self.eval_args(args)?;
                    return self.invoke(&function, args);
                }
            }
        }

        let receiver = self.eval_expr(object)?;
        let method = match &receiver {
            Value::Record(record) => self.functions.get(&format!("{}.{}", record.name, field.name)),
            _ => None,
        }
        .or_else(|| self.functions.get(&field.name));

        if let Some(function) = method {
            let mut call_args = Vec::with_capacity(args.len() + 1);
            call_args.push(receiver);
            call_args.extend(self.eval_args(args)?);
            return self.invoke(&function, call_args);
        }

        if let Value::Record(record) = &receiver {
            if let Some(Value::Func(function)) = record.get(&field.name) {
                let function = function.clone();
                let args = self.eval_args(args)?;
                return self.invoke(&function, args);
            }
        }
        Err(EvalError::UnknownFunction {
            name: field.name.clone(),
        })
    }

    fn eval_args(&mut self, args: &[Expr]) -> EvalResult<Vec<Value>> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval_expr(arg)?);
        }
        Ok(values)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(function = function.name(), args = args.len()))]
    fn invoke(&self, function: &Function, args: Vec<Value>) -> EvalResult<Vec<Value>> {
        function.call(args)
    }
}

/// Apply a binary operator to evaluated operands. `&&` and `||` reach here
/// only with both operands already evaluated.
fn apply_binary(op: BinOp, left: Value, right: Value, span: Span) -> EvalResult<Value> {
    match op {
        BinOp::Eq => Ok(Value::Bool(left.deep_equal(&right))),
        BinOp::NotEq => Ok(Value::Bool(!left.deep_equal(&right))),
        BinOp::Less => ordered(CompareOp::Less, &left, &right),
        BinOp::Greater => ordered(CompareOp::Greater, &left, &right),
        BinOp::LessEq => ordered(CompareOp::LessEq, &left, &right),
        BinOp::GreaterEq => ordered(CompareOp::GreaterEq, &left, &right),
        BinOp::Add => convert::add(left, right),
        BinOp::Sub => convert::arith(ArithOp::Sub, &left, &right),
        BinOp::Mul => convert::arith(ArithOp::Mul, &left, &right),
        BinOp::Div => convert::arith(ArithOp::Div, &left, &right),
        BinOp::Rem => Err(EvalError::unsupported("operator '%'", span)),
        BinOp::And | BinOp::Or => {
            let context = format!("operator '{}'", op.as_str());
            let l = left
                .as_bool()
                .ok_or_else(|| EvalError::mismatch(context.clone(), Type::Bool, left.ty()))?;
            let r = right
                .as_bool()
                .ok_or_else(|| EvalError::mismatch(context, Type::Bool, right.ty()))?;
            Ok(Value::Bool(if op == BinOp::And { l && r } else { l || r }))
        }
    }
}

fn ordered(op: CompareOp, left: &Value, right: &Value) -> EvalResult<Value> {
    convert::compare(op, left, right).map(Value::Bool)
}

/// Names that always evaluate to a literal.
fn is_predeclared(name: &str) -> bool {
    matches!(name, "true" | "false" | "nil")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        Span::point(1, 1)
    }

    fn int(n: i64) -> Expr {
        Expr::new(ExprKind::IntLit(n), span())
    }

    fn ident(name: &str) -> Expr {
        Expr::new(ExprKind::Identifier(name.to_string()), span())
    }

    fn binary(left: Expr, op: BinOp, right: Expr) -> Expr {
        Expr::new(
            ExprKind::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
            span(),
        )
    }

    fn assign(target: &str, value: Expr) -> Stmt {
        Stmt::Assign(AssignStmt {
            targets: vec![ident(target)],
            op: AssignOp::Assign,
            values: vec![value],
            span: span(),
        })
    }

    fn block(stmts: Vec<Stmt>) -> Block {
        Block { stmts, span: span() }
    }

    #[test]
    fn arithmetic_yields_float() {
        let mut data = DataContext::new();
        let functions = FunctionContext::new();
        let mut eval = Evaluator::new(&mut data, &functions);
        let value = eval.eval_expr(&binary(int(7), BinOp::Div, int(2))).unwrap();
        assert_eq!(value, Value::Float64(3.5));
    }

    #[test]
    fn short_circuit_skips_right_operand() {
        let mut data = DataContext::new();
        let functions = FunctionContext::new();
        let mut eval = Evaluator::new(&mut data, &functions);
        // `missing` is unbound; it must never be evaluated
        let expr = binary(ident("false"), BinOp::And, ident("missing"));
        assert_eq!(eval.eval_expr(&expr).unwrap(), Value::Bool(false));
        let expr = binary(ident("true"), BinOp::Or, ident("missing"));
        assert_eq!(eval.eval_expr(&expr).unwrap(), Value::Bool(true));
    }

    #[test]
    fn remainder_is_unsupported() {
        let mut data = DataContext::new();
        let functions = FunctionContext::new();
        let mut eval = Evaluator::new(&mut data, &functions);
        let err = eval.eval_expr(&binary(int(7), BinOp::Rem, int(2))).unwrap_err();
        assert!(matches!(err, EvalError::UnsupportedNode { .. }));
    }

    #[test]
    fn step_limit_counts_statements() {
        let mut data = DataContext::new();
        let functions = FunctionContext::new();
        let rule = block(vec![assign("a", int(1)), assign("b", int(2)), assign("c", int(3))]);

        let mut eval = Evaluator::with_options(&mut data, &functions, EvalOptions::with_step_limit(3));
        eval.eval_rule(&rule).unwrap();
        assert_eq!(eval.steps(), 3);

        let mut data = DataContext::new();
        let mut eval = Evaluator::with_options(&mut data, &functions, EvalOptions::with_step_limit(2));
        assert!(matches!(
            eval.eval_rule(&rule),
            Err(EvalError::StepLimitExceeded { limit: 2 })
        ));
    }

    #[test]
    fn break_outside_loop_is_unsupported() {
        let mut data = DataContext::new();
        let functions = FunctionContext::new();
        let rule = block(vec![Stmt::Branch(BranchStmt {
            kind: BranchKind::Break,
            span: span(),
        })]);
        let err = Evaluator::new(&mut data, &functions).eval_rule(&rule).unwrap_err();
        assert!(matches!(err, EvalError::UnsupportedNode { node, .. } if node == "'break' outside a loop"));
    }

    #[test]
    fn assignment_to_literal_name_is_rejected() {
        let mut data = DataContext::new();
        let functions = FunctionContext::new();
        let rule = block(vec![assign("nil", int(1))]);
        let err = Evaluator::new(&mut data, &functions).eval_rule(&rule).unwrap_err();
        assert!(matches!(err, EvalError::UnsupportedNode { .. }));
    }
}
