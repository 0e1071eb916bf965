//! Pattern-matrix compilation (classical matrix decomposition).
//!
//! Match arms become a matrix: one row per arm (or-patterns expand to
//! one row per alternative), one column per scrutinee position. At each
//! step the compiler picks the column with the most constructor
//! diversity, splits the matrix by the constructors present, and
//! recurses, emitting `Switch` nodes. Wildcards and variable bindings
//! propagate into every branch, recording bindings along the way.
//!
//! Exhaustiveness falls out of the same walk: a switch over an enum
//! column with no default row and variants left over records the
//! missing constructors as witnesses and routes them to `Fail`.
//! Reachability is read off the finished tree: any arm with no
//! remaining leaf is redundant.

use rustc_hash::FxHashMap;

use tocin_ast::{Ast, ExprId, MatchArm, PatId, PatKind, PatLit};
use tocin_typeck::{substitute, Defs, Ty};

use super::{AccessPath, CtorTag, DecisionTree, Test};

/// The result of compiling one `match`.
pub struct CompiledMatch {
    pub tree: DecisionTree,
    /// Witness constructors for uncovered cases (empty means the match
    /// is exhaustive). `_` stands for "any value" on open types.
    pub missing: Vec<String>,
    /// Arms (by index) no path can reach.
    pub unreachable_arms: Vec<usize>,
}

/// A matrix-internal pattern, copied out of the AST arena so rows can be
/// padded and specialized freely.
#[derive(Debug, Clone)]
enum MPat {
    Wild,
    Bind(String),
    Lit(PatLit),
    Ctor { name: String, args: Vec<MPat> },
    Tuple(Vec<MPat>),
    Struct { name: String, fields: Vec<(String, MPat)> },
    Or(Vec<MPat>),
}

impl MPat {
    fn from_ast(ast: &Ast, id: PatId) -> MPat {
        match &ast.pat(id).kind {
            PatKind::Wildcard => MPat::Wild,
            PatKind::Lit(lit) => MPat::Lit(lit.clone()),
            PatKind::Bind(name) => MPat::Bind(name.clone()),
            PatKind::Ctor { name, args } => MPat::Ctor {
                // Constructor paths resolve by their final segment.
                name: name.rsplit('.').next().unwrap_or(name).to_string(),
                args: args.iter().map(|a| MPat::from_ast(ast, *a)).collect(),
            },
            PatKind::Tuple(elems) => {
                MPat::Tuple(elems.iter().map(|e| MPat::from_ast(ast, *e)).collect())
            }
            PatKind::Struct { name, fields } => MPat::Struct {
                name: name.clone(),
                fields: fields
                    .iter()
                    .map(|(f, p)| (f.clone(), MPat::from_ast(ast, *p)))
                    .collect(),
            },
            PatKind::Or(alts) => {
                MPat::Or(alts.iter().map(|a| MPat::from_ast(ast, *a)).collect())
            }
        }
    }

    fn is_wildcard_like(&self) -> bool {
        matches!(self, MPat::Wild | MPat::Bind(_))
    }

    /// A key identifying the head constructor, if any.
    fn head_key(&self) -> Option<String> {
        match self {
            MPat::Lit(lit) => Some(format!("lit:{}", lit_key(lit))),
            MPat::Ctor { name, .. } => Some(format!("ctor:{name}")),
            MPat::Tuple(elems) => Some(format!("tuple:{}", elems.len())),
            MPat::Struct { name, .. } => Some(format!("struct:{name}")),
            MPat::Or(_) => None,
            MPat::Wild | MPat::Bind(_) => None,
        }
    }
}

fn lit_key(lit: &PatLit) -> String {
    match lit {
        PatLit::Int(v) => format!("i:{v}"),
        PatLit::Float(v) => format!("f:{}", v.to_bits()),
        PatLit::Str(s) => format!("s:{s}"),
        PatLit::Bool(b) => format!("b:{b}"),
        PatLit::Nil => "nil".to_string(),
    }
}

fn lit_test(lit: &PatLit) -> Test {
    match lit {
        PatLit::Int(v) => Test::Int(*v),
        PatLit::Float(v) => Test::Float(v.to_bits()),
        PatLit::Str(s) => Test::Str(s.clone()),
        PatLit::Bool(b) => Test::Bool(*b),
        PatLit::Nil => Test::Nil,
    }
}

#[derive(Debug, Clone)]
struct Row {
    pats: Vec<MPat>,
    arm_index: usize,
    guard: Option<ExprId>,
    bindings: Vec<(String, AccessPath)>,
}

#[derive(Debug, Clone)]
struct Column {
    path: AccessPath,
    ty: Ty,
}

struct MatrixCompiler<'a> {
    defs: &'a Defs,
    missing: Vec<String>,
}

/// Compile one match expression into a decision tree, collecting
/// exhaustiveness witnesses and unreachable arms.
pub fn compile_match(
    ast: &Ast,
    defs: &Defs,
    scrutinee_ty: &Ty,
    arms: &[MatchArm],
) -> CompiledMatch {
    let rows: Vec<Row> = arms
        .iter()
        .enumerate()
        .map(|(i, arm)| Row {
            pats: vec![MPat::from_ast(ast, arm.pattern)],
            arm_index: i,
            guard: arm.guard,
            bindings: Vec::new(),
        })
        .collect();
    let columns = vec![Column {
        path: AccessPath::Root,
        ty: scrutinee_ty.clone(),
    }];

    let mut compiler = MatrixCompiler {
        defs,
        missing: Vec::new(),
    };
    let tree = compiler.compile(rows, columns);

    let mut reachable = Vec::new();
    tree.reachable_arms(&mut reachable);
    let unreachable_arms: Vec<usize> = (0..arms.len())
        .filter(|i| !reachable.contains(i))
        .collect();

    let mut missing = compiler.missing;
    missing.sort();
    missing.dedup();

    CompiledMatch {
        tree,
        missing,
        unreachable_arms,
    }
}

impl<'a> MatrixCompiler<'a> {
    fn compile(&mut self, mut rows: Vec<Row>, columns: Vec<Column>) -> DecisionTree {
        if rows.is_empty() {
            return DecisionTree::Fail;
        }

        // Or-patterns duplicate their row, one alternative each, before
        // anything else looks at the matrix.
        if let Some(expanded) = expand_first_or(&rows) {
            rows = expanded;
            return self.compile(rows, columns);
        }

        // First row all wildcards: it matches whatever reaches it.
        if rows[0].pats.iter().all(MPat::is_wildcard_like) {
            let row = &rows[0];
            let mut bindings = row.bindings.clone();
            for (pat, column) in row.pats.iter().zip(columns.iter()) {
                if let MPat::Bind(name) = pat {
                    bindings.push((name.clone(), column.path.clone()));
                }
            }
            return match row.guard {
                Some(guard) => {
                    let case_index = row.arm_index;
                    let rest: Vec<Row> = rows[1..].to_vec();
                    let failure = self.compile(rest, columns);
                    DecisionTree::Guard {
                        case_index,
                        bindings,
                        guard,
                        failure: Box::new(failure),
                    }
                }
                None => DecisionTree::Leaf {
                    case_index: row.arm_index,
                    bindings,
                },
            };
        }

        // Pick the column with the most distinct head constructors.
        let col = select_column(&rows);

        // A column of pure wildcards contributes only bindings.
        let has_heads = rows.iter().any(|r| r.pats[col].head_key().is_some());
        if !has_heads {
            let (rows, columns) = remove_wildcard_column(rows, columns, col);
            return self.compile(rows, columns);
        }

        // Structural positions (tuples, struct patterns) decompose
        // without a runtime test.
        if rows.iter().any(|r| matches!(r.pats[col], MPat::Tuple(_))) {
            let (rows, columns) = self.expand_tuple_column(rows, columns, col);
            return self.compile(rows, columns);
        }
        if rows.iter().any(|r| matches!(r.pats[col], MPat::Struct { .. })) {
            let (rows, columns) = self.expand_struct_column(rows, columns, col);
            return self.compile(rows, columns);
        }

        let has_ctors = rows
            .iter()
            .any(|r| matches!(r.pats[col], MPat::Ctor { .. }));
        if has_ctors {
            self.compile_ctor_switch(rows, columns, col)
        } else {
            self.compile_literal_switch(rows, columns, col)
        }
    }

    // ── Constructor switches ───────────────────────────────────────────

    fn compile_ctor_switch(
        &mut self,
        rows: Vec<Row>,
        columns: Vec<Column>,
        col: usize,
    ) -> DecisionTree {
        let column = columns[col].clone();
        let all_variants: Vec<String> = enum_of(self.defs, &column.ty)
            .map(|info| info.variants.iter().map(|v| v.name.clone()).collect())
            .unwrap_or_default();

        // Head constructors in order of first appearance.
        let mut heads: Vec<String> = Vec::new();
        for row in &rows {
            if let MPat::Ctor { name, .. } = &row.pats[col] {
                if !heads.contains(name) {
                    heads.push(name.clone());
                }
            }
        }

        let has_default_rows = rows.iter().any(|r| r.pats[col].is_wildcard_like());

        let mut arms = Vec::new();
        for head in &heads {
            let (tag, payload_tys) = self.ctor_info(&column.ty, head);
            let arity = tag.arity;

            // New columns: the payload fields replace the tested column.
            let mut sub_columns = Vec::new();
            for (i, ty) in payload_tys.iter().enumerate() {
                sub_columns.push(Column {
                    path: column.path.field(i),
                    ty: ty.clone(),
                });
            }
            let mut new_columns = columns.clone();
            new_columns.splice(col..=col, sub_columns);

            let mut specialized = Vec::new();
            for row in &rows {
                match &row.pats[col] {
                    MPat::Ctor { name, args } if name == head => {
                        let mut new_row = row.clone();
                        let mut args = args.clone();
                        args.resize(arity, MPat::Wild);
                        new_row.pats.splice(col..=col, args);
                        specialized.push(new_row);
                    }
                    MPat::Wild => {
                        let mut new_row = row.clone();
                        new_row.pats.splice(col..=col, vec![MPat::Wild; arity]);
                        specialized.push(new_row);
                    }
                    MPat::Bind(name) => {
                        let mut new_row = row.clone();
                        new_row.bindings.push((name.clone(), column.path.clone()));
                        new_row.pats.splice(col..=col, vec![MPat::Wild; arity]);
                        specialized.push(new_row);
                    }
                    _ => {}
                }
            }
            let child = self.compile(specialized, new_columns.clone());
            arms.push((Test::Ctor(tag), child));
        }

        // Missing constructors make the default path meaningful.
        let missing_here: Vec<String> = all_variants
            .iter()
            .filter(|v| !heads.contains(v))
            .cloned()
            .collect();

        // A complete signature needs no default: wildcard rows already
        // flowed into every specialization.
        let complete = missing_here.is_empty() && !all_variants.is_empty();
        let default = if complete {
            None
        } else if has_default_rows {
            let (default_rows, default_columns) =
                remove_wildcard_column(rows, columns, col);
            Some(Box::new(self.compile(default_rows, default_columns)))
        } else if !missing_here.is_empty() {
            self.missing.extend(missing_here);
            Some(Box::new(DecisionTree::Fail))
        } else {
            // Unknown scrutinee shape: stay safe with a failing default.
            self.missing.push("_".to_string());
            Some(Box::new(DecisionTree::Fail))
        };

        DecisionTree::Switch {
            path: column.path,
            arms,
            default,
        }
    }

    /// The tag and instantiated payload types of a constructor, under
    /// the scrutinee's type arguments.
    fn ctor_info(&self, scrutinee_ty: &Ty, variant: &str) -> (CtorTag, Vec<Ty>) {
        if let Some(info) = enum_of(self.defs, scrutinee_ty) {
            if let Some(position) = info.variants.iter().position(|v| v.name == variant) {
                let var_info = &info.variants[position];
                let mut env = FxHashMap::default();
                if let Ty::Named { args, .. } | Ty::Generic { args, .. } = scrutinee_ty {
                    for (param, arg) in info.type_params.iter().zip(args.iter()) {
                        env.insert(param.clone(), arg.clone());
                    }
                }
                let payload: Vec<Ty> = var_info
                    .payload
                    .iter()
                    .map(|p| substitute(p, &env))
                    .collect();
                return (
                    CtorTag {
                        type_name: info.name.clone(),
                        variant: variant.to_string(),
                        tag: position,
                        arity: payload.len(),
                    },
                    payload,
                );
            }
        }
        // Unknown constructor (already diagnosed by the checker); treat
        // as nullary so compilation can continue.
        (
            CtorTag {
                type_name: scrutinee_ty.to_string(),
                variant: variant.to_string(),
                tag: 0,
                arity: 0,
            },
            Vec::new(),
        )
    }

    // ── Literal switches ───────────────────────────────────────────────

    fn compile_literal_switch(
        &mut self,
        rows: Vec<Row>,
        columns: Vec<Column>,
        col: usize,
    ) -> DecisionTree {
        let column = columns[col].clone();

        let mut seen: Vec<String> = Vec::new();
        let mut tests: Vec<(Test, PatLit)> = Vec::new();
        for row in &rows {
            if let MPat::Lit(lit) = &row.pats[col] {
                let key = lit_key(lit);
                if !seen.contains(&key) {
                    seen.push(key);
                    tests.push((lit_test(lit), lit.clone()));
                }
            }
        }

        let has_default_rows = rows.iter().any(|r| r.pats[col].is_wildcard_like());

        let mut arms = Vec::new();
        for (test, lit) in &tests {
            let mut specialized = Vec::new();
            for row in &rows {
                match &row.pats[col] {
                    MPat::Lit(row_lit) if lit_key(row_lit) == lit_key(lit) => {
                        let mut new_row = row.clone();
                        new_row.pats.remove(col);
                        specialized.push(new_row);
                    }
                    MPat::Wild => {
                        let mut new_row = row.clone();
                        new_row.pats.remove(col);
                        specialized.push(new_row);
                    }
                    MPat::Bind(name) => {
                        let mut new_row = row.clone();
                        new_row.bindings.push((name.clone(), column.path.clone()));
                        new_row.pats.remove(col);
                        specialized.push(new_row);
                    }
                    _ => {}
                }
            }
            let mut sub_columns = columns.clone();
            sub_columns.remove(col);
            let child = self.compile(specialized, sub_columns);
            arms.push((test.clone(), child));
        }

        // Booleans are the one finite literal domain.
        let bool_complete = matches!(column.ty, Ty::Prim(tocin_typeck::Prim::Bool))
            && arms.iter().any(|(t, _)| *t == Test::Bool(true))
            && arms.iter().any(|(t, _)| *t == Test::Bool(false));

        let default = if bool_complete {
            // Both boolean literals are present; wildcard rows already
            // flowed into both arms.
            None
        } else if has_default_rows {
            let (default_rows, default_columns) =
                remove_wildcard_column(rows, columns, col);
            Some(Box::new(self.compile(default_rows, default_columns)))
        } else {
            let witness = match column.ty {
                Ty::Prim(tocin_typeck::Prim::Bool) => {
                    if arms.iter().any(|(t, _)| *t == Test::Bool(true)) {
                        "false".to_string()
                    } else {
                        "true".to_string()
                    }
                }
                _ => "_".to_string(),
            };
            self.missing.push(witness);
            Some(Box::new(DecisionTree::Fail))
        };

        DecisionTree::Switch {
            path: column.path,
            arms,
            default,
        }
    }

    // ── Structural expansion ───────────────────────────────────────────

    fn expand_tuple_column(
        &mut self,
        rows: Vec<Row>,
        columns: Vec<Column>,
        col: usize,
    ) -> (Vec<Row>, Vec<Column>) {
        let column = columns[col].clone();
        let elem_tys: Vec<Ty> = match &column.ty {
            Ty::Generic { name, args } if name == "tuple" => args.clone(),
            _ => {
                // Width from the first tuple row.
                let width = rows
                    .iter()
                    .find_map(|r| match &r.pats[col] {
                        MPat::Tuple(elems) => Some(elems.len()),
                        _ => None,
                    })
                    .unwrap_or(0);
                vec![Ty::Error; width]
            }
        };

        let mut new_columns = columns.clone();
        let sub_columns: Vec<Column> = elem_tys
            .iter()
            .enumerate()
            .map(|(i, ty)| Column {
                path: column.path.field(i),
                ty: ty.clone(),
            })
            .collect();
        new_columns.splice(col..=col, sub_columns);

        let mut new_rows = Vec::new();
        for row in rows {
            let mut new_row = row.clone();
            match &row.pats[col] {
                MPat::Tuple(elems) => {
                    let mut elems = elems.clone();
                    elems.resize(elem_tys.len(), MPat::Wild);
                    new_row.pats.splice(col..=col, elems);
                }
                MPat::Bind(name) => {
                    new_row.bindings.push((name.clone(), column.path.clone()));
                    new_row
                        .pats
                        .splice(col..=col, vec![MPat::Wild; elem_tys.len()]);
                }
                _ => {
                    new_row
                        .pats
                        .splice(col..=col, vec![MPat::Wild; elem_tys.len()]);
                }
            }
            new_rows.push(new_row);
        }
        (new_rows, new_columns)
    }

    fn expand_struct_column(
        &mut self,
        rows: Vec<Row>,
        columns: Vec<Column>,
        col: usize,
    ) -> (Vec<Row>, Vec<Column>) {
        let column = columns[col].clone();
        let class_name = rows
            .iter()
            .find_map(|r| match &r.pats[col] {
                MPat::Struct { name, .. } => Some(name.clone()),
                _ => None,
            })
            .unwrap_or_default();
        let fields = self.defs.all_fields(&class_name);

        let mut new_columns = columns.clone();
        let sub_columns: Vec<Column> = fields
            .iter()
            .enumerate()
            .map(|(i, (_, ty))| Column {
                path: column.path.field(i),
                ty: ty.clone(),
            })
            .collect();
        new_columns.splice(col..=col, sub_columns);

        let mut new_rows = Vec::new();
        for row in rows {
            let mut new_row = row.clone();
            match &row.pats[col] {
                MPat::Struct { fields: row_fields, .. } => {
                    let subs: Vec<MPat> = fields
                        .iter()
                        .map(|(fname, _)| {
                            row_fields
                                .iter()
                                .find(|(rf, _)| rf == fname)
                                .map(|(_, p)| p.clone())
                                .unwrap_or(MPat::Wild)
                        })
                        .collect();
                    new_row.pats.splice(col..=col, subs);
                }
                MPat::Bind(name) => {
                    new_row.bindings.push((name.clone(), column.path.clone()));
                    new_row
                        .pats
                        .splice(col..=col, vec![MPat::Wild; fields.len()]);
                }
                _ => {
                    new_row
                        .pats
                        .splice(col..=col, vec![MPat::Wild; fields.len()]);
                }
            }
            new_rows.push(new_row);
        }
        (new_rows, new_columns)
    }
}

/// Expand the first row containing an or-pattern, one row per
/// alternative, preserving order. Returns `None` when no row has one.
fn expand_first_or(rows: &[Row]) -> Option<Vec<Row>> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, pat) in row.pats.iter().enumerate() {
            if let MPat::Or(alts) = pat {
                let mut expanded = rows[..row_idx].to_vec();
                for alt in alts {
                    let mut new_row = row.clone();
                    new_row.pats[col_idx] = alt.clone();
                    expanded.push(new_row);
                }
                expanded.extend_from_slice(&rows[row_idx + 1..]);
                return Some(expanded);
            }
        }
    }
    None
}

/// The column with the most distinct head constructors; ties go to the
/// leftmost.
fn select_column(rows: &[Row]) -> usize {
    let num_cols = rows.first().map(|r| r.pats.len()).unwrap_or(0);
    let mut best_col = 0;
    let mut best_score = 0usize;
    for col in 0..num_cols {
        let mut seen: Vec<String> = Vec::new();
        for row in rows {
            if let Some(key) = row.pats[col].head_key() {
                if !seen.contains(&key) {
                    seen.push(key);
                }
            }
        }
        if seen.len() > best_score {
            best_score = seen.len();
            best_col = col;
        }
    }
    best_col
}

/// Keep only the rows that match anything at `col` (the default rows),
/// record their bindings, and drop the column.
fn remove_wildcard_column(
    rows: Vec<Row>,
    columns: Vec<Column>,
    col: usize,
) -> (Vec<Row>, Vec<Column>) {
    let path = columns[col].path.clone();
    let mut new_rows = Vec::new();
    for row in rows {
        if !row.pats[col].is_wildcard_like() {
            continue;
        }
        let mut new_row = row.clone();
        if let MPat::Bind(name) = &row.pats[col] {
            new_row.bindings.push((name.clone(), path.clone()));
        }
        new_row.pats.remove(col);
        new_rows.push(new_row);
    }
    let mut new_columns = columns;
    new_columns.remove(col);
    (new_rows, new_columns)
}

fn enum_of<'d>(defs: &'d Defs, ty: &Ty) -> Option<&'d tocin_typeck::EnumInfo> {
    match ty {
        Ty::Named { name, .. } | Ty::Generic { name, .. } => defs.enums.get(name),
        _ => None,
    }
}
