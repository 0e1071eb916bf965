//! Definitions collected by the declaration pass: enums, classes,
//! functions, and properties. Later passes (ownership, pattern
//! compilation, lowering) read these instead of re-walking declarations.

use rustc_hash::FxHashMap;

use tocin_ast::StmtId;
use tocin_common::Span;

use crate::ty::Ty;

/// One variant of an algebraic data type.
#[derive(Clone, Debug)]
pub struct VariantInfo {
    pub name: String,
    /// Payload types; may reference the enum's `Param`s.
    pub payload: Vec<Ty>,
    pub span: Span,
}

/// An enum definition.
#[derive(Clone, Debug)]
pub struct EnumInfo {
    pub name: String,
    pub type_params: Vec<String>,
    pub variants: Vec<VariantInfo>,
    /// Builtins (`Option`, `Result`) render as `Generic` terms; user
    /// enums as `Named`.
    pub is_builtin: bool,
    pub span: Span,
}

impl EnumInfo {
    pub fn variant(&self, name: &str) -> Option<&VariantInfo> {
        self.variants.iter().find(|v| v.name == name)
    }

    /// The enum's type term for the given arguments.
    pub fn ty(&self, args: Vec<Ty>) -> Ty {
        if self.is_builtin {
            Ty::Generic { name: self.name.clone(), args }
        } else {
            Ty::Named { name: self.name.clone(), args }
        }
    }

    /// The type term with its own parameters as arguments (the "open"
    /// form used before instantiation).
    pub fn open_ty(&self) -> Ty {
        let args = self.type_params.iter().map(|p| Ty::Param(p.clone())).collect();
        self.ty(args)
    }
}

/// A class definition. The base class is a name resolved through this
/// table, never a node pointer.
#[derive(Clone, Debug)]
pub struct ClassInfo {
    pub name: String,
    pub type_params: Vec<String>,
    pub base: Option<String>,
    pub fields: Vec<(String, Ty)>,
    pub methods: FxHashMap<String, FnSig>,
    pub span: Span,
}

impl ClassInfo {
    pub fn field(&self, name: &str) -> Option<&Ty> {
        self.fields.iter().find(|(f, _)| f == name).map(|(_, t)| t)
    }
}

/// A function signature, kept for call checking and lowering.
#[derive(Clone, Debug)]
pub struct FnSig {
    pub name: String,
    /// `(name, bounds)` for each generic parameter.
    pub type_params: Vec<(String, Vec<String>)>,
    pub param_names: Vec<String>,
    pub params: Vec<Ty>,
    /// Whether each parameter is moved-in.
    pub moved_params: Vec<bool>,
    pub ret: Ty,
    pub is_async: bool,
    /// The declaring statement (a `StmtKind::Fn`); `None` for builtins.
    pub decl: Option<StmtId>,
    pub span: Span,
}

impl FnSig {
    /// The function's type term. Generic parameters stay as `Param`s;
    /// call sites substitute them.
    pub fn ty(&self) -> Ty {
        Ty::Fun {
            params: self.params.clone(),
            ret: Box::new(self.ret.clone()),
            is_async: self.is_async,
        }
    }

    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }
}

/// A property definition: a typed slot with getter/setter bodies.
#[derive(Clone, Debug)]
pub struct PropInfo {
    pub name: String,
    pub ty: Ty,
    pub getter: Option<StmtId>,
    pub setter: Option<(String, StmtId)>,
    pub span: Span,
}

/// All definitions of one compilation unit.
#[derive(Default)]
pub struct Defs {
    pub enums: FxHashMap<String, EnumInfo>,
    pub classes: FxHashMap<String, ClassInfo>,
    pub fns: FxHashMap<String, FnSig>,
    pub props: FxHashMap<String, PropInfo>,
}

impl Defs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a constructor reference (`Some`, `Shape.Circle`, or
    /// `Circle`) to its enum and variant.
    pub fn variant_of(&self, name: &str) -> Option<(&EnumInfo, &VariantInfo)> {
        if let Some((enum_name, variant_name)) = name.rsplit_once('.') {
            let info = self.enums.get(enum_name)?;
            let variant = info.variant(variant_name)?;
            return Some((info, variant));
        }
        for info in self.enums.values() {
            if let Some(variant) = info.variant(name) {
                return Some((info, variant));
            }
        }
        None
    }

    /// Walk a class and its base chain looking for a field.
    pub fn field_of(&self, class_name: &str, field: &str) -> Option<Ty> {
        let mut current = self.classes.get(class_name);
        while let Some(class) = current {
            if let Some(ty) = class.field(field) {
                return Some(ty.clone());
            }
            current = class.base.as_deref().and_then(|b| self.classes.get(b));
        }
        None
    }

    /// Walk a class and its base chain looking for a method.
    pub fn method_of(&self, class_name: &str, method: &str) -> Option<&FnSig> {
        let mut current = self.classes.get(class_name);
        while let Some(class) = current {
            if let Some(sig) = class.methods.get(method) {
                return Some(sig);
            }
            current = class.base.as_deref().and_then(|b| self.classes.get(b));
        }
        None
    }

    /// All fields of a class including inherited ones, base-first (the
    /// construction order `new` checks against).
    pub fn all_fields(&self, class_name: &str) -> Vec<(String, Ty)> {
        let mut chain = Vec::new();
        let mut current = self.classes.get(class_name);
        while let Some(class) = current {
            chain.push(class);
            current = class.base.as_deref().and_then(|b| self.classes.get(b));
        }
        let mut fields = Vec::new();
        for class in chain.iter().rev() {
            fields.extend(class.fields.iter().cloned());
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_enum() -> EnumInfo {
        EnumInfo {
            name: "Shape".into(),
            type_params: vec![],
            variants: vec![
                VariantInfo {
                    name: "Circle".into(),
                    payload: vec![Ty::float64()],
                    span: Span::new(0, 0),
                },
                VariantInfo {
                    name: "Dot".into(),
                    payload: vec![],
                    span: Span::new(0, 0),
                },
            ],
            is_builtin: false,
            span: Span::new(0, 0),
        }
    }

    #[test]
    fn variant_resolution_plain_and_qualified() {
        let mut defs = Defs::new();
        defs.enums.insert("Shape".into(), sample_enum());

        assert!(defs.variant_of("Circle").is_some());
        assert!(defs.variant_of("Shape.Circle").is_some());
        assert!(defs.variant_of("Shape.Square").is_none());
        assert!(defs.variant_of("Nope.Circle").is_none());
    }

    #[test]
    fn field_lookup_walks_base_chain() {
        let mut defs = Defs::new();
        defs.classes.insert(
            "Animal".into(),
            ClassInfo {
                name: "Animal".into(),
                type_params: vec![],
                base: None,
                fields: vec![("name".into(), Ty::string())],
                methods: FxHashMap::default(),
                span: Span::new(0, 0),
            },
        );
        defs.classes.insert(
            "Dog".into(),
            ClassInfo {
                name: "Dog".into(),
                type_params: vec![],
                base: Some("Animal".into()),
                fields: vec![("breed".into(), Ty::string())],
                methods: FxHashMap::default(),
                span: Span::new(0, 0),
            },
        );

        assert_eq!(defs.field_of("Dog", "breed"), Some(Ty::string()));
        assert_eq!(defs.field_of("Dog", "name"), Some(Ty::string()));
        assert_eq!(defs.field_of("Dog", "age"), None);

        let all = defs.all_fields("Dog");
        assert_eq!(all[0].0, "name"); // base fields first
        assert_eq!(all[1].0, "breed");
    }

    #[test]
    fn open_ty_uses_params() {
        let info = EnumInfo {
            name: "Option".into(),
            type_params: vec!["T".into()],
            variants: vec![],
            is_builtin: true,
            span: Span::new(0, 0),
        };
        assert_eq!(
            info.open_ty(),
            Ty::Generic { name: "Option".into(), args: vec![Ty::Param("T".into())] }
        );
    }
}
