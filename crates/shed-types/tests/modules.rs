//! Integration tests: checking one module against another's exported type

use shed_ast::ast::{ImportPath, Item};
use shed_ast::build::AstBuilder;
use shed_types::builtins::Builtins;
use shed_types::infer::ModuleResult;
use shed_types::{type_check, ModuleType, Type, TypeError};
use std::collections::HashMap;

struct Session {
    b: AstBuilder,
    builtins: Builtins,
}

impl Session {
    fn new() -> Self {
        let mut b = AstBuilder::new();
        let builtins = Builtins::new(b.ids());
        for builtin in builtins.iter() {
            b.declare(builtin.name, builtin.id);
        }
        Session { b, builtins }
    }

    fn check(
        &mut self,
        name: &[&str],
        items: Vec<Item>,
        modules: &HashMap<ImportPath, Type>,
    ) -> Result<ModuleType, TypeError> {
        let module = self.b.module(name, items);
        let references = self.b.references();
        let bindings = self.builtins.bindings();
        type_check(&module, self.b.ids(), &bindings, &references, modules).map(|result| result.module_type)
    }
}

/// `shape Point { x: Int, y: Int }`, `fun origin() -> Point { Point(.x = 0, .y = 0) }`
/// and `type Coordinate = Int`.
fn geometry(s: &mut Session) -> Result<ModuleType, TypeError> {
    let b = &mut s.b;
    let int = b.ty("Int");
    let x = b.shape_field("x", int);
    let int = b.ty("Int");
    let y = b.shape_field("y", int);
    let point = b.shape("Point", vec![], vec![x, y]);

    let point_ty = b.ty("Point");
    let sig = b.sig(vec![], Some(point_ty));
    let callee = b.var("Point");
    let zero = b.int(0);
    let x = b.named_arg("x", zero);
    let zero = b.int(0);
    let y = b.named_arg("y", zero);
    let call = b.call_named(callee, vec![x, y]);
    let body = b.body(call);
    let origin = b.function("origin", sig, body);

    let int = b.ty("Int");
    let coordinate = b.alias("Coordinate", vec![], int);

    s.check(
        &["Geometry"],
        vec![Item::Shape(point), Item::Fn(origin), Item::TypeAlias(coordinate)],
        &HashMap::new(),
    )
}

#[test]
fn module_type_lists_every_top_level_declaration() {
    let mut s = Session::new();
    let geometry = geometry(&mut s).unwrap();
    let names: Vec<&str> = geometry.fields.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["Coordinate", "Point", "origin"]);
    assert_eq!(geometry.fields["origin"].to_string(), "() -> Point");
}

#[test]
fn imported_shape_is_usable_as_a_type_and_a_value() {
    // import geometry from .geometry
    // val p: geometry.Point = geometry.origin()
    // val px = p.x
    let mut s = Session::new();
    let geometry = geometry(&mut s).unwrap();
    let mut modules = HashMap::new();
    modules.insert(ImportPath::relative(&["geometry"]), Type::Module(geometry));

    let b = &mut s.b;
    let import = b.import("geometry", ImportPath::relative(&["geometry"]));
    let module_ref = b.ty("geometry");
    let annotation = b.type_field(module_ref, "Point");
    let module_value = b.var("geometry");
    let origin = b.field(module_value, "origin");
    let call = b.call(origin, vec![]);
    let target = b.var_target("p");
    let p = b.val_target(target, Some(annotation), call);
    let p_ref = b.var("p");
    let x = b.field(p_ref, "x");
    let px = b.val("px", x);

    let main = s
        .check(&["Main"], vec![Item::Import(import), Item::Val(p), Item::Val(px)], &modules)
        .unwrap();
    assert_eq!(main.fields["p"].to_string(), "Point");
    assert_eq!(main.fields["px"], Type::Int);
    assert!(!main.fields.contains_key("geometry"));
}

#[test]
fn missing_export_is_reported() {
    let mut s = Session::new();
    let geometry = geometry(&mut s).unwrap();
    let mut modules = HashMap::new();
    modules.insert(ImportPath::relative(&["geometry"]), Type::Module(geometry));

    let b = &mut s.b;
    let import = b.import("geometry", ImportPath::relative(&["geometry"]));
    let module_ref = b.ty("geometry");
    let annotation = b.type_field(module_ref, "Line");
    let target = b.var_target("line");
    let zero = b.int(0);
    let val = b.val_target(target, Some(annotation), zero);

    let err = s
        .check(&["Main"], vec![Item::Import(import), Item::Val(val)], &modules)
        .unwrap_err();
    assert!(matches!(err, TypeError::NoSuchField { ref field, .. } if field == "Line"));
}

#[test]
fn imported_alias_accepts_its_target() {
    let mut s = Session::new();
    let geometry = geometry(&mut s).unwrap();
    let mut modules = HashMap::new();
    modules.insert(ImportPath::relative(&["geometry"]), Type::Module(geometry));

    let b = &mut s.b;
    let import = b.import("geometry", ImportPath::relative(&["geometry"]));
    let module_ref = b.ty("geometry");
    let annotation = b.type_field(module_ref, "Coordinate");
    let target = b.var_target("c");
    let three = b.int(3);
    let val = b.val_target(target, Some(annotation), three);

    let main = s
        .check(&["Main"], vec![Item::Import(import), Item::Val(val)], &modules)
        .unwrap();
    assert_eq!(main.fields["c"].to_string(), "Coordinate");
}

#[test]
fn lookup_closure_can_reject_ambiguous_paths() {
    let mut s = Session::new();
    let import = s.b.import("options", ImportPath::absolute(&["Core", "Options"]));
    let module = s.b.module(&["Main"], vec![Item::Import(import)]);
    let references = s.b.references();
    let lookup = |path: &ImportPath| {
        if path.parts.len() > 1 {
            ModuleResult::FoundMany
        } else {
            ModuleResult::NotFound
        }
    };

    let err = type_check(&module, s.b.ids(), &s.builtins.bindings(), &references, &lookup).unwrap_err();
    assert!(matches!(err, TypeError::MultipleModulesWithSameName { .. }));
}
