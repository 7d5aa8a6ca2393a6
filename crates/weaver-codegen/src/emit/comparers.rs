//! Structural equality comparers
//!
//! Each shape gets a nested `ValueComparer` class implementing
//! `IEqualityComparer<T>`. Container, tuple and nullable properties are
//! compared through small support comparers written once per file.

use super::by_namespace;
use crate::equality::{Classified, ComparerPlan, ComparerSet, TypeClass};
use crate::error::CodegenError;
use crate::writer::SourceWriter;
use weaver_core::facts::TypeExpr;
use weaver_core::CancellationToken;

const EQUALITY_COMPARER: &str = "global::System.Collections.Generic.IEqualityComparer";
const DEFAULT_COMPARER: &str = "global::System.Collections.Generic.EqualityComparer";
const SUPPORT_CLASS: &str = "ValueComparerSupport";

/// Keyword types that are value types, so `T?` is a `Nullable<T>`.
const VALUE_KEYWORDS: &[&str] = &[
    "bool", "byte", "sbyte", "short", "ushort", "int", "uint", "long", "ulong", "nint", "nuint",
    "float", "double", "decimal", "char",
];

/// Render the comparers of a pass.
pub fn emit_comparers(
    comparers: &ComparerSet,
    root_namespace: &str,
    indent_size: usize,
    cancel: &CancellationToken,
) -> Result<String, CodegenError> {
    let mut writer = SourceWriter::new(indent_size);
    writer.header()?;

    let support = support_path(root_namespace);
    let plans: Vec<&ComparerPlan> = comparers.plans().map(|plan| plan.as_ref()).collect();
    let groups = by_namespace(plans.iter().copied(), |plan| &plan.identity, root_namespace);

    for (group_index, (namespace, plans)) in groups.iter().enumerate() {
        if group_index > 0 {
            writer.blank()?;
        }
        let namespaced = !namespace.is_empty();
        if namespaced {
            writer.open(format!("namespace {}", namespace))?;
        }
        for (index, plan) in plans.iter().enumerate() {
            cancel.check()?;
            if index > 0 {
                writer.blank()?;
            }
            let scopes = writer.open_containing_types(&plan.identity)?;
            writer.open(format!(
                "partial {} {}",
                plan.identity.kind.keyword(),
                plan.identity.declared_name()
            ))?;
            emit_comparer(&mut writer, plan, comparers, &support)?;
            writer.close()?;
            writer.close_scopes(scopes)?;
        }
        if namespaced {
            writer.close()?;
        }
    }

    if !plans.is_empty() {
        writer.blank()?;
        emit_support(&mut writer, root_namespace)?;
    }
    Ok(writer.finish())
}

fn support_path(root_namespace: &str) -> String {
    if root_namespace.is_empty() {
        format!("global::{}", SUPPORT_CLASS)
    } else {
        format!("global::{}.{}", root_namespace, SUPPORT_CLASS)
    }
}

fn emit_comparer(
    writer: &mut SourceWriter,
    plan: &ComparerPlan,
    comparers: &ComparerSet,
    support: &str,
) -> Result<(), CodegenError> {
    let value_shape = |shape: &str| comparers.is_value_shape(shape);
    let this = plan.identity.display_name();
    let is_struct = plan.identity.kind.is_value_type();
    let nullable = if is_struct { "" } else { "?" };

    writer.open(format!(
        "public sealed class ValueComparer : {}<{}>",
        EQUALITY_COMPARER, this
    ))?;
    writer.line("public static readonly ValueComparer Instance = new ValueComparer();")?;
    writer.blank()?;

    writer.open(format!(
        "public bool Equals({this}{n} x, {this}{n} y)",
        this = this,
        n = nullable
    ))?;
    if !is_struct {
        writer.line("if (ReferenceEquals(x, y)) return true;")?;
        writer.line("if (x is null || y is null) return false;")?;
    }
    for member in &plan.members {
        writer.line(format!(
            "if (!{}.Equals(x.{}, y.{})) return false;",
            comparer_expr(&member.ty, support, &value_shape, 0),
            member.name,
            member.name
        ))?;
    }
    if plan.has_variants() {
        writer.line("if (x.GetType() != y.GetType()) return false;")?;
        if !plan.is_abstract {
            writer.line(format!("if (x.GetType() == typeof({})) return true;", this))?;
        }
        writer.line("return x switch")?;
        writer.open_block()?;
        for variant in &plan.variants {
            writer.line(format!(
                "{v} left => {v}.ValueComparer.Instance.Equals(left, ({v})y),",
                v = variant.display_name
            ))?;
        }
        writer.line("_ => false,")?;
        writer.close_statement()?;
    } else if plan.is_abstract {
        writer.line("return false;")?;
    } else {
        writer.line("return true;")?;
    }
    writer.close()?;
    writer.blank()?;

    writer.open(format!("public int GetHashCode({} obj)", this))?;
    if !is_struct {
        writer.line("if (obj is null) return 0;")?;
    }
    writer.line("var hash = new global::System.HashCode();")?;
    for member in &plan.members {
        match member.ty.class {
            TypeClass::Primitive | TypeClass::Unknown => {
                writer.line(format!("hash.Add(obj.{});", member.name))?
            }
            _ => writer.line(format!(
                "hash.Add(obj.{}, {});",
                member.name,
                comparer_expr(&member.ty, support, &value_shape, 0)
            ))?,
        }
    }
    if plan.has_variants() {
        writer.open("switch (obj)")?;
        for variant in &plan.variants {
            writer.line(format!("case {} variant:", variant.display_name))?;
            writer.continuation(format!(
                "hash.Add({}.ValueComparer.Instance.GetHashCode(variant));",
                variant.display_name
            ))?;
            writer.continuation("break;")?;
        }
        writer.close()?;
    }
    writer.line("return hash.ToHashCode();")?;
    writer.close()?;

    writer.close()?;
    Ok(())
}

fn is_value_type(ty: &Classified, value_shape: &dyn Fn(&str) -> bool) -> bool {
    if let TypeClass::Shape(shape) = &ty.class {
        return value_shape(shape.as_str());
    }
    match &ty.ty {
        TypeExpr::Named { name, args } => {
            (args.is_empty() && VALUE_KEYWORDS.contains(&name.as_str()))
                || name == "System.ValueTuple"
                || name == "System.Nullable"
        }
        TypeExpr::Tuple(_) => true,
        TypeExpr::Array(_) | TypeExpr::Nullable(_) => false,
    }
}

/// Expression evaluating to an `IEqualityComparer<T>` for a classified type.
///
/// `value_shape` tells struct shapes apart from class shapes; `depth` keeps
/// lambda parameter names distinct in nested tuples.
pub(crate) fn comparer_expr(
    ty: &Classified,
    support: &str,
    value_shape: &dyn Fn(&str) -> bool,
    depth: usize,
) -> String {
    match &ty.class {
        TypeClass::Primitive | TypeClass::Unknown => {
            format!("{}<{}>.Default", DEFAULT_COMPARER, ty.ty)
        }
        TypeClass::Shape(_) => format!("{}.ValueComparer.Instance", ty.ty),
        TypeClass::Container(element) => format!(
            "new {}.Sequence<{}>({})",
            support,
            element.ty,
            comparer_expr(element, support, value_shape, depth)
        ),
        TypeClass::Nullable(inner) => match inner.class {
            TypeClass::Primitive | TypeClass::Unknown => {
                format!("{}<{}>.Default", DEFAULT_COMPARER, ty.ty)
            }
            _ if is_value_type(inner, value_shape) => format!(
                "new {}.NullableValue<{}>({})",
                support,
                inner.ty,
                comparer_expr(inner, support, value_shape, depth)
            ),
            _ => comparer_expr(inner, support, value_shape, depth),
        },
        TypeClass::Tuple(elements) => {
            let (x, y, v) = (format!("x{}", depth), format!("y{}", depth), format!("v{}", depth));
            let equals = elements
                .iter()
                .enumerate()
                .map(|(index, element)| {
                    format!(
                        "{}.Equals({x}.Item{i}, {y}.Item{i})",
                        comparer_expr(element, support, value_shape, depth + 1),
                        x = x,
                        y = y,
                        i = index + 1
                    )
                })
                .collect::<Vec<_>>()
                .join(" && ");
            let hashes = elements
                .iter()
                .enumerate()
                .map(|(index, element)| {
                    format!(
                        "{}.GetHashCode({}.Item{})",
                        comparer_expr(element, support, value_shape, depth + 1),
                        v,
                        index + 1
                    )
                })
                .collect::<Vec<_>>();
            format!(
                "new {}.Delegate<{}>(({}, {}) => {}, {} => {})",
                support,
                ty.ty,
                x,
                y,
                equals,
                v,
                combine_hashes(&hashes)
            )
        }
    }
}

/// `HashCode.Combine` takes at most eight values; longer lists are folded.
fn combine_hashes(hashes: &[String]) -> String {
    match hashes.len() {
        0 => "0".to_string(),
        1..=8 => format!("global::System.HashCode.Combine({})", hashes.join(", ")),
        _ => {
            let (head, tail) = hashes.split_at(7);
            let mut parts = head.to_vec();
            parts.push(combine_hashes(tail));
            format!("global::System.HashCode.Combine({})", parts.join(", "))
        }
    }
}

fn emit_support(writer: &mut SourceWriter, root_namespace: &str) -> Result<(), CodegenError> {
    let namespaced = !root_namespace.is_empty();
    if namespaced {
        writer.open(format!("namespace {}", root_namespace))?;
    }
    writer.open(format!("internal static class {}", SUPPORT_CLASS))?;

    let sequence = "global::System.Collections.Generic.IEnumerable<T>";
    writer.open(format!(
        "internal sealed class Sequence<T> : {}<{}?>",
        EQUALITY_COMPARER, sequence
    ))?;
    writer.line(format!("private readonly {}<T> _element;", EQUALITY_COMPARER))?;
    writer.blank()?;
    writer.line(format!(
        "public Sequence({}<T> element) => _element = element;",
        EQUALITY_COMPARER
    ))?;
    writer.blank()?;
    writer.open(format!("public bool Equals({s}? x, {s}? y)", s = sequence))?;
    writer.line("if (ReferenceEquals(x, y)) return true;")?;
    writer.line("if (x is null || y is null) return false;")?;
    writer.line("var left = global::System.Linq.Enumerable.ToList(x);")?;
    writer.line("var right = global::System.Linq.Enumerable.ToList(y);")?;
    writer.line("if (left.Count != right.Count) return false;")?;
    writer.open("for (var i = 0; i < left.Count; i++)")?;
    writer.line("if (!_element.Equals(left[i], right[i])) return false;")?;
    writer.close()?;
    writer.line("return true;")?;
    writer.close()?;
    writer.blank()?;
    writer.open(format!("public int GetHashCode({}? obj)", sequence))?;
    writer.line("if (obj is null) return 0;")?;
    writer.line("var hash = new global::System.HashCode();")?;
    writer.line("foreach (var item in obj) hash.Add(item, _element);")?;
    writer.line("return hash.ToHashCode();")?;
    writer.close()?;
    writer.close()?;
    writer.blank()?;

    writer.open(format!(
        "internal sealed class NullableValue<T> : {}<T?> where T : struct",
        EQUALITY_COMPARER
    ))?;
    writer.line(format!("private readonly {}<T> _inner;", EQUALITY_COMPARER))?;
    writer.blank()?;
    writer.line(format!(
        "public NullableValue({}<T> inner) => _inner = inner;",
        EQUALITY_COMPARER
    ))?;
    writer.blank()?;
    writer.line(
        "public bool Equals(T? x, T? y) => x.HasValue ? y.HasValue && _inner.Equals(x.Value, y.Value) : !y.HasValue;",
    )?;
    writer.blank()?;
    writer.line("public int GetHashCode(T? obj) => obj.HasValue ? _inner.GetHashCode(obj.Value) : 0;")?;
    writer.close()?;
    writer.blank()?;

    writer.open(format!("internal sealed class Delegate<T> : {}<T>", EQUALITY_COMPARER))?;
    writer.line("private readonly global::System.Func<T, T, bool> _equals;")?;
    writer.line("private readonly global::System.Func<T, int> _hash;")?;
    writer.blank()?;
    writer.open("public Delegate(global::System.Func<T, T, bool> equals, global::System.Func<T, int> hash)")?;
    writer.line("_equals = equals;")?;
    writer.line("_hash = hash;")?;
    writer.close()?;
    writer.blank()?;
    writer.line("public bool Equals(T x, T y) => _equals(x, y);")?;
    writer.blank()?;
    writer.line("public int GetHashCode(T obj) => _hash(obj);")?;
    writer.close()?;

    writer.close()?;
    if namespaced {
        writer.close()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primitive(name: &str) -> Classified {
        Classified::new(TypeExpr::named(name), TypeClass::Primitive)
    }

    fn no_value_shapes(_: &str) -> bool {
        false
    }

    #[test]
    fn test_nested_tuple_lambdas_do_not_shadow() {
        let inner = Classified::new(
            TypeExpr::Tuple(vec![TypeExpr::named("int"), TypeExpr::named("int")]),
            TypeClass::Tuple(vec![primitive("int"), primitive("int")]),
        );
        let outer = Classified::new(
            TypeExpr::Tuple(vec![TypeExpr::named("string"), inner.ty.clone()]),
            TypeClass::Tuple(vec![primitive("string"), inner]),
        );
        let expr = comparer_expr(&outer, "global::App.ValueComparerSupport", &no_value_shapes, 0);
        assert!(expr.contains("(x0, y0) =>"));
        assert!(expr.contains("(x1, y1) =>"));
    }

    #[test]
    fn test_nullable_value_type_is_wrapped() {
        let list = Classified::new(
            TypeExpr::generic("System.Collections.Generic.List", vec![TypeExpr::named("int")]),
            TypeClass::Container(Box::new(primitive("int"))),
        );
        let tuple = Classified::new(
            TypeExpr::Tuple(vec![TypeExpr::named("int")]),
            TypeClass::Tuple(vec![primitive("int")]),
        );
        let nullable_tuple = Classified::new(
            TypeExpr::Nullable(Box::new(tuple.ty.clone())),
            TypeClass::Nullable(Box::new(tuple)),
        );
        let nullable_list = Classified::new(
            TypeExpr::Nullable(Box::new(list.ty.clone())),
            TypeClass::Nullable(Box::new(list)),
        );

        let support = "global::App.ValueComparerSupport";
        assert!(comparer_expr(&nullable_tuple, support, &no_value_shapes, 0).starts_with("new global::App.ValueComparerSupport.NullableValue<(int)>"));
        assert!(comparer_expr(&nullable_list, support, &no_value_shapes, 0).starts_with("new global::App.ValueComparerSupport.Sequence<int>"));
    }

    #[test]
    fn test_nullable_struct_shape_is_wrapped() {
        let point = || {
            Classified::new(
                TypeExpr::named("App.Point"),
                TypeClass::Shape("App.Point".to_string()),
            )
        };
        let nullable = || {
            Classified::new(
                TypeExpr::Nullable(Box::new(TypeExpr::named("App.Point"))),
                TypeClass::Nullable(Box::new(point())),
            )
        };
        let list = Classified::new(
            TypeExpr::generic("System.Collections.Generic.List", vec![nullable().ty]),
            TypeClass::Container(Box::new(nullable())),
        );
        let struct_shapes = |shape: &str| shape == "App.Point";
        let support = "global::App.ValueComparerSupport";

        assert_eq!(
            comparer_expr(&nullable(), support, &struct_shapes, 0),
            "new global::App.ValueComparerSupport.NullableValue<global::App.Point>(global::App.Point.ValueComparer.Instance)"
        );
        assert_eq!(
            comparer_expr(&list, support, &struct_shapes, 0),
            "new global::App.ValueComparerSupport.Sequence<global::App.Point?>(new global::App.ValueComparerSupport.NullableValue<global::App.Point>(global::App.Point.ValueComparer.Instance))"
        );
        // a class shape is already null-aware
        assert_eq!(
            comparer_expr(&nullable(), support, &no_value_shapes, 0),
            "global::App.Point.ValueComparer.Instance"
        );
    }

    #[test]
    fn test_long_hash_lists_are_folded() {
        let hashes: Vec<String> = (0..10).map(|i| format!("h{}", i)).collect();
        assert_eq!(
            combine_hashes(&hashes),
            "global::System.HashCode.Combine(h0, h1, h2, h3, h4, h5, h6, global::System.HashCode.Combine(h7, h8, h9))"
        );
    }
}
