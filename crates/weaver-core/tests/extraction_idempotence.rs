//! Extraction must not leak per-pass symbol identities into facts.

use pretty_assertions::assert_eq;
use weaver_core::config::MarkerConfig;
use weaver_core::diagnostics::DiagnosticId;
use weaver_core::model::{
    Attribute, AttributeValue, Location, MemberDecl, MemberKind, Modifiers, ProgramModel,
    SymbolId, TypeDecl, TypeKind, TypeRef,
};
use weaver_core::Extractor;

fn inject(name: &str, ty: TypeRef) -> MemberDecl {
    MemberDecl {
        name: name.to_string(),
        ty,
        kind: MemberKind::Field,
        is_static: false,
        attributes: vec![Attribute::new("Inject")],
        location: Location::default(),
    }
}

fn property(name: &str, ty: TypeRef) -> MemberDecl {
    MemberDecl {
        name: name.to_string(),
        ty,
        kind: MemberKind::Property,
        is_static: false,
        attributes: vec![],
        location: Location::default(),
    }
}

fn decl(id: u32, name: &str) -> TypeDecl {
    TypeDecl {
        id: SymbolId(id),
        name: name.to_string(),
        namespace: Some("Shop".to_string()),
        containing_types: vec![],
        kind: TypeKind::Class,
        modifiers: Modifiers {
            is_partial: true,
            ..Default::default()
        },
        type_parameters: vec![],
        base: None,
        attributes: vec![],
        members: vec![],
        methods: vec![],
        location: Location::new(format!("{}.cs", name), 3, 5),
    }
}

/// The same source, numbered with a given symbol offset.
fn shop_model(offset: u32) -> ProgramModel {
    let base_id = SymbolId(offset + 1);
    let service_id = SymbolId(offset + 2);
    let order_id = SymbolId(offset + 3);
    let line_id = SymbolId(offset + 4);

    let mut base = decl(offset + 1, "ServiceBase");
    base.members.push(inject("_logger", TypeRef::named("Shop.ILogger")));

    let mut service = decl(offset + 2, "OrderService");
    service.base = Some(TypeRef::symbol("Shop.ServiceBase", base_id));
    service.members.push(inject("_clock", TypeRef::named("Shop.IClock")));
    service.attributes.push(
        Attribute::new("RegisterService")
            .with_arg(AttributeValue::Enum("ServiceLifetime.Scoped".to_string()))
            .with_named("MethodNameHint", AttributeValue::String("Core".to_string())),
    );

    let mut order = decl(offset + 3, "Order");
    order.kind = TypeKind::Record;
    order.attributes.push(Attribute::new("ValueComparer"));
    order.members.push(property(
        "Lines",
        TypeRef::generic(
            "System.Collections.Generic.List",
            vec![TypeRef::symbol("Shop.OrderLine", line_id)],
        ),
    ));

    let mut line = decl(offset + 4, "OrderLine");
    line.kind = TypeKind::Record;
    line.attributes.push(Attribute::new("ValueComparer"));
    line.base = Some(TypeRef::symbol("Shop.Order", order_id));
    line.members.push(property("Quantity", TypeRef::named("int")));

    let mut model = ProgramModel::new("Shop");
    model.assembly_attributes.push(
        Attribute::new("RegisterService")
            .with_arg(AttributeValue::Enum("ServiceLifetime.Singleton".to_string()))
            .with_arg(AttributeValue::Type(TypeRef::named("Shop.IClock")))
            .with_arg(AttributeValue::Type(TypeRef::symbol("Shop.OrderService", service_id))),
    );
    model.types = vec![base, service, order, line];
    model
}

#[test]
fn renumbered_symbols_produce_equal_facts() {
    let markers = MarkerConfig::default();
    let first_model = shop_model(0);
    let second_model = shop_model(500);

    let first = Extractor::new(&first_model, &markers).extract_all().unwrap();
    let second = Extractor::new(&second_model, &markers).extract_all().unwrap();

    assert_eq!(first, second);
    assert_eq!(first.registrations.facts.len(), 2);
    assert_eq!(first.injections.facts.len(), 1);
    assert_eq!(first.shapes.facts.len(), 2);
}

#[test]
fn repeated_extraction_is_stable() {
    let markers = MarkerConfig::default();
    let model = shop_model(0);
    let extractor = Extractor::new(&model, &markers);
    assert_eq!(extractor.extract_all().unwrap(), extractor.extract_all().unwrap());
}

#[test]
fn base_chain_is_projected_nearest_first() {
    let markers = MarkerConfig::default();
    let model = shop_model(0);
    let facts = Extractor::new(&model, &markers)
        .extract_injection_targets()
        .unwrap()
        .facts;

    let service = &facts[0];
    assert_eq!(service.target.name, "OrderService");
    assert_eq!(service.base_levels.len(), 1);
    assert_eq!(service.base_levels[0].type_name, "global::Shop.ServiceBase");
    assert_eq!(service.base_levels[0].members[0].name, "_logger");
}

#[test]
fn shape_base_requires_a_marked_partial_base() {
    let markers = MarkerConfig::default();
    let model = shop_model(0);
    let shapes = Extractor::new(&model, &markers).extract_shapes().unwrap().facts;
    assert_eq!(shapes[0].base, None);
    assert_eq!(shapes[1].base.as_deref(), Some("Shop.Order"));
}

#[test]
fn assembly_registration_without_implementation_is_rejected() {
    let mut model = ProgramModel::new("Shop");
    model.assembly_attributes.push(
        Attribute::new("RegisterService")
            .with_arg(AttributeValue::Enum("ServiceLifetime.Scoped".to_string()))
            .at(Location::new("AssemblyInfo.cs", 2, 12)),
    );

    let markers = MarkerConfig::default();
    let out = Extractor::new(&model, &markers)
        .extract_registrations()
        .unwrap();

    assert!(out.facts.is_empty());
    let diagnostic = out.diagnostics.iter().next().unwrap();
    assert_eq!(diagnostic.id, DiagnosticId::MissingImplementationType);
    assert!(diagnostic.is_error());
    assert_eq!(diagnostic.location, Location::new("AssemblyInfo.cs", 2, 12));
}
