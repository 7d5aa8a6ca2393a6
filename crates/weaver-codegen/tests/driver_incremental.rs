//! Incremental passes over changing model snapshots

use pretty_assertions::assert_eq;
use weaver_codegen::{CodegenError, GeneratorDriver, GeneratorKind};
use weaver_core::model::{
    Attribute, AttributeValue, Location, MemberDecl, MemberKind, MethodDecl, Modifiers,
    ProgramModel, SymbolId, TypeDecl, TypeKind, TypeRef,
};
use weaver_core::{CancellationToken, GeneratorConfig};

fn member(name: &str, ty: TypeRef, kind: MemberKind, attributes: Vec<Attribute>) -> MemberDecl {
    MemberDecl {
        name: name.to_string(),
        ty,
        kind,
        is_static: false,
        attributes,
        location: Location::default(),
    }
}

fn decl(id: u32, name: &str, kind: TypeKind) -> TypeDecl {
    TypeDecl {
        id: SymbolId(id),
        name: name.to_string(),
        namespace: Some("Billing".to_string()),
        containing_types: vec![],
        kind,
        modifiers: Modifiers {
            is_partial: true,
            ..Default::default()
        },
        type_parameters: vec![],
        base: None,
        attributes: vec![],
        members: vec![],
        methods: vec![],
        location: Location::new(format!("{}.cs", name), 1, 1),
    }
}

/// Symbol ids are shifted by `offset`; everything else is the same source.
fn billing_model(offset: u32) -> ProgramModel {
    let mut model = ProgramModel::new("Billing");

    let mut invoicer = decl(offset + 1, "Invoicer", TypeKind::Class);
    invoicer.attributes.push(
        Attribute::new("RegisterService")
            .with_arg(AttributeValue::Enum("ServiceLifetime.Scoped".to_string())),
    );
    invoicer.members.push(member(
        "_ledger",
        TypeRef::named("Billing.ILedger"),
        MemberKind::Field,
        vec![Attribute::new("Inject")],
    ));
    invoicer.methods.push(MethodDecl {
        name: "OnReady".to_string(),
        is_static: false,
        parameters: vec![],
        attributes: vec![Attribute::new("InjectInitializer")],
        location: Location::default(),
    });

    let mut amount = decl(offset + 2, "Amount", TypeKind::RecordStruct);
    amount.attributes.push(Attribute::new("ValueComparer"));
    amount.members.push(member("Value", TypeRef::named("decimal"), MemberKind::Property, vec![]));
    amount.members.push(member("Currency", TypeRef::named("string"), MemberKind::Property, vec![]));

    let mut invoice = decl(offset + 3, "Invoice", TypeKind::Record);
    invoice.attributes.push(Attribute::new("ValueComparer"));
    invoice.members.push(member(
        "Lines",
        TypeRef::generic(
            "System.Collections.Generic.List",
            vec![TypeRef::symbol("Billing.Amount", SymbolId(offset + 2))],
        ),
        MemberKind::Property,
        vec![],
    ));

    model.types.extend([invoicer, amount, invoice]);
    model
}

#[test]
fn test_first_pass_emits_every_generator() {
    let mut driver = GeneratorDriver::new(GeneratorConfig::default());
    let output = driver.run_pass(&billing_model(0), &CancellationToken::new()).unwrap();

    assert_eq!(
        output.sources().map(|s| s.file_name.as_str()).collect::<Vec<_>>(),
        vec![
            "ServiceRegistrationMethods.g.cs",
            "InjectConstructors.g.cs",
            "ValueComparers.g.cs"
        ]
    );
    assert_eq!(output.reused().count(), 0);
    assert!(output.diagnostics().is_empty());

    let comparers = &output.get(GeneratorKind::Comparers).unwrap().source.as_ref().unwrap().text;
    assert!(comparers.contains("partial record struct Amount"));
    assert!(comparers.contains("public bool Equals(global::Billing.Amount x, global::Billing.Amount y)"));
    assert!(comparers.contains(
        "new global::Billing.ValueComparerSupport.Sequence<global::Billing.Amount>(global::Billing.Amount.ValueComparer.Instance)"
    ));
    assert!(comparers.contains("internal static class ValueComparerSupport"));

    let constructors = &output.get(GeneratorKind::Constructors).unwrap().source.as_ref().unwrap().text;
    assert!(constructors.contains("public Invoicer(global::Billing.ILedger ledger)"));
    assert!(constructors.contains("OnReady();"));
}

#[test]
fn test_renumbered_snapshot_reuses_every_output() {
    let cancel = CancellationToken::new();
    let mut driver = GeneratorDriver::new(GeneratorConfig::default());

    let first = driver.run_pass(&billing_model(0), &cancel).unwrap();
    let second = driver.run_pass(&billing_model(500), &cancel).unwrap();

    assert_eq!(second.reused().count(), 3);
    assert_eq!(
        first.sources().collect::<Vec<_>>(),
        second.sources().collect::<Vec<_>>()
    );
}

#[test]
fn test_only_changed_generator_runs_again() {
    let cancel = CancellationToken::new();
    let mut driver = GeneratorDriver::new(GeneratorConfig::default());
    driver.run_pass(&billing_model(0), &cancel).unwrap();

    let mut model = billing_model(0);
    model.types[1]
        .members
        .push(member("Rounding", TypeRef::named("int"), MemberKind::Property, vec![]));
    let output = driver.run_pass(&model, &cancel).unwrap();

    assert_eq!(
        output.reused().collect::<Vec<_>>(),
        vec![GeneratorKind::Registrations, GeneratorKind::Constructors]
    );
    let comparers = &output.get(GeneratorKind::Comparers).unwrap().source.as_ref().unwrap().text;
    assert!(comparers.contains("x.Rounding"));
}

#[test]
fn test_root_namespace_change_invalidates() {
    let cancel = CancellationToken::new();
    let mut driver = GeneratorDriver::new(GeneratorConfig::default());
    let mut model = billing_model(0);
    driver.run_pass(&model, &cancel).unwrap();

    model
        .build_properties
        .insert("RootNamespace".to_string(), "Billing.Core".to_string());
    let output = driver.run_pass(&model, &cancel).unwrap();
    assert_eq!(output.reused().count(), 0);
}

#[test]
fn test_cancelled_pass_publishes_nothing() {
    let mut driver = GeneratorDriver::new(GeneratorConfig::default());
    let first = driver.run_pass(&billing_model(0), &CancellationToken::new()).unwrap();

    let cancelled = CancellationToken::new();
    cancelled.cancel();
    let mut changed = billing_model(0);
    changed.types.pop();
    let result = driver.run_pass(&changed, &cancelled);
    assert!(matches!(result, Err(CodegenError::Cancelled)));

    // The cancelled pass did not replace what the first pass remembered.
    let again = driver.run_pass(&billing_model(0), &CancellationToken::new()).unwrap();
    assert_eq!(again.reused().count(), 3);
    assert_eq!(
        first.sources().collect::<Vec<_>>(),
        again.sources().collect::<Vec<_>>()
    );
}

#[test]
fn test_fingerprints_track_facts() {
    let cancel = CancellationToken::new();
    let first = GeneratorDriver::new(GeneratorConfig::default())
        .run_pass(&billing_model(0), &cancel)
        .unwrap();
    let renumbered = GeneratorDriver::new(GeneratorConfig::default())
        .run_pass(&billing_model(77), &cancel)
        .unwrap();

    for kind in GeneratorKind::ALL {
        let a = &first.get(kind).unwrap().fingerprint;
        let b = &renumbered.get(kind).unwrap().fingerprint;
        assert!(a.content_matches(b), "{} fingerprint changed", kind);
    }
}
