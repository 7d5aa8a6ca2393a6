//! Synthesized constructors for injection targets

use super::by_namespace;
use crate::error::CodegenError;
use crate::inject::{ClassDependencyRecord, ConstructorPlan};
use crate::writer::SourceWriter;
use weaver_core::CancellationToken;

/// Render a constructor for every record that has one.
pub fn emit_constructors(
    records: &[ClassDependencyRecord],
    root_namespace: &str,
    indent_size: usize,
    cancel: &CancellationToken,
) -> Result<String, CodegenError> {
    let mut writer = SourceWriter::new(indent_size);
    writer.header()?;

    let generated = records.iter().filter(|r| r.constructor.is_some());
    let groups = by_namespace(generated, |r| &r.target, root_namespace);

    for (group_index, (namespace, records)) in groups.iter().enumerate() {
        if group_index > 0 {
            writer.blank()?;
        }
        let namespaced = !namespace.is_empty();
        if namespaced {
            writer.open(format!("namespace {}", namespace))?;
        }
        for (index, record) in records.iter().enumerate() {
            cancel.check()?;
            let Some(plan) = &record.constructor else {
                continue;
            };
            if index > 0 {
                writer.blank()?;
            }
            let scopes = writer.open_containing_types(&record.target)?;
            writer.open(format!(
                "partial {} {}",
                record.target.kind.keyword(),
                record.target.declared_name()
            ))?;
            emit_constructor(&mut writer, &record.target.name, plan)?;
            writer.close()?;
            writer.close_scopes(scopes)?;
        }
        if namespaced {
            writer.close()?;
        }
    }
    Ok(writer.finish())
}

fn emit_constructor(
    writer: &mut SourceWriter,
    type_name: &str,
    plan: &ConstructorPlan,
) -> Result<(), CodegenError> {
    let parameters = plan
        .parameters
        .iter()
        .map(|p| format!("{} {}", p.ty, p.name))
        .collect::<Vec<_>>()
        .join(", ");
    writer.line(format!("public {}({})", type_name, parameters))?;
    if !plan.base_arguments.is_empty() {
        writer.continuation(format!(": base({})", plan.base_arguments.join(", ")))?;
    }
    writer.open_block()?;
    for assignment in &plan.assignments {
        writer.line(format!("this.{} = {};", assignment.member, assignment.parameter))?;
    }
    if let Some(hook) = &plan.hook {
        writer.line(format!("{}();", hook))?;
    }
    writer.close()?;
    Ok(())
}
