//! Service registration extension methods

use crate::error::CodegenError;
use crate::registration::RegistrationGroup;
use crate::writer::SourceWriter;
use weaver_core::config::OutputConfig;

const SERVICE_COLLECTION: &str =
    "global::Microsoft.Extensions.DependencyInjection.IServiceCollection";

/// Render all registration groups into one static extension class.
pub fn emit_registrations(
    groups: &[RegistrationGroup],
    root_namespace: &str,
    output: &OutputConfig,
) -> Result<String, CodegenError> {
    let mut writer = SourceWriter::new(output.indent_size);
    writer.header()?;

    let namespaced = !root_namespace.is_empty();
    if namespaced {
        writer.open(format!("namespace {}", root_namespace))?;
    }
    writer.open(format!("public static partial class {}", output.registration_class))?;

    for (index, group) in groups.iter().enumerate() {
        if index > 0 {
            writer.blank()?;
        }
        if !group.hint.is_empty() {
            writer.line(format!("/// <summary>Registers services grouped under \"{}\".</summary>", group.hint))?;
        }
        writer.open(format!(
            "public static {} {}(this {} services)",
            SERVICE_COLLECTION, group.method_name, SERVICE_COLLECTION
        ))?;
        for registration in &group.registrations {
            writer.line(RegistrationGroup::call(registration))?;
        }
        writer.line("return services;")?;
        writer.close()?;
    }

    writer.close()?;
    if namespaced {
        writer.close()?;
    }
    Ok(writer.finish())
}
