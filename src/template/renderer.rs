use handlebars::{Handlebars, Helper, HelperResult, Output, RenderContext};
use serde_json::{Map, Value, json};
use std::path::Path;
use tracing::info;

use crate::infrastructure::discovery::{ResourceDescriptor, ResourceKind, sanitize_tf_name};
use crate::infrastructure::error::{ImportError, ImportResult};
use crate::traits::FileSystem;

const PROVIDERS_TEMPLATE: &str = "providers";

/// Import templates compiled into the binary, one per resource kind
const IMPORT_TEMPLATES: &[(&str, &str)] = &[
    ("aks", include_str!("../../templates/aks.tf.hbs")),
    ("vms", include_str!("../../templates/vms.tf.hbs")),
    ("lb", include_str!("../../templates/lb.tf.hbs")),
    ("lbgw", include_str!("../../templates/lbgw.tf.hbs")),
    ("storage", include_str!("../../templates/storage.tf.hbs")),
    ("sql", include_str!("../../templates/sql.tf.hbs")),
    ("mysql", include_str!("../../templates/mysql.tf.hbs")),
    ("postgresql", include_str!("../../templates/postgresql.tf.hbs")),
    (
        PROVIDERS_TEMPLATE,
        include_str!("../../templates/providers.tf.hbs"),
    ),
];

/// Renders `import` blocks and the provider configuration using Handlebars
pub struct ImportTemplates {
    handlebars: Handlebars<'static>,
}

impl ImportTemplates {
    /// Create a renderer with every embedded template registered
    pub fn new() -> ImportResult<Self> {
        let mut handlebars = Handlebars::new();

        // Output is HCL, not HTML
        handlebars.register_escape_fn(handlebars::no_escape);

        handlebars.register_helper("eq", Box::new(eq_helper));
        handlebars.register_helper("tf_name", Box::new(tf_name_helper));

        for (name, source) in IMPORT_TEMPLATES {
            handlebars.register_template_string(name, *source)?;
        }

        Ok(Self { handlebars })
    }

    /// Render the import blocks for one resource and its children
    pub fn render_import(
        &self,
        descriptor: &ResourceDescriptor,
        subscription_id: &str,
    ) -> ImportResult<String> {
        let children: Map<String, Value> = descriptor
            .sub_resources
            .iter()
            .map(|list| -> ImportResult<(String, Value)> {
                Ok((list.kind.clone(), serde_json::to_value(&list.items)?))
            })
            .collect::<ImportResult<_>>()?;

        let data = json!({
            "resource": descriptor,
            "subscription_id": subscription_id,
            "children": children,
        });

        Ok(self
            .handlebars
            .render(descriptor.kind.template_name(), &data)?)
    }

    /// Render `providers.tf`
    pub fn render_providers(
        &self,
        subscription_id: Option<&str>,
        region: Option<&str>,
    ) -> ImportResult<String> {
        let data = json!({
            "subscription_id": subscription_id,
            "region": region,
        });

        Ok(self.handlebars.render(PROVIDERS_TEMPLATE, &data)?)
    }

    /// Write `providers.tf` into `repo_path` unless it is already there
    ///
    /// Returns whether the file was written.
    pub fn write_providers_if_missing(
        &self,
        fs: &dyn FileSystem,
        repo_path: &Path,
        subscription_id: Option<&str>,
        region: Option<&str>,
    ) -> ImportResult<bool> {
        let path = repo_path.join("providers.tf");
        if fs.exists(&path) {
            info!(path = %path.display(), "providers.tf already exists");
            return Ok(false);
        }

        let rendered = self.render_providers(subscription_id, region)?;
        fs.write(&path, &rendered)
            .map_err(|e| ImportError::FileSystem(format!("{:#}", e)))?;
        info!(path = %path.display(), "Created providers.tf");

        Ok(true)
    }

    /// Kinds with an embedded template
    pub fn supported_kinds(&self) -> Vec<ResourceKind> {
        ResourceKind::all()
            .into_iter()
            .filter(|kind| self.handlebars.has_template(kind.template_name()))
            .collect()
    }
}

/// Helper function for equality comparison
fn eq_helper(
    h: &Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let param1 = h.param(0).and_then(|v| v.value().as_str());
    let param2 = h.param(1).and_then(|v| v.value().as_str());

    if let (Some(p1), Some(p2)) = (param1, param2)
        && p1 == p2
    {
        out.write("true")?;
    }

    Ok(())
}

/// Turn a resource name into a valid Terraform identifier
fn tf_name_helper(
    h: &Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let name = h.param(0).and_then(|v| v.value().as_str()).unwrap_or("");
    out.write(&sanitize_tf_name(name))?;
    Ok(())
}
