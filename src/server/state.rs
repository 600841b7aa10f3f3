use anyhow::{Context, Result};
use tera::Tera;

use crate::languages;
use crate::pipeline::Pipeline;
use crate::providers::Provider;

const INDEX_TEMPLATE: &str = include_str!("templates/index.html.tera");
const INDEX_TEMPLATE_NAME: &str = "index.html";

/// Everything a request needs. Built once at startup and shared read-only.
pub struct AppState<P: Provider> {
    pub(crate) pipeline: Pipeline<P>,
    pub(crate) max_upload_bytes: usize,
    templates: Tera,
}

impl<P: Provider> AppState<P> {
    pub fn new(pipeline: Pipeline<P>, max_upload_bytes: usize) -> Result<Self> {
        let mut templates = Tera::default();
        templates
            .add_raw_template(INDEX_TEMPLATE_NAME, INDEX_TEMPLATE)
            .with_context(|| "failed to parse index template")?;
        Ok(Self {
            pipeline,
            max_upload_bytes,
            templates,
        })
    }

    pub fn pipeline(&self) -> &Pipeline<P> {
        &self.pipeline
    }

    pub(crate) fn render_index(&self) -> Result<String> {
        let mut context = tera::Context::new();
        context.insert("languages", &languages::language_options());
        self.templates
            .render(INDEX_TEMPLATE_NAME, &context)
            .with_context(|| "failed to render index template")
    }
}
