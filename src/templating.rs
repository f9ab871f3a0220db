use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use arc_swap::ArcSwap;
use tera::Tera;
use tracing::info;

use crate::error::PublisherErr;

pub const INDEX_TEMPLATE: &str = "index.html";
pub const DETAILS_TEMPLATE: &str = "details.html";
/// Optional: tag pages are only written when it exists.
pub const TAG_TEMPLATE: &str = "tag.html";

const REQUIRED: [&str; 2] = [INDEX_TEMPLATE, DETAILS_TEMPLATE];

/// Compiled templates that can be recompiled while renders are running.
pub struct Templates {
    dir: PathBuf,
    current: ArcSwap<Tera>,
}

impl Templates {
    pub fn load(dir: &Path) -> Result<Self, PublisherErr> {
        Ok(Self {
            dir: dir.to_path_buf(),
            current: ArcSwap::from_pointee(compile(dir)?),
        })
    }

    pub fn get(&self) -> Arc<Tera> {
        self.current.load_full()
    }

    /// Recompiles from disk. On failure the previous templates stay active.
    pub fn recompile(&self) -> Result<(), PublisherErr> {
        let tera = compile(&self.dir)?;
        self.current.store(Arc::new(tera));
        Ok(())
    }
}

pub fn has_template(tera: &Tera, name: &str) -> bool {
    tera.get_template_names().any(|n| n == name)
}

fn compile(dir: &Path) -> Result<Tera, PublisherErr> {
    let templates = format!("{}/**/*.html", dir.display());
    info!("initialize templates: {}", templates);
    let tera = Tera::new(&templates)?;
    for required in REQUIRED {
        if !has_template(&tera, required) {
            return Err(format!("template {required} is missing from {}", dir.display()).into());
        }
    }
    info!("template initialization complete");
    Ok(tera)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_templates(dir: &Path, index: &str) {
        std::fs::write(dir.join(INDEX_TEMPLATE), index).unwrap();
        std::fs::write(dir.join(DETAILS_TEMPLATE), "{{ story.title }}").unwrap();
    }

    #[test]
    fn loads_and_recompiles() {
        let dir = tempfile::tempdir().unwrap();
        write_templates(dir.path(), "v1");
        let templates = Templates::load(dir.path()).unwrap();
        let held = templates.get();

        write_templates(dir.path(), "v2");
        templates.recompile().unwrap();

        let ctx = tera::Context::new();
        assert_eq!(held.render(INDEX_TEMPLATE, &ctx).unwrap(), "v1");
        assert_eq!(templates.get().render(INDEX_TEMPLATE, &ctx).unwrap(), "v2");
    }

    #[test]
    fn broken_recompile_keeps_previous() {
        let dir = tempfile::tempdir().unwrap();
        write_templates(dir.path(), "ok");
        let templates = Templates::load(dir.path()).unwrap();

        write_templates(dir.path(), "{% if %}");
        assert!(templates.recompile().is_err());
        assert_eq!(
            templates
                .get()
                .render(INDEX_TEMPLATE, &tera::Context::new())
                .unwrap(),
            "ok"
        );
    }

    #[test]
    fn missing_required_template_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(INDEX_TEMPLATE), "x").unwrap();
        let err = Templates::load(dir.path()).err().unwrap();
        assert!(err.to_string().contains(DETAILS_TEMPLATE));
    }
}
