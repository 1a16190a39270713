//! Theme engine
//!
//! Page rendering with Tera. The default template set is embedded in the
//! binary from `templates/`; a configured override directory may replace any
//! of those templates by providing a file with the same relative name.

use anyhow::{Context, Result};
use chrono::Datelike;
use rust_embed::RustEmbed;
use serde::Serialize;
use std::error::Error as StdError;
use std::fs;
use std::path::{Path, PathBuf};
use tera::{Context as TeraContext, Tera};

use crate::models::User;

mod error;

pub use error::ThemeError;

/// Default templates compiled into the binary
#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct DefaultTemplates;

/// Theme engine for rendering templates
pub struct ThemeEngine {
    tera: Tera,
    /// Directory whose templates take precedence over the embedded ones
    override_path: Option<PathBuf>,
}

impl ThemeEngine {
    /// Build an engine from the embedded templates and, when given, the
    /// overrides found under `override_path`.
    pub fn new(override_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = override_path {
            if !path.is_dir() {
                return Err(ThemeError::NotFound(path.display().to_string()).into());
            }
        }

        let mut engine = Self {
            tera: Tera::default(),
            override_path: override_path.map(Path::to_path_buf),
        };
        engine.load_templates()?;
        Ok(engine)
    }

    fn load_templates(&mut self) -> Result<()> {
        let mut templates: Vec<(String, String)> = Vec::new();

        for name in DefaultTemplates::iter() {
            let file = DefaultTemplates::get(&name)
                .ok_or_else(|| ThemeError::NotFound(name.to_string()))?;
            let content = String::from_utf8(file.data.into_owned())
                .map_err(|e| ThemeError::TemplateError(format!("{} is not UTF-8: {}", name, e)))?;
            templates.push((name.to_string(), content));
        }

        if let Some(dir) = &self.override_path {
            let mut overrides = Vec::new();
            collect_templates_from_dir(dir, dir, &mut overrides)?;
            for (name, content) in overrides {
                tracing::debug!("Template {} overridden from {:?}", name, dir);
                match templates.iter_mut().find(|(n, _)| *n == name) {
                    Some(slot) => slot.1 = content,
                    None => templates.push((name, content)),
                }
            }
        }

        let mut tera = Tera::default();
        tera.add_raw_templates(templates)
            .map_err(|e| ThemeError::TemplateError(format!("Failed to load templates: {}", e)))?;
        tracing::debug!("Loaded {} templates", tera.get_template_names().count());

        self.tera = tera;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn has_template(&self, template: &str) -> bool {
        self.tera.get_template_names().any(|name| name == template)
    }

    /// Render a template with context
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String> {
        self.tera.render(template, context).map_err(|e| {
            let mut error_msg = format!("Failed to render '{}': {}", template, e);
            let mut source = e.source();
            while let Some(s) = source {
                error_msg.push_str(&format!("\n  Caused by: {}", s));
                source = s.source();
            }
            ThemeError::TemplateError(error_msg).into()
        })
    }

    /// Render a template with the variables every page layout expects
    pub fn render_with_standard_vars(
        &self,
        template: &str,
        context: &TeraContext,
        standard_vars: &StandardTemplateVars,
    ) -> Result<String> {
        let mut full_context = context.clone();
        full_context.insert("site_name", &standard_vars.site_name);
        full_context.insert("request_path", &standard_vars.request_path);
        full_context.insert("year", &standard_vars.year);
        if let Some(ref user) = standard_vars.current_user {
            full_context.insert("current_user", user);
        }

        self.render(template, &full_context)
    }

    /// Render a template, degrading to `pages/500.html` and finally to a
    /// hard-coded page when templates themselves are broken
    pub fn render_with_fallback(&self, template: &str, context: &TeraContext) -> String {
        match self.render(template, context) {
            Ok(html) => html,
            Err(e) => {
                tracing::error!("{:#}", e);
                match self.render("pages/500.html", context) {
                    Ok(html) => html,
                    Err(error_template_err) => {
                        tracing::error!("Failed to render error page: {:#}", error_template_err);
                        simple_error_page()
                    }
                }
            }
        }
    }
}

/// Collect `*.html` files below `current_path`, named relative to `base_path`
fn collect_templates_from_dir(
    base_path: &Path,
    current_path: &Path,
    templates: &mut Vec<(String, String)>,
) -> Result<()> {
    for entry in fs::read_dir(current_path)
        .with_context(|| format!("Failed to read template directory {:?}", current_path))?
    {
        let path = entry?.path();

        if path.is_dir() {
            collect_templates_from_dir(base_path, &path, templates)?;
        } else if path.extension().is_some_and(|ext| ext == "html") {
            let relative_path = path
                .strip_prefix(base_path)
                .map_err(|_| ThemeError::TemplateError("Failed to get relative path".to_string()))?;
            let template_name = relative_path.to_string_lossy().replace('\\', "/");

            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read template: {:?}", path))?;
            templates.push((template_name, content));
        }
    }
    Ok(())
}

/// Last-resort page when not even the error template renders
fn simple_error_page() -> String {
    r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>Server error</title></head>
<body>
    <h1>Server error</h1>
    <p>Something went wrong while rendering this page.</p>
</body>
</html>"#
        .to_string()
}

/// Variables available to every page
#[derive(Debug, Clone, Serialize)]
pub struct StandardTemplateVars {
    pub site_name: String,
    /// Logged-in user, if any
    pub current_user: Option<CurrentUser>,
    /// Path of the current request, for `?next=` links and active menu items
    pub request_path: String,
    /// Current year (for copyright)
    pub year: i32,
}

/// The parts of the logged-in user the layout shows
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub is_admin: bool,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            is_admin: user.is_admin(),
        }
    }
}

impl StandardTemplateVars {
    pub fn new(site_name: impl Into<String>, request_path: impl Into<String>) -> Self {
        Self {
            site_name: site_name.into(),
            current_user: None,
            request_path: request_path.into(),
            year: chrono::Utc::now().year(),
        }
    }

    pub fn with_user(mut self, user: Option<&User>) -> Self {
        self.current_user = user.map(CurrentUser::from);
        self
    }
}
